//! JSON to Bolt parameter conversion

use std::collections::HashMap;

use neo4rs::BoltType;
use serde_json::Value;

/// Converts a JSON value into the Bolt representation the driver sends as a
/// query parameter. Numbers outside the i64 range degrade to floats, the way
/// the server would coerce them anyway.
pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(Default::default()),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else {
                BoltType::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            BoltType::from(items.iter().map(json_to_bolt).collect::<Vec<BoltType>>())
        }
        Value::Object(map) => {
            let entries: HashMap<String, BoltType> = map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_bolt(v)))
                .collect();
            BoltType::from(entries)
        }
    }
}
