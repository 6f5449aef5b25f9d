//! Procedure specification validation
//!
//! JSON descriptions of the server's callable surface, used by the test suite
//! to pin the call shapes this client assembles against the declared
//! parameter and return signatures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::params::CallParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Map,
    List,
    Any,
}

impl FieldKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            // integers are acceptable where the server expects a float
            FieldKind::Float => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Map => value.is_object(),
            FieldKind::List => value.is_array(),
            FieldKind::Any => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureSpec {
    pub name: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub parameters: Vec<FieldSpec>,
    #[serde(default)]
    pub returns: Vec<FieldSpec>,
}

impl ProcedureSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks that `params` satisfies this procedure's declared signature:
    /// all required parameters present, no undeclared parameters, and every
    /// value of the declared kind.
    pub fn validate_call(&self, params: &CallParameters) -> Result<()> {
        for field in &self.parameters {
            match params.get(&field.name) {
                Some(value) => {
                    if !field.kind.matches(value) {
                        return Err(ClientError::Config(format!(
                            "parameter `{}` of `{}` expects a {:?} value",
                            field.name, self.name, field.kind
                        )));
                    }
                }
                None if field.optional || field.default.is_some() => {}
                None => {
                    return Err(ClientError::Config(format!(
                        "required parameter `{}` of `{}` is missing",
                        field.name, self.name
                    )));
                }
            }
        }

        for key in params.keys() {
            if !self.parameters.iter().any(|f| &f.name == key) {
                return Err(ClientError::Config(format!(
                    "`{}` does not declare a parameter `{key}`",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pagerank_stream_spec() -> ProcedureSpec {
        ProcedureSpec::from_json(
            r#"{
                "name": "gds.pageRank.stream",
                "mode": "stream",
                "parameters": [
                    {"name": "graph_name", "kind": "string"},
                    {"name": "config", "kind": "map", "optional": true}
                ],
                "returns": [
                    {"name": "nodeId", "kind": "integer"},
                    {"name": "score", "kind": "float"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_call_passes() {
        let spec = pagerank_stream_spec();
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({"dampingFactor": 0.85}));

        assert!(spec.validate_call(&params).is_ok());
    }

    #[test]
    fn test_optional_parameter_may_be_absent() {
        let spec = pagerank_stream_spec();
        let params = CallParameters::new().with("graph_name", "persons");

        assert!(spec.validate_call(&params).is_ok());
    }

    #[test]
    fn test_missing_required_parameter() {
        let spec = pagerank_stream_spec();
        let params = CallParameters::new().with("config", json!({}));

        let err = spec.validate_call(&params).unwrap_err();
        assert!(err.to_string().contains("graph_name"));
    }

    #[test]
    fn test_kind_mismatch() {
        let spec = pagerank_stream_spec();
        let params = CallParameters::new()
            .with("graph_name", 42)
            .with("config", json!({}));

        assert!(spec.validate_call(&params).is_err());
    }

    #[test]
    fn test_undeclared_parameter_rejected() {
        let spec = pagerank_stream_spec();
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("bogus", true);

        let err = spec.validate_call(&params).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_integer_accepted_for_float() {
        assert!(FieldKind::Float.matches(&json!(1)));
        assert!(FieldKind::Float.matches(&json!(0.5)));
        assert!(!FieldKind::Integer.matches(&json!(0.5)));
    }
}
