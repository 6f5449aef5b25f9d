//! Ordered call parameters for procedure invocations

use indexmap::IndexMap;
use serde_json::Value;

/// Parameters of a single procedure call.
///
/// Insertion order is significant: the rendered placeholder string must list
/// the parameters in the positional order the server-side procedure expects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallParameters {
    entries: IndexMap<String, Value>,
}

impl CallParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// The Cypher placeholder list, e.g. `$graph_name, $config`.
    pub fn placeholder_str(&self) -> String {
        self.entries
            .keys()
            .map(|k| format!("${k}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The job id buried in the `config` parameter, if any.
    ///
    /// Algorithm endpoints take their job id as the `jobId` key of the
    /// configuration map; the progress poller needs it to follow the
    /// server-side task.
    pub fn job_id(&self) -> Option<&str> {
        self.entries
            .get("config")
            .and_then(|config| config.get("jobId"))
            .and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for CallParameters {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder_str_preserves_order() {
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({"concurrency": 4}));

        assert_eq!(params.placeholder_str(), "$graph_name, $config");
    }

    #[test]
    fn test_empty_placeholder_str() {
        assert_eq!(CallParameters::new().placeholder_str(), "");
    }

    #[test]
    fn test_job_id_lookup() {
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({"jobId": "job-42", "concurrency": 4}));

        assert_eq!(params.job_id(), Some("job-42"));

        let without = CallParameters::new().with("config", json!({"concurrency": 4}));
        assert_eq!(without.job_id(), None);
    }
}
