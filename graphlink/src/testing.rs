//! Recording fake for the transport seam, shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use graphlink_core::error::Result;
use graphlink_core::params::CallParameters;
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;
use graphlink_core::version::ServerVersion;

pub struct RecordingRunner {
    calls: Mutex<Vec<(String, CallParameters)>>,
    responses: Mutex<HashMap<String, ResultTable>>,
    functions: Mutex<HashMap<String, Value>>,
    version: ServerVersion,
    slow: bool,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            functions: Mutex::new(HashMap::new()),
            version: ServerVersion::new(2, 6, 0),
            slow: false,
        }
    }
}

impl RecordingRunner {
    pub fn with_version(mut self, version: ServerVersion) -> Self {
        self.version = version;
        self
    }

    /// Makes procedure calls take long enough for the progress poller to
    /// observe them.
    pub fn slow_procedures(mut self) -> Self {
        self.slow = true;
        self
    }

    pub fn respond(&self, endpoint: &str, table: ResultTable) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), table);
    }

    pub fn respond_rows(&self, endpoint: &str, rows: Vec<Map<String, Value>>) {
        self.respond(endpoint, ResultTable::from_rows(rows));
    }

    pub fn respond_function(&self, endpoint: &str, value: Value) {
        self.functions
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), value);
    }

    pub fn procedure_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    /// The parameters of the first recorded call to `endpoint`.
    pub fn params_for(&self, endpoint: &str) -> Option<CallParameters> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| e == endpoint)
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl QueryRunner for RecordingRunner {
    async fn run_cypher(&self, query: &str, params: CallParameters) -> Result<ResultTable> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), params));
        Ok(ResultTable::default())
    }

    async fn call_procedure(
        &self,
        endpoint: &str,
        params: CallParameters,
        _yields: Option<&[&str]>,
    ) -> Result<ResultTable> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params));

        if self.slow && endpoint != "gds.listProgress" {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        if let Some(table) = self.responses.lock().unwrap().get(endpoint) {
            return Ok(table.clone());
        }

        if endpoint == "gds.listProgress" {
            let mut row = Map::new();
            row.insert("taskName".to_string(), Value::from("Task"));
            row.insert("progress".to_string(), Value::from("50%"));
            return Ok(ResultTable::from_rows(vec![row]));
        }

        Ok(ResultTable::default())
    }

    async fn call_function(&self, endpoint: &str, params: CallParameters) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params));
        Ok(self
            .functions
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn server_version(&self) -> ServerVersion {
        self.version
    }

    fn database(&self) -> Option<&str> {
        Some("neo4j")
    }
}
