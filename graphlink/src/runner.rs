//! Transport selection
//!
//! [`GdsRunner`] sits between the surface objects and the wire. Ordinary
//! procedure calls go over Cypher; the handful of bulk streaming endpoints go
//! over Arrow Flight when the server offers it. Calls that carry a job id are
//! shadowed by the progress poller.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use graphlink_arrow::FlightConnection;
use graphlink_core::error::{ClientError, Result};
use graphlink_core::params::CallParameters;
use graphlink_core::retry::PollingSchedule;
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;
use graphlink_core::version::ServerVersion;
use graphlink_cypher::ProgressPoller;

/// Streaming endpoints whose result sets are large enough to justify the
/// Arrow path.
const ARROW_STREAM_ENDPOINTS: [&str; 6] = [
    "gds.graph.nodeProperty.stream",
    "gds.graph.nodeProperties.stream",
    "gds.graph.relationships.stream",
    "gds.graph.relationshipProperty.stream",
    "gds.graph.relationshipProperties.stream",
    "gds.graph.nodeLabels.stream",
];

pub struct GdsRunner {
    cypher: Arc<dyn QueryRunner>,
    flight: Option<Arc<FlightConnection>>,
    poller: ProgressPoller,
    job_schedule: PollingSchedule,
    /// The server advertises `v2` among its Arrow endpoint versions
    jobs_v2: bool,
}

impl GdsRunner {
    pub fn new(
        cypher: Arc<dyn QueryRunner>,
        flight: Option<Arc<FlightConnection>>,
        show_progress: bool,
    ) -> Self {
        Self {
            cypher,
            flight,
            poller: ProgressPoller::new(PollingSchedule::default(), show_progress),
            job_schedule: PollingSchedule::default(),
            jobs_v2: false,
        }
    }

    /// Enables the v2 job protocol for algorithm streaming calls.
    pub fn with_v2_jobs(mut self, enabled: bool) -> Self {
        self.jobs_v2 = enabled;
        self
    }

    pub fn arrow_available(&self) -> bool {
        self.flight.is_some()
    }

    pub fn flight(&self) -> Option<&Arc<FlightConnection>> {
        self.flight.as_ref()
    }

    fn arrow_route(&self, endpoint: &str, params: &CallParameters) -> Option<&FlightConnection> {
        if !ARROW_STREAM_ENDPOINTS.contains(&endpoint) {
            return None;
        }
        // the Arrow body needs the graph name as a plain string
        params.get("graph_name")?.as_str()?;
        self.flight.as_deref()
    }

    async fn stream_over_arrow(
        &self,
        flight: &FlightConnection,
        endpoint: &str,
        params: &CallParameters,
    ) -> Result<ResultTable> {
        let graph_name = params
            .get("graph_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let database = self.cypher.database().unwrap_or("neo4j");

        let config = arrow_configuration(endpoint, params);
        let concurrency = config
            .get("concurrency")
            .and_then(Value::as_u64)
            .map(|c| c as u32);

        debug!("Routing `{endpoint}` over Arrow for graph `{graph_name}`");
        let batches = flight
            .stream_procedure(graph_name, database, endpoint, &config, concurrency)
            .await?;
        let mut table = ResultTable::from_batches(&batches)?;
        apply_stream_renames(&mut table, &config);
        Ok(table)
    }

    /// Runs an algorithm streaming call as a server-side job: start it, poll
    /// until it is done, then stream the results as record batches.
    async fn stream_as_job(
        &self,
        flight: &FlightConnection,
        endpoint: &str,
        params: &CallParameters,
    ) -> Result<ResultTable> {
        let graph_name = params
            .get("graph_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let database = self.cypher.database().unwrap_or("neo4j");
        let config = arrow_configuration(endpoint, params);

        debug!("Running `{endpoint}` as a v2 job for graph `{graph_name}`");
        let job_id = flight
            .run_job(endpoint, graph_name, database, &config)
            .await?;
        let status = flight.wait_for_job(&job_id, &self.job_schedule).await?;
        if status.aborted() {
            return Err(ClientError::Query(format!(
                "job `{job_id}` for `{endpoint}` was aborted on the server"
            )));
        }

        let batches = flight.stream_job_results(&job_id).await?;
        ResultTable::from_batches(&batches)
    }

    fn job_route(&self, endpoint: &str, params: &CallParameters) -> Option<&FlightConnection> {
        if !self.jobs_v2 || !is_algorithm_stream(endpoint) {
            return None;
        }
        params.get("graph_name")?.as_str()?;
        self.flight.as_deref()
    }
}

/// Whether an endpoint is an algorithm streaming call, as opposed to the
/// graph catalog's bulk streams.
fn is_algorithm_stream(endpoint: &str) -> bool {
    endpoint.ends_with(".stream")
        && !endpoint.starts_with("gds.graph.")
        && !ARROW_STREAM_ENDPOINTS.contains(&endpoint)
}

/// Reshapes the positional Cypher parameters of a bulk streaming call into
/// the flat configuration body the Flight endpoint takes.
fn arrow_configuration(endpoint: &str, params: &CallParameters) -> CallParameters {
    let mut config = CallParameters::new();

    for (key, value) in params.iter() {
        match key.as_str() {
            "graph_name" => {}
            "config" => {
                if let Some(map) = value.as_object() {
                    for (k, v) in map {
                        if k != "jobId" {
                            config.insert(k.clone(), v.clone());
                        }
                    }
                }
            }
            "properties" => {
                let renamed = if endpoint.contains("relationshipPropert") {
                    "relationship_properties"
                } else {
                    "node_properties"
                };
                config.insert(renamed, value.clone());
            }
            "entities" => config.insert("node_labels", value.clone()),
            other => config.insert(other.to_string(), value.clone()),
        }
    }

    config
}

/// Post-stream column fixups the Cypher surface applies server-side but the
/// Flight endpoint leaves to the client. `gds.graph.nodeProperties.stream`
/// with `list_node_labels` returns the labels under a `labels` column that
/// the Cypher procedure calls `nodeLabels`.
fn apply_stream_renames(table: &mut ResultTable, config: &CallParameters) {
    if config.get("list_node_labels").and_then(Value::as_bool) == Some(true) {
        table.rename_column("labels", "nodeLabels");
    }
}

#[async_trait]
impl QueryRunner for GdsRunner {
    async fn run_cypher(&self, query: &str, params: CallParameters) -> Result<ResultTable> {
        self.cypher.run_cypher(query, params).await
    }

    async fn call_procedure(
        &self,
        endpoint: &str,
        params: CallParameters,
        yields: Option<&[&str]>,
    ) -> Result<ResultTable> {
        if let Some(flight) = self.arrow_route(endpoint, &params) {
            return self.stream_over_arrow(flight, endpoint, &params).await;
        }
        if let Some(flight) = self.job_route(endpoint, &params) {
            return self.stream_as_job(flight, endpoint, &params).await;
        }

        match params.job_id().map(str::to_string) {
            Some(job_id) => {
                let call = self.cypher.call_procedure(endpoint, params, yields);
                self.poller
                    .run_with_progress(self.cypher.as_ref(), &job_id, call)
                    .await
            }
            None => self.cypher.call_procedure(endpoint, params, yields).await,
        }
    }

    async fn call_function(&self, endpoint: &str, params: CallParameters) -> Result<Value> {
        self.cypher.call_function(endpoint, params).await
    }

    fn server_version(&self) -> ServerVersion {
        self.cypher.server_version()
    }

    fn database(&self) -> Option<&str> {
        self.cypher.database()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;
    use serde_json::json;

    #[tokio::test]
    async fn test_cypher_is_the_default_route() {
        let recording = Arc::new(RecordingRunner::default());
        let runner = GdsRunner::new(recording.clone(), None, false);

        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({}));
        runner
            .call_procedure("gds.pageRank.stream", params, None)
            .await
            .unwrap();

        assert_eq!(recording.procedure_calls(), vec!["gds.pageRank.stream"]);
    }

    #[tokio::test]
    async fn test_bulk_endpoints_without_arrow_fall_back_to_cypher() {
        let recording = Arc::new(RecordingRunner::default());
        let runner = GdsRunner::new(recording.clone(), None, false);

        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({}));
        runner
            .call_procedure("gds.graph.nodeProperties.stream", params, None)
            .await
            .unwrap();

        assert_eq!(
            recording.procedure_calls(),
            vec!["gds.graph.nodeProperties.stream"]
        );
        assert!(!runner.arrow_available());
    }

    #[tokio::test]
    async fn test_job_carrying_calls_are_polled() {
        let recording = Arc::new(RecordingRunner::default().slow_procedures());
        let runner = GdsRunner::new(recording.clone(), None, true);

        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({"jobId": "job-7"}));
        runner
            .call_procedure("gds.wcc.stats", params, None)
            .await
            .unwrap();

        let calls = recording.procedure_calls();
        assert!(calls.contains(&"gds.wcc.stats".to_string()));
        assert!(calls.contains(&"gds.listProgress".to_string()));
    }

    #[test]
    fn test_algorithm_stream_classification() {
        assert!(is_algorithm_stream("gds.pageRank.stream"));
        assert!(is_algorithm_stream("gds.wcc.stream"));
        assert!(!is_algorithm_stream("gds.pageRank.mutate"));
        assert!(!is_algorithm_stream("gds.graph.nodeProperties.stream"));
        assert!(!is_algorithm_stream("gds.graph.relationships.stream"));
    }

    #[test]
    fn test_arrow_configuration_reshapes_positional_params() {
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("properties", json!(["louvain", "pageRank"]))
            .with("entities", json!(["Person"]))
            .with("config", json!({"concurrency": 4, "jobId": "job-1"}));

        let config = arrow_configuration("gds.graph.nodeProperties.stream", &params);
        assert_eq!(
            config.get("node_properties"),
            Some(&json!(["louvain", "pageRank"]))
        );
        assert_eq!(config.get("node_labels"), Some(&json!(["Person"])));
        assert_eq!(config.get("concurrency"), Some(&json!(4)));
        assert!(config.get("jobId").is_none());
        assert!(config.get("graph_name").is_none());
    }

    #[test]
    fn test_streamed_labels_column_is_renamed_when_labels_were_listed() {
        let mut row = serde_json::Map::new();
        row.insert("nodeId".to_string(), json!(0));
        row.insert("labels".to_string(), json!(["Person"]));
        let mut table = ResultTable::from_rows(vec![row]);

        let config = CallParameters::new().with("list_node_labels", json!(true));
        apply_stream_renames(&mut table, &config);

        assert_eq!(table.columns(), &["nodeId", "nodeLabels"]);
        assert_eq!(table.value(0, "nodeLabels").unwrap(), &json!(["Person"]));
    }

    #[test]
    fn test_streamed_labels_column_is_kept_otherwise() {
        let mut row = serde_json::Map::new();
        row.insert("labels".to_string(), json!(["Person"]));
        let mut table = ResultTable::from_rows(vec![row]);

        apply_stream_renames(&mut table, &CallParameters::new());

        assert_eq!(table.columns(), &["labels"]);
    }

    #[test]
    fn test_arrow_configuration_relationship_properties() {
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("properties", json!(["weight"]))
            .with("relationship_types", json!(["KNOWS"]));

        let config = arrow_configuration("gds.graph.relationshipProperties.stream", &params);
        assert_eq!(
            config.get("relationship_properties"),
            Some(&json!(["weight"]))
        );
        assert_eq!(config.get("relationship_types"), Some(&json!(["KNOWS"])));
    }
}
