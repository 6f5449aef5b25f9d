//! Procedure call builder
//!
//! The dispatch entry of the client: grow a dotted endpoint path segment by
//! segment, then finish with an execution mode. `caller("gds").append("pageRank")`
//! followed by `.stream(graph, config)` turns into
//! `CALL gds.pageRank.stream($graph_name, $config)` on the wire, with tier
//! segments resolved against the server version and a job id injected so the
//! progress poller can follow the run.

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use graphlink_core::error::{ClientError, Result};
use graphlink_core::namespace::ProcedureNamespace;
use graphlink_core::params::CallParameters;
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;
use graphlink_core::version::TIERS_DROPPED_VERSION;

use crate::runner::GdsRunner;

#[derive(Clone)]
pub struct ProcedureCaller {
    runner: Arc<GdsRunner>,
    namespace: ProcedureNamespace,
    estimate: bool,
}

impl ProcedureCaller {
    pub(crate) fn new(runner: Arc<GdsRunner>, namespace: ProcedureNamespace) -> Self {
        Self {
            runner,
            namespace,
            estimate: false,
        }
    }

    /// Extends the endpoint path by one segment.
    pub fn append(mut self, segment: impl Into<String>) -> Result<Self> {
        self.namespace = self.namespace.append(segment)?;
        Ok(self)
    }

    /// Switches the caller to the memory-estimation variant of the endpoint.
    pub fn estimate(mut self) -> Self {
        self.estimate = true;
        self
    }

    /// The endpoint name as it will go on the wire, with tier segments
    /// dropped for servers that promoted them.
    pub fn endpoint(&self, mode: Option<&str>) -> String {
        let namespace = if self.runner.server_version() >= TIERS_DROPPED_VERSION {
            self.namespace.without_tier()
        } else {
            self.namespace.clone()
        };

        let mut endpoint = namespace.to_dotted();
        if let Some(mode) = mode {
            endpoint.push('.');
            endpoint.push_str(mode);
        }
        if self.estimate {
            endpoint.push_str(".estimate");
        }
        endpoint
    }

    pub async fn stream(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.execute(Some("stream"), graph_name, config).await
    }

    pub async fn stats(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.execute(Some("stats"), graph_name, config).await
    }

    pub async fn mutate(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.execute(Some("mutate"), graph_name, config).await
    }

    pub async fn write(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.execute(Some("write"), graph_name, config).await
    }

    /// Calls the endpoint as-is with explicit parameters, for surfaces that
    /// do not follow the graph-plus-config convention.
    pub async fn run(&self, params: CallParameters, yields: Option<&[&str]>) -> Result<ResultTable> {
        self.runner
            .call_procedure(&self.endpoint(None), params, yields)
            .await
    }

    /// Calls the endpoint as a Cypher function.
    pub async fn function(&self, params: CallParameters) -> Result<Value> {
        self.runner
            .call_function(&self.endpoint(None), params)
            .await
    }

    async fn execute(
        &self,
        mode: Option<&str>,
        graph_name: &str,
        config: Value,
    ) -> Result<ResultTable> {
        let mut config = into_config_map(config)?;

        // estimation runs synchronously, nothing to poll
        if !self.estimate && !config.contains_key("jobId") {
            config.insert("jobId".to_string(), Value::from(Uuid::new_v4().to_string()));
        }

        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("config", Value::Object(config));

        self.runner
            .call_procedure(&self.endpoint(mode), params, None)
            .await
    }
}

fn into_config_map(config: Value) -> Result<Map<String, Value>> {
    match config {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ClientError::Config(format!(
            "procedure configuration must be a map, got {other}"
        ))),
    }
}
