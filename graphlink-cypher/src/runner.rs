//! Cypher query runner over the Bolt protocol

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use graphlink_core::error::{ClientError, Result};
use graphlink_core::params::CallParameters;
use graphlink_core::retry::{retry_with_backoff, RetryPolicy};
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;
use graphlink_core::version::{ServerVersion, MIN_SERVER_VERSION};

use crate::convert::json_to_bolt;
use crate::suggest::suggestive_error_message;

#[derive(Debug, Clone)]
pub struct CypherConfig {
    /// Bolt connection URI, e.g. `neo4j://localhost:7687`
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Database to run queries against; the server default when `None`
    pub database: Option<String>,
    /// Tune the connection pool for a managed cloud instance
    pub aura_ds: bool,
    pub max_connections: usize,
    /// Retry policy for establishing and verifying the connection
    pub connect_retry: RetryPolicy,
}

impl Default for CypherConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            aura_ds: false,
            max_connections: 16,
            connect_retry: RetryPolicy::default(),
        }
    }
}

pub struct CypherRunner {
    graph: neo4rs::Graph,
    database: Option<String>,
    server_version: ServerVersion,
}

impl CypherRunner {
    /// Connects, verifies connectivity, and resolves the server's GDS
    /// version. Fails with a dedicated message when the server has no GDS
    /// installation at all.
    pub async fn connect(config: CypherConfig) -> Result<Self> {
        let mut builder = neo4rs::ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password);

        // managed instances drop idle connections aggressively; neo4rs has
        // no max-connection-lifetime setting yet, so only the pool size is
        // tuned here
        let max_connections = if config.aura_ds { 50 } else { config.max_connections };
        builder = builder.max_connections(max_connections);

        if let Some(database) = &config.database {
            builder = builder.db(database.as_str());
        }

        let driver_config = builder
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let graph = neo4rs::Graph::connect(driver_config)
            .await
            .map_err(map_bolt_error)?;

        Self::with_driver(graph, config.database, &config.connect_retry).await
    }

    /// Wraps an already constructed driver.
    pub async fn with_driver(
        graph: neo4rs::Graph,
        database: Option<String>,
        connect_retry: &RetryPolicy,
    ) -> Result<Self> {
        verify_connectivity(&graph, connect_retry).await?;

        let mut runner = Self {
            graph,
            database,
            server_version: MIN_SERVER_VERSION,
        };
        runner.server_version = runner.resolve_server_version().await?;

        if runner.server_version < MIN_SERVER_VERSION {
            warn!(
                "The server runs GDS {} which is older than the oldest supported version {}",
                runner.server_version, MIN_SERVER_VERSION
            );
        }

        Ok(runner)
    }

    async fn resolve_server_version(&self) -> Result<ServerVersion> {
        let result = self
            .execute("RETURN gds.version() AS version", &CallParameters::new())
            .await;

        match result {
            Ok(rows) => {
                let table = ResultTable::from_rows(rows);
                let version = table.get_str(0, "version")?;
                ServerVersion::from_string(version)
            }
            Err(e) if e.to_string().contains("Unknown function 'gds.version'") => {
                Err(ClientError::NotFound(
                    "The Graph Data Science library is not installed on the server".to_string(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// The installed procedure names, for error suggestions.
    pub async fn list_endpoints(&self) -> Result<Vec<String>> {
        let rows = self
            .execute("CALL gds.list() YIELD name", &CallParameters::new())
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn execute(
        &self,
        query: &str,
        params: &CallParameters,
    ) -> Result<Vec<Map<String, Value>>> {
        debug!("Running Cypher: {query}");

        let mut bolt_query = neo4rs::query(query);
        for (key, value) in params.iter() {
            bolt_query = bolt_query.param(key.as_str(), json_to_bolt(value));
        }

        let mut stream = self
            .graph
            .execute(bolt_query)
            .await
            .map_err(map_bolt_error)?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(map_bolt_error)? {
            let value: Value = row
                .to::<Value>()
                .map_err(|e| ClientError::Serialization(e.to_string()))?;
            match value {
                Value::Object(map) => rows.push(map),
                other => {
                    return Err(ClientError::Serialization(format!(
                        "expected a record object, got {other}"
                    )))
                }
            }
        }

        Ok(rows)
    }

    /// Turns an unknown-procedure driver error into a suggestive one.
    async fn improve_procedure_error(&self, endpoint: &str, error: ClientError) -> ClientError {
        if !error
            .to_string()
            .contains("There is no procedure with the name")
        {
            return error;
        }

        match self.list_endpoints().await {
            Ok(endpoints) => {
                ClientError::UnknownProcedure(suggestive_error_message(endpoint, &endpoints))
            }
            Err(_) => error,
        }
    }
}

/// Renders the `CALL` statement for a procedure invocation.
pub fn assemble_procedure_call(
    endpoint: &str,
    params: &CallParameters,
    yields: Option<&[&str]>,
) -> String {
    let yields_clause = match yields {
        Some(columns) if !columns.is_empty() => format!(" YIELD {}", columns.join(", ")),
        _ => String::new(),
    };
    format!("CALL {endpoint}({}){yields_clause}", params.placeholder_str())
}

/// Renders the `RETURN` statement for a function invocation.
pub fn assemble_function_call(endpoint: &str, params: &CallParameters) -> String {
    format!("RETURN {endpoint}({})", params.placeholder_str())
}

#[async_trait]
impl QueryRunner for CypherRunner {
    async fn run_cypher(&self, query: &str, params: CallParameters) -> Result<ResultTable> {
        let rows = self.execute(query, &params).await?;
        Ok(ResultTable::from_rows(rows))
    }

    async fn call_procedure(
        &self,
        endpoint: &str,
        params: CallParameters,
        yields: Option<&[&str]>,
    ) -> Result<ResultTable> {
        let query = assemble_procedure_call(endpoint, &params, yields);

        match self.execute(&query, &params).await {
            Ok(mut rows) => {
                // an explicit YIELD fixes the column order the driver loses
                let table = match yields {
                    Some(columns) => ResultTable::new(
                        columns.iter().map(|c| c.to_string()).collect(),
                        std::mem::take(&mut rows),
                    ),
                    None => ResultTable::from_rows(rows),
                };
                Ok(table)
            }
            Err(e) => Err(self.improve_procedure_error(endpoint, e).await),
        }
    }

    async fn call_function(&self, endpoint: &str, params: CallParameters) -> Result<Value> {
        let query = assemble_function_call(endpoint, &params);
        let rows = self.execute(&query, &params).await?;
        let table = ResultTable::from_rows(rows);
        Ok(table.single_value()?.clone())
    }

    fn server_version(&self) -> ServerVersion {
        self.server_version
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

async fn verify_connectivity(graph: &neo4rs::Graph, policy: &RetryPolicy) -> Result<()> {
    retry_with_backoff(policy, "verify connectivity", || async {
        graph
            .run(neo4rs::query("RETURN 1"))
            .await
            .map_err(map_bolt_error)
    })
    .await
}

fn map_bolt_error(e: neo4rs::Error) -> ClientError {
    let message = e.to_string();
    match e {
        neo4rs::Error::ConnectionError => ClientError::Connection(message),
        neo4rs::Error::IOError { .. } => ClientError::Connection(message),
        neo4rs::Error::AuthenticationError(_) => ClientError::Authentication(message),
        _ => ClientError::Query(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assemble_procedure_call() {
        let params = CallParameters::new()
            .with("graph_name", "persons")
            .with("config", json!({}));

        assert_eq!(
            assemble_procedure_call("gds.pageRank.stream", &params, None),
            "CALL gds.pageRank.stream($graph_name, $config)"
        );
    }

    #[test]
    fn test_assemble_procedure_call_with_yields() {
        let params = CallParameters::new().with("model_name", "my-model");

        assert_eq!(
            assemble_procedure_call("gds.model.exists", &params, Some(&["exists"])),
            "CALL gds.model.exists($model_name) YIELD exists"
        );
    }

    #[test]
    fn test_assemble_procedure_call_without_params() {
        assert_eq!(
            assemble_procedure_call("gds.graph.list", &CallParameters::new(), None),
            "CALL gds.graph.list()"
        );
    }

    #[test]
    fn test_assemble_function_call() {
        assert_eq!(
            assemble_function_call("gds.version", &CallParameters::new()),
            "RETURN gds.version()"
        );
    }
}
