//! The client session
//!
//! [`GraphLink`] owns the transports: it connects over Bolt, resolves the
//! server's GDS version, discovers the Arrow Flight endpoint via
//! `gds.debug.arrow()`, and hands out the surface objects that do the actual
//! calling.

use std::sync::Arc;

use tracing::{info, warn};

use graphlink_arrow::{ArrowInfo, FlightConnectOptions, FlightConnection};
use graphlink_core::error::{ClientError, Result};
use graphlink_core::namespace::ProcedureNamespace;
use graphlink_core::params::CallParameters;
use graphlink_core::retry::RetryPolicy;
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;
use graphlink_core::version::{ServerVersion, MIN_SERVER_VERSION};
use graphlink_cypher::{CypherConfig, CypherRunner};

use crate::catalog::GraphCatalog;
use crate::model::ModelCatalog;
use crate::procedure::ProcedureCaller;
use crate::runner::GdsRunner;

/// How the session treats the server's Arrow Flight endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArrowPreference {
    /// Use Arrow when the server advertises it
    #[default]
    Auto,
    /// Never use Arrow
    Disabled,
    /// Connect to this `host:port` instead of the advertised address
    Override(String),
}

#[derive(Debug, Clone)]
pub struct GraphLinkConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub arrow: ArrowPreference,
    /// PEM root certificates for the Arrow TLS connection
    pub arrow_tls_root_certs: Option<Vec<u8>>,
    /// Log job progress while procedure calls run
    pub show_progress: bool,
    /// Tune the connection pool for a managed cloud instance
    pub aura_ds: bool,
    pub connect_retry: RetryPolicy,
}

impl Default for GraphLinkConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: None,
            arrow: ArrowPreference::Auto,
            arrow_tls_root_certs: None,
            show_progress: true,
            aura_ds: false,
            connect_retry: RetryPolicy::default(),
        }
    }
}

pub struct GraphLink {
    runner: Arc<GdsRunner>,
}

impl GraphLink {
    /// Connects both transports and verifies the server.
    pub async fn connect(config: GraphLinkConfig) -> Result<Self> {
        let cypher = CypherRunner::connect(CypherConfig {
            uri: config.uri.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            aura_ds: config.aura_ds,
            connect_retry: config.connect_retry.clone(),
            ..CypherConfig::default()
        })
        .await?;
        let cypher: Arc<dyn QueryRunner> = Arc::new(cypher);

        let (flight, jobs_v2) = connect_arrow(cypher.as_ref(), &config).await?;
        let runner = Arc::new(
            GdsRunner::new(cypher, flight, config.show_progress).with_v2_jobs(jobs_v2),
        );

        info!(
            "Connected to GDS {} (arrow: {})",
            runner.server_version(),
            runner.arrow_available()
        );
        Ok(Self { runner })
    }

    /// Wraps an existing transport stack, for embedding and tests.
    pub fn from_runner(runner: Arc<GdsRunner>) -> Self {
        Self { runner }
    }

    /// A procedure caller for a dotted endpoint path, e.g. `gds.pageRank`.
    pub fn call(&self, path: &str) -> Result<ProcedureCaller> {
        let namespace = ProcedureNamespace::parse(path)?;
        Ok(ProcedureCaller::new(self.runner.clone(), namespace))
    }

    /// The graph catalog surface.
    pub fn graph(&self) -> GraphCatalog {
        GraphCatalog::new(self.runner.clone())
    }

    /// The model catalog surface.
    pub fn model(&self) -> ModelCatalog {
        ModelCatalog::new(self.runner.clone())
    }

    /// Runs raw Cypher against the session database.
    pub async fn run_cypher(&self, query: &str, params: CallParameters) -> Result<ResultTable> {
        self.runner.run_cypher(query, params).await
    }

    pub fn server_version(&self) -> ServerVersion {
        self.runner.server_version()
    }

    pub fn database(&self) -> Option<&str> {
        self.runner.database()
    }

    pub fn arrow_available(&self) -> bool {
        self.runner.arrow_available()
    }

    pub fn runner(&self) -> &Arc<GdsRunner> {
        &self.runner
    }

    /// Ends the session. Both transports close once the last outstanding
    /// surface handle (graphs, models, callers) is dropped.
    pub fn close(self) {
        drop(self.runner);
    }
}

async fn connect_arrow(
    cypher: &dyn QueryRunner,
    config: &GraphLinkConfig,
) -> Result<(Option<Arc<FlightConnection>>, bool)> {
    // servers below the supported floor predate the Flight endpoint
    if cypher.server_version() < MIN_SERVER_VERSION {
        warn!(
            "GDS {} predates Arrow support, staying on Cypher",
            cypher.server_version()
        );
        return Ok((None, false));
    }

    let mut jobs_v2 = false;

    let (host, port) = match &config.arrow {
        ArrowPreference::Disabled => return Ok((None, false)),
        ArrowPreference::Override(address) => parse_override(address)?,
        ArrowPreference::Auto => {
            let info = match cypher
                .call_procedure("gds.debug.arrow", CallParameters::new(), None)
                .await
                .and_then(|table| ArrowInfo::from_table(&table))
            {
                Ok(info) => info,
                Err(e) => {
                    warn!("Arrow discovery failed, staying on Cypher: {e}");
                    return Ok((None, false));
                }
            };
            if !info.available() {
                return Ok((None, false));
            }
            jobs_v2 = info.versions.iter().any(|v| v == "v2");
            info.host_and_port()?
        }
    };

    let options = FlightConnectOptions {
        host,
        port,
        encrypted: uri_uses_encryption(&config.uri),
        tls_root_certs: config.arrow_tls_root_certs.clone(),
        auth: Some((config.user.clone(), config.password.clone())),
        user_agent: None,
        retry: config.connect_retry.clone(),
    };

    match FlightConnection::connect(options).await {
        Ok(connection) => Ok((Some(Arc::new(connection)), jobs_v2)),
        // an explicit override must not silently degrade
        Err(e) if matches!(config.arrow, ArrowPreference::Override(_)) => Err(e),
        Err(e) => {
            warn!("Arrow connection failed, staying on Cypher: {e}");
            Ok((None, false))
        }
    }
}

fn parse_override(address: &str) -> Result<(String, u16)> {
    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        ClientError::Config(format!("invalid Arrow address override `{address}`"))
    })?;
    let port = port.parse::<u16>().map_err(|_| {
        ClientError::Config(format!("invalid Arrow address override `{address}`"))
    })?;
    Ok((host.to_string(), port))
}

/// Whether the Bolt URI scheme asks for TLS (`neo4j+s`, `bolt+ssc`, ...).
fn uri_uses_encryption(uri: &str) -> bool {
    uri.split("://")
        .next()
        .map(|scheme| scheme.contains("+s"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;
    use serde_json::json;

    #[test]
    fn test_uri_encryption_detection() {
        assert!(uri_uses_encryption("neo4j+s://host:7687"));
        assert!(uri_uses_encryption("bolt+ssc://host:7687"));
        assert!(!uri_uses_encryption("neo4j://host:7687"));
        assert!(!uri_uses_encryption("bolt://host:7687"));
    }

    #[test]
    fn test_override_parsing() {
        assert_eq!(
            parse_override("flight.internal:8491").unwrap(),
            ("flight.internal".to_string(), 8491)
        );
        assert!(parse_override("no-port").is_err());
        assert!(parse_override("host:notaport").is_err());
    }

    #[tokio::test]
    async fn test_call_builds_a_caller_from_a_path() {
        let recording = Arc::new(RecordingRunner::default());
        let runner = Arc::new(GdsRunner::new(recording.clone(), None, false));
        let client = GraphLink::from_runner(runner);

        client
            .call("gds.pageRank")
            .unwrap()
            .stats("persons", json!({}))
            .await
            .unwrap();

        assert!(recording.params_for("gds.pageRank.stats").is_some());
    }

    #[tokio::test]
    async fn test_arrow_discovery_is_skipped_on_old_servers() {
        let recording = Arc::new(RecordingRunner::default().with_version(ServerVersion::new(2, 0, 5)));

        let (flight, jobs_v2) = connect_arrow(recording.as_ref(), &GraphLinkConfig::default())
            .await
            .unwrap();

        assert!(flight.is_none());
        assert!(!jobs_v2);
        assert!(recording.procedure_calls().is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_the_transports() {
        let recording = Arc::new(RecordingRunner::default());
        let runner = Arc::new(GdsRunner::new(recording.clone(), None, false));
        let client = GraphLink::from_runner(runner);

        client.close();

        assert_eq!(Arc::strong_count(&recording), 1);
    }

    #[tokio::test]
    async fn test_call_rejects_invalid_paths() {
        let recording = Arc::new(RecordingRunner::default());
        let runner = Arc::new(GdsRunner::new(recording, None, false));
        let client = GraphLink::from_runner(runner);

        assert!(client.call("gds..pageRank").is_err());
        assert!(client.call("gds.page-rank").is_err());
    }
}
