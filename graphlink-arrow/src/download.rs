//! Record batch download
//!
//! Streams the results of a server-side procedure (node properties,
//! relationship topology, and friends) back to the client as Arrow record
//! batches, bypassing Bolt entirely.

use arrow::record_batch::RecordBatch;
use serde_json::{json, Map, Value};
use tracing::debug;

use graphlink_core::error::Result;
use graphlink_core::params::CallParameters;

use crate::client::FlightConnection;

impl FlightConnection {
    /// Runs a streaming procedure server-side and downloads its result as
    /// record batches.
    pub async fn stream_procedure(
        &self,
        graph_name: &str,
        database: &str,
        procedure_name: &str,
        configuration: &CallParameters,
        concurrency: Option<u32>,
    ) -> Result<Vec<RecordBatch>> {
        let body = stream_body(graph_name, database, procedure_name, configuration, concurrency);
        debug!("Streaming `{procedure_name}` for graph `{graph_name}` over Arrow");
        self.do_get_batches(&body).await
    }
}

fn stream_body(
    graph_name: &str,
    database: &str,
    procedure_name: &str,
    configuration: &CallParameters,
    concurrency: Option<u32>,
) -> Value {
    let configuration: Map<String, Value> = configuration
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut body = json!({
        "graph_name": graph_name,
        "database_name": database,
        "procedure_name": procedure_name,
        "configuration": configuration,
    });
    if let Some(concurrency) = concurrency {
        body["concurrency"] = json!(concurrency);
    }
    body
}
