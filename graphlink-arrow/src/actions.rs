//! Server-side graph and database creation actions
//!
//! Every bulk import starts with one of the `CREATE_*` actions, continues
//! with record-batch uploads, and is sealed with the matching `*_LOAD_DONE`
//! action. The bodies use the snake_case field names the Flight endpoint
//! expects, which differ from the camelCase of the Cypher surface.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use graphlink_core::error::Result;

use crate::client::FlightConnection;

/// Settings for `v1/CREATE_GRAPH` and `v1/CREATE_GRAPH_FROM_TRIPLETS`.
#[derive(Debug, Clone, Default)]
pub struct CreateGraphOptions {
    pub concurrency: Option<u32>,
    pub undirected_relationship_types: Vec<String>,
    pub inverse_indexed_relationship_types: Vec<String>,
}

/// Settings for `v1/CREATE_DATABASE`.
#[derive(Debug, Clone, Default)]
pub struct CreateDatabaseOptions {
    pub id_type: Option<String>,
    pub id_property: Option<String>,
    pub db_format: Option<String>,
    pub concurrency: Option<u32>,
    pub force: bool,
    pub high_io: bool,
    pub use_bad_collector: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeLoadDoneResult {
    pub name: String,
    pub node_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipLoadDoneResult {
    pub name: String,
    pub relationship_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripletLoadDoneResult {
    pub name: String,
    pub node_count: u64,
    pub relationship_count: u64,
}

impl FlightConnection {
    /// Opens a node/relationship import session for a new in-memory graph.
    pub async fn create_graph(
        &self,
        graph_name: &str,
        database: &str,
        options: &CreateGraphOptions,
    ) -> Result<()> {
        let mut body = json!({
            "name": graph_name,
            "database_name": database,
        });
        apply_graph_options(&mut body, options);

        info!("Creating graph `{graph_name}` over Arrow");
        self.do_action_json("CREATE_GRAPH", &body).await?;
        Ok(())
    }

    /// Like [`create_graph`](Self::create_graph), but the upload consists of
    /// (source, target, type) triplets instead of separate node and
    /// relationship streams.
    pub async fn create_graph_from_triplets(
        &self,
        graph_name: &str,
        database: &str,
        options: &CreateGraphOptions,
    ) -> Result<()> {
        let mut body = json!({
            "name": graph_name,
            "database_name": database,
        });
        apply_graph_options(&mut body, options);

        info!("Creating graph `{graph_name}` from triplets over Arrow");
        self.do_action_json("CREATE_GRAPH_FROM_TRIPLETS", &body)
            .await?;
        Ok(())
    }

    /// Opens an import session that materializes a new Neo4j database
    /// instead of an in-memory graph.
    pub async fn create_database(
        &self,
        database: &str,
        options: &CreateDatabaseOptions,
    ) -> Result<()> {
        let mut body = json!({
            "name": database,
            "force": options.force,
            "high_io": options.high_io,
            "use_bad_collector": options.use_bad_collector,
        });
        if let Some(id_type) = &options.id_type {
            body["id_type"] = json!(id_type);
        }
        if let Some(id_property) = &options.id_property {
            body["id_property"] = json!(id_property);
        }
        if let Some(db_format) = &options.db_format {
            body["db_format"] = json!(db_format);
        }
        if let Some(concurrency) = options.concurrency {
            body["concurrency"] = json!(concurrency);
        }

        info!("Creating database `{database}` over Arrow");
        self.do_action_json("CREATE_DATABASE", &body).await?;
        Ok(())
    }

    /// Seals the node stream. The server replies with the node count it saw.
    pub async fn node_load_done(&self, graph_name: &str) -> Result<NodeLoadDoneResult> {
        let result = self
            .do_action_json("NODE_LOAD_DONE", &json!({"name": graph_name}))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Seals the relationship stream and finishes the import.
    pub async fn relationship_load_done(
        &self,
        graph_name: &str,
    ) -> Result<RelationshipLoadDoneResult> {
        let result = self
            .do_action_json("RELATIONSHIP_LOAD_DONE", &json!({"name": graph_name}))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Seals a triplet stream and finishes the import.
    pub async fn triplet_load_done(&self, graph_name: &str) -> Result<TripletLoadDoneResult> {
        let result = self
            .do_action_json("TRIPLET_LOAD_DONE", &json!({"name": graph_name}))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Aborts an import session, discarding whatever has been uploaded.
    pub async fn abort(&self, graph_name: &str) -> Result<()> {
        self.do_action_json("ABORT", &json!({"name": graph_name}))
            .await?;
        Ok(())
    }
}

fn apply_graph_options(body: &mut Value, options: &CreateGraphOptions) {
    if let Some(concurrency) = options.concurrency {
        body["concurrency"] = json!(concurrency);
    }
    if !options.undirected_relationship_types.is_empty() {
        body["undirected_relationship_types"] = json!(options.undirected_relationship_types);
    }
    if !options.inverse_indexed_relationship_types.is_empty() {
        body["inverse_indexed_relationship_types"] =
            json!(options.inverse_indexed_relationship_types);
    }
}
