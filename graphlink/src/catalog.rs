//! Graph catalog endpoints
//!
//! Projection, listing, filtering, export, and the property/topology
//! maintenance procedures under `gds.graph.*`. Streaming calls dispatch
//! through the transport-selecting runner and so ride Arrow Flight when the
//! server offers it.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use graphlink_core::error::{ClientError, Result};
use graphlink_core::params::CallParameters;
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;

use crate::graph_object::Graph;
use crate::runner::GdsRunner;

pub struct GraphCatalog {
    runner: Arc<GdsRunner>,
}

impl GraphCatalog {
    pub(crate) fn new(runner: Arc<GdsRunner>) -> Self {
        Self { runner }
    }

    /// Projects a named graph into the server's graph catalog and returns a
    /// handle to it together with the projection summary.
    pub async fn project(
        &self,
        graph_name: &str,
        node_projection: Value,
        relationship_projection: Value,
        config: Value,
    ) -> Result<(Graph, ResultTable)> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("node_spec", node_projection)
            .with("relationship_spec", relationship_projection)
            .with("config", config);

        info!("Projecting graph `{graph_name}`");
        let table = self
            .runner
            .call_procedure("gds.graph.project", params, None)
            .await?;

        Ok((Graph::new(self.runner.clone(), graph_name), table))
    }

    /// Memory estimation for a projection with the same arguments.
    pub async fn project_estimate(
        &self,
        node_projection: Value,
        relationship_projection: Value,
        config: Value,
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("node_spec", node_projection)
            .with("relationship_spec", relationship_projection)
            .with("config", config);

        self.runner
            .call_procedure("gds.graph.project.estimate", params, None)
            .await
    }

    /// All catalog entries, or the entry for one graph.
    pub async fn list(&self, graph_name: Option<&str>) -> Result<ResultTable> {
        let params = match graph_name {
            Some(name) => CallParameters::new().with("graph_name", name),
            None => CallParameters::new(),
        };
        self.runner
            .call_procedure("gds.graph.list", params, None)
            .await
    }

    pub async fn exists(&self, graph_name: &str) -> Result<bool> {
        let params = CallParameters::new().with("graph_name", graph_name);
        let table = self
            .runner
            .call_procedure("gds.graph.exists", params, Some(&["exists"]))
            .await?;
        table.get_bool(0, "exists")
    }

    /// A handle for an existing graph; fails when the catalog has no entry.
    pub async fn get(&self, graph_name: &str) -> Result<Graph> {
        if !self.exists(graph_name).await? {
            return Err(ClientError::NotFound(format!(
                "Graph with name `{graph_name}` does not exist"
            )));
        }
        Ok(Graph::new(self.runner.clone(), graph_name))
    }

    pub async fn drop(&self, graph_name: &str, fail_if_missing: bool) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("fail_if_missing", fail_if_missing);

        info!("Dropping graph `{graph_name}`");
        self.runner
            .call_procedure("gds.graph.drop", params, None)
            .await
    }

    /// Projects a filtered subgraph of an existing graph.
    pub async fn filter(
        &self,
        graph_name: &str,
        from_graph: &str,
        node_filter: &str,
        relationship_filter: &str,
        config: Value,
    ) -> Result<(Graph, ResultTable)> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("from_graph_name", from_graph)
            .with("node_filter", node_filter)
            .with("relationship_filter", relationship_filter)
            .with("config", config);

        let table = self
            .runner
            .call_procedure("gds.graph.filter", params, None)
            .await?;

        Ok((Graph::new(self.runner.clone(), graph_name), table))
    }

    /// Exports a catalog graph into a new Neo4j database.
    pub async fn export(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("config", config);
        self.runner
            .call_procedure("gds.graph.export", params, None)
            .await
    }

    /// Streams node property values; `labels` filters to the given node
    /// labels, `["*"]` meaning all of them.
    pub async fn stream_node_properties(
        &self,
        graph_name: &str,
        properties: &[&str],
        labels: &[&str],
        config: Value,
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("properties", json!(properties))
            .with("entities", json!(labels))
            .with("config", config);

        self.runner
            .call_procedure("gds.graph.nodeProperties.stream", params, None)
            .await
    }

    /// Writes graph-resident node properties back to the database.
    pub async fn write_node_properties(
        &self,
        graph_name: &str,
        properties: &[&str],
        labels: &[&str],
        config: Value,
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("properties", json!(properties))
            .with("entities", json!(labels))
            .with("config", config);

        self.runner
            .call_procedure("gds.graph.nodeProperties.write", params, None)
            .await
    }

    pub async fn drop_node_properties(
        &self,
        graph_name: &str,
        properties: &[&str],
        config: Value,
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("properties", json!(properties))
            .with("config", config);

        self.runner
            .call_procedure("gds.graph.nodeProperties.drop", params, None)
            .await
    }

    /// Streams the graph's relationship topology.
    pub async fn stream_relationships(
        &self,
        graph_name: &str,
        relationship_types: &[&str],
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("relationship_types", json!(relationship_types));

        self.runner
            .call_procedure("gds.graph.relationships.stream", params, None)
            .await
    }

    /// Streams relationship property values for the given types.
    pub async fn stream_relationship_properties(
        &self,
        graph_name: &str,
        properties: &[&str],
        relationship_types: &[&str],
        config: Value,
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("properties", json!(properties))
            .with("relationship_types", json!(relationship_types))
            .with("config", config);

        self.runner
            .call_procedure("gds.graph.relationshipProperties.stream", params, None)
            .await
    }

    /// Writes one relationship type (optionally with a property) back to
    /// the database.
    pub async fn write_relationship(
        &self,
        graph_name: &str,
        relationship_type: &str,
        relationship_property: Option<&str>,
        config: Value,
    ) -> Result<ResultTable> {
        let mut params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("relationship_type", relationship_type);
        if let Some(property) = relationship_property {
            params.insert("relationship_property", property);
        }
        params.insert("config", config);

        self.runner
            .call_procedure("gds.graph.relationship.write", params, None)
            .await
    }

    pub async fn drop_relationships(
        &self,
        graph_name: &str,
        relationship_type: &str,
    ) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("relationship_type", relationship_type);

        self.runner
            .call_procedure("gds.graph.relationships.drop", params, None)
            .await
    }
}
