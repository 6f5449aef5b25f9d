//! Handle to a catalog graph
//!
//! A [`Graph`] is a name plus a runner; every accessor is a fresh lookup of
//! the graph's `gds.graph.list` entry, so the handle never goes stale.

use std::sync::Arc;

use serde_json::{Map, Value};

use graphlink_core::error::{ClientError, Result};
use graphlink_core::params::CallParameters;
use graphlink_core::runner::QueryRunner;

use crate::runner::GdsRunner;

#[derive(Clone)]
pub struct Graph {
    runner: Arc<GdsRunner>,
    name: String,
}

impl Graph {
    pub(crate) fn new(runner: Arc<GdsRunner>, name: &str) -> Self {
        Self {
            runner,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The graph's catalog entry.
    async fn entry(&self) -> Result<Map<String, Value>> {
        let params = CallParameters::new().with("graph_name", self.name.as_str());
        let table = self
            .runner
            .call_procedure("gds.graph.list", params, None)
            .await?;

        if table.is_empty() {
            return Err(ClientError::NotFound(format!(
                "Graph with name `{}` does not exist",
                self.name
            )));
        }
        Ok(table.single_row()?.clone())
    }

    async fn field(&self, key: &str) -> Result<Value> {
        let entry = self.entry().await?;
        entry
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::MissingField(key.to_string()))
    }

    pub async fn database(&self) -> Result<String> {
        self.field("database")
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::MissingField("database".to_string()))
    }

    pub async fn node_count(&self) -> Result<i64> {
        self.field("nodeCount")
            .await?
            .as_i64()
            .ok_or_else(|| ClientError::MissingField("nodeCount".to_string()))
    }

    pub async fn relationship_count(&self) -> Result<i64> {
        self.field("relationshipCount")
            .await?
            .as_i64()
            .ok_or_else(|| ClientError::MissingField("relationshipCount".to_string()))
    }

    pub async fn density(&self) -> Result<f64> {
        self.field("density")
            .await?
            .as_f64()
            .ok_or_else(|| ClientError::MissingField("density".to_string()))
    }

    pub async fn memory_usage(&self) -> Result<String> {
        self.field("memoryUsage")
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::MissingField("memoryUsage".to_string()))
    }

    pub async fn size_in_bytes(&self) -> Result<i64> {
        self.field("sizeInBytes")
            .await?
            .as_i64()
            .ok_or_else(|| ClientError::MissingField("sizeInBytes".to_string()))
    }

    pub async fn creation_time(&self) -> Result<Value> {
        self.field("creationTime").await
    }

    pub async fn modification_time(&self) -> Result<Value> {
        self.field("modificationTime").await
    }

    pub async fn configuration(&self) -> Result<Value> {
        self.field("configuration").await
    }

    pub async fn degree_distribution(&self) -> Result<Value> {
        self.field("degreeDistribution").await
    }

    pub async fn node_labels(&self) -> Result<Vec<String>> {
        Ok(self.schema_keys("nodes").await?)
    }

    pub async fn relationship_types(&self) -> Result<Vec<String>> {
        Ok(self.schema_keys("relationships").await?)
    }

    /// The property names the schema declares for one node label.
    pub async fn node_properties(&self, label: &str) -> Result<Vec<String>> {
        self.schema_entry_keys("nodes", label).await
    }

    /// The property names the schema declares for one relationship type.
    pub async fn relationship_properties(&self, relationship_type: &str) -> Result<Vec<String>> {
        self.schema_entry_keys("relationships", relationship_type)
            .await
    }

    pub async fn exists(&self) -> Result<bool> {
        let params = CallParameters::new().with("graph_name", self.name.as_str());
        let table = self
            .runner
            .call_procedure("gds.graph.exists", params, Some(&["exists"]))
            .await?;
        table.get_bool(0, "exists")
    }

    pub async fn drop(&self, fail_if_missing: bool) -> Result<()> {
        let params = CallParameters::new()
            .with("graph_name", self.name.as_str())
            .with("fail_if_missing", fail_if_missing);
        self.runner
            .call_procedure("gds.graph.drop", params, None)
            .await?;
        Ok(())
    }

    async fn schema_keys(&self, section: &str) -> Result<Vec<String>> {
        let schema = self.field("schema").await?;
        let keys = schema
            .get(section)
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        Ok(keys)
    }

    async fn schema_entry_keys(&self, section: &str, entry: &str) -> Result<Vec<String>> {
        let schema = self.field("schema").await?;
        let keys = schema
            .get(section)
            .and_then(|s| s.get(entry))
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        Ok(keys)
    }
}
