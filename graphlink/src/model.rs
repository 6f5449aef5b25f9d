//! Model catalog endpoints
//!
//! Machine-learning models trained server-side live in the model catalog.
//! Servers older than 2.5 expose the catalog under `gds.beta.model.*`; the
//! namespace resolution picks the right prefix per server version. Their
//! listing rows also nest name, type, and metrics inside a `modelInfo` map,
//! which the accessors flatten.

use std::sync::Arc;

use serde_json::{Map, Value};

use graphlink_core::error::{ClientError, Result};
use graphlink_core::namespace::ProcedureNamespace;
use graphlink_core::params::CallParameters;
use graphlink_core::runner::QueryRunner;
use graphlink_core::table::ResultTable;
use graphlink_core::version::TIERS_DROPPED_VERSION;

use crate::runner::GdsRunner;

pub struct ModelCatalog {
    runner: Arc<GdsRunner>,
}

impl ModelCatalog {
    pub(crate) fn new(runner: Arc<GdsRunner>) -> Self {
        Self { runner }
    }

    fn endpoint(&self, op: &str) -> Result<String> {
        catalog_endpoint(&self.runner, op)
    }

    pub async fn list(&self) -> Result<ResultTable> {
        let table = self
            .runner
            .call_procedure(&self.endpoint("list")?, CallParameters::new(), None)
            .await?;
        Ok(flatten_model_rows(table))
    }

    pub async fn exists(&self, model_name: &str) -> Result<bool> {
        let params = CallParameters::new().with("model_name", model_name);
        let table = self
            .runner
            .call_procedure(&self.endpoint("exists")?, params, Some(&["exists"]))
            .await?;
        table.get_bool(0, "exists")
    }

    /// A handle for an existing model; fails when the catalog has no entry.
    pub async fn get(&self, model_name: &str) -> Result<Model> {
        if !self.exists(model_name).await? {
            return Err(ClientError::NotFound(format!(
                "Model with name `{model_name}` does not exist"
            )));
        }
        Ok(Model::new(self.runner.clone(), model_name))
    }

    pub async fn drop(&self, model_name: &str, fail_if_missing: bool) -> Result<ResultTable> {
        let params = CallParameters::new()
            .with("model_name", model_name)
            .with("fail_if_missing", fail_if_missing);
        let table = self
            .runner
            .call_procedure(&self.endpoint("drop")?, params, None)
            .await?;
        Ok(flatten_model_rows(table))
    }

    /// Makes a model visible to all users of the server.
    pub async fn publish(&self, model_name: &str) -> Result<ResultTable> {
        // publishing sat in the alpha tier before the promotion
        let namespace = ProcedureNamespace::parse("gds.alpha.model.publish")?;
        let endpoint = if self.runner.server_version() >= TIERS_DROPPED_VERSION {
            namespace.without_tier().to_dotted()
        } else {
            namespace.to_dotted()
        };

        let params = CallParameters::new().with("model_name", model_name);
        let table = self.runner.call_procedure(&endpoint, params, None).await?;
        Ok(flatten_model_rows(table))
    }
}

#[derive(Clone)]
pub struct Model {
    runner: Arc<GdsRunner>,
    name: String,
}

impl Model {
    pub(crate) fn new(runner: Arc<GdsRunner>, name: &str) -> Self {
        Self {
            runner,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The model's catalog entry, flattened across server versions.
    async fn entry(&self) -> Result<Map<String, Value>> {
        let params = CallParameters::new().with("model_name", self.name.as_str());
        let table = self
            .runner
            .call_procedure(&catalog_endpoint(&self.runner, "list")?, params, None)
            .await?;

        if table.is_empty() {
            return Err(ClientError::NotFound(format!(
                "Model with name `{}` does not exist",
                self.name
            )));
        }
        Ok(flatten_model_row(table.single_row()?.clone()))
    }

    async fn field(&self, key: &str) -> Result<Value> {
        let entry = self.entry().await?;
        entry
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::MissingField(key.to_string()))
    }

    pub async fn model_type(&self) -> Result<String> {
        self.field("modelType")
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::MissingField("modelType".to_string()))
    }

    pub async fn train_config(&self) -> Result<Value> {
        self.field("trainConfig").await
    }

    pub async fn graph_schema(&self) -> Result<Value> {
        self.field("graphSchema").await
    }

    pub async fn metrics(&self) -> Result<Value> {
        self.field("metrics").await
    }

    async fn bool_field(&self, key: &str) -> Result<bool> {
        self.field(key)
            .await?
            .as_bool()
            .ok_or_else(|| ClientError::MissingField(key.to_string()))
    }

    pub async fn loaded(&self) -> Result<bool> {
        self.bool_field("loaded").await
    }

    pub async fn stored(&self) -> Result<bool> {
        self.bool_field("stored").await
    }

    pub async fn shared(&self) -> Result<bool> {
        self.bool_field("shared").await
    }

    /// `published` is the ≥ 2.5 name for what older servers call `shared`.
    pub async fn published(&self) -> Result<bool> {
        let entry = self.entry().await?;
        let value = entry.get("published").or_else(|| entry.get("shared"));
        value
            .and_then(Value::as_bool)
            .ok_or_else(|| ClientError::MissingField("published".to_string()))
    }

    pub async fn creation_time(&self) -> Result<Value> {
        self.field("creationTime").await
    }

    pub async fn exists(&self) -> Result<bool> {
        let params = CallParameters::new().with("model_name", self.name.as_str());
        let table = self
            .runner
            .call_procedure(
                &catalog_endpoint(&self.runner, "exists")?,
                params,
                Some(&["exists"]),
            )
            .await?;
        table.get_bool(0, "exists")
    }

    pub async fn drop(&self, fail_if_missing: bool) -> Result<()> {
        let params = CallParameters::new()
            .with("model_name", self.name.as_str())
            .with("fail_if_missing", fail_if_missing);
        self.runner
            .call_procedure(&catalog_endpoint(&self.runner, "drop")?, params, None)
            .await?;
        Ok(())
    }

    pub async fn predict_stream(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.predict("stream", graph_name, config, false).await
    }

    pub async fn predict_mutate(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.predict("mutate", graph_name, config, false).await
    }

    pub async fn predict_estimate(&self, graph_name: &str, config: Value) -> Result<ResultTable> {
        self.predict("stream", graph_name, config, true).await
    }

    async fn predict(
        &self,
        mode: &str,
        graph_name: &str,
        config: Value,
        estimate: bool,
    ) -> Result<ResultTable> {
        let model_type = self.model_type().await?;
        let prefix = prediction_prefix(&model_type)?;

        let namespace = ProcedureNamespace::parse(prefix)?
            .append("predict")?
            .append(mode)?;
        let namespace = if self.runner.server_version() >= TIERS_DROPPED_VERSION {
            namespace.without_tier()
        } else {
            namespace
        };
        let endpoint = if estimate {
            namespace.estimate()
        } else {
            namespace.to_dotted()
        };

        let mut config = match config {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ClientError::Config(format!(
                    "prediction configuration must be a map, got {other}"
                )))
            }
        };
        config.insert("modelName".to_string(), Value::from(self.name.as_str()));

        let params = CallParameters::new()
            .with("graph_name", graph_name)
            .with("config", Value::Object(config));
        self.runner.call_procedure(&endpoint, params, None).await
    }
}

fn catalog_endpoint(runner: &GdsRunner, op: &str) -> Result<String> {
    let namespace = ProcedureNamespace::parse("gds.beta.model")?.append(op)?;
    let endpoint = if runner.server_version() >= TIERS_DROPPED_VERSION {
        namespace.without_tier().to_dotted()
    } else {
        namespace.to_dotted()
    };
    Ok(endpoint)
}

/// The procedure family a trained model predicts with.
fn prediction_prefix(model_type: &str) -> Result<&'static str> {
    match model_type {
        "graphSage" => Ok("gds.beta.graphSage"),
        "NodeClassification" => Ok("gds.beta.pipeline.nodeClassification"),
        "LinkPrediction" => Ok("gds.beta.pipeline.linkPrediction"),
        "NodeRegression" => Ok("gds.alpha.pipeline.nodeRegression"),
        other => Err(ClientError::Config(format!(
            "no prediction endpoint is known for model type `{other}`"
        ))),
    }
}

/// Older servers nest name, type, and metrics under a `modelInfo` key.
fn flatten_model_row(mut row: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Object(info)) = row.remove("modelInfo") {
        for (key, value) in info {
            row.entry(key).or_insert(value);
        }
    }
    row
}

fn flatten_model_rows(table: ResultTable) -> ResultTable {
    let rows: Vec<Map<String, Value>> = table.into_rows().into_iter().map(flatten_model_row).collect();
    ResultTable::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;
    use graphlink_core::version::ServerVersion;
    use serde_json::json;

    fn setup(version: ServerVersion) -> (Arc<RecordingRunner>, Arc<GdsRunner>) {
        let recording = Arc::new(RecordingRunner::default().with_version(version));
        let runner = Arc::new(GdsRunner::new(recording.clone(), None, false));
        (recording, runner)
    }

    fn exists_row(exists: bool) -> Vec<Map<String, Value>> {
        let mut row = Map::new();
        row.insert("exists".to_string(), Value::from(exists));
        vec![row]
    }

    fn model_row(nested: bool) -> Vec<Map<String, Value>> {
        let value = if nested {
            json!({
                "modelInfo": {"modelName": "sage", "modelType": "graphSage", "metrics": {"loss": 0.1}},
                "trainConfig": {"embeddingDimension": 64},
                "loaded": true,
                "stored": false,
                "shared": false,
            })
        } else {
            json!({
                "modelName": "sage",
                "modelType": "graphSage",
                "metrics": {"loss": 0.1},
                "trainConfig": {"embeddingDimension": 64},
                "loaded": true,
                "stored": false,
                "published": true,
            })
        };
        match value {
            Value::Object(row) => vec![row],
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_catalog_uses_beta_namespace_on_older_servers() {
        let (recording, runner) = setup(ServerVersion::new(2, 4, 0));
        recording.respond_rows("gds.beta.model.exists", exists_row(true));

        let catalog = ModelCatalog::new(runner);
        assert!(catalog.exists("sage").await.unwrap());
        assert_eq!(recording.procedure_calls(), vec!["gds.beta.model.exists"]);
    }

    #[tokio::test]
    async fn test_catalog_uses_promoted_namespace_on_newer_servers() {
        let (recording, runner) = setup(ServerVersion::new(2, 6, 0));
        recording.respond_rows("gds.model.exists", exists_row(true));

        let catalog = ModelCatalog::new(runner);
        assert!(catalog.exists("sage").await.unwrap());
        assert_eq!(recording.procedure_calls(), vec!["gds.model.exists"]);
    }

    #[tokio::test]
    async fn test_get_rejects_missing_models() {
        let (recording, runner) = setup(ServerVersion::new(2, 6, 0));
        recording.respond_rows("gds.model.exists", exists_row(false));

        let result = ModelCatalog::new(runner).get("nope").await;
        match result {
            Err(ClientError::NotFound(message)) => assert!(message.contains("nope")),
            other => panic!(
                "expected NotFound, got {:?}",
                other.map(|m| m.name().to_string())
            ),
        }
    }

    #[tokio::test]
    async fn test_nested_model_info_is_flattened() {
        let (recording, runner) = setup(ServerVersion::new(2, 4, 0));
        recording.respond_rows("gds.beta.model.list", model_row(true));

        let model = Model::new(runner, "sage");
        assert_eq!(model.model_type().await.unwrap(), "graphSage");
        assert_eq!(model.metrics().await.unwrap(), json!({"loss": 0.1}));
        assert!(model.loaded().await.unwrap());
        // `shared` doubles as `published` before the rename
        assert!(!model.published().await.unwrap());
    }

    #[tokio::test]
    async fn test_predict_resolves_via_model_type() {
        let (recording, runner) = setup(ServerVersion::new(2, 6, 0));
        recording.respond_rows("gds.model.list", model_row(false));

        let model = Model::new(runner, "sage");
        model.predict_stream("persons", json!({})).await.unwrap();

        let params = recording.params_for("gds.graphSage.predict.stream").unwrap();
        let config = params.get("config").unwrap();
        assert_eq!(config["modelName"], "sage");
    }

    #[tokio::test]
    async fn test_predict_estimate_appends_the_suffix() {
        let (recording, runner) = setup(ServerVersion::new(2, 6, 0));
        recording.respond_rows("gds.model.list", model_row(false));

        let model = Model::new(runner, "sage");
        model.predict_estimate("persons", json!({})).await.unwrap();

        assert!(recording
            .params_for("gds.graphSage.predict.stream.estimate")
            .is_some());
    }
}
