//! v2 job protocol
//!
//! Newer servers expose algorithm execution as asynchronous jobs: an action
//! starts the job, status polls report progress, and the result is fetched
//! as a summary document or streamed as record batches once the job is done.

use arrow::record_batch::RecordBatch;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use graphlink_core::error::{ClientError, Result};
use graphlink_core::params::CallParameters;
use graphlink_core::retry::PollingSchedule;

use crate::client::FlightConnection;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: String,
    /// Completion in percent, 0.0 to 100.0
    #[serde(default)]
    pub progress: f64,
    pub status: String,
}

impl JobStatus {
    pub fn done(&self) -> bool {
        self.status.eq_ignore_ascii_case("DONE")
    }

    pub fn failed(&self) -> bool {
        self.status.eq_ignore_ascii_case("FAILED")
    }

    pub fn aborted(&self) -> bool {
        self.status.eq_ignore_ascii_case("ABORTED")
    }

    /// Whether the job has stopped, successfully or not.
    pub fn terminal(&self) -> bool {
        self.done() || self.failed() || self.aborted()
    }
}

impl FlightConnection {
    /// Starts a server-side job for `endpoint` and returns its job id.
    ///
    /// A fresh id is generated unless the configuration already carries one.
    pub async fn run_job(
        &self,
        endpoint: &str,
        graph_name: &str,
        database: &str,
        configuration: &CallParameters,
    ) -> Result<String> {
        let job_id = configuration
            .get("jobId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut config = Value::Object(configuration.iter().fold(
            serde_json::Map::new(),
            |mut map, (key, value)| {
                map.insert(key.clone(), value.clone());
                map
            },
        ));
        config["jobId"] = json!(job_id);

        let body = json!({
            "endpoint": endpoint,
            "graphName": graph_name,
            "databaseName": database,
            "configuration": config,
        });

        debug!("Starting job `{job_id}` for `{endpoint}`");
        let result = self.do_action_json("v2/jobs.run", &body).await?;
        let status: JobStatus = serde_json::from_value(result)?;
        Ok(status.job_id)
    }

    /// A single status poll.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let result = self
            .do_action_json("v2/jobs.status", &json!({"jobId": job_id}))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Polls until the job reaches a terminal state, pacing the polls with
    /// `schedule`. `DONE` and `ABORTED` return the status; `FAILED` is a
    /// query error.
    pub async fn wait_for_job(&self, job_id: &str, schedule: &PollingSchedule) -> Result<JobStatus> {
        let mut attempt = 0;
        loop {
            let status = self.job_status(job_id).await?;
            if status.failed() {
                return Err(ClientError::Query(format!(
                    "job `{job_id}` failed on the server"
                )));
            }
            if status.terminal() {
                return Ok(status);
            }
            let delay = schedule.delay_for_attempt(attempt);
            debug!(
                "Job `{job_id}` at {:.1}%, next poll in {delay:?}",
                status.progress
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Asks the server to abort a running job.
    pub async fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.do_action_json("v2/jobs.cancel", &json!({"jobId": job_id}))
            .await?;
        Ok(())
    }

    /// Fetches the aggregate result document of a finished job.
    pub async fn job_summary(&self, job_id: &str) -> Result<Value> {
        self.do_action_json("v2/jobs.summary", &json!({"jobId": job_id}))
            .await
    }

    /// Streams the row results of a finished job as record batches.
    pub async fn stream_job_results(&self, job_id: &str) -> Result<Vec<RecordBatch>> {
        self.do_get_batches(&json!({"name": "jobs.stream", "jobId": job_id}))
            .await
    }
}
