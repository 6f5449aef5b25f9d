//! Job progress polling
//!
//! While a long-running procedure call is in flight, the poller periodically
//! asks the server for the progress of the job id the call carries and logs
//! it. Progress lookups are best-effort: a job that has not started yet or
//! has already finished is not an error.

use std::future::Future;

use tracing::{info, warn};

use graphlink_core::error::Result;
use graphlink_core::params::CallParameters;
use graphlink_core::retry::PollingSchedule;
use graphlink_core::runner::QueryRunner;
use graphlink_core::version::{ServerVersion, MIN_SERVER_VERSION};

/// Servers older than this have no progress procedure.
const PROGRESS_SUPPORTED_VERSION: ServerVersion = MIN_SERVER_VERSION;

pub struct ProgressPoller {
    schedule: PollingSchedule,
    enabled: bool,
}

impl ProgressPoller {
    pub fn new(schedule: PollingSchedule, enabled: bool) -> Self {
        Self { schedule, enabled }
    }

    /// Drives `fut` to completion, logging the job's progress on the
    /// polling schedule along the way.
    pub async fn run_with_progress<T>(
        &self,
        runner: &dyn QueryRunner,
        job_id: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if !self.enabled || runner.server_version() < PROGRESS_SUPPORTED_VERSION {
            return fut.await;
        }

        tokio::pin!(fut);

        let mut attempt = 0u32;
        let mut warned = false;

        loop {
            let delay = self.schedule.delay_for_attempt(attempt);
            tokio::select! {
                result = &mut fut => return result,
                _ = tokio::time::sleep(delay) => {
                    attempt += 1;
                    self.poll_once(runner, job_id, &mut warned).await;
                }
            }
        }
    }

    async fn poll_once(&self, runner: &dyn QueryRunner, job_id: &str, warned: &mut bool) {
        let params = CallParameters::new().with("job_id", job_id);
        let result = runner
            .call_procedure(
                "gds.listProgress",
                params,
                Some(&["taskName", "progress"]),
            )
            .await;

        match result {
            Ok(table) if !table.is_empty() => {
                let task = table.get_str(0, "taskName").unwrap_or("");
                let progress = table.get_str(0, "progress").unwrap_or("");
                info!("Job `{job_id}`: {} {progress}", task.trim_start_matches('|').trim());
            }
            // not started yet, or already gone
            Ok(_) => {}
            Err(e) if e.to_string().contains("No task with job id") => {}
            Err(e) => {
                if !*warned {
                    warn!("Unable to poll progress for job `{job_id}`: {e}");
                    *warned = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use graphlink_core::table::ResultTable;

    struct FakeRunner {
        polls: AtomicU32,
    }

    #[async_trait]
    impl QueryRunner for FakeRunner {
        async fn run_cypher(&self, _query: &str, _params: CallParameters) -> Result<ResultTable> {
            Ok(ResultTable::default())
        }

        async fn call_procedure(
            &self,
            endpoint: &str,
            _params: CallParameters,
            _yields: Option<&[&str]>,
        ) -> Result<ResultTable> {
            assert_eq!(endpoint, "gds.listProgress");
            self.polls.fetch_add(1, Ordering::SeqCst);

            let mut row = Map::new();
            row.insert("taskName".to_string(), Value::from("|-- PageRank"));
            row.insert("progress".to_string(), Value::from("42%"));
            Ok(ResultTable::from_rows(vec![row]))
        }

        async fn call_function(&self, _endpoint: &str, _params: CallParameters) -> Result<Value> {
            Ok(Value::Null)
        }

        fn server_version(&self) -> ServerVersion {
            ServerVersion::new(2, 6, 0)
        }

        fn database(&self) -> Option<&str> {
            None
        }
    }

    fn fast_schedule() -> PollingSchedule {
        PollingSchedule {
            fixed_delay: Duration::from_millis(2),
            fixed_attempts: 100,
            backoff_multiplier: 1.0,
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_polls_while_future_runs() {
        let runner = FakeRunner { polls: AtomicU32::new(0) };
        let poller = ProgressPoller::new(fast_schedule(), true);

        let result = poller
            .run_with_progress(&runner, "job-1", async {
                tokio::time::sleep(Duration::from_millis(25)).await;
                Ok(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert!(runner.polls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_disabled_poller_never_polls() {
        let runner = FakeRunner { polls: AtomicU32::new(0) };
        let poller = ProgressPoller::new(fast_schedule(), false);

        let result = poller
            .run_with_progress(&runner, "job-1", async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(runner.polls.load(Ordering::SeqCst), 0);
    }
}
