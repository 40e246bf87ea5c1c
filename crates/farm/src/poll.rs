//! Exponential-backoff polling of a job until it reaches a terminal
//! state.
//!
//! Each iteration fetches a fresh [`JobDetails`] snapshot and
//! classifies it: a lifecycle failure or a completed task-run status
//! stops the loop, anything else sleeps and polls again with a longer
//! interval. The loop has no self-imposed ceiling on total wait time;
//! callers bound it with the [`CancellationToken`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::FarmClient;
use crate::error::FarmError;
use crate::status::{LifecycleStatus, TaskRunStatus};
use crate::types::JobDetails;

/// Tunable parameters for the polling backoff.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Interval before the second poll (the first happens immediately).
    pub initial_interval: Duration,
    /// Upper bound on the interval between polls.
    pub max_interval: Duration,
    /// Factor by which the interval grows after each poll.
    pub multiplier: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(60),
            multiplier: 1.5,
        }
    }
}

/// Observability hook invoked with every snapshot and the elapsed time
/// since polling started.
pub type StatusCallback<'a> = &'a (dyn Fn(&JobDetails, Duration) + Send + Sync);

/// Terminal outcomes of the polling state machine other than success.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The job record entered a failure lifecycle state.
    #[error("Job reached failure lifecycle state {0:?}")]
    LifecycleFailed(LifecycleStatus),

    /// The tasks completed in a state other than `SUCCEEDED`.
    #[error("Job completed with task run status {0:?}")]
    RunIncomplete(TaskRunStatus),

    /// The caller's cancellation token fired between polls.
    #[error("Polling was cancelled")]
    Cancelled,

    /// A get-job call failed.
    #[error(transparent)]
    Service(#[from] FarmError),
}

/// Calculate the next poll interval, clamped to
/// [`PollConfig::max_interval`].
pub fn next_interval(current: Duration, config: &PollConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_interval)
}

/// Poll the job until it reaches a terminal state.
///
/// Returns the last observed [`JobDetails`] when the tasks succeeded;
/// otherwise reports which status value terminated the wait. The
/// optional `on_status` callback fires once per iteration.
pub async fn poll_until_terminal(
    client: &dyn FarmClient,
    farm_id: &str,
    queue_id: &str,
    job_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
    on_status: Option<StatusCallback<'_>>,
) -> Result<JobDetails, PollError> {
    let started = tokio::time::Instant::now();
    let mut interval = config.initial_interval;

    loop {
        let details = client.get_job(farm_id, queue_id, job_id).await?;
        if let Some(callback) = on_status {
            callback(&details, started.elapsed());
        }

        if details.lifecycle_status.is_failure() {
            tracing::error!(
                job_id,
                lifecycle_status = ?details.lifecycle_status,
                "Job failed at the lifecycle level",
            );
            return Err(PollError::LifecycleFailed(details.lifecycle_status));
        }

        if details.task_run_status.is_completed() {
            return if details.task_run_status == TaskRunStatus::Succeeded {
                tracing::info!(
                    job_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Job succeeded",
                );
                Ok(details)
            } else {
                tracing::error!(
                    job_id,
                    task_run_status = ?details.task_run_status,
                    "Job completed without success",
                );
                Err(PollError::RunIncomplete(details.task_run_status))
            };
        }

        tracing::debug!(
            job_id,
            lifecycle_status = ?details.lifecycle_status,
            task_run_status = ?details.task_run_status,
            interval_ms = interval.as_millis() as u64,
            "Job not yet terminal; waiting",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id, "Polling cancelled");
                return Err(PollError::Cancelled);
            }
            _ = tokio::time::sleep(interval) => {}
        }

        interval = next_interval(interval, config);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::client::ProgressCallback;
    use crate::types::{
        AttachmentManifest, CreateJobRequest, DownloadSummary, QueueSettings,
    };

    fn details(lifecycle: LifecycleStatus, run: TaskRunStatus) -> JobDetails {
        JobDetails {
            job_id: "job-1".into(),
            lifecycle_status: lifecycle,
            task_run_status: run,
            priority: 50,
            max_failed_tasks_count: None,
            max_retries_per_task: None,
            failure_retry_count: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            updated_at: None,
            created_by: None,
        }
    }

    /// Serves a scripted sequence of snapshots, repeating the last one.
    struct ScriptedClient {
        snapshots: Mutex<Vec<JobDetails>>,
    }

    impl ScriptedClient {
        fn new(snapshots: Vec<JobDetails>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }
    }

    #[async_trait]
    impl FarmClient for ScriptedClient {
        async fn create_job(&self, _: &CreateJobRequest) -> Result<String, FarmError> {
            unimplemented!("not used by poll tests")
        }

        async fn get_job(&self, _: &str, _: &str, _: &str) -> Result<JobDetails, FarmError> {
            let mut snapshots = self.snapshots.lock().unwrap();
            if snapshots.len() > 1 {
                Ok(snapshots.remove(0))
            } else {
                Ok(snapshots[0].clone())
            }
        }

        async fn get_queue(&self, _: &str, _: &str) -> Result<QueueSettings, FarmError> {
            unimplemented!("not used by poll tests")
        }

        async fn upload_attachments(
            &self,
            _: &str,
            _: &str,
            _: &Path,
        ) -> Result<AttachmentManifest, FarmError> {
            unimplemented!("not used by poll tests")
        }

        async fn download_job_output(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &Path,
            _: ProgressCallback<'_>,
        ) -> Result<DownloadSummary, FarmError> {
            unimplemented!("not used by poll tests")
        }
    }

    async fn poll(client: &ScriptedClient) -> Result<JobDetails, PollError> {
        poll_until_terminal(
            client,
            "farm-1",
            "queue-1",
            "job-1",
            &PollConfig::default(),
            &CancellationToken::new(),
            None,
        )
        .await
    }

    // -- next_interval -------------------------------------------------------

    #[test]
    fn interval_grows_by_multiplier() {
        let config = PollConfig::default();
        let next = next_interval(Duration::from_millis(500), &config);
        assert_eq!(next, Duration::from_millis(750));
    }

    #[test]
    fn interval_clamps_at_max() {
        let config = PollConfig {
            max_interval: Duration::from_secs(2),
            ..Default::default()
        };
        let next = next_interval(Duration::from_millis(1800), &config);
        assert_eq!(next, Duration::from_secs(2));
    }

    #[test]
    fn interval_strictly_increases_until_capped() {
        let config = PollConfig::default();
        let mut interval = config.initial_interval;
        let mut previous = Duration::ZERO;
        for _ in 0..32 {
            if interval < config.max_interval {
                assert!(interval > previous, "interval must grow until the cap");
            } else {
                assert_eq!(interval, config.max_interval);
            }
            previous = interval;
            interval = next_interval(interval, &config);
        }
        assert_eq!(interval, config.max_interval);
    }

    // -- poll_until_terminal ---------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn succeeded_job_returns_last_snapshot() {
        let client = ScriptedClient::new(vec![
            details(LifecycleStatus::CreateInProgress, TaskRunStatus::Pending),
            details(LifecycleStatus::CreateComplete, TaskRunStatus::Running),
            details(LifecycleStatus::CreateComplete, TaskRunStatus::Succeeded),
        ]);
        let result = poll(&client).await.unwrap();
        assert_eq!(result.task_run_status, TaskRunStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn archived_job_is_a_lifecycle_failure_not_run_incomplete() {
        let client = ScriptedClient::new(vec![
            details(LifecycleStatus::CreateComplete, TaskRunStatus::Running),
            // Archived while tasks also report canceled: lifecycle wins.
            details(LifecycleStatus::Archived, TaskRunStatus::Canceled),
        ]);
        let err = poll(&client).await.unwrap_err();
        assert_matches!(err, PollError::LifecycleFailed(LifecycleStatus::Archived));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tasks_report_run_incomplete_with_status() {
        let client = ScriptedClient::new(vec![details(
            LifecycleStatus::CreateComplete,
            TaskRunStatus::Failed,
        )]);
        let err = poll(&client).await.unwrap_err();
        assert_matches!(err, PollError::RunIncomplete(TaskRunStatus::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_tasks_are_not_success() {
        let client = ScriptedClient::new(vec![details(
            LifecycleStatus::CreateComplete,
            TaskRunStatus::Canceled,
        )]);
        let err = poll(&client).await.unwrap_err();
        assert_matches!(err, PollError::RunIncomplete(TaskRunStatus::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_token_stops_polling() {
        let client = ScriptedClient::new(vec![details(
            LifecycleStatus::CreateComplete,
            TaskRunStatus::Running,
        )]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = poll_until_terminal(
            &client,
            "farm-1",
            "queue-1",
            "job-1",
            &PollConfig::default(),
            &cancel,
            None,
        )
        .await
        .unwrap_err();
        assert_matches!(err, PollError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn status_callback_fires_once_per_poll() {
        let client = ScriptedClient::new(vec![
            details(LifecycleStatus::CreateInProgress, TaskRunStatus::Pending),
            details(LifecycleStatus::CreateComplete, TaskRunStatus::Running),
            details(LifecycleStatus::CreateComplete, TaskRunStatus::Succeeded),
        ]);
        let seen = Mutex::new(Vec::new());
        let callback = |details: &JobDetails, _elapsed: Duration| {
            seen.lock().unwrap().push(details.task_run_status);
        };
        poll_until_terminal(
            &client,
            "farm-1",
            "queue-1",
            "job-1",
            &PollConfig::default(),
            &CancellationToken::new(),
            Some(&callback),
        )
        .await
        .unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                TaskRunStatus::Pending,
                TaskRunStatus::Running,
                TaskRunStatus::Succeeded,
            ]
        );
    }
}
