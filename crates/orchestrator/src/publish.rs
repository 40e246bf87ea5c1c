//! The composition root: publish a multi-task job and harvest results.
//!
//! [`MultiTaskPublisher::publish_and_execute`] sequences the whole
//! pipeline -- normalize items, package the unit of work, fan out
//! parameters, assemble and upload the bundle, submit, poll to a
//! terminal state, and collect per-task results. One invocation is
//! strictly sequential; concurrency, if any, lives in the embedding
//! host running independent invocations side by side.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use taskfan_core::error::CoreError;
use taskfan_core::fanout::normalize_items;
use taskfan_core::host_requirements::{build_host_requirements, HostConfig};
use taskfan_core::path_translate::sanitize_name;
use taskfan_farm::client::FarmClient;
use taskfan_farm::poll::{poll_until_terminal, PollConfig, PollError};
use taskfan_farm::submit::{submit_job, SubmitError, SubmitSpec};
use taskfan_farm::types::JobDetails;
use taskfan_farm::{FarmError, LifecycleStatus, TaskRunStatus};

use crate::bundle::{write_task_inputs, BundleError};
use crate::collect::{collect_results, CollectError, CollectRequest};
use crate::fanout::{build_task_parameters, plan_fanout, FanoutContext};
use crate::host::{HostError, NodeId, ParamRef, WorkflowHost};

/// Everything one invocation needs.
pub struct PublishConfig {
    pub workflow_name: String,
    /// Iteration source: array, object, or null (see
    /// [`normalize_items`]).
    pub items: Value,
    pub farm_id: String,
    pub queue_id: String,
    pub submit: SubmitSpec,
    pub host_config: HostConfig,
    /// The caller's requested result endpoint in the original graph;
    /// resolved through the exit-point mapping to a synthetic
    /// parameter name. `None` collects full result objects.
    pub result_parameter: Option<ParamRef>,
    pub poll: PollConfig,
    /// The orchestrator's own node in the caller's graph.
    pub publisher_node: NodeId,
    /// Name of the publisher output carrying the current item.
    pub item_output: String,
    /// Nodes packaged into the unit of work.
    pub batch_nodes: Vec<NodeId>,
}

/// Fatal outcomes of a publish invocation. Per-task result gaps are
/// not errors; they surface as `None` slots in the returned list.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Usage(#[from] CoreError),

    #[error("Failed to create staging area: {0}")]
    Staging(#[from] io::Error),

    #[error(transparent)]
    Packaging(#[from] HostError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Submission(#[from] SubmitError),

    #[error("Farm request failed: {0}")]
    Farm(#[from] FarmError),

    #[error("Job reached failure lifecycle state {0:?}")]
    LifecycleFailed(LifecycleStatus),

    #[error("Job completed with task run status {0:?}")]
    RunIncomplete(TaskRunStatus),

    #[error("Publish was cancelled")]
    Cancelled,

    #[error(transparent)]
    Collection(#[from] CollectError),
}

impl From<PollError> for PublishError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::LifecycleFailed(status) => Self::LifecycleFailed(status),
            PollError::RunIncomplete(status) => Self::RunIncomplete(status),
            PollError::Cancelled => Self::Cancelled,
            PollError::Service(e) => Self::Farm(e),
        }
    }
}

/// Transient filesystem layout of one invocation: the workflow
/// snapshot file (always removed afterwards), the bundle directory,
/// and the download staging directory (both left to the OS temp
/// cleaner).
struct StagingPaths {
    workflow_file: PathBuf,
    bundle_dir: PathBuf,
    download_dir: PathBuf,
}

impl StagingPaths {
    fn create(workflow_name: &str, batch_nodes: &[NodeId]) -> io::Result<Self> {
        let safe_name = sanitize_name(workflow_name);
        let root = std::env::temp_dir().join(format!("taskfan-{safe_name}-{}", uuid::Uuid::new_v4()));
        let bundle_dir = root.join("bundle");
        let download_dir = root.join("download");
        fs::create_dir_all(&bundle_dir)?;
        fs::create_dir_all(&download_dir)?;

        let workflow_file = root.join(format!("{safe_name}.workflow.json"));
        let snapshot = json!({ "name": workflow_name, "nodes": batch_nodes });
        fs::write(&workflow_file, serde_json::to_vec_pretty(&snapshot)?)?;

        Ok(Self {
            workflow_file,
            bundle_dir,
            download_dir,
        })
    }
}

/// Best-effort removal of the workflow snapshot file. Runs on every
/// exit path, including panics and futures dropped mid-await.
impl Drop for StagingPaths {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.workflow_file) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.workflow_file.display(),
                    error = %e,
                    "Failed to remove transient workflow file",
                );
            }
        }
    }
}

/// Publishes one batch-of-tasks job per call over the farm client and
/// workflow host seams.
pub struct MultiTaskPublisher<'a> {
    client: &'a dyn FarmClient,
    host: &'a dyn WorkflowHost,
}

impl<'a> MultiTaskPublisher<'a> {
    pub fn new(client: &'a dyn FarmClient, host: &'a dyn WorkflowHost) -> Self {
        Self { client, host }
    }

    /// Run the full publish/poll/collect sequence.
    ///
    /// Returns one entry per input item, in item order; entries whose
    /// output never materialized are `None`. Any fatal error aborts
    /// the invocation without a partial result list.
    pub async fn publish_and_execute(
        &self,
        config: &PublishConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Value>>, PublishError> {
        let items = normalize_items(&config.items)?;
        if items.is_empty() {
            tracing::info!(
                workflow = %config.workflow_name,
                "No items to fan out; nothing submitted",
            );
            return Ok(Vec::new());
        }

        let staging = StagingPaths::create(&config.workflow_name, &config.batch_nodes)?;
        self.run(config, cancel, &items, &staging).await
    }

    async fn run(
        &self,
        config: &PublishConfig,
        cancel: &CancellationToken,
        items: &[Value],
        staging: &StagingPaths,
    ) -> Result<Vec<Option<Value>>, PublishError> {
        let task_count = items.len();

        let unit = self
            .host
            .package_nodes(&config.batch_nodes, &staging.bundle_dir)
            .await?;
        if !unit.has_work {
            tracing::info!(
                workflow = %config.workflow_name,
                "Packaged unit contains no work; nothing submitted",
            );
            return Ok(Vec::new());
        }

        let ctx = FanoutContext {
            host: self.host,
            publisher_node: &config.publisher_node,
            item_output: &config.item_output,
            batch_nodes: &config.batch_nodes,
        };
        let plan = plan_fanout(&ctx, &unit.entry_mapping);
        let task_parameters = build_task_parameters(&plan, items);

        let result_parameter = match &config.result_parameter {
            Some(original) => {
                let synthetic = unit.exit_mapping.synthetic_for(original);
                if synthetic.is_none() {
                    tracing::warn!(
                        node = %original.node,
                        param = %original.param,
                        "Requested result parameter not in the exit mapping; collecting full result objects",
                    );
                }
                synthetic
            }
            None => None,
        };

        write_task_inputs(&unit.bundle_dir, &unit.entry_point_id, &task_parameters)?;

        let attachments = self
            .client
            .upload_attachments(&config.farm_id, &config.queue_id, &unit.bundle_dir)
            .await?;
        let host_requirements = build_host_requirements(&config.host_config);
        let job_id = submit_job(
            self.client,
            &config.farm_id,
            &config.queue_id,
            &config.submit,
            host_requirements,
            attachments,
            task_count,
        )
        .await?;

        let on_status = |details: &JobDetails, elapsed: Duration| {
            tracing::debug!(
                job_id = %details.job_id,
                lifecycle_status = ?details.lifecycle_status,
                task_run_status = ?details.task_run_status,
                elapsed_secs = elapsed.as_secs(),
                "Job status",
            );
        };
        poll_until_terminal(
            self.client,
            &config.farm_id,
            &config.queue_id,
            &job_id,
            &config.poll,
            cancel,
            Some(&on_status),
        )
        .await?;

        let results = collect_results(
            self.client,
            &CollectRequest {
                farm_id: &config.farm_id,
                queue_id: &config.queue_id,
                job_id: &job_id,
                task_count,
                workflow_name: &config.workflow_name,
                result_parameter,
                staging_dir: &staging.download_dir,
            },
        )
        .await?;
        Ok(results)
    }
}
