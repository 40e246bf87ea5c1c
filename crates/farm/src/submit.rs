//! Job submission: template rendering and create-job assembly.
//!
//! Builds the create-job request from the submission metadata, the
//! uploaded attachment manifest, and the rendered multi-task job
//! template, then sends it through the [`FarmClient`]. Submission is
//! not retried at this layer -- transient trouble is the poller's
//! concern, and a failed create is surfaced to the caller.

use serde_json::json;
use taskfan_core::host_requirements::HostRequirements;

use crate::client::FarmClient;
use crate::error::FarmError;
use crate::status::TaskRunStatus;
use crate::types::{AttachmentManifest, CreateJobRequest, TemplateType};

/// Job template specification version emitted by [`render_job_template`].
const TEMPLATE_SPEC_VERSION: &str = "jobtemplate-2023-09";

/// Name of the task parameter that carries the task index.
pub const TASK_INDEX_PARAMETER: &str = "TaskIndex";

/// Caller-supplied submission metadata.
#[derive(Debug, Clone)]
pub struct SubmitSpec {
    pub name: String,
    pub description: Option<String>,
    /// Scheduling priority, `0..=100`.
    pub priority: i32,
    /// Run state the tasks should start in (e.g. suspended for a
    /// dry-run submission). `None` lets the service pick its default.
    pub initial_status: Option<TaskRunStatus>,
    /// How many tasks may fail before the whole job is failed.
    pub max_failed_tasks_count: u32,
    /// How many times the service may retry a single task.
    pub max_retries_per_task: u32,
}

/// Errors from the submission layer.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Priority must be within 0..=100, got {0}")]
    InvalidPriority(i32),

    /// The create-job call failed; includes the upstream error text.
    #[error("Job submission failed: {0}")]
    Submission(#[from] FarmError),
}

/// Render the multi-task job template with `task_count` substituted
/// into the task parameter space.
///
/// Each task receives its [`TASK_INDEX_PARAMETER`] value and runs the
/// packaged unit of work against `input_<index>.json` from the bundle.
pub fn render_job_template(
    workflow_name: &str,
    description: Option<&str>,
    task_count: usize,
) -> serde_json::Value {
    let last_index = task_count.saturating_sub(1);
    let mut template = json!({
        "specificationVersion": TEMPLATE_SPEC_VERSION,
        "name": workflow_name,
        "parameterSpace": {
            "taskParameterDefinitions": [
                {
                    "name": TASK_INDEX_PARAMETER,
                    "type": "INT",
                    "range": format!("0-{last_index}"),
                }
            ]
        },
        "steps": [
            {
                "name": "run-workflow",
                "script": {
                    "actions": {
                        "onRun": {
                            "command": "taskfan-worker",
                            "args": [
                                "--input",
                                format!("input_{{{{Task.Param.{TASK_INDEX_PARAMETER}}}}}.json"),
                                "--output",
                                format!("output_{{{{Task.Param.{TASK_INDEX_PARAMETER}}}}}.json"),
                            ]
                        }
                    }
                }
            }
        ]
    });
    if let Some(description) = description {
        template["description"] = description.into();
    }
    template
}

/// Build and send the create-job request; returns the job identifier.
pub async fn submit_job(
    client: &dyn FarmClient,
    farm_id: &str,
    queue_id: &str,
    spec: &SubmitSpec,
    host_requirements: Option<HostRequirements>,
    attachments: AttachmentManifest,
    task_count: usize,
) -> Result<String, SubmitError> {
    if !(0..=100).contains(&spec.priority) {
        return Err(SubmitError::InvalidPriority(spec.priority));
    }

    let template = render_job_template(&spec.name, spec.description.as_deref(), task_count);
    let request = CreateJobRequest {
        farm_id: farm_id.to_string(),
        queue_id: queue_id.to_string(),
        template: template.to_string(),
        template_type: TemplateType::Json,
        priority: spec.priority,
        attachments,
        target_task_run_status: spec.initial_status,
        max_failed_tasks_count: Some(spec.max_failed_tasks_count),
        max_retries_per_task: Some(spec.max_retries_per_task),
        host_requirements,
    };

    let job_id = client.create_job(&request).await?;
    tracing::info!(
        job_id = %job_id,
        farm_id,
        queue_id,
        task_count,
        priority = spec.priority,
        "Submitted multi-task job",
    );
    Ok(job_id)
}
