//! Request/response shapes for the farm service.
//!
//! These mirror the vendor API closely enough for submission, polling,
//! and collection; the calls themselves live behind
//! [`crate::client::FarmClient`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskfan_core::host_requirements::HostRequirements;

use crate::status::{LifecycleStatus, TaskRunStatus};

/// Immutable snapshot of remote job state, constructed fresh on every
/// poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    pub job_id: String,
    pub lifecycle_status: LifecycleStatus,
    #[serde(default)]
    pub task_run_status: TaskRunStatus,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_tasks_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries_per_task: Option<u32>,
    /// How many times the service has retried failed tasks so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_retry_count: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Storage settings for a queue, resolved before downloading results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    pub queue_id: String,
    /// Root prefix under which the queue stores job attachments.
    pub storage_root: String,
}

/// References to the uploaded bundle contents, embedded into the
/// create-job request so workers can fetch the packaged unit of work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentManifest {
    pub manifests: Vec<ManifestEntry>,
}

/// One uploaded root directory and the manifest object describing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute path of the directory on the submitting machine.
    pub root_path: String,
    /// Storage key of the uploaded manifest for this root.
    pub manifest_object_key: String,
}

/// Create-job request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub farm_id: String,
    pub queue_id: String,
    /// Rendered job template (task count already substituted in).
    pub template: String,
    pub template_type: TemplateType,
    pub priority: i32,
    pub attachments: AttachmentManifest,
    /// Run state the tasks should be placed in on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_task_run_status: Option<TaskRunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_tasks_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries_per_task: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_requirements: Option<HostRequirements>,
}

/// Encoding of the embedded job template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    Json,
    Yaml,
}

/// Result of downloading a job's output artifacts: each local download
/// root mapped to the relative paths placed under it.
#[derive(Debug, Clone, Default)]
pub struct DownloadSummary {
    pub local_roots: HashMap<String, Vec<String>>,
}

impl DownloadSummary {
    /// Total number of downloaded files across all roots.
    pub fn file_count(&self) -> usize {
        self.local_roots.values().map(Vec::len).sum()
    }
}

/// Incremental progress report emitted during output download.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadProgress {
    pub downloaded_files: u64,
    /// Not every storage backend can report a total up front.
    pub total_files: Option<u64>,
    pub transferred_bytes: u64,
}
