//! The farm service seam.
//!
//! [`FarmClient`] abstracts the five vendor RPC operations the
//! orchestrator needs. Production deployments implement it over the
//! vendor SDK; tests supply scripted implementations.

use std::path::Path;

use async_trait::async_trait;

use crate::error::FarmError;
use crate::types::{
    AttachmentManifest, CreateJobRequest, DownloadProgress, DownloadSummary, JobDetails,
    QueueSettings,
};

/// Callback invoked with incremental progress during output download.
pub type ProgressCallback<'a> = &'a (dyn Fn(&DownloadProgress) + Send + Sync);

/// Remote compute-farm operations consumed by the orchestrator.
#[async_trait]
pub trait FarmClient: Send + Sync {
    /// Create a job and return its service-assigned identifier.
    async fn create_job(&self, request: &CreateJobRequest) -> Result<String, FarmError>;

    /// Fetch a fresh snapshot of the job's state.
    async fn get_job(
        &self,
        farm_id: &str,
        queue_id: &str,
        job_id: &str,
    ) -> Result<JobDetails, FarmError>;

    /// Resolve the queue's storage settings.
    async fn get_queue(&self, farm_id: &str, queue_id: &str) -> Result<QueueSettings, FarmError>;

    /// Upload the bundle directory as job attachments and return the
    /// manifest references to embed in the create-job request.
    async fn upload_attachments(
        &self,
        farm_id: &str,
        queue_id: &str,
        bundle_dir: &Path,
    ) -> Result<AttachmentManifest, FarmError>;

    /// Download all output artifacts of a job into `dest_dir`,
    /// reporting incremental progress through `on_progress`.
    async fn download_job_output(
        &self,
        farm_id: &str,
        queue_id: &str,
        job_id: &str,
        dest_dir: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<DownloadSummary, FarmError>;
}
