//! Remote compute-farm surface: typed job statuses, request/response
//! shapes, the [`client::FarmClient`] seam, job submission, and the
//! lifecycle polling state machine.
//!
//! The vendor service itself (create-job, get-job, get-queue, asset
//! upload/download) is an external collaborator -- this crate defines
//! only its shapes and the logic layered on top of them.

pub mod client;
pub mod error;
pub mod poll;
pub mod status;
pub mod submit;
pub mod types;

pub use client::FarmClient;
pub use error::FarmError;
pub use status::{LifecycleStatus, TaskRunStatus};
