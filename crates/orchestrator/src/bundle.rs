//! Per-task input files inside the job bundle.
//!
//! Each task reads `input_<index>.json` from the bundle, shaped as
//! `{ "<entry_point_id>": ParameterSet }`. The bundle directory itself
//! is produced by the host's packaging step; this module only adds the
//! fan-out inputs to it.

use std::fs;
use std::path::Path;

use serde_json::json;
use taskfan_core::fanout::ParameterSet;

/// Errors while assembling the bundle inputs.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to write task input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode task input: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File name of the input artifact for one task index.
pub fn input_file_name(index: usize) -> String {
    format!("input_{index}.json")
}

/// Write one `input_<i>.json` per task into the bundle directory.
pub fn write_task_inputs(
    bundle_dir: &Path,
    entry_point_id: &str,
    task_parameters: &[ParameterSet],
) -> Result<(), BundleError> {
    for (index, params) in task_parameters.iter().enumerate() {
        let payload = json!({ entry_point_id: params });
        let path = bundle_dir.join(input_file_name(index));
        fs::write(&path, serde_json::to_vec_pretty(&payload)?)?;
    }
    tracing::debug!(
        task_count = task_parameters.len(),
        bundle_dir = %bundle_dir.display(),
        "Wrote per-task input files",
    );
    Ok(())
}
