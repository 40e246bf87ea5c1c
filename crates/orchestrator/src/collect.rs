//! Result collection: download output artifacts, extract one value per
//! task, and rewrite worker paths.
//!
//! Failures on a single task's output file are logged and leave that
//! slot absent; a failure to establish the download session aborts the
//! whole collection step.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use taskfan_core::path_translate::{output_suffix, translate_worker_paths};
use taskfan_farm::client::FarmClient;
use taskfan_farm::types::DownloadProgress;
use taskfan_farm::FarmError;

/// Errors fatal to the whole collection pass.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Queue lookup or output download failed.
    #[error("Failed to open result download session: {0}")]
    Session(#[from] FarmError),
}

/// Everything the collector needs to locate and interpret the outputs.
pub struct CollectRequest<'a> {
    pub farm_id: &'a str,
    pub queue_id: &'a str,
    pub job_id: &'a str,
    pub task_count: usize,
    pub workflow_name: &'a str,
    /// Synthetic exit parameter to extract from each task's result;
    /// `None` keeps the entire result object.
    pub result_parameter: Option<&'a str>,
    /// Local directory the artifacts are downloaded into.
    pub staging_dir: &'a Path,
}

/// One task's output artifact: `{ "task_index": ..., "result": ... }`.
#[derive(Debug, Deserialize)]
struct TaskOutput {
    task_index: usize,
    result: Value,
}

#[derive(Debug, thiserror::Error)]
enum OutputParseError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Download and parse all task outputs for a job.
///
/// Returns a list of length `task_count`; tasks whose output never
/// arrived or failed to parse stay `None`.
pub async fn collect_results(
    client: &dyn FarmClient,
    request: &CollectRequest<'_>,
) -> Result<Vec<Option<Value>>, CollectError> {
    let queue = client.get_queue(request.farm_id, request.queue_id).await?;
    tracing::debug!(
        queue_id = %queue.queue_id,
        storage_root = %queue.storage_root,
        "Resolved queue storage settings",
    );

    let on_progress = |progress: &DownloadProgress| {
        tracing::debug!(
            job_id = request.job_id,
            downloaded_files = progress.downloaded_files,
            total_files = ?progress.total_files,
            transferred_bytes = progress.transferred_bytes,
            "Downloading job output",
        );
    };
    let summary = client
        .download_job_output(
            request.farm_id,
            request.queue_id,
            request.job_id,
            request.staging_dir,
            &on_progress,
        )
        .await?;
    tracing::info!(
        job_id = request.job_id,
        file_count = summary.file_count(),
        "Downloaded job output",
    );

    let suffix = output_suffix(request.workflow_name);
    let mut results: Vec<Option<Value>> = vec![None; request.task_count];

    for (root, relative_paths) in &summary.local_roots {
        for relative in relative_paths {
            let Some(file_name) = Path::new(relative).file_name().and_then(OsStr::to_str) else {
                continue;
            };
            if parse_output_index(file_name).is_none() {
                continue;
            }
            let path = Path::new(root).join(relative);

            let output = match read_task_output(&path) {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse task output; leaving its slot empty",
                    );
                    continue;
                }
            };

            if output.task_index >= request.task_count {
                tracing::warn!(
                    task_index = output.task_index,
                    task_count = request.task_count,
                    "Task output index out of range; ignoring",
                );
                continue;
            }

            let value = extract_result_value(output.result, request.result_parameter);
            let value = translate_worker_paths(value, &suffix, &summary.local_roots);
            results[output.task_index] = Some(value);

            // Staging copy is consumed exactly once.
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to delete staging copy of task output",
                );
            }
        }
    }

    Ok(results)
}

/// Task index encoded in an `output_<index>.json` file name. The
/// digits must be canonical; a zero-padded alias like `output_00.json`
/// must not overwrite the slot of `output_0.json`.
fn parse_output_index(file_name: &str) -> Option<usize> {
    let digits = file_name.strip_prefix("output_")?.strip_suffix(".json")?;
    let index: usize = digits.parse().ok()?;
    (index.to_string() == digits).then_some(index)
}

fn read_task_output(path: &Path) -> Result<TaskOutput, OutputParseError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Pull the configured result parameter out of the per-task result.
///
/// The result object maps unit identifiers to their parameter maps;
/// the first unit containing the key wins. Without a configured name,
/// or when no unit carries it, the whole result object is kept.
fn extract_result_value(result: Value, parameter: Option<&str>) -> Value {
    let Some(name) = parameter else {
        return result;
    };
    if let Value::Object(units) = &result {
        for unit_result in units.values() {
            if let Value::Object(entries) = unit_result {
                if let Some(value) = entries.get(name) {
                    return value.clone();
                }
            }
        }
    }
    tracing::debug!(
        parameter = name,
        "Result parameter not found; keeping full result object",
    );
    result
}
