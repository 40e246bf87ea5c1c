//! Typed job status enums.
//!
//! A farm job carries two orthogonal status axes: the lifecycle of the
//! job record itself (created/uploaded/updated/archived) and the
//! aggregate run state of its tasks. Both tolerate unknown service
//! values by decoding to `Unknown` instead of failing the poll.

use serde::{Deserialize, Serialize};

/// Management state of the job record, orthogonal to task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    UploadInProgress,
    UploadFailed,
    UpdateInProgress,
    UpdateFailed,
    UpdateSucceeded,
    Archived,
    #[serde(other)]
    Unknown,
}

impl LifecycleStatus {
    /// Lifecycle states that terminate polling as a failure.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::CreateFailed | Self::UploadFailed | Self::UpdateFailed | Self::Archived
        )
    }
}

/// Aggregate execution state of the job's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRunStatus {
    #[default]
    Pending,
    Ready,
    Assigned,
    Starting,
    Scheduled,
    Interrupting,
    Running,
    Suspended,
    Canceled,
    Failed,
    Succeeded,
    NotCompatible,
    #[serde(other)]
    Unknown,
}

impl TaskRunStatus {
    /// Run states in which the tasks will make no further progress.
    pub fn is_completed(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::NotCompatible
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_failure_subset() {
        for status in [
            LifecycleStatus::CreateFailed,
            LifecycleStatus::UploadFailed,
            LifecycleStatus::UpdateFailed,
            LifecycleStatus::Archived,
        ] {
            assert!(status.is_failure(), "{status:?} should be a failure");
        }
        for status in [
            LifecycleStatus::CreateInProgress,
            LifecycleStatus::CreateComplete,
            LifecycleStatus::UploadInProgress,
            LifecycleStatus::UpdateInProgress,
            LifecycleStatus::UpdateSucceeded,
            LifecycleStatus::Unknown,
        ] {
            assert!(!status.is_failure(), "{status:?} should not be a failure");
        }
    }

    #[test]
    fn task_run_completed_subset() {
        for status in [
            TaskRunStatus::Succeeded,
            TaskRunStatus::Failed,
            TaskRunStatus::Canceled,
            TaskRunStatus::NotCompatible,
        ] {
            assert!(status.is_completed(), "{status:?} should be completed");
        }
        for status in [
            TaskRunStatus::Pending,
            TaskRunStatus::Ready,
            TaskRunStatus::Running,
            TaskRunStatus::Suspended,
            TaskRunStatus::Unknown,
        ] {
            assert!(!status.is_completed(), "{status:?} should not be completed");
        }
    }

    #[test]
    fn statuses_use_screaming_snake_case_on_the_wire() {
        let json = serde_json::to_string(&LifecycleStatus::CreateInProgress).unwrap();
        assert_eq!(json, "\"CREATE_IN_PROGRESS\"");
        let json = serde_json::to_string(&TaskRunStatus::NotCompatible).unwrap();
        assert_eq!(json, "\"NOT_COMPATIBLE\"");
    }

    #[test]
    fn unknown_service_values_decode_to_unknown() {
        let status: LifecycleStatus = serde_json::from_str("\"SOME_NEW_STATE\"").unwrap();
        assert_eq!(status, LifecycleStatus::Unknown);
        let status: TaskRunStatus = serde_json::from_str("\"SOME_NEW_STATE\"").unwrap();
        assert_eq!(status, TaskRunStatus::Unknown);
    }

    #[test]
    fn known_values_round_trip() {
        let status: TaskRunStatus = serde_json::from_str("\"SUCCEEDED\"").unwrap();
        assert_eq!(status, TaskRunStatus::Succeeded);
        let status: LifecycleStatus = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(status, LifecycleStatus::Archived);
    }
}
