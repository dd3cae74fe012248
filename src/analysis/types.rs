//! Observable analysis state and its configuration

use crate::model::TaskId;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Polling and timeout settings for one orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Fixed time between successive status queries
    pub poll_interval: Duration,
    /// Consecutive failed status queries before the task is abandoned
    pub max_poll_failures: u32,
    /// Bound on each submit and status call
    pub request_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_poll_failures: 5,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_failures(mut self, max: u32) -> Self {
        self.max_poll_failures = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Where an orchestrator is in the task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    Idle,
    Submitting,
    Processing,
    Completed,
    Failed,
}

impl AnalysisPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Error surface of the analysis lifecycle
///
/// `StaleContent`, `SubmitFailed` and `Cancelled` leave the orchestrator
/// Idle (or untouched); `PollingAbandoned` and `ServiceFailed` are terminal
/// Failed outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("script has unsaved changes; save before analyzing")]
    StaleContent,

    #[error("could not submit analysis: {0}")]
    SubmitFailed(String),

    #[error("gave up polling after {attempts} consecutive failed status queries")]
    PollingAbandoned { attempts: u32 },

    #[error("analysis failed: {0}")]
    ServiceFailed(String),

    #[error("analysis was cancelled")]
    Cancelled,
}

/// Snapshot of an orchestrator's observable state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStatus {
    pub phase: AnalysisPhase,
    /// Task being polled or the one that reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Present only when Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "error_message"
    )]
    pub error: Option<AnalysisError>,
}

fn error_message<S: Serializer>(
    error: &Option<AnalysisError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl Default for AnalysisStatus {
    fn default() -> Self {
        Self::idle()
    }
}

impl AnalysisStatus {
    pub fn idle() -> Self {
        Self {
            phase: AnalysisPhase::Idle,
            task_id: None,
            result: None,
            error: None,
        }
    }

    /// Idle after a rejected or failed submission
    pub fn rejected(error: AnalysisError) -> Self {
        Self {
            error: Some(error),
            ..Self::idle()
        }
    }

    pub fn submitting() -> Self {
        Self {
            phase: AnalysisPhase::Submitting,
            ..Self::idle()
        }
    }

    pub fn processing(task_id: TaskId) -> Self {
        Self {
            phase: AnalysisPhase::Processing,
            task_id: Some(task_id),
            ..Self::idle()
        }
    }

    pub fn completed(task_id: TaskId, result: serde_json::Value) -> Self {
        Self {
            phase: AnalysisPhase::Completed,
            task_id: Some(task_id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(task_id: TaskId, error: AnalysisError) -> Self {
        Self {
            phase: AnalysisPhase::Failed,
            task_id: Some(task_id),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadence() {
        let config = AnalysisConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.max_poll_failures, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn result_only_on_completed_and_error_only_on_failure() {
        let done = AnalysisStatus::completed(TaskId::from("t1"), serde_json::json!({"n": 1}));
        assert!(done.is_terminal());
        assert!(done.error.is_none());

        let failed = AnalysisStatus::failed(
            TaskId::from("t1"),
            AnalysisError::ServiceFailed("model quota exceeded".into()),
        );
        assert!(failed.is_terminal());
        assert!(failed.result.is_none());

        assert!(!AnalysisStatus::processing(TaskId::from("t1")).is_terminal());
    }

    #[test]
    fn status_serializes_error_as_message() {
        let status = AnalysisStatus::rejected(AnalysisError::StaleContent);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(
            json["error"],
            "script has unsaved changes; save before analyzing"
        );
        assert!(json.get("task_id").is_none());
    }
}
