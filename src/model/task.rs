//! Analysis task wire types

use super::ids::TaskId;
use serde::{Deserialize, Serialize};

/// Server-side status of an analysis task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Completed or Failed: no further polling
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Response to a submit call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub message: String,
    pub task_id: TaskId,
}

/// Response to a status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub status: TaskStatus,
    /// Present only when `status` is COMPLETED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Present only when `status` is FAILED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusResponse {
    pub fn processing() -> Self {
        Self {
            status: TaskStatus::Processing,
            result: None,
            error: None,
        }
    }

    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            status: TaskStatus::Completed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }
}
