//! Service trait definitions

use crate::model::{
    Entity, EntityId, EntityType, Project, ProjectId, QuestionRequest, QuestionResponse, Script,
    ScriptId, ScriptUpdate, SubmitResponse, TaskId, TaskStatusResponse,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by any external collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("response decode error: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Whether the server rejected the request body (400 or 422)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Api { status: 400 | 422, .. })
    }
}

/// Result type for service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Read access to projects
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>>;

    async fn get_project(&self, id: &ProjectId) -> ServiceResult<Project>;

    /// Ask a free-form question answered from the project's scripts
    async fn ask_question(
        &self,
        project_id: &ProjectId,
        question: &QuestionRequest,
    ) -> ServiceResult<QuestionResponse>;
}

/// The persisted home of script documents
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Current persisted version of a script
    async fn get_script(&self, id: &ScriptId) -> ServiceResult<Script>;

    /// All scripts of a project
    async fn list_scripts(&self, project_id: &ProjectId) -> ServiceResult<Vec<Script>>;

    /// Persist new title/content and return the stored script
    async fn update_script(&self, id: &ScriptId, update: &ScriptUpdate) -> ServiceResult<Script>;
}

/// The background analysis service
///
/// Exposes no push channel; callers poll `task_status` until the task
/// reaches a terminal status.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Start a background analysis of the script's persisted content
    async fn submit(&self, script_id: &ScriptId) -> ServiceResult<SubmitResponse>;

    /// Current status of a task
    async fn task_status(&self, task_id: &TaskId) -> ServiceResult<TaskStatusResponse>;
}

/// Read access to extracted entities
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list_entities(
        &self,
        project_id: &ProjectId,
        entity_type: Option<EntityType>,
    ) -> ServiceResult<Vec<Entity>>;

    async fn get_entity(&self, id: &EntityId) -> ServiceResult<Entity>;
}
