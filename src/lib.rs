//! Scribe: script editing sessions and asynchronous analysis jobs
//!
//! Client-side core for a story-analysis backend. Writers open scripts,
//! edit them locally, save them, and submit analysis jobs that extract
//! characters, locations, and events. The backend processes jobs
//! asynchronously and offers no push channel, so completion is discovered
//! by polling.
//!
//! # Core Concepts
//!
//! - **Edit session**: working copy of one script plus its persisted baseline;
//!   dirty exactly when they differ
//! - **Analysis orchestrator**: per-script state machine
//!   (Idle, Submitting, Processing, Completed, Failed) with a single live poll loop
//! - **Workspace**: registry of open scripts, each with its own session and
//!   orchestrator
//! - **Entity browser**: read-only view of a project's extracted entities
//! - **Project Q&A**: free-form questions answered from a project's scripts
//!
//! # Example
//!
//! ```
//! use scribe::{AnalysisConfig, MockService, Workspace};
//! use std::sync::Arc;
//!
//! let service = Arc::new(MockService::new());
//! let workspace = Workspace::new(service.clone(), service, AnalysisConfig::default());
//! assert_eq!(workspace.open_count(), 0);
//! ```

pub mod analysis;
pub mod config;
pub mod entities;
pub mod model;
pub mod service;
pub mod session;
pub mod workspace;

pub use analysis::{AnalysisConfig, AnalysisError, AnalysisOrchestrator, AnalysisPhase, AnalysisStatus};
pub use config::{Config, ConfigError};
pub use entities::{group_by_type, EntityBrowser};
pub use model::{
    Draft, Entity, EntityId, EntityType, Project, ProjectId, QuestionRequest, QuestionResponse,
    Script, ScriptId, ScriptUpdate, TaskId, TaskStatus, TaskStatusResponse, TextStats,
};
pub use service::{
    AnalysisService, EntityStore, HttpService, MockService, ProjectStore, ScriptStore,
    ServiceError, ServiceResult,
};
pub use session::{EditSession, SaveError, SessionId};
pub use workspace::{OpenScript, Workspace, WorkspaceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
