//! Domain and wire types shared by the editor, the orchestrator, and the
//! service clients.

mod entity;
mod ids;
mod project;
mod question;
mod script;
mod task;
pub(crate) mod timestamp;

pub use entity::{Entity, EntityType, ParseEntityTypeError};
pub use ids::{EntityId, ProjectId, ScriptId, TaskId};
pub use project::Project;
pub use question::{QuestionRequest, QuestionResponse};
pub use script::{Draft, Script, ScriptUpdate, TextStats};
pub use task::{SubmitResponse, TaskStatus, TaskStatusResponse};
