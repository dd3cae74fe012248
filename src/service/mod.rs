//! External collaborators: the backend's script store, analysis service,
//! and entity store.
//!
//! The core only talks to these through the traits in this module, so the
//! transport can be swapped:
//! - `HttpService`: REST client for the backend API (production)
//! - `MockService`: scripted in-memory responses (testing)

mod http;
pub mod mock;
mod traits;

pub use http::{HttpService, DEFAULT_BASE_URL};
pub use mock::MockService;
pub use traits::{
    AnalysisService, EntityStore, ProjectStore, ScriptStore, ServiceError, ServiceResult,
};
