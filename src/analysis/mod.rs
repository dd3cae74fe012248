//! Asynchronous analysis job lifecycle
//!
//! A script is submitted to the analysis service, which answers with an
//! opaque task id. The orchestrator then polls the task until it reaches a
//! terminal status, publishing every transition on a watch channel.
//!
//! # State machine
//!
//! ```text
//! Idle ──analyze──▶ Submitting ──task id──▶ Processing ──COMPLETED──▶ Completed
//!   ▲                   │                      │  │
//!   └──submit failed────┘                      │  └──FAILED / abandoned──▶ Failed
//!   └──stale content (guard)                   └──analyze again: supersede
//! ```
//!
//! Completed and Failed accept a new `analyze()`, which starts a fresh task.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = AnalysisOrchestrator::new(script_id, service, AnalysisConfig::default());
//! let task_id = orchestrator.analyze(&session).await?;
//! let mut status = orchestrator.subscribe();
//! let done = status.wait_for(|s| s.is_terminal()).await?;
//! ```

mod cancel;
mod orchestrator;
mod types;

pub use cancel::{CancellationToken, Generation};
pub use orchestrator::AnalysisOrchestrator;
pub use types::{AnalysisConfig, AnalysisError, AnalysisPhase, AnalysisStatus};
