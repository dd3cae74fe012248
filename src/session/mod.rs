//! Edit session guard
//!
//! An [`EditSession`] holds the working copy of one open script next to its
//! baseline, the last title/content known to be persisted. The session is
//! dirty exactly when the two differ. Saving is only meaningful while dirty,
//! and analysis is only allowed while clean, so a job never runs against
//! text the server has not seen.

use crate::model::{Draft, Script, ScriptId, ScriptUpdate, TextStats};
use crate::service::{ScriptStore, ServiceError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors from saving a session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    #[error("a save is already in progress for this script")]
    AlreadyInProgress,

    #[error("invalid script: {0}")]
    Validation(String),

    #[error("save failed: {0}")]
    Network(#[source] ServiceError),

    #[error("script is no longer open")]
    Closed,
}

/// Identity of one editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct SessionState {
    baseline: Draft,
    working: Draft,
    persisted: Script,
    saving: bool,
}

impl SessionState {
    fn dirty(&self) -> bool {
        self.working != self.baseline
    }
}

/// Working copy of one open script
#[derive(Debug)]
pub struct EditSession {
    id: SessionId,
    script_id: ScriptId,
    state: Mutex<SessionState>,
}

impl EditSession {
    /// Start a session on the persisted version of `script`.
    pub fn open(script: Script) -> Self {
        let draft = script.draft();
        let id = SessionId::new();
        debug!(session = %id, script = %script.id, "edit session opened");
        Self {
            id,
            script_id: script.id.clone(),
            state: Mutex::new(SessionState {
                baseline: draft.clone(),
                working: draft,
                persisted: script,
                saving: false,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn script_id(&self) -> &ScriptId {
        &self.script_id
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the working title and/or content. Returns the new dirty flag.
    pub fn edit(&self, title: Option<String>, content: Option<String>) -> bool {
        let mut state = self.state();
        if let Some(title) = title {
            state.working.title = title;
        }
        if let Some(content) = content {
            state.working.content = content;
        }
        state.dirty()
    }

    /// Working copy differs from the last persisted version
    pub fn is_dirty(&self) -> bool {
        self.state().dirty()
    }

    /// Analysis runs on persisted content, so it needs a clean session.
    pub fn can_analyze(&self) -> bool {
        !self.is_dirty()
    }

    /// There is something to save and no save is running
    pub fn can_save(&self) -> bool {
        let state = self.state();
        state.dirty() && !state.saving
    }

    pub fn is_saving(&self) -> bool {
        self.state().saving
    }

    pub fn working(&self) -> Draft {
        self.state().working.clone()
    }

    pub fn baseline(&self) -> Draft {
        self.state().baseline.clone()
    }

    /// Script as last returned by the store
    pub fn persisted(&self) -> Script {
        self.state().persisted.clone()
    }

    pub fn stats(&self) -> TextStats {
        self.state().working.stats()
    }

    /// Persist the working copy.
    ///
    /// A clean session returns the persisted script without I/O. On failure
    /// the session is left exactly as it was. Edits made while the request
    /// is in flight are kept: the baseline becomes the values that were sent,
    /// so the session stays dirty if the working copy moved on.
    pub async fn save(
        &self,
        store: &dyn ScriptStore,
        timeout: Duration,
    ) -> Result<Script, SaveError> {
        let snapshot = {
            let mut state = self.state();
            if state.saving {
                return Err(SaveError::AlreadyInProgress);
            }
            if !state.dirty() {
                return Ok(state.persisted.clone());
            }
            if state.working.title.trim().is_empty() {
                return Err(SaveError::Validation(
                    "script title must not be empty".to_string(),
                ));
            }
            state.saving = true;
            state.working.clone()
        };
        let _flag = SavingFlag(self);

        let update = ScriptUpdate::from(&snapshot);
        let outcome = tokio::time::timeout(timeout, store.update_script(&self.script_id, &update))
            .await
            .unwrap_or(Err(ServiceError::Timeout));

        match outcome {
            Ok(script) => {
                let mut state = self.state();
                state.baseline = snapshot;
                state.persisted = script.clone();
                info!(script = %self.script_id, dirty = state.dirty(), "script saved");
                Ok(script)
            }
            Err(err) if err.is_validation() => {
                warn!(script = %self.script_id, error = %err, "save rejected");
                Err(SaveError::Validation(err.to_string()))
            }
            Err(err) => {
                warn!(script = %self.script_id, error = %err, "save failed");
                Err(SaveError::Network(err))
            }
        }
    }
}

/// Clears the in-flight flag when a save settles or its future is dropped
struct SavingFlag<'a>(&'a EditSession);

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.0.state().saving = false;
    }
}

#[cfg(test)]
mod tests;
