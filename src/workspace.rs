//! Workspace: the registry of open scripts
//!
//! Each open script owns one edit session and one analysis orchestrator.
//! The workspace maps script ids to those entries; opening creates the
//! entry, closing stops its poll loop and drops it. Entries for different
//! scripts are independent: nothing here is a global lock.

use crate::analysis::{AnalysisConfig, AnalysisError, AnalysisOrchestrator, AnalysisStatus};
use crate::model::{Script, ScriptId, TaskId, TextStats};
use crate::service::{AnalysisService, ScriptStore, ServiceError};
use crate::session::{EditSession, SaveError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

/// Errors from workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("could not open script {id}: {source}")]
    Open {
        id: ScriptId,
        #[source]
        source: ServiceError,
    },
}

/// One open script: its edit session, its orchestrator, and the lane that
/// keeps saves and analysis submissions from overlapping.
pub struct OpenScript {
    session: EditSession,
    orchestrator: AnalysisOrchestrator,
    store: Arc<dyn ScriptStore>,
    config: AnalysisConfig,
    lane: tokio::sync::Mutex<()>,
    save_pending: AtomicBool,
    closed: AtomicBool,
}

impl OpenScript {
    fn new(
        script: Script,
        store: Arc<dyn ScriptStore>,
        service: Arc<dyn AnalysisService>,
        config: AnalysisConfig,
    ) -> Self {
        let orchestrator = AnalysisOrchestrator::new(script.id.clone(), service, config.clone());
        Self {
            session: EditSession::open(script),
            orchestrator,
            store,
            config,
            lane: tokio::sync::Mutex::new(()),
            save_pending: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn script_id(&self) -> &ScriptId {
        self.session.script_id()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator {
        &self.orchestrator
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Local edit; returns the new dirty flag.
    pub fn edit(&self, title: Option<String>, content: Option<String>) -> bool {
        self.session.edit(title, content)
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    pub fn can_analyze(&self) -> bool {
        self.session.can_analyze()
    }

    pub fn stats(&self) -> TextStats {
        self.session.stats()
    }

    /// Persist the working copy.
    ///
    /// A second save while one is pending is rejected with
    /// `AlreadyInProgress`. A save waits for an analysis submission that is
    /// already in flight.
    pub async fn save(&self) -> Result<Script, SaveError> {
        if self.is_closed() {
            return Err(SaveError::Closed);
        }
        if self.save_pending.swap(true, Ordering::SeqCst) {
            return Err(SaveError::AlreadyInProgress);
        }
        let _pending = PendingSave(&self.save_pending);

        let _lane = self.lane.lock().await;
        if self.is_closed() {
            return Err(SaveError::Closed);
        }
        self.session
            .save(self.store.as_ref(), self.config.request_timeout)
            .await
    }

    /// Submit an analysis of the persisted script.
    ///
    /// Waits for a pending save to settle, then defers to the orchestrator,
    /// which refuses while the session is dirty.
    pub async fn analyze(&self) -> Result<TaskId, AnalysisError> {
        if self.is_closed() {
            return Err(AnalysisError::Cancelled);
        }
        let _lane = self.lane.lock().await;
        if self.is_closed() {
            return Err(AnalysisError::Cancelled);
        }
        self.orchestrator.analyze(&self.session).await
    }

    pub fn analysis_status(&self) -> AnalysisStatus {
        self.orchestrator.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.orchestrator.subscribe()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.orchestrator.close();
    }
}

impl std::fmt::Debug for OpenScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenScript")
            .field("script_id", self.script_id())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

struct PendingSave<'a>(&'a AtomicBool);

impl Drop for PendingSave<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Registry of open scripts
pub struct Workspace {
    scripts: Arc<dyn ScriptStore>,
    analysis: Arc<dyn AnalysisService>,
    config: AnalysisConfig,
    open: DashMap<ScriptId, Arc<OpenScript>>,
}

impl Workspace {
    pub fn new(
        scripts: Arc<dyn ScriptStore>,
        analysis: Arc<dyn AnalysisService>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            scripts,
            analysis,
            config,
            open: DashMap::new(),
        }
    }

    /// Open a script for editing, fetching its persisted version.
    ///
    /// Returns the existing entry if the script is already open.
    pub async fn open(&self, id: &ScriptId) -> Result<Arc<OpenScript>, WorkspaceError> {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let script = tokio::time::timeout(self.config.request_timeout, self.scripts.get_script(id))
            .await
            .unwrap_or(Err(ServiceError::Timeout))
            .map_err(|source| WorkspaceError::Open {
                id: id.clone(),
                source,
            })?;
        Ok(self.open_script(script))
    }

    /// Open an already fetched script.
    ///
    /// Returns the existing entry if the script is already open.
    pub fn open_script(&self, script: Script) -> Arc<OpenScript> {
        let id = script.id.clone();
        self.open
            .entry(id.clone())
            .or_insert_with(|| {
                info!(script = %id, "script opened");
                Arc::new(OpenScript::new(
                    script,
                    self.scripts.clone(),
                    self.analysis.clone(),
                    self.config.clone(),
                ))
            })
            .clone()
    }

    pub fn get(&self, id: &ScriptId) -> Option<Arc<OpenScript>> {
        self.open.get(id).map(|r| r.value().clone())
    }

    /// Close a script: stop its poll loop and drop its session.
    ///
    /// No status change is observable on the entry once this returns.
    pub fn close(&self, id: &ScriptId) -> bool {
        match self.open.remove(id) {
            Some((_, entry)) => {
                entry.close();
                info!(script = %id, "script closed");
                true
            }
            None => false,
        }
    }

    pub fn close_all(&self) {
        let ids: Vec<ScriptId> = self.open.iter().map(|r| r.key().clone()).collect();
        for id in ids {
            self.close(&id);
        }
    }

    pub fn is_open(&self, id: &ScriptId) -> bool {
        self.open.contains_key(id)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_scripts(&self) -> Vec<ScriptId> {
        let mut ids: Vec<ScriptId> = self.open.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        debug!(open = self.open.len(), "workspace dropped");
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mock::{mock_script, MockService};

    fn workspace() -> (Arc<MockService>, Workspace) {
        let service = Arc::new(
            MockService::new()
                .with_script(mock_script("s1", "p1", "A", "Chapter 1"))
                .with_script(mock_script("s2", "p1", "B", "Prologue")),
        );
        let ws = Workspace::new(service.clone(), service.clone(), AnalysisConfig::default());
        (service, ws)
    }

    #[tokio::test]
    async fn open_fetches_once_and_reuses_the_entry() {
        let (service, ws) = workspace();
        let id = ScriptId::from("s1");

        let first = ws.open(&id).await.unwrap();
        let second = ws.open(&id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ws.open_count(), 1);
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn open_unknown_script_fails() {
        let (_service, ws) = workspace();
        let err = ws.open(&ScriptId::from("missing")).await.unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::Open {
                source: ServiceError::NotFound(_),
                ..
            }
        ));
        assert_eq!(ws.open_count(), 0);
    }

    #[tokio::test]
    async fn debug_shows_id_and_closed_flag() {
        let (_service, ws) = workspace();
        let handle = ws.open(&ScriptId::from("s1")).await.unwrap();
        let shown = format!("{:?}", handle);
        assert!(shown.contains("s1"));
        assert!(shown.contains("closed: false"));
    }

    #[tokio::test]
    async fn scripts_have_independent_sessions() {
        let (_service, ws) = workspace();
        let s1 = ws.open(&ScriptId::from("s1")).await.unwrap();
        let s2 = ws.open(&ScriptId::from("s2")).await.unwrap();

        s1.edit(Some("A*".into()), None);
        assert!(s1.is_dirty());
        assert!(!s2.is_dirty());
        assert_eq!(
            ws.open_scripts(),
            vec![ScriptId::from("s1"), ScriptId::from("s2")]
        );
    }

    #[tokio::test]
    async fn close_removes_the_entry_and_disables_the_handle() {
        let (_service, ws) = workspace();
        let id = ScriptId::from("s1");
        let handle = ws.open(&id).await.unwrap();

        assert!(ws.close(&id));
        assert!(!ws.is_open(&id));
        assert!(!ws.close(&id));
        assert!(handle.is_closed());
        assert!(handle.orchestrator().is_closed());
        assert_eq!(handle.analyze().await, Err(AnalysisError::Cancelled));
        assert_eq!(handle.save().await, Err(SaveError::Closed));
    }

    #[tokio::test]
    async fn reopening_after_close_starts_a_fresh_session() {
        let (_service, ws) = workspace();
        let id = ScriptId::from("s1");
        let first = ws.open(&id).await.unwrap();
        first.edit(Some("unsaved".into()), None);
        ws.close(&id);

        let second = ws.open(&id).await.unwrap();
        assert_ne!(first.session().id(), second.session().id());
        assert!(!second.is_dirty());
    }
}
