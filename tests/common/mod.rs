//! Shared fixtures for the integration tests

#![allow(dead_code)]

use scribe::model::{ScriptId, TaskStatusResponse};
use scribe::service::mock::{mock_entity, mock_script, MockService, PollStep};
use scribe::{AnalysisConfig, AnalysisStatus, EntityType, OpenScript, Workspace};
use std::sync::Arc;
use std::time::Duration;

pub const PROJECT: &str = "p1";
pub const SCRIPT: &str = "s1";

/// Mock backend holding two scripts and a handful of entities of project `p1`
pub fn backend() -> Arc<MockService> {
    Arc::new(
        MockService::new()
            .with_script(mock_script(SCRIPT, PROJECT, "A", "Chapter 1"))
            .with_script(mock_script("s2", PROJECT, "B", "Prologue"))
            .with_entity(mock_entity("e1", PROJECT, EntityType::Character, "Mara"))
            .with_entity(mock_entity("e2", PROJECT, EntityType::Character, "Ilse"))
            .with_entity(mock_entity("e3", PROJECT, EntityType::Location, "Harbour"))
            .with_entity(mock_entity("e4", PROJECT, EntityType::Event, "The storm")),
    )
}

pub fn workspace(service: &Arc<MockService>) -> Workspace {
    workspace_with(service, AnalysisConfig::default())
}

pub fn workspace_with(service: &Arc<MockService>, config: AnalysisConfig) -> Workspace {
    Workspace::new(service.clone(), service.clone(), config)
}

pub async fn open(workspace: &Workspace, id: &str) -> Arc<OpenScript> {
    workspace
        .open(&ScriptId::from(id))
        .await
        .expect("script should open")
}

/// Wait until the script's analysis reaches a terminal status.
pub async fn wait_terminal(script: &OpenScript) -> AnalysisStatus {
    let mut rx = script.subscribe();
    let status = rx
        .wait_for(|s| s.is_terminal())
        .await
        .expect("orchestrator dropped")
        .clone();
    status
}

/// Collect every status published on `script` over `span` of (paused) time.
pub async fn collect_for(script: &OpenScript, span: Duration) -> Vec<AnalysisStatus> {
    let mut rx = script.subscribe();
    let mut seen = vec![rx.borrow_and_update().clone()];
    let deadline = tokio::time::Instant::now() + span;
    while let Ok(Ok(())) = tokio::time::timeout_at(deadline, rx.changed()).await {
        seen.push(rx.borrow_and_update().clone());
    }
    seen
}

pub fn respond(resp: TaskStatusResponse) -> PollStep {
    PollStep::Respond(resp)
}
