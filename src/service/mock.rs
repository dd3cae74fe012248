//! Scripted in-memory service for tests
//!
//! `MockService` implements every service trait. Scripts, projects, and
//! entities are held in memory; submit outcomes and per-task status replies
//! are queued up front. Every call is recorded so tests can assert on what
//! was (and was not) sent.

use super::traits::{
    AnalysisService, EntityStore, ProjectStore, ScriptStore, ServiceError, ServiceResult,
};
use crate::model::{
    Entity, EntityId, EntityType, Project, ProjectId, QuestionRequest, QuestionResponse, Script,
    ScriptId, ScriptUpdate, SubmitResponse, TaskId, TaskStatusResponse,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply to a status query
#[derive(Debug, Clone)]
pub enum PollStep {
    /// Answer immediately
    Respond(TaskStatusResponse),
    /// Answer after a delay
    Delayed(Duration, TaskStatusResponse),
    /// Fail with a transport-level error
    Fail(ServiceError),
    /// Never answer; the caller's timeout has to fire
    Hang,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListProjects,
    GetProject(ProjectId),
    AskQuestion(ProjectId, String),
    GetScript(ScriptId),
    ListScripts(ProjectId),
    UpdateScript(ScriptId, ScriptUpdate),
    Submit(ScriptId),
    TaskStatus(TaskId),
    ListEntities(ProjectId, Option<EntityType>),
    GetEntity(EntityId),
}

/// In-memory implementation of every service trait
#[derive(Default)]
pub struct MockService {
    projects: Mutex<Vec<Project>>,
    scripts: Mutex<HashMap<ScriptId, Script>>,
    entities: Mutex<Vec<Entity>>,
    answers: Mutex<VecDeque<String>>,
    submits: Mutex<VecDeque<ServiceResult<TaskId>>>,
    issued: Mutex<HashSet<TaskId>>,
    next_task: AtomicU64,
    polls: Mutex<HashMap<TaskId, VecDeque<PollStep>>>,
    update_failures: Mutex<VecDeque<ServiceError>>,
    update_delay: Mutex<Duration>,
    submit_delay: Mutex<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, project: Project) -> Self {
        self.projects.lock().unwrap().push(project);
        self
    }

    pub fn with_script(self, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(script.id.clone(), script);
        self
    }

    pub fn with_entity(self, entity: Entity) -> Self {
        self.entities.lock().unwrap().push(entity);
        self
    }

    /// Queue the task id the next submit call returns.
    ///
    /// With nothing queued, submits get `task-1`, `task-2`, ...
    pub fn queue_submit(&self, task_id: impl Into<TaskId>) {
        self.submits.lock().unwrap().push_back(Ok(task_id.into()));
    }

    /// Queue a failure for the next submit call.
    pub fn queue_submit_failure(&self, error: ServiceError) {
        self.submits.lock().unwrap().push_back(Err(error));
    }

    /// Queue a status reply for `task_id`.
    ///
    /// Once a task's queue is drained it keeps answering PROCESSING.
    pub fn queue_poll(&self, task_id: impl Into<TaskId>, step: PollStep) {
        self.polls
            .lock()
            .unwrap()
            .entry(task_id.into())
            .or_default()
            .push_back(step);
    }

    /// Queue the answer to the next question.
    ///
    /// With nothing queued, questions get a fixed "no answer" reply.
    pub fn queue_answer(&self, answer: impl Into<String>) {
        self.answers.lock().unwrap().push_back(answer.into());
    }

    /// Queue a failure for the next script update.
    pub fn queue_update_failure(&self, error: ServiceError) {
        self.update_failures.lock().unwrap().push_back(error);
    }

    /// Make every script update take `delay` before answering.
    pub fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = delay;
    }

    /// Make every submit take `delay` before answering.
    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = delay;
    }

    /// Every call so far, in issue order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Submit(_)))
    }

    pub fn update_count(&self) -> usize {
        self.count(|c| matches!(c, Call::UpdateScript(..)))
    }

    /// Number of status queries issued for `task_id`
    pub fn poll_count(&self, task_id: &str) -> usize {
        self.count(|c| matches!(c, Call::TaskStatus(t) if t.as_str() == task_id))
    }

    /// Stored version of a script
    pub fn stored_script(&self, id: &str) -> Option<Script> {
        self.scripts.lock().unwrap().get(&ScriptId::from(id)).cloned()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProjectStore for MockService {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        self.record(Call::ListProjects);
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn get_project(&self, id: &ProjectId) -> ServiceResult<Project> {
        self.record(Call::GetProject(id.clone()));
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Project {} not found", id)))
    }

    async fn ask_question(
        &self,
        project_id: &ProjectId,
        question: &QuestionRequest,
    ) -> ServiceResult<QuestionResponse> {
        self.record(Call::AskQuestion(
            project_id.clone(),
            question.question.clone(),
        ));
        if !self.projects.lock().unwrap().iter().any(|p| &p.id == project_id) {
            return Err(ServiceError::NotFound("Project not found".to_string()));
        }
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Could not find an answer.".to_string());
        Ok(QuestionResponse {
            question: question.question.clone(),
            answer,
            source_chunks: Vec::new(),
        })
    }
}

#[async_trait]
impl ScriptStore for MockService {
    async fn get_script(&self, id: &ScriptId) -> ServiceResult<Script> {
        self.record(Call::GetScript(id.clone()));
        self.scripts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Script {} not found", id)))
    }

    async fn list_scripts(&self, project_id: &ProjectId) -> ServiceResult<Vec<Script>> {
        self.record(Call::ListScripts(project_id.clone()));
        let mut scripts: Vec<Script> = self
            .scripts
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.project_id == project_id)
            .cloned()
            .collect();
        scripts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(scripts)
    }

    async fn update_script(&self, id: &ScriptId, update: &ScriptUpdate) -> ServiceResult<Script> {
        self.record(Call::UpdateScript(id.clone(), update.clone()));
        let delay = *self.update_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.update_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Script {} not found", id)))?;
        if let Some(title) = &update.title {
            script.title = title.clone();
        }
        if let Some(content) = &update.content {
            script.content = content.clone();
        }
        script.updated_at = Utc::now();
        Ok(script.clone())
    }
}

#[async_trait]
impl AnalysisService for MockService {
    async fn submit(&self, script_id: &ScriptId) -> ServiceResult<SubmitResponse> {
        self.record(Call::Submit(script_id.clone()));
        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let queued = self.submits.lock().unwrap().pop_front();
        let task_id = match queued {
            Some(Ok(task_id)) => task_id,
            Some(Err(err)) => return Err(err),
            None => {
                let n = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
                TaskId::from_string(format!("task-{}", n))
            }
        };
        self.issued.lock().unwrap().insert(task_id.clone());
        Ok(SubmitResponse {
            message: "Analysis started".to_string(),
            task_id,
        })
    }

    async fn task_status(&self, task_id: &TaskId) -> ServiceResult<TaskStatusResponse> {
        self.record(Call::TaskStatus(task_id.clone()));
        if !self.issued.lock().unwrap().contains(task_id) {
            return Err(ServiceError::NotFound(format!("Task {} not found", task_id)));
        }

        let step = self
            .polls
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(|queue| queue.pop_front());
        match step {
            None => Ok(TaskStatusResponse::processing()),
            Some(PollStep::Respond(resp)) => Ok(resp),
            Some(PollStep::Delayed(delay, resp)) => {
                tokio::time::sleep(delay).await;
                Ok(resp)
            }
            Some(PollStep::Fail(err)) => Err(err),
            Some(PollStep::Hang) => std::future::pending().await,
        }
    }
}

#[async_trait]
impl EntityStore for MockService {
    async fn list_entities(
        &self,
        project_id: &ProjectId,
        entity_type: Option<EntityType>,
    ) -> ServiceResult<Vec<Entity>> {
        self.record(Call::ListEntities(project_id.clone(), entity_type));
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.project_id == project_id)
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .cloned()
            .collect())
    }

    async fn get_entity(&self, id: &EntityId) -> ServiceResult<Entity> {
        self.record(Call::GetEntity(id.clone()));
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Entity {} not found", id)))
    }
}

/// Helper to construct a script for testing.
pub fn mock_script(id: &str, project_id: &str, title: &str, content: &str) -> Script {
    let now = Utc::now();
    Script {
        id: ScriptId::from(id),
        project_id: ProjectId::from(project_id),
        title: title.to_string(),
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Helper to construct a project for testing.
pub fn mock_project(id: &str, title: &str) -> Project {
    let now = Utc::now();
    Project {
        id: ProjectId::from(id),
        title: title.to_string(),
        description: None,
        created_at: now,
        updated_at: now,
    }
}

/// Helper to construct an entity for testing.
pub fn mock_entity(id: &str, project_id: &str, entity_type: EntityType, name: &str) -> Entity {
    Entity {
        id: EntityId::from(id),
        project_id: ProjectId::from(project_id),
        script_id: None,
        entity_type,
        name: name.to_string(),
        description: None,
        attributes: BTreeMap::new(),
        created_at: Some(Utc::now()),
    }
}
