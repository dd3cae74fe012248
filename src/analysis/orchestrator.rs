//! Analysis task orchestrator
//!
//! Drives one script's analysis job from submission to a terminal outcome.
//! The service has no push channel, so a spawned poll loop queries the task
//! status at a fixed interval. Exactly one loop is live per orchestrator: a
//! new submission or `cancel()` advances the generation, and every status
//! write re-checks the generation under the same lock, so nothing from a
//! superseded loop is observable once the call that superseded it returns.

use super::cancel::{CancellationToken, Generation};
use super::types::{AnalysisConfig, AnalysisError, AnalysisPhase, AnalysisStatus};
use crate::model::{ScriptId, TaskId, TaskStatus};
use crate::service::{AnalysisService, ServiceError};
use crate::session::EditSession;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Current status plus the generation that may write it
struct StatusCell {
    generation: Generation,
    /// Serializes generation checks with status writes; holds the closed flag
    gate: Mutex<bool>,
    tx: watch::Sender<AnalysisStatus>,
}

impl StatusCell {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(AnalysisStatus::idle());
        Self {
            generation: Generation::new(),
            gate: Mutex::new(false),
            tx,
        }
    }

    fn gate(&self) -> MutexGuard<'_, bool> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> AnalysisStatus {
        self.tx.borrow().clone()
    }

    fn is_closed(&self) -> bool {
        *self.gate()
    }

    /// Publish `status` unless `token` has been superseded.
    fn publish(&self, token: &CancellationToken, status: AnalysisStatus) -> bool {
        let _gate = self.gate();
        if token.is_cancelled() {
            return false;
        }
        self.tx.send_replace(status);
        true
    }

    /// Invalidate every outstanding loop and publish the first status of a
    /// new generation. Returns `None` once the cell is closed.
    fn restart(&self, status: AnalysisStatus) -> Option<CancellationToken> {
        let closed = self.gate();
        if *closed {
            return None;
        }
        let token = self.generation.advance();
        self.tx.send_replace(status);
        Some(token)
    }

    /// Invalidate every outstanding loop, leaving the status as it is.
    fn cancel(&self) {
        let _gate = self.gate();
        self.generation.cancel_all();
    }

    /// Cancel for good: no later generation can start.
    fn close(&self) {
        let mut closed = self.gate();
        *closed = true;
        self.generation.cancel_all();
    }

    /// Record a rejected request, unless a task is being polled or the cell
    /// is closed.
    fn reject(&self, error: AnalysisError) {
        let closed = self.gate();
        if *closed || self.tx.borrow().phase == AnalysisPhase::Processing {
            return;
        }
        self.generation.cancel_all();
        self.tx.send_replace(AnalysisStatus::rejected(error));
    }
}

/// Client-side state machine for one script's analysis job
pub struct AnalysisOrchestrator {
    script_id: ScriptId,
    service: Arc<dyn AnalysisService>,
    config: AnalysisConfig,
    cell: Arc<StatusCell>,
    /// Serializes submissions
    submit_lane: tokio::sync::Mutex<()>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl AnalysisOrchestrator {
    pub fn new(
        script_id: ScriptId,
        service: Arc<dyn AnalysisService>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            script_id,
            service,
            config,
            cell: Arc::new(StatusCell::new()),
            submit_lane: tokio::sync::Mutex::new(()),
            poller: Mutex::new(None),
        }
    }

    pub fn script_id(&self) -> &ScriptId {
        &self.script_id
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Snapshot of the observable state
    pub fn status(&self) -> AnalysisStatus {
        self.cell.current()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.cell.tx.subscribe()
    }

    /// Whether a poll loop is still running
    pub fn is_polling(&self) -> bool {
        self.poller()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn poller(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abort_poller(&self) {
        if let Some(handle) = self.poller().take() {
            handle.abort();
        }
    }

    /// Submit a new analysis of the script's persisted content.
    ///
    /// Refused with `StaleContent` while `session` has unsaved edits; no
    /// request is made in that case. Otherwise any running poll loop is
    /// stopped first, the prior result is discarded, and the job is
    /// submitted. On success the task id is recorded, the orchestrator
    /// enters Processing, and polling starts. On failure it returns to Idle
    /// and no task id is kept.
    ///
    /// Concurrent calls are serialized: a second call waits for the first
    /// submission to settle and then supersedes its task.
    pub async fn analyze(&self, session: &EditSession) -> Result<TaskId, AnalysisError> {
        debug_assert_eq!(session.script_id(), &self.script_id);
        let _lane = self.submit_lane.lock().await;
        if self.cell.is_closed() {
            return Err(AnalysisError::Cancelled);
        }

        if !session.can_analyze() {
            debug!(script = %self.script_id, "analysis refused: unsaved changes");
            self.cell.reject(AnalysisError::StaleContent);
            return Err(AnalysisError::StaleContent);
        }

        let Some(token) = self.cell.restart(AnalysisStatus::submitting()) else {
            debug!(script = %self.script_id, "analysis refused: orchestrator closed");
            return Err(AnalysisError::Cancelled);
        };
        self.abort_poller();
        info!(script = %self.script_id, "submitting analysis");

        let submitted = tokio::time::timeout(
            self.config.request_timeout,
            self.service.submit(&self.script_id),
        )
        .await
        .unwrap_or(Err(ServiceError::Timeout));

        let task_id = match submitted {
            Ok(resp) => resp.task_id,
            Err(err) => {
                warn!(script = %self.script_id, error = %err, "analysis submit failed");
                let error = AnalysisError::SubmitFailed(err.to_string());
                if !self.cell.publish(&token, AnalysisStatus::rejected(error.clone())) {
                    return Err(AnalysisError::Cancelled);
                }
                return Err(error);
            }
        };

        if !self
            .cell
            .publish(&token, AnalysisStatus::processing(task_id.clone()))
        {
            debug!(script = %self.script_id, task = %task_id, "cancelled during submit");
            return Err(AnalysisError::Cancelled);
        }
        info!(script = %self.script_id, task = %task_id, "analysis task accepted");

        let handle = tokio::spawn(poll_until_terminal(
            self.cell.clone(),
            self.service.clone(),
            task_id.clone(),
            token.clone(),
            self.config.clone(),
        ));
        *self.poller() = Some(handle);
        if token.is_cancelled() {
            self.abort_poller();
        }

        Ok(task_id)
    }

    /// Stop polling now.
    ///
    /// Once this returns no further status change is observable from the
    /// current task, even if a status request is still in flight. The status
    /// keeps its last value.
    pub fn cancel(&self) {
        self.cell.cancel();
        self.abort_poller();
        debug!(script = %self.script_id, "analysis polling cancelled");
    }

    /// Stop polling and refuse every later `analyze()` with `Cancelled`.
    ///
    /// A submission racing with this call either sees the close and makes
    /// no request, or its task is cancelled before it can publish.
    pub fn close(&self) {
        self.cell.close();
        self.abort_poller();
        debug!(script = %self.script_id, "analysis orchestrator closed");
    }

    pub fn is_closed(&self) -> bool {
        self.cell.is_closed()
    }
}

impl Drop for AnalysisOrchestrator {
    fn drop(&mut self) {
        self.cell.close();
        self.abort_poller();
    }
}

/// Poll `task_id` at a fixed cadence until a terminal status, the failure
/// threshold, or cancellation.
async fn poll_until_terminal(
    cell: Arc<StatusCell>,
    service: Arc<dyn AnalysisService>,
    task_id: TaskId,
    token: CancellationToken,
    config: AnalysisConfig,
) {
    let max_failures = config.max_poll_failures.max(1);
    let mut ticks = tokio::time::interval_at(
        Instant::now() + config.poll_interval,
        config.poll_interval,
    );
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        ticks.tick().await;
        if token.is_cancelled() {
            return;
        }

        let reply = tokio::time::timeout(config.request_timeout, service.task_status(&task_id))
            .await
            .unwrap_or(Err(ServiceError::Timeout));
        if token.is_cancelled() {
            debug!(task = %task_id, "dropping status reply for superseded task");
            return;
        }

        let next = match reply {
            Ok(resp) => match resp.status {
                TaskStatus::Submitted | TaskStatus::Processing => {
                    failures = 0;
                    debug!(task = %task_id, status = ?resp.status, "task still running");
                    continue;
                }
                TaskStatus::Completed => {
                    info!(task = %task_id, "analysis completed");
                    AnalysisStatus::completed(
                        task_id.clone(),
                        resp.result.unwrap_or(serde_json::Value::Null),
                    )
                }
                TaskStatus::Failed => {
                    let detail = resp
                        .error
                        .unwrap_or_else(|| "analysis service reported failure".to_string());
                    warn!(task = %task_id, error = %detail, "analysis failed");
                    AnalysisStatus::failed(task_id.clone(), AnalysisError::ServiceFailed(detail))
                }
            },
            Err(err) => {
                failures += 1;
                warn!(task = %task_id, attempt = failures, error = %err, "status query failed");
                if failures < max_failures {
                    continue;
                }
                warn!(task = %task_id, "abandoning analysis task");
                AnalysisStatus::failed(
                    task_id.clone(),
                    AnalysisError::PollingAbandoned { attempts: failures },
                )
            }
        };

        if !cell.publish(&token, next) {
            debug!(task = %task_id, "dropping terminal status for superseded task");
        }
        return;
    }
}
