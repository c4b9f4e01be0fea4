//! Shared test utilities used across multiple test modules.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::backend::ResearchBackend;
use crate::error::{ResearchError, Result};
use crate::types::{ResearchRequest, TaskHandle, TaskState, TaskStatus};

/// In-memory backend that answers from a script.
///
/// Status polls pop the next scripted answer; once the script is exhausted
/// every poll answers `processing` at 50 %.
pub struct ScriptedBackend {
    task_id: String,
    submit_error: Mutex<Option<ResearchError>>,
    statuses: Mutex<VecDeque<Result<TaskStatus>>>,
    requests: Mutex<Vec<ResearchRequest>>,
    polls: AtomicUsize,
    gated: bool,
    gate: Notify,
    polling: Notify,
}

impl ScriptedBackend {
    pub fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_owned(),
            submit_error: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            gated: false,
            gate: Notify::new(),
            polling: Notify::new(),
        }
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = Result<TaskStatus>>) -> Self {
        self.statuses
            .lock()
            .expect("script lock")
            .extend(statuses);
        self
    }

    pub fn with_submit_error(self, error: ResearchError) -> Self {
        *self.submit_error.lock().expect("submit lock") = Some(error);
        self
    }

    /// Hold every status answer until [`ScriptedBackend::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// Let one held status answer through.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Resolves once a status request is in flight.
    pub async fn wait_for_poll(&self) {
        self.polling.notified().await;
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ResearchRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ResearchBackend for ScriptedBackend {
    async fn submit(&self, request: &ResearchRequest) -> Result<TaskHandle> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(err) = self.submit_error.lock().expect("submit lock").take() {
            return Err(err);
        }
        Ok(TaskHandle::new(self.task_id.clone()))
    }

    async fn status(&self, _handle: &TaskHandle) -> Result<TaskStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.polling.notify_one();
        if self.gated {
            self.gate.notified().await;
        }
        let next = self.statuses.lock().expect("script lock").pop_front();
        next.unwrap_or_else(|| Ok(TaskStatus::new(TaskState::Processing, 50)))
    }
}
