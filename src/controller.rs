//! Drives a research run: submit, poll, apply, render.
//!
//! The controller owns the shared [`ResearchSession`] and broadcasts every
//! [`SessionEvent`] it produces. A display surface subscribes to the events
//! and may call [`ResearchController::new_search`] at any time; the running
//! task notices through its cancellation token and the session's generation
//! check, whichever comes first.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::backend::ResearchBackend;
use crate::error::ResearchError;
use crate::poller::StatusPoller;
use crate::session::{ResearchSession, SessionEvent, Update};
use crate::types::{ResponseStyle, TaskOutcome, TaskState, TaskStatus};

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How a call to [`ResearchController::run`] ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Results are showing.
    Completed,
    /// Back on the search form with an error notification.
    Failed(ResearchError),
    /// The submission was invalid; nothing was sent.
    Rejected(ResearchError),
    /// Another task was already running.
    Ignored,
    /// A new search superseded this run.
    Abandoned,
}

pub struct ResearchController<B: ?Sized> {
    backend: Arc<B>,
    poller: StatusPoller,
    session: Arc<Mutex<ResearchSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<B> ResearchController<B>
where
    B: ResearchBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, poller: StatusPoller, session: ResearchSession) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            poller,
            session: Arc::new(Mutex::new(session)),
            events,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Shared handle to the session, for display surfaces that read state.
    pub fn session(&self) -> Arc<Mutex<ResearchSession>> {
        Arc::clone(&self.session)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Start over, cancelling any running task.
    pub async fn new_search(&self) {
        self.with_session(ResearchSession::new_search).await;
    }

    /// Run one research task to its end.
    ///
    /// Every status is applied to the session before the next poll is
    /// issued. The session lock is never held across a network call.
    pub async fn run(
        &self,
        topic: &str,
        response_style: ResponseStyle,
        include_sources: bool,
    ) -> RunOutcome {
        let submitted = self
            .with_session(|s| s.submit(topic, response_style, include_sources))
            .await;
        let ticket = match submitted {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return RunOutcome::Ignored,
            Err(err) => return RunOutcome::Rejected(err),
        };
        let generation = ticket.generation;
        let cancel = ticket.cancel;

        let submit = tokio::select! {
            biased;
            () = cancel.cancelled() => return RunOutcome::Abandoned,
            result = self.backend.submit(&ticket.request) => result,
        };
        let handle = match submit {
            Ok(handle) => handle,
            Err(err) => return self.failed(generation, err).await,
        };
        let attached = self
            .with_session(|s| s.attach_handle(generation, handle.clone()))
            .await;
        if attached == Update::Stale {
            return RunOutcome::Abandoned;
        }

        debug!(
            task_id = %handle,
            interval_ms = self.poller.interval().as_millis() as u64,
            max_attempts = self.poller.max_attempts(),
            "polling research task"
        );
        let mut statuses = std::pin::pin!(self.poller.stream(self.backend.as_ref(), &handle));
        let mut last: Option<TaskStatus> = None;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(task_id = %handle, "polling abandoned for a new search");
                    return RunOutcome::Abandoned;
                }
                next = statuses.next() => next,
            };
            match next {
                Some(Ok(status)) => {
                    let applied = self
                        .with_session(|s| s.apply_status(generation, &status))
                        .await;
                    if applied == Update::Stale {
                        return RunOutcome::Abandoned;
                    }
                    last = Some(status);
                }
                Some(Err(err)) => return self.failed(generation, err).await,
                None => break,
            }
        }

        match last {
            Some(status) if status.status == TaskState::Completed => {
                let outcome = TaskOutcome::from(status);
                match self.with_session(|s| s.complete(generation, outcome)).await {
                    Update::Applied => {
                        info!(task_id = %handle, "research results ready");
                        RunOutcome::Completed
                    }
                    Update::Stale => RunOutcome::Abandoned,
                }
            }
            _ => {
                let err =
                    ResearchError::Protocol("status stream ended without a terminal status".into());
                self.failed(generation, err).await
            }
        }
    }

    async fn failed(&self, generation: u64, err: ResearchError) -> RunOutcome {
        match self.with_session(|s| s.fail(generation, &err)).await {
            Update::Applied => RunOutcome::Failed(err),
            Update::Stale => RunOutcome::Abandoned,
        }
    }

    /// Lock the session, apply `f`, publish whatever events it recorded.
    async fn with_session<R>(&self, f: impl FnOnce(&mut ResearchSession) -> R) -> R {
        let mut session = self.session.lock().await;
        let result = f(&mut session);
        for event in session.drain_events() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        result
    }
}
