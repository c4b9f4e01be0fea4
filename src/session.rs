//! Research session state.
//!
//! One [`ResearchSession`] holds everything a display surface shows: the
//! active view, the search form, progress through the current task, the
//! rendered results and the notifications raised along the way.
//!
//! Every submission bumps a generation counter. Updates produced by an
//! asynchronous task carry the generation they belong to; updates from an
//! older generation are reported as [`Update::Stale`] and change nothing.

use std::time::Duration;

use professor_render::RenderedResult;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ResearchError, Result};
use crate::notification::Notification;
use crate::types::{ResearchRequest, ResponseStyle, TaskHandle, TaskMetadata, TaskOutcome, TaskStatus};
use crate::view::{ProgressView, StepProgress, ViewEvent, ViewState, next_view, step_index};

pub use professor_render::EMPTY_RESULT_MESSAGE;

/// Contents of the search form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    pub topic: String,
    pub response_style: ResponseStyle,
    pub include_sources: bool,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self {
            topic: String::new(),
            response_style: ResponseStyle::Comprehensive,
            include_sources: true,
        }
    }
}

/// What the results screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub topic: String,
    pub document: RenderedResult,
    pub metadata: Option<TaskMetadata>,
    /// Local wall time from submission to completion.
    pub elapsed: Duration,
}

impl ResultsView {
    /// Backend processing time if reported, else the locally measured time.
    pub fn processing_time_display(&self) -> String {
        let seconds = self
            .metadata
            .as_ref()
            .map(|m| m.processing_time)
            .filter(|t| *t > 0.0)
            .unwrap_or_else(|| self.elapsed.as_secs_f64());
        format!("{seconds:.1}s")
    }

    pub fn sources_display(&self) -> String {
        match self.metadata.as_ref().map(|m| m.sources_count) {
            Some(n) if n > 0 => format!("{n} sources"),
            _ => "Multiple sources".to_owned(),
        }
    }

    pub fn tokens_display(&self) -> String {
        match self.metadata.as_ref().map(|m| m.tokens_used) {
            Some(n) if n > 0 => format!("{n} tokens"),
            _ => "N/A tokens".to_owned(),
        }
    }
}

/// Changes a display surface may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ViewChanged { view: ViewState },
    Progress { progress: ProgressView },
    Notification { notification: Notification },
    Results { results: Box<ResultsView> },
}

/// Proof of an accepted submission.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub generation: u64,
    pub request: ResearchRequest,
    /// Cancelled when the session moves on to a new search.
    pub cancel: CancellationToken,
}

/// Result of applying an asynchronous update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Update {
    Applied,
    /// The update belonged to a superseded submission and was discarded.
    Stale,
}

#[derive(Debug)]
struct ActiveTask {
    topic: String,
    handle: Option<TaskHandle>,
    cancel: CancellationToken,
    started: Instant,
}

/// State of one research session.
#[derive(Debug)]
pub struct ResearchSession {
    view: ViewState,
    generation: u64,
    defaults: SearchForm,
    form: SearchForm,
    last_status: Option<TaskStatus>,
    steps: StepProgress,
    progress: ProgressView,
    active: Option<ActiveTask>,
    results: Option<ResultsView>,
    notifications: Vec<Notification>,
    events: Vec<SessionEvent>,
}

impl Default for ResearchSession {
    fn default() -> Self {
        Self::new(SearchForm::default())
    }
}

impl ResearchSession {
    /// A session in the Search view whose form resets to `defaults`.
    pub fn new(defaults: SearchForm) -> Self {
        Self {
            view: ViewState::Search,
            generation: 0,
            form: defaults.clone(),
            defaults,
            last_status: None,
            steps: StepProgress::default(),
            progress: ProgressView::default(),
            active: None,
            results: None,
            notifications: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn form(&self) -> &SearchForm {
        &self.form
    }

    pub fn last_status(&self) -> Option<&TaskStatus> {
        self.last_status.as_ref()
    }

    pub fn steps(&self) -> &StepProgress {
        &self.steps
    }

    pub fn progress(&self) -> &ProgressView {
        &self.progress
    }

    pub fn results(&self) -> Option<&ResultsView> {
        self.results.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn last_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// Events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Submit the search form.
    ///
    /// Returns `Ok(None)` while a task is already running. Submitting from
    /// the Results view starts a new search first.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Validation`] for a blank topic; a warning
    /// notification is raised and nothing else changes.
    pub fn submit(
        &mut self,
        topic: &str,
        response_style: ResponseStyle,
        include_sources: bool,
    ) -> Result<Option<Ticket>> {
        let request = match ResearchRequest::new(topic, response_style, include_sources) {
            Ok(request) => request,
            Err(err) => {
                self.notify(Notification::warning(err.user_message()));
                return Err(err);
            }
        };
        if self.view == ViewState::Processing {
            debug!("submit ignored: a research task is already running");
            return Ok(None);
        }
        if self.view == ViewState::Results {
            self.new_search();
        }

        self.form = SearchForm {
            topic: request.topic().to_owned(),
            response_style: request.response_style().clone(),
            include_sources: request.include_sources(),
        };
        self.generation += 1;
        self.steps = StepProgress::default();
        self.progress = ProgressView::default();
        self.last_status = None;
        self.results = None;
        let cancel = CancellationToken::new();
        self.active = Some(ActiveTask {
            topic: request.topic().to_owned(),
            handle: None,
            cancel: cancel.clone(),
            started: Instant::now(),
        });
        self.transition(ViewEvent::Submit);
        self.events.push(SessionEvent::Progress {
            progress: self.progress.clone(),
        });
        debug!(generation = self.generation, topic = request.topic(), "research submitted");

        Ok(Some(Ticket {
            generation: self.generation,
            request,
            cancel,
        }))
    }

    /// Record the backend's task handle.
    pub fn attach_handle(&mut self, generation: u64, handle: TaskHandle) -> Update {
        if self.is_stale(generation) {
            return Update::Stale;
        }
        if let Some(active) = self.active.as_mut() {
            info!(task_id = %handle, "research task started");
            active.handle = Some(handle);
        }
        Update::Applied
    }

    /// Apply one poll response. Progress is clamped and the step index
    /// only moves forward; unknown states keep the previous step.
    pub fn apply_status(&mut self, generation: u64, status: &TaskStatus) -> Update {
        if self.is_stale(generation) {
            debug!(generation, current = self.generation, "discarding stale status");
            return Update::Stale;
        }
        if let Some(index) = step_index(&status.status) {
            self.steps.advance(index);
        }
        self.progress = self.progress.update(status, &self.steps);
        self.last_status = Some(status.clone());
        self.transition(ViewEvent::PollTick);
        self.events.push(SessionEvent::Progress {
            progress: self.progress.clone(),
        });
        Update::Applied
    }

    /// Render the task's result and show it.
    pub fn complete(&mut self, generation: u64, outcome: TaskOutcome) -> Update {
        if self.is_stale(generation) {
            return Update::Stale;
        }
        let Some(active) = self.active.take() else {
            return Update::Stale;
        };
        let payload = outcome.result.as_deref().unwrap_or_default();
        let document = professor_render::render(payload, &active.topic);
        if document == professor_render::empty_result(&active.topic) {
            warn!(
                payload_chars = payload.chars().count(),
                "research completed without visible content"
            );
        }
        let results = ResultsView {
            topic: active.topic,
            document,
            metadata: outcome.metadata,
            elapsed: active.started.elapsed(),
        };
        info!(
            elapsed_ms = results.elapsed.as_millis() as u64,
            "research completed"
        );

        self.steps.finish();
        self.progress = self.progress.finished(&self.steps);
        self.events.push(SessionEvent::Progress {
            progress: self.progress.clone(),
        });
        self.events.push(SessionEvent::Results {
            results: Box::new(results.clone()),
        });
        self.results = Some(results);
        self.transition(ViewEvent::Completed);
        Update::Applied
    }

    /// Return to the search form with an error notification.
    pub fn fail(&mut self, generation: u64, error: &ResearchError) -> Update {
        if self.is_stale(generation) {
            return Update::Stale;
        }
        warn!(code = error.code(), error = %error, "research failed");
        self.active = None;
        self.transition(ViewEvent::Failed);
        self.notify(Notification::error(error.user_message()));
        Update::Applied
    }

    /// Start over: cancels any running task, clears progress and results and
    /// resets the form to its defaults.
    pub fn new_search(&mut self) {
        self.generation += 1;
        if let Some(active) = self.active.take() {
            debug!(
                task_id = active.handle.as_ref().map(|h| h.task_id.as_str()),
                topic = %active.topic,
                "cancelling running research task"
            );
            active.cancel.cancel();
        }
        self.form = self.defaults.clone();
        self.steps = StepProgress::default();
        self.progress = ProgressView::default();
        self.last_status = None;
        self.results = None;
        self.transition(ViewEvent::NewSearch);
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation != self.generation || self.view != ViewState::Processing
    }

    fn transition(&mut self, event: ViewEvent) {
        match next_view(self.view, event) {
            Some(next) => {
                let changed = next != self.view;
                self.view = next;
                if changed {
                    self.events.push(SessionEvent::ViewChanged { view: next });
                }
            }
            None => debug!(view = ?self.view, ?event, "ignoring disallowed view transition"),
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.events.push(SessionEvent::Notification {
            notification: notification.clone(),
        });
        self.notifications.push(notification);
    }
}
