//! Pure view-state logic: which screen is shown, how far the task has got.
//!
//! Nothing here performs I/O. The session feeds statuses in and reads the
//! resulting snapshots back out.

use serde::Serialize;

use crate::types::{TaskState, TaskStatus};

/// The screen currently shown. Exactly one is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Search,
    Processing,
    Results,
}

/// Inputs to [`next_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewEvent {
    /// A valid topic was submitted.
    Submit,
    /// A non-terminal status was applied.
    PollTick,
    /// The task completed.
    Completed,
    /// Submission or polling failed.
    Failed,
    /// The user asked for a fresh search (also cancels a running task).
    NewSearch,
}

/// Transition table. `None` means the event is not allowed in `from`.
pub fn next_view(from: ViewState, event: ViewEvent) -> Option<ViewState> {
    use ViewEvent as E;
    use ViewState as S;
    match (from, event) {
        (S::Search, E::Submit) => Some(S::Processing),
        (S::Processing, E::PollTick) => Some(S::Processing),
        (S::Processing, E::Completed) => Some(S::Results),
        (S::Processing, E::Failed) => Some(S::Search),
        (_, E::NewSearch) => Some(S::Search),
        _ => None,
    }
}

// ── Steps ────────────────────────────────────────────────────────────────

/// Static description of one processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    pub title: &'static str,
    pub description: &'static str,
}

/// The four steps every research task goes through, in order.
pub const STEPS: [StepInfo; 4] = [
    StepInfo {
        title: "Searching Web Sources",
        description: "Finding relevant information across the internet",
    },
    StepInfo {
        title: "Scraping Content",
        description: "Extracting valuable data from discovered sources",
    },
    StepInfo {
        title: "Processing Data",
        description: "Cleaning and organizing the collected information",
    },
    StepInfo {
        title: "Generating Insights",
        description: "Creating comprehensive research using AI",
    },
];

/// Description used for states outside the step catalogue.
pub const FALLBACK_DESCRIPTION: &str = "Processing your request...";

/// Step index for a backend state; `None` for states that do not name a
/// step (the previous index is kept).
pub fn step_index(state: &TaskState) -> Option<usize> {
    match state {
        TaskState::Searching => Some(0),
        TaskState::Scraping => Some(1),
        TaskState::Processing => Some(2),
        TaskState::Generating => Some(3),
        TaskState::Completed | TaskState::Error | TaskState::Other(_) => None,
    }
}

/// Human description of what the backend is doing in `state`.
pub fn step_description(state: &TaskState) -> &'static str {
    step_index(state)
        .map(|i| STEPS[i].description)
        .unwrap_or(FALLBACK_DESCRIPTION)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Active,
    Completed,
}

/// Progress through [`STEPS`]. The index only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepProgress {
    current: Option<usize>,
    finished: bool,
}

impl StepProgress {
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Move to `index` unless that would go backwards. Returns whether the
    /// index changed.
    pub fn advance(&mut self, index: usize) -> bool {
        let index = index.min(STEPS.len() - 1);
        match self.current {
            Some(current) if index <= current => false,
            _ => {
                self.current = Some(index);
                true
            }
        }
    }

    /// Mark every step completed (the task finished).
    pub fn finish(&mut self) {
        self.current = Some(STEPS.len() - 1);
        self.finished = true;
    }

    /// Per-step state: before the current index completed, at it active,
    /// after it pending. No index means all pending.
    pub fn states(&self) -> [StepState; 4] {
        let mut out = [StepState::Pending; 4];
        if let Some(current) = self.current {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = if i < current || self.finished {
                    StepState::Completed
                } else if i == current {
                    StepState::Active
                } else {
                    StepState::Pending
                };
            }
        }
        out
    }
}

/// Clamp a raw progress value into `0..=100`.
pub fn clamp_progress(raw: i64) -> u8 {
    // Lossless: the value is within 0..=100 after clamping.
    raw.clamp(0, 100) as u8
}

// ── Snapshot ─────────────────────────────────────────────────────────────

/// What the processing screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub percent: u8,
    pub steps: [StepState; 4],
    pub title: String,
    pub description: String,
}

impl Default for ProgressView {
    fn default() -> Self {
        Self {
            percent: 0,
            steps: [StepState::Pending; 4],
            title: STEPS[0].title.to_owned(),
            description: FALLBACK_DESCRIPTION.to_owned(),
        }
    }
}

impl ProgressView {
    /// Snapshot after applying `status`. Title and description change only
    /// when the backend names the current step.
    pub fn update(&self, status: &TaskStatus, steps: &StepProgress) -> Self {
        let (title, description) = match status.current_step.as_deref().map(str::trim) {
            Some(step) if !step.is_empty() => (
                step.to_owned(),
                step_description(&status.status).to_owned(),
            ),
            _ => (self.title.clone(), self.description.clone()),
        };
        Self {
            percent: clamp_progress(status.progress),
            steps: steps.states(),
            title,
            description,
        }
    }

    /// Snapshot for a finished task.
    pub fn finished(&self, steps: &StepProgress) -> Self {
        Self {
            percent: 100,
            steps: steps.states(),
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}
