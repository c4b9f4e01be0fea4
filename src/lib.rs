//! Professor: a client for an asynchronous research service.
//!
//! A research topic is submitted to the backend, which answers with a task
//! id. The task is then polled once a second until it completes, fails or
//! exhausts its polling budget, and the answer is rendered into safe HTML
//! and plain text.
//!
//! # Architecture
//!
//! - **Backend**: [`backend::ResearchBackend`] is the seam to the service;
//!   [`backend::HttpBackend`] speaks its JSON API via `reqwest`
//! - **Polling**: [`poller::StatusPoller`] turns a task handle into a stream
//!   of statuses with a bounded number of attempts
//! - **Session**: [`session::ResearchSession`] holds the Search, Processing
//!   and Results views and discards updates from superseded submissions
//! - **Controller**: [`controller::ResearchController`] drives one run and
//!   broadcasts [`session::SessionEvent`]s to display surfaces
//! - **Rendering**: delegated to the `professor-render` crate
//! - **Actions**: copy, download and share a rendered result

pub mod actions;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod notification;
pub mod poller;
pub mod session;
pub mod types;
pub mod view;

#[cfg(test)]
pub mod test_utils;

pub use backend::{HttpBackend, ResearchBackend};
pub use config::ProfessorConfig;
pub use controller::{ResearchController, RunOutcome};
pub use error::{ResearchError, Result};
pub use notification::{Notification, NotificationLevel};
pub use poller::StatusPoller;
pub use session::{ResearchSession, SessionEvent};
pub use types::{ResearchRequest, ResponseStyle, TaskHandle, TaskState, TaskStatus};
pub use view::ViewState;
