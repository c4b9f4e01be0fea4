//! Status polling for a submitted research task.
//!
//! The poller is a lazily pulled stream: a status is handed to the consumer
//! and the next request is only issued once the consumer asks for more, so
//! updates are applied strictly in order and requests never overlap. The
//! delay runs from the end of one request to the start of the next.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::backend::ResearchBackend;
use crate::config::PollingConfig;
use crate::error::{ResearchError, Result};
use crate::types::{TaskHandle, TaskOutcome, TaskState, TaskStatus};

/// Polling cadence and attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl StatusPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval(), config.max_attempts)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Stream of statuses for `handle` until a terminal one.
    ///
    /// - `completed`: the status is yielded and the stream ends.
    /// - `error`: the status is yielded, then [`ResearchError::Task`].
    /// - a failed request: its error is yielded and the stream ends.
    /// - more than `max_attempts` requests needed: [`ResearchError::Timeout`].
    ///
    /// Dropping the stream abandons polling.
    pub fn stream<'a, B>(
        &self,
        backend: &'a B,
        handle: &'a TaskHandle,
    ) -> impl Stream<Item = Result<TaskStatus>> + Send + 'a
    where
        B: ResearchBackend + ?Sized,
    {
        let interval = self.interval;
        let max_attempts = self.max_attempts;
        async_stream::stream! {
            let mut attempts: u32 = 0;
            loop {
                attempts += 1;
                if attempts > max_attempts {
                    warn!(task_id = %handle, max_attempts, "no terminal status within polling budget");
                    yield Err(ResearchError::Timeout { attempts: max_attempts });
                    break;
                }

                let status = match backend.status(handle).await {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(task_id = %handle, attempt = attempts, error = %e, "status poll failed");
                        yield Err(e);
                        break;
                    }
                };
                debug!(
                    task_id = %handle,
                    attempt = attempts,
                    status = %status.status,
                    progress = status.progress,
                    "status received"
                );

                match status.status {
                    TaskState::Completed => {
                        yield Ok(status);
                        break;
                    }
                    TaskState::Error => {
                        let err = ResearchError::task(status.error.as_deref());
                        yield Ok(status);
                        yield Err(err);
                        break;
                    }
                    _ => yield Ok(status),
                }

                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Poll until a terminal status, calling `on_status` for every status in
/// order before the next request is made.
///
/// # Errors
///
/// Whatever the status stream ends with: [`ResearchError::Task`],
/// [`ResearchError::Timeout`] or the failed request's error.
pub async fn poll_until_terminal<B, F>(
    poller: &StatusPoller,
    backend: &B,
    handle: &TaskHandle,
    mut on_status: F,
) -> Result<TaskOutcome>
where
    B: ResearchBackend + ?Sized,
    F: FnMut(&TaskStatus),
{
    let mut stream = std::pin::pin!(poller.stream(backend, handle));
    let mut last: Option<TaskStatus> = None;
    while let Some(item) = stream.next().await {
        let status = item?;
        on_status(&status);
        last = Some(status);
    }
    match last {
        Some(status) if status.status == TaskState::Completed => Ok(TaskOutcome::from(status)),
        _ => Err(ResearchError::Protocol(
            "status stream ended without a terminal status".into(),
        )),
    }
}
