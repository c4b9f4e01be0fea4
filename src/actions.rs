//! Output actions on a rendered result: copy, download, share.
//!
//! Actions report their outcome as a [`Notification`] and never return an
//! error; failures are logged and turned into error notifications.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{ResearchError, Result};
use crate::notification::Notification;

pub const COPIED_MESSAGE: &str = "Results copied to clipboard!";
pub const DOWNLOADED_MESSAGE: &str = "Results downloaded!";
pub const SHARED_MESSAGE: &str = "Results shared!";
pub const SHARE_LINK_COPIED_MESSAGE: &str = "Share link copied to clipboard!";

/// Characters of the result included in a share preview.
const SHARE_PREVIEW_CHARS: usize = 200;

// ── Clipboard ────────────────────────────────────────────────────────────

/// Somewhere text can be copied to.
pub trait Clipboard {
    /// # Errors
    ///
    /// Returns an error if the text could not be placed on the clipboard.
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The system clipboard, falling back to an OSC 52 escape sequence (which
/// most terminals honour, including over SSH) when no display server is
/// reachable.
pub struct SystemClipboard {
    native: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let native = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                debug!(error = %e, "native clipboard unavailable, using OSC 52");
                None
            }
        };
        Self { native }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if let Some(native) = self.native.as_mut() {
            match native.set_text(text.to_owned()) {
                Ok(()) => return Ok(()),
                Err(e) => debug!(error = %e, "native clipboard write failed, using OSC 52"),
            }
        }
        write_osc52(&mut std::io::stdout(), text).map_err(clipboard_error)
    }
}

/// Write `text` as an OSC 52 "set clipboard" sequence.
///
/// # Errors
///
/// Returns [`ResearchError::Io`] if writing to `out` fails.
pub fn write_osc52(out: &mut impl Write, text: &str) -> Result<()> {
    let encoded = BASE64_STANDARD.encode(text);
    write!(out, "\x1b]52;c;{encoded}\x07")?;
    out.flush()?;
    Ok(())
}

/// Copy the result text.
pub fn copy(clipboard: &mut dyn Clipboard, text: &str) -> Notification {
    match clipboard.set_text(text) {
        Ok(()) => {
            debug!(chars = text.chars().count(), "results copied");
            Notification::success(COPIED_MESSAGE)
        }
        Err(e) => {
            warn!(error = %e, "copy to clipboard failed");
            Notification::error("Could not copy results to the clipboard.")
        }
    }
}

// ── Download ─────────────────────────────────────────────────────────────

/// `research_<topic>_<YYYY-MM-DD>.txt`, with whitespace runs in the topic
/// replaced by `_` and path separators replaced by `_`.
pub fn download_filename(topic: &str, date: NaiveDate) -> String {
    let mut name = String::with_capacity(topic.len());
    let mut in_space = false;
    for ch in topic.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(if matches!(ch, '/' | '\\') { '_' } else { ch });
            in_space = false;
        }
    }
    format!("research_{name}_{}.txt", date.format("%Y-%m-%d"))
}

/// Full path [`download`] writes to.
pub fn download_path(dir: &Path, topic: &str, date: NaiveDate) -> PathBuf {
    dir.join(download_filename(topic, date))
}

/// Save the result text into `dir`.
pub fn download(dir: &Path, topic: &str, text: &str, date: NaiveDate) -> Notification {
    let path = download_path(dir, topic, date);
    match write_file(&path, text) {
        Ok(()) => {
            info!(path = %path.display(), "results downloaded");
            Notification::success(DOWNLOADED_MESSAGE)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "download failed");
            Notification::error(format!("Could not save results: {}", e.user_message()))
        }
    }
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

// ── Share ────────────────────────────────────────────────────────────────

/// What a native share sheet receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    pub fn new(topic: &str, text: &str, url: &str) -> Self {
        let preview: String = text.chars().take(SHARE_PREVIEW_CHARS).collect();
        Self {
            title: professor_render::results_heading(topic),
            text: format!("{preview}..."),
            url: url.to_owned(),
        }
    }
}

/// A platform share facility.
pub trait ShareTarget {
    /// # Errors
    ///
    /// Returns an error if the platform refused or failed to share.
    fn share(&mut self, payload: &SharePayload) -> Result<()>;
}

/// Text copied when no share facility is available or it failed.
pub fn share_fallback_text(topic: &str, url: &str) -> String {
    format!("Check out this research on {topic}: {url}")
}

/// Share the result, falling back to copying a link to the clipboard.
pub fn share(
    target: Option<&mut dyn ShareTarget>,
    clipboard: &mut dyn Clipboard,
    topic: &str,
    text: &str,
    url: &str,
) -> Notification {
    if let Some(target) = target {
        match target.share(&SharePayload::new(topic, text, url)) {
            Ok(()) => return Notification::success(SHARED_MESSAGE),
            Err(e) => warn!(error = %e, "share failed, copying link instead"),
        }
    }
    match clipboard.set_text(&share_fallback_text(topic, url)) {
        Ok(()) => Notification::success(SHARE_LINK_COPIED_MESSAGE),
        Err(e) => {
            warn!(error = %e, "copying share link failed");
            Notification::error("Could not copy the share link.")
        }
    }
}

/// Clipboard failure as an error value.
pub fn clipboard_error(message: impl std::fmt::Display) -> ResearchError {
    ResearchError::Io(std::io::Error::other(format!("clipboard: {message}")))
}
