//! # professor-render
//!
//! Turns a research answer into something safe to show.
//!
//! Backends return either already-structured HTML or lightweight markdown.
//! Both are reduced to the same sanitised block document
//! ([`RenderedResult`]), from which safe HTML and plain text are produced.
//!
//! ## Design
//!
//! - Structured payloads are passed through: parsed with `scraper`, kept to an
//!   allowlist of elements, never rewritten as markdown
//! - Everything else is markdown, parsed with `pulldown-cmark`; raw HTML in it
//!   is treated as text
//! - A "Research Results: {topic}" heading is prepended to markdown answers
//!   that do not already open with a header or name the topic in a heading
//! - Rendering the produced HTML again yields the same HTML
//!
//! ## Security
//!
//! - Scripts, styles, frames, forms and event-handler attributes are dropped
//! - Only `http`, `https` and `mailto` links survive
//! - Every text node and attribute value is escaped on output

pub mod document;
pub mod html;
pub mod markdown;
pub mod sanitize;
pub mod text;

pub use document::{Block, Inline, RenderedResult};
pub use html::html_escape;
pub use markdown::results_heading;

/// Tags whose presence marks a payload as already structured.
const STRUCTURE_MARKERS: &[&str] = &[
    "<h1", "<h2", "<h3", "<h4", "<h5", "<h6", "<p>", "<p ", "<ul", "<ol", "<blockquote", "<pre",
    "<div",
];

/// Whether `payload` already carries block-level HTML structure.
///
/// Matching is case-insensitive.
///
/// # Examples
///
/// ```
/// assert!(professor_render::is_structured("<H2>Intro</H2>"));
/// assert!(!professor_render::is_structured("## Intro\n\ntext"));
/// ```
pub fn is_structured(payload: &str) -> bool {
    let lower = payload.to_ascii_lowercase();
    STRUCTURE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Render a research answer about `topic`.
///
/// Deterministic and infallible: malformed markup degrades to text.
///
/// # Examples
///
/// ```
/// let rendered = professor_render::render("Rust is **fast**.", "rust");
/// assert_eq!(
///     rendered.html(),
///     "<h2>Research Results: rust</h2>\n<p>Rust is <strong>fast</strong>.</p>"
/// );
/// ```
pub fn render(payload: &str, topic: &str) -> RenderedResult {
    let structured = is_structured(payload);
    let blocks = if structured {
        sanitize::parse_html(payload)
    } else {
        markdown::parse_markdown(payload, topic)
    };
    let rendered = RenderedResult::new(blocks);
    if rendered.is_empty() {
        tracing::debug!(structured, "payload has no visible content");
        return empty_result(topic);
    }
    tracing::debug!(
        structured,
        blocks = rendered.blocks().len(),
        "rendered research result"
    );
    rendered
}

/// Notice shown in place of an answer with no visible content.
pub const EMPTY_RESULT_MESSAGE: &str = "The research finished without returning any content.";

/// The document shown when an answer has nothing left to display: the
/// results heading followed by [`EMPTY_RESULT_MESSAGE`].
///
/// Rendering its HTML again yields the same document.
pub fn empty_result(topic: &str) -> RenderedResult {
    RenderedResult::new(vec![
        Block::Heading {
            level: 2,
            content: vec![Inline::Text(results_heading(topic))],
        },
        Block::Paragraph(vec![Inline::Text(EMPTY_RESULT_MESSAGE.to_owned())]),
    ])
}
