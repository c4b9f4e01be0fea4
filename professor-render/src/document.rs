//! Block document model shared by the markdown and HTML front-ends.
//!
//! Both front-ends produce a `Vec<Block>` which is then normalised with
//! [`normalize_blocks`]. Normalisation is what makes rendering idempotent:
//! a normalised document written to HTML and parsed back yields the same
//! HTML again.

use serde::{Deserialize, Serialize};

use crate::{html, text};

/// A block-level element of a rendered result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    /// Section heading, `level` in `1..=6`.
    Heading { level: u8, content: Vec<Inline> },
    /// A paragraph of running text.
    Paragraph(Vec<Inline>),
    /// Bulleted (`ordered == false`) or numbered list.
    List {
        ordered: bool,
        items: Vec<Vec<Inline>>,
    },
    /// Quoted passage.
    Quote(Vec<Inline>),
    /// Preformatted text, whitespace preserved.
    Code(String),
}

/// An inline element inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    /// Hyperlink. `href` has already passed [`safe_href`].
    Link { href: String, content: Vec<Inline> },
    LineBreak,
}

/// A fully rendered research result.
///
/// Holds the sanitised block document and its HTML serialisation. The HTML
/// is computed once at construction so repeated display is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedResult {
    blocks: Vec<Block>,
    html: String,
}

impl RenderedResult {
    /// Normalise `blocks` and serialise them to HTML.
    pub fn new(blocks: Vec<Block>) -> Self {
        let blocks = normalize_blocks(blocks);
        let html = html::to_html(&blocks);
        Self { blocks, html }
    }

    /// The sanitised block document.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Safe HTML for display surfaces that render markup.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Plain-text representation used for copy, download and share.
    pub fn plain_text(&self) -> String {
        text::to_plain_text(&self.blocks)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Accept only link targets that cannot run script in a display surface.
pub fn safe_href(href: &str) -> Option<String> {
    let scrubbed: String = href.chars().filter_map(scrub_control).collect();
    let trimmed = scrubbed.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("mailto:")
    {
        Some(trimmed.to_owned())
    } else {
        None
    }
}

/// Normalise a block list: whitespace collapsed, empty blocks removed.
pub fn normalize_blocks(blocks: Vec<Block>) -> Vec<Block> {
    blocks.into_iter().filter_map(normalize_block).collect()
}

fn normalize_block(block: Block) -> Option<Block> {
    match block {
        Block::Heading { level, content } => {
            let content = normalize_inlines(content);
            (!content.is_empty()).then(|| Block::Heading {
                level: level.clamp(1, 6),
                content,
            })
        }
        Block::Paragraph(content) => {
            let content = normalize_inlines(content);
            (!content.is_empty()).then_some(Block::Paragraph(content))
        }
        Block::Quote(content) => {
            let content = normalize_inlines(content);
            (!content.is_empty()).then_some(Block::Quote(content))
        }
        Block::List { ordered, items } => {
            let items: Vec<Vec<Inline>> = items
                .into_iter()
                .map(normalize_inlines)
                .filter(|item| !item.is_empty())
                .collect();
            (!items.is_empty()).then_some(Block::List { ordered, items })
        }
        Block::Code(code) => {
            let code = scrub_code(&code);
            let code = code.trim_matches('\n');
            (!code.trim().is_empty()).then(|| Block::Code(code.to_owned()))
        }
    }
}

/// Collapse whitespace runs to one space, trim the edges of the block and
/// around line breaks, merge adjacent text and drop empty containers.
pub fn normalize_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut at_space = true;
    let mut out = collapse(inlines, &mut at_space, false);
    trim_end(&mut out);
    out
}

/// Links never nest: inside a link, inner links are replaced by their
/// content.
fn collapse(inlines: Vec<Inline>, at_space: &mut bool, in_link: bool) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                let collapsed = collapse_whitespace(&text, at_space);
                push_text(&mut out, collapsed);
            }
            Inline::Code(code) => {
                let collapsed = collapse_whitespace(&code, &mut true);
                let collapsed = collapsed.trim_end();
                if !collapsed.is_empty() {
                    out.push(Inline::Code(collapsed.to_owned()));
                    *at_space = false;
                }
            }
            Inline::Strong(children) => {
                let inner = collapse(children, at_space, in_link);
                if !inner.is_empty() {
                    out.push(Inline::Strong(inner));
                }
            }
            Inline::Emphasis(children) => {
                let inner = collapse(children, at_space, in_link);
                if !inner.is_empty() {
                    out.push(Inline::Emphasis(inner));
                }
            }
            Inline::Link { href, content } => {
                let inner = collapse(content, at_space, true);
                if in_link {
                    for inline in inner {
                        match inline {
                            Inline::Text(text) => push_text(&mut out, text),
                            other => out.push(other),
                        }
                    }
                } else if !inner.is_empty() {
                    out.push(Inline::Link {
                        href,
                        content: inner,
                    });
                }
            }
            Inline::LineBreak => {
                trim_end(&mut out);
                out.push(Inline::LineBreak);
                *at_space = true;
            }
        }
    }
    out
}

fn push_text(out: &mut Vec<Inline>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(prev)) = out.last_mut() {
        prev.push_str(&text);
    } else {
        out.push(Inline::Text(text));
    }
}

/// NUL reads back from HTML as U+FFFD; other non-whitespace control
/// characters are dropped.
fn scrub_control(ch: char) -> Option<char> {
    match ch {
        '\0' => Some(char::REPLACEMENT_CHARACTER),
        c if c.is_control() && !c.is_whitespace() => None,
        c => Some(c),
    }
}

/// Preformatted text with line endings as an HTML parser normalises them.
fn scrub_code(code: &str) -> String {
    code.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter_map(scrub_control)
        .collect()
}

fn collapse_whitespace(text: &str, at_space: &mut bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars().filter_map(scrub_control) {
        if ch.is_whitespace() {
            if !*at_space {
                out.push(' ');
                *at_space = true;
            }
        } else {
            out.push(ch);
            *at_space = false;
        }
    }
    out
}

fn trim_end(inlines: &mut Vec<Inline>) {
    loop {
        match inlines.last_mut() {
            Some(Inline::Text(text)) => {
                let len = text.trim_end().len();
                text.truncate(len);
                if text.is_empty() {
                    inlines.pop();
                    continue;
                }
            }
            Some(
                Inline::Strong(children)
                | Inline::Emphasis(children)
                | Inline::Link {
                    content: children, ..
                },
            ) => {
                trim_end(children);
                if children.is_empty() {
                    inlines.pop();
                    continue;
                }
            }
            _ => {}
        }
        break;
    }
}

/// Flatten inline content to its visible text, ignoring markup.
pub fn inline_plain(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Link {
                content: children, ..
            } => out.push_str(&inline_plain(children)),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}
