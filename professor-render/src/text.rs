//! Plain-text projection of a block document.
//!
//! Mirrors what a reader would select and copy from the rendered page:
//! blocks separated by blank lines, list markers kept, markup dropped.

use crate::document::{inline_plain, Block, Inline};

/// Render blocks as plain text.
pub fn to_plain_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(block_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Heading { content, .. } | Block::Paragraph(content) => inline_text(content),
        Block::List { ordered, items } => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = if *ordered {
                    format!("{}. ", i + 1)
                } else {
                    "- ".to_owned()
                };
                format!("{marker}{}", inline_text(item))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Quote(content) => inline_text(content)
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Code(code) => code.clone(),
    }
}

/// Like [`inline_plain`] but keeps link targets visible, since a text file
/// has no other way to carry them.
fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Link { href, content } => {
                let label = inline_plain(content);
                if label == *href {
                    out.push_str(&label);
                } else {
                    out.push_str(&format!("{label} ({href})"));
                }
            }
            Inline::Strong(children) | Inline::Emphasis(children) => {
                out.push_str(&inline_text(children));
            }
            other => out.push_str(&inline_plain(std::slice::from_ref(other))),
        }
    }
    out
}
