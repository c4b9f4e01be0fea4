//! HTML serialisation of block documents.
//!
//! Every text node and attribute value is escaped, so the output is safe to
//! hand to a markup-rendering surface regardless of what the payload held.

use crate::document::{Block, Inline};

/// Serialise blocks to HTML, one block per line.
pub fn to_html(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(block_html)
        .collect::<Vec<_>>()
        .join("\n")
}

fn block_html(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            format!("<h{level}>{}</h{level}>", inlines_html(content))
        }
        Block::Paragraph(content) => format!("<p>{}</p>", inlines_html(content)),
        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let items: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", inlines_html(item)))
                .collect();
            format!("<{tag}>{items}</{tag}>")
        }
        Block::Quote(content) => {
            format!("<blockquote>{}</blockquote>", inlines_html(content))
        }
        Block::Code(code) => format!("<pre><code>{}</code></pre>", html_escape(code)),
    }
}

fn inlines_html(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&html_escape(text)),
            Inline::Strong(children) => {
                out.push_str("<strong>");
                out.push_str(&inlines_html(children));
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                out.push_str(&inlines_html(children));
                out.push_str("</em>");
            }
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&html_escape(code));
                out.push_str("</code>");
            }
            Inline::Link { href, content } => {
                out.push_str(&format!(
                    "<a href=\"{}\" rel=\"noopener noreferrer\">{}</a>",
                    html_escape(href),
                    inlines_html(content)
                ));
            }
            Inline::LineBreak => out.push_str("<br>"),
        }
    }
    out
}

/// Escape the characters that are significant in HTML text and
/// double-quoted attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
