//! Sanitising parser for payloads that already carry HTML structure.
//!
//! The payload is parsed with `scraper` (html5ever) and re-expressed as a
//! block document using an allowlist of elements. Anything executable or
//! embeddable (scripts, styles, frames, forms) is dropped with its content;
//! unknown elements are unwrapped so their text survives. Attributes other
//! than a vetted `href` never make it through.

use scraper::{ElementRef, Html};

use crate::document::{safe_href, Block, Inline};

/// Elements removed together with everything inside them.
const DROPPED: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "template",
    "noscript", "svg", "math", "form", "input", "button", "textarea", "select", "head", "title",
    "meta", "link", "base",
];

/// Block-level elements that only group other content.
const CONTAINERS: &[&str] = &[
    "html", "body", "div", "section", "article", "main", "header", "footer", "aside", "nav",
    "figure", "figcaption", "details", "summary", "table", "thead", "tbody", "tfoot", "tr", "td",
    "th", "dl", "dt", "dd", "center",
];

/// Parse an HTML payload into a block document.
pub fn parse_html(payload: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(payload);
    let mut collector = BlockCollector::default();
    collector.walk(fragment.root_element());
    collector.finish()
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Block>,
    /// Loose inline content found between blocks.
    pending: Vec<Inline>,
}

impl BlockCollector {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.pending.push(Inline::Text((**text).to_owned()));
                continue;
            }
            let Some(el) = ElementRef::wrap(child) else {
                continue;
            };
            let name = el.value().name();
            if DROPPED.contains(&name) {
                continue;
            }
            if let Some(level) = heading_level(name) {
                self.flush();
                self.blocks.push(Block::Heading {
                    level,
                    content: inline_content(el),
                });
                continue;
            }
            match name {
                "p" => {
                    self.flush();
                    self.blocks.push(Block::Paragraph(inline_content(el)));
                }
                "ul" | "ol" => {
                    self.flush();
                    self.blocks.push(Block::List {
                        ordered: name == "ol",
                        items: list_items(el),
                    });
                }
                "blockquote" => {
                    self.flush();
                    self.blocks.push(Block::Quote(inline_content(el)));
                }
                "pre" => {
                    self.flush();
                    self.blocks.push(Block::Code(el.text().collect()));
                }
                "hr" => self.flush(),
                "br" => self.pending.push(Inline::LineBreak),
                _ if CONTAINERS.contains(&name) => {
                    self.flush();
                    self.walk(el);
                    self.flush();
                }
                _ => self.pending.extend(inline_element(el)),
            }
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let content = std::mem::take(&mut self.pending);
            self.blocks.push(Block::Paragraph(content));
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn heading_level(name: &str) -> Option<u8> {
    let digit = name.strip_prefix('h')?;
    let level: u8 = digit.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn is_block_name(name: &str) -> bool {
    heading_level(name).is_some()
        || CONTAINERS.contains(&name)
        || matches!(name, "p" | "ul" | "ol" | "li" | "blockquote" | "pre")
}

fn list_items(list: ElementRef<'_>) -> Vec<Vec<Inline>> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| !DROPPED.contains(&el.value().name()))
        .map(inline_content)
        .collect()
}

/// Inline content of an element. Nested block elements are separated from
/// preceding content by a line break.
fn inline_content(element: ElementRef<'_>) -> Vec<Inline> {
    let mut out = Vec::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push(Inline::Text((**text).to_owned()));
            continue;
        }
        let Some(el) = ElementRef::wrap(child) else {
            continue;
        };
        let name = el.value().name();
        if DROPPED.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push(Inline::LineBreak);
        } else if is_block_name(name) || name == "hr" {
            if !out.is_empty() && out.last() != Some(&Inline::LineBreak) {
                out.push(Inline::LineBreak);
            }
            out.extend(inline_content(el));
        } else {
            out.extend(inline_element(el));
        }
    }
    out
}

/// Map one inline element to zero or more inlines.
fn inline_element(el: ElementRef<'_>) -> Vec<Inline> {
    match el.value().name() {
        "strong" | "b" => vec![Inline::Strong(inline_content(el))],
        "em" | "i" => vec![Inline::Emphasis(inline_content(el))],
        "code" | "kbd" | "samp" => vec![Inline::Code(el.text().collect())],
        "a" => match el.value().attr("href").and_then(safe_href) {
            Some(href) => vec![Inline::Link {
                href,
                content: inline_content(el),
            }],
            None => inline_content(el),
        },
        "br" => vec![Inline::LineBreak],
        _ => inline_content(el),
    }
}
