//! Lightweight-markdown front-end.
//!
//! Research answers usually arrive as plain text with `#` headers,
//! `**bold**`/`*italic*` spans and blank-line paragraphs. The text is parsed
//! with `pulldown-cmark` and mapped onto the block model. Raw HTML embedded in
//! the text is kept as literal text (escaped on output), never as markup.
//!
//! Single newlines inside a paragraph become line breaks, matching how the
//! answers are laid out by the backend.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

use crate::document::{inline_plain, normalize_blocks, safe_href, Block, Inline};

/// Title used for the heading injected in front of an answer.
pub fn results_heading(topic: &str) -> String {
    format!("Research Results: {topic}")
}

/// Parse lightweight markdown into normalised blocks, prepending a results
/// heading unless the text already opens with a header marker or one of its
/// headings mentions the topic. Text without visible content yields no
/// blocks at all.
pub fn parse_markdown(text: &str, topic: &str) -> Vec<Block> {
    let mut blocks = normalize_blocks(markdown_blocks(text));
    if !blocks.is_empty() && needs_heading(text, topic, &blocks) {
        blocks.insert(
            0,
            Block::Heading {
                level: 2,
                content: vec![Inline::Text(results_heading(topic.trim()))],
            },
        );
    }
    blocks
}

fn needs_heading(text: &str, topic: &str, blocks: &[Block]) -> bool {
    let topic = topic.trim().to_lowercase();
    if topic.is_empty() || text.trim_start().starts_with('#') {
        return false;
    }
    !blocks.iter().any(|block| match block {
        Block::Heading { content, .. } => inline_plain(content).to_lowercase().contains(&topic),
        _ => false,
    })
}

/// An open element while walking the event stream.
enum Frame {
    Heading(u8, Vec<Inline>),
    Paragraph(Vec<Inline>),
    Quote(Vec<Inline>),
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Item(Vec<Inline>),
    Code(String),
    /// Block nested inside a list item or quote; flattened into the parent
    /// with a line break.
    Nested(Vec<Inline>),
    NestedCode(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Link(String, Vec<Inline>),
    /// Anything else (images, unknown tags): content is spliced into the
    /// parent unchanged.
    Splice(Vec<Inline>),
}

impl Frame {
    fn inlines_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Frame::Heading(_, v)
            | Frame::Paragraph(v)
            | Frame::Quote(v)
            | Frame::Item(v)
            | Frame::Nested(v)
            | Frame::Strong(v)
            | Frame::Emphasis(v)
            | Frame::Link(_, v)
            | Frame::Splice(v) => Some(v),
            Frame::List { .. } | Frame::Code(_) | Frame::NestedCode(_) => None,
        }
    }
}

#[derive(Default)]
struct Builder {
    stack: Vec<Frame>,
    blocks: Vec<Block>,
}

impl Builder {
    fn start(&mut self, tag: Tag<'_>) {
        let top_level = self.stack.is_empty();
        let frame = match tag {
            Tag::Paragraph | Tag::HtmlBlock if top_level => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, .. } if top_level => {
                Frame::Heading(heading_level(level), Vec::new())
            }
            Tag::BlockQuote(_) if top_level => Frame::Quote(Vec::new()),
            Tag::List(start) if top_level => Frame::List {
                ordered: start.is_some(),
                items: Vec::new(),
            },
            Tag::CodeBlock(_) if top_level => Frame::Code(String::new()),
            Tag::Item if matches!(self.stack.last(), Some(Frame::List { .. })) => {
                Frame::Item(Vec::new())
            }
            Tag::CodeBlock(_) => Frame::NestedCode(String::new()),
            Tag::Paragraph
            | Tag::HtmlBlock
            | Tag::Heading { .. }
            | Tag::BlockQuote(_)
            | Tag::List(_)
            | Tag::Item => Frame::Nested(Vec::new()),
            Tag::Strong => Frame::Strong(Vec::new()),
            Tag::Emphasis => Frame::Emphasis(Vec::new()),
            Tag::Link { dest_url, .. } => Frame::Link(dest_url.to_string(), Vec::new()),
            _ => Frame::Splice(Vec::new()),
        };
        self.stack.push(frame);
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Heading(level, content) => self.blocks.push(Block::Heading { level, content }),
            Frame::Paragraph(content) => self.blocks.push(Block::Paragraph(content)),
            Frame::Quote(content) => self.blocks.push(Block::Quote(content)),
            Frame::List { ordered, items } => self.blocks.push(Block::List { ordered, items }),
            Frame::Code(code) => self.blocks.push(Block::Code(code)),
            Frame::Item(content) => {
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(content);
                }
            }
            Frame::Nested(content) => {
                if let Some(parent) = self.sink() {
                    if !parent.is_empty() && parent.last() != Some(&Inline::LineBreak) {
                        parent.push(Inline::LineBreak);
                    }
                    parent.extend(content);
                }
            }
            Frame::NestedCode(code) => self.push_inline(Inline::Code(code)),
            Frame::Strong(content) => self.push_inline(Inline::Strong(content)),
            Frame::Emphasis(content) => self.push_inline(Inline::Emphasis(content)),
            Frame::Link(href, content) => match safe_href(&href) {
                Some(href) => self.push_inline(Inline::Link { href, content }),
                None => {
                    if let Some(parent) = self.sink() {
                        parent.extend(content);
                    }
                }
            },
            Frame::Splice(content) => match self.sink() {
                Some(parent) => parent.extend(content),
                None => {
                    if !content.is_empty() {
                        self.blocks.push(Block::Paragraph(content));
                    }
                }
            },
        }
    }

    fn sink(&mut self) -> Option<&mut Vec<Inline>> {
        self.stack.last_mut().and_then(Frame::inlines_mut)
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.sink() {
            Some(sink) => sink.push(inline),
            None => self.blocks.push(Block::Paragraph(vec![inline])),
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(Frame::Code(code) | Frame::NestedCode(code)) = self.stack.last_mut() {
            code.push_str(text);
        } else {
            self.push_inline(Inline::Text(text.to_owned()));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::SoftBreak | Event::HardBreak => self.push_inline(Inline::LineBreak),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        while !self.stack.is_empty() {
            self.end();
        }
        self.blocks
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Parse markdown without heading injection.
pub fn markdown_blocks(text: &str) -> Vec<Block> {
    let mut builder = Builder::default();
    for event in Parser::new_ext(text, Options::empty()) {
        builder.event(event);
    }
    builder.finish()
}
