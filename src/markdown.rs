//! CommonMark rendering for tutor replies.
//!
//! `pulldown-cmark` does the parsing. Its event stream is flattened into
//! [`Block`]s of styled [`Span`]s, which the chat bubbles then lay out with
//! egui labels.

use eframe::egui::{self, Color32, RichText};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

const HEADING_SIZE: f32 = 17.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    Item { marker: String, depth: usize },
    Code,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            spans: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    /// Next number for each open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    strong: usize,
    emphasis: usize,
    in_code_block: bool,
}

impl BlockBuilder {
    fn open(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block::new(kind));
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if !block.spans.is_empty() {
                self.blocks.push(block);
            }
        }
    }

    fn open_item(&mut self) {
        let marker = match self.lists.last_mut() {
            Some(Some(number)) => {
                let marker = format!("{number}.");
                *number += 1;
                marker
            }
            _ => "•".to_string(),
        };
        let depth = self.lists.len().max(1);
        self.open(BlockKind::Item { marker, depth });
    }

    fn push_text(&mut self, text: &str, code: bool) {
        if text.is_empty() {
            return;
        }
        let span = Span {
            text: text.to_string(),
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            code: code || self.in_code_block,
        };
        let block = self
            .current
            .get_or_insert_with(|| Block::new(BlockKind::Paragraph));
        match block.spans.last_mut() {
            Some(last)
                if last.strong == span.strong
                    && last.emphasis == span.emphasis
                    && last.code == span.code =>
            {
                last.text.push_str(&span.text);
            }
            _ => block.spans.push(span),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // Loose list items wrap their text in a paragraph; keep the item.
                let fresh_item = matches!(
                    &self.current,
                    Some(Block { kind: BlockKind::Item { .. }, spans }) if spans.is_empty()
                );
                if !fresh_item {
                    self.open(BlockKind::Paragraph);
                }
            }
            Tag::Heading { .. } => self.open(BlockKind::Heading),
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => self.open_item(),
            Tag::CodeBlock(_) => {
                self.open(BlockKind::Code);
                self.in_code_block = true;
            }
            Tag::Strong => self.strong += 1,
            Tag::Emphasis => self.emphasis += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item => self.flush(),
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::CodeBlock => {
                if let Some(last) = self
                    .current
                    .as_mut()
                    .and_then(|block| block.spans.last_mut())
                {
                    let trimmed = last.text.trim_end_matches('\n').len();
                    last.text.truncate(trimmed);
                }
                self.in_code_block = false;
                self.flush();
            }
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Parses `text` as CommonMark into renderable blocks.
pub fn markdown_blocks(text: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new(text) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(tag) => builder.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                builder.push_text(&text, false)
            }
            Event::Code(code) => builder.push_text(&code, true),
            Event::SoftBreak => builder.push_text(" ", false),
            Event::HardBreak => builder.push_text("\n", false),
            Event::Rule => builder.flush(),
            _ => {}
        }
    }
    builder.finish()
}

fn span_text(span: &Span, color: Color32, heading: bool) -> RichText {
    let mut rich = RichText::new(span.text.as_str()).color(color);
    if span.code {
        rich = rich.code();
    }
    if span.strong || heading {
        rich = rich.strong();
    }
    if span.emphasis {
        rich = rich.italics();
    }
    if heading {
        rich = rich.size(HEADING_SIZE);
    }
    rich
}

pub fn render_markdown(ui: &mut egui::Ui, text: &str, color: Color32) {
    for (index, block) in markdown_blocks(text).iter().enumerate() {
        if index > 0 && !matches!(block.kind, BlockKind::Item { .. }) {
            ui.add_space(4.0);
        }
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            if let BlockKind::Item { marker, depth } = &block.kind {
                let indent = "    ".repeat(depth.saturating_sub(1));
                ui.label(RichText::new(format!("{indent}  {marker} ")).color(color));
            }
            let heading = block.kind == BlockKind::Heading;
            for span in &block.spans {
                ui.label(span_text(span, color, heading));
            }
        });
    }
}
