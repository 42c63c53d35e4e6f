//! Markdown parsed into renderable nodes.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use super::source::MarkdownOptions;

/// Inline text styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    /// Bold.
    pub strong: bool,
    /// Italic.
    pub emphasis: bool,
    /// Struck through.
    pub strikethrough: bool,
}

/// Inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Styled text, optionally linked.
    Text {
        /// The text.
        text: String,
        /// Styling.
        style: SpanStyle,
        /// Link target.
        link: Option<String>,
    },
    /// Inline code.
    Code(String),
    /// Inline math source.
    Math(String),
    /// Hard line break.
    Break,
}

impl Inline {
    fn plain_text(&self) -> &str {
        match self {
            Self::Text { text, .. } | Self::Code(text) | Self::Math(text) => text,
            Self::Break => "\n",
        }
    }
}

/// List item marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    /// Unordered bullet.
    Bullet,
    /// Ordered item number.
    Ordered(u64),
}

/// Block-level content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Heading of level 1 to 6.
    Heading {
        /// Heading level.
        level: u8,
        /// Heading text.
        spans: Vec<Inline>,
    },
    /// Paragraph.
    Paragraph(Vec<Inline>),
    /// Fenced or indented code.
    CodeBlock {
        /// Info string language, if any.
        language: Option<String>,
        /// Code text.
        code: String,
    },
    /// Block quote.
    Quote(Vec<Node>),
    /// One list item. Nesting is flattened into `depth`.
    ListItem {
        /// Nesting depth, 0 for top-level items.
        depth: usize,
        /// Bullet or number.
        marker: ListMarker,
        /// Task list state.
        checked: Option<bool>,
        /// Item text.
        spans: Vec<Inline>,
    },
    /// Table.
    Table {
        /// Header cells.
        header: Vec<Vec<Inline>>,
        /// Body rows.
        rows: Vec<Vec<Vec<Inline>>>,
    },
    /// Display math source.
    Math(String),
    /// Image.
    Image {
        /// Image reference as written.
        src: String,
        /// Alt text.
        alt: String,
    },
    /// Raw HTML converted to text.
    Html(String),
    /// Horizontal rule.
    Rule,
}

/// A parsed Markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkdownDocument {
    nodes: Vec<Node>,
}

impl MarkdownDocument {
    /// Parse Markdown. Never fails; malformed input degrades to text.
    #[must_use]
    pub fn parse(source: &str, options: &MarkdownOptions) -> Self {
        let prepared = options.prepare(source);

        let mut parser_options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        if options.math_enabled() {
            parser_options.insert(Options::ENABLE_MATH);
        }

        let mut builder = Builder::new();
        for event in Parser::new_ext(&prepared, parser_options) {
            builder.push(event);
        }

        Self {
            nodes: builder.finish(),
        }
    }

    /// Top-level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns true if nothing renders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Image sources in document order, including those inside quotes.
    #[must_use]
    pub fn image_sources(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Node::Image { src, .. } => out.push(src),
                    Node::Quote(children) => collect(children, out),
                    _ => {}
                }
            }
        }

        let mut sources = Vec::new();
        collect(&self.nodes, &mut sources);
        sources
    }

    /// Visible text with one line per block.
    #[must_use]
    pub fn plain_text(&self) -> String {
        fn spans(out: &mut String, spans: &[Inline]) {
            for span in spans {
                out.push_str(span.plain_text());
            }
            out.push('\n');
        }

        fn walk(out: &mut String, nodes: &[Node]) {
            for node in nodes {
                match node {
                    Node::Heading { spans: s, .. }
                    | Node::Paragraph(s)
                    | Node::ListItem { spans: s, .. } => spans(out, s),
                    Node::CodeBlock { code: text, .. } | Node::Math(text) | Node::Html(text) => {
                        out.push_str(text);
                        out.push('\n');
                    }
                    Node::Quote(children) => walk(out, children),
                    Node::Table { header, rows } => {
                        for row in std::iter::once(header).chain(rows) {
                            for cell in row {
                                for span in cell {
                                    out.push_str(span.plain_text());
                                }
                                out.push('\t');
                            }
                            out.push('\n');
                        }
                    }
                    Node::Image { alt, .. } => {
                        out.push_str(alt);
                        out.push('\n');
                    }
                    Node::Rule => {}
                }
            }
        }

        let mut out = String::new();
        walk(&mut out, &self.nodes);
        out
    }
}

#[derive(Default)]
struct TableState {
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    row: Vec<Vec<Inline>>,
}

#[derive(Default)]
struct ImageState {
    src: String,
    alt: String,
}

/// Folds parser events into nodes.
#[derive(Default)]
struct Builder {
    /// Root node list followed by one list per open block quote.
    containers: Vec<Vec<Node>>,
    inline: Vec<Inline>,
    style: SpanStyle,
    link: Option<String>,
    heading: Option<u8>,
    code: Option<(Option<String>, String)>,
    image: Option<ImageState>,
    table: Option<TableState>,
    html: Option<String>,
    /// Next number per open list, `None` for bullet lists.
    lists: Vec<Option<u64>>,
    item: Option<(ListMarker, Option<bool>)>,
}

impl Builder {
    fn new() -> Self {
        Self {
            containers: vec![Vec::new()],
            ..Self::default()
        }
    }

    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline.push(Inline::Code(code.into_string())),
            Event::InlineMath(math) => self.inline.push(Inline::Math(math.into_string())),
            Event::DisplayMath(math) => {
                self.flush_paragraph();
                self.emit(Node::Math(math.trim().to_string()));
            }
            Event::Html(html) => match &mut self.html {
                Some(buffer) => buffer.push_str(&html),
                None => self.emit_html(&html),
            },
            Event::InlineHtml(html) => {
                if is_line_break_tag(&html) {
                    self.inline.push(Inline::Break);
                } else {
                    self.text(&html);
                }
            }
            Event::FootnoteReference(label) => self.text(&format!("[{label}]")),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.inline.push(Inline::Break),
            Event::Rule => {
                self.flush_paragraph();
                self.emit(Node::Rule);
            }
            Event::TaskListMarker(checked) => {
                if let Some((_, state)) = &mut self.item {
                    *state = Some(checked);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.heading = Some(level as u8);
            }
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.containers.push(Vec::new());
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(ToString::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::HtmlBlock => {
                self.flush_paragraph();
                self.html = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_item();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_item();
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let number = *next;
                        *next += 1;
                        ListMarker::Ordered(number)
                    }
                    _ => ListMarker::Bullet,
                };
                self.item = Some((marker, None));
            }
            Tag::Table(_) => {
                self.flush_paragraph();
                self.table = Some(TableState::default());
            }
            Tag::Emphasis => self.style.emphasis = true,
            Tag::Strong => self.style.strong = true,
            Tag::Strikethrough => self.style.strikethrough = true,
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.into_string()),
            Tag::Image { dest_url, .. } => {
                self.image = Some(ImageState {
                    src: dest_url.into_string(),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.item.is_some() {
                    if !self.inline.is_empty() {
                        self.inline.push(Inline::Break);
                    }
                } else {
                    self.flush_paragraph();
                }
            }
            TagEnd::Heading(_) => {
                let spans = std::mem::take(&mut self.inline);
                if let Some(level) = self.heading.take() {
                    self.emit(Node::Heading { level, spans });
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_paragraph();
                if self.containers.len() > 1
                    && let Some(children) = self.containers.pop()
                {
                    self.emit(Node::Quote(children));
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    self.emit(Node::CodeBlock { language, code });
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html.take() {
                    self.emit_html(&html);
                }
            }
            TagEnd::List(_) => {
                self.flush_item();
                self.lists.pop();
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.inline);
                if let Some(table) = &mut self.table {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.emit(Node::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            TagEnd::Emphasis => self.style.emphasis = false,
            TagEnd::Strong => self.style.strong = false,
            TagEnd::Strikethrough => self.style.strikethrough = false,
            TagEnd::Link => self.link = None,
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    if self.heading.is_some() || self.table.is_some() || self.item.is_some() {
                        self.text(&image.alt);
                    } else {
                        self.flush_paragraph();
                        self.emit(Node::Image {
                            src: image.src,
                            alt: image.alt,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, code)) = &mut self.code {
            code.push_str(text);
            return;
        }
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }

        if let Some(Inline::Text {
            text: last,
            style,
            link,
        }) = self.inline.last_mut()
            && *style == self.style
            && *link == self.link
        {
            last.push_str(text);
            return;
        }

        self.inline.push(Inline::Text {
            text: text.to_string(),
            style: self.style,
            link: self.link.clone(),
        });
    }

    fn emit(&mut self, node: Node) {
        if let Some(container) = self.containers.last_mut() {
            container.push(node);
        }
    }

    fn emit_html(&mut self, html: &str) {
        let visible = strip_style_blocks(html);
        if visible.trim().is_empty() {
            return;
        }

        let text = htmd::convert(&visible).unwrap_or_else(|e| {
            tracing::debug!("Keeping raw HTML, conversion failed: {}", e);
            visible.clone()
        });
        let text = text.trim();
        if !text.is_empty() {
            self.emit(Node::Html(text.to_string()));
        }
    }

    fn flush_paragraph(&mut self) {
        if self.inline.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.inline);
        if let Some((marker, checked)) = self.item.take() {
            let depth = self.lists.len().saturating_sub(1);
            self.emit(Node::ListItem {
                depth,
                marker,
                checked,
                spans,
            });
        } else {
            self.emit(Node::Paragraph(spans));
        }
    }

    fn flush_item(&mut self) {
        if let Some((marker, checked)) = self.item.take() {
            let mut spans = std::mem::take(&mut self.inline);
            if matches!(spans.last(), Some(Inline::Break)) {
                spans.pop();
            }
            let depth = self.lists.len().saturating_sub(1);
            self.emit(Node::ListItem {
                depth,
                marker,
                checked,
                spans,
            });
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_item();
        self.flush_paragraph();
        while self.containers.len() > 1 {
            if let Some(children) = self.containers.pop() {
                self.emit(Node::Quote(children));
            }
        }
        self.containers.pop().unwrap_or_default()
    }
}

fn is_line_break_tag(html: &str) -> bool {
    let tag = html.trim().to_ascii_lowercase();
    matches!(tag.as_str(), "<br>" | "<br/>" | "<br />")
}

/// Remove `<style>...</style>` elements. An unterminated one drops the rest.
fn strip_style_blocks(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(start) = lower[pos..].find("<style").map(|i| pos + i) {
        out.push_str(&html[pos..start]);
        match lower[start..].find("</style>") {
            Some(end) => pos = start + end + "</style>".len(),
            None => return out,
        }
    }

    out.push_str(&html[pos..]);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::MathEngine;

    fn parse(source: &str) -> MarkdownDocument {
        MarkdownDocument::parse(source, &MarkdownOptions::default())
    }

    #[test]
    fn test_heading_and_bold() {
        let doc = parse("# Test Markdown\n\nThis is **bold** text.");
        assert_eq!(
            doc.nodes()[0],
            Node::Heading {
                level: 1,
                spans: vec![Inline::Text {
                    text: "Test Markdown".to_string(),
                    style: SpanStyle::default(),
                    link: None,
                }],
            }
        );

        let Node::Paragraph(spans) = &doc.nodes()[1] else {
            panic!("expected a paragraph");
        };
        assert_eq!(spans.len(), 3);
        assert!(matches!(
            &spans[1],
            Inline::Text { text, style, .. } if text == "bold" && style.strong
        ));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_code_block_language() {
        let doc = parse("```rust\nfn main() {}\n```");
        assert_eq!(
            doc.nodes(),
            [Node::CodeBlock {
                language: Some("rust".to_string()),
                code: "fn main() {}\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_image_sources_in_order() {
        let doc = parse("![a](https://x/a.png)\n\n> ![b](http://file/b.png)\n\ntext");
        assert_eq!(doc.image_sources(), vec!["https://x/a.png", "http://file/b.png"]);
        assert!(matches!(
            &doc.nodes()[0],
            Node::Image { alt, .. } if alt == "a"
        ));
    }

    #[test]
    fn test_lists_and_tasks() {
        let doc = parse("1. one\n2. two\n   - nested\n- [x] done");
        let items: Vec<_> = doc
            .nodes()
            .iter()
            .filter_map(|node| match node {
                Node::ListItem {
                    depth,
                    marker,
                    checked,
                    ..
                } => Some((*depth, *marker, *checked)),
                _ => None,
            })
            .collect();

        assert_eq!(
            items,
            vec![
                (0, ListMarker::Ordered(1), None),
                (0, ListMarker::Ordered(2), None),
                (1, ListMarker::Bullet, None),
                (0, ListMarker::Bullet, Some(true)),
            ]
        );
    }

    #[test]
    fn test_table() {
        let doc = parse("| a | b |\n|---|---|\n| 1 | 2 |");
        let Node::Table { header, rows } = &doc.nodes()[0] else {
            panic!("expected a table");
        };
        assert_eq!(header.len(), 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1][0].plain_text(), "2");
    }

    #[test]
    fn test_math_depends_on_engine() {
        let katex = parse("Euler: $e^{i\\pi}$\n\n\\[x^2\\]");
        let text = format!("{:?}", katex.nodes());
        assert!(text.contains("Math(\"e^{i\\\\pi}\")"));
        assert!(katex.nodes().contains(&Node::Math("x^2".to_string())));

        let none = MarkdownDocument::parse(
            "Euler: $e$",
            &MarkdownOptions {
                math_engine: MathEngine::None,
                single_dollar: true,
            },
        );
        assert_eq!(none.plain_text(), "Euler: $e$\n");
    }

    #[test]
    fn test_style_is_dropped_and_html_kept() {
        let doc = parse("<style>p { color: red }</style>\n\n<div><b>Hi</b></div>\n\nafter");
        let text = doc.plain_text();
        assert!(!text.contains("color"));
        assert!(text.contains("Hi"));
        assert!(text.contains("after"));
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        for source in [
            "**unclosed",
            "[link](",
            "<div><span>",
            "| a |\n|---",
            "```\nnever closed",
            "> > > deep\n>",
            "\\[ unclosed math",
            "<style>no end",
        ] {
            let _ = parse(source).plain_text();
        }
    }

    #[test]
    fn test_strip_style_blocks() {
        assert_eq!(strip_style_blocks("a<STYLE>x</style>b"), "ab");
        assert_eq!(strip_style_blocks("a<style>x"), "a");
        assert_eq!(strip_style_blocks("plain"), "plain");
    }
}
