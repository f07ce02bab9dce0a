//! Walks a parsed HTML document and emits WordprocessingML blocks.

use docx_rs::{
    AbstractNumbering, BorderType, BreakType, Docx, Hyperlink, HyperlinkType, IndentLevel, Level,
    LevelJc, LevelText, LineSpacing, NumberFormat, Numbering, NumberingId, Paragraph,
    ParagraphBorder, ParagraphBorderPosition, ParagraphBorders, Run, RunFonts, Shading,
    SpecialIndentType, Start, Style, StyleType, Table, TableCell, TableRow,
};
use scraper::{ElementRef, Html, Node};

use super::stylesheet::{StyleSheet, TextStyle};

const INDENT_STEP: i32 = 720;
const HANGING: i32 = 360;
const BULLETS: [&str; 3] = ["\u{2022}", "\u{25E6}", "\u{25AA}"];
const LIST_LEVELS: usize = 9;
const MAX_INDENT: i32 = 4320;
/// Element nesting kept as structure. Anything deeper is written as plain text
/// of the enclosing paragraph so the walk stays within a small stack.
const MAX_DEPTH: usize = 32;

pub(crate) enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Converts `html` into a `Docx` value ready for packaging.
pub(crate) fn build_document(html: &str) -> Docx {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let css: String = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "style")
        .flat_map(|element| element.text())
        .collect();
    let styles = StyleSheet::parse(&css);

    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "body")
        .unwrap_or(root);

    let mut writer = Writer::new(&styles);
    let base = Context::base(&styles);
    let blocks = writer.blocks_of(body, &base);

    writer.finish(blocks)
}

#[derive(Debug, Clone, Default)]
struct RunFormat {
    font: Option<String>,
    size: Option<usize>,
    color: Option<String>,
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    link: Option<String>,
}

impl RunFormat {
    fn apply(&mut self, style: &TextStyle) {
        if let Some(font) = &style.font {
            self.font = Some(font.clone());
        }
        if let Some(size) = style.size {
            self.size = Some(size);
        }
        if let Some(color) = &style.color {
            self.color = Some(color.clone());
        }
        if let Some(bold) = style.bold {
            self.bold = bold;
        }
        if let Some(italic) = style.italic {
            self.italic = italic;
        }
        if let Some(underline) = style.underline {
            self.underline = underline;
        }
        if let Some(strike) = style.strike {
            self.strike = strike;
        }
    }

    fn run(&self) -> Run {
        let mut run = Run::new();
        if let Some(font) = &self.font {
            run = run.fonts(
                RunFonts::new()
                    .ascii(font.as_str())
                    .hi_ansi(font.as_str())
                    .east_asia(font.as_str())
                    .cs(font.as_str()),
            );
        }
        if let Some(size) = self.size {
            run = run.size(size);
        }
        if let Some(color) = &self.color {
            run = run.color(color.as_str());
        }
        if self.bold {
            run = run.bold();
        }
        if self.italic {
            run = run.italic();
        }
        if self.underline {
            run = run.underline("single");
        }
        if self.strike {
            run = run.strike();
        }
        run
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParagraphKind {
    Body,
    Heading(u8),
}

#[derive(Debug, Clone, Copy)]
struct ListMarker {
    numbering: usize,
    level: usize,
    item: usize,
}

#[derive(Debug, Clone)]
struct Context {
    format: RunFormat,
    kind: ParagraphKind,
    indent: i32,
    space_before: Option<u32>,
    space_after: Option<u32>,
    marker: Option<ListMarker>,
    list_depth: usize,
}

impl Context {
    fn base(styles: &StyleSheet) -> Self {
        let mut format = RunFormat::default();
        format.apply(&styles.resolve(&["body"]));
        let paragraph = styles.resolve(&["p"]);
        Self {
            format,
            kind: ParagraphKind::Body,
            indent: 0,
            space_before: paragraph.space_before,
            space_after: paragraph.space_after,
            marker: None,
            list_depth: 0,
        }
    }

    fn styled(&self, style: &TextStyle) -> Self {
        let mut next = self.clone();
        next.format.apply(style);
        next
    }

    fn with_spacing(mut self, style: &TextStyle) -> Self {
        if style.space_before.is_some() {
            self.space_before = style.space_before;
        }
        if style.space_after.is_some() {
            self.space_after = style.space_after;
        }
        self
    }

    fn open_paragraph(&self, marked: bool) -> Paragraph {
        let mut paragraph = Paragraph::new();

        if let ParagraphKind::Heading(level) = self.kind {
            paragraph = paragraph
                .style(&format!("Heading{level}"))
                .keep_next(true);
        }

        if self.space_before.is_some() || self.space_after.is_some() {
            let mut spacing = LineSpacing::new();
            if let Some(before) = self.space_before {
                spacing = spacing.before(before);
            }
            if let Some(after) = self.space_after {
                spacing = spacing.after(after);
            }
            paragraph = paragraph.line_spacing(spacing);
        }

        match self.marker {
            Some(marker) if marked => paragraph.numbering(
                NumberingId::new(marker.numbering),
                IndentLevel::new(marker.level),
            ),
            Some(marker) => paragraph.indent(
                Some(self.indent + INDENT_STEP * (marker.level as i32 + 1)),
                None,
                None,
                None,
            ),
            None if self.indent > 0 => paragraph.indent(Some(self.indent), None, None, None),
            None => paragraph,
        }
    }
}

struct OpenParagraph {
    paragraph: Paragraph,
    trailing_space: bool,
}

/// Collects blocks for one container, opening paragraphs lazily as inline
/// content arrives.
#[derive(Default)]
struct BlockSink {
    blocks: Vec<Block>,
    open: Option<OpenParagraph>,
    last_marked_item: Option<usize>,
}

impl BlockSink {
    fn take_or_open(&mut self, ctx: &Context) -> OpenParagraph {
        if let Some(open) = self.open.take() {
            return open;
        }
        let marked = match ctx.marker {
            Some(marker) if self.last_marked_item != Some(marker.item) => {
                self.last_marked_item = Some(marker.item);
                true
            }
            _ => false,
        };
        OpenParagraph {
            paragraph: ctx.open_paragraph(marked),
            trailing_space: true,
        }
    }

    fn text(&mut self, text: &str, ctx: &Context) {
        let collapsed = collapse_whitespace(text);
        let starts_fresh = self.open.as_ref().is_none_or(|open| open.trailing_space);
        let content = if starts_fresh {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if content.is_empty() {
            return;
        }

        let run = ctx.format.run().add_text(content);
        let open = self.take_or_open(ctx);
        self.open = Some(OpenParagraph {
            paragraph: push_run(open.paragraph, run, &ctx.format),
            trailing_space: content.ends_with(' '),
        });
    }

    fn line_break(&mut self, ctx: &Context) {
        let run = ctx.format.run().add_break(BreakType::TextWrapping);
        let open = self.take_or_open(ctx);
        self.open = Some(OpenParagraph {
            paragraph: open.paragraph.add_run(run),
            trailing_space: true,
        });
    }

    fn flush(&mut self) {
        if let Some(open) = self.open.take() {
            self.blocks.push(Block::Paragraph(open.paragraph));
        }
    }

    fn push(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn push_run(paragraph: Paragraph, run: Run, format: &RunFormat) -> Paragraph {
    match &format.link {
        Some(url) => {
            paragraph.add_hyperlink(Hyperlink::new(url.as_str(), HyperlinkType::External).add_run(run))
        }
        None => paragraph.add_run(run),
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[derive(Default)]
struct NumberingRegistry {
    abstracts: Vec<AbstractNumbering>,
    instances: Vec<Numbering>,
    bullet: Option<usize>,
}

impl NumberingRegistry {
    fn next_id(&self) -> usize {
        self.instances.len() + 1
    }

    fn bullet(&mut self) -> usize {
        if let Some(id) = self.bullet {
            return id;
        }
        let id = self.next_id();
        let mut definition = AbstractNumbering::new(id);
        for level in 0..LIST_LEVELS {
            definition = definition.add_level(list_level(
                level,
                1,
                "bullet",
                BULLETS[level % BULLETS.len()].to_string(),
            ));
        }
        self.register(id, definition);
        self.bullet = Some(id);
        id
    }

    /// Every ordered list gets its own definition so numbering restarts.
    fn ordered(&mut self, start: usize) -> usize {
        let id = self.next_id();
        let mut definition = AbstractNumbering::new(id);
        for level in 0..LIST_LEVELS {
            let first = if level == 0 { start } else { 1 };
            definition =
                definition.add_level(list_level(level, first, "decimal", format!("%{}.", level + 1)));
        }
        self.register(id, definition);
        id
    }

    fn register(&mut self, id: usize, definition: AbstractNumbering) {
        self.abstracts.push(definition);
        self.instances.push(Numbering::new(id, id));
    }
}

fn list_level(level: usize, start: usize, format: &str, text: String) -> Level {
    Level::new(
        level,
        Start::new(start),
        NumberFormat::new(format),
        LevelText::new(text),
        LevelJc::new("left"),
    )
    .indent(
        Some(INDENT_STEP * (level as i32 + 1)),
        Some(SpecialIndentType::Hanging(HANGING)),
        None,
        None,
    )
}

struct Writer<'s> {
    styles: &'s StyleSheet,
    numbering: NumberingRegistry,
    items: usize,
    headings: [bool; 6],
    depth: usize,
}

impl<'s> Writer<'s> {
    fn new(styles: &'s StyleSheet) -> Self {
        Self {
            styles,
            numbering: NumberingRegistry::default(),
            items: 0,
            headings: [false; 6],
            depth: 0,
        }
    }

    fn finish(self, blocks: Vec<Block>) -> Docx {
        let mut docx = Docx::new();

        for (index, used) in self.headings.iter().enumerate() {
            if *used {
                let level = index + 1;
                docx = docx.add_style(
                    Style::new(&format!("Heading{level}"), StyleType::Paragraph)
                        .name(&format!("Heading {level}")),
                );
            }
        }
        for definition in self.numbering.abstracts {
            docx = docx.add_abstract_numbering(definition);
        }
        for instance in self.numbering.instances {
            docx = docx.add_numbering(instance);
        }

        if blocks.is_empty() {
            return docx.add_paragraph(Paragraph::new());
        }
        for block in blocks {
            docx = match block {
                Block::Paragraph(paragraph) => docx.add_paragraph(paragraph),
                Block::Table(table) => docx.add_table(table),
            };
        }
        docx
    }

    fn blocks_of(&mut self, element: ElementRef<'_>, ctx: &Context) -> Vec<Block> {
        let mut sink = BlockSink::default();
        self.walk_children(element, ctx, &mut sink);
        sink.finish()
    }

    fn walk_children(&mut self, element: ElementRef<'_>, ctx: &Context, sink: &mut BlockSink) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => sink.text(text, ctx),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, ctx, sink);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>, ctx: &Context, sink: &mut BlockSink) {
        if is_hidden(element.value().name()) {
            return;
        }
        if self.depth >= MAX_DEPTH {
            sink.text(&flattened_text(element), ctx);
            return;
        }

        self.depth += 1;
        self.structured(element, ctx, sink);
        self.depth -= 1;
    }

    fn structured(&mut self, element: ElementRef<'_>, ctx: &Context, sink: &mut BlockSink) {
        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<u8>().unwrap_or(1);
                self.headings[usize::from(level - 1)] = true;
                let style = self.styles.resolve(&[name]);
                let mut heading = ctx.styled(&style).with_spacing(&style);
                heading.kind = ParagraphKind::Heading(level);
                sink.flush();
                self.walk_children(element, &heading, sink);
                sink.flush();
            }
            "p" => {
                sink.flush();
                self.walk_children(element, ctx, sink);
                sink.flush();
            }
            "br" => sink.line_break(ctx),
            "ul" | "ol" => {
                sink.flush();
                self.list(element, name == "ol", ctx, sink);
            }
            "pre" => sink.push(Block::Paragraph(self.preformatted(element, ctx))),
            "blockquote" => {
                let style = self.styles.resolve(&["blockquote"]);
                let mut quote = ctx.styled(&style).with_spacing(&style);
                quote.indent = (quote.indent + INDENT_STEP / 2).min(MAX_INDENT);
                sink.flush();
                for block in self.blocks_of(element, &quote) {
                    sink.push(block);
                }
            }
            "table" => sink.push(Block::Table(self.table(element, ctx))),
            "hr" => sink.push(Block::Paragraph(horizontal_rule())),
            "img" => {
                if let Some(alt) = element.value().attr("alt").filter(|alt| !alt.trim().is_empty()) {
                    let mut format = ctx.clone();
                    format.format.italic = true;
                    sink.text(&format!("[{}]", alt.trim()), &format);
                }
            }
            "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
            | "figure" | "figcaption" | "details" | "summary" | "dl" | "dt" | "dd" | "li" => {
                sink.flush();
                self.walk_children(element, ctx, sink);
                sink.flush();
            }
            "strong" | "b" => {
                let mut inner = ctx.clone();
                inner.format.bold = true;
                self.walk_children(element, &inner, sink);
            }
            "em" | "i" | "cite" | "var" => {
                let mut inner = ctx.clone();
                inner.format.italic = true;
                self.walk_children(element, &inner, sink);
            }
            "u" | "ins" => {
                let mut inner = ctx.clone();
                inner.format.underline = true;
                self.walk_children(element, &inner, sink);
            }
            "s" | "del" | "strike" => {
                let mut inner = ctx.clone();
                inner.format.strike = true;
                self.walk_children(element, &inner, sink);
            }
            "code" | "kbd" | "samp" | "tt" => {
                let inner = ctx.styled(&self.styles.resolve(&["code"]));
                self.walk_children(element, &inner, sink);
            }
            "a" => {
                let mut inner = ctx.styled(&self.styles.resolve(&["a"]));
                inner.format.link = element
                    .value()
                    .attr("href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty() && !href.starts_with('#'))
                    .map(str::to_string);
                self.walk_children(element, &inner, sink);
            }
            _ => self.walk_children(element, ctx, sink),
        }
    }

    fn list(&mut self, element: ElementRef<'_>, ordered: bool, ctx: &Context, sink: &mut BlockSink) {
        let numbering = if ordered {
            let start = element
                .value()
                .attr("start")
                .and_then(|start| start.trim().parse::<usize>().ok())
                .unwrap_or(1);
            self.numbering.ordered(start)
        } else {
            self.numbering.bullet()
        };

        let style = self.styles.resolve(&["li"]);
        let level = ctx.list_depth.min(LIST_LEVELS - 1);

        for item in element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "li")
        {
            self.items += 1;
            let mut item_ctx = ctx.clone().with_spacing(&style);
            item_ctx.marker = Some(ListMarker {
                numbering,
                level,
                item: self.items,
            });
            item_ctx.list_depth = ctx.list_depth + 1;

            sink.flush();
            self.walk_children(item, &item_ctx, sink);
            sink.flush();
        }
    }

    fn preformatted(&mut self, element: ElementRef<'_>, ctx: &Context) -> Paragraph {
        let style = self.styles.resolve(&["pre"]);
        let code = ctx.styled(&style).with_spacing(&style);
        let text: String = element.text().collect();
        let text = text.strip_suffix('\n').unwrap_or(&text);

        let mut paragraph = code.open_paragraph(false);
        for (index, line) in text.split('\n').enumerate() {
            let mut run = code.format.run();
            if index > 0 {
                run = run.add_break(BreakType::TextWrapping);
            }
            paragraph = paragraph.add_run(run.add_text(line));
        }
        paragraph
    }

    fn table(&mut self, element: ElementRef<'_>, ctx: &Context) -> Table {
        let mut rows = Vec::new();
        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "tr" => rows.push(self.row(child, ctx)),
                "thead" | "tbody" | "tfoot" => {
                    for row in child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|row| row.value().name() == "tr")
                    {
                        rows.push(self.row(row, ctx));
                    }
                }
                _ => {}
            }
        }
        Table::new(rows)
    }

    fn row(&mut self, element: ElementRef<'_>, ctx: &Context) -> TableRow {
        let cells = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "th" | "td"))
            .map(|cell| self.cell(cell, ctx))
            .collect();
        TableRow::new(cells).cant_split()
    }

    fn cell(&mut self, element: ElementRef<'_>, ctx: &Context) -> TableCell {
        let style = self.styles.resolve(&[element.value().name()]);
        let mut inner = ctx.styled(&style);
        inner.marker = None;
        inner.list_depth = 0;
        inner.indent = 0;
        inner.space_before = None;
        inner.space_after = None;

        let mut cell = TableCell::new();
        if let Some(fill) = &style.background {
            cell = cell.shading(Shading::new().fill(fill.as_str()));
        }
        if let Some(span) = element
            .value()
            .attr("colspan")
            .and_then(|span| span.trim().parse::<usize>().ok())
            .filter(|span| *span > 1)
        {
            cell = cell.grid_span(span);
        }

        let blocks = self.blocks_of(element, &inner);
        if blocks.is_empty() {
            return cell.add_paragraph(Paragraph::new());
        }
        for block in blocks {
            cell = match block {
                Block::Paragraph(paragraph) => cell.add_paragraph(paragraph),
                Block::Table(table) => cell.add_table(table),
            };
        }
        cell
    }
}

fn is_hidden(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "head" | "title" | "template" | "noscript" | "iframe" | "object" | "svg"
    )
}

/// Visible text below `element`, gathered with an explicit stack.
fn flattened_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    let mut pending = vec![*element];
    while let Some(node) = pending.pop() {
        match node.value() {
            Node::Text(chunk) => {
                text.push_str(chunk);
                text.push(' ');
            }
            Node::Element(inner) if is_hidden(inner.name()) => {}
            _ => pending.extend(node.children().rev()),
        }
    }
    text
}

/// An empty paragraph with a thin bottom border.
fn horizontal_rule() -> Paragraph {
    let mut rule = Paragraph::new();
    rule.property = rule.property.set_borders(
        ParagraphBorders::with_empty().set(
            ParagraphBorder::new(ParagraphBorderPosition::Bottom)
                .val(BorderType::Single)
                .size(6)
                .space(1)
                .color("CCCCCC"),
        ),
    );
    rule
}
