//! Paginated page content, as handed from pagination to the painter.
//!
//! Coordinates are points measured from the top-left corner of the page.

use crate::fonts::FontSpec;

/// Every page of a document with its boxes already placed.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// PDF metadata title.
    pub title: String,
    /// Page size in points; all pages share it.
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A box on a page: decoration, at most one kind of content, and nested boxes.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,
    /// List bullet or number, drawn left of the box.
    pub marker: Option<TextContent>,

    pub children: Vec<LayoutBox>,
}

/// Per-side border widths `[top, right, bottom, left]` and one colour.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderStyle {
    pub widths: [f32; 4],
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Default)]
pub struct TextContent {
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    /// Horizontal shift from text-align.
    pub x_offset: f32,
    /// Line top, relative to the box top.
    pub y_offset: f32,
    pub height: f32,
    /// Distance from the line top to the baseline.
    pub baseline: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A run of text in one font and colour.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    /// Offset from the line's start.
    pub x_offset: f32,
    pub width: f32,
    pub font: FontSpec,
    pub font_size: f32,
    pub color: [f32; 4],
    pub underline: bool,
    pub strike: bool,
    /// Baseline shift, positive upwards (superscript).
    pub rise: f32,
}

#[derive(Debug, Clone)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    pub fn new(title: impl Into<String>, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.into(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenated text of every page, one line per text line. Used for
    /// checks on what ended up where.
    pub fn page_text(&self, page: usize) -> String {
        let mut out = String::new();
        if let Some(p) = self.pages.get(page) {
            for b in &p.boxes {
                collect_text(b, &mut out);
            }
        }
        out
    }
}

fn collect_text(lbox: &LayoutBox, out: &mut String) {
    if let Some(text) = &lbox.text {
        for line in &text.lines {
            out.push_str(&line.text());
            out.push('\n');
        }
    }
    for child in &lbox.children {
        collect_text(child, out);
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            marker: None,
            children: Vec::new(),
        }
    }
}
