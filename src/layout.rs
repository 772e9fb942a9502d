//! Layout engine – uses Taffy to compute block / flex / table geometry from a
//! styled DOM tree, then converts the result into a tree of positioned boxes.
//!
//! Runs of inline content (text, spans, `<br>`, checkboxes) are wrapped into
//! anonymous text leaves up front, so Taffy only ever sees boxes of known
//! size.

use std::borrow::Cow;
use std::collections::HashMap;

use taffy::{
    AvailableSpace, LengthPercentage, LengthPercentageAuto, NodeId, Rect, Size, Style, TaffyError,
    TaffyTree,
};

use crate::css::PT_PER_PX;
use crate::dom::Tag;
use crate::fonts::{wrap_fragments, FontManager, Fragment, ASCENT};
use crate::images::ImageStore;
use crate::layout_config::{TextLine, TextSpan};
use crate::style::{
    self, ComputedStyle, Dimension as CssDimension, Display, Edges, TextAlign, TextDecoration,
    VerticalAlign, WhiteSpace,
};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    /// Wrapped lines, offsets relative to the box.
    Text { lines: Vec<TextLine> },
    Image { src: String },
    /// List item; the marker is drawn in the gutter left of the box.
    ListItem { marker: TextLine },
}

impl PositionedBox {
    pub fn text_lines(&self) -> Option<&[TextLine]> {
        match &self.content {
            BoxContent::Text { lines } => Some(lines),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

fn taffy_err(e: TaffyError) -> String {
    format!("layout failed: {e}")
}

/// One entry of an inline run.
enum InlineItem<'n> {
    Text {
        text: Cow<'n, str>,
        style: &'n ComputedStyle,
    },
    Break,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    images: &'a ImageStore,
    /// Images taller than this are scaled down to fit one page.
    content_height: f32,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, images: &'a ImageStore, content_height: f32) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            images,
            content_height,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    /// Text, and inline elements that contain no image, flow into lines.
    fn is_inline_level(node: &style::StyledNode) -> bool {
        match node {
            style::StyledNode::Text { .. } => true,
            style::StyledNode::Element {
                tag,
                style,
                children,
                ..
            } => style.is_inline() && *tag != Tag::Img && !Self::contains_image(children),
        }
    }

    fn contains_image(children: &[style::StyledNode]) -> bool {
        children.iter().any(|c| match c {
            style::StyledNode::Element { tag, children, .. } => {
                *tag == Tag::Img || Self::contains_image(children)
            }
            style::StyledNode::Text { .. } => false,
        })
    }

    /// Build the children of a container, grouping consecutive inline-level
    /// nodes into text leaves styled by `block`.
    fn build_children(
        &mut self,
        children: &[style::StyledNode],
        block: &ComputedStyle,
        child_width: f32,
        list_start: Option<u32>,
    ) -> Result<Vec<NodeId>, String> {
        let mut ids = Vec::new();
        let mut run: Vec<&style::StyledNode> = Vec::new();
        let mut item_number = list_start.unwrap_or(1);

        for child in children {
            if Self::is_inline_level(child) {
                run.push(child);
                continue;
            }
            if let Some(id) = self.build_inline_run(&run, block, child_width)? {
                ids.push(id);
            }
            run.clear();

            let id = self.build_node(child, child_width)?;
            if let (Some(id), style::StyledNode::Element { tag: Tag::Li, style, children, .. }) =
                (id, child)
            {
                if list_start.is_some() && !Self::starts_with_checkbox(children) {
                    if let Some(text) = style.list_style.marker(item_number) {
                        let marker = self.marker_line(&text, style);
                        self.node_content.insert(id, BoxContent::ListItem { marker });
                    }
                }
                item_number += 1;
            }
            if let Some(id) = id {
                ids.push(id);
            }
        }
        if let Some(id) = self.build_inline_run(&run, block, child_width)? {
            ids.push(id);
        }
        Ok(ids)
    }

    /// Task list items carry their own checkbox instead of a bullet.
    fn starts_with_checkbox(children: &[style::StyledNode]) -> bool {
        let first = children.iter().find(|c| match c {
            style::StyledNode::Text { text, .. } => !text.trim().is_empty(),
            style::StyledNode::Element { .. } => true,
        });
        match first {
            Some(style::StyledNode::Element {
                tag: Tag::Input,
                attrs,
                ..
            }) => is_checkbox(attrs),
            Some(style::StyledNode::Element { tag: Tag::P, children, .. }) => {
                Self::starts_with_checkbox(children)
            }
            _ => false,
        }
    }

    fn marker_line(&self, text: &str, style: &ComputedStyle) -> TextLine {
        let size = style.font_size;
        let font = crate::fonts::FontSpec {
            bold: false,
            italic: false,
            ..style.font()
        };
        let width = self.fonts.measure_text_width(text, size, font);
        let gap = size * 0.5;
        let height = self.fonts.line_height_px(size, style.line_height);
        TextLine {
            spans: vec![TextSpan {
                text: text.to_string(),
                x_offset: 0.0,
                width,
                font,
                font_size: size,
                color: style.color.to_array(),
                underline: false,
                strike: false,
                rise: 0.0,
            }],
            x_offset: -(width + gap),
            y_offset: 0.0,
            height,
            baseline: (height - size) / 2.0 + ASCENT * size,
        }
    }

    fn collect_inline<'n>(node: &'n style::StyledNode, out: &mut Vec<InlineItem<'n>>) {
        match node {
            style::StyledNode::Text { text, style } => out.push(InlineItem::Text {
                text: Cow::Borrowed(text.as_str()),
                style,
            }),
            style::StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => match tag {
                Tag::Br => out.push(InlineItem::Break),
                Tag::Input if is_checkbox(attrs) => {
                    let mark = if attrs.contains_key("checked") { "[x] " } else { "[ ] " };
                    out.push(InlineItem::Text {
                        text: Cow::Borrowed(mark),
                        style,
                    });
                }
                Tag::Input => {}
                _ => {
                    for child in children {
                        Self::collect_inline(child, out);
                    }
                }
            },
        }
    }

    /// Wrap an inline run into a fixed-size text leaf.
    fn build_inline_run(
        &mut self,
        run: &[&style::StyledNode],
        block: &ComputedStyle,
        width: f32,
    ) -> Result<Option<NodeId>, String> {
        if run.is_empty() {
            return Ok(None);
        }
        let mut items = Vec::new();
        for node in run {
            Self::collect_inline(node, &mut items);
        }
        let preformatted = block.white_space == WhiteSpace::Pre;
        let blank = items.iter().all(|i| match i {
            InlineItem::Text { text, .. } => text.trim().is_empty(),
            InlineItem::Break => false,
        });
        if blank && !preformatted {
            return Ok(None);
        }

        let fragments: Vec<Fragment<'_>> = items
            .iter()
            .map(|item| match item {
                InlineItem::Text { text, style } => Fragment::Text {
                    text: text.as_ref(),
                    font: style.font(),
                    size: style.font_size,
                },
                InlineItem::Break => Fragment::Break,
            })
            .collect();
        let wrapped = wrap_fragments(&fragments, width, preformatted, self.fonts);
        if wrapped.is_empty() {
            return Ok(None);
        }

        let mut lines = Vec::with_capacity(wrapped.len());
        let mut y = 0.0;
        for line in wrapped {
            let size = if line.max_font_size > 0.0 {
                line.max_font_size
            } else {
                block.font_size
            };
            let height = self.fonts.line_height_px(size, block.line_height);
            let slack = (width - line.width).max(0.0);
            let x_offset = match block.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => slack / 2.0,
                TextAlign::Right => slack,
            };
            let spans = line
                .pieces
                .into_iter()
                .filter_map(|piece| {
                    let InlineItem::Text { style, .. } = &items[piece.fragment] else {
                        return None;
                    };
                    Some(TextSpan {
                        text: piece.text,
                        x_offset: piece.x,
                        width: piece.width,
                        font: style.font(),
                        font_size: style.font_size,
                        color: style.color.to_array(),
                        underline: style.text_decoration == TextDecoration::Underline,
                        strike: style.text_decoration == TextDecoration::LineThrough,
                        rise: match style.vertical_align {
                            VerticalAlign::Baseline => 0.0,
                            VerticalAlign::Super => block.font_size * 0.35,
                            VerticalAlign::Sub => -block.font_size * 0.2,
                        },
                    })
                })
                .collect();
            lines.push(TextLine {
                spans,
                x_offset,
                y_offset: y,
                height,
                baseline: (height - size) / 2.0 + ASCENT * size,
            });
            y += height;
        }

        let leaf_style = Style {
            size: Size {
                width: taffy::Dimension::Length(width),
                height: taffy::Dimension::Length(y),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };
        let node = self.taffy.new_leaf(leaf_style).map_err(taffy_err)?;
        self.node_styles.insert(node, text_leaf_style(block));
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(Some(node))
    }

    fn build_node(&mut self, styled: &style::StyledNode, avail: f32) -> Result<Option<NodeId>, String> {
        match styled {
            style::StyledNode::Text { style, .. } => {
                self.build_inline_run(&[styled], style, avail)
            }
            style::StyledNode::Element {
                tag: Tag::Img,
                style,
                attrs,
                ..
            } => self.build_image(style, attrs, avail),
            style::StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, avail).map(Some),
        }
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[style::StyledNode],
        attrs: &HashMap<String, String>,
        avail: f32,
    ) -> Result<NodeId, String> {
        let mut my_width = match style.width {
            CssDimension::Px(w) => w,
            CssDimension::Percent(p) => avail * p / 100.0,
            CssDimension::Auto => avail - style.margin.horizontal(),
        };
        if let CssDimension::Px(max) = style.max_width {
            my_width = my_width.min(max);
        }
        let inner_width =
            (my_width - style.padding.horizontal() - style.border.horizontal()).max(1.0);

        // Rows and flex rows share their width evenly between element
        // children; the estimate decides where text wraps.
        let is_row = style.display == Display::TableRow
            || (style.display == Display::Flex && style.flex_direction == style::FlexDirection::Row);
        let child_width = if is_row {
            let n = children
                .iter()
                .filter(|c| matches!(c, style::StyledNode::Element { .. }))
                .count()
                .max(1);
            let gaps = style.gap * (n - 1) as f32;
            ((inner_width - gaps) / n as f32).max(1.0)
        } else {
            inner_width
        };

        let list_start = match tag {
            Tag::Ol => Some(
                attrs
                    .get("start")
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .unwrap_or(1),
            ),
            Tag::Ul => Some(1),
            _ => None,
        };

        let child_nodes = if is_row {
            // Text directly inside a row would become a cell of its own.
            let mut ids = Vec::new();
            for child in children {
                if let style::StyledNode::Element { .. } = child {
                    if let Some(id) = self.build_node(child, child_width)? {
                        ids.push(id);
                    }
                }
            }
            ids
        } else {
            self.build_children(children, style, child_width, list_start)?
        };

        let taffy_style = self.computed_to_taffy(style);
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(taffy_err)?;
        self.node_styles.insert(node, style.clone());
        Ok(node)
    }

    /// Size an image from CSS and its intrinsic pixels, scaled down to fit
    /// the line and the page.
    fn build_image(
        &mut self,
        style: &ComputedStyle,
        attrs: &HashMap<String, String>,
        avail: f32,
    ) -> Result<Option<NodeId>, String> {
        let Some(src) = attrs.get("src") else {
            return Ok(None);
        };
        let Some(img) = self.images.get(src) else {
            log::debug!("image '{}' not available, leaving it out", shorten(src));
            return Ok(None);
        };
        let intrinsic_w = img.width_px as f32 * PT_PER_PX;
        let intrinsic_h = img.height_px as f32 * PT_PER_PX;
        let aspect = intrinsic_w / intrinsic_h;

        let known_w = match style.width {
            CssDimension::Px(v) => Some(v),
            CssDimension::Percent(p) => Some(avail * p / 100.0),
            CssDimension::Auto => None,
        };
        let known_h = match style.height {
            CssDimension::Px(v) => Some(v),
            _ => None,
        };
        let (mut w, mut h) = match (known_w, known_h) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w / aspect),
            (None, Some(h)) => (h * aspect, h),
            (None, None) => (intrinsic_w, intrinsic_h),
        };
        if let CssDimension::Px(max) = style.max_width {
            if w > max {
                h *= max / w;
                w = max;
            }
        }
        let max_w = (avail - style.margin.horizontal()).max(1.0);
        if w > max_w {
            h *= max_w / w;
            w = max_w;
        }
        let max_h = (self.content_height - style.margin.vertical()).max(1.0);
        if h > max_h {
            w *= max_h / h;
            h = max_h;
        }

        let mut ts = self.computed_to_taffy(style);
        ts.size = Size {
            width: taffy::Dimension::Length(w.max(1.0)),
            height: taffy::Dimension::Length(h.max(1.0)),
        };
        ts.flex_shrink = 0.0;
        ts.align_self = Some(taffy::AlignSelf::Start);
        let node = self.taffy.new_leaf(ts).map_err(taffy_err)?;
        self.node_styles.insert(node, style.clone());
        self.node_content
            .insert(node, BoxContent::Image { src: src.clone() });
        Ok(Some(node))
    }

    fn computed_to_taffy(&self, s: &ComputedStyle) -> Style {
        let mut ts = Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Column,
            margin: edges_auto(&s.margin),
            padding: edges(&s.padding),
            border: edges(&s.border),
            min_size: Size {
                width: taffy::Dimension::Length(0.0),
                height: taffy::Dimension::Auto,
            },
            flex_shrink: 0.0,
            ..Default::default()
        };

        match s.display {
            Display::Table | Display::TableRowGroup => {}
            Display::TableRow => {
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.align_items = Some(taffy::AlignItems::Stretch);
                ts.size.width = taffy::Dimension::Percent(1.0);
                return ts;
            }
            Display::TableCell => {
                // Equal columns.
                ts.flex_grow = 1.0;
                ts.flex_shrink = 1.0;
                ts.flex_basis = taffy::Dimension::Length(0.0);
                return ts;
            }
            Display::Flex => {
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.gap = Size {
                    width: LengthPercentage::Length(s.gap),
                    height: LengthPercentage::Length(s.gap),
                };
            }
            Display::Block
            | Display::ListItem
            | Display::Inline
            | Display::InlineBlock
            | Display::None => {}
        }

        ts.size = Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        };
        ts.max_size.width = dim_to_taffy(s.max_width);
        ts
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox, String> {
        let layout = self.taffy.layout(node).map_err(taffy_err)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;
        let (width, height) = (layout.size.width, layout.size.height);

        let children = self
            .taffy
            .children(node)
            .map_err(taffy_err)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionedBox {
            x,
            y,
            width,
            height,
            style,
            content,
            children,
        })
    }
}

fn is_checkbox(attrs: &HashMap<String, String>) -> bool {
    attrs
        .get("type")
        .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
}

/// Style for an anonymous text leaf: the block's text properties without
/// any of its box decoration.
fn text_leaf_style(block: &ComputedStyle) -> ComputedStyle {
    ComputedStyle {
        display: Display::Block,
        margin: Edges::default(),
        padding: Edges::default(),
        border: Edges::default(),
        background_color: crate::css::Color::TRANSPARENT,
        width: CssDimension::Auto,
        height: CssDimension::Auto,
        page_break_before: false,
        page_break_after: false,
        page_break_inside_avoid: false,
        ..block.clone()
    }
}

fn edges(e: &Edges) -> Rect<LengthPercentage> {
    Rect {
        left: LengthPercentage::Length(e.left),
        right: LengthPercentage::Length(e.right),
        top: LengthPercentage::Length(e.top),
        bottom: LengthPercentage::Length(e.bottom),
    }
}

fn edges_auto(e: &Edges) -> Rect<LengthPercentageAuto> {
    Rect {
        left: LengthPercentageAuto::Length(e.left),
        right: LengthPercentageAuto::Length(e.right),
        top: LengthPercentageAuto::Length(e.top),
        bottom: LengthPercentageAuto::Length(e.bottom),
    }
}

fn dim_to_taffy(d: CssDimension) -> taffy::Dimension {
    match d {
        CssDimension::Auto => taffy::Dimension::Auto,
        CssDimension::Px(v) => taffy::Dimension::Length(v),
        CssDimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

fn shorten(src: &str) -> &str {
    let end = (0..=src.len().min(60))
        .rev()
        .find(|&i| src.is_char_boundary(i))
        .unwrap_or(0);
    &src[..end]
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates: x includes the left page margin, y starts
/// at 0 at the top of the content flow.
pub fn compute_layout(
    styled_nodes: &[style::StyledNode],
    content_width: f32,
    margin_left: f32,
    content_height: f32,
    fonts: &FontManager,
    images: &ImageStore,
) -> Result<Vec<PositionedBox>, String> {
    let mut builder = LayoutBuilder::new(fonts, images, content_height);

    let root_text = ComputedStyle::default();
    let child_ids = builder.build_children(styled_nodes, &root_text, content_width, None)?;

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(content_width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(taffy_err)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(taffy_err)?;

    let root_box = builder.extract(root, margin_left, 0.0)?;
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Stylesheet;
    use crate::dom::parse_html;
    use crate::images::png_data_uri;
    use crate::style::build_styled_tree;

    const WIDTH: f32 = 515.0;

    fn layout_with(html: &str, css: &str, images: &ImageStore) -> Vec<PositionedBox> {
        let sheets = vec![Stylesheet::parse("test.css", css).unwrap()];
        let styled = build_styled_tree(&parse_html(html), &sheets);
        compute_layout(&styled, WIDTH, 40.0, 760.0, &FontManager::new(), images).unwrap()
    }

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        layout_with(html, css, &ImageStore::new(None))
    }

    fn first_text(b: &PositionedBox) -> Option<&PositionedBox> {
        if b.text_lines().is_some() {
            return Some(b);
        }
        b.children.iter().find_map(first_text)
    }

    fn line_texts(b: &PositionedBox) -> Vec<String> {
        first_text(b)
            .and_then(PositionedBox::text_lines)
            .map(|lines| lines.iter().map(TextLine::text).collect())
            .unwrap_or_default()
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", "");
        assert_eq!(boxes.len(), 1);
        let p = &boxes[0];
        assert_eq!(p.x, 40.0);
        assert!(p.width > 0.0 && p.height > 0.0);
        assert_eq!(line_texts(p), vec!["Hello world"]);
    }

    #[test]
    fn long_paragraph_wraps_and_grows() {
        let text = "lorem ipsum dolor sit amet ".repeat(40);
        let boxes = layout(&format!("<p>{text}</p>"), "");
        let lines = line_texts(&boxes[0]);
        assert!(lines.len() > 3, "{lines:?}");
        let leaf = first_text(&boxes[0]).unwrap();
        let per_line = 11.0 * 1.4;
        assert!((leaf.height - per_line * lines.len() as f32).abs() < 0.01);
    }

    #[test]
    fn inline_styles_become_spans() {
        let boxes = layout("<p>plain <strong>bold</strong> <em>it</em></p>", "");
        let lines = first_text(&boxes[0]).unwrap().text_lines().unwrap();
        let spans = &lines[0].spans;
        assert_eq!(lines[0].text(), "plain bold it");
        assert!(spans.iter().any(|s| s.text.contains("bold") && s.font.bold));
        assert!(spans.iter().any(|s| s.text.contains("it") && s.font.italic));
        // Spans advance left to right.
        assert!(spans.windows(2).all(|w| w[0].x_offset < w[1].x_offset));
    }

    #[test]
    fn centered_text_is_offset() {
        let boxes = layout("<p>Hi</p>", "p { text-align: center }");
        let line = &first_text(&boxes[0]).unwrap().text_lines().unwrap()[0];
        assert!(line.x_offset > 200.0 && line.x_offset < 260.0);
    }

    #[test]
    fn line_breaks_and_preformatted_text() {
        let boxes = layout("<p>a<br>b</p><pre><code>x = 1\n  y = 2\n</code></pre>", "");
        assert_eq!(line_texts(&boxes[0]), vec!["a", "b"]);
        assert_eq!(line_texts(&boxes[1]), vec!["x = 1", "  y = 2"]);
    }

    #[test]
    fn blocks_stack_vertically() {
        let boxes = layout("<h1>Title</h1><p>Body</p>", "");
        assert_eq!(boxes.len(), 2);
        assert!(boxes[1].y >= boxes[0].y + boxes[0].height);
    }

    #[test]
    fn ordered_list_markers_follow_start() {
        let boxes = layout(r#"<ol start="3"><li>a</li><li>b</li></ol>"#, "");
        let markers: Vec<String> = boxes[0]
            .children
            .iter()
            .filter_map(|c| match &c.content {
                BoxContent::ListItem { marker } => Some(marker.text()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec!["3.", "4."]);
        let BoxContent::ListItem { marker } = &boxes[0].children[0].content else {
            panic!("no marker");
        };
        assert!(marker.x_offset < 0.0);
    }

    #[test]
    fn task_items_show_checkbox_not_bullet() {
        let boxes = layout(
            r#"<ul><li><input type="checkbox" checked disabled> done</li><li>plain</li></ul>"#,
            "",
        );
        let items = &boxes[0].children;
        assert!(matches!(items[0].content, BoxContent::None));
        assert_eq!(line_texts(&items[0]), vec!["[x] done"]);
        assert!(matches!(items[1].content, BoxContent::ListItem { .. }));
    }

    #[test]
    fn table_cells_share_a_row() {
        let boxes = layout(
            "<table><tbody><tr><td>one</td><td>two</td></tr><tr><td>3</td><td>4</td></tr></tbody></table>",
            "",
        );
        let tbody = &boxes[0].children[0];
        let row = &tbody.children[0];
        assert_eq!(row.children.len(), 2);
        let (a, b) = (&row.children[0], &row.children[1]);
        assert_eq!(a.y, b.y);
        assert!(b.x > a.x + a.width - 0.01);
        assert!((a.width - b.width).abs() < 0.5);
        assert!(tbody.children[1].y >= row.y + row.height - 0.01);
    }

    #[test]
    fn images_scale_to_content_width() {
        let src = png_data_uri(2000, 100);
        let mut images = ImageStore::new(None);
        images.load_all([src.as_str()]);
        let boxes = layout_with(&format!(r#"<p><img src="{src}"></p>"#), "", &images);
        let img = boxes[0]
            .children
            .iter()
            .find(|c| matches!(c.content, BoxContent::Image { .. }))
            .expect("image box");
        assert!((img.width - WIDTH).abs() < 0.5, "width {}", img.width);
        assert!((img.height - WIDTH / 20.0).abs() < 0.5, "height {}", img.height);
    }

    #[test]
    fn missing_images_are_left_out() {
        let boxes = layout(r#"<p><img src="nowhere.png"> caption</p>"#, "");
        assert_eq!(line_texts(&boxes[0]), vec!["caption"]);
        assert_eq!(boxes[0].children.len(), 1);
    }

    #[test]
    fn text_leaves_do_not_inherit_decoration() {
        let boxes = layout("<h2>T</h2>", "h2 { border-bottom: 1pt solid; page-break-before: always }");
        let leaf = first_text(&boxes[0]).unwrap();
        assert!(leaf.style.border.is_zero());
        assert!(!leaf.style.page_break_before);
        assert!(boxes[0].style.page_break_before);
    }
}
