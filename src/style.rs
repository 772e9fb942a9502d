//! Style resolver – runs the cascade over the DOM and produces a flat
//! [`ComputedStyle`] per element for the layout engine.
//!
//! Order of application, lowest priority first: inherited text properties,
//! tag defaults, matching stylesheet rules by specificity then source order,
//! the `style` attribute, `!important` sheet declarations, `!important`
//! inline declarations.

use std::collections::HashMap;

use crate::css::{parse_declarations, parse_length, Color, Declaration, Length, Stylesheet};
use crate::dom::{DomNode, ElementNode, Tag};
use crate::fonts::{FontFamily, FontSpec};

/// Font size of the root element, in points.
pub const DEFAULT_FONT_SIZE: f32 = 11.0;

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: Dimension,

    // Box model (pt)
    pub margin: Edges,
    pub padding: Edges,
    pub border: Edges,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_family: FontFamily,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub white_space: WhiteSpace,
    pub vertical_align: VerticalAlign,
    pub list_style: ListStyle,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            max_width: Dimension::Auto,
            margin: Edges::default(),
            padding: Edges::default(),
            border: Edges::default(),
            border_color: Color::BLACK,
            font_size: DEFAULT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: FontFamily::Sans,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            text_decoration: TextDecoration::None,
            white_space: WhiteSpace::Normal,
            vertical_align: VerticalAlign::Baseline,
            list_style: ListStyle::Disc,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    pub fn font(&self) -> FontSpec {
        FontSpec {
            family: self.font_family,
            bold: self.font_weight == FontWeight::Bold,
            italic: self.font_style == FontStyle::Italic,
        }
    }

    /// Inherited properties of `parent`; everything else at its initial
    /// value.
    fn inherit(parent: &ComputedStyle) -> Self {
        Self {
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            font_style: parent.font_style,
            font_family: parent.font_family,
            color: parent.color,
            text_align: parent.text_align,
            line_height: parent.line_height,
            text_decoration: parent.text_decoration,
            white_space: parent.white_space,
            list_style: parent.list_style,
            ..Self::default()
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.display, Display::Inline | Display::InlineBlock)
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    Normal,
    Pre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Baseline,
    Super,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    None,
    Disc,
    Circle,
    Square,
    Decimal,
    LowerAlpha,
    UpperAlpha,
}

impl ListStyle {
    /// Marker text for the `n`th item (1-based).
    pub fn marker(&self, n: u32) -> Option<String> {
        let letter = |base: u8| {
            let idx = (n.max(1) - 1) % 26;
            char::from(base + idx as u8)
        };
        match self {
            ListStyle::None => None,
            ListStyle::Disc => Some("\u{2022}".into()),
            ListStyle::Circle => Some("o".into()),
            ListStyle::Square => Some("-".into()),
            ListStyle::Decimal => Some(format!("{n}.")),
            ListStyle::LowerAlpha => Some(format!("{}.", letter(b'a'))),
            ListStyle::UpperAlpha => Some(format!("{}.", letter(b'A'))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

/// Per-side lengths in points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn all(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn is_zero(&self) -> bool {
        self.top <= 0.0 && self.right <= 0.0 && self.bottom <= 0.0 && self.left <= 0.0
    }
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

/// Resolves styles against an ordered set of stylesheets. Later sheets win
/// ties with earlier ones.
pub struct StyleResolver<'s> {
    sheets: &'s [Stylesheet],
    root_font_size: f32,
}

impl<'s> StyleResolver<'s> {
    pub fn new(sheets: &'s [Stylesheet]) -> Self {
        Self {
            sheets,
            root_font_size: DEFAULT_FONT_SIZE,
        }
    }

    /// Resolve the style for an element, inheriting text properties from its
    /// parent.
    pub fn resolve(
        &self,
        element: &ElementNode,
        ancestors: &[&ElementNode],
        parent: Option<&ComputedStyle>,
    ) -> ComputedStyle {
        let root = ComputedStyle::default();
        let parent = parent.unwrap_or(&root);
        let mut style = ComputedStyle::inherit(parent);
        apply_tag_defaults(&mut style, element);

        let mut matched: Vec<((u32, u32, u32), usize, usize, &Declaration)> = Vec::new();
        for (sheet_idx, sheet) in self.sheets.iter().enumerate() {
            for rule in &sheet.rules {
                let Some(selector) = &rule.selector else {
                    continue;
                };
                if selector.matches(element, ancestors) {
                    let spec = selector.specificity();
                    for decl in &rule.declarations {
                        matched.push((spec, sheet_idx, rule.order, decl));
                    }
                }
            }
        }
        matched.sort_by_key(|(spec, sheet, order, _)| (*spec, *sheet, *order));

        let inline = element
            .inline_style()
            .map(parse_declarations)
            .unwrap_or_default();

        let sheet_decls = matched.iter().map(|(_, _, _, d)| *d);
        let ordered: Vec<&Declaration> = sheet_decls
            .clone()
            .filter(|d| !d.important)
            .chain(inline.iter().filter(|d| !d.important))
            .chain(sheet_decls.filter(|d| d.important))
            .chain(inline.iter().filter(|d| d.important))
            .collect();

        // font-size first: other lengths in `em` refer to it.
        for decl in ordered.iter().filter(|d| d.property == "font-size") {
            if let Some(size) = self.font_size(&decl.value, parent.font_size) {
                style.font_size = size;
            }
        }
        for decl in ordered.iter().filter(|d| d.property != "font-size") {
            self.apply_property(&mut style, &decl.property, &decl.value);
        }
        style
    }

    fn font_size(&self, value: &str, parent_size: f32) -> Option<f32> {
        let keyword = match value.trim().to_ascii_lowercase().as_str() {
            "xx-small" => Some(0.6 * DEFAULT_FONT_SIZE),
            "x-small" => Some(0.75 * DEFAULT_FONT_SIZE),
            "small" => Some(0.89 * DEFAULT_FONT_SIZE),
            "medium" => Some(DEFAULT_FONT_SIZE),
            "large" => Some(1.2 * DEFAULT_FONT_SIZE),
            "x-large" => Some(1.5 * DEFAULT_FONT_SIZE),
            "xx-large" => Some(2.0 * DEFAULT_FONT_SIZE),
            "smaller" => Some(parent_size / 1.2),
            "larger" => Some(parent_size * 1.2),
            _ => None,
        };
        if keyword.is_some() {
            return keyword;
        }
        let size = match parse_length(value)? {
            Length::Percent(p) => parent_size * p / 100.0,
            other => other.to_pt(parent_size, self.root_font_size)?,
        };
        (size > 0.0).then_some(size)
    }

    fn length(&self, value: &str, style: &ComputedStyle) -> Option<f32> {
        parse_length(value)?.to_pt(style.font_size, self.root_font_size)
    }

    fn dimension(&self, value: &str, style: &ComputedStyle) -> Option<Dimension> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("auto") || v.eq_ignore_ascii_case("none") {
            return Some(Dimension::Auto);
        }
        match parse_length(v)? {
            Length::Percent(p) => Some(Dimension::Percent(p)),
            other => other
                .to_pt(style.font_size, self.root_font_size)
                .map(Dimension::Px),
        }
    }

    /// Parse a 1–4 value box shorthand. `auto` counts as zero.
    fn edges(&self, value: &str, style: &ComputedStyle) -> Option<Edges> {
        let parts: Vec<f32> = value
            .split_whitespace()
            .map(|p| {
                if p.eq_ignore_ascii_case("auto") {
                    Some(0.0)
                } else {
                    self.length(p, style)
                }
            })
            .collect::<Option<_>>()?;
        let e = match parts.as_slice() {
            [a] => Edges::all(*a),
            [v, h] => Edges {
                top: *v,
                right: *h,
                bottom: *v,
                left: *h,
            },
            [t, h, b] => Edges {
                top: *t,
                right: *h,
                bottom: *b,
                left: *h,
            },
            [t, r, b, l] => Edges {
                top: *t,
                right: *r,
                bottom: *b,
                left: *l,
            },
            _ => return None,
        };
        Some(e)
    }

    fn border_width(&self, value: &str, style: &ComputedStyle) -> Option<f32> {
        match value.trim().to_ascii_lowercase().as_str() {
            "thin" => Some(0.75),
            "medium" => Some(2.25),
            "thick" => Some(3.75),
            v => self.length(v, style),
        }
    }

    /// `border` / `border-<side>` shorthand: returns `(width, color)`.
    fn border_shorthand(&self, value: &str, style: &ComputedStyle) -> (Option<f32>, Option<Color>) {
        let mut width = None;
        let mut color = None;
        let mut visible = true;
        for token in value.split_whitespace() {
            let lower = token.to_ascii_lowercase();
            if matches!(lower.as_str(), "none" | "hidden") {
                visible = false;
            } else if let Some(w) = self.border_width(token, style) {
                width = Some(w);
            } else if let Some(c) = Color::parse(token) {
                color = Some(c);
            }
        }
        if !visible {
            return (Some(0.0), color);
        }
        // A style keyword alone implies a medium border.
        (width.or(Some(2.25)), color)
    }

    fn apply_property(&self, s: &mut ComputedStyle, prop: &str, raw: &str) {
        let val = raw.trim();
        let lower = val.to_ascii_lowercase();
        match prop {
            "display" => match parse_display(&lower) {
                Some(d) => s.display = d,
                None => log::debug!("display '{val}' not supported"),
            },
            "flex-direction" => {
                if lower.starts_with("column") {
                    s.flex_direction = FlexDirection::Column;
                } else if lower.starts_with("row") {
                    s.flex_direction = FlexDirection::Row;
                }
            }
            "gap" | "column-gap" | "row-gap" => {
                if let Some(v) = val.split_whitespace().next().and_then(|v| self.length(v, s)) {
                    s.gap = v;
                }
            }
            "font-weight" => {
                s.font_weight = match lower.as_str() {
                    "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                    _ => FontWeight::Normal,
                }
            }
            "font-style" => {
                s.font_style = match lower.as_str() {
                    "italic" | "oblique" => FontStyle::Italic,
                    _ => FontStyle::Normal,
                }
            }
            "font-family" => {
                if let Some(f) = FontFamily::from_css(val) {
                    s.font_family = f;
                }
            }
            "color" => {
                if let Some(c) = Color::parse(val) {
                    s.color = c;
                }
            }
            "background-color" => {
                if let Some(c) = Color::parse(val) {
                    s.background_color = c;
                }
            }
            "background" => {
                if lower == "none" {
                    s.background_color = Color::TRANSPARENT;
                } else if let Some(c) = val.split_whitespace().find_map(Color::parse) {
                    s.background_color = c;
                }
            }
            "text-align" => {
                s.text_align = match lower.as_str() {
                    "center" => TextAlign::Center,
                    "right" | "end" => TextAlign::Right,
                    _ => TextAlign::Left,
                }
            }
            "text-decoration" | "text-decoration-line" => {
                s.text_decoration = if lower.contains("underline") {
                    TextDecoration::Underline
                } else if lower.contains("line-through") {
                    TextDecoration::LineThrough
                } else {
                    TextDecoration::None
                }
            }
            "line-height" => {
                if lower == "normal" {
                    s.line_height = 1.2;
                } else if let Ok(v) = lower.parse::<f32>() {
                    s.line_height = v;
                } else if let Some(Length::Percent(p)) = parse_length(val) {
                    s.line_height = p / 100.0;
                } else if let Some(pt) = self.length(val, s) {
                    s.line_height = pt / s.font_size;
                }
            }
            "white-space" => {
                s.white_space = if lower.starts_with("pre") {
                    WhiteSpace::Pre
                } else {
                    WhiteSpace::Normal
                }
            }
            "vertical-align" => {
                s.vertical_align = match lower.as_str() {
                    "super" | "top" | "text-top" => VerticalAlign::Super,
                    "sub" | "bottom" | "text-bottom" => VerticalAlign::Sub,
                    _ => VerticalAlign::Baseline,
                }
            }
            "list-style" | "list-style-type" => {
                if let Some(ls) = lower.split_whitespace().find_map(parse_list_style) {
                    s.list_style = ls;
                }
            }
            "width" => {
                if let Some(d) = self.dimension(val, s) {
                    s.width = d;
                }
            }
            "height" => {
                if let Some(d) = self.dimension(val, s) {
                    s.height = d;
                }
            }
            "max-width" => {
                if let Some(d) = self.dimension(val, s) {
                    s.max_width = d;
                }
            }
            "margin" => {
                if let Some(e) = self.edges(val, s) {
                    s.margin = e;
                }
            }
            "padding" => {
                if let Some(e) = self.edges(val, s) {
                    s.padding = e;
                }
            }
            "border" => {
                let (w, c) = self.border_shorthand(val, s);
                if let Some(w) = w {
                    s.border = Edges::all(w);
                }
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
            "border-width" => {
                let widths: Option<Vec<String>> = val
                    .split_whitespace()
                    .map(|t| self.border_width(t, s).map(|w| format!("{w}pt")))
                    .collect();
                if let Some(e) = widths.and_then(|w| self.edges(&w.join(" "), s)) {
                    s.border = e;
                }
            }
            "border-color" => {
                if let Some(c) = val.split_whitespace().find_map(Color::parse) {
                    s.border_color = c;
                }
            }
            "border-style" => {
                if matches!(lower.as_str(), "none" | "hidden") {
                    s.border = Edges::default();
                }
            }
            _ => {
                if let Some(side) = prop.strip_prefix("margin-") {
                    if let Some(v) = if lower == "auto" { Some(0.0) } else { self.length(val, s) } {
                        set_side(&mut s.margin, side, v);
                    }
                } else if let Some(side) = prop.strip_prefix("padding-") {
                    if let Some(v) = self.length(val, s) {
                        set_side(&mut s.padding, side, v);
                    }
                } else if let Some(rest) = prop.strip_prefix("border-") {
                    self.apply_border_side(s, rest, val);
                } else if let Some(b) = parse_page_break(prop, &lower) {
                    match b {
                        PageBreak::Before(v) => s.page_break_before = v,
                        PageBreak::After(v) => s.page_break_after = v,
                        PageBreak::InsideAvoid(v) => s.page_break_inside_avoid = v,
                    }
                } else {
                    log::debug!("CSS property '{prop}' ignored");
                }
            }
        }
    }

    /// `border-top`, `border-left-width`, `border-bottom-color`, …
    fn apply_border_side(&self, s: &mut ComputedStyle, rest: &str, val: &str) {
        let (side, what) = match rest.split_once('-') {
            Some((side, what)) => (side, what),
            None => (rest, ""),
        };
        if !matches!(side, "top" | "right" | "bottom" | "left") {
            log::debug!("CSS property 'border-{rest}' ignored");
            return;
        }
        match what {
            "" => {
                let (w, c) = self.border_shorthand(val, s);
                if let Some(w) = w {
                    set_side(&mut s.border, side, w);
                }
                if let Some(c) = c {
                    s.border_color = c;
                }
            }
            "width" => {
                if let Some(w) = self.border_width(val, s) {
                    set_side(&mut s.border, side, w);
                }
            }
            "color" => {
                if let Some(c) = Color::parse(val) {
                    s.border_color = c;
                }
            }
            "style" if matches!(val.trim(), "none" | "hidden") => set_side(&mut s.border, side, 0.0),
            _ => {}
        }
    }
}

fn set_side(edges: &mut Edges, side: &str, v: f32) {
    match side {
        "top" => edges.top = v,
        "right" => edges.right = v,
        "bottom" => edges.bottom = v,
        "left" => edges.left = v,
        _ => {}
    }
}

fn parse_display(v: &str) -> Option<Display> {
    Some(match v {
        "block" | "flow-root" => Display::Block,
        "flex" => Display::Flex,
        "inline" => Display::Inline,
        "inline-block" | "inline-flex" => Display::InlineBlock,
        "list-item" => Display::ListItem,
        "table" => Display::Table,
        "table-row-group" | "table-header-group" | "table-footer-group" => Display::TableRowGroup,
        "table-row" => Display::TableRow,
        "table-cell" => Display::TableCell,
        "none" => Display::None,
        _ => return None,
    })
}

fn parse_list_style(v: &str) -> Option<ListStyle> {
    Some(match v {
        "none" => ListStyle::None,
        "disc" => ListStyle::Disc,
        "circle" => ListStyle::Circle,
        "square" => ListStyle::Square,
        "decimal" => ListStyle::Decimal,
        "lower-alpha" | "lower-latin" => ListStyle::LowerAlpha,
        "upper-alpha" | "upper-latin" => ListStyle::UpperAlpha,
        _ => return None,
    })
}

enum PageBreak {
    Before(bool),
    After(bool),
    InsideAvoid(bool),
}

fn parse_page_break(prop: &str, val: &str) -> Option<PageBreak> {
    let forced = matches!(val, "always" | "page" | "left" | "right");
    match prop {
        "page-break-before" | "break-before" => Some(PageBreak::Before(forced)),
        "page-break-after" | "break-after" => Some(PageBreak::After(forced)),
        "page-break-inside" | "break-inside" => Some(PageBreak::InsideAvoid(val.starts_with("avoid"))),
        _ => None,
    }
}

/// Default styles based on tag semantics (a small user-agent sheet).
fn apply_tag_defaults(s: &mut ComputedStyle, element: &ElementNode) {
    let grey = |v: u8| Color::rgb(v, v, v);
    let em = s.font_size;
    match &element.tag {
        Tag::Heading(level) => {
            const SCALE: [f32; 6] = [2.0, 1.6, 1.35, 1.15, 1.0, 0.9];
            s.font_size = em * SCALE[(*level as usize).clamp(1, 6) - 1];
            s.font_weight = FontWeight::Bold;
            s.line_height = 1.25;
            s.margin.top = s.font_size * 0.6;
            s.margin.bottom = s.font_size * 0.4;
            s.page_break_inside_avoid = true;
        }
        Tag::P => {
            s.margin.bottom = em * 0.8;
        }
        Tag::Ul | Tag::Ol => {
            s.margin.bottom = em * 0.6;
            s.padding.left = 24.0;
            s.list_style = if element.tag == Tag::Ol {
                ListStyle::Decimal
            } else {
                ListStyle::Disc
            };
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin.bottom = em * 0.2;
        }
        Tag::Dl => s.margin.bottom = em * 0.6,
        Tag::Dt => s.font_weight = FontWeight::Bold,
        Tag::Dd => {
            s.padding.left = 24.0;
            s.margin.bottom = em * 0.3;
        }
        Tag::Table => {
            s.display = Display::Table;
            s.margin.bottom = em * 0.8;
        }
        Tag::TableSection => s.display = Display::TableRowGroup,
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding = Edges {
                top: 3.0,
                right: 6.0,
                bottom: 3.0,
                left: 6.0,
            };
            s.border = Edges::all(0.5);
            s.border_color = grey(160);
            if element.tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
                s.background_color = grey(237);
            }
            if let Some(align) = element.attr("align") {
                s.text_align = match align.to_ascii_lowercase().as_str() {
                    "center" => TextAlign::Center,
                    "right" => TextAlign::Right,
                    _ => TextAlign::Left,
                };
            }
        }
        Tag::Pre => {
            s.white_space = WhiteSpace::Pre;
            s.font_family = FontFamily::Mono;
            s.font_size = em * 0.9;
            s.line_height = 1.3;
            s.padding = Edges::all(6.0);
            s.margin.bottom = em * 0.8;
            s.background_color = Color::rgb(246, 248, 250);
        }
        Tag::Blockquote => {
            s.padding = Edges {
                top: 0.0,
                right: 0.0,
                bottom: 0.0,
                left: 10.0,
            };
            s.border.left = 3.0;
            s.border_color = grey(208);
            s.color = grey(90);
            s.margin.bottom = em * 0.8;
        }
        Tag::Hr => {
            s.border.top = 1.0;
            s.border_color = grey(200);
            s.margin.top = em * 0.5;
            s.margin.bottom = em * 0.8;
        }
        Tag::Img | Tag::Input => s.display = Display::InlineBlock,
        Tag::Br => s.display = Display::Inline,
        Tag::Inline(name) => {
            s.display = Display::Inline;
            match name.as_str() {
                "strong" | "b" => s.font_weight = FontWeight::Bold,
                "em" | "i" | "cite" | "var" => s.font_style = FontStyle::Italic,
                "u" => s.text_decoration = TextDecoration::Underline,
                "del" | "s" => s.text_decoration = TextDecoration::LineThrough,
                "a" => {
                    s.color = Color::rgb(3, 102, 214);
                    s.text_decoration = TextDecoration::Underline;
                }
                "code" | "kbd" | "samp" => {
                    s.font_family = FontFamily::Mono;
                    // Inside <pre> the block already set the code size.
                    if s.white_space == WhiteSpace::Normal {
                        s.font_size = em * 0.9;
                    }
                }
                "sup" => {
                    s.vertical_align = VerticalAlign::Super;
                    s.font_size = em * 0.75;
                }
                "sub" => {
                    s.vertical_align = VerticalAlign::Sub;
                    s.font_size = em * 0.75;
                }
                "small" => s.font_size = em * 0.85,
                _ => {}
            }
        }
        Tag::Head | Tag::Style | Tag::Metadata(_) => s.display = Display::None,
        Tag::Html | Tag::Body | Tag::Div | Tag::Unknown(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (for images src, etc.)
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
///
/// Elements computing to `display: none` are dropped with their subtrees.
pub fn build_styled_tree(nodes: &[DomNode], sheets: &[Stylesheet]) -> Vec<StyledNode> {
    let mut resolver = StyleResolver::new(sheets);
    let mut ancestors = Vec::new();
    build_children(&mut resolver, nodes, &mut ancestors, None)
}

fn build_children<'d>(
    resolver: &mut StyleResolver<'_>,
    nodes: &'d [DomNode],
    ancestors: &mut Vec<&'d ElementNode>,
    parent_style: Option<&ComputedStyle>,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolver.resolve(e, ancestors, parent_style);
                if e.tag == Tag::Html {
                    resolver.root_font_size = style.font_size;
                }
                if style.display == Display::None {
                    continue;
                }
                ancestors.push(e);
                let children = build_children(resolver, &e.children, ancestors, Some(&style));
                ancestors.pop();
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) if !text.is_empty() => {
                let mut style = parent_style.cloned().unwrap_or_default();
                // Text nodes are inline: no box-model properties
                // that must not be inherited (border, background, spacing).
                style.display = Display::Inline;
                style.border = Edges::default();
                style.background_color = Color::TRANSPARENT;
                style.margin = Edges::default();
                style.padding = Edges::default();
                style.width = Dimension::Auto;
                style.height = Dimension::Auto;
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style,
                });
            }
            DomNode::Text(_) => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn styled(html: &str, css: &str) -> Vec<StyledNode> {
        let sheets = vec![Stylesheet::parse("t.css", css).unwrap()];
        build_styled_tree(&parse_html(html), &sheets)
    }

    fn first_style(nodes: &[StyledNode]) -> &ComputedStyle {
        nodes.first().expect("no nodes").style()
    }

    fn child(node: &StyledNode, idx: usize) -> &StyledNode {
        match node {
            StyledNode::Element { children, .. } => &children[idx],
            StyledNode::Text { .. } => panic!("text has no children"),
        }
    }

    #[test]
    fn inline_style_font_size() {
        let nodes = styled(r#"<p style="font-size: 24pt; color: #ff0000">x</p>"#, "");
        let s = first_style(&nodes);
        assert_eq!(s.font_size, 24.0);
        assert!((s.color.r - 1.0).abs() < 0.01);
    }

    #[test]
    fn specificity_beats_order() {
        let nodes = styled(
            r#"<p class="note">x</p>"#,
            "p.note { color: #00ff00 } p { color: #0000ff }",
        );
        assert_eq!(first_style(&nodes).color, Color::rgb(0, 255, 0));
    }

    #[test]
    fn later_rule_wins_ties() {
        let nodes = styled("<p>x</p>", "p { color: red } p { color: blue }");
        assert_eq!(first_style(&nodes).color, Color::rgb(0, 0, 255));
    }

    #[test]
    fn later_sheet_wins_ties() {
        let sheets = vec![
            Stylesheet::parse("embedded", "h1 { color: red }").unwrap(),
            Stylesheet::parse("external", "h1 { color: blue }").unwrap(),
        ];
        let nodes = build_styled_tree(&parse_html("<h1>T</h1>"), &sheets);
        assert_eq!(first_style(&nodes).color, Color::rgb(0, 0, 255));
    }

    #[test]
    fn important_beats_inline() {
        let nodes = styled(
            r#"<p style="color: blue">x</p>"#,
            "p { color: red !important }",
        );
        assert_eq!(first_style(&nodes).color, Color::rgb(255, 0, 0));
        let nodes = styled(r#"<p style="color: blue">x</p>"#, "p { color: red }");
        assert_eq!(first_style(&nodes).color, Color::rgb(0, 0, 255));
    }

    #[test]
    fn text_properties_inherit() {
        let nodes = styled(
            "<body><div><p>text</p></div></body>",
            "body { font-family: Georgia, serif; color: #333333; font-size: 12pt }",
        );
        let p = child(child(&nodes[0], 0), 0);
        assert_eq!(p.style().font_family, FontFamily::Serif);
        assert_eq!(p.style().font_size, 12.0);
        assert_eq!(p.style().color, Color::rgb(0x33, 0x33, 0x33));
        // Box properties do not inherit.
        assert_eq!(p.style().margin.top, 0.0);
    }

    #[test]
    fn em_units_follow_font_size() {
        let nodes = styled(
            "<div><p>x</p></div>",
            "div { font-size: 10pt } p { font-size: 2em; margin: 1em 0 }",
        );
        let p = child(&nodes[0], 0).style();
        assert_eq!(p.font_size, 20.0);
        assert_eq!(p.margin.top, 20.0);
        assert_eq!(p.margin.left, 0.0);
    }

    #[test]
    fn display_none_drops_subtree() {
        let nodes = styled(
            "<div><p class=\"hide\">x</p><p>y</p></div>",
            ".hide { display: none }",
        );
        match &nodes[0] {
            StyledNode::Element { children, .. } => assert_eq!(children.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn head_and_style_are_not_rendered() {
        let nodes = styled("<head><title>T</title></head><style>p{}</style><p>x</p>", "");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn heading_and_code_defaults() {
        let nodes = styled("<h1>T</h1><pre><code>x</code></pre>", "");
        let h1 = first_style(&nodes);
        assert_eq!(h1.font_weight, FontWeight::Bold);
        assert_eq!(h1.font_size, DEFAULT_FONT_SIZE * 2.0);
        let pre = nodes[1].style();
        assert_eq!(pre.white_space, WhiteSpace::Pre);
        assert_eq!(pre.font_family, FontFamily::Mono);
        assert_eq!(child(&nodes[1], 0).style().font_size, pre.font_size);
    }

    #[test]
    fn descendant_selectors_reach_highlight_spans() {
        let nodes = styled(
            r#"<pre class="highlight code"><code><span class="keyword">fn</span></code></pre>"#,
            ".code .keyword { color: #a71d5d; font-weight: bold }",
        );
        let span = child(child(&nodes[0], 0), 0).style();
        assert_eq!(span.color, Color::rgb(0xa7, 0x1d, 0x5d));
        assert_eq!(span.font_weight, FontWeight::Bold);
    }

    #[test]
    fn border_shorthands() {
        let nodes = styled(
            "<h2>T</h2><div>x</div>",
            "h2 { border-bottom: 1px solid #eee } div { border: 2pt solid red; border-left: none }",
        );
        let h2 = first_style(&nodes);
        assert_eq!(h2.border.bottom, 0.75);
        assert_eq!(h2.border.top, 0.0);
        let div = nodes[1].style();
        assert_eq!(div.border.top, 2.0);
        assert_eq!(div.border.left, 0.0);
        assert_eq!(div.border_color, Color::rgb(255, 0, 0));
    }

    #[test]
    fn page_break_properties() {
        let nodes = styled(
            "<h1>a</h1>",
            "h1 { page-break-before: always; break-after: page; break-inside: auto }",
        );
        let s = first_style(&nodes);
        assert!(s.page_break_before && s.page_break_after);
        assert!(!s.page_break_inside_avoid);
    }

    #[test]
    fn list_markers() {
        assert_eq!(ListStyle::Decimal.marker(3).as_deref(), Some("3."));
        assert_eq!(ListStyle::LowerAlpha.marker(2).as_deref(), Some("b."));
        assert_eq!(ListStyle::None.marker(1), None);
    }
}
