//! Stylesheet parser and selector matching.
//!
//! Supports the subset of CSS that document stylesheets actually use:
//! rule sets with type, class, id and universal selectors (compound and
//! descendant), `!important`, `@media print`/`@media all`, and `@page` for
//! page geometry. Selectors outside that subset parse but never match, the
//! way a browser ignores what it does not understand. Structural damage
//! (unterminated comment or block, stray braces, empty selectors) is an
//! error with a line number.

use std::fmt;

use crate::dom::ElementNode;

/// Points per CSS pixel.
pub const PT_PER_PX: f32 = 0.75;

/// Parse failure with the 1-based line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CssError {}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    /// File name or label the sheet came from, for diagnostics.
    pub origin: String,
    pub rules: Vec<Rule>,
    /// Merged `@page` declarations.
    pub page: PageRule,
}

/// One selector with its declaration block. Rule sets with a selector list
/// are split into one `Rule` per selector.
#[derive(Debug, Clone)]
pub struct Rule {
    /// `None` when the selector uses syntax the engine does not support.
    pub selector: Option<Selector>,
    pub declarations: Vec<Declaration>,
    /// Position in the sheet, for source-order tie breaking.
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Lower-case property name.
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// Page geometry set by `@page`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageRule {
    /// `(width, height)` in points.
    pub size: Option<(f32, f32)>,
    /// Uniform margin in points.
    pub margin: Option<f32>,
}

/// A chain of compound selectors joined by descendant combinators. The last
/// compound is the subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// `(ids, classes, types)`.
pub type Specificity = (u32, u32, u32);

impl Selector {
    pub fn parse(text: &str) -> Option<Self> {
        let mut compounds = Vec::new();
        for part in text.split(|c: char| c.is_whitespace() || c == '>') {
            if part.is_empty() {
                continue;
            }
            compounds.push(Compound::parse(part)?);
        }
        if compounds.is_empty() {
            return None;
        }
        Some(Self { compounds })
    }

    pub fn specificity(&self) -> Specificity {
        self.compounds.iter().fold((0, 0, 0), |(a, b, c), comp| {
            (
                a + comp.id.is_some() as u32,
                b + comp.classes.len() as u32,
                c + comp.tag.is_some() as u32,
            )
        })
    }

    /// Does the selector match `element`, whose ancestors are listed
    /// outermost first?
    pub fn matches(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        let Some((subject, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(element) {
            return false;
        }
        // Greedy right-to-left walk is exact for descendant-only chains.
        let mut remaining = rest.iter().rev().peekable();
        for ancestor in ancestors.iter().rev() {
            match remaining.peek() {
                Some(comp) if comp.matches(ancestor) => {
                    remaining.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        remaining.peek().is_none()
    }
}

impl Compound {
    fn parse(text: &str) -> Option<Self> {
        let mut comp = Compound::default();
        let mut chars = text.char_indices().peekable();
        // Leading type or universal selector
        match chars.peek() {
            Some((_, '*')) => {
                chars.next();
            }
            Some((_, c)) if is_ident_char(*c) => {
                let name = take_ident(text, &mut chars);
                comp.tag = Some(name.to_ascii_lowercase());
            }
            _ => {}
        }
        while let Some((_, c)) = chars.next() {
            let name = take_ident(text, &mut chars);
            if name.is_empty() {
                return None;
            }
            match c {
                '.' => comp.classes.push(name),
                '#' => comp.id = Some(name),
                // Pseudo-classes, attribute selectors, sibling combinators.
                _ => return None,
            }
        }
        Some(comp)
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != element.tag.name() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        let classes = element.classes();
        self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(
    text: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> String {
    let start = match chars.peek() {
        Some((i, _)) => *i,
        None => return String::new(),
    };
    let mut end = start;
    while let Some((i, c)) = chars.peek() {
        if !is_ident_char(*c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    text[start..end].to_string()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

impl Stylesheet {
    /// Parse `source`; `origin` names the sheet in diagnostics.
    pub fn parse(origin: impl Into<String>, source: &str) -> Result<Self, CssError> {
        let text = strip_comments(source)?;
        let mut sheet = Stylesheet {
            origin: origin.into(),
            ..Stylesheet::default()
        };
        let mut parser = CssParser {
            text: &text,
            pos: 0,
        };
        parser.parse_rule_list(&mut sheet, None)?;
        log::debug!(
            "stylesheet '{}': {} rules",
            sheet.origin,
            sheet.rules.len()
        );
        Ok(sheet)
    }
}

/// Replace comments by spaces, keeping newlines so line numbers stay exact.
fn strip_comments(source: &str) -> Result<String, CssError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut line = 1;
    while let Some(start) = rest.find("/*") {
        let before = &rest[..start];
        line += before.matches('\n').count();
        out.push_str(before);
        let after = &rest[start + 2..];
        let Some(end) = after.find("*/") else {
            return Err(CssError {
                line,
                message: "unterminated comment".into(),
            });
        };
        let comment = &after[..end];
        out.push_str("  ");
        for c in comment.chars() {
            out.push(if c == '\n' { '\n' } else { ' ' });
        }
        out.push_str("  ");
        line += comment.matches('\n').count();
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

struct CssParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> CssParser<'a> {
    fn line_at(&self, pos: usize) -> usize {
        self.text[..pos.min(self.text.len())].matches('\n').count() + 1
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> CssError {
        CssError {
            line: self.line_at(pos),
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Parse rule sets and at-rules until end of input, or until the `}`
    /// closing the block opened at `open` when nested.
    fn parse_rule_list(&mut self, sheet: &mut Stylesheet, open: Option<usize>) -> Result<(), CssError> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return match open {
                    Some(at) => Err(self.error(at, "unterminated block")),
                    None => Ok(()),
                };
            }
            if rest.starts_with('}') {
                if open.is_some() {
                    self.pos += 1;
                    return Ok(());
                }
                return Err(self.error(self.pos, "unexpected '}'"));
            }
            if rest.starts_with('@') {
                self.parse_at_rule(sheet)?;
            } else {
                self.parse_rule_set(sheet)?;
            }
        }
    }

    fn parse_rule_set(&mut self, sheet: &mut Stylesheet) -> Result<(), CssError> {
        let start = self.pos;
        let rest = self.rest();
        let brace = rest.find(['{', '}', ';']);
        let Some(idx) = brace.filter(|&i| rest[i..].starts_with('{')) else {
            return Err(self.error(start, "expected '{' after selector"));
        };
        let selector_text = &rest[..idx];
        self.pos += idx + 1;
        let declarations = self.parse_declaration_block(self.pos - 1)?;

        for part in selector_text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(self.error(start, "empty selector"));
            }
            let selector = Selector::parse(part);
            if selector.is_none() {
                log::debug!("unsupported selector '{part}' in '{}' ignored", sheet.origin);
            }
            sheet.rules.push(Rule {
                selector,
                declarations: declarations.clone(),
                order: sheet.rules.len(),
            });
        }
        Ok(())
    }

    /// Parse declarations after an opening `{` at `open` up to its `}`.
    fn parse_declaration_block(&mut self, open: usize) -> Result<Vec<Declaration>, CssError> {
        let rest = self.rest();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut end = None;
        for (i, c) in rest.char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '(') => depth += 1,
                (None, ')') => depth = depth.saturating_sub(1),
                (None, '{') => return Err(self.error(self.pos + i, "unexpected '{' in declaration block")),
                (None, '}') if depth == 0 => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            return Err(self.error(open, "unterminated block"));
        };
        let body = &rest[..end];
        self.pos += end + 1;
        Ok(parse_declarations(body))
    }

    fn parse_at_rule(&mut self, sheet: &mut Stylesheet) -> Result<(), CssError> {
        let start = self.pos;
        let rest = self.rest();
        let name_len = rest[1..]
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len() - 1);
        let name = rest[1..1 + name_len].to_ascii_lowercase();

        let Some(idx) = rest.find(['{', ';', '}']) else {
            return Err(self.error(start, format!("unterminated @{name} rule")));
        };
        let prelude = rest[1 + name_len..idx].trim().to_ascii_lowercase();
        match &rest[idx..idx + 1] {
            ";" => {
                log::debug!("@{name} ignored");
                self.pos += idx + 1;
                Ok(())
            }
            "}" => Err(self.error(start + idx, "unexpected '}'")),
            _ => {
                let open = start + idx;
                self.pos = open + 1;
                match name.as_str() {
                    "media" if media_applies(&prelude) => {
                        self.parse_rule_list(sheet, Some(open))
                    }
                    "page" => {
                        let decls = self.parse_declaration_block(open)?;
                        apply_page_declarations(&mut sheet.page, &decls);
                        Ok(())
                    }
                    _ => {
                        log::debug!("@{name} {prelude} skipped");
                        self.skip_block(open)
                    }
                }
            }
        }
    }

    /// Skip to the `}` balancing the `{` at `open`.
    fn skip_block(&mut self, open: usize) -> Result<(), CssError> {
        let mut depth = 1usize;
        for (i, c) in self.rest().char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += i + 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error(open, "unterminated block"))
    }
}

fn media_applies(query: &str) -> bool {
    query.is_empty()
        || query
            .split(',')
            .any(|q| matches!(q.split_whitespace().next(), Some("print" | "all")))
}

/// Split a declaration block body into declarations. Entries without a
/// colon are dropped.
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    split_top_level(body, ';')
        .into_iter()
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let property = prop.trim().to_ascii_lowercase();
            let mut value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            let mut important = false;
            if let Some(bang) = value.rfind('!') {
                if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
                    important = true;
                    value = value[..bang].trim_end();
                }
            }
            Some(Declaration {
                property,
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

/// Split on `sep` outside quotes and parentheses.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn apply_page_declarations(page: &mut PageRule, decls: &[Declaration]) {
    for decl in decls {
        match decl.property.as_str() {
            "size" => match parse_page_size(&decl.value) {
                Some(size) => page.size = Some(size),
                None => log::warn!("@page size '{}' not understood", decl.value),
            },
            "margin" => {
                // A single margin applies to every side; with several, the
                // largest keeps content clear of every edge.
                let values: Vec<f32> = decl
                    .value
                    .split_whitespace()
                    .filter_map(|v| parse_length(v).and_then(|l| l.to_pt(0.0, 0.0)))
                    .collect();
                match values.into_iter().reduce(f32::max) {
                    Some(m) => page.margin = Some(m),
                    None => log::warn!("@page margin '{}' not understood", decl.value),
                }
            }
            other => log::debug!("@page property '{other}' ignored"),
        }
    }
}

fn parse_page_size(value: &str) -> Option<(f32, f32)> {
    let words: Vec<String> = value
        .split_whitespace()
        .map(|w| w.to_ascii_lowercase())
        .collect();
    let mut size: Option<(f32, f32)> = None;
    let mut landscape = false;
    let mut lengths = Vec::new();
    for word in &words {
        match word.as_str() {
            "landscape" => landscape = true,
            "portrait" | "auto" => {}
            "a4" => size = Some((595.28, 841.89)),
            "a5" => size = Some((419.53, 595.28)),
            "letter" => size = Some((612.0, 792.0)),
            "legal" => size = Some((612.0, 1008.0)),
            other => lengths.push(parse_length(other)?.to_pt(0.0, 0.0)?),
        }
    }
    let (w, h) = match (size, lengths.as_slice()) {
        (Some(s), []) => s,
        (None, [side]) => (*side, *side),
        (None, [w, h]) => (*w, *h),
        (None, []) if landscape => (595.28, 841.89),
        _ => return None,
    };
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(if landscape { (w.max(h), w.min(h)) } else { (w, h) })
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A CSS length before resolution against font sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Pt(f32),
    Em(f32),
    Rem(f32),
    Percent(f32),
}

impl Length {
    /// Resolve to points. Percentages have no font-relative meaning and
    /// yield `None`.
    pub fn to_pt(self, em: f32, rem: f32) -> Option<f32> {
        match self {
            Length::Pt(v) => Some(v),
            Length::Em(v) => Some(v * em),
            Length::Rem(v) => Some(v * rem),
            Length::Percent(_) => None,
        }
    }
}

pub fn parse_length(value: &str) -> Option<Length> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(Length::Pt(0.0));
    }
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let (num, unit) = v.split_at(split);
    let n: f32 = num.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    Some(match unit {
        "px" => Length::Pt(n * PT_PER_PX),
        "pt" => Length::Pt(n),
        "pc" => Length::Pt(n * 12.0),
        "in" => Length::Pt(n * 72.0),
        "cm" => Length::Pt(n * 72.0 / 2.54),
        "mm" => Length::Pt(n * 72.0 / 25.4),
        "em" => Length::Em(n),
        "rem" => Length::Rem(n),
        "%" => Length::Percent(n),
        // Unitless non-zero lengths are invalid CSS; treat as pixels.
        "" => Length::Pt(n * PT_PER_PX),
        _ => return None,
    })
}

/// RGBA colour, channels in 0.0 – 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
        let (r, g, b, a) = match hex.len() {
            3 => (expand(0)?, expand(1)?, expand(2)?, 255),
            4 => (expand(0)?, expand(1)?, expand(2)?, expand(3)?),
            6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255),
            8 => (
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            ),
            _ => return None,
        };
        Some(Self {
            a: a as f32 / 255.0,
            ..Self::rgb(r, g, b)
        })
    }

    /// Parse `#hex`, `rgb()`, `rgba()`, `transparent`, or a colour name.
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with('#') {
            return Self::from_hex(&v);
        }
        if let Some(args) = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))
            .and_then(|s| s.strip_suffix(')'))
        {
            let parts: Vec<&str> = args
                .split([',', '/', ' '])
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 || parts.len() > 4 {
                return None;
            }
            let channel = |p: &str| -> Option<f32> {
                match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok().map(|x| x / 100.0),
                    None => p.parse::<f32>().ok().map(|x| x / 255.0),
                }
            };
            let alpha = match parts.get(3) {
                Some(p) => match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                    None => p.parse::<f32>().ok()?,
                },
                None => 1.0,
            };
            return Some(Self {
                r: channel(parts[0])?.clamp(0.0, 1.0),
                g: channel(parts[1])?.clamp(0.0, 1.0),
                b: channel(parts[2])?.clamp(0.0, 1.0),
                a: alpha.clamp(0.0, 1.0),
            });
        }
        named_color(&v)
    }
}

fn named_color(name: &str) -> Option<Color> {
    let c = match name {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => Color::rgb(0, 0, 0),
        "white" => Color::rgb(255, 255, 255),
        "red" => Color::rgb(255, 0, 0),
        "green" => Color::rgb(0, 128, 0),
        "blue" => Color::rgb(0, 0, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "silver" => Color::rgb(192, 192, 192),
        "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
        "darkgray" | "darkgrey" => Color::rgb(169, 169, 169),
        "dimgray" | "dimgrey" => Color::rgb(105, 105, 105),
        "whitesmoke" => Color::rgb(245, 245, 245),
        "gainsboro" => Color::rgb(220, 220, 220),
        "navy" => Color::rgb(0, 0, 128),
        "teal" => Color::rgb(0, 128, 128),
        "maroon" => Color::rgb(128, 0, 0),
        "olive" => Color::rgb(128, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "aqua" | "cyan" => Color::rgb(0, 255, 255),
        "fuchsia" | "magenta" => Color::rgb(255, 0, 255),
        "darkblue" => Color::rgb(0, 0, 139),
        "darkred" => Color::rgb(139, 0, 0),
        "darkgreen" => Color::rgb(0, 100, 0),
        "steelblue" => Color::rgb(70, 130, 180),
        "slategray" | "slategrey" => Color::rgb(112, 128, 144),
        "crimson" => Color::rgb(220, 20, 60),
        "brown" => Color::rgb(165, 42, 42),
        "pink" => Color::rgb(255, 192, 203),
        "gold" => Color::rgb(255, 215, 0),
        "beige" => Color::rgb(245, 245, 220),
        "ivory" => Color::rgb(255, 255, 240),
        "lavender" => Color::rgb(230, 230, 250),
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, DomNode};

    fn sheet(css: &str) -> Stylesheet {
        Stylesheet::parse("test.css", css).unwrap()
    }

    fn element(html: &str) -> ElementNode {
        match parse_html(html).into_iter().next() {
            Some(DomNode::Element(e)) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn parses_rules_and_declarations() {
        let s = sheet("h1 { color: #ff0000; font-size: 20px !important }\np{margin:0}");
        assert_eq!(s.rules.len(), 2);
        let decls = &s.rules[0].declarations;
        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[0].value, "#ff0000");
        assert!(!decls[0].important);
        assert_eq!(decls[1].value, "20px");
        assert!(decls[1].important);
    }

    #[test]
    fn selector_lists_split_into_rules() {
        let s = sheet("h1, h2 , .title { font-weight: bold; }");
        assert_eq!(s.rules.len(), 3);
        assert_eq!(s.rules[2].order, 2);
    }

    #[test]
    fn comments_keep_line_numbers() {
        let err = Stylesheet::parse("x.css", "/* one\n two */\np { color: red; }\n}").unwrap_err();
        assert_eq!(err.line, 4);
    }

    #[test]
    fn structural_errors_are_reported() {
        for (css, line) in [
            ("/* never closed", 1),
            ("p { color: red;", 1),
            ("a {}\n\np color: red; }", 3),
            ("h1, { color: red }", 1),
            ("}", 1),
            ("@media print {\n p { color: red }", 1),
        ] {
            let err = Stylesheet::parse("bad.css", css).unwrap_err();
            assert_eq!(err.line, line, "css {css:?} gave {err}");
        }
    }

    #[test]
    fn media_print_applies_screen_skipped() {
        let s = sheet("@media screen { p { color: red } } @media print { p { color: blue } }");
        assert_eq!(s.rules.len(), 1);
        assert_eq!(s.rules[0].declarations[0].value, "blue");
    }

    #[test]
    fn other_at_rules_are_skipped() {
        let s = sheet("@charset \"utf-8\";\n@font-face { font-family: X; src: url(x.ttf) }\np { color: red }");
        assert_eq!(s.rules.len(), 1);
    }

    #[test]
    fn page_rule_sets_geometry() {
        let s = sheet("@page { size: letter landscape; margin: 1in }");
        assert_eq!(s.page.size, Some((792.0, 612.0)));
        assert_eq!(s.page.margin, Some(72.0));

        let s = sheet("@page { size: 210mm 297mm; margin: 10mm 20mm }");
        let (w, h) = s.page.size.unwrap();
        assert!((w - 595.28).abs() < 0.1 && (h - 841.89).abs() < 0.1);
        assert!((s.page.margin.unwrap() - 56.69).abs() < 0.1);
    }

    #[test]
    fn data_uri_semicolons_stay_in_value() {
        let s = sheet("p { background: url(data:image/png;base64,AAAA); color: red }");
        assert_eq!(s.rules[0].declarations.len(), 2);
    }

    #[test]
    fn selector_matching() {
        let code = element(r#"<code class="language-rust k" id="c1">x</code>"#);
        let pre = element(r#"<pre class="highlight code"></pre>"#);
        let body = element("<body></body>");

        let matches = |sel: &str, ancestors: &[&ElementNode]| {
            Selector::parse(sel).unwrap().matches(&code, ancestors)
        };
        assert!(matches("code", &[]));
        assert!(matches("*", &[]));
        assert!(matches(".k", &[]));
        assert!(matches("code.k.language-rust#c1", &[]));
        assert!(!matches("code.missing", &[]));
        assert!(matches("pre.highlight code", &[&body, &pre]));
        assert!(matches("body > pre .k", &[&body, &pre]));
        assert!(!matches("pre.highlight code", &[&body]));
        assert!(!matches("table code", &[&body, &pre]));
    }

    #[test]
    fn unsupported_selectors_never_match() {
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("input[type=checkbox]").is_none());
        assert!(Selector::parse("h1 + p").is_none());
        let s = sheet("a:hover { color: red }");
        assert!(s.rules[0].selector.is_none());
    }

    #[test]
    fn specificity_counts() {
        let spec = |s: &str| Selector::parse(s).unwrap().specificity();
        assert_eq!(spec("p"), (0, 0, 1));
        assert_eq!(spec(".a.b"), (0, 2, 0));
        assert_eq!(spec("#x p.y"), (1, 1, 1));
    }

    #[test]
    fn lengths() {
        assert_eq!(parse_length("12pt"), Some(Length::Pt(12.0)));
        assert_eq!(parse_length("16px"), Some(Length::Pt(12.0)));
        assert_eq!(parse_length("1.5em"), Some(Length::Em(1.5)));
        assert_eq!(parse_length("2rem"), Some(Length::Rem(2.0)));
        assert_eq!(parse_length("50%"), Some(Length::Percent(50.0)));
        assert_eq!(parse_length("1in"), Some(Length::Pt(72.0)));
        assert_eq!(parse_length("auto"), None);
    }

    #[test]
    fn colors() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::rgb(255, 0, 0)));
        let c = Color::parse("rgba(0,0,0,0.5)").unwrap();
        assert!((c.a - 0.5).abs() < 1e-6);
        assert_eq!(Color::parse("Navy"), Some(Color::rgb(0, 0, 128)));
        assert!(Color::parse("transparent").unwrap().is_transparent());
        assert_eq!(Color::parse("#12"), None);
    }
}
