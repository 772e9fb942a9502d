//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! The supported subset is what Markdown renderers and hand-written document
//! templates produce: headings, paragraphs, lists, tables, code blocks,
//! quotes, rules, images and the usual inline phrasing elements. Anything
//! else is kept and laid out as a generic block.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element, grouped by how the engine treats it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    /// `<style>`: its text is collected as an embedded stylesheet.
    Style,
    /// Not rendered: `title`, `meta`, `link`, `script`, `template`.
    Metadata(String),
    Div,
    P,
    /// `h1` … `h6`.
    Heading(u8),
    Ul,
    Ol,
    Li,
    Dl,
    Dt,
    Dd,
    Table,
    /// `thead`, `tbody`, `tfoot`.
    TableSection,
    Tr,
    Td,
    Th,
    Pre,
    Blockquote,
    Hr,
    Br,
    Img,
    /// `<input>` (task-list checkboxes).
    Input,
    /// Phrasing elements: `span strong b em i u a code del s sup sub small
    /// mark kbd abbr cite q`.
    Inline(String),
    /// Unrecognised elements; laid out as blocks.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "style" => Tag::Style,
            "title" | "meta" | "link" | "script" | "template" | "noscript" => {
                Tag::Metadata(lower)
            }
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "dl" => Tag::Dl,
            "dt" => Tag::Dt,
            "dd" => Tag::Dd,
            "table" => Tag::Table,
            "thead" | "tbody" | "tfoot" => Tag::TableSection,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "pre" => Tag::Pre,
            "blockquote" => Tag::Blockquote,
            "hr" => Tag::Hr,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "input" => Tag::Input,
            "span" | "strong" | "b" | "em" | "i" | "u" | "a" | "code" | "del" | "s" | "sup"
            | "sub" | "small" | "mark" | "kbd" | "abbr" | "cite" | "q" | "var" | "samp" => {
                Tag::Inline(lower)
            }
            _ => Tag::Unknown(lower),
        }
    }

    /// Lower-case element name, as matched by CSS type selectors.
    pub fn name(&self) -> String {
        match self {
            Tag::Html => "html".into(),
            Tag::Head => "head".into(),
            Tag::Body => "body".into(),
            Tag::Style => "style".into(),
            Tag::Metadata(n) | Tag::Inline(n) | Tag::Unknown(n) => n.clone(),
            Tag::Div => "div".into(),
            Tag::P => "p".into(),
            Tag::Heading(level) => format!("h{level}"),
            Tag::Ul => "ul".into(),
            Tag::Ol => "ol".into(),
            Tag::Li => "li".into(),
            Tag::Dl => "dl".into(),
            Tag::Dt => "dt".into(),
            Tag::Dd => "dd".into(),
            Tag::Table => "table".into(),
            Tag::TableSection => "tbody".into(),
            Tag::Tr => "tr".into(),
            Tag::Td => "td".into(),
            Tag::Th => "th".into(),
            Tag::Pre => "pre".into(),
            Tag::Blockquote => "blockquote".into(),
            Tag::Hr => "hr".into(),
            Tag::Br => "br".into(),
            Tag::Img => "img".into(),
            Tag::Input => "input".into(),
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        match self {
            Tag::Br | Tag::Hr | Tag::Img | Tag::Input => true,
            Tag::Metadata(n) | Tag::Unknown(n) => {
                matches!(n.as_str(), "meta" | "link" | "wbr" | "col" | "source")
            }
            _ => false,
        }
    }

    /// Elements whose content is raw text up to the matching close tag.
    fn is_raw_text(&self) -> bool {
        match self {
            Tag::Style => true,
            Tag::Metadata(n) => n == "script",
            _ => false,
        }
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(|s| s.as_str())
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// Text is kept verbatim, whitespace included; collapsing it is up to the
/// layout. Stray close tags end the current element, unclosed elements are
/// closed at end of input, and comments and doctypes are skipped.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    let mut nodes = parser.parse_nodes();
    // A close tag with no open element stops `parse_nodes`; drop it and go on.
    while !parser.eof() {
        parser.skip_past(">");
        nodes.extend(parser.parse_nodes());
    }
    nodes
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Doctype / processing instruction
            self.skip_past(">");
            return None;
        }
        let next_is_name = self.input[self.pos..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_alphabetic());
        if self.starts_with("<") && next_is_name {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A '<' that does not open a tag is literal text.
        if self.starts_with("<") {
            self.advance_char();
        }
        while !self.eof() && !self.starts_with("<") {
            self.advance_char();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance_char(); // '<'
        let tag_name = self.parse_name();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            match self.parse_attribute() {
                Some((key, value)) => {
                    elem.attributes.insert(key, value);
                }
                // Junk inside the tag; skip one character to make progress.
                None => self.advance_char(),
            }
        }

        let explicitly_closed = self.starts_with("/>");
        if explicitly_closed {
            self.advance(2);
        } else if self.starts_with(">") {
            self.advance_char();
        }
        if explicitly_closed || tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            let text = self.take_raw_text(&tag_name);
            if !text.is_empty() {
                elem.children.push(DomNode::Text(text));
            }
            return DomNode::Element(elem);
        }

        // A newline right after <pre> is not part of the content.
        if tag == Tag::Pre {
            if self.starts_with("\r\n") {
                self.advance(2);
            } else if self.starts_with("\n") {
                self.advance_char();
            }
        }
        elem.children = self.parse_nodes();

        // Consume closing tag
        if self.starts_with("</") {
            self.advance(2);
            self.parse_name();
            self.skip_past(">");
        }

        DomNode::Element(elem)
    }

    /// Consume everything up to `</name>` (case-insensitive) and return it.
    fn take_raw_text(&mut self, name: &str) -> String {
        let close = format!("</{}", name.to_ascii_lowercase());
        let rest = &self.input[self.pos..];
        let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
        let text = rest[..end].to_string();
        self.pos += end;
        if !self.eof() {
            self.skip_past(">");
        }
        text
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> Option<(String, String)> {
        let key = self.parse_name().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        self.skip_whitespace();
        if !self.starts_with("=") {
            return Some((key, String::new()));
        }
        self.advance_char(); // '='
        self.skip_whitespace();
        Some((key, self.parse_attr_value()))
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance_char();
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance_char();
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.advance_char();
                }
                return val;
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            if c == '/' && self.input[self.pos..].starts_with("/>") {
                break;
            }
            self.advance_char();
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance_char();
        }
    }

    /// Advance past the next occurrence of `marker`, or to end of input.
    fn skip_past(&mut self, marker: &str) {
        match self.input[self.pos..].find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.input[self.pos..].chars().next() {
            self.pos += c.len_utf8();
        }
    }

    /// Advance by `n` ASCII bytes.
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }
}

/// Decode the named entities Markdown renderers emit plus numeric
/// references. Unknown entities are left as written.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').filter(|&end| end <= 10).and_then(|end| {
            let name = &after[..end];
            decode_entity(name).map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "bull" => '\u{2022}',
        "euro" => '\u{20AC}',
        _ => return None,
    };
    Some(c)
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Collect the text of every `<style>` element in document order, wherever it
/// appears (head, body, or a bare fragment).
pub fn collect_style_blocks(nodes: &[DomNode]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                let media = e.attr("media").unwrap_or("all").to_ascii_lowercase();
                if media.contains("all") || media.contains("print") {
                    out.push(e.text_content());
                }
            } else {
                out.extend(collect_style_blocks(&e.children));
            }
        }
    }
    out
}

/// Text of the first `<title>` element, if any.
pub fn document_title(nodes: &[DomNode]) -> Option<String> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Metadata("title".into()) {
                let t = e.text_content().trim().to_string();
                return (!t.is_empty()).then_some(t);
            }
            if let Some(t) = document_title(&e.children) {
                return Some(t);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        match nodes.first() {
            Some(DomNode::Element(e)) => e,
            other => panic!("Expected element, got {other:?}"),
        }
    }

    #[test]
    fn parse_simple_div() {
        let nodes = parse_html(r#"<div class="note wide" id="n1"><p>Hello</p></div>"#);
        assert_eq!(nodes.len(), 1);
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::Div);
        assert_eq!(e.classes(), vec!["note", "wide"]);
        assert_eq!(e.id(), Some("n1"));
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn void_elements_need_no_close() {
        let nodes = parse_html(r#"<p>a<br>b<img src="x.png" alt=""></p><hr>"#);
        assert_eq!(nodes.len(), 2);
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 4);
        assert!(matches!(&nodes[1], DomNode::Element(e) if e.tag == Tag::Hr));
    }

    #[test]
    fn headings_of_every_level() {
        for level in 1..=6u8 {
            let nodes = parse_html(&format!("<h{level}>T</h{level}>"));
            assert_eq!(first_element(&nodes).tag, Tag::Heading(level));
        }
    }

    #[test]
    fn pre_keeps_whitespace() {
        let html = "<pre class=\"highlight\"><code>fn main() {\n    <span class=\"k\">let</span> x;\n}\n</code></pre>";
        let nodes = parse_html(html);
        let pre = first_element(&nodes);
        assert_eq!(pre.text_content(), "fn main() {\n    let x;\n}\n");
    }

    #[test]
    fn style_content_is_raw_text() {
        let nodes = parse_html("<style>p > a { color: red; }</style><p>x</p>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(collect_style_blocks(&nodes), vec!["p > a { color: red; }"]);
    }

    #[test]
    fn screen_only_styles_are_ignored() {
        let nodes =
            parse_html(r#"<style media="screen">a{}</style><style media="print">b{}</style>"#);
        assert_eq!(collect_style_blocks(&nodes), vec!["b{}"]);
    }

    #[test]
    fn entities_decode() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;&hellip;"), "AB\u{2026}");
        assert_eq!(decode_entities("AT&T &bogus; x"), "AT&T &bogus; x");
    }

    #[test]
    fn finds_body_inside_html() {
        let nodes = parse_html(
            "<!DOCTYPE html><html><head><title>Doc</title></head><body><p>x</p></body></html>",
        );
        assert_eq!(first_element(&nodes).tag, Tag::Html);
        assert_eq!(document_title(&nodes).as_deref(), Some("Doc"));
    }

    #[test]
    fn stray_close_tags_are_skipped() {
        let nodes = parse_html("<p>a</p></div><p>b</p>");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn whitespace_between_inline_elements_is_kept() {
        let nodes = parse_html("<p><em>a</em> <strong>b</strong></p>");
        assert_eq!(first_element(&nodes).text_content(), "a b");
    }

    #[test]
    fn comments_are_dropped() {
        let nodes = parse_html("<!-- note --><p>x</p>");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn parse_table_with_sections() {
        let html = "<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr><tr><td>2</td></tr></tbody></table>";
        let table = first_element(&parse_html(html)).clone();
        assert_eq!(table.tag, Tag::Table);
        assert_eq!(table.children.len(), 2);
        assert!(matches!(&table.children[1], DomNode::Element(e) if e.tag == Tag::TableSection && e.children.len() == 2));
    }
}
