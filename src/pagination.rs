//! Pagination – splits positioned boxes into pages.
//!
//! Handles:
//! - page boundaries for the configured page size and margin
//! - `page-break-before` / `page-break-after` hints, at any depth
//! - `page-break-inside: avoid` for boxes that fit on one page
//! - tables split between rows
//! - oversized containers split into their children, text split by lines

use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::{BorderStyle, ImageContent, LayoutBox, LayoutConfig, PageLayout, TextContent};
use crate::style::{self, ComputedStyle};

/// Slack for float error when testing whether a box fits.
const EPSILON: f32 = 0.01;

/// Decoration of a container that was split into its children. It is
/// painted once per page the container touches.
struct Shell {
    x: f32,
    width: f32,
    doc_bottom: f32,
    /// Top of the part on the current page, document coordinates.
    segment_top: f32,
    /// Index in the current page's boxes where the segment is inserted.
    start_index: usize,
    background_color: Option<[f32; 4]>,
    border: Option<BorderStyle>,
}

struct Paginator {
    margin: f32,
    content_height: f32,
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start: f32,
    shells: Vec<Shell>,
}

impl Paginator {
    fn new(title: &str, page_width: f32, page_height: f32, margin: f32) -> Self {
        Self {
            margin,
            content_height: (page_height - 2.0 * margin).max(1.0),
            config: LayoutConfig::new(title, page_width, page_height),
            current: PageLayout {
                page_index: 0,
                boxes: Vec::new(),
            },
            page_start: 0.0,
            shells: Vec::new(),
        }
    }

    fn page_is_empty(&self) -> bool {
        self.current.boxes.is_empty()
    }

    fn y_on_page(&self, doc_y: f32) -> f32 {
        (doc_y - self.page_start).max(0.0)
    }

    fn fits(&self, doc_y: f32, height: f32) -> bool {
        self.y_on_page(doc_y) + height <= self.content_height + EPSILON
    }

    /// Close the current page and start a new one at `doc_y`.
    fn new_page(&mut self, doc_y: f32) {
        let page_bottom = self.page_start + self.content_height;
        for idx in (0..self.shells.len()).rev() {
            let bottom = self.shells[idx].doc_bottom.min(page_bottom);
            self.insert_shell_segment(idx, bottom);
        }
        let next = PageLayout {
            page_index: self.config.pages.len() + 1,
            boxes: Vec::new(),
        };
        self.config.pages.push(std::mem::replace(&mut self.current, next));
        self.page_start = doc_y;
        for shell in &mut self.shells {
            shell.segment_top = doc_y;
            shell.start_index = 0;
        }
    }

    fn insert_shell_segment(&mut self, idx: usize, doc_bottom: f32) {
        let shell = &self.shells[idx];
        let height = doc_bottom - shell.segment_top;
        if height <= EPSILON {
            return;
        }
        let mut lb = LayoutBox::new(
            shell.x,
            self.margin + self.y_on_page(shell.segment_top),
            shell.width,
            height,
        );
        lb.background_color = shell.background_color;
        lb.border = shell.border.clone();
        let at = shell.start_index.min(self.current.boxes.len());
        self.current.boxes.insert(at, lb);
    }

    fn open_shell(&mut self, pbox: &PositionedBox) {
        let background_color = background(&pbox.style);
        let border = border(&pbox.style);
        if background_color.is_none() && border.is_none() {
            return;
        }
        self.shells.push(Shell {
            x: pbox.x,
            width: pbox.width,
            doc_bottom: pbox.y + pbox.height,
            segment_top: pbox.y.max(self.page_start),
            start_index: self.current.boxes.len(),
            background_color,
            border,
        });
    }

    fn close_shell(&mut self, pbox: &PositionedBox) {
        if background(&pbox.style).is_none() && border(&pbox.style).is_none() {
            return;
        }
        let idx = self.shells.len() - 1;
        let bottom = self.shells[idx].doc_bottom;
        self.insert_shell_segment(idx, bottom);
        self.shells.pop();
    }

    fn place(&mut self, pbox: &PositionedBox) {
        if pbox.style.page_break_before && !self.page_is_empty() {
            self.new_page(pbox.y);
        }

        let forced_inside = pbox.children.iter().any(has_forced_break);
        let fits = self.fits(pbox.y, pbox.height);
        let keep_together = pbox.style.page_break_inside_avoid
            && pbox.height <= self.content_height
            && !forced_inside;

        if fits && !forced_inside {
            self.emit(pbox);
        } else if keep_together {
            self.move_to_fresh_page(pbox, fits);
        } else if let Some(lines) = pbox.text_lines() {
            self.place_lines(pbox, lines);
        } else if is_atomic(pbox) {
            self.move_to_fresh_page(pbox, fits);
        } else {
            self.open_shell(pbox);
            if let BoxContent::ListItem { marker } = &pbox.content {
                let mut lb = LayoutBox::new(pbox.x, self.abs_y(pbox.y), pbox.width, 0.0);
                lb.marker = Some(TextContent {
                    lines: vec![marker.clone()],
                });
                self.current.boxes.push(lb);
            }
            for child in &pbox.children {
                self.place(child);
            }
            self.close_shell(pbox);
        }

        if pbox.style.page_break_after {
            self.new_page(pbox.y + pbox.height);
        }
    }

    fn move_to_fresh_page(&mut self, pbox: &PositionedBox, fits: bool) {
        if !fits && !self.page_is_empty() {
            self.new_page(pbox.y);
        }
        self.emit(pbox);
    }

    /// Split a text leaf between lines.
    fn place_lines(&mut self, pbox: &PositionedBox, lines: &[crate::layout_config::TextLine]) {
        let mut first = 0;
        while first < lines.len() {
            let top = lines[first].y_offset;
            let room = self.content_height - self.y_on_page(pbox.y + top);
            let mut end = first;
            while end < lines.len()
                && lines[end].y_offset + lines[end].height - top <= room + EPSILON
            {
                end += 1;
            }
            if end == first {
                if !self.page_is_empty() {
                    self.new_page(pbox.y + top);
                    continue;
                }
                // A line taller than the page.
                end = first + 1;
            }

            let height = lines[end - 1].y_offset + lines[end - 1].height - top;
            let mut lb = LayoutBox::new(pbox.x, self.abs_y(pbox.y + top), pbox.width, height);
            lb.text = Some(TextContent {
                lines: lines[first..end]
                    .iter()
                    .cloned()
                    .map(|mut line| {
                        line.y_offset -= top;
                        line
                    })
                    .collect(),
            });
            self.current.boxes.push(lb);

            first = end;
            if first < lines.len() {
                self.new_page(pbox.y + lines[first].y_offset);
            }
        }
    }

    fn abs_y(&self, doc_y: f32) -> f32 {
        self.margin + self.y_on_page(doc_y)
    }

    fn emit(&mut self, pbox: &PositionedBox) {
        let lb = build_layout_box(pbox, self.abs_y(pbox.y));
        self.current.boxes.push(lb);
    }

    fn finish(mut self) -> LayoutConfig {
        if !self.current.boxes.is_empty() || self.config.pages.is_empty() {
            self.config.pages.push(self.current);
        }
        self.config
    }
}

/// Rows keep their cells together; images and leaves cannot be split.
fn is_atomic(pbox: &PositionedBox) -> bool {
    let s = &pbox.style;
    pbox.children.is_empty()
        || matches!(pbox.content, BoxContent::Image { .. })
        || s.display == style::Display::TableRow
        || (s.display == style::Display::Flex && s.flex_direction == style::FlexDirection::Row)
}

fn has_forced_break(pbox: &PositionedBox) -> bool {
    pbox.style.page_break_before
        || pbox.style.page_break_after
        || pbox.children.iter().any(has_forced_break)
}

fn background(s: &ComputedStyle) -> Option<[f32; 4]> {
    (!s.background_color.is_transparent()).then(|| s.background_color.to_array())
}

fn border(s: &ComputedStyle) -> Option<BorderStyle> {
    (!s.border.is_zero()).then(|| BorderStyle {
        widths: [s.border.top, s.border.right, s.border.bottom, s.border.left],
        color: s.border_color.to_array(),
    })
}

/// Convert positioned boxes into a paginated [`LayoutConfig`]. There is
/// always at least one page.
pub fn paginate(
    boxes: &[PositionedBox],
    title: &str,
    page_width: f32,
    page_height: f32,
    page_margin: f32,
) -> LayoutConfig {
    let mut paginator = Paginator::new(title, page_width, page_height, page_margin);
    for pbox in boxes {
        paginator.place(pbox);
    }
    paginator.finish()
}

/// Recursively build a LayoutBox tree where every box carries *page-absolute*
/// x/y coordinates (origin = top-left of the physical page).
///
/// PositionedBox.y values are document-space absolutes, so `child.y − pbox.y`
/// is the child's offset within its parent.
fn build_layout_box(pbox: &PositionedBox, abs_y: f32) -> LayoutBox {
    let mut lb = LayoutBox::new(pbox.x, abs_y, pbox.width, pbox.height);
    lb.background_color = background(&pbox.style);
    lb.border = border(&pbox.style);

    match &pbox.content {
        BoxContent::Text { lines } => {
            lb.text = Some(TextContent {
                lines: lines.clone(),
            });
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::ListItem { marker } => {
            lb.marker = Some(TextContent {
                lines: vec![marker.clone()],
            });
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        lb.children
            .push(build_layout_box(child, abs_y + (child.y - pbox.y)));
    }
    lb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Stylesheet;
    use crate::dom::parse_html;
    use crate::fonts::FontManager;
    use crate::images::ImageStore;
    use crate::layout::compute_layout;
    use crate::style::build_styled_tree;

    const A4: (f32, f32) = (595.0, 842.0);
    const MARGIN: f32 = 40.0;

    fn paginate_html(html: &str) -> LayoutConfig {
        let sheets: Vec<Stylesheet> = Vec::new();
        let styled = build_styled_tree(&parse_html(html), &sheets);
        let content_w = A4.0 - 2.0 * MARGIN;
        let content_h = A4.1 - 2.0 * MARGIN;
        let boxes = compute_layout(
            &styled,
            content_w,
            MARGIN,
            content_h,
            &FontManager::new(),
            &ImageStore::new(None),
        )
        .unwrap();
        paginate(&boxes, "test", A4.0, A4.1, MARGIN)
    }

    fn all_text(config: &LayoutConfig) -> String {
        (0..config.page_count()).map(|p| config.page_text(p)).collect()
    }

    #[test]
    fn single_page() {
        let config = paginate_html("<p>Short text</p>");
        assert_eq!(config.page_count(), 1);
        assert_eq!(config.title, "test");
        assert_eq!(config.page_text(0), "Short text\n");
    }

    #[test]
    fn empty_document_has_one_page() {
        let config = paginate_html("");
        assert_eq!(config.page_count(), 1);
        assert!(config.pages[0].boxes.is_empty());
    }

    #[test]
    fn multiple_pages() {
        let html: String = (0..60)
            .map(|i| format!("<p>Paragraph {i} with some text</p>"))
            .collect();
        let config = paginate_html(&html);
        assert!(config.page_count() > 1, "got {}", config.page_count());
        // Every paragraph lands exactly once, in order.
        let text = all_text(&config);
        let expected: String = (0..60)
            .map(|i| format!("Paragraph {i} with some text\n"))
            .collect();
        assert_eq!(text, expected);
        // Nothing is placed below the bottom margin.
        for page in &config.pages {
            for b in &page.boxes {
                assert!(b.y + b.height <= A4.1 - MARGIN + 0.1, "box at {} overflows", b.y);
            }
        }
    }

    #[test]
    fn forced_breaks() {
        let config = paginate_html(
            r#"<p>one</p><h1 style="page-break-before: always">two</h1><p>three</p>"#,
        );
        assert_eq!(config.page_count(), 2);
        assert_eq!(config.page_text(0), "one\n");
        assert_eq!(config.page_text(1), "two\nthree\n");
        // The new page starts at the top margin.
        assert!((config.pages[1].boxes[0].y - MARGIN).abs() < 0.01);
    }

    #[test]
    fn nested_forced_break_splits_container() {
        let config = paginate_html(
            r#"<div><p>a</p><p style="break-before: page">b</p></div><p style="break-after: page">c</p>"#,
        );
        assert_eq!(config.page_count(), 2, "trailing break adds no blank page");
        assert_eq!(config.page_text(1), "b\nc\n");
    }

    #[test]
    fn table_split_between_rows() {
        let rows: String = (0..80)
            .map(|i| format!("<tr><td>row {i}</td><td>value</td></tr>"))
            .collect();
        let config = paginate_html(&format!("<table><tbody>{rows}</tbody></table>"));
        assert!(config.page_count() > 1);
        let text = all_text(&config);
        for i in 0..80 {
            assert_eq!(text.matches(&format!("row {i}\n")).count(), 1);
        }
        // Cells of a row stay together.
        for p in 0..config.page_count() {
            let page = config.page_text(p);
            assert_eq!(page.matches("row ").count(), page.matches("value").count());
        }
    }

    #[test]
    fn long_pre_splits_by_lines() {
        let code: String = (0..120).map(|i| format!("line {i}\n")).collect();
        let config = paginate_html(&format!("<pre><code>{code}</code></pre>"));
        assert!(config.page_count() > 1);
        assert_eq!(all_text(&config), code);
        // The code background is painted on every page it spans.
        for page in &config.pages {
            assert!(page.boxes.iter().any(|b| b.background_color.is_some()));
        }
    }

    #[test]
    fn heading_moves_instead_of_overflowing() {
        let config = paginate_html(r#"<div style="height: 750pt"></div><h2>Heading</h2>"#);
        assert_eq!(config.page_count(), 2);
        assert_eq!(config.page_text(1), "Heading\n");
    }
}
