//! Painter: turns paginated [`LayoutConfig`] pages into PDF bytes with
//! printpdf's operation lists.

use std::collections::{HashMap, HashSet};

use printpdf::*;

use crate::fonts::{FontFamily, FontSpec};
use crate::images::ImageStore;
use crate::layout_config::{LayoutBox, LayoutConfig, TextLine, TextSpan};

const MM_PER_PT: f32 = 0.352_778;

/// An embedded image and its size in pixels.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Paint every page of `config`.
///
/// Images missing from `images`, or that printpdf cannot embed, are skipped
/// with a warning.
pub fn render_pdf(config: &LayoutConfig, images: &ImageStore) -> Result<Vec<u8>, String> {
    let page_w = Mm(config.page_width_pt * MM_PER_PT);
    let page_h = Mm(config.page_height_pt * MM_PER_PT);

    let mut doc = PdfDocument::new(&config.title);

    // Images are embedded once and referenced from every page that shows them.
    let mut sources: HashSet<&str> = HashSet::new();
    for page in &config.pages {
        for lbox in &page.boxes {
            collect_image_refs(lbox, &mut sources);
        }
    }

    let mut xobjects: HashMap<String, ImageResource> = HashMap::new();
    let mut decode_warnings: Vec<PdfWarnMsg> = Vec::new();
    for src in sources {
        let Some(loaded) = images.get(src) else {
            log::warn!("image '{}' was laid out but never loaded", shorten(src));
            continue;
        };
        let raw = match RawImage::decode_from_bytes(&loaded.bytes, &mut decode_warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping image '{}': cannot embed: {e}", shorten(src));
                continue;
            }
        };
        let xobj_id = doc.add_image(&raw);
        xobjects.insert(
            src.to_string(),
            ImageResource {
                xobj_id,
                px_width: loaded.width_px,
                px_height: loaded.height_px,
            },
        );
    }

    let mut pages: Vec<PdfPage> = config
        .pages
        .iter()
        .map(|page| {
            let mut ops = Vec::new();
            for lbox in &page.boxes {
                render_box(&mut ops, lbox, config.page_height_pt, &xobjects);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    log::debug!(
        "painting {} page(s), {} image(s)",
        pages.len(),
        xobjects.len()
    );
    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    if bytes.is_empty() {
        return Err("PDF writer produced no output".into());
    }
    Ok(bytes)
}

fn builtin_font(spec: FontSpec) -> BuiltinFont {
    match (spec.family, spec.bold, spec.italic) {
        (FontFamily::Sans, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Sans, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Sans, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Sans, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Serif, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Serif, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Serif, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Serif, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Mono, false, false) => BuiltinFont::Courier,
        (FontFamily::Mono, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Mono, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Mono, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Re-encode `s` as WinAnsi (cp1252) bytes for the builtin fonts. Characters
/// outside the code page become `?`.
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn shorten(src: &str) -> &str {
    let end = (0..=src.len().min(60))
        .rev()
        .find(|&i| src.is_char_boundary(i))
        .unwrap_or(0);
    &src[..end]
}

fn collect_image_refs<'a>(lbox: &'a LayoutBox, srcs: &mut HashSet<&'a str>) {
    if let Some(img) = &lbox.image {
        srcs.insert(img.src.as_str());
    }
    for child in &lbox.children {
        collect_image_refs(child, srcs);
    }
}

fn rgb(c: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Filled rectangle; `top` is in PDF coordinates (origin bottom-left).
fn fill_rect(ops: &mut Vec<Op>, x: f32, top: f32, width: f32, height: f32, color: [f32; 4]) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    point(x, top - height),
                    point(x + width, top - height),
                    point(x + width, top),
                    point(x, top),
                ],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn stroke_line(ops: &mut Vec<Op>, x1: f32, x2: f32, y: f32, thickness: f32, color: [f32; 4]) {
    ops.push(Op::SetOutlineColor { col: rgb(color) });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![point(x1, y), point(x2, y)],
            is_closed: false,
        },
    });
}

fn write_span(ops: &mut Vec<Op>, span: &TextSpan, x: f32, baseline: f32) {
    let font = builtin_font(span.font);
    let y = baseline + span.rise;
    if !span.text.trim().is_empty() {
        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(span.font_size),
            font,
        });
        ops.push(Op::SetFillColor {
            col: rgb(span.color),
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_winlatin(&span.text))],
            font,
        });
        ops.push(Op::EndTextSection);
    }

    let thickness = (span.font_size * 0.06).max(0.5);
    if span.underline {
        let uy = y - span.font_size * 0.12;
        stroke_line(ops, x, x + span.width, uy, thickness, span.color);
    }
    if span.strike {
        let sy = y + span.font_size * 0.28;
        stroke_line(ops, x, x + span.width, sy, thickness, span.color);
    }
}

/// Draw lines whose offsets are relative to a box at (`x`, `top`), `top` in
/// PDF coordinates.
fn write_lines(ops: &mut Vec<Op>, lines: &[TextLine], x: f32, top: f32) {
    for line in lines {
        let baseline = top - line.y_offset - line.baseline;
        for span in &line.spans {
            write_span(ops, span, x + line.x_offset + span.x_offset, baseline);
        }
    }
}

/// Paint `lbox`, then its children on top.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<String, ImageResource>,
) {
    // Layout y grows downwards from the page top; PDF y grows upwards.
    let pdf_y = page_height - lbox.y;

    if let Some(bg) = lbox.background_color {
        fill_rect(ops, lbox.x, pdf_y, lbox.width, lbox.height, bg);
    }

    // Borders are drawn as filled strips inside the border box, one per side.
    if let Some(border) = &lbox.border {
        let [top, right, bottom, left] = border.widths;
        let (x, w, h) = (lbox.x, lbox.width, lbox.height);
        fill_rect(ops, x, pdf_y, w, top, border.color);
        fill_rect(ops, x, pdf_y - h + bottom, w, bottom, border.color);
        fill_rect(ops, x, pdf_y, left, h, border.color);
        fill_rect(ops, x + w - right, pdf_y, right, h, border.color);
    }

    if let Some(marker) = &lbox.marker {
        write_lines(ops, &marker.lines, lbox.x, pdf_y);
    }

    if let Some(text) = &lbox.text {
        write_lines(ops, &text.lines, lbox.x, pdf_y);
    }

    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(&img.src) {
            let img_bottom_y = page_height - lbox.y - img.height;

            // dpi 72: one pixel is one point before scaling.
            let scale_x = img.width / res.px_width.max(1) as f32;
            let scale_y = img.height / res.px_height.max(1) as f32;

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::png_data_uri;
    use crate::layout_config::{BorderStyle, ImageContent, PageLayout, TextContent};

    fn span(text: &str) -> TextSpan {
        TextSpan {
            text: text.into(),
            x_offset: 0.0,
            width: 30.0,
            font: FontSpec::default(),
            font_size: 11.0,
            color: [0.0, 0.0, 0.0, 1.0],
            underline: true,
            strike: false,
            rise: 0.0,
        }
    }

    #[test]
    fn render_empty_page() {
        let config = LayoutConfig::new("empty", 595.0, 842.0);
        let bytes = render_pdf(&config, &ImageStore::new(None)).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn render_text_borders_and_images() {
        let src = png_data_uri(4, 4);
        let mut images = ImageStore::new(None);
        images.load_all([src.as_str()]);

        let mut text_box = LayoutBox::new(40.0, 40.0, 200.0, 16.0);
        text_box.border = Some(BorderStyle {
            widths: [0.0, 0.0, 1.0, 0.0],
            color: [0.8, 0.8, 0.8, 1.0],
        });
        text_box.background_color = Some([0.9, 0.9, 1.0, 1.0]);
        text_box.text = Some(TextContent {
            lines: vec![TextLine {
                spans: vec![span("Hello \u{2014} world")],
                x_offset: 0.0,
                y_offset: 0.0,
                height: 15.4,
                baseline: 10.5,
            }],
        });
        text_box.marker = Some(TextContent {
            lines: vec![TextLine {
                spans: vec![span("\u{2022}")],
                x_offset: -12.0,
                ..TextLine::default()
            }],
        });
        let mut img_box = LayoutBox::new(40.0, 80.0, 30.0, 30.0);
        img_box.image = Some(ImageContent {
            src: src.clone(),
            width: 30.0,
            height: 30.0,
        });

        let mut config = LayoutConfig::new("doc", 595.0, 842.0);
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![text_box, img_box],
        });
        let bytes = render_pdf(&config, &images).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn winlatin_mapping() {
        assert_eq!(to_winlatin("a\u{2022}é\u{4e2d}").as_bytes(), &[b'a', 0x95, 0xE9, b'?']);
    }

    #[test]
    fn font_selection() {
        let spec = FontSpec {
            family: FontFamily::Mono,
            bold: true,
            italic: false,
        };
        assert!(matches!(builtin_font(spec), BuiltinFont::CourierBold));
        assert!(matches!(
            builtin_font(FontSpec::default()),
            BuiltinFont::Helvetica
        ));
    }
}
