//! PDF renderer – ties together parsing, styling, layout, pagination, and
//! painting, and writes the result to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::PageSettings;
use crate::css::Stylesheet;
use crate::dom::{collect_style_blocks, document_title, parse_html};
use crate::error::ConvertError;
use crate::fonts::FontManager;
use crate::images::{collect_image_sources, ImageStore};
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::pagination::paginate;
use crate::reader::FileReader;
use crate::render::render_pdf;
use crate::style::build_styled_tree;

/// Title used when neither the caller nor the document provides one.
pub const DEFAULT_TITLE: &str = "md-forge document";

/// Where a stylesheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetSource {
    /// A CSS file on disk.
    File(PathBuf),
    /// CSS text held in memory; `name` labels it in diagnostics.
    Inline { name: String, css: String },
}

/// Output of a render: the PDF bytes and the page layout they were painted
/// from.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub layout: LayoutConfig,
}

impl RenderedPdf {
    pub fn page_count(&self) -> usize {
        self.layout.page_count()
    }
}

/// HTML + CSS → PDF.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    page: PageSettings,
    title: Option<String>,
    /// Relative image paths resolve against this directory.
    base_dir: Option<PathBuf>,
    reader: FileReader,
}

impl PdfRenderer {
    pub fn new(page: PageSettings) -> Self {
        Self {
            page,
            title: None,
            base_dir: None,
            reader: FileReader::new(),
        }
    }

    /// PDF metadata title. Without one, the document's `<title>` is used.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Read and parse stylesheets in order.
    pub fn load_stylesheets(
        &self,
        sources: &[StylesheetSource],
    ) -> Result<Vec<Stylesheet>, ConvertError> {
        sources
            .iter()
            .map(|source| {
                let (origin, css) = match source {
                    StylesheetSource::File(path) => {
                        (path.display().to_string(), self.reader.read(path)?)
                    }
                    StylesheetSource::Inline { name, css } => (name.clone(), css.clone()),
                };
                parse_sheet(origin, &css)
            })
            .collect()
    }

    /// Render `html` with `stylesheets` applied after the document's own
    /// `<style>` blocks.
    pub fn render(&self, html: &str, stylesheets: &[Stylesheet]) -> Result<RenderedPdf, ConvertError> {
        // 1. Parse HTML
        let dom = parse_html(html);

        // 2. Cascade: embedded sheets first, so external sheets win ties.
        let mut sheets = collect_style_blocks(&dom)
            .iter()
            .enumerate()
            .map(|(i, css)| parse_sheet(format!("<style> block {}", i + 1), css))
            .collect::<Result<Vec<_>, _>>()?;
        sheets.extend_from_slice(stylesheets);
        let styled = build_styled_tree(&dom, &sheets);

        // 3. Page geometry; `@page` in a later sheet overrides earlier ones.
        let mut page_w = self.page.effective_width();
        let mut page_h = self.page.effective_height();
        let mut margin = self.page.margin_pt;
        for sheet in &sheets {
            if let Some((w, h)) = sheet.page.size {
                (page_w, page_h) = (w, h);
            }
            if let Some(m) = sheet.page.margin {
                margin = m;
            }
        }
        let content_w = page_w - 2.0 * margin;
        let content_h = page_h - 2.0 * margin;
        if content_w <= 0.0 || content_h <= 0.0 {
            return Err(ConvertError::PdfRender(format!(
                "margin {margin}pt leaves no content area on a {page_w}x{page_h}pt page"
            )));
        }

        // 4. Images
        let mut images = ImageStore::new(self.base_dir.as_deref());
        images.load_all(collect_image_sources(&dom));

        // 5. Layout and pagination
        let fonts = FontManager::new();
        let boxes = compute_layout(&styled, content_w, margin, content_h, &fonts, &images)
            .map_err(ConvertError::PdfRender)?;
        let title = self
            .title
            .clone()
            .or_else(|| document_title(&dom))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let layout = paginate(&boxes, &title, page_w, page_h, margin);

        // 6. Paint
        let bytes = render_pdf(&layout, &images).map_err(ConvertError::PdfRender)?;
        log::info!(
            "rendered {} page(s), {} bytes, {} stylesheet(s), {} image(s)",
            layout.page_count(),
            bytes.len(),
            sheets.len(),
            images.len()
        );
        Ok(RenderedPdf { bytes, layout })
    }

    /// Load `sources`, render, and write the PDF to `output`. The bytes go to
    /// a temporary file next to `output` first, which then replaces it.
    pub fn render_to_file(
        &self,
        html: &str,
        sources: &[StylesheetSource],
        output: &Path,
    ) -> Result<RenderedPdf, ConvertError> {
        let sheets = self.load_stylesheets(sources)?;
        let rendered = self.render(html, &sheets)?;
        write_atomically(output, &rendered.bytes)?;
        log::debug!("wrote '{}'", output.display());
        Ok(rendered)
    }
}

fn parse_sheet(origin: String, css: &str) -> Result<Stylesheet, ConvertError> {
    Stylesheet::parse(origin.clone(), css).map_err(|e| ConvertError::StylesheetParse {
        origin,
        line: e.line,
        message: e.message,
    })
}

fn write_atomically(output: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let fail = |e: std::io::Error| ConvertError::output(output, e.to_string());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".md-forge-").suffix(".tmp");
    // New files get the usual umask-filtered mode rather than 0600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(fail)?;
    // An overwritten file keeps its mode.
    if let Ok(meta) = fs::metadata(output) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(fail)?;
    }
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(fail)?;
    tmp.persist(output)
        .map_err(|e| ConvertError::output(output, e.error.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageOrientation, PageSize};

    fn renderer() -> PdfRenderer {
        PdfRenderer::new(PageSettings::default())
    }

    #[test]
    fn renders_basic_document() {
        let rendered = renderer().render("<h1>Hello</h1><p>World</p>", &[]).unwrap();
        assert_eq!(&rendered.bytes[0..5], b"%PDF-");
        assert_eq!(rendered.page_count(), 1);
        assert_eq!(rendered.layout.page_text(0), "Hello\nWorld\n");
        assert_eq!(rendered.layout.title, DEFAULT_TITLE);
    }

    #[test]
    fn title_precedence() {
        let html = "<html><head><title>From HTML</title></head><body><p>x</p></body></html>";
        let from_doc = renderer().render(html, &[]).unwrap();
        assert_eq!(from_doc.layout.title, "From HTML");
        let explicit = renderer().with_title("Given").render(html, &[]).unwrap();
        assert_eq!(explicit.layout.title, "Given");
    }

    #[test]
    fn page_rule_overrides_settings() {
        let sheets = renderer()
            .load_stylesheets(&[StylesheetSource::Inline {
                name: "page.css".into(),
                css: "@page { size: letter landscape; margin: 1in }".into(),
            }])
            .unwrap();
        let rendered = renderer().render("<p>x</p>", &sheets).unwrap();
        assert_eq!(rendered.layout.page_width_pt, 792.0);
        assert_eq!(rendered.layout.page_height_pt, 612.0);
    }

    #[test]
    fn landscape_settings() {
        let page = PageSettings {
            size: PageSize::Legal,
            orientation: PageOrientation::Landscape,
            margin_pt: 20.0,
        };
        let rendered = PdfRenderer::new(page).render("<p>x</p>", &[]).unwrap();
        assert_eq!(rendered.layout.page_width_pt, 1008.0);
    }

    #[test]
    fn impossible_page_margin_is_render_error() {
        let sheets = renderer()
            .load_stylesheets(&[StylesheetSource::Inline {
                name: "m.css".into(),
                css: "@page { margin: 400pt }".into(),
            }])
            .unwrap();
        let err = renderer().render("<p>x</p>", &sheets).unwrap_err();
        assert!(matches!(err, ConvertError::PdfRender(_)), "{err:?}");
    }

    #[test]
    fn external_sheets_win_over_embedded() {
        let sheets = renderer()
            .load_stylesheets(&[StylesheetSource::Inline {
                name: "x.css".into(),
                css: "p { display: none }".into(),
            }])
            .unwrap();
        let html = "<style>p { display: block }</style><p>hidden</p><h1>shown</h1>";
        let rendered = renderer().render(html, &sheets).unwrap();
        assert_eq!(rendered.layout.page_text(0), "shown\n");
    }

    #[test]
    fn stylesheet_errors() {
        let err = renderer()
            .load_stylesheets(&[StylesheetSource::Inline {
                name: "bad.css".into(),
                css: "p { color: red".into(),
            }])
            .unwrap_err();
        match err {
            ConvertError::StylesheetParse { origin, line, .. } => {
                assert_eq!(origin, "bad.css");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = renderer()
            .load_stylesheets(&[StylesheetSource::File("/no/such/style.css".into())])
            .unwrap_err();
        assert!(matches!(err, ConvertError::InputNotFound { .. }));

        let err = renderer().render("<style>}</style><p>x</p>", &[]).unwrap_err();
        assert!(matches!(err, ConvertError::StylesheetParse { .. }));
    }

    #[test]
    fn relative_images_resolve_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), crate::images::png_bytes(8, 8)).unwrap();
        let rendered = renderer()
            .with_base_dir(dir.path())
            .render(r#"<p><img src="pic.png"></p>"#, &[])
            .unwrap();
        let has_image = rendered.layout.pages[0]
            .boxes
            .iter()
            .flat_map(|b| b.children.iter())
            .any(|c| c.image.is_some());
        assert!(has_image);
    }

    #[test]
    fn render_to_file_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        std::fs::write(&out, b"old").unwrap();
        let rendered = renderer().render_to_file("<p>x</p>", &[], &out).unwrap();
        let written = std::fs::read(&out).unwrap();
        assert_eq!(written, rendered.bytes);
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn render_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing").join("out.pdf");
        let err = renderer().render_to_file("<p>x</p>", &[], &out).unwrap_err();
        assert!(matches!(err, ConvertError::OutputWrite { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn written_pdf_has_regular_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;

        // Same umask as a plain write in this directory.
        let reference = dir.path().join("reference");
        fs::write(&reference, b"x").unwrap();
        let fresh = dir.path().join("fresh.pdf");
        renderer().render_to_file("<p>x</p>", &[], &fresh).unwrap();
        assert_eq!(mode(&fresh), mode(&reference));

        let forced = dir.path().join("forced.pdf");
        fs::write(&forced, b"old").unwrap();
        fs::set_permissions(&forced, fs::Permissions::from_mode(0o640)).unwrap();
        renderer().render_to_file("<p>x</p>", &[], &forced).unwrap();
        assert_eq!(mode(&forced), 0o640);
        assert_eq!(&fs::read(&forced).unwrap()[0..5], b"%PDF-");
    }
}
