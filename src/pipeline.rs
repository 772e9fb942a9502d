//! Pipeline – validates a conversion request, then runs Markdown rendering,
//! optional template expansion, and PDF rendering in order.
//!
//! The stages form a straight line with no way back; the first failure ends
//! the run and is reported together with the stage it happened in.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Settings;
use crate::error::ConvertError;
use crate::markdown::MarkdownRenderer;
use crate::pdf::{PdfRenderer, StylesheetSource};
use crate::reader::FileReader;
use crate::template::{TemplateBinding, TemplateEngine};

/// Steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateArguments,
    ValidateOutputTarget,
    ReadInput,
    RenderMarkdown,
    ExpandTemplate,
    RenderPdf,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ValidateArguments => "validate-arguments",
            Stage::ValidateOutputTarget => "validate-output-target",
            Stage::ReadInput => "read-input",
            Stage::RenderMarkdown => "render-markdown",
            Stage::ExpandTemplate => "expand-template",
            Stage::RenderPdf => "render-pdf",
            Stage::Done => "done",
        })
    }
}

/// The error that ended a run and the stage it came from.
#[derive(Debug, Error)]
#[error("{stage}: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: ConvertError,
}

impl StageFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

/// One conversion: a Markdown file in, a PDF file out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub template: Option<PathBuf>,
    pub stylesheet: Option<PathBuf>,
    /// Overwrite an existing output file.
    pub force: bool,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            template: None,
            stylesheet: None,
            force: false,
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_stylesheet(mut self, stylesheet: impl Into<PathBuf>) -> Self {
        self.stylesheet = Some(stylesheet.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Check the shape of the request without touching the filesystem.
    pub fn validate(&self) -> Result<(), ConvertError> {
        check_extension(&self.input, "md", "input")?;
        check_extension(&self.output, "pdf", "output")
    }

    pub fn output_target(&self) -> OutputTarget {
        OutputTarget {
            path: self.output.clone(),
            overwrite: if self.force {
                OverwritePolicy::Force
            } else {
                OverwritePolicy::Deny
            },
        }
    }
}

fn check_extension(path: &Path, expected: &str, what: &str) -> Result<(), ConvertError> {
    let ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected));
    if ok {
        Ok(())
    } else {
        Err(ConvertError::Usage(format!(
            "{what} file '{}' must have a .{expected} extension",
            path.display()
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    #[default]
    Deny,
    Force,
}

/// Where the PDF goes and whether an existing file may be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub overwrite: OverwritePolicy,
}

impl OutputTarget {
    /// Check that the PDF can be written: the directory exists and accepts
    /// new files, and the target is not a directory or, unless forced, an
    /// existing file.
    pub fn validate(&self) -> Result<(), ConvertError> {
        let fail = |reason: &str| Err(ConvertError::output(&self.path, reason));
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let meta = match fs::metadata(dir) {
            Ok(m) => m,
            Err(_) => return fail("output directory does not exist"),
        };
        if !meta.is_dir() {
            return fail("output directory is not a directory");
        }
        if meta.permissions().readonly() {
            return fail("output directory is not writable");
        }
        if let Err(e) = tempfile::tempfile_in(dir) {
            return Err(ConvertError::output(
                &self.path,
                format!("output directory is not writable: {e}"),
            ));
        }

        if self.path.is_dir() {
            return fail("output path is a directory");
        }
        if self.path.exists() && self.overwrite == OverwritePolicy::Deny {
            return fail("file already exists (use --force to overwrite)");
        }
        Ok(())
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: PathBuf,
    pub bytes: usize,
    pub pages: usize,
}

/// Runs conversions with one set of settings. Each `run` starts a fresh
/// trail.
pub struct Pipeline {
    settings: Settings,
    markdown: MarkdownRenderer,
    templates: TemplateEngine,
    reader: FileReader,
    trail: Vec<Stage>,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Result<Self, ConvertError> {
        settings.validate()?;
        let markdown = MarkdownRenderer::new(settings.markdown.clone())?;
        Ok(Self {
            settings,
            markdown,
            templates: TemplateEngine::new(),
            reader: FileReader::new(),
            trail: Vec::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Stages entered by the last run, in order.
    pub fn trail(&self) -> &[Stage] {
        &self.trail
    }

    /// Convert `request`. A failure is logged once, with its stage, before
    /// it is returned.
    pub fn run(&mut self, request: &ConversionRequest) -> Result<RunReport, StageFailure> {
        self.trail.clear();
        let result = self.execute(request);
        if let Err(failure) = &result {
            log::error!("{failure}");
        }
        result
    }

    fn enter(&mut self, stage: Stage) {
        log::debug!("stage {stage}");
        self.trail.push(stage);
    }

    fn execute(&mut self, request: &ConversionRequest) -> Result<RunReport, StageFailure> {
        let at = |stage: Stage| move |error: ConvertError| StageFailure { stage, error };

        self.enter(Stage::ValidateArguments);
        request.validate().map_err(at(Stage::ValidateArguments))?;

        self.enter(Stage::ValidateOutputTarget);
        request
            .output_target()
            .validate()
            .map_err(at(Stage::ValidateOutputTarget))?;

        self.enter(Stage::ReadInput);
        let source = self
            .reader
            .read(&request.input)
            .map_err(at(Stage::ReadInput))?;

        self.enter(Stage::RenderMarkdown);
        let fragment = self
            .markdown
            .render(&source)
            .map_err(at(Stage::RenderMarkdown))?;

        let html = match &request.template {
            Some(template_path) => {
                self.enter(Stage::ExpandTemplate);
                let template = self
                    .reader
                    .read(template_path)
                    .map_err(at(Stage::ExpandTemplate))?;
                self.templates
                    .expand(&template, &TemplateBinding::from(fragment))
                    .map_err(at(Stage::ExpandTemplate))?
            }
            None => fragment.html,
        };

        self.enter(Stage::RenderPdf);
        let title = self.settings.title.clone().unwrap_or_else(|| {
            request
                .input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let mut renderer = PdfRenderer::new(self.settings.page.clone()).with_title(title);
        if let Some(dir) = request.input.parent() {
            renderer = renderer.with_base_dir(dir);
        }
        let sources: Vec<StylesheetSource> = request
            .stylesheet
            .iter()
            .cloned()
            .map(StylesheetSource::File)
            .collect();
        let rendered = renderer
            .render_to_file(&html, &sources, &request.output)
            .map_err(at(Stage::RenderPdf))?;

        self.enter(Stage::Done);
        log::info!(
            "wrote '{}' ({} bytes, {} page(s))",
            request.output.display(),
            rendered.bytes.len(),
            rendered.page_count()
        );
        Ok(RunReport {
            output: request.output.clone(),
            bytes: rendered.bytes.len(),
            pages: rendered.page_count(),
        })
    }
}
