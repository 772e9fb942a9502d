//! Error types for md-forge.
//!
//! Every failure the conversion can hit is a [`ConvertError`] variant. The
//! pipeline wraps the first fatal one in a
//! [`StageFailure`](crate::pipeline::StageFailure) so the caller knows which
//! stage gave up; the binary maps it to an exit code with
//! [`ConvertError::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for invalid command-line usage.
pub const EXIT_USAGE: i32 = 2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// All fatal errors returned by md-forge.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Process setup ─────────────────────────────────────────────────────
    /// Settings file missing or malformed, or settings out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Command-line arguments have the wrong shape (missing flag, wrong
    /// file extension).
    #[error("usage: {0}")]
    Usage(String),

    // ── Input ─────────────────────────────────────────────────────────────
    /// A source, template, or stylesheet path does not exist.
    #[error("file not found: '{}'", .path.display())]
    InputNotFound { path: PathBuf },

    /// The path exists but could not be read as UTF-8 text.
    #[error("cannot read '{}': {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// Markdown could not be converted to HTML.
    #[error("markdown rendering failed: {reason} (near {excerpt:?})")]
    MarkdownRender { reason: String, excerpt: String },

    /// Template markup is malformed.
    #[error("template syntax error{}: {message}", location_suffix(.line, .column))]
    TemplateSyntax {
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    /// Template references a variable that is not bound.
    #[error("template references undefined variable `{variable}`")]
    TemplateUndefined { variable: String, message: String },

    /// A stylesheet could not be parsed.
    #[error("stylesheet '{origin}' is invalid at line {line}: {message}")]
    StylesheetParse {
        origin: String,
        line: usize,
        message: String,
    },

    /// Layout or paint stage of the PDF engine failed.
    #[error("PDF rendering failed: {0}")]
    PdfRender(String),

    // ── Output ────────────────────────────────────────────────────────────
    /// Destination directory missing or unwritable, target exists without
    /// force-overwrite, or the write itself failed.
    #[error("cannot write '{}': {reason}", .path.display())]
    OutputWrite { path: PathBuf, reason: String },
}

impl ConvertError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConvertError::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    pub(crate) fn output(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConvertError::OutputWrite {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!(" at line {l}, column {c}"),
        (Some(l), None) => format!(" at line {l}"),
        _ => String::new(),
    }
}

/// Return at most `max_chars` characters of `text` for diagnostics, with an
/// ellipsis when truncated.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(max_chars).collect();
    if trimmed.chars().count() > max_chars {
        out.push('\u{2026}');
    }
    out
}
