//! # md-forge – Markdown → PDF
//!
//! Converts one Markdown document into one styled PDF. The stages are:
//!
//! 1. **Read** – load the source, template and stylesheet ([`reader`])
//! 2. **Markdown** – Markdown → HTML fragment with highlighted code ([`markdown`])
//! 3. **Template** – wrap the fragment in an HTML template ([`template`])
//! 4. **PDF** – parse, cascade, lay out, paginate and paint ([`pdf`]),
//!    built on [`dom`], [`css`], [`style`], [`layout`], [`pagination`] and
//!    [`render`]
//!
//! [`pipeline::Pipeline`] runs them in order for a [`pipeline::ConversionRequest`].
//! The library only emits `log` records; installing a logger is up to the
//! binary.

pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod layout_config;
pub mod markdown;
pub mod pagination;
pub mod pdf;
pub mod pipeline;
pub mod reader;
pub mod render;
pub mod style;
pub mod template;

// Re-exports for convenience
pub use config::Settings;
pub use error::ConvertError;
pub use pdf::{PdfRenderer, StylesheetSource};
pub use pipeline::{ConversionRequest, Pipeline, RunReport, Stage, StageFailure};
