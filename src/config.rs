//! Settings for a conversion run.
//!
//! Everything has a default, so an empty settings file (or none at all) is
//! valid. A settings file is JSON; unknown keys are rejected so typos surface
//! instead of being silently ignored.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConvertError;

/// Default page margin in points.
pub const PAGE_MARGIN_PT: f32 = 40.0;

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Document title embedded in the PDF metadata. `None` uses the input
    /// file stem.
    pub title: Option<String>,
    pub markdown: MarkdownOptions,
    pub page: PageSettings,
}

impl Settings {
    /// Load settings from a JSON file. A missing or malformed file is a
    /// configuration error.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ConvertError::Config(format!("cannot read settings '{}': {e}", path.display()))
        })?;
        Self::from_json(&text).map_err(|e| match e {
            ConvertError::Config(msg) => {
                ConvertError::Config(format!("settings '{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse settings from JSON text and validate them.
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| ConvertError::Config(format!("malformed settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        self.page.validate()
    }
}

/// Markdown rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownOptions {
    /// Highlight fenced code blocks and prefix the theme stylesheet.
    pub syntax_highlighting: bool,
    /// Number the lines of highlighted code blocks.
    pub line_numbers: bool,
    /// Tables, footnotes, strikethrough, and task lists.
    pub extended_syntax: bool,
    /// Colour theme for highlighted code.
    pub theme: SyntaxTheme,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            syntax_highlighting: true,
            line_numbers: false,
            extended_syntax: true,
            theme: SyntaxTheme::InspiredGitHub,
        }
    }
}

/// Themes bundled with the highlighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum SyntaxTheme {
    #[default]
    #[serde(rename = "InspiredGitHub")]
    #[value(name = "inspired-github")]
    InspiredGitHub,
    #[serde(rename = "Solarized (light)")]
    #[value(name = "solarized-light")]
    SolarizedLight,
    #[serde(rename = "Solarized (dark)")]
    #[value(name = "solarized-dark")]
    SolarizedDark,
    #[serde(rename = "base16-ocean.light")]
    #[value(name = "ocean-light")]
    OceanLight,
    #[serde(rename = "base16-ocean.dark")]
    #[value(name = "ocean-dark")]
    OceanDark,
    #[serde(rename = "base16-eighties.dark")]
    #[value(name = "eighties-dark")]
    EightiesDark,
    #[serde(rename = "base16-mocha.dark")]
    #[value(name = "mocha-dark")]
    MochaDark,
}

impl SyntaxTheme {
    /// Key of the theme in the highlighter's default theme set.
    pub fn name(&self) -> &'static str {
        match self {
            SyntaxTheme::InspiredGitHub => "InspiredGitHub",
            SyntaxTheme::SolarizedLight => "Solarized (light)",
            SyntaxTheme::SolarizedDark => "Solarized (dark)",
            SyntaxTheme::OceanLight => "base16-ocean.light",
            SyntaxTheme::OceanDark => "base16-ocean.dark",
            SyntaxTheme::EightiesDark => "base16-eighties.dark",
            SyntaxTheme::MochaDark => "base16-mocha.dark",
        }
    }
}

impl fmt::Display for SyntaxTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    /// Portrait `(width, height)` in points.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a4" => Some(PageSize::A4),
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            _ => None,
        }
    }
}

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Page geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSettings {
    pub size: PageSize,
    pub orientation: PageOrientation,
    /// Page margin in points, applied on all four sides.
    pub margin_pt: f32,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: PageOrientation::Portrait,
            margin_pt: PAGE_MARGIN_PT,
        }
    }
}

impl PageSettings {
    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        let (w, h) = self.size.dimensions_pt();
        match self.orientation {
            PageOrientation::Portrait => w,
            PageOrientation::Landscape => h,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        let (w, h) = self.size.dimensions_pt();
        match self.orientation {
            PageOrientation::Portrait => h,
            PageOrientation::Landscape => w,
        }
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        if !self.margin_pt.is_finite() || self.margin_pt < 0.0 {
            return Err(ConvertError::Config(format!(
                "page margin must be a non-negative number, got {}",
                self.margin_pt
            )));
        }
        let smallest = self.effective_width().min(self.effective_height());
        if self.margin_pt * 2.0 >= smallest {
            return Err(ConvertError::Config(format!(
                "page margin {}pt leaves no room for content on a {}pt page",
                self.margin_pt, smallest
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let s = Settings::from_json("{}").unwrap();
        assert_eq!(s.markdown, MarkdownOptions::default());
        assert_eq!(s.page, PageSettings::default());
        assert!(s.title.is_none());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let s = Settings::from_json(
            r#"{
                "title": "Report",
                "markdown": { "line_numbers": true, "theme": "Solarized (dark)" },
                "page": { "size": "letter", "orientation": "landscape" }
            }"#,
        )
        .unwrap();
        assert_eq!(s.title.as_deref(), Some("Report"));
        assert!(s.markdown.line_numbers);
        assert!(s.markdown.syntax_highlighting);
        assert_eq!(s.markdown.theme, SyntaxTheme::SolarizedDark);
        assert_eq!(s.page.effective_width(), 792.0);
        assert_eq!(s.page.effective_height(), 612.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Settings::from_json(r#"{ "markdown": { "highlight": true } }"#).unwrap_err();
        assert!(err.to_string().contains("highlight"), "got: {err}");
    }

    #[test]
    fn oversized_margin_is_rejected() {
        let err = Settings::from_json(r#"{ "page": { "margin_pt": 400.0 } }"#).unwrap_err();
        assert!(err.to_string().contains("no room"), "got: {err}");
    }

    #[test]
    fn invalid_settings_file_names_path_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(&path, r#"{ "page": { "margin_pt": -1.0 } }"#).unwrap();
        let msg = Settings::load(&path).unwrap_err().to_string();
        assert!(msg.starts_with("invalid configuration: settings '"), "got: {msg}");
        assert!(msg.ends_with("page margin must be a non-negative number, got -1"), "got: {msg}");
        assert_eq!(msg.matches("invalid configuration").count(), 1, "got: {msg}");
    }

    #[test]
    fn missing_settings_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("settings.json")).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
    }
}
