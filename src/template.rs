//! Template engine – wraps the rendered Markdown in an HTML template.
//!
//! Templates use Jinja2 syntax (rendered by Tera) and see exactly one
//! variable, `content`. A reference to anything else fails the run instead of
//! rendering as an empty string, so authoring mistakes in a template show up
//! immediately.

use std::error::Error as _;

use tera::{Context, Tera};

use crate::error::ConvertError;
use crate::markdown::RenderedFragment;

/// Name of the single variable bound in every template.
pub const CONTENT_VAR: &str = "content";

/// Name under which the template is registered. It has no `.html` suffix, so
/// Tera does not auto-escape the (already HTML) content.
const TEMPLATE_NAME: &str = "document";

/// The variables visible to a template: `content` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    content: String,
}

impl TemplateBinding {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    fn to_context(&self) -> Context {
        let mut ctx = Context::new();
        ctx.insert(CONTENT_VAR, &self.content);
        ctx
    }
}

impl From<RenderedFragment> for TemplateBinding {
    fn from(fragment: RenderedFragment) -> Self {
        Self::new(fragment.html)
    }
}

/// Strict-undefined template expansion.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Expand `template` with `binding`.
    pub fn expand(&self, template: &str, binding: &TemplateBinding) -> Result<String, ConvertError> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(TEMPLATE_NAME, template)
            .map_err(|e| syntax_error(&e))?;

        tera.render(TEMPLATE_NAME, &binding.to_context())
            .map_err(|e| render_error(&e))
    }
}

/// Join an error and all of its sources into one message.
fn error_chain(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

fn syntax_error(err: &tera::Error) -> ConvertError {
    let message = error_chain(err);
    let (line, column) = parse_position(&message);
    ConvertError::TemplateSyntax {
        line,
        column,
        message: first_line(&message),
    }
}

fn render_error(err: &tera::Error) -> ConvertError {
    let message = error_chain(err);
    match undefined_variable(&message) {
        Some(variable) => ConvertError::TemplateUndefined { variable, message },
        // Everything else the engine rejects at render time (bad filter
        // arguments, type errors) is still a template-authoring mistake.
        None => ConvertError::TemplateSyntax {
            line: None,
            column: None,
            message,
        },
    }
}

/// Extract the variable name from Tera's "Variable `x` not found in context"
/// message.
fn undefined_variable(message: &str) -> Option<String> {
    let idx = message.find("not found in context")?;
    let head = &message[..idx];
    let end = head.rfind('`')?;
    let start = head[..end].rfind('`')?;
    Some(head[start + 1..end].to_string())
}

/// Find a `--> line:col` marker in a parser message.
fn parse_position(message: &str) -> (Option<usize>, Option<usize>) {
    let Some(idx) = message.find("--> ") else {
        return (None, None);
    };
    let rest = &message[idx + 4..];
    let token: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ':')
        .collect();
    let mut parts = token.split(':');
    let line = parts.next().and_then(|p| p.parse().ok());
    let column = parts.next().and_then(|p| p.parse().ok());
    (line, column)
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(template: &str, content: &str) -> Result<String, ConvertError> {
        TemplateEngine::new().expand(template, &TemplateBinding::new(content))
    }

    #[test]
    fn substitutes_content_in_body() {
        let out = expand(
            "<html><body>{{ content }}</body></html>",
            "<p>This is content</p>",
        )
        .unwrap();
        assert!(out.contains("<body><p>This is content</p></body>"), "got: {out}");
    }

    #[test]
    fn bare_placeholder_round_trips() {
        let x = "<h1>A &amp; B</h1>\n<p>\"quoted\" <em>text</em></p>\n";
        assert_eq!(expand("{{content}}", x).unwrap(), x);
    }

    #[test]
    fn content_may_appear_several_times() {
        let out = expand("<title>{{ content }}</title>{{ content }}", "x").unwrap();
        assert_eq!(out, "<title>x</title>x");
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = expand(
            "<html><body>{{ undefined_variable }}</body></html>",
            "<p>Test Content</p>",
        )
        .unwrap_err();
        match err {
            ConvertError::TemplateUndefined { variable, .. } => {
                assert_eq!(variable, "undefined_variable")
            }
            other => panic!("expected TemplateUndefined, got {other:?}"),
        }
    }

    #[test]
    fn unclosed_tag_is_a_syntax_error_with_line() {
        let err = expand("<html>\n<body>{{ content </body>", "x").unwrap_err();
        match err {
            ConvertError::TemplateSyntax { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("expected TemplateSyntax, got {other:?}"),
        }
    }

    #[test]
    fn control_flow_passes_through() {
        let out = expand("{% if content %}[{{ content }}]{% endif %}", "y").unwrap();
        assert_eq!(out, "[y]");
    }

    #[test]
    fn parse_position_reads_marker() {
        assert_eq!(parse_position("x\n --> 3:14\n  |"), (Some(3), Some(14)));
        assert_eq!(parse_position("no marker"), (None, None));
    }
}
