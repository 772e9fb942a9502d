//! Markdown renderer – converts Markdown text into an HTML fragment.
//!
//! Parsing is done by `pulldown-cmark`. When syntax highlighting is enabled,
//! fenced and indented code blocks are intercepted from the event stream and
//! replaced by class-tagged HTML from `syntect`; the theme's stylesheet is
//! prefixed to the fragment as a `<style>` block so the colours travel with
//! the HTML.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::config::MarkdownOptions;
use crate::error::{excerpt, ConvertError};

/// Marker class put on every highlighted `<pre>`.
pub const HIGHLIGHT_CLASS: &str = "highlight";

/// Class of the line-number gutter spans.
pub const LINENO_CLASS: &str = "lineno";

const EXCERPT_CHARS: usize = 60;

const LINENO_CSS: &str = ".lineno { color: #9a9a9a; }\n\
                          pre.highlight { padding: 8px; }\n";

/// HTML produced from a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub html: String,
}

/// Markdown → HTML converter with its options fixed at construction.
pub struct MarkdownRenderer {
    options: MarkdownOptions,
    syntaxes: SyntaxSet,
    /// Theme stylesheet, generated once per renderer.
    theme_css: Option<String>,
}

impl MarkdownRenderer {
    /// Build a renderer. Fails when the configured theme is unavailable.
    pub fn new(options: MarkdownOptions) -> Result<Self, ConvertError> {
        let (syntaxes, theme_css) = if options.syntax_highlighting {
            let themes = ThemeSet::load_defaults();
            let theme = themes.themes.get(options.theme.name()).ok_or_else(|| {
                ConvertError::Config(format!("unknown highlighting theme '{}'", options.theme))
            })?;
            let css = css_for_theme_with_class_style(theme, ClassStyle::Spaced).map_err(|e| {
                ConvertError::Config(format!(
                    "cannot build stylesheet for theme '{}': {e}",
                    options.theme
                ))
            })?;
            (SyntaxSet::load_defaults_newlines(), Some(css))
        } else {
            (SyntaxSet::new(), None)
        };
        Ok(Self {
            options,
            syntaxes,
            theme_css,
        })
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Render `markdown` to an HTML fragment.
    pub fn render(&self, markdown: &str) -> Result<RenderedFragment, ConvertError> {
        log::debug!("rendering {} bytes of markdown", markdown.len());
        let parser = Parser::new_ext(markdown, self.parser_options());

        let mut body = String::with_capacity(markdown.len() * 3 / 2);
        match &self.theme_css {
            Some(_) => {
                let events = self.highlight_code_blocks(parser)?;
                html::push_html(&mut body, events.into_iter());
            }
            None => html::push_html(&mut body, parser),
        }

        let html = match &self.theme_css {
            Some(css) => format!("<style>\n{css}{LINENO_CSS}</style>\n{body}"),
            None => body,
        };
        Ok(RenderedFragment { html })
    }

    fn parser_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.options.extended_syntax {
            opts.insert(Options::ENABLE_TABLES);
            opts.insert(Options::ENABLE_FOOTNOTES);
            opts.insert(Options::ENABLE_STRIKETHROUGH);
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        opts
    }

    /// Replace every code block in the event stream by a single raw-HTML
    /// event carrying the highlighted markup.
    fn highlight_code_blocks<'a>(
        &self,
        parser: Parser<'a>,
    ) -> Result<Vec<Event<'a>>, ConvertError> {
        let mut events = Vec::new();
        let mut in_block: Option<Option<String>> = None;
        let mut code = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    in_block = Some(lang);
                    code.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = in_block.take().flatten();
                    let html = self.highlight_block(lang.as_deref(), &code)?;
                    events.push(Event::Html(CowStr::from(html)));
                }
                Event::Text(text) if in_block.is_some() => code.push_str(&text),
                other => events.push(other),
            }
        }
        Ok(events)
    }

    fn highlight_block(&self, lang: Option<&str>, code: &str) -> Result<String, ConvertError> {
        let syntax = lang
            .and_then(|l| self.syntaxes.find_syntax_by_token(l))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| ConvertError::MarkdownRender {
                    reason: format!("cannot highlight code block: {e}"),
                    excerpt: excerpt(code, EXCERPT_CHARS),
                })?;
        }
        let mut highlighted = generator.finalize();
        if self.options.line_numbers {
            highlighted = number_lines(&highlighted, code.lines().count());
        }

        let lang_class = match lang {
            Some(l) => format!(" class=\"language-{}\"", escape_attr(l)),
            None => String::new(),
        };
        Ok(format!(
            "<pre class=\"{HIGHLIGHT_CLASS} code\"><code{lang_class}>{highlighted}</code></pre>\n"
        ))
    }
}

/// First token of a fence info string (`rust,ignore` → `rust`).
fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c == ',' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Prefix the first `line_count` lines of highlighted markup with a
/// right-aligned gutter number. Trailing closing tags stay unnumbered.
fn number_lines(html: &str, line_count: usize) -> String {
    let width = line_count.max(1).to_string().len();
    let mut out = String::with_capacity(html.len() + line_count * 32);
    for (i, segment) in html.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i < line_count {
            out.push_str(&format!(
                "<span class=\"{LINENO_CLASS}\">{:>width$} </span>",
                i + 1
            ));
        }
        out.push_str(segment);
    }
    out
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> MarkdownRenderer {
        MarkdownRenderer::new(MarkdownOptions {
            syntax_highlighting: false,
            ..MarkdownOptions::default()
        })
        .unwrap()
    }

    fn highlighted(line_numbers: bool) -> MarkdownRenderer {
        MarkdownRenderer::new(MarkdownOptions {
            line_numbers,
            ..MarkdownOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn heading_and_paragraph() {
        let out = plain().render("# Hello World\nThis is a test.").unwrap();
        assert!(out.html.contains("<h1>Hello World</h1>"), "got: {}", out.html);
        assert!(out.html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn heading_survives_highlighting_prefix() {
        let out = highlighted(false).render("# Hello World\nThis is a test.").unwrap();
        assert!(out.html.starts_with("<style>"));
        assert!(out.html.contains("<h1>Hello World</h1>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let md = "# T\n\n```rust\nfn main() {}\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let r = highlighted(true);
        assert_eq!(r.render(md).unwrap(), r.render(md).unwrap());
        let again = highlighted(true);
        assert_eq!(r.render(md).unwrap(), again.render(md).unwrap());
    }

    #[test]
    fn code_block_gets_marker_class() {
        let out = highlighted(false)
            .render("```rust\nlet x = 1;\n```\n")
            .unwrap();
        assert!(out.html.contains("<pre class=\"highlight code\">"));
        assert!(out.html.contains("class=\"language-rust\""));
        assert!(out.html.contains("<span class=\""), "tokens should be classed");
    }

    #[test]
    fn plain_mode_leaves_code_unhighlighted() {
        let out = plain().render("```rust\nlet x = 1;\n```\n").unwrap();
        assert!(!out.html.contains("<style>"));
        assert!(!out.html.contains(HIGHLIGHT_CLASS));
        assert!(out.html.contains("<pre><code class=\"language-rust\">"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let out = highlighted(false)
            .render("```nosuchlang\na < b\n```\n")
            .unwrap();
        assert!(out.html.contains("language-nosuchlang"));
        assert!(out.html.contains("a &lt; b"));
    }

    #[test]
    fn line_numbers_prefix_each_line() {
        let out = highlighted(true)
            .render("```\none\ntwo\nthree\n```\n")
            .unwrap();
        assert_eq!(out.html.matches("<span class=\"lineno\">").count(), 3);
        assert!(out.html.contains("<span class=\"lineno\">1 </span>"));
        assert!(out.html.contains("<span class=\"lineno\">3 </span>"));
    }

    #[test]
    fn tables_need_extended_syntax() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert!(plain().render(md).unwrap().html.contains("<table>"));

        let commonmark = MarkdownRenderer::new(MarkdownOptions {
            syntax_highlighting: false,
            extended_syntax: false,
            ..MarkdownOptions::default()
        })
        .unwrap();
        assert!(!commonmark.render(md).unwrap().html.contains("<table>"));
    }

    #[test]
    fn fence_language_takes_first_token() {
        assert_eq!(fence_language("rust,ignore"), Some("rust".to_string()));
        assert_eq!(fence_language("  python title=x"), Some("python".to_string()));
        assert_eq!(fence_language(""), None);
    }
}
