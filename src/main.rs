//! md-forge – command-line Markdown → PDF converter.
//!
//! Usage:
//!   md-forge -i notes.md -o notes.pdf [-t template.html] [-c style.css] [-f]
//!
//! Exit status is 0 on success, 2 for usage errors, and 1 for every other
//! failure. Diagnostics go to stderr through the logger.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use md_forge::config::{PageOrientation, Settings, SyntaxTheme};
use md_forge::error::ConvertError;
use md_forge::pipeline::{ConversionRequest, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "md-forge", version, about = "Convert a Markdown file to a styled PDF")]
struct Cli {
    /// Markdown source (.md)
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// PDF destination (.pdf)
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// HTML template containing `{{ content }}`
    #[arg(short, long, value_name = "PATH")]
    template: Option<PathBuf>,

    /// CSS stylesheet applied to the document
    #[arg(short = 'c', long = "css", value_name = "PATH")]
    stylesheet: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,

    /// JSON settings file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Colour theme for highlighted code
    #[arg(long, value_enum)]
    theme: Option<SyntaxTheme>,

    /// Number the lines of highlighted code blocks
    #[arg(long)]
    line_numbers: bool,

    /// Leave code blocks unhighlighted
    #[arg(long)]
    no_highlight: bool,

    /// Plain CommonMark: no tables, footnotes, strikethrough or task lists
    #[arg(long)]
    no_extensions: bool,

    /// PDF metadata title (default: input file stem)
    #[arg(long)]
    title: Option<String>,

    /// Landscape pages
    #[arg(long)]
    landscape: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Settings from `--config` (or defaults) with flag overrides applied.
    fn settings(&self) -> Result<Settings, ConvertError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(theme) = self.theme {
            settings.markdown.theme = theme;
        }
        if self.line_numbers {
            settings.markdown.line_numbers = true;
        }
        if self.no_highlight {
            settings.markdown.syntax_highlighting = false;
        }
        if self.no_extensions {
            settings.markdown.extended_syntax = false;
        }
        if let Some(title) = &self.title {
            settings.title = Some(title.clone());
        }
        if self.landscape {
            settings.page.orientation = PageOrientation::Landscape;
        }
        Ok(settings)
    }

    fn request(&self) -> ConversionRequest {
        ConversionRequest {
            input: self.input.clone(),
            output: self.output.clone(),
            template: self.template.clone(),
            stylesheet: self.stylesheet.clone(),
            force: self.force,
        }
    }

    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

fn init_logger(level: LevelFilter) {
    // RUST_LOG, when set, overrides the flag-derived level.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    // Argument errors print usage and exit with status 2.
    let cli = Cli::parse();
    init_logger(cli.log_level());

    let pipeline = cli.settings().and_then(Pipeline::new);
    let mut pipeline = match pipeline {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return exit_code(e.exit_code());
        }
    };

    match pipeline.run(&cli.request()) {
        Ok(report) => {
            log::info!(
                "done: '{}' ({} pages)",
                report.output.display(),
                report.pages
            );
            ExitCode::SUCCESS
        }
        // Already logged by the pipeline.
        Err(failure) => exit_code(failure.exit_code()),
    }
}
