//! Status lines, warnings and the task summary for the terminal.
//!
//! Status messages go to stdout and are suppressed in quiet mode; warnings
//! and errors go to stderr and are always shown.
//!
//! # Examples
//!
//! ```
//! use pdfstitch::output::formatter::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info("Merging 3 inputs...");
//! formatter.success("Created book.pdf");
//! formatter.warning("Page 4 was skipped");
//! ```

use std::io::{self, IsTerminal};

use crate::io::PublishOutcome;
use crate::merge::MergeOutcome;

/// Kind of message, which picks its prefix, colour and stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Plain status line.
    Info,
    /// Success message.
    Success,
    /// Warning message.
    Warning,
    /// Error message.
    Error,
    /// Pipeline detail, verbose mode only.
    Debug,
}

impl MessageLevel {
    fn prefix(self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Success => "✓ ",
            Self::Warning => "⚠ ",
            Self::Error => "✗ ",
            Self::Debug => "→ ",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Success => "\x1b[32m",
            Self::Warning => "\x1b[33m",
            Self::Error => "\x1b[31m",
            Self::Debug => "\x1b[36m",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

/// Prints task messages honoring `--quiet` and `--verbose`.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    quiet: bool,
    verbose: bool,
    colored: bool,
}

impl OutputFormatter {
    /// Formatter for the given verbosity flags.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            colored: Self::should_use_color(),
        }
    }

    /// Create a quiet formatter (only warnings and errors).
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Formatter that also prints details.
    pub fn verbose() -> Self {
        Self::new(false, true)
    }

    /// Colour only when stdout is a terminal with `TERM` set.
    fn should_use_color() -> bool {
        io::stdout().is_terminal() && std::env::var("TERM").is_ok()
    }

    /// Print an informational message, suppressed in quiet mode.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.print_message(MessageLevel::Info, message);
        }
    }

    /// Print a success message, suppressed in quiet mode.
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.print_message(MessageLevel::Success, message);
        }
    }

    /// Print a warning on stderr.
    pub fn warning(&self, message: &str) {
        self.print_message(MessageLevel::Warning, message);
    }

    /// Print an error on stderr.
    pub fn error(&self, message: &str) {
        self.print_message(MessageLevel::Error, message);
    }

    /// Print a message only shown in verbose mode.
    pub fn debug(&self, message: &str) {
        if self.verbose {
            self.print_message(MessageLevel::Debug, message);
        }
    }

    fn print_message(&self, level: MessageLevel, message: &str) {
        let line = self.format_message(level, message);
        if level.to_stderr() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn format_message(&self, level: MessageLevel, message: &str) -> String {
        let prefix = level.prefix();
        let color = level.color();
        if self.colored && !color.is_empty() {
            format!("{color}{prefix}{message}\x1b[0m")
        } else {
            format!("{prefix}{message}")
        }
    }

    /// Print a section header, suppressed in quiet mode.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n{title}");
        }
    }

    /// Print a labelled value, only in verbose mode.
    pub fn detail(&self, label: &str, value: &str) {
        if self.verbose {
            println!("  {label}: {value}");
        }
    }

    /// Print a blank line, suppressed in quiet mode.
    pub fn blank_line(&self) {
        if !self.quiet {
            println!();
        }
    }

    /// Report the result of a task: the output, its warnings and, in
    /// verbose mode, the statistics.
    pub fn outcome(&self, outcome: &MergeOutcome) {
        for warning in &outcome.warnings {
            self.warning(warning);
        }
        match &outcome.output {
            PublishOutcome::Written(written) => self.success(&format!(
                "Created {} ({} pages, {})",
                written.output_path.display(),
                outcome.statistics.pages,
                written.format_file_size()
            )),
            PublishOutcome::Skipped { path } => {
                self.info(&format!("Output exists, left untouched: {}", path.display()))
            }
        }

        if self.verbose {
            self.section("Statistics");
            for (label, value) in summary(outcome) {
                self.detail(label, &value);
            }
        }
    }

    /// Whether status lines are printed.
    pub fn should_print(&self) -> bool {
        !self.quiet
    }

    /// Whether details are printed.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether only warnings and errors are printed.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

/// Labelled statistics of a task, in display order.
pub fn summary(outcome: &MergeOutcome) -> Vec<(&'static str, String)> {
    let stats = &outcome.statistics;
    let mut rows = vec![
        ("Inputs", stats.inputs.to_string()),
        ("Pages", stats.pages.to_string()),
    ];
    let optional = [
        ("ToC pages", stats.toc_pages),
        ("Blank pages", stats.blank_pages),
        ("Skipped pages", stats.skipped_pages),
        ("Outline entries", stats.outline_entries),
        ("Form fields", stats.form_fields),
    ];
    rows.extend(
        optional
            .into_iter()
            .filter(|(_, value)| *value > 0)
            .map(|(label, value)| (label, value.to_string())),
    );
    if let PublishOutcome::Written(written) = &outcome.output {
        rows.push(("Output size", written.format_file_size()));
        rows.push(("Write time", format!("{:.2}s", written.write_time.as_secs_f64())));
    }
    rows.push(("Total time", format!("{:.2}s", stats.elapsed.as_secs_f64())));
    rows
}
