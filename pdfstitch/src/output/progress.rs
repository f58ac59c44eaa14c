//! Terminal progress bar fed by task progress.
//!
//! Tasks report `(completed, total)` steps through the execution context:
//! inputs for a merge, pages for an alternate mix.
//! [`ProgressBar::into_callback`] turns a bar into such a callback:
//!
//! ```
//! use pdfstitch::context::ExecutionContext;
//! use pdfstitch::output::progress::{ProgressBar, ProgressStyle};
//!
//! let mut progress = ProgressBar::new(ProgressStyle::Bar).with_unit("inputs");
//! progress.set_message("Merging");
//! let ctx = ExecutionContext::new().on_progress(progress.into_callback());
//! ```
//!
//! The bar is drawn on stderr so stdout stays free for `--json` output.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 30;
const REDRAW_INTERVAL: Duration = Duration::from_millis(80);

/// How progress is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// `Merging [#######-------] 2/5 inputs, 3s left`
    Bar,
    /// `Merging 2/5 inputs`
    Counter,
}

/// Progress indicator on stderr.
#[derive(Debug)]
pub struct ProgressBar {
    style: ProgressStyle,
    message: Option<String>,
    unit: &'static str,
    done: usize,
    total: usize,
    started: Instant,
    drawn_at: Option<Instant>,
    visible: bool,
}

impl ProgressBar {
    /// Progress bar that draws only when stderr is a terminal.
    pub fn new(style: ProgressStyle) -> Self {
        Self {
            style,
            message: None,
            unit: "steps",
            done: 0,
            total: 0,
            started: Instant::now(),
            drawn_at: None,
            visible: io::stderr().is_terminal(),
        }
    }

    /// Progress bar that never draws.
    pub fn disabled() -> Self {
        Self {
            visible: false,
            ..Self::new(ProgressStyle::Counter)
        }
    }

    /// Name of what is being counted, like `inputs` or `pages`.
    pub fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Text shown before the bar.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Record `done` of `total` steps and redraw if due.
    pub fn update(&mut self, done: usize, total: usize) {
        self.done = done.min(total);
        self.total = total;
        if self.done == self.total {
            self.finish();
        } else if self.drawn_at.is_none_or(|at| at.elapsed() >= REDRAW_INTERVAL) {
            self.draw();
        }
    }

    /// Draw the final state and end the line.
    pub fn finish(&mut self) {
        if !self.visible {
            return;
        }
        self.done = self.total;
        self.draw();
        eprintln!();
        self.visible = false;
    }

    /// Callback for [`ExecutionContext::on_progress`](crate::context::ExecutionContext::on_progress).
    pub fn into_callback(mut self) -> impl FnMut(usize, usize) + Send + 'static {
        move |done, total| self.update(done, total)
    }

    /// Completed share in percent.
    pub fn percent(&self) -> f64 {
        match self.total {
            0 => 0.0,
            total => self.done as f64 * 100.0 / total as f64,
        }
    }

    /// Time since the bar was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Remaining time extrapolated from the pace so far.
    fn remaining(&self) -> Option<Duration> {
        if self.done == 0 || self.done >= self.total {
            return None;
        }
        let per_step = self.elapsed().as_secs_f64() / self.done as f64;
        Some(Duration::from_secs_f64(per_step * (self.total - self.done) as f64))
    }

    fn draw(&mut self) {
        if !self.visible {
            return;
        }
        self.drawn_at = Some(Instant::now());
        let mut stderr = io::stderr();
        write!(stderr, "\r\x1b[K{}", self.line()).ok();
        stderr.flush().ok();
    }

    fn line(&self) -> String {
        let mut line = self.message.clone().map(|m| m + " ").unwrap_or_default();
        if self.style == ProgressStyle::Bar {
            let filled = BAR_WIDTH * self.done / self.total.max(1);
            line.push('[');
            line.push_str(&"#".repeat(filled));
            line.push_str(&"-".repeat(BAR_WIDTH - filled));
            line.push_str("] ");
        }
        line.push_str(&format!("{}/{} {}", self.done, self.total, self.unit));
        match self.remaining() {
            Some(left) if self.style == ProgressStyle::Bar => {
                line.push_str(&format!(", {} left", human_duration(left)));
            }
            _ => {}
        }
        line
    }
}

fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3600, secs % 3600 / 60),
    }
}
