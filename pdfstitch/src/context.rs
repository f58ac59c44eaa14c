//! Execution context shared between a running task and its caller.
//!
//! The caller keeps a [`CancellationToken`] clone and may trip it from any
//! thread (a Ctrl-C handler, a UI button). The task polls it at every input
//! and every page, and reports progress and warnings back through the
//! context.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::error::{PageImportError, Result, StitchError};

/// Cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type ProgressCallback = Box<dyn FnMut(usize, usize) + Send>;

/// Per-execution services: cancellation, leniency, progress and warnings.
pub struct ExecutionContext {
    cancellation: CancellationToken,
    lenient: bool,
    progress: Option<ProgressCallback>,
    warnings: Vec<String>,
}

impl ExecutionContext {
    /// Strict context with a fresh cancellation token.
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            lenient: false,
            progress: None,
            warnings: Vec::new(),
        }
    }

    /// Use an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Turn recoverable page errors into warnings.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Receive `(completed, total)` after every step.
    pub fn on_progress(mut self, callback: impl FnMut(usize, usize) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Token controlling this execution.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether page errors are downgraded to warnings.
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Fail with [`StitchError::Cancelled`] if cancellation was requested.
    pub fn assert_not_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(StitchError::Cancelled);
        }
        Ok(())
    }

    /// Record `err` as a warning in lenient mode, propagate it otherwise.
    pub fn assert_lenient(&mut self, err: PageImportError) -> Result<()> {
        if !self.lenient {
            return Err(err.into());
        }
        self.warn(format!("Page {} was skipped, could not be processed: {err}", err.page()));
        Ok(())
    }

    /// Report that `completed` of `total` steps are done.
    pub fn steps_completed(&mut self, completed: usize, total: usize) {
        info!(completed, total, "Progress");
        if let Some(callback) = self.progress.as_mut() {
            callback(completed, total);
        }
    }

    /// Record a warning for the caller.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Take the recorded warnings, leaving none behind.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("lenient", &self.lenient)
            .field("warnings", &self.warnings.len())
            .finish()
    }
}
