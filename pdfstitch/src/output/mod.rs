//! User-facing output of the command line front end.
//!
//! - [`formatter`]: status, warning and error messages with quiet and
//!   verbose modes, and the task summary.
//! - [`progress`]: a terminal progress bar fed by the execution context.
//!
//! Library code itself only logs through `tracing`; nothing here is used
//! by the merge pipeline.

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter, summary};
pub use progress::{ProgressBar, ProgressStyle};
