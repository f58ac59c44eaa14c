//! pdfstitch - compose PDF documents.
//!
//! Merges documents and images into one PDF while keeping what makes the
//! inputs navigable:
//!
//! - page selection per input
//! - outlines, retained, flattened or one entry per input
//! - interactive forms, with renaming of clashing field names
//! - page labels
//! - a generated, linked table of contents
//! - blank pages after odd inputs, filename footers, page size normalization
//!
//! It also interleaves inputs page by page (alternate mix). Every task runs
//! under an [`ExecutionContext`] that carries cancellation, leniency and
//! progress reporting.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstitch::config::{MergeParameters, OutputTarget, TocPolicy};
//! use pdfstitch::context::ExecutionContext;
//! use pdfstitch::input::{MergeInput, Source};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut params = MergeParameters::new(OutputTarget::new("merged.pdf"))
//!     .with_input(MergeInput::all_pages(Source::file("a.pdf")))
//!     .with_input(MergeInput::pdf(Source::file("b.pdf"), "2-".parse()?));
//! params.toc_policy = TocPolicy::DocTitles;
//! params.blank_page_if_odd = true;
//!
//! let mut ctx = ExecutionContext::new().lenient(true);
//! let outcome = pdfstitch::merge::merge(&params, &mut ctx).await?;
//! println!("Created {} page document", outcome.statistics.pages);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod input;
pub mod io;
pub mod merge;
pub mod output;
pub mod utils;


// Re-export commonly used types
pub use config::{AlternateMixParameters, MergeParameters, OutputTarget};
pub use context::{CancellationToken, ExecutionContext};
pub use error::{PageImportError, Result, StitchError};
pub use merge::{MergeOutcome, MergeStatistics};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
