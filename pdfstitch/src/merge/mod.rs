//! Merging documents.
//!
//! The pipeline is driven by [`MergeTask`]; every other module handles one
//! concern of it:
//!
//! - [`pages`]: copying pages and their resources into the destination
//! - [`annotations`]: re-resolving links once an input is imported
//! - [`outline`], [`acroform`], [`page_labels`]: merging document level
//!   structures according to their policy
//! - [`toc`], [`footer`], [`normalize`]: generated content
//! - [`mix`]: the alternate mix task
//!
//! # Examples
//!
//! ```no_run
//! use pdfstitch::config::{MergeParameters, OutlinePolicy, OutputTarget};
//! use pdfstitch::context::ExecutionContext;
//! use pdfstitch::input::{MergeInput, Source};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut params = MergeParameters::new(OutputTarget::new("merged.pdf"))
//!     .with_input(MergeInput::pdf(Source::file("a.pdf"), "1-3".parse()?))
//!     .with_input(MergeInput::image(Source::file("scan.png")));
//! params.outline_policy = OutlinePolicy::OneEntryEachDoc;
//!
//! let outcome = pdfstitch::merge::merge(&params, &mut ExecutionContext::new()).await?;
//! println!("Merged {} pages", outcome.statistics.pages);
//! # Ok(())
//! # }
//! ```

pub mod acroform;
pub mod annotations;
pub mod document;
pub mod footer;
pub mod merger;
pub mod metadata;
pub mod mix;
pub mod normalize;
pub mod outline;
pub mod page_labels;
pub mod pages;
pub mod text;
pub mod toc;

pub use acroform::AcroFormsMerger;
pub use document::DestinationDocument;
pub use footer::FooterWriter;
pub use merger::{MergeOutcome, MergeStatistics, MergeTask};
pub use metadata::MetadataManager;
pub use mix::AlternateMixTask;
pub use outline::{OutlineEntry, OutlineMerger};
pub use page_labels::{PageLabel, PageLabelsMerger};
pub use pages::{ImportedPage, PageImporter, PageLookup};
pub use toc::TableOfContentsCreator;

use crate::config::{AlternateMixParameters, MergeParameters};
use crate::context::ExecutionContext;
use crate::error::Result;

/// Merge the inputs of `params` and publish the result.
///
/// Convenience function that creates a [`MergeTask`] and executes it.
///
/// # Errors
///
/// Returns an error if any merge step fails or the task is cancelled.
pub async fn merge(params: &MergeParameters, ctx: &mut ExecutionContext) -> Result<MergeOutcome> {
    MergeTask::new().execute(params, ctx).await
}

/// Interleave the pages of the inputs of `params` and publish the result.
///
/// # Errors
///
/// Returns an error if any input cannot be opened, a page fails in strict
/// mode, or the task is cancelled.
pub async fn mix(params: &AlternateMixParameters, ctx: &mut ExecutionContext) -> Result<MergeOutcome> {
    AlternateMixTask::new().execute(params, ctx).await
}
