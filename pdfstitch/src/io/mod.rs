//! Reading sources and writing the result.
//!
//! - [`reader`]: opens PDF and image sources into [`SourceDocument`]s.
//! - [`image`]: turns an image into a one-page document.
//! - [`writer`]: saves through a temporary file and publishes it according
//!   to the existing-output policy.

pub mod image;
pub mod reader;
pub mod writer;

pub use reader::{Destination, PdfReader, SourceDocument};
pub use writer::{PdfWriter, PublishOutcome, WriteStatistics};
