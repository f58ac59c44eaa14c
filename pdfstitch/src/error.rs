//! Error types for pdfstitch.
//!
//! Errors are split in two layers:
//!
//! - [`PageImportError`]: a single source page could not be imported. The
//!   merge pipeline turns it into a warning in lenient mode and into a fatal
//!   [`StitchError::PageImport`] otherwise.
//! - [`StitchError`]: everything that aborts a task. Cancellation is a
//!   distinct variant so callers can tell it apart from real failures.

use std::io;
use std::path::PathBuf;

/// Result type alias for pdfstitch operations.
pub type Result<T> = std::result::Result<T, StitchError>;

/// A source page could not be imported into the destination document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageImportError {
    /// The requested page does not exist in the source.
    #[error("page {page} of '{source_name}' does not exist (document has {total} pages)")]
    PageNotFound {
        /// Name of the source document.
        source_name: String,
        /// Requested page number (1-based).
        page: u32,
        /// Number of pages in the source.
        total: u32,
    },

    /// The page object is missing or structurally invalid.
    #[error("page {page} of '{source_name}' is corrupted: {reason}")]
    Corrupted {
        /// Name of the source document.
        source_name: String,
        /// Page number (1-based).
        page: u32,
        /// What is wrong with the page.
        reason: String,
    },
}

impl PageImportError {
    /// Create a Corrupted error.
    pub fn corrupted(source_name: impl Into<String>, page: u32, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            source_name: source_name.into(),
            page,
            reason: reason.into(),
        }
    }

    /// Page number the error refers to.
    pub fn page(&self) -> u32 {
        match self {
            Self::PageNotFound { page, .. } | Self::Corrupted { page, .. } => *page,
        }
    }
}

/// Main error type for pdfstitch tasks.
#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    /// Input file was not found.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input file exists but cannot be read.
    #[error("Cannot access file: {}\n  Reason: {source}", path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A source document could not be opened.
    #[error("Failed to load PDF: {name}\n  Reason: {reason}")]
    FailedToLoadPdf {
        /// Source name.
        name: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The source is encrypted and no usable password is available.
    #[error(
        "PDF is encrypted and cannot be processed: {name}\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools"
    )]
    EncryptedPdf {
        /// Source name.
        name: String,
    },

    /// An image input could not be converted into a page.
    #[error("Failed to convert image: {name}\n  Reason: {reason}")]
    ImageConversion {
        /// Source name.
        name: String,
        /// Reason for the failure.
        reason: String,
    },

    /// A page failed to import and the task is not lenient.
    #[error("Page import failed: {0}")]
    PageImport(#[from] PageImportError),

    /// No inputs were provided.
    #[error("No inputs specified")]
    NoInputs,

    /// A page selection could not be parsed or is inverted.
    #[error("Invalid page selection '{selection}': {reason}")]
    InvalidPageSelection {
        /// The selection as given.
        selection: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Task parameters are inconsistent.
    #[error("Invalid parameters: {message}")]
    InvalidParameters {
        /// Description of the problem.
        message: String,
    },

    /// Output exists and the policy forbids replacing it.
    #[error(
        "Output file already exists: {}\n  \
         Use --existing-output overwrite or rename to replace it or choose a different path",
        path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Failed to create the temporary or final output file.
    #[error("Failed to create output file: {}\n  Reason: {source}", path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed while writing or publishing the output.
    #[error("Failed to write to output file: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The destination document could not be assembled.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The task was cancelled through its execution context.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for StitchError {
    fn from(err: lopdf::Error) -> Self {
        Self::merge_failed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StitchError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::other(format!("Background task failed: {err}"))
    }
}

impl StitchError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an EncryptedPdf error.
    pub fn encrypted_pdf(name: impl Into<String>) -> Self {
        Self::EncryptedPdf { name: name.into() }
    }

    /// Create an ImageConversion error.
    pub fn image_conversion(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageConversion {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPageSelection error.
    pub fn invalid_selection(selection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPageSelection {
            selection: selection.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidParameters error.
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: impl Into<PathBuf>) -> Self {
        Self::OutputExists { path: path.into() }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// True for the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error can be downgraded to a warning in lenient mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PageImport(_))
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::FileNotAccessible { .. } => 2,
            Self::FailedToLoadPdf { .. }
            | Self::EncryptedPdf { .. }
            | Self::ImageConversion { .. } => 3,
            Self::NoInputs | Self::InvalidPageSelection { .. } | Self::InvalidParameters { .. } => {
                1
            }
            Self::OutputExists { .. } => 4,
            Self::FailedToCreateOutput { .. } | Self::FailedToWrite { .. } | Self::Io { .. } => 5,
            Self::PageImport(_) | Self::MergeFailed { .. } => 6,
            Self::Cancelled => 130,
            Self::Other { .. } => 1,
        }
    }
}
