//! Saving the destination document and publishing it.
//!
//! The document is written to a temporary file created next to the output,
//! so publishing is a rename on the same file system. If anything fails
//! before the rename the temporary file is removed when it is dropped and
//! the output path is never touched.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstitch::config::OutputTarget;
//! use pdfstitch::io::writer::PdfWriter;
//! use lopdf::Document;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! let outcome = writer.save(doc, &OutputTarget::new("merged.pdf")).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio::task;
use tracing::debug;

use crate::config::{CompressionLevel, ExistingOutputPolicy, OutputTarget};
use crate::error::{Result, StitchError};
use crate::utils::format_file_size;

/// Buffer size used when serializing the document.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Statistics about a write operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteStatistics {
    /// Time taken to serialize and publish.
    pub write_time: Duration,
    /// Size of the published file in bytes.
    pub file_size: u64,
    /// Where the file ended up; differs from the request under `Rename`.
    pub output_path: PathBuf,
    /// Whether stream compression was applied.
    pub compressed: bool,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// What happened to the output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum PublishOutcome {
    /// The document was written.
    Written(WriteStatistics),
    /// The output existed and the policy said to leave it alone.
    Skipped {
        /// The existing output.
        path: PathBuf,
    },
}

impl PublishOutcome {
    /// Path of the written file, if any.
    pub fn written_path(&self) -> Option<&Path> {
        match self {
            Self::Written(stats) => Some(&stats.output_path),
            Self::Skipped { .. } => None,
        }
    }
}

/// Saves documents according to an [`OutputTarget`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfWriter;

impl PdfWriter {
    /// Create a new PDF writer.
    pub fn new() -> Self {
        Self
    }

    /// Check the target before any work is done.
    ///
    /// # Errors
    ///
    /// - The output directory does not exist.
    /// - The output exists and the policy is [`ExistingOutputPolicy::Fail`].
    pub async fn preflight(&self, target: &OutputTarget) -> Result<()> {
        let dir = output_dir(&target.path);
        if tokio::fs::metadata(&dir).await.is_err() {
            return Err(StitchError::invalid_parameters(format!(
                "Output directory does not exist: {}",
                dir.display()
            )));
        }
        if target.existing_output == ExistingOutputPolicy::Fail && exists(&target.path).await {
            return Err(StitchError::output_exists(&target.path));
        }
        Ok(())
    }

    /// Serialize `doc` into a temporary file and publish it to `target`.
    pub async fn save(&self, doc: Document, target: &OutputTarget) -> Result<PublishOutcome> {
        let target = target.clone();
        task::spawn_blocking(move || save_blocking(doc, &target)).await?
    }
}

fn save_blocking(mut doc: Document, target: &OutputTarget) -> Result<PublishOutcome> {
    let start = Instant::now();

    match target.compression {
        CompressionLevel::None => {}
        CompressionLevel::Standard => doc.compress(),
        CompressionLevel::Maximum => {
            doc.prune_objects();
            doc.compress();
        }
    }
    doc.renumber_objects();
    doc.version = target.version.clone();

    let dir = output_dir(&target.path);
    let mut temp = NamedTempFile::new_in(&dir).map_err(|source| StitchError::FailedToCreateOutput {
        path: dir.clone(),
        source,
    })?;
    debug!(temp = %temp.path().display(), "Writing to temporary output");

    {
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, temp.as_file_mut());
        doc.save_to(&mut writer).map_err(|err| StitchError::FailedToWrite {
            path: target.path.clone(),
            source: std::io::Error::other(err),
        })?;
        writer.flush().map_err(|source| StitchError::FailedToWrite {
            path: target.path.clone(),
            source,
        })?;
    }

    let Some(published) = publish(temp, target)? else {
        debug!(output = %target.path.display(), "Output exists, skipping");
        return Ok(PublishOutcome::Skipped {
            path: target.path.clone(),
        });
    };

    let file_size = std::fs::metadata(&published).map(|m| m.len()).unwrap_or(0);
    Ok(PublishOutcome::Written(WriteStatistics {
        write_time: start.elapsed(),
        file_size,
        output_path: published,
        compressed: target.compression != CompressionLevel::None,
    }))
}

/// Move the temporary file into place. `None` means the output was skipped.
fn publish(temp: NamedTempFile, target: &OutputTarget) -> Result<Option<PathBuf>> {
    let path = &target.path;
    let destination = match target.existing_output {
        ExistingOutputPolicy::Overwrite => {
            temp.persist(path).map_err(|err| StitchError::FailedToWrite {
                path: path.clone(),
                source: err.error,
            })?;
            return Ok(Some(path.clone()));
        }
        ExistingOutputPolicy::Skip if path.exists() => return Ok(None),
        ExistingOutputPolicy::Rename => available_name(path),
        ExistingOutputPolicy::Fail | ExistingOutputPolicy::Skip => path.clone(),
    };

    temp.persist_noclobber(&destination).map_err(|err| {
        if err.error.kind() == std::io::ErrorKind::AlreadyExists {
            StitchError::output_exists(&destination)
        } else {
            StitchError::FailedToWrite {
                path: destination.clone(),
                source: err.error,
            }
        }
    })?;
    Ok(Some(destination))
}

/// First of `path`, `stem(1).ext`, `stem(2).ext`... that does not exist.
fn available_name(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1u32..)
        .map(|n| {
            let file_name = match &extension {
                Some(ext) => format!("{stem}({n}).{ext}"),
                None => format!("{stem}({n})"),
            };
            path.with_file_name(file_name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn output_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}
