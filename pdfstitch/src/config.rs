//! Task parameters and the policies that steer a merge.
//!
//! Every policy parses case-insensitively from its kebab-case name, so the
//! CLI and configuration files share one spelling:
//!
//! ```
//! use pdfstitch::config::{OutlinePolicy, TocPolicy};
//!
//! assert_eq!("one-entry-each-doc".parse::<OutlinePolicy>().unwrap(), OutlinePolicy::OneEntryEachDoc);
//! assert_eq!("DOC_TITLES".parse::<TocPolicy>().unwrap(), TocPolicy::DocTitles);
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, StitchError};
use crate::input::{MergeInput, PdfMixInput, Source};

/// PDF versions the writer can declare.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.3", "1.4", "1.5", "1.6", "1.7", "2.0"];

/// Version declared when none is requested.
pub const DEFAULT_VERSION: &str = "1.7";

fn normalized(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}

macro_rules! policy_from_str {
    ($ty:ty, $label:literal, { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = StitchError;

            fn from_str(s: &str) -> Result<Self> {
                match normalized(s).as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(StitchError::invalid_parameters(format!(
                        concat!("Invalid ", $label, ": '{}'. Valid options: ", $($text, " "),+),
                        s
                    ))),
                }
            }
        }
    };
}

/// What happens to the bookmarks of the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlinePolicy {
    /// Keep the bookmarks that point at imported pages.
    #[default]
    Retain,
    /// Drop all bookmarks.
    Discard,
    /// One bookmark per input, titled by its file name.
    OneEntryEachDoc,
    /// Keep the bookmarks, nested under one entry per input.
    RetainAsOneEntry,
}

policy_from_str!(OutlinePolicy, "outline policy", {
    "retain" => OutlinePolicy::Retain,
    "discard" => OutlinePolicy::Discard,
    "one-entry-each-doc" => OutlinePolicy::OneEntryEachDoc,
    "retain-as-one-entry" => OutlinePolicy::RetainAsOneEntry,
});

/// How the interactive forms of the inputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcroFormPolicy {
    /// Fields with the same name become one field.
    Merge,
    /// Incoming fields are renamed when the name is taken.
    #[default]
    MergeRenamingExistingFields,
    /// Forms are not carried over.
    Discard,
}

policy_from_str!(AcroFormPolicy, "form policy", {
    "merge" => AcroFormPolicy::Merge,
    "merge-renaming-existing-fields" => AcroFormPolicy::MergeRenamingExistingFields,
    "merge-renaming" => AcroFormPolicy::MergeRenamingExistingFields,
    "discard" => AcroFormPolicy::Discard,
});

/// What happens to the page labels of the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageLabelsPolicy {
    /// Carry the labels over, remapped to output page numbers.
    Retain,
    /// Drop page labels.
    #[default]
    Discard,
}

policy_from_str!(PageLabelsPolicy, "page labels policy", {
    "retain" => PageLabelsPolicy::Retain,
    "discard" => PageLabelsPolicy::Discard,
});

/// Whether and how a table of contents is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TocPolicy {
    /// No table of contents.
    #[default]
    None,
    /// Entries titled by input file names.
    FileNames,
    /// Entries titled by document titles, falling back to file names.
    DocTitles,
}

policy_from_str!(TocPolicy, "table of contents policy", {
    "none" => TocPolicy::None,
    "file-names" => TocPolicy::FileNames,
    "doc-titles" => TocPolicy::DocTitles,
});

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingOutputPolicy {
    /// Refuse to replace it.
    #[default]
    Fail,
    /// Replace it.
    Overwrite,
    /// Write next to it as `name(1).pdf`, `name(2).pdf`...
    Rename,
    /// Leave it alone and report the task as skipped.
    Skip,
}

policy_from_str!(ExistingOutputPolicy, "existing output policy", {
    "fail" => ExistingOutputPolicy::Fail,
    "overwrite" => ExistingOutputPolicy::Overwrite,
    "rename" => ExistingOutputPolicy::Rename,
    "skip" => ExistingOutputPolicy::Skip,
});

/// Compression applied when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionLevel {
    /// Streams are written as they are.
    None,
    /// Streams are Flate-compressed.
    #[default]
    Standard,
    /// Compression plus removal of unreferenced objects.
    Maximum,
}

policy_from_str!(CompressionLevel, "compression level", {
    "none" => CompressionLevel::None,
    "standard" => CompressionLevel::Standard,
    "maximum" => CompressionLevel::Maximum,
});

/// Document information set on the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords.
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if all fields are empty.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }
}

/// Where and how the result is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Destination file.
    pub path: PathBuf,
    /// Behavior when `path` exists.
    pub existing_output: ExistingOutputPolicy,
    /// Save-time compression.
    pub compression: CompressionLevel,
    /// PDF version declared in the header.
    pub version: String,
    /// Document information overrides.
    pub metadata: Metadata,
}

impl OutputTarget {
    /// Target with default policies.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            existing_output: ExistingOutputPolicy::default(),
            compression: CompressionLevel::default(),
            version: DEFAULT_VERSION.to_string(),
            metadata: Metadata::default(),
        }
    }

    /// Replace the existing output policy.
    pub fn with_existing_output(mut self, policy: ExistingOutputPolicy) -> Self {
        self.existing_output = policy;
        self
    }

    /// Validate the target on its own.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(StitchError::invalid_parameters("Output path is empty"));
        }
        if self.path.is_dir() {
            return Err(StitchError::invalid_parameters(format!(
                "Output path is a directory: {}",
                self.path.display()
            )));
        }
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(StitchError::invalid_parameters(format!(
                "Unsupported PDF version '{}'. Valid options: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }
        Ok(())
    }

    fn reject_as_input(&self, source: &Source) -> Result<()> {
        if source.path() == Some(self.path.as_path()) {
            return Err(StitchError::invalid_parameters(format!(
                "Output file cannot be one of the inputs: {}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Everything a merge needs to run.
#[derive(Debug, Clone)]
pub struct MergeParameters {
    /// Inputs in output order.
    pub inputs: Vec<MergeInput>,
    /// Output target.
    pub output: OutputTarget,
    /// Bookmark handling.
    pub outline_policy: OutlinePolicy,
    /// Form handling.
    pub acroform_policy: AcroFormPolicy,
    /// Page label handling.
    pub page_labels_policy: PageLabelsPolicy,
    /// Table of contents generation.
    pub toc_policy: TocPolicy,
    /// Pad every input to an even number of pages.
    pub blank_page_if_odd: bool,
    /// Stamp "<file name> - <page>" on every imported page.
    pub filename_footer: bool,
    /// Scale every page to the width of the first page.
    pub normalize_page_sizes: bool,
    /// Treat the first input as a cover: no ToC entry, ToC placed after it.
    pub first_input_cover_title: bool,
}

impl MergeParameters {
    /// Parameters with default policies and no inputs.
    pub fn new(output: OutputTarget) -> Self {
        Self {
            inputs: Vec::new(),
            output,
            outline_policy: OutlinePolicy::default(),
            acroform_policy: AcroFormPolicy::default(),
            page_labels_policy: PageLabelsPolicy::default(),
            toc_policy: TocPolicy::default(),
            blank_page_if_odd: false,
            filename_footer: false,
            normalize_page_sizes: false,
            first_input_cover_title: false,
        }
    }

    /// Append an input.
    pub fn with_input(mut self, input: MergeInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Check that the parameters describe a runnable merge.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(StitchError::NoInputs);
        }
        self.output.validate()?;
        for input in &self.inputs {
            self.output.reject_as_input(input.source())?;
        }
        Ok(())
    }
}

/// Everything an alternate mix needs to run.
#[derive(Debug, Clone)]
pub struct AlternateMixParameters {
    /// Inputs, visited round-robin.
    pub inputs: Vec<PdfMixInput>,
    /// Output target.
    pub output: OutputTarget,
}

impl AlternateMixParameters {
    /// Parameters with no inputs.
    pub fn new(output: OutputTarget) -> Self {
        Self {
            inputs: Vec::new(),
            output,
        }
    }

    /// Append an input.
    pub fn with_input(mut self, input: PdfMixInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Check that the parameters describe a runnable mix.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(StitchError::NoInputs);
        }
        self.output.validate()?;
        for input in &self.inputs {
            if input.step == 0 {
                return Err(StitchError::invalid_parameters(format!(
                    "Step for '{}' must be at least 1",
                    input.source.name()
                )));
            }
            self.output.reject_as_input(&input.source)?;
        }
        Ok(())
    }
}
