//! Task inputs: where a document comes from and which of its pages to use.
//!
//! # Examples
//!
//! ```
//! use pdfstitch::input::{MergeInput, PageRangeSelection, Source};
//!
//! let selection: PageRangeSelection = "1-3,7-".parse().unwrap();
//! assert_eq!(selection.resolve(9), vec![1, 2, 3, 7, 8, 9]);
//!
//! let input = MergeInput::pdf(Source::file("chapter1.pdf"), selection);
//! assert_eq!(input.source().base_name(), "chapter1");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, StitchError};
use crate::utils::base_name;

/// A named provider of document bytes.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file on disk.
    File(PathBuf),
    /// Bytes already in memory.
    Bytes {
        /// Name used in messages, footers and bookmarks.
        name: String,
        /// Document content.
        bytes: Arc<[u8]>,
    },
}

impl Source {
    /// Source backed by a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Source backed by in-memory bytes.
    pub fn bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Drain a stream into an in-memory source.
    pub fn from_reader(name: impl Into<String>, mut reader: impl Read) -> std::io::Result<Self> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(Self::bytes(name, buffer))
    }

    /// File name of the source, without directories.
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    /// Name without extension.
    pub fn base_name(&self) -> String {
        base_name(&self.name())
    }

    /// Path of a file source.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Bytes { .. } => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Bytes { name, bytes } => write!(f, "{name} ({} bytes in memory)", bytes.len()),
        }
    }
}

/// An inclusive page range, open ended when `end` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: Option<u32>,
}

impl PageRange {
    /// Range `start..=end`.
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 {
            return Err(StitchError::invalid_selection(
                format!("{start}-{end}"),
                "page numbers start at 1",
            ));
        }
        if end < start {
            return Err(StitchError::invalid_selection(
                format!("{start}-{end}"),
                "range end is before its start",
            ));
        }
        Ok(Self {
            start,
            end: Some(end),
        })
    }

    /// A single page.
    pub fn single(page: u32) -> Result<Self> {
        Self::new(page, page)
    }

    /// Range from `start` to the last page.
    pub fn from_start(start: u32) -> Result<Self> {
        if start == 0 {
            return Err(StitchError::invalid_selection(
                format!("{start}-"),
                "page numbers start at 1",
            ));
        }
        Ok(Self { start, end: None })
    }

    /// First page of the range.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last page of the range, if bounded.
    pub fn end(&self) -> Option<u32> {
        self.end
    }

    /// Check if a page number falls in the range.
    pub fn contains(&self, page: u32) -> bool {
        page >= self.start && self.end.is_none_or(|end| page <= end)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

impl FromStr for PageRange {
    type Err = StitchError;

    fn from_str(s: &str) -> Result<Self> {
        let part = s.trim();
        let parse = |value: &str| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| StitchError::invalid_selection(s, format!("'{value}' is not a page number")))
        };

        match part.split_once('-') {
            Some((start, end)) if end.trim().is_empty() => Self::from_start(parse(start)?),
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => Self::single(parse(part)?),
        }
    }
}

/// A set of page ranges. An empty selection means all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRangeSelection {
    ranges: Vec<PageRange>,
}

impl PageRangeSelection {
    /// Selection of every page.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selection made of the given ranges, in iteration order.
    pub fn from_ranges(ranges: impl IntoIterator<Item = PageRange>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
        }
    }

    /// Add a range after the existing ones.
    pub fn push(&mut self, range: PageRange) {
        self.ranges.push(range);
    }

    /// Ranges in insertion order.
    pub fn ranges(&self) -> &[PageRange] {
        &self.ranges
    }

    /// True when no range was given.
    pub fn is_all_pages(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Page numbers to import from a document with `total_pages` pages.
    ///
    /// Ranges are clipped to the document and expanded in insertion order;
    /// a page already produced by an earlier range is not repeated.
    pub fn resolve(&self, total_pages: u32) -> Vec<u32> {
        if self.is_all_pages() {
            return (1..=total_pages).collect();
        }

        let mut seen = HashSet::new();
        let mut pages = Vec::new();
        for range in &self.ranges {
            let end = range.end.unwrap_or(total_pages).min(total_pages);
            for page in range.start..=end {
                if seen.insert(page) {
                    pages.push(page);
                }
            }
        }
        pages
    }
}

impl fmt::Display for PageRangeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_pages() {
            return write!(f, "all");
        }
        let parts: Vec<String> = self.ranges.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for PageRangeSelection {
    type Err = StitchError;

    /// Parse `"1-3,5,8-"`. `"all"` and the empty string select every page.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        trimmed
            .split(',')
            .map(str::parse::<PageRange>)
            .collect::<Result<Vec<_>>>()
            .map(Self::from_ranges)
    }
}

/// A PDF document and the pages to take from it.
#[derive(Debug, Clone)]
pub struct PdfMergeInput {
    /// Where the document comes from.
    pub source: Source,
    /// Pages to import, all when empty.
    pub selection: PageRangeSelection,
}

/// An image that becomes a single page.
#[derive(Debug, Clone)]
pub struct ImageMergeInput {
    /// Where the image comes from.
    pub source: Source,
}

/// One entry of a merge, in output order.
#[derive(Debug, Clone)]
pub enum MergeInput {
    /// A PDF document.
    Pdf(PdfMergeInput),
    /// A PNG or JPEG image.
    Image(ImageMergeInput),
}

impl MergeInput {
    /// PDF input with a page selection.
    pub fn pdf(source: Source, selection: PageRangeSelection) -> Self {
        Self::Pdf(PdfMergeInput { source, selection })
    }

    /// PDF input taking every page.
    pub fn all_pages(source: Source) -> Self {
        Self::pdf(source, PageRangeSelection::all())
    }

    /// Image input.
    pub fn image(source: Source) -> Self {
        Self::Image(ImageMergeInput { source })
    }

    /// Input source.
    pub fn source(&self) -> &Source {
        match self {
            Self::Pdf(input) => &input.source,
            Self::Image(input) => &input.source,
        }
    }

    /// Page selection; images always contribute their only page.
    pub fn selection(&self) -> PageRangeSelection {
        match self {
            Self::Pdf(input) => input.selection.clone(),
            Self::Image(_) => PageRangeSelection::all(),
        }
    }
}

/// A document taking part in an alternate mix.
#[derive(Debug, Clone)]
pub struct PdfMixInput {
    /// Where the document comes from.
    pub source: Source,
    /// Pages to use, all when empty.
    pub selection: PageRangeSelection,
    /// Consume the selected pages last to first.
    pub reverse: bool,
    /// Pages taken from this input at every turn.
    pub step: usize,
}

impl PdfMixInput {
    /// Mix input taking one page at a time, in order.
    pub fn new(source: Source) -> Self {
        Self {
            source,
            selection: PageRangeSelection::all(),
            reverse: false,
            step: 1,
        }
    }

    /// Page numbers in the order they are consumed.
    pub fn ordered_pages(&self, total_pages: u32) -> Vec<u32> {
        let mut pages = self.selection.resolve(total_pages);
        if self.reverse {
            pages.reverse();
        }
        pages
    }
}
