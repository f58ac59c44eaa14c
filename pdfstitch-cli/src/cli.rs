//! CLI argument parsing for pdfstitch.
//!
//! Inputs are given as `FILE[:PAGES]`, for example `report.pdf:1-3,7-`.
//! File parts may be glob patterns; every match gets the same page
//! selection. PNG and JPEG files are merged as one page images.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use pdfstitch::config::{
    AcroFormPolicy, AlternateMixParameters, CompressionLevel, ExistingOutputPolicy, MergeParameters,
    Metadata, OutlinePolicy, OutputTarget, PageLabelsPolicy, TocPolicy,
};
use pdfstitch::error::{Result, StitchError};
use pdfstitch::input::{MergeInput, PageRangeSelection, PdfMixInput, Source};
use pdfstitch::utils::collect_paths_for_patterns;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Compose PDF documents.
///
/// pdfstitch merges PDF files and images into one document, keeping
/// outlines, forms and page labels, and can add a table of contents.
#[derive(Parser, Debug)]
#[command(name = "pdfstitch")]
#[command(version)]
#[command(about = "Compose PDF documents", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Task to run
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output - log pipeline steps and print statistics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print the task outcome as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Skip pages that cannot be imported instead of failing
    #[arg(long, global = true)]
    pub lenient: bool,
}

/// Available tasks.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge inputs one after the other
    ///
    /// Examples:
    ///   pdfstitch merge cover.pdf chapters/*.pdf -o book.pdf --toc file-names --cover-title
    ///   pdfstitch merge a.pdf:1-3 scan.png b.pdf:5- -o out.pdf
    Merge(MergeArgs),

    /// Interleave the pages of the inputs
    ///
    /// Example, fronts and backs scanned separately:
    ///   pdfstitch mix fronts.pdf backs.pdf --reverse 2 -o document.pdf
    Mix(MixArgs),
}

/// Options shared by every task that writes a document.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// What to do if the output already exists
    ///
    /// - fail: stop with an error (default)
    /// - overwrite: replace the file
    /// - rename: write to "name(1).pdf", "name(2).pdf"...
    /// - skip: leave the existing file alone
    #[arg(long, value_name = "POLICY", default_value = "fail")]
    pub existing_output: ExistingOutputPolicy,

    /// Compression level for the output: none, standard or maximum
    #[arg(short, long, value_name = "LEVEL", default_value = "standard")]
    pub compression: CompressionLevel,

    /// PDF version declared by the output
    #[arg(long, value_name = "VERSION", default_value = pdfstitch::config::DEFAULT_VERSION)]
    pub pdf_version: String,

    /// Set title metadata for the output
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for the output
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for the output
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for the output (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,
}

impl OutputArgs {
    /// Output target described by these options.
    pub fn to_target(&self) -> OutputTarget {
        let mut target = OutputTarget::new(&self.output).with_existing_output(self.existing_output);
        target.compression = self.compression;
        target.version = self.pdf_version.clone();
        target.metadata = Metadata {
            title: self.title.clone(),
            author: self.author.clone(),
            subject: self.subject.clone(),
            keywords: self.keywords.clone(),
        };
        target
    }
}

/// Arguments of `pdfstitch merge`.
#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Inputs in merge order, as FILE[:PAGES]
    #[arg(required = true, value_name = "FILE[:PAGES]")]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Outline handling: retain, discard, one-entry-each-doc, retain-as-one-entry
    #[arg(long, value_name = "POLICY", default_value = "retain")]
    pub outline: OutlinePolicy,

    /// Form handling: merge, merge-renaming-existing-fields, discard
    #[arg(long, value_name = "POLICY", default_value = "merge-renaming-existing-fields")]
    pub forms: AcroFormPolicy,

    /// Page labels handling: retain or discard
    #[arg(long, value_name = "POLICY", default_value = "discard")]
    pub page_labels: PageLabelsPolicy,

    /// Generate a table of contents: none, file-names, doc-titles
    #[arg(long, value_name = "POLICY", default_value = "none")]
    pub toc: TocPolicy,

    /// Add a blank page after every input with an odd number of pages
    #[arg(long)]
    pub blank_page_if_odd: bool,

    /// Stamp "<file name> - <page>" at the bottom of every page
    #[arg(long)]
    pub footer: bool,

    /// Scale every page to the width of the first one
    #[arg(long)]
    pub normalize_page_sizes: bool,

    /// Treat the first input as a cover: no ToC entry, ToC placed after it
    #[arg(long)]
    pub cover_title: bool,
}

impl MergeArgs {
    /// Merge parameters described by these arguments.
    pub fn to_parameters(&self) -> Result<MergeParameters> {
        let mut params = MergeParameters::new(self.output.to_target());
        for arg in &self.inputs {
            let (pattern, selection) = parse_input_arg(arg)?;
            for path in collect_paths_for_patterns([pattern])? {
                let input = if is_image(&path) {
                    MergeInput::image(Source::file(path))
                } else {
                    MergeInput::pdf(Source::file(path), selection.clone())
                };
                params.inputs.push(input);
            }
        }
        params.outline_policy = self.outline;
        params.acroform_policy = self.forms;
        params.page_labels_policy = self.page_labels;
        params.toc_policy = self.toc;
        params.blank_page_if_odd = self.blank_page_if_odd;
        params.filename_footer = self.footer;
        params.normalize_page_sizes = self.normalize_page_sizes;
        params.first_input_cover_title = self.cover_title;
        params.validate()?;
        Ok(params)
    }
}

/// Arguments of `pdfstitch mix`.
#[derive(Args, Debug, Clone)]
pub struct MixArgs {
    /// Inputs to interleave, as FILE[:PAGES]
    #[arg(required = true, value_name = "FILE[:PAGES]")]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Take the pages of input N (1-based) in reverse order; repeatable
    #[arg(long, value_name = "N")]
    pub reverse: Vec<usize>,

    /// Number of pages taken from each input in turn
    #[arg(long, value_name = "PAGES", default_value_t = 1)]
    pub step: usize,
}

impl MixArgs {
    /// Mix parameters described by these arguments.
    pub fn to_parameters(&self) -> Result<AlternateMixParameters> {
        let mut params = AlternateMixParameters::new(self.output.to_target());
        for arg in &self.inputs {
            let (pattern, selection) = parse_input_arg(arg)?;
            for path in collect_paths_for_patterns([pattern])? {
                let mut input = PdfMixInput::new(Source::file(path));
                input.selection = selection.clone();
                input.step = self.step;
                params.inputs.push(input);
            }
        }
        for &number in &self.reverse {
            let input = number
                .checked_sub(1)
                .and_then(|index| params.inputs.get_mut(index))
                .ok_or_else(|| {
                    StitchError::invalid_parameters(format!("--reverse {number} does not name an input"))
                })?;
            input.reverse = true;
        }
        params.validate()?;
        Ok(params)
    }
}

/// Split `FILE[:PAGES]` into the file pattern and its page selection.
///
/// The suffix after the last `:` is only taken as a selection if it looks
/// like one, so paths containing colons still work.
pub fn parse_input_arg(arg: &str) -> Result<(String, PageRangeSelection)> {
    if let Some((path, pages)) = arg.rsplit_once(':')
        && !path.is_empty()
        && looks_like_selection(pages)
    {
        return Ok((path.to_string(), pages.parse()?));
    }
    Ok((arg.to_string(), PageRangeSelection::all()))
}

fn looks_like_selection(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case("all")
        || (!text.is_empty()
            && text.chars().any(|c| c.is_ascii_digit())
            && text.chars().all(|c| c.is_ascii_digit() || matches!(c, '-' | ',' | ' ')))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|image| ext.eq_ignore_ascii_case(image)))
}
