//! The merge pipeline.
//!
//! Inputs are processed strictly in order because page numbers, ToC
//! entries and page label ranges are cumulative. All state of one run lives
//! in a [`MergeRun`] owned by [`MergeTask::execute`]; the destination
//! document is dropped unpublished if anything fails or the task is
//! cancelled.

use lopdf::Document;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::config::MergeParameters;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::input::{MergeInput, PageRangeSelection};
use crate::io::{PdfReader, PdfWriter, PublishOutcome, SourceDocument};
use crate::merge::acroform::{AcroFormsMerger, clip_signatures};
use crate::merge::annotations::{distill_annotations, drop_unmerged_widgets};
use crate::merge::document::DestinationDocument;
use crate::merge::footer::FooterWriter;
use crate::merge::metadata::MetadataManager;
use crate::merge::normalize::normalize_page_sizes;
use crate::merge::outline::OutlineMerger;
use crate::merge::page_labels::PageLabelsMerger;
use crate::merge::pages::PageImporter;
use crate::merge::toc::TableOfContentsCreator;

/// Statistics about a finished task.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Number of inputs processed.
    pub inputs: usize,
    /// Pages in the output, generated ones included.
    pub pages: usize,
    /// Pages of the generated table of contents.
    pub toc_pages: usize,
    /// Blank pages added after inputs with an odd page count.
    pub blank_pages: usize,
    /// Pages skipped in lenient mode.
    pub skipped_pages: usize,
    /// Outline entries at every level.
    pub outline_entries: usize,
    /// Merged form fields.
    pub form_fields: usize,
    /// Size of the written output, 0 if skipped.
    pub output_size: u64,
    /// Wall time of the whole task.
    pub elapsed: Duration,
}

/// Result of a successful task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// What happened to the output file.
    pub output: PublishOutcome,
    /// Numbers describing the result.
    pub statistics: MergeStatistics,
    /// Problems that did not stop the task.
    pub warnings: Vec<String>,
}

impl MergeOutcome {
    pub(crate) fn new(output: PublishOutcome, mut statistics: MergeStatistics, warnings: Vec<String>) -> Self {
        if let PublishOutcome::Written(written) = &output {
            statistics.output_size = written.file_size;
        }
        Self {
            output,
            statistics,
            warnings,
        }
    }
}

/// Merges inputs into one document and publishes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeTask {
    reader: PdfReader,
    writer: PdfWriter,
    metadata: MetadataManager,
}

impl MergeTask {
    /// Create a new merge task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the merge described by `params`.
    ///
    /// # Errors
    ///
    /// - Invalid parameters, or an output that exists under the
    ///   [`Fail`](crate::config::ExistingOutputPolicy::Fail) policy.
    /// - A source that cannot be opened.
    /// - A page that cannot be imported, unless the context is lenient.
    /// - [`StitchError::Cancelled`](crate::error::StitchError::Cancelled)
    ///   when the context's token is tripped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pdfstitch::config::{MergeParameters, OutputTarget, TocPolicy};
    /// use pdfstitch::context::ExecutionContext;
    /// use pdfstitch::input::{MergeInput, Source};
    /// use pdfstitch::merge::MergeTask;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut params = MergeParameters::new(OutputTarget::new("book.pdf"))
    ///     .with_input(MergeInput::all_pages(Source::file("part1.pdf")))
    ///     .with_input(MergeInput::all_pages(Source::file("part2.pdf")));
    /// params.toc_policy = TocPolicy::FileNames;
    ///
    /// let outcome = MergeTask::new().execute(&params, &mut ExecutionContext::new()).await?;
    /// println!("{} pages", outcome.statistics.pages);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(&self, params: &MergeParameters, ctx: &mut ExecutionContext) -> Result<MergeOutcome> {
        let start = Instant::now();
        params.validate()?;
        self.writer.preflight(&params.output).await?;

        let total = params.inputs.len();
        info!(inputs = total, output = %params.output.path.display(), "Starting merge");
        let mut run = MergeRun::new(params);

        for (index, input) in params.inputs.iter().enumerate() {
            ctx.assert_not_cancelled()?;
            let source = self.open(input).await?;
            run.add_input(index, &source, &input.selection(), ctx)?;
            ctx.steps_completed(index + 1, total);
        }

        ctx.assert_not_cancelled()?;
        let (mut document, mut statistics) = run.finish()?;
        self.metadata.set_metadata(&mut document, &params.output.metadata)?;

        ctx.assert_not_cancelled()?;
        let output = self.writer.save(document, &params.output).await?;
        statistics.elapsed = start.elapsed();
        info!(
            pages = statistics.pages,
            elapsed_ms = statistics.elapsed.as_millis() as u64,
            "Merge finished"
        );
        Ok(MergeOutcome::new(output, statistics, ctx.take_warnings()))
    }

    async fn open(&self, input: &MergeInput) -> Result<SourceDocument> {
        match input {
            MergeInput::Pdf(pdf) => self.reader.open(&pdf.source).await,
            MergeInput::Image(image) => self.reader.open_image(&image.source).await,
        }
    }
}

/// Pages of the input being imported.
struct InputPages {
    in_toc: bool,
    toc_title: Option<String>,
    /// `(source page number, destination page index)`
    imported: Vec<(u32, usize)>,
}

/// State of one merge run.
struct MergeRun {
    dest: DestinationDocument,
    outline: OutlineMerger,
    forms: AcroFormsMerger,
    labels: PageLabelsMerger,
    toc: TableOfContentsCreator,
    footer: FooterWriter,
    blank_page_if_odd: bool,
    normalize_page_sizes: bool,
    cover_title: bool,
    current_page_size: Rectangle,
    first_input_pages: usize,
    statistics: MergeStatistics,
}

impl MergeRun {
    fn new(params: &MergeParameters) -> Self {
        let cover_title = params.first_input_cover_title;
        let expected_entries = if cover_title {
            params.inputs.len().saturating_sub(1)
        } else {
            params.inputs.len()
        };
        Self {
            dest: DestinationDocument::new(&params.output.version),
            outline: OutlineMerger::new(params.outline_policy),
            forms: AcroFormsMerger::new(params.acroform_policy),
            labels: PageLabelsMerger::new(params.page_labels_policy),
            toc: TableOfContentsCreator::new(params.toc_policy, expected_entries),
            footer: FooterWriter::new(params.filename_footer),
            blank_page_if_odd: params.blank_page_if_odd,
            normalize_page_sizes: params.normalize_page_sizes,
            cover_title,
            current_page_size: Rectangle::A4,
            first_input_pages: 0,
            statistics: MergeStatistics::default(),
        }
    }

    /// Import the selected pages of input `index` and merge everything that
    /// hangs off them.
    fn add_input(
        &mut self,
        index: usize,
        source: &SourceDocument,
        selection: &PageRangeSelection,
        ctx: &mut ExecutionContext,
    ) -> Result<()> {
        let pages = selection.resolve(source.page_count());
        debug!(source = source.name(), selected = pages.len(), "Merging input");

        let mut importer = PageImporter::new(source);
        let mut input = self.start_input(index, source);
        for number in pages {
            self.add_page(&mut importer, &mut input, number, ctx)?;
        }
        self.complete_input(index, importer, input)
    }

    fn start_input(&self, index: usize, source: &SourceDocument) -> InputPages {
        let in_toc = !(self.cover_title && index == 0);
        InputPages {
            in_toc,
            toc_title: (in_toc && self.toc.should_generate_toc()).then(|| self.toc.title_for(source)),
            imported: Vec::new(),
        }
    }

    /// Import one page, then add its ToC entry and footer.
    fn add_page(
        &mut self,
        importer: &mut PageImporter<'_>,
        input: &mut InputPages,
        number: u32,
        ctx: &mut ExecutionContext,
    ) -> Result<()> {
        ctx.assert_not_cancelled()?;
        let source = importer.source();
        let page = match importer.import_page(&mut self.dest, number) {
            Ok(page) => page,
            Err(err) => {
                ctx.assert_lenient(err)?;
                self.statistics.skipped_pages += 1;
                return Ok(());
            }
        };
        trace!(source = source.name(), page = number, "Imported page");
        self.current_page_size = page.display_size();
        let dest_index = self.dest.page_count() - 1;
        input.imported.push((number, dest_index));

        let page_number = if input.in_toc {
            if input.imported.len() == 1 {
                self.toc.page_size_if_not_set(page.display_size());
            }
            dest_index + 1 + self.toc.toc_number_of_pages()
        } else {
            dest_index + 1
        };
        if let Some(title) = input.toc_title.take() {
            self.toc.append_item(title, page_number, page.id);
        }
        self.footer
            .add_footer(&mut self.dest, &page, source.base_name(), page_number)
    }

    /// Merge outline, annotations, form and labels of a fully imported input.
    fn complete_input(&mut self, index: usize, mut importer: PageImporter<'_>, input: InputPages) -> Result<()> {
        let source = importer.source();
        self.outline.update_outline(&importer);
        let mut annotations = distill_annotations(&importer, &mut self.dest);
        let clipped = clip_signatures(source, &mut self.dest, &annotations);
        if clipped > 0 {
            debug!(source = source.name(), clipped, "Cleared signatures");
        }
        let merged_widgets = self
            .forms
            .merge_form(&mut importer, &mut self.dest, &annotations, index + 1);
        drop_unmerged_widgets(&importer, &mut self.dest, &mut annotations, &merged_widgets);

        if self.blank_page_if_odd && self.dest.page_count() % 2 == 1 {
            self.dest.add_blank_page(self.current_page_size);
            self.statistics.blank_pages += 1;
        }
        self.labels.add(source, &input.imported);

        if index == 0 {
            self.first_input_pages = self.dest.page_count();
        }
        self.statistics.inputs += 1;
        Ok(())
    }

    /// Attach the merged structures, insert the ToC and hand out the document.
    fn finish(mut self) -> Result<(Document, MergeStatistics)> {
        self.outline.attach(&mut self.dest)?;
        self.forms.attach(&mut self.dest)?;

        if self.normalize_page_sizes {
            normalize_page_sizes(&mut self.dest)?;
        }

        if self.toc.has_toc() {
            let before = if self.cover_title { self.first_input_pages } else { 0 };
            let pages_before = self.dest.page_count();
            let inserted = self.toc.add_toc(&mut self.dest, before)?;
            self.labels.insert_pages(before, inserted, pages_before);
            self.statistics.toc_pages = inserted;
        }
        self.labels.attach(&mut self.dest)?;

        let mut statistics = self.statistics;
        statistics.pages = self.dest.page_count();
        statistics.outline_entries = self.outline.entry_count();
        statistics.form_fields = self.forms.field_count();
        Ok((self.dest.finish(), statistics))
    }
}
