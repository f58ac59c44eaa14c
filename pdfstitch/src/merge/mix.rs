//! Alternate mix: interleaving the pages of several inputs.
//!
//! Typical use is putting back together the fronts and backs of a stack of
//! sheets scanned in two passes, the second one in reverse order.

use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::config::AlternateMixParameters;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::io::{PdfReader, PdfWriter, SourceDocument};
use crate::merge::annotations::{distill_annotations, drop_unmerged_widgets};
use crate::merge::document::DestinationDocument;
use crate::merge::merger::{MergeOutcome, MergeStatistics};
use crate::merge::metadata::MetadataManager;
use crate::merge::pages::PageImporter;

/// Mixes inputs page by page and publishes the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlternateMixTask {
    reader: PdfReader,
    writer: PdfWriter,
    metadata: MetadataManager,
}

impl AlternateMixTask {
    /// Create a new mix task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the mix described by `params`.
    ///
    /// Takes `step` pages of each input in turn until all inputs are
    /// exhausted. Links between pages of the same input are kept; outlines
    /// and forms are not carried over.
    pub async fn execute(&self, params: &AlternateMixParameters, ctx: &mut ExecutionContext) -> Result<MergeOutcome> {
        let start = Instant::now();
        params.validate()?;
        self.writer.preflight(&params.output).await?;

        let mut sources = Vec::with_capacity(params.inputs.len());
        for input in &params.inputs {
            ctx.assert_not_cancelled()?;
            sources.push(self.reader.open(&input.source).await?);
        }
        let orders: Vec<Vec<u32>> = params
            .inputs
            .iter()
            .zip(&sources)
            .map(|(input, source)| input.ordered_pages(source.page_count()))
            .collect();
        let steps: Vec<usize> = params.inputs.iter().map(|input| input.step).collect();
        info!(inputs = sources.len(), output = %params.output.path.display(), "Starting alternate mix");

        let mut dest = DestinationDocument::new(&params.output.version);
        let skipped = mix_pages(&mut dest, &sources, &orders, &steps, ctx)?;

        let statistics = MergeStatistics {
            inputs: sources.len(),
            pages: dest.page_count(),
            skipped_pages: skipped,
            ..MergeStatistics::default()
        };
        drop(sources);

        let mut document = dest.finish();
        self.metadata.set_metadata(&mut document, &params.output.metadata)?;
        ctx.assert_not_cancelled()?;
        let output = self.writer.save(document, &params.output).await?;

        let mut outcome = MergeOutcome::new(output, statistics, ctx.take_warnings());
        outcome.statistics.elapsed = start.elapsed();
        Ok(outcome)
    }
}

/// Import pages round robin; returns the number of skipped pages.
fn mix_pages(
    dest: &mut DestinationDocument,
    sources: &[SourceDocument],
    orders: &[Vec<u32>],
    steps: &[usize],
    ctx: &mut ExecutionContext,
) -> Result<usize> {
    let total: usize = orders.iter().map(Vec::len).sum();
    let mut importers: Vec<PageImporter<'_>> = sources.iter().map(PageImporter::new).collect();
    let mut cursors = vec![0usize; orders.len()];
    let mut processed = 0;
    let mut skipped = 0;

    while processed < total {
        for (index, importer) in importers.iter_mut().enumerate() {
            let order = &orders[index];
            let end = (cursors[index] + steps[index]).min(order.len());
            for &number in &order[cursors[index]..end] {
                ctx.assert_not_cancelled()?;
                match importer.import_page(dest, number) {
                    Ok(_) => trace!(source = importer.source().name(), page = number, "Mixed page"),
                    Err(err) => {
                        ctx.assert_lenient(err)?;
                        skipped += 1;
                    }
                }
                processed += 1;
                ctx.steps_completed(processed, total);
            }
            cursors[index] = end;
        }
    }

    // forms are not mixed, so no widget has a field to belong to
    let no_fields = HashSet::new();
    for importer in &importers {
        let mut kept = distill_annotations(importer, dest);
        drop_unmerged_widgets(importer, dest, &mut kept, &no_fields);
        debug!(source = importer.source().name(), annotations = kept.len(), "Resolved annotations");
    }
    Ok(skipped)
}
