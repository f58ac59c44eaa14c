//! Generated table of contents.
//!
//! Entries are collected while pages are imported, one per contributing
//! input. The number of ToC pages must be known before the first entry's
//! page number is final, so it is computed once from the number of inputs
//! expected to contribute and the ToC page size, and the generated section
//! always has exactly that many pages.

use lopdf::{Dictionary, Object, ObjectId, dictionary};
use tracing::debug;

use crate::config::TocPolicy;
use crate::error::Result;
use crate::geometry::Rectangle;
use crate::io::reader::SourceDocument;
use crate::merge::document::DestinationDocument;
use crate::merge::text::{show_text, string_width, truncate_to_width};

/// Font size of the ToC rows.
pub const FONT_SIZE: f32 = 14.0;
/// Page margin on every side.
pub const MARGIN: f32 = 50.0;
/// Distance between two rows.
pub const LINE_HEIGHT: f32 = 23.0;

/// Space between the title, the leader dots and the page number.
const GAP: f32 = 6.0;

#[derive(Debug, Clone)]
struct TocItem {
    title: String,
    page_number: usize,
    target: ObjectId,
}

/// Collects ToC entries and writes the ToC pages.
#[derive(Debug, Clone)]
pub struct TableOfContentsCreator {
    policy: TocPolicy,
    expected_entries: usize,
    page_size: Option<Rectangle>,
    number_of_pages: Option<usize>,
    items: Vec<TocItem>,
}

impl TableOfContentsCreator {
    /// Creator for `policy`, expecting at most `expected_entries` entries.
    pub fn new(policy: TocPolicy, expected_entries: usize) -> Self {
        Self {
            policy,
            expected_entries,
            page_size: None,
            number_of_pages: None,
            items: Vec::new(),
        }
    }

    /// Whether a ToC is requested at all.
    pub fn should_generate_toc(&self) -> bool {
        self.policy != TocPolicy::None && self.expected_entries > 0
    }

    /// Entry title for a source according to the policy.
    pub fn title_for(&self, source: &SourceDocument) -> String {
        match self.policy {
            TocPolicy::DocTitles => source.title().unwrap_or_else(|| source.base_name().to_string()),
            TocPolicy::FileNames | TocPolicy::None => source.base_name().to_string(),
        }
    }

    /// Use `size` for the ToC pages unless a size was already chosen.
    pub fn page_size_if_not_set(&mut self, size: Rectangle) {
        if self.page_size.is_none() && self.number_of_pages.is_none() {
            self.page_size = Some(size);
        }
    }

    /// Size of the ToC pages.
    pub fn page_size(&self) -> Rectangle {
        self.page_size.unwrap_or(Rectangle::A4)
    }

    /// Rows that fit on one ToC page.
    pub fn rows_per_page(&self) -> usize {
        let usable = self.page_size().height() - 2.0 * MARGIN;
        ((usable / LINE_HEIGHT).floor() as usize).max(1)
    }

    /// Number of pages the ToC will occupy; fixed on first call.
    pub fn toc_number_of_pages(&mut self) -> usize {
        if !self.should_generate_toc() {
            return 0;
        }
        if let Some(pages) = self.number_of_pages {
            return pages;
        }
        let pages = self.expected_entries.div_ceil(self.rows_per_page());
        self.number_of_pages = Some(pages);
        pages
    }

    /// Add an entry; `page_number` is the final number of the target page.
    pub fn append_item(&mut self, title: impl Into<String>, page_number: usize, target: ObjectId) {
        self.items.push(TocItem {
            title: title.into(),
            page_number,
            target,
        });
    }

    /// Whether there is anything to write.
    pub fn has_toc(&self) -> bool {
        !self.items.is_empty()
    }

    /// Number of entries collected.
    pub fn entry_count(&self) -> usize {
        self.items.len()
    }

    /// Write the ToC pages and insert them before page index `before`.
    ///
    /// Returns the number of pages inserted.
    pub fn add_toc(&mut self, dest: &mut DestinationDocument, before: usize) -> Result<usize> {
        if !self.has_toc() {
            return Ok(0);
        }
        let page_count = self.toc_number_of_pages().max(1);
        let rows = self.rows_per_page();
        let size = self.page_size();
        let font = dest.helvetica();

        let mut page_ids = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let start = (index * rows).min(self.items.len());
            let end = ((index + 1) * rows).min(self.items.len());
            let page_id = self.write_page(dest, size, font, &self.items[start..end])?;
            page_ids.push(page_id);
        }

        dest.insert_pages(before, &page_ids);
        debug!(pages = page_count, entries = self.items.len(), before, "Inserted table of contents");
        Ok(page_count)
    }

    fn write_page(
        &self,
        dest: &mut DestinationDocument,
        size: Rectangle,
        font: ObjectId,
        items: &[TocItem],
    ) -> Result<ObjectId> {
        let page_id = dest.new_blank_page(size);
        let font_name = dest.add_font_resource(page_id, font)?;

        let left = size.llx + MARGIN;
        let right = size.urx - MARGIN;
        let mut operations = Vec::new();
        let mut annots = Vec::new();

        for (row, item) in items.iter().enumerate() {
            let baseline = size.ury - MARGIN - FONT_SIZE - row as f32 * LINE_HEIGHT;
            let number = item.page_number.to_string();
            let number_width = string_width(&number, FONT_SIZE);
            let title_room = (right - left - number_width - 2.0 * GAP).max(0.0);
            let title = truncate_to_width(&item.title, FONT_SIZE, title_room);
            let title_width = string_width(&title, FONT_SIZE);

            operations.extend(show_text(&font_name, FONT_SIZE, left, baseline, &title));
            let leader_start = left + title_width + GAP;
            let leader_end = right - number_width - GAP;
            let dot_width = string_width(".", FONT_SIZE);
            if leader_end > leader_start && dot_width > 0.0 {
                let dots = ((leader_end - leader_start) / dot_width).floor() as usize;
                let leader = ".".repeat(dots);
                let x = leader_end - string_width(&leader, FONT_SIZE);
                operations.extend(show_text(&font_name, FONT_SIZE, x, baseline, &leader));
            }
            operations.extend(show_text(&font_name, FONT_SIZE, right - number_width, baseline, &number));

            annots.push(Object::Reference(dest.add_object(link(
                item.target,
                [left, baseline - 4.0, right, baseline + FONT_SIZE],
            ))));
        }

        let content_id = dest.add_content_stream(operations)?;
        if let Some(page) = dest.dictionary_mut(page_id) {
            page.set("Contents", content_id);
            if !annots.is_empty() {
                page.set("Annots", annots);
            }
        }
        Ok(page_id)
    }
}

fn link(target: ObjectId, rect: [f32; 4]) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>(),
        "Border" => vec![0.into(), 0.into(), 0.into()],
        "Dest" => vec![
            Object::Reference(target),
            Object::Name(b"XYZ".to_vec()),
            Object::Null,
            Object::Null,
            Object::Null,
        ],
    }
}
