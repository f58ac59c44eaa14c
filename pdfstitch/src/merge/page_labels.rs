//! Page label merging.
//!
//! Label ranges are keyed by the destination page index where they start.
//! For every input a range starts at its first page; after that a new range
//! is emitted only where the labels stop following on from the previous
//! page, because the source switches ranges or the selection skips pages.

use lopdf::{Dictionary, Object, StringFormat};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::PageLabelsPolicy;
use crate::error::Result;
use crate::io::reader::SourceDocument;
use crate::merge::document::DestinationDocument;
use crate::utils::{number, resolve, resolve_dict, resolve_key};

const MAX_TREE_DEPTH: usize = 32;

/// Style and numbering of a label range.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLabel {
    /// Numbering style: `D`, `R`, `r`, `A` or `a`; `None` for prefix only.
    pub style: Option<Vec<u8>>,
    /// Prefix shown before the number, as raw string bytes.
    pub prefix: Option<Vec<u8>>,
    /// Number of the first page of the range.
    pub start: i64,
}

impl PageLabel {
    /// Decimal labels starting at `start`.
    pub fn decimal(start: i64) -> Self {
        Self {
            style: Some(b"D".to_vec()),
            prefix: None,
            start,
        }
    }

    /// Lowercase roman labels starting at 1.
    pub fn roman() -> Self {
        Self {
            style: Some(b"r".to_vec()),
            prefix: None,
            start: 1,
        }
    }

    /// The same range continued from number `start`.
    fn continued_at(&self, start: i64) -> Self {
        Self {
            start,
            ..self.clone()
        }
    }

    fn from_dictionary(doc: &lopdf::Document, dict: &Dictionary) -> Self {
        Self {
            style: resolve_key(doc, dict, b"S").and_then(|s| match s {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            }),
            prefix: resolve_key(doc, dict, b"P").and_then(|p| match p {
                Object::String(bytes, _) => Some(bytes.clone()),
                _ => None,
            }),
            start: resolve_key(doc, dict, b"St")
                .and_then(number)
                .map(|st| st as i64)
                .filter(|st| *st >= 1)
                .unwrap_or(1),
        }
    }

    fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", "PageLabel");
        if let Some(style) = &self.style {
            dict.set("S", Object::Name(style.clone()));
        }
        if let Some(prefix) = &self.prefix {
            dict.set("P", Object::String(prefix.clone(), StringFormat::Literal));
        }
        if self.start != 1 {
            dict.set("St", self.start);
        }
        dict
    }
}

/// Merges the page labels of all inputs.
#[derive(Debug, Clone)]
pub struct PageLabelsMerger {
    policy: PageLabelsPolicy,
    labels: BTreeMap<usize, PageLabel>,
    source_labels: bool,
}

impl PageLabelsMerger {
    /// Merger applying `policy`.
    pub fn new(policy: PageLabelsPolicy) -> Self {
        Self {
            policy,
            labels: BTreeMap::new(),
            source_labels: false,
        }
    }

    /// Add the labels of `source` for the imported pages.
    ///
    /// `pages` holds `(source page number, destination page index)` pairs in
    /// import order.
    pub fn add(&mut self, source: &SourceDocument, pages: &[(u32, usize)]) {
        if self.policy == PageLabelsPolicy::Discard || pages.is_empty() {
            return;
        }
        let ranges = read_labels(source);
        if ranges.is_empty() {
            if let Some((_, first)) = pages.first() {
                self.labels.insert(*first, PageLabel::decimal(1));
            }
            return;
        }
        self.source_labels = true;

        let mut previous: Option<(usize, i64, usize)> = None;
        for &(number, dest_index) in pages {
            let page_index = number.saturating_sub(1) as usize;
            let Some(range) = ranges.iter().rposition(|(start, _)| *start <= page_index) else {
                // pages before the first range have no label
                let unlabelled = PageLabel {
                    style: None,
                    prefix: None,
                    start: 1,
                };
                self.labels.insert(dest_index, unlabelled);
                previous = None;
                continue;
            };
            let (range_start, label) = &ranges[range];
            let value = label.start + (page_index - range_start) as i64;

            let follows = previous.is_some_and(|(prev_range, prev_value, prev_dest)| {
                prev_range == range && prev_value + 1 == value && prev_dest + 1 == dest_index
            });
            if !follows {
                self.labels.insert(dest_index, label.continued_at(value));
            }
            previous = Some((range, value, dest_index));
        }
        debug!(source = source.name(), ranges = self.labels.len(), "Merged page labels");
    }

    /// Account for `count` pages inserted at index `at`, labelling them in
    /// lowercase roman. `total` is the page count before the insertion.
    pub fn insert_pages(&mut self, at: usize, count: usize, total: usize) {
        if count == 0 || self.labels.is_empty() {
            return;
        }
        let active = self
            .labels
            .range(..=at)
            .next_back()
            .map(|(start, label)| (*start, label.clone()));

        let shifted = self.labels.split_off(&at);
        for (start, label) in shifted {
            self.labels.insert(start + count, label);
        }
        self.labels.insert(at, PageLabel::roman());

        if let Some((start, label)) = active
            && start < at
            && at < total
        {
            let resumed = label.continued_at(label.start + (at - start) as i64);
            self.labels.insert(at + count, resumed);
        }
    }

    /// Whether there is anything worth attaching.
    pub fn has_page_labels(&self) -> bool {
        self.source_labels && !self.labels.is_empty()
    }

    /// Label ranges keyed by destination page index.
    pub fn labels(&self) -> &BTreeMap<usize, PageLabel> {
        &self.labels
    }

    /// Write the number tree into the destination catalog.
    pub fn attach(&self, dest: &mut DestinationDocument) -> Result<()> {
        if !self.has_page_labels() {
            return Ok(());
        }
        let mut nums = Vec::with_capacity(self.labels.len() * 2);
        for (start, label) in &self.labels {
            nums.push(Object::Integer(*start as i64));
            nums.push(Object::Dictionary(label.to_dictionary()));
        }
        let mut tree = Dictionary::new();
        tree.set("Nums", nums);
        let tree_id = dest.add_object(tree);
        dest.set_catalog_entry("PageLabels", tree_id)
    }
}

/// Label ranges of a source, sorted by starting page index.
fn read_labels(source: &SourceDocument) -> Vec<(usize, PageLabel)> {
    let doc = source.document();
    let Some(tree) = source
        .catalog()
        .and_then(|catalog| resolve_dict(doc, catalog, b"PageLabels"))
    else {
        return Vec::new();
    };
    let mut ranges = Vec::new();
    collect_number_tree(doc, tree, &mut ranges, 0);
    ranges.sort_by_key(|(start, _)| *start);
    ranges.dedup_by_key(|(start, _)| *start);
    ranges
}

fn collect_number_tree(doc: &lopdf::Document, node: &Dictionary, ranges: &mut Vec<(usize, PageLabel)>, depth: usize) {
    if depth > MAX_TREE_DEPTH {
        return;
    }
    if let Some(Object::Array(nums)) = resolve_key(doc, node, b"Nums") {
        for pair in nums.chunks_exact(2) {
            let start = resolve(doc, &pair[0]).and_then(number);
            let label = match resolve(doc, &pair[1]) {
                Some(Object::Dictionary(dict)) => Some(PageLabel::from_dictionary(doc, dict)),
                _ => None,
            };
            if let (Some(start), Some(label)) = (start, label)
                && start >= 0.0
            {
                ranges.push((start as usize, label));
            }
        }
    }
    if let Some(Object::Array(kids)) = resolve_key(doc, node, b"Kids") {
        for kid in kids {
            if let Some(Object::Dictionary(kid)) = resolve(doc, kid) {
                collect_number_tree(doc, kid, ranges, depth + 1);
            }
        }
    }
}
