//! Outline (bookmark) merging.
//!
//! Each input's outline is read once all of its pages are imported, remapped
//! onto the destination pages and kept in memory. The merged tree is written
//! to the destination catalog at the end, and only if it has entries.

use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

use crate::config::OutlinePolicy;
use crate::error::Result;
use crate::io::reader::{Destination, SourceDocument};
use crate::merge::document::DestinationDocument;
use crate::merge::pages::{PageImporter, PageLookup};
use crate::utils::{encode_text_string, number, resolve, resolve_dict, resolve_key, text_string};

/// Deepest outline nesting that is read.
const MAX_OUTLINE_DEPTH: usize = 64;

/// A bookmark of the merged outline.
#[derive(Debug, Clone)]
pub struct OutlineEntry {
    /// Text shown in the viewer.
    pub title: String,
    /// Destination page, `None` for a plain folder.
    pub page: Option<ObjectId>,
    view: Vec<Object>,
    color: Option<Object>,
    flags: Option<Object>,
    open: bool,
    /// Nested bookmarks.
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    fn pointing_to(title: impl Into<String>, page: ObjectId) -> Self {
        Self {
            title: title.into(),
            page: Some(page),
            view: Vec::new(),
            color: None,
            flags: None,
            open: false,
            children: Vec::new(),
        }
    }

    /// This entry and all of its descendants.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OutlineEntry::count).sum::<usize>()
    }

    fn visible_descendants(&self) -> usize {
        if self.open { self.descendants_when_open() } else { 0 }
    }

    fn descendants_when_open(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.visible_descendants())
            .sum()
    }
}

/// Bookmark as read from a source.
struct SourceItem {
    title: String,
    target: Option<Destination>,
    color: Option<Object>,
    flags: Option<Object>,
    open: bool,
    children: Vec<SourceItem>,
}

/// Builds the merged outline according to an [`OutlinePolicy`].
#[derive(Debug, Clone)]
pub struct OutlineMerger {
    policy: OutlinePolicy,
    entries: Vec<OutlineEntry>,
}

impl OutlineMerger {
    /// Merger applying `policy`.
    pub fn new(policy: OutlinePolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    /// Add the outline of the input served by `importer`.
    pub fn update_outline(&mut self, importer: &PageImporter<'_>) {
        let source = importer.source();
        let pages = importer.pages();
        if pages.is_empty() {
            return;
        }

        match self.policy {
            OutlinePolicy::Discard => {}
            OutlinePolicy::Retain => {
                let remapped = remap(read_outline(source), pages);
                debug!(source = source.name(), entries = remapped.len(), "Retained outline");
                self.entries.extend(remapped);
            }
            OutlinePolicy::OneEntryEachDoc => {
                if let Some(first) = pages.first() {
                    self.entries.push(OutlineEntry::pointing_to(source.base_name(), first));
                }
            }
            OutlinePolicy::RetainAsOneEntry => {
                if let Some(first) = pages.first() {
                    let mut entry = OutlineEntry::pointing_to(source.base_name(), first);
                    entry.children = remap(read_outline(source), pages);
                    self.entries.push(entry);
                }
            }
        }
    }

    /// Whether any entry was produced.
    pub fn has_outline(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Top level entries.
    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    /// Number of entries at every level.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().map(OutlineEntry::count).sum()
    }

    /// Write the outline into the destination catalog, if there is one.
    pub fn attach(&self, dest: &mut DestinationDocument) -> Result<()> {
        if !self.has_outline() {
            return Ok(());
        }
        let root_id = dest.new_object_id();
        let mut root = Dictionary::new();
        root.set("Type", "Outlines");
        if let Some((first, last)) = write_entries(dest, &self.entries, root_id) {
            root.set("First", first);
            root.set("Last", last);
        }
        let visible: usize = self
            .entries
            .iter()
            .map(|entry| 1 + entry.visible_descendants())
            .sum();
        root.set("Count", visible as i64);
        dest.insert_object(root_id, root);
        dest.set_catalog_entry("Outlines", root_id)
    }
}

/// Read the outline tree of `source`. Loops and dangling links end a branch.
fn read_outline(source: &SourceDocument) -> Vec<SourceItem> {
    let doc = source.document();
    let Some(root) = source
        .catalog()
        .and_then(|catalog| resolve_dict(doc, catalog, b"Outlines"))
    else {
        return Vec::new();
    };
    let mut visited = HashSet::new();
    read_siblings(source, root.get(b"First").ok(), &mut visited, 0)
}

fn read_siblings(
    source: &SourceDocument,
    first: Option<&Object>,
    visited: &mut HashSet<ObjectId>,
    depth: usize,
) -> Vec<SourceItem> {
    let doc = source.document();
    let mut items = Vec::new();
    if depth > MAX_OUTLINE_DEPTH {
        return items;
    }

    let mut next = first;
    while let Some(Object::Reference(id)) = next {
        if !visited.insert(*id) {
            break;
        }
        let Ok(node) = doc.get_dictionary(*id) else {
            break;
        };
        items.push(read_item(source, node, visited, depth));
        next = node.get(b"Next").ok();
    }
    items
}

fn read_item(
    source: &SourceDocument,
    node: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    depth: usize,
) -> SourceItem {
    let doc = source.document();
    SourceItem {
        title: resolve_key(doc, node, b"Title")
            .and_then(text_string)
            .unwrap_or_default(),
        target: source.target_of(node),
        color: resolve_key(doc, node, b"C")
            .filter(|c| matches!(c, Object::Array(_)))
            .cloned(),
        flags: resolve_key(doc, node, b"F")
            .filter(|f| matches!(f, Object::Integer(_)))
            .cloned(),
        open: node
            .get(b"Count")
            .ok()
            .and_then(|count| resolve(doc, count))
            .and_then(number)
            .is_some_and(|count| count > 0.0),
        children: read_siblings(source, node.get(b"First").ok(), visited, depth + 1),
    }
}

/// Map source bookmarks onto imported pages.
///
/// A bookmark pointing at a page that was not imported is dropped and its
/// children take its place. Folders without a target survive only if they
/// still hold something.
fn remap(items: Vec<SourceItem>, pages: &PageLookup) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    for item in items {
        let children = remap(item.children, pages);
        match item.target {
            Some(target) => match pages.get(target.page) {
                Some(page) => entries.push(OutlineEntry {
                    title: item.title,
                    page: Some(page),
                    view: target.view,
                    color: item.color,
                    flags: item.flags,
                    open: item.open,
                    children,
                }),
                None => entries.extend(children),
            },
            None if !children.is_empty() => entries.push(OutlineEntry {
                title: item.title,
                page: None,
                view: Vec::new(),
                color: item.color,
                flags: item.flags,
                open: item.open,
                children,
            }),
            None => {}
        }
    }
    entries
}

/// Write `entries` as siblings under `parent`, returning the first and last ids.
fn write_entries(
    dest: &mut DestinationDocument,
    entries: &[OutlineEntry],
    parent: ObjectId,
) -> Option<(ObjectId, ObjectId)> {
    let ids: Vec<ObjectId> = entries.iter().map(|_| dest.new_object_id()).collect();

    for (index, entry) in entries.iter().enumerate() {
        let id = ids[index];
        let mut item = Dictionary::new();
        item.set("Title", encode_text_string(&entry.title));
        item.set("Parent", parent);
        if index > 0 {
            item.set("Prev", ids[index - 1]);
        }
        if let Some(next) = ids.get(index + 1) {
            item.set("Next", *next);
        }
        if let Some(page) = entry.page {
            item.set("Dest", destination_array(page, &entry.view));
        }
        if let Some(color) = &entry.color {
            item.set("C", color.clone());
        }
        if let Some(flags) = &entry.flags {
            item.set("F", flags.clone());
        }
        if let Some((first, last)) = write_entries(dest, &entry.children, id) {
            item.set("First", first);
            item.set("Last", last);
            let shown = entry.descendants_when_open() as i64;
            item.set("Count", if entry.open { shown } else { -shown });
        }
        dest.insert_object(id, item);
    }

    Some((*ids.first()?, *ids.last()?))
}

fn destination_array(page: ObjectId, view: &[Object]) -> Vec<Object> {
    let mut array = vec![Object::Reference(page)];
    if view.is_empty() {
        array.extend([Object::Name(b"XYZ".to_vec()), Object::Null, Object::Null, Object::Null]);
    } else {
        array.extend(view.iter().cloned());
    }
    array
}
