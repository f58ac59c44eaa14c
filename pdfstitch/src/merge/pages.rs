//! Importing pages from a source into the destination document.
//!
//! One [`PageImporter`] serves one input. Its copy table maps every source
//! object already copied to its destination id, so resources shared between
//! pages of the same input are copied once. References to page tree nodes
//! are never followed: a reference to a page that is not (yet) imported
//! becomes `null`, and links are re-resolved once the whole input is in.

use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashMap;

use crate::error::PageImportError;
use crate::geometry::{Rectangle, normalize_rotation};
use crate::io::reader::SourceDocument;
use crate::merge::document::DestinationDocument;
use crate::utils::{has_name, number, resolve};

/// Page keys that only make sense in the source document.
const DROPPED_PAGE_KEYS: [&[u8]; 4] = [b"Parent", b"B", b"StructParents", b"Annots"];

/// A page after import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedPage {
    /// Destination page object.
    pub id: ObjectId,
    /// Media box written on the page.
    pub media_box: Rectangle,
    /// Page rotation in degrees.
    pub rotation: i64,
}

impl ImportedPage {
    /// Page size as a viewer displays it.
    pub fn display_size(&self) -> Rectangle {
        self.media_box.rotate(self.rotation)
    }
}

/// Source pages imported so far, in import order.
#[derive(Debug, Clone, Default)]
pub struct PageLookup {
    entries: Vec<(u32, ObjectId)>,
    by_source: HashMap<ObjectId, ObjectId>,
}

impl PageLookup {
    fn insert(&mut self, page_number: u32, source_id: ObjectId, dest_id: ObjectId) {
        self.entries.push((page_number, dest_id));
        self.by_source.insert(source_id, dest_id);
    }

    /// Destination page for a source page object.
    pub fn get(&self, source_id: ObjectId) -> Option<ObjectId> {
        self.by_source.get(&source_id).copied()
    }

    /// First imported page.
    pub fn first(&self) -> Option<ObjectId> {
        self.entries.first().map(|(_, id)| *id)
    }

    /// `(source page number, destination page)` in import order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, ObjectId)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of imported pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was imported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copies pages of one source into a destination document.
pub struct PageImporter<'a> {
    source: &'a SourceDocument,
    copies: HashMap<ObjectId, ObjectId>,
    pages: PageLookup,
}

impl<'a> PageImporter<'a> {
    /// Importer for `source`.
    pub fn new(source: &'a SourceDocument) -> Self {
        Self {
            source,
            copies: HashMap::new(),
            pages: PageLookup::default(),
        }
    }

    /// The source this importer reads.
    pub fn source(&self) -> &'a SourceDocument {
        self.source
    }

    /// Pages imported so far.
    pub fn pages(&self) -> &PageLookup {
        &self.pages
    }

    /// Destination id of a copied source object.
    pub fn copied(&self, source_id: ObjectId) -> Option<ObjectId> {
        self.copies.get(&source_id).copied()
    }

    /// Import page `page_number` (1-based) and append it to `dest`.
    ///
    /// The page is checked before anything is written, so a failed import
    /// leaves `dest` untouched.
    pub fn import_page(
        &mut self,
        dest: &mut DestinationDocument,
        page_number: u32,
    ) -> Result<ImportedPage, PageImportError> {
        let source = self.source;
        let page_id = source.page_id(page_number).ok_or_else(|| PageImportError::PageNotFound {
            source_name: source.name().to_string(),
            page: page_number,
            total: source.page_count(),
        })?;
        let page = source
            .document()
            .get_dictionary(page_id)
            .map_err(|_| PageImportError::corrupted(source.name(), page_number, "page object is not a dictionary"))?;

        let media_box = match source.inherited_attribute(page_id, b"MediaBox") {
            Some(obj) => Rectangle::from_object(source.document(), obj)
                .filter(|rect| rect.width() > 0.0 && rect.height() > 0.0)
                .ok_or_else(|| PageImportError::corrupted(source.name(), page_number, "invalid MediaBox"))?,
            None => Rectangle::LETTER,
        };
        let crop_box = source
            .inherited_attribute(page_id, b"CropBox")
            .and_then(|obj| Rectangle::from_object(source.document(), obj));
        let rotation = source
            .inherited_attribute(page_id, b"Rotate")
            .and_then(|obj| resolve(source.document(), obj))
            .and_then(number)
            .map(|r| normalize_rotation(r as i64))
            .unwrap_or(0);

        let mut copy = page.clone();
        for key in DROPPED_PAGE_KEYS {
            copy.remove(key);
        }
        copy.set("MediaBox", media_box.to_object());
        match crop_box {
            Some(crop) => copy.set("CropBox", crop.to_object()),
            None => {
                copy.remove(b"CropBox");
            }
        }
        match source.inherited_attribute(page_id, b"Resources") {
            Some(resources) => copy.set("Resources", resources.clone()),
            None => copy.set("Resources", Dictionary::new()),
        }
        if rotation == 0 {
            copy.remove(b"Rotate");
        } else {
            copy.set("Rotate", rotation);
        }
        // annotations are copied through references so widgets can be found again
        if let Ok(annots) = page.get(b"Annots") {
            let annots = match resolve(source.document(), annots) {
                Some(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            copy.set("Annots", annots);
        }

        let dest_id = dest.new_object_id();
        self.copies.insert(page_id, dest_id);
        let translated = self.translate(dest, &Object::Dictionary(copy));
        dest.insert_object(dest_id, translated);
        dest.append_page(dest_id);
        self.pages.insert(page_number, page_id, dest_id);

        Ok(ImportedPage {
            id: dest_id,
            media_box,
            rotation,
        })
    }

    /// Copy `obj` into `dest`, following references not copied yet.
    pub fn translate(&mut self, dest: &mut DestinationDocument, obj: &Object) -> Object {
        let source = self.source;
        let mut pending = Vec::new();
        let result = self.map_object(dest, obj, &mut pending);

        while let Some(source_id) = pending.pop() {
            let copy = match source.document().get_object(source_id) {
                Ok(obj) => self.map_object(dest, obj, &mut pending),
                Err(_) => Object::Null,
            };
            if let Some(dest_id) = self.copied(source_id) {
                dest.insert_object(dest_id, copy);
            }
        }
        result
    }

    /// Annotation objects copied for imported pages, source id to destination id.
    pub fn annotation_lookup(&self) -> HashMap<ObjectId, ObjectId> {
        let doc = self.source.document();
        let mut lookup = HashMap::new();
        for (number, _) in self.pages.iter() {
            let Some(page) = self
                .source
                .page_id(number)
                .and_then(|id| doc.get_dictionary(id).ok())
            else {
                continue;
            };
            let Some(Object::Array(annots)) = page.get(b"Annots").ok().and_then(|a| resolve(doc, a)) else {
                continue;
            };
            for annot in annots {
                if let Object::Reference(id) = annot
                    && let Some(copied) = self.copied(*id)
                {
                    lookup.insert(*id, copied);
                }
            }
        }
        lookup
    }

    fn map_object(&mut self, dest: &mut DestinationDocument, obj: &Object, pending: &mut Vec<ObjectId>) -> Object {
        match obj {
            Object::Reference(id) => self.map_reference(dest, *id, pending),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.map_object(dest, item, pending))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.map_dictionary(dest, dict, pending)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.map_dictionary(dest, &stream.dict, pending);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn map_dictionary(
        &mut self,
        dest: &mut DestinationDocument,
        dict: &Dictionary,
        pending: &mut Vec<ObjectId>,
    ) -> Dictionary {
        let is_widget = has_name(dict, b"Subtype", b"Widget");
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            // the field hierarchy is rebuilt by the form merger
            if is_widget && key.as_slice() == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.map_object(dest, value, pending));
        }
        copy
    }

    fn map_reference(&mut self, dest: &mut DestinationDocument, id: ObjectId, pending: &mut Vec<ObjectId>) -> Object {
        if let Some(copied) = self.copied(id) {
            return Object::Reference(copied);
        }
        let Ok(target) = self.source.document().get_object(id) else {
            return Object::Null;
        };
        if is_page_tree_node(target) {
            return Object::Null;
        }
        let dest_id = dest.new_object_id();
        self.copies.insert(id, dest_id);
        pending.push(id);
        Object::Reference(dest_id)
    }
}

fn is_page_tree_node(obj: &Object) -> bool {
    match obj {
        Object::Dictionary(dict) => has_name(dict, b"Type", b"Page") || has_name(dict, b"Type", b"Pages"),
        _ => false,
    }
}
