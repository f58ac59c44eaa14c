//! The document being assembled.
//!
//! Pages are kept in a flat list and the page tree is written once, when the
//! document is finished. Content added on top of imported pages goes into
//! separate streams around the original ones so the imported streams are
//! never decoded.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::{Result, StitchError};
use crate::geometry::Rectangle;
use crate::utils::{number, resolve, resolve_key};

/// Prefix of font resource names added to pages.
const FONT_RESOURCE_PREFIX: &str = "FStitch";

/// Destination document under construction.
pub struct DestinationDocument {
    document: Document,
    catalog_id: ObjectId,
    pages_id: ObjectId,
    pages: Vec<ObjectId>,
    helvetica: Option<ObjectId>,
}

impl DestinationDocument {
    /// Empty document declaring `version`.
    pub fn new(version: &str) -> Self {
        let mut document = Document::with_version(version);
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }
            .into(),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            catalog_id,
            pages_id,
            pages: Vec::new(),
            helvetica: None,
        }
    }

    /// The underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the underlying document.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Pages in order.
    pub fn pages(&self) -> &[ObjectId] {
        &self.pages
    }

    /// Number of pages so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Reserve an object id.
    pub fn new_object_id(&mut self) -> ObjectId {
        self.document.new_object_id()
    }

    /// Add an object and return its id.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.document.add_object(object)
    }

    /// Store `object` under a reserved id.
    pub fn insert_object(&mut self, id: ObjectId, object: impl Into<Object>) {
        self.document.objects.insert(id, object.into());
    }

    /// Dictionary stored under `id`.
    pub fn dictionary(&self, id: ObjectId) -> Option<&Dictionary> {
        self.document.get_dictionary(id).ok()
    }

    /// Mutable dictionary stored under `id`.
    pub fn dictionary_mut(&mut self, id: ObjectId) -> Option<&mut Dictionary> {
        self.document.get_dictionary_mut(id).ok()
    }

    /// Set an entry of the document catalog.
    pub fn set_catalog_entry(&mut self, key: &str, value: impl Into<Object>) -> Result<()> {
        let catalog_id = self.catalog_id;
        let catalog = self
            .dictionary_mut(catalog_id)
            .ok_or_else(|| StitchError::merge_failed("document catalog is missing"))?;
        catalog.set(key, value);
        Ok(())
    }

    /// Append an already stored page dictionary to the page list.
    pub fn append_page(&mut self, page_id: ObjectId) {
        let pages_id = self.pages_id;
        if let Some(page) = self.dictionary_mut(page_id) {
            page.set("Parent", pages_id);
        }
        self.pages.push(page_id);
    }

    /// Insert stored pages at `index`.
    pub fn insert_pages(&mut self, index: usize, page_ids: &[ObjectId]) {
        let pages_id = self.pages_id;
        for &page_id in page_ids {
            if let Some(page) = self.dictionary_mut(page_id) {
                page.set("Parent", pages_id);
            }
        }
        let index = index.min(self.pages.len());
        self.pages.splice(index..index, page_ids.iter().copied());
    }

    /// Store a page with no content, sized `size`, without adding it to the list.
    pub fn new_blank_page(&mut self, size: Rectangle) -> ObjectId {
        let pages_id = self.pages_id;
        self.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => size.to_object(),
            "Resources" => Dictionary::new(),
        })
    }

    /// Append a blank page sized `size`.
    pub fn add_blank_page(&mut self, size: Rectangle) -> ObjectId {
        let page_id = self.new_blank_page(size);
        self.pages.push(page_id);
        page_id
    }

    /// Media box of a page, Letter if it cannot be read.
    pub fn media_box(&self, page_id: ObjectId) -> Rectangle {
        self.dictionary(page_id)
            .and_then(|page| page.get(b"MediaBox").ok())
            .and_then(|obj| Rectangle::from_object(&self.document, obj))
            .unwrap_or(Rectangle::LETTER)
    }

    /// Rotation of a page in degrees.
    pub fn rotation(&self, page_id: ObjectId) -> i64 {
        self.dictionary(page_id)
            .and_then(|page| resolve_key(&self.document, page, b"Rotate"))
            .and_then(number)
            .map(|r| r as i64)
            .unwrap_or(0)
    }

    /// Shared Helvetica font dictionary.
    pub fn helvetica(&mut self) -> ObjectId {
        if let Some(id) = self.helvetica {
            return id;
        }
        let id = self.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.helvetica = Some(id);
        id
    }

    /// Make `font_id` available to the page and return its resource name.
    ///
    /// Shared resource dictionaries are copied onto the page before they are
    /// changed, so other pages using them are unaffected.
    pub fn add_font_resource(&mut self, page_id: ObjectId, font_id: ObjectId) -> Result<String> {
        let page = self
            .dictionary(page_id)
            .ok_or_else(|| StitchError::merge_failed(format!("page {page_id:?} is missing")))?;

        let mut resources = page
            .get(b"Resources")
            .ok()
            .and_then(|obj| owned_dictionary(&self.document, obj))
            .unwrap_or_default();
        let mut fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|obj| owned_dictionary(&self.document, obj))
            .unwrap_or_default();

        let existing = fonts.iter().find_map(|(key, value)| match value {
            Object::Reference(id) if *id == font_id => Some(String::from_utf8_lossy(key).into_owned()),
            _ => None,
        });
        let resource_name = match existing {
            Some(name) => name,
            None => {
                let name = (0u32..)
                    .map(|n| match n {
                        0 => FONT_RESOURCE_PREFIX.to_string(),
                        n => format!("{FONT_RESOURCE_PREFIX}{n}"),
                    })
                    .find(|candidate| !fonts.has(candidate.as_bytes()))
                    .unwrap_or_else(|| FONT_RESOURCE_PREFIX.to_string());
                fonts.set(name.as_str(), font_id);
                name
            }
        };
        resources.set("Font", fonts);

        if let Some(page) = self.dictionary_mut(page_id) {
            page.set("Resources", resources);
        }
        Ok(resource_name)
    }

    /// Surround the page content with `before` and `after`.
    ///
    /// The original content runs inside `q`/`Q`, so `after` starts from the
    /// untransformed graphics state and `before` applies to the original.
    pub fn wrap_contents(
        &mut self,
        page_id: ObjectId,
        before: Vec<Operation>,
        after: Vec<Operation>,
    ) -> Result<()> {
        let existing = self
            .dictionary(page_id)
            .and_then(|page| page.get(b"Contents").ok())
            .map(|contents| content_references(&self.document, contents))
            .unwrap_or_default();

        let mut prefix = vec![Operation::new("q", vec![])];
        prefix.extend(before);
        let mut suffix = vec![Operation::new("Q", vec![])];
        suffix.extend(after);

        let prefix_id = self.add_content_stream(prefix)?;
        let suffix_id = self.add_content_stream(suffix)?;

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(prefix_id));
        contents.extend(existing);
        contents.push(Object::Reference(suffix_id));

        let page = self
            .dictionary_mut(page_id)
            .ok_or_else(|| StitchError::merge_failed(format!("page {page_id:?} is missing")))?;
        page.set("Contents", contents);
        Ok(())
    }

    /// Store operations as a new content stream.
    pub fn add_content_stream(&mut self, operations: Vec<Operation>) -> Result<ObjectId> {
        let content = Content { operations }.encode()?;
        Ok(self.add_object(Stream::new(Dictionary::new(), content)))
    }

    /// Write the page tree and hand out the finished document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.pages.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }
            .into(),
        );
        self.document
    }
}

/// Copy of a dictionary given directly or by reference.
fn owned_dictionary(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Content stream references of a page, flattening an indirect array.
fn content_references(doc: &Document, contents: &Object) -> Vec<Object> {
    match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => vec![Object::Reference(*id)],
            Err(_) => Vec::new(),
        },
        Object::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}
