//! Opening sources into read-only documents.
//!
//! Parsing runs on the blocking thread pool. A [`SourceDocument`] owns its
//! parsed document and is dropped as soon as the task is done with it, which
//! releases the source on every exit path.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;
use tokio::task;
use tracing::debug;

use crate::error::{Result, StitchError};
use crate::input::Source;
use crate::io::image::image_to_document;
use crate::utils::{base_name, has_name, resolve, resolve_dict, resolve_key, text_string};

/// How deep page-tree and destination lookups may recurse.
const MAX_DEPTH: usize = 32;

/// Target of a link or bookmark inside a source document.
#[derive(Debug, Clone)]
pub struct Destination {
    /// Source page object.
    pub page: ObjectId,
    /// View parameters after the page (`/XYZ left top zoom`, `/Fit`...).
    pub view: Vec<Object>,
}

/// A parsed source document with page lookups.
pub struct SourceDocument {
    document: Document,
    name: String,
    base_name: String,
    pages: Vec<ObjectId>,
    numbers: HashMap<ObjectId, u32>,
}

impl SourceDocument {
    /// Wrap a parsed document.
    pub fn new(document: Document, name: impl Into<String>) -> Self {
        let name = name.into();
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        let numbers = pages
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index as u32 + 1))
            .collect();

        Self {
            document,
            base_name: base_name(&name),
            name,
            pages,
            numbers,
        }
    }

    /// The parsed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Source file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source file name without extension.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Object id of page `number` (1-based).
    pub fn page_id(&self, number: u32) -> Option<ObjectId> {
        let index = number.checked_sub(1)? as usize;
        self.pages.get(index).copied()
    }

    /// Page number (1-based) of a page object.
    pub fn page_number(&self, id: ObjectId) -> Option<u32> {
        self.numbers.get(&id).copied()
    }

    /// Document catalog.
    pub fn catalog(&self) -> Option<&Dictionary> {
        self.document.catalog().ok()
    }

    /// Non-blank title from the document information dictionary.
    pub fn title(&self) -> Option<String> {
        let info = resolve_dict(&self.document, &self.document.trailer, b"Info")?;
        let title = resolve_key(&self.document, info, b"Title").and_then(text_string)?;
        let trimmed = title.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Look up `key` on the page or, for inheritable attributes, its ancestors.
    pub fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            node = resolve_dict(&self.document, node, b"Parent")?;
        }
        None
    }

    /// Resolve an explicit or named destination to a page of this document.
    pub fn resolve_destination(&self, dest: &Object) -> Option<Destination> {
        self.resolve_destination_at(dest, 0)
    }

    /// Destination of a `GoTo` action.
    pub fn action_destination(&self, action: &Object) -> Option<Destination> {
        let Object::Dictionary(action) = resolve(&self.document, action)? else {
            return None;
        };
        if !has_name(action, b"S", b"GoTo") {
            return None;
        }
        self.resolve_destination(action.get(b"D").ok()?)
    }

    /// Destination of an outline item or link annotation (`/Dest` or `/A`).
    pub fn target_of(&self, dict: &Dictionary) -> Option<Destination> {
        if let Ok(dest) = dict.get(b"Dest") {
            return self.resolve_destination(dest);
        }
        self.action_destination(dict.get(b"A").ok()?)
    }

    fn resolve_destination_at(&self, dest: &Object, depth: usize) -> Option<Destination> {
        if depth > MAX_DEPTH {
            return None;
        }
        match resolve(&self.document, dest)? {
            Object::Array(items) => {
                let Some(Object::Reference(page)) = items.first() else {
                    return None;
                };
                self.page_number(*page)?;
                let view = items[1..]
                    .iter()
                    .map(|item| match item {
                        Object::Reference(_) => Object::Null,
                        other => other.clone(),
                    })
                    .collect();
                Some(Destination { page: *page, view })
            }
            Object::Name(key) | Object::String(key, _) => {
                let named = self.named_destination(key)?;
                self.resolve_destination_at(named, depth + 1)
            }
            Object::Dictionary(dict) => self.resolve_destination_at(dict.get(b"D").ok()?, depth + 1),
            _ => None,
        }
    }

    fn named_destination(&self, key: &[u8]) -> Option<&Object> {
        let catalog = self.catalog()?;
        if let Some(found) =
            resolve_dict(&self.document, catalog, b"Dests").and_then(|dests| dests.get(key).ok())
        {
            return Some(found);
        }
        let names = resolve_dict(&self.document, catalog, b"Names")?;
        let tree = resolve_dict(&self.document, names, b"Dests")?;
        self.lookup_name_tree(tree, key, 0)
    }

    fn lookup_name_tree<'a>(&'a self, node: &'a Dictionary, key: &[u8], depth: usize) -> Option<&'a Object> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(Object::Array(names)) = resolve_key(&self.document, node, b"Names") {
            for pair in names.chunks_exact(2) {
                if let Some(Object::String(name, _)) = resolve(&self.document, &pair[0])
                    && name.as_slice() == key
                {
                    return Some(&pair[1]);
                }
            }
        }
        if let Some(Object::Array(kids)) = resolve_key(&self.document, node, b"Kids") {
            for kid in kids {
                if let Some(Object::Dictionary(kid)) = resolve(&self.document, kid)
                    && let Some(found) = self.lookup_name_tree(kid, key, depth + 1)
                {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Opens sources into [`SourceDocument`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PDF source.
    ///
    /// # Errors
    ///
    /// - [`StitchError::FileNotFound`] / [`StitchError::FileNotAccessible`]
    ///   for unreadable files.
    /// - [`StitchError::EncryptedPdf`] when the document needs a password.
    /// - [`StitchError::FailedToLoadPdf`] for anything the parser rejects.
    pub async fn open(&self, source: &Source) -> Result<SourceDocument> {
        let name = source.name();
        let document = match source {
            Source::File(path) => {
                check_readable(path).await?;
                let path = path.clone();
                task::spawn_blocking(move || Document::load(&path)).await?
            }
            Source::Bytes { bytes, .. } => {
                let bytes = bytes.clone();
                task::spawn_blocking(move || Document::load_mem(&bytes)).await?
            }
        }
        .map_err(|err| classify_load_error(&name, err))?;

        let source_doc = SourceDocument::new(document, name);
        debug!(
            source = source_doc.name(),
            pages = source_doc.page_count(),
            "Opened source document"
        );
        Ok(source_doc)
    }

    /// Convert an image source into a one-page document.
    pub async fn open_image(&self, source: &Source) -> Result<SourceDocument> {
        let name = source.name();
        let bytes = match source {
            Source::File(path) => {
                check_readable(path).await?;
                tokio::fs::read(path)
                    .await
                    .map_err(|err| StitchError::FileNotAccessible {
                        path: path.clone(),
                        source: err,
                    })?
                    .into()
            }
            Source::Bytes { bytes, .. } => bytes.clone(),
        };

        let image_name = name.clone();
        let document = task::spawn_blocking(move || image_to_document(&image_name, &bytes)).await??;
        debug!(source = %name, "Converted image to a single page document");
        Ok(SourceDocument::new(document, name))
    }
}

async fn check_readable(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(StitchError::file_not_found(path)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StitchError::file_not_found(path)),
        Err(err) => Err(StitchError::FileNotAccessible {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

fn classify_load_error(name: &str, err: lopdf::Error) -> StitchError {
    let reason = err.to_string();
    let lowered = reason.to_ascii_lowercase();
    if lowered.contains("encrypt") || lowered.contains("decrypt") || lowered.contains("password") {
        StitchError::encrypted_pdf(name)
    } else {
        StitchError::failed_to_load_pdf(name, reason)
    }
}
