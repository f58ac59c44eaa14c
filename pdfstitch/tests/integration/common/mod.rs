//! Shared fixtures for the integration tests.
//!
//! Documents are generated with lopdf into a temporary directory so the
//! tests do not depend on checked-in PDF files.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use pdfstitch::config::{ExistingOutputPolicy, MergeParameters, OutputTarget};
use pdfstitch::input::{MergeInput, Source};

/// Letter page size.
pub const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
/// A4 page size.
pub const A4: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

/// A temporary working directory.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Save a plain document with `pages` Letter pages.
    pub fn pdf(&self, name: &str, pages: u32) -> PathBuf {
        self.save(name, TestPdf::new(pages))
    }

    pub fn save(&self, name: &str, pdf: TestPdf) -> PathBuf {
        let path = self.path(name);
        pdf.save(&path);
        path
    }

    /// Write a small PNG image.
    pub fn png(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.path(name);
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
            .save(&path)
            .expect("Failed to write image");
        path
    }

    /// Merge parameters writing `out.pdf`, replacing it if present.
    pub fn merge_params(&self, inputs: &[&Path]) -> MergeParameters {
        let target =
            OutputTarget::new(self.path("out.pdf")).with_existing_output(ExistingOutputPolicy::Overwrite);
        inputs.iter().fold(MergeParameters::new(target), |params, path| {
            params.with_input(MergeInput::all_pages(Source::file(*path)))
        })
    }
}

/// Builder for source documents.
pub struct TestPdf {
    sizes: Vec<[f32; 4]>,
    title: Option<String>,
    outline: Vec<(String, u32)>,
    fields: Vec<(String, u32)>,
    page_labels: Vec<(i64, Dictionary)>,
}

impl TestPdf {
    pub fn new(pages: u32) -> Self {
        Self::with_sizes(vec![LETTER; pages as usize])
    }

    pub fn with_sizes(sizes: Vec<[f32; 4]>) -> Self {
        Self {
            sizes,
            title: None,
            outline: Vec::new(),
            fields: Vec::new(),
            page_labels: Vec::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Top level bookmark pointing at page `page` (1-based).
    pub fn bookmark(mut self, title: &str, page: u32) -> Self {
        self.outline.push((title.to_string(), page));
        self
    }

    /// Text field with one widget on page `page`.
    pub fn text_field(mut self, name: &str, page: u32) -> Self {
        self.fields.push((name.to_string(), page));
        self
    }

    /// Page label range starting at page index `index`.
    pub fn label_range(mut self, index: i64, style: &str, prefix: Option<&str>, start: Option<i64>) -> Self {
        let mut label = dictionary! { "S" => style };
        if let Some(prefix) = prefix {
            label.set("P", text(prefix));
        }
        if let Some(start) = start {
            label.set("St", start);
        }
        self.page_labels.push((index, label));
        self
    }

    pub fn build(self) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_ids = Vec::new();
        for (index, size) in self.sizes.iter().enumerate() {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 400.into()]),
                    Operation::new("Tj", vec![text(&format!("Page {}", index + 1))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                content.encode().expect("Failed to encode content"),
            ));
            let media_box: Vec<Object> = size.iter().map(|&v| Object::Real(v)).collect();
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
                "Contents" => content_id,
            }));
        }
        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
            }
            .into(),
        );

        let mut catalog = dictionary! { "Type" => "Catalog", "Pages" => pages_id };
        if !self.outline.is_empty() {
            catalog.set("Outlines", write_outline(&mut doc, &self.outline, &page_ids));
        }
        if !self.fields.is_empty() {
            let mut fields = Vec::new();
            for (name, page) in &self.fields {
                let page_id = page_ids[*page as usize - 1];
                let widget = doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Widget",
                    "FT" => "Tx",
                    "T" => text(name),
                    "P" => page_id,
                    "Rect" => vec![100.into(), 100.into(), 300.into(), 120.into()],
                });
                add_annot(&mut doc, page_id, widget);
                fields.push(Object::Reference(widget));
            }
            catalog.set(
                "AcroForm",
                dictionary! {
                    "Fields" => fields,
                    "DA" => text("/Helv 0 Tf 0 g"),
                },
            );
        }
        if !self.page_labels.is_empty() {
            let mut nums = Vec::new();
            for (index, label) in self.page_labels {
                nums.push(Object::Integer(index));
                nums.push(Object::Dictionary(label));
            }
            catalog.set("PageLabels", dictionary! { "Nums" => nums });
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = &self.title {
            let info = doc.add_object(dictionary! { "Title" => text(title) });
            doc.trailer.set("Info", info);
        }
        doc
    }

    pub fn save(self, path: &Path) {
        self.build().save(path).expect("Failed to save fixture");
    }
}

fn write_outline(doc: &mut Document, items: &[(String, u32)], pages: &[ObjectId]) -> ObjectId {
    let root = doc.new_object_id();
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();
    for (index, (title, page)) in items.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => text(title),
            "Parent" => root,
            "Dest" => vec![pages[*page as usize - 1].into(), "Fit".into()],
        };
        if index > 0 {
            item.set("Prev", ids[index - 1]);
        }
        if index + 1 < ids.len() {
            item.set("Next", ids[index + 1]);
        }
        doc.objects.insert(ids[index], item.into());
    }
    doc.objects.insert(
        root,
        dictionary! {
            "Type" => "Outlines",
            "First" => ids[0],
            "Last" => ids[ids.len() - 1],
            "Count" => ids.len() as i64,
        }
        .into(),
    );
    root
}

fn add_annot(doc: &mut Document, page_id: ObjectId, annot: ObjectId) {
    let page = doc.get_dictionary_mut(page_id).expect("Page exists");
    let mut annots = match page.get(b"Annots") {
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    annots.push(annot.into());
    page.set("Annots", annots);
}

pub fn text(value: &str) -> Object {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
}

/// Load a written document.
pub fn load(path: &Path) -> Document {
    Document::load(path).expect("Failed to load output")
}

pub fn decode(obj: &Object) -> String {
    match obj {
        Object::String(bytes, _) => pdfstitch::utils::decode_text_string(bytes),
        other => panic!("Expected a string, got {other:?}"),
    }
}

pub fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).expect("Dangling reference"),
        other => other,
    }
}

pub fn catalog(doc: &Document) -> &Dictionary {
    doc.catalog().expect("Catalog exists")
}

/// Page ids in page order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Outline root of the catalog.
pub fn outline_root(doc: &Document) -> Option<&Dictionary> {
    let root = catalog(doc).get(b"Outlines").ok()?;
    deref(doc, root).as_dict().ok()
}

/// Top level outline items, in order.
pub fn outline_items(doc: &Document) -> Vec<&Dictionary> {
    outline_root(doc).map(|root| outline_children(doc, root)).unwrap_or_default()
}

/// Titles of the top level outline items, in order.
pub fn outline_titles(doc: &Document) -> Vec<String> {
    outline_items(doc).into_iter().map(title).collect()
}

/// Children of the outline node `node`.
pub fn outline_children<'a>(doc: &'a Document, node: &'a Dictionary) -> Vec<&'a Dictionary> {
    let mut items = Vec::new();
    let mut next = node.get(b"First").ok();
    while let Some(reference) = next {
        let item = deref(doc, reference).as_dict().expect("Outline item is a dictionary");
        items.push(item);
        next = item.get(b"Next").ok();
    }
    items
}

/// Title of an outline item.
pub fn title(item: &Dictionary) -> String {
    decode(item.get(b"Title").expect("Outline item has a title"))
}

/// Page number (1-based) an outline item or link points at.
pub fn destination_page(doc: &Document, item: &Dictionary) -> Option<usize> {
    let dest = match item.get(b"Dest") {
        Ok(dest) => deref(doc, dest),
        Err(_) => {
            let action = deref(doc, item.get(b"A").ok()?).as_dict().ok()?;
            deref(doc, action.get(b"D").ok()?)
        }
    };
    let Object::Array(array) = dest else {
        return None;
    };
    let Object::Reference(page) = array.first()? else {
        return None;
    };
    page_ids(doc).iter().position(|id| id == page).map(|index| index + 1)
}

/// Names of the top level form fields.
pub fn field_names(doc: &Document) -> Vec<String> {
    let Ok(form) = catalog(doc).get(b"AcroForm").map(|form| deref(doc, form)) else {
        return Vec::new();
    };
    let Ok(Object::Array(fields)) = form.as_dict().expect("AcroForm is a dictionary").get(b"Fields") else {
        return Vec::new();
    };
    fields
        .iter()
        .map(|field| {
            let field = deref(doc, field).as_dict().expect("Field is a dictionary");
            decode(field.get(b"T").expect("Field has a name"))
        })
        .collect()
}

/// `(page index, label dictionary)` pairs of the output.
pub fn page_labels(doc: &Document) -> Vec<(i64, Dictionary)> {
    let Ok(labels) = catalog(doc).get(b"PageLabels") else {
        return Vec::new();
    };
    let labels = deref(doc, labels).as_dict().expect("PageLabels is a dictionary");
    let Ok(Object::Array(nums)) = labels.get(b"Nums").map(|nums| deref(doc, nums)) else {
        return Vec::new();
    };
    nums.chunks(2)
        .map(|pair| {
            let index = pair[0].as_i64().expect("Label index is an integer");
            let label = deref(doc, &pair[1]).as_dict().expect("Label is a dictionary").clone();
            (index, label)
        })
        .collect()
}

/// Style name of a label dictionary, if any.
pub fn label_style(label: &Dictionary) -> Option<String> {
    label
        .get(b"S")
        .ok()
        .and_then(|style| style.as_name().ok())
        .map(|style| String::from_utf8_lossy(style).into_owned())
}

/// Width of a page's MediaBox.
pub fn page_width(doc: &Document, page: ObjectId) -> f32 {
    let page = doc.get_dictionary(page).expect("Page exists");
    let Ok(Object::Array(media_box)) = page.get(b"MediaBox").map(|b| deref(doc, b)) else {
        panic!("Page has no MediaBox");
    };
    let value = |obj: &Object| match obj {
        Object::Integer(v) => *v as f32,
        Object::Real(v) => *v,
        other => panic!("Not a number: {other:?}"),
    };
    value(&media_box[2]) - value(&media_box[0])
}

/// Number of link annotations on a page.
pub fn link_count(doc: &Document, page: ObjectId) -> usize {
    annotation_count(doc, page, b"Link")
}

pub fn widget_count(doc: &Document, page: ObjectId) -> usize {
    annotation_count(doc, page, b"Widget")
}

fn annotation_count(doc: &Document, page: ObjectId, subtype: &[u8]) -> usize {
    let page = doc.get_dictionary(page).expect("Page exists");
    match page.get(b"Annots").map(|annots| deref(doc, annots)) {
        Ok(Object::Array(annots)) => annots
            .iter()
            .filter_map(|annot| deref(doc, annot).as_dict().ok())
            .filter(|annot| matches!(annot.get(b"Subtype"), Ok(Object::Name(name)) if name == subtype))
            .count(),
        _ => 0,
    }
}
