//! Rescaling destination pages to a common width.

use lopdf::{Object, ObjectId};
use lopdf::content::Operation;
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::geometry::Rectangle;
use crate::merge::document::DestinationDocument;

const PAGE_BOXES: [&[u8]; 5] = [b"MediaBox", b"CropBox", b"TrimBox", b"BleedBox", b"ArtBox"];

/// Scale factors this close to 1 leave the page alone.
const TOLERANCE: f32 = 0.001;

/// Scale every page so its displayed width matches the first page.
///
/// Page content, page boxes and annotation rectangles are scaled around
/// the origin. Returns the number of pages that were rescaled.
pub fn normalize_page_sizes(dest: &mut DestinationDocument) -> Result<usize> {
    let Some(first) = dest.pages().first().copied() else {
        return Ok(0);
    };
    let reference_width = dest.media_box(first).rotate(dest.rotation(first)).width();

    let mut scaled_annotations = HashSet::new();
    let mut rescaled = 0;
    for page_id in dest.pages().to_vec() {
        let width = dest.media_box(page_id).rotate(dest.rotation(page_id)).width();
        if width <= 0.0 {
            continue;
        }
        let factor = reference_width / width;
        if (factor - 1.0).abs() < TOLERANCE {
            continue;
        }
        scale_page(dest, page_id, factor, &mut scaled_annotations)?;
        rescaled += 1;
    }
    debug!(rescaled, width = reference_width, "Normalized page sizes");
    Ok(rescaled)
}

fn scale_page(
    dest: &mut DestinationDocument,
    page_id: ObjectId,
    factor: f32,
    scaled_annotations: &mut HashSet<ObjectId>,
) -> Result<()> {
    let scale = vec![
        Object::Real(factor),
        Object::Real(0.0),
        Object::Real(0.0),
        Object::Real(factor),
        Object::Real(0.0),
        Object::Real(0.0),
    ];
    dest.wrap_contents(page_id, vec![Operation::new("cm", scale)], Vec::new())?;

    let boxes: Vec<(&[u8], Rectangle)> = {
        let doc = dest.document();
        let Some(page) = dest.dictionary(page_id) else {
            return Ok(());
        };
        PAGE_BOXES
            .iter()
            .filter_map(|key| {
                let rect = Rectangle::from_object(doc, page.get(key).ok()?)?;
                Some((*key, rect.scale(factor)))
            })
            .collect()
    };
    let annotations = page_annotations(dest, page_id);

    if let Some(page) = dest.dictionary_mut(page_id) {
        for (key, rect) in boxes {
            page.set(key, rect.to_object());
        }
    }
    for annot_id in annotations {
        if !scaled_annotations.insert(annot_id) {
            continue;
        }
        let rect = dest
            .dictionary(annot_id)
            .and_then(|annot| annot.get(b"Rect").ok())
            .and_then(|rect| Rectangle::from_object(dest.document(), rect));
        if let (Some(rect), Some(annot)) = (rect, dest.dictionary_mut(annot_id)) {
            annot.set("Rect", rect.scale(factor).to_object());
        }
    }
    Ok(())
}

fn page_annotations(dest: &DestinationDocument, page_id: ObjectId) -> Vec<ObjectId> {
    match dest.dictionary(page_id).and_then(|page| page.get(b"Annots").ok()) {
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Reference(id) => Some(*id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
