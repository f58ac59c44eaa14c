//! Fixing up annotations once every selected page of an input is in.
//!
//! During import a link to a page that was not imported yet points at
//! `null`. Here each link is resolved again against the source: links whose
//! target page made it into the output are rewritten to a direct
//! destination, links whose target did not are removed, and so are popups
//! left without their parent annotation. Once the form is merged, widgets
//! that did not end up in a field go as well.

use lopdf::{Object, ObjectId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::merge::document::DestinationDocument;
use crate::merge::pages::PageImporter;
use crate::utils::{has_name, resolve};

/// Resolve links of the imported pages and drop obsolete annotations.
///
/// Returns the surviving annotations, source id to destination id.
pub fn distill_annotations(
    importer: &PageImporter<'_>,
    dest: &mut DestinationDocument,
) -> HashMap<ObjectId, ObjectId> {
    let source = importer.source();
    let doc = source.document();
    let mut lookup = importer.annotation_lookup();
    let mut removed = HashSet::new();

    let mut links: Vec<(ObjectId, ObjectId)> = lookup
        .iter()
        .filter(|(source_id, _)| {
            doc.get_dictionary(**source_id)
                .is_ok_and(|annot| has_name(annot, b"Subtype", b"Link"))
        })
        .map(|(source_id, dest_id)| (*source_id, *dest_id))
        .collect();
    links.sort();

    for (source_id, dest_id) in links {
        let Ok(annot) = doc.get_dictionary(source_id) else {
            continue;
        };
        if !points_inside(doc, annot) {
            continue;
        }
        let target = source
            .target_of(annot)
            .and_then(|target| importer.pages().get(target.page).map(|page| (page, target.view)));
        match target {
            Some((page, view)) => {
                if let Some(copy) = dest.dictionary_mut(dest_id) {
                    let mut destination = vec![Object::Reference(page)];
                    destination.extend(view);
                    copy.remove(b"A");
                    copy.set("Dest", destination);
                }
            }
            None => {
                lookup.remove(&source_id);
                removed.insert(dest_id);
            }
        }
    }

    let orphaned_popups: Vec<ObjectId> = lookup
        .iter()
        .filter(|(source_id, _)| {
            let Ok(annot) = doc.get_dictionary(**source_id) else {
                return false;
            };
            if !has_name(annot, b"Subtype", b"Popup") {
                return false;
            }
            match annot.get(b"Parent") {
                Ok(Object::Reference(parent)) => !lookup.contains_key(parent),
                _ => false,
            }
        })
        .map(|(source_id, _)| *source_id)
        .collect();
    for source_id in orphaned_popups {
        if let Some(dest_id) = lookup.remove(&source_id) {
            removed.insert(dest_id);
        }
    }

    if !removed.is_empty() {
        debug!(source = source.name(), removed = removed.len(), "Removed obsolete annotations");
        remove_from_pages(importer, dest, &removed);
    }
    lookup
}

/// Remove imported widgets that are not part of a merged form field.
///
/// `merged` holds the destination widgets the form merger kept. Returns how
/// many widgets were removed.
pub fn drop_unmerged_widgets(
    importer: &PageImporter<'_>,
    dest: &mut DestinationDocument,
    annotations: &mut HashMap<ObjectId, ObjectId>,
    merged: &HashSet<ObjectId>,
) -> usize {
    let doc = importer.source().document();
    let removed: HashSet<ObjectId> = annotations
        .iter()
        .filter(|(source_id, dest_id)| {
            !merged.contains(*dest_id)
                && doc
                    .get_dictionary(**source_id)
                    .is_ok_and(|annot| has_name(annot, b"Subtype", b"Widget"))
        })
        .map(|(_, dest_id)| *dest_id)
        .collect();
    if removed.is_empty() {
        return 0;
    }
    annotations.retain(|_, dest_id| !removed.contains(dest_id));
    debug!(source = importer.source().name(), removed = removed.len(), "Removed widgets without a field");
    remove_from_pages(importer, dest, &removed);
    removed.len()
}

/// True if the annotation targets a page of its own document.
fn points_inside(doc: &lopdf::Document, annot: &lopdf::Dictionary) -> bool {
    if annot.has(b"Dest") {
        return true;
    }
    match annot.get(b"A").ok().and_then(|action| resolve(doc, action)) {
        Some(Object::Dictionary(action)) => has_name(action, b"S", b"GoTo"),
        _ => false,
    }
}

fn remove_from_pages(importer: &PageImporter<'_>, dest: &mut DestinationDocument, removed: &HashSet<ObjectId>) {
    let pages: Vec<ObjectId> = importer.pages().iter().map(|(_, id)| id).collect();
    for page_id in pages {
        let Some(page) = dest.dictionary_mut(page_id) else {
            continue;
        };
        if let Ok(Object::Array(annots)) = page.get_mut(b"Annots") {
            annots.retain(|annot| !matches!(annot, Object::Reference(id) if removed.contains(id)));
        }
    }
    for id in removed {
        dest.document_mut().objects.remove(id);
    }
}
