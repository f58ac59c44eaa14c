//! Interactive form merging.
//!
//! Source fields are flattened to terminal fields identified by their fully
//! qualified names, with inheritable values pulled down from their ancestors.
//! A field is merged only when every one of its widgets survived the import.
//! The destination field hierarchy is rebuilt from the qualified names when
//! the form is attached.

use lopdf::{Dictionary, Object, ObjectId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::config::AcroFormPolicy;
use crate::error::Result;
use crate::io::reader::SourceDocument;
use crate::merge::document::DestinationDocument;
use crate::merge::pages::PageImporter;
use crate::utils::{has_name, number, resolve, resolve_dict, resolve_key, text_string};

/// Field values inherited from ancestors.
const INHERITABLE_KEYS: [&[u8]; 6] = [b"FT", b"Ff", b"V", b"DV", b"DA", b"Q"];

/// Field values that apply to the node that carries them.
const FIELD_KEYS: [&[u8]; 6] = [b"TU", b"TM", b"MaxLen", b"Opt", b"TI", b"I"];

/// Keys removed from widgets once their field lives in its own dictionary.
const WIDGET_FIELD_KEYS: [&[u8]; 13] = [
    b"T", b"TU", b"TM", b"FT", b"Ff", b"V", b"DV", b"MaxLen", b"Opt", b"TI", b"I", b"Kids", b"Parent",
];

/// Signature value keys dropped from imported signature widgets.
const SIGNATURE_KEYS: [&[u8]; 3] = [b"V", b"Lock", b"SV"];

const MAX_FIELD_DEPTH: usize = 32;

/// A terminal field as read from a source.
struct SourceField {
    name: String,
    values: Dictionary,
    widgets: Vec<ObjectId>,
}

impl SourceField {
    fn is_signature(&self) -> bool {
        has_name(&self.values, b"FT", b"Sig")
    }
}

/// A field of the merged form.
#[derive(Debug, Clone)]
struct MergedField {
    name: String,
    values: Dictionary,
    widgets: Vec<ObjectId>,
}

/// Merges the forms of all inputs into one destination form.
#[derive(Debug, Clone)]
pub struct AcroFormsMerger {
    policy: AcroFormPolicy,
    fields: Vec<MergedField>,
    by_name: HashMap<String, usize>,
    default_appearance: Option<Object>,
    fonts: Dictionary,
    need_appearances: bool,
    sig_flags: i64,
}

impl AcroFormsMerger {
    /// Merger applying `policy`.
    pub fn new(policy: AcroFormPolicy) -> Self {
        Self {
            policy,
            fields: Vec::new(),
            by_name: HashMap::new(),
            default_appearance: None,
            fonts: Dictionary::new(),
            need_appearances: false,
            sig_flags: 0,
        }
    }

    /// Whether the merged form has fields.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Number of terminal fields in the merged form.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Qualified names of the merged fields, in merge order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Merge the form of the input served by `importer`.
    ///
    /// `annotations` maps source annotations to the ones that survived the
    /// import; `input_number` (1-based) disambiguates renamed fields.
    /// Returns the destination widgets that now belong to a merged field.
    pub fn merge_form(
        &mut self,
        importer: &mut PageImporter<'_>,
        dest: &mut DestinationDocument,
        annotations: &HashMap<ObjectId, ObjectId>,
        input_number: usize,
    ) -> HashSet<ObjectId> {
        let mut kept = HashSet::new();
        if self.policy == AcroFormPolicy::Discard {
            return kept;
        }
        let source = importer.source();
        let Some(form) = source
            .catalog()
            .and_then(|catalog| resolve_dict(source.document(), catalog, b"AcroForm"))
        else {
            return kept;
        };

        let fields = read_fields(source, form);
        let mut merged = 0;
        for field in fields {
            let is_signature = field.is_signature();
            let SourceField { name, mut values, widgets } = field;
            let widgets: Option<Vec<ObjectId>> = widgets.iter().map(|w| annotations.get(w).copied()).collect();
            let Some(widgets) = widgets.filter(|w| !w.is_empty()) else {
                debug!(field = %name, "Skipping field whose widgets were not imported");
                continue;
            };
            if is_signature {
                values.remove(b"V");
            }
            let values = match importer.translate(dest, &Object::Dictionary(values)) {
                Object::Dictionary(values) => values,
                _ => Dictionary::new(),
            };
            kept.extend(widgets.iter().copied());
            self.add_field(name, values, widgets, input_number);
            merged += 1;
        }
        self.merge_form_defaults(importer, dest, form);
        debug!(source = source.name(), fields = merged, "Merged form fields");
        kept
    }

    fn add_field(&mut self, name: String, values: Dictionary, widgets: Vec<ObjectId>, input_number: usize) {
        let rename = match self.policy {
            AcroFormPolicy::MergeRenamingExistingFields => self.is_taken(&name),
            // a terminal field cannot also be the parent of another one
            _ => !self.by_name.contains_key(&name) && self.is_taken(&name),
        };

        if rename {
            let renamed = self.unique_name(&name, input_number);
            debug!(from = %name, to = %renamed, "Renamed conflicting field");
            self.insert_field(renamed, values, widgets);
            return;
        }

        match self.by_name.get(&name) {
            Some(&index) => {
                let existing = &mut self.fields[index];
                existing.widgets.extend(widgets);
                if let Ok(value) = values.get(b"V") {
                    existing.values.set("V", value.clone());
                }
            }
            None => self.insert_field(name, values, widgets),
        }
    }

    fn insert_field(&mut self, name: String, values: Dictionary, widgets: Vec<ObjectId>) {
        self.by_name.insert(name.clone(), self.fields.len());
        self.fields.push(MergedField { name, values, widgets });
    }

    /// True if `name` exists or clashes with the hierarchy of an existing field.
    fn is_taken(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
            || self.by_name.keys().any(|existing| {
                is_ancestor_name(existing, name) || is_ancestor_name(name, existing)
            })
    }

    fn unique_name(&self, name: &str, input_number: usize) -> String {
        let base = format!("{name}_{input_number}");
        if !self.is_taken(&base) {
            return base;
        }
        let numbered = (1u32..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.is_taken(candidate));
        numbered.unwrap_or(base)
    }

    fn merge_form_defaults(&mut self, importer: &mut PageImporter<'_>, dest: &mut DestinationDocument, form: &Dictionary) {
        let doc = importer.source().document();
        if self.default_appearance.is_none() {
            self.default_appearance = resolve_key(doc, form, b"DA").cloned();
        }
        if matches!(resolve_key(doc, form, b"NeedAppearances"), Some(Object::Boolean(true))) {
            self.need_appearances = true;
        }
        if let Some(flags) = resolve_key(doc, form, b"SigFlags").and_then(number) {
            self.sig_flags |= flags as i64;
        }
        let fonts = resolve_dict(doc, form, b"DR").and_then(|dr| resolve_dict(doc, dr, b"Font"));
        if let Some(fonts) = fonts {
            for (name, font) in fonts.iter() {
                if !self.fonts.has(name) {
                    let copied = importer.translate(dest, font);
                    self.fonts.set(name.clone(), copied);
                }
            }
        }
    }

    /// Write the merged form into the destination catalog, if it has fields.
    pub fn attach(&self, dest: &mut DestinationDocument) -> Result<()> {
        if !self.has_fields() {
            return Ok(());
        }

        let mut root = FieldNode::default();
        for (index, field) in self.fields.iter().enumerate() {
            root.insert(field.name.split('.'), index);
        }
        let top_level = root.write(self, dest, None);

        let mut form = Dictionary::new();
        form.set("Fields", top_level.into_iter().map(Object::Reference).collect::<Vec<_>>());
        if let Some(da) = &self.default_appearance {
            form.set("DA", da.clone());
        }
        if !self.fonts.is_empty() {
            let mut resources = Dictionary::new();
            resources.set("Font", self.fonts.clone());
            form.set("DR", resources);
        }
        if self.need_appearances {
            form.set("NeedAppearances", true);
        }
        if self.sig_flags != 0 {
            form.set("SigFlags", self.sig_flags);
        }
        let form_id = dest.add_object(form);
        dest.set_catalog_entry("AcroForm", form_id)
    }
}

/// Node of the rebuilt field hierarchy.
#[derive(Default)]
struct FieldNode {
    field: Option<usize>,
    children: Vec<(String, FieldNode)>,
}

impl FieldNode {
    fn insert<'a>(&mut self, mut segments: impl Iterator<Item = &'a str>, field: usize) {
        let Some(segment) = segments.next() else {
            self.field = Some(field);
            return;
        };
        let position = self.children.iter().position(|(name, _)| name == segment);
        let index = match position {
            Some(index) => index,
            None => {
                self.children.push((segment.to_string(), FieldNode::default()));
                self.children.len() - 1
            }
        };
        self.children[index].1.insert(segments, field);
    }

    /// Write the children of this node and return their ids.
    fn write(&self, merger: &AcroFormsMerger, dest: &mut DestinationDocument, parent: Option<ObjectId>) -> Vec<ObjectId> {
        let mut ids = Vec::with_capacity(self.children.len());
        for (segment, node) in &self.children {
            let id = dest.new_object_id();
            let mut dict = Dictionary::new();
            dict.set("T", crate::utils::encode_text_string(segment));
            if let Some(parent) = parent {
                dict.set("Parent", parent);
            }

            let mut kids: Vec<Object> = node
                .write(merger, dest, Some(id))
                .into_iter()
                .map(Object::Reference)
                .collect();

            if let Some(field) = node.field.map(|index| &merger.fields[index]) {
                for (key, value) in field.values.iter() {
                    dict.set(key.clone(), value.clone());
                }
                for widget in &field.widgets {
                    if let Some(widget_dict) = dest.dictionary_mut(*widget) {
                        for key in WIDGET_FIELD_KEYS {
                            widget_dict.remove(key);
                        }
                        widget_dict.set("Parent", id);
                    }
                    kids.push(Object::Reference(*widget));
                }
            }
            dict.set("Kids", kids);
            dest.insert_object(id, dict);
            ids.push(id);
        }
        ids
    }
}

/// True if `ancestor` is a proper prefix of `name` in the field hierarchy.
fn is_ancestor_name(ancestor: &str, name: &str) -> bool {
    name.len() > ancestor.len() && name.starts_with(ancestor) && name.as_bytes()[ancestor.len()] == b'.'
}

/// Terminal fields of a source form.
fn read_fields(source: &SourceDocument, form: &Dictionary) -> Vec<SourceField> {
    let doc = source.document();
    let mut fields = Vec::new();
    let mut visited = HashSet::new();
    if let Some(Object::Array(roots)) = resolve_key(doc, form, b"Fields") {
        for root in roots {
            if let Object::Reference(id) = root {
                collect_fields(source, *id, None, &Dictionary::new(), &mut visited, &mut fields, 0);
            }
        }
    }
    fields
}

fn collect_fields(
    source: &SourceDocument,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    fields: &mut Vec<SourceField>,
    depth: usize,
) {
    if depth > MAX_FIELD_DEPTH || !visited.insert(id) {
        return;
    }
    let doc = source.document();
    let Ok(node) = doc.get_dictionary(id) else {
        return;
    };

    let partial = resolve_key(doc, node, b"T").and_then(text_string);
    let name = match (parent_name, partial) {
        (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
        (None, Some(partial)) => partial,
        (Some(parent), None) => parent.to_string(),
        (None, None) => String::new(),
    };

    let mut values = Dictionary::new();
    for key in INHERITABLE_KEYS {
        if let Ok(value) = node.get(key).or_else(|_| inherited.get(key)) {
            values.set(key.to_vec(), value.clone());
        }
    }

    let kids: Vec<(ObjectId, &Dictionary)> = match resolve_key(doc, node, b"Kids") {
        Some(Object::Array(kids)) => kids
            .iter()
            .filter_map(|kid| match kid {
                Object::Reference(kid_id) => doc.get_dictionary(*kid_id).ok().map(|dict| (*kid_id, dict)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    let (child_fields, widgets): (Vec<_>, Vec<_>) = kids.into_iter().partition(|(_, kid)| kid.has(b"T"));

    for (child_id, _) in child_fields {
        collect_fields(source, child_id, Some(&name), &values, visited, fields, depth + 1);
    }

    let mut widget_ids: Vec<ObjectId> = widgets
        .into_iter()
        .filter(|(_, kid)| has_name(kid, b"Subtype", b"Widget") || !kid.has(b"Kids"))
        .map(|(kid_id, _)| kid_id)
        .collect();
    if has_name(node, b"Subtype", b"Widget") {
        widget_ids.push(id);
    }
    if widget_ids.is_empty() || name.is_empty() {
        return;
    }

    for key in FIELD_KEYS {
        if let Ok(value) = node.get(key) {
            values.set(key.to_vec(), value.clone());
        }
    }
    fields.push(SourceField {
        name,
        values,
        widgets: widget_ids,
    });
}

/// Remove signature values from imported signature widgets.
///
/// The merged document no longer covers the signed byte ranges, so the
/// signatures are cleared rather than left invalid. Returns how many widgets
/// were clipped.
pub fn clip_signatures(
    source: &SourceDocument,
    dest: &mut DestinationDocument,
    annotations: &HashMap<ObjectId, ObjectId>,
) -> usize {
    let doc = source.document();
    let mut clipped = 0;
    for (source_id, dest_id) in annotations {
        let Ok(annot) = doc.get_dictionary(*source_id) else {
            continue;
        };
        if !has_name(annot, b"Subtype", b"Widget") || !is_signature_widget(source, annot) {
            continue;
        }
        if let Some(widget) = dest.dictionary_mut(*dest_id) {
            for key in SIGNATURE_KEYS {
                widget.remove(key);
            }
            clipped += 1;
        }
    }
    if clipped > 0 {
        debug!(source = source.name(), clipped, "Cleared signature values");
    }
    clipped
}

fn is_signature_widget(source: &SourceDocument, widget: &Dictionary) -> bool {
    let doc = source.document();
    let mut node = widget;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Some(field_type) = resolve_key(doc, node, b"FT") {
            return matches!(field_type, Object::Name(name) if name == b"Sig");
        }
        match node.get(b"Parent").ok().and_then(|parent| resolve(doc, parent)) {
            Some(Object::Dictionary(parent)) => node = parent,
            _ => return false,
        }
    }
    false
}
