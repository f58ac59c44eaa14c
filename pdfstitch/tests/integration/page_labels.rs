//! Integration tests for page label merging.

use pdfstitch::config::PageLabelsPolicy;
use pdfstitch::context::ExecutionContext;
use pdfstitch::input::{MergeInput, Source};
use pdfstitch::merge::merge;

use crate::common::{TestPdf, Workspace, catalog, decode, label_style, load, page_labels};

fn front_matter(ws: &Workspace) -> std::path::PathBuf {
    ws.save(
        "book.pdf",
        TestPdf::new(4)
            .label_range(0, "r", None, None)
            .label_range(2, "D", Some("A-"), Some(1)),
    )
}

#[tokio::test]
async fn test_labels_are_remapped() {
    let ws = Workspace::new();
    let book = front_matter(&ws);
    let plain = ws.pdf("plain.pdf", 2);
    let mut params = ws.merge_params(&[&book, &plain]);
    params.page_labels_policy = PageLabelsPolicy::Retain;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let labels = page_labels(&doc);
    let starts: Vec<i64> = labels.iter().map(|(index, _)| *index).collect();
    assert_eq!(starts, vec![0, 2, 4]);
    let styles: Vec<Option<String>> = labels.iter().map(|(_, label)| label_style(label)).collect();
    assert_eq!(styles, vec![Some("r".into()), Some("D".into()), Some("D".into())]);
    assert_eq!(decode(labels[1].1.get(b"P").unwrap()), "A-");
    assert!(!labels[2].1.has(b"P"));
}

#[tokio::test]
async fn test_selection_restarts_ranges() {
    let ws = Workspace::new();
    let book = front_matter(&ws);
    let mut params = ws.merge_params(&[]);
    params.inputs.push(MergeInput::pdf(Source::file(&book), "1,4".parse().unwrap()));
    params.page_labels_policy = PageLabelsPolicy::Retain;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let labels = page_labels(&doc);
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[1].0, 1);
    assert_eq!(labels[1].1.get(b"St").unwrap().as_i64().unwrap(), 2);
}

#[tokio::test]
async fn test_discard_writes_no_labels() {
    let ws = Workspace::new();
    let book = front_matter(&ws);
    let params = ws.merge_params(&[&book]);

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    assert!(!catalog(&doc).has(b"PageLabels"));
}

#[tokio::test]
async fn test_unlabelled_inputs_write_no_labels() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 2);
    let b = ws.pdf("b.pdf", 1);
    let mut params = ws.merge_params(&[&a, &b]);
    params.page_labels_policy = PageLabelsPolicy::Retain;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    assert!(!catalog(&doc).has(b"PageLabels"));
}
