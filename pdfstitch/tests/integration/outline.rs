//! Integration tests for outline merging.

use rstest::rstest;

use pdfstitch::config::OutlinePolicy;
use pdfstitch::context::ExecutionContext;
use pdfstitch::input::{MergeInput, Source};
use pdfstitch::merge::merge;

use crate::common::{TestPdf, Workspace, catalog, destination_page, load, outline_children, outline_items, outline_titles, title};

fn sources(ws: &Workspace) -> (std::path::PathBuf, std::path::PathBuf) {
    let a = ws.save(
        "a.pdf",
        TestPdf::new(2).bookmark("Introduction", 1).bookmark("Method", 2),
    );
    let b = ws.save("b.pdf", TestPdf::new(2).bookmark("Results", 2));
    (a, b)
}

#[rstest]
#[case(OutlinePolicy::Retain, vec!["Introduction", "Method", "Results"])]
#[case(OutlinePolicy::OneEntryEachDoc, vec!["a", "b"])]
#[case(OutlinePolicy::RetainAsOneEntry, vec!["a", "b"])]
#[case(OutlinePolicy::Discard, vec![])]
#[tokio::test]
async fn test_outline_policies(#[case] policy: OutlinePolicy, #[case] expected: Vec<&str>) {
    let ws = Workspace::new();
    let (a, b) = sources(&ws);
    let mut params = ws.merge_params(&[&a, &b]);
    params.outline_policy = policy;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    assert_eq!(outline_titles(&doc), expected);
    if policy == OutlinePolicy::Discard {
        assert!(!catalog(&doc).has(b"Outlines"));
    }
}

#[tokio::test]
async fn test_retained_bookmarks_point_at_output_pages() {
    let ws = Workspace::new();
    let (a, b) = sources(&ws);
    let params = ws.merge_params(&[&a, &b]);

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.outline_entries, 3);
    let doc = load(&ws.path("out.pdf"));
    let items = outline_items(&doc);
    let pages: Vec<Option<usize>> = items.iter().map(|item| destination_page(&doc, item)).collect();
    assert_eq!(pages, vec![Some(1), Some(2), Some(4)]);
}

#[tokio::test]
async fn test_retain_as_one_entry_nests_bookmarks() {
    let ws = Workspace::new();
    let (a, b) = sources(&ws);
    let mut params = ws.merge_params(&[&a, &b]);
    params.outline_policy = OutlinePolicy::RetainAsOneEntry;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let top = outline_items(&doc);
    assert_eq!(destination_page(&doc, top[1]), Some(3));
    let children: Vec<String> = outline_children(&doc, top[0]).into_iter().map(title).collect();
    assert_eq!(children, vec!["Introduction", "Method"]);
}

#[tokio::test]
async fn test_bookmarks_to_unselected_pages_are_dropped() {
    let ws = Workspace::new();
    let (a, b) = sources(&ws);
    let mut params = ws.merge_params(&[]);
    params.inputs.push(MergeInput::pdf(Source::file(&a), "1".parse().unwrap()));
    params.inputs.push(MergeInput::pdf(Source::file(&b), "1".parse().unwrap()));

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    assert_eq!(outline_titles(&doc), vec!["Introduction"]);
}
