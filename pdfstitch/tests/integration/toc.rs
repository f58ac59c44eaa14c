//! Integration tests for the generated table of contents.

use pdfstitch::config::{CompressionLevel, PageLabelsPolicy, TocPolicy};
use pdfstitch::context::ExecutionContext;
use pdfstitch::merge::merge;

use crate::common::{TestPdf, Workspace, deref, destination_page, label_style, link_count, load, page_ids, page_labels};

fn link_targets(doc: &lopdf::Document, page: lopdf::ObjectId) -> Vec<Option<usize>> {
    let page = doc.get_dictionary(page).unwrap();
    let annots = deref(doc, page.get(b"Annots").unwrap()).as_array().unwrap();
    annots
        .iter()
        .map(|annot| destination_page(doc, deref(doc, annot).as_dict().unwrap()))
        .collect()
}

#[tokio::test]
async fn test_toc_is_first_and_links_to_inputs() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 3);
    let b = ws.pdf("b.pdf", 2);
    let mut params = ws.merge_params(&[&a, &b]);
    params.toc_policy = TocPolicy::FileNames;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.toc_pages, 1);
    assert_eq!(outcome.statistics.pages, 6);
    let doc = load(&ws.path("out.pdf"));
    let pages = page_ids(&doc);
    assert_eq!(link_count(&doc, pages[0]), 2);
    assert_eq!(link_targets(&doc, pages[0]), vec![Some(2), Some(5)]);
}

#[tokio::test]
async fn test_cover_title_places_toc_after_first_input() {
    let ws = Workspace::new();
    let cover = ws.pdf("cover.pdf", 1);
    let a = ws.pdf("a.pdf", 2);
    let b = ws.pdf("b.pdf", 2);
    let mut params = ws.merge_params(&[&cover, &a, &b]);
    params.toc_policy = TocPolicy::FileNames;
    params.first_input_cover_title = true;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.pages, 6);
    let doc = load(&ws.path("out.pdf"));
    let pages = page_ids(&doc);
    assert_eq!(link_count(&doc, pages[0]), 0);
    assert_eq!(link_targets(&doc, pages[1]), vec![Some(3), Some(5)]);
}

#[tokio::test]
async fn test_toc_uses_document_titles() {
    let ws = Workspace::new();
    let a = ws.save("a.pdf", TestPdf::new(1).title("Annual Report"));
    let b = ws.pdf("b.pdf", 1);
    let mut params = ws.merge_params(&[&a, &b]);
    params.toc_policy = TocPolicy::DocTitles;
    params.output.compression = CompressionLevel::None;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let content = doc.get_page_content(page_ids(&doc)[0]).unwrap();
    let contains = |needle: &[u8]| content.windows(needle.len()).any(|window| window == needle);
    assert!(contains(b"(Annual Report)"));
    assert!(contains(b"(b)"));
}

#[tokio::test]
async fn test_toc_spans_pages_for_many_inputs() {
    let ws = Workspace::new();
    let inputs: Vec<_> = (0..45).map(|i| ws.pdf(&format!("part{i:02}.pdf"), 1)).collect();
    let refs: Vec<&std::path::Path> = inputs.iter().map(|p| p.as_path()).collect();
    let mut params = ws.merge_params(&refs);
    params.toc_policy = TocPolicy::FileNames;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert!(outcome.statistics.toc_pages >= 2);
    assert_eq!(outcome.statistics.pages, 45 + outcome.statistics.toc_pages);
    let doc = load(&ws.path("out.pdf"));
    let pages = page_ids(&doc);
    let links: usize = pages[..outcome.statistics.toc_pages]
        .iter()
        .map(|page| link_count(&doc, *page))
        .sum();
    assert_eq!(links, 45);
}

#[tokio::test]
async fn test_toc_pages_get_roman_labels() {
    let ws = Workspace::new();
    let a = ws.save("a.pdf", TestPdf::new(2).label_range(0, "D", None, Some(5)));
    let b = ws.pdf("b.pdf", 1);
    let mut params = ws.merge_params(&[&a, &b]);
    params.toc_policy = TocPolicy::FileNames;
    params.page_labels_policy = PageLabelsPolicy::Retain;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let labels = page_labels(&doc);
    let starts: Vec<i64> = labels.iter().map(|(index, _)| *index).collect();
    assert_eq!(starts, vec![0, 1, 3]);
    assert_eq!(label_style(&labels[0].1).as_deref(), Some("r"));
    assert_eq!(labels[1].1.get(b"St").unwrap().as_i64().unwrap(), 5);
}

#[tokio::test]
async fn test_two_single_page_inputs() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    let b = ws.pdf("b.pdf", 1);
    let mut params = ws.merge_params(&[&a, &b]);
    params.toc_policy = TocPolicy::FileNames;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.pages, 3);
    let doc = load(&ws.path("out.pdf"));
    assert_eq!(link_targets(&doc, page_ids(&doc)[0]), vec![Some(2), Some(3)]);
}
