//! Integration tests for plain merges.

use rstest::rstest;

use pdfstitch::config::{CompressionLevel, Metadata};
use pdfstitch::context::ExecutionContext;
use pdfstitch::input::{MergeInput, Source};
use pdfstitch::io::PublishOutcome;
use pdfstitch::merge::merge;

use crate::common::{A4, LETTER, TestPdf, Workspace, decode, load, page_ids, page_width};

#[tokio::test]
async fn test_merge_two_documents() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 3);
    let b = ws.pdf("b.pdf", 2);
    let params = ws.merge_params(&[&a, &b]);

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.inputs, 2);
    assert_eq!(outcome.statistics.pages, 5);
    assert!(outcome.warnings.is_empty());
    let written = outcome.output.written_path().unwrap();
    assert_eq!(written, ws.path("out.pdf"));
    assert!(outcome.statistics.output_size > 0);
    assert_eq!(load(written).get_pages().len(), 5);
}

#[rstest]
#[case("1", 1)]
#[case("2-3", 2)]
#[case("3-", 2)]
#[case("1,4", 2)]
#[case("2-9", 3)]
#[tokio::test]
async fn test_merge_page_selection(#[case] selection: &str, #[case] expected: usize) {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 4);
    let mut params = ws.merge_params(&[]);
    params.inputs.push(MergeInput::pdf(Source::file(&a), selection.parse().unwrap()));

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.pages, expected);
    assert_eq!(load(&ws.path("out.pdf")).get_pages().len(), expected);
}

#[tokio::test]
async fn test_merge_image_input() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 2);
    let png = ws.png("scan.png", 40, 20);
    let mut params = ws.merge_params(&[&a]);
    params.inputs.push(MergeInput::image(Source::file(&png)));

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.inputs, 2);
    assert_eq!(outcome.statistics.pages, 3);
    let doc = load(&ws.path("out.pdf"));
    let image_page = doc.get_dictionary(page_ids(&doc)[2]).unwrap();
    assert!(image_page.has(b"Resources"));
}

#[tokio::test]
async fn test_merge_from_memory() {
    let ws = Workspace::new();
    let mut bytes = Vec::new();
    TestPdf::new(2).build().save_to(&mut bytes).unwrap();
    let mut params = ws.merge_params(&[]);
    params.inputs.push(MergeInput::all_pages(Source::bytes("memory.pdf", bytes)));

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.pages, 2);
}

#[tokio::test]
async fn test_blank_page_if_odd() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 3);
    let b = ws.pdf("b.pdf", 2);
    let c = ws.pdf("c.pdf", 1);
    let mut params = ws.merge_params(&[&a, &b, &c]);
    params.blank_page_if_odd = true;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.blank_pages, 2);
    assert_eq!(outcome.statistics.pages, 8);
    let doc = load(&ws.path("out.pdf"));
    let pages = page_ids(&doc);
    assert!(!doc.get_dictionary(pages[3]).unwrap().has(b"Contents"));
    assert!(!doc.get_dictionary(pages[7]).unwrap().has(b"Contents"));
}

#[tokio::test]
async fn test_filename_footer() {
    let ws = Workspace::new();
    let a = ws.pdf("chapter.pdf", 2);
    let mut params = ws.merge_params(&[&a]);
    params.filename_footer = true;
    params.output.compression = CompressionLevel::None;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let pages = page_ids(&doc);
    for (index, page) in pages.iter().enumerate() {
        let content = doc.get_page_content(*page).unwrap();
        let expected = format!("(chapter - {})", index + 1);
        assert!(
            content.windows(expected.len()).any(|window| window == expected.as_bytes()),
            "missing footer on page {}",
            index + 1
        );
    }
}

#[tokio::test]
async fn test_normalize_page_sizes() {
    let ws = Workspace::new();
    let a = ws.save("a.pdf", TestPdf::with_sizes(vec![A4]));
    let b = ws.save("b.pdf", TestPdf::with_sizes(vec![LETTER, [0.0, 0.0, 1190.0, 1684.0]]));
    let mut params = ws.merge_params(&[&a, &b]);
    params.normalize_page_sizes = true;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    for page in page_ids(&doc) {
        assert!((page_width(&doc, page) - 595.0).abs() < 0.5);
    }
}

#[tokio::test]
async fn test_metadata_is_written() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    let mut params = ws.merge_params(&[&a]);
    params.output.metadata = Metadata {
        title: Some("Collected Papers".to_string()),
        author: Some("Research Group".to_string()),
        ..Metadata::default()
    };

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let info = match doc.trailer.get(b"Info").unwrap() {
        lopdf::Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        other => panic!("unexpected Info {other:?}"),
    };
    assert_eq!(decode(info.get(b"Title").unwrap()), "Collected Papers");
    assert_eq!(decode(info.get(b"Author").unwrap()), "Research Group");
    assert_eq!(decode(info.get(b"Producer").unwrap()), "pdfstitch");
}

#[tokio::test]
async fn test_progress_is_reported_per_input() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    let b = ws.pdf("b.pdf", 1);
    let params = ws.merge_params(&[&a, &b]);
    let steps = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorded = steps.clone();
    let mut ctx = ExecutionContext::new().on_progress(move |done, total| {
        recorded.lock().unwrap().push((done, total));
    });

    merge(&params, &mut ctx).await.unwrap();

    assert_eq!(*steps.lock().unwrap(), vec![(1, 2), (2, 2)]);
}

#[tokio::test]
async fn test_existing_output_rename() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    std::fs::write(ws.path("out.pdf"), b"keep me").unwrap();
    let mut params = ws.merge_params(&[&a]);
    params.output.existing_output = pdfstitch::config::ExistingOutputPolicy::Rename;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.output.written_path().unwrap(), ws.path("out(1).pdf"));
    assert_eq!(std::fs::read(ws.path("out.pdf")).unwrap(), b"keep me");
}

#[tokio::test]
async fn test_existing_output_skip() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    std::fs::write(ws.path("out.pdf"), b"keep me").unwrap();
    let mut params = ws.merge_params(&[&a]);
    params.output.existing_output = pdfstitch::config::ExistingOutputPolicy::Skip;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert!(matches!(outcome.output, PublishOutcome::Skipped { .. }));
    assert_eq!(std::fs::read(ws.path("out.pdf")).unwrap(), b"keep me");
}

#[tokio::test]
async fn test_merging_twice_gives_the_same_result() {
    let ws = Workspace::new();
    let a = ws.save("a.pdf", TestPdf::new(3).bookmark("Start", 1).text_field("name", 2));
    let b = ws.save("b.pdf", TestPdf::new(1).text_field("name", 1));
    let mut params = ws.merge_params(&[&a, &b]);
    params.blank_page_if_odd = true;
    params.toc_policy = pdfstitch::config::TocPolicy::FileNames;

    let first = merge(&params, &mut ExecutionContext::new()).await.unwrap();
    let second = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(first.statistics.pages, second.statistics.pages);
    assert_eq!(first.statistics.outline_entries, second.statistics.outline_entries);
    assert_eq!(first.statistics.form_fields, second.statistics.form_fields);
    assert_eq!(first.statistics.pages, 4 + 2 + 1);
}
