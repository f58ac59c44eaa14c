//! Integration tests for failures, leniency and cancellation.

use pdfstitch::config::ExistingOutputPolicy;
use pdfstitch::context::{CancellationToken, ExecutionContext};
use pdfstitch::error::StitchError;
use pdfstitch::input::{MergeInput, Source};
use pdfstitch::merge::merge;

use crate::common::{TestPdf, Workspace, load};

#[tokio::test]
async fn test_missing_input() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    let missing = ws.path("missing.pdf");
    let params = ws.merge_params(&[&a, &missing]);

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::FileNotFound { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!ws.path("out.pdf").exists());
}

#[tokio::test]
async fn test_not_a_pdf() {
    let ws = Workspace::new();
    let bogus = ws.path("bogus.pdf");
    std::fs::write(&bogus, b"this is not a pdf").unwrap();
    let params = ws.merge_params(&[&bogus]);

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::FailedToLoadPdf { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_no_inputs() {
    let ws = Workspace::new();
    let params = ws.merge_params(&[]);

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::NoInputs));
}

#[tokio::test]
async fn test_output_among_inputs() {
    let ws = Workspace::new();
    let a = ws.pdf("out.pdf", 1);
    let params = ws.merge_params(&[&a]);

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::InvalidParameters { .. }));
}

#[tokio::test]
async fn test_existing_output_fails_by_default() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    std::fs::write(ws.path("out.pdf"), b"keep me").unwrap();
    let mut params = ws.merge_params(&[&a]);
    params.output.existing_output = ExistingOutputPolicy::Fail;

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::OutputExists { .. }));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(std::fs::read(ws.path("out.pdf")).unwrap(), b"keep me");
}

fn broken(ws: &Workspace) -> std::path::PathBuf {
    ws.save(
        "broken.pdf",
        TestPdf::with_sizes(vec![[0.0, 0.0, 612.0, 792.0], [0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 612.0, 792.0]]),
    )
}

#[tokio::test]
async fn test_broken_page_fails_strict_merge() {
    let ws = Workspace::new();
    let broken = broken(&ws);
    let params = ws.merge_params(&[&broken]);

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::PageImport(_)));
    assert!(!ws.path("out.pdf").exists());
}

#[tokio::test]
async fn test_broken_page_is_skipped_when_lenient() {
    let ws = Workspace::new();
    let broken = broken(&ws);
    let params = ws.merge_params(&[&broken]);
    let mut ctx = ExecutionContext::new().lenient(true);

    let outcome = merge(&params, &mut ctx).await.unwrap();

    assert_eq!(outcome.statistics.pages, 2);
    assert_eq!(outcome.statistics.skipped_pages, 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(load(&ws.path("out.pdf")).get_pages().len(), 2);
}

#[tokio::test]
async fn test_cancelled_merge_writes_nothing() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 2);
    let params = ws.merge_params(&[&a]);
    let token = CancellationToken::new();
    token.cancel();
    let mut ctx = ExecutionContext::new().with_cancellation(token);

    let err = merge(&params, &mut ctx).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.exit_code(), 130);
    assert!(!ws.path("out.pdf").exists());
}

#[tokio::test]
async fn test_cancel_from_progress_callback() {
    let ws = Workspace::new();
    let a = ws.pdf("a.pdf", 1);
    let b = ws.pdf("b.pdf", 1);
    let c = ws.pdf("c.pdf", 1);
    let params = ws.merge_params(&[&a, &b, &c]);
    let token = CancellationToken::new();
    let trigger = token.clone();
    let mut ctx = ExecutionContext::new()
        .with_cancellation(token)
        .on_progress(move |done, _| {
            if done == 1 {
                trigger.cancel();
            }
        });

    let err = merge(&params, &mut ctx).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(!ws.path("out.pdf").exists());
}

#[tokio::test]
async fn test_bad_image() {
    let ws = Workspace::new();
    let fake = ws.path("fake.png");
    std::fs::write(&fake, b"not an image").unwrap();
    let mut params = ws.merge_params(&[]);
    params.inputs.push(MergeInput::image(Source::file(&fake)));

    let err = merge(&params, &mut ExecutionContext::new()).await.unwrap_err();

    assert!(matches!(err, StitchError::ImageConversion { .. }));
}
