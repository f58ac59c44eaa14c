//! Integration tests for the alternate mix.

use pdfstitch::config::{AlternateMixParameters, ExistingOutputPolicy, OutputTarget};
use pdfstitch::context::ExecutionContext;
use pdfstitch::input::{PdfMixInput, Source};
use pdfstitch::merge::mix;

use crate::common::{LETTER, TestPdf, Workspace, load, page_ids, page_width};

fn widths(ws: &Workspace) -> Vec<f32> {
    let doc = load(&ws.path("out.pdf"));
    page_ids(&doc)
        .into_iter()
        .map(|page| page_width(&doc, page).round())
        .collect()
}

fn params(ws: &Workspace, inputs: Vec<PdfMixInput>) -> AlternateMixParameters {
    let target = OutputTarget::new(ws.path("out.pdf")).with_existing_output(ExistingOutputPolicy::Overwrite);
    inputs
        .into_iter()
        .fold(AlternateMixParameters::new(target), AlternateMixParameters::with_input)
}

fn backs(ws: &Workspace) -> std::path::PathBuf {
    ws.save(
        "backs.pdf",
        TestPdf::with_sizes(vec![
            [0.0, 0.0, 100.0, 100.0],
            [0.0, 0.0, 200.0, 100.0],
            [0.0, 0.0, 300.0, 100.0],
        ]),
    )
}

#[tokio::test]
async fn test_mix_with_reversed_backs() {
    let ws = Workspace::new();
    let fronts = ws.pdf("fronts.pdf", 3);
    let backs = backs(&ws);
    let mut back = PdfMixInput::new(Source::file(&backs));
    back.reverse = true;
    let params = params(&ws, vec![PdfMixInput::new(Source::file(&fronts)), back]);

    let outcome = mix(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(outcome.statistics.pages, 6);
    assert_eq!(outcome.statistics.inputs, 2);
    assert_eq!(widths(&ws), vec![612.0, 300.0, 612.0, 200.0, 612.0, 100.0]);
}

#[tokio::test]
async fn test_mix_steps_and_uneven_inputs() {
    let ws = Workspace::new();
    let fronts = ws.save("fronts.pdf", TestPdf::with_sizes(vec![LETTER; 5]));
    let backs = backs(&ws);
    let mut front = PdfMixInput::new(Source::file(&fronts));
    front.step = 2;
    let params = params(&ws, vec![front, PdfMixInput::new(Source::file(&backs))]);

    mix(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(
        widths(&ws),
        vec![612.0, 612.0, 100.0, 612.0, 612.0, 200.0, 612.0, 300.0]
    );
}

#[tokio::test]
async fn test_mix_with_selection() {
    let ws = Workspace::new();
    let fronts = ws.pdf("fronts.pdf", 3);
    let backs = backs(&ws);
    let mut back = PdfMixInput::new(Source::file(&backs));
    back.selection = "2-".parse().unwrap();
    let params = params(&ws, vec![PdfMixInput::new(Source::file(&fronts)), back]);

    mix(&params, &mut ExecutionContext::new()).await.unwrap();

    assert_eq!(widths(&ws), vec![612.0, 200.0, 612.0, 300.0, 612.0]);
}
