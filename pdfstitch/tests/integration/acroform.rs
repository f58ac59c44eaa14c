//! Integration tests for form merging.

use rstest::rstest;

use pdfstitch::config::AcroFormPolicy;
use pdfstitch::context::ExecutionContext;
use pdfstitch::input::{MergeInput, Source};
use pdfstitch::merge::merge;

use crate::common::{TestPdf, Workspace, catalog, deref, field_names, load, page_ids, widget_count};

fn forms(ws: &Workspace) -> (std::path::PathBuf, std::path::PathBuf) {
    let a = ws.save("a.pdf", TestPdf::new(1).text_field("name", 1).text_field("city", 1));
    let b = ws.save("b.pdf", TestPdf::new(2).text_field("name", 2));
    (a, b)
}

#[rstest]
#[case(AcroFormPolicy::MergeRenamingExistingFields, vec!["name", "city", "name_2"])]
#[case(AcroFormPolicy::Merge, vec!["name", "city"])]
#[case(AcroFormPolicy::Discard, vec![])]
#[tokio::test]
async fn test_form_policies(#[case] policy: AcroFormPolicy, #[case] expected: Vec<&str>) {
    let ws = Workspace::new();
    let (a, b) = forms(&ws);
    let mut params = ws.merge_params(&[&a, &b]);
    params.acroform_policy = policy;

    let outcome = merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    assert_eq!(field_names(&doc), expected);
    assert_eq!(outcome.statistics.form_fields, expected.len());
    if policy == AcroFormPolicy::Discard {
        assert!(!catalog(&doc).has(b"AcroForm"));
    }
    let widgets: usize = page_ids(&doc).into_iter().map(|page| widget_count(&doc, page)).sum();
    let expected_widgets = match policy {
        AcroFormPolicy::Discard => 0,
        _ => 3,
    };
    assert_eq!(widgets, expected_widgets);
}

#[tokio::test]
async fn test_merged_field_collects_widgets() {
    let ws = Workspace::new();
    let (a, b) = forms(&ws);
    let mut params = ws.merge_params(&[&a, &b]);
    params.acroform_policy = AcroFormPolicy::Merge;

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    let form = deref(&doc, catalog(&doc).get(b"AcroForm").unwrap()).as_dict().unwrap();
    let fields = form.get(b"Fields").unwrap().as_array().unwrap();
    let name = deref(&doc, &fields[0]).as_dict().unwrap();
    assert_eq!(name.get(b"Kids").unwrap().as_array().unwrap().len(), 2);
    assert!(form.has(b"DA"));
}

#[tokio::test]
async fn test_fields_on_unselected_pages_are_dropped() {
    let ws = Workspace::new();
    let (a, b) = forms(&ws);
    let mut params = ws.merge_params(&[&a]);
    params.inputs.push(MergeInput::pdf(Source::file(&b), "1".parse().unwrap()));

    merge(&params, &mut ExecutionContext::new()).await.unwrap();

    let doc = load(&ws.path("out.pdf"));
    assert_eq!(field_names(&doc), vec!["name", "city"]);
}
