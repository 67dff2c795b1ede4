use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use htsf_intake::assemble::Engine;
use htsf_intake::config::EngineConfig;
use htsf_intake::domain::{SENTINEL_NAMES, SampleType, SequencingType};
use htsf_intake::error::IntakeError;
use htsf_intake::text::{PdfTextExtractor, PlainTextExtractor};

const FORM: &str = include_str!("fixtures/htsf_form.txt");

fn engine() -> Engine<PlainTextExtractor> {
    Engine::new(PlainTextExtractor, EngineConfig::default())
}

fn make_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
        operations.push(Operation::new(
            "Td",
            vec![50.into(), (780 - 14 * i as i64).into()],
        ));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn full_form_assembles_into_one_record() {
    let scanned_at = Utc.with_ymd_and_hms(2025, 9, 3, 14, 5, 9).unwrap();
    let submission = engine()
        .parse_at(FORM.as_bytes(), "custom_forms_11095857.pdf", scanned_at)
        .unwrap();

    assert_eq!(submission.submission_id(), "HTSFJL147_20250903_140509");
    assert_eq!(submission.project_id(), Some("HTSF-JL-147"));
    assert_eq!(submission.filename(), "custom_forms_11095857.pdf");
    assert_eq!(submission.sequencing_type(), Some(SequencingType::Ligation));
    assert_eq!(submission.sample_type(), SampleType::PcrAmplicons);
    assert_eq!(submission.samples().len(), 5);
    assert_eq!(submission.total_samples(), 3);
    assert_eq!(submission.scanned_at(), scanned_at);
    assert!(
        submission
            .uuid()
            .to_string()
            .starts_with(submission.short_ref())
    );
}

#[test]
fn project_id_scenario() {
    let submission = engine()
        .parse(b"Service Project HTSF-JL-147\n", "form.txt")
        .unwrap();
    assert_eq!(submission.project_id(), Some("HTSF-JL-147"));
    assert!(submission.submission_id().starts_with("HTSFJL147_"));
}

#[test]
fn sample_row_scenario() {
    let submission = engine().parse(b"3\n12\n2\n45.67\n1.85", "form.txt").unwrap();
    let sample = &submission.samples()[0];
    assert_eq!(submission.samples().len(), 1);
    assert_eq!(sample.name, "12");
    assert_eq!(sample.nanodrop_conc, 45.67);
    assert_eq!(sample.a260_280_ratio, 1.85);
    assert_eq!(sample.volume_ul, 2.0);
    assert_eq!(sample.qubit_conc, 0.0);
    assert_eq!(sample.a260_230_ratio, None);
    assert!(submission.submission_id().starts_with("SUBMISSION_"));
}

#[test]
fn sentinels_are_excluded_from_total() {
    let submission = engine()
        .parse(b"1\n7\n2\n10.5\n1.80\nPositive control\nBLANK\n", "form.txt")
        .unwrap();
    assert_eq!(submission.samples().len(), 3);
    assert_eq!(submission.total_samples(), 1);
    for control in &submission.samples()[1..] {
        assert!(control.is_control());
        assert_eq!(control.nanodrop_conc, 0.0);
        assert_eq!(control.volume_ul, 0.0);
    }
}

#[test]
fn total_samples_invariant_holds() {
    let inputs = [
        FORM,
        "BLANK only",
        "1\n1\n2\n1.0\n1.5\n2\n2\n2\n3\n1.7\n",
        "Positive control\n4\n40\n2\n12\n2.01",
        "",
    ];
    for input in inputs.iter().filter(|input| !input.is_empty()) {
        let submission = engine().parse(input.as_bytes(), "form.txt").unwrap();
        let sentinels = submission
            .samples()
            .iter()
            .filter(|sample| SENTINEL_NAMES.contains(&sample.name.as_str()))
            .count();
        assert_eq!(
            submission.total_samples(),
            submission.samples().len() - sentinels
        );
    }
}

#[test]
fn empty_bytes_are_fatal() {
    let err = engine().parse(b"", "empty.pdf").unwrap_err();
    assert_matches!(err, IntakeError::EmptyDocument);

    let err = Engine::new(PdfTextExtractor, EngineConfig::default())
        .parse(b"", "empty.pdf")
        .unwrap_err();
    assert_matches!(err, IntakeError::EmptyDocument);
}

#[test]
fn unreadable_document_is_fatal() {
    let err = Engine::new(PdfTextExtractor, EngineConfig::default())
        .parse(b"definitely not a pdf", "form.pdf")
        .unwrap_err();
    assert_matches!(err, IntakeError::UnreadableDocument(_));
}

#[test]
fn reparse_keeps_hash_and_refreshes_identity() {
    let engine = engine();
    let first = engine.parse(FORM.as_bytes(), "a.pdf").unwrap();
    let second = engine.parse(FORM.as_bytes(), "renamed.pdf").unwrap();
    assert_eq!(first.file_hash(), second.file_hash());
    assert_ne!(first.uuid(), second.uuid());
    assert_ne!(first.short_ref(), "");
}

#[test]
fn configured_prefix_is_used_without_project() {
    let mut config = EngineConfig::default();
    config.submission_prefix = "INTAKE".to_string();
    let submission = Engine::new(PlainTextExtractor, config)
        .parse(b"Owner: Jane Lab", "form.txt")
        .unwrap();
    assert!(submission.submission_id().starts_with("INTAKE_"));
    assert_eq!(submission.owner(), Some("Jane Lab"));
}

#[test]
fn serialized_record_exposes_every_field() {
    let submission = engine().parse(FORM.as_bytes(), "form.pdf").unwrap();
    let value = serde_json::to_value(&submission).unwrap();
    for key in [
        "submission_id",
        "uuid",
        "short_ref",
        "file_hash",
        "project_id",
        "owner",
        "source_organism",
        "sample_buffer",
        "sequencing_type",
        "sample_type",
        "samples",
        "additional_info",
        "total_samples",
        "scanned_at",
    ] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(value["sample_type"], "PCR Amplicons");
    assert_eq!(value["additional_info"]["estimated_flow_cells"], 2);

    let restored: htsf_intake::domain::Submission = serde_json::from_value(value).unwrap();
    assert_eq!(restored, submission);
}

#[test]
fn pdf_text_layer_is_extracted() {
    let pdf = make_pdf(&["Service Project HTSF-JL-147 ", "Owner: Jane Lab", "BLANK"]);
    let engine = Engine::new(PdfTextExtractor, EngineConfig::default());
    let first = engine.parse(&pdf, "form.pdf").unwrap();
    let second = engine.parse(&pdf, "form.pdf").unwrap();

    assert_eq!(first.project_id(), Some("HTSF-JL-147"));
    assert_eq!(first.samples().len(), 1);
    assert_eq!(first.total_samples(), 0);
    assert_eq!(first.file_hash(), second.file_hash());
}
