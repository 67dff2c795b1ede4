use assert_matches::assert_matches;

use htsf_intake::domain::{FileHash, InfoValue, LookupKey, SampleType, SequencingType};
use htsf_intake::error::IntakeError;

#[test]
fn lookup_key_detects_hash_uuid_and_id() {
    let hash = "A1".repeat(32);
    assert_eq!(
        hash.parse::<LookupKey>().unwrap(),
        LookupKey::FileHash(hash.parse::<FileHash>().unwrap())
    );

    let uuid = "1f0e4c2a-7b3d-4c1e-9a55-0d2b6f8e9c41";
    assert_matches!(uuid.parse::<LookupKey>().unwrap(), LookupKey::Uuid(_));

    assert_eq!(
        " HTSFJL147_20250903_140509 ".parse::<LookupKey>().unwrap(),
        LookupKey::SubmissionId("HTSFJL147_20250903_140509".to_string())
    );
}

#[test]
fn blank_lookup_key_is_not_found() {
    let err = "  ".parse::<LookupKey>().unwrap_err();
    assert_matches!(err, IntakeError::SubmissionNotFound(_));
}

#[test]
fn lookup_key_display_names_the_kind() {
    let key = LookupKey::SubmissionId("SUBMISSION_20250903_140509".to_string());
    assert_eq!(key.to_string(), "submission_id:SUBMISSION_20250903_140509");
}

#[test]
fn short_hash_is_a_prefix() {
    let hash: FileHash = "0123456789abcdef".repeat(4).parse().unwrap();
    assert_eq!(hash.short(), "0123456789abcdef");
    assert!(hash.as_str().starts_with(hash.short()));
}

#[test]
fn kit_and_sample_type_names() {
    assert_eq!(SequencingType::ALL.len(), 4);
    assert_eq!(
        SequencingType::RapidBarcoding.display_name(),
        "Rapid Sequencing with Barcoding (SQK-RBK114.24)"
    );
    assert_eq!(SampleType::Cdna.display_name(), "cDNA");
    let json = serde_json::to_string(&SampleType::Unknown).unwrap();
    assert_eq!(json, "\"Unknown\"");
}

#[test]
fn info_values_serialize_untagged() {
    let values = vec![InfoValue::from(2_i64), InfoValue::from("MinION")];
    let json = serde_json::to_string(&values).unwrap();
    assert_eq!(json, "[2,\"MinION\"]");
    assert_eq!(values[1].as_text(), Some("MinION"));
    assert_eq!(values[0].render(), "2");
}
