use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::{TimeZone, Utc};

use htsf_intake::assemble::Engine;
use htsf_intake::config::EngineConfig;
use htsf_intake::domain::{LookupKey, Submission};
use htsf_intake::error::IntakeError;
use htsf_intake::store::{JsonStore, ListFilter, SaveOutcome, SubmissionStore};
use htsf_intake::text::PlainTextExtractor;

const FORM: &str = include_str!("fixtures/htsf_form.txt");

fn parse(text: &str, second: u32) -> Submission {
    let scanned_at = Utc.with_ymd_and_hms(2025, 9, 3, 14, 5, second).unwrap();
    Engine::new(PlainTextExtractor, EngineConfig::default())
        .parse_at(text.as_bytes(), "form.txt", scanned_at)
        .unwrap()
}

fn temp_store() -> (tempfile::TempDir, JsonStore) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().join("store")).unwrap();
    (dir, JsonStore::new_with_root(root))
}

#[test]
fn empty_store_reads_as_empty() {
    let (_dir, store) = temp_store();
    assert!(store.all().unwrap().is_empty());
    assert!(store.list(&ListFilter::default(), None).unwrap().is_empty());
    let stats = store.statistics().unwrap();
    assert_eq!(stats.total_submissions, 0);
    assert_eq!(stats.concentration_stats.avg_concentration, None);
}

#[test]
fn save_then_find_by_every_key() {
    let (_dir, store) = temp_store();
    let submission = parse(FORM, 9);

    assert_eq!(store.save(&submission).unwrap(), SaveOutcome::Inserted);
    assert!(store.record_path(submission.submission_id()).exists());
    assert!(store.hash_index_path(submission.file_hash()).exists());

    let keys = [
        LookupKey::FileHash(submission.file_hash().clone()),
        LookupKey::SubmissionId(submission.submission_id().to_string()),
        LookupKey::Uuid(submission.uuid()),
    ];
    for key in keys {
        assert_eq!(store.find(&key).unwrap().as_ref(), Some(&submission));
    }
    assert_eq!(
        store.check_duplicate(submission.file_hash()).unwrap(),
        Some(submission)
    );
}

#[test]
fn second_save_of_same_content_is_a_duplicate() {
    let (_dir, store) = temp_store();
    let first = parse(FORM, 9);
    let reparsed = parse(FORM, 30);
    assert_ne!(first.submission_id(), reparsed.submission_id());

    assert_eq!(store.save(&first).unwrap(), SaveOutcome::Inserted);
    assert_eq!(
        store.save(&reparsed).unwrap(),
        SaveOutcome::Duplicate {
            existing_submission_id: first.submission_id().to_string()
        }
    );
    assert_eq!(store.all().unwrap().len(), 1);
    assert!(!store.record_path(reparsed.submission_id()).exists());
}

#[test]
fn concurrent_saves_of_same_content_insert_once() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);

    let handles = (0..8)
        .map(|second| {
            let store = Arc::clone(&store);
            let submission = parse(FORM, second);
            thread::spawn(move || (submission.submission_id().to_string(), store.save(&submission)))
        })
        .collect::<Vec<_>>();
    let outcomes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    let winners = outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, Ok(SaveOutcome::Inserted)))
        .map(|(id, _)| id.clone())
        .collect::<Vec<_>>();
    assert_eq!(winners.len(), 1);
    for (_, outcome) in &outcomes {
        match outcome {
            Ok(SaveOutcome::Inserted) => {}
            Ok(SaveOutcome::Duplicate {
                existing_submission_id,
            }) => assert_eq!(existing_submission_id, &winners[0]),
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert_eq!(store.all().unwrap().len(), 1);
}

#[test]
fn colliding_submission_id_is_rejected_before_claiming_hash() {
    let (_dir, store) = temp_store();
    let first = parse("Service Project HTSF-JL-147\nOwner: Jane Lab\n", 9);
    let other = parse("Service Project HTSF-JL-147\nOwner: Sam Lab\n", 9);
    assert_eq!(first.submission_id(), other.submission_id());
    assert_ne!(first.file_hash(), other.file_hash());

    store.save(&first).unwrap();
    let err = store.save(&other).unwrap_err();
    assert_matches!(err, IntakeError::SubmissionIdConflict(_));
    assert!(!store.hash_index_path(other.file_hash()).exists());
    assert_eq!(
        store
            .find(&LookupKey::SubmissionId(first.submission_id().to_string()))
            .unwrap()
            .and_then(|stored| stored.owner().map(str::to_string)),
        Some("Jane Lab".to_string())
    );
}

#[test]
fn delete_cascades_and_frees_the_hash() {
    let (_dir, store) = temp_store();
    let submission = parse(FORM, 9);
    store.save(&submission).unwrap();

    assert!(store.delete(submission.submission_id()).unwrap());
    assert!(!store.delete(submission.submission_id()).unwrap());
    assert_eq!(
        store
            .find(&LookupKey::FileHash(submission.file_hash().clone()))
            .unwrap(),
        None
    );
    assert!(store.all().unwrap().is_empty());

    let again = parse(FORM, 40);
    assert_eq!(store.save(&again).unwrap(), SaveOutcome::Inserted);
}

#[test]
fn list_filters_by_project_newest_first() {
    let (_dir, store) = temp_store();
    let older = parse("Service Project HTSF-JL-147\n1\n1\n2\n10.0\n1.80\n", 1);
    let newer = parse("Service Project HTSF-JL-147\n1\n2\n2\n20.0\n1.80\n", 2);
    let elsewhere = parse("Service Project HTSF-XY-9\n1\n3\n2\n30.0\n1.80\n", 3);
    for submission in [&older, &newer, &elsewhere] {
        store.save(submission).unwrap();
    }

    let all = store.list(&ListFilter::default(), None).unwrap();
    let ids = all
        .iter()
        .map(|summary| summary.submission_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![
            elsewhere.submission_id(),
            newer.submission_id(),
            older.submission_id()
        ]
    );

    let filter = ListFilter {
        project_id: Some("HTSF-JL-147".to_string()),
    };
    let limited = store.list(&filter, Some(1)).unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].submission_id, newer.submission_id());
    assert_eq!(limited[0].total_samples, 1);
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let (_dir, store) = temp_store();
    let form = parse(FORM, 9);
    let other = parse("Service Project HTSF-XY-9\nOwner: Sam Lab\n", 10);
    store.save(&form).unwrap();
    store.save(&other).unwrap();

    let by_owner = store.search("JANE").unwrap();
    assert_eq!(by_owner.len(), 1);
    assert_eq!(by_owner[0].submission_id(), form.submission_id());

    let by_email = store.search("example.edu").unwrap();
    assert_eq!(by_email.len(), 1);

    assert_eq!(store.search("htsf").unwrap().len(), 2);
    assert!(store.search("no such value").unwrap().is_empty());
}

#[test]
fn statistics_summarize_the_store() {
    let (_dir, store) = temp_store();
    store.save(&parse(FORM, 9)).unwrap();
    store
        .save(&parse("Service Project HTSF-JL-147\n1\n9\n2\n10.00\n1.80\n", 10))
        .unwrap();
    store.save(&parse("Owner: Sam Lab\n", 11)).unwrap();

    let stats = store.statistics().unwrap();
    assert_eq!(stats.total_submissions, 3);
    // Sentinel rows are stored like any other sample row.
    assert_eq!(stats.total_samples, 6);
    assert_eq!(stats.unique_projects, 1);
    assert_eq!(stats.by_project[0].project_id.as_deref(), Some("HTSF-JL-147"));
    assert_eq!(stats.by_project[0].count, 2);
    assert_eq!(stats.recent_submissions.len(), 3);
    assert_eq!(stats.concentration_stats.min_concentration, Some(10.0));
    assert_eq!(stats.concentration_stats.max_concentration, Some(52.1));
}

#[test]
fn corrupt_record_is_reported() {
    let (_dir, store) = temp_store();
    let submission = parse(FORM, 9);
    store.save(&submission).unwrap();
    std::fs::write(store.record_path(submission.submission_id()), "{ not json").unwrap();

    let err = store.all().unwrap_err();
    assert_matches!(err, IntakeError::CorruptRecord(_));
}

#[test]
fn interrupted_save_does_not_block_reingest() {
    let (_dir, store) = temp_store();
    let first = parse(FORM, 9);
    store.save(&first).unwrap();
    // Index entry left behind without its record.
    std::fs::remove_file(store.record_path(first.submission_id())).unwrap();
    assert_eq!(
        store
            .find(&LookupKey::FileHash(first.file_hash().clone()))
            .unwrap(),
        None
    );

    let reparsed = parse(FORM, 30);
    assert_eq!(store.save(&reparsed).unwrap(), SaveOutcome::Inserted);
    assert_eq!(
        store
            .find(&LookupKey::FileHash(reparsed.file_hash().clone()))
            .unwrap(),
        Some(reparsed)
    );
    assert_eq!(store.all().unwrap().len(), 1);
}

#[test]
fn record_without_index_entry_is_not_visible() {
    let (_dir, store) = temp_store();
    let submission = parse(FORM, 9);
    store.save(&submission).unwrap();
    std::fs::remove_file(store.hash_index_path(submission.file_hash())).unwrap();

    assert!(store.all().unwrap().is_empty());
    assert_eq!(
        store
            .find(&LookupKey::SubmissionId(submission.submission_id().to_string()))
            .unwrap(),
        None
    );
    assert_eq!(
        store.save(&parse(FORM, 30)).unwrap(),
        SaveOutcome::Inserted
    );
}

#[test]
fn overflowing_measurement_keeps_store_readable() {
    let (_dir, store) = temp_store();
    let text = format!(
        "Service Project HTSF-JL-147\n1\n7\n2\n{}\n1.80\n",
        "9".repeat(400)
    );
    let overflowing = parse(&text, 9);
    assert!(overflowing.samples().is_empty());
    store.save(&overflowing).unwrap();
    store.save(&parse(FORM, 10)).unwrap();

    assert_eq!(store.all().unwrap().len(), 2);
    assert_eq!(store.list(&ListFilter::default(), None).unwrap().len(), 2);
}

#[test]
fn record_with_invalid_hash_is_corrupt() {
    let (_dir, store) = temp_store();
    let submission = parse(FORM, 9);
    store.save(&submission).unwrap();

    let path = store.record_path(submission.submission_id());
    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    value["file_hash"] = serde_json::Value::from("../..");
    std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

    let err = store.all().unwrap_err();
    assert_matches!(err, IntakeError::CorruptRecord(_));
}
