use std::fs;

use camino::Utf8Path;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::assemble::Engine;
use crate::domain::{LookupKey, Submission, SubmissionSummary};
use crate::error::IntakeError;
use crate::identity::check_duplicate;
use crate::store::{ListFilter, SaveOutcome, StoreStatistics, SubmissionStore};
use crate::text::TextExtractor;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestAction {
    Stored,
    Duplicate,
    Parsed,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub action: IngestAction,
    pub filename: String,
    pub existing_submission_id: Option<String>,
    pub submission: Submission,
}

#[derive(Debug, Serialize)]
pub struct ScanFailure {
    pub path: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: IntakeError,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub results: Vec<IngestResult>,
    pub failures: Vec<ScanFailure>,
}

fn serialize_error<S: Serializer>(error: &IntakeError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub submissions: Vec<SubmissionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub term: String,
    pub submissions: Vec<SubmissionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub submission_id: String,
    pub deleted: bool,
}

pub struct App<E: TextExtractor, S: SubmissionStore> {
    engine: Engine<E>,
    store: S,
}

impl<E: TextExtractor, S: SubmissionStore> App<E, S> {
    pub fn new(engine: Engine<E>, store: S) -> Self {
        Self { engine, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The pre-save lookup only short-circuits the common case; a concurrent
    /// ingest of the same bytes is caught by the store's exclusive insert.
    pub fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        options: &IngestOptions,
    ) -> Result<IngestResult, IntakeError> {
        let submission = self.engine.parse(bytes, filename)?;

        if let Some(existing) = check_duplicate(&self.store, submission.file_hash())? {
            info!(
                filename,
                existing = existing.submission_id(),
                "document already ingested"
            );
            return Ok(IngestResult {
                action: IngestAction::Duplicate,
                filename: filename.to_string(),
                existing_submission_id: Some(existing.submission_id().to_string()),
                submission,
            });
        }

        if options.dry_run {
            return Ok(IngestResult {
                action: IngestAction::Parsed,
                filename: filename.to_string(),
                existing_submission_id: None,
                submission,
            });
        }

        match self.store.save(&submission)? {
            SaveOutcome::Inserted => Ok(IngestResult {
                action: IngestAction::Stored,
                filename: filename.to_string(),
                existing_submission_id: None,
                submission,
            }),
            SaveOutcome::Duplicate {
                existing_submission_id,
            } => {
                warn!(
                    filename,
                    existing = %existing_submission_id,
                    "duplicate detected at insert time"
                );
                Ok(IngestResult {
                    action: IngestAction::Duplicate,
                    filename: filename.to_string(),
                    existing_submission_id: Some(existing_submission_id),
                    submission,
                })
            }
        }
    }

    pub fn scan<P: AsRef<Utf8Path>>(&self, paths: &[P], options: &IngestOptions) -> ScanReport {
        let mut report = ScanReport::default();
        for path in paths {
            let path = path.as_ref();
            match self.ingest_path(path, options) {
                Ok(result) => report.results.push(result),
                Err(error) => {
                    warn!(%path, %error, "failed to ingest document");
                    report.failures.push(ScanFailure {
                        path: path.to_string(),
                        error,
                    });
                }
            }
        }
        report
    }

    fn ingest_path(
        &self,
        path: &Utf8Path,
        options: &IngestOptions,
    ) -> Result<IngestResult, IntakeError> {
        let bytes = fs::read(path.as_std_path())
            .map_err(|err| IntakeError::UnreadableDocument(format!("{path}: {err}")))?;
        let filename = path.file_name().unwrap_or(path.as_str());
        self.ingest(&bytes, filename, options)
    }

    pub fn show(&self, key: &LookupKey) -> Result<Submission, IntakeError> {
        self.store
            .find(key)?
            .ok_or_else(|| IntakeError::SubmissionNotFound(key.to_string()))
    }

    pub fn list(
        &self,
        project_id: Option<String>,
        limit: Option<usize>,
    ) -> Result<ListResult, IntakeError> {
        let filter = ListFilter { project_id };
        Ok(ListResult {
            submissions: self.store.list(&filter, limit)?,
        })
    }

    pub fn search(&self, term: &str) -> Result<SearchResult, IntakeError> {
        let submissions = self
            .store
            .search(term)?
            .iter()
            .map(Submission::summary)
            .collect();
        Ok(SearchResult {
            term: term.to_string(),
            submissions,
        })
    }

    pub fn delete(&self, submission_id: &str) -> Result<DeleteResult, IntakeError> {
        Ok(DeleteResult {
            submission_id: submission_id.to_string(),
            deleted: self.store.delete(submission_id)?,
        })
    }

    pub fn stats(&self) -> Result<StoreStatistics, IntakeError> {
        self.store.statistics()
    }
}
