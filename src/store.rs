use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use directories::BaseDirs;
use serde::Serialize;
use tempfile::Builder;
use tracing::{debug, info, warn};

use crate::domain::{FileHash, LookupKey, Submission, SubmissionSummary};
use crate::error::IntakeError;

pub const PROJECT_STORE_DIR: &str = ".htsf-intake";
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Inserted,
    Duplicate { existing_submission_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatistics {
    pub total_submissions: usize,
    pub total_samples: usize,
    pub unique_projects: usize,
    pub by_project: Vec<ProjectCount>,
    pub recent_submissions: Vec<RecentSubmission>,
    pub concentration_stats: ConcentrationStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCount {
    pub project_id: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentSubmission {
    pub submission_id: String,
    pub project_id: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConcentrationStats {
    pub avg_concentration: Option<f64>,
    pub min_concentration: Option<f64>,
    pub max_concentration: Option<f64>,
}

impl StoreStatistics {
    pub fn from_submissions(submissions: &[Submission]) -> Self {
        let mut by_project = BTreeMap::<Option<String>, usize>::new();
        for submission in submissions {
            *by_project
                .entry(submission.project_id().map(str::to_string))
                .or_default() += 1;
        }
        let unique_projects = by_project.keys().filter(|key| key.is_some()).count();
        let mut by_project = by_project
            .into_iter()
            .map(|(project_id, count)| ProjectCount { project_id, count })
            .collect::<Vec<_>>();
        by_project.sort_by(|a, b| b.count.cmp(&a.count));

        let recent_submissions = newest_first(submissions.to_vec())
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|submission| RecentSubmission {
                submission_id: submission.submission_id().to_string(),
                project_id: submission.project_id().map(str::to_string),
                scanned_at: submission.scanned_at(),
            })
            .collect();

        let concentrations = submissions
            .iter()
            .flat_map(|submission| submission.samples())
            .map(|sample| sample.nanodrop_conc)
            .filter(|value| *value > 0.0)
            .collect::<Vec<_>>();
        let concentration_stats = if concentrations.is_empty() {
            ConcentrationStats::default()
        } else {
            ConcentrationStats {
                avg_concentration: Some(
                    concentrations.iter().sum::<f64>() / concentrations.len() as f64,
                ),
                min_concentration: concentrations.iter().copied().reduce(f64::min),
                max_concentration: concentrations.iter().copied().reduce(f64::max),
            }
        };

        Self {
            total_submissions: submissions.len(),
            total_samples: submissions.iter().map(|s| s.samples().len()).sum(),
            unique_projects,
            by_project,
            recent_submissions,
            concentration_stats,
        }
    }
}

pub trait SubmissionStore: Send + Sync {
    fn save(&self, submission: &Submission) -> Result<SaveOutcome, IntakeError>;
    fn find(&self, key: &LookupKey) -> Result<Option<Submission>, IntakeError>;
    fn delete(&self, submission_id: &str) -> Result<bool, IntakeError>;
    fn all(&self) -> Result<Vec<Submission>, IntakeError>;

    fn check_duplicate(&self, file_hash: &FileHash) -> Result<Option<Submission>, IntakeError> {
        self.find(&LookupKey::FileHash(file_hash.clone()))
    }

    fn search(&self, term: &str) -> Result<Vec<Submission>, IntakeError> {
        let needle = term.trim().to_lowercase();
        let matches = self
            .all()?
            .into_iter()
            .filter(|submission| submission.matches_term(&needle))
            .collect();
        Ok(newest_first(matches))
    }

    fn list(
        &self,
        filter: &ListFilter,
        limit: Option<usize>,
    ) -> Result<Vec<SubmissionSummary>, IntakeError> {
        let selected = self
            .all()?
            .into_iter()
            .filter(|submission| match &filter.project_id {
                Some(project) => submission.project_id() == Some(project.as_str()),
                None => true,
            })
            .collect();
        Ok(newest_first(selected)
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|submission| submission.summary())
            .collect())
    }

    fn statistics(&self) -> Result<StoreStatistics, IntakeError> {
        Ok(StoreStatistics::from_submissions(&self.all()?))
    }
}

fn newest_first(mut submissions: Vec<Submission>) -> Vec<Submission> {
    submissions.sort_by(|a, b| {
        b.scanned_at()
            .cmp(&a.scanned_at())
            .then_with(|| a.submission_id().cmp(b.submission_id()))
    });
    submissions
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: Utf8PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self, IntakeError> {
        let cwd = std::env::current_dir().map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd.join(PROJECT_STORE_DIR))
            .map_err(|_| IntakeError::Filesystem("invalid project path".to_string()))?;
        Ok(Self { root })
    }

    pub fn user_default() -> Result<Self, IntakeError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("htsf-intake")).ok()
            })
            .ok_or_else(|| {
                IntakeError::Filesystem("unable to resolve user data directory".to_string())
            })?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn records_dir(&self) -> Utf8PathBuf {
        self.root.join("submissions")
    }

    pub fn hash_index_dir(&self) -> Utf8PathBuf {
        self.root.join("index").join("file_hash")
    }

    pub fn record_path(&self, submission_id: &str) -> Utf8PathBuf {
        self.records_dir().join(format!("{submission_id}.json"))
    }

    pub fn hash_index_path(&self, file_hash: &FileHash) -> Utf8PathBuf {
        self.hash_index_dir().join(file_hash.as_str())
    }

    fn ensure_layout(&self) -> Result<(), IntakeError> {
        for dir in [self.records_dir(), self.hash_index_dir()] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    fn read_record(path: &Utf8Path) -> Result<Option<Submission>, IntakeError> {
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(IntakeError::Filesystem(err.to_string())),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| IntakeError::CorruptRecord(format!("{path}: {err}")))
    }

    fn read_hash_owner(&self, file_hash: &FileHash) -> Result<Option<String>, IntakeError> {
        match fs::read_to_string(self.hash_index_path(file_hash).as_std_path()) {
            Ok(owner) => Ok(Some(owner.trim().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(IntakeError::Filesystem(err.to_string())),
        }
    }

    fn find_by_id(&self, submission_id: &str) -> Result<Option<Submission>, IntakeError> {
        if !is_safe_id(submission_id) {
            return Ok(None);
        }
        match Self::read_record(&self.record_path(submission_id))? {
            Some(submission) if self.is_committed(&submission)? => Ok(Some(submission)),
            _ => Ok(None),
        }
    }

    /// A record counts only once the index entry for its hash names it.
    fn is_committed(&self, submission: &Submission) -> Result<bool, IntakeError> {
        Ok(self.read_hash_owner(submission.file_hash())?.as_deref()
            == Some(submission.submission_id()))
    }

    /// Returns the owning submission id when another record holds the hash.
    /// An entry naming a missing record was left by an interrupted save or
    /// delete; it is dropped and the claim retried once.
    fn claim_hash(
        &self,
        file_hash: &FileHash,
        submission_id: &str,
    ) -> Result<Option<String>, IntakeError> {
        let index_path = self.hash_index_path(file_hash);
        if Self::write_exclusive(&index_path, submission_id.as_bytes())? {
            return Ok(None);
        }

        let owner = self.read_hash_owner(file_hash)?.unwrap_or_default();
        if is_safe_id(&owner) && self.record_path(&owner).as_std_path().exists() {
            return Ok(Some(owner));
        }

        warn!(%file_hash, owner = %owner, "dropping hash index entry without a record");
        match fs::remove_file(index_path.as_std_path()) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(IntakeError::Filesystem(err.to_string())),
        }
        if Self::write_exclusive(&index_path, submission_id.as_bytes())? {
            return Ok(None);
        }
        Ok(Some(self.read_hash_owner(file_hash)?.unwrap_or_default()))
    }

    fn write_exclusive(dest: &Utf8Path, content: &[u8]) -> Result<bool, IntakeError> {
        let parent = dest
            .parent()
            .ok_or_else(|| IntakeError::Filesystem("invalid destination path".to_string()))?;
        let mut temp = Builder::new()
            .prefix(".htsf-intake")
            .suffix(".tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        match temp.persist_noclobber(dest.as_std_path()) {
            Ok(_) => Ok(true),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(IntakeError::Filesystem(err.error.to_string())),
        }
    }
}

impl SubmissionStore for JsonStore {
    fn save(&self, submission: &Submission) -> Result<SaveOutcome, IntakeError> {
        self.ensure_layout()?;
        let file_hash = submission.file_hash();
        let submission_id = submission.submission_id();
        if !is_safe_id(submission_id) {
            return Err(IntakeError::Filesystem(format!(
                "submission id is not usable as a file name: {submission_id}"
            )));
        }

        let record_path = self.record_path(submission_id);
        let content = serde_json::to_vec_pretty(submission)
            .map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        if !Self::write_exclusive(&record_path, &content)? {
            return Err(IntakeError::SubmissionIdConflict(submission_id.to_string()));
        }

        match self.claim_hash(file_hash, submission_id) {
            Ok(None) => {
                info!(submission_id, path = %record_path, "stored submission");
                Ok(SaveOutcome::Inserted)
            }
            Ok(Some(existing_submission_id)) => {
                release_uncommitted(&record_path);
                info!(%file_hash, existing = %existing_submission_id, "content hash already stored");
                Ok(SaveOutcome::Duplicate {
                    existing_submission_id,
                })
            }
            Err(err) => {
                release_uncommitted(&record_path);
                Err(err)
            }
        }
    }

    fn find(&self, key: &LookupKey) -> Result<Option<Submission>, IntakeError> {
        match key {
            LookupKey::FileHash(hash) => match self.read_hash_owner(hash)? {
                Some(owner) => self.find_by_id(&owner),
                None => Ok(None),
            },
            LookupKey::SubmissionId(id) => self.find_by_id(id),
            LookupKey::Uuid(uuid) => Ok(self
                .all()?
                .into_iter()
                .find(|submission| submission.uuid() == *uuid)),
        }
    }

    fn delete(&self, submission_id: &str) -> Result<bool, IntakeError> {
        let Some(submission) = self.find_by_id(submission_id)? else {
            return Ok(false);
        };
        fs::remove_file(self.record_path(submission_id).as_std_path())
            .map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        fs::remove_file(self.hash_index_path(submission.file_hash()).as_std_path())
            .map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        info!(submission_id, "deleted submission");
        Ok(true)
    }

    fn all(&self) -> Result<Vec<Submission>, IntakeError> {
        let dir = self.records_dir();
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(dir.as_std_path()).map_err(|err| IntakeError::Filesystem(err.to_string()))?;
        let mut submissions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| IntakeError::Filesystem(err.to_string()))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if path.extension() != Some("json") {
                continue;
            }
            if let Some(submission) = Self::read_record(&path)? {
                if self.is_committed(&submission)? {
                    submissions.push(submission);
                }
            }
        }
        Ok(submissions)
    }
}

fn release_uncommitted(record_path: &Utf8Path) {
    if let Err(err) = fs::remove_file(record_path.as_std_path()) {
        debug!(path = %record_path, error = %err, "failed to remove uncommitted record");
    }
}

fn is_safe_id(submission_id: &str) -> bool {
    !submission_id.is_empty()
        && submission_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    submissions: Mutex<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Submission>> {
        self.submissions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SubmissionStore for MemoryStore {
    fn save(&self, submission: &Submission) -> Result<SaveOutcome, IntakeError> {
        let mut submissions = self.lock();
        if let Some(existing) = submissions
            .iter()
            .find(|stored| stored.file_hash() == submission.file_hash())
        {
            return Ok(SaveOutcome::Duplicate {
                existing_submission_id: existing.submission_id().to_string(),
            });
        }
        if submissions
            .iter()
            .any(|stored| stored.submission_id() == submission.submission_id())
        {
            return Err(IntakeError::SubmissionIdConflict(
                submission.submission_id().to_string(),
            ));
        }
        submissions.push(submission.clone());
        Ok(SaveOutcome::Inserted)
    }

    fn find(&self, key: &LookupKey) -> Result<Option<Submission>, IntakeError> {
        let submissions = self.lock();
        Ok(submissions
            .iter()
            .find(|stored| match key {
                LookupKey::FileHash(hash) => stored.file_hash() == hash,
                LookupKey::SubmissionId(id) => stored.submission_id() == id,
                LookupKey::Uuid(uuid) => stored.uuid() == *uuid,
            })
            .cloned())
    }

    fn delete(&self, submission_id: &str) -> Result<bool, IntakeError> {
        let mut submissions = self.lock();
        let before = submissions.len();
        submissions.retain(|stored| stored.submission_id() != submission_id);
        Ok(submissions.len() != before)
    }

    fn all(&self) -> Result<Vec<Submission>, IntakeError> {
        Ok(self.lock().clone())
    }
}
