use std::io::{self, Read};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{FileHash, Submission};
use crate::error::IntakeError;
use crate::store::SubmissionStore;

pub const HASH_BLOCK_SIZE: usize = 4096;
pub const SHORT_REF_LEN: usize = 8;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct PendingIdentity;

impl PendingIdentity {
    pub fn hash_bytes(self, bytes: &[u8]) -> Result<HashedIdentity, IntakeError> {
        self.hash_reader(io::Cursor::new(bytes))
    }

    pub fn hash_reader<R: Read>(self, mut reader: R) -> Result<HashedIdentity, IntakeError> {
        let mut hasher = Sha256::new();
        let mut block = [0u8; HASH_BLOCK_SIZE];
        loop {
            let read = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(IntakeError::HashRead(err.to_string())),
            };
            hasher.update(&block[..read]);
        }
        Ok(HashedIdentity {
            file_hash: FileHash::from_digest(&hasher.finalize()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedIdentity {
    file_hash: FileHash,
}

impl HashedIdentity {
    pub fn file_hash(&self) -> &FileHash {
        &self.file_hash
    }

    pub fn identify(
        self,
        project_id: Option<&str>,
        prefix: &str,
        scanned_at: DateTime<Utc>,
    ) -> Identity {
        let uuid = Uuid::new_v4();
        let short_ref = uuid.simple().to_string()[..SHORT_REF_LEN].to_string();
        Identity {
            submission_id: submission_id(project_id, prefix, scanned_at),
            uuid,
            short_ref,
            file_hash: self.file_hash,
            scanned_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub submission_id: String,
    pub uuid: Uuid,
    /// Display only, never a lookup key.
    pub short_ref: String,
    pub file_hash: FileHash,
    pub scanned_at: DateTime<Utc>,
}

pub fn submission_id(project_id: Option<&str>, prefix: &str, scanned_at: DateTime<Utc>) -> String {
    let timestamp = scanned_at.format(TIMESTAMP_FORMAT);
    let cleaned = project_id
        .map(|id| {
            id.chars()
                .filter(|ch| ch.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|id| !id.is_empty());
    match cleaned {
        Some(project) => format!("{project}_{timestamp}"),
        None => format!("{prefix}_{timestamp}"),
    }
}

pub fn check_duplicate<S: SubmissionStore + ?Sized>(
    store: &S,
    file_hash: &FileHash,
) -> Result<Option<Submission>, IntakeError> {
    store.check_duplicate(file_hash)
}
