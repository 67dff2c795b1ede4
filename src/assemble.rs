use std::thread;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::EngineConfig;
use crate::domain::{Submission, SubmissionParts};
use crate::error::IntakeError;
use crate::extract::{ExtractedFields, extract_fields};
use crate::identity::{HashedIdentity, Identity, PendingIdentity};
use crate::text::{NormalizedText, TextExtractor};

pub fn assemble(fields: ExtractedFields, identity: Identity, filename: &str) -> Submission {
    Submission::from_parts(SubmissionParts {
        submission_id: identity.submission_id,
        uuid: identity.uuid,
        short_ref: identity.short_ref,
        file_hash: identity.file_hash,
        filename: filename.to_string(),
        project_id: fields.metadata.project_id,
        owner: fields.metadata.owner,
        source_organism: fields.metadata.source_organism,
        sample_buffer: fields.metadata.sample_buffer,
        sequencing_type: fields.sequencing.selected_type,
        sample_type: fields.sample_type,
        samples: fields.samples,
        additional_info: fields.additional_info,
        scanned_at: identity.scanned_at,
    })
}

#[derive(Debug, Clone)]
pub struct Engine<E: TextExtractor> {
    extractor: E,
    config: EngineConfig,
}

impl<E: TextExtractor> Engine<E> {
    pub fn new(extractor: E, config: EngineConfig) -> Self {
        Self { extractor, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parse(&self, bytes: &[u8], filename: &str) -> Result<Submission, IntakeError> {
        self.parse_at(bytes, filename, Utc::now())
    }

    pub fn parse_at(
        &self,
        bytes: &[u8],
        filename: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<Submission, IntakeError> {
        if bytes.is_empty() {
            return Err(IntakeError::EmptyDocument);
        }

        let (hashed, fields) = thread::scope(|scope| {
            let hasher = scope.spawn(|| PendingIdentity.hash_bytes(bytes));
            let fields = self.extract(bytes);
            let hashed = hasher
                .join()
                .map_err(|_| IntakeError::Worker("hash worker panicked".to_string()))
                .and_then(|result| result);
            (hashed, fields)
        });
        let hashed: HashedIdentity = hashed?;
        let fields = fields?;

        let identity = hashed.identify(
            fields.metadata.project_id.as_deref(),
            &self.config.submission_prefix,
            scanned_at,
        );
        let submission = assemble(fields, identity, filename);
        info!(
            submission_id = submission.submission_id(),
            file_hash = submission.file_hash().short(),
            samples = submission.samples().len(),
            total_samples = submission.total_samples(),
            "parsed submission form"
        );
        Ok(submission)
    }

    fn extract(&self, bytes: &[u8]) -> Result<ExtractedFields, IntakeError> {
        let raw = self.extractor.extract_text(bytes)?;
        let text = NormalizedText::new(&raw);
        Ok(extract_fields(&text, &self.config))
    }
}
