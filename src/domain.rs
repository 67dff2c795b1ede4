use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IntakeError;

pub const POSITIVE_CONTROL: &str = "Positive control";
pub const BLANK: &str = "BLANK";
pub const SENTINEL_NAMES: [&str; 2] = [POSITIVE_CONTROL, BLANK];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct FileHash(String);

impl FileHash {
    pub const HEX_LEN: usize = 64;

    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileHash {
    type Err = IntakeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let is_valid = normalized.len() == Self::HEX_LEN
            && normalized.chars().all(|ch| ch.is_ascii_hexdigit());
        if !is_valid {
            return Err(IntakeError::InvalidFileHash(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for FileHash {
    type Error = IntakeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequencingType {
    #[serde(rename = "Ligation Sequencing (SQK-LSK114)")]
    Ligation,
    #[serde(rename = "Ligation Sequencing with Barcoding (SQK-NBD114.96)")]
    LigationBarcoding,
    #[serde(rename = "Rapid Sequencing (SQK-RAD114)")]
    Rapid,
    #[serde(rename = "Rapid Sequencing with Barcoding (SQK-RBK114.24)")]
    RapidBarcoding,
}

impl SequencingType {
    pub const ALL: [SequencingType; 4] = [
        SequencingType::Ligation,
        SequencingType::LigationBarcoding,
        SequencingType::Rapid,
        SequencingType::RapidBarcoding,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SequencingType::Ligation => "Ligation Sequencing (SQK-LSK114)",
            SequencingType::LigationBarcoding => {
                "Ligation Sequencing with Barcoding (SQK-NBD114.96)"
            }
            SequencingType::Rapid => "Rapid Sequencing (SQK-RAD114)",
            SequencingType::RapidBarcoding => "Rapid Sequencing with Barcoding (SQK-RBK114.24)",
        }
    }
}

impl fmt::Display for SequencingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    #[serde(rename = "High Molecular Weight DNA / gDNA")]
    HighMolecularWeightDna,
    #[serde(rename = "Fragmented DNA")]
    FragmentedDna,
    #[serde(rename = "PCR Amplicons")]
    PcrAmplicons,
    #[serde(rename = "cDNA")]
    Cdna,
    Unknown,
}

impl SampleType {
    pub const CANDIDATES: [SampleType; 4] = [
        SampleType::HighMolecularWeightDna,
        SampleType::FragmentedDna,
        SampleType::PcrAmplicons,
        SampleType::Cdna,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SampleType::HighMolecularWeightDna => "High Molecular Weight DNA / gDNA",
            SampleType::FragmentedDna => "Fragmented DNA",
            SampleType::PcrAmplicons => "PCR Amplicons",
            SampleType::Cdna => "cDNA",
            SampleType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One row of the intake table. Zero measurements mean "not measured".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub volume_ul: f64,
    pub qubit_conc: f64,
    pub nanodrop_conc: f64,
    pub a260_280_ratio: f64,
    pub a260_230_ratio: Option<f64>,
}

impl Sample {
    pub fn control(name: &str) -> Self {
        Self {
            name: name.to_string(),
            volume_ul: 0.0,
            qubit_conc: 0.0,
            nanodrop_conc: 0.0,
            a260_280_ratio: 0.0,
            a260_230_ratio: None,
        }
    }

    pub fn is_control(&self) -> bool {
        SENTINEL_NAMES.contains(&self.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Structured(serde_json::Value),
}

impl InfoValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InfoValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            InfoValue::Integer(value) => value.to_string(),
            InfoValue::Number(value) => value.to_string(),
            InfoValue::Text(value) => value.clone(),
            InfoValue::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for InfoValue {
    fn from(value: &str) -> Self {
        InfoValue::Text(value.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(value: String) -> Self {
        InfoValue::Text(value)
    }
}

impl From<i64> for InfoValue {
    fn from(value: i64) -> Self {
        InfoValue::Integer(value)
    }
}

pub type AdditionalInfo = BTreeMap<String, InfoValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    submission_id: String,
    uuid: Uuid,
    short_ref: String,
    file_hash: FileHash,
    filename: String,
    project_id: Option<String>,
    owner: Option<String>,
    source_organism: Option<String>,
    sample_buffer: Option<String>,
    sequencing_type: Option<SequencingType>,
    sample_type: SampleType,
    samples: Vec<Sample>,
    additional_info: AdditionalInfo,
    total_samples: usize,
    scanned_at: DateTime<Utc>,
}

pub(crate) struct SubmissionParts {
    pub submission_id: String,
    pub uuid: Uuid,
    pub short_ref: String,
    pub file_hash: FileHash,
    pub filename: String,
    pub project_id: Option<String>,
    pub owner: Option<String>,
    pub source_organism: Option<String>,
    pub sample_buffer: Option<String>,
    pub sequencing_type: Option<SequencingType>,
    pub sample_type: SampleType,
    pub samples: Vec<Sample>,
    pub additional_info: AdditionalInfo,
    pub scanned_at: DateTime<Utc>,
}

impl Submission {
    pub(crate) fn from_parts(parts: SubmissionParts) -> Self {
        let total_samples = parts.samples.iter().filter(|s| !s.is_control()).count();
        Self {
            submission_id: parts.submission_id,
            uuid: parts.uuid,
            short_ref: parts.short_ref,
            file_hash: parts.file_hash,
            filename: parts.filename,
            project_id: parts.project_id,
            owner: parts.owner,
            source_organism: parts.source_organism,
            sample_buffer: parts.sample_buffer,
            sequencing_type: parts.sequencing_type,
            sample_type: parts.sample_type,
            samples: parts.samples,
            additional_info: parts.additional_info,
            total_samples,
            scanned_at: parts.scanned_at,
        }
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn short_ref(&self) -> &str {
        &self.short_ref
    }

    pub fn file_hash(&self) -> &FileHash {
        &self.file_hash
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn source_organism(&self) -> Option<&str> {
        self.source_organism.as_deref()
    }

    pub fn sample_buffer(&self) -> Option<&str> {
        self.sample_buffer.as_deref()
    }

    pub fn sequencing_type(&self) -> Option<SequencingType> {
        self.sequencing_type
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn additional_info(&self) -> &AdditionalInfo {
        &self.additional_info
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            submission_id: self.submission_id.clone(),
            project_id: self.project_id.clone(),
            owner: self.owner.clone(),
            total_samples: self.total_samples,
            scanned_at: self.scanned_at,
            filename: self.filename.clone(),
            short_ref: self.short_ref.clone(),
        }
    }

    pub(crate) fn matches_term(&self, needle: &str) -> bool {
        let fields = [
            Some(self.submission_id.as_str()),
            self.project_id.as_deref(),
            self.owner.as_deref(),
            self.source_organism.as_deref(),
            Some(self.filename.as_str()),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(needle))
            || self
                .additional_info
                .values()
                .any(|value| value.render().to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub submission_id: String,
    pub project_id: Option<String>,
    pub owner: Option<String>,
    pub total_samples: usize,
    pub scanned_at: DateTime<Utc>,
    pub filename: String,
    pub short_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    FileHash(FileHash),
    SubmissionId(String),
    Uuid(Uuid),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::FileHash(hash) => write!(f, "file_hash:{hash}"),
            LookupKey::SubmissionId(id) => write!(f, "submission_id:{id}"),
            LookupKey::Uuid(uuid) => write!(f, "uuid:{uuid}"),
        }
    }
}

impl FromStr for LookupKey {
    type Err = IntakeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IntakeError::SubmissionNotFound(value.to_string()));
        }
        if let Ok(hash) = trimmed.parse::<FileHash>() {
            return Ok(LookupKey::FileHash(hash));
        }
        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Ok(LookupKey::Uuid(uuid));
        }
        Ok(LookupKey::SubmissionId(trimmed.to_string()))
    }
}
