pub mod additional;
pub mod metadata;
pub mod sample_type;
pub mod samples;
pub mod sequencing;

use std::sync::LazyLock;

use regex::Regex;

use crate::config::EngineConfig;
use crate::domain::{AdditionalInfo, Sample, SampleType};
use crate::text::NormalizedText;

pub use additional::extract_additional_info;
pub use metadata::{FormMetadata, extract_metadata};
pub use sample_type::classify_sample_type;
pub use samples::parse_samples;
pub use sequencing::{SequencingClassification, classify_sequencing};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub metadata: FormMetadata,
    pub sequencing: SequencingClassification,
    pub sample_type: SampleType,
    pub samples: Vec<Sample>,
    pub additional_info: AdditionalInfo,
}

pub fn extract_fields(text: &NormalizedText, config: &EngineConfig) -> ExtractedFields {
    ExtractedFields {
        metadata: extract_metadata(text),
        sequencing: classify_sequencing(text),
        sample_type: classify_sample_type(text),
        samples: parse_samples(text),
        additional_info: extract_additional_info(text, config),
    }
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value, " ").trim().to_string()
}

pub(crate) fn strip_thousands(value: &str) -> String {
    value.replace(',', "")
}
