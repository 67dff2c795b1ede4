use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::text::NormalizedText;

static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Service Project\s+([A-Z\-\d]+)").unwrap());
static OWNER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Owner:\s+([^\n]+)").unwrap());
static ORGANISM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Source Organism:\s*([^\n]+)").unwrap());
static EB_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bEB\b").unwrap());

const BUFFER_ANCHOR: &str = "Sample Buffer:";
const BUFFER_EB: &str = "EB";
const BUFFER_WATER: &str = "Nuclease-Free Water";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormMetadata {
    pub project_id: Option<String>,
    pub owner: Option<String>,
    pub source_organism: Option<String>,
    pub sample_buffer: Option<String>,
}

pub fn extract_metadata(text: &NormalizedText) -> FormMetadata {
    let metadata = FormMetadata {
        project_id: capture_line(&PROJECT_RE, text),
        owner: capture_line(&OWNER_RE, text),
        source_organism: capture_line(&ORGANISM_RE, text),
        sample_buffer: sample_buffer(text),
    };
    if metadata.project_id.is_none() {
        debug!("no project id anchor found");
    }
    metadata
}

fn capture_line(regex: &Regex, text: &NormalizedText) -> Option<String> {
    regex
        .captures(text.as_str())
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Whichever buffer token follows the anchor first wins. Forms list both
/// options, so this is a positional tie-break.
fn sample_buffer(text: &NormalizedText) -> Option<String> {
    let start = text.as_str().find(BUFFER_ANCHOR)? + BUFFER_ANCHOR.len();
    let tail = &text.as_str()[start..];
    let candidates = [
        (EB_RE.find(tail).map(|m| m.start()), BUFFER_EB),
        (tail.find(BUFFER_WATER), BUFFER_WATER),
    ];
    candidates
        .into_iter()
        .filter_map(|(position, label)| position.map(|position| (position, label)))
        .min_by_key(|(position, _)| *position)
        .map(|(_, label)| label.to_string())
}
