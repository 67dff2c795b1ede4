use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{collapse_whitespace, strip_thousands};
use crate::config::{CommentFilter, EngineConfig};
use crate::domain::{AdditionalInfo, InfoValue};
use crate::text::NormalizedText;

pub const CONTAINS_HUMAN_DNA: &str = "contains_human_dna";
pub const FLOW_CELL_TYPE: &str = "flow_cell_type";
pub const APPROX_GENOME_SIZE: &str = "approx_genome_size";
pub const COVERAGE_NEEDED: &str = "coverage_needed";
pub const ESTIMATED_FLOW_CELLS: &str = "estimated_flow_cells";
pub const BASECALLING_METHOD: &str = "basecalling_method";
pub const FILE_FORMAT: &str = "file_format";
pub const NOTIFICATION_EMAIL: &str = "notification_email";
pub const DATA_DELIVERY: &str = "data_delivery";
pub const ADDITIONAL_COMMENTS: &str = "additional_comments";
pub const EXPECTED_READS_PER_SAMPLE: &str = "expected_reads_per_sample";
pub const AMPLICON_LENGTH: &str = "amplicon_length";

const HUMAN_DNA_QUESTION: &str = "Do these samples contain human DNA";

static HUMAN_NO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)human DNA.*?No").unwrap());
static HUMAN_YES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)human DNA.*?Yes").unwrap());
static GENOME_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Genome Size\s*(\d[\d,]*)").unwrap());
static GENOME_SIZE_ALT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*Approx\.\s*Genome Size\s*(\d[\d,]*)").unwrap());
static COVERAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Coverage Needed\s*([\dx\-]+)").unwrap());
static COVERAGE_ALT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Approx\.\s*Coverage Needed\s*([\dx\-]+)").unwrap());
static FLOW_CELLS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Estimated number of Flow Cells\s*(\d[\d,]*)").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"email addresses:\s*([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})").unwrap()
});
static COMMENT_NARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Amplicon length is \d+ bp[^.]*\..*?between[\s\d,\-]+reads per sample")
        .unwrap()
});
static COMMENT_BROAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Additional Comments.*?Special Needs\s*([A-Z][^:]+?)(?:Bioinformatics|I would like|$)")
        .unwrap()
});
static READS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d,]*)\s*-\s*(\d[\d,]*)\s*reads per sample").unwrap()
});
static AMPLICON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Amplicon length is (\d+\s*bp)").unwrap());

pub fn extract_additional_info(text: &NormalizedText, config: &EngineConfig) -> AdditionalInfo {
    let defaults = &config.defaults;
    let mut info = AdditionalInfo::new();
    let mut put = |key: &str, value: Option<InfoValue>| match value {
        Some(value) => {
            info.insert(key.to_string(), value);
        }
        None => debug!(field = key, "supplementary field not found"),
    };

    put(CONTAINS_HUMAN_DNA, contains_human_dna(text));
    put(
        FLOW_CELL_TYPE,
        first_literal(
            text,
            &[
                ("MinION Flow Cell", "MinION Flow Cell"),
                ("PromethION Flow Cell", "PromethION Flow Cell"),
            ],
        ),
    );
    put(
        APPROX_GENOME_SIZE,
        Some(
            genome_size(text)
                .unwrap_or_else(|| defaults.genome_size.clone())
                .into(),
        ),
    );
    put(
        COVERAGE_NEEDED,
        Some(
            first_capture(text, &[&*COVERAGE_RE, &*COVERAGE_ALT_RE])
                .unwrap_or_else(|| defaults.coverage.clone())
                .into(),
        ),
    );
    put(
        ESTIMATED_FLOW_CELLS,
        Some(flow_cells(text).unwrap_or(defaults.flow_cells).into()),
    );
    put(BASECALLING_METHOD, basecalling_method(text));
    put(
        FILE_FORMAT,
        first_literal(
            text,
            &[
                ("FASTQ / BAM", "FASTQ / BAM"),
                ("POD5", "POD5 (for custom basecalling)"),
            ],
        ),
    );
    put(
        NOTIFICATION_EMAIL,
        first_capture(text, &[&*EMAIL_RE]).map(InfoValue::from),
    );
    put(
        DATA_DELIVERY,
        first_literal(
            text,
            &[
                (
                    "Deliver my data to ITS Research Computing storage",
                    "ITS Research Computing storage (/proj)",
                ),
                ("Provide me with a URL to download", "Web download URL"),
                ("Pre-arranged data delivery method", "Pre-arranged method"),
                ("Other", "Other"),
            ],
        ),
    );
    put(
        ADDITIONAL_COMMENTS,
        additional_comments(text, &config.comment_filter).map(InfoValue::from),
    );
    put(EXPECTED_READS_PER_SAMPLE, expected_reads(text));
    put(
        AMPLICON_LENGTH,
        first_capture(text, &[&*AMPLICON_RE]).map(InfoValue::from),
    );

    info
}

fn contains_human_dna(text: &NormalizedText) -> Option<InfoValue> {
    if !text.contains(HUMAN_DNA_QUESTION) {
        return None;
    }
    if HUMAN_NO_RE.is_match(text.as_str()) {
        Some("No".into())
    } else if HUMAN_YES_RE.is_match(text.as_str()) {
        Some("Yes".into())
    } else {
        None
    }
}

fn first_literal(text: &NormalizedText, choices: &[(&str, &str)]) -> Option<InfoValue> {
    choices
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, value)| InfoValue::from(*value))
}

fn first_capture(text: &NormalizedText, chain: &[&Regex]) -> Option<String> {
    chain.iter().find_map(|regex| {
        regex
            .captures(text.as_str())
            .and_then(|caps| caps.get(1))
            .map(|value| value.as_str().trim().to_string())
    })
}

fn genome_size(text: &NormalizedText) -> Option<String> {
    [&*GENOME_SIZE_RE, &*GENOME_SIZE_ALT_RE]
        .into_iter()
        .find_map(|regex| {
            let raw = regex.captures(text.as_str())?.get(1)?.as_str();
            strip_thousands(raw).parse::<u64>().ok()
        })
        .map(|size| format!("{size} bp"))
}

fn flow_cells(text: &NormalizedText) -> Option<i64> {
    let raw = FLOW_CELLS_RE.captures(text.as_str())?.get(1)?.as_str();
    strip_thousands(raw).parse::<i64>().ok()
}

fn basecalling_method(text: &NormalizedText) -> Option<InfoValue> {
    let method = if text.contains("HAC") && text.contains("High Accuracy") {
        "HAC (High Accuracy - Usually sufficient for most applications)"
    } else if text.contains("SUP") && text.contains("Super-High Accuracy") {
        "SUP (Super-High Accuracy - Computing intensive, may add 1-2 weeks)"
    } else if text.contains("Methylation") {
        "Methylation"
    } else {
        return None;
    };
    Some(method.into())
}

fn expected_reads(text: &NormalizedText) -> Option<InfoValue> {
    let caps = READS_RE.captures(text.as_str())?;
    let min = strip_thousands(caps.get(1)?.as_str());
    let max = strip_thousands(caps.get(2)?.as_str());
    Some(format!("{min} - {max}").into())
}

/// The narrow amplicon narrative wins whenever it matches; the broad
/// section capture is only consulted otherwise and must pass the filter.
fn additional_comments(text: &NormalizedText, filter: &CommentFilter) -> Option<String> {
    if let Some(narrative) = COMMENT_NARROW_RE.find(text.as_str()) {
        return Some(collapse_whitespace(narrative.as_str()));
    }

    let captured = COMMENT_BROAD_RE
        .captures(text.as_str())
        .and_then(|caps| caps.get(1))?;
    let comment = collapse_whitespace(captured.as_str());
    if filter.accepts(&comment) {
        Some(comment)
    } else {
        debug!(comment = %comment, "discarding comment capture that looks like form text");
        None
    }
}
