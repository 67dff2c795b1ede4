use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::domain::{BLANK, POSITIVE_CONTROL, Sample};
use crate::text::NormalizedText;

static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\n(\d+)\n2\n(\d+\.?\d*)\n(\d+\.\d+)").unwrap()
});

pub const FORM_VOLUME_UL: f64 = 2.0;

pub fn parse_samples(text: &NormalizedText) -> Vec<Sample> {
    let mut samples = ROW_RE
        .captures_iter(text.as_str())
        .filter_map(|caps| parse_row(&caps))
        .collect::<Vec<_>>();

    for sentinel in [POSITIVE_CONTROL, BLANK] {
        if text.contains(sentinel) {
            samples.push(Sample::control(sentinel));
        }
    }
    samples
}

fn parse_row(caps: &Captures<'_>) -> Option<Sample> {
    let name = caps.get(2)?.as_str();
    let nanodrop = caps.get(3)?.as_str();
    let ratio = caps.get(4)?.as_str();
    let (Some(nanodrop_conc), Some(a260_280_ratio)) = (measurement(nanodrop), measurement(ratio))
    else {
        debug!(row = &caps[0], "skipping malformed sample row");
        return None;
    };
    Some(Sample {
        name: name.to_string(),
        volume_ul: FORM_VOLUME_UL,
        qubit_conc: 0.0,
        nanodrop_conc,
        a260_280_ratio,
        a260_230_ratio: None,
    })
}

/// Overflowing digit runs parse to infinity, which cannot be stored as JSON.
fn measurement(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}
