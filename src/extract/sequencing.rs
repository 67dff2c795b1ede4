use serde::Serialize;
use tracing::debug;

use crate::domain::SequencingType;
use crate::text::NormalizedText;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencingClassification {
    pub selected_type: Option<SequencingType>,
    pub available_types: Vec<SequencingType>,
}

/// Returns the first kit, in enumeration order, whose display name occurs in
/// the text. Checkbox state is not visible in extracted text, so a form that
/// lists every kit resolves to the first one.
pub fn classify_sequencing(text: &NormalizedText) -> SequencingClassification {
    let selected_type = SequencingType::ALL
        .into_iter()
        .find(|kind| text.contains(kind.display_name()));
    if selected_type.is_none() {
        debug!("no sequencing kit named in form text");
    }
    SequencingClassification {
        selected_type,
        available_types: SequencingType::ALL.to_vec(),
    }
}
