use lopdf::Document;

use crate::error::IntakeError;

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IntakeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IntakeError> {
        let document = Document::load_mem(bytes)
            .map_err(|err| IntakeError::UnreadableDocument(format!("not a valid PDF: {err}")))?;
        let page_numbers = document.get_pages().keys().copied().collect::<Vec<u32>>();
        if page_numbers.is_empty() {
            return Err(IntakeError::UnreadableDocument(
                "PDF contains no pages".to_string(),
            ));
        }
        document
            .extract_text(&page_numbers)
            .map_err(|err| IntakeError::UnreadableDocument(format!("text extraction failed: {err}")))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IntakeError> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|err| IntakeError::UnreadableDocument(format!("not UTF-8 text: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        Self(raw.replace("\r\n", "\n").replace('\r', "\n"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}
