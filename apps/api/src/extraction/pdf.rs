use lopdf::Document;

use crate::extraction::{join_units, ExtractionError, TextExtractor, UnitText};

/// Page-by-page PDF text extraction.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
        Ok(join_units("Page", &extract_pages(&doc)))
    }
}

/// One unit per page, in page order. A page whose content cannot be decoded is recorded as failed.
/// lopdf ends each page's text with a line break; it is dropped so pages join on a single newline.
pub fn extract_pages(doc: &Document) -> Vec<UnitText> {
    doc.get_pages()
        .into_keys()
        .map(|page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => UnitText::Extracted(text.trim_end_matches('\n').to_string()),
            Err(e) => UnitText::Failed {
                reason: e.to_string(),
            },
        })
        .collect()
}
