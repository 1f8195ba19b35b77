// Document text extraction.
// One extractor per supported upload format. Extraction is synchronous and
// best-effort: a unit (page, paragraph, cell) that fails contributes empty text
// instead of aborting the document.

pub mod docx;
pub mod pdf;

use thiserror::Error;
use tracing::warn;

use crate::extraction::docx::DocxExtractor;
use crate::extraction::pdf::PdfExtractor;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    Pdf(String),

    #[error("DOCX parsing failed: {0}")]
    Docx(String),
}

/// Turns raw document bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Supported upload formats, keyed by filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Lowercased text after the last `.`; the whole name when there is no dot.
    pub fn extension_of(filename: &str) -> String {
        filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            DocumentKind::Pdf => &PdfExtractor,
            DocumentKind::Docx => &DocxExtractor,
        }
    }
}

/// Outcome for a single page, paragraph or table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitText {
    Extracted(String),
    Failed { reason: String },
}

impl UnitText {
    pub fn text(&self) -> &str {
        match self {
            UnitText::Extracted(text) => text,
            UnitText::Failed { .. } => "",
        }
    }
}

/// Joins units with newlines. Failed units become empty lines.
pub fn join_units(kind: &str, units: &[UnitText]) -> String {
    for (i, unit) in units.iter().enumerate() {
        if let UnitText::Failed { reason } = unit {
            warn!("{kind} {} could not be extracted: {reason}", i + 1);
        }
    }
    units
        .iter()
        .map(UnitText::text)
        .collect::<Vec<_>>()
        .join("\n")
}
