//! DOCX text extraction.
//!
//! Reads `word/document.xml` and emits body paragraphs in document order, then
//! table cells in document order. A cell's own paragraphs are joined by newlines.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;
use zip::ZipArchive;

use crate::extraction::{join_units, ExtractionError, TextExtractor, UnitText};

const DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractionError::Docx(format!("not a DOCX archive: {e}")))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ExtractionError::Docx(format!("missing {DOCUMENT_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractionError::Docx(format!("unreadable {DOCUMENT_PART}: {e}")))?;

        let body = walk_document(&xml)?;
        let units: Vec<UnitText> = body.paragraphs.into_iter().chain(body.cells).collect();
        Ok(join_units("Paragraph", &units))
    }
}

#[derive(Debug, Default)]
struct DocumentBody {
    paragraphs: Vec<UnitText>,
    cells: Vec<UnitText>,
}

/// A `w:p` still being read. Paragraphs nest inside text boxes, so these form a stack.
#[derive(Default)]
struct OpenParagraph {
    text: String,
    error: Option<String>,
}

#[derive(Default)]
struct WalkState {
    body: DocumentBody,
    table_depth: usize,
    in_text_run: bool,
    open: Vec<OpenParagraph>,
    cell_paragraphs: Vec<String>,
}

impl WalkState {
    fn start(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"tbl" => self.table_depth += 1,
            b"tc" if self.table_depth == 1 => self.cell_paragraphs.clear(),
            b"p" => self.open.push(OpenParagraph::default()),
            b"t" => self.in_text_run = true,
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"tab" => self.push_text("\t"),
            b"br" | b"cr" => self.push_text("\n"),
            b"p" => self.finish_paragraph(OpenParagraph::default()),
            b"tc" if self.table_depth == 1 => {
                self.body.cells.push(UnitText::Extracted(String::new()))
            }
            _ => {}
        }
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            b"tc" if self.table_depth == 1 => {
                let text = self.cell_paragraphs.join("\n");
                self.body.cells.push(UnitText::Extracted(text));
            }
            b"p" => {
                if let Some(paragraph) = self.open.pop() {
                    self.finish_paragraph(paragraph);
                }
            }
            b"t" => self.in_text_run = false,
            _ => {}
        }
    }

    fn text(&mut self, text: Result<String, String>) {
        if !self.in_text_run {
            return;
        }
        let Some(paragraph) = self.open.last_mut() else {
            return;
        };
        match text {
            Ok(t) => paragraph.text.push_str(&t),
            Err(reason) => paragraph.error = Some(reason),
        }
    }

    fn push_text(&mut self, s: &str) {
        if let Some(paragraph) = self.open.last_mut() {
            paragraph.text.push_str(s);
        }
    }

    /// A nested paragraph (text box content) is emitted before the paragraph that holds it.
    fn finish_paragraph(&mut self, paragraph: OpenParagraph) {
        let unit = match paragraph.error {
            Some(reason) => UnitText::Failed { reason },
            None => UnitText::Extracted(paragraph.text),
        };
        if self.table_depth == 0 {
            self.body.paragraphs.push(unit);
        } else {
            // Cell paragraphs are not units of their own; a failed one is an empty line in the cell.
            if let UnitText::Failed { reason } = &unit {
                warn!("Table paragraph could not be extracted: {reason}");
            }
            self.cell_paragraphs.push(unit.text().to_string());
        }
    }
}

fn walk_document(xml: &str) -> Result<DocumentBody, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    // Whitespace inside w:t is significant (xml:space="preserve").
    reader.trim_text(false);

    let mut state = WalkState::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.start(&e),
            Ok(Event::Empty(e)) => state.empty(&e),
            Ok(Event::End(e)) => state.end(e.local_name().as_ref()),
            Ok(Event::Text(e)) => state.text(
                e.unescape()
                    .map(|t| t.into_owned())
                    .map_err(|err| err.to_string()),
            ),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!(
                    "malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }
    Ok(state.body)
}
