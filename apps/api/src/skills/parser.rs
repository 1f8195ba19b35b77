//! Lenient JSON recovery for model output.
//!
//! The model is asked for pure JSON but may wrap the object in prose or code
//! fences. Parsing tries the whole text first, then the outermost `{ ... }` block.

use serde_json::Value;

/// Upper bound on diagnostic snippets, in characters.
pub const SNIPPET_LIMIT: usize = 2000;

pub const EMPTY_RESPONSE: &str = "empty model response";
pub const NO_JSON_OBJECT: &str = "no JSON object found";

/// Result of interpreting model text as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCandidate {
    pub value: Option<Value>,
    pub error: Option<String>,
    /// The text that parsed, or a truncated excerpt of the text that did not.
    pub snippet: String,
}

impl ParsedCandidate {
    fn parsed(value: Value, snippet: &str) -> Self {
        Self {
            value: Some(value),
            error: None,
            snippet: snippet.to_string(),
        }
    }

    fn failed(error: impl Into<String>, snippet: &str) -> Self {
        Self {
            value: None,
            error: Some(error.into()),
            snippet: truncate_chars(snippet, SNIPPET_LIMIT).to_string(),
        }
    }
}

pub fn safe_parse(raw: Option<&str>) -> ParsedCandidate {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return ParsedCandidate::failed(EMPTY_RESPONSE, "");
    };

    let text = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return ParsedCandidate::parsed(value, text);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            let block = &text[start..=end];
            match serde_json::from_str::<Value>(block) {
                Ok(value) => ParsedCandidate::parsed(value, block),
                Err(e) => ParsedCandidate::failed(format!("json load failed: {e}"), block),
            }
        }
        _ => ParsedCandidate::failed(NO_JSON_OBJECT, text),
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
