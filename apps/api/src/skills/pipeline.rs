//! Prompt → model → parse → normalize, for one extracted document.

use tracing::{info, warn};

use crate::llm_client::ClientPool;
use crate::skills::normalizer::{normalize, SkillRecord};
use crate::skills::parser::{safe_parse, ParsedCandidate};
use crate::skills::prompts::{build_prompt, SKILL_EXTRACTION_USER};

pub const NO_MODEL_RESPONSE: &str = "no model response";

/// Everything the pipeline learned about one document.
#[derive(Debug, Clone)]
pub struct SkillReport {
    pub record: SkillRecord,
    /// Raw model text, when any client answered.
    pub raw: Option<String>,
    pub client_used: Option<String>,
    pub snippet: String,
}

/// Sends the document to the model pool and parses whatever comes back.
/// A missing response is reported as a parse error, not a failure.
pub async fn parse_document(
    pool: &ClientPool,
    resume_text: &str,
    max_attempts_per_client: u32,
) -> (ParsedCandidate, Option<String>, Option<String>) {
    let prompt = build_prompt(resume_text);

    match pool
        .call_with_failover(&prompt, SKILL_EXTRACTION_USER, max_attempts_per_client)
        .await
    {
        Some(response) => {
            let candidate = safe_parse(Some(&response.text));
            (candidate, Some(response.text), Some(response.client_used))
        }
        None => (
            ParsedCandidate {
                value: None,
                error: Some(NO_MODEL_RESPONSE.to_string()),
                snippet: String::new(),
            },
            None,
            None,
        ),
    }
}

pub async fn extract_resume_info(
    pool: &ClientPool,
    resume_text: &str,
    max_attempts_per_client: u32,
) -> SkillReport {
    let (candidate, raw, client_used) =
        parse_document(pool, resume_text, max_attempts_per_client).await;

    if let Some(err) = &candidate.error {
        warn!("Model output unusable ({err}): {}", candidate.snippet);
    }

    let record = normalize(candidate.value.as_ref(), candidate.error);
    info!(
        "Extracted {} skills (is_resume={}, confidence={})",
        record.skills.len(),
        record.is_resume,
        record.confidence
    );

    SkillReport {
        record,
        raw,
        client_used,
        snippet: candidate.snippet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::pool::tests::{pool_of, ScriptedBackend};

    #[tokio::test]
    async fn test_no_clients_reports_missing_response() {
        let pool = ClientPool::new(Vec::new());
        let report = extract_resume_info(&pool, "resume text", 2).await;
        assert_eq!(report.record.error.as_deref(), Some(NO_MODEL_RESPONSE));
        assert!(report.record.skills.is_empty());
        assert_eq!(report.raw, None);
        assert_eq!(report.client_used, None);
    }

    #[tokio::test]
    async fn test_successful_response_is_normalized() {
        let backend = ScriptedBackend::replying(
            r#"{"skills": ["Rust", "Tokio"], "is_resume": true, "confidence": 0.95}"#,
        );
        let pool = pool_of(vec![backend]);
        let report = extract_resume_info(&pool, "resume text", 2).await;

        assert_eq!(report.record.skills, vec!["rust", "tokio"]);
        assert!(report.record.is_resume);
        assert_eq!(report.record.error, None);
        assert_eq!(report.client_used.as_deref(), Some("client1"));
        assert!(report.raw.unwrap().contains("Tokio"));
    }

    #[tokio::test]
    async fn test_unparseable_response_keeps_raw_text() {
        let backend = ScriptedBackend::replying("I am unable to help with that.");
        let pool = pool_of(vec![backend]);
        let report = extract_resume_info(&pool, "resume text", 2).await;

        assert_eq!(report.record.error.as_deref(), Some("no JSON object found"));
        assert_eq!(report.raw.as_deref(), Some("I am unable to help with that."));
        assert_eq!(report.snippet, "I am unable to help with that.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_pool_reports_missing_response() {
        let pool = pool_of(vec![ScriptedBackend::failing(), ScriptedBackend::failing()]);
        let report = extract_resume_info(&pool, "resume text", 2).await;
        assert_eq!(report.record.error.as_deref(), Some(NO_MODEL_RESPONSE));
        assert_eq!(report.client_used, None);
    }
}
