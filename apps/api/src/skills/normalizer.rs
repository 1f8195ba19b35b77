use serde::Serialize;
use serde_json::{Map, Value};

pub const INVALID_JSON: &str = "model did not return valid JSON";

/// Stable output schema, whatever the model returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillRecord {
    /// Trimmed, lowercased, deduplicated in first-seen order. Never null.
    pub skills: Vec<String>,
    pub is_resume: bool,
    /// Rounded to 3 decimal places. Not clamped.
    pub confidence: f64,
    pub error: Option<String>,
}

impl SkillRecord {
    fn degraded(error: String) -> Self {
        Self {
            skills: Vec::new(),
            is_resume: false,
            confidence: 0.0,
            error: Some(error),
        }
    }
}

/// Maps parsed model output onto a [`SkillRecord`].
/// Anything other than a JSON object yields an empty record carrying an error.
pub fn normalize(parsed: Option<&Value>, upstream_error: Option<String>) -> SkillRecord {
    let Some(Value::Object(obj)) = parsed else {
        return SkillRecord::degraded(upstream_error.unwrap_or_else(|| INVALID_JSON.to_string()));
    };

    let mut skills = obj
        .get("skills")
        .and_then(Value::as_array)
        .map(|items| collect_skills(items.iter()))
        .unwrap_or_default();

    // Category names are dropped; only the flattened union survives.
    if skills.is_empty() {
        if let Some(categories) = obj.get("technical_skills").and_then(Value::as_object) {
            skills = flatten_categories(categories);
        }
    }

    SkillRecord {
        skills,
        is_resume: obj
            .get("is_resume")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        confidence: round3(obj.get("confidence").and_then(coerce_f64).unwrap_or(0.0)),
        error: upstream_error,
    }
}

fn flatten_categories(categories: &Map<String, Value>) -> Vec<String> {
    collect_skills(
        categories
            .values()
            .filter_map(Value::as_array)
            .flat_map(|items| items.iter()),
    )
}

fn collect_skills<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for item in items {
        if item.is_null() {
            continue;
        }
        let skill = stringify(item).trim().to_lowercase();
        if !skill.is_empty() && !skills.contains(&skill) {
            skills.push(skill);
        }
    }
    skills
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers pass through; numeric strings are parsed. Everything else is not a confidence.
fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
