// Skill extraction prompt templates.
// `{resume_text}` is replaced with the extracted document text before sending.

pub const SKILL_EXTRACTION_PROMPT: &str = "\
You are an expert resume parser. Return ONLY valid JSON (top-level object).

1) Extract a flat 'skills' array of all detected skills, tools, libraries, frameworks, cloud services,
   methodologies and soft skills.
2) Return 'is_resume' (boolean) and 'confidence' (float between 0.0 and 1.0).
3) If you cannot fully parse sections, always include at least {'skills': [...], 'is_resume': true/false, 'confidence': 0.0}.
4) Output must be pure JSON with no additional commentary.

DOCUMENT_TEXT:
{resume_text}
";

pub const SKILL_EXTRACTION_USER: &str = "Please parse the document.";

pub fn build_prompt(resume_text: &str) -> String {
    SKILL_EXTRACTION_PROMPT.replace("{resume_text}", resume_text)
}
