// Skill extraction: prompt building, model output recovery, normalization,
// and the upload endpoint that ties them to the document extractors.
// All model calls go through llm_client; nothing here talks HTTP to the model directly.

pub mod handlers;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod prompts;
