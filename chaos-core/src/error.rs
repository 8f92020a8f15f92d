//! Error types for the chaos engine.
//!
//! Uses thiserror for ergonomic error definition.

/// Everything that can go wrong while turning a model reply into game state.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No JSON object could be located in the model's text
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// A JSON object was found but did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The model call itself failed
    #[error("Upstream error: {0}")]
    Upstream(#[from] StorytellerError),
}

impl GameError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::Extraction(_) => "extraction",
            GameError::Parse(_) => "parse",
            GameError::Upstream(_) => "upstream",
        }
    }
}

/// Failure to locate a brace-delimited span in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no '{{' found in model output")]
    NoOpeningBrace,

    #[error("no '}}' found in model output")]
    NoClosingBrace,

    #[error("last '}}' appears before first '{{'")]
    ClosingBeforeOpening,
}

/// The extracted span is not the JSON document we asked for.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("field '{field}' has an unusable value: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Errors from the language model collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorytellerError {
    #[error("Gemini API error: {0}")]
    Api(#[from] gemini::Error),

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("Scripted storyteller failure: {0}")]
    Scripted(String),
}
