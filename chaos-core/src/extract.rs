//! Pulling structured data out of free-text model replies.
//!
//! The model is asked for JSON but frequently wraps it in prose or code
//! fences. [`extract_json`] takes the span from the first `{` to the last
//! `}`; the `parse_*` functions then decode that span into typed payloads.
//! Syntax problems surface at the parse step, never in the extractor.

use crate::error::{ExtractionError, GameError, ParseError};
use serde::Deserialize;
use serde_json::Value;

/// Locate the candidate JSON object inside `text`.
///
/// Returns the substring from the first `{` to the last `}` inclusive.
/// Braces inside the surrounding prose are not disambiguated.
pub fn extract_json(text: &str) -> Result<&str, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::NoOpeningBrace)?;
    let end = text.rfind('}').ok_or(ExtractionError::NoClosingBrace)?;

    if end < start {
        return Err(ExtractionError::ClosingBeforeOpening);
    }

    Ok(&text[start..=end])
}

/// The two opening choices and which one is the hidden trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningChoices {
    pub choice1: String,
    pub choice2: String,
    pub trigger: String,
}

/// One generated story increment with its two follow-up choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryBeat {
    pub story: String,
    pub choice1: String,
    pub choice2: String,
}

#[derive(Deserialize)]
struct RawOpeningChoices {
    choice1: String,
    choice2: String,
    secret_trigger_is_choice: Value,
}

#[derive(Deserialize)]
struct RawStoryBeat {
    story: String,
    choice1: String,
    choice2: String,
}

/// Decode the opening-choices reply.
///
/// `secret_trigger_is_choice` may be a number, a numeric string or a
/// boolean. Exactly `1` (or `true`) selects `choice1`; any other number,
/// fractional values included, selects `choice2`.
pub fn parse_opening_choices(text: &str) -> Result<OpeningChoices, GameError> {
    let raw: RawOpeningChoices = serde_json::from_str(extract_json(text)?).map_err(ParseError::from)?;

    let choice1 = non_empty("choice1", raw.choice1)?;
    let choice2 = non_empty("choice2", raw.choice2)?;

    let trigger = if trigger_is_first(&raw.secret_trigger_is_choice)? {
        choice1.clone()
    } else {
        choice2.clone()
    };

    Ok(OpeningChoices {
        choice1,
        choice2,
        trigger,
    })
}

/// Decode a mid-game story beat reply.
pub fn parse_story_beat(text: &str) -> Result<StoryBeat, GameError> {
    let raw: RawStoryBeat = serde_json::from_str(extract_json(text)?).map_err(ParseError::from)?;

    Ok(StoryBeat {
        story: non_empty("story", raw.story)?,
        choice1: non_empty("choice1", raw.choice1)?,
        choice2: non_empty("choice2", raw.choice2)?,
    })
}

fn non_empty(field: &'static str, value: String) -> Result<String, ParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

fn trigger_is_first(value: &Value) -> Result<bool, ParseError> {
    let invalid = || ParseError::InvalidField {
        field: "secret_trigger_is_choice",
        value: value.to_string(),
    };

    let index = match value {
        Value::Bool(first) => return Ok(*first),
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    Ok(index == 1.0)
}
