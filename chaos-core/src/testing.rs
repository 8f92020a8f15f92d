//! Testing utilities for the chaos engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedStoryteller` for deterministic games without API calls
//! - Canned model replies in the shapes the game asks for

use crate::error::StorytellerError;
use crate::session::StoryEntry;
use crate::storyteller::Storyteller;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A storyteller that returns scripted replies in order.
///
/// Every call is recorded so tests can assert on the prompts and history
/// the game sent.
#[derive(Default)]
pub struct ScriptedStoryteller {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// One request the game made to the storyteller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub history: Vec<StoryEntry>,
    pub prompt: String,
}

impl ScriptedStoryteller {
    /// Create a storyteller that replies with `replies` in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let storyteller = Self::default();
        for reply in replies {
            storyteller.push_reply(reply);
        }
        storyteller
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    /// Queue an upstream failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_replies().push_back(Err(message.into()));
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Replies that have not been consumed yet.
    pub fn remaining(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Storyteller for ScriptedStoryteller {
    async fn send(&self, history: &[StoryEntry], prompt: &str) -> Result<String, StorytellerError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                history: history.to_vec(),
                prompt: prompt.to_string(),
            });

        match self.lock_replies().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(StorytellerError::Scripted(message)),
            None => Err(StorytellerError::Scripted(
                "the storyteller has no more scripted replies".to_string(),
            )),
        }
    }
}

/// An opening-choices reply marking `trigger` (1 or 2) as the secret choice.
pub fn opening_choices_reply(choice1: &str, choice2: &str, trigger: u8) -> String {
    serde_json::json!({
        "choice1": choice1,
        "choice2": choice2,
        "secret_trigger_is_choice": trigger,
    })
    .to_string()
}

/// A mid-game beat reply wrapped in chatty prose, as models tend to send.
pub fn story_beat_reply(story: &str, choice1: &str, choice2: &str) -> String {
    format!(
        "Sure! {} Hope that helps!",
        serde_json::json!({
            "story": story,
            "choice1": choice1,
            "choice2": choice2,
        })
    )
}
