//! The language-model collaborator behind the game.
//!
//! [`Storyteller`] is the seam the [`GameMaster`](crate::GameMaster) talks
//! to. Production uses [`GeminiStoryteller`]; tests use
//! [`ScriptedStoryteller`](crate::testing::ScriptedStoryteller).

use crate::error::StorytellerError;
use crate::prompts::CHAOS_INSTRUCTIONS;
use crate::session::{StoryEntry, StoryRole};
use async_trait::async_trait;
use gemini::{Gemini, Message, Request};

/// A chat-style text generator.
#[async_trait]
pub trait Storyteller: Send + Sync {
    /// Send `prompt` as the next user turn after `history` and return the reply text.
    async fn send(&self, history: &[StoryEntry], prompt: &str) -> Result<String, StorytellerError>;
}

/// Configuration for the Gemini-backed storyteller.
#[derive(Debug, Clone)]
pub struct StorytellerConfig {
    /// The model to use (defaults to the client's model).
    pub model: Option<String>,

    /// System instruction sent with every request.
    pub system_instruction: String,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Maximum tokens for replies.
    pub max_output_tokens: Option<u32>,
}

impl Default for StorytellerConfig {
    fn default() -> Self {
        Self {
            model: None,
            system_instruction: CHAOS_INSTRUCTIONS.to_string(),
            temperature: None,
            max_output_tokens: Some(1024),
        }
    }
}

/// Storyteller backed by the Gemini API.
pub struct GeminiStoryteller {
    client: Gemini,
    config: StorytellerConfig,
}

impl GeminiStoryteller {
    pub fn new(client: Gemini) -> Self {
        Self {
            client,
            config: StorytellerConfig::default(),
        }
    }

    /// Create a storyteller from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, StorytellerError> {
        Ok(Self::new(Gemini::from_env()?))
    }

    pub fn with_config(mut self, config: StorytellerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StorytellerConfig {
        &self.config
    }

    fn build_request(&self, history: &[StoryEntry], prompt: &str) -> Request {
        let mut messages: Vec<Message> = history
            .iter()
            .map(|entry| match entry.role {
                StoryRole::User => Message::user(&entry.text),
                StoryRole::Model => Message::model(&entry.text),
            })
            .collect();
        messages.push(Message::user(prompt));

        let mut request = Request::new(messages).with_system(&self.config.system_instruction);

        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }

        if let Some(temp) = self.config.temperature {
            request = request.with_temperature(temp);
        }

        if let Some(max) = self.config.max_output_tokens {
            request = request.with_max_output_tokens(max);
        }

        request
    }
}

#[async_trait]
impl Storyteller for GeminiStoryteller {
    async fn send(&self, history: &[StoryEntry], prompt: &str) -> Result<String, StorytellerError> {
        let request = self.build_request(history, prompt);
        let response = self.client.complete(request).await?;

        tracing::debug!(
            finish_reason = ?response.finish_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "storyteller reply received"
        );

        let text = response.text();
        if text.trim().is_empty() {
            return Err(StorytellerError::EmptyReply);
        }
        Ok(text)
    }
}
