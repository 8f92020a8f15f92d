//! Chaos Engine: a choose-your-own-adventure game driven by a language model.
//!
//! This crate provides:
//! - A resilient extractor for JSON embedded in model replies
//! - The per-session turn state machine and guess scoring
//! - A game master that chains model prompts into story beats
//! - A session repository abstraction with an in-memory store
//!
//! # Quick Start
//!
//! ```ignore
//! use chaos_core::{GameMaster, GeminiStoryteller};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let master = GameMaster::new(Arc::new(GeminiStoryteller::from_env()?));
//!
//!     let (mut session, opening) = master.start_game().await?;
//!     println!("{}", opening.story);
//!
//!     let outcome = master.advance(&mut session, &opening.choice1).await;
//!     println!("{}", outcome.next_part);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extract;
pub mod master;
pub mod prompts;
pub mod session;
pub mod store;
pub mod storyteller;
pub mod testing;

// Primary public API
pub use error::{ExtractionError, GameError, ParseError, StorytellerError};
pub use extract::{extract_json, parse_opening_choices, parse_story_beat, OpeningChoices, StoryBeat};
pub use master::{GameMaster, GameMasterConfig, GuessOutcome, Opening, TurnOutcome};
pub use prompts::GameSetup;
pub use session::{GamePhase, GuessVerdict, Session, StoryEntry, StoryRole, GAME_LENGTH, GUESS_REWARD};
pub use store::{InMemorySessionStore, SessionId, SessionStore, DEFAULT_MAX_SESSIONS};
pub use storyteller::{GeminiStoryteller, Storyteller, StorytellerConfig};
pub use testing::ScriptedStoryteller;
