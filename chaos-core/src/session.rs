//! Per-player game state and the turn state machine.
//!
//! A [`Session`] is created when a game starts and moves through
//! [`GamePhase::AwaitingFirstChoice`] → [`GamePhase::MidGame`] →
//! [`GamePhase::GameOver`]. The turn counter never exceeds
//! [`GAME_LENGTH`]; once it reaches it the session is over and only
//! guesses are accepted.

use crate::prompts::choice_log_entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of choices a player makes before the final outcome.
pub const GAME_LENGTH: u32 = 3;

/// Points awarded for naming the trigger choice.
pub const GUESS_REWARD: u32 = 10;

/// Where a session is in its game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    AwaitingFirstChoice,
    MidGame,
    GameOver,
}

/// Who produced a story log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryRole {
    User,
    Model,
}

/// One fragment of the running conversation with the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryEntry {
    pub role: StoryRole,
    pub text: String,
}

impl StoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: StoryRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: StoryRole::Model,
            text: text.into(),
        }
    }
}

/// Errors from turn transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("the game is over; start a new game to keep playing")]
    GameOver,
}

/// Result of comparing a guess against the trigger choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessVerdict {
    /// Correct, and the reward was added by this call.
    Correct,
    /// Correct, but this game's reward was already paid out.
    AlreadyScored,
    Incorrect,
    /// Guesses only count once the story has ended.
    NotFinished,
}

/// State for one player's game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    score: u32,
    turn: u32,
    phase: GamePhase,
    story_log: Vec<StoryEntry>,
    user_choices: Vec<String>,
    current_theme: String,
    secret_trigger_choice: String,
    guess_scored: bool,
}

impl Session {
    /// Start a fresh game from an opening story and its hidden trigger.
    pub fn begin(
        theme: impl Into<String>,
        secret_trigger_choice: impl Into<String>,
        opening_story: impl Into<String>,
    ) -> Self {
        Self {
            score: 0,
            turn: 0,
            phase: GamePhase::AwaitingFirstChoice,
            story_log: vec![StoryEntry::model(opening_story)],
            user_choices: Vec::new(),
            current_theme: theme.into(),
            secret_trigger_choice: secret_trigger_choice.into(),
            guess_scored: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn story_log(&self) -> &[StoryEntry] {
        &self.story_log
    }

    pub fn user_choices(&self) -> &[String] {
        &self.user_choices
    }

    pub fn current_theme(&self) -> &str {
        &self.current_theme
    }

    pub fn secret_trigger_choice(&self) -> &str {
        &self.secret_trigger_choice
    }

    /// Record a player's choice and advance the turn counter.
    ///
    /// Returns the new turn number. The session is `GameOver` when the
    /// returned turn equals [`GAME_LENGTH`].
    pub fn record_choice(&mut self, choice: &str) -> Result<u32, TurnError> {
        if self.is_over() {
            return Err(TurnError::GameOver);
        }

        self.user_choices.push(choice.to_string());
        self.story_log.push(StoryEntry::user(choice_log_entry(choice)));
        self.turn += 1;

        self.phase = if self.turn >= GAME_LENGTH {
            GamePhase::GameOver
        } else {
            GamePhase::MidGame
        };

        Ok(self.turn)
    }

    /// Append a model reply to the conversation context.
    pub fn record_model_text(&mut self, text: impl Into<String>) {
        self.story_log.push(StoryEntry::model(text));
    }

    /// End the game early, keeping score and choices.
    pub fn force_game_over(&mut self) {
        self.phase = GamePhase::GameOver;
    }

    /// Compare a guess with the trigger, ignoring case and surrounding whitespace.
    pub fn evaluate_guess(&mut self, guess: &str) -> GuessVerdict {
        if !self.is_over() {
            return GuessVerdict::NotFinished;
        }

        if !guess_matches(guess, &self.secret_trigger_choice) {
            return GuessVerdict::Incorrect;
        }

        if self.guess_scored {
            return GuessVerdict::AlreadyScored;
        }

        self.guess_scored = true;
        self.score += GUESS_REWARD;
        GuessVerdict::Correct
    }
}

/// Case-insensitive, whitespace-trimmed comparison.
pub fn guess_matches(guess: &str, trigger: &str) -> bool {
    guess.trim().to_lowercase() == trigger.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session() -> Session {
        Session::begin("bureaucratic absurdity", "Press the button", "A gnome finds a button.")
    }

    #[test]
    fn test_begin() {
        let session = new_session();
        assert_eq!(session.score(), 0);
        assert_eq!(session.turn(), 0);
        assert_eq!(session.phase(), GamePhase::AwaitingFirstChoice);
        assert_eq!(session.story_log(), &[StoryEntry::model("A gnome finds a button.")]);
        assert!(session.user_choices().is_empty());
        assert_eq!(session.current_theme(), "bureaucratic absurdity");
        assert_eq!(session.secret_trigger_choice(), "Press the button");
    }

    #[test]
    fn test_turns_run_to_game_over() {
        let mut session = new_session();

        assert_eq!(session.record_choice("one"), Ok(1));
        assert_eq!(session.phase(), GamePhase::MidGame);
        assert_eq!(session.record_choice("two"), Ok(2));
        assert_eq!(session.phase(), GamePhase::MidGame);
        assert_eq!(session.record_choice("three"), Ok(GAME_LENGTH));
        assert_eq!(session.phase(), GamePhase::GameOver);

        assert_eq!(session.record_choice("four"), Err(TurnError::GameOver));
        assert_eq!(session.turn(), GAME_LENGTH);
        assert_eq!(session.user_choices(), &["one", "two", "three"]);
    }

    #[test]
    fn test_choice_is_logged_for_the_model() {
        let mut session = new_session();
        session.record_choice("Press it").unwrap();
        session.record_model_text("{\"story\": \"Boom.\"}");

        let log = session.story_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1], StoryEntry::user("The user chose: 'Press it'"));
        assert_eq!(log[2].role, StoryRole::Model);
    }

    #[test]
    fn test_force_game_over_keeps_progress() {
        let mut session = new_session();
        session.record_choice("one").unwrap();
        session.force_game_over();

        assert!(session.is_over());
        assert_eq!(session.turn(), 1);
        assert_eq!(session.user_choices(), &["one"]);
        assert_eq!(session.record_choice("two"), Err(TurnError::GameOver));
    }

    #[test]
    fn test_guess_matching_ignores_case_and_whitespace() {
        assert!(guess_matches("  Eats The Cookie ", "Eats the cookie"));
        assert!(guess_matches("press the button", " Press the button"));
        assert!(!guess_matches("press button", "Press the button"));
    }

    #[test]
    fn test_guess_before_game_over_is_not_scored() {
        let mut session = new_session();
        assert_eq!(session.evaluate_guess("Press the button"), GuessVerdict::NotFinished);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_guess_reward_paid_once() {
        let mut session = new_session();
        session.force_game_over();

        assert_eq!(session.evaluate_guess("walk away"), GuessVerdict::Incorrect);
        assert_eq!(session.score(), 0);
        assert_eq!(session.evaluate_guess("PRESS THE BUTTON"), GuessVerdict::Correct);
        assert_eq!(session.score(), GUESS_REWARD);
        assert_eq!(session.evaluate_guess("press the button"), GuessVerdict::AlreadyScored);
        assert_eq!(session.score(), GUESS_REWARD);
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut session = new_session();
        session.record_choice("one").unwrap();
        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }
}
