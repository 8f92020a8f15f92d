//! The game orchestrator.
//!
//! [`GameMaster`] issues prompts to the [`Storyteller`], runs the replies
//! through the extractor and drives the [`Session`] state machine. Model
//! and parse failures never escape as errors once a game is running: they
//! end the game with a generic narrative instead.

use crate::error::GameError;
use crate::extract::{parse_opening_choices, parse_story_beat};
use crate::prompts::{
    final_outcome_prompt, opening_choices_prompt, story_beat_prompt, story_hook_prompt, GameSetup,
    FALLBACK_THEME,
};
use crate::session::{GuessVerdict, Session, StoryEntry, GAME_LENGTH};
use crate::storyteller::Storyteller;
use std::sync::Arc;

/// Narrative shown when a running game fails.
pub const COLLAPSE_NARRATIVE: &str = "The story's logic collapsed... an error occurred.";

/// Narrative shown when a choice arrives after the story has ended.
pub const ALREADY_OVER_NARRATIVE: &str =
    "This story has already reached its end. Refresh the page to start a new one.";

/// What the player sees when a new game starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    pub story: String,
    pub choice1: String,
    pub choice2: String,
    pub score: u32,
}

/// Result of submitting a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub next_part: String,
    /// Present while the game continues.
    pub choices: Option<(String, String)>,
    pub game_over: bool,
    /// Present once the game is over.
    pub user_choices: Option<Vec<String>>,
}

impl TurnOutcome {
    fn continuing(next_part: String, choice1: String, choice2: String) -> Self {
        Self {
            next_part,
            choices: Some((choice1, choice2)),
            game_over: false,
            user_choices: None,
        }
    }

    fn finished(next_part: impl Into<String>, session: &Session) -> Self {
        Self {
            next_part: next_part.into(),
            choices: None,
            game_over: true,
            user_choices: Some(session.user_choices().to_vec()),
        }
    }
}

/// Result of a guess at the trigger choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    pub verdict: GuessVerdict,
    pub result_text: String,
    pub score: u32,
}

/// Configuration for the game master.
#[derive(Debug, Clone, Default)]
pub struct GameMasterConfig {
    /// Narrative used in place of the generic collapse message.
    pub collapse_narrative: Option<String>,
}

/// Runs games against a storyteller.
pub struct GameMaster {
    storyteller: Arc<dyn Storyteller>,
    config: GameMasterConfig,
}

impl GameMaster {
    pub fn new(storyteller: Arc<dyn Storyteller>) -> Self {
        Self {
            storyteller,
            config: GameMasterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GameMasterConfig) -> Self {
        self.config = config;
        self
    }

    /// Start a game with a randomly drawn character, situation and theme.
    pub async fn start_game(&self) -> Result<(Session, Opening), GameError> {
        let setup = GameSetup::random(&mut rand::thread_rng());
        self.start_game_with(setup).await
    }

    /// Start a game from a known setup.
    ///
    /// Makes two chained calls: a story hook, then two choices with one
    /// secretly marked as the trigger.
    pub async fn start_game_with(&self, setup: GameSetup) -> Result<(Session, Opening), GameError> {
        tracing::info!(
            character = %setup.character,
            situation = %setup.situation,
            theme = %setup.theme,
            "starting new game"
        );

        let hook_prompt = story_hook_prompt(&setup);
        let story = self
            .storyteller
            .send(&[], &hook_prompt)
            .await?
            .trim()
            .to_string();

        let history = [StoryEntry::user(hook_prompt), StoryEntry::model(story.clone())];
        let reply = self
            .storyteller
            .send(&history, &opening_choices_prompt(&story))
            .await?;
        let choices = parse_opening_choices(&reply)?;

        let session = Session::begin(setup.theme, choices.trigger, story.clone());
        let opening = Opening {
            story,
            choice1: choices.choice1,
            choice2: choices.choice2,
            score: session.score(),
        };

        Ok((session, opening))
    }

    /// Submit a player's choice and generate what happens next.
    pub async fn advance(&self, session: &mut Session, choice: &str) -> TurnOutcome {
        let turn = match session.record_choice(choice) {
            Ok(turn) => turn,
            Err(e) => {
                tracing::info!(error = %e, "choice submitted after game over");
                return TurnOutcome::finished(ALREADY_OVER_NARRATIVE, session);
            }
        };

        let result = if turn >= GAME_LENGTH {
            self.final_outcome(session).await
        } else {
            self.next_beat(session).await
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(turn, kind = e.kind(), error = %e, "story generation failed; ending game");
                session.force_game_over();
                TurnOutcome::finished(self.collapse_narrative(), session)
            }
        }
    }

    /// Compare a guess with the session's trigger choice.
    pub fn guess(&self, session: &mut Session, guess: &str) -> GuessOutcome {
        let verdict = session.evaluate_guess(guess);
        let trigger = session.secret_trigger_choice();
        let score = session.score();

        let result_text = match verdict {
            GuessVerdict::Correct | GuessVerdict::AlreadyScored => format!(
                "Correct! The crucial choice was indeed '{trigger}'. Your score is now {score}."
            ),
            GuessVerdict::Incorrect => format!(
                "Sorry, that wasn't it. The real trigger was '{trigger}'. Your score remains {score}."
            ),
            GuessVerdict::NotFinished => format!(
                "The story isn't over yet! Finish it before guessing. Your score remains {score}."
            ),
        };

        tracing::info!(?verdict, score, "guess evaluated");

        GuessOutcome {
            verdict,
            result_text,
            score,
        }
    }

    async fn next_beat(&self, session: &mut Session) -> Result<TurnOutcome, GameError> {
        let prompt = story_beat_prompt(theme_of(session));
        let reply = self.storyteller.send(session.story_log(), &prompt).await?;
        session.record_model_text(reply.clone());

        let beat = parse_story_beat(&reply)?;
        Ok(TurnOutcome::continuing(beat.story, beat.choice1, beat.choice2))
    }

    async fn final_outcome(&self, session: &mut Session) -> Result<TurnOutcome, GameError> {
        let prompt = final_outcome_prompt(theme_of(session));
        let reply = self.storyteller.send(session.story_log(), &prompt).await?;
        session.record_model_text(reply.clone());

        Ok(TurnOutcome::finished(reply.trim(), session))
    }

    fn collapse_narrative(&self) -> String {
        self.config
            .collapse_narrative
            .clone()
            .unwrap_or_else(|| COLLAPSE_NARRATIVE.to_string())
    }
}

fn theme_of(session: &Session) -> &str {
    let theme = session.current_theme();
    if theme.trim().is_empty() {
        FALLBACK_THEME
    } else {
        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::GamePhase;
    use crate::testing::{opening_choices_reply, story_beat_reply, ScriptedStoryteller};

    fn setup() -> GameSetup {
        GameSetup::new(
            "a grumpy garden gnome",
            "finds a mysterious button",
            "bureaucratic absurdity",
        )
    }

    fn master(storyteller: &Arc<ScriptedStoryteller>) -> GameMaster {
        GameMaster::new(storyteller.clone())
    }

    #[tokio::test]
    async fn test_start_game_chains_two_calls() {
        let storyteller = Arc::new(ScriptedStoryteller::new([
            "  A gnome finds a button labelled 'Form 27B'.  ".to_string(),
            opening_choices_reply("Press the button", "File a complaint", 1),
        ]));

        let (session, opening) = master(&storyteller).start_game_with(setup()).await.unwrap();

        assert_eq!(opening.story, "A gnome finds a button labelled 'Form 27B'.");
        assert_eq!(opening.choice1, "Press the button");
        assert_eq!(opening.choice2, "File a complaint");
        assert_eq!(opening.score, 0);
        assert_eq!(session.secret_trigger_choice(), "Press the button");
        assert_eq!(session.current_theme(), "bureaucratic absurdity");
        assert_eq!(session.phase(), GamePhase::AwaitingFirstChoice);
        assert_eq!(session.story_log(), &[StoryEntry::model(opening.story.clone())]);

        let calls = storyteller.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].history.is_empty());
        assert_eq!(calls[1].history.len(), 2);
        assert_eq!(calls[1].history[1], StoryEntry::model(opening.story));
        assert!(calls[1].prompt.contains("secret_trigger_is_choice"));
    }

    #[tokio::test]
    async fn test_start_game_fails_on_malformed_choices() {
        let storyteller = Arc::new(ScriptedStoryteller::new([
            "A hook.",
            "I'd rather not use JSON today.",
        ]));

        let err = master(&storyteller).start_game_with(setup()).await.unwrap_err();
        assert!(matches!(err, GameError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_start_game_fails_on_upstream_error() {
        let storyteller = Arc::new(ScriptedStoryteller::default());
        storyteller.push_failure("quota exceeded");

        let err = master(&storyteller).start_game_with(setup()).await.unwrap_err();
        assert!(matches!(err, GameError::Upstream(_)));
        assert_eq!(storyteller.call_count(), 1);
    }

    #[tokio::test]
    async fn test_random_start_uses_known_theme() {
        let storyteller = Arc::new(ScriptedStoryteller::new([
            "Hook.".to_string(),
            opening_choices_reply("A", "B", 2),
        ]));

        let (session, _) = master(&storyteller).start_game().await.unwrap();
        assert!(crate::prompts::STORY_THEMES.contains(&session.current_theme()));
        assert_eq!(session.secret_trigger_choice(), "B");
    }

    #[tokio::test]
    async fn test_mid_game_beat() {
        let storyteller = Arc::new(ScriptedStoryteller::new([story_beat_reply(
            "The button files itself.",
            "Stamp it",
            "Shred it",
        )]));
        let mut session = Session::begin("bureaucratic absurdity", "Press the button", "Hook.");

        let outcome = master(&storyteller).advance(&mut session, "Press the button").await;

        assert_eq!(
            outcome,
            TurnOutcome {
                next_part: "The button files itself.".to_string(),
                choices: Some(("Stamp it".to_string(), "Shred it".to_string())),
                game_over: false,
                user_choices: None,
            }
        );
        assert_eq!(session.turn(), 1);
        assert_eq!(session.phase(), GamePhase::MidGame);
        // hook, user choice, raw model reply
        assert_eq!(session.story_log().len(), 3);

        let call = &storyteller.calls()[0];
        assert_eq!(call.history.len(), 2);
        assert!(call.prompt.contains("'bureaucratic absurdity' theme"));
    }

    #[tokio::test]
    async fn test_malformed_beat_ends_game_early() {
        let storyteller = Arc::new(ScriptedStoryteller::new([
            story_beat_reply("One.", "a", "b"),
            "No JSON here, sorry.".to_string(),
        ]));
        let master = master(&storyteller);
        let mut session = Session::begin("darkly humorous", "a", "Hook.");

        master.advance(&mut session, "first").await;
        let outcome = master.advance(&mut session, "second").await;

        assert!(outcome.game_over);
        assert_eq!(outcome.next_part, COLLAPSE_NARRATIVE);
        assert_eq!(outcome.choices, None);
        assert_eq!(
            outcome.user_choices,
            Some(vec!["first".to_string(), "second".to_string()])
        );
        assert!(session.is_over());
        assert_eq!(session.turn(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_on_final_turn_ends_game() {
        let storyteller = Arc::new(ScriptedStoryteller::new([
            story_beat_reply("One.", "a", "b"),
            story_beat_reply("Two.", "c", "d"),
        ]));
        storyteller.push_failure("connection reset");
        let master = master(&storyteller);
        let mut session = Session::begin("darkly humorous", "a", "Hook.");

        master.advance(&mut session, "1").await;
        master.advance(&mut session, "2").await;
        let outcome = master.advance(&mut session, "3").await;

        assert!(outcome.game_over);
        assert_eq!(outcome.next_part, COLLAPSE_NARRATIVE);
        assert_eq!(session.turn(), GAME_LENGTH);
    }

    #[tokio::test]
    async fn test_custom_collapse_narrative() {
        let storyteller = Arc::new(ScriptedStoryteller::new(["garbage"]));
        let master = master(&storyteller).with_config(GameMasterConfig {
            collapse_narrative: Some("Everything exploded.".to_string()),
        });
        let mut session = Session::begin("darkly humorous", "a", "Hook.");

        let outcome = master.advance(&mut session, "go").await;
        assert_eq!(outcome.next_part, "Everything exploded.");
    }

    #[tokio::test]
    async fn test_choice_after_game_over_skips_model() {
        let storyteller = Arc::new(ScriptedStoryteller::default());
        let mut session = Session::begin("darkly humorous", "a", "Hook.");
        session.force_game_over();

        let outcome = master(&storyteller).advance(&mut session, "more!").await;

        assert!(outcome.game_over);
        assert_eq!(outcome.next_part, ALREADY_OVER_NARRATIVE);
        assert_eq!(storyteller.call_count(), 0);
        assert!(session.user_choices().is_empty());
    }

    #[tokio::test]
    async fn test_guess_texts() {
        let storyteller = Arc::new(ScriptedStoryteller::default());
        let master = master(&storyteller);
        let mut session = Session::begin("darkly humorous", "Eats the cookie", "Hook.");

        let early = master.guess(&mut session, "Eats the cookie");
        assert_eq!(early.verdict, GuessVerdict::NotFinished);
        assert_eq!(early.score, 0);

        session.force_game_over();

        let wrong = master.guess(&mut session, "Hides the cookie");
        assert_eq!(wrong.verdict, GuessVerdict::Incorrect);
        assert_eq!(
            wrong.result_text,
            "Sorry, that wasn't it. The real trigger was 'Eats the cookie'. Your score remains 0."
        );

        let right = master.guess(&mut session, "  Eats The Cookie ");
        assert_eq!(right.verdict, GuessVerdict::Correct);
        assert_eq!(right.score, 10);
        assert_eq!(
            right.result_text,
            "Correct! The crucial choice was indeed 'Eats the cookie'. Your score is now 10."
        );
    }
}
