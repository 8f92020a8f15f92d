//! Prompt text and the random ingredients a new game is seeded with.

use rand::seq::SliceRandom;
use rand::Rng;

/// Default system instruction for the storyteller model.
pub const CHAOS_INSTRUCTIONS: &str = include_str!("prompts/chaos_engine.txt");

pub const CHARACTER_ARCHETYPES: &[&str] = &[
    "a grumpy garden gnome",
    "a three-eyed alien tourist",
    "a hyper-intelligent squirrel",
    "a retired pirate captain",
    "a nervous, newly self-aware robot",
    "a cheerful grandmother",
    "a cynical house cat",
];

pub const INITIAL_SITUATIONS: &[&str] = &[
    "finds a mysterious button",
    "eats the last cookie",
    "receives a strange message",
    "sees a bizarrely-colored bird",
    "fixes a flickering lightbulb",
];

pub const STORY_THEMES: &[&str] = &[
    "darkly humorous",
    "cosmic horror comedy",
    "trolling/prank",
    "bureaucratic absurdity",
    "technological breakdown",
    "social faux pas escalation",
];

/// Theme used when a session somehow has none recorded.
pub const FALLBACK_THEME: &str = "chaotic";

/// The character, situation and theme a game opens with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSetup {
    pub character: String,
    pub situation: String,
    pub theme: String,
}

impl GameSetup {
    pub fn new(
        character: impl Into<String>,
        situation: impl Into<String>,
        theme: impl Into<String>,
    ) -> Self {
        Self {
            character: character.into(),
            situation: situation.into(),
            theme: theme.into(),
        }
    }

    /// Draw one entry from each ingredient list.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(
            pick(CHARACTER_ARCHETYPES, rng),
            pick(INITIAL_SITUATIONS, rng),
            pick(STORY_THEMES, rng),
        )
    }
}

fn pick<R: Rng + ?Sized>(options: &[&str], rng: &mut R) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

/// First call of a new game: a short hook ending at a decision.
pub fn story_hook_prompt(setup: &GameSetup) -> String {
    format!(
        "Theme: '{theme}'. Character: {character}. Situation: {situation}. \
         Write a 1-2 sentence story hook ending at a decision point.",
        theme = setup.theme,
        character = setup.character,
        situation = setup.situation,
    )
}

/// Second call of a new game: two choices, one secretly marked as the trigger.
pub fn opening_choices_prompt(story: &str) -> String {
    format!(
        "Here is a story: '{story}'. \
         Your task is to generate two distinct choices and pick one as the trigger. \
         You MUST reply ONLY with a valid JSON object in this exact format: \
         {{\"choice1\": \"Text for button 1\", \"choice2\": \"Text for button 2\", \"secret_trigger_is_choice\": 1}}"
    )
}

/// Mid-game continuation returning the next beat and two fresh choices.
pub fn story_beat_prompt(theme: &str) -> String {
    format!(
        "Based on the user's last choice and the story so far, continue the story. \
         Adhere to the '{theme}' theme. \
         You MUST reply ONLY with a valid JSON object in this exact format: \
         {{\"story\": \"New story part (1-2 sentences).\", \"choice1\": \"Text for button 1\", \"choice2\": \"Text for button 2\"}}"
    )
}

/// Final call of a game: a plain-text outcome with no further choices.
pub fn final_outcome_prompt(theme: &str) -> String {
    format!(
        "Based on the full history and keeping the '{theme}' theme, \
         reveal the final chaotic outcome in a single, punchy paragraph."
    )
}

/// How a submitted choice is recorded in the story log.
pub fn choice_log_entry(choice: &str) -> String {
    format!("The user chose: '{choice}'")
}
