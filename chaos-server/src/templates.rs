//! HTML page rendering.

use minijinja::Environment;
use serde::Serialize;

const INDEX_TEMPLATE: &str = "index.html";

/// Text shown when a new game could not be set up.
pub const START_FAILURE_STORY: &str = "The AI is being stubborn! It didn't provide a valid story start. Please refresh the page to try again.";

/// Context for the game page.
#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    pub initial_story: String,
    pub choice1: String,
    pub choice2: String,
    pub score: u32,
    /// False when the page shows the start-failure fallback.
    pub ready: bool,
}

impl IndexPage {
    pub fn start_failure() -> Self {
        Self {
            initial_story: START_FAILURE_STORY.to_string(),
            choice1: "Refresh".to_string(),
            choice2: "to Restart".to_string(),
            score: 0,
            ready: false,
        }
    }
}

/// Compiled page templates.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
        Ok(Self { env })
    }

    pub fn render_index(&self, page: &IndexPage) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX_TEMPLATE)?.render(page)
    }
}
