//! Web front end for the Chaos Engine.
//!
//! Serves the game page and the JSON endpoints the page talks to:
//! - `GET /` starts a new game
//! - `POST /generate` submits a choice
//! - `POST /guess` guesses the secret trigger choice

pub mod config;
pub mod routes;
pub mod templates;

pub use config::{ConfigError, ServerConfig};
pub use routes::{build_router, AppState, StateError};
