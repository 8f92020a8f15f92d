//! HTTP routes.
//!
//! Sessions live server-side; the browser only carries an opaque id in
//! the `chaos_session` cookie.

use crate::config::ServerConfig;
use crate::templates::{IndexPage, Templates};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chaos_core::{
    GameMaster, GeminiStoryteller, InMemorySessionStore, SessionId, SessionStore, TurnOutcome,
};
use gemini::Gemini;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const SESSION_COOKIE: &str = "chaos_session";

/// Narrative returned when a request arrives without a running game.
pub const NO_GAME_NARRATIVE: &str =
    "No story is in progress. Refresh the page to start a new one.";

/// Errors from assembling [`AppState`].
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to build Gemini client: {0}")]
    Client(#[from] gemini::Error),

    #[error("failed to load templates: {0}")]
    Templates(#[from] minijinja::Error),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub master: Arc<GameMaster>,
    pub sessions: Arc<dyn SessionStore>,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Build production state: Gemini storyteller and in-memory sessions.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StateError> {
        let client = Gemini::new(config.api_key.clone())?.with_model(config.model.clone());
        let storyteller = GeminiStoryteller::new(client).with_config(config.storyteller_config());

        Ok(Self {
            master: Arc::new(GameMaster::new(Arc::new(storyteller))),
            sessions: Arc::new(
                InMemorySessionStore::new(config.session_ttl)
                    .with_max_sessions(config.max_sessions),
            ),
            templates: Arc::new(Templates::new()?),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/generate", post(generate))
        .route("/guess", post(guess))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    pub choice: String,
}

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    pub guess: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateResponse {
    pub next_part: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice2: Option<String>,
    pub game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_choices: Option<Vec<String>>,
}

impl From<TurnOutcome> for GenerateResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let (choice1, choice2) = match outcome.choices {
            Some((c1, c2)) => (Some(c1), Some(c2)),
            None => (None, None),
        };
        Self {
            next_part: outcome.next_part,
            choice1,
            choice2,
            game_over: outcome.game_over,
            user_choices: outcome.user_choices,
        }
    }
}

impl GenerateResponse {
    fn no_game() -> Self {
        Self {
            next_part: NO_GAME_NARRATIVE.to_string(),
            choice1: None,
            choice2: None,
            game_over: true,
            user_choices: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessResponse {
    pub result_text: String,
    pub score: u32,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": "chaos-server"}))
}

/// Start a new game under a freshly minted session id.
///
/// Any session the request's cookie pointed at is discarded.
pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(previous) = session_id_from(&jar) {
        state.sessions.clear(previous).await;
    }
    let id = SessionId::new();

    let purged = state.sessions.purge_expired().await;
    if purged > 0 {
        info!(purged, "purged expired sessions");
    }

    let page = match state.master.start_game().await {
        Ok((session, opening)) => {
            state.sessions.set(id, session).await;
            info!(session = %id, "new game started");
            IndexPage {
                initial_story: opening.story,
                choice1: opening.choice1,
                choice2: opening.choice2,
                score: opening.score,
                ready: true,
            }
        }
        Err(e) => {
            warn!(session = %id, kind = e.kind(), error = %e, "error starting new game");
            IndexPage::start_failure()
        }
    };

    match state.templates.render_index(&page) {
        Ok(html) => (jar.add(session_cookie(id)), Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render index page");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
        }
    }
}

/// Submit a choice and get the next story beat or the ending.
pub async fn generate(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ChoiceRequest>,
) -> Json<GenerateResponse> {
    let Some(id) = session_id_from(&jar) else {
        return Json(GenerateResponse::no_game());
    };
    let Some(mut session) = state.sessions.get(id).await else {
        info!(session = %id, "choice submitted without an active game");
        return Json(GenerateResponse::no_game());
    };

    let outcome = state.master.advance(&mut session, &request.choice).await;
    state.sessions.set(id, session).await;

    Json(outcome.into())
}

/// Guess which opening choice was the secret trigger.
pub async fn guess(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<GuessRequest>,
) -> Json<GuessResponse> {
    let session = match session_id_from(&jar) {
        Some(id) => state.sessions.get(id).await.map(|s| (id, s)),
        None => None,
    };

    let Some((id, mut session)) = session else {
        return Json(GuessResponse {
            result_text: NO_GAME_NARRATIVE.to_string(),
            score: 0,
        });
    };

    let outcome = state.master.guess(&mut session, &request.guess);
    state.sessions.set(id, session).await;

    Json(GuessResponse {
        result_text: outcome.result_text,
        score: outcome.score,
    })
}

/// Find our session id among the request's cookies.
pub fn session_id_from(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

fn session_cookie(id: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
