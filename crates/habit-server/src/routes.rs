use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use habit_core::Router;
use habit_types::events::{Action, Payload};

use crate::render::{label_to_token, render};

/// Shared application state for all route handlers.
pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub router: Router,
}

pub fn app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route("/updates", post(handle_update))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

/// Menu buttons come back as their label text; treat them as tokens.
fn normalize(mut action: Action) -> Action {
    if let Payload::Text(text) = &action.payload {
        if let Some(token) = label_to_token(text) {
            action.payload = Payload::Token(token.to_string());
        }
    }
    action
}

pub async fn handle_update(
    State(state): State<AppState>,
    Json(action): Json<Action>,
) -> Result<impl IntoResponse, StatusCode> {
    let action = normalize(action);
    let user_id = action.user_id;

    // Store access is blocking; keep it off the async runtime
    let app = state.clone();
    let reply = tokio::task::spawn_blocking(move || app.router.dispatch(&action))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!("Handled update from {}", user_id);
    Ok(Json(render(&reply)))
}
