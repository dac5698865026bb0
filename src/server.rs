use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::{debug, info, warn};

use crate::AppState;
use crate::api::{HttpBackend, PandasAiApi, RetryingApi, is_valid_conversation_id};
use crate::chat::{ChatMessage, FollowUpQuestion, OlderPage, PendingTurn, SendRejected};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::rate_limit_middleware;
use crate::session::Session;
use crate::ui::fragments;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "backend.config.loaded",
        base_url = %config.backend.base_url,
        api_key_set = config.backend.api_key.is_some(),
        page_size = config.backend.history_page_size,
        max_attempts = config.retry.max_attempts,
        "Backend configuration loaded"
    );

    let backend = HttpBackend::new(
        &config.backend.base_url,
        config.backend.api_key.clone(),
        config.backend.request_timeout(),
    )?;
    let api: Arc<dyn PandasAiApi> = Arc::new(RetryingApi::new(backend, config.retry.policy()));

    let state = AppState::new(Arc::clone(&config), api);
    let _sweeper = state
        .chat
        .spawn_sweeper(config.session.idle_timeout(), config.session.sweep_interval());

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(name: "server.signal.failed", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Build the router with every browser-facing route and middleware.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // A very long timeout stands in for "disabled" so the layer stack keeps
    // one type.
    let timeout_duration = config
        .request_timeout()
        .unwrap_or(Duration::from_secs(365 * 24 * 60 * 60));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/chat/{sid}/screen", get(chat_screen))
        .route("/chat/{sid}/messages", post(chat_submit))
        .route("/chat/{sid}/follow-ups/{follow_up_id}", post(chat_follow_up))
        .route("/chat/{sid}/turns/{turn}", get(chat_turn))
        .route("/chat/{sid}/history", get(chat_history))
        .route("/chat/{sid}/new", post(chat_new))
        .route(
            "/api/sessions/{sid}",
            get(api_get_session).delete(api_delete_session),
        )
        .nest_service("/static", ServeDir::new(&config.server.static_dir))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn find_session(state: &AppState, sid: &str) -> Result<Session, AppError> {
    state
        .chat
        .session(sid)
        .ok_or_else(|| AppError::SessionNotFound(sid.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IndexParams {
    #[serde(default)]
    conversation_id: Option<String>,
}

/// GET / - New session, full page.
async fn index(State(state): State<AppState>, Query(params): Query<IndexParams>) -> Html<String> {
    let conversation_id = params
        .conversation_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .filter(|id| {
            let valid = is_valid_conversation_id(id);
            if !valid {
                warn!(
                    name: "http.conversation_id.rejected",
                    length = id.len(),
                    "Ignoring malformed conversation id"
                );
            }
            valid
        });
    let session = state.chat.open(conversation_id);
    let shell = fragments::shell(&state.config.ui.title, &session);
    Html(fragments::page(&state.config.ui, &shell))
}

/// GET /chat/{sid}/screen - Run the initial history load, return the screen.
async fn chat_screen(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Html<String>, AppError> {
    let session = find_session(&state, &sid)?;
    let model = state.chat.load_initial(&session).await;
    Ok(Html(fragments::screen(&sid, model)))
}

#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    query: String,
}

/// POST /chat/{sid}/messages - Submit a typed query.
async fn chat_submit(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Form(form): Form<SubmitForm>,
) -> Result<Response, AppError> {
    let session = find_session(&state, &sid)?;
    let accepted = state.chat.submit(&session, &form.query);
    Ok(turn_response(&session, accepted))
}

/// POST /chat/{sid}/follow-ups/{id} - Send a follow-up chip.
async fn chat_follow_up(
    State(state): State<AppState>,
    Path((sid, follow_up_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let session = find_session(&state, &sid)?;
    let accepted = state.chat.select_follow_up(&session, &follow_up_id);
    Ok(turn_response(&session, accepted))
}

/// Accepted sends append the user and typing bubbles; rejected ones change
/// nothing.
fn turn_response(session: &Session, accepted: Result<PendingTurn, SendRejected>) -> Response {
    match accepted {
        Ok(pending) => {
            let query = session.read(|s| s.message(&pending.query_id).cloned());
            Html(fragments::accepted_turn(session.id(), query, pending.turn)).into_response()
        }
        Err(reason) => {
            debug!(name: "http.send.ignored", session_id = %session.id(), reason = ?reason, "Send ignored");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

/// GET /chat/{sid}/turns/{turn} - Wait for a turn, return its AI bubble.
async fn chat_turn(
    State(state): State<AppState>,
    Path((sid, turn)): Path<(String, u64)>,
) -> Result<Html<String>, AppError> {
    let session = find_session(&state, &sid)?;
    let outcome = state
        .chat
        .await_turn(&session, turn)
        .await
        .ok_or(AppError::UnknownTurn {
            session: sid.clone(),
            turn,
        })?;
    let sending = session.read(|s| s.is_typing());
    Ok(Html(fragments::finished_turn(&sid, outcome, sending)))
}

/// GET /chat/{sid}/history - Fetch the next older page.
async fn chat_history(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Response, AppError> {
    let session = find_session(&state, &sid)?;
    Ok(match state.chat.load_older(&session).await {
        OlderPage::Page { messages, top } => {
            Html(fragments::older_page(&sid, messages, top)).into_response()
        }
        // Another request is fetching; the loading slot asks again shortly.
        OlderPage::Unavailable => {
            Html(session.read(|s| fragments::top_slot(&sid, s))).into_response()
        }
    })
}

/// POST /chat/{sid}/new - Start a new conversation in a fresh session.
async fn chat_new(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Html<String>, AppError> {
    let session = find_session(&state, &sid)?;
    let fresh = state.chat.start_new_conversation(&session);
    Ok(Html(fragments::shell(&state.config.ui.title, &fresh)))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
}

/// GET /health - Liveness.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.chat.sessions().len(),
    })
}

/// Session state as JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub conversation_id: Option<String>,
    pub is_typing: bool,
    pub is_loading: bool,
    pub is_scroll_loading: bool,
    pub has_more: bool,
    pub messages: Vec<ChatMessage>,
    pub follow_ups: Vec<FollowUpQuestion>,
    pub created_at: DateTime<Utc>,
    pub age_secs: u64,
}

/// GET /api/sessions/{sid} - Snapshot of the session state.
async fn api_get_session(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, &sid)?;
    let age = session.age();
    let snapshot = session.read(|s| SessionSnapshot {
        id: sid.clone(),
        conversation_id: s.conversation_id().map(str::to_owned),
        is_typing: s.is_typing(),
        is_loading: s.is_loading(),
        is_scroll_loading: s.is_scroll_loading(),
        has_more: s.has_more(),
        messages: s.messages().to_vec(),
        follow_ups: s.follow_ups().to_vec(),
        created_at: session.created_at(),
        age_secs: age.as_secs(),
    });
    Ok(Json(snapshot))
}

/// DELETE /api/sessions/{sid} - Discard a session.
async fn api_delete_session(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .chat
        .sessions()
        .remove(&sid)
        .ok_or_else(|| AppError::SessionNotFound(sid.clone()))?;
    info!(name: "chat.session.deleted", session_id = %sid, "Chat session deleted");
    Ok(StatusCode::NO_CONTENT)
}
