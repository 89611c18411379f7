//! HTTP API server for integration with other front ends.
//!
//! Exposes chat sessions over REST: create a session, post messages to it and
//! read back its transcript for replay.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::HealthbotError;
use crate::orchestrator::AgentOrchestrator;
use crate::session::{clear_session, create_session, open_session, ChatSession};
use crate::transcript::{AssistantTurn, TranscriptEntry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    orchestrator: AgentOrchestrator,
    settings: Settings,
    /// Each session is locked for the whole of a turn.
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ChatSession>>>>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'healthbot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = AgentOrchestrator::new(&settings)?;

    let state = Arc::new(AppState {
        orchestrator,
        settings,
        sessions: RwLock::new(HashMap::new()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/sessions", post(new_session))
        .route(
            "/sessions/{id}/transcript",
            get(get_transcript).delete(delete_transcript),
        )
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/messages", post(post_message))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Healthbot API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("New session", "POST   /sessions");
    Output::kv("Transcript", "GET    /sessions/{id}/transcript");
    Output::kv("Send message", "POST   /sessions/{id}/messages");
    Output::kv("Clear session", "DELETE /sessions/{id}/transcript");
    Output::kv("End session", "DELETE /sessions/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct TranscriptResponse {
    session_id: Uuid,
    entries: Vec<TranscriptEntry>,
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

#[derive(Serialize)]
struct MessageResponse {
    session_id: Uuid,
    turn: AssistantTurn,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn new_session(State(state): State<Arc<AppState>>) -> Response {
    match create_session(&state.settings) {
        Ok(session) => {
            let response = SessionResponse {
                session_id: session.id(),
                created_at: session.created_at(),
            };
            state
                .sessions
                .write()
                .await
                .insert(session.id(), Arc::new(Mutex::new(session)));
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn get_transcript(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let session = match lookup_session(&state, &id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let session = session.lock().await;
    match session.transcript().await {
        Ok(entries) => Json(TranscriptResponse {
            session_id: session.id(),
            entries,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let text = req.text.trim();
    if text.is_empty() {
        return error_response(&HealthbotError::InvalidInput("Message text is empty".to_string()));
    }

    let session = match lookup_session(&state, &id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let mut session = session.lock().await;
    match state.orchestrator.submit_user_message(&mut session, text).await {
        Ok(turn) => Json(MessageResponse {
            session_id: session.id(),
            turn,
        })
        .into_response(),
        Err(e) => {
            warn!("Turn failed for session {}: {}", session.id(), e);
            error_response(&e)
        }
    }
}

async fn delete_transcript(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let session = match lookup_session(&state, &id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let mut session = session.lock().await;
    match clear_session(&mut session).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// Clear a session and stop tracking it.
async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let session = match lookup_session(&state, &id).await {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let uuid = {
        let mut session = session.lock().await;
        if let Err(e) = clear_session(&mut session).await {
            return error_response(&e);
        }
        session.id()
    };

    state.sessions.write().await.remove(&uuid);
    info!("Ended session {}", uuid);
    StatusCode::NO_CONTENT.into_response()
}

/// Find a live session, or reopen a stored one.
async fn lookup_session(
    state: &AppState,
    id: &str,
) -> crate::error::Result<Arc<Mutex<ChatSession>>> {
    let uuid = Uuid::parse_str(id)
        .map_err(|_| HealthbotError::SessionNotFound(id.to_string()))?;

    if let Some(session) = state.sessions.read().await.get(&uuid) {
        return Ok(session.clone());
    }

    let session = open_session(&state.settings, id)?;
    info!("Loaded stored session {}", uuid);

    let mut sessions = state.sessions.write().await;
    Ok(sessions
        .entry(uuid)
        .or_insert_with(|| Arc::new(Mutex::new(session)))
        .clone())
}

fn status_for(error: &HealthbotError) -> StatusCode {
    match error {
        HealthbotError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        HealthbotError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_model_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &HealthbotError) -> Response {
    (
        status_for(error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TurnAgent;
    use crate::testing::ScriptedModel;

    fn app_state() -> Arc<AppState> {
        let primary = TurnAgent::new("primary", Arc::new(ScriptedModel::new(vec![])));
        Arc::new(AppState {
            orchestrator: AgentOrchestrator::with_agents(primary, None),
            settings: Settings::default(),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    #[tokio::test]
    async fn test_delete_session_releases_it() {
        let state = app_state();

        let created = new_session(State(state.clone())).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = *state.sessions.read().await.keys().next().unwrap();

        let deleted = delete_session(State(state.clone()), Path(id.to_string())).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        assert!(state.sessions.read().await.is_empty());

        let again = delete_session(State(state.clone()), Path(id.to_string())).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_unknown_session() {
        let state = app_state();
        let response = delete_session(State(state), Path("not-a-uuid".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&HealthbotError::SessionNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&HealthbotError::InvalidInput("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&HealthbotError::Model("timeout".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&HealthbotError::MalformedToolCall {
                tool: "web_search".into(),
                reason: "empty query".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&HealthbotError::Transcript("lock".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
