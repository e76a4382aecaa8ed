use super::state::AppState;
use crate::session::{SessionSnapshot, UserAction};
use crate::waitlist::WaitlistError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinWaitlistRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinWaitlistResponse {
    pub email: String,
    pub status: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /demo
/// Current session snapshot
pub async fn get_demo(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

async fn run_action(state: &AppState, action: UserAction) -> Response {
    info!("Demo action: {}", action);

    match state.session.dispatch(action).await {
        Ok(Ok(snapshot)) => (StatusCode::OK, Json(snapshot)).into_response(),
        Ok(Err(rejected)) => error_response(StatusCode::CONFLICT, rejected.to_string()),
        Err(e) => {
            error!("Failed to dispatch {}: {:#}", action, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}: {}", action, e),
            )
        }
    }
}

/// POST /demo/start
pub async fn start_demo(State(state): State<AppState>) -> Response {
    run_action(&state, UserAction::StartDemo).await
}

/// POST /demo/confirm
pub async fn confirm_call(State(state): State<AppState>) -> Response {
    run_action(&state, UserAction::Confirm).await
}

/// POST /demo/cancel
pub async fn cancel_call(State(state): State<AppState>) -> Response {
    run_action(&state, UserAction::Cancel).await
}

/// POST /demo/mute
pub async fn toggle_mute(State(state): State<AppState>) -> Response {
    run_action(&state, UserAction::ToggleMute).await
}

/// POST /demo/end
pub async fn end_call(State(state): State<AppState>) -> Response {
    run_action(&state, UserAction::EndCall).await
}

/// POST /demo/reset
pub async fn reset_demo(State(state): State<AppState>) -> Response {
    run_action(&state, UserAction::Reset).await
}

/// POST /waitlist
/// Add an email to the waitlist
pub async fn join_waitlist(
    State(state): State<AppState>,
    Json(req): Json<JoinWaitlistRequest>,
) -> Response {
    match state.waitlist.insert(&req.email).await {
        Ok(email) => (
            StatusCode::CREATED,
            Json(JoinWaitlistResponse {
                email,
                status: "joined".to_string(),
            }),
        )
            .into_response(),
        Err(WaitlistError::Duplicate) => {
            error_response(StatusCode::CONFLICT, WaitlistError::Duplicate.to_string())
        }
        Err(WaitlistError::InvalidEmail) => {
            error_response(StatusCode::BAD_REQUEST, WaitlistError::InvalidEmail.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
