//! Session lifecycle: POST /sessions, GET /sessions/:id

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::extract::SessionId;
use super::session_handle;
use crate::error::ApiResult;
use crate::models::{BuildStage, CuratorMode, Group, ViewingState};
use crate::AppState;

/// POST /sessions response
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub group: Group,
    pub total: usize,
}

/// GET /sessions/:id response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub group: Group,
    /// Artworks already advanced past
    pub position: usize,
    pub total: usize,
    pub state: ViewingState,
    pub stage: BuildStage,
    pub curator_mode: CuratorMode,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// POST /sessions
///
/// Samples the viewing sequence and assigns the experimental group.
pub async fn create_session(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<CreateSessionResponse>)> {
    let (session_id, handle) = state
        .sessions
        .create(state.catalog.len(), state.clock.as_ref())
        .await?;
    let session = handle.lock().await;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            group: session.group(),
            total: session.total(),
        }),
    ))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<Json<SessionStatusResponse>> {
    let handle = session_handle(&state, session_id).await?;
    let session = handle.lock().await;

    Ok(Json(SessionStatusResponse {
        session_id,
        group: session.group(),
        position: session.position(),
        total: session.total(),
        state: session.viewing_state(),
        stage: session.stage(),
        curator_mode: session.curator_mode(),
        created_at: session.created_at(),
    }))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
}
