//! Viewing flow endpoints
//!
//! GET /sessions/:id/current, POST /sessions/:id/advance,
//! GET /sessions/:id/debrief

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{OptionalJson, SessionId};
use super::session_handle;
use crate::error::ApiResult;
use crate::models::{CuratorMode, Group, SessionState, ViewEvent, ViewingState};
use crate::services::{append_view_log, LogReport};
use crate::workflow::{self, ArtworkView, FlowError};
use crate::AppState;

/// POST /sessions/:id/advance request
#[derive(Debug, Default, Deserialize)]
pub struct AdvanceRequest {
    /// Artwork the participant was looking at; must match the cursor
    #[serde(default)]
    pub artwork_id: Option<String>,
}

/// POST /sessions/:id/advance response
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub event: ViewEvent,
    pub state: ViewingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<ArtworkView>,
    /// Outcome of the external log write made on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogReport>,
}

/// GET /sessions/:id/debrief response
#[derive(Debug, Serialize)]
pub struct DebriefResponse {
    pub session_id: Uuid,
    pub group: Group,
    pub events: Vec<ViewEvent>,
    pub survey_url: String,
    pub curator_mode: CuratorMode,
    pub views_logged: bool,
}

/// GET /sessions/:id/current response
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CurrentResponse {
    Viewing { artwork: ArtworkView },
    Complete { debrief: DebriefResponse },
}

fn debrief(session: &SessionState, survey_url: &str) -> DebriefResponse {
    DebriefResponse {
        session_id: session.session_id(),
        group: session.group(),
        events: session.events().to_vec(),
        survey_url: survey_url.to_string(),
        curator_mode: session.curator_mode(),
        views_logged: session.views_logged(),
    }
}

/// GET /sessions/:id/current
///
/// Presents the artwork at the cursor, starting its dwell timer on first
/// display. Once every artwork is viewed, returns the debrief instead.
pub async fn current_artwork(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<Json<CurrentResponse>> {
    let handle = session_handle(&state, session_id).await?;
    let mut session = handle.lock().await;

    let response = match workflow::present(&mut session, &state.catalog, state.clock.as_ref()) {
        Some(artwork) => CurrentResponse::Viewing { artwork },
        None => CurrentResponse::Complete {
            debrief: debrief(&session, &state.survey_url),
        },
    };
    Ok(Json(response))
}

/// POST /sessions/:id/advance
///
/// Records the dwell-time event for the current artwork. The advance that
/// completes viewing also writes the event log to the external log, once.
pub async fn advance(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    OptionalJson(request): OptionalJson<AdvanceRequest>,
) -> ApiResult<Json<AdvanceResponse>> {
    let handle = session_handle(&state, session_id).await?;

    let (outcome, next, pending_log) = {
        let mut session = handle.lock().await;
        let outcome = workflow::advance(
            &mut session,
            &state.catalog,
            state.clock.as_ref(),
            request.artwork_id.as_deref(),
        )?;
        let next = workflow::present(&mut session, &state.catalog, state.clock.as_ref());
        let pending_log = (outcome.state == ViewingState::Complete && !session.views_logged())
            .then(|| session.events().to_vec());
        (outcome, next, pending_log)
    };

    let log = match pending_log {
        Some(events) => {
            let report = append_view_log(state.external_log.as_ref(), session_id, &events).await;
            if report.saved {
                handle.lock().await.mark_views_logged();
            }
            Some(report)
        }
        None => None,
    };

    Ok(Json(AdvanceResponse {
        event: outcome.event,
        state: outcome.state,
        next,
        log,
    }))
}

/// GET /sessions/:id/debrief
pub async fn get_debrief(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<Json<DebriefResponse>> {
    let handle = session_handle(&state, session_id).await?;
    let session = handle.lock().await;

    if !session.is_complete() {
        return Err(FlowError::ViewingInProgress.into());
    }
    Ok(Json(debrief(&session, &state.survey_url)))
}

/// Build viewing routes
pub fn viewing_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:id/current", get(current_artwork))
        .route("/sessions/:id/advance", post(advance))
        .route("/sessions/:id/debrief", get(get_debrief))
}
