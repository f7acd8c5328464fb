//! Exhibition builder endpoints
//!
//! POST /sessions/:id/curator-mode, GET /sessions/:id/exhibition,
//! POST /sessions/:id/exhibition/{select,choose,finalize}

use std::collections::HashMap;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::extract::{ApiJson, SessionId};
use super::session_handle;
use crate::error::ApiResult;
use crate::models::{BuildStage, CuratedExhibition, CuratorMode, DescriptionLabel};
use crate::services::{append_exhibition_summary, LogReport};
use crate::workflow::{self, FlowError, PickOption, SelectableArtwork};
use crate::AppState;

/// POST /sessions/:id/curator-mode request
#[derive(Debug, Deserialize)]
pub struct CuratorModeRequest {
    pub choice: CuratorMode,
}

#[derive(Debug, Serialize)]
pub struct CuratorModeResponse {
    pub curator_mode: CuratorMode,
    pub stage: BuildStage,
}

/// POST /sessions/:id/exhibition/select request
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub artwork_ids: Vec<String>,
}

/// POST /sessions/:id/exhibition/choose request
#[derive(Debug, Deserialize)]
pub struct ChooseRequest {
    pub artwork_id: String,
    pub label: DescriptionLabel,
}

/// Chosen label only; sources stay hidden until finalize
#[derive(Debug, Serialize)]
pub struct ChooseResponse {
    pub artwork_id: String,
    pub chosen: DescriptionLabel,
}

/// POST /sessions/:id/exhibition/finalize request
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub choices: HashMap<String, DescriptionLabel>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub exhibition: CuratedExhibition,
    pub log: LogReport,
}

/// GET /sessions/:id/exhibition response, shaped by builder stage
#[derive(Debug, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ExhibitionView {
    SelectArtworks {
        artworks: Vec<SelectableArtwork>,
    },
    PickDescriptions {
        selected_ids: Vec<String>,
        options: Vec<PickOption>,
    },
    Finalized {
        exhibition: CuratedExhibition,
    },
}

/// POST /sessions/:id/curator-mode
pub async fn set_curator_mode(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    ApiJson(request): ApiJson<CuratorModeRequest>,
) -> ApiResult<Json<CuratorModeResponse>> {
    let handle = session_handle(&state, session_id).await?;
    let mut session = handle.lock().await;

    workflow::set_curator_mode(&mut session, request.choice)?;
    Ok(Json(CuratorModeResponse {
        curator_mode: session.curator_mode(),
        stage: session.stage(),
    }))
}

/// GET /sessions/:id/exhibition
pub async fn get_exhibition(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<Json<ExhibitionView>> {
    let handle = session_handle(&state, session_id).await?;
    let mut session = handle.lock().await;

    if !session.is_complete() {
        return Err(FlowError::ViewingInProgress.into());
    }
    if session.curator_mode() == CuratorMode::Skip {
        return Err(FlowError::CuratorModeSkipped.into());
    }

    let view = match session.stage() {
        BuildStage::SelectArtworks => ExhibitionView::SelectArtworks {
            artworks: workflow::viewed_artworks(&session, &state.catalog),
        },
        BuildStage::PickDescriptions => {
            let options = workflow::pick_options(&mut session, &state.catalog)?;
            ExhibitionView::PickDescriptions {
                selected_ids: session.selected_ids().to_vec(),
                options,
            }
        }
        BuildStage::Finalized => ExhibitionView::Finalized {
            exhibition: session
                .exhibition()
                .cloned()
                .ok_or(FlowError::NotFinalized)?,
        },
    };
    Ok(Json(view))
}

/// POST /sessions/:id/exhibition/select
///
/// Confirms the selection and returns the labeled description pairs.
pub async fn select_artworks(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    ApiJson(request): ApiJson<SelectRequest>,
) -> ApiResult<Json<ExhibitionView>> {
    let handle = session_handle(&state, session_id).await?;
    let mut session = handle.lock().await;

    workflow::select_artworks(&mut session, &request.artwork_ids)?;
    let options = workflow::pick_options(&mut session, &state.catalog)?;

    tracing::info!(
        session_id = %session_id,
        selected = session.selected_ids().len(),
        "Exhibition artworks selected"
    );

    Ok(Json(ExhibitionView::PickDescriptions {
        selected_ids: session.selected_ids().to_vec(),
        options,
    }))
}

/// POST /sessions/:id/exhibition/choose
pub async fn choose_description(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    ApiJson(request): ApiJson<ChooseRequest>,
) -> ApiResult<Json<ChooseResponse>> {
    let handle = session_handle(&state, session_id).await?;
    let mut session = handle.lock().await;

    let preference = workflow::choose_description(
        &mut session,
        &state.catalog,
        &request.artwork_id,
        request.label,
    )?;
    Ok(Json(ChooseResponse {
        artwork_id: request.artwork_id,
        chosen: preference.chosen,
    }))
}

/// POST /sessions/:id/exhibition/finalize
///
/// Stores the exhibition, then appends its summary row to the external log.
/// A failed append is reported in `log` and does not undo the finalize.
pub async fn finalize_exhibition(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    ApiJson(request): ApiJson<FinalizeRequest>,
) -> ApiResult<Json<FinalizeResponse>> {
    let handle = session_handle(&state, session_id).await?;

    let exhibition = {
        let mut session = handle.lock().await;
        workflow::finalize(
            &mut session,
            &state.catalog,
            &request.title,
            &request.description,
            &request.choices,
            state.clock.now(),
        )?
    };

    let log = append_exhibition_summary(
        state.external_log.as_ref(),
        session_id,
        &exhibition,
        state.clock.now(),
    )
    .await;

    Ok(Json(FinalizeResponse { exhibition, log }))
}

/// Build exhibition builder routes
pub fn exhibition_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:id/curator-mode", post(set_curator_mode))
        .route("/sessions/:id/exhibition", get(get_exhibition))
        .route("/sessions/:id/exhibition/select", post(select_artworks))
        .route("/sessions/:id/exhibition/choose", post(choose_description))
        .route("/sessions/:id/exhibition/finalize", post(finalize_exhibition))
}
