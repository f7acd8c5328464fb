//! Download endpoints for the view log, exhibition summary and card

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use super::extract::SessionId;
use super::session_handle;
use crate::error::ApiResult;
use crate::export::{card_artworks, render_card, summary_csv, view_log_csv};
use crate::workflow::FlowError;
use crate::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const PDF_CONTENT_TYPE: &str = "application/pdf";

fn attachment(content_type: &str, filename: String, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}

/// GET /sessions/:id/export/views.csv
pub async fn export_views(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<impl IntoResponse> {
    let handle = session_handle(&state, session_id).await?;
    let events = handle.lock().await.events().to_vec();

    let body = view_log_csv(&events)?;
    Ok(attachment(
        CSV_CONTENT_TYPE,
        format!("viewing_log_{}.csv", session_id),
        body,
    ))
}

/// GET /sessions/:id/export/summary.csv
pub async fn export_summary(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<impl IntoResponse> {
    let handle = session_handle(&state, session_id).await?;
    let exhibition = handle
        .lock()
        .await
        .exhibition()
        .cloned()
        .ok_or(FlowError::NotFinalized)?;

    let body = summary_csv(&exhibition)?;
    Ok(attachment(
        CSV_CONTENT_TYPE,
        format!("exhibition_summary_{}.csv", session_id),
        body,
    ))
}

/// GET /sessions/:id/export/card.pdf
///
/// Images are fetched after the session lock is released.
pub async fn export_card(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> ApiResult<impl IntoResponse> {
    let handle = session_handle(&state, session_id).await?;
    let exhibition = handle
        .lock()
        .await
        .exhibition()
        .cloned()
        .ok_or(FlowError::NotFinalized)?;

    let artworks = card_artworks(&exhibition, &state.catalog)?;
    let body = render_card(&exhibition, &artworks, state.image_fetcher.as_ref()).await?;

    tracing::info!(
        session_id = %session_id,
        pages = artworks.len() + 1,
        bytes = body.len(),
        "Exhibition card rendered"
    );

    Ok(attachment(
        PDF_CONTENT_TYPE,
        format!("exhibition_card_{}.pdf", session_id),
        body,
    ))
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:id/export/views.csv", get(export_views))
        .route("/sessions/:id/export/summary.csv", get(export_summary))
        .route("/sessions/:id/export/card.pdf", get(export_card))
}
