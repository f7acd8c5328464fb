//! dmx-survey library interface
//!
//! Exposes the session workflow, exporters and router for integration testing

pub mod api;
pub mod error;
pub mod export;
pub mod models;
pub mod registry;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use dmx_common::time::Clock;
use dmx_common::Catalog;

use crate::registry::SessionRegistry;
use crate::services::{ExternalLog, ImageFetcher};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only artwork catalog
    pub catalog: Arc<Catalog>,
    /// Live participant sessions
    pub sessions: Arc<SessionRegistry>,
    pub clock: Arc<dyn Clock>,
    /// Durable spreadsheet log (best-effort)
    pub external_log: Arc<dyn ExternalLog>,
    /// Artwork image source for the exhibition card
    pub image_fetcher: Arc<dyn ImageFetcher>,
    /// Post-survey questionnaire link shown in the debrief
    pub survey_url: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        catalog: Catalog,
        sessions: SessionRegistry,
        clock: Arc<dyn Clock>,
        external_log: Arc<dyn ExternalLog>,
        image_fetcher: Arc<dyn ImageFetcher>,
        survey_url: impl Into<String>,
    ) -> Self {
        let startup_time = clock.now();
        Self {
            catalog: Arc::new(catalog),
            sessions: Arc::new(sessions),
            clock,
            external_log,
            image_fetcher,
            survey_url: survey_url.into(),
            startup_time,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::session_routes())
        .merge(api::viewing_routes())
        .merge(api::exhibition_routes())
        .merge(api::export_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
