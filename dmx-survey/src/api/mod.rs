//! HTTP API handlers for dmx-survey
//!
//! Every handler locks exactly one session. Calls to external services run
//! after the lock is released.

pub mod exhibition;
pub mod export;
pub mod extract;
pub mod health;
pub mod sessions;
pub mod viewing;

pub use exhibition::exhibition_routes;
pub use export::export_routes;
pub use health::health_routes;
pub use sessions::session_routes;
pub use viewing::viewing_routes;

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::registry::SessionHandle;
use crate::AppState;

/// Look up a live session or fail with 404
pub(crate) async fn session_handle(state: &AppState, session_id: Uuid) -> ApiResult<SessionHandle> {
    state
        .sessions
        .get(&session_id, state.clock.as_ref())
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))
}
