//! Viewing flow controller
//!
//! Walks the sampled sequence, one artwork per cursor position, and measures
//! dwell time between first display and advance.

use serde::Serialize;
use tracing::{debug, info, warn};

use dmx_common::time::{elapsed_seconds, Clock};
use dmx_common::{ArtworkRecord, Catalog};

use super::FlowError;
use crate::models::{DescriptionSource, SessionState, ViewEvent, ViewingState};

/// Placeholder shown when an artwork lacks the requested description
pub const NO_DESCRIPTION: &str = "No description available for this artwork.";

/// Artwork as presented to the participant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtworkView {
    pub artwork_id: String,
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub description: String,
    /// 1-based position in the sequence
    pub position: usize,
    pub total: usize,
}

/// Result of a successful advance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvanceOutcome {
    pub event: ViewEvent,
    pub state: ViewingState,
}

/// Description text for a source, or the placeholder when absent or blank
pub fn description_for(record: &ArtworkRecord, source: DescriptionSource) -> String {
    let text = match source {
        DescriptionSource::Curator => record.curator_description.as_deref(),
        DescriptionSource::Ai => record.ai_description.as_deref(),
    };
    match text {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => NO_DESCRIPTION.to_string(),
    }
}

fn current_record<'a>(
    state: &SessionState,
    catalog: &'a Catalog,
) -> Option<&'a ArtworkRecord> {
    state.current_index().and_then(|i| catalog.get(i))
}

/// Display the artwork at the cursor
///
/// Records the start time on first display only; repeated calls for the same
/// position are idempotent. Returns `None` once viewing is complete.
pub fn present(
    state: &mut SessionState,
    catalog: &Catalog,
    clock: &dyn Clock,
) -> Option<ArtworkView> {
    let record = current_record(state, catalog)?;

    if !state.start_times.contains_key(&record.id) {
        state
            .start_times
            .insert(record.id.clone(), clock.monotonic());
        debug!(
            session_id = %state.session_id,
            artwork_id = %record.id,
            position = state.cursor,
            "Recorded artwork start time"
        );
    }

    Some(ArtworkView {
        artwork_id: record.id.clone(),
        title: record.title.clone(),
        artist: record.artist_or_unknown().to_string(),
        image_url: record.image_url.clone(),
        description: description_for(record, state.group.description_source()),
        position: state.cursor + 1,
        total: state.sequence.len(),
    })
}

/// Advance past the current artwork
///
/// `requested` is the artwork id the participant was looking at; when given
/// it must match the cursor. Appends exactly one [`ViewEvent`].
pub fn advance(
    state: &mut SessionState,
    catalog: &Catalog,
    clock: &dyn Clock,
    requested: Option<&str>,
) -> Result<AdvanceOutcome, FlowError> {
    let record = current_record(state, catalog).ok_or(FlowError::ViewingComplete)?;

    if let Some(requested) = requested {
        if requested != record.id {
            return Err(FlowError::ArtworkMismatch {
                requested: requested.to_string(),
                current: record.id.clone(),
            });
        }
    }

    let now = clock.monotonic();
    let start = match state.start_times.get(&record.id).copied() {
        Some(start) => start,
        None => {
            warn!(
                session_id = %state.session_id,
                artwork_id = %record.id,
                "Advance before display; recording zero dwell time"
            );
            state.start_times.insert(record.id.clone(), now);
            now
        }
    };

    let event = ViewEvent {
        timestamp: clock.now(),
        session_id: state.session_id,
        artwork_id: record.id.clone(),
        title: record.title.clone(),
        time_spent_seconds: elapsed_seconds(start, now),
        group: state.group,
    };

    state.events.push(event.clone());
    state.cursor += 1;

    let viewing_state = state.viewing_state();
    if viewing_state == ViewingState::Complete {
        info!(
            session_id = %state.session_id,
            events = state.events.len(),
            group = %state.group,
            "Viewing session complete"
        );
    }

    Ok(AdvanceOutcome {
        event,
        state: viewing_state,
    })
}
