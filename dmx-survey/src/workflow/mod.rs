//! Session workflow: viewing flow and exhibition builder
//!
//! Transitions take the current [`SessionState`](crate::models::SessionState)
//! by `&mut` together with the action payload. A transition that returns
//! `Err` leaves the state exactly as it found it.
//!
//! ```text
//! viewing ──advance──▶ viewing | complete
//!                                 │
//!            select_artworks ◀────┘ (curator mode build)
//!                 │ select
//!                 ▼
//!          pick_descriptions ──finalize──▶ finalized
//! ```

pub mod builder;
pub mod viewing;

use thiserror::Error;

pub use builder::{
    choose_description, finalize, pick_options, select_artworks, set_curator_mode,
    viewed_artworks, PickOption, SelectableArtwork,
};
pub use viewing::{advance, description_for, present, AdvanceOutcome, ArtworkView, NO_DESCRIPTION};

/// Rejected workflow action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("All artworks have already been viewed")]
    ViewingComplete,

    #[error("Viewing session is still in progress")]
    ViewingInProgress,

    #[error("Advance was for artwork {requested}, but the current artwork is {current}")]
    ArtworkMismatch { requested: String, current: String },

    #[error("Curator mode was skipped for this session")]
    CuratorModeSkipped,

    #[error("Curator mode must be 'build' or 'skip'")]
    InvalidCuratorMode,

    #[error("Please select at least one artwork")]
    EmptySelection,

    #[error("Artwork {0} was not viewed in this session")]
    UnknownArtwork(String),

    #[error("Artwork {0} is not part of the selection")]
    NotSelected(String),

    #[error("Action not allowed in stage {0}")]
    WrongStage(&'static str),

    #[error("Please enter an exhibition title")]
    MissingTitle,

    #[error("Please enter an exhibition description")]
    MissingDescription,

    #[error("Exhibition has already been finalized")]
    AlreadyFinalized,

    #[error("Exhibition has not been finalized yet")]
    NotFinalized,
}

impl FlowError {
    /// Input the participant can correct and resubmit
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FlowError::EmptySelection
                | FlowError::UnknownArtwork(_)
                | FlowError::NotSelected(_)
                | FlowError::MissingTitle
                | FlowError::MissingDescription
                | FlowError::InvalidCuratorMode
        )
    }
}
