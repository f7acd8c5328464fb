//! Data models for survey sessions

pub mod exhibition;
pub mod session;
pub mod view_event;

pub use exhibition::{
    BuildStage, CuratedExhibition, CuratorMode, DescriptionLabel, DescriptionOrdering,
    DescriptionPreference, DescriptionSource,
};
pub use session::{Group, SessionState, ViewingState};
pub use view_event::ViewEvent;
