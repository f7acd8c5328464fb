//! Export artifacts: CSV tables and the PDF exhibition card

pub mod card;
pub mod tables;
pub mod wrap;

use thiserror::Error;

pub use card::{card_artworks, render_card, CardArtwork};
pub use tables::{summary_csv, view_log_csv};

/// Artifact generation errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Artwork not in catalog: {0}")]
    MissingArtwork(String),
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e.to_string())
    }
}

impl From<lopdf::Error> for ExportError {
    fn from(e: lopdf::Error) -> Self {
        ExportError::Pdf(e.to_string())
    }
}
