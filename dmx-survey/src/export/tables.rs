//! Delimited table exports

use super::ExportError;
use crate::models::{CuratedExhibition, ViewEvent};

/// Summary table columns
pub const SUMMARY_COLUMNS: [&str; 4] = [
    "exhibition_title",
    "exhibition_description",
    "selected_ids",
    "preferences",
];

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}

/// Per-event view log
pub fn view_log_csv(events: &[ViewEvent]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ViewEvent::COLUMNS)?;
    for event in events {
        writer.write_record(event.to_row())?;
    }
    finish(writer)
}

/// One-row exhibition summary
pub fn summary_csv(exhibition: &CuratedExhibition) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SUMMARY_COLUMNS)?;
    writer.write_record([
        exhibition.title.as_str(),
        exhibition.description.as_str(),
        &exhibition.selected_ids_joined(),
        &exhibition.preferences_json(),
    ])?;
    finish(writer)
}
