//! External service clients
//!
//! Both the spreadsheet log and the image fetch are best-effort: callers get
//! an explicit `Result` and decide how to degrade, nothing here retries.

pub mod image_fetcher;
pub mod sheets_client;

pub use image_fetcher::{FetchError, HttpImageFetcher, ImageFetcher};
pub use sheets_client::{ExternalLog, LogTable, SheetsClient, SheetsError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::{CuratedExhibition, ViewEvent};

/// Outcome of a best-effort log append, reported to the participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogReport {
    pub saved: bool,
    pub message: String,
}

impl LogReport {
    fn saved(message: impl Into<String>) -> Self {
        Self {
            saved: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            saved: false,
            message: message.into(),
        }
    }
}

/// Header row plus one row per event
pub fn event_rows(events: &[ViewEvent]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(events.len() + 1);
    rows.push(ViewEvent::COLUMNS.iter().map(|c| c.to_string()).collect());
    rows.extend(events.iter().map(ViewEvent::to_row));
    rows
}

/// Single summary row for a finalized exhibition
pub fn summary_row(session_id: Uuid, exhibition: &CuratedExhibition, at: DateTime<Utc>) -> Vec<String> {
    vec![
        session_id.to_string(),
        at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        exhibition.title.clone(),
        exhibition.description.clone(),
        exhibition.selected_ids_joined(),
        exhibition.preferences_json(),
    ]
}

/// Append the view log; failures are logged and reported, never raised
pub async fn append_view_log(log: &dyn ExternalLog, session_id: Uuid, events: &[ViewEvent]) -> LogReport {
    if events.is_empty() {
        return LogReport::failed("No viewing data to save.");
    }

    match log.append_rows(LogTable::Events, event_rows(events)).await {
        Ok(_) => LogReport::saved("Your viewing data has been saved."),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Failed to write viewing data to external log");
            LogReport::failed(format!("Failed to write viewing data: {}", e))
        }
    }
}

/// Append the exhibition summary; failures are logged and reported
pub async fn append_exhibition_summary(
    log: &dyn ExternalLog,
    session_id: Uuid,
    exhibition: &CuratedExhibition,
    at: DateTime<Utc>,
) -> LogReport {
    let row = summary_row(session_id, exhibition, at);
    match log.append_rows(LogTable::Summary, vec![row]).await {
        Ok(_) => LogReport::saved("Your exhibition has been saved."),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Failed to write exhibition summary to external log");
            LogReport::failed(format!("Failed to write exhibition summary: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Group;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct FailingLog;

    #[async_trait]
    impl ExternalLog for FailingLog {
        async fn append_rows(&self, _table: LogTable, _rows: Vec<Vec<String>>) -> Result<usize, SheetsError> {
            Err(SheetsError::Api(403, "forbidden".to_string()))
        }
    }

    fn event() -> ViewEvent {
        ViewEvent {
            timestamp: Utc::now(),
            session_id: Uuid::new_v4(),
            artwork_id: "a".to_string(),
            title: "A".to_string(),
            time_spent_seconds: 1.25,
            group: Group::Curator,
        }
    }

    #[test]
    fn test_event_rows_start_with_header() {
        let rows = event_rows(&[event(), event()]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "timestamp");
        assert_eq!(rows[1][4], "1.25");
    }

    #[test]
    fn test_summary_row_layout() {
        let exhibition = CuratedExhibition {
            selected_ids: vec!["a".to_string(), "b".to_string()],
            title: "My Picks".to_string(),
            description: "Favorites.".to_string(),
            preferences: BTreeMap::new(),
            created_at: Utc::now(),
        };
        let row = summary_row(Uuid::nil(), &exhibition, Utc::now());
        assert_eq!(row[2], "My Picks");
        assert_eq!(row[4], "a,b");
        assert_eq!(row[5], "{}");
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let report = append_view_log(&FailingLog, Uuid::nil(), &[event()]).await;
        assert!(!report.saved);
        assert!(report.message.contains("403"));
    }
}
