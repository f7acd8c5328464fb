//! Dwell-time event recorded when the participant advances past an artwork

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Group;

/// One completed artwork view
///
/// Immutable once created; sessions only ever append these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub artwork_id: String,
    pub title: String,
    /// Non-negative, rounded to two decimals
    pub time_spent_seconds: f64,
    pub group: Group,
}

impl ViewEvent {
    /// Column order shared by the CSV export and the external log
    pub const COLUMNS: [&'static str; 6] = [
        "timestamp",
        "session_id",
        "artwork_id",
        "title",
        "time_spent_seconds",
        "group",
    ];

    /// Row values in `COLUMNS` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            self.session_id.to_string(),
            self.artwork_id.clone(),
            self.title.clone(),
            format_seconds(self.time_spent_seconds),
            self.group.to_string(),
        ]
    }
}

/// Render seconds without trailing float noise (`3.5`, `12.25`, `0`)
pub fn format_seconds(seconds: f64) -> String {
    let rounded = (seconds * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
