//! Exhibition-builder models
//!
//! Each selected artwork gets a randomized A/B ordering of its two
//! descriptions. The ordering is generated once per session and cached so
//! repeated views of the pick stage always show the same assignment.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Who wrote a description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionSource {
    Curator,
    Ai,
}

impl DescriptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionSource::Curator => "curator",
            DescriptionSource::Ai => "ai",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            DescriptionSource::Curator => DescriptionSource::Ai,
            DescriptionSource::Ai => DescriptionSource::Curator,
        }
    }
}

impl std::fmt::Display for DescriptionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label shown to the participant in the pick stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptionLabel {
    #[serde(rename = "Description A")]
    A,
    #[serde(rename = "Description B")]
    B,
}

impl DescriptionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionLabel::A => "Description A",
            DescriptionLabel::B => "Description B",
        }
    }
}

impl std::fmt::Display for DescriptionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached A/B slot assignment for one artwork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionOrdering {
    pub slot_a: DescriptionSource,
    pub slot_b: DescriptionSource,
}

impl DescriptionOrdering {
    /// Random permutation of the two sources into slots A and B
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let slot_a = if rng.gen_bool(0.5) {
            DescriptionSource::Curator
        } else {
            DescriptionSource::Ai
        };
        Self {
            slot_a,
            slot_b: slot_a.other(),
        }
    }

    pub fn source_for(&self, label: DescriptionLabel) -> DescriptionSource {
        match label {
            DescriptionLabel::A => self.slot_a,
            DescriptionLabel::B => self.slot_b,
        }
    }
}

/// Participant's chosen description for one artwork
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionPreference {
    pub title: String,
    pub chosen: DescriptionLabel,
    pub description_a_source: DescriptionSource,
    pub description_b_source: DescriptionSource,
}

impl DescriptionPreference {
    pub fn new(title: impl Into<String>, chosen: DescriptionLabel, ordering: DescriptionOrdering) -> Self {
        Self {
            title: title.into(),
            chosen,
            description_a_source: ordering.slot_a,
            description_b_source: ordering.slot_b,
        }
    }

    /// Source that the chosen label resolved to
    pub fn chosen_source(&self) -> DescriptionSource {
        match self.chosen {
            DescriptionLabel::A => self.description_a_source,
            DescriptionLabel::B => self.description_b_source,
        }
    }
}

/// Builder stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    SelectArtworks,
    PickDescriptions,
    Finalized,
}

/// Debrief opt-in for building an exhibition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuratorMode {
    Undecided,
    Build,
    Skip,
}

/// Participant-assembled mini-exhibition (terminal, exported only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedExhibition {
    pub selected_ids: Vec<String>,
    pub title: String,
    pub description: String,
    pub preferences: BTreeMap<String, DescriptionPreference>,
    pub created_at: DateTime<Utc>,
}

impl CuratedExhibition {
    /// Preferences as a JSON object keyed by artwork id
    pub fn preferences_json(&self) -> String {
        serde_json::to_string(&self.preferences).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn selected_ids_joined(&self) -> String {
        self.selected_ids.join(",")
    }
}
