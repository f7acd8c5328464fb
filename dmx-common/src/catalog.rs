//! Artwork catalog
//!
//! The catalog is a static JSON array of artwork records, loaded once at
//! startup and shared read-only by every session.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// One artwork in the catalog
///
/// Field names on disk follow the museum metadata export: the curator text is
/// `description` and the generated text is `ai_story`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    /// Unique identifier (numeric ids in the source file are stringified)
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    pub image_url: String,
    /// Curator-written description
    #[serde(default, rename = "description")]
    pub curator_description: Option<String>,
    /// AI-generated description
    #[serde(default, rename = "ai_story")]
    pub ai_description: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

impl ArtworkRecord {
    /// Artist for display, `"Unknown"` when absent or blank
    pub fn artist_or_unknown(&self) -> &str {
        match self.artist.as_deref() {
            Some(a) if !a.trim().is_empty() => a,
            _ => "Unknown",
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for id, got {}",
            other
        ))),
    }
}

/// Read-only artwork collection with id lookup
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<ArtworkRecord>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from records, rejecting duplicate ids
    pub fn new(records: Vec<ArtworkRecord>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if by_id.insert(record.id.clone(), index).is_some() {
                return Err(Error::Catalog(format!(
                    "Duplicate artwork id: {}",
                    record.id
                )));
            }
        }
        Ok(Self { records, by_id })
    }

    /// Parse a catalog from a JSON array
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<ArtworkRecord> = serde_json::from_str(json)?;
        Self::new(records)
    }

    /// Load the catalog file
    ///
    /// A missing file is reported as `Error::Config` so the caller can treat
    /// it as a fatal startup condition.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Metadata file not found at {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;

        info!(
            path = %path.display(),
            artworks = catalog.len(),
            "Loaded artwork catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a catalog position
    pub fn get(&self, index: usize) -> Option<&ArtworkRecord> {
        self.records.get(index)
    }

    /// Record by artwork id
    pub fn find(&self, id: &str) -> Option<&ArtworkRecord> {
        let found = self.by_id.get(id).and_then(|&i| self.records.get(i));
        if found.is_none() {
            debug!(artwork_id = %id, "Artwork id not in catalog");
        }
        found
    }

    pub fn records(&self) -> &[ArtworkRecord] {
        &self.records
    }
}
