//! Per-participant session state
//!
//! Every randomized field (group, sampled sequence, per-session RNG) is drawn
//! once in [`SessionState::new`] and never re-drawn. Mutation happens only
//! through the transition functions in `crate::workflow`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dmx_common::Error;

use super::{
    BuildStage, CuratedExhibition, CuratorMode, DescriptionOrdering, DescriptionPreference,
    DescriptionSource, ViewEvent,
};

/// Experimental condition, fixed for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Curator,
    Ai,
}

impl Group {
    /// Uniform choice between the two conditions
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Group::Curator
        } else {
            Group::Ai
        }
    }

    /// Description variant shown to this group while viewing
    pub fn description_source(&self) -> DescriptionSource {
        match self {
            Group::Curator => DescriptionSource::Curator,
            Group::Ai => DescriptionSource::Ai,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Curator => "curator",
            Group::Ai => "ai",
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewing flow state, derived from the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewingState {
    Viewing,
    Complete,
}

/// All mutable state for one participant
#[derive(Debug)]
pub struct SessionState {
    pub(crate) session_id: Uuid,
    pub(crate) group: Group,
    /// Catalog positions, distinct, drawn once
    pub(crate) sequence: Vec<usize>,
    /// Index into `sequence`; never decreases, never exceeds `sequence.len()`
    pub(crate) cursor: usize,
    /// First-display monotonic offsets keyed by artwork id
    pub(crate) start_times: HashMap<String, Duration>,
    pub(crate) events: Vec<ViewEvent>,
    pub(crate) curator_mode: CuratorMode,
    pub(crate) stage: BuildStage,
    pub(crate) selected_ids: Vec<String>,
    pub(crate) orderings: HashMap<String, DescriptionOrdering>,
    pub(crate) preferences: BTreeMap<String, DescriptionPreference>,
    pub(crate) exhibition: Option<CuratedExhibition>,
    pub(crate) views_logged: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) rng: StdRng,
}

impl SessionState {
    /// Initialize a session against a catalog of `catalog_len` artworks
    ///
    /// Fails with `Error::Config` when the catalog cannot supply
    /// `sample_size` distinct artworks.
    pub fn new<R: Rng + ?Sized>(
        catalog_len: usize,
        sample_size: usize,
        rng: &mut R,
        created_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if catalog_len < sample_size {
            return Err(Error::Config(format!(
                "Catalog has {} artworks but each session samples {}",
                catalog_len, sample_size
            )));
        }

        let group = Group::random(rng);
        let sequence = rand::seq::index::sample(rng, catalog_len, sample_size).into_vec();
        let session_rng = StdRng::seed_from_u64(rng.gen());

        Ok(Self {
            session_id: Uuid::new_v4(),
            group,
            sequence,
            cursor: 0,
            start_times: HashMap::new(),
            events: Vec::new(),
            curator_mode: CuratorMode::Undecided,
            stage: BuildStage::SelectArtworks,
            selected_ids: Vec::new(),
            orderings: HashMap::new(),
            preferences: BTreeMap::new(),
            exhibition: None,
            views_logged: false,
            created_at,
            rng: session_rng,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.sequence.len()
    }

    pub fn viewing_state(&self) -> ViewingState {
        if self.cursor < self.sequence.len() {
            ViewingState::Viewing
        } else {
            ViewingState::Complete
        }
    }

    pub fn is_complete(&self) -> bool {
        self.viewing_state() == ViewingState::Complete
    }

    /// Catalog position at the cursor, `None` once complete
    pub fn current_index(&self) -> Option<usize> {
        self.sequence.get(self.cursor).copied()
    }

    pub fn start_time(&self, artwork_id: &str) -> Option<Duration> {
        self.start_times.get(artwork_id).copied()
    }

    pub fn recorded_start_count(&self) -> usize {
        self.start_times.len()
    }

    pub fn events(&self) -> &[ViewEvent] {
        &self.events
    }

    pub fn curator_mode(&self) -> CuratorMode {
        self.curator_mode
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.selected_ids
    }

    pub fn ordering(&self, artwork_id: &str) -> Option<DescriptionOrdering> {
        self.orderings.get(artwork_id).copied()
    }

    pub fn preferences(&self) -> &BTreeMap<String, DescriptionPreference> {
        &self.preferences
    }

    pub fn exhibition(&self) -> Option<&CuratedExhibition> {
        self.exhibition.as_ref()
    }

    pub fn views_logged(&self) -> bool {
        self.views_logged
    }

    pub(crate) fn mark_views_logged(&mut self) {
        self.views_logged = true;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
