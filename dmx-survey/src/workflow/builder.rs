//! Exhibition builder
//!
//! Optional post-viewing stage: the participant selects artworks they saw,
//! picks one of two unlabeled descriptions for each, and titles the result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use dmx_common::Catalog;

use super::{description_for, FlowError};
use crate::models::{
    BuildStage, CuratedExhibition, CuratorMode, DescriptionLabel, DescriptionOrdering,
    DescriptionPreference, SessionState,
};

/// A viewed artwork with its selection toggle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectableArtwork {
    pub artwork_id: String,
    pub title: String,
    pub artist: String,
    pub image_url: String,
    pub selected: bool,
}

/// Both descriptions for one selected artwork, behind A/B labels
///
/// Sources stay hidden until the exhibition is finalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickOption {
    pub artwork_id: String,
    pub title: String,
    pub description_a: String,
    pub description_b: String,
    pub chosen: Option<DescriptionLabel>,
}

fn stage_name(stage: BuildStage) -> &'static str {
    match stage {
        BuildStage::SelectArtworks => "select_artworks",
        BuildStage::PickDescriptions => "pick_descriptions",
        BuildStage::Finalized => "finalized",
    }
}

/// Builder is reachable: viewing done, not skipped, not finalized
fn ensure_open(state: &SessionState) -> Result<(), FlowError> {
    if !state.is_complete() {
        return Err(FlowError::ViewingInProgress);
    }
    if state.curator_mode == CuratorMode::Skip {
        return Err(FlowError::CuratorModeSkipped);
    }
    if state.stage == BuildStage::Finalized {
        return Err(FlowError::AlreadyFinalized);
    }
    Ok(())
}

/// Record the debrief opt-in
///
/// May be changed until the exhibition is finalized.
pub fn set_curator_mode(state: &mut SessionState, mode: CuratorMode) -> Result<(), FlowError> {
    if !state.is_complete() {
        return Err(FlowError::ViewingInProgress);
    }
    if state.stage == BuildStage::Finalized {
        return Err(FlowError::AlreadyFinalized);
    }
    if mode == CuratorMode::Undecided {
        return Err(FlowError::InvalidCuratorMode);
    }

    state.curator_mode = mode;
    info!(session_id = %state.session_id, mode = ?mode, "Curator mode chosen");
    Ok(())
}

/// Artworks the participant viewed, in viewing order
pub fn viewed_artworks(state: &SessionState, catalog: &Catalog) -> Vec<SelectableArtwork> {
    state
        .events
        .iter()
        .filter_map(|event| catalog.find(&event.artwork_id))
        .map(|record| SelectableArtwork {
            artwork_id: record.id.clone(),
            title: record.title.clone(),
            artist: record.artist_or_unknown().to_string(),
            image_url: record.image_url.clone(),
            selected: state.selected_ids.contains(&record.id),
        })
        .collect()
}

fn was_viewed(state: &SessionState, artwork_id: &str) -> bool {
    state.events.iter().any(|e| e.artwork_id == artwork_id)
}

/// Confirm the artwork selection and move to the pick stage
///
/// Allowed from `select_artworks` and, to revise a selection, from
/// `pick_descriptions`. Cached A/B orderings survive re-selection;
/// preferences for deselected artworks are dropped.
pub fn select_artworks(state: &mut SessionState, artwork_ids: &[String]) -> Result<(), FlowError> {
    ensure_open(state)?;

    // Keep first occurrence order, drop repeats
    let mut selection: Vec<String> = Vec::with_capacity(artwork_ids.len());
    for id in artwork_ids {
        let id = id.trim();
        if id.is_empty() || selection.iter().any(|s| s == id) {
            continue;
        }
        if !was_viewed(state, id) {
            return Err(FlowError::UnknownArtwork(id.to_string()));
        }
        selection.push(id.to_string());
    }

    if selection.is_empty() {
        return Err(FlowError::EmptySelection);
    }

    for id in &selection {
        if !state.orderings.contains_key(id) {
            let ordering = DescriptionOrdering::shuffled(&mut state.rng);
            debug!(
                session_id = %state.session_id,
                artwork_id = %id,
                slot_a = %ordering.slot_a,
                "Generated description ordering"
            );
            state.orderings.insert(id.clone(), ordering);
        }
    }

    state.preferences.retain(|id, _| selection.contains(id));
    if state.curator_mode == CuratorMode::Undecided {
        state.curator_mode = CuratorMode::Build;
    }
    state.selected_ids = selection;
    state.stage = BuildStage::PickDescriptions;

    info!(
        session_id = %state.session_id,
        selected = state.selected_ids.len(),
        "Artworks selected for exhibition"
    );
    Ok(())
}

fn ensure_picking(state: &SessionState) -> Result<(), FlowError> {
    ensure_open(state)?;
    if state.stage != BuildStage::PickDescriptions {
        return Err(FlowError::WrongStage(stage_name(state.stage)));
    }
    Ok(())
}

/// Ordering for a selected artwork, generated on first use
fn ordering_for(state: &mut SessionState, artwork_id: &str) -> DescriptionOrdering {
    if let Some(ordering) = state.orderings.get(artwork_id) {
        return *ordering;
    }
    let ordering = DescriptionOrdering::shuffled(&mut state.rng);
    state.orderings.insert(artwork_id.to_string(), ordering);
    ordering
}

/// Labeled description pairs for every selected artwork
pub fn pick_options(state: &mut SessionState, catalog: &Catalog) -> Result<Vec<PickOption>, FlowError> {
    ensure_picking(state)?;

    let ids = state.selected_ids.clone();
    let mut options = Vec::with_capacity(ids.len());
    for id in ids {
        let record = catalog
            .find(&id)
            .ok_or_else(|| FlowError::UnknownArtwork(id.clone()))?;
        let ordering = ordering_for(state, &id);
        options.push(PickOption {
            artwork_id: id.clone(),
            title: record.title.clone(),
            description_a: description_for(record, ordering.slot_a),
            description_b: description_for(record, ordering.slot_b),
            chosen: state.preferences.get(&id).map(|p| p.chosen),
        });
    }
    Ok(options)
}

/// Record (or overwrite) the chosen description for one selected artwork
pub fn choose_description(
    state: &mut SessionState,
    catalog: &Catalog,
    artwork_id: &str,
    label: DescriptionLabel,
) -> Result<DescriptionPreference, FlowError> {
    ensure_picking(state)?;
    if !state.selected_ids.iter().any(|s| s == artwork_id) {
        return Err(FlowError::NotSelected(artwork_id.to_string()));
    }
    let record = catalog
        .find(artwork_id)
        .ok_or_else(|| FlowError::UnknownArtwork(artwork_id.to_string()))?;

    let ordering = ordering_for(state, artwork_id);
    let preference = DescriptionPreference::new(record.title.clone(), label, ordering);
    state
        .preferences
        .insert(artwork_id.to_string(), preference.clone());

    debug!(
        session_id = %state.session_id,
        artwork_id = %artwork_id,
        chosen = %label,
        source = %preference.chosen_source(),
        "Description preference recorded"
    );
    Ok(preference)
}

/// Finalize the exhibition
///
/// `choices` are applied before defaulting; selected artworks still without a
/// choice default to `Description A`. Validation failures change nothing.
pub fn finalize(
    state: &mut SessionState,
    catalog: &Catalog,
    title: &str,
    description: &str,
    choices: &HashMap<String, DescriptionLabel>,
    now: DateTime<Utc>,
) -> Result<CuratedExhibition, FlowError> {
    ensure_picking(state)?;

    let title = title.trim();
    let description = description.trim();
    if title.is_empty() {
        return Err(FlowError::MissingTitle);
    }
    if description.is_empty() {
        return Err(FlowError::MissingDescription);
    }
    for id in choices.keys() {
        if !state.selected_ids.contains(id) {
            return Err(FlowError::NotSelected(id.clone()));
        }
    }
    for id in &state.selected_ids {
        if catalog.find(id).is_none() {
            return Err(FlowError::UnknownArtwork(id.clone()));
        }
    }

    for (id, label) in choices {
        choose_description(state, catalog, id, *label)?;
    }
    let unchosen: Vec<String> = state
        .selected_ids
        .iter()
        .filter(|id| !state.preferences.contains_key(*id))
        .cloned()
        .collect();
    for id in unchosen {
        choose_description(state, catalog, &id, DescriptionLabel::A)?;
    }

    let preferences = state
        .selected_ids
        .iter()
        .filter_map(|id| state.preferences.get(id).map(|p| (id.clone(), p.clone())))
        .collect();

    let exhibition = CuratedExhibition {
        selected_ids: state.selected_ids.clone(),
        title: title.to_string(),
        description: description.to_string(),
        preferences,
        created_at: now,
    };

    state.exhibition = Some(exhibition.clone());
    state.stage = BuildStage::Finalized;

    info!(
        session_id = %state.session_id,
        title = %exhibition.title,
        artworks = exhibition.selected_ids.len(),
        "Exhibition finalized"
    );
    Ok(exhibition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DescriptionSource;
    use crate::workflow::advance;
    use dmx_common::time::ManualClock;
    use dmx_common::ArtworkRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog(n: usize) -> Catalog {
        let records = (0..n)
            .map(|i| ArtworkRecord {
                id: format!("art-{}", i),
                title: format!("Artwork {}", i),
                artist: Some("Anon".to_string()),
                image_url: format!("https://example.org/{}.jpg", i),
                curator_description: Some(format!("Curator {}", i)),
                ai_description: Some(format!("AI {}", i)),
                theme: Some("Light".to_string()),
            })
            .collect();
        Catalog::new(records).unwrap()
    }

    fn completed_session(catalog: &Catalog, sample: usize) -> SessionState {
        let mut rng = StdRng::seed_from_u64(21);
        let mut state = SessionState::new(catalog.len(), sample, &mut rng, Utc::now()).unwrap();
        let clock = ManualClock::new(Utc::now());
        while !state.is_complete() {
            advance(&mut state, catalog, &clock, None).unwrap();
        }
        state
    }

    fn viewed_ids(state: &SessionState, n: usize) -> Vec<String> {
        state.events().iter().take(n).map(|e| e.artwork_id.clone()).collect()
    }

    #[test]
    fn test_builder_closed_while_viewing() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = SessionState::new(5, 3, &mut rng, Utc::now()).unwrap();

        let err = select_artworks(&mut state, &["art-0".to_string()]).unwrap_err();
        assert_eq!(err, FlowError::ViewingInProgress);
        assert_eq!(
            set_curator_mode(&mut state, CuratorMode::Build).unwrap_err(),
            FlowError::ViewingInProgress
        );
    }

    #[test]
    fn test_empty_selection_stays_in_stage() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);

        let err = select_artworks(&mut state, &[]).unwrap_err();
        assert_eq!(err, FlowError::EmptySelection);
        assert_eq!(state.stage(), BuildStage::SelectArtworks);
    }

    #[test]
    fn test_unviewed_artwork_rejected() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 2);
        let unviewed = catalog
            .records()
            .iter()
            .find(|r| !state.events().iter().any(|e| e.artwork_id == r.id))
            .unwrap()
            .id
            .clone();

        let err = select_artworks(&mut state, &[unviewed.clone()]).unwrap_err();
        assert_eq!(err, FlowError::UnknownArtwork(unviewed));
        assert!(state.selected_ids().is_empty());
    }

    #[test]
    fn test_ordering_stable_across_renders_and_reselection() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);
        let ids = viewed_ids(&state, 2);

        select_artworks(&mut state, &ids).unwrap();
        let first = pick_options(&mut state, &catalog).unwrap();
        let second = pick_options(&mut state, &catalog).unwrap();
        assert_eq!(first, second);
        let cached = state.ordering(&ids[0]).unwrap();

        select_artworks(&mut state, &ids[..1]).unwrap();
        select_artworks(&mut state, &ids).unwrap();
        assert_eq!(state.ordering(&ids[0]), Some(cached));
    }

    #[test]
    fn test_skip_blocks_builder() {
        let catalog = catalog(4);
        let mut state = completed_session(&catalog, 2);
        set_curator_mode(&mut state, CuratorMode::Skip).unwrap();

        let ids = viewed_ids(&state, 1);
        assert_eq!(
            select_artworks(&mut state, &ids).unwrap_err(),
            FlowError::CuratorModeSkipped
        );
    }

    #[test]
    fn test_choose_requires_selection() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);
        let ids = viewed_ids(&state, 2);
        select_artworks(&mut state, &ids[..1]).unwrap();

        let err = choose_description(&mut state, &catalog, &ids[1], DescriptionLabel::B).unwrap_err();
        assert_eq!(err, FlowError::NotSelected(ids[1].clone()));
    }

    #[test]
    fn test_finalize_validation_creates_nothing() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);
        let ids = viewed_ids(&state, 2);
        select_artworks(&mut state, &ids).unwrap();
        let none = HashMap::new();

        assert_eq!(
            finalize(&mut state, &catalog, "  ", "Favorites.", &none, Utc::now()).unwrap_err(),
            FlowError::MissingTitle
        );
        assert_eq!(
            finalize(&mut state, &catalog, "My Picks", "", &none, Utc::now()).unwrap_err(),
            FlowError::MissingDescription
        );
        assert!(state.exhibition().is_none());
        assert!(state.preferences().is_empty());
        assert_eq!(state.stage(), BuildStage::PickDescriptions);
    }

    #[test]
    fn test_finalize_defaults_to_description_a() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);
        let ids = viewed_ids(&state, 2);
        select_artworks(&mut state, &ids).unwrap();

        let mut choices = HashMap::new();
        choices.insert(ids[1].clone(), DescriptionLabel::B);
        let exhibition =
            finalize(&mut state, &catalog, "My Picks", "Favorites.", &choices, Utc::now()).unwrap();

        assert_eq!(exhibition.preferences[&ids[0]].chosen, DescriptionLabel::A);
        assert_eq!(exhibition.preferences[&ids[1]].chosen, DescriptionLabel::B);
        let ordering = state.ordering(&ids[1]).unwrap();
        assert_eq!(exhibition.preferences[&ids[1]].chosen_source(), ordering.slot_b);
    }

    #[test]
    fn test_no_reentry_after_finalize() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);
        let ids = viewed_ids(&state, 1);
        select_artworks(&mut state, &ids).unwrap();
        finalize(&mut state, &catalog, "T", "D", &HashMap::new(), Utc::now()).unwrap();

        assert_eq!(
            select_artworks(&mut state, &ids).unwrap_err(),
            FlowError::AlreadyFinalized
        );
        assert_eq!(
            finalize(&mut state, &catalog, "T2", "D2", &HashMap::new(), Utc::now()).unwrap_err(),
            FlowError::AlreadyFinalized
        );
        assert_eq!(
            set_curator_mode(&mut state, CuratorMode::Skip).unwrap_err(),
            FlowError::AlreadyFinalized
        );
        assert_eq!(state.exhibition().unwrap().title, "T");
    }

    #[test]
    fn test_pick_options_hide_sources_but_match_ordering() {
        let catalog = catalog(6);
        let mut state = completed_session(&catalog, 4);
        let ids = viewed_ids(&state, 1);
        select_artworks(&mut state, &ids).unwrap();

        let options = pick_options(&mut state, &catalog).unwrap();
        let ordering = state.ordering(&ids[0]).unwrap();
        let expected_a = match ordering.slot_a {
            DescriptionSource::Curator => "Curator",
            DescriptionSource::Ai => "AI",
        };
        assert!(options[0].description_a.starts_with(expected_a));
    }
}
