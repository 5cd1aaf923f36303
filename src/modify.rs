//! Edits applied to the AI database and player times.
//!
//! Every operation borrows its input and returns a new value, so a caller
//! holding the previous state can keep it (or discard the new one) freely.

use tracing::{debug, info};

use crate::config::AdaptationConfig;
use crate::data::database::{Database, GENERATED_SAMPLES};
use crate::data::player_times::PlayerTimes;
use crate::error::ErrorKind;
use crate::fit::ProcessedDatabase;
use crate::game_types::{ClassId, TrackId};

/// Replace a track's AI levels with predicted times at `from, from + spacing, ..= to`.
///
/// The written levels are marked as generated. Fails with
/// [`ErrorKind::MissingPrediction`] when the track could not be fitted.
pub fn apply_generated_range(
    database: &Database,
    processed: &ProcessedDatabase,
    class: ClassId,
    track: TrackId,
    from: u32,
    to: u32,
    spacing: u32,
) -> Result<Database, ErrorKind> {
    if spacing == 0 || from > to {
        return Err(ErrorKind::InvalidRange { from, to, spacing });
    }
    let prediction = processed
        .prediction(class, track)
        .filter(|prediction| !prediction.ailevels.is_empty())
        .ok_or(ErrorKind::MissingPrediction { class, track })?;

    let entries: Vec<(u32, f64, u32)> = (from..=to)
        .step_by(spacing as usize)
        .filter_map(|level| {
            let time = prediction.ailevels.get(&level)?;
            Some((level, *time, GENERATED_SAMPLES))
        })
        .collect();
    if entries.is_empty() {
        return Err(ErrorKind::InvalidRange { from, to, spacing });
    }

    let mut updated = database.clone();
    let written = entries.len();
    updated.track_mut(class, track).replace_levels(entries);
    if let Some(record) = updated.classes.get_mut(&class) {
        record.refresh_bounds();
    }

    info!(%class, %track, from, to, spacing, written, "applied generated AI levels");
    Ok(updated)
}

/// A range of `ai_num_levels` levels, `ai_spacing` apart, centered on `center`
/// and shifted to stay inside the configured AI bounds.
pub fn suggest_range(center: u32, config: &AdaptationConfig) -> (u32, u32) {
    let spacing = i64::from(config.ai_spacing.max(1));
    let width = i64::from(config.ai_num_levels.max(1) - 1) * spacing;
    let (min_ai, max_ai) = (i64::from(config.min_ai), i64::from(config.max_ai));

    let mut from = i64::from(center) - (width / spacing / 2) * spacing;
    let mut to = from + width;
    if from < min_ai {
        to += min_ai - from;
        from = min_ai;
    }
    if to > max_ai {
        from -= to - max_ai;
        to = max_ai;
    }
    from = from.max(min_ai);

    (from as u32, to as u32)
}

/// Drop every level marked as generated. Returns the new database and the
/// number of levels removed.
pub fn remove_generated(database: &Database) -> (Database, usize) {
    let mut updated = database.clone();
    let mut removed = 0;
    for class in updated.classes.values_mut() {
        for track in class.tracks.values_mut() {
            removed += track.retain_levels(|_, _, samples| samples != Some(GENERATED_SAMPLES));
        }
        class.refresh_bounds();
    }
    info!(removed, "removed generated AI levels");
    (updated, removed)
}

/// An empty database. Player times are kept by the caller as they are.
pub fn reset_all() -> Database {
    debug!("resetting AI database");
    Database::new()
}

/// Remove one recorded player time by position.
pub fn remove_player_time(
    times: &PlayerTimes,
    class: ClassId,
    track: TrackId,
    index: usize,
) -> Result<PlayerTimes, ErrorKind> {
    let missing = ErrorKind::UnknownPlayerTime {
        class,
        track,
        index,
    };
    if times.track(class, track).is_none() {
        return Err(missing);
    }

    let mut updated = times.clone();
    updated
        .track_mut(class, track)
        .remove(index)
        .ok_or(missing)?;
    Ok(updated)
}

/// Keep only the fastest player time of one class/track.
pub fn keep_best_player_time(times: &PlayerTimes, class: ClassId, track: TrackId) -> PlayerTimes {
    let mut updated = times.clone();
    if let Some(player) = updated
        .classes
        .get_mut(&class)
        .and_then(|c| c.tracks.get_mut(&track))
    {
        player.retain_best();
    }
    updated
}

/// Keep only the fastest player time everywhere.
pub fn keep_best_player_times_everywhere(times: &PlayerTimes) -> PlayerTimes {
    let mut updated = times.clone();
    for class in updated.classes.values_mut() {
        for player in class.tracks.values_mut() {
            player.retain_best();
        }
    }
    updated
}

/// Whether player times differ from the snapshot taken when they were loaded.
pub fn player_times_changed(current: &PlayerTimes, snapshot: &PlayerTimes) -> bool {
    current.differs_from(snapshot)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::player_times::PlayerTrack;
    use crate::fit::process_database;

    fn class(id: u32) -> ClassId {
        ClassId::new(id)
    }

    fn track(id: u32) -> TrackId {
        TrackId::new(id)
    }

    fn observed_database() -> Database {
        let mut db = Database::new();
        db.insert_time(class(1), track(10), 85, 105.0, 2);
        db.insert_time(class(1), track(10), 95, 100.0, 1);
        db.insert_time(class(1), track(10), 105, 95.0, 3);
        db.insert_time(class(1), track(11), 110, 60.0, 1);
        assert_eq!(db.classes[&class(1)].min_ai, Some(85));
        assert_eq!(db.classes[&class(1)].max_ai, Some(110));
        db
    }

    #[test]
    fn apply_replaces_levels_with_generated_ones() {
        let db = observed_database();
        let before = db.clone();
        let processed = process_database(&db, &AdaptationConfig::default());

        let updated =
            apply_generated_range(&db, &processed, class(1), track(10), 90, 100, 5).unwrap();
        assert_eq!(db, before);

        let record = updated.track(class(1), track(10)).unwrap();
        assert_eq!(record.ailevels.keys().copied().collect::<Vec<_>>(), vec![90, 95, 100]);
        assert!(record.ailevels.keys().all(|level| record.is_generated(*level)));
        assert!((record.ailevels[&95][0] - 100.0).abs() < 1e-6);
        assert_eq!(record.min_ai, Some(90));
        assert_eq!(record.max_ai, Some(100));
        assert_eq!(updated.classes[&class(1)].min_ai, Some(90));
        assert_eq!(updated.classes[&class(1)].max_ai, Some(110));
    }

    #[test]
    fn generated_levels_are_removed_again() {
        let db = observed_database();
        let processed = process_database(&db, &AdaptationConfig::default());
        let applied =
            apply_generated_range(&db, &processed, class(1), track(10), 90, 100, 5).unwrap();

        let (cleaned, removed) = remove_generated(&applied);
        assert_eq!(removed, 3);
        let record = cleaned.track(class(1), track(10)).unwrap();
        assert!(record.ailevels.is_empty());
        assert!(record.samples_count.is_empty());
        assert_eq!(record.min_ai, None);
        assert_eq!(record.max_ai, None);
        assert_eq!(cleaned.classes[&class(1)].min_ai, Some(110));

        // The applied database itself is untouched.
        assert_eq!(applied.track(class(1), track(10)).unwrap().ailevels.len(), 3);
    }

    #[test]
    fn apply_without_prediction_fails() {
        let db = observed_database();
        let processed = process_database(&db, &AdaptationConfig::default());
        let err = apply_generated_range(&db, &processed, class(1), track(11), 90, 100, 5)
            .unwrap_err();
        assert!(matches!(err, ErrorKind::MissingPrediction { .. }));

        let err = apply_generated_range(&db, &processed, class(1), track(10), 100, 90, 5)
            .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidRange { .. }));
        let err = apply_generated_range(&db, &processed, class(1), track(10), 90, 100, 0)
            .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidRange { .. }));
    }

    #[test]
    fn remove_generated_keeps_observed() {
        let mut db = observed_database();
        db.insert_time(class(1), track(10), 120, 80.0, GENERATED_SAMPLES);
        let (cleaned, removed) = remove_generated(&db);
        assert_eq!(removed, 1);
        assert_eq!(cleaned, observed_database());
    }

    #[test]
    fn reset_is_empty() {
        assert!(reset_all().classes.is_empty());
    }

    #[test]
    fn suggested_ranges() {
        let config = AdaptationConfig::default();
        assert_eq!(suggest_range(100, &config), (98, 102));

        let spaced = AdaptationConfig::builder().ai_spacing(2).ai_num_levels(4).build();
        assert_eq!(suggest_range(100, &spaced), (98, 104));

        assert_eq!(suggest_range(81, &config), (80, 84));
        assert_eq!(suggest_range(119, &config), (116, 120));

        let narrow = AdaptationConfig::builder().min_ai(100).max_ai(102).build();
        assert_eq!(suggest_range(101, &narrow), (100, 102));
    }

    #[test]
    fn prune_player_times() {
        let mut times = PlayerTimes::new();
        *times.track_mut(class(1), track(10)) = PlayerTrack::from_times([95.2, 94.8, 96.1]);
        let snapshot = times.clone();

        let pruned = keep_best_player_time(&times, class(1), track(10));
        let player = pruned.track(class(1), track(10)).unwrap();
        assert_eq!(player.times(), &[94.8]);
        assert_eq!(player.best(), Some(94.8));
        assert!(player_times_changed(&pruned, &snapshot));
        assert!(!player_times_changed(&times, &snapshot));

        let removed = remove_player_time(&times, class(1), track(10), 1).unwrap();
        assert_eq!(removed.track(class(1), track(10)).unwrap().best(), Some(95.2));
        assert!(remove_player_time(&times, class(1), track(10), 3).is_err());
        assert!(remove_player_time(&times, class(2), track(10), 0).is_err());
        assert_eq!(times, snapshot);

        let everywhere = keep_best_player_times_everywhere(&times);
        assert_eq!(everywhere, pruned);
    }
}
