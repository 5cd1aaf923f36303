use std::collections::BTreeMap;

use serde::Serialize;

use crate::game_types::{ClassId, TrackId};

/// Sample count stored for levels produced by the prediction engine.
pub const GENERATED_SAMPLES: u32 = 0;

/// Sample count assumed when the source data does not state one.
pub const DEFAULT_SAMPLES: u32 = 1;

/// AI lap times for every class and track seen so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Database {
    pub classes: BTreeMap<ClassId, ClassRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ai: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ai: Option<u32>,
    pub tracks: BTreeMap<TrackId, TrackRecord>,
}

/// Lap times of one class on one track, keyed by AI level.
///
/// `min_ai`/`max_ai` always mirror the keys of `ailevels`; every mutating
/// method recomputes them before returning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_ai: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ai: Option<u32>,
    pub ailevels: BTreeMap<u32, Vec<f64>>,
    /// Races contributing to each level. Absent means one observed race,
    /// [`GENERATED_SAMPLES`] marks a generated level.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub samples_count: BTreeMap<u32, u32>,
}

impl TrackRecord {
    /// Record a lap time at `level`.
    ///
    /// An exact duplicate of a time already stored at that level is ignored
    /// and `false` is returned, so merging the same file twice is a no-op.
    pub fn insert_time(&mut self, level: u32, time: f64, samples: u32) -> bool {
        let times = self.ailevels.entry(level).or_default();
        if times.contains(&time) {
            return false;
        }
        let is_new_level = times.is_empty();
        times.push(time);

        let count = match self.samples_count.get(&level).copied() {
            _ if is_new_level => samples,
            Some(GENERATED_SAMPLES) => samples,
            Some(existing) if samples == GENERATED_SAMPLES => existing,
            Some(existing) => existing + samples,
            None if samples == GENERATED_SAMPLES => DEFAULT_SAMPLES,
            None => DEFAULT_SAMPLES + samples,
        };
        self.samples_count.insert(level, count);
        self.refresh_bounds();
        true
    }

    /// Remove a level and its sample count. Returns whether it existed.
    pub fn remove_level(&mut self, level: u32) -> bool {
        let removed = self.ailevels.remove(&level).is_some();
        self.samples_count.remove(&level);
        self.refresh_bounds();
        removed
    }

    /// Keep only levels for which `keep` returns true. Returns how many were removed.
    pub fn retain_levels(&mut self, mut keep: impl FnMut(u32, &[f64], Option<u32>) -> bool) -> usize {
        let before = self.ailevels.len();
        let samples = &self.samples_count;
        self.ailevels
            .retain(|level, times| keep(*level, times, samples.get(level).copied()));
        let ailevels = &self.ailevels;
        self.samples_count.retain(|level, _| ailevels.contains_key(level));
        self.refresh_bounds();
        before - self.ailevels.len()
    }

    /// Replace every level with the given `(level, time, samples)` entries.
    pub fn replace_levels(&mut self, entries: impl IntoIterator<Item = (u32, f64, u32)>) {
        self.ailevels.clear();
        self.samples_count.clear();
        for (level, time, samples) in entries {
            self.ailevels.insert(level, vec![time]);
            self.samples_count.insert(level, samples);
        }
        self.refresh_bounds();
    }

    /// Mean of the times stored at `level`.
    pub fn average(&self, level: u32) -> Option<f64> {
        self.ailevels.get(&level).and_then(|times| mean(times))
    }

    /// Stored sample count at `level`, defaulting to one observed race.
    pub fn samples(&self, level: u32) -> u32 {
        self.samples_count
            .get(&level)
            .copied()
            .unwrap_or(DEFAULT_SAMPLES)
    }

    pub fn is_generated(&self, level: u32) -> bool {
        self.samples_count.get(&level) == Some(&GENERATED_SAMPLES)
    }

    pub fn is_empty(&self) -> bool {
        self.ailevels.is_empty()
    }

    pub fn refresh_bounds(&mut self) {
        self.min_ai = self.ailevels.keys().next().copied();
        self.max_ai = self.ailevels.keys().next_back().copied();
    }
}

impl ClassRecord {
    pub fn track(&self, track: TrackId) -> Option<&TrackRecord> {
        self.tracks.get(&track)
    }

    /// Recompute the class bounds over every track's levels.
    pub fn refresh_bounds(&mut self) {
        self.min_ai = self.tracks.values().filter_map(|t| t.min_ai).min();
        self.max_ai = self.tracks.values().filter_map(|t| t.max_ai).max();
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, class: ClassId, track: TrackId) -> Option<&TrackRecord> {
        self.classes.get(&class)?.tracks.get(&track)
    }

    /// Record a lap time, keeping both the track and the class bounds current.
    pub fn insert_time(
        &mut self,
        class: ClassId,
        track: TrackId,
        level: u32,
        time: f64,
        samples: u32,
    ) -> bool {
        let record = self.classes.entry(class).or_default();
        let added = record
            .tracks
            .entry(track)
            .or_default()
            .insert_time(level, time, samples);
        record.refresh_bounds();
        added
    }

    /// Remove a level from one track, keeping both scopes' bounds current.
    pub fn remove_level(&mut self, class: ClassId, track: TrackId, level: u32) -> bool {
        let Some(record) = self.classes.get_mut(&class) else {
            return false;
        };
        let removed = record
            .tracks
            .get_mut(&track)
            .is_some_and(|t| t.remove_level(level));
        record.refresh_bounds();
        removed
    }

    /// Raw access to a class/track record, creating empty records on the way.
    ///
    /// Class bounds are not refreshed; callers edit through the record and
    /// then call [`ClassRecord::refresh_bounds`] or [`Database::refresh_bounds`].
    pub(crate) fn track_mut(&mut self, class: ClassId, track: TrackId) -> &mut TrackRecord {
        self.classes
            .entry(class)
            .or_default()
            .tracks
            .entry(track)
            .or_default()
    }

    /// Recompute track and class bounds everywhere.
    pub fn refresh_bounds(&mut self) {
        for class in self.classes.values_mut() {
            for track in class.tracks.values_mut() {
                track.refresh_bounds();
            }
            class.refresh_bounds();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes
            .values()
            .all(|class| class.tracks.values().all(TrackRecord::is_empty))
    }

    pub fn summary(&self) -> DatabaseSummary {
        let mut summary = DatabaseSummary::default();
        for class in self.classes.values() {
            let mut class_has_levels = false;
            for track in class.tracks.values() {
                if track.is_empty() {
                    continue;
                }
                class_has_levels = true;
                summary.tracks += 1;
                for level in track.ailevels.keys() {
                    summary.levels += 1;
                    if track.is_generated(*level) {
                        summary.generated_levels += 1;
                    }
                }
            }
            if class_has_levels {
                summary.classes += 1;
            }
        }
        summary
    }
}

/// Counts over the non-empty parts of a [`Database`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseSummary {
    pub classes: usize,
    pub tracks: usize,
    pub levels: usize,
    pub generated_levels: usize,
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_bounds(track: &TrackRecord) {
        assert_eq!(track.min_ai, track.ailevels.keys().min().copied());
        assert_eq!(track.max_ai, track.ailevels.keys().max().copied());
    }

    #[test]
    fn bounds_follow_inserts_and_removals() {
        let mut track = TrackRecord::default();
        assert_bounds(&track);

        let steps: [(bool, u32); 8] = [
            (true, 100),
            (true, 90),
            (true, 110),
            (false, 90),
            (true, 95),
            (false, 110),
            (false, 100),
            (false, 95),
        ];
        for (insert, level) in steps {
            if insert {
                track.insert_time(level, 100.0 + level as f64, 1);
            } else {
                track.remove_level(level);
            }
            assert_bounds(&track);
        }
        assert!(track.min_ai.is_none());
        assert!(track.max_ai.is_none());
    }

    #[test]
    fn duplicate_times_are_skipped() {
        let mut track = TrackRecord::default();
        assert!(track.insert_time(100, 90.5, 1));
        assert!(!track.insert_time(100, 90.5, 1));
        assert!(track.insert_time(100, 91.5, 2));
        assert_eq!(track.ailevels[&100], vec![90.5, 91.5]);
        assert_eq!(track.samples(100), 3);
        assert_eq!(track.average(100), Some(91.0));
    }

    #[test]
    fn observed_data_clears_generated_marker() {
        let mut track = TrackRecord::default();
        track.insert_time(100, 90.0, GENERATED_SAMPLES);
        assert!(track.is_generated(100));
        track.insert_time(100, 89.0, 2);
        assert!(!track.is_generated(100));
        assert_eq!(track.samples(100), 2);
    }

    #[test]
    fn class_bounds_span_tracks() {
        let mut db = Database::new();
        let (class, t10, t11) = (ClassId::new(1), TrackId::new(10), TrackId::new(11));
        assert!(db.insert_time(class, t10, 95, 80.0, 1));
        let record = &db.classes[&class];
        assert_eq!(record.min_ai, Some(95));
        assert_eq!(record.max_ai, Some(95));

        db.insert_time(class, t11, 105, 70.0, 1);
        let record = &db.classes[&class];
        assert_eq!(record.min_ai, Some(95));
        assert_eq!(record.max_ai, Some(105));

        assert!(db.remove_level(class, t10, 95));
        assert_eq!(db.classes[&class].min_ai, Some(105));
        assert!(!db.remove_level(class, t10, 95));
        assert!(!db.remove_level(ClassId::new(9), t10, 95));

        assert!(db.remove_level(class, t11, 105));
        let record = &db.classes[&class];
        assert_eq!(record.min_ai, None);
        assert_eq!(record.max_ai, None);
        assert!(db.is_empty());
    }

    #[test]
    fn retain_drops_sample_counts_too() {
        let mut track = TrackRecord::default();
        track.insert_time(90, 100.0, GENERATED_SAMPLES);
        track.insert_time(95, 99.0, 3);
        let removed = track.retain_levels(|_, _, samples| samples != Some(GENERATED_SAMPLES));
        assert_eq!(removed, 1);
        assert!(!track.samples_count.contains_key(&90));
        assert_eq!(track.min_ai, Some(95));
    }

    #[test]
    fn summary_counts() {
        let mut db = Database::new();
        db.insert_time(ClassId::new(1), TrackId::new(10), 95, 80.0, 1);
        db.insert_time(ClassId::new(1), TrackId::new(10), 96, 79.0, 0);
        db.track_mut(ClassId::new(2), TrackId::new(10));
        let summary = db.summary();
        assert_eq!(
            summary,
            DatabaseSummary {
                classes: 1,
                tracks: 1,
                levels: 2,
                generated_levels: 1
            }
        );
    }
}
