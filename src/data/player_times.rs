use std::collections::BTreeMap;

use serde::Serialize;

use crate::game_types::{ClassId, TrackId};

/// The player's best lap times for every class and track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTimes {
    pub classes: BTreeMap<ClassId, PlayerClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerClass {
    pub tracks: BTreeMap<TrackId, PlayerTrack>,
}

/// Recorded lap times for one class/track and their minimum.
///
/// The fields are private so `playertime` can never drift from
/// `min(playertimes)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerTrack {
    playertimes: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    playertime: Option<f64>,
}

impl PlayerTrack {
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> Self {
        let mut track = Self {
            playertimes: times.into_iter().collect(),
            playertime: None,
        };
        track.refresh_best();
        track
    }

    pub fn times(&self) -> &[f64] {
        &self.playertimes
    }

    /// The fastest recorded time, if any.
    pub fn best(&self) -> Option<f64> {
        self.playertime
    }

    pub fn is_empty(&self) -> bool {
        self.playertimes.is_empty()
    }

    /// Append a time unless the exact value is already recorded.
    pub fn push(&mut self, time: f64) -> bool {
        if self.playertimes.contains(&time) {
            return false;
        }
        self.playertimes.push(time);
        self.refresh_best();
        true
    }

    /// Remove the time at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Option<f64> {
        if index >= self.playertimes.len() {
            return None;
        }
        let removed = self.playertimes.remove(index);
        self.refresh_best();
        Some(removed)
    }

    /// Drop every time except the fastest one.
    pub fn retain_best(&mut self) {
        if let Some(best) = self.playertime {
            self.playertimes = vec![best];
        }
    }

    fn refresh_best(&mut self) {
        let mut best: Option<f64> = None;
        for &time in &self.playertimes {
            if best.is_none_or(|current| time < current) {
                best = Some(time);
            }
        }
        self.playertime = best;
    }
}

impl PlayerTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, class: ClassId, track: TrackId) -> Option<&PlayerTrack> {
        self.classes.get(&class)?.tracks.get(&track)
    }

    pub fn track_mut(&mut self, class: ClassId, track: TrackId) -> &mut PlayerTrack {
        self.classes
            .entry(class)
            .or_default()
            .tracks
            .entry(track)
            .or_default()
    }

    /// Compare against a snapshot, entry by entry.
    ///
    /// Any difference in class or track presence, array length, or any
    /// element counts as a change.
    pub fn differs_from(&self, snapshot: &PlayerTimes) -> bool {
        if self.classes.len() != snapshot.classes.len() {
            return true;
        }
        for (class_id, class) in &self.classes {
            let Some(other_class) = snapshot.classes.get(class_id) else {
                return true;
            };
            if class.tracks.len() != other_class.tracks.len() {
                return true;
            }
            for (track_id, track) in &class.tracks {
                let Some(other_track) = other_class.tracks.get(track_id) else {
                    return true;
                };
                if track.playertimes.len() != other_track.playertimes.len()
                    || track
                        .playertimes
                        .iter()
                        .zip(&other_track.playertimes)
                        .any(|(a, b)| a != b)
                {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn best_tracks_minimum() {
        let mut track = PlayerTrack::from_times([95.2, 94.8, 96.1]);
        assert_eq!(track.best(), Some(94.8));

        assert_eq!(track.remove(1), Some(94.8));
        assert_eq!(track.best(), Some(95.2));

        assert_eq!(track.remove(5), None);
        track.remove(0);
        track.remove(0);
        assert!(track.is_empty());
        assert_eq!(track.best(), None);
    }

    #[test]
    fn retain_best_keeps_one_entry() {
        let mut track = PlayerTrack::from_times([95.2, 94.8, 96.1]);
        track.retain_best();
        assert_eq!(track.times(), &[94.8]);
        assert_eq!(track.best(), Some(94.8));
    }

    #[test]
    fn push_skips_duplicates() {
        let mut track = PlayerTrack::default();
        assert!(track.push(90.0));
        assert!(!track.push(90.0));
        assert!(track.push(89.0));
        assert_eq!(track.best(), Some(89.0));
    }

    #[test]
    fn differs_from_snapshot() {
        let mut times = PlayerTimes::new();
        times.track_mut(ClassId::new(1), TrackId::new(10)).push(95.0);
        times.track_mut(ClassId::new(1), TrackId::new(10)).push(96.0);
        let snapshot = times.clone();
        assert!(!times.differs_from(&snapshot));

        let mut shorter = times.clone();
        shorter.track_mut(ClassId::new(1), TrackId::new(10)).remove(1);
        assert!(shorter.differs_from(&snapshot));

        let mut other_track = times.clone();
        other_track.track_mut(ClassId::new(1), TrackId::new(11)).push(80.0);
        assert!(other_track.differs_from(&snapshot));
        assert!(snapshot.differs_from(&other_track));

        let mut other_class = times.clone();
        other_class.classes.remove(&ClassId::new(1));
        other_class.track_mut(ClassId::new(2), TrackId::new(10)).push(95.0);
        other_class.track_mut(ClassId::new(2), TrackId::new(10)).push(96.0);
        assert!(other_class.differs_from(&snapshot));
    }
}
