//! Lap time prediction across AI levels.
//!
//! Each track is fitted on its own: observed (level, time) points go through
//! an ordinary least squares fit and the resulting curve is evaluated at every
//! level of the configured AI range.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AdaptationConfig;
use crate::data::database::{Database, TrackRecord, mean};
use crate::game_types::{ClassId, TrackId};

/// Predicted times are kept inside this multiple of the fastest and slowest
/// observed averages.
const CLAMP_FASTEST: f64 = 0.8;
const CLAMP_SLOWEST: f64 = 1.2;

const SINGULAR_PIVOT: f64 = 1e-12;

/// A polynomial in `level - center`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polynomial {
    pub center: f64,
    /// Lowest order first.
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn evaluate(&self, level: f64) -> f64 {
        let u = level - self.center;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, coefficient| acc * u + coefficient)
    }

    /// First derivative with respect to the level.
    pub fn slope_at(&self, level: f64) -> f64 {
        let u = level - self.center;
        self.coefficients
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (power, coefficient)| acc * u + power as f64 * coefficient)
    }

    /// Least squares fit of the given degree. `None` when the system is singular.
    pub fn fit(points: &[(f64, f64)], degree: usize) -> Option<Self> {
        if points.len() <= degree {
            return None;
        }
        let center = points.iter().map(|(x, _)| x).sum::<f64>() / points.len() as f64;
        let size = degree + 1;

        // Normal equations: A[i][j] = sum(u^(i+j)), b[i] = sum(u^i * y)
        let mut power_sums = vec![0.0; 2 * degree + 1];
        let mut rhs = vec![0.0; size];
        for &(x, y) in points {
            let u = x - center;
            let mut term = 1.0;
            for (power, sum) in power_sums.iter_mut().enumerate() {
                *sum += term;
                if power < size {
                    rhs[power] += term * y;
                }
                term *= u;
            }
        }
        let matrix: Vec<Vec<f64>> = (0..size)
            .map(|row| power_sums[row..row + size].to_vec())
            .collect();

        let coefficients = solve(matrix, rhs)?;
        Some(Self {
            center,
            coefficients,
        })
    }

    /// Whether the curve strictly decreases over `[from, to]`.
    fn decreases_over(&self, from: f64, to: f64) -> bool {
        // The derivative of a polynomial of degree <= 2 is linear, so its
        // endpoints bound it.
        self.degree() <= 2 && self.slope_at(from) < 0.0 && self.slope_at(to) < 0.0
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let size = rhs.len();
    for col in 0..size {
        let pivot = (col..size).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot][col].abs() < SINGULAR_PIVOT {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..size {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..size {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }
    solution.iter().all(|v| v.is_finite()).then_some(solution)
}

/// How well a fit reproduces the observed levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FitQuality {
    pub attempted: usize,
    pub failed: usize,
}

impl FitQuality {
    pub fn failure_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failed as f64 / self.attempted as f64
        }
    }

    /// A fit that was never checked against any level is not reliable.
    pub fn is_reliable(&self, max_fails_pct: f64) -> bool {
        self.attempted > 0 && self.failure_rate() <= max_fails_pct
    }
}

/// Predicted time for every level of the configured range on one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPrediction {
    pub ailevels: BTreeMap<u32, f64>,
    pub model: Polynomial,
    pub quality: FitQuality,
    /// False when too many observed levels deviate from the curve. The
    /// predictions are still usable as best-effort estimates.
    pub reliable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessedClass {
    pub tracks: BTreeMap<TrackId, TrackPrediction>,
}

/// Dense predictions for every class/track that had enough data to fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessedDatabase {
    pub classes: BTreeMap<ClassId, ProcessedClass>,
}

impl ProcessedDatabase {
    pub fn prediction(&self, class: ClassId, track: TrackId) -> Option<&TrackPrediction> {
        self.classes.get(&class)?.tracks.get(&track)
    }

    pub fn unreliable(&self) -> impl Iterator<Item = (ClassId, TrackId, &TrackPrediction)> {
        self.classes.iter().flat_map(|(class, processed)| {
            processed
                .tracks
                .iter()
                .filter(|(_, prediction)| !prediction.reliable)
                .map(move |(track, prediction)| (*class, *track, prediction))
        })
    }
}

/// Fit every track of the database.
pub fn process_database(database: &Database, config: &AdaptationConfig) -> ProcessedDatabase {
    let mut processed = ProcessedDatabase::default();
    for (class_id, class) in &database.classes {
        for (track_id, track) in &class.tracks {
            let Some(prediction) = fit_track(track, config) else {
                continue;
            };
            if !prediction.reliable {
                warn!(
                    class = %class_id,
                    track = %track_id,
                    failure_rate = prediction.quality.failure_rate(),
                    "fit exceeds the allowed failure rate"
                );
            }
            processed
                .classes
                .entry(*class_id)
                .or_default()
                .tracks
                .insert(*track_id, prediction);
        }
    }
    processed
}

/// Fit one track. `None` when the data is too sparse or does not get faster
/// with AI skill.
///
/// "Too sparse" means fewer than two distinct levels, or a spread between the
/// lowest and highest observed level below `test_min_ai_diffs`. The number of
/// distinct levels beyond two is not constrained.
///
/// Quality is checked at every observed level, including levels outside the
/// configured range, against the clamped curve at that level.
pub fn fit_track(track: &TrackRecord, config: &AdaptationConfig) -> Option<TrackPrediction> {
    let observed: Vec<(u32, f64)> = track
        .ailevels
        .iter()
        .filter_map(|(level, times)| Some((*level, mean(times)?)))
        .collect();
    let (&(lowest, _), &(highest, _)) = (observed.first()?, observed.last()?);
    if observed.len() < 2 || highest - lowest < config.test_min_ai_diffs {
        return None;
    }

    let points: Vec<(f64, f64)> = if config.fit_all {
        track
            .ailevels
            .iter()
            .flat_map(|(level, times)| times.iter().map(move |time| (*level as f64, *time)))
            .collect()
    } else {
        observed
            .iter()
            .map(|(level, time)| (*level as f64, *time))
            .collect()
    };

    let linear = Polynomial::fit(&points, 1)?;
    if linear.slope_at(linear.center) > 0.0 {
        debug!("lap times grow with AI level, not fitting");
        return None;
    }

    let span_from = lowest.min(config.min_ai) as f64;
    let span_to = highest.max(config.max_ai) as f64;
    let model = if observed.len() >= 3 {
        Polynomial::fit(&points, 2)
            .filter(|quadratic| quadratic.decreases_over(span_from, span_to))
            .unwrap_or(linear)
    } else {
        linear
    };

    let fastest = observed.iter().map(|(_, t)| *t).fold(f64::INFINITY, f64::min);
    let slowest = observed.iter().map(|(_, t)| *t).fold(f64::NEG_INFINITY, f64::max);
    let (lower, upper) = (fastest * CLAMP_FASTEST, slowest * CLAMP_SLOWEST);
    if !(lower.is_finite() && upper.is_finite() && lower > 0.0 && lower <= upper) {
        return None;
    }

    let predict = |level: u32| model.evaluate(level as f64).clamp(lower, upper);
    let ailevels: BTreeMap<u32, f64> = config
        .ai_range()
        .map(|level| (level, predict(level)))
        .collect();
    if ailevels.is_empty() {
        return None;
    }

    let mut quality = FitQuality::default();
    for (level, time) in &observed {
        let predicted = predict(*level);
        quality.attempted += 1;
        if (predicted - time).abs() / time > config.test_max_time_pct {
            quality.failed += 1;
        }
    }
    let reliable = quality.is_reliable(config.test_max_fails_pct);

    Some(TrackPrediction {
        ailevels,
        model,
        quality,
        reliable,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn track_with(levels: &[(u32, &[f64])]) -> TrackRecord {
        let mut track = TrackRecord::default();
        for (level, times) in levels {
            track.ailevels.insert(*level, times.to_vec());
        }
        track.refresh_bounds();
        track
    }

    #[test]
    fn polynomial_fit_recovers_exact_data() {
        let points: Vec<(f64, f64)> = (0..5)
            .map(|i| {
                let x = 90.0 + i as f64 * 5.0;
                (x, 300.0 - 2.0 * x + 0.005 * x * x)
            })
            .collect();
        let poly = Polynomial::fit(&points, 2).unwrap();
        for (x, y) in &points {
            assert!((poly.evaluate(*x) - y).abs() < 1e-6);
        }
        assert!((poly.slope_at(100.0) - (-2.0 + 0.01 * 100.0)).abs() < 1e-6);
    }

    #[test]
    fn polynomial_fit_needs_enough_points() {
        assert!(Polynomial::fit(&[(1.0, 1.0)], 1).is_none());
        assert!(Polynomial::fit(&[(1.0, 1.0), (1.0, 2.0)], 1).is_none());
    }

    #[test]
    fn predicts_whole_range() {
        let track = track_with(&[(90, &[110.0]), (100, &[100.0]), (110, &[90.0])]);
        let config = AdaptationConfig::default();
        let prediction = fit_track(&track, &config).unwrap();

        assert_eq!(prediction.ailevels.len(), 41);
        assert_eq!(prediction.ailevels.keys().next(), Some(&80));
        assert_eq!(prediction.ailevels.keys().next_back(), Some(&120));
        assert!((prediction.ailevels[&80] - 120.0).abs() < 1e-6);
        assert!((prediction.ailevels[&105] - 95.0).abs() < 1e-6);
        assert!((prediction.ailevels[&120] - 80.0).abs() < 1e-6);
        assert_eq!(prediction.quality, FitQuality { attempted: 3, failed: 0 });
        assert!(prediction.reliable);
    }

    #[test]
    fn predictions_never_increase_with_level() {
        let track = track_with(&[
            (95, &[101.3]),
            (98, &[100.1]),
            (101, &[99.2]),
            (104, &[98.6]),
        ]);
        let prediction = fit_track(&track, &AdaptationConfig::default()).unwrap();
        let times: Vec<f64> = prediction.ailevels.values().copied().collect();
        assert!(times.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn sparse_tracks_are_not_predicted() {
        let config = AdaptationConfig::default();
        assert!(fit_track(&track_with(&[]), &config).is_none());
        assert!(fit_track(&track_with(&[(100, &[90.0, 91.0])]), &config).is_none());
        assert!(fit_track(&track_with(&[(100, &[90.0]), (101, &[89.0])]), &config).is_none());

        let relaxed = AdaptationConfig::builder().test_min_ai_diffs(1).build();
        assert!(fit_track(&track_with(&[(100, &[90.0]), (101, &[89.0])]), &relaxed).is_some());
    }

    #[test]
    fn rejects_times_growing_with_skill() {
        let track = track_with(&[(90, &[90.0]), (100, &[100.0])]);
        assert!(fit_track(&track, &AdaptationConfig::default()).is_none());
    }

    #[test]
    fn clamps_extrapolation() {
        let track = track_with(&[(100, &[100.0]), (102, &[90.0])]);
        let prediction = fit_track(&track, &AdaptationConfig::default()).unwrap();
        assert!((prediction.ailevels[&120] - 72.0).abs() < 1e-9);
        assert!((prediction.ailevels[&80] - 120.0).abs() < 1e-9);
        assert!((prediction.ailevels[&101] - 95.0).abs() < 1e-9);
    }

    #[test]
    fn fit_all_weights_every_sample() {
        let track = track_with(&[
            (90, &[110.0]),
            (100, &[101.0]),
            (105, &[98.0]),
            (110, &[80.0, 100.0, 100.0, 100.0]),
        ]);
        let averaged = fit_track(&track, &AdaptationConfig::default()).unwrap();
        let all = fit_track(&track, &AdaptationConfig::builder().fit_all(true).build()).unwrap();
        assert!((averaged.ailevels[&120] - all.ailevels[&120]).abs() > 1e-6);
    }

    #[test]
    fn noisy_fit_is_flagged() {
        let track = track_with(&[
            (90, &[110.0]),
            (95, &[100.0]),
            (100, &[108.0]),
            (105, &[95.0]),
            (110, &[100.0]),
        ]);
        let prediction = fit_track(&track, &AdaptationConfig::default()).unwrap();
        assert!(prediction.quality.failed > 0);
        assert!(!prediction.reliable);
        assert_eq!(prediction.ailevels.len(), 41);
    }

    #[test]
    fn extrapolated_tracks_are_still_checked() {
        let clean = track_with(&[(60, &[110.0]), (70, &[100.0])]);
        let prediction = fit_track(&clean, &AdaptationConfig::default()).unwrap();
        assert_eq!(prediction.quality, FitQuality { attempted: 2, failed: 0 });
        assert!(prediction.reliable);
        assert!((prediction.ailevels[&80] - 90.0).abs() < 1e-6);
        assert!((prediction.ailevels[&120] - 80.0).abs() < 1e-6);

        let noisy = track_with(&[
            (60, &[110.0]),
            (65, &[100.0]),
            (70, &[108.0]),
            (75, &[95.0]),
        ]);
        let prediction = fit_track(&noisy, &AdaptationConfig::default()).unwrap();
        assert_eq!(prediction.quality.attempted, 4);
        assert!(prediction.quality.failed > 0);
        assert!(!prediction.reliable);
    }

    #[test]
    fn unchecked_fit_is_not_reliable() {
        assert!(!FitQuality::default().is_reliable(0.1));
        assert!(FitQuality { attempted: 10, failed: 1 }.is_reliable(0.1));
        assert!(!FitQuality { attempted: 10, failed: 2 }.is_reliable(0.1));
    }

    #[test]
    fn processes_only_eligible_tracks() {
        let mut db = Database::new();
        db.insert_time(ClassId::new(1), TrackId::new(10), 90, 110.0, 1);
        db.insert_time(ClassId::new(1), TrackId::new(10), 100, 100.0, 1);
        db.insert_time(ClassId::new(1), TrackId::new(11), 100, 90.0, 1);
        db.insert_time(ClassId::new(2), TrackId::new(10), 100, 90.0, 1);

        let processed = process_database(&db, &AdaptationConfig::default());
        assert!(processed.prediction(ClassId::new(1), TrackId::new(10)).is_some());
        assert!(processed.prediction(ClassId::new(1), TrackId::new(11)).is_none());
        assert!(!processed.classes.contains_key(&ClassId::new(2)));
        assert_eq!(processed.unreliable().count(), 0);
    }
}
