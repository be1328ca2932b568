//! Track scoring from scrobble signals.
//!
//! Each candidate gets a composite score from three signals:
//!
//! ```text
//! scroVal = scrobbles / maxScrobbles            play count, relative to the top track
//! lpVal   = (now - lastPlayed) / 604800         weeks since last play
//! repVal  = repetitions / maxRepetitions        longest binge, relative to the longest binge
//!
//! score   = w_scrobble * scroVal + w_recency * (1 - lpVal) + w_repetition * repVal
//! ```
//!
//! Weights default to `1.0 / 0.7 / 0.5`. A zero maximum contributes zero
//! rather than dividing by zero, so the score stays finite.

use crate::model::ScrobbleRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Seconds in the seven-day recent window.
pub const WEEK_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Relative weight of each signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub scrobble: f64,
    pub recency: f64,
    pub repetition: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            scrobble: 1.0,
            recency: 0.7,
            repetition: 0.5,
        }
    }
}

/// Raw inputs for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInputs {
    pub scrobbles: u64,
    /// Unix seconds.
    pub last_played: i64,
    pub repetitions: u32,
    pub max_scrobbles: u64,
    pub max_repetitions: u32,
}

#[inline]
fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Composite score for `inputs` at clock reading `now` (unix seconds).
///
/// Pure: the same inputs, weights and `now` always give the same bits.
///
/// ```
/// use replaymix::scoring::{calculate_score, ScoreInputs, WeightConfig};
///
/// let inputs = ScoreInputs {
///     scrobbles: 100,
///     last_played: 1_000_000 - 604_800,
///     repetitions: 10,
///     max_scrobbles: 100,
///     max_repetitions: 10,
/// };
/// let score = calculate_score(&inputs, 1_000_000, &WeightConfig::default());
/// assert!((score - 1.5).abs() < 1e-12);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_score(inputs: &ScoreInputs, now: i64, weights: &WeightConfig) -> f64 {
    let scro_val = ratio(inputs.scrobbles as f64, inputs.max_scrobbles as f64);
    let lp_val = (now - inputs.last_played) as f64 / WEEK_SECONDS as f64;
    let rep_val = ratio(
        f64::from(inputs.repetitions),
        f64::from(inputs.max_repetitions),
    );

    weights.scrobble * scro_val + weights.recency * (1.0 - lp_val) + weights.repetition * rep_val
}

/// Per-title statistics over the recent scrobbles, computed in one pass.
#[derive(Debug, Clone, Default)]
pub struct RecentWindow {
    last_played: HashMap<String, i64>,
    longest_runs: HashMap<String, u32>,
    max_repetitions: u32,
}

impl RecentWindow {
    /// Scan `scrobbles` in the order given.
    ///
    /// `last_played` keeps the timestamp of the *first* occurrence of each
    /// title in that order. The scrobble service lists newest first, which
    /// makes this the most recent play, but no sorting is applied here.
    ///
    /// A run is a stretch of consecutive scrobbles with the exact same title;
    /// any other title ends it. A run that reaches the end of the sequence
    /// counts like any other.
    pub fn new(scrobbles: &[ScrobbleRecord]) -> Self {
        let mut window = Self::default();
        let mut current: Option<(&str, u32)> = None;

        for scrobble in scrobbles {
            window
                .last_played
                .entry(scrobble.title.clone())
                .or_insert(scrobble.timestamp);

            let run = match current {
                Some((title, count)) if title == scrobble.title => count + 1,
                _ => 1,
            };
            current = Some((&scrobble.title, run));

            let best = window.longest_runs.entry(scrobble.title.clone()).or_insert(0);
            *best = (*best).max(run);
            window.max_repetitions = window.max_repetitions.max(run);
        }

        window
    }

    #[must_use]
    pub fn last_played(&self, title: &str) -> Option<i64> {
        self.last_played.get(title).copied()
    }

    /// Longest run for `title`; zero when it was never scrobbled.
    #[must_use]
    pub fn repetitions(&self, title: &str) -> u32 {
        self.longest_runs.get(title).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn max_repetitions(&self) -> u32 {
        self.max_repetitions
    }
}

/// Weights plus the window-wide maxima shared by every candidate in a pass.
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    pub weights: WeightConfig,
    pub window: &'a RecentWindow,
    pub max_scrobbles: u64,
    pub now: i64,
}

impl<'a> ScoringContext<'a> {
    pub fn new(weights: WeightConfig, window: &'a RecentWindow, max_scrobbles: u64, now: i64) -> Self {
        Self {
            weights,
            window,
            max_scrobbles,
            now,
        }
    }

    /// Score `title`, or `None` when it has no play inside the recent window.
    #[must_use]
    pub fn score(&self, title: &str, scrobbles: u64) -> Option<f64> {
        let last_played = self.window.last_played(title)?;
        let inputs = ScoreInputs {
            scrobbles,
            last_played,
            repetitions: self.window.repetitions(title),
            max_scrobbles: self.max_scrobbles,
            max_repetitions: self.window.max_repetitions(),
        };
        Some(calculate_score(&inputs, self.now, &self.weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn scrobble(title: &str, timestamp: i64) -> ScrobbleRecord {
        ScrobbleRecord {
            title: title.to_string(),
            artist: "Artist".to_string(),
            timestamp,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_half_plays_played_just_now() {
        let inputs = ScoreInputs {
            scrobbles: 50,
            last_played: NOW,
            repetitions: 0,
            max_scrobbles: 100,
            max_repetitions: 10,
        };
        // 1.0 * 0.5 + 0.7 * (1 - 0) + 0.5 * 0
        assert_close(calculate_score(&inputs, NOW, &WeightConfig::default()), 1.2);
    }

    #[test]
    fn test_top_track_played_a_week_ago() {
        let inputs = ScoreInputs {
            scrobbles: 100,
            last_played: NOW - WEEK_SECONDS,
            repetitions: 10,
            max_scrobbles: 100,
            max_repetitions: 10,
        };
        assert_close(calculate_score(&inputs, NOW, &WeightConfig::default()), 1.5);
    }

    #[test]
    fn test_zero_maxima_keep_score_finite() {
        let inputs = ScoreInputs {
            scrobbles: 0,
            last_played: NOW,
            repetitions: 0,
            max_scrobbles: 0,
            max_repetitions: 0,
        };
        let score = calculate_score(&inputs, NOW, &WeightConfig::default());
        assert!(score.is_finite());
        assert_close(score, 0.7);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let inputs = ScoreInputs {
            scrobbles: 7,
            last_played: NOW - 12_345,
            repetitions: 3,
            max_scrobbles: 31,
            max_repetitions: 4,
        };
        let weights = WeightConfig::default();
        let a = calculate_score(&inputs, NOW, &weights);
        let b = calculate_score(&inputs, NOW, &weights);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_recent_window_first_occurrence_wins() {
        // Deliberately not newest-first: the first entry still wins.
        let window = RecentWindow::new(&[
            scrobble("A", NOW - 500),
            scrobble("B", NOW - 400),
            scrobble("A", NOW - 10),
        ]);
        assert_eq!(window.last_played("A"), Some(NOW - 500));
        assert_eq!(window.last_played("B"), Some(NOW - 400));
        assert_eq!(window.last_played("C"), None);
    }

    #[test]
    fn test_recent_window_longest_run() {
        let window = RecentWindow::new(&[
            scrobble("A", 10),
            scrobble("A", 9),
            scrobble("B", 8),
            scrobble("A", 7),
            scrobble("A", 6),
            scrobble("A", 5),
            scrobble("B", 4),
        ]);
        assert_eq!(window.repetitions("A"), 3);
        assert_eq!(window.repetitions("B"), 1);
        assert_eq!(window.repetitions("C"), 0);
        assert_eq!(window.max_repetitions(), 3);
    }

    #[test]
    fn test_recent_window_counts_trailing_run() {
        let window = RecentWindow::new(&[scrobble("B", 3), scrobble("A", 2), scrobble("A", 1)]);
        assert_eq!(window.repetitions("A"), 2);
        assert_eq!(window.max_repetitions(), 2);
    }

    #[test]
    fn test_run_matching_is_case_sensitive() {
        let window = RecentWindow::new(&[scrobble("Song", 2), scrobble("song", 1)]);
        assert_eq!(window.repetitions("Song"), 1);
        assert_eq!(window.repetitions("song"), 1);
    }

    #[test]
    fn test_context_skips_titles_outside_window() {
        let window = RecentWindow::new(&[scrobble("A", NOW)]);
        let context = ScoringContext::new(WeightConfig::default(), &window, 10, NOW);
        assert!(context.score("A", 10).is_some());
        assert!(context.score("Z", 10).is_none());
    }
}
