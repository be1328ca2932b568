//! # MasterList Construction
//!
//! Turns the scrobble snapshots into the ranked list of library ids that the
//! target playlist will hold:
//!
//! 1. Build the [`RecentWindow`] once from the recent scrobbles.
//! 2. Score every top track that was played inside the window; the rest are
//!    reported as unscored.
//! 3. Resolve each scored track to a library id; misses are reported as
//!    unmatched and dropped.
//! 4. Stable-sort by descending score, keep the first occurrence of each id,
//!    truncate to the candidate limit.

use crate::matcher::CompendiumIndex;
use crate::model::{ScoredTrack, ScrobbleRecord, TopTrackRecord};
use crate::scoring::{RecentWindow, ScoringContext, WeightConfig};
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Ranked candidates for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterList {
    pub tracks: Vec<ScoredTrack>,
    /// Scored titles with no Compendium match.
    pub unmatched: Vec<String>,
    /// Top tracks with no play inside the recent window.
    pub unscored: Vec<String>,
}

impl MasterList {
    /// Library ids in rank order.
    pub fn ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.library_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Sort descending by score (ties keep input order), drop repeated ids, truncate.
#[must_use]
pub fn rank_and_dedupe(mut tracks: Vec<ScoredTrack>, limit: usize) -> Vec<ScoredTrack> {
    tracks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut seen = HashSet::new();
    tracks.retain(|track| seen.insert(track.library_id.clone()));
    tracks.truncate(limit);
    tracks
}

/// Inputs that stay fixed across one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub weights: WeightConfig,
    pub limit: usize,
    /// Unix seconds used as "now" by the recency signal.
    pub now: i64,
}

/// Score, match and rank `top` against the recent scrobbles and the index.
pub fn build_master_list(
    top: &[TopTrackRecord],
    recent: &[ScrobbleRecord],
    index: &CompendiumIndex<'_>,
    options: &BuildOptions,
) -> MasterList {
    let window = RecentWindow::new(recent);
    let max_scrobbles = top.iter().map(|t| t.play_count).max().unwrap_or(0);
    let context = ScoringContext::new(options.weights, &window, max_scrobbles, options.now);

    info!("Creating MasterList...");
    let mut master = MasterList::default();
    let mut scored = Vec::with_capacity(top.len());

    for track in top {
        debug!("MasterList - Processing track: {}", track.title);
        let Some(score) = context.score(&track.title, track.play_count) else {
            debug!("\"{}\" was not played in the recent window", track.title);
            master.unscored.push(track.title.clone());
            continue;
        };

        match index.resolve(&track.title, &track.artist) {
            Some(id) => {
                debug!("Track: {} | Score: {score}", track.title);
                scored.push(ScoredTrack {
                    title: track.title.clone(),
                    library_id: id.to_string(),
                    score,
                });
            }
            None => master.unmatched.push(track.title.clone()),
        }
    }

    master.tracks = rank_and_dedupe(scored, options.limit);
    info!(
        "MasterList created: {} tracks, {} unmatched, {} unscored.",
        master.tracks.len(),
        master.unmatched.len(),
        master.unscored.len()
    );
    master
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compendium::Compendium;
    use crate::model::LibraryRecord;

    const NOW: i64 = 1_700_000_000;

    fn scored(title: &str, id: &str, score: f64) -> ScoredTrack {
        ScoredTrack {
            title: title.to_string(),
            library_id: id.to_string(),
            score,
        }
    }

    fn top(title: &str, artist: &str, play_count: u64) -> TopTrackRecord {
        TopTrackRecord {
            title: title.to_string(),
            artist: artist.to_string(),
            play_count,
        }
    }

    fn recent(title: &str, timestamp: i64) -> ScrobbleRecord {
        ScrobbleRecord {
            title: title.to_string(),
            artist: "Artist".to_string(),
            timestamp,
        }
    }

    #[test]
    fn test_rank_and_dedupe_keeps_first_of_tied_duplicates() {
        let ranked = rank_and_dedupe(
            vec![
                scored("low", "a", 0.5),
                scored("first", "b", 0.9),
                scored("second", "b", 0.9),
            ],
            100,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "first");
        assert_eq!(ranked[0].score, 0.9);
        assert_eq!(ranked[1].title, "low");
    }

    #[test]
    fn test_rank_and_dedupe_preserves_input_order_for_ties() {
        let ranked = rank_and_dedupe(
            vec![scored("x", "1", 0.7), scored("y", "2", 0.7), scored("z", "3", 0.7)],
            100,
        );
        let titles: Vec<_> = ranked.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_rank_and_dedupe_truncates_to_limit() {
        let tracks = (0..10)
            .map(|i| scored(&format!("t{i}"), &format!("id{i}"), f64::from(i)))
            .collect();
        let ranked = rank_and_dedupe(tracks, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].library_id, "id9");
    }

    #[test]
    fn test_build_master_list_end_to_end() {
        let compendium = Compendium::from(vec![
            LibraryRecord::new("id-a", "Alpha", &["X"]),
            LibraryRecord::new("id-b", "Beta (feat. Q)", &["Y"]),
        ]);
        let index = CompendiumIndex::new(&compendium);

        let top_tracks = vec![
            top("Alpha", "X", 10),
            top("Beta", "Y", 5),
            top("Gamma", "Z", 4),
            top("Delta", "W", 3),
        ];
        let recent_tracks = vec![
            recent("Beta", NOW - 60),
            recent("Beta", NOW - 120),
            recent("Alpha", NOW - 3_600),
            recent("Gamma", NOW - 7_200),
        ];

        let options = BuildOptions {
            weights: WeightConfig::default(),
            limit: 100,
            now: NOW,
        };
        let master = build_master_list(&top_tracks, &recent_tracks, &index, &options);

        assert_eq!(master.ids(), vec!["id-a".to_string(), "id-b".to_string()]);
        assert_eq!(master.unmatched, vec!["Gamma".to_string()]);
        assert_eq!(master.unscored, vec!["Delta".to_string()]);
        assert!(master.tracks.iter().all(|t| t.score.is_finite()));
        assert!(master.tracks[0].score >= master.tracks[1].score);
    }

    #[test]
    fn test_build_master_list_with_no_recent_plays_is_empty() {
        let compendium = Compendium::from(vec![LibraryRecord::new("id-a", "Alpha", &["X"])]);
        let index = CompendiumIndex::new(&compendium);
        let options = BuildOptions {
            weights: WeightConfig::default(),
            limit: 100,
            now: NOW,
        };

        let master = build_master_list(&[top("Alpha", "X", 10)], &[], &index, &options);
        assert!(master.is_empty());
        assert_eq!(master.unscored.len(), 1);
    }
}
