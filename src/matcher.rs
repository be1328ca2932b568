//! # Match Engine
//!
//! Resolves a scrobbled `(title, artist)` pair to a library id. The two
//! services rarely agree on names, so matching is fuzzy:
//!
//! 1. Each library title is expanded into variants: the raw title, the title
//!    without a trailing `(feat. …)` clause, and the `" - "` segments of both
//!    (covers both `Artist - Title` uploads and `Title - Remix` suffixes).
//! 2. A variant matches when its similarity with the query title (or the
//!    query title minus its own feat clause) exceeds the title threshold.
//! 3. The artist must agree too. A record credited to a single
//!    `"A & B"`-style string is split first; each record artist is compared
//!    with every fragment of the split query artist and with the whole query
//!    artist, and any score above the artist threshold is a match.
//! 4. The first record that passes both checks wins. Library order, then
//!    variant order, is the tie-break; there is no global best-score search.
//!
//! Similarity is `strsim::normalized_levenshtein` on lowercased strings,
//! `1 - edit_distance / longer_len`, scaled to 0..=100 and rounded. This is
//! stricter than an indel ratio (`2 * lcs / (len_a + len_b)`): one inserted
//! character in a six-letter word costs 17 points here instead of 9, so
//! "colour" vs "color" scores 83 and misses the title threshold. The
//! thresholds apply to this metric.

use crate::compendium::Compendium;
use crate::model::LibraryRecord;
use lazy_static::lazy_static;
use log::{trace, warn};
use regex::Regex;
use strsim::normalized_levenshtein;

lazy_static! {
    /// Trailing `(feat. X)` / `[ft. X]` / `(featuring X)` clause.
    static ref FEAT_CLAUSE: Regex =
        Regex::new(r"(?i)\s*[\(\[]\s*(?:feat\.?|ft\.|featuring)\s[^\)\]]*[\)\]]\s*$")
            .expect("feat clause pattern is valid");
    /// Joint-artist separators: `&`, `,` and the word `and`.
    static ref ARTIST_SEPARATOR: Regex =
        Regex::new(r"(?i)\s*(?:&|,|\band\b)\s*").expect("artist separator pattern is valid");
}

const TITLE_SPLIT: &str = " - ";

/// Similarity cut-offs on the 0..=100 scale. A comparison must be strictly
/// greater than the threshold to count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub title: f64,
    pub artist: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            title: 90.0,
            artist: 80.0,
        }
    }
}

/// Case-insensitive similarity ratio in `0.0..=100.0`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    ratio_lowercase(&a.to_lowercase(), &b.to_lowercase())
}

#[inline]
fn ratio_lowercase(a: &str, b: &str) -> f64 {
    (normalized_levenshtein(a, b) * 100.0).round()
}

/// `title` without a trailing feat clause.
#[must_use]
pub fn strip_feat(title: &str) -> &str {
    match FEAT_CLAUSE.find(title) {
        Some(m) => &title[..m.start()],
        None => title,
    }
}

/// Split a joint-artist string on `&`, `,` and `and`. Empty fragments are dropped.
#[must_use]
pub fn split_artists(artist: &str) -> Vec<&str> {
    ARTIST_SEPARATOR
        .split(artist)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn push_unique(variants: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() && !variants.iter().any(|v| v == candidate) {
        variants.push(candidate.to_string());
    }
}

/// Lowercased comparable forms of a library title, in comparison order.
#[must_use]
pub fn title_variants(title: &str) -> Vec<String> {
    let lowered = title.to_lowercase();
    let stripped = strip_feat(&lowered).to_string();

    let mut variants = Vec::with_capacity(4);
    push_unique(&mut variants, &lowered);
    push_unique(&mut variants, &stripped);
    for base in [&lowered, &stripped] {
        if base.contains(TITLE_SPLIT) {
            for segment in base.split(TITLE_SPLIT) {
                push_unique(&mut variants, segment);
            }
        }
    }
    variants
}

#[derive(Debug)]
struct IndexedRecord<'a> {
    record: &'a LibraryRecord,
    titles: Vec<String>,
    artists: Vec<String>,
}

impl<'a> IndexedRecord<'a> {
    fn new(record: &'a LibraryRecord) -> Self {
        let artists = match record.artists.as_slice() {
            [sole] if ARTIST_SEPARATOR.is_match(&sole.name) => split_artists(&sole.name)
                .into_iter()
                .map(str::to_lowercase)
                .collect(),
            many => many.iter().map(|a| a.name.to_lowercase()).collect(),
        };

        Self {
            record,
            titles: title_variants(&record.title),
            artists,
        }
    }
}

/// A query prepared once and compared against every record.
struct Query {
    titles: Vec<String>,
    artist: String,
    artist_fragments: Vec<String>,
}

impl Query {
    fn new(title: &str, artist: &str) -> Self {
        let lowered = title.to_lowercase();
        let mut titles = Vec::with_capacity(2);
        push_unique(&mut titles, &lowered);
        push_unique(&mut titles, strip_feat(&lowered));

        let artist = artist.trim().to_lowercase();
        let artist_fragments = split_artists(&artist).into_iter().map(str::to_string).collect();

        Self {
            titles,
            artist,
            artist_fragments,
        }
    }
}

/// The Compendium prepared for repeated lookups.
#[derive(Debug)]
pub struct CompendiumIndex<'a> {
    entries: Vec<IndexedRecord<'a>>,
    thresholds: MatchThresholds,
}

impl<'a> CompendiumIndex<'a> {
    #[must_use]
    pub fn new(compendium: &'a Compendium) -> Self {
        Self::with_thresholds(compendium, MatchThresholds::default())
    }

    #[must_use]
    pub fn with_thresholds(compendium: &'a Compendium, thresholds: MatchThresholds) -> Self {
        Self {
            entries: compendium.records().iter().map(IndexedRecord::new).collect(),
            thresholds,
        }
    }

    /// The first record whose title and artist both match, if any.
    #[must_use]
    pub fn resolve_record(&self, title: &str, artist: &str) -> Option<&'a LibraryRecord> {
        let query = Query::new(title, artist);

        let found = self
            .entries
            .iter()
            .find(|entry| self.title_matches(entry, &query) && self.artist_matches(entry, &query))
            .map(|entry| entry.record);

        match found {
            Some(record) => trace!("\"{title}\" resolved to {}", record.external_id),
            None => warn!("Could not find the track \"{title}\" in the Compendium."),
        }
        found
    }

    /// The library id for `(title, artist)`, if any.
    #[must_use]
    pub fn resolve(&self, title: &str, artist: &str) -> Option<&'a str> {
        self.resolve_record(title, artist)
            .map(|record| record.external_id.as_str())
    }

    fn title_matches(&self, entry: &IndexedRecord<'_>, query: &Query) -> bool {
        entry.titles.iter().any(|variant| {
            query
                .titles
                .iter()
                .any(|q| ratio_lowercase(variant, q) > self.thresholds.title)
        })
    }

    fn artist_matches(&self, entry: &IndexedRecord<'_>, query: &Query) -> bool {
        let threshold = self.thresholds.artist;
        entry.artists.iter().any(|record_artist| {
            query
                .artist_fragments
                .iter()
                .any(|fragment| ratio_lowercase(record_artist, fragment) > threshold)
                || ratio_lowercase(record_artist, &query.artist) > threshold
        })
    }
}

/// One-shot lookup. Build a [`CompendiumIndex`] instead when resolving many titles.
#[must_use]
pub fn resolve(title: &str, artist: &str, compendium: &Compendium) -> Option<String> {
    CompendiumIndex::new(compendium)
        .resolve(title, artist)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compendium(records: Vec<LibraryRecord>) -> Compendium {
        Compendium::from(records)
    }

    #[test]
    fn test_similarity_is_levenshtein_over_longer_length() {
        // One edit over six characters.
        assert_eq!(similarity("colour", "color"), 83.0);
        assert!(resolve("Colour", "X", &compendium(vec![LibraryRecord::new("c", "Color", &["X"])])).is_none());
        // One edit over twelve characters clears the title threshold.
        assert_eq!(similarity("Hello World", "Hello Worlds"), 92.0);
    }

    #[test]
    fn test_similarity_is_case_insensitive() {
        assert_eq!(similarity("Song", "song"), 100.0);
        assert!(similarity("Song", "Something else") < 50.0);
    }

    #[test]
    fn test_strip_feat_removes_trailing_clause_only() {
        assert_eq!(strip_feat("Song (feat. Y)"), "Song");
        assert_eq!(strip_feat("Song [ft. Y & Z]"), "Song");
        assert_eq!(strip_feat("Song (Featuring Y)"), "Song");
        assert_eq!(strip_feat("Song (Live)"), "Song (Live)");
        assert_eq!(strip_feat("Defeat (Remix)"), "Defeat (Remix)");
    }

    #[test]
    fn test_split_artists_on_all_separators() {
        assert_eq!(split_artists("X & Y"), vec!["X", "Y"]);
        assert_eq!(split_artists("X, Y and Z"), vec!["X", "Y", "Z"]);
        assert_eq!(split_artists("Brandon Flowers"), vec!["Brandon Flowers"]);
    }

    #[test]
    fn test_title_variants_expand_feat_and_hyphen() {
        let variants = title_variants("Artist - Song (feat. Y)");
        assert_eq!(
            variants,
            vec![
                "artist - song (feat. y)".to_string(),
                "artist - song".to_string(),
                "artist".to_string(),
                "song (feat. y)".to_string(),
                "song".to_string(),
            ]
        );
    }

    #[test]
    fn test_feat_query_matches_hyphenated_library_title() {
        let compendium = compendium(vec![LibraryRecord::new("id-remix", "Song - Remix", &["X"])]);
        assert_eq!(
            resolve("Song (feat. Y)", "X", &compendium),
            Some("id-remix".to_string())
        );
    }

    #[test]
    fn test_joint_query_artist_matches_single_record_artist() {
        let compendium = compendium(vec![LibraryRecord::new("id-1", "Song", &["X"])]);
        assert_eq!(resolve("Song", "X & Y", &compendium), Some("id-1".to_string()));
    }

    #[test]
    fn test_joint_record_artist_is_split() {
        let compendium = compendium(vec![LibraryRecord::new("id-1", "Song", &["Alpha & Beta"])]);
        assert_eq!(resolve("Song", "Beta", &compendium), Some("id-1".to_string()));
    }

    #[test]
    fn test_artist_mismatch_is_not_found() {
        let compendium = compendium(vec![LibraryRecord::new("id-1", "Song", &["Somebody"])]);
        assert_eq!(resolve("Song", "Nobody Else", &compendium), None);
    }

    #[test]
    fn test_title_below_threshold_is_not_found() {
        let compendium = compendium(vec![LibraryRecord::new("id-1", "Songs of Love", &["X"])]);
        assert_eq!(resolve("Song of Loss", "X", &compendium), None);
    }

    #[test]
    fn test_first_matching_record_wins() {
        let compendium = compendium(vec![
            LibraryRecord::new("first", "Song", &["X"]),
            LibraryRecord::new("second", "Song", &["X"]),
        ]);
        assert_eq!(resolve("Song", "X", &compendium), Some("first".to_string()));
    }

    #[test]
    fn test_record_without_artists_never_matches() {
        let compendium = compendium(vec![LibraryRecord::new("id-1", "Song", &[])]);
        assert_eq!(resolve("Song", "X", &compendium), None);
    }

    #[test]
    fn test_index_reuses_prepared_records() {
        let compendium = compendium(vec![
            LibraryRecord::new("a", "Alpha", &["X"]),
            LibraryRecord::new("b", "Beta", &["Y"]),
        ]);
        let index = CompendiumIndex::new(&compendium);
        assert_eq!(index.resolve("beta", "y"), Some("b"));
        assert_eq!(index.resolve("ALPHA", "x"), Some("a"));
        assert_eq!(index.resolve("Gamma", "Z"), None);
    }
}
