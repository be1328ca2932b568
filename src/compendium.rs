//! # Compendium Builder
//!
//! The Compendium is the deduplicated index of every track the user has in a
//! library playlist or in their history, stored as `ytm_compendium.json`.
//!
//! ## Rebuild
//!
//! ```text
//! load existing ─▶ list playlists ─▶ for each: fetch ─▶ normalize ─▶ merge
//!                                  └▶ fetch history ─▶ normalize ─▶ merge ─▶ atomic write
//! ```
//!
//! Every collaborator call happens before the single write at the end, so a
//! failed fetch leaves the stored Compendium exactly as it was.
//!
//! ## Deduplication
//!
//! [`DedupeMode::Exact`] skips a record only when an identical one is already
//! present. [`DedupeMode::Editions`] additionally skips a record whose title
//! (case-sensitive) and artist-name set match an existing record with a
//! different id: remasters, re-uploads and single/album duplicates collapse to
//! the first one seen. The edition check runs against every record in the
//! Compendium, including ones appended earlier in the same merge.

use crate::model::{LibraryRecord, RawTrack};
use crate::sources::LibraryIndexSource;
use crate::storage;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// How [`Compendium::merge`] decides that an incoming record is a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupeMode {
    /// Only exact value equality counts.
    #[default]
    Exact,
    /// Exact equality, or same title and artist set under another id.
    Editions,
}

impl DedupeMode {
    pub const fn from_flag(dedupe_across_editions: bool) -> Self {
        if dedupe_across_editions {
            Self::Editions
        } else {
            Self::Exact
        }
    }
}

/// Ordered, deduplicated list of library records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Compendium {
    records: Vec<LibraryRecord>,
}

type EditionKey = (String, BTreeSet<String>);

fn edition_key(record: &LibraryRecord) -> EditionKey {
    (
        record.title.clone(),
        record.artists.iter().map(|a| a.name.clone()).collect(),
    )
}

impl Compendium {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; missing, empty and corrupt files all give an empty Compendium.
    ///
    /// Entries are read as raw payloads and normalized one by one, so a stored
    /// record with a null id or blank title is dropped instead of discarding
    /// the whole file.
    pub fn load(path: &Path) -> Self {
        match storage::load_json::<Vec<RawTrack>>(path).into_option(path) {
            Some(raw) => {
                let records = normalize_all(&raw);
                if records.len() < raw.len() {
                    warn!(
                        "Skipped {} unusable entries in {}",
                        raw.len() - records.len(),
                        path.display()
                    );
                }
                Self { records }
            }
            None => {
                info!("Compendium was empty.");
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::save_json_atomic(&self.records, path)
            .with_context(|| format!("Failed to write Compendium to {}", path.display()))
    }

    pub fn records(&self) -> &[LibraryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append every incoming record that isn't a duplicate under `mode`.
    /// Returns how many records were added.
    pub fn merge<I>(&mut self, incoming: I, mode: DedupeMode) -> usize
    where
        I: IntoIterator<Item = LibraryRecord>,
    {
        let mut exact: HashSet<LibraryRecord> = self.records.iter().cloned().collect();
        let mut editions: HashMap<EditionKey, Vec<String>> = HashMap::new();
        if mode == DedupeMode::Editions {
            for record in &self.records {
                editions
                    .entry(edition_key(record))
                    .or_default()
                    .push(record.external_id.clone());
            }
        }

        let mut added = 0;
        for record in incoming {
            if exact.contains(&record) {
                continue;
            }

            if mode == DedupeMode::Editions {
                let key = edition_key(&record);
                let ids = editions.entry(key).or_default();
                if ids.iter().any(|id| *id != record.external_id) {
                    debug!(
                        "Skipping alternate edition {} of \"{}\"",
                        record.external_id, record.title
                    );
                    continue;
                }
                ids.push(record.external_id.clone());
            }

            exact.insert(record.clone());
            self.records.push(record);
            added += 1;
        }
        added
    }
}

impl From<Vec<LibraryRecord>> for Compendium {
    fn from(records: Vec<LibraryRecord>) -> Self {
        Self { records }
    }
}

/// Merge `incoming` into a copy of `existing`.
#[must_use]
pub fn merge(existing: &Compendium, incoming: Vec<LibraryRecord>, mode: DedupeMode) -> Compendium {
    let mut merged = existing.clone();
    merged.merge(incoming, mode);
    merged
}

/// Project a raw payload onto `{id, title, artists}`.
///
/// Returns `None` for entries without an id or with a blank title (unavailable
/// uploads, removed videos); those can never be matched or added back.
#[must_use]
pub fn normalize(raw: &RawTrack) -> Option<LibraryRecord> {
    let external_id = raw.video_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
    let title = raw.title.as_deref().filter(|t| !t.trim().is_empty())?;

    let artists = raw
        .artists
        .iter()
        .flatten()
        .filter_map(|artist| artist.name.clone())
        .map(crate::model::Artist::new)
        .collect();

    Some(LibraryRecord {
        external_id: external_id.to_string(),
        title: title.to_string(),
        artists,
    })
}

/// Normalize a whole payload list, logging what gets dropped.
pub fn normalize_all(raw: &[RawTrack]) -> Vec<LibraryRecord> {
    raw.iter()
        .filter_map(|track| {
            let record = normalize(track);
            if record.is_none() {
                debug!(
                    "Dropping unplayable entry {:?} ({:?})",
                    track.title, track.video_id
                );
            }
            record
        })
        .collect()
}

/// Counts from one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub playlists: usize,
    pub previous_len: usize,
    pub len: usize,
}

impl RebuildReport {
    pub fn added(&self) -> usize {
        self.len.saturating_sub(self.previous_len)
    }
}

/// Rebuilds the stored Compendium from a library source.
pub struct CompendiumBuilder<'a, L: LibraryIndexSource + ?Sized> {
    source: &'a L,
    path: PathBuf,
    mode: DedupeMode,
}

impl<'a, L: LibraryIndexSource + ?Sized> CompendiumBuilder<'a, L> {
    pub fn new(source: &'a L, path: impl Into<PathBuf>, mode: DedupeMode) -> Self {
        Self {
            source,
            path: path.into(),
            mode,
        }
    }

    /// Fetch every playlist and the history, merge them into the stored
    /// Compendium and write the result.
    pub fn rebuild(&self) -> Result<RebuildReport> {
        let mut compendium = Compendium::load(&self.path);
        let previous_len = compendium.len();

        let playlists = self
            .source
            .list_playlists()
            .context("Failed to list library playlists")?;

        info!("Loading playlists into compendium...");
        for playlist in &playlists {
            debug!("Evaluating playlist {}", playlist.title);
            let tracks = self
                .source
                .playlist_tracks(&playlist.id)
                .with_context(|| format!("Failed to fetch playlist \"{}\"", playlist.title))?;
            let added = compendium.merge(normalize_all(&tracks), self.mode);
            debug!("Playlist \"{}\" contributed {added} new tracks", playlist.title);
        }

        let history = self.source.history().context("Failed to fetch history")?;
        let added = compendium.merge(normalize_all(&history), self.mode);
        debug!("History contributed {added} new tracks");

        compendium.save(&self.path)?;
        info!("Compendium updated: {} tracks.", compendium.len());

        Ok(RebuildReport {
            playlists: playlists.len(),
            previous_len,
            len: compendium.len(),
        })
    }
}
