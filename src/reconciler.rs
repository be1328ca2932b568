//! # Playlist Reconciler
//!
//! Replaces the target playlist's contents with the MasterList, in rank order.
//!
//! ```text
//! FETCH_CURRENT ─▶ BUILD_MASTERLIST ─▶ CLEAR ─▶ VERIFY_CLEAR ─▶ WRITE ─▶ VERIFY_WRITE ─▶ DONE
//!                                        ▲            │           ▲            │
//!                                        └── retry ───┘           └── retry ───┘
//! ```
//!
//! Every step is a blocking call and nothing overlaps. Because the playlist
//! service is eventually consistent, each mutation is followed by a fixed
//! pause and a verifying read; a mutation that never shows up is retried up
//! to the policy's bound and then reported as a [`ReconcileError`].
//!
//! Content is replaced, never merged: prior entries are removed before the
//! new ids are added.

use crate::compendium::Compendium;
use crate::error::ReconcileError;
use crate::masterlist::{build_master_list, BuildOptions, MasterList};
use crate::matcher::CompendiumIndex;
use crate::model::PlaylistItem;
use crate::retry::{Attempted, Pause, RetryPolicy};
use crate::scoring::{WeightConfig, WEEK_SECONDS};
use crate::sources::{LibraryIndexSource, Period, ScrobbleSource};
use log::{debug, error, info, warn};
use std::fmt;

/// Reconciliation stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchCurrent,
    BuildMasterList,
    Clear,
    VerifyClear,
    Write,
    VerifyWrite,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchCurrent => "FETCH_CURRENT",
            Self::BuildMasterList => "BUILD_MASTERLIST",
            Self::Clear => "CLEAR",
            Self::VerifyClear => "VERIFY_CLEAR",
            Self::Write => "WRITE",
            Self::VerifyWrite => "VERIFY_WRITE",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Everything a pass needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub playlist_id: String,
    pub period: Period,
    /// Top-tracks fetch size and MasterList cap.
    pub limit: usize,
    pub weights: WeightConfig,
    pub retry: RetryPolicy,
    /// Unix seconds; anchors both the recent window and the recency signal.
    pub now: i64,
}

/// What a finished pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub removed: usize,
    pub added: usize,
    pub clear_attempts: u32,
    pub write_attempts: u32,
    pub master_list: MasterList,
}

pub struct Reconciler<'a, L: LibraryIndexSource + ?Sized, S: ScrobbleSource + ?Sized> {
    library: &'a L,
    scrobbles: &'a S,
    pause: &'a dyn Pause,
    options: ReconcileOptions,
}

impl<'a, L, S> Reconciler<'a, L, S>
where
    L: LibraryIndexSource + ?Sized,
    S: ScrobbleSource + ?Sized,
{
    pub fn new(library: &'a L, scrobbles: &'a S, pause: &'a dyn Pause, options: ReconcileOptions) -> Self {
        Self {
            library,
            scrobbles,
            pause,
            options,
        }
    }

    fn enter(phase: Phase) {
        debug!("Playlist Recreation - {phase}");
    }

    /// Run one full pass against `compendium`.
    pub fn run(&self, compendium: &Compendium) -> Result<ReconcileSummary, ReconcileError> {
        info!("Playlist Recreation started.");
        let playlist_id = self.options.playlist_id.as_str();

        Self::enter(Phase::FetchCurrent);
        let current = self.library.playlist_items(playlist_id)?;
        debug!("Playlist {playlist_id} currently holds {} items", current.len());

        Self::enter(Phase::BuildMasterList);
        let master_list = self.build(compendium)?;

        let mut summary = ReconcileSummary {
            removed: current.len(),
            ..ReconcileSummary::default()
        };

        summary.clear_attempts = self.clear(playlist_id, current)?;

        let ids = master_list.ids();
        if ids.is_empty() {
            warn!("MasterList is empty; leaving playlist {playlist_id} empty.");
        } else {
            summary.write_attempts = self.write(playlist_id, &ids)?;
            summary.added = ids.len();
        }

        summary.master_list = master_list;
        Self::enter(Phase::Done);
        info!("Playlist Recreation finished.");
        Ok(summary)
    }

    /// Fetch the scrobble snapshots and rank them against the Compendium.
    pub fn build(&self, compendium: &Compendium) -> Result<MasterList, ReconcileError> {
        info!("Fetching top tracks from Last.FM...");
        let top = self
            .scrobbles
            .top_tracks(self.options.period, self.options.limit)?;

        info!("Fetching recent tracks from Last.FM...");
        let since = self.options.now - WEEK_SECONDS;
        let recent = self.scrobbles.recent_tracks(since, None)?;

        let index = CompendiumIndex::new(compendium);
        let options = BuildOptions {
            weights: self.options.weights,
            limit: self.options.limit,
            now: self.options.now,
        };
        Ok(build_master_list(&top, &recent, &index, &options))
    }

    /// Remove `current` and wait until the playlist reads back empty.
    /// Returns the number of remove calls issued.
    fn clear(&self, playlist_id: &str, current: Vec<PlaylistItem>) -> Result<u32, ReconcileError> {
        Self::enter(Phase::Clear);
        if current.is_empty() {
            debug!("Playlist {playlist_id} is already empty; nothing to remove.");
            return Ok(0);
        }

        info!("Removing current tracks from the playlist. (Playlist was not empty.)");
        let outcome = self.options.retry.run(
            self.pause,
            |attempt, leftover: Option<&Vec<PlaylistItem>>| {
                let items = leftover.unwrap_or(&current);
                if attempt > 1 {
                    warn!("{} items survived the last removal. Retrying...", items.len());
                }
                self.library.remove_items(playlist_id, items)
            },
            || {
                Self::enter(Phase::VerifyClear);
                self.library.playlist_items(playlist_id)
            },
            Vec::is_empty,
        )?;

        match outcome {
            Attempted::Observed { attempts, .. } => Ok(attempts),
            Attempted::Exhausted { last, attempts } => {
                error!("Playlist {playlist_id} could not be cleared.");
                Err(ReconcileError::ClearNotObserved {
                    playlist_id: playlist_id.to_string(),
                    remaining: last.len(),
                    attempts,
                })
            }
        }
    }

    /// Add `ids` and wait until the playlist reads back non-empty.
    /// Returns the number of add calls issued.
    fn write(&self, playlist_id: &str, ids: &[String]) -> Result<u32, ReconcileError> {
        info!("Adding new tracks to the playlist.");
        let outcome = self.options.retry.run(
            self.pause,
            |attempt, _| {
                Self::enter(Phase::Write);
                if attempt > 1 {
                    error!("Playlist is empty. Retrying...");
                }
                self.library.add_items(playlist_id, ids)
            },
            || {
                Self::enter(Phase::VerifyWrite);
                self.library.playlist_items(playlist_id)
            },
            |items: &Vec<PlaylistItem>| !items.is_empty(),
        )?;

        match outcome {
            Attempted::Observed { attempts, .. } => Ok(attempts),
            Attempted::Exhausted { attempts, .. } => Err(ReconcileError::WriteNotObserved {
                playlist_id: playlist_id.to_string(),
                attempts,
            }),
        }
    }
}
