//! Weekly replay playlists from scrobble history.
//!
//! Core modules:
//! - [`compendium`] - Library index: normalization, merge, rebuild
//! - [`matcher`] - Fuzzy title/artist matching against the Compendium
//! - [`scoring`] - Recency, repetition and play-count scoring
//! - [`masterlist`] - Ranking, dedupe and truncation of scored tracks
//! - [`reconciler`] - Replaces the target playlist and verifies each step
//!
//! ### Supporting Modules
//!
//! - [`sources`] - Collaborator traits plus the Last.fm and snapshot implementations
//! - [`retry`] - Bounded mutate/observe retry with an injectable pause
//! - [`storage`] - JSON documents on disk with atomic replacement
//! - [`config`] - Data directory layout, `config.json` and credentials
//! - [`error`] - Typed errors for the collaborator seam
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use replaymix::compendium::Compendium;
//! use replaymix::matcher::CompendiumIndex;
//! use replaymix::masterlist::{build_master_list, BuildOptions};
//! use replaymix::model::{LibraryRecord, ScrobbleRecord, TopTrackRecord};
//! use replaymix::scoring::WeightConfig;
//!
//! let compendium = Compendium::from(vec![
//!     LibraryRecord::new("v1", "Song", &["X"]),
//!     LibraryRecord::new("v2", "Other", &["Y"]),
//! ]);
//! let index = CompendiumIndex::new(&compendium);
//!
//! let now = 1_700_000_000;
//! let top = vec![
//!     TopTrackRecord { title: "Song (feat. Z)".into(), artist: "X & Z".into(), play_count: 10 },
//!     TopTrackRecord { title: "Other".into(), artist: "Y".into(), play_count: 4 },
//! ];
//! let recent = vec![
//!     ScrobbleRecord { title: "Other".into(), artist: "Y".into(), timestamp: now - 60 },
//!     ScrobbleRecord { title: "Song (feat. Z)".into(), artist: "X & Z".into(), timestamp: now - 3600 },
//! ];
//!
//! let options = BuildOptions { weights: WeightConfig::default(), limit: 100, now };
//! let list = build_master_list(&top, &recent, &index, &options);
//! assert_eq!(list.ids(), vec!["v1".to_string(), "v2".to_string()]);
//! ```
//!
//! ## Scoring
//!
//! Each top track gets
//! `w_s * plays / max_plays + w_r * (1 - age / week) + w_p * reps / max_reps`
//! where `reps` is the longest back-to-back run of the title in the last
//! seven days. Tracks with no play inside that window are left out.
//!
//! ## Error Handling
//!
//! Collaborators return [`error::SourceError`]; a playlist pass returns
//! [`error::ReconcileError`]. Everything else, persistence included, uses
//! `anyhow::Result` with context messages. A corrupt Compendium is logged and
//! treated as empty rather than failing the run.

pub mod cli;
pub mod compendium;
pub mod completion;
pub mod config;
pub mod error;
pub mod masterlist;
pub mod matcher;
pub mod model;
pub mod reconciler;
pub mod retry;
pub mod scoring;
pub mod sources;
pub mod storage;
