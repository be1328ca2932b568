//! # Configuration Module
//!
//! Data directory layout and the two configuration documents.
//!
//! ## Data Storage
//!
//! ReplayMix keeps everything in one directory, by default the platform data
//! directory:
//! - Linux: `~/.local/share/replaymix/`
//! - macOS: `~/Library/Application Support/replaymix/`
//! - Windows: `%APPDATA%\replaymix\`
//!
//! | File | Contents |
//! |---|---|
//! | `config.json` | [`Config`] |
//! | `lastfmcreds.json` | [`LastFmCredentials`] |
//! | `ytm_compendium.json` | the Compendium |
//! | `library.json` | library snapshot (default name, see [`Config::library_snapshot`]) |

use crate::compendium::DedupeMode;
use crate::retry::RetryPolicy;
use crate::scoring::WeightConfig;
use crate::sources::Period;
use crate::storage::{self, LoadOutcome};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const CREDENTIALS_FILE: &str = "lastfmcreds.json";
pub const COMPENDIUM_FILE: &str = "ytm_compendium.json";
pub const DEFAULT_SNAPSHOT_FILE: &str = "library.json";

/// Returns the platform data directory for ReplayMix, creating it if needed.
///
/// # Errors
///
/// Fails when the platform has no data directory or it cannot be created.
pub fn default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow!(
            "Could not determine system data directory. Pass --data-dir or set REPLAYMIX_DATA_DIR."
        )
    })?;
    ensure_dir(&data_dir.join("replaymix"))
}

/// Create `dir` (and parents) and return it.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| {
        format!(
            "Failed to create ReplayMix data directory at {}. Please check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir.to_path_buf())
}

/// Paths of every file in one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn credentials(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    pub fn compendium(&self) -> PathBuf {
        self.root.join(COMPENDIUM_FILE)
    }

    /// Resolve the snapshot path from `config`; relative names live in the data directory.
    pub fn snapshot(&self, config: &Config) -> PathBuf {
        if config.library_snapshot.is_absolute() {
            config.library_snapshot.clone()
        } else {
            self.root.join(&config.library_snapshot)
        }
    }
}

fn default_limit() -> usize {
    100
}

fn default_settle_seconds() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    5
}

fn default_snapshot() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_FILE)
}

/// Run configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Playlist whose contents get replaced.
    #[serde(alias = "ytPlaylistId")]
    pub target_playlist_id: String,
    /// Collapse alternate editions when building the Compendium.
    #[serde(default)]
    pub dedupe_across_editions: bool,
    /// Top tracks fetched, and the most tracks the playlist will hold.
    #[serde(default = "default_limit")]
    pub candidate_limit: usize,
    #[serde(default)]
    pub top_tracks_period: Period,
    /// Pause between a playlist mutation and its verifying read.
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub weights: WeightConfig,
    #[serde(default = "default_snapshot")]
    pub library_snapshot: PathBuf,
}

impl Config {
    pub fn new(target_playlist_id: impl Into<String>) -> Self {
        Self {
            target_playlist_id: target_playlist_id.into(),
            dedupe_across_editions: false,
            candidate_limit: default_limit(),
            top_tracks_period: Period::default(),
            settle_seconds: default_settle_seconds(),
            max_attempts: default_max_attempts(),
            weights: WeightConfig::default(),
            library_snapshot: default_snapshot(),
        }
    }

    /// Load `config.json`. Unlike the Compendium, a missing or unusable config is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = match storage::load_json(path) {
            LoadOutcome::Loaded(config) => config,
            LoadOutcome::Missing | LoadOutcome::Empty => bail!(
                "{} is missing or empty. Run `replaymix init <NAME>` to create the target playlist.",
                path.display()
            ),
            LoadOutcome::Corrupt(err) => {
                return Err(err.context("config.json could not be parsed; check the file by hand"))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::save_json_atomic(self, path)
    }

    fn validate(&self) -> Result<()> {
        if self.target_playlist_id.trim().is_empty() {
            bail!("targetPlaylistId must not be empty");
        }
        if self.candidate_limit == 0 {
            bail!("candidateLimit must be at least 1");
        }
        let weights = [self.weights.scrobble, self.weights.recency, self.weights.repetition];
        if weights.iter().any(|w| !w.is_finite()) {
            bail!("weights must be finite numbers");
        }
        Ok(())
    }

    pub const fn dedupe_mode(&self) -> DedupeMode {
        DedupeMode::from_flag(self.dedupe_across_editions)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.settle_seconds))
    }
}

/// Last.fm account details. Only `apikey` and `username` are used by the read calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastFmCredentials {
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "apisecret", default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LastFmCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        let creds: Self = storage::load_json(path).into_option(path).ok_or_else(|| {
            anyhow!(
                "Last.fm credentials not found in {}. Create it with your apikey and username.",
                path.display()
            )
        })?;
        if creds.api_key.trim().is_empty() || creds.username.trim().is_empty() {
            bail!("{} needs a non-empty apikey and username", path.display());
        }
        Ok(creds)
    }
}
