//! # ReplayMix
//!
//! Rebuilds a streaming-service playlist from last week's scrobbles. Tracks
//! are scored on play count, recency and back-to-back repetition, matched
//! against a local index of the user's library (the Compendium), and the
//! target playlist is replaced with the ranked result.
//!
//! ## Usage
//!
//! ```bash
//! # One-time setup: create the target playlist
//! replaymix init "ReplayMix+"
//!
//! # Index the library, then rebuild the playlist
//! replaymix update
//!
//! # Why is a track missing?
//! replaymix resolve "Song (feat. Y)" "X & Y"
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use env_logger::{Env, Target};
use log::{debug, info};
use replaymix::cli::{self, Args};
use replaymix::compendium::{Compendium, CompendiumBuilder};
use replaymix::completion;
use replaymix::config::{self, Config, DataPaths, LastFmCredentials};
use replaymix::matcher::CompendiumIndex;
use replaymix::reconciler::{ReconcileOptions, Reconciler};
use replaymix::retry::ThreadPause;
use replaymix::sources::{LastFmClient, LibraryIndexSource, SnapshotLibrary};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Set up `env_logger`. `--verbose` lowers the default filter to `debug`;
/// `RUST_LOG` still wins when set.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                writeln!(buf, "{} - {} - {}", buf.timestamp(), record.level(), record.args())
            });
    }

    builder.init();
    Ok(())
}

fn unix_now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is set before the Unix epoch")?;
    Ok(i64::try_from(elapsed.as_secs())?)
}

fn rebuild_compendium(paths: &DataPaths, config: &Config) -> Result<()> {
    let library = SnapshotLibrary::new(paths.snapshot(config));
    let report = CompendiumBuilder::new(&library, paths.compendium(), config.dedupe_mode())
        .rebuild()
        .context("Compendium rebuild failed; the stored Compendium was left unchanged")?;
    println!(
        "Compendium: {} tracks from {} playlists and history ({} new)",
        report.len,
        report.playlists,
        report.added()
    );
    Ok(())
}

fn recreate_playlist(paths: &DataPaths, config: &Config) -> Result<()> {
    let compendium = Compendium::load(&paths.compendium());
    if compendium.is_empty() {
        bail!("The Compendium is empty. Run `replaymix compendium` first.");
    }

    let creds = LastFmCredentials::load(&paths.credentials())?;
    let scrobbles = LastFmClient::new(&creds.api_key, &creds.username)?;
    let library = SnapshotLibrary::new(paths.snapshot(config));

    let options = ReconcileOptions {
        playlist_id: config.target_playlist_id.clone(),
        period: config.top_tracks_period,
        limit: config.candidate_limit,
        weights: config.weights,
        retry: config.retry_policy(),
        now: unix_now()?,
    };
    let pause = ThreadPause;
    let summary = Reconciler::new(&library, &scrobbles, &pause, options)
        .run(&compendium)
        .context("Playlist recreation failed")?;

    for title in &summary.master_list.unmatched {
        eprintln!("Could not find \"{title}\" in the Compendium.");
    }
    println!(
        "Playlist {}: removed {}, added {} ({} unmatched, {} not played this week)",
        config.target_playlist_id,
        summary.removed,
        summary.added,
        summary.master_list.unmatched.len(),
        summary.master_list.unscored.len()
    );
    Ok(())
}

fn init(
    paths: &DataPaths,
    name: &str,
    description: &str,
    dedupe_editions: bool,
    force: bool,
) -> Result<()> {
    let config_path = paths.config();
    if config_path.exists() && !force {
        bail!(
            "{} already exists. Pass --force to create a new playlist and overwrite it.",
            config_path.display()
        );
    }

    let mut config = Config::new(String::new());
    config.dedupe_across_editions = dedupe_editions;
    let library = SnapshotLibrary::new(paths.snapshot(&config));
    config.target_playlist_id = library
        .create_playlist(name, description)
        .with_context(|| format!("Failed to create playlist \"{name}\""))?;

    config.save(&config_path)?;
    println!(
        "Created playlist \"{name}\" ({}); configuration written to {}",
        config.target_playlist_id,
        config_path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.log_file.as_deref())?;

    let root = match &args.data_dir {
        Some(dir) => config::ensure_dir(dir)?,
        None => config::default_data_dir()?,
    };
    let paths = DataPaths::new(root);
    debug!("Data directory: {}", paths.root.display());

    match args.command {
        cli::Command::Compendium => {
            let config = Config::load(&paths.config())?;
            rebuild_compendium(&paths, &config)?;
        }
        cli::Command::Playlist => {
            let config = Config::load(&paths.config())?;
            recreate_playlist(&paths, &config)?;
        }
        cli::Command::Update => {
            let config = Config::load(&paths.config())?;
            rebuild_compendium(&paths, &config)?;
            recreate_playlist(&paths, &config)?;
        }
        cli::Command::Resolve { title, artist } => {
            let compendium = Compendium::load(&paths.compendium());
            match CompendiumIndex::new(&compendium).resolve_record(&title, &artist) {
                Some(record) => {
                    let artists: Vec<&str> = record.artists.iter().map(|a| a.name.as_str()).collect();
                    println!("{}\t{} - {}", record.external_id, record.title, artists.join(", "));
                }
                None => {
                    eprintln!("Could not find \"{title}\" by {artist} in the Compendium.");
                    std::process::exit(1);
                }
            }
        }
        cli::Command::List => {
            let compendium = Compendium::load(&paths.compendium());
            for record in compendium.records() {
                let artists: Vec<&str> = record.artists.iter().map(|a| a.name.as_str()).collect();
                println!("{}\t{} - {}", record.external_id, record.title, artists.join(", "));
            }
            info!("{} tracks in the Compendium", compendium.len());
        }
        cli::Command::Init {
            name,
            description,
            dedupe_editions,
            force,
        } => {
            init(&paths, &name, &description, dedupe_editions, force)?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
        cli::Command::CompleteTitles => {
            completion::print_title_completions(&paths.compendium());
        }
    }

    Ok(())
}
