//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `replaymix` binary.
//!
//! ## Commands
//!
//! - `compendium`: rebuild the library index from every playlist and the history
//! - `playlist`: recompute the MasterList and replace the target playlist
//! - `update`: both of the above, in that order
//! - `resolve`: look a single scrobbled title up in the Compendium
//! - `list`: print the Compendium
//! - `init`: create the target playlist and write `config.json`
//!
//! ## Examples
//!
//! ```bash
//! replaymix init "ReplayMix+" --description "Last week on repeat"
//! replaymix update --verbose
//! replaymix resolve "Song (feat. Y)" "X & Y"
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "replaymix")]
#[command(about = "ReplayMix: a weekly replay playlist built from your scrobbles and your library")]
#[command(version)]
pub struct Args {
    /// Directory holding config.json, credentials, the Compendium and the library snapshot
    #[arg(long, global = true, env = "REPLAYMIX_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true, env = "REPLAYMIX_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the Compendium
    ///
    /// Fetches every library playlist and the listening history, reduces each
    /// track to id, title and artists, and merges them into the stored
    /// Compendium. Run this whenever you add music to your library.
    Compendium,

    /// Recreate the ReplayMix playlist
    ///
    /// Scores last week's top tracks, matches them against the Compendium and
    /// replaces the target playlist's contents with the ranked result.
    Playlist,

    /// Rebuild the Compendium, then recreate the playlist
    Update,

    /// Look up one scrobbled track in the Compendium
    ///
    /// Prints the library id the match engine picks, or reports that the
    /// track is missing. Useful when a title keeps showing up as not found.
    Resolve {
        /// Track title as the scrobble service reports it
        #[arg(value_hint = clap::ValueHint::Other)]
        title: String,

        /// Artist as the scrobble service reports it
        artist: String,
    },

    /// List the tracks in the Compendium
    List,

    /// Create the target playlist and write config.json
    ///
    /// Fails if config.json already exists unless --force is given.
    Init {
        /// Name of the playlist to create
        name: String,

        /// Playlist description
        #[arg(long, default_value = "")]
        description: String,

        /// Suppress alternate editions (same title and artists, different id) in the Compendium
        #[arg(long)]
        dedupe_editions: bool,

        /// Overwrite an existing config.json
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: replaymix completion bash > ~/.local/share/bash-completion/completions/replaymix
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List Compendium titles for completion (hidden command)
    #[command(hide = true)]
    CompleteTitles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["replaymix", "playlist", "--verbose", "--data-dir", "/tmp/rm"])
            .unwrap();
        assert!(args.verbose);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/rm")));
        assert!(matches!(args.command, Command::Playlist));
    }

    #[test]
    fn test_resolve_takes_title_and_artist() {
        let args = Args::try_parse_from(["replaymix", "resolve", "Song (feat. Y)", "X & Y"]).unwrap();
        match args.command {
            Command::Resolve { title, artist } => {
                assert_eq!(title, "Song (feat. Y)");
                assert_eq!(artist, "X & Y");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_init_defaults() {
        let args = Args::try_parse_from(["replaymix", "init", "ReplayMix+"]).unwrap();
        match args.command {
            Command::Init {
                name,
                description,
                dedupe_editions,
                force,
            } => {
                assert_eq!(name, "ReplayMix+");
                assert!(description.is_empty());
                assert!(!dedupe_editions);
                assert!(!force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
