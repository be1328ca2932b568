//! # Shell Completion Module
//!
//! Completion scripts via `clap_complete`, plus a hidden helper that prints
//! Compendium titles so `replaymix resolve <TAB>` can offer them.
//!
//! ```bash
//! replaymix completion bash > ~/.local/share/bash-completion/completions/replaymix
//! replaymix completion zsh > ~/.config/zsh/completions/_replaymix
//! ```

use crate::compendium::Compendium;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Sorted, deduplicated titles from the Compendium at `path`.
/// A missing or unreadable Compendium yields no completions.
pub fn title_completions(path: &Path) -> Vec<String> {
    let mut titles: Vec<String> = Compendium::load(path)
        .records()
        .iter()
        .map(|r| r.title.clone())
        .collect();
    titles.sort();
    titles.dedup();
    titles
}

/// Print one completion per line, quoting entries that contain whitespace.
pub fn print_title_completions(path: &Path) {
    for title in title_completions(path) {
        if title.contains(char::is_whitespace) {
            println!("\"{}\"", title.replace('"', "\\\""));
        } else {
            println!("{title}");
        }
    }
}
