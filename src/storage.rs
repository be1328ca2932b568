//! # Persistence Layer
//!
//! Load and save of JSON documents in the data directory.
//!
//! Loading distinguishes four outcomes so callers can decide how strict to be:
//! the Compendium treats a missing, empty or corrupt file as an empty list (and
//! warns), while `config.json` refuses to run without a real document.
//!
//! Saving is atomic: content is written to a temporary file next to the target
//! and renamed over it, so an interrupted write never leaves a truncated or
//! emptied document behind.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Result of reading a JSON document from disk.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    Loaded(T),
    /// No file at the path.
    Missing,
    /// File exists but holds nothing but whitespace.
    Empty,
    /// File exists but could not be read or parsed.
    Corrupt(anyhow::Error),
}

impl<T> LoadOutcome<T> {
    /// Collapse into an `Option`, logging every non-`Loaded` case.
    pub fn into_option(self, path: &Path) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Missing => {
                debug!("{} does not exist yet", path.display());
                None
            }
            Self::Empty => {
                warn!("{} is empty", path.display());
                None
            }
            Self::Corrupt(err) => {
                warn!(
                    "{} is unreadable and will be treated as empty: {err:#}",
                    path.display()
                );
                None
            }
        }
    }
}

/// Read and parse the JSON document at `path`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> LoadOutcome<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Missing,
        Err(err) => {
            return LoadOutcome::Corrupt(
                anyhow::Error::new(err).context(format!("Failed to read {}", path.display())),
            )
        }
    };

    if content.trim().is_empty() {
        return LoadOutcome::Empty;
    }

    match serde_json::from_str(&content) {
        Ok(value) => LoadOutcome::Loaded(value),
        Err(err) => LoadOutcome::Corrupt(
            anyhow::Error::new(err).context(format!("Failed to parse {}", path.display())),
        ),
    }
}

/// Load `path`, substituting `T::default()` for anything that isn't a valid document.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    load_json(path).into_option(path).unwrap_or_default()
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn save_json_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_reported_as_missing() {
        let dir = TempDir::new().unwrap();
        let outcome: LoadOutcome<Vec<String>> = load_json(&dir.path().join("nope.json"));
        assert!(matches!(outcome, LoadOutcome::Missing));
    }

    #[test]
    fn test_blank_file_is_reported_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.json");
        fs::write(&path, "  \n").unwrap();

        let outcome: LoadOutcome<Vec<String>> = load_json(&path);
        assert!(matches!(outcome, LoadOutcome::Empty));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "[{\"title\": ").unwrap();

        let outcome: LoadOutcome<Vec<String>> = load_json(&path);
        assert!(matches!(outcome, LoadOutcome::Corrupt(_)));

        let value: Vec<String> = load_or_default(&path);
        assert!(value.is_empty());
    }

    #[test]
    fn test_atomic_save_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "[\"old\"]").unwrap();

        save_json_atomic(&vec!["new".to_string()], &path).unwrap();

        let value: Vec<String> = load_or_default(&path);
        assert_eq!(value, vec!["new".to_string()]);
        // Only the target remains; the temporary file was renamed over it.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        save_json_atomic(&serde_json::json!({"a": 1}), &path).unwrap();
        assert!(path.exists());
    }
}
