//! # Error Taxonomy
//!
//! Typed errors for the two seams where callers need to tell failures apart:
//! the remote collaborators and playlist reconciliation. Everything else in
//! the crate uses `anyhow::Result` with context messages.
//!
//! Ordinary absence (a scrobbled title missing from the Compendium, an empty
//! history) is not an error and never shows up here; those are `Option`/empty
//! results.

use thiserror::Error;

/// Failure of a collaborator call (library source or scrobble source).
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport or authentication failure; the service could not be reached.
    #[error("{service} is unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    /// The service answered with an error envelope.
    #[error("{service} returned error {code}: {message}")]
    Api {
        service: &'static str,
        code: i64,
        message: String,
    },

    /// The service answered, but the payload could not be decoded.
    #[error("malformed {service} response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

impl SourceError {
    pub fn unavailable(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            service,
            message: err.to_string(),
        }
    }

    pub fn malformed(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            service,
            message: err.to_string(),
        }
    }
}

/// Terminal failures of a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Items were still present after every bounded clear attempt.
    #[error("playlist {playlist_id} still holds {remaining} item(s) after {attempts} clear attempt(s)")]
    ClearNotObserved {
        playlist_id: String,
        remaining: usize,
        attempts: u32,
    },

    /// The playlist read back empty after every bounded write attempt.
    #[error("playlist {playlist_id} still empty after {attempts} write attempt(s)")]
    WriteNotObserved { playlist_id: String, attempts: u32 },
}
