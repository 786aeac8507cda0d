//! Error types for the recognizer.
//!
//! I/O and corpus-structural failures are errors; statistical outcomes
//! (including a NONE verdict or disagreeing rankings) are ordinary values
//! and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for the recognizer.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The corpus directory is missing or unreadable.
    #[error("corpus directory unavailable: {path}")]
    CorpusUnavailable {
        /// Directory that was tried.
        path: PathBuf,
    },

    /// The corpus directory yielded no usable reference at all.
    #[error("no usable corpus entries in {path}")]
    EmptyCorpus {
        /// Directory that was scanned.
        path: PathBuf,
    },

    /// A single corpus entry could not be read or decoded.
    ///
    /// The loader catches this per entry, logs it, and moves on; it only
    /// propagates when every entry failed.
    #[error("corpus entry {path}: {message}")]
    CorpusEntry {
        /// Offending entry.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

/// Result type alias for recognizer operations.
pub type Result<T> = std::result::Result<T, RecognizerError>;
