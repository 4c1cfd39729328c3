//! Error types for Trueno-Sweep
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Model failures raised by collaborator estimators are NOT represented here.
//! They are downgraded to [`crate::runner::Attempt::Failed`] inside the
//! execution loop and never escape it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Sweep error types
#[derive(Error, Debug)]
pub enum Error {
    /// Session arrays disagree in per-trial shape, or a session is empty
    #[error("Shape mismatch: {0}\nDomains cannot be encoded for this subject")]
    ShapeMismatch(String),

    /// Fewer than two sessions available for a subject
    #[error("Insufficient sessions: found {found}, need at least 2 for cross-session transfer")]
    InsufficientSessions {
        /// Number of sessions found
        found: usize,
    },

    /// Target domain too small to split into calibration and test trials
    #[error("Insufficient calibration data: {target_trials} trial(s) in target, need at least 2")]
    InsufficientCalibrationData {
        /// Number of trials in the target domain
        target_trials: usize,
    },

    /// Invalid sweep or splitter configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two catalog entries share a display name (ledger matching would break)
    #[error("Duplicate model name in catalog: {0}")]
    DuplicateModelName(String),

    /// Dataset collaborator failed to provide subject data
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Ledger cannot be read or appended (resumability compromised)
    #[error("Ledger I/O failed at {}: {source}, halting sweep", .path.display())]
    LedgerIo {
        /// Ledger file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Ledger contains a malformed line that is not a torn tail write
    #[error("Ledger corrupt at {}:{line}: {reason}", .path.display())]
    LedgerCorrupt {
        /// Ledger file path
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// Parser message
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (configuration files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error (result reports)
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error (result reports)
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// Whether the error must halt the whole sweep.
    ///
    /// Ledger failures compromise the resumability guarantee. Everything else
    /// aborts only the current subject/split and the sweep moves on.
    #[must_use]
    pub const fn is_fatal_for_sweep(&self) -> bool {
        matches!(self, Self::LedgerIo { .. } | Self::LedgerCorrupt { .. })
    }
}
