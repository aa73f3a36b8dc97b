//! Error types for the AI decision core.

use thiserror::Error;

/// Result type alias using [`AaiError`].
pub type AaiResult<T> = std::result::Result<T, AaiError>;

/// Top-level error type for all AI decision-making failures.
///
/// Per the callback contract, none of these ever bubble past the callback
/// boundary in [`crate::root::AaiRoot`] — they are logged and swallowed,
/// except for the handful of init/persistence entry points that return
/// [`AaiResult`] to their caller.
#[derive(Debug, Error)]
pub enum AaiError {
    /// An unknown config keyword was encountered (config loading is strict).
    #[error("unknown config keyword: {0}")]
    Config(String),

    /// A persisted cache/learn file's version magic did not match; caller
    /// should drop the cache and recompute from scratch.
    #[error("cache version mismatch in '{file}': expected {expected}, found {found}")]
    CacheVersionMismatch {
        /// File that failed to validate.
        file: String,
        /// Version string this build expects.
        expected: String,
        /// Version string actually read.
        found: String,
    },

    /// No legal buildsite could be found for a construction candidate.
    #[error("no buildsite available for def {0:?} in the searched area")]
    BuildsiteUnavailable(crate::types::UnitDefId),

    /// No constructor of the required type was available.
    #[error("no builder available for def {0:?}")]
    BuilderUnavailable(crate::types::UnitDefId),

    /// A construction in progress was aborted (unit killed before finish, or
    /// the builder timed out out of range).
    #[error("construction of unit {0:?} aborted")]
    ConstructionAborted(crate::types::UnitId),

    /// An attack could not continue and was torn down.
    #[error("attack on sector aborted: {0}")]
    GroupAttackAborted(String),

    /// The engine reported an event for a unit id we have no record of.
    #[error("unknown unit id {0:?}")]
    UnknownUnit(crate::types::UnitId),

    /// Generic invalid-state condition caught at a component boundary.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// I/O failure while reading/writing a persistence file.
    #[error("persistence I/O error for '{path}': {source}")]
    Io {
        /// Path being read/written.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A persistence file could not be parsed (malformed content, not a
    /// version mismatch).
    #[error("failed to parse persistence file '{path}': {message}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Human-readable parse failure.
        message: String,
    },
}
