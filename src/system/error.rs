//! Custom error types for type-safe error handling
//!
//! This module provides structured error types instead of raw strings,
//! enabling better error handling, matching, and user messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Snapshot Error
// ============================================================================

/// Errors raised while enumerating processes.
///
/// Only `Unavailable` is fatal; the per-pid variants are logged and the
/// pid is skipped, since processes routinely exit mid-read.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The process information root could not be listed
    #[error("cannot read process information from {path}: {source}")]
    Unavailable {
        /// Root that failed
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A single pid's pseudo-file could not be read
    #[error("pid {pid}: {source}")]
    PidIo {
        /// Process (or thread) id
        pid: i32,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A stat line did not have the expected shape
    #[error("pid {pid}: malformed stat line")]
    MalformedStat {
        /// Process (or thread) id
        pid: i32,
    },
}

// ============================================================================
// Rc File Error
// ============================================================================

/// Errors while reading the persisted configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RcFileError {
    /// The file exists but could not be read
    #[error("cannot read rcfile '{path}': {message}")]
    Unreadable {
        /// File path
        path: String,
        /// I/O error text
        message: String,
    },

    /// The global header line was missing or malformed
    #[error("incompatible rcfile, you should delete '{path}'")]
    BadHeader {
        /// File path
        path: String,
    },

    /// A window entry was malformed
    #[error("rcfile has inconsistent data for window #{window} ({line}), you should delete '{path}'")]
    BadEntry {
        /// 1-based window number
        window: usize,
        /// Which line of the entry was rejected
        line: &'static str,
        /// File path
        path: String,
    },
}

// ============================================================================
// Setup Error
// ============================================================================

/// Fatal errors that stop the program before or during the frame loop.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Terminal could not be placed in (or restored from) raw mode
    #[error("terminal: {0}")]
    Terminal(#[from] io::Error),

    /// The process information source is missing
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The persisted configuration is unusable
    #[error(transparent)]
    RcFile(#[from] RcFileError),

    /// pid_max needs more digits than the columns allow
    #[error("failed pid maximum size test")]
    PidWidth,

    /// The cpu count needs more digits than the column allows
    #[error("failed number of cpus test")]
    CpuWidth,

    /// Bad command line value
    #[error("{0}")]
    Usage(String),

    /// Signal handlers could not be installed
    #[error("signal setup: {0}")]
    Signals(#[from] nix::Error),
}

// ============================================================================
// Control Error
// ============================================================================

/// Errors from fire-and-forget process control commands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// The signal name or number was not recognised
    #[error("Invalid signal")]
    BadSignal,

    /// kill(2) failed
    #[error("Failed signal pid '{pid}' with '{signal}': {reason}")]
    Signal {
        /// Target pid
        pid: i32,
        /// Signal number
        signal: i32,
        /// errno text
        reason: String,
    },

    /// setpriority(2) failed
    #[error("Failed renice of PID {pid} to {nice}: {reason}")]
    Renice {
        /// Target pid
        pid: i32,
        /// Requested nice value
        nice: i32,
        /// errno text
        reason: String,
    },
}

// ============================================================================
// Result type aliases
// ============================================================================

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Result type for rc file operations
pub type RcFileResult<T> = Result<T, RcFileError>;

/// Result type for setup and the main loop
pub type SetupResult<T> = Result<T, SetupError>;

/// Result type for process control
pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_entry_names_window_and_path() {
        let err = RcFileError::BadEntry {
            window: 2,
            line: "fieldscur",
            path: "/home/u/.ptoprc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("window #2"));
        assert!(msg.contains("/home/u/.ptoprc"));
    }

    #[test]
    fn test_setup_error_wraps_rcfile() {
        let err: SetupError = RcFileError::BadHeader { path: "x".into() }.into();
        assert!(matches!(err, SetupError::RcFile(_)));
    }
}
