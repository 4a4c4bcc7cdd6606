//! Centralized constants for the application
//!
//! This module contains the magic numbers and configuration constants
//! used throughout the monitor, making them easy to find and modify.

// ============================================================================
// Application Info
// ============================================================================

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Application version from Cargo.toml
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Refresh Delay (seconds)
// ============================================================================

/// Default delay between frames
pub const DEFAULT_DELAY_SECS: f64 = 3.0;

/// Seconds between memory statistic refreshes
pub const MEMORY_REFRESH_SECS: u64 = 3;

/// Seconds between cpu count (hotplug) refreshes
pub const CPU_COUNT_REFRESH_SECS: u64 = 300;

/// How long a transient message stays on the message row
pub const MESSAGE_DURATION_MS: u64 = 1250;

/// Pause between the priming snapshot and the first frame
pub const PRIME_DELAY_MS: u64 = 250;

/// Longest single wait for input before signal flags are checked again
pub const INPUT_POLL_MS: u64 = 100;

/// Root of the process information hierarchy
pub const PROC_ROOT: &str = "/proc";

// ============================================================================
// Windows
// ============================================================================

/// Number of windows in the ring
pub const GROUPSMAX: usize = 4;

/// Longest window name the user may choose
pub const WINNAME_MAX: usize = 3;

/// Narrowest screen we attempt to lay out
pub const W_MIN_COL: u16 = 3;

/// Widest row we ever build
pub const SCREENMAX: usize = 512;

/// Most pids that may be monitored with `-p`
pub const MONPIDMAX: usize = 20;

/// Signal sent by `k` when none is given (SIGTERM)
pub const DEFAULT_KILL_SIGNAL: i32 = 15;

// ============================================================================
// Persisted Configuration
// ============================================================================

/// Version id written to, and expected from, the rc file
pub const RCF_VERSION_ID: char = 'f';

/// Trailing text on the first rc file line
pub const RCF_EYECATCHER: &str = "Config File (Linux processes with windows)";

/// System wide rc file (secure mode switch and delay)
pub const SYS_RCFILESPEC: &str = "/etc/ptoprc";

/// Offset added to a field index to form its rc file byte
pub const FLD_OFFSET: u8 = b'%';

/// High bit marking a field as displayed
pub const FLD_ON: u8 = 0x80;

/// Field alphabet used by the older, letter based rc files
pub const CVT_FIELDS: &[u8] = b"%&*'(-0346789:;<=>?@ACDEFG";

// ============================================================================
// CPU Accounting
// ============================================================================

/// Percentage of one tick-interval that a cpu must show before its
/// deltas are trusted (smaller totals are treated as hotplug noise)
pub const TICS_EDGE: u64 = 20;

/// Ceiling for a displayed %CPU in the default modes
pub const CPU_PMAX_DEFAULT: f64 = 99.9;

/// Absolute ceiling for %CPU in Irix mode with many cpus
pub const CPU_PMAX_IRIX_LIMIT: f64 = 99999.0;

// ============================================================================
// Memory Summary Scaling (KiB)
// ============================================================================

/// Above this total, memory lines switch to MiB
pub const MEM_SHIFT_MIB_ABOVE: u64 = 99_999_999;

/// Above this total, memory lines switch to GiB
pub const MEM_SHIFT_GIB_ABOVE: u64 = 9_999_999_999;

// ============================================================================
// Batch Mode
// ============================================================================

/// Fallback screen size when stdout is not a terminal
pub const BATCH_DEFAULT_COLS: u16 = 80;

/// Fallback screen rows when stdout is not a terminal
pub const BATCH_DEFAULT_ROWS: u16 = 24;

/// Row budget in batch mode without a `-w` row count
pub const UNLIMITED_ROWS: usize = usize::MAX / 4;
