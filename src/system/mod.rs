//! System information module - process, memory, and CPU metrics
//!
//! This module provides safe abstractions over the Linux `/proc`
//! interfaces and the few system calls the monitor needs.

pub mod cpu;
pub mod error;
pub mod history;
pub mod memory;
pub mod metrics;
pub mod procctl;
pub mod signals;
pub mod snapshot;
pub mod uptime;
pub mod users;

pub use error::{ControlError, RcFileError, SetupError, SetupResult, SnapshotError};
pub use snapshot::{Categories, ProcSnapshot, ProcessRecord, SnapshotProvider, SnapshotRequest};
