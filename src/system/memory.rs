//! Memory information from `/proc/meminfo`
//!
//! This module provides the system-wide memory and swap figures shown in
//! the summary block, plus the unit selection used to keep those figures
//! inside their columns.

use std::fs;
use std::io;
use std::path::Path;

use crate::constants::{MEM_SHIFT_GIB_ABOVE, MEM_SHIFT_MIB_ABOVE};

/// System-wide memory statistics, all in KiB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    /// Total usable ram
    pub main_total: u64,
    /// Unused ram
    pub main_free: u64,
    /// Block device buffers
    pub buffers: u64,
    /// Page cache
    pub cached: u64,
    /// Total swap
    pub swap_total: u64,
    /// Unused swap
    pub swap_free: u64,
}

impl MemInfo {
    /// Used ram, `total - free`
    pub fn main_used(&self) -> u64 {
        self.main_total.saturating_sub(self.main_free)
    }

    /// Used swap, `total - free`
    pub fn swap_used(&self) -> u64 {
        self.swap_total.saturating_sub(self.swap_free)
    }

    /// Parses the text of `/proc/meminfo`.
    pub fn parse(content: &str) -> Self {
        let mut info = MemInfo::default();
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Ok(value) = value.parse::<u64>() else {
                continue;
            };
            match key {
                "MemTotal:" => info.main_total = value,
                "MemFree:" => info.main_free = value,
                "Buffers:" => info.buffers = value,
                "Cached:" => info.cached = value,
                "SwapTotal:" => info.swap_total = value,
                "SwapFree:" => info.swap_free = value,
                _ => {}
            }
        }
        info
    }

    /// Reads `<proc_root>/meminfo`.
    pub fn read(proc_root: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(proc_root.join("meminfo"))?;
        Ok(Self::parse(&content))
    }

    /// Unit label and right shift that keep the totals within 8 digits.
    pub fn display_unit(&self) -> (&'static str, u32) {
        if self.main_total > MEM_SHIFT_GIB_ABOVE {
            ("GiB", 20)
        } else if self.main_total > MEM_SHIFT_MIB_ABOVE {
            ("MiB", 10)
        } else {
            ("KiB", 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:        7939100 kB\n\
                           MemFree:          746428 kB\n\
                           MemAvailable:    3000000 kB\n\
                           Buffers:             960 kB\n\
                           Cached:          2821276 kB\n\
                           SwapTotal:       8126460 kB\n\
                           SwapFree:        8126076 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let info = MemInfo::parse(MEMINFO);
        assert_eq!(info.main_total, 7_939_100);
        assert_eq!(info.main_used(), 7_192_672);
        assert_eq!(info.buffers, 960);
        assert_eq!(info.cached, 2_821_276);
        assert_eq!(info.swap_used(), 384);
    }

    #[test]
    fn test_display_unit_thresholds() {
        let mut info = MemInfo { main_total: 99_999_999, ..MemInfo::default() };
        assert_eq!(info.display_unit(), ("KiB", 0));
        info.main_total = 100_000_000;
        assert_eq!(info.display_unit(), ("MiB", 10));
        info.main_total = 10_000_000_000;
        assert_eq!(info.display_unit(), ("GiB", 20));
    }

    #[test]
    fn test_read_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meminfo"), MEMINFO).unwrap();
        let info = MemInfo::read(dir.path()).unwrap();
        assert_eq!(info.swap_total, 8_126_460);
    }
}
