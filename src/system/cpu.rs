//! CPU accounting from `/proc/stat`
//!
//! This module keeps the aggregate and per-cpu tick counters, computes the
//! hotplug noise edge, and turns tick deltas into state percentages.
//!
//! CPU usage requires delta measurements between two time points.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::constants::TICS_EDGE;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> u64 {
    // SAFETY: sysconf is safe to call with _SC_CLK_TCK
    let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if tck > 0 {
        tck as u64
    } else {
        100
    }
}

/// Page size expressed as a left shift that turns pages into KiB.
fn get_page_shift() -> u32 {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let mut size = if size > 0 { size as u64 } else { 4096 };
    let mut shift = 0;
    while size > 1024 {
        size >>= 1;
        shift += 1;
    }
    shift
}

/// System clock ticks per second.
pub static CLK_TCK: Lazy<u64> = Lazy::new(get_clk_tck);

/// Shift converting a page count into KiB.
pub static PAGE_SHIFT: Lazy<u32> = Lazy::new(get_page_shift);

/// Number of online logical cpus.
pub fn online_cpus() -> usize {
    // SAFETY: sysconf is safe to call with _SC_NPROCESSORS_ONLN
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n > 0 {
        n as usize
    } else {
        1
    }
}

/// One `/proc/stat` cpu line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTicks {
    /// Sum of every category
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Parses the numbers following a `cpu`/`cpuN` label; absent trailing
    /// columns (older kernels) read as zero.
    fn parse(fields: &[&str]) -> Self {
        let at = |i: usize| fields.get(i).and_then(|s| s.parse().ok()).unwrap_or(0);
        Self {
            user: at(0),
            nice: at(1),
            system: at(2),
            idle: at(3),
            iowait: at(4),
            irq: at(5),
            softirq: at(6),
            steal: at(7),
        }
    }
}

/// Current and previous counters for one cpu (or the aggregate)
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuSample {
    /// Cpu number, `None` for the aggregate line
    pub id: Option<usize>,
    /// Counters from the latest read
    pub cur: CpuTicks,
    /// Counters from the read before that
    pub sav: CpuTicks,
    /// Totals below this are treated as hotplug noise
    pub edge: u64,
}

/// Percentages per cpu state over one interval
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuStates {
    pub user: f64,
    pub system: f64,
    pub nice: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
}

/// Splits the tick delta of `sample` into state percentages.
///
/// Negative deltas are trimmed to zero. A total below the noise edge is
/// reported as fully idle.
pub fn cpu_state_breakdown(sample: &CpuSample) -> CpuStates {
    let (c, s) = (&sample.cur, &sample.sav);
    let mut u = c.user.saturating_sub(s.user);
    let mut sy = c.system.saturating_sub(s.system);
    let mut n = c.nice.saturating_sub(s.nice);
    let mut i = c.idle.saturating_sub(s.idle);
    let mut w = c.iowait.saturating_sub(s.iowait);
    let mut x = c.irq.saturating_sub(s.irq);
    let mut y = c.softirq.saturating_sub(s.softirq);
    let mut z = c.steal.saturating_sub(s.steal);
    let mut tot = u + sy + n + i + w + x + y + z;

    if tot < sample.edge {
        u = 0;
        sy = 0;
        n = 0;
        i = 0;
        w = 0;
        x = 0;
        y = 0;
        z = 0;
        tot = 0;
    }
    if tot < 1 {
        i = 1;
        tot = 1;
    }

    let scale = 100.0 / tot as f64;
    CpuStates {
        user: u as f64 * scale,
        system: sy as f64 * scale,
        nice: n as f64 * scale,
        idle: i as f64 * scale,
        iowait: w as f64 * scale,
        irq: x as f64 * scale,
        softirq: y as f64 * scale,
        steal: z as f64 * scale,
    }
}

/// Holds aggregate and per-cpu samples between frames
#[derive(Debug, Clone)]
pub struct CpuTracker {
    /// `/proc/stat` path
    stat_path: PathBuf,
    /// The aggregate `cpu` line
    pub summary: CpuSample,
    /// One entry per cpu; grows with hotplug, never shrinks
    pub cpus: Vec<CpuSample>,
}

impl CpuTracker {
    /// Creates a tracker reading `<proc_root>/stat`
    pub fn new(proc_root: &Path) -> Self {
        Self {
            stat_path: proc_root.join("stat"),
            summary: CpuSample::default(),
            cpus: Vec::new(),
        }
    }

    /// Re-reads `/proc/stat` for `ncpu` cpus.
    pub fn refresh(&mut self, ncpu: usize) -> io::Result<()> {
        let content = fs::read_to_string(&self.stat_path)?;
        self.apply(&content, ncpu);
        Ok(())
    }

    /// Folds one `/proc/stat` image into the samples.
    pub fn apply(&mut self, content: &str, ncpu: usize) {
        let ncpu = ncpu.max(1);
        if self.cpus.len() < ncpu {
            let start = self.cpus.len();
            self.cpus.extend((start..ncpu).map(|id| CpuSample {
                id: Some(id),
                ..CpuSample::default()
            }));
        }

        let mut seen = vec![false; self.cpus.len()];
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let label = match parts.next() {
                Some(l) if l.starts_with("cpu") => l,
                _ => continue,
            };
            let fields: Vec<&str> = parts.collect();
            let ticks = CpuTicks::parse(&fields);

            if label == "cpu" {
                self.summary.sav = self.summary.cur;
                self.summary.cur = ticks;
            } else if let Ok(id) = label[3..].parse::<usize>() {
                if let Some(slot) = self.cpus.get_mut(id) {
                    slot.sav = slot.cur;
                    slot.cur = ticks;
                    seen[id] = true;
                }
            }
        }

        // offline cpus contribute nothing this interval
        for (slot, was_seen) in self.cpus.iter_mut().zip(seen) {
            if !was_seen {
                debug!(cpu = ?slot.id, "cpu line missing, treating as offline");
                slot.sav = slot.cur;
            }
        }

        let delta = self.summary.cur.total().saturating_sub(self.summary.sav.total());
        let edge = (delta / ncpu as u64) / (100 / TICS_EDGE);
        self.summary.edge = edge;
        for slot in &mut self.cpus {
            slot.edge = edge;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_A: &str = "cpu  100 0 50 800 10 0 0 0 0 0\n\
                          cpu0 50 0 25 400 5 0 0 0 0 0\n\
                          cpu1 50 0 25 400 5 0 0 0 0 0\n\
                          intr 12345\n";
    const STAT_B: &str = "cpu  200 0 100 1400 20 0 0 0 0 0\n\
                          cpu0 120 0 50 600 10 0 0 0 0 0\n\
                          cpu1 80 0 50 800 10 0 0 0 0 0\n";

    #[test]
    fn test_clk_tck_positive() {
        assert!(*CLK_TCK > 0);
    }

    #[test]
    fn test_tracker_deltas_and_edge() {
        let mut tracker = CpuTracker::new(Path::new("/nonexistent"));
        tracker.apply(STAT_A, 2);
        tracker.apply(STAT_B, 2);
        // aggregate delta = 1720 - 960 = 760, per cpu 380, edge = 380 / 5
        assert_eq!(tracker.summary.edge, 76);
        let states = cpu_state_breakdown(&tracker.summary);
        assert!((states.user - 100.0 * 100.0 / 760.0).abs() < 1e-9);
        assert!((states.idle - 100.0 * 600.0 / 760.0).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_below_edge_is_idle() {
        let sample = CpuSample {
            id: Some(0),
            sav: CpuTicks { user: 10, ..CpuTicks::default() },
            cur: CpuTicks { user: 12, idle: 1, ..CpuTicks::default() },
            edge: 20,
        };
        let states = cpu_state_breakdown(&sample);
        assert_eq!(states.user, 0.0);
        assert_eq!(states.idle, 100.0);
    }

    #[test]
    fn test_breakdown_trims_negative_deltas() {
        let sample = CpuSample {
            id: None,
            sav: CpuTicks { user: 500, idle: 100, ..CpuTicks::default() },
            cur: CpuTicks { user: 400, idle: 200, ..CpuTicks::default() },
            edge: 0,
        };
        let states = cpu_state_breakdown(&sample);
        assert_eq!(states.user, 0.0);
        assert_eq!(states.idle, 100.0);
    }

    #[test]
    fn test_missing_cpu_line_keeps_previous_sample() {
        let mut tracker = CpuTracker::new(Path::new("/nonexistent"));
        tracker.apply(STAT_A, 2);
        tracker.apply("cpu  200 0 100 1400 20 0 0 0\ncpu0 120 0 50 600 10 0 0 0\n", 2);
        let cpu1 = tracker.cpus[1];
        assert_eq!(cpu1.cur, cpu1.sav);
        assert_eq!(cpu_state_breakdown(&cpu1).idle, 100.0);
    }

    #[test]
    fn test_cpus_grow_but_never_shrink() {
        let mut tracker = CpuTracker::new(Path::new("/nonexistent"));
        tracker.apply(STAT_A, 4);
        assert_eq!(tracker.cpus.len(), 4);
        tracker.apply(STAT_B, 2);
        assert_eq!(tracker.cpus.len(), 4);
    }

    #[test]
    fn test_refresh_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stat"), STAT_A).unwrap();
        let mut tracker = CpuTracker::new(dir.path());
        tracker.refresh(2).unwrap();
        assert_eq!(tracker.summary.cur.user, 100);
        assert_eq!(tracker.cpus[1].cur.idle, 400);
    }
}
