//! Per-pid cpu tick history
//!
//! CPU usage requires delta measurements between two frames. Two maps are
//! kept, one per generation, and their roles are swapped at the start of
//! every frame so steady-state frames do not allocate.

use std::collections::HashMap;
use std::mem;
use std::time::Instant;

/// Task state counters for the summary "Tasks:" line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    /// Every task seen this frame
    pub total: u32,
    /// State `R`
    pub running: u32,
    /// States `S` and `D`
    pub sleeping: u32,
    /// States `T` and `t`
    pub stopped: u32,
    /// State `Z`
    pub zombie: u32,
}

impl TaskCounts {
    /// Classifies one task by its state code
    pub fn tally(&mut self, state: char) {
        self.total += 1;
        match state {
            'R' => self.running += 1,
            'S' | 'D' => self.sleeping += 1,
            'T' | 't' => self.stopped += 1,
            'Z' => self.zombie += 1,
            _ => {}
        }
    }
}

/// Generation-over-generation store of cumulative tics, keyed by pid
#[derive(Debug, Default)]
pub struct HistoryTable {
    /// Tics seen in the previous frame
    previous: HashMap<i32, u64>,
    /// Tics recorded so far in this frame
    current: HashMap<i32, u64>,
    /// Start of the previous frame
    last_cycle: Option<Instant>,
    /// Seconds between the last two frames (0 before the second frame)
    elapsed_secs: f64,
    /// State counters for the frame in progress
    pub counts: TaskCounts,
}

impl HistoryTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame using the wall clock.
    pub fn begin_cycle(&mut self) -> f64 {
        self.begin_cycle_at(Instant::now())
    }

    /// Starts a new frame at `now`, returning the seconds elapsed since
    /// the previous frame began.
    pub fn begin_cycle_at(&mut self, now: Instant) -> f64 {
        mem::swap(&mut self.previous, &mut self.current);
        self.current.clear();

        self.elapsed_secs = match self.last_cycle {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.last_cycle = Some(now);
        self.counts = TaskCounts::default();
        self.elapsed_secs
    }

    /// Records `cumulative_tics` for `pid` and returns the tics consumed
    /// since the previous frame. Unknown pids count as all-new; a counter
    /// that went backwards (pid reuse) yields zero.
    pub fn record(&mut self, pid: i32, cumulative_tics: u64) -> u64 {
        self.current.insert(pid, cumulative_tics);
        match self.previous.get(&pid) {
            Some(&prev) => cumulative_tics.saturating_sub(prev),
            None => cumulative_tics,
        }
    }

    /// Seconds between the two most recent frames
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    /// Number of pids recorded in the frame in progress
    pub fn len(&self) -> usize {
        self.current.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_sighting_is_all_new() {
        let mut hist = HistoryTable::new();
        hist.begin_cycle();
        assert_eq!(hist.record(42, 250), 250);
    }

    #[test]
    fn test_delta_between_cycles() {
        let mut hist = HistoryTable::new();
        let t0 = Instant::now();
        hist.begin_cycle_at(t0);
        hist.record(100, 200);
        let et = hist.begin_cycle_at(t0 + Duration::from_secs(1));
        assert!((et - 1.0).abs() < 1e-9);
        assert_eq!(hist.record(100, 300), 100);
    }

    #[test]
    fn test_decreasing_tics_clamp_to_zero() {
        let mut hist = HistoryTable::new();
        hist.begin_cycle();
        hist.record(7, 900);
        hist.begin_cycle();
        assert_eq!(hist.record(7, 12), 0);
    }

    #[test]
    fn test_only_previous_generation_is_consulted() {
        let mut hist = HistoryTable::new();
        hist.begin_cycle();
        hist.record(5, 100);
        hist.begin_cycle();
        // pid 5 missing this frame
        hist.begin_cycle();
        assert_eq!(hist.record(5, 150), 150);
    }

    #[test]
    fn test_last_write_wins_within_cycle() {
        let mut hist = HistoryTable::new();
        hist.begin_cycle();
        hist.record(9, 10);
        hist.record(9, 40);
        assert_eq!(hist.len(), 1);
        hist.begin_cycle();
        assert_eq!(hist.record(9, 50), 10);
    }

    #[test]
    fn test_counts_reset_each_cycle() {
        let mut hist = HistoryTable::new();
        hist.begin_cycle();
        for s in ['R', 'S', 'D', 'T', 'Z', 'I'] {
            hist.counts.tally(s);
        }
        assert_eq!(
            hist.counts,
            TaskCounts { total: 6, running: 1, sleeping: 2, stopped: 1, zombie: 1 }
        );
        hist.begin_cycle();
        assert_eq!(hist.counts, TaskCounts::default());
    }
}
