//! Engine state and the per-frame refresh
//!
//! Everything the frame cycle and the command dispatcher share lives in
//! [`EngineState`]: the snapshot source, the record table, the history
//! used for %CPU, the window ring and the global modes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::{
    CPU_COUNT_REFRESH_SECS, DEFAULT_DELAY_SECS, GROUPSMAX, MEMORY_REFRESH_SECS,
    MESSAGE_DURATION_MS, PRIME_DELAY_MS,
};
use crate::system::cpu::{online_cpus, CpuTracker, CLK_TCK};
use crate::system::error::SetupResult;
use crate::system::history::HistoryTable;
use crate::system::memory::MemInfo;
use crate::system::metrics::{cpu_percent, percent_scale};
use crate::system::signals::ResizeLatch;
use crate::system::uptime::{logged_in_users, read_loadavg, read_uptime_secs, LoadAvg};
use crate::system::{Categories, ProcessRecord, SnapshotProvider, SnapshotRequest};

use super::fields::{self, sort_indices, ColumnSpec, SortContext};
use super::fields_manager::FieldsManager;
use super::color_mapping::ColorMapping;
use super::forest::{self, Placement};
use super::prompts::Prompt;
use super::rcfile::{LoadedRc, RcConfig, SystemRc};
use super::window::{WinRc, WindowStack, QSRT_NORMAL, SHOW_CMDLIN, SHOW_CTIMES, SHOW_FOREST};
use super::ViewMode;

/// Usable screen area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Columns
    pub cols: usize,
    /// Rows
    pub rows: usize,
}

/// Screen size forced with `-w`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthOverride {
    /// Columns
    pub cols: usize,
    /// Rows, when known
    pub rows: Option<usize>,
}

/// A transient message for the message row
#[derive(Debug, Clone)]
pub struct Message {
    /// Text shown
    pub text: String,
    /// When it stops being shown
    pub expires: Instant,
}

/// Figures behind the load line
#[derive(Debug, Clone, Copy, Default)]
pub struct SysSummary {
    /// Seconds since boot
    pub uptime_secs: f64,
    /// Load averages
    pub load: LoadAvg,
    /// Logged-in users
    pub users: usize,
}

/// All state shared by the frame cycle and the command dispatcher
pub struct EngineState {
    provider: Box<dyn SnapshotProvider>,
    proc_root: PathBuf,
    /// Per-pid tick history
    pub history: HistoryTable,
    /// The current frame's records
    pub records: Vec<ProcessRecord>,
    /// Per-cpu tick samples
    pub cpus: CpuTracker,
    /// Memory figures, resampled every few seconds
    pub meminfo: MemInfo,
    /// Load line figures
    pub sysinfo: SysSummary,
    mem_stamp: Option<Instant>,
    cpu_count_stamp: Option<Instant>,
    /// Source of the online cpu count
    pub ncpu_probe: fn() -> usize,
    /// Online cpus
    pub ncpu: usize,
    /// Digits needed for a pid
    pub pid_digits: usize,
    /// Clock ticks per second
    pub tick_rate: u64,
    /// Machine dependent headers and %CPU format
    pub columns: ColumnSpec,
    /// Snapshot categories the visible windows need
    pub libflags: Categories,
    /// The four windows
    pub stack: WindowStack,
    /// Alternate (multi-window) display
    pub altscr: bool,
    /// %CPU is not divided by the cpu count
    pub irixps: bool,
    /// Every thread is listed instead of every process
    pub threads: bool,
    /// Kill, renice and delay changes are refused
    pub secure: bool,
    /// Seconds between frames
    pub delay: f64,
    /// Usable screen area
    pub geometry: Geometry,
    /// Screen size forced with `-w`
    pub width_override: Option<WidthOverride>,
    /// Non-interactive output
    pub batch: bool,
    /// Frames left before exiting, if limited
    pub iterations: Option<u64>,
    /// Only these pids are shown
    pub monpids: Vec<i32>,
    /// Recalibration request flag, shared with the input loop
    pub latch: Arc<ResizeLatch>,
    /// Message row text
    pub msg: Option<Message>,
    /// Active screen
    pub view: ViewMode,
    /// Open line prompt
    pub prompt: Option<Prompt>,
    /// Fields manager cursor
    pub fields_mgr: FieldsManager,
    /// Color mapping session
    pub color_map: Option<ColorMapping>,
    /// Last string searched with `L`
    pub findstr: Option<String>,
    /// The last search matched at least once
    pub find_found: bool,
    /// Personal rc file location
    pub rc_path: PathBuf,
    /// The rc file was converted from an older layout
    pub rc_converted: bool,
    force_sysinfo: bool,
    extra_refresh: bool,
}

impl EngineState {
    /// Builds the startup state from the rc files.
    pub fn new(
        provider: Box<dyn SnapshotProvider>,
        proc_root: impl Into<PathBuf>,
        loaded: Option<LoadedRc>,
        system: SystemRc,
        rc_path: PathBuf,
    ) -> SetupResult<Self> {
        let proc_root = proc_root.into();
        let (config, rc_converted) = match loaded {
            Some(l) => (l.config, l.converted),
            None => (RcConfig::default(), false),
        };

        let secure = system.secure && !nix::unistd::getuid().is_root();
        let delay = if secure {
            system.delay.unwrap_or(DEFAULT_DELAY_SECS)
        } else {
            config.delay
        };

        let ncpu = online_cpus();
        let pid_digits = fields::pid_digits(&proc_root);
        let columns = ColumnSpec::new(pid_digits, ncpu, config.irixps, false)?;
        info!(ncpu, pid_digits, secure, delay, "engine state created");

        Ok(Self {
            provider,
            cpus: CpuTracker::new(&proc_root),
            proc_root,
            history: HistoryTable::new(),
            records: Vec::new(),
            meminfo: MemInfo::default(),
            sysinfo: SysSummary::default(),
            mem_stamp: None,
            cpu_count_stamp: None,
            ncpu_probe: online_cpus,
            ncpu,
            pid_digits,
            tick_rate: *CLK_TCK,
            columns,
            libflags: Categories::STAT,
            stack: WindowStack::new(config.wins, config.curwin),
            altscr: config.altscr,
            irixps: config.irixps,
            threads: false,
            secure,
            delay,
            geometry: Geometry { cols: 80, rows: 24 },
            width_override: None,
            batch: false,
            iterations: None,
            monpids: Vec::new(),
            latch: Arc::new(ResizeLatch::new()),
            msg: None,
            view: ViewMode::default(),
            prompt: None,
            fields_mgr: FieldsManager::default(),
            color_map: None,
            findstr: None,
            find_found: false,
            rc_path,
            rc_converted,
            force_sysinfo: false,
            extra_refresh: false,
        })
    }

    /// Root of the process information hierarchy
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    // ========================================================================
    // Frame refresh
    // ========================================================================

    /// Takes a new snapshot and resamples the system figures.
    ///
    /// A pending extra refresh samples once, waits the prime delay and
    /// then samples again, so the frame's %CPU covers a real interval.
    pub fn refresh(&mut self) -> SetupResult<()> {
        if std::mem::take(&mut self.extra_refresh) {
            self.refresh_tasks(Instant::now())?;
            thread::sleep(Duration::from_millis(PRIME_DELAY_MS));
        }
        self.refresh_at(Instant::now())
    }

    /// [`refresh`](Self::refresh) with an explicit clock. A pending extra
    /// refresh is sampled one prime delay before `now`.
    pub fn refresh_at(&mut self, now: Instant) -> SetupResult<()> {
        if std::mem::take(&mut self.extra_refresh) {
            let primed = now
                .checked_sub(Duration::from_millis(PRIME_DELAY_MS))
                .unwrap_or(now);
            self.refresh_tasks(primed)?;
        }
        self.refresh_tasks(now)?;
        self.refresh_sysinfo(now);
        Ok(())
    }

    fn refresh_tasks(&mut self, now: Instant) -> SetupResult<()> {
        let elapsed = self.history.begin_cycle_at(now);
        let request = SnapshotRequest {
            categories: self.libflags,
            pids: if self.monpids.is_empty() {
                None
            } else {
                Some(&self.monpids)
            },
            threads: self.threads,
        };
        self.provider.snapshot(&request, &mut self.records)?;

        for rec in &mut self.records {
            self.history.counts.tally(rec.state);
            rec.pcpu = self.history.record(rec.tid, rec.tics());
        }
        debug!(tasks = self.records.len(), elapsed, "snapshot taken");
        Ok(())
    }

    fn refresh_sysinfo(&mut self, now: Instant) {
        let force = std::mem::take(&mut self.force_sysinfo);
        let due = |stamp: Option<Instant>, secs: u64| {
            stamp.map_or(true, |t| now.saturating_duration_since(t) >= Duration::from_secs(secs))
        };

        if force || due(self.mem_stamp, MEMORY_REFRESH_SECS) {
            match MemInfo::read(&self.proc_root) {
                Ok(info) => self.meminfo = info,
                Err(e) => warn!(error = %e, "meminfo unavailable"),
            }
            self.mem_stamp = Some(now);
        }

        if force || due(self.cpu_count_stamp, CPU_COUNT_REFRESH_SECS) {
            let n = (self.ncpu_probe)().max(1);
            if n != self.ncpu {
                info!(from = self.ncpu, to = n, "cpu count changed");
                self.ncpu = n;
                self.latch.request();
            }
            self.cpu_count_stamp = Some(now);
        }

        if let Err(e) = self.cpus.refresh(self.ncpu) {
            warn!(error = %e, "cpu statistics unavailable");
        }

        self.sysinfo = SysSummary {
            uptime_secs: read_uptime_secs(&self.proc_root).unwrap_or(0.0),
            load: read_loadavg(&self.proc_root).unwrap_or_default(),
            users: logged_in_users(),
        };
    }

    /// Resamples memory and cpu count on the next frame.
    pub fn force_sysinfo(&mut self) {
        self.force_sysinfo = true;
    }

    /// Takes one throwaway snapshot before the next frame.
    pub fn request_extra_refresh(&mut self) {
        self.extra_refresh = true;
    }

    // ========================================================================
    // Derived values
    // ========================================================================

    /// %CPU of `rec` over the last interval, before any display ceiling.
    pub fn task_cpu(&self, rec: &ProcessRecord) -> f64 {
        cpu_percent(
            rec.pcpu,
            self.history.elapsed_secs(),
            self.tick_rate,
            self.cpu_normalization(),
            f64::INFINITY,
        )
    }

    /// Multiplier turning interval tics into %CPU.
    pub fn pct_factor(&self) -> f64 {
        percent_scale(self.history.elapsed_secs(), self.tick_rate, self.cpu_normalization())
    }

    fn cpu_normalization(&self) -> u32 {
        if self.irixps {
            1
        } else {
            self.ncpu as u32
        }
    }

    /// Orders the frame's records for window `i`.
    pub fn arrange(&mut self, i: usize) {
        let w = &mut self.stack.wins[i];
        w.order.clear();
        if w.has(SHOW_FOREST) {
            w.order = forest::linearize(&self.records);
            return;
        }
        let ctx = SortContext {
            cumulative: w.has(SHOW_CTIMES),
            cmdline: w.has(SHOW_CMDLIN),
        };
        let mut idx: Vec<usize> = (0..self.records.len()).collect();
        sort_indices(&mut idx, &self.records, w.rc.sortindx, w.has(QSRT_NORMAL), ctx);
        w.order.extend(idx.into_iter().map(Placement::flat));
    }

    /// Number of records in the current frame
    pub fn frame_maxtask(&self) -> usize {
        self.records.len()
    }

    // ========================================================================
    // Messages and persistence
    // ========================================================================

    /// Shows `text` on the message row for the next frame.
    pub fn show_msg(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(msg = %text, "message");
        self.msg = Some(Message {
            text,
            expires: Instant::now() + Duration::from_millis(MESSAGE_DURATION_MS),
        });
    }

    /// The message to show at `now`, dropping an expired one.
    pub fn active_msg(&mut self, now: Instant) -> Option<&str> {
        if self.msg.as_ref().is_some_and(|m| m.expires <= now) {
            self.msg = None;
        }
        self.msg.as_ref().map(|m| m.text.as_str())
    }

    /// The persistable part of the state.
    pub fn rc_config(&self) -> RcConfig {
        let wins: [WinRc; GROUPSMAX] = std::array::from_fn(|i| self.stack.wins[i].rc.clone());
        RcConfig {
            altscr: self.altscr,
            irixps: self.irixps,
            delay: self.delay,
            curwin: self.stack.curwin,
            wins,
        }
    }

    /// Writes the rc file, reporting the outcome on the message row.
    pub fn write_rcfile(&mut self) {
        let path = self.rc_path.display().to_string();
        match super::rcfile::write(&self.rc_path, &self.rc_config()) {
            Ok(()) => self.show_msg(format!("Wrote configuration to '{}'", path)),
            Err(e) => self.show_msg(format!("Failed '{}' open: {}", path, e)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::system::error::SnapshotResult;
    use std::collections::VecDeque;

    /// Provider replaying scripted frames; the last frame repeats.
    pub(crate) struct ScriptedProvider {
        pub frames: VecDeque<Vec<ProcessRecord>>,
        pub requests: Arc<std::sync::Mutex<Vec<Categories>>>,
    }

    impl SnapshotProvider for ScriptedProvider {
        fn snapshot(
            &mut self,
            request: &SnapshotRequest<'_>,
            out: &mut Vec<ProcessRecord>,
        ) -> SnapshotResult<()> {
            if let Ok(mut seen) = self.requests.lock() {
                seen.push(request.categories);
            }
            let frame = if self.frames.len() > 1 {
                self.frames.pop_front().unwrap_or_default()
            } else {
                self.frames.front().cloned().unwrap_or_default()
            };
            out.clear();
            out.extend(frame);
            Ok(())
        }
    }

    pub(crate) fn task(tid: i32, utime: u64) -> ProcessRecord {
        ProcessRecord {
            tid,
            tgid: tid,
            ppid: 1,
            state: 'S',
            cmd: format!("cmd{}", tid),
            utime,
            ..Default::default()
        }
    }

    pub(crate) fn engine(frames: Vec<Vec<ProcessRecord>>) -> EngineState {
        let provider = ScriptedProvider {
            frames: frames.into(),
            requests: Arc::default(),
        };
        let mut state = EngineState::new(
            Box::new(provider),
            "/nonexistent/proc-root",
            None,
            SystemRc::default(),
            PathBuf::from("/nonexistent/.ptoprc"),
        )
        .unwrap();
        state.ncpu_probe = || 1;
        state.ncpu = 1;
        state.tick_rate = 100;
        state
    }

    #[test]
    fn test_one_busy_second_is_full_cpu() {
        let mut state = engine(vec![vec![task(100, 200)], vec![task(100, 300)]]);
        state.irixps = true;
        let t0 = Instant::now();
        state.refresh_at(t0).unwrap();
        state.refresh_at(t0 + Duration::from_secs(1)).unwrap();

        let rec = &state.records[0];
        assert_eq!(rec.pcpu, 100);
        assert!((state.task_cpu(rec) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_solaris_mode_divides_by_cpus() {
        let mut state = engine(vec![vec![task(100, 0)], vec![task(100, 200)]]);
        state.irixps = false;
        state.ncpu_probe = || 4;
        let t0 = Instant::now();
        state.refresh_at(t0).unwrap();
        state.refresh_at(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(state.ncpu, 4);
        assert!((state.task_cpu(&state.records[0]) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_extra_refresh_keeps_cpu_interval() {
        let frames = [0, 100, 175, 200]
            .into_iter()
            .map(|tics| vec![task(100, tics)])
            .collect();
        let mut state = engine(frames);
        state.irixps = true;
        let t0 = Instant::now();
        state.refresh_at(t0).unwrap();
        state.refresh_at(t0 + Duration::from_secs(1)).unwrap();
        assert!((state.task_cpu(&state.records[0]) - 100.0).abs() < 1e-9);

        state.request_extra_refresh();
        state.refresh_at(t0 + Duration::from_secs(2)).unwrap();
        let rec = &state.records[0];
        assert_eq!(rec.pcpu, 25);
        assert!((state.history.elapsed_secs() - 0.25).abs() < 1e-9);
        assert!((state.task_cpu(rec) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_task_counts_follow_states() {
        let mut running = task(2, 0);
        running.state = 'R';
        let mut zombie = task(3, 0);
        zombie.state = 'Z';
        let mut state = engine(vec![vec![task(1, 0), running, zombie]]);
        state.refresh().unwrap();
        let c = state.history.counts;
        assert_eq!((c.total, c.running, c.sleeping, c.zombie), (3, 1, 1, 1));
    }

    #[test]
    fn test_cpu_count_change_requests_recalibration() {
        let mut state = engine(vec![vec![task(1, 0)]]);
        state.latch.begin();
        state.latch.finish();
        assert!(!state.latch.is_pending());
        state.ncpu_probe = || 2;
        state.force_sysinfo();
        state.refresh().unwrap();
        assert_eq!(state.ncpu, 2);
        assert!(state.latch.is_pending());
    }

    #[test]
    fn test_arrange_sorts_per_window() {
        let mut state = engine(vec![vec![task(5, 10), task(9, 30), task(7, 20)]]);
        let t0 = Instant::now();
        state.refresh_at(t0).unwrap();
        state.arrange(0);
        let tids: Vec<i32> = state.stack.wins[0]
            .order
            .iter()
            .map(|p| state.records[p.idx].tid)
            .collect();
        // default window sorts by %CPU, largest first
        assert_eq!(tids, vec![9, 7, 5]);

        state.stack.wins[1].clear(QSRT_NORMAL);
        state.arrange(1);
        let tids: Vec<i32> = state.stack.wins[1]
            .order
            .iter()
            .map(|p| state.records[p.idx].tid)
            .collect();
        assert_eq!(tids, vec![5, 7, 9]);
    }

    #[test]
    fn test_message_expires() {
        let mut state = engine(vec![vec![]]);
        state.show_msg("hello");
        let now = Instant::now();
        assert_eq!(state.active_msg(now), Some("hello"));
        assert_eq!(state.active_msg(now + Duration::from_secs(5)), None);
        assert!(state.msg.is_none());
    }

    #[test]
    fn test_write_rcfile_reports_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = engine(vec![vec![]]);
        state.rc_path = dir.path().join(".ptoprc");
        state.write_rcfile();
        assert!(state.msg.as_ref().unwrap().text.starts_with("Wrote configuration"));
        assert!(state.rc_path.exists());

        state.rc_path = dir.path().join("missing-dir").join(".ptoprc");
        state.write_rcfile();
        assert!(state.msg.as_ref().unwrap().text.starts_with("Failed '"));
    }
}
