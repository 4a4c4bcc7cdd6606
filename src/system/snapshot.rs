//! Process table snapshots from a `/proc`-like hierarchy
//!
//! The engine asks for the smallest set of [`Categories`] its visible
//! fields need; [`ProcSnapshot`] reads only the pseudo-files those
//! categories name. Record storage is overwritten in place between frames.

use std::fs;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{SnapshotError, SnapshotResult};
use super::users::UserCache;

// ============================================================================
// Categories
// ============================================================================

/// Bitmask of attribute groups a snapshot should populate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Categories(u32);

impl Categories {
    /// Nothing beyond the pid directory itself
    pub const NONE: Self = Self(0);
    /// `/proc/<pid>/stat`
    pub const STAT: Self = Self(0x0001);
    /// `/proc/<pid>/statm`
    pub const STATM: Self = Self(0x0002);
    /// `/proc/<pid>/status`
    pub const STATUS: Self = Self(0x0004);
    /// `/proc/<pid>/cmdline`
    pub const CMDLINE: Self = Self(0x0008);
    /// `/proc/<pid>/cgroup`
    pub const CGROUP: Self = Self(0x0010);
    /// Effective user name
    pub const EUSER: Self = Self(0x0020);
    /// Real and saved user names (needs status)
    pub const OUSER: Self = Self(0x0040 | 0x0004);
    /// Effective group name (needs status)
    pub const EGROUP: Self = Self(0x0080 | 0x0004);
    /// Supplementary group names (needs status)
    pub const SUPGRP: Self = Self(0x0100 | 0x0004);
    /// `/proc/<pid>/wchan` (needs stat for the raw address)
    pub const WCHAN: Self = Self(0x0200 | 0x0001);
    /// Satisfied by either stat or status
    pub const EITHER: Self = Self(0x8000);

    /// Raw bits
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bit is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Turns the aggregated field requirements into a concrete read set.
    ///
    /// `EITHER` is served by stat when stat is read anyway, otherwise by
    /// status. An empty set falls back to stat.
    #[must_use]
    pub fn resolve(self) -> Self {
        let mut out = Self(self.0 & !Self::EITHER.0);
        if self.contains(Self::EITHER) && !self.contains(Self::STAT) {
            out |= Self::STATUS;
        }
        if out.is_empty() {
            out = Self::STAT;
        }
        out
    }
}

impl BitOr for Categories {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Categories {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Process Record
// ============================================================================

/// One process (or thread) as of the current snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    /// Task id (the pid outside thread mode)
    pub tid: i32,
    /// Thread group id
    pub tgid: i32,
    /// Parent pid
    pub ppid: i32,
    /// Process group
    pub pgrp: i32,
    /// Session id
    pub session: i32,
    /// Controlling terminal device number
    pub tty: i32,
    /// Foreground process group of the terminal
    pub tpgid: i32,
    /// Kernel task flags
    pub flags: u64,
    /// Minor faults
    pub min_flt: u64,
    /// Major faults
    pub maj_flt: u64,
    /// User mode tics
    pub utime: u64,
    /// Kernel mode tics
    pub stime: u64,
    /// Waited-for children user tics
    pub cutime: u64,
    /// Waited-for children kernel tics
    pub cstime: u64,
    /// Kernel priority
    pub priority: i64,
    /// Nice value
    pub nice: i64,
    /// Thread count
    pub nlwp: i64,
    /// Last cpu the task ran on
    pub processor: i32,
    /// State code (`R`, `S`, `D`, `Z`, `T`, ...)
    pub state: char,
    /// Command name
    pub cmd: String,
    /// Argument vector, empty unless requested
    pub cmdline: Vec<String>,
    /// Total program size in pages
    pub size: u64,
    /// Resident pages
    pub resident: u64,
    /// Shared pages
    pub share: u64,
    /// Text (code) pages
    pub trs: u64,
    /// Data and stack pages
    pub drs: u64,
    /// Dirty pages
    pub dt: u64,
    /// Swapped out KiB
    pub vm_swap: u64,
    /// Real uid
    pub ruid: u32,
    /// Effective uid
    pub euid: u32,
    /// Saved uid
    pub suid: u32,
    /// Filesystem uid
    pub fuid: u32,
    /// Real gid
    pub rgid: u32,
    /// Effective gid
    pub egid: u32,
    /// Effective user name
    pub euser: String,
    /// Real user name
    pub ruser: String,
    /// Saved user name
    pub suser: String,
    /// Effective group name
    pub egroup: String,
    /// Supplementary gids, comma separated
    pub supgid: String,
    /// Supplementary group names, comma separated
    pub supgrp: String,
    /// Control groups, comma separated
    pub cgroup: String,
    /// Wait channel name or address
    pub wchan: String,
    /// Tics consumed during the last interval (set by the engine)
    pub pcpu: u64,
}

impl ProcessRecord {
    /// User plus system tics
    pub fn tics(&self) -> u64 {
        self.utime + self.stime
    }

    /// User plus system tics including reaped children
    pub fn cumulative_tics(&self) -> u64 {
        self.tics() + self.cutime + self.cstime
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Parameters of one snapshot request
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRequest<'a> {
    /// Attribute groups to populate
    pub categories: Categories,
    /// When set, only these pids are read
    pub pids: Option<&'a [i32]>,
    /// Enumerate every thread instead of every process
    pub threads: bool,
}

/// Source of process table snapshots
pub trait SnapshotProvider {
    /// Fills `out` with one record per task, reusing its storage.
    ///
    /// Only failing to enumerate the source as a whole is an error.
    fn snapshot(
        &mut self,
        request: &SnapshotRequest<'_>,
        out: &mut Vec<ProcessRecord>,
    ) -> SnapshotResult<()>;
}

/// Snapshot provider over a `/proc` directory
#[derive(Debug)]
pub struct ProcSnapshot {
    root: PathBuf,
    users: UserCache,
}

impl ProcSnapshot {
    /// Reads from `root`, usually `/proc`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            users: UserCache::new(),
        }
    }

    /// Numeric entries of `dir`, in directory order
    fn numeric_entries(dir: &Path) -> io::Result<Vec<i32>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)?.flatten() {
            if let Some(id) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                out.push(id);
            }
        }
        Ok(out)
    }

    /// Populates `rec` from the task directory `dir`.
    fn read_task(
        &mut self,
        dir: &Path,
        tid: i32,
        tgid: i32,
        cats: Categories,
        rec: &mut ProcessRecord,
    ) -> SnapshotResult<()> {
        let pid_io = |source| SnapshotError::PidIo { pid: tid, source };

        let meta = fs::metadata(dir).map_err(pid_io)?;
        rec.tid = tid;
        rec.tgid = tgid;
        rec.euid = meta.uid();
        rec.egid = meta.gid();
        rec.pcpu = 0;
        rec.cmdline.clear();

        let mut wchan_addr = 0;
        if cats.contains(Categories::STAT) {
            let content = fs::read_to_string(dir.join("stat")).map_err(pid_io)?;
            wchan_addr = parse_stat(&content, rec).ok_or(SnapshotError::MalformedStat { pid: tid })?;
        }
        if cats.contains(Categories::STATM) {
            let content = fs::read_to_string(dir.join("statm")).map_err(pid_io)?;
            parse_statm(&content, rec);
        }
        if cats.contains(Categories::STATUS) {
            let content = fs::read_to_string(dir.join("status")).map_err(pid_io)?;
            parse_status(&content, rec, !cats.contains(Categories::STAT));
        }
        if cats.contains(Categories::CMDLINE) {
            let raw = fs::read(dir.join("cmdline")).unwrap_or_default();
            rec.cmdline = split_cmdline(&raw);
        }
        if cats.contains(Categories::CGROUP) {
            let content = fs::read_to_string(dir.join("cgroup")).unwrap_or_default();
            rec.cgroup = join_cgroups(&content);
        }
        if cats.contains(Categories::WCHAN) {
            let name = fs::read_to_string(dir.join("wchan")).unwrap_or_default();
            rec.wchan = wchan_text(name.trim(), wchan_addr);
        } else {
            rec.wchan.clear();
        }

        if cats.contains(Categories::EUSER) {
            rec.euser = self.users.user_name(rec.euid);
        }
        if cats.contains(Categories::OUSER) {
            rec.ruser = self.users.user_name(rec.ruid);
            rec.suser = self.users.user_name(rec.suid);
        }
        if cats.contains(Categories::EGROUP) {
            rec.egroup = self.users.group_name(rec.egid);
        }
        if cats.contains(Categories::SUPGRP) {
            rec.supgrp = self.supplementary_names(&rec.supgid);
        }
        Ok(())
    }

    fn supplementary_names(&mut self, supgid: &str) -> String {
        if supgid == "n/a" {
            return supgid.to_string();
        }
        supgid
            .split(',')
            .filter_map(|g| g.parse::<u32>().ok())
            .map(|g| self.users.group_name(g))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl SnapshotProvider for ProcSnapshot {
    fn snapshot(
        &mut self,
        request: &SnapshotRequest<'_>,
        out: &mut Vec<ProcessRecord>,
    ) -> SnapshotResult<()> {
        let pids = match request.pids {
            Some(list) => list.to_vec(),
            None => Self::numeric_entries(&self.root).map_err(|source| {
                SnapshotError::Unavailable {
                    path: self.root.clone(),
                    source,
                }
            })?,
        };

        let mut used = 0;
        for pid in pids {
            let pid_dir = self.root.join(pid.to_string());
            let tasks: Vec<(PathBuf, i32)> = if request.threads {
                let task_dir = pid_dir.join("task");
                match Self::numeric_entries(&task_dir) {
                    Ok(tids) => tids.into_iter().map(|t| (task_dir.join(t.to_string()), t)).collect(),
                    Err(_) => vec![(pid_dir.clone(), pid)],
                }
            } else {
                vec![(pid_dir.clone(), pid)]
            };

            for (dir, tid) in tasks {
                if used == out.len() {
                    out.push(ProcessRecord::default());
                }
                match self.read_task(&dir, tid, pid, request.categories, &mut out[used]) {
                    Ok(()) => used += 1,
                    Err(e) => debug!("skipping task: {}", e),
                }
            }
        }
        out.truncate(used);
        Ok(())
    }
}

// ============================================================================
// Parsers
// ============================================================================

/// Parses a stat line into `rec`, returning the raw wait channel address.
///
/// The command name is whatever lies between the first `(` and the last
/// `)`, so names containing spaces or parentheses survive.
pub fn parse_stat(content: &str, rec: &mut ProcessRecord) -> Option<u64> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    rec.cmd.clear();
    rec.cmd.push_str(&content[open + 1..close]);

    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 37 {
        return None;
    }
    let num = |i: usize| rest[i].parse::<i64>().unwrap_or(0);
    let unum = |i: usize| rest[i].parse::<u64>().unwrap_or(0);

    rec.state = rest[0].chars().next().unwrap_or('?');
    rec.ppid = num(1) as i32;
    rec.pgrp = num(2) as i32;
    rec.session = num(3) as i32;
    rec.tty = num(4) as i32;
    rec.tpgid = num(5) as i32;
    rec.flags = unum(6);
    rec.min_flt = unum(7);
    rec.maj_flt = unum(9);
    rec.utime = unum(11);
    rec.stime = unum(12);
    rec.cutime = unum(13);
    rec.cstime = unum(14);
    rec.priority = num(15);
    rec.nice = num(16);
    rec.nlwp = num(17);
    rec.processor = num(36) as i32;
    Some(unum(32))
}

/// Parses a statm line (page counts) into `rec`.
pub fn parse_statm(content: &str, rec: &mut ProcessRecord) {
    let mut it = content.split_whitespace().map(|s| s.parse::<u64>().unwrap_or(0));
    rec.size = it.next().unwrap_or(0);
    rec.resident = it.next().unwrap_or(0);
    rec.share = it.next().unwrap_or(0);
    rec.trs = it.next().unwrap_or(0);
    let _lib = it.next();
    rec.drs = it.next().unwrap_or(0);
    rec.dt = it.next().unwrap_or(0);
}

/// Parses a status file into `rec`.
///
/// With `basics` set, name, state, ppid and thread count come from here
/// too (stat was not read).
pub fn parse_status(content: &str, rec: &mut ProcessRecord, basics: bool) {
    rec.vm_swap = 0;
    rec.supgid.clear();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let ids = || -> Vec<u32> { value.split_whitespace().filter_map(|s| s.parse().ok()).collect() };
        match key {
            "Name" if basics => {
                rec.cmd.clear();
                rec.cmd.push_str(value);
            }
            "State" if basics => rec.state = value.chars().next().unwrap_or('?'),
            "PPid" if basics => rec.ppid = value.parse().unwrap_or(0),
            "Threads" if basics => rec.nlwp = value.parse().unwrap_or(0),
            "Tgid" => rec.tgid = value.parse().unwrap_or(rec.tgid),
            "Uid" => {
                let v = ids();
                if v.len() >= 4 {
                    rec.ruid = v[0];
                    rec.euid = v[1];
                    rec.suid = v[2];
                    rec.fuid = v[3];
                }
            }
            "Gid" => {
                let v = ids();
                if v.len() >= 2 {
                    rec.rgid = v[0];
                    rec.egid = v[1];
                }
            }
            "Groups" => {
                let joined = value.split_whitespace().collect::<Vec<_>>().join(",");
                rec.supgid.push_str(&joined);
            }
            "VmSwap" => {
                rec.vm_swap = value
                    .split_whitespace()
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
            }
            _ => {}
        }
    }
    if rec.supgid.is_empty() {
        rec.supgid.push_str("n/a");
    }
}

/// Splits a NUL separated argument vector.
pub fn split_cmdline(raw: &[u8]) -> Vec<String> {
    raw.split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Joins cgroup membership lines with `,`; `n/a` when there are none.
pub fn join_cgroups(content: &str) -> String {
    let joined = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        "n/a".to_string()
    } else {
        joined
    }
}

/// Wait channel display text: symbol, raw address, or `-`.
pub fn wchan_text(symbol: &str, addr: u64) -> String {
    if !symbol.is_empty() && symbol != "0" {
        symbol.to_string()
    } else if addr != 0 {
        format!("{:08x}", addr)
    } else {
        "-".to_string()
    }
}

/// Short terminal name for a device number.
pub fn tty_name(dev: i32) -> String {
    if dev <= 0 {
        return "?".to_string();
    }
    let dev = dev as u32;
    let major = (dev >> 8) & 0xfff;
    let minor = (dev & 0xff) | ((dev >> 12) & 0xfff00);
    match major {
        136..=143 => format!("pts/{}", minor + (major - 136) * 256),
        4 if minor < 64 => format!("tty{}", minor),
        4 => format!("ttyS{}", minor - 64),
        _ => "?".to_string(),
    }
}
