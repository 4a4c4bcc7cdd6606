//! Field catalog
//!
//! Every displayable process attribute has one fixed entry here: its
//! header, whether its width is fixed or shared with the other variable
//! columns, how its value scales, which snapshot categories it needs and
//! how two records compare on it.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use crate::constants::{CPU_PMAX_DEFAULT, CPU_PMAX_IRIX_LIMIT};
use crate::system::error::{SetupError, SetupResult};
use crate::system::metrics::ScaleKind;
use crate::system::snapshot::{Categories, ProcessRecord};

/// Number of entries in the catalog
pub const FIELD_COUNT: usize = 39;

/// Catalog position of each field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FieldId {
    Pid = 0,
    Ppid,
    Uid,
    User,
    Ruid,
    Ruser,
    Suid,
    Suser,
    Gid,
    Group,
    Pgrp,
    Tty,
    Tpgid,
    Sid,
    Pr,
    Ni,
    Nth,
    LastCpu,
    Cpu,
    Time,
    TimePlus,
    Mem,
    Virt,
    Swap,
    Res,
    Code,
    Data,
    Shr,
    MajFlt,
    MinFlt,
    Dirty,
    State,
    Command,
    Wchan,
    Flags,
    Cgroups,
    SupGids,
    SupGrps,
    Tgid,
}

impl FieldId {
    /// Every field in catalog order
    pub const ALL: [FieldId; FIELD_COUNT] = [
        FieldId::Pid,
        FieldId::Ppid,
        FieldId::Uid,
        FieldId::User,
        FieldId::Ruid,
        FieldId::Ruser,
        FieldId::Suid,
        FieldId::Suser,
        FieldId::Gid,
        FieldId::Group,
        FieldId::Pgrp,
        FieldId::Tty,
        FieldId::Tpgid,
        FieldId::Sid,
        FieldId::Pr,
        FieldId::Ni,
        FieldId::Nth,
        FieldId::LastCpu,
        FieldId::Cpu,
        FieldId::Time,
        FieldId::TimePlus,
        FieldId::Mem,
        FieldId::Virt,
        FieldId::Swap,
        FieldId::Res,
        FieldId::Code,
        FieldId::Data,
        FieldId::Shr,
        FieldId::MajFlt,
        FieldId::MinFlt,
        FieldId::Dirty,
        FieldId::State,
        FieldId::Command,
        FieldId::Wchan,
        FieldId::Flags,
        FieldId::Cgroups,
        FieldId::SupGids,
        FieldId::SupGrps,
        FieldId::Tgid,
    ];

    /// Position in the catalog
    pub fn index(self) -> usize {
        self as usize
    }

    /// Field at catalog position `idx`
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Static catalog entry
    pub fn desc(self) -> &'static FieldDesc {
        &CATALOG[self.index()]
    }

    /// True for the columns that share leftover screen width
    pub fn is_variable(self) -> bool {
        self.desc().width.is_none()
    }
}

/// One catalog entry
#[derive(Debug)]
pub struct FieldDesc {
    /// Default column header, including its trailing space
    pub head: &'static str,
    /// Content width for fixed columns, `None` for variable ones
    pub width: Option<usize>,
    /// Unit of the value for scaled columns
    pub scale: Option<ScaleKind>,
    /// Snapshot categories the value depends on
    pub categories: Categories,
    /// Short description for the fields manager
    pub description: &'static str,
}

const fn fixed(
    head: &'static str,
    scale: Option<ScaleKind>,
    categories: Categories,
    description: &'static str,
) -> FieldDesc {
    FieldDesc {
        head,
        width: Some(head.len() - 1),
        scale,
        categories,
        description,
    }
}

const fn variable(head: &'static str, categories: Categories, description: &'static str) -> FieldDesc {
    FieldDesc {
        head,
        width: None,
        scale: None,
        categories,
        description,
    }
}

const KB: Option<ScaleKind> = Some(ScaleKind::Kb);
const COUNT: Option<ScaleKind> = Some(ScaleKind::Count);

static CATALOG: [FieldDesc; FIELD_COUNT] = [
    fixed("  PID ", None, Categories::NONE, "Process Id"),
    fixed(" PPID ", None, Categories::EITHER, "Parent Process pid"),
    fixed("  UID ", None, Categories::NONE, "Effective User Id"),
    fixed("USER     ", None, Categories::EUSER, "Effective User Name"),
    fixed(" RUID ", None, Categories::STATUS, "Real User Id"),
    fixed("RUSER    ", None, Categories::OUSER, "Real User Name"),
    fixed(" SUID ", None, Categories::STATUS, "Saved User Id"),
    fixed("SUSER    ", None, Categories::OUSER, "Saved User Name"),
    fixed("  GID ", None, Categories::NONE, "Group Id"),
    fixed("GROUP    ", None, Categories::EGROUP, "Group Name"),
    fixed(" PGRP ", None, Categories::STAT, "Process Group Id"),
    fixed("TTY      ", None, Categories::STAT, "Controlling Tty"),
    fixed("TPGID ", None, Categories::STAT, "Tty Process Grp Id"),
    fixed("  SID ", None, Categories::STAT, "Session Id"),
    fixed(" PR ", None, Categories::STAT, "Priority"),
    fixed(" NI ", None, Categories::STAT, "Nice Value"),
    fixed("nTH ", None, Categories::EITHER, "Number of Threads"),
    fixed("P ", None, Categories::STAT, "Last Used Cpu (SMP)"),
    fixed(" %CPU ", None, Categories::STAT, "CPU Usage"),
    fixed("  TIME ", None, Categories::STAT, "CPU Time"),
    fixed("   TIME+  ", None, Categories::STAT, "CPU Time, hundredths"),
    fixed("%MEM ", None, Categories::STATM, "Memory Usage (RES)"),
    fixed(" VIRT ", KB, Categories::STATM, "Virtual Image (kb)"),
    fixed("SWAP ", KB, Categories::STATUS, "Swapped Size (kb)"),
    fixed(" RES ", KB, Categories::STATM, "Resident Size (kb)"),
    fixed("CODE ", KB, Categories::STATM, "Code Size (kb)"),
    fixed("DATA ", KB, Categories::STATM, "Data+Stack Size (kb)"),
    fixed(" SHR ", KB, Categories::STATM, "Shared Memory (kb)"),
    fixed("nMaj ", COUNT, Categories::STAT, "Major Page Faults"),
    fixed("nMin ", COUNT, Categories::STAT, "Minor Page Faults"),
    fixed("nDRT ", COUNT, Categories::STATM, "Dirty Pages Count"),
    fixed("S ", None, Categories::EITHER, "Process Status"),
    variable("COMMAND  ", Categories::EITHER, "Command Name/Line"),
    variable("WCHAN    ", Categories::WCHAN, "Sleeping in Function"),
    fixed("Flags    ", None, Categories::STAT, "Task Flags <sched.h>"),
    variable("CGROUPS  ", Categories::CGROUP, "Control Groups"),
    variable("SUPGIDS  ", Categories::STATUS, "Supp Groups IDs"),
    variable("SUPGRPS  ", Categories::SUPGRP, "Supp Groups Names"),
    fixed(" TGID ", None, Categories::STATUS, "Thread Group Id"),
];

/// Fields whose header follows the pid width
const PID_LIKE: [(FieldId, &str); 6] = [
    (FieldId::Pid, "PID"),
    (FieldId::Ppid, "PPID"),
    (FieldId::Pgrp, "PGRP"),
    (FieldId::Sid, "SID"),
    (FieldId::Tgid, "TGID"),
    (FieldId::Tpgid, "TPGID"),
];

// ============================================================================
// Runtime column headers
// ============================================================================

/// How %CPU values are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuFormat {
    /// Four columns, one decimal
    Narrow,
    /// Five columns, one decimal
    WideDecimal,
    /// Five columns, no decimals
    WideWhole,
}

/// Headers and widths that depend on the machine.
///
/// Built once at startup and again whenever the cpu count changes.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    heads: Vec<String>,
    /// Digits needed for a pid
    pub pid_digits: usize,
    /// Digits needed for a cpu number
    pub cpu_digits: usize,
    /// Highest %CPU that is displayed
    pub cpu_pmax: f64,
    /// %CPU print format
    pub cpu_format: CpuFormat,
}

impl ColumnSpec {
    /// Sizes the pid, cpu-number and %CPU columns.
    pub fn new(pid_digits: usize, ncpu: usize, irix: bool, threads: bool) -> SetupResult<Self> {
        if pid_digits > 10 {
            return Err(SetupError::PidWidth);
        }
        let cpu_digits = ncpu.max(1).to_string().len();
        if cpu_digits > 5 {
            return Err(SetupError::CpuWidth);
        }
        let pid_digits = pid_digits.max(5);

        let mut heads: Vec<String> = CATALOG.iter().map(|d| d.head.to_string()).collect();
        for (field, name) in PID_LIKE {
            heads[field.index()] = format!("{:>w$} ", name, w = pid_digits);
        }
        heads[FieldId::LastCpu.index()] = format!("{:>w$} ", "P", w = cpu_digits);

        let (cpu_pmax, cpu_format) = if irix && ncpu > 1 && !threads {
            let pmax = 100.0 * ncpu as f64;
            if ncpu > 10 {
                (pmax.min(CPU_PMAX_IRIX_LIMIT), CpuFormat::WideWhole)
            } else {
                (pmax.min(999.9), CpuFormat::WideDecimal)
            }
        } else {
            (CPU_PMAX_DEFAULT, CpuFormat::Narrow)
        };

        Ok(Self {
            heads,
            pid_digits,
            cpu_digits,
            cpu_pmax,
            cpu_format,
        })
    }

    /// Header text of `field`, including the trailing space
    pub fn head(&self, field: FieldId) -> &str {
        &self.heads[field.index()]
    }

    /// Content width of a fixed column
    pub fn width(&self, field: FieldId) -> usize {
        self.heads[field.index()].len().saturating_sub(1)
    }
}

/// Digits needed for the largest possible pid, at least 5.
pub fn pid_digits(proc_root: &Path) -> usize {
    fs::read_to_string(proc_root.join("sys/kernel/pid_max"))
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|max| max.saturating_sub(1).to_string().len())
        .unwrap_or(5)
        .max(5)
}

// ============================================================================
// Sorting
// ============================================================================

/// Window toggles that change how some fields compare
#[derive(Debug, Clone, Copy, Default)]
pub struct SortContext {
    /// TIME/TIME+ include reaped children
    pub cumulative: bool,
    /// COMMAND compares the full command line
    pub cmdline: bool,
}

/// Compares two records on `field`, smallest first.
pub fn compare(field: FieldId, a: &ProcessRecord, b: &ProcessRecord, ctx: SortContext) -> Ordering {
    use FieldId::*;
    match field {
        Pid => a.tid.cmp(&b.tid),
        Ppid => a.ppid.cmp(&b.ppid),
        Uid => a.euid.cmp(&b.euid),
        User => a.euser.cmp(&b.euser),
        Ruid => a.ruid.cmp(&b.ruid),
        Ruser => a.ruser.cmp(&b.ruser),
        Suid => a.suid.cmp(&b.suid),
        Suser => a.suser.cmp(&b.suser),
        Gid => a.egid.cmp(&b.egid),
        Group => a.egroup.cmp(&b.egroup),
        Pgrp => a.pgrp.cmp(&b.pgrp),
        Tty => a.tty.cmp(&b.tty),
        Tpgid => a.tpgid.cmp(&b.tpgid),
        Sid => a.session.cmp(&b.session),
        Pr => a.priority.cmp(&b.priority),
        Ni => a.nice.cmp(&b.nice),
        Nth => a.nlwp.cmp(&b.nlwp),
        LastCpu => a.processor.cmp(&b.processor),
        Cpu => a.pcpu.cmp(&b.pcpu),
        Time | TimePlus => {
            if ctx.cumulative {
                a.cumulative_tics().cmp(&b.cumulative_tics())
            } else {
                a.tics().cmp(&b.tics())
            }
        }
        Mem | Res => a.resident.cmp(&b.resident),
        Virt => a.size.cmp(&b.size),
        Swap => a.vm_swap.cmp(&b.vm_swap),
        Code => a.trs.cmp(&b.trs),
        Data => a.drs.cmp(&b.drs),
        Shr => a.share.cmp(&b.share),
        MajFlt => a.maj_flt.cmp(&b.maj_flt),
        MinFlt => a.min_flt.cmp(&b.min_flt),
        Dirty => a.dt.cmp(&b.dt),
        State => a.state.cmp(&b.state),
        Command => {
            if ctx.cmdline && !(a.cmdline.is_empty() && b.cmdline.is_empty()) {
                a.cmdline.cmp(&b.cmdline)
            } else {
                a.cmd.cmp(&b.cmd)
            }
        }
        Wchan => a.wchan.cmp(&b.wchan),
        Flags => a.flags.cmp(&b.flags),
        Cgroups => a.cgroup.cmp(&b.cgroup),
        SupGids => a.supgid.cmp(&b.supgid),
        SupGrps => a.supgrp.cmp(&b.supgrp),
        Tgid => a.tgid.cmp(&b.tgid),
    }
}

/// Orders `order` (indices into `records`) by `field`.
///
/// `normal` puts the largest values first.
pub fn sort_indices(
    order: &mut [usize],
    records: &[ProcessRecord],
    field: FieldId,
    normal: bool,
    ctx: SortContext,
) {
    order.sort_by(|&i, &j| {
        let ord = compare(field, &records[i], &records[j], ctx);
        if normal {
            ord.reverse()
        } else {
            ord
        }
    });
}
