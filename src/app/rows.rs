//! Task row formatting
//!
//! Each displayed column becomes one cell. Cells carry their trailing
//! separator so a row is just the cells concatenated.

use crate::system::metrics::{scale_duration, scale_magnitude, ScaleKind};
use crate::system::snapshot::tty_name;
use crate::system::ProcessRecord;

use super::fields::{ColumnSpec, CpuFormat, FieldId};
use super::forest;
use super::state::EngineState;
use super::window::{Window, SHOW_CMDLIN, SHOW_CTIMES};

/// Everything a cell needs besides the record itself
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    /// Machine dependent widths
    pub columns: &'a ColumnSpec,
    /// Width of each variable column
    pub varcolsz: usize,
    /// TIME/TIME+ include reaped children
    pub cumulative: bool,
    /// COMMAND shows the full command line
    pub cmdline: bool,
    /// Multiplier turning interval tics into %CPU
    pub pct_factor: f64,
    /// Highest %CPU displayed
    pub cpu_pmax: f64,
    /// Physical memory in KiB
    pub mem_total_kb: u64,
    /// log2 of the page size
    pub page_shift: u32,
    /// Clock ticks per second
    pub tick_rate: u64,
}

fn num(value: impl std::fmt::Display, width: usize) -> String {
    format!("{:>w$} ", value, w = width)
}

fn text(value: &str, width: usize) -> String {
    format!("{:<w$.w$} ", value, w = width)
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "n/a"
    } else {
        value
    }
}

fn pages_kb(pages: u64, page_shift: u32) -> u64 {
    (pages << page_shift) >> 10
}

/// The priority column: real-time priorities do not fit and print `rt`.
fn priority_text(pr: i64) -> String {
    if !(-99..=999).contains(&pr) {
        "rt".to_string()
    } else {
        pr.to_string()
    }
}

/// Task flags with zero nibbles as dots
fn flags_text(flags: u64) -> String {
    format!("{:08x}", flags).replace('0', ".")
}

/// Renders one cell of `rec`, including its trailing space.
pub fn format_cell(field: FieldId, rec: &ProcessRecord, depth: u8, ctx: &CellContext<'_>) -> String {
    use FieldId::*;
    let w = ctx.columns.width(field);
    let mem = |pages: u64| scale_magnitude(pages_kb(pages, ctx.page_shift), w, ScaleKind::Kb);
    let count = |n: u64| scale_magnitude(n, w, ScaleKind::Count);

    match field {
        Pid => num(rec.tid, w),
        Ppid => num(rec.ppid, w),
        Tgid => num(rec.tgid, w),
        Pgrp => num(rec.pgrp, w),
        Sid => num(rec.session, w),
        Tpgid => num(rec.tpgid, w),
        Uid => num(rec.euid, w),
        Ruid => num(rec.ruid, w),
        Suid => num(rec.suid, w),
        Gid => num(rec.egid, w),
        User => text(&rec.euser, w),
        Ruser => text(&rec.ruser, w),
        Suser => text(&rec.suser, w),
        Group => text(&rec.egroup, w),
        Tty => text(&tty_name(rec.tty), w),
        Pr => num(priority_text(rec.priority), w),
        Ni => num(rec.nice, w),
        Nth => num(rec.nlwp, w),
        LastCpu => num(rec.processor, w),
        Cpu => {
            let pct = (rec.pcpu as f64 * ctx.pct_factor).min(ctx.cpu_pmax);
            match ctx.columns.cpu_format {
                CpuFormat::WideWhole => format!("{:>w$.0} ", pct, w = w),
                _ => format!("{:>w$.1} ", pct, w = w),
            }
        }
        Time | TimePlus => {
            let tics = if ctx.cumulative {
                rec.cumulative_tics()
            } else {
                rec.tics()
            };
            num(scale_duration(tics, ctx.tick_rate, w), w)
        }
        Mem => {
            let pct = if ctx.mem_total_kb > 0 {
                pages_kb(rec.resident, ctx.page_shift) as f64 * 100.0 / ctx.mem_total_kb as f64
            } else {
                0.0
            };
            format!("{:>w$.1} ", pct, w = w)
        }
        Virt => num(mem(rec.size), w),
        Res => num(mem(rec.resident), w),
        Code => num(mem(rec.trs), w),
        Data => num(mem(rec.drs), w),
        Shr => num(mem(rec.share), w),
        Swap => num(scale_magnitude(rec.vm_swap, w, ScaleKind::Kb), w),
        MajFlt => num(count(rec.maj_flt), w),
        MinFlt => num(count(rec.min_flt), w),
        Dirty => num(count(rec.dt), w),
        State => text(&rec.state.to_string(), w),
        Flags => text(&flags_text(rec.flags), w),
        Command => {
            let name = if !ctx.cmdline {
                rec.cmd.clone()
            } else if rec.cmdline.is_empty() {
                format!("[{}]", rec.cmd)
            } else {
                rec.cmdline.join(" ")
            };
            text(&forest::decorate(depth, &name), ctx.varcolsz)
        }
        Wchan => text(&rec.wchan, ctx.varcolsz),
        Cgroups => text(or_na(&rec.cgroup), ctx.varcolsz),
        SupGids => text(or_na(&rec.supgid), ctx.varcolsz),
        SupGrps => text(or_na(&rec.supgrp), ctx.varcolsz),
    }
}

/// Cells of every displayed column of `w`, in display order.
pub fn row_cells(
    w: &Window,
    rec: &ProcessRecord,
    depth: u8,
    ctx: &CellContext<'_>,
) -> Vec<(FieldId, String)> {
    w.procflgs
        .iter()
        .map(|&f| (f, format_cell(f, rec, depth, ctx)))
        .collect()
}

impl EngineState {
    /// Cell context for window `i` in the current frame.
    pub fn cell_context(&self, i: usize) -> CellContext<'_> {
        let w = &self.stack.wins[i];
        CellContext {
            columns: &self.columns,
            varcolsz: w.varcolsz,
            cumulative: w.has(SHOW_CTIMES),
            cmdline: w.has(SHOW_CMDLIN),
            pct_factor: self.pct_factor(),
            cpu_pmax: self.columns.cpu_pmax,
            mem_total_kb: self.meminfo.main_total,
            page_shift: *crate::system::cpu::PAGE_SHIFT,
            tick_rate: self.tick_rate,
        }
    }

    /// Plain text of the row for `rec` in window `i`.
    pub fn row_text(&self, i: usize, rec: &ProcessRecord, depth: u8) -> String {
        let ctx = self.cell_context(i);
        let mut out = String::new();
        if self.altscr {
            out.push(' ');
        }
        for (_, cell) in row_cells(&self.stack.wins[i], rec, depth, &ctx) {
            out.push_str(&cell);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(columns: &ColumnSpec) -> CellContext<'_> {
        CellContext {
            columns,
            varcolsz: 12,
            cumulative: false,
            cmdline: false,
            pct_factor: 1.0,
            cpu_pmax: 99.9,
            mem_total_kb: 1000,
            page_shift: 12,
            tick_rate: 100,
        }
    }

    fn rec() -> ProcessRecord {
        ProcessRecord {
            tid: 42,
            tgid: 42,
            ppid: 1,
            state: 'R',
            cmd: "bash".to_string(),
            euser: "averyverylongname".to_string(),
            utime: 150,
            stime: 50,
            cutime: 1000,
            resident: 25,
            size: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_numbers_are_right_justified() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        assert_eq!(format_cell(FieldId::Pid, &rec(), 1, &ctx(&c)), "   42 ");
        assert_eq!(format_cell(FieldId::Ppid, &rec(), 1, &ctx(&c)), "    1 ");
    }

    #[test]
    fn test_strings_are_truncated() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        assert_eq!(format_cell(FieldId::User, &rec(), 1, &ctx(&c)), "averyver ");
        assert_eq!(format_cell(FieldId::State, &rec(), 1, &ctx(&c)), "R ");
    }

    #[test]
    fn test_cpu_is_capped() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        let mut r = rec();
        r.pcpu = 50;
        assert_eq!(format_cell(FieldId::Cpu, &r, 1, &ctx(&c)), " 50.0 ");
        r.pcpu = 500;
        assert_eq!(format_cell(FieldId::Cpu, &r, 1, &ctx(&c)), " 99.9 ");
    }

    #[test]
    fn test_memory_columns() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        // 25 pages of 4 KiB against 1000 KiB
        assert_eq!(format_cell(FieldId::Mem, &rec(), 1, &ctx(&c)), "10.0 ");
        assert_eq!(format_cell(FieldId::Res, &rec(), 1, &ctx(&c)), " 100 ");
        assert_eq!(format_cell(FieldId::Virt, &rec(), 1, &ctx(&c)), " 4000 ");
    }

    #[test]
    fn test_time_cumulative() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        let mut cx = ctx(&c);
        assert_eq!(format_cell(FieldId::TimePlus, &rec(), 1, &cx), "  0:02.00 ");
        cx.cumulative = true;
        assert_eq!(format_cell(FieldId::TimePlus, &rec(), 1, &cx), "  0:12.00 ");
    }

    #[test]
    fn test_command_variants() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        let mut cx = ctx(&c);
        assert_eq!(format_cell(FieldId::Command, &rec(), 1, &cx), format!("{:<13}", "bash"));
        assert_eq!(format_cell(FieldId::Command, &rec(), 2, &cx), format!("{:<13}", " `- bash"));
        cx.cmdline = true;
        assert_eq!(format_cell(FieldId::Command, &rec(), 1, &cx), format!("{:<13}", "[bash]"));
        let mut r = rec();
        r.cmdline = vec!["bash".to_string(), "-l".to_string()];
        assert_eq!(format_cell(FieldId::Command, &r, 1, &cx), format!("{:<13}", "bash -l"));
    }

    #[test]
    fn test_odd_columns() {
        let c = ColumnSpec::new(5, 1, false, false).unwrap();
        let mut r = rec();
        r.priority = -100;
        r.flags = 0x0040_0100;
        assert_eq!(format_cell(FieldId::Pr, &r, 1, &ctx(&c)), " rt ");
        assert_eq!(format_cell(FieldId::Flags, &r, 1, &ctx(&c)), "..4..1.. ");
        assert_eq!(format_cell(FieldId::Cgroups, &r, 1, &ctx(&c)), format!("{:<13}", "n/a"));
    }
}
