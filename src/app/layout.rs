//! Screen calibration and per-window column layout
//!
//! Runs whenever the latch says the terminal, the cpu count or a window's
//! field selection changed. Every visible window gets its column list,
//! its header line and its share of the variable width budget.

use tracing::debug;

use crate::constants::{GROUPSMAX, SCREENMAX, UNLIMITED_ROWS, W_MIN_COL};
use crate::system::error::SetupResult;
use crate::system::metrics::allocate_variable_width_budget;
use crate::system::signals::ResizeBlock;
use crate::system::Categories;

use super::fields::{ColumnSpec, FieldId};
use super::state::{EngineState, Geometry};
use super::window::{Window, SHOW_CMDLIN, SHOW_FOREST, SHOW_IDLEPS, SHOW_TASKON};

// ============================================================================
// Single window layout
// ============================================================================

/// Chooses the displayed columns of `w` for a screen `cols` wide and
/// builds its header.
///
/// The header never exceeds `cols`: fixed columns are taken while they
/// fit and whatever is left is shared among the variable ones.
pub fn layout_window(w: &mut Window, columns: &ColumnSpec, cols: usize, altscr: bool) {
    w.pflgsall = w.on_fields();
    let total = w.pflgsall.len();
    if w.begpflg >= total {
        w.begpflg = total.saturating_sub(1);
    }

    let prefix = usize::from(altscr);
    let mut used = prefix;
    let mut varcnt = 0;
    let mut varsz = 0;
    w.procflgs.clear();
    for &f in &w.pflgsall[w.begpflg..] {
        let head = columns.head(f);
        if used + head.len() > cols {
            break;
        }
        if f.is_variable() {
            varcnt += 1;
            varsz += head.len() - 1;
        }
        used += head.len();
        w.procflgs.push(f);
    }

    // first field from which everything to the right still fits
    w.endpflg = 0;
    let mut tail = prefix;
    for i in (0..total).rev() {
        tail += columns.head(w.pflgsall[i]).len();
        if tail > cols {
            w.endpflg = i + 1;
            break;
        }
    }
    if total > 0 && w.endpflg >= total {
        w.endpflg = total - 1;
    }

    w.varcolsz = allocate_variable_width_budget(varsz + cols.saturating_sub(used), varcnt);

    let mut hdr = String::with_capacity(cols);
    if altscr {
        hdr.push_str(&w.num.to_string());
    }
    for &f in &w.procflgs {
        let head = columns.head(f);
        if f.is_variable() {
            hdr.push_str(&format!("{:<w$.w$} ", head.trim_end(), w = w.varcolsz));
        } else {
            hdr.push_str(head);
        }
    }
    w.columnhdr = hdr;
}

/// Snapshot categories window `w` needs this frame.
pub fn window_categories(w: &Window) -> Categories {
    let mut need = Categories::NONE;
    for &f in &w.procflgs {
        need |= f.desc().categories;
        if f == FieldId::Command && w.has(SHOW_CMDLIN) {
            need |= Categories::CMDLINE;
        }
    }
    // sorting on command may compare the full line
    need |= w.rc.sortindx.desc().categories;
    if w.rc.sortindx == FieldId::Command {
        need |= Categories::CMDLINE;
    }
    if w.has(SHOW_FOREST) {
        need |= Categories::STATUS;
    }
    if !w.has(SHOW_IDLEPS) {
        need |= Categories::STAT;
    }
    need
}

/// Rows a window gets when `visible` windows share `remaining` rows.
///
/// A window's own row limit wins. The shared count leaves one header
/// row per window.
pub fn apportion(visible: usize, remaining: usize, maxtasks: usize) -> usize {
    if maxtasks > 0 {
        maxtasks
    } else if visible == 0 {
        0
    } else {
        remaining.saturating_sub(visible) / visible
    }
}

impl EngineState {
    // ========================================================================
    // Calibration
    // ========================================================================

    /// Recomputes geometry and every visible window's layout.
    ///
    /// `probe` reports the terminal size. Resize signals are held back
    /// meanwhile, and the pass repeats while a request arrived during it.
    pub fn calibrate(&mut self, mut probe: impl FnMut() -> (u16, u16)) -> SetupResult<()> {
        let _block = ResizeBlock::new();
        loop {
            self.latch.begin();
            let (cols, rows) = probe();
            self.fit_geometry(cols, rows);
            self.columns =
                ColumnSpec::new(self.pid_digits, self.ncpu, self.irixps, self.threads)?;
            self.calibrate_windows();
            self.latch.finish();
            debug!(cols = self.geometry.cols, rows = self.geometry.rows, "calibrated");
            if !self.latch.is_pending() {
                return Ok(());
            }
        }
    }

    /// Derives the usable screen area from the terminal size.
    pub fn fit_geometry(&mut self, term_cols: u16, term_rows: u16) {
        let (term_cols, term_rows) = (usize::from(term_cols), usize::from(term_rows));
        let (cols, rows) = match (self.batch, self.width_override) {
            (true, Some(o)) => (o.cols, o.rows.unwrap_or(UNLIMITED_ROWS)),
            (true, None) => (term_cols, UNLIMITED_ROWS),
            (false, Some(o)) => (
                term_cols.min(o.cols),
                o.rows.map_or(term_rows, |r| term_rows.min(r)),
            ),
            (false, None) => (term_cols, term_rows),
        };
        self.geometry = Geometry {
            cols: cols.clamp(usize::from(W_MIN_COL), SCREENMAX),
            rows: rows.max(1),
        };
    }

    /// Lays out the visible windows and collects the snapshot categories
    /// they need.
    pub fn calibrate_windows(&mut self) {
        let mut need = Categories::EITHER;
        let cols = self.geometry.cols;
        for i in 0..GROUPSMAX {
            let visible = if self.altscr {
                self.stack.wins[i].has(SHOW_TASKON)
            } else {
                i == self.stack.curwin
            };
            if !visible {
                continue;
            }
            let w = &mut self.stack.wins[i];
            layout_window(w, &self.columns, cols, self.altscr);
            need |= window_categories(w);
        }
        self.libflags = need.resolve();
    }

    // ========================================================================
    // Row distribution
    // ========================================================================

    /// Shares `max_lines` task area rows among the visible windows.
    ///
    /// `show(state, window, rows_available)` draws one window and returns
    /// the rows it used.
    pub fn distribute(
        &mut self,
        max_lines: usize,
        mut show: impl FnMut(&mut Self, usize, usize) -> usize,
    ) {
        if max_lines == 0 {
            return;
        }
        if !self.altscr {
            let i = self.stack.curwin;
            let w = &mut self.stack.wins[i];
            w.winlines = if w.rc.maxtasks > 0 { w.rc.maxtasks } else { max_lines };
            show(self, i, max_lines);
            return;
        }

        let mut used = 0;
        for i in 0..GROUPSMAX {
            if !self.stack.wins[i].has(SHOW_TASKON) {
                continue;
            }
            let visible = (i..GROUPSMAX)
                .filter(|&j| self.stack.wins[j].has(SHOW_TASKON))
                .count();
            let remaining = max_lines - used;
            let w = &mut self.stack.wins[i];
            w.winlines = apportion(visible, remaining, w.rc.maxtasks);
            used += show(self, i, remaining).min(remaining);
            if used >= max_lines {
                break;
            }
        }
    }
}
