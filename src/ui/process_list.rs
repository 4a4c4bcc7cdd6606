//! Task window rendering
//!
//! A window is its column header followed by as many task rows as its
//! budget allows. Rows the window filters out (idle or other users) do
//! not use up a row.

use crate::app::rows::row_cells;
use crate::app::state::EngineState;
use crate::app::window::{SHOW_FOREST, SHOW_HICOLS, SHOW_HIROWS};

use super::utils::{Line, Style};

/// Builds the lines of window `i`, using at most `wmax` rows.
///
/// The window must have been arranged for this frame.
pub fn window_lines(state: &EngineState, i: usize, wmax: usize) -> Vec<Line> {
    let w = &state.stack.wins[i];
    let wmax = wmax.min(w.winlines + 1);
    let mut out = Vec::new();
    if wmax == 0 {
        return out;
    }

    let header = Style::slot(w, w.rc.headclr).reversed();
    out.push(Line::styled(header, w.columnhdr.clone()));

    let ctx = state.cell_context(i);
    let base = Style::slot(w, w.rc.taskclr);
    let hicol = w.has(SHOW_HICOLS) && !w.has(SHOW_FOREST);

    for p in w.order.iter().skip(w.begtask) {
        if out.len() >= wmax {
            break;
        }
        let Some(rec) = state.records.get(p.idx) else {
            continue;
        };
        if !w.shows(rec) {
            continue;
        }
        let running = w.has(SHOW_HIROWS) && rec.state == 'R';
        let row = if running { base.emphasized(w) } else { base };

        let mut line = Line::default();
        if state.altscr {
            line.push(row, " ");
        }
        for (field, cell) in row_cells(w, rec, p.depth, &ctx) {
            let style = if hicol && !running && field == w.rc.sortindx {
                base.emphasized(w)
            } else {
                row
            };
            line.push(style, cell);
        }
        out.push(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fields::FieldId;
    use crate::app::state::tests::{engine, task};
    use crate::app::window::SHOW_IDLEPS;

    fn frame(state: &mut EngineState) {
        state.refresh().unwrap();
        state.calibrate(|| (80, 24)).unwrap();
        state.arrange(0);
        state.stack.wins[0].winlines = 20;
    }

    #[test]
    fn test_header_then_rows() {
        let mut state = engine(vec![vec![task(1, 1), task(2, 2)]]);
        frame(&mut state);
        let lines = window_lines(&state, 0, 10);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].text().trim_start().starts_with("PID"));
        assert!(lines[0].segments[0].style.reverse);
        assert!(lines[1].text().contains("cmd2"));
    }

    #[test]
    fn test_budget_and_filtering() {
        let mut state = engine(vec![vec![task(1, 0), task(2, 5), task(3, 0), task(4, 7)]]);
        frame(&mut state);
        assert_eq!(window_lines(&state, 0, 3).len(), 3);

        state.stack.wins[0].clear(SHOW_IDLEPS);
        let lines = window_lines(&state, 0, 10);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().skip(1).all(|l| !l.text().contains("cmd1")));

        state.stack.wins[0].winlines = 1;
        assert_eq!(window_lines(&state, 0, 10).len(), 2);
    }

    #[test]
    fn test_running_rows_and_sort_column_highlight() {
        let mut busy = task(1, 9);
        busy.state = 'R';
        let mut state = engine(vec![vec![busy, task(2, 1)]]);
        frame(&mut state);
        state.stack.wins[0].set(SHOW_HICOLS);
        let lines = window_lines(&state, 0, 10);
        // running row: one emphasized segment for the whole row
        assert_eq!(lines[1].segments.len(), 1);
        assert!(lines[1].segments[0].style.bold);
        // the other row only has %CPU emphasized
        assert!(lines[2].segments.len() >= 2);
        assert_eq!(state.stack.wins[0].rc.sortindx, FieldId::Cpu);
        assert!(lines[2].segments.iter().any(|s| s.style.bold));
    }
}
