//! Summary area and message row components
//!
//! The summary blocks are each optional and only drawn while they leave
//! room for at least one more row above the bottom of the screen.

use crate::app::state::EngineState;
use crate::app::window::{
    Window, SHOW_TASKON, VIEW_CPUSUM, VIEW_LOADAV, VIEW_MEMORY, VIEW_NOBOLD, VIEW_SCROLL,
    VIEW_STATES,
};
use crate::constants::APP_NAME;
use crate::system::cpu::{cpu_state_breakdown, CpuSample};
use crate::system::uptime::format_load_line;

use super::utils::{Line, Style};

/// Clock used for the load line, as (hours, minutes, seconds)
pub type Clock = (u32, u32, u32);

/// True if the current window wants block `flag` and `n` more rows still
/// leave the last screen row free.
fn is_room(w: &Window, flag: u32, used: usize, n: usize, rows: usize) -> bool {
    w.has(flag) && used + n < rows.saturating_sub(1)
}

/// Style for summary text of `w`
fn summary_style(w: &Window) -> Style {
    let style = Style::slot(w, w.rc.summclr);
    Style {
        bold: !w.has(VIEW_NOBOLD),
        ..style
    }
}

/// One cpu line: label then the eight state percentages.
pub fn cpu_line(label: &str, sample: &CpuSample) -> String {
    let s = cpu_state_breakdown(sample);
    format!(
        "{}{:5.1} us,{:5.1} sy,{:5.1} ni,{:5.1} id,{:5.1} wa,{:5.1} hi,{:5.1} si,{:5.1} st",
        label, s.user, s.system, s.nice, s.idle, s.iowait, s.irq, s.softirq, s.steal
    )
}

/// Builds the summary blocks of the current window.
pub fn summary_lines(state: &EngineState, clock: Clock) -> Vec<Line> {
    let w = state.stack.current();
    let rows = state.geometry.rows;
    let style = summary_style(w);
    let mut out = Vec::new();

    if is_room(w, VIEW_LOADAV, out.len(), 1, rows) {
        let name = if state.altscr && w.has(SHOW_TASKON) {
            w.grpname.as_str()
        } else {
            APP_NAME
        };
        let info = &state.sysinfo;
        let text = format!(
            "{} - {}",
            name,
            format_load_line(clock, info.uptime_secs as u64, info.users, info.load)
        );
        out.push(Line::styled(style, text));
    }

    if is_room(w, VIEW_STATES, out.len(), 2, rows) {
        let c = &state.history.counts;
        let word = if state.threads { "Threads" } else { "Tasks" };
        out.push(Line::styled(
            style,
            format!(
                "{}: {:3} total, {:3} running, {:3} sleeping, {:3} stopped, {:3} zombie",
                word, c.total, c.running, c.sleeping, c.stopped, c.zombie
            ),
        ));

        if w.has(VIEW_CPUSUM) {
            out.push(Line::styled(style, cpu_line("%Cpu(s):", &state.cpus.summary)));
        } else {
            for (i, sample) in state.cpus.cpus.iter().take(state.ncpu).enumerate() {
                let id = sample.id.unwrap_or(i);
                out.push(Line::styled(style, cpu_line(&format!("%Cpu{:<3}:", id), sample)));
                if out.len() + 1 >= rows.saturating_sub(1) {
                    break;
                }
            }
        }
    }

    if is_room(w, VIEW_MEMORY, out.len(), 2, rows) {
        let m = &state.meminfo;
        let (unit, shift) = m.display_unit();
        out.push(Line::styled(
            style,
            format!(
                "{} Mem: {:8} total, {:8} used, {:8} free, {:8} buffers",
                unit,
                m.main_total >> shift,
                m.main_used() >> shift,
                m.main_free >> shift,
                m.buffers >> shift
            ),
        ));
        out.push(Line::styled(
            style,
            format!(
                "{} Swap: {:8} total, {:8} used, {:8} free, {:8} cached",
                unit,
                m.swap_total >> shift,
                m.swap_used() >> shift,
                m.swap_free >> shift,
                m.cached >> shift
            ),
        ));
    }
    out
}

/// Scroll coordinates of the current window
pub fn scroll_text(state: &EngineState) -> String {
    let w = state.stack.current();
    format!(
        "scroll coordinates: y = {}/{} (tasks), x = {}/{} (fields)",
        w.begtask + 1,
        state.frame_maxtask(),
        w.begpflg + 1,
        w.pflgsall.len()
    )
}

/// The message row: an open prompt, else a live message, else the
/// scroll coordinates when asked for.
///
/// Returns the row and the prompt cursor column, if any.
pub fn message_row(state: &mut EngineState, now: std::time::Instant) -> (Line, Option<usize>) {
    let w = state.stack.current();
    let style = Style::slot(w, w.rc.msgsclr);
    let visible = !state.altscr || w.has(SHOW_TASKON);
    let scroll = visible && w.has(VIEW_SCROLL);

    if let Some(p) = &state.prompt {
        return (Line::styled(style, p.line()), Some(p.cursor_col()));
    }
    if let Some(text) = state.active_msg(now) {
        return (Line::styled(style.reversed(), text.to_string()), None);
    }
    if scroll {
        return (Line::plain(scroll_text(state)), None);
    }
    (Line::default(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::tests::{engine, task};

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    #[test]
    fn test_default_summary() {
        let mut state = engine(vec![vec![task(1, 0), task(2, 0)]]);
        state.refresh().unwrap();
        state.meminfo.main_total = 1000;
        state.meminfo.main_free = 400;
        state.geometry.rows = 24;
        let lines = texts(&summary_lines(&state, (9, 5, 7)));
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ptop - 09:05:07 up "));
        assert_eq!(
            lines[1],
            "Tasks:   2 total,   0 running,   2 sleeping,   0 stopped,   0 zombie"
        );
        assert!(lines[2].starts_with("%Cpu(s):"));
        assert_eq!(
            lines[3],
            "KiB Mem:     1000 total,      600 used,      400 free,        0 buffers"
        );
        assert!(lines[4].starts_with("KiB Swap:"));
    }

    #[test]
    fn test_blocks_need_room() {
        let mut state = engine(vec![vec![]]);
        state.geometry.rows = 4;
        // load line fits (0 + 1 < 3), states need 2 (1 + 2 < 3 fails)
        let lines = summary_lines(&state, (0, 0, 0));
        assert_eq!(lines.len(), 1);
        state.geometry.rows = 1;
        assert!(summary_lines(&state, (0, 0, 0)).is_empty());
    }

    #[test]
    fn test_per_cpu_lines_stop_at_screen_end() {
        let mut state = engine(vec![vec![]]);
        state.stack.current_mut().clear(VIEW_CPUSUM);
        state.ncpu = 8;
        state.cpus.cpus = (0..8)
            .map(|i| CpuSample {
                id: Some(i),
                ..CpuSample::default()
            })
            .collect();
        state.geometry.rows = 7;
        let lines = texts(&summary_lines(&state, (0, 0, 0)));
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("%Cpu0  :"));
        assert!(lines[4].starts_with("%Cpu2  :"));
    }

    #[test]
    fn test_message_row_priority() {
        let mut state = engine(vec![vec![]]);
        let now = std::time::Instant::now();
        assert_eq!(message_row(&mut state, now).0.text(), "");

        state.stack.current_mut().set(VIEW_SCROLL);
        assert!(message_row(&mut state, now).0.text().starts_with("scroll coordinates: y = 1/0"));

        state.show_msg("hello");
        assert_eq!(message_row(&mut state, now).0.text(), "hello");

        state.prompt_delay();
        let (line, cursor) = message_row(&mut state, now);
        assert!(line.text().starts_with("Change delay from"));
        assert!(cursor.is_some());
    }
}
