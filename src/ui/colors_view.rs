//! Color mapping screen rendering
//!
//! Shows a small sample of the task display painted with the window's
//! current choices, so every change is visible right away.

use crate::app::state::EngineState;
use crate::app::window::{SHOW_COLORS, SHOW_HIBOLD, VIEW_NOBOLD};

use super::utils::{Line, Style};

fn on_off(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}

/// Lines of the color mapping screen
pub fn colors_lines(state: &mut EngineState) -> Vec<Line> {
    let Some((target, color)) = state.selected_color() else {
        return Vec::new();
    };
    let w = state.stack.current();
    let title = Style {
        bold: true,
        ..Style::PLAIN
    };
    let summary = Style::slot(w, w.rc.summclr);
    let msgs = Style::slot(w, w.rc.msgsclr).reversed();
    let header = Style::slot(w, w.rc.headclr).reversed();
    let task = Style::slot(w, w.rc.taskclr);

    let mut out = vec![
        Line::styled(title, format!("Help for color mapping - {}", w.grpname)),
        Line::plain(format!("current window: {}", w.grpname)),
        Line::default(),
        Line::styled(summary, "   color - 04:25:44 up 8 days, 50 min,  7 users,  load average:"),
        Line::styled(summary, "   Tasks:  64 total,   2 running,  62 sleeping,   0 stopped"),
        Line::styled(msgs, "    Nasty Message!  -or-  Input Prompt "),
        Line::styled(header, "     PID TTY      PR  NI %CPU    TIME+   VIRT S COMMAND   "),
        Line::styled(task, "   17284 pts/2     8   0  0.0   0:00.75  1380 S /bin/bash"),
        Line::styled(
            task.emphasized(w),
            "    8601 pts/1     7 -10  0.4   0:00.03   916 R color -b -z",
        ),
        Line::styled(task, "   11005 ?         9   0  0.0   0:02.50  2852 S amor -sessi"),
        Line::plain(format!(
            "   available toggles: B =disable bold globally ({}),",
            on_off(w.has(VIEW_NOBOLD))
        )),
        Line::plain(format!(
            "       z =color/mono ({}), b =tasks \"bold\"/reverse ({})",
            on_off(w.has(SHOW_COLORS)),
            on_off(w.has(SHOW_HIBOLD))
        )),
        Line::default(),
        Line::plain("Select target as upper case letter:"),
        Line::plain("   S = Summary Data,  M = Messages/Prompts,"),
        Line::plain("   H = Column Heads,  T = Task Information"),
        Line::plain("Select color as number:"),
        Line::plain("   0 = black,  1 = red,      2 = green,  3 = yellow,"),
        Line::plain("   4 = blue,   5 = magenta,  6 = cyan,   7 = white"),
        Line::default(),
    ];
    out.push(Line::styled(
        title,
        format!("Selected: target {} ; color {}", target.letter(), color),
    ));
    out.push(Line::plain(format!(
        "   press 'q' to abort changes to window '{}'",
        w.grpname
    )));
    out.push(Line::plain(
        "   press 'a' or 'w' to commit & change another, <Enter> to commit and end",
    ));
    out
}
