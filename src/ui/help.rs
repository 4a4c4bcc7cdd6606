//! Help pages
//!
//! The first page lists the interactive commands, the second explains
//! the window ring.

use crate::app::state::EngineState;
use crate::app::window::SHOW_CTIMES;
use crate::constants::{APP_NAME, APP_VERSION};

use super::utils::{Line, Style};

/// Command help content definition
const HELP_LINES: &[(&str, &str)] = &[
    ("  Z,B", "Global: 'Z' color mappings; 'B' bold on/off"),
    ("  l,t,m", "Summary: 'l' load average; 't' task/cpu states; 'm' memory"),
    ("  1,I", "SMP: '1' one or separate cpu lines; 'I' Irix/Solaris mode"),
    ("  f,F", "Fields: show/hide, reorder, choose the sort field"),
    ("", ""),
    ("  L,&,<,> .", "Locate: 'L' find, '&' find next; '<'/'>' move sort column"),
    ("  R,H,V   .", "Toggle: 'R' normal/reverse sort; 'H' threads; 'V' forest"),
    ("  c,i,S   .", "Toggle: 'c' name/command line; 'i' idle tasks; 'S' cumulative"),
    ("  x,y     .", "Highlight: 'x' sort column; 'y' running tasks"),
    ("  z,b     .", "Toggle: 'z' color/mono; 'b' bold/reverse ('x' or 'y' needed)"),
    ("  u,U     .", "User filter: 'u' effective user; 'U' any user id"),
    ("  n or #  .", "Maximum tasks shown"),
    ("  C,...   .", "Scroll coordinates for up, down, left, right, home, end"),
    ("", ""),
];

/// Commands refused in secure mode
const HELP_UNSECURE: &[(&str, &str)] = &[
    ("  k,r", "Tasks: 'k' send a signal; 'r' renice"),
    ("  d or s", "Change the delay"),
];

const HELP_TAIL: &[(&str, &str)] = &[
    ("  W", "Write the configuration file"),
    ("  q", "Quit"),
    ("", "( '.' commands need a visible task window )"),
];

const WINDOWS_HELP: &[&str] = &[
    "",
    ". Up to four windows, each with its own fields, sort, colors and filters",
    ". The current window owns the summary area and receives your commands",
    "  . a window's task display can be hidden, giving its rows to the others",
    "  . commands marked '.' are refused while the current window is hidden",
    ". Change the current window by cycling, by choosing a group, or on",
    "  leaving the fields or color screens",
    ". Any time:",
    "    A       . Single or multiple window display",
    "    g       . Choose the current field group",
];

const WINDOWS_ALT_HELP: &[&str] = &[
    ". Only in 'A' mode:",
    "    G       . Rename the current window",
    "    a , w   . Next / previous window",
    "    - , _   . Hide/show the current window; '_' flips every window",
    "    = , +   . Rebalance the current ('=') or every ('+') window",
    "",
    "Press <Enter> to return to the task display",
];

fn key_line(key: &str, text: &str) -> Line {
    let mut line = Line::default();
    if !key.is_empty() {
        line.push(
            Style {
                bold: true,
                ..Style::PLAIN
            },
            format!("{:<12}", key),
        );
    } else if !text.is_empty() {
        line.push(Style::PLAIN, " ".repeat(12));
    }
    line.push(Style::PLAIN, text);
    line
}

fn on_off(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}

/// Lines of the command help page
pub fn help_lines(state: &EngineState) -> Vec<Line> {
    let w = state.stack.current();
    let mut out = vec![
        Line::styled(
            Style {
                bold: true,
                ..Style::PLAIN
            },
            format!("Help for Interactive Commands - {} {}", APP_NAME, APP_VERSION),
        ),
        Line::plain(format!(
            "Window {}: Cumulative mode {}.  System: Delay {:.1} secs; Secure mode {}.",
            w.grpname,
            on_off(w.has(SHOW_CTIMES)),
            state.delay,
            on_off(state.secure)
        )),
        Line::default(),
    ];
    out.extend(HELP_LINES.iter().map(|(k, t)| key_line(k, t)));
    if !state.secure {
        out.extend(HELP_UNSECURE.iter().map(|(k, t)| key_line(k, t)));
    }
    out.extend(HELP_TAIL.iter().map(|(k, t)| key_line(k, t)));
    out.push(Line::plain(
        "Press 'h' or '?' for help with Windows, any other key to continue",
    ));
    out
}

/// Lines of the windows help page
pub fn windows_help_lines(state: &EngineState) -> Vec<Line> {
    let names: Vec<&str> = state.stack.wins.iter().map(|w| w.rc.winname.as_str()).collect();
    let mut out = vec![Line::styled(
        Style {
            bold: true,
            ..Style::PLAIN
        },
        format!(
            "Help for Windows / Field Groups - \"Current Window\" = {}",
            state.stack.current().grpname
        ),
    )];
    out.extend(WINDOWS_HELP.iter().map(|t| Line::plain(*t)));
    out.push(Line::plain(format!(
        "              or pick one now: 1 ={}; 2 ={}; 3 ={}; 4 ={}",
        names[0], names[1], names[2], names[3]
    )));
    out.extend(WINDOWS_ALT_HELP.iter().map(|t| Line::plain(*t)));
    out
}
