//! Frame composition
//!
//! Builds the rows of one frame for the active screen. On the task screen
//! that is the summary blocks, the message row and then every visible
//! window within its share of the remaining rows.

use std::io::{self, Write};
use std::time::Instant;

use crate::app::state::EngineState;
use crate::app::ViewMode;

use super::colors_view::colors_lines;
use super::components::{message_row, summary_lines, Clock};
use super::fields_view::fields_lines;
use super::help::{help_lines, windows_help_lines};
use super::process_list::window_lines;
use super::utils::Line;

/// One composed frame
#[derive(Debug, Default)]
pub struct Frame {
    /// Screen rows from the top, already cut to the screen width
    pub lines: Vec<Line>,
    /// Where the cursor goes, when a prompt is open
    pub cursor: Option<(u16, u16)>,
}

/// Composes the frame for the active screen.
///
/// The record table must hold this frame's snapshot.
pub fn compose(state: &mut EngineState, clock: Clock, now: Instant) -> Frame {
    let rows = state.geometry.rows;
    let cols = state.geometry.cols;
    let mut cursor = None;

    let mut lines = match state.view {
        ViewMode::Help => help_lines(state),
        ViewMode::WindowsHelp => windows_help_lines(state),
        ViewMode::Fields => fields_lines(state, rows),
        ViewMode::Colors => colors_lines(state),
        ViewMode::Tasks => {
            let mut lines = summary_lines(state, clock);
            let msg_row = lines.len();
            let (row, col) = message_row(state, now);
            lines.push(row);
            cursor = col.map(|c| (c, msg_row));

            let max_lines = rows.saturating_sub(msg_row + 1);
            state.distribute(max_lines, |st, i, avail| {
                st.arrange(i);
                let shown = window_lines(st, i, avail);
                let used = shown.len();
                lines.extend(shown);
                used
            });
            lines
        }
    };

    lines.truncate(rows);
    for line in &mut lines {
        line.truncate(cols);
    }
    Frame {
        lines,
        cursor: cursor.map(|(c, r)| {
            let c = c.min(cols.saturating_sub(1));
            (c as u16, r as u16)
        }),
    }
}

/// Writes a frame as plain text, for batch mode.
pub fn write_batch<W: Write>(out: &mut W, frame: &Frame) -> io::Result<()> {
    for line in &frame.lines {
        writeln!(out, "{}", line.text().trim_end())?;
    }
    writeln!(out)?;
    out.flush()
}
