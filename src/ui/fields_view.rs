//! Fields management screen rendering

use crate::app::fields_manager::sort_label;
use crate::app::state::EngineState;

use super::utils::{Line, Style};

const FIELDS_HELP: &[&str] = &[
    "   Navigate with Up/Dn, Right selects for move then <Enter> or Left commits,",
    "   'd' or <Space> toggles display, 's' sets sort.  Use 'q' or <Esc> to end!",
    "",
];

/// Lines of the fields screen for a screen `rows` high.
///
/// When the list does not fit it scrolls to keep the cursor visible.
pub fn fields_lines(state: &EngineState, rows: usize) -> Vec<Line> {
    let w = state.stack.current();
    let mgr = state.fields_mgr;
    let mut out = vec![Line::styled(
        Style {
            bold: true,
            ..Style::PLAIN
        },
        format!(
            "Fields Management for window {}, whose current sort field is {}",
            w.grpname,
            state.fields_sort_label()
        ),
    )];
    out.extend(FIELDS_HELP.iter().map(|t| Line::plain(*t)));

    let avail = rows.saturating_sub(out.len()).max(1);
    let first = (mgr.focus + 1).saturating_sub(avail);
    for (pos, (field, on)) in w.fields().enumerate().skip(first).take(avail) {
        let desc = field.desc();
        let mark = if on { '*' } else { ' ' };
        let sort = if field == w.rc.sortindx { '<' } else { ' ' };
        let text = format!(
            "{} {:<8} = {:<24}{}",
            mark,
            sort_label(field),
            desc.description,
            sort
        );
        let style = if pos != mgr.focus {
            Style {
                bold: on,
                ..Style::PLAIN
            }
        } else if mgr.moving {
            Style {
                bold: true,
                reverse: true,
                fg: None,
            }
        } else {
            Style::PLAIN.reversed()
        };
        out.push(Line::styled(style, text));
    }
    out
}
