//! Fields management screen
//!
//! Lets the user reorder, show, hide and sort on fields of the current
//! window. Any change scrolls the window back to its first column and
//! drops the sort-column highlight.

use super::fields::{FieldId, FIELD_COUNT};
use super::input::{Key, KeyAction};
use super::state::EngineState;
use super::window::{Window, SHOW_FOREST, SHOW_HICOLS};
use super::ViewMode;

/// Cursor state of the fields screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldsManager {
    /// Selection position under the cursor
    pub focus: usize,
    /// The focused field travels with Up/Down
    pub moving: bool,
}

impl FieldsManager {
    /// Cursor on the sort field of `w`, not moving.
    pub fn start(w: &Window) -> Self {
        Self {
            focus: w.field_pos(w.rc.sortindx).unwrap_or(0),
            moving: false,
        }
    }
}

fn unscroll(w: &mut Window) {
    w.begpflg = 0;
    w.clear(SHOW_HICOLS);
}

impl EngineState {
    /// Enters the fields screen for the current window.
    pub fn open_fields(&mut self) {
        self.fields_mgr = FieldsManager::start(self.stack.current());
        self.view = ViewMode::Fields;
    }

    /// Handles a key on the fields screen.
    pub fn handle_fields_key(&mut self, key: Key) -> KeyAction {
        let mgr = &mut self.fields_mgr;
        let w = &mut self.stack.wins[self.stack.curwin];
        match key {
            Key::Up => {
                if mgr.focus > 0 {
                    mgr.focus -= 1;
                    if mgr.moving {
                        unscroll(w);
                        w.swap_fields(mgr.focus, mgr.focus + 1);
                    }
                }
            }
            Key::Down => {
                if mgr.focus + 1 < FIELD_COUNT {
                    mgr.focus += 1;
                    if mgr.moving {
                        unscroll(w);
                        w.swap_fields(mgr.focus, mgr.focus - 1);
                    }
                }
            }
            Key::Left | Key::Enter => mgr.moving = false,
            Key::Right => mgr.moving = true,
            Key::Home | Key::PageUp if !mgr.moving => mgr.focus = 0,
            Key::End | Key::PageDown if !mgr.moving => mgr.focus = FIELD_COUNT - 1,
            Key::Space | Key::Char('d') if !mgr.moving => {
                w.toggle_field_at(mgr.focus);
                unscroll(w);
            }
            Key::Char('s') if !mgr.moving => {
                if let Some(f) = w.field_at(mgr.focus) {
                    w.rc.sortindx = f;
                    unscroll(w);
                    w.clear(SHOW_FOREST);
                }
            }
            Key::Char('a') | Key::Char('w') => {
                if key == Key::Char('a') {
                    self.stack.select_next();
                } else {
                    self.stack.select_prev();
                }
                self.fields_mgr = FieldsManager::start(self.stack.current());
            }
            Key::Char('q') | Key::Escape => self.view.reset(),
            _ => {}
        }
        KeyAction::Continue
    }

    /// Sort field name for the fields screen header.
    pub fn fields_sort_label(&self) -> String {
        let w = self.stack.current();
        if w.has(SHOW_FOREST) {
            "forest view".to_string()
        } else {
            sort_label(w.rc.sortindx)
        }
    }
}

/// A field's header without padding
pub fn sort_label(f: FieldId) -> String {
    f.desc().head.trim().to_string()
}
