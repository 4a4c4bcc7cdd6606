//! Color mapping screen
//!
//! Edits the four palette slots of the current window. The window's
//! flags and colors are saved on entry so `q` can put them back.

use super::input::{Key, KeyAction};
use super::state::EngineState;
use super::window::{Window, SHOW_COLORS, SHOW_HIBOLD, VIEW_NOBOLD};
use super::ViewMode;

/// Which palette slot the digits change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    /// Summary lines
    Summary,
    /// Messages and prompts
    Messages,
    /// Column header
    Header,
    /// Task rows
    Tasks,
}

impl ColorTarget {
    /// Letter shown on the screen
    pub fn letter(self) -> char {
        match self {
            ColorTarget::Summary => 'S',
            ColorTarget::Messages => 'M',
            ColorTarget::Header => 'H',
            ColorTarget::Tasks => 'T',
        }
    }
}

/// Window settings to restore on abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Saved {
    winflags: u32,
    summclr: u8,
    msgsclr: u8,
    headclr: u8,
    taskclr: u8,
}

impl Saved {
    fn take(w: &Window) -> Self {
        Self {
            winflags: w.rc.winflags,
            summclr: w.rc.summclr,
            msgsclr: w.rc.msgsclr,
            headclr: w.rc.headclr,
            taskclr: w.rc.taskclr,
        }
    }

    fn restore(self, w: &mut Window) {
        w.rc.winflags = self.winflags;
        w.rc.summclr = self.summclr;
        w.rc.msgsclr = self.msgsclr;
        w.rc.headclr = self.headclr;
        w.rc.taskclr = self.taskclr;
    }
}

/// An open color mapping session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMapping {
    /// Slot being edited
    pub target: ColorTarget,
    saved: Saved,
}

impl ColorMapping {
    /// Starts editing `w`, forcing colors on so changes are visible.
    fn begin(w: &mut Window) -> Self {
        let saved = Saved::take(w);
        w.set(SHOW_COLORS);
        Self {
            target: ColorTarget::Tasks,
            saved,
        }
    }
}

/// Palette slot of `w` selected by `target`
pub fn slot(w: &mut Window, target: ColorTarget) -> &mut u8 {
    match target {
        ColorTarget::Summary => &mut w.rc.summclr,
        ColorTarget::Messages => &mut w.rc.msgsclr,
        ColorTarget::Header => &mut w.rc.headclr,
        ColorTarget::Tasks => &mut w.rc.taskclr,
    }
}

impl EngineState {
    /// Enters the color mapping screen for the current window.
    pub fn open_colors(&mut self) {
        self.color_map = Some(ColorMapping::begin(self.stack.current_mut()));
        self.view = ViewMode::Colors;
    }

    /// Handles a key on the color mapping screen.
    pub fn handle_colors_key(&mut self, key: Key) -> KeyAction {
        let Some(mut map) = self.color_map else {
            self.view.reset();
            return KeyAction::Continue;
        };
        let w = self.stack.current_mut();
        match key {
            Key::Char('S') => map.target = ColorTarget::Summary,
            Key::Char('M') => map.target = ColorTarget::Messages,
            Key::Char('H') => map.target = ColorTarget::Header,
            Key::Char('T') => map.target = ColorTarget::Tasks,
            Key::Char(c @ '0'..='7') => *slot(w, map.target) = c as u8 - b'0',
            Key::Char('B') => w.toggle(VIEW_NOBOLD),
            Key::Char('b') => w.toggle(SHOW_HIBOLD),
            Key::Char('z') => w.toggle(SHOW_COLORS),
            Key::Char('a') | Key::Char('w') => {
                if key == Key::Char('a') {
                    self.stack.select_next();
                } else {
                    self.stack.select_prev();
                }
                map = ColorMapping::begin(self.stack.current_mut());
            }
            Key::Enter => {
                self.color_map = None;
                self.view.reset();
                return KeyAction::Continue;
            }
            Key::Char('q') | Key::Escape => {
                map.saved.restore(w);
                self.color_map = None;
                self.view.reset();
                return KeyAction::Continue;
            }
            _ => {}
        }
        self.color_map = Some(map);
        KeyAction::Continue
    }

    /// Color currently selected on the mapping screen
    pub fn selected_color(&mut self) -> Option<(ColorTarget, u8)> {
        let map = self.color_map?;
        Some((map.target, *slot(self.stack.current_mut(), map.target)))
    }
}
