//! Input/keyboard event handling
//!
//! Keys are dispatched by the active screen. On the task screen they go
//! through the command groups:
//! - Global commands (help, delay, fields, kill, renice, colors)
//! - Summary toggles
//! - Task display commands, which need a visible window
//! - Window management commands
//! - Legacy sort keys

use super::fields::FieldId;
use super::prompts::PromptKind;
use super::state::EngineState;
use super::window::{
    Window, QSRT_NORMAL, SHOW_CMDLIN, SHOW_COLORS, SHOW_CTIMES, SHOW_FOREST, SHOW_HIBOLD,
    SHOW_HICOLS, SHOW_HIROWS, SHOW_IDLEPS, SHOW_TASKON, VIEW_CPUSUM, VIEW_LOADAV, VIEW_MEMORY,
    VIEW_NOBOLD, VIEW_SCROLL, VIEW_STATES,
};
use super::ViewMode;
use crate::system::users::UserMatch;

/// A decoded keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Insert,
    Delete,
    Backspace,
    Enter,
    Escape,
    Space,
    /// Ctrl-Z, the terminal's stop request
    Suspend,
    Char(char),
}

/// Result of handling a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Continue running the application
    Continue,
    /// Exit the application
    Exit,
}

fn on_off(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}

impl EngineState {
    /// Dispatches one key and asks for a recalibration before the next
    /// frame.
    pub fn handle_key(&mut self, key: Key) -> KeyAction {
        let action = if self.prompt.is_some() {
            self.handle_prompt_key(key);
            KeyAction::Continue
        } else {
            match self.view {
                ViewMode::Tasks => self.handle_command_key(key),
                ViewMode::Help => self.handle_help_key(key),
                ViewMode::WindowsHelp => self.handle_windows_help_key(key),
                ViewMode::Fields => self.handle_fields_key(key),
                ViewMode::Colors => self.handle_colors_key(key),
            }
        };
        self.latch.request();
        action
    }

    /// Handles key events on the first help page
    pub fn handle_help_key(&mut self, key: Key) -> KeyAction {
        match key {
            Key::Char('?') | Key::Char('h') | Key::Char('H') => self.view = ViewMode::WindowsHelp,
            _ => self.view.reset(),
        }
        KeyAction::Continue
    }

    /// Handles key events on the windows help page
    pub fn handle_windows_help_key(&mut self, key: Key) -> KeyAction {
        match key {
            Key::Enter | Key::Escape | Key::Char('q') => self.view.reset(),
            Key::Char(c) => {
                self.stack.select_by_key(c);
            }
            _ => {}
        }
        KeyAction::Continue
    }

    /// Handles key events on the task screen.
    pub fn handle_command_key(&mut self, key: Key) -> KeyAction {
        match key {
            Key::Escape => {}
            Key::Char('q') => return KeyAction::Exit,
            Key::Char('W') => self.write_rcfile(),
            Key::Enter | Key::Space => self.force_sysinfo(),
            Key::Char(c) if self.global_key(c) => {}
            Key::Char(c) if self.summary_key(c) => {}
            Key::Char(c) if self.task_key(c) => {}
            Key::Char(c) if self.legacy_sort_key(c) => {}
            k if self.window_key(k) => {}
            _ => self.show_msg("Unknown command - try 'h' for help"),
        }
        KeyAction::Continue
    }

    // ========================================================================
    // Guards
    // ========================================================================

    /// True in alternate mode; otherwise warns.
    fn alt_check(&mut self) -> bool {
        if !self.altscr {
            self.show_msg("Command disabled, 'A' mode required");
        }
        self.altscr
    }

    /// True if the current window is visible; otherwise warns.
    fn viz_check(&mut self) -> bool {
        let w = self.stack.current();
        if !self.altscr || w.has(SHOW_TASKON) {
            return true;
        }
        let msg = format!("Command disabled, activate {} with '-' or '_'", w.grpname);
        self.show_msg(msg);
        false
    }

    /// Toggles `flag` on the current window if it is visible.
    fn viz_toggle(&mut self, flag: u32) {
        if self.viz_check() {
            self.stack.current_mut().toggle(flag);
        }
    }

    // ========================================================================
    // Global commands
    // ========================================================================

    fn global_key(&mut self, c: char) -> bool {
        match c {
            '?' | 'h' => self.view = ViewMode::Help,
            'B' => self.stack.current_mut().toggle(VIEW_NOBOLD),
            'd' | 's' => {
                if self.secure {
                    self.show_msg("Unavailable in secure mode");
                } else {
                    self.prompt_delay();
                }
            }
            'f' | 'F' => self.open_fields(),
            'g' => self.open_prompt(PromptKind::Group, "Choose field group (1 - 4)"),
            'H' => {
                self.threads = !self.threads;
                if !self.stack.current().has(VIEW_STATES) {
                    self.show_msg(format!("Show threads {}", on_off(self.threads)));
                }
                self.request_extra_refresh();
            }
            'I' => {
                if self.ncpu > 1 {
                    self.irixps = !self.irixps;
                    self.show_msg(format!("Irix mode {}", on_off(self.irixps)));
                } else {
                    self.show_msg("Only 1 cpu detected");
                }
            }
            'k' => {
                if self.secure {
                    self.show_msg("Unavailable in secure mode");
                } else {
                    self.prompt_kill();
                }
            }
            'r' => {
                if self.secure {
                    self.show_msg("Unavailable in secure mode");
                } else {
                    self.prompt_renice();
                }
            }
            'Z' => self.open_colors(),
            _ => return false,
        }
        true
    }

    // ========================================================================
    // Summary toggles
    // ========================================================================

    fn summary_key(&mut self, c: char) -> bool {
        let flag = match c {
            '1' => VIEW_CPUSUM,
            'l' => VIEW_LOADAV,
            'm' => VIEW_MEMORY,
            't' => VIEW_STATES,
            'C' => {
                self.viz_toggle(VIEW_SCROLL);
                return true;
            }
            _ => return false,
        };
        self.stack.current_mut().toggle(flag);
        true
    }

    // ========================================================================
    // Task display commands
    // ========================================================================

    fn task_key(&mut self, c: char) -> bool {
        match c {
            '#' | 'n' => {
                if self.viz_check() {
                    let text = format!(
                        "Maximum tasks = {}, change to (0 is unlimited)",
                        self.stack.current().rc.maxtasks
                    );
                    self.open_prompt(PromptKind::MaxTasks, text);
                }
            }
            '<' | '>' => {
                if self.viz_check() {
                    move_sort(self.stack.current_mut(), c == '>');
                }
            }
            'b' => {
                if self.viz_check() {
                    let w = self.stack.current_mut();
                    if !w.has_any(SHOW_HICOLS | SHOW_HIROWS) {
                        self.show_msg("Nothing to highlight!");
                    } else {
                        w.toggle(SHOW_HIBOLD);
                    }
                }
            }
            'c' => self.viz_toggle(SHOW_CMDLIN),
            'i' => self.viz_toggle(SHOW_IDLEPS),
            'R' => {
                if self.viz_check() {
                    let w = self.stack.current_mut();
                    w.toggle(QSRT_NORMAL);
                    w.clear(SHOW_FOREST);
                }
            }
            'S' => {
                if self.viz_check() {
                    let w = self.stack.current_mut();
                    w.toggle(SHOW_CTIMES);
                    let on = w.has(SHOW_CTIMES);
                    self.show_msg(format!("Cumulative time {}", on_off(on)));
                }
            }
            'u' | 'U' => {
                if self.viz_check() {
                    let which = if c == 'u' {
                        UserMatch::Effective
                    } else {
                        UserMatch::Any
                    };
                    self.open_prompt(PromptKind::User(which), "Which user (blank for all)");
                }
            }
            'V' => {
                if self.viz_check() {
                    let w = self.stack.current_mut();
                    w.toggle(SHOW_FOREST);
                    let on = w.has(SHOW_FOREST);
                    if !w.procflgs.contains(&FieldId::Command) {
                        self.show_msg(format!("Forest mode {}", on_off(on)));
                    }
                }
            }
            'x' => {
                if self.viz_check() {
                    let w = self.stack.current_mut();
                    if w.procflgs.contains(&w.rc.sortindx) {
                        w.toggle(SHOW_HICOLS);
                    } else {
                        self.show_msg("sort field not displayed");
                    }
                }
            }
            'y' => self.viz_toggle(SHOW_HIROWS),
            'z' => self.viz_toggle(SHOW_COLORS),
            _ => return false,
        }
        true
    }

    // ========================================================================
    // Window management commands
    // ========================================================================

    fn window_key(&mut self, key: Key) -> bool {
        match key {
            Key::Char('+') => {
                if self.alt_check() {
                    self.stack.for_each_mut(Window::equalize);
                    self.monpids.clear();
                }
            }
            Key::Char('-') => {
                if self.alt_check() {
                    self.stack.current_mut().toggle(SHOW_TASKON);
                }
            }
            Key::Char('=') => {
                self.stack.current_mut().equalize();
                self.monpids.clear();
            }
            Key::Char('_') => {
                if self.alt_check() {
                    self.stack.for_each_mut(|w| w.toggle(SHOW_TASKON));
                }
            }
            Key::Char('&') | Key::Char('L') => {
                if self.viz_check() {
                    let w = self.stack.current_mut();
                    w.set(SHOW_IDLEPS);
                    w.usrfilter = None;
                    if key == Key::Char('L') {
                        self.open_prompt(PromptKind::Locate, "Locate string");
                    } else if self.findstr.is_none() {
                        self.show_msg("Locate next inactive, use \"L\"");
                    } else {
                        self.find_string();
                    }
                }
            }
            Key::Char('A') => self.altscr = !self.altscr,
            Key::Char(c @ ('a' | 'w')) => {
                if self.alt_check() {
                    self.stack.select_by_key(c);
                }
            }
            Key::Char('G') => {
                if self.alt_check() {
                    let text = format!(
                        "Rename window '{}' to (1-3 chars)",
                        self.stack.current().rc.winname
                    );
                    self.open_prompt(PromptKind::Rename, text);
                }
            }
            Key::Up
            | Key::Down
            | Key::Left
            | Key::Right
            | Key::PageUp
            | Key::PageDown
            | Key::Home
            | Key::End => {
                if self.viz_check() {
                    let maxtask = self.frame_maxtask();
                    scroll(self.stack.current_mut(), key, maxtask);
                }
            }
            _ => return false,
        }
        true
    }

    /// Moves the current window to the next row containing the search
    /// string, showing a message when there is none.
    pub fn find_string(&mut self) {
        let Some(needle) = self.findstr.clone() else {
            return;
        };
        let i = self.stack.curwin;
        self.arrange(i);
        let begtask = self.stack.wins[i].begtask;
        let order = self.stack.wins[i].order.clone();
        let mut hit = None;
        for (n, p) in order.iter().enumerate().skip(begtask) {
            let Some(rec) = self.records.get(p.idx) else {
                continue;
            };
            if self.row_text(i, rec, p.depth).contains(&needle) {
                self.find_found = true;
                if n == begtask {
                    continue;
                }
                hit = Some(n);
                break;
            }
        }
        match hit {
            Some(n) => self.stack.wins[i].begtask = n,
            None => {
                let again = if self.find_found { "another " } else { "" };
                self.show_msg(format!("{}\"{}\" not found", again, needle));
            }
        }
    }

    // ========================================================================
    // Legacy sort keys
    // ========================================================================

    fn legacy_sort_key(&mut self, c: char) -> bool {
        let field = match c {
            'M' => FieldId::Mem,
            'N' => FieldId::Pid,
            'P' => FieldId::Cpu,
            'T' => FieldId::TimePlus,
            _ => return false,
        };
        let w = self.stack.current_mut();
        w.clear(SHOW_FOREST);
        w.rc.sortindx = field;
        true
    }
}

/// Moves the sort field one displayed column left or right.
fn move_sort(w: &mut Window, right: bool) {
    let Some(pos) = w.procflgs.iter().position(|&f| f == w.rc.sortindx) else {
        return;
    };
    let next = if right {
        pos + 1
    } else if pos > 0 {
        pos - 1
    } else {
        return;
    };
    if let Some(&f) = w.procflgs.get(next) {
        w.rc.sortindx = f;
        w.clear(SHOW_FOREST);
    }
}

/// Applies a cursor key to the window's row and column scroll.
fn scroll(w: &mut Window, key: Key, maxtask: usize) {
    let last = maxtask.saturating_sub(1);
    let page = w.winlines.saturating_sub(1);
    match key {
        Key::Up => w.begtask = w.begtask.saturating_sub(1),
        Key::Down => {
            if w.begtask < last {
                w.begtask += 1;
            }
        }
        Key::Left => w.begpflg = w.begpflg.saturating_sub(1),
        Key::Right => {
            if w.begpflg + 1 < w.pflgsall.len() {
                w.begpflg += 1;
            }
        }
        Key::PageUp => w.begtask = w.begtask.saturating_sub(page),
        Key::PageDown => {
            if w.begtask < last {
                w.begtask = (w.begtask + page).min(last);
            }
        }
        Key::Home => {
            w.begtask = 0;
            w.begpflg = 0;
        }
        Key::End => {
            w.begtask = (maxtask + 1).saturating_sub(w.winlines);
            w.begpflg = w.endpflg;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::tests::{engine, task};

    fn msg(state: &EngineState) -> String {
        state.msg.as_ref().map(|m| m.text.clone()).unwrap_or_default()
    }

    #[test]
    fn test_quit_and_unknown() {
        let mut state = engine(vec![vec![]]);
        assert_eq!(state.handle_key(Key::Char('q')), KeyAction::Exit);
        assert_eq!(state.handle_key(Key::Char('j')), KeyAction::Continue);
        assert_eq!(msg(&state), "Unknown command - try 'h' for help");
    }

    #[test]
    fn test_every_key_requests_recalibration() {
        let mut state = engine(vec![vec![]]);
        state.latch.begin();
        state.latch.finish();
        state.handle_key(Key::Char('l'));
        assert!(state.latch.is_pending());
        assert!(!state.stack.current().has(VIEW_LOADAV));
    }

    #[test]
    fn test_alt_only_commands_warn() {
        let mut state = engine(vec![vec![]]);
        state.handle_key(Key::Char('a'));
        assert_eq!(state.stack.curwin, 0);
        assert_eq!(msg(&state), "Command disabled, 'A' mode required");

        state.handle_key(Key::Char('A'));
        state.handle_key(Key::Char('a'));
        assert_eq!(state.stack.curwin, 1);
    }

    #[test]
    fn test_hidden_window_refuses_task_commands() {
        let mut state = engine(vec![vec![]]);
        state.altscr = true;
        state.handle_key(Key::Char('-'));
        assert!(!state.stack.current().has(SHOW_TASKON));
        state.handle_key(Key::Char('c'));
        assert!(!state.stack.current().has(SHOW_CMDLIN));
        assert_eq!(msg(&state), "Command disabled, activate 1:Def with '-' or '_'");

        state.handle_key(Key::Char('+'));
        assert!(state.stack.wins.iter().all(|w| w.has(SHOW_TASKON)));
    }

    #[test]
    fn test_secure_mode_refuses_kill_and_delay() {
        let mut state = engine(vec![vec![]]);
        state.secure = true;
        for c in ['k', 'r', 'd', 's'] {
            state.msg = None;
            state.handle_key(Key::Char(c));
            assert!(state.prompt.is_none());
            assert_eq!(msg(&state), "Unavailable in secure mode");
        }
    }

    #[test]
    fn test_irix_needs_smp() {
        let mut state = engine(vec![vec![]]);
        let before = state.irixps;
        state.handle_key(Key::Char('I'));
        assert_eq!(state.irixps, before);
        assert_eq!(msg(&state), "Only 1 cpu detected");
        state.ncpu = 4;
        state.handle_key(Key::Char('I'));
        assert_eq!(state.irixps, !before);
    }

    #[test]
    fn test_highlight_needs_something() {
        let mut state = engine(vec![vec![]]);
        state.stack.current_mut().clear(SHOW_HIROWS | SHOW_HICOLS);
        let before = state.stack.current().has(SHOW_HIBOLD);
        state.handle_key(Key::Char('b'));
        assert_eq!(state.stack.current().has(SHOW_HIBOLD), before);
        assert_eq!(msg(&state), "Nothing to highlight!");
    }

    #[test]
    fn test_sort_moves_and_legacy_keys() {
        let mut state = engine(vec![vec![]]);
        state.calibrate(|| (200, 50)).unwrap();
        state.stack.current_mut().set(SHOW_FOREST);
        state.handle_key(Key::Char('>'));
        let w = state.stack.current();
        assert_eq!(w.rc.sortindx, FieldId::Mem);
        assert!(!w.has(SHOW_FOREST));

        state.handle_key(Key::Char('<'));
        state.handle_key(Key::Char('<'));
        assert_eq!(state.stack.current().rc.sortindx, FieldId::State);

        state.handle_key(Key::Char('T'));
        assert_eq!(state.stack.current().rc.sortindx, FieldId::TimePlus);
    }

    #[test]
    fn test_x_needs_visible_sort_column() {
        let mut state = engine(vec![vec![]]);
        state.calibrate(|| (200, 50)).unwrap();
        state.handle_key(Key::Char('x'));
        assert!(state.stack.current().has(SHOW_HICOLS));

        state.stack.current_mut().rc.sortindx = FieldId::Wchan;
        state.handle_key(Key::Char('x'));
        assert_eq!(msg(&state), "sort field not displayed");
    }

    #[test]
    fn test_equalize_resets_current_window() {
        let mut state = engine(vec![vec![]]);
        state.monpids = vec![1, 2];
        let w = state.stack.current_mut();
        w.rc.maxtasks = 5;
        w.begtask = 3;
        w.clear(SHOW_IDLEPS);
        state.handle_key(Key::Char('='));
        let w = state.stack.current();
        assert_eq!((w.rc.maxtasks, w.begtask), (0, 0));
        assert!(w.has(SHOW_IDLEPS));
        assert!(state.monpids.is_empty());
    }

    #[test]
    fn test_plus_equalizes_every_window_in_alt_mode() {
        let mut state = engine(vec![vec![]]);
        state.altscr = true;
        state.stack.for_each_mut(|w| w.rc.maxtasks = 5);
        state.handle_key(Key::Char('='));
        let limits: Vec<usize> = state.stack.wins.iter().map(|w| w.rc.maxtasks).collect();
        assert_eq!(limits, vec![0, 5, 5, 5]);

        state.handle_key(Key::Char('+'));
        assert!(state.stack.wins.iter().all(|w| w.rc.maxtasks == 0));
    }

    #[test]
    fn test_scroll_keys() {
        let mut w = Window::new(1, crate::app::window::WinRc::defaults()[0].clone());
        w.winlines = 10;
        scroll(&mut w, Key::Down, 50);
        assert_eq!(w.begtask, 1);
        scroll(&mut w, Key::PageDown, 50);
        assert_eq!(w.begtask, 10);
        scroll(&mut w, Key::PageUp, 50);
        assert_eq!(w.begtask, 1);
        scroll(&mut w, Key::End, 50);
        assert_eq!(w.begtask, 41);
        scroll(&mut w, Key::Home, 50);
        assert_eq!((w.begtask, w.begpflg), (0, 0));
        scroll(&mut w, Key::Up, 50);
        assert_eq!(w.begtask, 0);
    }

    #[test]
    fn test_find_moves_to_matching_row() {
        let mut state = engine(vec![vec![task(1, 3), task(2, 2), task(3, 1)]]);
        state.refresh().unwrap();
        state.calibrate(|| (80, 24)).unwrap();

        state.handle_key(Key::Char('&'));
        assert_eq!(msg(&state), "Locate next inactive, use \"L\"");

        state.handle_key(Key::Char('L'));
        for c in "cmd3".chars() {
            state.handle_key(Key::Char(c));
        }
        state.handle_key(Key::Enter);
        // ordered by %CPU: cmd1, cmd2, cmd3
        assert_eq!(state.stack.current().begtask, 2);

        state.msg = None;
        state.handle_key(Key::Char('&'));
        assert_eq!(msg(&state), "another \"cmd3\" not found");

        state.handle_key(Key::Char('L'));
        for c in "nothing".chars() {
            state.handle_key(Key::Char(c));
        }
        state.handle_key(Key::Enter);
        assert_eq!(msg(&state), "\"nothing\" not found");
    }

    #[test]
    fn test_help_pages() {
        let mut state = engine(vec![vec![]]);
        state.handle_key(Key::Char('h'));
        assert_eq!(state.view, ViewMode::Help);
        state.handle_key(Key::Char('?'));
        assert_eq!(state.view, ViewMode::WindowsHelp);
        state.handle_key(Key::Char('3'));
        assert_eq!(state.stack.curwin, 2);
        state.handle_key(Key::Enter);
        assert_eq!(state.view, ViewMode::Tasks);
    }
}
