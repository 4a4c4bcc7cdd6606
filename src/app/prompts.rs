//! Line prompts on the message row
//!
//! A prompt is a small line editor plus what to do with the committed
//! text. The frame loop keeps running underneath, so a resize while a
//! prompt is open just redraws around it.

use crate::constants::{DEFAULT_KILL_SIGNAL, WINNAME_MAX};
use crate::system::users::{user_certify, UserMatch};

use super::input::Key;
use super::state::EngineState;

// ============================================================================
// Line editor
// ============================================================================

/// What a key did to the line being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Still editing
    Pending,
    /// Enter: the text is final
    Commit(String),
    /// Escape: nothing is applied
    Cancel,
}

/// Single line of input with a cursor
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    buf: Vec<char>,
    cursor: usize,
}

impl LineEditor {
    /// Creates an empty editor
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text
    pub fn text(&self) -> String {
        self.buf.iter().collect()
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Applies one key.
    pub fn handle(&mut self, key: Key) -> EditOutcome {
        match key {
            Key::Enter => return EditOutcome::Commit(self.text()),
            Key::Escape => return EditOutcome::Cancel,
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.buf.remove(self.cursor);
                }
            }
            Key::Delete | Key::Down => {
                if self.cursor < self.buf.len() {
                    self.buf.remove(self.cursor);
                }
            }
            Key::Insert | Key::Up => self.buf.insert(self.cursor, ' '),
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.buf.len()),
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.buf.len(),
            Key::Space => self.insert(' '),
            Key::Char(c) if !c.is_control() => self.insert(c),
            _ => {}
        }
        EditOutcome::Pending
    }

    fn insert(&mut self, c: char) {
        self.buf.insert(self.cursor, c);
        self.cursor += 1;
    }
}

// ============================================================================
// Numeric input
// ============================================================================

/// A committed numeric answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumInput<T> {
    /// Nothing was typed
    Empty,
    /// Not a number; a message has been shown
    Bad,
    /// The parsed value
    Value(T),
}

/// Longest prefix of `s` made of characters in `allowed`.
fn numeric_prefix<'a>(s: &'a str, allowed: &str) -> &'a str {
    let end = s
        .char_indices()
        .find(|&(_, c)| !allowed.contains(c))
        .map_or(s.len(), |(i, _)| i);
    &s[..end]
}

/// Parses an integer answer. Signs are allowed for renice.
pub fn parse_int(input: &str) -> NumInput<i64> {
    let input = input.trim();
    if input.is_empty() {
        return NumInput::Empty;
    }
    match numeric_prefix(input, "-+0123456789").parse::<i64>() {
        Ok(n) => NumInput::Value(n),
        Err(_) => NumInput::Bad,
    }
}

/// Parses a non-negative decimal answer. A comma counts as the point.
pub fn parse_float(input: &str) -> NumInput<f64> {
    let input = input.trim();
    if input.is_empty() {
        return NumInput::Empty;
    }
    let num = numeric_prefix(input, "+,.0123456789").replace(',', ".");
    match num.parse::<f64>() {
        Ok(f) if f.is_finite() => NumInput::Value(f),
        _ => NumInput::Bad,
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// What a committed prompt is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// Seconds between frames
    Delay,
    /// Row limit of the current window
    MaxTasks,
    /// User filter of the current window
    User(UserMatch),
    /// First step of kill
    KillPid,
    /// Second step of kill
    KillSignal {
        /// Target
        pid: i32,
    },
    /// First step of renice
    RenicePid,
    /// Second step of renice
    ReniceValue {
        /// Target
        pid: i32,
    },
    /// New name of the current window
    Rename,
    /// Window to make current
    Group,
    /// Search string
    Locate,
}

/// An open prompt
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Purpose
    pub kind: PromptKind,
    /// Question shown before the input
    pub text: String,
    /// Input so far
    pub editor: LineEditor,
}

impl Prompt {
    /// The message row: question, a space, then the input.
    pub fn line(&self) -> String {
        format!("{} {}", self.text, self.editor.text())
    }

    /// Screen column of the input cursor
    pub fn cursor_col(&self) -> usize {
        self.text.chars().count() + 1 + self.editor.cursor()
    }
}

impl EngineState {
    /// Opens a prompt on the message row.
    pub fn open_prompt(&mut self, kind: PromptKind, text: impl Into<String>) {
        self.prompt = Some(Prompt {
            kind,
            text: text.into(),
            editor: LineEditor::new(),
        });
    }

    /// Feeds a key to the open prompt, applying it on Enter.
    pub fn handle_prompt_key(&mut self, key: Key) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match prompt.editor.handle(key) {
            EditOutcome::Pending => {}
            EditOutcome::Cancel => self.prompt = None,
            EditOutcome::Commit(input) => {
                if let Some(p) = self.prompt.take() {
                    self.apply_prompt(p.kind, &input);
                }
            }
        }
    }

    fn int_answer(&mut self, input: &str) -> NumInput<i64> {
        let n = parse_int(input);
        if n == NumInput::Bad {
            self.show_msg("Unacceptable integer");
        }
        n
    }

    fn apply_prompt(&mut self, kind: PromptKind, input: &str) {
        match kind {
            PromptKind::Delay => match parse_float(input) {
                NumInput::Value(secs) => self.delay = secs,
                NumInput::Bad => self.show_msg("Unacceptable floating point"),
                NumInput::Empty => {}
            },
            PromptKind::MaxTasks => {
                if let NumInput::Value(n) = self.int_answer(input) {
                    match usize::try_from(n) {
                        Ok(n) => self.stack.current_mut().rc.maxtasks = n,
                        Err(_) => self.show_msg("Invalid maximum"),
                    }
                }
            }
            PromptKind::User(which) => match user_certify(input, which) {
                Ok(filter) => self.stack.current_mut().usrfilter = filter,
                Err(msg) => self.show_msg(msg),
            },
            PromptKind::KillPid => {
                let pid = match self.int_answer(input) {
                    NumInput::Value(n) => n as i32,
                    NumInput::Empty => self.default_pid(),
                    NumInput::Bad => return,
                };
                if pid > 0 {
                    self.open_prompt(
                        PromptKind::KillSignal { pid },
                        format!("Send pid {} signal [{}/sigterm]", pid, DEFAULT_KILL_SIGNAL),
                    );
                }
            }
            PromptKind::KillSignal { pid } => self.signal_task(pid, input),
            PromptKind::RenicePid => {
                let pid = match self.int_answer(input) {
                    NumInput::Value(n) => n as i32,
                    NumInput::Empty => self.default_pid(),
                    NumInput::Bad => return,
                };
                if pid > 0 {
                    self.open_prompt(
                        PromptKind::ReniceValue { pid },
                        format!("Renice PID {} to value", pid),
                    );
                }
            }
            PromptKind::ReniceValue { pid } => {
                if let NumInput::Value(n) = self.int_answer(input) {
                    self.renice_task(pid, n);
                }
            }
            PromptKind::Rename => {
                let name = input.trim();
                if name.chars().count() > WINNAME_MAX {
                    self.show_msg(format!("Window name '{}' too long (1-3 chars)", name));
                } else if !name.is_empty() {
                    self.stack.current_mut().rename(name);
                }
            }
            PromptKind::Group => {
                if let Some(c) = input.trim().chars().next() {
                    self.stack.select_by_key(c);
                }
            }
            PromptKind::Locate => {
                self.find_found = false;
                self.findstr = Some(input.to_string()).filter(|s| !s.is_empty());
                self.find_string();
            }
        }
    }

    /// Opens the delay prompt.
    pub fn prompt_delay(&mut self) {
        let text = format!("Change delay from {:.1} to", self.delay);
        self.open_prompt(PromptKind::Delay, text);
    }

    /// Opens the kill prompt.
    pub fn prompt_kill(&mut self) {
        let text = format!("PID to signal/kill [default pid = {}]", self.default_pid());
        self.open_prompt(PromptKind::KillPid, text);
    }

    /// Opens the renice prompt.
    pub fn prompt_renice(&mut self) {
        let text = format!("PID to renice [default pid = {}]", self.default_pid());
        self.open_prompt(PromptKind::RenicePid, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::tests::engine;

    fn type_line(state: &mut EngineState, s: &str) {
        for c in s.chars() {
            state.handle_prompt_key(Key::Char(c));
        }
        state.handle_prompt_key(Key::Enter);
    }

    #[test]
    fn test_editor_keys() {
        let mut ed = LineEditor::new();
        for c in "helo".chars() {
            ed.handle(Key::Char(c));
        }
        ed.handle(Key::Left);
        ed.handle(Key::Char('l'));
        assert_eq!(ed.text(), "hello");
        ed.handle(Key::Home);
        ed.handle(Key::Delete);
        assert_eq!(ed.text(), "ello");
        ed.handle(Key::End);
        ed.handle(Key::Backspace);
        assert_eq!(ed.text(), "ell");
        assert_eq!(ed.cursor(), 3);
        assert_eq!(ed.handle(Key::Enter), EditOutcome::Commit("ell".to_string()));
        assert_eq!(ed.handle(Key::Escape), EditOutcome::Cancel);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_int(""), NumInput::Empty);
        assert_eq!(parse_int("-5"), NumInput::Value(-5));
        assert_eq!(parse_int("12abc"), NumInput::Value(12));
        assert_eq!(parse_int("abc"), NumInput::Bad);
        assert_eq!(parse_float("1,5"), NumInput::Value(1.5));
        assert_eq!(parse_float("-1"), NumInput::Bad);
        assert_eq!(parse_float("  "), NumInput::Empty);
    }

    #[test]
    fn test_delay_prompt() {
        let mut state = engine(vec![vec![]]);
        state.prompt_delay();
        assert_eq!(state.prompt.as_ref().unwrap().text, "Change delay from 3.0 to");
        type_line(&mut state, "0.5");
        assert!(state.prompt.is_none());
        assert_eq!(state.delay, 0.5);

        state.prompt_delay();
        type_line(&mut state, "x");
        assert_eq!(state.delay, 0.5);
        assert_eq!(state.msg.as_ref().unwrap().text, "Unacceptable floating point");
    }

    #[test]
    fn test_maxtasks_prompt() {
        let mut state = engine(vec![vec![]]);
        state.open_prompt(PromptKind::MaxTasks, "max");
        type_line(&mut state, "7");
        assert_eq!(state.stack.current().rc.maxtasks, 7);

        state.open_prompt(PromptKind::MaxTasks, "max");
        type_line(&mut state, "-2");
        assert_eq!(state.stack.current().rc.maxtasks, 7);
        assert_eq!(state.msg.as_ref().unwrap().text, "Invalid maximum");
    }

    #[test]
    fn test_escape_cancels() {
        let mut state = engine(vec![vec![]]);
        state.prompt_delay();
        state.handle_prompt_key(Key::Char('9'));
        state.handle_prompt_key(Key::Escape);
        assert!(state.prompt.is_none());
        assert_eq!(state.delay, 3.0);
    }

    #[test]
    fn test_kill_prompt_chains_to_signal() {
        let mut state = engine(vec![vec![]]);
        state.open_prompt(PromptKind::KillPid, "kill");
        type_line(&mut state, "1234");
        let p = state.prompt.as_ref().unwrap();
        assert_eq!(p.kind, PromptKind::KillSignal { pid: 1234 });
        assert_eq!(p.text, "Send pid 1234 signal [15/sigterm]");
    }

    #[test]
    fn test_rename_prompt() {
        let mut state = engine(vec![vec![]]);
        state.open_prompt(PromptKind::Rename, "rename");
        type_line(&mut state, "Abc");
        assert_eq!(state.stack.current().grpname, "1:Abc");

        state.open_prompt(PromptKind::Rename, "rename");
        type_line(&mut state, "Toolong");
        assert_eq!(state.stack.current().rc.winname, "Abc");
        assert!(state.msg.is_some());
    }

    #[test]
    fn test_group_prompt() {
        let mut state = engine(vec![vec![]]);
        state.open_prompt(PromptKind::Group, "group");
        type_line(&mut state, "3");
        assert_eq!(state.stack.curwin, 2);
    }

    #[test]
    fn test_prompt_line_and_cursor() {
        let mut state = engine(vec![vec![]]);
        state.open_prompt(PromptKind::Locate, "Locate string");
        state.handle_prompt_key(Key::Char('a'));
        let p = state.prompt.as_ref().unwrap();
        assert_eq!(p.line(), "Locate string a");
        assert_eq!(p.cursor_col(), 15);
    }
}
