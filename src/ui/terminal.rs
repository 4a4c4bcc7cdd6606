//! Terminal I/O: raw mode, key decoding and the diffing screen
//!
//! [`TerminalGuard`] owns the terminal modes and puts them back when it
//! drops, so an early error return never leaves the terminal raw.
//! [`Screen`] remembers the last frame and only rewrites rows that
//! changed.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use tracing::debug;

use crate::app::input::Key;

use super::utils::{Line, Segment};

// ============================================================================
// Key decoding
// ============================================================================

/// Decodes a crossterm key event into a logical key.
///
/// Returns `None` for keys without a command meaning. Raw mode turns off
/// the terminal's own signal keys, so Ctrl-C reads as `q` and Ctrl-Z as
/// [`Key::Suspend`]. Other control chords are ignored.
pub fn decode_key(event: KeyEvent) -> Option<Key> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let key = match event.code {
        KeyCode::Char('c') if ctrl => Key::Char('q'),
        KeyCode::Char('z') if ctrl => Key::Suspend,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        _ => return None,
    };
    Some(key)
}

// ============================================================================
// Terminal modes
// ============================================================================

/// Raw mode plus alternate screen for as long as the value lives
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    /// Enters raw mode and the alternate screen.
    pub fn enter() -> io::Result<Self> {
        let mut guard = Self { active: false };
        guard.resume()?;
        Ok(guard)
    }

    /// Gives the terminal back in its original state (before a stop).
    pub fn suspend(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(io::stdout(), Show, EnableLineWrap, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        debug!("terminal restored");
        Ok(())
    }

    /// Re-enters raw mode after [`suspend`](Self::suspend).
    pub fn resume(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        self.active = true;
        execute!(io::stdout(), EnterAlternateScreen, DisableLineWrap, Hide)?;
        debug!("terminal in raw mode");
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.suspend();
    }
}

/// Current terminal size, or `fallback` when it cannot be queried
pub fn terminal_size(fallback: (u16, u16)) -> (u16, u16) {
    terminal::size().unwrap_or(fallback)
}

// ============================================================================
// Diffing screen
// ============================================================================

/// Rows whose content differs between two frames, plus whether the new
/// frame is shorter (leftover rows must be cleared).
pub fn changed_rows(prev: &[Line], next: &[Line]) -> (Vec<usize>, bool) {
    let changed = next
        .iter()
        .enumerate()
        .filter(|(i, line)| prev.get(*i) != Some(*line))
        .map(|(i, _)| i)
        .collect();
    (changed, next.len() < prev.len())
}

/// The last frame written to the terminal
#[derive(Debug, Default)]
pub struct Screen {
    prev: Vec<Line>,
}

impl Screen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the last frame so the next paint rewrites everything.
    pub fn invalidate(&mut self) {
        self.prev.clear();
    }

    /// Writes the rows of `lines` that changed since the last paint and
    /// leaves the cursor at `cursor` (shown) or hidden.
    pub fn paint<W: Write>(
        &mut self,
        out: &mut W,
        lines: Vec<Line>,
        cursor: Option<(u16, u16)>,
    ) -> io::Result<()> {
        if self.prev.is_empty() {
            queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
        }
        queue!(out, Hide)?;
        let (changed, shorter) = changed_rows(&self.prev, &lines);
        for i in changed {
            queue!(out, MoveTo(0, i as u16))?;
            for seg in &lines[i].segments {
                write_segment(out, seg)?;
            }
            queue!(out, Clear(ClearType::UntilNewLine))?;
        }
        if shorter {
            queue!(out, MoveTo(0, lines.len() as u16), Clear(ClearType::FromCursorDown))?;
        }
        if let Some((col, row)) = cursor {
            queue!(out, MoveTo(col, row), Show)?;
        }
        out.flush()?;
        self.prev = lines;
        Ok(())
    }
}

fn write_segment<W: Write>(out: &mut W, seg: &Segment) -> io::Result<()> {
    let style = seg.style;
    if style.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if style.reverse {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    if let Some(fg) = style.fg {
        queue!(out, SetForegroundColor(fg))?;
    }
    queue!(out, Print(&seg.text))?;
    if style != super::utils::Style::PLAIN {
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    }
    Ok(())
}
