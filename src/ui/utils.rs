//! Utility types for UI rendering
//!
//! A frame is composed as plain [`Line`]s of styled segments first and
//! written to the terminal afterwards, so layout can be tested without a
//! terminal and unchanged rows can be skipped.

use crossterm::style::Color;

use crate::app::window::{Window, SHOW_COLORS, SHOW_HIBOLD, VIEW_NOBOLD};

/// Maps a palette index (0-7) to a terminal color.
#[must_use]
pub fn palette(idx: u8) -> Color {
    match idx {
        0 => Color::Black,
        1 => Color::DarkRed,
        2 => Color::DarkGreen,
        3 => Color::DarkYellow,
        4 => Color::DarkBlue,
        5 => Color::DarkMagenta,
        6 => Color::DarkCyan,
        _ => Color::Grey,
    }
}

/// Visual attributes of a segment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    /// Foreground color, `None` for the terminal default
    pub fg: Option<Color>,
    /// Bold
    pub bold: bool,
    /// Reverse video
    pub reverse: bool,
}

impl Style {
    /// Terminal default attributes
    pub const PLAIN: Style = Style {
        fg: None,
        bold: false,
        reverse: false,
    };

    /// Base style for a palette slot of `w`: colored only when the window
    /// has colors on.
    pub fn slot(w: &Window, idx: u8) -> Self {
        Self {
            fg: w.has(SHOW_COLORS).then(|| palette(idx)),
            ..Self::PLAIN
        }
    }

    /// Emphasis for highlighted rows and columns of `w`.
    ///
    /// Bold or reverse per the window's choice; bold degrades to reverse
    /// when bold is switched off.
    pub fn emphasized(self, w: &Window) -> Self {
        if w.has(SHOW_HIBOLD) && !w.has(VIEW_NOBOLD) {
            Self { bold: true, ..self }
        } else {
            Self {
                reverse: true,
                ..self
            }
        }
    }

    /// Same style in reverse video
    pub fn reversed(self) -> Self {
        Self {
            reverse: true,
            ..self
        }
    }
}

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub style: Style,
    pub text: String,
}

/// One screen row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub segments: Vec<Segment>,
}

impl Line {
    /// A row of unstyled text
    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(Style::PLAIN, text)
    }

    /// A row of text in one style
    pub fn styled(style: Style, text: impl Into<String>) -> Self {
        let mut line = Self::default();
        line.push(style, text);
        line
    }

    /// Appends a segment, merging it with the last one when the style
    /// matches.
    pub fn push(&mut self, style: Style, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.style == style => last.text.push_str(&text),
            _ => self.segments.push(Segment { style, text }),
        }
    }

    /// The row's characters without styling
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Cuts the row to `cols` characters.
    pub fn truncate(&mut self, cols: usize) {
        let mut left = cols;
        self.segments.retain_mut(|seg| {
            if left == 0 {
                return false;
            }
            seg.text = truncate_string(&seg.text, left);
            left -= seg.text.chars().count();
            true
        });
    }
}

/// Truncates a string to at most `max_len` characters.
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}
