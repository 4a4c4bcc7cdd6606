//! View mode enum for the engine
//!
//! Defines the mutually exclusive screens. Only one is active at a time;
//! it decides how keys are dispatched and what the frame draws below the
//! summary area.

/// The screen currently shown.
///
/// Line prompts are not a mode of their own: they overlay the message
/// row of whatever screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Summary plus task windows (default mode)
    #[default]
    Tasks,

    /// Command help page
    Help,

    /// Window management help page
    WindowsHelp,

    /// Fields management screen
    Fields,

    /// Color mapping screen
    Colors,
}

impl ViewMode {
    /// Returns true if the task windows are on screen
    #[inline]
    pub fn is_tasks(&self) -> bool {
        matches!(self, ViewMode::Tasks)
    }

    /// Returns true if either help page is shown
    #[inline]
    pub fn is_help(&self) -> bool {
        matches!(self, ViewMode::Help | ViewMode::WindowsHelp)
    }

    /// Returns to the task windows
    #[inline]
    pub fn reset(&mut self) {
        *self = ViewMode::Tasks;
    }
}
