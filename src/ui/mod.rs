//! User interface rendering
//!
//! This module provides all terminal UI rendering functionality:
//! - `render` - Frame composition entry point and batch output
//! - `components` - Summary blocks and the message row
//! - `process_list` - Task windows
//! - `help` - Help pages
//! - `fields_view` - Fields management screen
//! - `colors_view` - Color mapping screen
//! - `terminal` - Raw mode, key decoding and the diffing screen
//! - `utils` - Styled lines and the palette

mod colors_view;
mod components;
mod fields_view;
mod help;
mod process_list;
mod render;
pub mod terminal;
mod utils;

pub use render::{compose, write_batch, Frame};
pub use terminal::{decode_key, terminal_size, Screen, TerminalGuard};
