//! Application state and logic
//!
//! - `state` - Engine state and the per-frame refresh
//! - `fields` - Field catalog, column widths and sorting
//! - `window` - Window settings and the four-window ring
//! - `layout` - Calibration and row distribution
//! - `forest` - Parent/child ordering
//! - `rows` - Task row cells
//! - `input` - Key dispatch and the command groups
//! - `prompts` - Line prompts on the message row
//! - `fields_manager`, `color_mapping` - Sub-screens
//! - `process_ops` - Signal and renice
//! - `rcfile` - Persisted configuration
//! - `cli` - Command-line arguments

pub mod cli;
pub mod color_mapping;
pub mod fields;
pub mod fields_manager;
pub mod forest;
pub mod input;
pub mod layout;
pub mod process_ops;
pub mod prompts;
pub mod rcfile;
pub mod rows;
pub mod state;
pub mod view_mode;
pub mod window;

pub use input::{Key, KeyAction};
pub use state::EngineState;
pub use view_mode::ViewMode;
