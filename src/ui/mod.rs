//! Terminal user interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling and the search-screen policy
//! - `render` - Layout, navigation bar and screen dispatch
//! - `lists` - Home, Favorites and Search entity lists
//! - `details` - Single entity view
//! - `stats` - Level distribution bars
//! - `info` - About text and session/favorites availability
//! - `help` - Keybinding overlay
//! - `status` - Status bar

mod details;
mod help;
mod info;
mod input;
mod lists;
mod loop_runner;
mod render;
mod stats;
mod status;

pub use loop_runner::{run, Action};
