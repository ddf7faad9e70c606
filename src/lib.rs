//! digidex: a terminal catalog browser.
//!
//! The library holds everything except process setup: the catalog loader,
//! the identity bootstrapper, the favorite synchronizer, the view-state
//! controller that composes them, the SQLite-backed document store and the
//! ratatui front end. `main.rs` only parses flags, loads configuration and
//! wires these together.

pub mod app;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod identity;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
