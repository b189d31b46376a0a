//! Analytics and time-based replay over recorded GPS flight tracks.
//!
//! The core (`geo`, `model`, `filter`, `stats`, `replay`, `camera`,
//! `selection`) is free of terminal concerns; `map`, `ui` and `runtime`
//! drive it from a ratatui front end.

pub mod app;
pub mod camera;
pub mod config;
pub mod export;
pub mod filter;
pub mod geo;
pub mod logging;
pub mod map;
pub mod model;
pub mod replay;
pub mod runtime;
pub mod selection;
pub mod stats;
pub mod storage;
pub mod ui;
