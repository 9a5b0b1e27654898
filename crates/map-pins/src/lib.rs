//! Map Pins - Application Library
//!
//! Headless driver around `map-pins-lib`: loads a position dump, replays a
//! scripted sequence of zoom and pan events against an in-memory map and
//! reports what ended up on screen.

mod app;

pub use app::logging::setup_logging;
pub use app::settings::Settings;
pub use app::{CliError, run};
