//! Room agent module
//!
//! One agent owns one headless-browser session joined to a conference room.
//! `browser.rs` covers the session lifecycle, `routines.rs` the UI
//! interaction macros, `ui_map.rs` the client's selectors.

pub mod browser;
pub mod routines;
pub mod ui_map;

pub use browser::{Agent, AgentError};
pub use routines::Participant;
pub use ui_map::UiMap;
