//! Room Agent Backend Library
//!
//! HTTP control surface for headless-browser agents that join
//! video-conference rooms, plus a thin proxy to the conferencing REST
//! backend. The binary is in `src/main.rs`; the interactive console is
//! in `src/bin/console.rs`.

/// Browser session lifecycle and interaction routines
pub mod agent;
/// HTTP request handlers
pub mod api;
/// Environment-driven configuration
pub mod config;
/// Application error types
pub mod error;
/// External service clients
pub mod services;
/// Agent registry, status machine, and snapshot persistence
pub mod state;
