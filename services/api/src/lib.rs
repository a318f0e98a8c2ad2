//! Affect Tutor API Library Crate
//!
//! The browser-facing service around the teaching loop: configuration,
//! shared state, the REST handlers for browsing lesson content, the
//! per-connection WebSocket session, and routing. The binaries in `bin/`
//! are thin wrappers around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
