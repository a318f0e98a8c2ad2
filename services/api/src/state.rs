//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resources
//! shared by every handler and WebSocket session.

use crate::config::Config;
use affect_tutor_core::ContentStore;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentStore>,
    pub config: Arc<Config>,
}
