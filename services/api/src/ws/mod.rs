//! WebSocket Session Management
//!
//! - `protocol`: the JSON message format for client-server communication.
//! - `bridge`: the browser's voice engine, camera and detector as core collaborators.
//! - `session`: the connection lifecycle, from upgrade to termination.

pub mod bridge;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
