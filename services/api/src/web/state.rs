//! services/api/src/web/state.rs
//!
//! Defines the application's shared state. Per-connection state is the
//! `WatchSession` from the core crate, owned by the WebSocket handler.

use crate::adapters::RestGateway;
use crate::config::Config;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The unbound gateway client; each session derives a copy bound to the
    /// client's access token.
    pub gateway: Arc<RestGateway>,
    pub config: Arc<Config>,
}
