// src/server/state.rs

//! Application state for the relay server.
//!
//! Holds the relay actor address and the account store handle.
//! Used to share state between HTTP/WebSocket handlers and the actor system.

use actix::Addr;

use crate::server::relay::RelayServer;
use crate::store::Store;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the relay actor (registry, lobbies, invitations, games).
    pub relay_addr: Addr<RelayServer>,
    /// Handle to the account database.
    pub store: Store,
}

impl AppState {
    /// Create a new AppState with the given actor address and store handle.
    pub fn new(relay_addr: Addr<RelayServer>, store: Store) -> Self {
        AppState { relay_addr, store }
    }
}
