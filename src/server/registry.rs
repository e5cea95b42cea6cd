//! Connection registry: username -> live session channel.
//!
//! Single source of truth for "is this user currently reachable". Owned by
//! the relay actor, so every mutation is serialized through its mailbox.

use std::collections::HashMap;

use actix::Recipient;

use crate::server::messages::ServerMessage;

/// Bidirectional-channel directory keyed by username.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, Recipient<ServerMessage>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Register, or silently overwrite, the channel for a username.
    ///
    /// Overwriting is legal and expected on reconnect. The superseded channel
    /// is not closed; its session stops on its own when the transport drops.
    pub fn identify(&mut self, username: &str, addr: Recipient<ServerMessage>) {
        self.connections.insert(username.to_string(), addr);
    }

    /// Look up the live channel for a username. `None` means offline.
    pub fn resolve(&self, username: &str) -> Option<&Recipient<ServerMessage>> {
        self.connections.get(username)
    }

    /// Drop the mapping for a username. Called on transport close.
    pub fn forget(&mut self, username: &str) {
        self.connections.remove(username);
    }
}
