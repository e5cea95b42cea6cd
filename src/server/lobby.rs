//! Lobby directory: lobby id -> member set.
//!
//! Owns the membership lifecycle. A lobby exists in the directory iff its
//! member set is non-empty; the last member's departure destroys the entry
//! synchronously and the caller tears down the lobby's session and timers.

use std::collections::{HashMap, HashSet};

/// Result of removing a member from a lobby.
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyChange {
    /// The lobby still has members; carries the updated snapshot.
    Updated(Vec<String>),
    /// The member was the last one; the lobby entry has been removed and the
    /// caller must tear down the associated session state.
    Destroyed,
    /// Unknown lobby or member not present. Disconnects race explicit
    /// leaves, so this is a no-op, never an error.
    Untouched,
}

/// Directory of lobbies and their members.
#[derive(Default)]
pub struct LobbyDirectory {
    lobbies: HashMap<String, HashSet<String>>,
}

impl LobbyDirectory {
    pub fn new() -> Self {
        Self {
            lobbies: HashMap::new(),
        }
    }

    /// Idempotent add; creates the lobby entry if absent.
    /// Returns the full current member set for broadcast.
    pub fn join(&mut self, lobby_id: &str, username: &str) -> Vec<String> {
        let members = self.lobbies.entry(lobby_id.to_string()).or_default();
        members.insert(username.to_string());
        members.iter().cloned().collect()
    }

    /// Idempotent remove; destroys the lobby when it empties.
    pub fn leave(&mut self, lobby_id: &str, username: &str) -> LobbyChange {
        let Some(members) = self.lobbies.get_mut(lobby_id) else {
            return LobbyChange::Untouched;
        };
        if !members.remove(username) {
            return LobbyChange::Untouched;
        }
        if members.is_empty() {
            self.lobbies.remove(lobby_id);
            LobbyChange::Destroyed
        } else {
            LobbyChange::Updated(members.iter().cloned().collect())
        }
    }

    /// Read-only membership snapshot. Empty for unknown lobbies.
    pub fn members(&self, lobby_id: &str) -> Vec<String> {
        self.lobbies
            .get(lobby_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the lobby currently exists (i.e. has at least one member).
    pub fn contains(&self, lobby_id: &str) -> bool {
        self.lobbies.contains_key(lobby_id)
    }
}
