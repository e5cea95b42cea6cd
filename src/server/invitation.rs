//! Invitation broker: short-lived join handshakes between two users.
//!
//! At most one invitation is pending per lobby id; a re-send overwrites the
//! prior one. An invitation leaves the broker on accept, decline, expiry, or
//! a superseding join. The expiry task's `SpawnHandle` is stored with the
//! invitation so teardown paths can cancel it before it fires.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use actix::SpawnHandle;

/// A pending invitation, scoped to one lobby.
pub struct PendingInvitation {
    pub from: String,
    pub to: String,
    /// Creation time, unix seconds. Echoed in the `gameInvitation` event.
    pub timestamp: u64,
    /// Scheduled expiry task. `None` only in unit tests, which exercise the
    /// broker outside an actor context.
    pub timeout: Option<SpawnHandle>,
}

/// Broker state: pending invitations keyed by lobby id.
#[derive(Default)]
pub struct InvitationBroker {
    pending: HashMap<String, PendingInvitation>,
}

impl InvitationBroker {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Store a new pending invitation, overwriting any prior one for the
    /// lobby. Returns the superseded invitation, if any, so the caller can
    /// cancel its expiry task.
    pub fn insert(
        &mut self,
        lobby_id: &str,
        from: String,
        to: String,
        timeout: Option<SpawnHandle>,
    ) -> Option<PendingInvitation> {
        let invitation = PendingInvitation {
            from,
            to,
            timestamp: unix_now(),
            timeout,
        };
        self.pending.insert(lobby_id.to_string(), invitation)
    }

    /// Resolve the pending invitation by acceptance. Succeeds only if one
    /// exists for `lobby_id` and its invitee is `by`; the entry is removed.
    pub fn accept(&mut self, lobby_id: &str, by: &str) -> Option<PendingInvitation> {
        self.take_for_invitee(lobby_id, by)
    }

    /// Resolve the pending invitation by decline. Same validity rule as
    /// [`accept`](Self::accept); invalid declines are a silent no-op.
    pub fn decline(&mut self, lobby_id: &str, by: &str) -> Option<PendingInvitation> {
        self.take_for_invitee(lobby_id, by)
    }

    /// Remove the pending invitation unconditionally (expiry, superseding
    /// join, lobby teardown). Returns `None` when accept/decline already won
    /// the race; expiry callbacks must treat that as "nothing to do".
    pub fn remove(&mut self, lobby_id: &str) -> Option<PendingInvitation> {
        self.pending.remove(lobby_id)
    }

    /// Peek at the pending invitation for a lobby, if any.
    pub fn get(&self, lobby_id: &str) -> Option<&PendingInvitation> {
        self.pending.get(lobby_id)
    }

    /// Take every pending invitation. Used on shutdown so their expiry
    /// tasks can be cancelled in one pass.
    pub fn drain(&mut self) -> Vec<PendingInvitation> {
        self.pending.drain().map(|(_, inv)| inv).collect()
    }

    fn take_for_invitee(&mut self, lobby_id: &str, by: &str) -> Option<PendingInvitation> {
        match self.pending.get(lobby_id) {
            Some(invitation) if invitation.to == by => self.pending.remove(lobby_id),
            _ => None,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
