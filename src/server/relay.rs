//! Relay server actor.
//!
//! Owns all shared relay state: the connection registry, the lobby
//! directory, the invitation broker, and one game session per lobby. Every
//! mutation flows through this actor's mailbox, so operations on a given
//! lobby are serialized while different connections still interleave freely.
//! Countdown tickers and invitation expiries are actor-context tasks
//! (`run_interval` / `run_later`) whose handles are stored alongside the
//! state they advance and cancelled on every teardown path.

use actix::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::game::{GRID_SIZE, SESSION_DURATION_SECS, TICK_INTERVAL_SECS};
use crate::config::invitation::INVITATION_TIMEOUT_SECS;
use crate::server::game::{GameSession, TickOutcome};
use crate::server::invitation::InvitationBroker;
use crate::server::lobby::{LobbyChange, LobbyDirectory};
use crate::server::messages::{ClientMessage, ServerMessage};
use crate::server::registry::ConnectionRegistry;
use crate::store::Store;

/// Message: a parsed client frame, forwarded by a WebSocket session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ProcessClientMessage {
    pub msg: ClientMessage,
    /// Channel back to the originating session.
    pub addr: Recipient<ServerMessage>,
}

/// Message: a WebSocket session closed.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub username: Option<String>,
    pub lobby_id: Option<String>,
}

/// Main relay server actor.
pub struct RelayServer {
    /// Username -> live session channel.
    registry: ConnectionRegistry,
    /// Lobby id -> member set.
    lobbies: LobbyDirectory,
    /// Lobby id -> pending invitation.
    invitations: InvitationBroker,
    /// Lobby id -> authoritative game session.
    games: HashMap<String, GameSession>,
    /// Account store; receives fire-and-forget presence updates.
    store: Store,
}

impl RelayServer {
    pub fn new(store: Store) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            lobbies: LobbyDirectory::new(),
            invitations: InvitationBroker::new(),
            games: HashMap::new(),
            store,
        }
    }

    /// Deliver an event to every reachable member of a lobby.
    ///
    /// Members with no registered channel are silently skipped; stale
    /// membership is expected while a disconnect is still being reconciled.
    /// Best-effort, at-most-once per live channel per call.
    fn broadcast(&self, lobby_id: &str, msg: &ServerMessage) {
        let members = self.lobbies.members(lobby_id);
        let mut sent = 0;
        for member in &members {
            if let Some(addr) = self.registry.resolve(member) {
                addr.do_send(msg.clone());
                sent += 1;
            }
        }
        debug!(
            "[Relay] Broadcast to lobby {}: {}/{} players",
            lobby_id,
            sent,
            members.len()
        );
    }

    /// Persist a presence change without letting a storage failure interrupt
    /// message processing.
    fn persist_presence(&self, username: &str, online: bool) {
        if let Err(e) = self.store.set_online(username, online) {
            warn!("[Relay] Failed to persist presence for {}: {}", username, e);
        }
    }

    fn handle_user_online(&mut self, username: String, addr: Recipient<ServerMessage>) {
        // Reconnects silently replace the prior mapping; the superseded
        // session stops on its own when its transport closes.
        self.registry.identify(&username, addr);
        self.persist_presence(&username, true);
        info!("[Relay] User online: {}", username);
    }

    fn handle_send_invitation(
        &mut self,
        from: String,
        to: String,
        lobby_id: String,
        addr: Recipient<ServerMessage>,
        ctx: &mut Context<Self>,
    ) {
        let Some(target) = self.registry.resolve(&to) else {
            addr.do_send(ServerMessage::InvitationFailed {
                reason: "User is offline".to_string(),
                to,
            });
            return;
        };
        let target = target.clone();

        let expiry_lobby = lobby_id.clone();
        let timeout = ctx.run_later(Duration::from_secs(INVITATION_TIMEOUT_SECS), move |act, _| {
            act.expire_invitation(&expiry_lobby);
        });

        // A re-send for the same lobby overwrites the prior invitation
        // without notifying its parties; only its expiry task is cancelled.
        if let Some(prior) = self
            .invitations
            .insert(&lobby_id, from.clone(), to.clone(), Some(timeout))
        {
            if let Some(handle) = prior.timeout {
                ctx.cancel_future(handle);
            }
        }

        let timestamp = self
            .invitations
            .get(&lobby_id)
            .map(|inv| inv.timestamp)
            .unwrap_or_default();
        target.do_send(ServerMessage::GameInvitation {
            from: from.clone(),
            lobby_id: lobby_id.clone(),
            timestamp,
        });
        info!(
            "[Relay] Invitation sent from {} to {} for lobby {}",
            from, to, lobby_id
        );
    }

    fn handle_accept_invitation(
        &mut self,
        lobby_id: String,
        username: String,
        addr: Recipient<ServerMessage>,
        ctx: &mut Context<Self>,
    ) {
        let Some(invitation) = self.invitations.accept(&lobby_id, &username) else {
            addr.do_send(ServerMessage::InvitationError {
                reason: "Invalid or expired invitation".to_string(),
            });
            return;
        };
        if let Some(handle) = invitation.timeout {
            ctx.cancel_future(handle);
        }

        if let Some(inviter) = self.registry.resolve(&invitation.from) {
            inviter.do_send(ServerMessage::InvitationAccepted {
                lobby_id: lobby_id.clone(),
                by: username.clone(),
            });
        }

        // Auto-join both parties; joins are idempotent.
        self.lobbies.join(&lobby_id, &username);
        let players = self.lobbies.join(&lobby_id, &invitation.from);
        self.broadcast(
            &lobby_id,
            &ServerMessage::UpdateLobby {
                lobby_id: lobby_id.clone(),
                players,
            },
        );
        info!("[Relay] {} accepted invitation to lobby {}", username, lobby_id);
    }

    fn handle_decline_invitation(
        &mut self,
        lobby_id: String,
        username: String,
        ctx: &mut Context<Self>,
    ) {
        // Invalid declines (no pending invitation, or wrong invitee) are a
        // silent no-op.
        let Some(invitation) = self.invitations.decline(&lobby_id, &username) else {
            return;
        };
        if let Some(handle) = invitation.timeout {
            ctx.cancel_future(handle);
        }
        if let Some(inviter) = self.registry.resolve(&invitation.from) {
            inviter.do_send(ServerMessage::FriendDeclined {
                lobby_id: lobby_id.clone(),
                by: username.clone(),
            });
        }
        info!("[Relay] {} declined invitation to lobby {}", username, lobby_id);
    }

    fn handle_join_lobby(&mut self, lobby_id: String, username: String, ctx: &mut Context<Self>) {
        let players = self.lobbies.join(&lobby_id, &username);
        self.broadcast(
            &lobby_id,
            &ServerMessage::UpdateLobby {
                lobby_id: lobby_id.clone(),
                players,
            },
        );
        // A completed join supersedes any invitation still pending for the
        // lobby.
        if let Some(invitation) = self.invitations.remove(&lobby_id) {
            if let Some(handle) = invitation.timeout {
                ctx.cancel_future(handle);
            }
        }
        debug!("[Relay] {} joined lobby {}", username, lobby_id);
    }

    fn handle_start_game(
        &mut self,
        lobby_id: String,
        addr: Recipient<ServerMessage>,
        ctx: &mut Context<Self>,
    ) {
        if !self.lobbies.contains(&lobby_id) {
            addr.do_send(ServerMessage::Error {
                reason: "Unknown lobby".to_string(),
            });
            return;
        }

        let game = self.games.entry(lobby_id.clone()).or_default();
        // Restart: replace any running ticker before arming a new one.
        if let Some(handle) = game.ticker.take() {
            ctx.cancel_future(handle);
        }
        let grid = game.start(GRID_SIZE);

        let tick_lobby = lobby_id.clone();
        let handle = ctx.run_interval(Duration::from_secs(TICK_INTERVAL_SECS), move |act, ctx| {
            act.tick_lobby(&tick_lobby, ctx);
        });
        if let Some(game) = self.games.get_mut(&lobby_id) {
            game.ticker = Some(handle);
        }

        self.broadcast(
            &lobby_id,
            &ServerMessage::GameStarted {
                lobby_id: lobby_id.clone(),
                grid,
                timer: SESSION_DURATION_SECS,
                found_words: Vec::new(),
            },
        );
        info!("[Relay] Game started for lobby {}", lobby_id);
    }

    fn handle_join_game(
        &mut self,
        lobby_id: String,
        username: String,
        addr: Recipient<ServerMessage>,
    ) {
        // Sessions are created lazily on first reference; before the first
        // start this yields the idle shape (no grid, full timer).
        let game = self.games.entry(lobby_id.clone()).or_default();
        addr.do_send(ServerMessage::GameStateSync {
            lobby_id: lobby_id.clone(),
            grid: game.grid.clone(),
            timer: game.timer,
            found_words: game.found_words.clone(),
            is_running: game.is_running,
        });
        debug!("[Relay] {} joined game room for lobby {}", username, lobby_id);
    }

    fn handle_word_found(&mut self, lobby_id: String, word: String) {
        let game = self.games.entry(lobby_id.clone()).or_default();
        // Duplicate submissions leave the ledger untouched and broadcast
        // nothing.
        if !game.submit_word(&word) {
            return;
        }
        let all_words = game.found_words.clone();
        debug!("[Relay] Word found in lobby {}: {}", lobby_id, word);
        self.broadcast(
            &lobby_id,
            &ServerMessage::WordFound {
                lobby_id: lobby_id.clone(),
                word,
                all_words,
            },
        );
    }

    /// One authoritative countdown step for a lobby's session.
    fn tick_lobby(&mut self, lobby_id: &str, ctx: &mut Context<Self>) {
        let Some(game) = self.games.get_mut(lobby_id) else {
            // Teardown cancels tickers before removing sessions, so a tick
            // against a missing session means the handle leaked; drop it.
            warn!("[Relay] Tick for unknown session {}", lobby_id);
            return;
        };
        match game.tick() {
            TickOutcome::Running(timer) => {
                self.broadcast(
                    lobby_id,
                    &ServerMessage::TimerSync {
                        lobby_id: lobby_id.to_string(),
                        timer,
                    },
                );
            }
            TickOutcome::Ended(timer) => {
                // The zero is still a countdown value; broadcast it before
                // the ended transition.
                self.broadcast(
                    lobby_id,
                    &ServerMessage::TimerSync {
                        lobby_id: lobby_id.to_string(),
                        timer,
                    },
                );
                self.end_game(lobby_id, ctx);
            }
            TickOutcome::Idle => {}
        }
    }

    /// Transition a session to ended: stop its ticker and broadcast the
    /// final ledger. No-op when the lobby has no session.
    fn end_game(&mut self, lobby_id: &str, ctx: &mut Context<Self>) {
        let Some(game) = self.games.get_mut(lobby_id) else {
            return;
        };
        game.end();
        if let Some(handle) = game.ticker.take() {
            ctx.cancel_future(handle);
        }
        let found_words = game.found_words.clone();
        self.broadcast(
            lobby_id,
            &ServerMessage::GameEnded {
                lobby_id: lobby_id.to_string(),
                found_words,
            },
        );
        info!("[Relay] Game ended for lobby {}", lobby_id);
    }

    fn handle_leave_lobby(&mut self, lobby_id: &str, username: &str, ctx: &mut Context<Self>) {
        match self.lobbies.leave(lobby_id, username) {
            LobbyChange::Updated(players) => {
                self.broadcast(
                    lobby_id,
                    &ServerMessage::UpdateLobby {
                        lobby_id: lobby_id.to_string(),
                        players,
                    },
                );
                debug!("[Relay] {} left lobby {}", username, lobby_id);
            }
            LobbyChange::Destroyed => {
                self.teardown_lobby(lobby_id, ctx);
                debug!("[Relay] {} left lobby {}", username, lobby_id);
            }
            LobbyChange::Untouched => {
                // Disconnects race explicit leaves; nothing to do.
            }
        }
    }

    /// Destroy everything keyed by a lobby id, cancelling its scheduled
    /// tasks first so nothing fires against deleted state.
    fn teardown_lobby(&mut self, lobby_id: &str, ctx: &mut Context<Self>) {
        if let Some(mut game) = self.games.remove(lobby_id) {
            if let Some(handle) = game.ticker.take() {
                ctx.cancel_future(handle);
            }
        }
        if let Some(invitation) = self.invitations.remove(lobby_id) {
            if let Some(handle) = invitation.timeout {
                ctx.cancel_future(handle);
            }
        }
        info!("[Relay] Lobby {} cleaned up (no players left)", lobby_id);
    }

    /// Invitation expiry task body: only acts if the invitation is still
    /// pending (accept/decline/re-send cancel the task, but the state check
    /// stays authoritative).
    fn expire_invitation(&mut self, lobby_id: &str) {
        let Some(invitation) = self.invitations.remove(lobby_id) else {
            return;
        };
        if let Some(inviter) = self.registry.resolve(&invitation.from) {
            inviter.do_send(ServerMessage::InvitationTimeout {
                lobby_id: lobby_id.to_string(),
                from: None,
                to: Some(invitation.to.clone()),
            });
        }
        if let Some(invitee) = self.registry.resolve(&invitation.to) {
            invitee.do_send(ServerMessage::InvitationTimeout {
                lobby_id: lobby_id.to_string(),
                from: Some(invitation.from.clone()),
                to: None,
            });
        }
        info!(
            "[Relay] Invitation from {} to {} for lobby {} timed out",
            invitation.from, invitation.to, lobby_id
        );
    }
}

impl Actor for RelayServer {
    type Context = Context<Self>;

    /// Graceful shutdown: cancel every outstanding ticker and invitation
    /// expiry so no periodic work outlives the actor.
    fn stopped(&mut self, ctx: &mut Self::Context) {
        for game in self.games.values_mut() {
            if let Some(handle) = game.ticker.take() {
                ctx.cancel_future(handle);
            }
        }
        for invitation in self.invitations.drain() {
            if let Some(handle) = invitation.timeout {
                ctx.cancel_future(handle);
            }
        }
        info!("[Relay] Relay server stopped");
    }
}

impl Handler<ProcessClientMessage> for RelayServer {
    type Result = ();

    /// Dispatches a parsed client frame to the handler for its variant.
    fn handle(&mut self, msg: ProcessClientMessage, ctx: &mut Self::Context) -> Self::Result {
        let ProcessClientMessage { msg, addr } = msg;
        match msg {
            ClientMessage::UserOnline { username } => self.handle_user_online(username, addr),
            ClientMessage::SendInvitation { from, to, lobby_id } => {
                self.handle_send_invitation(from, to, lobby_id, addr, ctx)
            }
            ClientMessage::AcceptInvitation {
                lobby_id, username, ..
            } => self.handle_accept_invitation(lobby_id, username, addr, ctx),
            ClientMessage::DeclineInvitation { lobby_id, username } => {
                self.handle_decline_invitation(lobby_id, username, ctx)
            }
            ClientMessage::JoinLobby { lobby_id, username } => {
                self.handle_join_lobby(lobby_id, username, ctx)
            }
            ClientMessage::StartGame { lobby_id } => self.handle_start_game(lobby_id, addr, ctx),
            ClientMessage::JoinGame { lobby_id, username } => {
                self.handle_join_game(lobby_id, username, addr)
            }
            ClientMessage::TimerSync { lobby_id, timer } => {
                // Informational only; the server countdown stays
                // authoritative.
                debug!("[Relay] Client timer sync for lobby {}: {}s", lobby_id, timer);
            }
            ClientMessage::WordFound { lobby_id, word } => self.handle_word_found(lobby_id, word),
            ClientMessage::GameEnded { lobby_id } => self.end_game(&lobby_id, ctx),
            ClientMessage::LeaveLobby { lobby_id, username } => {
                self.handle_leave_lobby(&lobby_id, &username, ctx)
            }
        }
    }
}

impl Handler<Disconnect> for RelayServer {
    type Result = ();

    /// Handles a session closing: drop the registry mapping, persist the
    /// offline flag, and leave whichever lobby the session was in.
    fn handle(&mut self, msg: Disconnect, ctx: &mut Self::Context) -> Self::Result {
        if let Some(username) = &msg.username {
            self.registry.forget(username);
            self.persist_presence(username, false);
            info!("[Relay] User offline: {}", username);
        }
        if let (Some(username), Some(lobby_id)) = (&msg.username, &msg.lobby_id) {
            self.handle_leave_lobby(lobby_id, username, ctx);
        }
    }
}
