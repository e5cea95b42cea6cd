//! Wire protocol for the relay WebSocket endpoint.
//!
//! Every frame is a flat JSON object whose `action` field selects the
//! variant; remaining fields are the payload. The transport layer parses a
//! frame exactly once into [`ClientMessage`] and the relay matches on the
//! variant, so handler code never re-inspects raw JSON.

use actix::prelude::*;
use serde::{Deserialize, Serialize};

/// A letter grid: square matrix of single-letter strings.
pub type Grid = Vec<Vec<String>>;

/// Message client -> server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Bind this connection to a username (presence registration).
    UserOnline { username: String },
    /// Invite another user to a lobby.
    SendInvitation {
        from: String,
        to: String,
        lobby_id: String,
    },
    /// Accept a pending invitation for a lobby.
    AcceptInvitation {
        lobby_id: String,
        username: String,
        from: String,
    },
    /// Decline a pending invitation for a lobby.
    DeclineInvitation { lobby_id: String, username: String },
    /// Join a lobby (creating it if needed).
    JoinLobby { lobby_id: String, username: String },
    /// Start (or restart) the lobby's game session.
    StartGame { lobby_id: String },
    /// Enter the game screen; the sender receives a state snapshot.
    JoinGame { lobby_id: String, username: String },
    /// Client-reported timer value. Informational only; the server's
    /// countdown is authoritative and is never mutated by this.
    TimerSync { lobby_id: String, timer: u64 },
    /// Submit a found word to the shared ledger.
    WordFound { lobby_id: String, word: String },
    /// Explicitly end the lobby's game session.
    GameEnded { lobby_id: String },
    /// Leave a lobby.
    LeaveLobby { lobby_id: String, username: String },
}

/// Message server -> client.
#[derive(Message, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[rtype(result = "()")]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Lobby membership changed.
    UpdateLobby {
        lobby_id: String,
        players: Vec<String>,
    },
    /// A fresh game session started for the lobby.
    GameStarted {
        lobby_id: String,
        grid: Grid,
        timer: u64,
        found_words: Vec<String>,
    },
    /// Full session snapshot, sent to a single joining viewer.
    GameStateSync {
        lobby_id: String,
        grid: Option<Grid>,
        timer: u64,
        found_words: Vec<String>,
        is_running: bool,
    },
    /// Authoritative countdown value, broadcast once per tick.
    TimerSync { lobby_id: String, timer: u64 },
    /// A new word entered the shared ledger.
    WordFound {
        lobby_id: String,
        word: String,
        all_words: Vec<String>,
    },
    /// The session ended; carries the final ledger.
    GameEnded {
        lobby_id: String,
        found_words: Vec<String>,
    },
    /// An invitation was delivered to this connection.
    GameInvitation {
        from: String,
        lobby_id: String,
        /// Creation time, unix seconds.
        timestamp: u64,
    },
    /// The invitee accepted; sent to the inviter.
    InvitationAccepted { lobby_id: String, by: String },
    /// The invitation could not be delivered (target unreachable).
    InvitationFailed { reason: String, to: String },
    /// A pending invitation expired; sent to both parties.
    InvitationTimeout {
        lobby_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    /// Accept/decline referenced an invitation that no longer exists.
    InvitationError { reason: String },
    /// The invitee declined; sent to the inviter.
    FriendDeclined { lobby_id: String, by: String },
    /// Validation or not-found report, sent to the originating connection only.
    Error { reason: String },
}
