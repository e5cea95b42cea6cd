/// Invitation configuration constants.
///
/// Parameters for the lobby invitation handshake.
pub const INVITATION_TIMEOUT_SECS: u64 = 300; // Pending invitations expire after 5 minutes.

/// Length of generated lobby codes (see `POST /create-lobby`).
pub const LOBBY_CODE_LEN: usize = 6;
