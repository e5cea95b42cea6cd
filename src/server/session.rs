//! WebSocket session actor for one relay client.
//!
//! Parses each inbound text frame into a [`ClientMessage`] exactly once and
//! forwards it to the relay actor, tracking the identity and current lobby
//! this connection has claimed so the relay can reconcile membership when
//! the transport closes. Serializes relay events back out to the client.

use actix::prelude::*;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use log::debug;

use crate::server::messages::{ClientMessage, ServerMessage};
use crate::server::relay::{Disconnect, ProcessClientMessage, RelayServer};

/// One client's connection to the relay.
pub struct ClientSession {
    /// Identity claimed via `userOnline`, if any.
    pub username: Option<String>,
    /// Lobby this connection last joined, for disconnect reconciliation.
    pub lobby_id: Option<String>,
    pub relay_addr: Addr<RelayServer>,
}

impl ClientSession {
    fn new(relay_addr: Addr<RelayServer>) -> Self {
        Self {
            username: None,
            lobby_id: None,
            relay_addr,
        }
    }

    /// The relay can also move this connection into a lobby it never asked
    /// to join: accepting an invitation auto-joins the inviter. Record the
    /// lobby when that event is delivered, so the disconnect path still
    /// reconciles the inviter's membership.
    pub(crate) fn note_outbound(&mut self, msg: &ServerMessage) {
        if let ServerMessage::InvitationAccepted { lobby_id, .. } = msg {
            self.lobby_id = Some(lobby_id.clone());
        }
    }

    /// Mirror identity and lobby claims onto the session before forwarding,
    /// so the disconnect path knows what to clean up.
    fn track(&mut self, msg: &ClientMessage) {
        match msg {
            ClientMessage::UserOnline { username } => {
                self.username = Some(username.clone());
            }
            ClientMessage::JoinLobby { lobby_id, .. }
            | ClientMessage::JoinGame { lobby_id, .. }
            | ClientMessage::AcceptInvitation { lobby_id, .. } => {
                self.lobby_id = Some(lobby_id.clone());
            }
            _ => {}
        }
    }
}

impl Actor for ClientSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        debug!("[Session] New WebSocket connection");
    }

    /// Called when the session stops. Hands the claimed identity and lobby
    /// to the relay for reconciliation.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.relay_addr.do_send(Disconnect {
            username: self.username.take(),
            lobby_id: self.lobby_id.take(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ClientSession {
    /// Handles incoming WebSocket frames from the client.
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        // Malformed frames are dropped with a diagnostic;
                        // they never crash the connection.
                        debug!("[Session] Dropping malformed frame: {}", e);
                        return;
                    }
                };
                self.track(&msg);
                self.relay_addr.do_send(ProcessClientMessage {
                    msg,
                    addr: ctx.address().recipient(),
                });
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(_)) => ctx.stop(),
            _ => (),
        }
    }
}

impl Handler<ServerMessage> for ClientSession {
    type Result = ();

    /// Relay event for this client: serialize and send.
    fn handle(&mut self, msg: ServerMessage, ctx: &mut Self::Context) {
        self.note_outbound(&msg);
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                debug!("[Session] Failed to serialize server message: {}", e);
            }
        }
    }
}

/// WebSocket endpoint for the relay.
///
/// Connections carry no query parameters; the client identifies itself with
/// a `userOnline` frame after the upgrade.
pub async fn ws_relay(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<crate::server::state::AppState>,
) -> Result<HttpResponse, Error> {
    ws::start(ClientSession::new(data.relay_addr.clone()), &req, stream)
}
