use actix::prelude::*;

use crate::config::game::SESSION_DURATION_SECS;
use crate::game::grid::generate_grid;
use crate::server::game::{GameSession, TickOutcome};
use crate::server::invitation::InvitationBroker;
use crate::server::lobby::{LobbyChange, LobbyDirectory};
use crate::server::messages::{ClientMessage, ServerMessage};
use crate::server::relay::{Disconnect, ProcessClientMessage, RelayServer};
use crate::server::session::ClientSession;
use crate::store::Store;

#[test]
fn test_grid_generation_size_and_letters() {
    let grid = generate_grid(4);
    assert_eq!(grid.len(), 4);
    assert!(grid.iter().all(|row| row.len() == 4));
    for cell in grid.iter().flatten() {
        assert_eq!(cell.len(), 1);
        assert!(cell.chars().all(|c| c.is_ascii_uppercase()));
    }
}

#[test]
fn test_grid_generation_larger_than_dice_set() {
    // More cells than dice: the shuffled dice are reused cyclically.
    let grid = generate_grid(5);
    assert_eq!(grid.len(), 5);
    assert!(grid.iter().all(|row| row.len() == 5));
}

#[test]
fn test_lobby_exists_iff_nonempty() {
    let mut lobbies = LobbyDirectory::new();
    assert!(!lobbies.contains("L1"));

    lobbies.join("L1", "alice");
    assert!(lobbies.contains("L1"));

    lobbies.join("L1", "bob");
    // Idempotent add.
    let members = lobbies.join("L1", "bob");
    assert_eq!(members.len(), 2);

    assert_eq!(
        lobbies.leave("L1", "alice"),
        LobbyChange::Updated(vec!["bob".to_string()])
    );
    assert!(lobbies.contains("L1"));

    assert_eq!(lobbies.leave("L1", "bob"), LobbyChange::Destroyed);
    assert!(!lobbies.contains("L1"));
    assert!(lobbies.members("L1").is_empty());
}

#[test]
fn test_lobby_leave_is_noop_for_strangers() {
    let mut lobbies = LobbyDirectory::new();
    assert_eq!(lobbies.leave("ghost", "alice"), LobbyChange::Untouched);

    lobbies.join("L1", "alice");
    assert_eq!(lobbies.leave("L1", "bob"), LobbyChange::Untouched);
    assert!(lobbies.contains("L1"));
}

#[test]
fn test_game_start_resets_state() {
    let mut game = GameSession::default();
    game.submit_word("CAT");
    game.timer = 10;
    game.is_running = false;

    let grid = game.start(4);
    assert_eq!(grid.len(), 4);
    assert_eq!(game.timer, SESSION_DURATION_SECS);
    assert!(game.found_words.is_empty());
    assert!(game.is_running);
    assert!(game.started_at.is_some());

    // Restarting an already-running session resets it again.
    game.submit_word("DOG");
    game.start(4);
    assert!(game.found_words.is_empty());
    assert_eq!(game.timer, SESSION_DURATION_SECS);
}

#[test]
fn test_submit_word_dedup_preserves_order() {
    let mut game = GameSession::default();
    assert!(game.submit_word("CAT"));
    assert!(game.submit_word("DOG"));
    assert!(!game.submit_word("CAT"));
    assert_eq!(game.found_words, vec!["CAT", "DOG"]);
}

#[test]
fn test_countdown_monotonic_and_pinned_at_zero() {
    let mut game = GameSession::default();
    game.start(4);

    let mut prev = game.timer;
    for _ in 0..(SESSION_DURATION_SECS - 1) {
        match game.tick() {
            TickOutcome::Running(t) => {
                assert!(t < prev);
                prev = t;
            }
            other => panic!("unexpected outcome before the end: {:?}", other),
        }
    }
    // The final tick ends the session at exactly zero, and still carries
    // the zero so it is broadcast as a countdown value like every other
    // tick.
    assert_eq!(game.tick(), TickOutcome::Ended(0));
    assert_eq!(game.timer, 0);
    assert!(!game.is_running);

    // No tick acts after the session ended.
    assert_eq!(game.tick(), TickOutcome::Idle);
    assert_eq!(game.timer, 0);
}

#[test]
fn test_explicit_end_stops_ticking() {
    let mut game = GameSession::default();
    game.start(4);
    game.end();
    assert!(!game.is_running);
    assert_eq!(game.tick(), TickOutcome::Idle);
    assert_eq!(game.timer, SESSION_DURATION_SECS);
}

#[test]
fn test_invitation_accept_requires_matching_invitee() {
    let mut broker = InvitationBroker::new();
    broker.insert("L1", "alice".to_string(), "bob".to_string(), None);

    // Wrong invitee: invitation stays pending.
    assert!(broker.accept("L1", "mallory").is_none());
    assert!(broker.get("L1").is_some());

    let invitation = broker.accept("L1", "bob").expect("valid accept");
    assert_eq!(invitation.from, "alice");
    assert!(broker.get("L1").is_none());
}

#[test]
fn test_invitation_resend_overwrites() {
    let mut broker = InvitationBroker::new();
    assert!(
        broker
            .insert("L1", "alice".to_string(), "bob".to_string(), None)
            .is_none()
    );
    let superseded = broker
        .insert("L1", "carol".to_string(), "bob".to_string(), None)
        .expect("prior invitation returned");
    assert_eq!(superseded.from, "alice");
    assert_eq!(broker.get("L1").map(|i| i.from.as_str()), Some("carol"));
}

#[test]
fn test_invitation_resolution_after_expiry_is_noop() {
    let mut broker = InvitationBroker::new();
    broker.insert("L1", "alice".to_string(), "bob".to_string(), None);

    // Expiry wins the race.
    assert!(broker.remove("L1").is_some());

    // Late accept and decline find nothing and change nothing.
    assert!(broker.accept("L1", "bob").is_none());
    assert!(broker.decline("L1", "bob").is_none());
    assert!(broker.get("L1").is_none());
}

#[test]
fn test_client_message_action_tags() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"action":"userOnline","username":"alice"}"#).expect("parse");
    assert_eq!(
        msg,
        ClientMessage::UserOnline {
            username: "alice".to_string()
        }
    );

    let msg: ClientMessage =
        serde_json::from_str(r#"{"action":"wordFound","lobbyId":"L1","word":"CAT"}"#)
            .expect("parse");
    assert_eq!(
        msg,
        ClientMessage::WordFound {
            lobby_id: "L1".to_string(),
            word: "CAT".to_string()
        }
    );

    // Missing required fields are a parse error, not a panic.
    assert!(serde_json::from_str::<ClientMessage>(r#"{"action":"joinLobby"}"#).is_err());
    assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
}

#[test]
fn test_server_message_wire_shape() {
    let json = serde_json::to_value(ServerMessage::UpdateLobby {
        lobby_id: "L1".to_string(),
        players: vec!["alice".to_string(), "bob".to_string()],
    })
    .expect("serialize");
    assert_eq!(json["action"], "updateLobby");
    assert_eq!(json["lobbyId"], "L1");
    assert_eq!(json["players"][0], "alice");

    // Idle snapshot serializes the grid as null.
    let json = serde_json::to_value(ServerMessage::GameStateSync {
        lobby_id: "L1".to_string(),
        grid: None,
        timer: SESSION_DURATION_SECS,
        found_words: Vec::new(),
        is_running: false,
    })
    .expect("serialize");
    assert_eq!(json["action"], "gameStateSync");
    assert!(json["grid"].is_null());
    assert_eq!(json["isRunning"], false);

    // Timeout notices only carry the counterparty actually set.
    let json = serde_json::to_value(ServerMessage::InvitationTimeout {
        lobby_id: "L1".to_string(),
        from: None,
        to: Some("bob".to_string()),
    })
    .expect("serialize");
    assert_eq!(json["to"], "bob");
    assert!(json.get("from").is_none());
}

#[test]
fn test_store_register_and_login() {
    let store = Store::open_in_memory().expect("open");
    store.register("alice", "secret").expect("register");

    // Duplicate and short usernames are rejected.
    assert!(store.register("alice", "other").is_err());
    assert!(store.register("al", "pw").is_err());

    assert!(store.login("alice", "wrong").is_err());
    assert!(store.login("ghost", "secret").is_err());
    store.login("alice", "secret").expect("login");

    let users = store.all_users().expect("all users");
    assert!(users.iter().any(|u| u.username == "alice" && u.online));

    store.logout("alice").expect("logout");
    let users = store.all_users().expect("all users");
    assert!(users.iter().any(|u| u.username == "alice" && !u.online));
}

#[test]
fn test_store_friend_request_flow() {
    let store = Store::open_in_memory().expect("open");
    store.register("alice", "pw").expect("register");
    store.register("bob", "pw").expect("register");

    store.send_friend_request("alice", "bob").expect("send");
    // Duplicate requests and self-requests are rejected.
    assert!(store.send_friend_request("alice", "bob").is_err());
    assert!(store.send_friend_request("alice", "alice").is_err());

    store.set_online("bob", true).expect("presence");
    store.accept_friend_request("bob", "alice").expect("accept");

    let data = store.friends_data("alice").expect("friends data");
    assert_eq!(data.friends.len(), 1);
    assert_eq!(data.friends[0].username, "bob");
    assert!(data.friends[0].online);
    assert!(data.friend_requests.sent.is_empty());

    // Already friends now.
    assert!(store.send_friend_request("alice", "bob").is_err());

    store.remove_friend("alice", "bob").expect("remove");
    let data = store.friends_data("bob").expect("friends data");
    assert!(data.friends.is_empty());
}

#[test]
fn test_store_decline_and_cancel() {
    let store = Store::open_in_memory().expect("open");
    store.register("alice", "pw").expect("register");
    store.register("bob", "pw").expect("register");

    store.send_friend_request("alice", "bob").expect("send");
    store.decline_friend_request("bob", "alice").expect("decline");
    let data = store.friends_data("bob").expect("friends data");
    assert!(data.friends.is_empty());
    assert!(data.friend_requests.received.is_empty());

    store.send_friend_request("alice", "bob").expect("send again");
    store.cancel_friend_request("alice", "bob").expect("cancel");
    let data = store.friends_data("alice").expect("friends data");
    assert!(data.friend_requests.sent.is_empty());
}

// ---------------------------------------------------------------------------
// Relay actor tests: fan-out and the full session scenario.

/// Test sink implementing the session's message handler.
#[derive(Default)]
struct Collector {
    messages: Vec<ServerMessage>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<ServerMessage> for Collector {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _: &mut Context<Self>) {
        self.messages.push(msg);
    }
}

#[derive(Message)]
#[rtype(result = "Vec<ServerMessage>")]
struct Drain;

impl Handler<Drain> for Collector {
    type Result = MessageResult<Drain>;

    fn handle(&mut self, _: Drain, _: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.messages))
    }
}

fn test_relay() -> Addr<RelayServer> {
    let store = Store::open_in_memory().expect("in-memory store");
    RelayServer::new(store).start()
}

async fn send(relay: &Addr<RelayServer>, addr: Recipient<ServerMessage>, msg: ClientMessage) {
    relay
        .send(ProcessClientMessage { msg, addr })
        .await
        .expect("relay alive");
}

#[actix_rt::test]
async fn test_broadcast_skips_unreachable_members() {
    let relay = test_relay();
    let alice = Collector::default().start();
    let alice_rcpt: Recipient<ServerMessage> = alice.clone().recipient();

    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::UserOnline {
            username: "alice".to_string(),
        },
    )
    .await;
    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::JoinLobby {
            lobby_id: "L1".to_string(),
            username: "alice".to_string(),
        },
    )
    .await;
    // Bob joins the lobby but never identified, so he has no channel.
    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::JoinLobby {
            lobby_id: "L1".to_string(),
            username: "bob".to_string(),
        },
    )
    .await;

    let messages = alice.send(Drain).await.expect("collector alive");
    let updates: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::UpdateLobby { players, .. } => Some(players.clone()),
            _ => None,
        })
        .collect();
    // Alice saw both membership updates; nothing errored on bob's absence.
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].len(), 2);
}

#[actix_rt::test]
async fn test_full_session_scenario() {
    let relay = test_relay();
    let alice = Collector::default().start();
    let bob = Collector::default().start();
    let alice_rcpt: Recipient<ServerMessage> = alice.clone().recipient();
    let bob_rcpt: Recipient<ServerMessage> = bob.clone().recipient();

    for (name, rcpt) in [("alice", &alice_rcpt), ("bob", &bob_rcpt)] {
        send(
            &relay,
            rcpt.clone(),
            ClientMessage::UserOnline {
                username: name.to_string(),
            },
        )
        .await;
        send(
            &relay,
            rcpt.clone(),
            ClientMessage::JoinLobby {
                lobby_id: "L1".to_string(),
                username: name.to_string(),
            },
        )
        .await;
    }

    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::StartGame {
            lobby_id: "L1".to_string(),
        },
    )
    .await;
    // Same word twice: one ledger entry, one broadcast.
    for _ in 0..2 {
        send(
            &relay,
            bob_rcpt.clone(),
            ClientMessage::WordFound {
                lobby_id: "L1".to_string(),
                word: "CAT".to_string(),
            },
        )
        .await;
    }
    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::GameEnded {
            lobby_id: "L1".to_string(),
        },
    )
    .await;

    for collector in [alice, bob] {
        let messages = collector.send(Drain).await.expect("collector alive");

        let started: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::GameStarted { grid, timer, .. } => Some((grid.clone(), *timer)),
                _ => None,
            })
            .collect();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].0.len(), 4);
        assert_eq!(started[0].1, SESSION_DURATION_SECS);

        let words: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::WordFound { all_words, .. } => Some(all_words.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0], vec!["CAT".to_string()]);

        let ended: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::GameEnded { found_words, .. } => Some(found_words.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0], vec!["CAT".to_string()]);
    }
}

#[actix_rt::test]
async fn test_invitation_requires_reachable_target() {
    let relay = test_relay();
    let alice = Collector::default().start();
    let alice_rcpt: Recipient<ServerMessage> = alice.clone().recipient();

    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::UserOnline {
            username: "alice".to_string(),
        },
    )
    .await;
    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::SendInvitation {
            from: "alice".to_string(),
            to: "bob".to_string(),
            lobby_id: "L1".to_string(),
        },
    )
    .await;

    let messages = alice.send(Drain).await.expect("collector alive");
    assert!(messages.iter().any(|m| matches!(
        m,
        ServerMessage::InvitationFailed { to, .. } if to == "bob"
    )));
}

#[actix_rt::test]
async fn test_invitation_accept_joins_both_parties() {
    let relay = test_relay();
    let alice = Collector::default().start();
    let bob = Collector::default().start();
    let alice_rcpt: Recipient<ServerMessage> = alice.clone().recipient();
    let bob_rcpt: Recipient<ServerMessage> = bob.clone().recipient();

    for (name, rcpt) in [("alice", &alice_rcpt), ("bob", &bob_rcpt)] {
        send(
            &relay,
            rcpt.clone(),
            ClientMessage::UserOnline {
                username: name.to_string(),
            },
        )
        .await;
    }

    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::SendInvitation {
            from: "alice".to_string(),
            to: "bob".to_string(),
            lobby_id: "L1".to_string(),
        },
    )
    .await;

    let bob_messages = bob.send(Drain).await.expect("collector alive");
    assert!(bob_messages.iter().any(|m| matches!(
        m,
        ServerMessage::GameInvitation { from, .. } if from == "alice"
    )));

    send(
        &relay,
        bob_rcpt.clone(),
        ClientMessage::AcceptInvitation {
            lobby_id: "L1".to_string(),
            username: "bob".to_string(),
            from: "alice".to_string(),
        },
    )
    .await;

    let alice_messages = alice.send(Drain).await.expect("collector alive");
    assert!(alice_messages.iter().any(|m| matches!(
        m,
        ServerMessage::InvitationAccepted { by, .. } if by == "bob"
    )));
    let members = alice_messages.iter().find_map(|m| match m {
        ServerMessage::UpdateLobby { players, .. } => Some(players.clone()),
        _ => None,
    });
    let mut members = members.expect("membership broadcast");
    members.sort();
    assert_eq!(members, vec!["alice".to_string(), "bob".to_string()]);

    // A second accept is invalid: the invitation is gone.
    send(
        &relay,
        bob_rcpt.clone(),
        ClientMessage::AcceptInvitation {
            lobby_id: "L1".to_string(),
            username: "bob".to_string(),
            from: "alice".to_string(),
        },
    )
    .await;
    let bob_messages = bob.send(Drain).await.expect("collector alive");
    assert!(bob_messages
        .iter()
        .any(|m| matches!(m, ServerMessage::InvitationError { .. })));
}

#[actix_rt::test]
async fn test_session_records_lobby_from_accept_event() {
    let relay = test_relay();
    let mut session = ClientSession {
        username: Some("alice".to_string()),
        lobby_id: None,
        relay_addr: relay,
    };

    // Delivering the accept notice binds the inviter's session to the lobby
    // the relay just auto-joined it into.
    session.note_outbound(&ServerMessage::InvitationAccepted {
        lobby_id: "L1".to_string(),
        by: "bob".to_string(),
    });
    assert_eq!(session.lobby_id.as_deref(), Some("L1"));

    // Other outbound events leave the binding untouched.
    session.note_outbound(&ServerMessage::TimerSync {
        lobby_id: "L2".to_string(),
        timer: 5,
    });
    assert_eq!(session.lobby_id.as_deref(), Some("L1"));
}

#[actix_rt::test]
async fn test_inviter_disconnect_after_accept_reconciles_membership() {
    let relay = test_relay();
    let alice = Collector::default().start();
    let bob = Collector::default().start();
    let alice_rcpt: Recipient<ServerMessage> = alice.clone().recipient();
    let bob_rcpt: Recipient<ServerMessage> = bob.clone().recipient();

    for (name, rcpt) in [("alice", &alice_rcpt), ("bob", &bob_rcpt)] {
        send(
            &relay,
            rcpt.clone(),
            ClientMessage::UserOnline {
                username: name.to_string(),
            },
        )
        .await;
    }

    // Alice invites and bob accepts; alice never sends joinLobby herself.
    send(
        &relay,
        alice_rcpt.clone(),
        ClientMessage::SendInvitation {
            from: "alice".to_string(),
            to: "bob".to_string(),
            lobby_id: "L1".to_string(),
        },
    )
    .await;
    send(
        &relay,
        bob_rcpt.clone(),
        ClientMessage::AcceptInvitation {
            lobby_id: "L1".to_string(),
            username: "bob".to_string(),
            from: "alice".to_string(),
        },
    )
    .await;

    // Alice's session learned the lobby from the accept notice, so her
    // disconnect carries it and her membership is reclaimed.
    relay
        .send(Disconnect {
            username: Some("alice".to_string()),
            lobby_id: Some("L1".to_string()),
        })
        .await
        .expect("relay alive");

    let messages = bob.send(Drain).await.expect("collector alive");
    let last_update = messages
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::UpdateLobby { players, .. } => Some(players.clone()),
            _ => None,
        })
        .expect("membership broadcast");
    assert_eq!(last_update, vec!["bob".to_string()]);
}

#[actix_rt::test]
async fn test_disconnect_reconciles_membership() {
    let relay = test_relay();
    let alice = Collector::default().start();
    let bob = Collector::default().start();
    let alice_rcpt: Recipient<ServerMessage> = alice.clone().recipient();
    let bob_rcpt: Recipient<ServerMessage> = bob.clone().recipient();

    for (name, rcpt) in [("alice", &alice_rcpt), ("bob", &bob_rcpt)] {
        send(
            &relay,
            rcpt.clone(),
            ClientMessage::UserOnline {
                username: name.to_string(),
            },
        )
        .await;
        send(
            &relay,
            rcpt.clone(),
            ClientMessage::JoinLobby {
                lobby_id: "L1".to_string(),
                username: name.to_string(),
            },
        )
        .await;
    }

    relay
        .send(Disconnect {
            username: Some("bob".to_string()),
            lobby_id: Some("L1".to_string()),
        })
        .await
        .expect("relay alive");

    let messages = alice.send(Drain).await.expect("collector alive");
    let last_update = messages
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::UpdateLobby { players, .. } => Some(players.clone()),
            _ => None,
        })
        .expect("membership broadcast");
    assert_eq!(last_update, vec!["alice".to_string()]);
}
