// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the main relay server components, including:
//! - Application state management
//! - HTTP/WebSocket routing and the account/social API
//! - The relay actor (connection registry, lobby directory, invitation
//!   broker, game sessions, broadcast fan-out)
//! - Per-connection WebSocket session actors

pub mod api;
pub mod game;
pub mod invitation;
pub mod lobby;
pub mod messages;
pub mod registry;
pub mod relay;
pub mod router;
pub mod session;
pub mod state;
