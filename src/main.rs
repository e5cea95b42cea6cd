//! Main entry point for the relay server.
//!
//! Opens the account database, starts the relay actor, and launches the
//! HTTP server with the WebSocket endpoint and the account/social API.

use actix::Actor;
use actix_web::{App, HttpServer, web};
use log::{error, info, warn};

use server::relay::RelayServer;
use store::Store;

pub mod config;
mod game;
mod server;
mod store;

#[cfg(test)]
mod tests;

const BIND_ADDR: (&str, u16) = ("127.0.0.1", 5000);
const DB_PATH: &str = "boggle.db";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::init();

    // Opening the account database is the only fatal startup error.
    let store = match Store::open(DB_PATH) {
        Ok(store) => store,
        Err(e) => {
            error!("Database connection failed: {}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };
    info!("Database connected successfully");

    // Start the relay actor (registry, lobbies, invitations, game sessions).
    let relay_addr = RelayServer::new(store.clone()).start();

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(relay_addr, store.clone()));

    info!("Server running on http://{}:{}", BIND_ADDR.0, BIND_ADDR.1);

    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(server::router::config)
    })
    .bind(BIND_ADDR)?
    .run()
    .await?;

    // Graceful shutdown: nobody is online once the server has stopped.
    if let Err(e) = store.set_all_offline() {
        warn!("Failed to clear presence flags on shutdown: {}", e);
    }
    info!("Server shut down successfully");
    Ok(())
}
