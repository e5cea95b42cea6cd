//! HTTP and WebSocket routing configuration.
//!
//! The `/ws` endpoint upgrades to the real-time relay; everything else is
//! the JSON account/social API.

use actix_web::web;

use crate::server::api;
use crate::server::session::ws_relay;

/// Configure the application's HTTP/WebSocket routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").to(ws_relay))
        .route("/test", web::get().to(api::test))
        .route("/all-users", web::get().to(api::all_users))
        .route("/register", web::post().to(api::register))
        .route("/login", web::post().to(api::login))
        .route("/logout", web::post().to(api::logout))
        .route(
            "/send-friend-request",
            web::post().to(api::send_friend_request),
        )
        .route(
            "/accept-friend-request",
            web::post().to(api::accept_friend_request),
        )
        .route(
            "/decline-friend-request",
            web::post().to(api::decline_friend_request),
        )
        .route(
            "/cancel-friend-request",
            web::post().to(api::cancel_friend_request),
        )
        .route("/remove-friend", web::post().to(api::remove_friend))
        .route(
            "/friends-data/{username}",
            web::get().to(api::friends_data),
        )
        .route("/create-lobby", web::post().to(api::create_lobby));
}
