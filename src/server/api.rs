//! HTTP API for accounts and the social graph.
//!
//! Thin JSON handlers over the account store: registration, login/logout,
//! friend requests, and lobby-code generation. Responses follow the
//! `{"success": true, ...}` / `{"error": "..."}` convention.

use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::{HttpResponse, web};
use log::error;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::invitation::LOBBY_CODE_LEN;
use crate::server::state::AppState;
use crate::store::StoreError;

/// Map a store error to its HTTP response.
fn store_error_response(err: StoreError) -> HttpResponse {
    match err {
        StoreError::Invalid(message) | StoreError::Conflict(message) => {
            HttpResponse::BadRequest().json(json!({ "error": message }))
        }
        StoreError::NotFound(message) => {
            HttpResponse::NotFound().json(json!({ "error": message }))
        }
        StoreError::Db(e) => {
            error!("[Api] Database error: {}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Internal server error" }))
        }
    }
}

fn success(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "message": message }))
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    pub username: String,
    pub target_username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterRequest {
    pub username: String,
    pub requester_username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub username: String,
    pub friend_username: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub username: Option<String>,
}

/// GET /test: liveness probe.
pub async fn test() -> HttpResponse {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Server is working!",
        "timestamp": timestamp,
    }))
}

/// GET /all-users: every user with presence flag (debugging).
pub async fn all_users(data: web::Data<AppState>) -> HttpResponse {
    match data.store.all_users() {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => store_error_response(e),
    }
}

/// POST /register
pub async fn register(data: web::Data<AppState>, body: web::Json<Credentials>) -> HttpResponse {
    match data.store.register(&body.username, &body.password) {
        Ok(()) => success("User registered successfully"),
        Err(e) => store_error_response(e),
    }
}

/// POST /login
pub async fn login(data: web::Data<AppState>, body: web::Json<Credentials>) -> HttpResponse {
    match data.store.login(&body.username, &body.password) {
        Ok(()) => success("Login successful"),
        Err(e) => store_error_response(e),
    }
}

/// POST /logout: always succeeds; the username is optional.
pub async fn logout(data: web::Data<AppState>, body: web::Json<LogoutRequest>) -> HttpResponse {
    if let Some(username) = &body.username {
        if let Err(e) = data.store.logout(username) {
            return store_error_response(e);
        }
    }
    success("Logged out successfully")
}

/// POST /send-friend-request
pub async fn send_friend_request(
    data: web::Data<AppState>,
    body: web::Json<TargetRequest>,
) -> HttpResponse {
    match data
        .store
        .send_friend_request(&body.username, &body.target_username)
    {
        Ok(()) => success("Friend request sent successfully"),
        Err(e) => store_error_response(e),
    }
}

/// POST /accept-friend-request
pub async fn accept_friend_request(
    data: web::Data<AppState>,
    body: web::Json<RequesterRequest>,
) -> HttpResponse {
    match data
        .store
        .accept_friend_request(&body.username, &body.requester_username)
    {
        Ok(()) => success("Friend request accepted"),
        Err(e) => store_error_response(e),
    }
}

/// POST /decline-friend-request
pub async fn decline_friend_request(
    data: web::Data<AppState>,
    body: web::Json<RequesterRequest>,
) -> HttpResponse {
    match data
        .store
        .decline_friend_request(&body.username, &body.requester_username)
    {
        Ok(()) => success("Friend request declined"),
        Err(e) => store_error_response(e),
    }
}

/// POST /cancel-friend-request
pub async fn cancel_friend_request(
    data: web::Data<AppState>,
    body: web::Json<TargetRequest>,
) -> HttpResponse {
    match data
        .store
        .cancel_friend_request(&body.username, &body.target_username)
    {
        Ok(()) => success("Friend request cancelled"),
        Err(e) => store_error_response(e),
    }
}

/// POST /remove-friend
pub async fn remove_friend(
    data: web::Data<AppState>,
    body: web::Json<FriendRequest>,
) -> HttpResponse {
    match data
        .store
        .remove_friend(&body.username, &body.friend_username)
    {
        Ok(()) => success("Friend removed successfully"),
        Err(e) => store_error_response(e),
    }
}

/// GET /friends-data/{username}
pub async fn friends_data(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    match data.store.friends_data(&path) {
        Ok(friends) => HttpResponse::Ok().json(json!({
            "success": true,
            "friends": friends.friends,
            "friendRequests": friends.friend_requests,
        })),
        Err(e) => store_error_response(e),
    }
}

/// POST /create-lobby: mint a short lobby code.
///
/// Lobbies themselves only come into existence on the first `joinLobby`;
/// this just hands the client an identifier to share.
pub async fn create_lobby() -> HttpResponse {
    let code: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(LOBBY_CODE_LEN)
        .collect();
    HttpResponse::Ok().json(json!({ "success": true, "lobbyId": code }))
}
