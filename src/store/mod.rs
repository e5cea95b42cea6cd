//! Sqlite-backed account store.
//!
//! External storage collaborator for the relay: user accounts, the social
//! graph (friends and friend requests, stored as JSON columns), and the
//! presence flag the connection registry updates fire-and-forget. Failure to
//! open the database at startup is the one process-fatal error; everything
//! after that is reported to the caller or logged.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-level error taxonomy, mapped to HTTP statuses by the api layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    /// Bad request data (missing fields, short username, wrong password...).
    #[error("{0}")]
    Invalid(String),
    /// Referenced user does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The operation conflicts with existing state (duplicate user,
    /// already friends, request already pending).
    #[error("{0}")]
    Conflict(String),
}

/// Sent/received friend request lists for one user.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FriendRequests {
    pub sent: Vec<String>,
    pub received: Vec<String>,
}

/// A friend entry with its live presence flag.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FriendStatus {
    pub username: String,
    pub online: bool,
}

/// Response shape for `GET /friends-data/{username}`.
#[derive(Serialize, Clone, Debug)]
pub struct FriendsData {
    pub friends: Vec<FriendStatus>,
    pub friend_requests: FriendRequests,
}

/// Username + presence, for the debugging user listing.
#[derive(Serialize, Clone, Debug)]
pub struct UserPresence {
    pub username: String,
    pub online: bool,
}

struct UserRow {
    password: String,
    friends: Vec<String>,
    requests: FriendRequests,
}

/// Handle to the account database. Cloneable; all clones share one
/// connection behind a mutex (sqlite writes are serialized anyway).
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password TEXT,
                friends TEXT DEFAULT '[]',
                friend_requests TEXT DEFAULT '{\"sent\": [], \"received\": []}',
                online INTEGER DEFAULT 0
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Recover from poisoning; sqlite state itself stays consistent.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get_user(conn: &Connection, username: &str) -> Result<Option<UserRow>, StoreError> {
        let row = conn
            .query_row(
                "SELECT password, friends, friend_requests FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        Ok(row.map(|(password, friends, requests)| UserRow {
            password,
            friends: serde_json::from_str(&friends).unwrap_or_default(),
            requests: serde_json::from_str(&requests).unwrap_or_default(),
        }))
    }

    fn require_user(conn: &Connection, username: &str) -> Result<UserRow, StoreError> {
        Self::get_user(conn, username)?
            .ok_or_else(|| StoreError::NotFound("User not found".to_string()))
    }

    fn save_requests(
        conn: &Connection,
        username: &str,
        requests: &FriendRequests,
    ) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE users SET friend_requests = ?1 WHERE username = ?2",
            params![serde_json::to_string(requests).unwrap_or_default(), username],
        )?;
        Ok(())
    }

    fn save_friends(
        conn: &Connection,
        username: &str,
        friends: &[String],
    ) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE users SET friends = ?1 WHERE username = ?2",
            params![serde_json::to_string(friends).unwrap_or_default(), username],
        )?;
        Ok(())
    }

    /// Create a new account. Usernames must be at least 3 characters and
    /// unique.
    pub fn register(&self, username: &str, password: &str) -> Result<(), StoreError> {
        if username.is_empty() || password.is_empty() {
            return Err(StoreError::Invalid(
                "Username and password required".to_string(),
            ));
        }
        if username.len() < 3 {
            return Err(StoreError::Invalid(
                "Username must be at least 3 characters".to_string(),
            ));
        }
        let conn = self.lock();
        if Self::get_user(&conn, username)?.is_some() {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }
        conn.execute(
            "INSERT INTO users (username, password, friends, friend_requests, online)
             VALUES (?1, ?2, '[]', '{\"sent\": [], \"received\": []}', 0)",
            params![username, password],
        )?;
        Ok(())
    }

    /// Check credentials and mark the user online.
    pub fn login(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let user = Self::get_user(&conn, username)?
            .ok_or_else(|| StoreError::NotFound("User does not exist".to_string()))?;
        if user.password != password {
            return Err(StoreError::Invalid("Incorrect password".to_string()));
        }
        conn.execute(
            "UPDATE users SET online = 1 WHERE username = ?1",
            params![username],
        )?;
        Ok(())
    }

    /// Mark the user offline.
    pub fn logout(&self, username: &str) -> Result<(), StoreError> {
        self.set_online(username, false)
    }

    /// Presence hook for the connection registry. Fire-and-forget at the
    /// call site: the relay logs failures and keeps processing messages.
    pub fn set_online(&self, username: &str, online: bool) -> Result<(), StoreError> {
        self.lock().execute(
            "UPDATE users SET online = ?1 WHERE username = ?2",
            params![online as i64, username],
        )?;
        Ok(())
    }

    /// Mark every user offline. Used on graceful shutdown.
    pub fn set_all_offline(&self) -> Result<(), StoreError> {
        self.lock().execute("UPDATE users SET online = 0", [])?;
        Ok(())
    }

    /// Record a friend request from `username` to `target`.
    pub fn send_friend_request(&self, username: &str, target: &str) -> Result<(), StoreError> {
        if username == target {
            return Err(StoreError::Invalid(
                "Cannot add yourself as friend".to_string(),
            ));
        }
        let conn = self.lock();
        let user = Self::require_user(&conn, username)?;
        let target_user = Self::require_user(&conn, target)?;

        if user.friends.iter().any(|f| f == target) {
            return Err(StoreError::Conflict("Already friends".to_string()));
        }
        if user.requests.sent.iter().any(|u| u == target) {
            return Err(StoreError::Conflict(
                "Friend request already sent".to_string(),
            ));
        }
        if target_user.requests.received.iter().any(|u| u == username) {
            return Err(StoreError::Conflict(
                "Friend request already pending".to_string(),
            ));
        }

        let mut user_requests = user.requests;
        let mut target_requests = target_user.requests;
        user_requests.sent.push(target.to_string());
        target_requests.received.push(username.to_string());
        Self::save_requests(&conn, username, &user_requests)?;
        Self::save_requests(&conn, target, &target_requests)?;
        Ok(())
    }

    /// Accept a pending friend request from `requester`.
    pub fn accept_friend_request(&self, username: &str, requester: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let user = Self::require_user(&conn, username)?;
        let requester_user = Self::require_user(&conn, requester)?;

        if !user.requests.received.iter().any(|u| u == requester) {
            return Err(StoreError::Invalid("No pending friend request".to_string()));
        }

        let mut user_requests = user.requests;
        let mut requester_requests = requester_user.requests;
        user_requests.received.retain(|u| u != requester);
        requester_requests.sent.retain(|u| u != username);

        let mut user_friends = user.friends;
        let mut requester_friends = requester_user.friends;
        if !user_friends.iter().any(|f| f == requester) {
            user_friends.push(requester.to_string());
        }
        if !requester_friends.iter().any(|f| f == username) {
            requester_friends.push(username.to_string());
        }

        Self::save_requests(&conn, username, &user_requests)?;
        Self::save_friends(&conn, username, &user_friends)?;
        Self::save_requests(&conn, requester, &requester_requests)?;
        Self::save_friends(&conn, requester, &requester_friends)?;
        Ok(())
    }

    /// Decline a pending friend request from `requester`.
    pub fn decline_friend_request(
        &self,
        username: &str,
        requester: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock();
        let user = Self::require_user(&conn, username)?;
        let requester_user = Self::require_user(&conn, requester)?;

        let mut user_requests = user.requests;
        let mut requester_requests = requester_user.requests;
        user_requests.received.retain(|u| u != requester);
        requester_requests.sent.retain(|u| u != username);
        Self::save_requests(&conn, username, &user_requests)?;
        Self::save_requests(&conn, requester, &requester_requests)?;
        Ok(())
    }

    /// Withdraw a friend request previously sent to `target`.
    pub fn cancel_friend_request(&self, username: &str, target: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let user = Self::require_user(&conn, username)?;
        let target_user = Self::require_user(&conn, target)?;

        let mut user_requests = user.requests;
        let mut target_requests = target_user.requests;
        user_requests.sent.retain(|u| u != target);
        target_requests.received.retain(|u| u != username);
        Self::save_requests(&conn, username, &user_requests)?;
        Self::save_requests(&conn, target, &target_requests)?;
        Ok(())
    }

    /// Remove `friend` from both users' friend lists.
    pub fn remove_friend(&self, username: &str, friend: &str) -> Result<(), StoreError> {
        let conn = self.lock();
        let user = Self::require_user(&conn, username)?;
        let friend_user = Self::require_user(&conn, friend)?;

        let user_friends: Vec<String> =
            user.friends.into_iter().filter(|f| f != friend).collect();
        let friend_friends: Vec<String> = friend_user
            .friends
            .into_iter()
            .filter(|f| f != username)
            .collect();
        Self::save_friends(&conn, username, &user_friends)?;
        Self::save_friends(&conn, friend, &friend_friends)?;
        Ok(())
    }

    /// Friends (with live presence) and request lists for one user.
    pub fn friends_data(&self, username: &str) -> Result<FriendsData, StoreError> {
        let conn = self.lock();
        let user = Self::require_user(&conn, username)?;

        let mut friends = Vec::with_capacity(user.friends.len());
        for friend in &user.friends {
            let online = conn
                .query_row(
                    "SELECT online FROM users WHERE username = ?1",
                    params![friend],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
                .map(|v| v == 1)
                .unwrap_or(false);
            friends.push(FriendStatus {
                username: friend.clone(),
                online,
            });
        }
        Ok(FriendsData {
            friends,
            friend_requests: user.requests,
        })
    }

    /// Every known user with their presence flag (debugging endpoint).
    pub fn all_users(&self) -> Result<Vec<UserPresence>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT username, online FROM users")?;
        let rows = stmt.query_map([], |row| {
            Ok(UserPresence {
                username: row.get(0)?,
                online: row.get::<_, i64>(1)? == 1,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
