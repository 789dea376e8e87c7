//! Player and session identities
//!
//! This module defines the opaque identifiers issued by the server and the
//! local identity used to authenticate connections. Exactly one identity is
//! active per session: an authenticated user carrying a token, or an
//! ephemeral guest identified by a locally generated id.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

/// A unique identifier for a player
///
/// Player ids are issued by the server (or generated locally for guests) and
/// are treated as opaque strings. They are usable as map keys and serialize
/// transparently on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player id from its wire representation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A unique identifier for one game session
///
/// Issued by the server when a lobby starts a game; opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Creates a game id from its wire representation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GameId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// The local identity used to authenticate transport connections
///
/// Exactly one variant is active per session; the engine never mixes the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// An authenticated user with a server-issued session token
    User {
        /// The user's player id
        id: PlayerId,
        /// The user's chosen name
        username: String,
        /// Credential presented in the game namespace handshake
        token: String,
    },
    /// An ephemeral guest; the id is generated locally and lives for one session
    Guest {
        /// The locally generated guest id
        guest_id: PlayerId,
    },
}

impl Identity {
    /// Creates a fresh guest identity with a random id
    pub fn guest() -> Self {
        Self::Guest {
            guest_id: PlayerId::new(Uuid::new_v4().to_string()),
        }
    }

    /// The player id this identity correlates with on the wire
    pub fn player_id(&self) -> &PlayerId {
        match self {
            Self::User { id, .. } => id,
            Self::Guest { guest_id } => guest_id,
        }
    }

    /// A name suitable for display and for lobby join requests
    ///
    /// Guests display as `guest-` followed by the first eight characters of
    /// their id.
    pub fn display_name(&self) -> String {
        match self {
            Self::User { username, .. } => username.clone(),
            Self::Guest { guest_id } => {
                let prefix: String = guest_id.as_str().chars().take(8).collect();
                format!("guest-{prefix}")
            }
        }
    }

    /// Builds the lobby namespace handshake payload
    pub fn lobby_auth(&self) -> LobbyAuth {
        LobbyAuth {
            player_id: self.player_id().clone(),
        }
    }

    /// Builds the game namespace handshake payload for one session
    pub fn game_auth(&self, game_id: &GameId) -> GameAuth {
        match self {
            Self::User { token, .. } => GameAuth {
                token: Some(token.clone()),
                guest_id: None,
                game_id: game_id.clone(),
            },
            Self::Guest { guest_id } => GameAuth {
                token: None,
                guest_id: Some(guest_id.clone()),
                game_id: game_id.clone(),
            },
        }
    }
}

/// Handshake payload for the lobby namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyAuth {
    /// The connecting player's id (user or guest)
    pub player_id: PlayerId,
}

/// Handshake payload for the game namespace
///
/// Carries the identity credential plus the session being joined. Exactly one
/// of `token` and `guest_id` is present.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAuth {
    /// Session token of an authenticated user
    pub token: Option<String>,
    /// Id of a guest identity
    pub guest_id: Option<PlayerId>,
    /// The game session this connection is scoped to
    pub game_id: GameId,
}
