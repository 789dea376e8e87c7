//! Wire events for the two transport namespaces
//!
//! Every event is a JSON object of the form `{"event": ..., "data": ...}`.
//! Outbound enums serialize, inbound enums deserialize; payload fields use
//! camelCase on the wire. The engine never reuses a connection across
//! namespaces, so the two event families stay disjoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    code::LobbyCode,
    game::GameStatus,
    identity::{GameId, PlayerId},
    settings::GameSettings,
};

/// Events the client sends on the lobby namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LobbyClientEvent {
    /// Request a new lobby
    #[serde(rename_all = "camelCase")]
    CreateLobby {
        /// Name the creator will appear under
        username: String,
    },
    /// Join an existing lobby by code
    #[serde(rename_all = "camelCase")]
    JoinLobby {
        /// Canonical (lower-case) lobby code
        code: LobbyCode,
        /// Name the joiner will appear under
        username: String,
    },
    /// Mark the local player ready
    #[serde(rename_all = "camelCase")]
    Ready {
        /// Lobby the player is in
        code: LobbyCode,
        /// The local player's id
        player_id: PlayerId,
    },
    /// Clear the local player's readiness
    #[serde(rename_all = "camelCase")]
    Unready {
        /// Lobby the player is in
        code: LobbyCode,
        /// The local player's id
        player_id: PlayerId,
    },
    /// Request a session start
    #[serde(rename_all = "camelCase")]
    StartGame {
        /// Lobby to start
        code: LobbyCode,
        /// The requesting player's id
        player_id: PlayerId,
    },
    /// Leave the lobby
    #[serde(rename_all = "camelCase")]
    LeaveLobby {
        /// Lobby being left
        code: LobbyCode,
        /// The leaving player's id
        player_id: PlayerId,
    },
    /// Push new shared settings (admin only)
    #[serde(rename_all = "camelCase")]
    SetGameSettings {
        /// Lobby whose settings change
        code: LobbyCode,
        /// The admin's id
        player_id: PlayerId,
        /// The new settings
        game_settings: GameSettings,
    },
}

/// Events the server pushes on the lobby namespace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LobbyServerEvent {
    /// A lobby was created for this client
    #[serde(rename_all = "camelCase")]
    LobbyCreated {
        /// Code of the new lobby
        code: LobbyCode,
    },
    /// Authoritative roster echo
    LobbyState(LobbyStateMessage),
    /// Join confirmation with the initial roster
    JoinedLobby(LobbyStateMessage),
    /// The requested code is malformed on the server side
    #[serde(rename_all = "camelCase")]
    InvalidLobbyCode {
        /// The rejected code as submitted
        code: String,
    },
    /// The requested code does not name a live lobby
    #[serde(rename_all = "camelCase")]
    LobbyNotFound {
        /// The rejected code as submitted
        code: String,
    },
    /// Advisory rejection of a start request
    NotEnoughPlayers {},
    /// The session is starting
    #[serde(rename_all = "camelCase")]
    StartGame {
        /// Id of the new game session
        game_id: GameId,
    },
}

/// Authoritative lobby roster as pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStateMessage {
    /// The lobby's code
    pub code: LobbyCode,
    /// All members in join order
    pub players: Vec<LobbyPlayerMessage>,
    /// The member with settings/start rights
    pub admin: LobbyAdminMessage,
    /// Shared settings, when the push carries them
    #[serde(default)]
    pub game_settings: Option<GameSettings>,
}

/// One lobby member in a roster push
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayerMessage {
    /// The member's id
    pub player_id: PlayerId,
    /// The member's display name
    pub username: String,
    /// Whether the member has marked ready
    pub ready: bool,
}

/// The lobby admin in a roster push
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyAdminMessage {
    /// The admin's id
    pub player_id: PlayerId,
    /// The admin's display name
    pub username: String,
}

/// Events the client sends on the game namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GameClientEvent {
    /// Live-typing relay of the word in progress
    #[serde(rename_all = "camelCase")]
    Written {
        /// Current contents of the input
        word: String,
    },
    /// Submit a candidate word for arbitration
    #[serde(rename_all = "camelCase")]
    Move {
        /// The candidate word
        word: String,
    },
}

/// Events the server pushes on the game namespace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GameServerEvent {
    /// All participants are connected; play begins
    #[serde(rename_all = "camelCase")]
    GameStarted {
        /// The session that started
        game_id: GameId,
    },
    /// Full authoritative snapshot
    GameState(SnapshotMessage),
    /// A move was accepted
    #[serde(rename_all = "camelCase")]
    Valid {
        /// Id of the player whose move this resolves
        by: PlayerId,
        /// Snapshot piggybacked on the acceptance; never applied as
        /// authoritative state, the `game_state` push is the source of truth
        #[serde(default)]
        game_state: Option<SnapshotMessage>,
    },
    /// A move was rejected
    #[serde(rename_all = "camelCase")]
    Invalid {
        /// Id of the player whose move this resolves
        by: PlayerId,
        /// Human-readable rejection reason
        reason: String,
    },
    /// Play is suspended
    #[serde(rename_all = "camelCase")]
    GamePaused {
        /// Why the session paused
        reason: String,
        /// The player that triggered the pause, if any
        #[serde(default)]
        player_id: Option<PlayerId>,
        /// That player's display name
        #[serde(default)]
        username: Option<String>,
    },
    /// Play resumes
    #[serde(rename_all = "camelCase")]
    GameResumed {
        /// How the pause resolved
        outcome: String,
        /// The player that triggered the resume, if any
        #[serde(default)]
        player_id: Option<PlayerId>,
        /// That player's display name
        #[serde(default)]
        username: Option<String>,
    },
    /// A participant left the session
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        /// Why the player left
        reason: String,
        /// The departed player, if identified
        #[serde(default)]
        player_id: Option<PlayerId>,
        /// That player's display name
        #[serde(default)]
        username: Option<String>,
    },
    /// Terminal results push
    GameEnded(ResultsMessage),
}

/// Full authoritative state of one session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMessage {
    /// The session this snapshot belongs to
    pub id: GameId,
    /// Participant ids known to the server
    #[serde(default)]
    pub players: Vec<PlayerId>,
    /// Lifecycle status of the session
    pub state: GameStatus,
    /// Per-player state keyed by player id
    pub player_data: HashMap<PlayerId, PlayerDataMessage>,
    /// Milliseconds elapsed since the session started
    pub elapsed_time: u64,
}

/// One player's state inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDataMessage {
    /// Current score
    pub points: u64,
    /// Letters the player currently holds
    pub letters: String,
    /// The word currently being typed
    pub written: String,
    /// Words accepted so far
    pub words: Vec<String>,
    /// The player's display name
    pub username: String,
    /// Whether the player is still connected and playing
    pub is_playing: bool,
}

/// Terminal results as pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsMessage {
    /// The session that ended
    pub game_id: GameId,
    /// Server-determined winner; authoritative even under score ties
    pub winner: PlayerId,
    /// Final score and name per player
    pub scores: HashMap<PlayerId, ScoreMessage>,
}

/// One player's final score
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMessage {
    /// Final point total
    pub points: u64,
    /// The player's display name
    pub username: String,
}
