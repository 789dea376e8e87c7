//! Game session projection and orchestration
//!
//! This module contains the client-side reducer for one game session: it
//! projects the server's authoritative snapshot pushes onto a local
//! immutable state, routes move responses through the arbiter, interprets
//! liveness signals (pause, resume, departures), and re-emits everything as
//! typed notifications for the presentation layer.
//!
//! The projection is replace-only. Every authoritative push produces a new
//! [`GameSnapshot`] behind an `Rc`; fields from two different pushes are
//! never merged, which rules out partial-update races by construction. The
//! reducer exclusively owns the active snapshot — every other component
//! reads the published immutable value.

use std::{collections::HashMap, rc::Rc};

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Instant;

use super::{
    arbiter::{MoveArbiter, MoveOutcome, Observed},
    correlate::Ticket,
    identity::{GameId, PlayerId},
    protocol::{GameClientEvent, GameServerEvent, ResultsMessage, SnapshotMessage},
    ranking::{RankChange, Standings},
    session::{PhaseSession, SendStatus, Transport, TransportError},
    subscribe::Keyed,
};

/// Lifecycle status of a game session
///
/// Transitions are monotonic: `NotStarted → InProgress → Ended`. Pausing is
/// a parallel flag on the reducer and never moves the status backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Roster assembled, waiting for all participants to connect
    NotStarted,
    /// Play is live
    InProgress,
    /// The session reached its terminal state
    Ended,
}

impl GameStatus {
    fn order(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::Ended => 2,
        }
    }
}

/// One player's state inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    /// The player's id
    pub id: PlayerId,
    /// The player's display name
    pub username: String,
    /// Current score
    pub points: u64,
    /// Letters the player currently holds
    pub letters: String,
    /// The word currently being typed
    pub written: String,
    /// Words accepted so far
    pub words: Vec<String>,
    /// Whether the player is still connected and playing
    pub is_playing: bool,
}

/// An immutable projection of the authoritative game state
///
/// Exactly one snapshot is active per session; consumers compare by `Rc`
/// identity or value and never patch fields in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    /// The session this snapshot belongs to
    pub game_id: GameId,
    /// Lifecycle status
    pub status: GameStatus,
    /// Milliseconds elapsed since the session started
    pub elapsed_ms: u64,
    players: Vec<PlayerState>,
}

impl GameSnapshot {
    /// All players in roster order
    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    /// Looks up one player's state
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|player| player.id == *id)
    }

    /// Number of participants still playing
    pub fn playing_count(&self) -> usize {
        self.players.iter().filter(|player| player.is_playing).count()
    }

    /// Scores in roster order, the deterministic input for ranking
    pub fn scores(&self) -> Vec<(PlayerId, u64)> {
        self.players
            .iter()
            .map(|player| (player.id.clone(), player.points))
            .collect()
    }
}

/// One player's final score in the terminal results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerScore {
    /// Final point total
    pub points: u64,
    /// The player's display name
    pub username: String,
}

/// Terminal results of one session; immutable once produced
#[derive(Debug, Clone, PartialEq)]
pub struct GameResults {
    /// The session that ended
    pub game_id: GameId,
    /// Server-determined winner, authoritative even under score ties
    pub winner: PlayerId,
    /// Final score per player
    pub scores: HashMap<PlayerId, PlayerScore>,
}

impl From<ResultsMessage> for GameResults {
    fn from(message: ResultsMessage) -> Self {
        Self {
            game_id: message.game_id,
            winner: message.winner,
            scores: message
                .scores
                .into_iter()
                .map(|(id, score)| {
                    (
                        id,
                        PlayerScore {
                            points: score.points,
                            username: score.username,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Fatal desynchronization between the local projection and the server
///
/// These are raised distinctly rather than swallowed so the caller can force
/// a reconnect and resync.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// A snapshot arrived for a session other than the armed one
    #[error("snapshot for game {got} does not match active game {expected}")]
    GameMismatch {
        /// The armed session id
        expected: GameId,
        /// The id the push carried
        got: GameId,
    },
    /// A snapshot referenced a player outside the armed roster
    #[error("snapshot contains unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// A push tried to move the status backwards
    #[error("game status cannot move from {from:?} back to {to:?}")]
    StatusRegression {
        /// Status before the push
        from: GameStatus,
        /// Status the push carried
        to: GameStatus,
    },
}

/// Typed notifications re-emitted to the presentation layer
#[derive(Debug, Clone)]
pub enum Notification {
    /// The session started; play is live
    Started {
        /// The session that started
        game_id: GameId,
    },
    /// A new authoritative snapshot replaced the projection
    StateChanged {
        /// The new projection
        snapshot: Rc<GameSnapshot>,
        /// Players whose rank moved, in ranking order
        rank_changes: Vec<(PlayerId, RankChange)>,
    },
    /// An opponent's move was accepted
    OpponentMoveValid {
        /// The opponent
        by: PlayerId,
    },
    /// An opponent's move was rejected
    OpponentMoveRejected {
        /// The opponent
        by: PlayerId,
        /// The rejection reason
        reason: String,
    },
    /// The server suspended play
    Paused {
        /// Why the session paused
        reason: String,
        /// The player that triggered the pause, if any
        player_id: Option<PlayerId>,
        /// That player's display name
        username: Option<String>,
    },
    /// The server resumed play
    Resumed {
        /// How the pause resolved
        outcome: String,
        /// The player that triggered the resume, if any
        player_id: Option<PlayerId>,
        /// That player's display name
        username: Option<String>,
    },
    /// A participant left the session
    PlayerLeft {
        /// Why the player left
        reason: String,
        /// The departed player, if identified
        player_id: Option<PlayerId>,
        /// That player's display name
        username: Option<String>,
    },
    /// Only one participant is still playing; the caller must choose
    /// between continuing solo and leaving — this is a decision point, not
    /// an automatic action
    SoloDecisionRequired,
    /// The session reached its terminal state
    Ended {
        /// The terminal results
        results: Rc<GameResults>,
    },
}

/// Discriminant for [`Notification`], used to route subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum NotificationKind {
    /// [`Notification::Started`]
    Started,
    /// [`Notification::StateChanged`]
    StateChanged,
    /// [`Notification::OpponentMoveValid`]
    OpponentMoveValid,
    /// [`Notification::OpponentMoveRejected`]
    OpponentMoveRejected,
    /// [`Notification::Paused`]
    Paused,
    /// [`Notification::Resumed`]
    Resumed,
    /// [`Notification::PlayerLeft`]
    PlayerLeft,
    /// [`Notification::SoloDecisionRequired`]
    SoloDecisionRequired,
    /// [`Notification::Ended`]
    Ended,
}

impl Keyed for Notification {
    type Kind = NotificationKind;

    fn kind(&self) -> NotificationKind {
        match self {
            Notification::Started { .. } => NotificationKind::Started,
            Notification::StateChanged { .. } => NotificationKind::StateChanged,
            Notification::OpponentMoveValid { .. } => NotificationKind::OpponentMoveValid,
            Notification::OpponentMoveRejected { .. } => NotificationKind::OpponentMoveRejected,
            Notification::Paused { .. } => NotificationKind::Paused,
            Notification::Resumed { .. } => NotificationKind::Resumed,
            Notification::PlayerLeft { .. } => NotificationKind::PlayerLeft,
            Notification::SoloDecisionRequired => NotificationKind::SoloDecisionRequired,
            Notification::Ended { .. } => NotificationKind::Ended,
        }
    }
}

/// Client-side engine for one game session
///
/// Armed with the game id and roster from the lobby's start signal. All
/// inbound events for the session flow through [`receive`](Game::receive);
/// UI actions flow out through [`write`](Game::write) and
/// [`submit_move`](Game::submit_move).
#[derive(Debug)]
pub struct Game {
    game_id: GameId,
    self_id: PlayerId,
    roster: Vec<(PlayerId, String)>,
    snapshot: Rc<GameSnapshot>,
    standings: Standings,
    arbiter: MoveArbiter,
    paused: bool,
    solo_prompt: bool,
    results: Option<Rc<GameResults>>,
}

impl Game {
    /// Arms a new session from the lobby's start signal
    ///
    /// Seeds a zeroed projection for the roster; the first authoritative
    /// snapshot replaces it.
    pub fn new(game_id: GameId, self_id: PlayerId, roster: Vec<(PlayerId, String)>) -> Self {
        let players = roster
            .iter()
            .map(|(id, username)| PlayerState {
                id: id.clone(),
                username: username.clone(),
                points: 0,
                letters: String::new(),
                written: String::new(),
                words: Vec::new(),
                is_playing: true,
            })
            .collect();
        let arbiter = MoveArbiter::new(self_id.clone());
        tracing::debug!(game = %game_id, players = roster.len(), "game session armed");
        Self {
            snapshot: Rc::new(GameSnapshot {
                game_id: game_id.clone(),
                status: GameStatus::NotStarted,
                elapsed_ms: 0,
                players,
            }),
            game_id,
            self_id,
            roster,
            standings: Standings::new(),
            arbiter,
            paused: false,
            solo_prompt: false,
            results: None,
        }
    }

    /// The armed session id
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// The current projection
    pub fn snapshot(&self) -> &Rc<GameSnapshot> {
        &self.snapshot
    }

    /// The rank-ordered view of the projection
    pub fn standings(&self) -> &Standings {
        &self.standings
    }

    /// Terminal results, once the session has ended
    pub fn results(&self) -> Option<&Rc<GameResults>> {
        self.results.as_ref()
    }

    /// Whether play is currently suspended
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the caller owes a continue-solo-or-leave decision
    pub fn solo_decision_pending(&self) -> bool {
        self.solo_prompt
    }

    /// Applies one inbound event to the projection
    ///
    /// Returns the notifications to re-emit, in order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsistencyError`] when a snapshot desynchronizes from
    /// the armed session: wrong game id, unknown player, or a backwards
    /// status transition. These are fatal to the projection and the caller
    /// should resync.
    pub fn receive(
        &mut self,
        event: GameServerEvent,
        now: Instant,
    ) -> Result<Vec<Notification>, ConsistencyError> {
        match event {
            GameServerEvent::GameStarted { game_id } => Ok(self.receive_started(&game_id)),
            GameServerEvent::GameState(message) => self.receive_snapshot(message, now),
            // the snapshot piggybacked on `valid` is deliberately not
            // applied; the `game_state` push is the source of truth
            GameServerEvent::Valid { by, game_state: _ } => {
                Ok(match self.arbiter.observe_valid(&by) {
                    Observed::OpponentMove => vec![Notification::OpponentMoveValid { by }],
                    Observed::SelfMove | Observed::LateSelfMove => vec![],
                })
            }
            GameServerEvent::Invalid { by, reason } => {
                Ok(match self.arbiter.observe_invalid(&by, reason.clone()) {
                    Observed::OpponentMove => {
                        vec![Notification::OpponentMoveRejected { by, reason }]
                    }
                    Observed::SelfMove | Observed::LateSelfMove => vec![],
                })
            }
            GameServerEvent::GamePaused {
                reason,
                player_id,
                username,
            } => {
                self.paused = true;
                tracing::debug!(game = %self.game_id, %reason, "game paused");
                Ok(vec![Notification::Paused {
                    reason,
                    player_id,
                    username,
                }])
            }
            GameServerEvent::GameResumed {
                outcome,
                player_id,
                username,
            } => {
                self.paused = false;
                self.solo_prompt = false;
                Ok(vec![Notification::Resumed {
                    outcome,
                    player_id,
                    username,
                }])
            }
            GameServerEvent::PlayerLeft {
                reason,
                player_id,
                username,
            } => Ok(self.receive_player_left(reason, player_id, username)),
            GameServerEvent::GameEnded(message) => Ok(self.receive_ended(message)),
        }
    }

    fn receive_started(&mut self, game_id: &GameId) -> Vec<Notification> {
        if *game_id != self.game_id {
            tracing::debug!(got = %game_id, armed = %self.game_id, "start for another game ignored");
            return vec![];
        }
        if self.snapshot.status != GameStatus::NotStarted {
            return vec![];
        }
        let mut next = (*self.snapshot).clone();
        next.status = GameStatus::InProgress;
        self.snapshot = Rc::new(next);
        vec![Notification::Started {
            game_id: game_id.clone(),
        }]
    }

    fn receive_snapshot(
        &mut self,
        message: SnapshotMessage,
        now: Instant,
    ) -> Result<Vec<Notification>, ConsistencyError> {
        if self.results.is_some() {
            // terminal: everything after the end is ignored until a new
            // session is armed
            return Ok(vec![]);
        }
        if message.id != self.game_id {
            return Err(ConsistencyError::GameMismatch {
                expected: self.game_id.clone(),
                got: message.id,
            });
        }
        if message.state.order() < self.snapshot.status.order() {
            return Err(ConsistencyError::StatusRegression {
                from: self.snapshot.status,
                to: message.state,
            });
        }
        if let Some(unknown) = message
            .player_data
            .keys()
            .find(|id| !self.roster.iter().any(|(known, _)| known == *id))
        {
            return Err(ConsistencyError::UnknownPlayer(unknown.clone()));
        }

        let players = self
            .roster
            .iter()
            .filter_map(|(id, _)| {
                message.player_data.get(id).map(|data| PlayerState {
                    id: id.clone(),
                    username: data.username.clone(),
                    points: data.points,
                    letters: data.letters.clone(),
                    written: data.written.clone(),
                    words: data.words.clone(),
                    is_playing: data.is_playing,
                })
            })
            .collect();
        let next = Rc::new(GameSnapshot {
            game_id: self.game_id.clone(),
            status: message.state,
            elapsed_ms: message.elapsed_time,
            players,
        });
        self.snapshot = Rc::clone(&next);

        let rank_changes = self.standings.apply(&next.scores(), now);
        let mut notifications = vec![Notification::StateChanged {
            snapshot: next,
            rank_changes,
        }];
        self.update_liveness(&mut notifications);
        Ok(notifications)
    }

    fn receive_player_left(
        &mut self,
        reason: String,
        player_id: Option<PlayerId>,
        username: Option<String>,
    ) -> Vec<Notification> {
        if let Some(id) = &player_id {
            if self.snapshot.player(id).is_some() {
                let mut next = (*self.snapshot).clone();
                for player in &mut next.players {
                    if player.id == *id {
                        player.is_playing = false;
                    }
                }
                self.snapshot = Rc::new(next);
            } else {
                tracing::warn!(player = %id, "player_left for a player outside the projection");
            }
        }
        let mut notifications = vec![Notification::PlayerLeft {
            reason,
            player_id,
            username,
        }];
        self.update_liveness(&mut notifications);
        notifications
    }

    fn receive_ended(&mut self, message: ResultsMessage) -> Vec<Notification> {
        if message.game_id != self.game_id || self.results.is_some() {
            return vec![];
        }
        let results = Rc::new(GameResults::from(message));
        self.results = Some(Rc::clone(&results));
        let mut next = (*self.snapshot).clone();
        next.status = GameStatus::Ended;
        self.snapshot = Rc::new(next);
        self.paused = false;
        self.solo_prompt = false;
        tracing::debug!(game = %self.game_id, winner = %results.winner, "game ended");
        vec![Notification::Ended { results }]
    }

    /// Raises or clears the solo-decision flag from the projection
    fn update_liveness(&mut self, notifications: &mut Vec<Notification>) {
        let playing = self.snapshot.playing_count();
        if self.snapshot.status == GameStatus::InProgress
            && self.roster.len() >= 2
            && playing == 1
        {
            if !self.solo_prompt {
                self.solo_prompt = true;
                self.paused = true;
                tracing::debug!(game = %self.game_id, "one participant left playing");
                notifications.push(Notification::SoloDecisionRequired);
            }
        } else if playing >= 2 && self.solo_prompt {
            self.solo_prompt = false;
            self.paused = false;
        }
    }

    /// The caller chose to keep playing alone
    pub fn continue_solo(&mut self) {
        self.solo_prompt = false;
        self.paused = false;
    }

    /// Relays the word currently being typed
    ///
    /// # Errors
    ///
    /// Propagates transport errors from the session.
    pub fn write<T: Transport<Event = GameClientEvent>>(
        &self,
        session: &mut PhaseSession<T>,
        text: &str,
        now: Instant,
    ) -> Result<SendStatus, TransportError> {
        session.send(
            GameClientEvent::Written {
                word: text.to_owned(),
            },
            now,
        )
    }

    /// Submits a candidate word and returns the ticket its outcome lands on
    ///
    /// The outcome resolves exactly once — acceptance, a rejection reason,
    /// or a timeout after
    /// [`MOVE_RESPONSE_TIMEOUT`](super::constants::arbiter::MOVE_RESPONSE_TIMEOUT).
    /// Dropping the ticket cancels the call without disturbing correlation.
    ///
    /// # Errors
    ///
    /// Propagates transport errors; nothing is registered when the emission
    /// itself fails.
    pub fn submit_move<T: Transport<Event = GameClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        word: &str,
        now: Instant,
    ) -> Result<Ticket<MoveOutcome>, TransportError> {
        session.send(
            GameClientEvent::Move {
                word: word.to_owned(),
            },
            now,
        )?;
        Ok(self.arbiter.submit(word, now))
    }

    /// Drives deadlines: move timeouts and rank-flash expiry
    ///
    /// Returns the number of moves that timed out.
    pub fn poll(&mut self, now: Instant) -> usize {
        let timed_out = self.arbiter.poll(now);
        self.standings.sweep(now);
        timed_out
    }

    /// Tears the session down
    ///
    /// Discards every pending move and closes the transport, so no callback
    /// from this phase can reach into the next one.
    pub fn teardown<T: Transport>(mut self, session: PhaseSession<T>) {
        self.arbiter.cancel_all();
        session.close();
    }
}
