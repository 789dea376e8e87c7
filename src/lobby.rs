//! Lobby state machine
//!
//! Tracks roster, readiness, admin rights, and the shared settings from the
//! moment a player creates or joins a lobby until the start signal hands
//! over to the game phase. The machine is deliberately distrustful of its
//! own actions: readiness toggles, settings edits, and join attempts only
//! become local state once the server echoes them back in an authoritative
//! roster push.
//!
//! After a disconnect, a persisted `(code, username)` pair drives automatic
//! rejoin: the join is re-attempted when the transport reports connected and
//! re-sent on a fixed interval until the server answers with success or an
//! explicit invalid/not-found response, which clears the persisted state.

use std::rc::Rc;

use enum_map::Enum;
use garde::Validate;
use thiserror::Error;
use web_time::Instant;

use super::{
    code::{LobbyCode, ParseCodeError},
    constants,
    identity::{GameId, Identity, PlayerId},
    protocol::{LobbyClientEvent, LobbyServerEvent, LobbyStateMessage},
    session::{PhaseSession, Transport, TransportError},
    settings::GameSettings,
    store::{Persistence, RejoinState},
    subscribe::Keyed,
};

/// Where the machine is in the lobby lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Not in any lobby
    Idle,
    /// A create request is in flight
    Creating,
    /// A join request is in flight
    Joining,
    /// Member of a lobby, trusted from the server's echo
    InLobby,
    /// The start signal arrived; handing over to the game phase
    Starting,
    /// The player left; the machine is spent
    Left,
}

/// One lobby member as echoed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyPlayer {
    /// The member's id
    pub id: PlayerId,
    /// The member's display name
    pub username: String,
    /// Whether the member has marked ready
    pub ready: bool,
}

/// The lobby admin as echoed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyAdmin {
    /// The admin's id
    pub id: PlayerId,
    /// The admin's display name
    pub username: String,
}

/// Authoritative lobby state, replaced wholesale on every echo
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyState {
    /// The lobby's code
    pub code: LobbyCode,
    /// All members in join order
    pub players: Vec<LobbyPlayer>,
    /// The member with settings/start rights
    pub admin: LobbyAdmin,
    /// Shared settings
    pub settings: GameSettings,
}

impl LobbyState {
    /// Looks up one member
    pub fn player(&self, id: &PlayerId) -> Option<&LobbyPlayer> {
        self.players.iter().find(|player| player.id == *id)
    }

    /// Whether the given player holds admin rights
    pub fn is_admin(&self, id: &PlayerId) -> bool {
        self.admin.id == *id
    }

    /// The roster handed to the game phase on start
    pub fn roster(&self) -> Vec<(PlayerId, String)> {
        self.players
            .iter()
            .map(|player| (player.id.clone(), player.username.clone()))
            .collect()
    }
}

/// Typed notifications re-emitted to the presentation layer
#[derive(Debug, Clone)]
pub enum Notification {
    /// The server created a lobby for this client
    Created {
        /// Code of the new lobby
        code: LobbyCode,
    },
    /// An authoritative roster echo replaced the lobby state
    StateChanged {
        /// The new state
        state: Rc<LobbyState>,
    },
    /// The server judged the submitted code malformed
    InvalidCode {
        /// The rejected code as submitted
        code: String,
    },
    /// The submitted code does not name a live lobby
    NotFound {
        /// The rejected code as submitted
        code: String,
    },
    /// Advisory: the start request was rejected; nothing changed
    NotEnoughPlayers,
    /// The session is starting; arm the game phase with this roster
    Starting {
        /// Id of the new game session
        game_id: GameId,
        /// The members at start time
        roster: Vec<(PlayerId, String)>,
    },
}

/// Discriminant for [`Notification`], used to route subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum NotificationKind {
    /// [`Notification::Created`]
    Created,
    /// [`Notification::StateChanged`]
    StateChanged,
    /// [`Notification::InvalidCode`]
    InvalidCode,
    /// [`Notification::NotFound`]
    NotFound,
    /// [`Notification::NotEnoughPlayers`]
    NotEnoughPlayers,
    /// [`Notification::Starting`]
    Starting,
}

impl Keyed for Notification {
    type Kind = NotificationKind;

    fn kind(&self) -> NotificationKind {
        match self {
            Notification::Created { .. } => NotificationKind::Created,
            Notification::StateChanged { .. } => NotificationKind::StateChanged,
            Notification::InvalidCode { .. } => NotificationKind::InvalidCode,
            Notification::NotFound { .. } => NotificationKind::NotFound,
            Notification::NotEnoughPlayers => NotificationKind::NotEnoughPlayers,
            Notification::Starting { .. } => NotificationKind::Starting,
        }
    }
}

/// Errors raised by lobby operations
///
/// These block only the requested transition; existing local state is never
/// destroyed by an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Settings and start rights belong to the admin
    #[error("only the lobby admin may change settings")]
    NotAdmin,
    /// The operation needs an authoritative lobby state first
    #[error("not currently in a lobby")]
    NotInLobby,
    /// Create/join attempted while already a member
    #[error("already in a lobby")]
    AlreadyInLobby,
    /// The proposed settings violate their bounds
    #[error("invalid settings: {0}")]
    InvalidSettings(garde::Report),
    /// The code failed local validation; distinct from the server's
    /// not-found answer
    #[error(transparent)]
    Code(#[from] ParseCodeError),
    /// The transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Schedule for the automatic rejoin loop
#[derive(Debug, Clone, Copy)]
struct RejoinPoll {
    next_attempt: Instant,
}

/// The lobby state machine
#[derive(Debug)]
pub struct Lobby<S: Persistence> {
    identity: Identity,
    store: S,
    stage: Stage,
    state: Option<Rc<LobbyState>>,
    pending_username: Option<String>,
    rejoin: Option<RejoinPoll>,
}

impl<S: Persistence> Lobby<S> {
    /// Creates the machine for one identity
    pub fn new(identity: Identity, store: S) -> Self {
        Self {
            identity,
            store,
            stage: Stage::Idle,
            state: None,
            pending_username: None,
            rejoin: None,
        }
    }

    /// The machine's current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The authoritative lobby state, once echoed
    pub fn state(&self) -> Option<&Rc<LobbyState>> {
        self.state.as_ref()
    }

    /// The identity this machine acts as
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The persistence backing this machine
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the persistence backing this machine
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn join_username(&self) -> String {
        self.pending_username
            .clone()
            .unwrap_or_else(|| self.identity.display_name())
    }

    /// Requests a new lobby
    ///
    /// On `lobby_created` the machine joins the new lobby automatically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInLobby`] when a lobby is already active, or
    /// a transport error from the emission.
    pub fn create<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        username: &str,
        now: Instant,
    ) -> Result<(), Error> {
        if matches!(self.stage, Stage::InLobby | Stage::Starting) {
            return Err(Error::AlreadyInLobby);
        }
        session.send(
            LobbyClientEvent::CreateLobby {
                username: username.to_owned(),
            },
            now,
        )?;
        self.pending_username = Some(username.to_owned());
        self.stage = Stage::Creating;
        Ok(())
    }

    /// Joins a lobby by code
    ///
    /// The code is normalized to its canonical lower-case form before
    /// transmission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Code`] when the code is malformed (a local failure,
    /// distinct from the server's not-found answer),
    /// [`Error::AlreadyInLobby`] when a lobby is already active, or a
    /// transport error from the emission.
    pub fn join<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        code: &str,
        username: &str,
        now: Instant,
    ) -> Result<(), Error> {
        if matches!(self.stage, Stage::InLobby | Stage::Starting) {
            return Err(Error::AlreadyInLobby);
        }
        let code: LobbyCode = code.parse()?;
        session.send(
            LobbyClientEvent::JoinLobby {
                code,
                username: username.to_owned(),
            },
            now,
        )?;
        self.pending_username = Some(username.to_owned());
        self.stage = Stage::Joining;
        Ok(())
    }

    /// Marks the local player ready
    ///
    /// The local roster is not touched; the flag becomes real when the
    /// server echoes it in the next roster push.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInLobby`] before the first roster echo, or a
    /// transport error from the emission.
    pub fn ready<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        now: Instant,
    ) -> Result<(), Error> {
        let state = self.state.as_ref().ok_or(Error::NotInLobby)?;
        session.send(
            LobbyClientEvent::Ready {
                code: state.code.clone(),
                player_id: self.identity.player_id().clone(),
            },
            now,
        )?;
        Ok(())
    }

    /// Clears the local player's readiness
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInLobby`] before the first roster echo, or a
    /// transport error from the emission.
    pub fn unready<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        now: Instant,
    ) -> Result<(), Error> {
        let state = self.state.as_ref().ok_or(Error::NotInLobby)?;
        session.send(
            LobbyClientEvent::Unready {
                code: state.code.clone(),
                player_id: self.identity.player_id().clone(),
            },
            now,
        )?;
        Ok(())
    }

    /// Pushes new shared settings to all participants
    ///
    /// Local state updates only on the server's echo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAdmin`] for non-admins, [`Error::InvalidSettings`]
    /// when the values violate their bounds, [`Error::NotInLobby`] before
    /// the first roster echo, or a transport error from the emission.
    pub fn update_settings<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        settings: GameSettings,
        now: Instant,
    ) -> Result<(), Error> {
        let state = self.state.as_ref().ok_or(Error::NotInLobby)?;
        if !state.is_admin(self.identity.player_id()) {
            return Err(Error::NotAdmin);
        }
        settings.validate().map_err(Error::InvalidSettings)?;
        session.send(
            LobbyClientEvent::SetGameSettings {
                code: state.code.clone(),
                player_id: self.identity.player_id().clone(),
                game_settings: settings,
            },
            now,
        )?;
        Ok(())
    }

    /// Requests a session start
    ///
    /// The server may answer `not_enough_players`, which is advisory and
    /// leaves the lobby untouched; the stage only moves on the `start_game`
    /// push.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInLobby`] before the first roster echo, or a
    /// transport error from the emission.
    pub fn start<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        now: Instant,
    ) -> Result<(), Error> {
        let state = self.state.as_ref().ok_or(Error::NotInLobby)?;
        session.send(
            LobbyClientEvent::StartGame {
                code: state.code.clone(),
                player_id: self.identity.player_id().clone(),
            },
            now,
        )?;
        Ok(())
    }

    /// Leaves the lobby: releases the persisted rejoin state and disconnects
    ///
    /// Consumes the session; a later lobby needs a fresh connection.
    pub fn leave<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        mut session: PhaseSession<T>,
        now: Instant,
    ) {
        if let Some(state) = &self.state {
            let farewell = LobbyClientEvent::LeaveLobby {
                code: state.code.clone(),
                player_id: self.identity.player_id().clone(),
            };
            if let Err(error) = session.send(farewell, now) {
                tracing::debug!(%error, "leave emission failed, disconnecting anyway");
            }
        }
        self.store.clear_rejoin();
        self.rejoin = None;
        self.state = None;
        self.stage = Stage::Left;
        session.close();
    }

    /// Applies one inbound lobby event
    ///
    /// Returns the notifications to re-emit, in order.
    ///
    /// # Errors
    ///
    /// Returns a transport error when a follow-up emission (the automatic
    /// join after `lobby_created`) fails.
    pub fn apply<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        event: LobbyServerEvent,
        session: &mut PhaseSession<T>,
        now: Instant,
    ) -> Result<Vec<Notification>, Error> {
        match event {
            LobbyServerEvent::LobbyCreated { code } => {
                let notifications = vec![Notification::Created { code: code.clone() }];
                if self.stage == Stage::Creating {
                    let username = self.join_username();
                    session.send(LobbyClientEvent::JoinLobby { code, username }, now)?;
                    self.stage = Stage::Joining;
                }
                Ok(notifications)
            }
            LobbyServerEvent::LobbyState(message) | LobbyServerEvent::JoinedLobby(message) => {
                Ok(vec![self.apply_roster(message)])
            }
            LobbyServerEvent::InvalidLobbyCode { code } => {
                tracing::debug!(%code, "server judged the lobby code malformed");
                self.fail_join();
                Ok(vec![Notification::InvalidCode { code }])
            }
            LobbyServerEvent::LobbyNotFound { code } => {
                tracing::debug!(%code, "no lobby under the requested code");
                self.fail_join();
                Ok(vec![Notification::NotFound { code }])
            }
            LobbyServerEvent::NotEnoughPlayers {} => Ok(vec![Notification::NotEnoughPlayers]),
            LobbyServerEvent::StartGame { game_id } => match &self.state {
                Some(state) => {
                    self.stage = Stage::Starting;
                    self.rejoin = None;
                    tracing::debug!(game = %game_id, "lobby handing over to the game phase");
                    Ok(vec![Notification::Starting {
                        game_id,
                        roster: state.roster(),
                    }])
                }
                None => {
                    tracing::warn!(game = %game_id, "start push without a lobby state, ignored");
                    Ok(vec![])
                }
            },
        }
    }

    fn apply_roster(&mut self, message: LobbyStateMessage) -> Notification {
        let pushed_settings = message.game_settings;
        let settings = pushed_settings
            .or_else(|| self.state.as_ref().map(|state| state.settings))
            .unwrap_or_default();
        let state = Rc::new(LobbyState {
            code: message.code,
            players: message
                .players
                .into_iter()
                .map(|player| LobbyPlayer {
                    id: player.player_id,
                    username: player.username,
                    ready: player.ready,
                })
                .collect(),
            admin: LobbyAdmin {
                id: message.admin.player_id,
                username: message.admin.username,
            },
            settings,
        });

        self.stage = Stage::InLobby;
        self.rejoin = None;
        self.store.set_rejoin(RejoinState {
            code: state.code.clone(),
            username: self.join_username(),
        });
        if let Some(settings) = pushed_settings {
            self.store.set_settings(settings);
        }
        self.state = Some(Rc::clone(&state));
        Notification::StateChanged { state }
    }

    fn fail_join(&mut self) {
        self.store.clear_rejoin();
        self.rejoin = None;
        if matches!(self.stage, Stage::Creating | Stage::Joining) {
            self.stage = Stage::Idle;
        }
    }

    /// Reports the transport's connected signal
    ///
    /// Flushes any held event, then re-attempts a persisted join if the
    /// machine is not already in (or entering) a lobby.
    ///
    /// # Errors
    ///
    /// Propagates transport errors from the flush or the rejoin emission.
    pub fn on_connected<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        now: Instant,
    ) -> Result<(), Error> {
        session.on_connected(now)?;
        if matches!(self.stage, Stage::Idle | Stage::Left) {
            if let Some(rejoin) = self.store.rejoin() {
                tracing::debug!(code = %rejoin.code, "re-attempting lobby join after reconnect");
                session.send(
                    LobbyClientEvent::JoinLobby {
                        code: rejoin.code,
                        username: rejoin.username.clone(),
                    },
                    now,
                )?;
                self.pending_username = Some(rejoin.username);
                self.stage = Stage::Joining;
                self.rejoin = Some(RejoinPoll {
                    next_attempt: now + constants::lobby::REJOIN_RETRY_INTERVAL,
                });
            }
        }
        Ok(())
    }

    /// Drives deadlines: the transport's reconnect window and the fixed
    /// rejoin interval
    ///
    /// # Errors
    ///
    /// Propagates transport errors from the deadline check or a rejoin
    /// re-emission.
    pub fn poll<T: Transport<Event = LobbyClientEvent>>(
        &mut self,
        session: &mut PhaseSession<T>,
        now: Instant,
    ) -> Result<(), Error> {
        session.poll(now)?;
        if self.stage == Stage::Joining {
            if let Some(poll) = &mut self.rejoin {
                if now >= poll.next_attempt {
                    poll.next_attempt = now + constants::lobby::REJOIN_RETRY_INTERVAL;
                    if let Some(rejoin) = self.store.rejoin() {
                        session.send(
                            LobbyClientEvent::JoinLobby {
                                code: rejoin.code,
                                username: rejoin.username,
                            },
                            now,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc as StdRc};

    use pretty_assertions::assert_eq;
    use web_time::Duration;

    use super::*;
    use crate::{
        protocol::{LobbyAdminMessage, LobbyPlayerMessage},
        session::Phase,
        store::MemoryStore,
    };

    fn pid(name: &str) -> PlayerId {
        PlayerId::new(name)
    }

    fn user(name: &str) -> Identity {
        Identity::User {
            id: pid(name),
            username: name.to_owned(),
            token: format!("token-{name}"),
        }
    }

    #[derive(Debug, Default)]
    struct FakeState {
        connected: bool,
        sent: Vec<LobbyClientEvent>,
        closed: bool,
    }

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: StdRc<RefCell<FakeState>>,
    }

    impl FakeTransport {
        fn connected() -> (Self, StdRc<RefCell<FakeState>>) {
            let state = StdRc::new(RefCell::new(FakeState {
                connected: true,
                ..FakeState::default()
            }));
            (
                Self {
                    state: StdRc::clone(&state),
                },
                state,
            )
        }
    }

    impl Transport for FakeTransport {
        type Event = LobbyClientEvent;

        fn send(&mut self, event: &LobbyClientEvent) -> Result<(), TransportError> {
            let mut state = self.state.borrow_mut();
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            state.sent.push(event.clone());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.state.borrow().connected
        }

        fn reconnect(&mut self) {}

        fn close(self) {
            self.state.borrow_mut().closed = true;
        }
    }

    fn lobby_session() -> (PhaseSession<FakeTransport>, StdRc<RefCell<FakeState>>) {
        let (transport, state) = FakeTransport::connected();
        (PhaseSession::open(Phase::Lobby, transport), state)
    }

    fn roster_message(code: &str, players: &[(&str, bool)], admin: &str) -> LobbyStateMessage {
        LobbyStateMessage {
            code: code.parse().unwrap(),
            players: players
                .iter()
                .map(|(name, ready)| LobbyPlayerMessage {
                    player_id: pid(name),
                    username: (*name).to_owned(),
                    ready: *ready,
                })
                .collect(),
            admin: LobbyAdminMessage {
                player_id: pid(admin),
                username: admin.to_owned(),
            },
            game_settings: None,
        }
    }

    #[test]
    fn test_create_flow_reaches_lobby_with_self_as_admin() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        lobby.create(&mut session, "ada", now).unwrap();
        assert_eq!(lobby.stage(), Stage::Creating);

        // the created push triggers the automatic join
        let notes = lobby
            .apply(
                LobbyServerEvent::LobbyCreated {
                    code: "wx7q".parse().unwrap(),
                },
                &mut session,
                now,
            )
            .unwrap();
        assert!(matches!(notes[0], Notification::Created { .. }));
        assert_eq!(lobby.stage(), Stage::Joining);
        assert_eq!(
            state.borrow().sent.last().unwrap(),
            &LobbyClientEvent::JoinLobby {
                code: "wx7q".parse().unwrap(),
                username: "ada".to_owned(),
            }
        );

        // the echo with one player, self as admin, lands us in the lobby
        let notes = lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message("wx7q", &[("ada", false)], "ada")),
                &mut session,
                now,
            )
            .unwrap();
        let Notification::StateChanged { state: lobby_state } = &notes[0] else {
            panic!("expected a state change");
        };
        assert_eq!(lobby.stage(), Stage::InLobby);
        assert_eq!(lobby_state.players.len(), 1);
        assert!(lobby_state.is_admin(&pid("ada")));

        // readiness is trusted only once echoed
        lobby.ready(&mut session, now).unwrap();
        assert!(!lobby.state().unwrap().players[0].ready);
        lobby
            .apply(
                LobbyServerEvent::LobbyState(roster_message("wx7q", &[("ada", true)], "ada")),
                &mut session,
                now,
            )
            .unwrap();
        assert!(lobby.state().unwrap().players[0].ready);
    }

    #[test]
    fn test_join_normalizes_code_before_transmission() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "AB12", "ada", now).unwrap();
        assert_eq!(
            state.borrow().sent[0],
            LobbyClientEvent::JoinLobby {
                code: "ab12".parse().unwrap(),
                username: "ada".to_owned(),
            }
        );
    }

    #[test]
    fn test_malformed_code_fails_locally() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        let error = lobby.join(&mut session, "ab!", "ada", now).unwrap_err();
        assert!(matches!(error, Error::Code(ParseCodeError::Length)));
        let error = lobby.join(&mut session, "ab!2", "ada", now).unwrap_err();
        assert!(matches!(error, Error::Code(ParseCodeError::Charset)));

        // nothing went out and the machine stayed idle
        assert!(state.borrow().sent.is_empty());
        assert_eq!(lobby.stage(), Stage::Idle);
    }

    #[test]
    fn test_invalid_and_not_found_are_distinct_and_advisory() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, _state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "ab12", "ada", now).unwrap();
        let notes = lobby
            .apply(
                LobbyServerEvent::InvalidLobbyCode {
                    code: "ab12".to_owned(),
                },
                &mut session,
                now,
            )
            .unwrap();
        assert!(matches!(notes[0], Notification::InvalidCode { .. }));
        assert_eq!(lobby.stage(), Stage::Idle);

        lobby.join(&mut session, "cd34", "ada", now).unwrap();
        let notes = lobby
            .apply(
                LobbyServerEvent::LobbyNotFound {
                    code: "cd34".to_owned(),
                },
                &mut session,
                now,
            )
            .unwrap();
        assert!(matches!(notes[0], Notification::NotFound { .. }));
        assert_eq!(lobby.stage(), Stage::Idle);
    }

    #[test]
    fn test_not_enough_players_changes_nothing() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, _state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "ab12", "ada", now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message("ab12", &[("ada", false)], "ada")),
                &mut session,
                now,
            )
            .unwrap();
        lobby.start(&mut session, now).unwrap();

        let notes = lobby
            .apply(LobbyServerEvent::NotEnoughPlayers {}, &mut session, now)
            .unwrap();
        assert!(matches!(notes[0], Notification::NotEnoughPlayers));
        assert_eq!(lobby.stage(), Stage::InLobby);
        assert!(lobby.state().is_some());
    }

    #[test]
    fn test_settings_are_admin_only_and_trusted_from_echo() {
        let mut lobby = Lobby::new(user("ivy"), MemoryStore::default());
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "ab12", "ivy", now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message(
                    "ab12",
                    &[("ada", false), ("ivy", false)],
                    "ada",
                )),
                &mut session,
                now,
            )
            .unwrap();

        // ivy is not the admin
        let error = lobby
            .update_settings(&mut session, GameSettings::default(), now)
            .unwrap_err();
        assert!(matches!(error, Error::NotAdmin));

        // an admin-side change arrives as an echo and is persisted
        let new_settings = GameSettings {
            duration: 300_000,
            ..GameSettings::default()
        };
        let mut message = roster_message("ab12", &[("ada", false), ("ivy", false)], "ada");
        message.game_settings = Some(new_settings);
        lobby
            .apply(LobbyServerEvent::LobbyState(message), &mut session, now)
            .unwrap();
        assert_eq!(lobby.state().unwrap().settings, new_settings);
        assert_eq!(lobby.store().settings(), Some(new_settings));

        // no outbound settings event was ever sent by the non-admin
        assert!(!state
            .borrow()
            .sent
            .iter()
            .any(|event| matches!(event, LobbyClientEvent::SetGameSettings { .. })));
    }

    #[test]
    fn test_admin_can_push_settings() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "ab12", "ada", now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message("ab12", &[("ada", false)], "ada")),
                &mut session,
                now,
            )
            .unwrap();

        lobby
            .update_settings(&mut session, GameSettings::default(), now)
            .unwrap();
        assert!(matches!(
            state.borrow().sent.last().unwrap(),
            LobbyClientEvent::SetGameSettings { .. }
        ));

        // out-of-bounds values never leave the client
        let error = lobby
            .update_settings(
                &mut session,
                GameSettings {
                    duration: 1,
                    ..GameSettings::default()
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(error, Error::InvalidSettings(_)));
    }

    #[test]
    fn test_start_push_hands_over_roster() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, _state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "ab12", "ada", now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message(
                    "ab12",
                    &[("ada", true), ("ivy", true)],
                    "ada",
                )),
                &mut session,
                now,
            )
            .unwrap();

        let notes = lobby
            .apply(
                LobbyServerEvent::StartGame {
                    game_id: GameId::new("g1"),
                },
                &mut session,
                now,
            )
            .unwrap();
        let Notification::Starting { game_id, roster } = &notes[0] else {
            panic!("expected the start notification");
        };
        assert_eq!(game_id, &GameId::new("g1"));
        assert_eq!(
            roster,
            &vec![
                (pid("ada"), "ada".to_owned()),
                (pid("ivy"), "ivy".to_owned())
            ]
        );
        assert_eq!(lobby.stage(), Stage::Starting);
    }

    #[test]
    fn test_rejoin_polls_until_resolution() {
        let mut store = MemoryStore::default();
        store.set_rejoin(RejoinState {
            code: "ab12".parse().unwrap(),
            username: "ada".to_owned(),
        });
        let mut lobby = Lobby::new(user("ada"), store);
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        lobby.on_connected(&mut session, now).unwrap();
        assert_eq!(lobby.stage(), Stage::Joining);
        assert_eq!(state.borrow().sent.len(), 1);

        // before the interval nothing is re-sent
        lobby
            .poll(&mut session, now + Duration::from_millis(500))
            .unwrap();
        assert_eq!(state.borrow().sent.len(), 1);

        // past the interval the join goes out again
        lobby
            .poll(&mut session, now + constants::lobby::REJOIN_RETRY_INTERVAL)
            .unwrap();
        assert_eq!(state.borrow().sent.len(), 2);

        // success stops the polling
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message("ab12", &[("ada", false)], "ada")),
                &mut session,
                now,
            )
            .unwrap();
        lobby
            .poll(
                &mut session,
                now + constants::lobby::REJOIN_RETRY_INTERVAL * 4,
            )
            .unwrap();
        assert_eq!(state.borrow().sent.len(), 2);
    }

    #[test]
    fn test_rejected_rejoin_clears_persisted_state() {
        let mut store = MemoryStore::default();
        store.set_rejoin(RejoinState {
            code: "ab12".parse().unwrap(),
            username: "ada".to_owned(),
        });
        let mut lobby = Lobby::new(user("ada"), store);
        let (mut session, _state) = lobby_session();
        let now = Instant::now();

        lobby.on_connected(&mut session, now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::LobbyNotFound {
                    code: "ab12".to_owned(),
                },
                &mut session,
                now,
            )
            .unwrap();

        assert_eq!(lobby.store().rejoin(), None);
        assert_eq!(lobby.stage(), Stage::Idle);
        // no further polling happens
        lobby
            .poll(
                &mut session,
                now + constants::lobby::REJOIN_RETRY_INTERVAL * 2,
            )
            .unwrap();
    }

    #[test]
    fn test_join_echo_persists_rejoin_state() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, _state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "AB12", "ada", now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message("ab12", &[("ada", false)], "ada")),
                &mut session,
                now,
            )
            .unwrap();

        assert_eq!(
            lobby.store().rejoin(),
            Some(RejoinState {
                code: "ab12".parse().unwrap(),
                username: "ada".to_owned(),
            })
        );
    }

    #[test]
    fn test_leave_clears_state_and_disconnects() {
        let mut lobby = Lobby::new(user("ada"), MemoryStore::default());
        let (mut session, state) = lobby_session();
        let now = Instant::now();

        lobby.join(&mut session, "ab12", "ada", now).unwrap();
        lobby
            .apply(
                LobbyServerEvent::JoinedLobby(roster_message("ab12", &[("ada", false)], "ada")),
                &mut session,
                now,
            )
            .unwrap();

        lobby.leave(session, now);
        assert_eq!(lobby.stage(), Stage::Left);
        assert!(lobby.state().is_none());
        assert_eq!(lobby.store().rejoin(), None);
        assert!(state.borrow().closed);
        assert!(matches!(
            state.borrow().sent.last().unwrap(),
            LobbyClientEvent::LeaveLobby { .. }
        ));
    }
}
