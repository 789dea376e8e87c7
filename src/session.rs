//! Transport session management
//!
//! This module defines the trait for tunneling events between the engine and
//! the server, and the per-phase session wrapper that owns one connection.
//! The trait abstraction allows for different transport mechanisms while
//! maintaining a consistent interface.
//!
//! A session is scoped to exactly one phase (lobby or game) and is never
//! reused: tearing a phase down consumes the session, and a new phase always
//! opens a fresh connection. Reconnection is explicit rather than a silent
//! retry loop — a send that fails while disconnected triggers a single
//! reconnect attempt with a bounded wait for the connected signal, after
//! which the failure is surfaced to the caller.

use thiserror::Error;
use web_time::Instant;

use super::constants;

/// The phase a transport session is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Lobby namespace: roster, readiness, settings, start
    Lobby,
    /// Game namespace: moves, snapshots, liveness
    Game,
}

/// Errors surfaced by the transport layer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is down and no recovery is in progress
    #[error("transport is not connected")]
    NotConnected,
    /// A reconnect attempt is already waiting for the connected signal
    #[error("a reconnect attempt is already in progress")]
    ReconnectPending,
    /// The single reconnect attempt was not confirmed within the wait window
    #[error("the connection could not be re-established in time")]
    ReconnectTimedOut,
}

/// Trait for sending events through a transport connection
///
/// This trait abstracts the mechanism used to carry events to the server.
/// Implementations might use WebSockets, a socket.io client, or an in-memory
/// channel in tests. Connection handshakes (identity credential, game id)
/// are the implementation's concern and happen when the transport is built.
pub trait Transport {
    /// The outbound event type this connection carries
    type Event;

    /// Sends an event to the server
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] when the connection is down.
    fn send(&mut self, event: &Self::Event) -> Result<(), TransportError>;

    /// Whether the connection is currently established
    fn is_connected(&self) -> bool;

    /// Initiates a reconnect; completion is signalled out-of-band
    ///
    /// The owning session observes completion through
    /// [`PhaseSession::on_connected`].
    fn reconnect(&mut self);

    /// Closes the connection and releases it
    fn close(self);
}

/// Result of handing an event to a [`PhaseSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The event went out on the live connection
    Sent,
    /// The connection was down; a reconnect is in flight and the event will
    /// be flushed when the connected signal arrives in time
    Deferred,
}

/// One reconnect attempt with the event it is holding back
#[derive(Debug)]
struct ReconnectAttempt<E> {
    deadline: Instant,
    held: E,
}

/// A transport connection scoped to one phase
///
/// Owns the connection for its lifetime; closing the session consumes it, so
/// a connection can never leak into the next phase.
pub struct PhaseSession<T: Transport> {
    transport: T,
    phase: Phase,
    reconnect: Option<ReconnectAttempt<T::Event>>,
}

impl<T: Transport> std::fmt::Debug for PhaseSession<T> {
    /// Custom debug implementation that leaves out the transport and any
    /// held event
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseSession")
            .field("phase", &self.phase)
            .field("reconnect_pending", &self.reconnect.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> PhaseSession<T> {
    /// Wraps a freshly connected transport for one phase
    pub fn open(phase: Phase, transport: T) -> Self {
        tracing::debug!(?phase, "transport session opened");
        Self {
            transport,
            phase,
            reconnect: None,
        }
    }

    /// The phase this session is scoped to
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the underlying connection is up
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether a reconnect attempt is waiting for the connected signal
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Sends an event, recovering from a dead connection at most once
    ///
    /// On send failure while disconnected the session initiates a single
    /// reconnect, holds the event back, and arms a deadline of
    /// [`RECONNECT_WAIT`](constants::session::RECONNECT_WAIT) from `now`.
    /// The held event is flushed by [`on_connected`](Self::on_connected) or
    /// dropped when [`poll`](Self::poll) observes the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ReconnectPending`] while an attempt is in
    /// flight, [`TransportError::ReconnectTimedOut`] when the attempt has
    /// expired, or the transport's own error when the send fails for a
    /// reason other than a lost connection.
    pub fn send(&mut self, event: T::Event, now: Instant) -> Result<SendStatus, TransportError> {
        if self.reconnect.is_some() {
            self.poll(now)?;
            return Err(TransportError::ReconnectPending);
        }

        if self.transport.is_connected() {
            match self.transport.send(&event) {
                Ok(()) => return Ok(SendStatus::Sent),
                Err(error) if self.transport.is_connected() => return Err(error),
                // lost the connection mid-call, fall through to reconnect
                Err(_) => {}
            }
        }

        tracing::warn!(phase = ?self.phase, "send while disconnected, attempting one reconnect");
        self.transport.reconnect();
        self.reconnect = Some(ReconnectAttempt {
            deadline: now + constants::session::RECONNECT_WAIT,
            held: event,
        });
        Ok(SendStatus::Deferred)
    }

    /// Reports the transport's connected signal
    ///
    /// Flushes the event held by an in-flight reconnect attempt, provided
    /// the wait window has not expired.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ReconnectTimedOut`] when the signal arrived
    /// past the deadline (the held event is dropped), or the transport's
    /// error if the flush itself fails.
    pub fn on_connected(&mut self, now: Instant) -> Result<(), TransportError> {
        let Some(attempt) = self.reconnect.take() else {
            return Ok(());
        };
        if now >= attempt.deadline {
            tracing::warn!(phase = ?self.phase, "connected signal arrived after the wait window");
            return Err(TransportError::ReconnectTimedOut);
        }
        self.transport.send(&attempt.held)?;
        tracing::debug!(phase = ?self.phase, "reconnected, held event flushed");
        Ok(())
    }

    /// Checks the reconnect deadline
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ReconnectTimedOut`] once per expired
    /// attempt; the held event is dropped and the session returns to the
    /// plain disconnected state.
    pub fn poll(&mut self, now: Instant) -> Result<(), TransportError> {
        if let Some(attempt) = &self.reconnect {
            if now >= attempt.deadline {
                self.reconnect = None;
                tracing::warn!(phase = ?self.phase, "reconnect not confirmed in time");
                return Err(TransportError::ReconnectTimedOut);
            }
        }
        Ok(())
    }

    /// Tears the phase down, disconnecting and releasing the transport
    pub fn close(self) {
        tracing::debug!(phase = ?self.phase, "transport session closed");
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use web_time::Duration;

    use super::*;

    #[derive(Debug, Default)]
    struct FakeState {
        connected: bool,
        sent: Vec<String>,
        reconnect_calls: usize,
        closed: bool,
    }

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: Rc<RefCell<FakeState>>,
    }

    impl FakeTransport {
        fn connected() -> (Self, Rc<RefCell<FakeState>>) {
            let state = Rc::new(RefCell::new(FakeState {
                connected: true,
                ..FakeState::default()
            }));
            (
                Self {
                    state: Rc::clone(&state),
                },
                state,
            )
        }
    }

    impl Transport for FakeTransport {
        type Event = String;

        fn send(&mut self, event: &String) -> Result<(), TransportError> {
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

        fn reconnect(&mut self) {
            self.state.borrow_mut().reconnect_calls += 1;
        }

        fn close(self) {
            self.state.borrow_mut().closed = true;
        }
    }

    #[test]
    fn test_send_on_live_connection() {
        let (transport, state) = FakeTransport::connected();
        let mut session = PhaseSession::open(Phase::Lobby, transport);
        let now = Instant::now();

        let status = session.send("hello".to_owned(), now).unwrap();
        assert_eq!(status, SendStatus::Sent);
        assert_eq!(state.borrow().sent, vec!["hello".to_owned()]);
    }

    #[test]
    fn test_send_while_disconnected_defers_and_reconnects_once() {
        let (transport, state) = FakeTransport::connected();
        state.borrow_mut().connected = false;
        let mut session = PhaseSession::open(Phase::Game, transport);
        let now = Instant::now();

        let status = session.send("move".to_owned(), now).unwrap();
        assert_eq!(status, SendStatus::Deferred);
        assert_eq!(state.borrow().reconnect_calls, 1);
        assert!(session.reconnect_pending());

        // a second send during the wait fails fast without another attempt
        let err = session.send("again".to_owned(), now).unwrap_err();
        assert_eq!(err, TransportError::ReconnectPending);
        assert_eq!(state.borrow().reconnect_calls, 1);
    }

    #[test]
    fn test_connected_signal_flushes_held_event() {
        let (transport, state) = FakeTransport::connected();
        state.borrow_mut().connected = false;
        let mut session = PhaseSession::open(Phase::Game, transport);
        let now = Instant::now();

        session.send("move".to_owned(), now).unwrap();
        state.borrow_mut().connected = true;
        session.on_connected(now + Duration::from_secs(1)).unwrap();

        assert_eq!(state.borrow().sent, vec!["move".to_owned()]);
        assert!(!session.reconnect_pending());
    }

    #[test]
    fn test_reconnect_deadline_surfaces_error_once() {
        let (transport, state) = FakeTransport::connected();
        state.borrow_mut().connected = false;
        let mut session = PhaseSession::open(Phase::Game, transport);
        let now = Instant::now();

        session.send("move".to_owned(), now).unwrap();
        let late = now + constants::session::RECONNECT_WAIT + Duration::from_millis(1);
        assert_eq!(session.poll(late), Err(TransportError::ReconnectTimedOut));
        // the attempt is spent; the session is simply disconnected now
        assert_eq!(session.poll(late), Ok(()));
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_late_connected_signal_drops_held_event() {
        let (transport, state) = FakeTransport::connected();
        state.borrow_mut().connected = false;
        let mut session = PhaseSession::open(Phase::Game, transport);
        let now = Instant::now();

        session.send("move".to_owned(), now).unwrap();
        state.borrow_mut().connected = true;
        let late = now + constants::session::RECONNECT_WAIT;
        assert_eq!(
            session.on_connected(late),
            Err(TransportError::ReconnectTimedOut)
        );
        assert!(state.borrow().sent.is_empty());
    }

    #[test]
    fn test_close_releases_transport() {
        let (transport, state) = FakeTransport::connected();
        let session = PhaseSession::open(Phase::Lobby, transport);
        session.close();
        assert!(state.borrow().closed);
    }
}
