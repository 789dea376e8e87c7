//! Typed notification subscriptions
//!
//! Inbound transport events are classified by the lobby and game components
//! into typed notifications; the presentation layer consumes them through
//! this registry. Listeners are keyed by notification kind so a subscriber
//! only sees the family it asked for, and every registration returns a
//! handle that removes exactly that listener. A registry is constructed and
//! destroyed with its phase; [`Registry::clear`] on teardown makes stale
//! handles inert, so no callback from a torn-down phase can observe the next
//! phase's state.

use derive_where::derive_where;
use enum_map::{EnumArray, EnumMap};

/// Callback invoked with each delivered notification
pub type Listener<E> = Box<dyn FnMut(&E)>;

/// A notification type with an enumerable kind discriminant
///
/// The kind carries no payload; it only routes a notification to the
/// listeners subscribed to that kind.
pub trait Keyed: Sized {
    /// Discriminant enumerating the notification kinds
    type Kind: Copy + EnumArray<Vec<(u64, Listener<Self>)>>;

    /// Returns the kind of this notification
    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`Registry::subscribe`]
///
/// Passing it back to [`Registry::unsubscribe`] removes the listener it
/// names. Handles from a cleared registry are inert.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription<K> {
    kind: K,
    token: u64,
}

/// Kind-keyed listener registry for one phase
#[derive_where(Default)]
pub struct Registry<E: Keyed> {
    listeners: EnumMap<E::Kind, Vec<(u64, Listener<E>)>>,
    next_token: u64,
}

impl<E: Keyed> Registry<E> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for one notification kind
    ///
    /// Returns the handle that removes this listener again. Listeners must
    /// not call back into the registry they are registered with.
    pub fn subscribe(&mut self, kind: E::Kind, listener: impl FnMut(&E) + 'static) -> Subscription<E::Kind> {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners[kind].push((token, Box::new(listener)));
        Subscription { kind, token }
    }

    /// Removes the listener named by a handle
    ///
    /// Unknown handles (already removed, or from before a [`clear`]) are
    /// ignored.
    ///
    /// [`clear`]: Registry::clear
    pub fn unsubscribe(&mut self, subscription: Subscription<E::Kind>) {
        self.listeners[subscription.kind].retain(|(token, _)| *token != subscription.token);
    }

    /// Delivers a notification to every listener of its kind
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners[event.kind()] {
            listener(event);
        }
    }

    /// Delivers a batch of notifications in order
    pub fn emit_all<'a>(&mut self, events: impl IntoIterator<Item = &'a E>)
    where
        E: 'a,
    {
        for event in events {
            self.emit(event);
        }
    }

    /// Number of listeners registered for a kind
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners[kind].len()
    }

    /// Drops every listener; part of phase teardown
    pub fn clear(&mut self) {
        self.listeners = EnumMap::default();
    }
}
