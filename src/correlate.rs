//! Single-resolution correlated requests
//!
//! A correlated request pairs an outbound emission with the one inbound
//! event that answers it. The pair created here enforces the contract at the
//! type level: a [`Resolver`] is consumed by resolving, so a request can
//! never resolve twice, and dropping the [`Ticket`] cancels the request, so
//! a late resolution can never be delivered into a context that no longer
//! exists.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

/// Internal state of one correlated request
#[derive(Debug)]
enum Slot<T> {
    Pending,
    Resolved(T),
    Taken,
}

/// The resolving half of a correlated request
///
/// Held by the component that matches inbound events. Resolving consumes the
/// resolver.
#[derive(Debug)]
pub struct Resolver<T> {
    slot: Weak<RefCell<Slot<T>>>,
}

/// The awaiting half of a correlated request
///
/// Held by the caller. Dropping the ticket before resolution cancels the
/// request; the eventual outcome is then discarded silently.
#[derive(Debug)]
pub struct Ticket<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

/// What happened when a resolver fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The caller still holds the ticket; the outcome is observable
    Delivered,
    /// The ticket was dropped; the outcome went nowhere
    Cancelled,
}

/// Creates a fresh correlated-request pair
pub fn slot<T>() -> (Resolver<T>, Ticket<T>) {
    let shared = Rc::new(RefCell::new(Slot::Pending));
    (
        Resolver {
            slot: Rc::downgrade(&shared),
        },
        Ticket { slot: shared },
    )
}

impl<T> Resolver<T> {
    /// Resolves the request with a terminal outcome
    ///
    /// Consumes the resolver, making a second resolution unrepresentable.
    pub fn resolve(self, value: T) -> Delivery {
        match self.slot.upgrade() {
            Some(shared) => {
                *shared.borrow_mut() = Slot::Resolved(value);
                Delivery::Delivered
            }
            None => Delivery::Cancelled,
        }
    }

    /// Whether the awaiting side has already gone away
    pub fn is_cancelled(&self) -> bool {
        self.slot.strong_count() == 0
    }
}

impl<T> Ticket<T> {
    /// Takes the outcome if the request has resolved
    ///
    /// Yields the value at most once; subsequent calls return `None`.
    pub fn try_take(&self) -> Option<T> {
        let mut slot = self.slot.borrow_mut();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Resolved(value) => Some(value),
            Slot::Pending => {
                *slot = Slot::Pending;
                None
            }
            Slot::Taken => None,
        }
    }

    /// Whether an outcome is waiting to be taken
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.slot.borrow(), Slot::Resolved(_))
    }
}
