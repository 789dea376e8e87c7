//! Optimistic move arbitration
//!
//! A move is sent before its validity is known and resolves later from the
//! server's `valid`/`invalid` response. The arbiter turns that fire-and-
//! forget emission into an awaitable outcome with exactly-once resolution:
//! every submission resolves with acceptance, a rejection reason, or a
//! timeout — never more than once.
//!
//! Demultiplexing is by correlating player id. Responses for the local
//! player resolve the oldest pending submission; responses for any other
//! player are never consumed here and flow on as opponent notifications.
//! A response that arrives after its submission timed out is dropped
//! silently — the caller has already moved on, and there is no stale
//! acceptance window.

use std::collections::VecDeque;

use web_time::Instant;

use super::{
    constants,
    correlate::{self, Resolver, Ticket},
    identity::PlayerId,
};

/// Terminal outcome of one submitted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The server accepted the word
    Accepted,
    /// The server rejected the word
    Rejected {
        /// Human-readable rejection reason
        reason: String,
    },
    /// No response arrived within the bounded wait
    TimedOut,
}

/// How an inbound move response was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    /// The response correlated with the local player and resolved the
    /// oldest pending submission
    SelfMove,
    /// The response correlated with the local player but nothing was
    /// pending; it was dropped
    LateSelfMove,
    /// The response belongs to an opponent and was not consumed
    OpponentMove,
}

/// One submission awaiting its response
#[derive(Debug)]
struct PendingMove {
    word: String,
    deadline: Instant,
    resolver: Resolver<MoveOutcome>,
}

/// Correlates outgoing moves with their eventual responses
#[derive(Debug)]
pub struct MoveArbiter {
    self_id: PlayerId,
    pending: VecDeque<PendingMove>,
}

impl MoveArbiter {
    /// Creates an arbiter correlating against the local player id
    pub fn new(self_id: PlayerId) -> Self {
        Self {
            self_id,
            pending: VecDeque::new(),
        }
    }

    /// Registers a submission and returns the ticket its outcome arrives on
    ///
    /// The deadline is
    /// [`MOVE_RESPONSE_TIMEOUT`](constants::arbiter::MOVE_RESPONSE_TIMEOUT)
    /// from `now`. Dropping the ticket cancels the call: the slot in the
    /// response order is kept, but the outcome is discarded instead of being
    /// delivered into a destroyed context.
    pub fn submit(&mut self, word: impl Into<String>, now: Instant) -> Ticket<MoveOutcome> {
        let (resolver, ticket) = correlate::slot();
        self.pending.push_back(PendingMove {
            word: word.into(),
            deadline: now + constants::arbiter::MOVE_RESPONSE_TIMEOUT,
            resolver,
        });
        ticket
    }

    /// Classifies an inbound `valid` response
    pub fn observe_valid(&mut self, by: &PlayerId) -> Observed {
        self.observe(by, MoveOutcome::Accepted)
    }

    /// Classifies an inbound `invalid` response
    pub fn observe_invalid(&mut self, by: &PlayerId, reason: impl Into<String>) -> Observed {
        self.observe(
            by,
            MoveOutcome::Rejected {
                reason: reason.into(),
            },
        )
    }

    fn observe(&mut self, by: &PlayerId, outcome: MoveOutcome) -> Observed {
        if *by != self.self_id {
            return Observed::OpponentMove;
        }
        match self.pending.pop_front() {
            Some(entry) => {
                // resolving drops the deadline with the entry, so a timeout
                // can never fire for an already-resolved move
                entry.resolver.resolve(outcome);
                Observed::SelfMove
            }
            None => {
                tracing::debug!("move response with no pending submission, dropped");
                Observed::LateSelfMove
            }
        }
    }

    /// Resolves every submission whose deadline has passed
    ///
    /// Returns the number of submissions that timed out.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut timed_out = 0;
        while self.pending.front().is_some_and(|entry| entry.deadline <= now) {
            if let Some(entry) = self.pending.pop_front() {
                tracing::debug!(word = %entry.word, "move response timed out");
                entry.resolver.resolve(MoveOutcome::TimedOut);
                timed_out += 1;
            }
        }
        timed_out
    }

    /// Number of submissions still awaiting a response
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Discards every pending submission; part of phase teardown
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }
}
