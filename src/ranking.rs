//! Rank ordering and rank-change detection
//!
//! Every authoritative snapshot yields a full ranking: players sorted
//! descending by points, with ties retaining their prior relative order
//! (newcomers enter in roster order). Comparing the new ranking against the
//! immediately preceding one classifies each player as up, down, or
//! unchanged. Detection is a pure function of the previous order and the
//! new scores, so it is deterministic and order-independent for equal
//! inputs; only the marker's visibility window is a display concern.

use std::collections::HashMap;

use itertools::Itertools;
use web_time::Instant;

use super::{constants, identity::PlayerId};

/// Direction a player moved between two consecutive rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankChange {
    /// The player overtook at least one opponent
    Up,
    /// The player was overtaken
    Down,
}

/// A rank-change marker with its display deadline
#[derive(Debug, Clone)]
struct Flash {
    player: PlayerId,
    change: RankChange,
    expires: Instant,
}

/// Rank-ordered view of all known players
#[derive(Debug, Clone, Default)]
pub struct Standings {
    order: Vec<PlayerId>,
    flashes: Vec<Flash>,
}

impl Standings {
    /// Creates an empty standings view
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-ranks from a full set of scores and classifies the deltas
    ///
    /// `scores` must be the complete player set of the snapshot in a
    /// deterministic order (the session roster order). Returns the players
    /// whose position changed, in new-ranking order; unchanged players and
    /// newcomers are not reported. Markers for the changed players stay
    /// visible until
    /// [`RANK_FLASH_WINDOW`](constants::ranking::RANK_FLASH_WINDOW) past
    /// `now`.
    pub fn apply(&mut self, scores: &[(PlayerId, u64)], now: Instant) -> Vec<(PlayerId, RankChange)> {
        let points: HashMap<&PlayerId, u64> = scores.iter().map(|(id, p)| (id, *p)).collect();
        let previous: HashMap<PlayerId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect();

        // survivors keep their prior relative order, newcomers follow in
        // input order; the stable sort then only reorders on point changes
        let mut ranked = self
            .order
            .iter()
            .filter_map(|id| points.get(id).map(|p| (id.clone(), *p)))
            .collect_vec();
        ranked.extend(
            scores
                .iter()
                .filter(|(id, _)| !previous.contains_key(id))
                .cloned(),
        );
        ranked.sort_by(|(_, a), (_, b)| b.cmp(a));

        self.order = ranked.into_iter().map(|(id, _)| id).collect_vec();

        let changes = self
            .order
            .iter()
            .enumerate()
            .filter_map(|(position, id)| {
                let old = *previous.get(id)?;
                match position.cmp(&old) {
                    std::cmp::Ordering::Less => Some((id.clone(), RankChange::Up)),
                    std::cmp::Ordering::Greater => Some((id.clone(), RankChange::Down)),
                    std::cmp::Ordering::Equal => None,
                }
            })
            .collect_vec();

        self.flashes.retain(|flash| {
            self.order.contains(&flash.player)
                && !changes.iter().any(|(id, _)| *id == flash.player)
        });
        for (player, change) in &changes {
            self.flashes.push(Flash {
                player: player.clone(),
                change: *change,
                expires: now + constants::ranking::RANK_FLASH_WINDOW,
            });
        }

        changes
    }

    /// The current ranking, best first
    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    /// A player's current position, zero-based
    pub fn position(&self, player: &PlayerId) -> Option<usize> {
        self.order.iter().position(|id| id == player)
    }

    /// Unexpired rank-change markers, in ranking order
    pub fn flashes(&self, now: Instant) -> Vec<(PlayerId, RankChange)> {
        self.order
            .iter()
            .filter_map(|id| {
                self.flashes
                    .iter()
                    .find(|flash| flash.player == *id && flash.expires > now)
                    .map(|flash| (flash.player.clone(), flash.change))
            })
            .collect_vec()
    }

    /// Drops markers whose display window has passed
    pub fn sweep(&mut self, now: Instant) {
        self.flashes.retain(|flash| flash.expires > now);
    }
}
