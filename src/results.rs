//! Terminal scoreboard compilation
//!
//! Converts the terminal results push into a rank-ordered scoreboard. The
//! winner is whoever the server named — a tie-breaking rule on the server is
//! authoritative and never re-derived here — while placement is computed
//! locally from points alone, so the two cannot desynchronize the displayed
//! order.

use itertools::Itertools;

use super::{
    game::{GameResults, GameSnapshot},
    identity::PlayerId,
};

/// One line of the final scoreboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardRow {
    /// Derived rank, starting at 1
    pub placement: usize,
    /// The player this row describes
    pub player_id: PlayerId,
    /// The player's display name
    pub username: String,
    /// Final point total
    pub points: u64,
    /// Whether this row is the local player
    pub is_self: bool,
    /// Whether the server named this player the winner
    pub is_winner: bool,
}

/// The compiled final scoreboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    /// The server-named winner
    pub winner: PlayerId,
    /// All players, best placement first
    pub rows: Vec<ScoreboardRow>,
}

impl Scoreboard {
    /// Compiles the scoreboard from terminal results
    ///
    /// Rows are sorted descending by points with a deterministic tie order
    /// (username, then id). `roster` is the last known projection and fills
    /// in a display name if the results omitted one.
    pub fn compile(
        results: &GameResults,
        roster: Option<&GameSnapshot>,
        self_id: &PlayerId,
    ) -> Self {
        let rows = results
            .scores
            .iter()
            .map(|(id, score)| {
                let username = if score.username.is_empty() {
                    roster
                        .and_then(|snapshot| snapshot.player(id))
                        .map_or_else(|| id.to_string(), |player| player.username.clone())
                } else {
                    score.username.clone()
                };
                (id.clone(), username, score.points)
            })
            .sorted_by(|(a_id, a_name, a_points), (b_id, b_name, b_points)| {
                b_points
                    .cmp(a_points)
                    .then_with(|| a_name.cmp(b_name))
                    .then_with(|| a_id.cmp(b_id))
            })
            .enumerate()
            .map(|(index, (player_id, username, points))| ScoreboardRow {
                placement: index + 1,
                is_self: player_id == *self_id,
                is_winner: player_id == results.winner,
                player_id,
                username,
                points,
            })
            .collect_vec();

        Self {
            winner: results.winner.clone(),
            rows,
        }
    }

    /// The local player's row
    pub fn self_row(&self) -> Option<&ScoreboardRow> {
        self.rows.iter().find(|row| row.is_self)
    }

    /// The winner's row
    pub fn winner_row(&self) -> Option<&ScoreboardRow> {
        self.rows.iter().find(|row| row.is_winner)
    }
}
