//! Shared game configuration
//!
//! The lobby admin chooses these values and the server echoes them to every
//! participant; clients never trust a local edit before the echo. The letter
//! tier rule lives here as well because both the solo session and the
//! multiplayer display derive the held-letter requirement from points.

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Configuration shared by all players in a session
///
/// `duration` is in milliseconds. `letter_add_frequency` is the number of
/// points between letter grants, and `victory_threshold` ends the session
/// early when reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Session duration in milliseconds
    #[garde(range(min = 30_000, max = 600_000))]
    pub duration: u64,
    /// Points between letter grants
    #[garde(range(min = 5, max = 50))]
    pub letter_add_frequency: u32,
    /// Points that end the session early
    #[garde(range(min = 10, max = 1_000))]
    pub victory_threshold: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            duration: super::constants::settings::DEFAULT_DURATION_MS,
            letter_add_frequency: super::constants::settings::DEFAULT_LETTER_ADD_FREQUENCY,
            victory_threshold: super::constants::settings::DEFAULT_VICTORY_THRESHOLD,
        }
    }
}

/// Number of letters a player should hold at a given score
///
/// One letter is held from the start; another is granted every
/// `frequency` points.
pub fn required_letter_count(points: u64, frequency: u32) -> usize {
    debug_assert!(frequency > 0);
    (points / u64::from(frequency.max(1))) as usize + 1
}
