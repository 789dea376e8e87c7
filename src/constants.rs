//! Configuration constants for the session synchronization engine
//!
//! This module contains the protocol deadlines, display windows, and
//! configuration limits used throughout the engine so that every bound
//! lives in one place.

use web_time::Duration;

/// Transport session constants
pub mod session {
    use super::Duration;

    /// How long a single reconnect attempt may wait for the connected signal
    pub const RECONNECT_WAIT: Duration = Duration::from_secs(3);
}

/// Move arbitration constants
pub mod arbiter {
    use super::Duration;

    /// How long a submitted move may wait for its accept/reject response
    pub const MOVE_RESPONSE_TIMEOUT: Duration = Duration::from_millis(5000);
}

/// Lobby constants
pub mod lobby {
    use super::Duration;

    /// Exact length of a lobby code
    pub const CODE_LENGTH: usize = 4;
    /// Interval between automatic rejoin attempts after a reconnect
    pub const REJOIN_RETRY_INTERVAL: Duration = Duration::from_secs(2);
}

/// Ranking and standings constants
pub mod ranking {
    use super::Duration;

    /// How long a rank-change marker stays visible after a snapshot
    pub const RANK_FLASH_WINDOW: Duration = Duration::from_secs(2);
}

/// Game settings bounds
pub mod settings {
    /// Minimum session duration in milliseconds
    pub const MIN_DURATION_MS: u64 = 30_000;
    /// Maximum session duration in milliseconds
    pub const MAX_DURATION_MS: u64 = 600_000;
    /// Minimum points between letter grants
    pub const MIN_LETTER_ADD_FREQUENCY: u32 = 5;
    /// Maximum points between letter grants
    pub const MAX_LETTER_ADD_FREQUENCY: u32 = 50;
    /// Minimum points that end a session early
    pub const MIN_VICTORY_THRESHOLD: u32 = 10;
    /// Maximum points that end a session early
    pub const MAX_VICTORY_THRESHOLD: u32 = 1000;
    /// Default session duration in milliseconds
    pub const DEFAULT_DURATION_MS: u64 = 120_000;
    /// Default letter grant frequency in points
    pub const DEFAULT_LETTER_ADD_FREQUENCY: u32 = 10;
    /// Default victory threshold in points
    pub const DEFAULT_VICTORY_THRESHOLD: u32 = 100;
}

/// Solo practice session constants
pub mod solo {
    /// Points awarded per accepted word
    pub const POINTS_PER_WORD: u64 = 1;
}
