//! Persisted client state
//!
//! A small slice of state survives a reload: the last lobby code and
//! username (used for automatic rejoin) and the last chosen settings. The
//! engine talks to a [`Persistence`] implementation instead of any concrete
//! storage; hosts back it with whatever the platform offers. Rejoin state is
//! cleared on an explicit leave and when the server answers a rejoin with an
//! invalid or not-found response.

use serde::{Deserialize, Serialize};

use super::{code::LobbyCode, settings::GameSettings};

/// The lobby membership to re-attempt after a reload or reconnect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinState {
    /// Code of the lobby last joined
    pub code: LobbyCode,
    /// Username used in that lobby
    pub username: String,
}

/// Storage for the client state that outlives a session
pub trait Persistence {
    /// The persisted rejoin slot, if any
    fn rejoin(&self) -> Option<RejoinState>;

    /// Saves the rejoin slot
    fn set_rejoin(&mut self, state: RejoinState);

    /// Clears the rejoin slot
    fn clear_rejoin(&mut self);

    /// The last chosen settings, if any
    fn settings(&self) -> Option<GameSettings>;

    /// Saves the last chosen settings
    fn set_settings(&mut self, settings: GameSettings);
}

/// In-memory [`Persistence`] implementation
///
/// Suitable for tests and for hosts without durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rejoin: Option<RejoinState>,
    settings: Option<GameSettings>,
}

impl Persistence for MemoryStore {
    fn rejoin(&self) -> Option<RejoinState> {
        self.rejoin.clone()
    }

    fn set_rejoin(&mut self, state: RejoinState) {
        self.rejoin = Some(state);
    }

    fn clear_rejoin(&mut self) {
        self.rejoin = None;
    }

    fn settings(&self) -> Option<GameSettings> {
        self.settings
    }

    fn set_settings(&mut self, settings: GameSettings) {
        self.settings = Some(settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejoin_round_trip() {
        let mut store = MemoryStore::default();
        assert_eq!(store.rejoin(), None);

        let state = RejoinState {
            code: "wx7q".parse().unwrap(),
            username: "ada".to_owned(),
        };
        store.set_rejoin(state.clone());
        assert_eq!(store.rejoin(), Some(state));

        store.clear_rejoin();
        assert_eq!(store.rejoin(), None);
    }

    #[test]
    fn test_settings_survive_rejoin_clear() {
        let mut store = MemoryStore::default();
        store.set_settings(GameSettings::default());
        store.clear_rejoin();
        assert_eq!(store.settings(), Some(GameSettings::default()));
    }

    #[test]
    fn test_rejoin_state_wire_shape() {
        let state = RejoinState {
            code: "AB12".parse().unwrap(),
            username: "ada".to_owned(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["code"], "ab12");
        assert_eq!(json["username"], "ada");
    }
}
