//! Pending game invites
//!
//! Invites arrive through the social boundary and live here until the
//! invited game starts or the player dismisses them. The social subsystem
//! itself is out of scope; this is only the collection the engine keeps.

use super::identity::PlayerId;

/// One pending invite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    /// Who sent the invite
    pub sender_id: PlayerId,
    /// The sender's display name
    pub sender_username: String,
}

/// The set of invites awaiting a response
#[derive(Debug, Clone, Default)]
pub struct Invites {
    entries: Vec<Invite>,
}

impl Invites {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an invite push; repeated invites from the same sender collapse
    pub fn add(&mut self, sender_id: PlayerId, sender_username: impl Into<String>) {
        let invite = Invite {
            sender_id,
            sender_username: sender_username.into(),
        };
        if !self.entries.iter().any(|e| e.sender_id == invite.sender_id) {
            self.entries.push(invite);
        }
    }

    /// Drops an invite the player dismissed
    pub fn dismiss(&mut self, sender_id: &PlayerId) {
        self.entries.retain(|invite| invite.sender_id != *sender_id);
    }

    /// Drops invites whose game just started
    ///
    /// Called with the opponents of the starting session.
    pub fn on_game_started<'a>(&mut self, opponents: impl IntoIterator<Item = &'a PlayerId>) {
        for opponent in opponents {
            self.dismiss(opponent);
        }
    }

    /// The pending invites in arrival order
    pub fn entries(&self) -> &[Invite] {
        &self.entries
    }

    /// Whether no invite is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
