//! Lobby code parsing and normalization
//!
//! Lobby codes are short alphanumeric strings shared verbally or pasted by
//! players. Matching is case-insensitive; the canonical form is lower-case
//! and normalization happens before anything is transmitted, so joining with
//! `"AB12"` and `"ab12"` reaches the same lobby.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use super::constants;

/// A canonical (lower-case) lobby code
#[derive(Debug, Clone, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct LobbyCode(String);

/// Errors produced when parsing a lobby code
///
/// A malformed code is a local failure, distinct from the server's
/// `lobby_not_found` response; the two must never be merged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCodeError {
    /// The code does not have the required length
    #[error("lobby code must be exactly {} characters", constants::lobby::CODE_LENGTH)]
    Length,
    /// The code contains a character outside ASCII letters and digits
    #[error("lobby code may only contain letters and digits")]
    Charset,
}

impl LobbyCode {
    /// Returns the canonical lower-case form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LobbyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LobbyCode {
    type Err = ParseCodeError;

    /// Parses and normalizes a lobby code
    ///
    /// # Errors
    ///
    /// Returns [`ParseCodeError::Length`] when the trimmed input is not
    /// exactly four characters, and [`ParseCodeError::Charset`] when any
    /// character is not an ASCII letter or digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.chars().count() != constants::lobby::CODE_LENGTH {
            return Err(ParseCodeError::Length);
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseCodeError::Charset);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}
