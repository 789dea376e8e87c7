//! Solo practice session
//!
//! A local, offline-arbited variant of the game: one player races the clock
//! with the same letter-tier progression as a live session. Word validity
//! still comes from the remote dictionary service — callers submit a word,
//! obtain a verdict at that boundary, and feed it back in — so this module
//! holds only the session state machine and scoring.

use web_time::Duration;

use super::{
    constants,
    settings::{self, GameSettings},
};

/// Lifecycle of a solo session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoloStatus {
    /// Choosing settings; nothing is running
    Settings,
    /// The clock is running
    Playing,
    /// Time ran out
    GameOver,
}

/// Dictionary verdict for one submitted word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The word is valid
    Accepted,
    /// The word was rejected
    Rejected {
        /// Human-readable rejection reason
        reason: String,
    },
}

/// One solo practice session
#[derive(Debug, Clone)]
pub struct SoloGame {
    settings: GameSettings,
    status: SoloStatus,
    elapsed_ms: u64,
    points: u64,
    letters: String,
    written: String,
    words: Vec<String>,
    error: Option<String>,
}

impl SoloGame {
    /// Creates a session on the settings screen
    pub fn new(settings: GameSettings) -> Self {
        Self {
            settings,
            status: SoloStatus::Settings,
            elapsed_ms: 0,
            points: 0,
            letters: String::new(),
            written: String::new(),
            words: Vec::new(),
            error: None,
        }
    }

    /// Starts (or restarts) the clock with a clean slate
    pub fn start(&mut self) {
        self.elapsed_ms = 0;
        self.points = 0;
        self.letters.clear();
        self.written.clear();
        self.words.clear();
        self.error = None;
        self.status = SoloStatus::Playing;
    }

    /// Advances the clock; flips to game over when the duration runs out
    pub fn tick(&mut self, delta: Duration) -> SoloStatus {
        if self.status == SoloStatus::Playing {
            self.elapsed_ms = (self.elapsed_ms + delta.as_millis() as u64).min(self.settings.duration);
            if self.elapsed_ms >= self.settings.duration {
                self.status = SoloStatus::GameOver;
            }
        }
        self.status
    }

    /// Updates the word in progress; clears any inline rejection
    pub fn write(&mut self, text: &str) {
        self.written = text.to_owned();
        self.error = None;
    }

    /// Applies the dictionary verdict for a submitted word
    ///
    /// Returns `true` when the word scored. An accepted word is recorded,
    /// earns [`POINTS_PER_WORD`](constants::solo::POINTS_PER_WORD), and
    /// clears the input; a rejection surfaces its reason inline.
    pub fn apply_verdict(&mut self, word: &str, verdict: Verdict) -> bool {
        if self.status != SoloStatus::Playing || word.trim().is_empty() {
            return false;
        }
        match verdict {
            Verdict::Accepted => {
                self.words.push(word.to_owned());
                self.points += constants::solo::POINTS_PER_WORD;
                self.written.clear();
                self.error = None;
                true
            }
            Verdict::Rejected { reason } => {
                self.error = Some(reason);
                false
            }
        }
    }

    /// Number of letters the player should hold at the current score
    pub fn required_letters(&self) -> usize {
        settings::required_letter_count(self.points, self.settings.letter_add_frequency)
    }

    /// Whether a new letter combination is due
    pub fn needs_letters(&self) -> bool {
        self.status == SoloStatus::Playing && self.required_letters() > self.letters.chars().count()
    }

    /// Picks one of the offered letter combinations at random and holds it
    ///
    /// Returns the chosen combination, or `None` when nothing was offered
    /// (the current letters are then kept, matching the degraded path of
    /// the original game).
    pub fn grant_letters(&mut self, combos: &[String]) -> Option<&str> {
        if combos.is_empty() {
            return None;
        }
        let pick = &combos[fastrand::usize(..combos.len())];
        self.letters = pick.clone();
        Some(self.letters.as_str())
    }

    /// Remaining time on the clock
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.settings.duration.saturating_sub(self.elapsed_ms))
    }

    /// The session's lifecycle status
    pub fn status(&self) -> SoloStatus {
        self.status
    }

    /// Current score
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Letters currently held
    pub fn letters(&self) -> &str {
        &self.letters
    }

    /// The word in progress
    pub fn written(&self) -> &str {
        &self.written
    }

    /// Words accepted so far
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The inline rejection reason, if one is showing
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The settings this session runs under
    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    /// Returns to the settings screen for another round
    pub fn play_again(&mut self) {
        self.status = SoloStatus::Settings;
    }
}
