//! Terminal bell feedback

use crate::app::{Cue, Feedback, Notification};
use clap::ValueEnum;
use std::io::{self, Write};

/// Which cues ring the bell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FeedbackLevel {
    /// Every cue
    #[default]
    Rich,
    /// Round start, game over and errors only
    Minimal,
    Off,
}

impl FeedbackLevel {
    pub fn allows(&self, cue: Cue) -> bool {
        match self {
            FeedbackLevel::Rich => true,
            FeedbackLevel::Minimal => {
                matches!(cue, Cue::RoundStart | Cue::GameOver | Cue::Error)
            }
            FeedbackLevel::Off => false,
        }
    }
}

/// Rings the terminal bell for allowed cues
pub struct Bell<W: Write> {
    out: W,
    level: FeedbackLevel,
    muted: bool,
}

impl Bell<io::Stdout> {
    pub fn stdout(level: FeedbackLevel) -> Self {
        Self::new(io::stdout(), level)
    }
}

impl<W: Write> Bell<W> {
    pub fn new(out: W, level: FeedbackLevel) -> Self {
        Self {
            out,
            level,
            muted: false,
        }
    }

    /// Toggle sound; returns whether it is now on
    pub fn toggle(&mut self) -> bool {
        self.muted = !self.muted;
        !self.muted
    }

    pub fn is_enabled(&self) -> bool {
        !self.muted && self.level != FeedbackLevel::Off
    }
}

impl<W: Write> Feedback for Bell<W> {
    fn react(&mut self, notification: &Notification) {
        let Some(cue) = notification.cue() else {
            return;
        };
        if self.muted || !self.level.allows(cue) {
            return;
        }
        if let Err(e) = self.out.write_all(b"\x07").and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, ?cue, "bell failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_filters_cues() {
        let mut bell = Bell::new(Vec::new(), FeedbackLevel::Minimal);
        bell.react(&Notification::Countdown { value: 3 });
        bell.react(&Notification::RoundStarted {
            number: Some(1),
            word: "cat".to_string(),
        });
        bell.react(&Notification::LobbyLeft);
        assert_eq!(bell.out, b"\x07");
    }

    #[test]
    fn test_rich_rings_every_cue() {
        let mut bell = Bell::new(Vec::new(), FeedbackLevel::Rich);
        bell.react(&Notification::Countdown { value: 3 });
        bell.react(&Notification::CorrectGuess);
        bell.react(&Notification::Connected);
        assert_eq!(bell.out.len(), 2);
    }

    #[test]
    fn test_mute_toggle() {
        let mut bell = Bell::new(Vec::new(), FeedbackLevel::Rich);
        assert!(!bell.toggle());
        bell.react(&Notification::TimeUp);
        bell.react(&Notification::CorrectGuess);
        assert!(bell.out.is_empty());
        assert!(bell.toggle());
        assert!(bell.is_enabled());
    }

    #[test]
    fn test_off_never_rings() {
        let mut bell = Bell::new(Vec::new(), FeedbackLevel::Off);
        bell.react(&Notification::GameOver { winner: None });
        assert!(bell.out.is_empty());
        assert!(!bell.is_enabled());
    }
}
