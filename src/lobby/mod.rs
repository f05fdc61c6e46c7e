//! Lobby values pushed by the server
//!
//! Every type here is a value snapshot: the client replaces them wholesale
//! whenever the server pushes a new one and never edits a field in place.

use serde::Deserialize;
use std::collections::HashMap;

/// Rounds per game when the server reports neither an override nor a default
const BASE_ROUNDS: u32 = 5;

/// Extra rounds the server adds for every player beyond the second
const ROUNDS_PER_EXTRA_PLAYER: u32 = 3;

/// A player as listed in a lobby snapshot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Player {
    pub id: String,
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default, rename = "ready_for_next")]
    pub ready_for_next_game: bool,
    #[serde(default)]
    pub games_won: u32,
}

/// Server-side lifecycle of a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    #[default]
    Waiting,
    Ready,
    InGame,
    GameOver,
    #[serde(other)]
    Unknown,
}

impl LobbyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LobbyStatus::Waiting => "waiting",
            LobbyStatus::Ready => "ready",
            LobbyStatus::InGame => "in game",
            LobbyStatus::GameOver => "game over",
            LobbyStatus::Unknown => "unknown",
        }
    }
}

/// The game currently running inside a lobby
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct GameProgress {
    #[serde(default)]
    pub rounds_played: u32,
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

/// Authoritative lobby snapshot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Lobby {
    pub id: String,
    #[serde(default, rename = "state")]
    pub status: LobbyStatus,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub player_count: Option<u32>,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub default_rounds: Option<u32>,
    #[serde(default)]
    pub current_game: Option<GameProgress>,
}

impl Lobby {
    /// Number of rounds the next (or current) game will run
    pub fn max_rounds(&self) -> u32 {
        let running = self.current_game.as_ref().and_then(|game| game.max_rounds);
        if let Some(rounds) = running.or(self.max_rounds).or(self.default_rounds) {
            return rounds;
        }
        let players = self.player_count.unwrap_or(self.players.len() as u32);
        let extra = players.saturating_sub(2) * ROUNDS_PER_EXTRA_PLAYER;
        (BASE_ROUNDS + extra).max(1)
    }

    /// Rounds already played in the running game
    pub fn current_round(&self) -> u32 {
        self.current_game
            .as_ref()
            .map(|game| game.rounds_played)
            .unwrap_or(0)
    }
}

/// One entry of a score snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub player_id: String,
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoreEntry {
    pub username: String,
    #[serde(default)]
    pub score: i64,
}

/// Score snapshot keyed by player id, as sent in `round_end` and `game_end`
pub type ScoreTable = HashMap<String, ScoreEntry>;

/// Order a score table by score, highest first (ties broken by name)
pub fn standings(scores: &ScoreTable) -> Vec<Standing> {
    let mut ranked: Vec<Standing> = scores
        .iter()
        .map(|(player_id, entry)| Standing {
            player_id: player_id.clone(),
            username: entry.username.clone(),
            score: entry.score,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.username.cmp(&b.username))
    });
    ranked
}

/// A recognizer guess for the current drawing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub label: String,
    #[serde(default)]
    pub confidence: f32,
}

impl Prediction {
    /// Confidence as a percentage clamped to 0..=100
    pub fn percent(&self) -> f32 {
        (self.confidence * 100.0).clamp(0.0, 100.0)
    }
}
