//! Session state machine
//!
//! The session is the single owner of everything the client knows: the
//! transport, the canvas pipeline, the round clock and the lobby context.
//! Server pushes are applied as whole snapshots; local commands are pure
//! requests and never change state until the server answers.

use super::clock::{
    Banner, ClockEvent, CountdownOverlay, CountdownStep, RoundClock, TimeLevel,
};
use crate::canvas::{FrameKind, OutboundFrame, Point, StrokePipeline, Surface};
use crate::error::ClientError;
use crate::lobby::{standings, Lobby, LobbyStatus, Prediction, Standing};
use crate::network::{Command, ConnectionPhase, Event, Transport, TransportEvent};
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::time::{Duration, Instant};

/// Activity feed entries kept for the log panel
pub const LOG_CAPACITY: usize = 50;

/// Announced when a round winner has no username
const UNKNOWN_WINNER: &str = "Unknown";

/// Where the client is in the lobby/round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unauthenticated,
    Idle,
    LobbyWaiting,
    Starting,
    Playing,
    RoundInterval,
    GameOver,
}

impl Phase {
    /// Whether the client holds a lobby in this phase
    pub fn in_lobby(&self) -> bool {
        matches!(
            self,
            Phase::LobbyWaiting
                | Phase::Starting
                | Phase::Playing
                | Phase::RoundInterval
                | Phase::GameOver
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Unauthenticated => "not signed in",
            Phase::Idle => "idle",
            Phase::LobbyWaiting => "waiting in lobby",
            Phase::Starting => "starting",
            Phase::Playing => "playing",
            Phase::RoundInterval => "between rounds",
            Phase::GameOver => "game over",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who the server says we are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub id: String,
    pub display_name: String,
}

/// The round in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundContext {
    /// `None` when the server omitted it and auto-numbering is off
    pub number: Option<u32>,
    pub word: String,
    pub duration_seconds: u32,
}

/// Outcome shown on the game-over panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    pub winner: Option<String>,
    /// Highest score first
    pub standings: Vec<Standing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Sound cues, as the browser client plays them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    RoundStart,
    CorrectGuess,
    RoundWin,
    GameOver,
    TimerWarning,
    Countdown,
    Error,
    Click,
}

/// Discrete things that happened, for the View and Feedback sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected,
    Disconnected,
    Authenticated { username: String },
    LobbyEntered { lobby_id: String },
    LobbyLeft,
    PlayerJoined { username: String },
    PlayerLeft { username: String },
    Countdown { value: u32 },
    RoundStarted { number: Option<u32>, word: String },
    LowTime { level: TimeLevel },
    TimeUp,
    CorrectGuess,
    RoundWon { winner: String },
    /// Round ended without a winner
    RoundTimedOut,
    GameOver { winner: Option<String> },
    ServerError { message: String, code: Option<String> },
    /// A local operation failed
    Fault { message: String, transport: bool },
    CommandSent { command: &'static str },
}

impl Notification {
    pub fn cue(&self) -> Option<Cue> {
        match self {
            Notification::RoundStarted { .. } => Some(Cue::RoundStart),
            Notification::CorrectGuess => Some(Cue::CorrectGuess),
            Notification::RoundWon { .. } => Some(Cue::RoundWin),
            Notification::GameOver { .. } => Some(Cue::GameOver),
            Notification::LowTime { .. } => Some(Cue::TimerWarning),
            Notification::Countdown { .. } => Some(Cue::Countdown),
            Notification::ServerError { .. } | Notification::Fault { .. } => Some(Cue::Error),
            Notification::CommandSent { .. } => Some(Cue::Click),
            _ => None,
        }
    }

    /// One-line description for status bars
    pub fn summary(&self) -> String {
        match self {
            Notification::Connected => "Connected".to_string(),
            Notification::Disconnected => "Disconnected, reconnecting...".to_string(),
            Notification::Authenticated { username } => format!("Signed in as {}", username),
            Notification::LobbyEntered { lobby_id } => format!("In lobby {}", lobby_id),
            Notification::LobbyLeft => "Left the lobby".to_string(),
            Notification::PlayerJoined { username } => format!("{} joined", username),
            Notification::PlayerLeft { username } => format!("{} left", username),
            Notification::Countdown { value } => format!("Starting in {}", value),
            Notification::RoundStarted { number: Some(n), word } => {
                format!("Round {}: draw {}", n, word)
            }
            Notification::RoundStarted { number: None, word } => format!("Draw {}", word),
            Notification::LowTime { level: TimeLevel::Critical } => "Hurry!".to_string(),
            Notification::LowTime { .. } => "Time is running out".to_string(),
            Notification::TimeUp => "Time's up!".to_string(),
            Notification::CorrectGuess => "Correct!".to_string(),
            Notification::RoundWon { winner } => format!("{} wins the round!", winner),
            Notification::RoundTimedOut => "No winner this round".to_string(),
            Notification::GameOver { winner: Some(winner) } => format!("{} wins the game!", winner),
            Notification::GameOver { winner: None } => "Game over, no winner".to_string(),
            Notification::ServerError { message, .. } => message.clone(),
            Notification::Fault { message, .. } => message.clone(),
            Notification::CommandSent { command } => format!("Sent {}", command),
        }
    }
}

/// Everything a view needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub connection: ConnectionPhase,
    pub phase: Phase,
    pub identity: Option<&'a PlayerIdentity>,
    pub lobby_id: Option<&'a str>,
    pub lobby: Option<&'a Lobby>,
    pub round: Option<&'a RoundContext>,
    /// Last known round number (0 before the first round)
    pub round_number: u32,
    pub time_remaining: Option<u32>,
    pub time_level: TimeLevel,
    pub time_up: bool,
    pub standings: &'a [Standing],
    pub final_result: Option<&'a FinalResult>,
    pub predictions: &'a [Prediction],
    pub available_lobbies: &'a [Lobby],
    pub countdown: Option<u32>,
    pub banner: Option<&'a str>,
    pub log: &'a VecDeque<LogEntry>,
    pub canvas: &'a Surface,
    pub eraser: bool,
}

/// Renders snapshots and shows notifications
pub trait View {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> io::Result<()>;
    fn notify(&mut self, notification: &Notification);
}

/// Reacts to notifications (sound, bell, haptics)
pub trait Feedback {
    fn react(&mut self, notification: &Notification);
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Authenticate automatically on every connect
    pub username: Option<String>,
    /// Number rounds locally when the server omits the number
    pub round_fallback: bool,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub throttle: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            username: None,
            round_fallback: true,
            canvas_width: crate::canvas::DEFAULT_WIDTH,
            canvas_height: crate::canvas::DEFAULT_HEIGHT,
            throttle: crate::canvas::DEFAULT_THROTTLE,
        }
    }
}

/// Mutable session state, kept apart from the collaborators so a snapshot
/// can borrow it while the view is borrowed mutably
#[derive(Debug, Default)]
struct SessionContext {
    phase: Phase,
    identity: Option<PlayerIdentity>,
    lobby_id: Option<String>,
    lobby: Option<Lobby>,
    round: Option<RoundContext>,
    round_counter: u32,
    standings: Vec<Standing>,
    final_result: Option<FinalResult>,
    predictions: Vec<Prediction>,
    available_lobbies: Vec<Lobby>,
    banner: Option<Banner>,
    time_up: bool,
    log: VecDeque<LogEntry>,
}

impl SessionContext {
    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry { level, message });
    }

    /// Drop everything tied to the current lobby
    fn forget_lobby(&mut self) {
        self.lobby_id = None;
        self.lobby = None;
        self.round = None;
        self.round_counter = 0;
        self.standings.clear();
        self.final_result = None;
        self.predictions.clear();
        self.banner = None;
        self.time_up = false;
    }
}

fn capture<'a>(
    ctx: &'a SessionContext,
    pipeline: &'a StrokePipeline,
    clock: &RoundClock,
    countdown: &CountdownOverlay,
    connection: ConnectionPhase,
    now: Instant,
) -> Snapshot<'a> {
    let time_remaining = ctx
        .round
        .as_ref()
        .map(|round| clock.remaining().unwrap_or(round.duration_seconds));
    Snapshot {
        connection,
        phase: ctx.phase,
        identity: ctx.identity.as_ref(),
        lobby_id: ctx.lobby_id.as_deref(),
        lobby: ctx.lobby.as_ref(),
        round: ctx.round.as_ref(),
        round_number: ctx.round_counter,
        time_remaining,
        time_level: time_remaining
            .map(TimeLevel::for_remaining)
            .unwrap_or(TimeLevel::Normal),
        time_up: ctx.time_up,
        standings: &ctx.standings,
        final_result: ctx.final_result.as_ref(),
        predictions: &ctx.predictions,
        available_lobbies: &ctx.available_lobbies,
        countdown: countdown.value(),
        banner: ctx
            .banner
            .as_ref()
            .filter(|banner| banner.is_visible(now))
            .map(|banner| banner.message.as_str()),
        log: &ctx.log,
        canvas: pipeline.surface(),
        eraser: pipeline.is_eraser(),
    }
}

/// The client session
pub struct Session<T: Transport, V: View, F: Feedback> {
    transport: T,
    view: V,
    feedback: F,
    options: SessionOptions,
    ctx: SessionContext,
    pipeline: StrokePipeline,
    clock: RoundClock,
    countdown: CountdownOverlay,
}

impl<T: Transport, V: View, F: Feedback> Session<T, V, F> {
    pub fn new(transport: T, view: V, feedback: F, options: SessionOptions) -> Self {
        let pipeline =
            StrokePipeline::new(options.canvas_width, options.canvas_height, options.throttle);
        Self {
            transport,
            view,
            feedback,
            options,
            ctx: SessionContext::default(),
            pipeline,
            clock: RoundClock::new(),
            countdown: CountdownOverlay::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.ctx.phase
    }

    pub fn available_lobbies(&self) -> &[Lobby] {
        &self.ctx.available_lobbies
    }

    pub fn pipeline(&self) -> &StrokePipeline {
        &self.pipeline
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    /// Render the current state
    pub fn present(&mut self, now: Instant) -> io::Result<()> {
        let connection = self.transport.phase();
        let snapshot = capture(
            &self.ctx,
            &self.pipeline,
            &self.clock,
            &self.countdown,
            connection,
            now,
        );
        self.view.render(&snapshot)
    }

    /// Apply everything the transport delivered since the last pump
    pub fn pump(&mut self, now: Instant) {
        for event in self.transport.poll() {
            self.handle(event, now);
        }
    }

    /// Advance the round clock, the countdown overlay and the banner
    pub fn tick(&mut self, now: Instant) {
        for event in self.clock.poll(now) {
            match event {
                ClockEvent::Tick { .. } => {}
                ClockEvent::LowTime { level } => self.notify(Notification::LowTime { level }),
                ClockEvent::Expired => {
                    self.ctx.time_up = true;
                    self.log(LogLevel::Info, "Time's up!");
                    self.notify(Notification::TimeUp);
                }
            }
        }
        for step in self.countdown.poll(now) {
            if let CountdownStep::Show(value) = step {
                self.notify(Notification::Countdown { value });
            }
        }
        if self
            .ctx
            .banner
            .as_ref()
            .is_some_and(|banner| !banner.is_visible(now))
        {
            self.ctx.banner = None;
        }
    }

    pub fn handle(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Disconnected => self.on_disconnected(),
            TransportEvent::Event(event) => self.apply(event, now),
            TransportEvent::Rejected(error) => self.surface_error(&ClientError::from(error)),
        }
    }

    fn on_connected(&mut self) {
        let resumed = self.ctx.identity.is_some() || self.ctx.lobby_id.is_some();
        self.clock.stop();
        self.countdown.cancel();
        let log = std::mem::take(&mut self.ctx.log);
        self.ctx = SessionContext {
            log,
            ..SessionContext::default()
        };
        tracing::debug!(resumed, "session reset on connect");

        self.log(LogLevel::Success, "Connected to server");
        if resumed {
            self.log(LogLevel::Info, "Session was reset, join a lobby again");
        }
        self.notify(Notification::Connected);

        if let Some(username) = self.options.username.clone() {
            if let Err(e) = self.authenticate(&username) {
                self.surface_error(&e);
            }
        }
    }

    fn on_disconnected(&mut self) {
        self.clock.stop();
        self.countdown.cancel();
        self.log(LogLevel::Error, "Disconnected from server");
        self.notify(Notification::Disconnected);
    }

    fn apply(&mut self, event: Event, now: Instant) {
        match event {
            Event::Connected { message } => {
                if let Some(message) = message {
                    self.log(LogLevel::Info, message);
                }
            }
            Event::Authenticated {
                player_id,
                username,
            } => {
                self.ctx.identity = Some(PlayerIdentity {
                    id: player_id,
                    display_name: username.clone(),
                });
                if self.ctx.phase == Phase::Unauthenticated {
                    self.set_phase(Phase::Idle);
                }
                self.log(LogLevel::Success, format!("Authenticated as {}", username));
                self.notify(Notification::Authenticated { username });
            }
            Event::LobbyCreated { lobby_id, lobby } => {
                self.enter_lobby(lobby_id, lobby, "Created lobby");
            }
            Event::JoinedLobby { lobby_id, lobby } => {
                self.enter_lobby(lobby_id, lobby, "Joined lobby");
            }
            Event::PlayerJoined { username, lobby } => {
                if self.apply_snapshot(lobby) {
                    self.log(LogLevel::Info, format!("{} joined the lobby", username));
                    self.notify(Notification::PlayerJoined { username });
                }
            }
            Event::PlayerLeft { username, lobby } => {
                if self.apply_snapshot(lobby) {
                    self.log(LogLevel::Info, format!("{} left the lobby", username));
                    self.notify(Notification::PlayerLeft { username });
                }
            }
            Event::PlayerReadyUpdate { username, lobby } => {
                if self.apply_snapshot(lobby) {
                    self.log(LogLevel::Info, format!("{} is ready", username));
                }
            }
            Event::PlayerReadyForNext { username, lobby } => {
                if self.apply_snapshot(lobby) {
                    self.log(LogLevel::Info, format!("{} wants to play again", username));
                }
            }
            Event::LobbySettingsUpdated { lobby } => {
                if self.apply_snapshot(lobby) {
                    if let Some(lobby) = &self.ctx.lobby {
                        let message = format!("Game length set to {} rounds", lobby.max_rounds());
                        self.log(LogLevel::Info, message);
                    }
                }
            }
            Event::LeftLobby => {
                self.clock.stop();
                self.countdown.cancel();
                self.ctx.forget_lobby();
                let next = if self.ctx.identity.is_some() {
                    Phase::Idle
                } else {
                    Phase::Unauthenticated
                };
                self.set_phase(next);
                self.log(LogLevel::Info, "Left the lobby");
                self.notify(Notification::LobbyLeft);
            }
            Event::GameStarting { countdown } => {
                if !matches!(self.ctx.phase, Phase::LobbyWaiting | Phase::GameOver) {
                    tracing::debug!(phase = %self.ctx.phase, "ignoring game_starting");
                    return;
                }
                self.ctx.standings.clear();
                self.ctx.final_result = None;
                self.ctx.predictions.clear();
                self.ctx.round_counter = 0;
                self.set_phase(Phase::Starting);
                self.log(LogLevel::Info, format!("Game starting in {}...", countdown));
                if let CountdownStep::Show(value) = self.countdown.start(countdown, now) {
                    self.notify(Notification::Countdown { value });
                }
            }
            Event::RoundStart {
                round_number,
                word,
                duration,
            } => self.start_round(round_number, word, duration, now),
            Event::AiPrediction {
                predictions,
                is_correct,
            } => self.apply_predictions(predictions, is_correct, false),
            Event::SubmissionResult {
                predictions,
                is_correct,
            } => self.apply_predictions(predictions, is_correct, true),
            Event::RoundEnd {
                winner_id,
                winner_username,
                scores,
            } => {
                if !self.ctx.phase.in_lobby() {
                    tracing::debug!("ignoring round_end outside a lobby");
                    return;
                }
                self.clock.stop();
                if let Some(scores) = scores {
                    self.ctx.standings = standings(&scores);
                }
                self.ctx.round = None;

                match winner_id {
                    Some(winner_id) => {
                        let winner = match winner_username {
                            Some(name) => name,
                            None => {
                                let short: String = winner_id.chars().take(8).collect();
                                self.log(LogLevel::Info, format!("Round won by player {}", short));
                                UNKNOWN_WINNER.to_string()
                            }
                        };
                        let message = format!("{} wins the round!", winner);
                        self.ctx.banner = Some(Banner::new(message.clone(), now));
                        self.log(LogLevel::Success, message);
                        self.notify(Notification::RoundWon { winner });
                    }
                    None => {
                        self.log(LogLevel::Info, "Time's up! No winner this round");
                        self.notify(Notification::RoundTimedOut);
                    }
                }

                if self.ctx.phase == Phase::Playing {
                    self.set_phase(Phase::RoundInterval);
                }
            }
            Event::GameEnd {
                winner_username,
                final_scores,
                lobby,
            } => {
                if !self.ctx.phase.in_lobby() {
                    tracing::debug!("ignoring game_end outside a lobby");
                    return;
                }
                self.clock.stop();
                self.countdown.cancel();
                self.ctx.round = None;
                self.ctx.round_counter = 0;
                if let Some(lobby) = lobby {
                    self.ctx.lobby = Some(lobby);
                }
                if let Some(scores) = final_scores {
                    self.ctx.standings = standings(&scores);
                }
                self.ctx.final_result = Some(FinalResult {
                    winner: winner_username.clone(),
                    standings: self.ctx.standings.clone(),
                });
                self.set_phase(Phase::GameOver);

                let message = match &winner_username {
                    Some(winner) => format!("Game over! Winner: {}", winner),
                    None => "Game over! No winner".to_string(),
                };
                self.log(LogLevel::Success, message);
                self.notify(Notification::GameOver {
                    winner: winner_username,
                });
            }
            Event::Error { message, code } => {
                tracing::warn!(?code, %message, "server error");
                self.log(LogLevel::Error, message.clone());
                self.notify(Notification::ServerError { message, code });
            }
            Event::AvailableLobbies { lobbies } => {
                let message = match lobbies.len() {
                    0 => "No lobbies available".to_string(),
                    1 => "1 lobby available".to_string(),
                    n => format!("{} lobbies available", n),
                };
                self.ctx.available_lobbies = lobbies;
                self.log(LogLevel::Info, message);
            }
        }
    }

    fn enter_lobby(&mut self, lobby_id: String, lobby: Option<Lobby>, verb: &str) {
        match self.ctx.phase {
            Phase::Idle => {
                self.ctx.forget_lobby();
                self.ctx.lobby_id = Some(lobby_id.clone());
                self.ctx.lobby = lobby;
                self.set_phase(Phase::LobbyWaiting);
                self.log(LogLevel::Success, format!("{}: {}", verb, lobby_id));
                self.notify(Notification::LobbyEntered { lobby_id });
            }
            phase if phase.in_lobby() && self.ctx.lobby_id.as_deref() == Some(lobby_id.as_str()) => {
                self.apply_snapshot(lobby);
            }
            phase => {
                tracing::warn!(%phase, %lobby_id, "ignoring lobby entry");
            }
        }
    }

    /// Replace the lobby snapshot; returns whether the client is in a lobby
    fn apply_snapshot(&mut self, lobby: Option<Lobby>) -> bool {
        if !self.ctx.phase.in_lobby() {
            tracing::debug!(phase = %self.ctx.phase, "ignoring lobby snapshot");
            return false;
        }
        let Some(lobby) = lobby else {
            return true;
        };
        if let Some(current) = self.ctx.lobby_id.as_deref() {
            if current != lobby.id {
                tracing::warn!(current, pushed = %lobby.id, "ignoring snapshot for another lobby");
                return false;
            }
        }
        if self.ctx.phase == Phase::GameOver && lobby.status == LobbyStatus::Waiting {
            self.ctx.final_result = None;
            self.set_phase(Phase::LobbyWaiting);
        }
        self.ctx.lobby = Some(lobby);
        true
    }

    fn start_round(&mut self, round_number: Option<u32>, word: String, duration: u32, now: Instant) {
        if !self.ctx.phase.in_lobby() {
            tracing::warn!(phase = %self.ctx.phase, "ignoring round_start outside a lobby");
            return;
        }
        let number = round_number.or_else(|| {
            self.options
                .round_fallback
                .then_some(self.ctx.round_counter + 1)
        });
        if let Some(number) = number {
            self.ctx.round_counter = number;
        }

        self.countdown.cancel();
        if self.clock.is_running() {
            tracing::debug!("round clock restarted before expiry");
        }
        self.clock.start(duration, now);
        self.pipeline.clear();
        self.ctx.predictions.clear();
        self.ctx.time_up = false;
        self.ctx.round = Some(RoundContext {
            number,
            word: word.clone(),
            duration_seconds: duration,
        });
        self.set_phase(Phase::Playing);

        let message = match number {
            Some(n) => format!("Round {} started! Draw: {}", n, word),
            None => format!("Round started! Draw: {}", word),
        };
        self.log(LogLevel::Info, message);
        self.notify(Notification::RoundStarted { number, word });
    }

    fn apply_predictions(&mut self, predictions: Vec<Prediction>, is_correct: bool, submitted: bool) {
        if !self.ctx.phase.in_lobby() {
            return;
        }
        self.ctx.predictions = predictions;
        if is_correct {
            self.log(LogLevel::Success, "Correct! The AI recognized your drawing");
            self.notify(Notification::CorrectGuess);
        } else if submitted {
            self.log(LogLevel::Info, "Not quite, keep drawing");
        }
    }

    fn set_phase(&mut self, next: Phase) {
        if self.ctx.phase != next {
            tracing::debug!(from = %self.ctx.phase, to = %next, "phase transition");
            self.ctx.phase = next;
        }
    }

    fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.ctx.push_log(level, message.into());
    }

    fn notify(&mut self, notification: Notification) {
        self.view.notify(&notification);
        self.feedback.react(&notification);
    }

    /// Report a failed operation to the log panel and the sinks
    pub fn surface_error(&mut self, error: &ClientError) {
        tracing::warn!(%error, "operation failed");
        let message = error.to_string();
        self.log(LogLevel::Error, message.clone());
        self.notify(Notification::Fault {
            message,
            transport: error.is_transport_fault(),
        });
    }

    fn require(&self, command: &'static str, allowed: bool) -> Result<(), ClientError> {
        if allowed {
            Ok(())
        } else {
            Err(ClientError::Unavailable {
                command,
                phase: self.ctx.phase,
            })
        }
    }

    fn send(&mut self, command: Command) -> Result<(), ClientError> {
        self.transport.send(&command)?;
        tracing::debug!(command = command.name(), "command sent");
        self.notify(Notification::CommandSent {
            command: command.name(),
        });
        Ok(())
    }

    pub fn authenticate(&mut self, username: &str) -> Result<(), ClientError> {
        self.require("authenticate", self.ctx.phase == Phase::Unauthenticated)?;
        self.send(Command::Authenticate {
            username: username.trim().to_string(),
        })
    }

    fn can_enter_lobby(&self) -> bool {
        self.ctx.identity.is_some() && !self.ctx.phase.in_lobby()
    }

    pub fn create_lobby(&mut self) -> Result<(), ClientError> {
        self.require("create_lobby", self.can_enter_lobby())?;
        self.send(Command::CreateLobby)
    }

    pub fn join_lobby(&mut self, lobby_id: &str) -> Result<(), ClientError> {
        self.require("join_lobby", self.can_enter_lobby())?;
        self.send(Command::JoinLobby {
            lobby_id: lobby_id.trim().to_string(),
        })
    }

    pub fn request_lobbies(&mut self) -> Result<(), ClientError> {
        self.send(Command::GetAvailableLobbies)
    }

    pub fn player_ready(&mut self) -> Result<(), ClientError> {
        self.require("player_ready", self.ctx.phase == Phase::LobbyWaiting)?;
        self.send(Command::PlayerReady)
    }

    pub fn play_again(&mut self) -> Result<(), ClientError> {
        self.require("play_again", self.ctx.phase == Phase::GameOver)?;
        self.send(Command::PlayAgain)
    }

    /// `play_again` after a game, `player_ready` otherwise
    pub fn ready(&mut self) -> Result<(), ClientError> {
        if self.ctx.phase == Phase::GameOver {
            self.play_again()
        } else {
            self.player_ready()
        }
    }

    pub fn leave_lobby(&mut self) -> Result<(), ClientError> {
        self.require("leave_lobby", self.ctx.phase.in_lobby())?;
        self.send(Command::LeaveLobby)
    }

    /// `None` restores the server default
    pub fn set_max_rounds(&mut self, max_rounds: Option<u32>) -> Result<(), ClientError> {
        self.require(
            "set_max_rounds",
            matches!(self.ctx.phase, Phase::LobbyWaiting | Phase::GameOver),
        )?;
        self.send(Command::SetMaxRounds { max_rounds })
    }

    pub fn submit_drawing(&mut self) -> Result<(), ClientError> {
        self.require("submit_drawing", self.ctx.phase == Phase::Playing)?;
        let canvas_data = self.pipeline.submit()?;
        self.send(Command::SubmitDrawing { canvas_data })?;
        self.log(LogLevel::Info, "Drawing submitted");
        Ok(())
    }

    pub fn pointer_down(&mut self, point: Point) {
        self.pipeline.begin(point);
    }

    pub fn pointer_move(&mut self, point: Point, now: Instant) -> Result<(), ClientError> {
        if let Some(frame) = self.pipeline.extend(point, now)? {
            self.transmit(frame)?;
        }
        Ok(())
    }

    pub fn pointer_up(&mut self, now: Instant) -> Result<(), ClientError> {
        if let Some(frame) = self.pipeline.end(now)? {
            self.transmit(frame)?;
        }
        Ok(())
    }

    pub fn pointer_leave(&mut self) {
        self.pipeline.leave();
    }

    pub fn pointer_enter(&mut self, point: Point) {
        self.pipeline.reenter(point);
    }

    pub fn toggle_eraser(&mut self) -> bool {
        self.pipeline.toggle_eraser()
    }

    pub fn clear_canvas(&mut self) {
        self.pipeline.clear();
    }

    /// Send a frame as `draw_update`; throttled frames are best-effort
    fn transmit(&mut self, frame: OutboundFrame) -> Result<(), ClientError> {
        if !self.ctx.phase.in_lobby() {
            return Ok(());
        }
        let kind = frame.kind;
        let command = Command::DrawUpdate {
            canvas_data: frame.canvas_data,
        };
        match self.transport.send(&command) {
            Ok(()) => Ok(()),
            Err(e) if kind == FrameKind::Throttled => {
                tracing::debug!(error = %e, "dropped throttled frame");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
