//! DraWar - terminal client for the drawing-and-guessing game
//!
//! Draw with the mouse. The server's recognizer guesses.

mod app;
mod canvas;
mod config;
mod error;
mod lobby;
mod network;
mod tui;

use anyhow::{anyhow, Context};
use app::{intent_for, Answer, Intent, Prompt, PromptEvent, PromptKind, Session};
use canvas::{cell_to_client, DisplayRect};
use clap::Parser;
use config::{Args, Config};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use error::ClientError;
use network::Client;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};
use tui::{Bell, Tui, TuiView};

/// How long to wait for input before the next pump/tick/render pass
const FRAME_INTERVAL: Duration = Duration::from_millis(30);

type DrawarSession = Session<Client, TuiView, Bell<io::Stdout>>;

/// Left-button state across mouse events
#[derive(Debug, Default)]
struct Pointer {
    down: bool,
    inside: bool,
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args(Args::parse())?;
    init_tracing(&config.log_file)?;
    tracing::info!(server = %config.server, "starting drawar");

    let client = Client::connect(&config.server)
        .with_context(|| format!("invalid server address {}", config.server))?;

    let mut terminal = Tui::new()?;
    terminal.enter()?;

    let bell = Bell::stdout(config.feedback);
    let view = TuiView::new(terminal, bell.is_enabled());
    let mut session = Session::new(client, view, bell, config.session.clone());

    let result = run(&mut session);
    session.view_mut().close()?;
    tracing::info!("exiting");
    result
}

fn init_tracing(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    // The terminal belongs to the UI, so tracing goes to the file only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// Main event loop
fn run(session: &mut DrawarSession) -> anyhow::Result<()> {
    let mut pointer = Pointer::default();

    loop {
        let now = Instant::now();
        session.pump(now);
        session.tick(now);
        session.present(now)?;

        if !event::poll(FRAME_INTERVAL)? {
            continue;
        }
        match event::read()? {
            // Only handle key press events (not release)
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if on_key(session, key.code) {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => on_mouse(session, &mut pointer, mouse)?,
            _ => {}
        }
    }
}

/// Handle a key press; returns true when the user quits
fn on_key(session: &mut DrawarSession, code: KeyCode) -> bool {
    // An open prompt takes every key
    if let Some(event) = session.view_mut().prompt.as_mut().map(|p| p.key(code)) {
        match event {
            PromptEvent::Submitted(answer) => {
                session.view_mut().prompt = None;
                let result = match answer {
                    Answer::Username(name) => session.authenticate(&name),
                    Answer::LobbyId(id) => session.join_lobby(&id),
                    Answer::MaxRounds(rounds) => session.set_max_rounds(rounds),
                };
                report(session, result);
            }
            PromptEvent::Cancelled => session.view_mut().prompt = None,
            PromptEvent::Editing | PromptEvent::Invalid(_) => {}
        }
        return false;
    }

    let Some(intent) = intent_for(code, session.phase()) else {
        return false;
    };
    let result = match intent {
        Intent::Quit => return true,
        Intent::Open(kind) => {
            let initial = match kind {
                PromptKind::LobbyId => session
                    .available_lobbies()
                    .first()
                    .map(|lobby| lobby.id.clone())
                    .unwrap_or_default(),
                PromptKind::Username | PromptKind::MaxRounds => String::new(),
            };
            session.view_mut().prompt = Some(Prompt::new(kind, initial));
            Ok(())
        }
        Intent::CreateLobby => session.create_lobby(),
        Intent::ListLobbies => session.request_lobbies(),
        Intent::Ready => session.ready(),
        Intent::Leave => session.leave_lobby(),
        Intent::ToggleEraser => {
            session.toggle_eraser();
            Ok(())
        }
        Intent::ClearCanvas => {
            session.clear_canvas();
            Ok(())
        }
        Intent::SubmitDrawing => session.submit_drawing(),
        Intent::ToggleSound => {
            session.feedback_mut().toggle();
            let on = session.feedback_mut().is_enabled();
            session.view_mut().sound_on = on;
            Ok(())
        }
    };
    report(session, result);
    false
}

/// Translate terminal mouse events into pointer input on the canvas
fn on_mouse(
    session: &mut DrawarSession,
    pointer: &mut Pointer,
    mouse: MouseEvent,
) -> anyhow::Result<()> {
    let cells = session.view().canvas_rect()?;
    let display = DisplayRect::from_cells(cells.x, cells.y, cells.width, cells.height);
    let client = cell_to_client(mouse.column, mouse.row);
    let inside = display.contains(client);
    let surface = session.pipeline().surface();
    let point = display.to_backing(client, surface.width(), surface.height());
    let now = Instant::now();

    let result = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if inside => {
            pointer.down = true;
            pointer.inside = true;
            session.pointer_down(point);
            Ok(())
        }
        MouseEventKind::Drag(MouseButton::Left) if pointer.down => {
            if !inside {
                if pointer.inside {
                    pointer.inside = false;
                    session.pointer_leave();
                }
                Ok(())
            } else {
                if !pointer.inside {
                    pointer.inside = true;
                    session.pointer_enter(point);
                }
                session.pointer_move(point, now)
            }
        }
        MouseEventKind::Up(MouseButton::Left) if pointer.down => {
            pointer.down = false;
            session.pointer_up(now)
        }
        _ => Ok(()),
    };
    report(session, result);
    Ok(())
}

fn report(session: &mut DrawarSession, result: Result<(), ClientError>) {
    if let Err(e) = result {
        session.surface_error(&e);
    }
}
