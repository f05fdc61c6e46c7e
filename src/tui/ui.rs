//! UI rendering using ratatui
//!
//! One screen for every phase:
//! - Header: connection, identity, lobby, round, word and timer
//! - Canvas on the left, drawn with half blocks
//! - Side panels: players or open lobbies, scores, AI guesses, activity log
//! - Overlays: game-over panel, winner banner, countdown, text prompt

use super::canvas::CanvasWidget;
use crate::app::{LogLevel, Phase, Prompt, Snapshot, TimeLevel};
use crate::lobby::Lobby;
use crate::network::ConnectionPhase;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

/// Width of the side panel column
const SIDE_WIDTH: u16 = 36;

/// Width of the confidence bar in the predictions panel
const BAR_WIDTH: usize = 12;

/// UI state that lives outside the session
pub struct Chrome<'a> {
    pub prompt: Option<&'a Prompt>,
    pub notice: Option<&'a str>,
    pub sound_on: bool,
}

struct Areas {
    header: Rect,
    canvas_block: Rect,
    canvas: Rect,
    side: Rect,
    footer: Rect,
}

fn areas(area: Rect) -> Areas {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Canvas and side panels
            Constraint::Length(1), // Footer
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDE_WIDTH)])
        .split(layout[1]);

    let canvas_block = body[0];
    let inner = Block::default().borders(Borders::ALL).inner(canvas_block);
    // Square canvas: half blocks make each cell two pixels tall
    let width = inner.width.min(inner.height.saturating_mul(2));
    let height = (width / 2).max(1).min(inner.height);
    let canvas = Rect::new(inner.x, inner.y, width, height);

    Areas {
        header: layout[0],
        canvas_block,
        canvas,
        side: body[1],
        footer: layout[2],
    }
}

/// Where the canvas pixels are drawn for a frame of this size
pub fn canvas_area(area: Rect) -> Rect {
    areas(area).canvas
}

/// Render the whole screen
pub fn render(frame: &mut Frame, snapshot: &Snapshot<'_>, chrome: &Chrome<'_>) {
    let areas = areas(frame.area());

    render_header(frame, areas.header, snapshot);
    render_canvas(frame, areas.canvas_block, areas.canvas, snapshot);
    render_side(frame, areas.side, snapshot);
    render_footer(frame, areas.footer, snapshot, chrome);

    if snapshot.phase == Phase::GameOver {
        render_game_over(frame, snapshot);
    }
    if let Some(banner) = snapshot.banner {
        render_banner(frame, banner);
    }
    if let Some(value) = snapshot.countdown {
        render_countdown(frame, value);
    }
    if let Some(prompt) = chrome.prompt {
        render_prompt(frame, prompt);
    }
}

/// Render the header: title, status, round and timer
fn render_header(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(8),  // Logo
            Constraint::Min(20),    // Status
            Constraint::Length(30), // Round and word
            Constraint::Length(12), // Timer
        ])
        .split(inner);

    let logo = Paragraph::new("DraWar")
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Left);
    frame.render_widget(logo, header_layout[0]);

    let (dot, dot_color) = match snapshot.connection {
        ConnectionPhase::Connected => ("● online", Color::Green),
        ConnectionPhase::Disconnected => ("○ offline", Color::Red),
    };
    let mut status = vec![
        Span::styled(dot, Style::default().fg(dot_color)),
        Span::raw("  "),
    ];
    match snapshot.identity {
        Some(identity) => status.push(Span::styled(
            identity.display_name.clone(),
            Style::default().fg(Color::Cyan).bold(),
        )),
        None => status.push(Span::styled(
            "not signed in",
            Style::default().fg(Color::DarkGray),
        )),
    }
    if let Some(lobby_id) = snapshot.lobby_id {
        status.push(Span::styled(
            format!("  lobby {}", lobby_id),
            Style::default().fg(Color::White),
        ));
    }
    status.push(Span::styled(
        format!("  [{}]", snapshot.phase),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Line::from(status)), header_layout[1]);

    let round_text = match snapshot.round {
        Some(round) => {
            let number = match (round.number, snapshot.lobby) {
                (Some(n), Some(lobby)) => format!("Round {}/{}", n, lobby.max_rounds()),
                (Some(n), None) => format!("Round {}", n),
                (None, _) => "Round".to_string(),
            };
            format!("{}  Draw: {}", number, round.word.to_uppercase())
        }
        None if snapshot.round_number > 0 => format!("After round {}", snapshot.round_number),
        None => String::new(),
    };
    let round = Paragraph::new(round_text)
        .style(Style::default().fg(Color::Cyan).bold())
        .alignment(Alignment::Center);
    frame.render_widget(round, header_layout[2]);

    let (timer_text, timer_color) = if snapshot.time_up {
        ("Time's up!".to_string(), Color::Yellow)
    } else if let Some(remaining) = snapshot.time_remaining {
        let color = match snapshot.time_level {
            TimeLevel::Normal => Color::Green,
            TimeLevel::Warning => Color::Yellow,
            TimeLevel::Critical => Color::Red,
        };
        (format!("⏱ {}s", remaining), color)
    } else {
        (String::new(), Color::White)
    };
    let timer = Paragraph::new(timer_text)
        .style(Style::default().fg(timer_color).bold())
        .alignment(Alignment::Right);
    frame.render_widget(timer, header_layout[3]);
}

fn render_canvas(frame: &mut Frame, block_area: Rect, canvas: Rect, snapshot: &Snapshot<'_>) {
    let tool = if snapshot.eraser { "eraser" } else { "pen" };
    let border = if snapshot.phase == Phase::Playing {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!("Canvas ({})", tool));
    frame.render_widget(block, block_area);
    frame.render_widget(CanvasWidget::new(snapshot.canvas), canvas);
}

/// Render the side column
fn render_side(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let standings_height = if snapshot.standings.is_empty() {
        0
    } else {
        snapshot.standings.len().min(6) as u16 + 2
    };
    let predictions_height = if snapshot.predictions.is_empty() {
        0
    } else {
        snapshot.predictions.len().min(5) as u16 + 2
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),                     // Players or lobbies
            Constraint::Length(standings_height),   // Scores
            Constraint::Length(predictions_height), // AI guesses
            Constraint::Length(10),                 // Activity log
        ])
        .split(area);

    if snapshot.phase.in_lobby() {
        render_players(frame, layout[0], snapshot);
    } else {
        render_lobbies(frame, layout[0], snapshot);
    }
    if standings_height > 0 {
        render_standings(frame, layout[1], snapshot);
    }
    if predictions_height > 0 {
        render_predictions(frame, layout[2], snapshot);
    }
    render_log(frame, layout[3], snapshot);
}

fn panel(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title)
}

fn render_players(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let Some(lobby) = snapshot.lobby else {
        frame.render_widget(
            Paragraph::new("Waiting for lobby state...")
                .style(Style::default().fg(Color::DarkGray))
                .block(panel("Players".to_string())),
            area,
        );
        return;
    };

    let local_id = snapshot.identity.map(|identity| identity.id.as_str());
    let items: Vec<ListItem> = lobby
        .players
        .iter()
        .map(|player| {
            let ready = if snapshot.phase == Phase::GameOver {
                player.ready_for_next_game
            } else {
                player.is_ready
            };
            let (mark, mark_color) = if ready {
                ("✓", Color::Green)
            } else {
                ("·", Color::DarkGray)
            };
            let name_style = if Some(player.id.as_str()) == local_id {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", mark), Style::default().fg(mark_color)),
                Span::styled(player.display_name.clone(), name_style),
                Span::styled(
                    format!("  {} pts  {} wins", player.score, player.games_won),
                    Style::default().fg(Color::Gray),
                ),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(panel(players_title(lobby))), area);
}

fn players_title(lobby: &Lobby) -> String {
    let rounds = match lobby.current_game {
        Some(_) => format!("{}/{} played", lobby.current_round(), lobby.max_rounds()),
        None => format!("{} rounds", lobby.max_rounds()),
    };
    format!(
        "Players ({}) · {} · {}",
        lobby.players.len(),
        lobby.status.label(),
        rounds
    )
}

fn render_lobbies(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let items: Vec<ListItem> = if snapshot.available_lobbies.is_empty() {
        vec![ListItem::new("Press [l] to refresh").style(Style::default().fg(Color::DarkGray))]
    } else {
        snapshot
            .available_lobbies
            .iter()
            .map(|lobby| {
                let players = lobby.player_count.unwrap_or(lobby.players.len() as u32);
                ListItem::new(format!(
                    "{}  {} players  {}",
                    lobby.id,
                    players,
                    lobby.status.label()
                ))
            })
            .collect()
    };
    frame.render_widget(List::new(items).block(panel("Open lobbies".to_string())), area);
}

fn render_standings(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let items: Vec<ListItem> = snapshot
        .standings
        .iter()
        .take(6)
        .enumerate()
        .map(|(i, standing)| {
            let style = if i == 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(format!("{}. {}  {}", i + 1, standing.username, standing.score))
                .style(style)
        })
        .collect();
    frame.render_widget(List::new(items).block(panel("Scores".to_string())), area);
}

fn render_predictions(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let items: Vec<ListItem> = snapshot
        .predictions
        .iter()
        .take(5)
        .map(|prediction| {
            let percent = prediction.percent();
            let filled = ((percent / 100.0) * BAR_WIDTH as f32).round() as usize;
            let bar = format!(
                "{}{}",
                "█".repeat(filled.min(BAR_WIDTH)),
                "░".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
            );
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12.12}", prediction.label), Style::default().fg(Color::White)),
                Span::styled(bar, Style::default().fg(Color::Cyan)),
                Span::styled(format!(" {:>3.0}%", percent), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(panel("AI guesses".to_string())), area);
}

fn render_log(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = snapshot.log.len().saturating_sub(visible);
    let items: Vec<ListItem> = snapshot
        .log
        .iter()
        .skip(skip)
        .map(|entry| {
            let color = match entry.level {
                LogLevel::Success => Color::Green,
                LogLevel::Info => Color::Gray,
                LogLevel::Error => Color::Red,
            };
            ListItem::new(entry.message.clone()).style(Style::default().fg(color))
        })
        .collect();
    frame.render_widget(List::new(items).block(panel("Activity".to_string())), area);
}

/// Key hints for the current phase, then the latest notice
fn render_footer(frame: &mut Frame, area: Rect, snapshot: &Snapshot<'_>, chrome: &Chrome<'_>) {
    let hints = match snapshot.phase {
        Phase::Unauthenticated => "[u] Username  [l] Lobbies  [q] Quit",
        Phase::Idle => "[c] Create  [j] Join  [l] Lobbies  [q] Quit",
        Phase::LobbyWaiting => "[r] Ready  [m] Rounds  [x] Leave  [e] Eraser  [k] Clear",
        Phase::Starting | Phase::RoundInterval => "[e] Eraser  [k] Clear  [x] Leave",
        Phase::Playing => "Draw with the mouse  [Enter] Submit  [e] Eraser  [k] Clear",
        Phase::GameOver => "[r] Play again  [m] Rounds  [x] Leave",
    };
    let sound = if chrome.sound_on { "♪ on" } else { "♪ off" };

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(40)])
        .split(area);

    frame.render_widget(
        Paragraph::new(format!("{}  [s] {}", hints, sound)).style(Style::default().fg(Color::DarkGray)),
        layout[0],
    );
    if let Some(notice) = chrome.notice {
        frame.render_widget(
            Paragraph::new(notice.to_string())
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Right),
            layout[1],
        );
    }
}

/// Final standings with the leader crowned
fn render_game_over(frame: &mut Frame, snapshot: &Snapshot<'_>) {
    let Some(result) = snapshot.final_result else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled("GAME OVER", Style::default().fg(Color::Yellow).bold())),
        Line::from(""),
        Line::from(match &result.winner {
            Some(winner) => Span::styled(
                format!("Winner: {}", winner),
                Style::default().fg(Color::Green).bold(),
            ),
            None => Span::styled("No Winner", Style::default().fg(Color::Gray)),
        }),
        Line::from(""),
    ];
    for (i, standing) in result.standings.iter().enumerate() {
        let crown = if i == 0 { "👑" } else { "  " };
        lines.push(Line::from(format!(
            "{} {}. {}  {}",
            crown,
            i + 1,
            standing.username,
            standing.score
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[r] Play again  [x] Leave",
        Style::default().fg(Color::DarkGray),
    )));

    let height = lines.len() as u16 + 2;
    let area = centered_rect(40, height, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Yellow))),
        area,
    );
}

fn render_banner(frame: &mut Frame, message: &str) {
    let area = centered_rect(banner_width(message), 3, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(message.to_string())
            .style(Style::default().fg(Color::Yellow).bold())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

/// Banner box width: the message plus border and padding
fn banner_width(message: &str) -> u16 {
    u16::try_from(message.chars().count())
        .unwrap_or(u16::MAX)
        .saturating_add(6)
}

fn render_countdown(frame: &mut Frame, value: u32) {
    let area = centered_rect(22, 5, frame.area());
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from("Game starting in"),
        Line::from(""),
        Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(Color::Yellow).bold(),
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_prompt(frame: &mut Frame, prompt: &Prompt) {
    let area = centered_rect(50, 5, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from(format!("> {}_", prompt.input))];
    match prompt.error {
        Some(error) => lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red)))),
        None => lines.push(Line::from(Span::styled(
            "Enter to confirm, Esc to cancel",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan))
                    .title(prompt.kind.title()),
            ),
        area,
    );
}

/// A `width` x `height` rect centered in `area`, clipped to it
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
