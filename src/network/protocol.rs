//! Network protocol message types
//!
//! The server speaks Socket.IO (v5) on top of Engine.IO (v4). Every packet
//! is one websocket text frame: an Engine.IO type digit, and for `message`
//! packets a Socket.IO type digit followed by a JSON array
//! `["event_name", {payload}]`. Event names are the wire contract.

use crate::error::{ProtocolError, TransportError};
use crate::lobby::{Lobby, Prediction, ScoreTable};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Round length the server uses when `round_start` omits it
pub const DEFAULT_ROUND_SECONDS: u32 = 60;

/// Commands sent from the client to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Authenticate { username: String },
    CreateLobby,
    JoinLobby { lobby_id: String },
    LeaveLobby,
    PlayerReady,
    PlayAgain,
    /// `None` restores the server's default round count
    SetMaxRounds { max_rounds: Option<u32> },
    GetAvailableLobbies,
    /// Throttled or final canvas frame (data URL)
    DrawUpdate { canvas_data: String },
    /// Explicit scoring submission (data URL)
    SubmitDrawing { canvas_data: String },
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Authenticate { .. } => "authenticate",
            Command::CreateLobby => "create_lobby",
            Command::JoinLobby { .. } => "join_lobby",
            Command::LeaveLobby => "leave_lobby",
            Command::PlayerReady => "player_ready",
            Command::PlayAgain => "play_again",
            Command::SetMaxRounds { .. } => "set_max_rounds",
            Command::GetAvailableLobbies => "get_available_lobbies",
            Command::DrawUpdate { .. } => "draw_update",
            Command::SubmitDrawing { .. } => "submit_drawing",
        }
    }

    /// JSON payload of the command
    pub fn payload(&self) -> Value {
        match self {
            Command::Authenticate { username } => json!({ "username": username }),
            Command::JoinLobby { lobby_id } => json!({ "lobby_id": lobby_id }),
            Command::SetMaxRounds { max_rounds } => json!({ "max_rounds": max_rounds }),
            Command::DrawUpdate { canvas_data } | Command::SubmitDrawing { canvas_data } => {
                json!({ "canvas_data": canvas_data })
            }
            Command::CreateLobby
            | Command::LeaveLobby
            | Command::PlayerReady
            | Command::PlayAgain
            | Command::GetAvailableLobbies => json!({}),
        }
    }

    /// Encode as a Socket.IO EVENT packet
    pub fn encode(&self) -> Result<String, TransportError> {
        let body = serde_json::to_string(&(self.name(), self.payload()))?;
        Ok(format!("42{}", body))
    }
}

/// Events pushed from the server to the client
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Server greeting after the namespace connect
    Connected { message: Option<String> },
    Authenticated { player_id: String, username: String },
    /// `lobby_created` or its legacy alias `game_created`
    LobbyCreated { lobby_id: String, lobby: Option<Lobby> },
    JoinedLobby { lobby_id: String, lobby: Option<Lobby> },
    PlayerJoined { username: String, lobby: Option<Lobby> },
    PlayerLeft { username: String, lobby: Option<Lobby> },
    /// `left_lobby` or `left_game`
    LeftLobby,
    PlayerReadyUpdate { username: String, lobby: Option<Lobby> },
    PlayerReadyForNext { username: String, lobby: Option<Lobby> },
    LobbySettingsUpdated { lobby: Option<Lobby> },
    GameStarting { countdown: u32 },
    RoundStart { round_number: Option<u32>, word: String, duration: u32 },
    AiPrediction { predictions: Vec<Prediction>, is_correct: bool },
    RoundEnd {
        winner_id: Option<String>,
        winner_username: Option<String>,
        scores: Option<ScoreTable>,
    },
    SubmissionResult { predictions: Vec<Prediction>, is_correct: bool },
    GameEnd {
        winner_username: Option<String>,
        final_scores: Option<ScoreTable>,
        lobby: Option<Lobby>,
    },
    Error { message: String, code: Option<String> },
    /// `available_lobbies` or `available_games`
    AvailableLobbies { lobbies: Vec<Lobby> },
}

#[derive(Deserialize)]
struct ConnectedPayload {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct AuthenticatedPayload {
    player_id: String,
    username: String,
}

#[derive(Deserialize)]
struct LobbyEntryPayload {
    #[serde(alias = "game_id")]
    lobby_id: String,
    #[serde(default, alias = "game")]
    lobby: Option<Lobby>,
}

#[derive(Deserialize)]
struct MembershipPayload {
    #[serde(default)]
    username: String,
    #[serde(default, alias = "game")]
    lobby: Option<Lobby>,
}

#[derive(Deserialize)]
struct SettingsPayload {
    #[serde(default)]
    lobby: Option<Lobby>,
}

#[derive(Deserialize)]
struct GameStartingPayload {
    #[serde(default)]
    countdown: u32,
}

#[derive(Deserialize)]
struct RoundStartPayload {
    #[serde(default)]
    round_number: Option<u32>,
    word: String,
    #[serde(default)]
    duration: Option<u32>,
}

#[derive(Deserialize)]
struct PredictionPayload {
    #[serde(default)]
    predictions: Vec<Prediction>,
    #[serde(default)]
    is_correct: bool,
}

#[derive(Deserialize)]
struct RoundEndPayload {
    #[serde(default)]
    winner_id: Option<String>,
    #[serde(default)]
    winner_username: Option<String>,
    #[serde(default)]
    scores: Option<ScoreTable>,
}

#[derive(Deserialize)]
struct GameEndPayload {
    #[serde(default)]
    winner_username: Option<String>,
    #[serde(default)]
    final_scores: Option<ScoreTable>,
    #[serde(default)]
    lobby: Option<Lobby>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
struct AvailablePayload {
    #[serde(default, alias = "games")]
    lobbies: Vec<Lobby>,
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    // Events emitted without a payload arrive as null
    let data = if data.is_null() { json!({}) } else { data };
    serde_json::from_value(data).map_err(|source| ProtocolError::Payload {
        event: event.to_string(),
        source,
    })
}

impl Event {
    /// Decode an inbound event from its wire name and JSON payload
    pub fn decode(name: &str, data: Value) -> Result<Self, ProtocolError> {
        let event = match name {
            "connected" => {
                let p: ConnectedPayload = payload(name, data)?;
                Event::Connected { message: p.message }
            }
            "authenticated" => {
                let p: AuthenticatedPayload = payload(name, data)?;
                Event::Authenticated {
                    player_id: p.player_id,
                    username: p.username,
                }
            }
            "lobby_created" | "game_created" => {
                let p: LobbyEntryPayload = payload(name, data)?;
                Event::LobbyCreated {
                    lobby_id: p.lobby_id,
                    lobby: p.lobby,
                }
            }
            "joined_lobby" => {
                let p: LobbyEntryPayload = payload(name, data)?;
                Event::JoinedLobby {
                    lobby_id: p.lobby_id,
                    lobby: p.lobby,
                }
            }
            "player_joined" => {
                let p: MembershipPayload = payload(name, data)?;
                Event::PlayerJoined {
                    username: p.username,
                    lobby: p.lobby,
                }
            }
            "player_left" => {
                let p: MembershipPayload = payload(name, data)?;
                Event::PlayerLeft {
                    username: p.username,
                    lobby: p.lobby,
                }
            }
            "left_lobby" | "left_game" => Event::LeftLobby,
            "player_ready_update" => {
                let p: MembershipPayload = payload(name, data)?;
                Event::PlayerReadyUpdate {
                    username: p.username,
                    lobby: p.lobby,
                }
            }
            "player_ready_for_next" => {
                let p: MembershipPayload = payload(name, data)?;
                Event::PlayerReadyForNext {
                    username: p.username,
                    lobby: p.lobby,
                }
            }
            "lobby_settings_updated" => {
                let p: SettingsPayload = payload(name, data)?;
                Event::LobbySettingsUpdated { lobby: p.lobby }
            }
            "game_starting" => {
                let p: GameStartingPayload = payload(name, data)?;
                Event::GameStarting {
                    countdown: p.countdown,
                }
            }
            "round_start" => {
                let p: RoundStartPayload = payload(name, data)?;
                Event::RoundStart {
                    // The server numbers rounds from 1; treat 0 as absent
                    round_number: p.round_number.filter(|n| *n > 0),
                    word: p.word,
                    duration: p.duration.unwrap_or(DEFAULT_ROUND_SECONDS),
                }
            }
            "ai_prediction" => {
                let p: PredictionPayload = payload(name, data)?;
                Event::AiPrediction {
                    predictions: p.predictions,
                    is_correct: p.is_correct,
                }
            }
            "round_end" => {
                let p: RoundEndPayload = payload(name, data)?;
                Event::RoundEnd {
                    winner_id: p.winner_id.filter(|id| !id.is_empty()),
                    winner_username: p.winner_username,
                    scores: p.scores,
                }
            }
            "submission_result" => {
                let p: PredictionPayload = payload(name, data)?;
                Event::SubmissionResult {
                    predictions: p.predictions,
                    is_correct: p.is_correct,
                }
            }
            "game_end" => {
                let p: GameEndPayload = payload(name, data)?;
                Event::GameEnd {
                    winner_username: p.winner_username,
                    final_scores: p.final_scores,
                    lobby: p.lobby,
                }
            }
            "error" => {
                let p: ErrorPayload = payload(name, data)?;
                Event::Error {
                    message: p.message,
                    code: p.code,
                }
            }
            "available_lobbies" | "available_games" => {
                let p: AvailablePayload = payload(name, data)?;
                Event::AvailableLobbies { lobbies: p.lobbies }
            }
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };
        Ok(event)
    }
}

/// A decoded Engine.IO / Socket.IO frame
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake with the server's keepalive settings
    Open { sid: String, ping_interval_ms: u64 },
    /// Engine.IO close
    Close,
    Ping,
    Pong,
    Noop,
    /// Socket.IO namespace connect acknowledgement
    Connect,
    /// Socket.IO namespace disconnect
    Disconnect,
    /// Socket.IO connect refusal
    ConnectError(String),
    /// Socket.IO event with its raw payload
    Event { name: String, data: Value },
}

#[derive(Deserialize)]
struct OpenPayload {
    #[serde(default)]
    sid: String,
    #[serde(default, rename = "pingInterval")]
    ping_interval: u64,
}

/// Engine.IO PONG frame, the reply to a server PING
pub const PONG: &str = "3";

/// Socket.IO CONNECT frame for the default namespace
pub const CONNECT: &str = "40";

impl Packet {
    /// Parse one websocket text frame
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let mut chars = frame.chars();
        let engine_type = chars
            .next()
            .ok_or_else(|| ProtocolError::Malformed("empty frame".to_string()))?;
        let rest = chars.as_str();

        match engine_type {
            '0' => {
                let open: OpenPayload = serde_json::from_str(rest)
                    .map_err(|e| ProtocolError::Malformed(format!("open packet: {}", e)))?;
                Ok(Packet::Open {
                    sid: open.sid,
                    ping_interval_ms: open.ping_interval,
                })
            }
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => decode_socket_packet(rest),
            '6' => Ok(Packet::Noop),
            other => Err(ProtocolError::Unsupported(format!("engine.io {}", other))),
        }
    }
}

fn decode_socket_packet(body: &str) -> Result<Packet, ProtocolError> {
    let mut chars = body.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| ProtocolError::Malformed("empty message packet".to_string()))?;
    let rest = strip_namespace(chars.as_str());

    match socket_type {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            // Skip an optional ack id
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let array: Vec<Value> = serde_json::from_str(rest)
                .map_err(|e| ProtocolError::Malformed(format!("event packet: {}", e)))?;
            let mut items = array.into_iter();
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(ProtocolError::Malformed("event without a name".to_string())),
            };
            let data = items.next().unwrap_or(Value::Null);
            Ok(Packet::Event { name, data })
        }
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        other => Err(ProtocolError::Unsupported(format!("socket.io {}", other))),
    }
}

/// Drop a leading `/namespace,` if present
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(comma) => &rest[comma + 1..],
            None => "",
        }
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd = Command::JoinLobby {
            lobby_id: "abc".to_string(),
        };
        assert_eq!(cmd.encode().unwrap(), r#"42["join_lobby",{"lobby_id":"abc"}]"#);

        let cmd = Command::CreateLobby;
        assert_eq!(cmd.encode().unwrap(), r#"42["create_lobby",{}]"#);
    }

    #[test]
    fn test_set_max_rounds_null_restores_default() {
        let cmd = Command::SetMaxRounds { max_rounds: None };
        assert_eq!(cmd.encode().unwrap(), r#"42["set_max_rounds",{"max_rounds":null}]"#);
        let cmd = Command::SetMaxRounds { max_rounds: Some(7) };
        assert_eq!(cmd.encode().unwrap(), r#"42["set_max_rounds",{"max_rounds":7}]"#);
    }

    #[test]
    fn test_command_names_match_wire_contract() {
        let names: Vec<&str> = [
            Command::Authenticate { username: "a".into() },
            Command::CreateLobby,
            Command::JoinLobby { lobby_id: "l".into() },
            Command::LeaveLobby,
            Command::PlayerReady,
            Command::PlayAgain,
            Command::SetMaxRounds { max_rounds: None },
            Command::GetAvailableLobbies,
            Command::DrawUpdate { canvas_data: String::new() },
            Command::SubmitDrawing { canvas_data: String::new() },
        ]
        .iter()
        .map(Command::name)
        .collect();
        assert_eq!(
            names,
            vec![
                "authenticate",
                "create_lobby",
                "join_lobby",
                "leave_lobby",
                "player_ready",
                "play_again",
                "set_max_rounds",
                "get_available_lobbies",
                "draw_update",
                "submit_drawing"
            ]
        );
    }

    #[test]
    fn test_decode_open_packet() {
        let packet =
            Packet::decode(r#"0{"sid":"xyz","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
                .unwrap();
        assert_eq!(
            packet,
            Packet::Open {
                sid: "xyz".to_string(),
                ping_interval_ms: 25000
            }
        );
    }

    #[test]
    fn test_decode_control_packets() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::decode("1").unwrap(), Packet::Close);
        assert_eq!(Packet::decode(r#"40{"sid":"abc"}"#).unwrap(), Packet::Connect);
        assert_eq!(Packet::decode("41").unwrap(), Packet::Disconnect);
        assert_eq!(
            Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError("Not authorized".to_string())
        );
    }

    #[test]
    fn test_decode_event_packet_with_namespace_and_ack() {
        let packet = Packet::decode(r#"42/game,7["round_start",{"word":"cat"}]"#).unwrap();
        match packet {
            Packet::Event { name, data } => {
                assert_eq!(name, "round_start");
                assert_eq!(data["word"], "cat");
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_decode_event_without_payload() {
        let packet = Packet::decode(r#"42["left_lobby"]"#).unwrap();
        let Packet::Event { name, data } = packet else {
            panic!("expected event");
        };
        assert_eq!(Event::decode(&name, data).unwrap(), Event::LeftLobby);
    }

    #[test]
    fn test_binary_packet_unsupported() {
        assert!(matches!(
            Packet::decode(r#"451-["x",{"_placeholder":true,"num":0}]"#),
            Err(ProtocolError::Unsupported(_))
        ));
    }

    #[test]
    fn test_round_start_with_and_without_number() {
        let event = Event::decode(
            "round_start",
            json!({"round_number": 3, "word": "cat", "duration": 60}),
        )
        .unwrap();
        assert_eq!(
            event,
            Event::RoundStart {
                round_number: Some(3),
                word: "cat".to_string(),
                duration: 60
            }
        );

        let event = Event::decode("round_start", json!({"word": "dog"})).unwrap();
        assert_eq!(
            event,
            Event::RoundStart {
                round_number: None,
                word: "dog".to_string(),
                duration: DEFAULT_ROUND_SECONDS
            }
        );
    }

    #[test]
    fn test_game_created_alias() {
        let event = Event::decode(
            "game_created",
            json!({"game_id": "g-1", "game": {"id": "g-1", "state": "waiting", "players": []}}),
        )
        .unwrap();
        match event {
            Event::LobbyCreated { lobby_id, lobby } => {
                assert_eq!(lobby_id, "g-1");
                assert_eq!(lobby.unwrap().id, "g-1");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_player_joined_game_alias() {
        let event = Event::decode(
            "player_joined",
            json!({"username": "Bo", "game": {"id": "g", "players": []}}),
        )
        .unwrap();
        assert!(matches!(
            event,
            Event::PlayerJoined { ref username, lobby: Some(_) } if username == "Bo"
        ));
    }

    #[test]
    fn test_round_end_null_winner() {
        let event = Event::decode(
            "round_end",
            json!({"winner_id": null, "scores": {"p1": {"username": "Ann", "score": 1}}, "timeout": true}),
        )
        .unwrap();
        match event {
            Event::RoundEnd { winner_id, scores, .. } => {
                assert!(winner_id.is_none());
                assert_eq!(scores.unwrap()["p1"].score, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_error_event() {
        let event = Event::decode(
            "error",
            json!({"code": "NOT_IN_LOBBY", "message": "Not in a lobby"}),
        )
        .unwrap();
        assert_eq!(
            event,
            Event::Error {
                message: "Not in a lobby".to_string(),
                code: Some("NOT_IN_LOBBY".to_string())
            }
        );
    }

    #[test]
    fn test_available_games_alias() {
        let event = Event::decode(
            "available_games",
            json!({"games": [{"id": "a"}, {"id": "b"}]}),
        )
        .unwrap();
        match event {
            Event::AvailableLobbies { lobbies } => assert_eq!(lobbies.len(), 2),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_reported() {
        assert!(matches!(
            Event::decode("mystery", json!({})),
            Err(ProtocolError::UnknownEvent(name)) if name == "mystery"
        ));
    }

    #[test]
    fn test_invalid_payload_is_reported() {
        assert!(matches!(
            Event::decode("authenticated", json!({"username": "x"})),
            Err(ProtocolError::Payload { .. })
        ));
    }
}
