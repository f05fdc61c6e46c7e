//! Error types for each layer of the client

use crate::app::Phase;
use thiserror::Error;

/// Failures of the duplex channel to the game server
#[derive(Debug, Error)]
pub enum TransportError {
    /// A command was issued while no connection is established
    #[error("not connected (dropped `{command}`)")]
    NotConnected { command: &'static str },
    /// The connection worker has exited
    #[error("connection worker has stopped")]
    ChannelClosed,
    /// The configured server address cannot be turned into a socket endpoint
    #[error("invalid server endpoint `{0}`")]
    InvalidEndpoint(String),
    /// The Engine.IO / Socket.IO handshake did not complete
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Packets or events the client cannot interpret
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed packet: {0}")]
    Malformed(String),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("invalid `{event}` payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported packet type `{0}`")]
    Unsupported(String),
}

/// Failures producing canvas frames
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("failed to encode canvas: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    /// The command is not offered in the current phase
    #[error("`{command}` is not available while {phase}")]
    Unavailable { command: &'static str, phase: Phase },
}

impl ClientError {
    /// Whether this error came from the channel rather than local validation
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
