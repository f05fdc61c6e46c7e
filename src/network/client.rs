//! Game server client
//!
//! Wraps the connection worker behind the [`Transport`] trait so the session
//! can be driven by a fake in tests.

use super::peer::{Peer, PeerEvent};
use super::protocol::{Command, Event};
use crate::error::{ProtocolError, TransportError};
use url::Url;

/// Port the DraWar server listens on by default
pub const DEFAULT_PORT: u16 = 5003;

/// Whether a live session exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connected,
}

/// What the transport reports to the session
#[derive(Debug)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Event(Event),
    /// A server event that could not be interpreted
    Rejected(ProtocolError),
}

/// Duplex message channel to the server
pub trait Transport {
    /// Send a command; fails immediately when no session is live
    fn send(&mut self, command: &Command) -> Result<(), TransportError>;

    /// Drain everything that arrived since the last poll, in order
    fn poll(&mut self) -> Vec<TransportEvent>;

    fn phase(&self) -> ConnectionPhase;
}

/// Websocket client for a DraWar server
pub struct Client {
    /// Connection worker
    peer: Peer,
    /// Last phase reported by the worker
    phase: ConnectionPhase,
}

impl Client {
    /// Start connecting to `server` (an `http(s)://` or `ws(s)://` address)
    ///
    /// Returns as soon as the worker is running; the session reports
    /// [`TransportEvent::Connected`] once the handshake completes.
    pub fn connect(server: &str) -> Result<Self, TransportError> {
        let endpoint = socket_endpoint(server)?;
        tracing::info!(%endpoint, "starting connection worker");
        Ok(Client {
            peer: Peer::spawn(endpoint.to_string()),
            phase: ConnectionPhase::Disconnected,
        })
    }
}

impl Transport for Client {
    fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        if self.phase != ConnectionPhase::Connected {
            return Err(TransportError::NotConnected {
                command: command.name(),
            });
        }
        self.peer.send(command.encode()?)
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        for event in self.peer.recv_all() {
            match event {
                PeerEvent::Connected => {
                    self.phase = ConnectionPhase::Connected;
                    events.push(TransportEvent::Connected);
                }
                PeerEvent::Disconnected { .. } => {
                    self.phase = ConnectionPhase::Disconnected;
                    events.push(TransportEvent::Disconnected);
                }
                PeerEvent::Event { name, data } => match Event::decode(&name, data) {
                    Ok(event) => events.push(TransportEvent::Event(event)),
                    Err(e) => {
                        tracing::warn!(event = %name, error = %e, "rejected server event");
                        events.push(TransportEvent::Rejected(e));
                    }
                },
            }
        }
        if !self.peer.is_alive() && self.phase == ConnectionPhase::Connected {
            self.phase = ConnectionPhase::Disconnected;
            events.push(TransportEvent::Disconnected);
        }
        events
    }

    fn phase(&self) -> ConnectionPhase {
        self.phase
    }
}

/// Turn a server address into its Socket.IO websocket endpoint
///
/// - `http://host:port` -> `ws://host:port/socket.io/?EIO=4&transport=websocket`
/// - `https://host` -> `wss://host/socket.io/?...`
/// - `host:port` and bare `host` are treated as `http://`; a bare host gets
///   the default port
pub fn socket_endpoint(server: &str) -> Result<Url, TransportError> {
    let server = server.trim();
    let with_scheme = if server.contains("://") {
        server.to_string()
    } else if server.contains(':') {
        format!("http://{}", server)
    } else {
        format!("http://{}:{}", server, DEFAULT_PORT)
    };

    let mut url =
        Url::parse(&with_scheme).map_err(|_| TransportError::InvalidEndpoint(server.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(TransportError::InvalidEndpoint(server.to_string())),
    };
    if url.host_str().is_none() {
        return Err(TransportError::InvalidEndpoint(server.to_string()));
    }
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidEndpoint(server.to_string()))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}
