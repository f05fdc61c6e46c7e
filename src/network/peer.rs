//! Connection worker
//!
//! A background thread owns the websocket. It performs the Engine.IO /
//! Socket.IO handshake, answers keepalive pings, forwards outbound frames
//! and reconnects with capped exponential backoff when the link drops.

use super::protocol::{Packet, CONNECT, PONG};
use crate::error::TransportError;
use rand::Rng;
use serde_json::Value;
use std::io::{self, ErrorKind};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// First reconnect delay
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Reconnect delays never grow past this
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Upper bound of the random delay added to each backoff step
const MAX_JITTER_MS: u64 = 250;

/// How long the handshake may wait for each server frame
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout while pumping, bounds outbound latency
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Granularity of shutdown checks while sleeping between attempts
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Notifications from the connection worker
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// Handshake completed, the session is live
    Connected,
    /// A live session ended; the worker is reconnecting
    Disconnected { reason: String },
    /// A server event, still undecoded
    Event { name: String, data: Value },
}

/// Capped exponential reconnect delay
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }

    /// Delay before the next attempt (without jitter)
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the connection worker
pub struct Peer {
    /// Encoded frames for the worker to send
    tx: Sender<String>,
    /// Events from the worker
    rx: Receiver<PeerEvent>,
    /// Asks the worker to close the socket and exit
    shutdown: Arc<AtomicBool>,
    /// Whether the worker thread is still running
    alive: bool,
}

impl Peer {
    /// Start a worker that connects to `endpoint` and keeps reconnecting
    pub fn spawn(endpoint: String) -> Self {
        let (outgoing_tx, outgoing_rx) = channel::<String>();
        let (incoming_tx, incoming_rx) = channel::<PeerEvent>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = Arc::clone(&shutdown);
        thread::spawn(move || {
            run(&endpoint, &outgoing_rx, &incoming_tx, &worker_shutdown);
            tracing::debug!(%endpoint, "connection worker exited");
        });

        Peer {
            tx: outgoing_tx,
            rx: incoming_rx,
            shutdown,
            alive: true,
        }
    }

    /// Queue an encoded frame for sending
    pub fn send(&self, frame: String) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::ChannelClosed)
    }

    /// Try to receive an event from the worker (non-blocking)
    pub fn try_recv(&mut self) -> Option<PeerEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.alive = false;
                None
            }
        }
    }

    /// Receive all pending events
    pub fn recv_all(&mut self) -> Vec<PeerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Check if the worker is still running
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

/// Why a live session stopped pumping
enum Exit {
    /// The handle was dropped
    Shutdown,
    /// The link failed or the server ended the session
    Lost(String),
}

fn run(
    endpoint: &str,
    outgoing: &Receiver<String>,
    events: &Sender<PeerEvent>,
    shutdown: &AtomicBool,
) {
    let mut backoff = Backoff::new();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }

        match connect(endpoint) {
            Ok(mut socket) => {
                backoff.reset();
                // Commands issued for the previous session are stale
                let stale = outgoing.try_iter().count();
                if stale > 0 {
                    tracing::debug!(stale, "discarded commands queued before reconnect");
                }
                tracing::info!(endpoint, "connected");
                if events.send(PeerEvent::Connected).is_err() {
                    return;
                }

                match pump(&mut socket, outgoing, events, shutdown) {
                    Exit::Shutdown => {
                        let _ = socket.close(None);
                        let _ = socket.flush();
                        return;
                    }
                    Exit::Lost(reason) => {
                        tracing::warn!(%reason, "connection lost");
                        if events.send(PeerEvent::Disconnected { reason }).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "connection attempt failed");
            }
        }

        let jitter = Duration::from_millis(rand::rng().random_range(0..=MAX_JITTER_MS));
        let delay = backoff.next_delay() + jitter;
        tracing::debug!(delay_ms = delay.as_millis() as u64, "reconnecting");
        if !sleep_unless_shutdown(delay, shutdown) {
            return;
        }
    }
}

/// Sleep for `delay`; returns false if shutdown was requested meanwhile
fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;
    while Instant::now() < deadline {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        thread::sleep(SLEEP_SLICE.min(deadline.saturating_duration_since(Instant::now())));
    }
    !shutdown.load(Ordering::SeqCst)
}

/// Dial the endpoint and complete the Engine.IO open and Socket.IO connect
fn connect(endpoint: &str) -> Result<Socket, TransportError> {
    let (mut socket, _response) = tungstenite::connect(endpoint)?;
    set_read_timeout(&socket, HANDSHAKE_TIMEOUT)?;

    let mut opened = false;
    loop {
        let text = match socket.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                return Err(TransportError::Handshake("closed during handshake".to_string()))
            }
            Ok(_) => continue,
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => {
                return Err(TransportError::Handshake("timed out".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let packet = Packet::decode(&text)
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        match packet {
            Packet::Open { sid, ping_interval_ms } if !opened => {
                tracing::debug!(%sid, ping_interval_ms, "engine.io session opened");
                opened = true;
                socket.send(Message::Text(CONNECT.to_string()))?;
            }
            Packet::Ping => socket.send(Message::Text(PONG.to_string()))?,
            Packet::Connect if opened => break,
            Packet::ConnectError(message) => return Err(TransportError::Handshake(message)),
            Packet::Close | Packet::Disconnect => {
                return Err(TransportError::Handshake("refused by server".to_string()))
            }
            other => tracing::debug!(?other, "ignoring frame during handshake"),
        }
    }

    set_read_timeout(&socket, POLL_TIMEOUT)?;
    Ok(socket)
}

/// Move frames in both directions until the session ends
fn pump(
    socket: &mut Socket,
    outgoing: &Receiver<String>,
    events: &Sender<PeerEvent>,
    shutdown: &AtomicBool,
) -> Exit {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return Exit::Shutdown;
        }

        loop {
            match outgoing.try_recv() {
                Ok(frame) => {
                    if let Err(e) = socket.send(Message::Text(frame)) {
                        return Exit::Lost(e.to_string());
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Exit::Shutdown,
            }
        }

        let text = match socket.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                tracing::warn!("binary frames are not supported, dropping");
                continue;
            }
            Ok(Message::Close(_)) => return Exit::Lost("closed by server".to_string()),
            Ok(_) => continue,
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => continue,
            Err(e) => return Exit::Lost(e.to_string()),
        };

        match Packet::decode(&text) {
            Ok(Packet::Ping) => {
                if let Err(e) = socket.send(Message::Text(PONG.to_string())) {
                    return Exit::Lost(e.to_string());
                }
            }
            Ok(Packet::Event { name, data }) => {
                if events.send(PeerEvent::Event { name, data }).is_err() {
                    return Exit::Shutdown;
                }
            }
            Ok(Packet::Close) | Ok(Packet::Disconnect) => {
                return Exit::Lost("session closed by server".to_string())
            }
            Ok(Packet::ConnectError(message)) => return Exit::Lost(message),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> Result<(), TransportError> {
    let result = match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    };
    result.map_err(|e| TransportError::WebSocket(tungstenite::Error::Io(e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::net::TcpListener;

    /// Minimal Socket.IO server: completes the handshake, sends `frames`,
    /// then records every text frame the client sends until it hangs up.
    pub(crate) fn fake_server(frames: Vec<String>) -> (String, thread::JoinHandle<Vec<String>>) {
        let (url, handle) = fake_server_sessions(vec![frames]);
        let handle = thread::spawn(move || handle.join().unwrap().into_iter().flatten().collect());
        (url, handle)
    }

    /// Like `fake_server`, but accepts one connection per entry of
    /// `sessions` on the same address and records each separately.
    fn fake_server_sessions(
        sessions: Vec<Vec<String>>,
    ) -> (String, thread::JoinHandle<Vec<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            sessions
                .into_iter()
                .map(|frames| serve_session(&listener, frames))
                .collect()
        });
        (format!("ws://{}/socket.io/?EIO=4&transport=websocket", addr), handle)
    }

    fn serve_session(listener: &TcpListener, frames: Vec<String>) -> Vec<String> {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(1500)))
            .unwrap();
        let mut ws = tungstenite::accept(stream).unwrap();
        ws.send(Message::Text(
            r#"0{"sid":"test-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#
                .to_string(),
        ))
        .unwrap();

        let mut received = Vec::new();
        // Wait for the namespace connect
        loop {
            match ws.read() {
                Ok(Message::Text(text)) if text == CONNECT => break,
                Ok(_) => continue,
                Err(e) => panic!("handshake read failed: {}", e),
            }
        }
        ws.send(Message::Text(r#"40{"sid":"ns-sid"}"#.to_string()))
            .unwrap();
        for frame in frames {
            ws.send(Message::Text(frame)).unwrap();
        }
        loop {
            match ws.read() {
                Ok(Message::Text(text)) => received.push(text),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        received
    }

    fn wait_for(peer: &mut Peer, count: usize) -> Vec<PeerEvent> {
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut events = Vec::new();
        while events.len() < count && Instant::now() < deadline {
            events.extend(peer.recv_all());
            thread::sleep(Duration::from_millis(10));
        }
        events
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 5000, 5000]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), INITIAL_BACKOFF);
    }

    #[test]
    fn test_handshake_and_event_delivery() {
        let (url, server) = fake_server(vec![
            "2".to_string(),
            r#"42["connected",{"message":"hello"}]"#.to_string(),
        ]);

        let mut peer = Peer::spawn(url);
        let events = wait_for(&mut peer, 2);
        assert_eq!(events[0], PeerEvent::Connected);
        assert!(events.iter().any(|e| matches!(
            e,
            PeerEvent::Event { name, data } if name == "connected" && data["message"] == "hello"
        )));

        peer.send(r#"42["create_lobby",{}]"#.to_string()).unwrap();
        thread::sleep(Duration::from_millis(200));
        drop(peer);

        let received = server.join().unwrap();
        assert!(received.contains(&PONG.to_string()));
        assert!(received.contains(&r#"42["create_lobby",{}]"#.to_string()));
    }

    #[test]
    fn test_server_close_reports_disconnect() {
        let (url, server) = fake_server(vec!["1".to_string()]);
        let mut peer = Peer::spawn(url);
        let events = wait_for(&mut peer, 2);
        assert_eq!(events[0], PeerEvent::Connected);
        assert!(matches!(events[1], PeerEvent::Disconnected { .. }));
        drop(peer);
        let _ = server.join();
    }

    #[test]
    fn test_frames_queued_while_reconnecting_are_dropped() {
        let (url, server) = fake_server_sessions(vec![vec!["1".to_string()], Vec::new()]);
        let mut peer = Peer::spawn(url);
        let events = wait_for(&mut peer, 2);
        assert_eq!(events[0], PeerEvent::Connected);
        assert!(matches!(events[1], PeerEvent::Disconnected { .. }));

        // Queued during the backoff sleep, before the next connect
        let stale = r#"42["player_ready",{}]"#.to_string();
        peer.send(stale.clone()).unwrap();

        let events = wait_for(&mut peer, 1);
        assert_eq!(events, vec![PeerEvent::Connected]);
        let fresh = r#"42["get_lobbies",{}]"#.to_string();
        peer.send(fresh.clone()).unwrap();
        thread::sleep(Duration::from_millis(200));
        drop(peer);

        let sessions = server.join().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(!sessions[0].contains(&stale));
        assert!(!sessions[1].contains(&stale));
        assert!(sessions[1].contains(&fresh));
    }
}
