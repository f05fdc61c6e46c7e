//! Networking: Socket.IO transport to the DraWar server
//!
//! This module provides:
//! - Engine.IO v4 / Socket.IO v5 packet codec and typed events
//! - A reconnecting websocket worker thread
//! - The [`Transport`] seam the session drives

pub mod client;
pub mod peer;
pub mod protocol;

pub use client::{Client, ConnectionPhase, Transport, TransportEvent};
pub use protocol::{Command, Event};
