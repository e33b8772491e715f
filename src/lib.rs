//! Persistent, authenticated client for the HTX WebSocket v2 push channel.
//!
//! The client opens a WebSocket, authenticates with an HMAC-SHA256 signed
//! request, auto-answers server keepalive pings and forwards everything else
//! to a caller-supplied handler. When the transport dies while the client is
//! running it reconnects and re-authenticates on its own; missed messages are
//! not replayed and subscriptions are not re-issued, so callers re-subscribe
//! from their auth-success handler.

pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod protocol;
pub mod signer;
pub mod transport;

pub use client::{Client, ClientOptions, ConnectionState, PushHandler};
pub use config::{ClientConfig, Credentials, ReconnectPolicy};
pub use error::ClientError;
pub use logger::{Logger, StdLogger};
pub use protocol::{AuthOutcome, PushMessage};
pub use transport::{Transport, TransportCommand, TransportEvent, TransportHandle, WsTransport};
