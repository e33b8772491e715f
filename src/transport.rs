//! Transport adapter seam.
//!
//! The connection state machine talks to the socket only through
//! [`TransportHandle`]: a command sender for outbound traffic and an event
//! receiver for inbound frames and lifecycle changes. Production uses
//! [`WsTransport`] over tokio-tungstenite; tests plug in a scripted double.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::ClientError;

#[derive(Debug)]
pub enum TransportCommand {
    SendText(String),
    Close,
}

#[derive(Debug)]
pub enum TransportEvent {
    /// One text frame, UTF-8 decoded.
    Message(String),
    /// The peer closed the connection or the stream ended.
    Closed,
    /// A socket-level failure terminated the connection.
    Errored(String),
}

/// One live connection. Dropping the handle detaches it: the pumps stop as
/// soon as their channel counterpart goes away, so a superseded handle can
/// never deliver duplicate events.
pub struct TransportHandle {
    pub commands: mpsc::UnboundedSender<TransportCommand>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Connection factory. `connect` resolving Ok is the "opened" event.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<TransportHandle, ClientError>;
}

/// WebSocket transport over tokio-tungstenite (TLS via rustls for wss://).
#[derive(Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<TransportHandle, ClientError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Write pump: commands -> socket.
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    TransportCommand::SendText(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    TransportCommand::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Read pump: socket -> events. WebSocket-level ping/pong is answered
        // by tungstenite itself; only the JSON keepalive reaches the router.
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if event_tx.send(TransportEvent::Message(text)).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            if event_tx.send(TransportEvent::Message(text)).is_err() {
                                return;
                            }
                        }
                        // Undecodable frame: drop it, keep the connection.
                        Err(_) => {}
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        let _ = event_tx.send(TransportEvent::Errored(err.to_string()));
                        return;
                    }
                }
            }
            let _ = event_tx.send(TransportEvent::Closed);
        });

        Ok(TransportHandle {
            commands: command_tx,
            events: event_rx,
        })
    }
}
