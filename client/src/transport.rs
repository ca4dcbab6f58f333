//! WebSocket transport feeding the session's single inbound event queue
//!
//! I/O runs on a small tokio runtime owned by [`WsConnector`]. Everything the
//! network produces is marshaled back to the owning thread as [`SessionEvent`]s
//! on a `std::sync::mpsc` channel, so all session state is mutated in one place.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{classify, IgnoreReason, Inbound};
use std::sync::mpsc::Sender;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::ClientError;

/// Identifies one `connect` attempt so late events from an old socket can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    MessageReceived(Inbound),
    /// Normal close, peer close and network failure all look the same.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub connection: ConnectionId,
    pub event: TransportEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
}

/// Outbound half of one connection.
pub trait Transport {
    fn send(&mut self, frame: String) -> Result<(), TransportError>;
    fn close(&mut self);
}

/// Establishes transports. Progress is reported asynchronously as [`SessionEvent`]s.
pub trait Connector {
    type Transport: Transport;

    fn open(&mut self, address: &str, connection: ConnectionId) -> Self::Transport;
}

enum Outgoing {
    Text(String),
    Close,
}

pub struct WsTransport {
    outgoing: UnboundedSender<Outgoing>,
}

impl Transport for WsTransport {
    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outgoing
            .send(Outgoing::Text(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }
}

pub struct WsConnector {
    runtime: Runtime,
    events: Sender<SessionEvent>,
}

impl WsConnector {
    pub fn new(events: Sender<SessionEvent>) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("arena-net")
            .enable_all()
            .build()?;

        Ok(Self { runtime, events })
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    fn open(&mut self, address: &str, connection: ConnectionId) -> WsTransport {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        self.runtime.spawn(run_connection(
            address.to_string(),
            connection,
            outgoing_rx,
            self.events.clone(),
        ));

        WsTransport {
            outgoing: outgoing_tx,
        }
    }
}

/// Drives one socket from connect to close. Always ends with exactly one `Closed`.
async fn run_connection(
    address: String,
    connection: ConnectionId,
    mut outgoing: UnboundedReceiver<Outgoing>,
    events: Sender<SessionEvent>,
) {
    let sink = EventSink { connection, events };

    let stream = tokio::select! {
        result = connect_async(address.as_str()) => match result {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!("Failed to connect to {}: {}", address, e);
                sink.emit(TransportEvent::Closed);
                return;
            }
        },
        _ = wait_for_close(&mut outgoing) => {
            debug!("Connection {} cancelled before open", connection.0);
            sink.emit(TransportEvent::Closed);
            return;
        }
    };

    info!("WebSocket connected to {}", address);
    sink.emit(TransportEvent::Opened);

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    sink.emit(TransportEvent::MessageReceived(classify(&text)));
                }
                Some(Ok(Message::Binary(_))) => {
                    sink.emit(TransportEvent::MessageReceived(Inbound::Ignored(
                        IgnoreReason::Malformed,
                    )));
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Server closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket read error: {}", e);
                    break;
                }
            },

            message = outgoing.recv() => match message {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!("Failed to send message: {}", e);
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    sink.emit(TransportEvent::Closed);
}

struct EventSink {
    connection: ConnectionId,
    events: Sender<SessionEvent>,
}

impl EventSink {
    fn emit(&self, event: TransportEvent) {
        // The receiver only goes away when the client is shutting down.
        let _ = self.events.send(SessionEvent {
            connection: self.connection,
            event,
        });
    }
}

async fn wait_for_close(outgoing: &mut UnboundedReceiver<Outgoing>) {
    // Nothing is sent before the join, so any text here is dropped with the attempt.
    while let Some(message) = outgoing.recv().await {
        if let Outgoing::Close = message {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_unreachable_server_reports_single_close() {
        let (tx, rx) = mpsc::channel();
        let mut connector = WsConnector::new(tx).unwrap();
        let _transport = connector.open("ws://127.0.0.1:1/ws", ConnectionId(7));

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            event,
            SessionEvent {
                connection: ConnectionId(7),
                event: TransportEvent::Closed,
            }
        );
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_invalid_address_reports_close() {
        let (tx, rx) = mpsc::channel();
        let mut connector = WsConnector::new(tx).unwrap();
        let _transport = connector.open("not a url", ConnectionId(1));

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.event, TransportEvent::Closed);
    }

    #[test]
    fn test_close_before_open_cancels_attempt() {
        let (tx, rx) = mpsc::channel();
        let mut connector = WsConnector::new(tx).unwrap();
        // Accepts TCP but never answers the upgrade, so the handshake stays pending.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("ws://{}/ws", listener.local_addr().unwrap());
        let mut transport = connector.open(&address, ConnectionId(3));

        let (_socket, _) = listener.accept().unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        transport.close();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            event,
            SessionEvent {
                connection: ConnectionId(3),
                event: TransportEvent::Closed,
            }
        );
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
