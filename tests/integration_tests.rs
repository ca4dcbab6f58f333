//! Integration tests for the arena client against a live WebSocket server
//!
//! Each test starts a scripted in-process server, connects a real
//! `SessionManager<WsConnector>` to it, and drives the session by draining the
//! transport event queue the same way the frame loop does.

use assert_approx_eq::assert_approx_eq;
use client::session::{ConnectionPhase, JoinProfile, SessionManager};
use client::transport::{SessionEvent, WsConnector};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use shared::{IntentState, PlayerId};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{accept_async, tungstenite::Message};

const TIMEOUT: Duration = Duration::from_secs(5);

enum ServerCommand {
    Send(String),
    Close,
}

/// One-connection server that reports every text frame it receives.
struct ArenaServer {
    _runtime: Runtime,
    address: String,
    received: Receiver<Value>,
    commands: UnboundedSender<ServerCommand>,
}

impl ArenaServer {
    fn start() -> Self {
        let runtime = Runtime::new().expect("Failed to build server runtime");
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .expect("Failed to bind server socket");
        let address = format!("ws://{}/ws", listener.local_addr().unwrap());

        let (received_tx, received) = mpsc::channel();
        let (commands, commands_rx) = unbounded_channel();
        runtime.spawn(serve(listener, received_tx, commands_rx));

        Self {
            _runtime: runtime,
            address,
            received,
            commands,
        }
    }

    fn send(&self, text: String) {
        self.commands.send(ServerCommand::Send(text)).unwrap();
    }

    fn close(&self) {
        self.commands.send(ServerCommand::Close).unwrap();
    }

    fn next_frame(&self) -> Value {
        self.received
            .recv_timeout(TIMEOUT)
            .expect("Server did not receive a frame")
    }

    fn assert_silent(&self) {
        assert!(self
            .received
            .recv_timeout(Duration::from_millis(200))
            .is_err());
    }
}

async fn serve(
    listener: TcpListener,
    received: mpsc::Sender<Value>,
    mut commands: UnboundedReceiver<ServerCommand>,
) {
    let (tcp, _) = listener.accept().await.unwrap();
    let ws = accept_async(tcp).await.unwrap();
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = received.send(serde_json::from_str(&text).unwrap());
                }
                Some(Ok(_)) => {}
                _ => break,
            },
            command = commands.recv() => match command {
                Some(ServerCommand::Send(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(ServerCommand::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

fn session(name: &str) -> (SessionManager<WsConnector>, Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel();
    let connector = WsConnector::new(tx).unwrap();
    let profile = JoinProfile {
        name: name.to_string(),
        color: "#22AA44".parse().unwrap(),
    };
    (
        SessionManager::new(connector, PlayerId::generate(), profile),
        rx,
    )
}

/// Drains transport events into the session until `done` holds or time runs out.
fn pump_until<F>(
    session: &mut SessionManager<WsConnector>,
    events: &Receiver<SessionEvent>,
    done: F,
) -> bool
where
    F: Fn(&SessionManager<WsConnector>) -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if done(session) {
            return true;
        }
        if let Ok(event) = events.recv_timeout(Duration::from_millis(20)) {
            session.handle_event(event);
        }
    }
    done(session)
}

fn joined(name: &str) -> (ArenaServer, SessionManager<WsConnector>, Receiver<SessionEvent>) {
    let server = ArenaServer::start();
    let (mut session, events) = session(name);

    assert!(session.connect(&server.address));
    assert_eq!(session.phase(), ConnectionPhase::Connecting);
    assert!(pump_until(&mut session, &events, |s| {
        s.phase() == ConnectionPhase::Joined
    }));

    (server, session, events)
}

fn state_frame(players: usize, star: (f32, f32)) -> String {
    let players: Vec<Value> = (0..players)
        .map(|i| {
            json!({
                "id": format!("player-{}", i),
                "name": format!("P{}", i),
                "color": "#336699",
                "x": 100.0 + i as f32,
                "y": 200.5,
                "score": i,
            })
        })
        .collect();

    json!({
        "type": "state",
        "payload": {"players": players, "star": {"x": star.0, "y": star.1}},
    })
    .to_string()
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// The first frame on a fresh connection is the join, with the default name
    #[test]
    fn join_is_sent_once_with_default_name() {
        let (server, session, _events) = joined("");

        let join = server.next_frame();
        assert_eq!(join["type"], "join");
        assert_eq!(join["playerId"], session.player_id().to_string());
        assert_eq!(join["name"], "Anon");
        assert_eq!(join["color"], "#22aa44");
        server.assert_silent();
    }

    /// A second connect while joined produces no second join
    #[test]
    fn connect_while_joined_is_ignored() {
        let (server, mut session, _events) = joined("Kai");
        assert_eq!(server.next_frame()["type"], "join");

        assert!(!session.connect(&server.address));
        assert_eq!(session.phase(), ConnectionPhase::Joined);
        server.assert_silent();
    }

    /// Server-initiated close lands the session in Closed and intents stop
    #[test]
    fn peer_close_moves_to_closed() {
        let (server, mut session, events) = joined("Kai");
        server.next_frame();

        server.close();
        assert!(pump_until(&mut session, &events, |s| {
            s.phase() == ConnectionPhase::Closed
        }));

        let up = IntentState {
            up: true,
            ..IntentState::default()
        };
        assert!(!session.send_intent(&up));
        server.assert_silent();
    }

    /// Explicit disconnect is immediate; late transport events change nothing
    #[test]
    fn disconnect_is_immediate() {
        let (_server, mut session, events) = joined("Kai");

        session.disconnect();
        assert_eq!(session.phase(), ConnectionPhase::Closed);

        std::thread::sleep(Duration::from_millis(100));
        while let Ok(event) = events.try_recv() {
            session.handle_event(event);
        }
        assert_eq!(session.phase(), ConnectionPhase::Closed);
    }

    /// Connecting to a port nobody listens on ends in Closed, not an error
    #[test]
    fn unreachable_server_closes() {
        let (mut session, events) = session("Kai");
        assert!(session.connect("ws://127.0.0.1:1/ws"));
        assert!(pump_until(&mut session, &events, |s| {
            s.phase() == ConnectionPhase::Closed
        }));
        assert!(session.connect("ws://127.0.0.1:1/ws"));
    }
}

/// MESSAGE FLOW TESTS
mod message_flow_tests {
    use super::*;

    /// Intent edges arrive at the server in order, as keyState frames
    #[test]
    fn intents_reach_server_in_order() {
        let (server, mut session, _events) = joined("Kai");
        server.next_frame();

        let sequence = [
            IntentState {
                up: true,
                ..IntentState::default()
            },
            IntentState {
                up: true,
                right: true,
                ..IntentState::default()
            },
            IntentState {
                right: true,
                ..IntentState::default()
            },
        ];
        for intent in &sequence {
            assert!(session.send_intent(intent));
        }

        assert_eq!(
            server.next_frame(),
            json!({"type": "keyState", "up": true, "down": false, "left": false, "right": false})
        );
        assert_eq!(
            server.next_frame(),
            json!({"type": "keyState", "up": true, "down": false, "left": false, "right": true})
        );
        assert_eq!(
            server.next_frame(),
            json!({"type": "keyState", "up": false, "down": false, "left": false, "right": true})
        );
    }

    /// A broadcast snapshot replaces the world store
    #[test]
    fn state_broadcast_updates_world() {
        let (server, mut session, events) = joined("Kai");
        server.next_frame();

        server.send(state_frame(3, (400.0, 300.0)));
        assert!(pump_until(&mut session, &events, |s| {
            s.world().current().is_some()
        }));

        let world = session.world().current().unwrap();
        assert_eq!(world.players.len(), 3);
        assert_approx_eq!(world.target.x, 400.0);
        assert_approx_eq!(world.target.y, 300.0);
        assert_approx_eq!(world.players[1].x, 101.0);
        assert_eq!(world.players[2].score, 2);
    }

    /// Unknown and malformed frames are counted and otherwise ignored
    #[test]
    fn unknown_frames_are_ignored() {
        let (server, mut session, events) = joined("Kai");
        server.next_frame();

        server.send(json!({"type": "welcome", "motd": "hi"}).to_string());
        server.send("{{{".to_string());
        server.send(state_frame(1, (10.0, 20.0)));

        assert!(pump_until(&mut session, &events, |s| {
            s.world().current().is_some()
        }));
        assert_eq!(session.ignored_messages(), 2);
        assert_eq!(session.phase(), ConnectionPhase::Joined);
        assert_eq!(session.world().player_count(), 1);
    }

    /// Delivering the same snapshot twice leaves the same observable state
    #[test]
    fn duplicate_snapshot_is_idempotent() {
        let (server, mut session, events) = joined("Kai");
        server.next_frame();

        server.send(state_frame(2, (50.0, 60.0)));
        assert!(pump_until(&mut session, &events, |s| {
            s.world().current().is_some()
        }));
        let first = session.world().current().unwrap();

        server.send(state_frame(2, (50.0, 60.0)));
        assert!(pump_until(&mut session, &events, |s| {
            s.world()
                .current()
                .map_or(false, |w| !std::sync::Arc::ptr_eq(&w, &first))
        }));

        assert_eq!(*session.world().current().unwrap(), *first);
    }
}
