//! Connection lifecycle, join handshake and message dispatch
//!
//! The session is a small state machine over [`ConnectionPhase`]:
//!
//! ```text
//! Idle -> Connecting -> Open -> Joined
//!            |           |        |
//!            +-----------+--------+--> Closed -> Connecting -> ...
//! ```
//!
//! Transport progress arrives through [`SessionManager::handle_event`]. The join
//! is fire-and-forget: the server never acknowledges it, so `Joined` means "join
//! sent", not "join confirmed". There is no retry, backoff or timeout anywhere;
//! leaving `Closed` always takes an explicit [`SessionManager::connect`].

use log::{debug, info, warn};
use shared::{encode, ClientMessage, Inbound, IntentState, PlayerColor, PlayerId};

use crate::transport::{ConnectionId, Connector, SessionEvent, Transport, TransportEvent};
use crate::world::WorldStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Open,
    Joined,
    Closed,
}

impl ConnectionPhase {
    /// Whether `connect` is accepted in this phase.
    pub fn can_connect(self) -> bool {
        matches!(self, ConnectionPhase::Idle | ConnectionPhase::Closed)
    }
}

/// Name and color announced in the join message.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinProfile {
    pub name: String,
    pub color: PlayerColor,
}

/// Handle returned by [`SessionManager::subscribe_phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseSubscription(u64);

type PhaseListener = Box<dyn FnMut(ConnectionPhase)>;

pub struct SessionManager<C: Connector> {
    connector: C,
    player_id: PlayerId,
    profile: JoinProfile,

    phase: ConnectionPhase,
    transport: Option<C::Transport>,
    connection: Option<ConnectionId>,
    next_connection: u64,

    world: WorldStore,
    ignored_messages: u64,

    phase_listeners: Vec<(PhaseSubscription, PhaseListener)>,
    next_phase_subscription: u64,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(connector: C, player_id: PlayerId, profile: JoinProfile) -> Self {
        Self {
            connector,
            player_id,
            profile,
            phase: ConnectionPhase::Idle,
            transport: None,
            connection: None,
            next_connection: 1,
            world: WorldStore::new(),
            ignored_messages: 0,
            phase_listeners: Vec::new(),
            next_phase_subscription: 0,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn profile(&self) -> &JoinProfile {
        &self.profile
    }

    /// Takes effect on the next join.
    pub fn set_profile(&mut self, profile: JoinProfile) {
        self.profile = profile;
    }

    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldStore {
        &mut self.world
    }

    /// Inbound frames dropped as unknown or malformed since startup.
    pub fn ignored_messages(&self) -> u64 {
        self.ignored_messages
    }

    /// Starts a new connection. Only valid from `Idle` or `Closed`; returns
    /// false (and does nothing) otherwise.
    pub fn connect(&mut self, address: &str) -> bool {
        if !self.phase.can_connect() {
            debug!("Ignoring connect while {:?}", self.phase);
            return false;
        }

        let connection = ConnectionId(self.next_connection);
        self.next_connection += 1;

        info!("Connecting to {} (attempt {})", address, connection.0);
        self.transport = Some(self.connector.open(address, connection));
        self.connection = Some(connection);
        self.transition(ConnectionPhase::Connecting);
        true
    }

    /// Closes the transport and moves to `Closed` immediately. Frames already
    /// handed to the transport may or may not reach the server.
    pub fn disconnect(&mut self) {
        if self.phase.can_connect() {
            return;
        }

        info!("Disconnecting");
        self.close();
    }

    /// Sends the intent if joined. In every other phase this is a silent no-op:
    /// nothing is queued and nothing is retried.
    pub fn send_intent(&mut self, intent: &IntentState) -> bool {
        if self.phase != ConnectionPhase::Joined {
            debug!("Dropping intent while {:?}", self.phase);
            return false;
        }

        self.send(&ClientMessage::key_state(intent))
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        if Some(event.connection) != self.connection {
            debug!(
                "Discarding {:?} from stale connection {}",
                event.event, event.connection.0
            );
            return;
        }

        match event.event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::MessageReceived(inbound) => self.on_message(inbound),
            TransportEvent::Closed => {
                info!("Connection closed");
                self.close();
            }
        }
    }

    pub fn subscribe_phase<F>(&mut self, listener: F) -> PhaseSubscription
    where
        F: FnMut(ConnectionPhase) + 'static,
    {
        let subscription = PhaseSubscription(self.next_phase_subscription);
        self.next_phase_subscription += 1;
        self.phase_listeners.push((subscription, Box::new(listener)));
        subscription
    }

    pub fn unsubscribe_phase(&mut self, subscription: PhaseSubscription) -> bool {
        let before = self.phase_listeners.len();
        self.phase_listeners.retain(|(s, _)| *s != subscription);
        self.phase_listeners.len() != before
    }

    fn on_opened(&mut self) {
        if self.phase != ConnectionPhase::Connecting {
            return;
        }
        self.transition(ConnectionPhase::Open);

        let join = ClientMessage::join(
            self.player_id,
            &self.profile.name,
            self.profile.color.clone(),
        );
        if self.send(&join) {
            info!("Joined as {}", self.player_id);
            self.transition(ConnectionPhase::Joined);
        }
    }

    fn on_message(&mut self, inbound: Inbound) {
        if !matches!(self.phase, ConnectionPhase::Open | ConnectionPhase::Joined) {
            return;
        }

        match inbound {
            Inbound::State(snapshot) => self.world.replace(snapshot),
            Inbound::Ignored(reason) => {
                self.ignored_messages += 1;
                debug!(
                    "Ignored inbound message ({:?}), {} so far",
                    reason, self.ignored_messages
                );
            }
        }
    }

    /// Returns false if the frame could not be handed to the transport; a
    /// failed send is treated as a transport failure and closes the session.
    fn send(&mut self, message: &ClientMessage) -> bool {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", message, e);
                return false;
            }
        };

        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        match transport.send(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("Send failed: {}", e);
                self.close();
                false
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.connection = None;
        self.transition(ConnectionPhase::Closed);
    }

    fn transition(&mut self, phase: ConnectionPhase) {
        if self.phase == phase {
            return;
        }

        debug!("Phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        for (_, listener) in &mut self.phase_listeners {
            listener(phase);
        }
    }
}
