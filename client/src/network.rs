use crate::config::ClientConfig;
use crate::input::InputTracker;
use crate::rendering::{HudInfo, Renderer};
use crate::session::{ConnectionPhase, SessionManager};
use crate::transport::{Connector, SessionEvent, WsConnector};
use crate::ClientError;
use log::{info, warn};
use macroquad::prelude::*;
use shared::{PlayerId, DEFAULT_PLAYER_NAME};
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Frame-loop owner of all client state.
///
/// Keyboard edges, transport events and rendering are all handled on the
/// thread that calls [`Client::run`]; network I/O only ever reaches the session
/// through the event queue drained by [`Client::pump_events`].
pub struct Client<C: Connector> {
    server: String,
    session: SessionManager<C>,
    input: InputTracker,
    events: Receiver<SessionEvent>,
    renderer: Renderer,
}

impl Client<WsConnector> {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let (events_tx, events_rx) = mpsc::channel();
        let connector = WsConnector::new(events_tx)?;
        Ok(Self::with_connector(config, connector, events_rx))
    }
}

impl<C: Connector> Client<C> {
    pub fn with_connector(
        config: &ClientConfig,
        connector: C,
        events: Receiver<SessionEvent>,
    ) -> Self {
        let player_id = PlayerId::generate();
        info!("Player id: {}", player_id);

        let mut session = SessionManager::new(connector, player_id, config.profile());
        let renderer = Renderer::attach(session.world_mut());
        session.subscribe_phase(|phase| info!("Connection phase: {:?}", phase));

        Self {
            server: config.server.clone(),
            session,
            input: InputTracker::new(),
            events,
            renderer,
        }
    }

    pub fn connect(&mut self) -> bool {
        self.session.connect(&self.server)
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
    }

    pub fn key_down(&mut self, key: KeyCode) {
        if let Some(intent) = self.input.on_key_down(key) {
            self.session.send_intent(&intent);
        }
    }

    pub fn key_up(&mut self, key: KeyCode) {
        if let Some(intent) = self.input.on_key_up(key) {
            self.session.send_intent(&intent);
        }
    }

    /// Applies every transport event queued since the last call. Returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.session.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Transport event queue disconnected");
                    break;
                }
            }
        }
        handled
    }

    fn handle_keys(&mut self) {
        for key in get_keys_pressed() {
            match key {
                KeyCode::Enter if self.session.phase().can_connect() => {
                    self.connect();
                }
                KeyCode::Escape => self.disconnect(),
                _ => self.key_down(key),
            }
        }

        for key in get_keys_released() {
            self.key_up(key);
        }
    }

    pub async fn run(&mut self, auto_connect: bool) {
        if auto_connect {
            self.connect();
        }

        loop {
            self.handle_keys();
            self.pump_events();

            let hud = HudInfo {
                phase: self.session.phase(),
                player_name: self.display_name(),
                server: self.server.clone(),
            };
            self.renderer.render(&hud);

            next_frame().await;
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.session.phase()
    }

    fn display_name(&self) -> String {
        match self.session.profile().name.as_str() {
            "" => DEFAULT_PLAYER_NAME.to_string(),
            name => name.to_string(),
        }
    }
}
