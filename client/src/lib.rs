//! # Arena Client Library
//!
//! Client side of a real-time multiplayer arena game in which players steer
//! around a field and race to collect a star. The server is authoritative for
//! everything that moves; this crate only captures intent, keeps the connection
//! alive for as long as the user wants it, and shows the latest world state.
//!
//! ## Data Flow
//!
//! ```text
//! keyboard --> InputTracker --(edge)--> SessionManager::send_intent --> keyState frame
//!
//! state frame --> transport task --> event queue --> SessionManager::handle_event
//!             --> WorldStore::replace --> listeners (Renderer)
//! ```
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Edge detection over four directional flags. Arrow keys and WASD share axes,
//! and key-repeat never produces a second message.
//!
//! ### Session Module (`session`)
//! The connection lifecycle state machine (`Idle`, `Connecting`, `Open`,
//! `Joined`, `Closed`), the fire-and-forget join, intent sending, and inbound
//! message dispatch.
//!
//! ### World Module (`world`)
//! Holds the most recent authoritative snapshot and notifies subscribers
//! whenever it is replaced. There is deliberately no interpolation or
//! prediction: what is drawn is exactly what the server last sent.
//!
//! ### Transport Module (`transport`)
//! `Transport`/`Connector` seams plus the WebSocket implementation. Socket I/O
//! runs on a tokio runtime and is marshaled back to the frame-loop thread
//! through a single-consumer queue.
//!
//! ### Network Module (`network`)
//! The `Client` that owns all of the above and runs the frame loop.
//!
//! ### Rendering Module (`rendering`)
//! Draws the field, the star, the players and the player list with macroquad.
//!
//! ## Failure Model
//!
//! Nothing here raises errors to the caller at runtime. A broken or closed
//! connection simply moves the session to `Closed`; malformed or unknown
//! server frames are counted and dropped; calls made in the wrong phase do
//! nothing. There is no automatic reconnection.

pub mod config;
pub mod input;
pub mod network;
pub mod rendering;
pub mod session;
pub mod transport;
pub mod world;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to start network runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
