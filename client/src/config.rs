//! Command-line configuration

use clap::Parser;
use shared::{PlayerColor, DEFAULT_SERVER_ADDRESS};

use crate::session::JoinProfile;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Arena client: collect the star", long_about = None)]
pub struct ClientConfig {
    /// WebSocket address of the arena server
    #[arg(short = 's', long, default_value = DEFAULT_SERVER_ADDRESS)]
    pub server: String,

    /// Display name; sent as "Anon" when empty
    #[arg(short = 'n', long, default_value = "")]
    pub name: String,

    /// Player color as #RRGGBB or #RGB; random when omitted
    #[arg(short = 'c', long)]
    pub color: Option<PlayerColor>,

    /// Stay idle at startup and wait for Enter before connecting
    #[arg(long)]
    pub no_auto_connect: bool,
}

impl ClientConfig {
    pub fn profile(&self) -> JoinProfile {
        JoinProfile {
            name: self.name.trim().to_string(),
            color: self.color.clone().unwrap_or_else(PlayerColor::random),
        }
    }
}
