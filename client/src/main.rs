use clap::Parser;
use client::config::ClientConfig;
use client::network::Client;
use log::{error, info};
use macroquad::prelude::Conf;
use shared::{FIELD_HEIGHT, FIELD_WIDTH};

fn window_conf() -> Conf {
    Conf {
        window_title: "Arena".to_string(),
        window_width: FIELD_WIDTH as i32 + 300,
        window_height: FIELD_HEIGHT as i32 + 60,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::parse();

    info!("Starting client...");
    info!("Server: {}", config.server);
    info!("Controls: Arrows/WASD to move, Enter to connect, Esc to disconnect");

    let mut client = match Client::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    client.run(!config.no_auto_connect).await;
}
