use macroquad::prelude::*;
use shared::{PlayerColor, PlayerSnapshot, WorldSnapshot, FIELD_HEIGHT, FIELD_WIDTH};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::session::ConnectionPhase;
use crate::world::WorldStore;

const PLAYER_RADIUS: f32 = 12.0;
const STAR_RADIUS: f32 = 8.0;
const SIDEBAR_X: f32 = FIELD_WIDTH + 20.0;

#[derive(Debug, Clone)]
pub struct HudInfo {
    pub phase: ConnectionPhase,
    pub player_name: String,
    pub server: String,
}

/// Draws whatever snapshot the world store last delivered.
///
/// Stays subscribed for the lifetime of the store.
pub struct Renderer {
    latest: Rc<RefCell<Option<Arc<WorldSnapshot>>>>,
}

impl Renderer {
    pub fn attach(world: &mut WorldStore) -> Self {
        let latest = Rc::new(RefCell::new(world.current()));
        {
            let latest = Rc::clone(&latest);
            world.subscribe(move |snapshot| *latest.borrow_mut() = Some(snapshot));
        }

        Self { latest }
    }

    pub fn latest(&self) -> Option<Arc<WorldSnapshot>> {
        self.latest.borrow().clone()
    }

    pub fn render(&self, hud: &HudInfo) {
        clear_background(Color::from_rgba(30, 30, 36, 255));

        draw_rectangle(
            0.0,
            0.0,
            FIELD_WIDTH,
            FIELD_HEIGHT,
            Color::from_rgba(220, 252, 231, 255),
        );
        draw_rectangle_lines(0.0, 0.0, FIELD_WIDTH, FIELD_HEIGHT, 2.0, GRAY);

        if let Some(world) = self.latest() {
            self.draw_star(&world);
            for player in &world.players {
                self.draw_player(player);
            }
            self.draw_player_list(&world);
        }

        self.draw_hud(hud);
    }

    fn draw_star(&self, world: &WorldSnapshot) {
        draw_circle(world.target.x, world.target.y, STAR_RADIUS, YELLOW);
        draw_circle_lines(world.target.x, world.target.y, STAR_RADIUS, 1.5, ORANGE);
    }

    fn draw_player(&self, player: &PlayerSnapshot) {
        let pos = player.position();
        draw_circle(pos.x, pos.y, PLAYER_RADIUS, player_color(&player.color));
        draw_circle_lines(pos.x, pos.y, PLAYER_RADIUS, 2.0, DARKGRAY);

        let badge = player.badge();
        let size = measure_text(&badge, None, 14, 1.0);
        draw_text(
            &badge,
            pos.x - size.width / 2.0,
            pos.y + size.height / 2.0,
            14.0,
            WHITE,
        );
    }

    fn draw_player_list(&self, world: &WorldSnapshot) {
        draw_text("Players", SIDEBAR_X, 30.0, 24.0, WHITE);

        for (i, player) in world.players.iter().enumerate() {
            draw_text(
                &player_line(player),
                SIDEBAR_X,
                60.0 + i as f32 * 22.0,
                18.0,
                player_color(&player.color),
            );
        }
    }

    fn draw_hud(&self, hud: &HudInfo) {
        let y = FIELD_HEIGHT + 24.0;
        let status = match hud.phase {
            ConnectionPhase::Idle => "Idle - press Enter to connect".to_string(),
            ConnectionPhase::Connecting => format!("Connecting to {}...", hud.server),
            ConnectionPhase::Open => "Joining...".to_string(),
            ConnectionPhase::Joined => format!("Connected as {}", hud.player_name),
            ConnectionPhase::Closed => "Disconnected - press Enter to connect".to_string(),
        };

        draw_text(&status, 10.0, y, 20.0, WHITE);
        draw_text(
            "Arrows or WASD to move, Esc to disconnect. Collect the star!",
            10.0,
            y + 24.0,
            18.0,
            LIGHTGRAY,
        );
    }
}

/// "name (score) [x, y]" with rounded coordinates, as shown in the player list.
pub fn player_line(player: &PlayerSnapshot) -> String {
    format!(
        "{} ({}) [{}, {}]",
        player.display_name,
        player.score,
        player.x.round() as i32,
        player.y.round() as i32
    )
}

fn player_color(color: &str) -> Color {
    match color.parse::<PlayerColor>() {
        Ok(color) => {
            let (r, g, b) = color.rgb();
            Color::from_rgba(r, g, b, 255)
        }
        Err(_) => GRAY,
    }
}
