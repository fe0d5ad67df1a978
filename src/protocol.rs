//! Wire vocabulary for the line-delimited JSON stream. Each record is one
//! JSON object per line; the simulation types never serialize directly, so
//! the field set the client sees is pinned here and nowhere else.

use crate::game::constants::MAX_NAME_LENGTH;
use crate::game::types::{Powerup, Snake, Wall};
use crate::game::vector::Vector2D;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnakeRecord {
    pub snake: u32,
    pub name: String,
    pub body: Vec<Vector2D>,
    pub dir: Vector2D,
    pub score: i32,
    pub died: bool,
    pub alive: bool,
    pub dc: bool,
    pub join: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerupRecord {
    pub power: u32,
    pub loc: Vector2D,
    pub died: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WallRecord {
    pub wall: u32,
    pub p1: Vector2D,
    pub p2: Vector2D,
}

#[derive(Debug, Deserialize)]
struct MoveMessage {
    moving: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCommand {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl MoveCommand {
    pub fn direction(self) -> Option<Vector2D> {
        match self {
            MoveCommand::Up => Some(Vector2D::UP),
            MoveCommand::Down => Some(Vector2D::DOWN),
            MoveCommand::Left => Some(Vector2D::LEFT),
            MoveCommand::Right => Some(Vector2D::RIGHT),
            MoveCommand::None => None,
        }
    }
}

/// Parses one client line. Malformed JSON and unknown `moving` values are
/// dropped without closing the connection.
pub fn decode_move_command(line: &str) -> Option<MoveCommand> {
    let message: MoveMessage = serde_json::from_str(line).ok()?;
    match message.moving.as_str() {
        "up" => Some(MoveCommand::Up),
        "down" => Some(MoveCommand::Down),
        "left" => Some(MoveCommand::Left),
        "right" => Some(MoveCommand::Right),
        "none" => Some(MoveCommand::None),
        _ => None,
    }
}

/// Maps a simulation snake to its wire record. The display name is passed
/// in because venom mode suffixes it with the remaining venom seconds.
pub fn snake_record(snake: &Snake, display_name: String) -> SnakeRecord {
    SnakeRecord {
        snake: snake.id,
        name: display_name,
        body: snake.body.clone(),
        dir: snake.direction,
        score: snake.score,
        died: snake.died,
        alive: snake.alive,
        dc: snake.dc,
        join: snake.join,
    }
}

pub fn powerup_record(powerup: &Powerup) -> PowerupRecord {
    PowerupRecord {
        power: powerup.id,
        loc: powerup.loc,
        died: powerup.died,
    }
}

pub fn wall_record(wall: &Wall) -> WallRecord {
    WallRecord {
        wall: wall.id,
        p1: wall.p1,
        p2: wall.p2,
    }
}

/// Appends one record as a JSON line. Serialization of our own records
/// cannot fail; a failure would indicate a bug and drops the record.
pub fn push_line<T: Serialize>(out: &mut String, record: &T) {
    match serde_json::to_string(record) {
        Ok(json) => {
            out.push_str(&json);
            out.push('\n');
        }
        Err(error) => {
            tracing::error!(%error, "failed to encode wire record");
        }
    }
}

/// Collapses whitespace runs, clamps the length, and substitutes a default
/// for empty handshake names.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return "Player".to_string();
    }
    cleaned.chars().take(MAX_NAME_LENGTH).collect()
}
