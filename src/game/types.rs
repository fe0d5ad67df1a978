use super::constants::WALL_HALF_WIDTH;
use super::vector::Vector2D;

/// Authoritative snake state. The wire view lives in `protocol::SnakeRecord`;
/// everything here past the public fields is simulation-private.
#[derive(Debug, Clone)]
pub struct Snake {
    pub id: u32,
    pub name: String,
    /// Polyline, tail at index 0, head last. Every segment is axis-aligned.
    /// Empty until the first respawn scan places the snake.
    pub body: Vec<Vector2D>,
    pub direction: Vector2D,
    pub prev_direction: Vector2D,
    pub score: i32,
    pub alive: bool,
    pub died: bool,
    pub dc: bool,
    pub join: bool,
    /// Ticks remaining during which the tail does not advance.
    pub growth: u32,
    /// Ticks remaining until revival.
    pub respawn: u32,
    pub venomous: bool,
    pub venom_ticks: u32,
}

impl Snake {
    pub fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            body: Vec::new(),
            direction: Vector2D::UP,
            prev_direction: Vector2D::UP,
            score: 0,
            alive: false,
            died: false,
            dc: false,
            join: true,
            growth: 0,
            // Spawns on the next tick's respawn scan.
            respawn: 1,
            venomous: false,
            venom_ticks: 0,
        }
    }

    pub fn head(&self) -> Vector2D {
        self.body[self.body.len() - 1]
    }

    pub fn kill(&mut self, respawn_rate: u32) {
        self.alive = false;
        self.died = true;
        self.respawn = respawn_rate;
        self.growth = 0;
        self.score = 0;
        self.venomous = false;
        self.venom_ticks = 0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Powerup {
    pub id: u32,
    pub loc: Vector2D,
    pub died: bool,
}

/// Axis-aligned wall run of 50-pixel blocks. The outer bounds are padded
/// by half a block on both axes and cached at construction.
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    pub id: u32,
    pub p1: Vector2D,
    pub p2: Vector2D,
    bl: Vector2D,
    tr: Vector2D,
}

impl Wall {
    pub fn new(id: u32, p1: Vector2D, p2: Vector2D) -> Self {
        let bl = Vector2D::new(
            p1.x.min(p2.x) - WALL_HALF_WIDTH,
            p1.y.min(p2.y) - WALL_HALF_WIDTH,
        );
        let tr = Vector2D::new(
            p1.x.max(p2.x) + WALL_HALF_WIDTH,
            p1.y.max(p2.y) + WALL_HALF_WIDTH,
        );
        Self { id, p1, p2, bl, tr }
    }

    pub fn bounds(&self) -> (Vector2D, Vector2D) {
        (self.bl, self.tr)
    }
}
