//! Point-vs-AABB collision kernel. Every test takes a query point and the
//! side length of its bounding square, and inflates the target's rectangle
//! by half the query size so a single containment check answers the
//! square-vs-rectangle question.

use super::constants::{POWERUP_WIDTH, SNAKE_WIDTH};
use super::types::Wall;
use super::vector::Vector2D;

/// A segment whose endpoints sit at equal magnitude with opposite signs on
/// the differing axis is the seam of an edge wrap and never collides.
pub fn is_wrap_segment(a: Vector2D, b: Vector2D) -> bool {
    (a.x == -b.x && a.x != 0.0) || (a.y == -b.y && a.y != 0.0)
}

fn rect_contains(bl: Vector2D, tr: Vector2D, point: Vector2D) -> bool {
    point.x >= bl.x && point.x <= tr.x && point.y >= bl.y && point.y <= tr.y
}

fn segment_contains(a: Vector2D, b: Vector2D, inflate: f64, point: Vector2D) -> bool {
    let bl = Vector2D::new(a.x.min(b.x) - inflate, a.y.min(b.y) - inflate);
    let tr = Vector2D::new(a.x.max(b.x) + inflate, a.y.max(b.y) + inflate);
    rect_contains(bl, tr, point)
}

/// Does the query square touch any segment of the given body polyline?
pub fn point_hits_snake(point: Vector2D, size: f64, body: &[Vector2D]) -> bool {
    let inflate = SNAKE_WIDTH / 2.0 + size / 2.0;
    body.windows(2).any(|pair| {
        !is_wrap_segment(pair[0], pair[1]) && segment_contains(pair[0], pair[1], inflate, point)
    })
}

pub fn point_hits_wall(point: Vector2D, size: f64, wall: &Wall) -> bool {
    let (bl, tr) = wall.bounds();
    let inflate = size / 2.0;
    rect_contains(
        Vector2D::new(bl.x - inflate, bl.y - inflate),
        Vector2D::new(tr.x + inflate, tr.y + inflate),
        point,
    )
}

pub fn point_hits_powerup(point: Vector2D, size: f64, loc: Vector2D) -> bool {
    let inflate = POWERUP_WIDTH / 2.0 + size / 2.0;
    (point.x - loc.x).abs() <= inflate && (point.y - loc.y).abs() <= inflate
}

/// Self-collision with the in-flight-turn gate: walking back from the head,
/// segments are ignored until one runs cardinal-opposite to the current
/// direction. The head can exit its own neck after a U-turn while a full
/// coil is still caught.
pub fn self_collision(body: &[Vector2D], direction: Vector2D) -> bool {
    if body.len() < 2 {
        return false;
    }
    let head = body[body.len() - 1];
    let inflate = SNAKE_WIDTH;
    let mut armed = false;
    for i in (0..body.len() - 1).rev() {
        let a = body[i];
        let b = body[i + 1];
        if is_wrap_segment(a, b) {
            continue;
        }
        if !armed {
            if let Some(seg_dir) = (b - a).cardinal() {
                if seg_dir.is_cardinal_opposite(direction) {
                    armed = true;
                }
            }
            continue;
        }
        if segment_contains(a, b, inflate, head) {
            return true;
        }
    }
    false
}
