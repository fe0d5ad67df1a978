use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Planar position or direction. Wire-visible as `{"X": .., "Y": ..}`;
/// screen coordinates, so "up" is negative Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2D {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
}

impl Vector2D {
    pub const UP: Vector2D = Vector2D { x: 0.0, y: -1.0 };
    pub const DOWN: Vector2D = Vector2D { x: 0.0, y: 1.0 };
    pub const LEFT: Vector2D = Vector2D { x: -1.0, y: 0.0 };
    pub const RIGHT: Vector2D = Vector2D { x: 1.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(self) -> Vector2D {
        let len = self.length();
        if !len.is_finite() || len == 0.0 {
            return Vector2D::new(0.0, 0.0);
        }
        Vector2D::new(self.x / len, self.y / len)
    }

    pub fn dot(self, other: Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// True iff `self` and `other` are opposite unit cardinals. The dot
    /// product of two axis-aligned unit vectors is exactly -1.0 only when
    /// they point in opposite directions along the same axis.
    pub fn is_cardinal_opposite(self, other: Vector2D) -> bool {
        self.dot(other) == -1.0 && (self.x == 0.0) == (other.x == 0.0)
    }

    /// Collapses an axis-aligned displacement to the unit cardinal it runs
    /// along. Diagonal or zero displacements have no cardinal.
    pub fn cardinal(self) -> Option<Vector2D> {
        if self.x == 0.0 && self.y != 0.0 {
            Some(if self.y < 0.0 {
                Vector2D::UP
            } else {
                Vector2D::DOWN
            })
        } else if self.y == 0.0 && self.x != 0.0 {
            Some(if self.x < 0.0 {
                Vector2D::LEFT
            } else {
                Vector2D::RIGHT
            })
        } else {
            None
        }
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, other: Vector2D) -> Vector2D {
        Vector2D::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, other: Vector2D) -> Vector2D {
        Vector2D::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;

    fn mul(self, scalar: f64) -> Vector2D {
        Vector2D::new(self.x * scalar, self.y * scalar)
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}

/// Total length of a polyline given tail-to-head.
pub fn polyline_length(points: &[Vector2D]) -> f64 {
    points
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).length())
        .sum()
}
