//! 2D Vector Math
//!
//! Float vector operations for movement, aiming, and collision tests.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// 2D vector with `f64` components.
#[derive(Clone, Copy, PartialEq, Default, Debug, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl Vec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared length.
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Length.
    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Normalize to unit length. Returns [`Vec2::ZERO`] for the zero vector.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> f64 {
        (other - self).length_squared()
    }

    /// Angle of the vector from this point to `other`, in radians.
    #[inline]
    pub fn angle_to(self, other: Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Unit vector for an angle in radians.
    #[inline]
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    /// Component-wise clamp into `[min, max]` on both axes.
    #[inline]
    pub fn clamp_to(self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            x: self.x.clamp(min_x, max_x),
            y: self.y.clamp(min_y, max_y),
        }
    }
}

/// Map an angle into the half-open interval `(-π, π]`.
#[inline]
pub fn normalize_angle(a: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut a = a.rem_euclid(tau);
    if a > std::f64::consts::PI {
        a -= tau;
    }
    a
}

/// Check whether two circles overlap (touching does not count).
#[inline]
pub fn circles_overlap(pos_a: Vec2, radius_a: f64, pos_b: Vec2, radius_b: f64) -> bool {
    let combined = radius_a + radius_b;
    pos_a.distance_squared(pos_b) < combined * combined
}

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Neg for Vec2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    #[inline]
    fn mul(self, s: f64) -> Self {
        self.scale(s)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize() {
        let v = Vec2::new(3.0, 4.0);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert!((n.x - 0.6).abs() < 1e-12);
        assert!((n.y - 0.8).abs() < 1e-12);

        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_distance() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 5.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_to() {
        let origin = Vec2::ZERO;
        assert!((origin.angle_to(Vec2::new(1.0, 0.0)) - 0.0).abs() < 1e-12);
        assert!((origin.angle_to(Vec2::new(0.0, 1.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!((origin.angle_to(Vec2::new(-1.0, 0.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(0.0)).abs() < 1e-12);
        assert!((normalize_angle(PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-12);
        assert!((normalize_angle(-0.5 * PI) + 0.5 * PI).abs() < 1e-12);

        // Everything lands in (-π, π]
        for i in -20..20 {
            let a = normalize_angle(i as f64 * 0.7);
            assert!(a > -PI - 1e-12 && a <= PI + 1e-12);
        }
    }

    #[test]
    fn test_circles_overlap() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);

        assert!(circles_overlap(a, 0.6, b, 0.6));
        assert!(!circles_overlap(a, 0.4, b, 0.4));

        // Exactly touching is not an overlap
        assert!(!circles_overlap(a, 0.5, b, 0.5));
    }

    #[test]
    fn test_clamp_to() {
        let v = Vec2::new(-5.0, 3000.0);
        let c = v.clamp_to(15.0, 1985.0, 15.0, 1985.0);
        assert_eq!(c, Vec2::new(15.0, 1985.0));
    }
}
