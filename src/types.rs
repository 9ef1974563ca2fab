use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Unit vector, or `fallback` for the zero vector.
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if len > 0.0 {
            Vec2::new(self.x / len, self.y / len)
        } else {
            fallback
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Pixel size of the simulated area. The floor sits at `height`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_measurable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Gold,
    Green,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn scaled(self, factor: f32) -> Rgb {
        let f = factor.clamp(0.0, 1.0);
        let channel = |c: u8| (c as f32 * f).round() as u8;
        Rgb(channel(self.0), channel(self.1), channel(self.2))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedTerm {
    pub text: String,
    pub count: u32,
    pub category: String,
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub text: String,
    pub count: u32,
    pub category: String,
    pub palette: Palette,
    pub ratio: f32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub opacity: f32,
    /// Degrees.
    pub rotation: f32,
}

impl Particle {
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.radius
    }
}

/// Read-only per-frame view of a particle handed to renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParticleSnapshot {
    pub text: String,
    pub count: u32,
    pub category: String,
    pub palette: Palette,
    pub ratio: f32,
    pub color_index: usize,
    pub pos: Vec2,
    pub radius: f32,
    pub opacity: f32,
    pub rotation: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod vec2_length {
        use super::*;

        #[test]
        fn calculates_length() {
            assert_eq!(Vec2::new(3.0, 4.0).length(), 5.0);
        }

        #[test]
        fn distance_is_symmetric() {
            let a = Vec2::new(1.0, 1.0);
            let b = Vec2::new(4.0, 5.0);
            assert_eq!(a.distance(b), 5.0);
            assert_eq!(b.distance(a), 5.0);
        }
    }

    mod vec2_normalize_or {
        use super::*;

        #[test]
        fn normalizes_non_zero_vector() {
            let v = Vec2::new(3.0, 4.0).normalize_or(Vec2::ZERO);
            assert!((v.x - 0.6).abs() < 1e-6);
            assert!((v.y - 0.8).abs() < 1e-6);
        }

        #[test]
        fn zero_vector_uses_fallback() {
            let v = Vec2::ZERO.normalize_or(Vec2::new(1.0, 0.0));
            assert_eq!(v, Vec2::new(1.0, 0.0));
        }
    }

    mod vec2_ops {
        use super::*;

        #[test]
        fn add_and_sub_assign_round_trip() {
            let mut a = Vec2::new(5.0, 7.0);
            a += Vec2::new(1.0, 1.0);
            a -= Vec2::new(2.0, 3.0);
            assert_eq!(a, Vec2::new(4.0, 5.0));
        }

        #[test]
        fn scales_by_scalar() {
            assert_eq!(Vec2::new(2.0, -3.0) * 2.0, Vec2::new(4.0, -6.0));
        }
    }

    mod extent_is_measurable {
        use super::*;

        #[test]
        fn positive_extent_is_measurable() {
            assert!(Extent::new(800.0, 600.0).is_measurable());
        }

        #[test]
        fn zero_width_is_not_measurable() {
            assert!(!Extent::new(0.0, 600.0).is_measurable());
        }

        #[test]
        fn nan_height_is_not_measurable() {
            assert!(!Extent::new(800.0, f32::NAN).is_measurable());
        }
    }

    mod rgb_scaled {
        use super::*;

        #[test]
        fn full_opacity_keeps_color() {
            assert_eq!(Rgb(212, 175, 55).scaled(1.0), Rgb(212, 175, 55));
        }

        #[test]
        fn zero_opacity_is_black() {
            assert_eq!(Rgb(212, 175, 55).scaled(0.0), Rgb(0, 0, 0));
        }

        #[test]
        fn factor_is_clamped() {
            assert_eq!(Rgb(100, 100, 100).scaled(3.0), Rgb(100, 100, 100));
        }
    }
}
