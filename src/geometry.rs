use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// A position in canvas space (pixels, origin top-left, y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        distance(*self, other)
    }

    pub fn offset_from(&self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

/// Velocity in pixels per second
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Scale down so that `speed() <= max_speed`, keeping the heading.
    pub fn clamped(self, max_speed: f64) -> Self {
        let speed = self.speed();
        if speed > max_speed && speed > 0.0 {
            let k = max_speed / speed;
            Velocity::new(self.vx * k, self.vy * k)
        } else {
            self
        }
    }
}

/// Drawable canvas bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Arena {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn shorter_side(&self) -> f64 {
        self.width.min(self.height)
    }

    /// Uniformly random point keeping `margin` pixels away from every edge.
    /// Arenas narrower than two margins collapse to the centre line on that axis.
    pub fn random_point(&self, margin: f64, rng: &mut dyn RngCore) -> Point {
        Point::new(
            random_axis(self.width, margin, rng),
            random_axis(self.height, margin, rng),
        )
    }

    /// Clamp a point so that it stays `margin` pixels inside the arena.
    pub fn clamp(&self, p: Point, margin: f64) -> Point {
        Point::new(
            clamp_axis(p.x, self.width, margin),
            clamp_axis(p.y, self.height, margin),
        )
    }
}

fn random_axis(extent: f64, margin: f64, rng: &mut dyn RngCore) -> f64 {
    let lo = margin;
    let hi = extent - margin;
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        extent / 2.0
    }
}

fn clamp_axis(v: f64, extent: f64, margin: f64) -> f64 {
    if extent - margin > margin {
        v.clamp(margin, extent - margin)
    } else {
        extent / 2.0
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Target size is a diameter: the click lands when it is within half of it.
pub fn is_hit(click: Point, center: Point, size: f64) -> bool {
    distance(click, center) <= size / 2.0
}

/// Milliseconds between two timestamps, never negative.
pub fn elapsed_ms(since_ms: f64, now_ms: f64) -> f64 {
    (now_ms - since_ms).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_distance() {
        assert_eq!(distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_hit_uses_half_size() {
        let c = Point::new(100.0, 100.0);
        assert!(is_hit(Point::new(125.0, 100.0), c, 50.0));
        assert!(!is_hit(Point::new(125.1, 100.0), c, 50.0));
    }

    #[test]
    fn test_random_point_respects_margin() {
        let arena = Arena::new(200.0, 100.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = arena.random_point(20.0, &mut rng);
            assert!(p.x >= 20.0 && p.x <= 180.0);
            assert!(p.y >= 20.0 && p.y <= 80.0);
        }
    }

    #[test]
    fn test_random_point_tiny_arena_falls_back_to_center() {
        let arena = Arena::new(30.0, 30.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(arena.random_point(20.0, &mut rng), Point::new(15.0, 15.0));
    }

    #[test]
    fn test_velocity_clamp_keeps_heading() {
        let v = Velocity::new(300.0, 400.0).clamped(50.0);
        assert!((v.speed() - 50.0).abs() < 1e-9);
        assert!((v.vx / v.vy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_never_negative() {
        assert_eq!(elapsed_ms(100.0, 50.0), 0.0);
        assert_eq!(elapsed_ms(100.0, 250.0), 150.0);
    }
}
