//! Swept collision queries for circular racers
//!
//! A racer is a circle moving along a straight line for one tick. The sweep
//! returns every collider the circle would touch, nearest first, with the
//! contact normal pointing back toward the racer for reflection.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{RacerId, ZoneKind};

/// Static or dynamic collider geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { center: Vec2, radius: f32 },
    Segment { a: Vec2, b: Vec2 },
    /// Closed loop, last point connects back to the first
    Polygon { points: Vec<Vec2> },
}

impl Shape {
    /// Axis-aligned rectangle as a polygon
    pub fn rect(min: Vec2, max: Vec2) -> Self {
        Shape::Polygon {
            points: vec![min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)],
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            Shape::Circle { center, radius } => Aabb::around(*center, *radius),
            Shape::Segment { a, b } => Aabb::from_points(&[*a, *b]),
            Shape::Polygon { points } => Aabb::from_points(points),
        }
    }

    /// True if `p` lies inside the shape (segments have no interior)
    pub fn contains(&self, p: Vec2) -> bool {
        match self {
            Shape::Circle { center, radius } => p.distance_squared(*center) <= radius * radius,
            Shape::Segment { .. } => false,
            Shape::Polygon { points } => point_in_polygon(p, points),
        }
    }

    /// Sweep a circle of `radius` from `origin` along unit `dir` for `max_dist`.
    ///
    /// Starting inside or overlapping the shape reports a hit at distance 0.
    pub fn sweep(&self, origin: Vec2, radius: f32, dir: Vec2, max_dist: f32) -> Option<SweepHit> {
        match self {
            Shape::Circle { center, radius: r } => {
                sweep_circle_circle(origin, radius, dir, max_dist, *center, *r)
            }
            Shape::Segment { a, b } => sweep_circle_segment(origin, radius, dir, max_dist, *a, *b),
            Shape::Polygon { points } => {
                if points.len() >= 3 && point_in_polygon(origin, points) {
                    return Some(SweepHit {
                        distance: 0.0,
                        point: origin,
                        normal: -dir,
                    });
                }
                let mut best: Option<SweepHit> = None;
                for i in 0..points.len() {
                    let a = points[i];
                    let b = points[(i + 1) % points.len()];
                    if let Some(hit) = sweep_circle_segment(origin, radius, dir, max_dist, a, b) {
                        if best.as_ref().is_none_or(|h| hit.distance < h.distance) {
                            best = Some(hit);
                        }
                    }
                }
                best
            }
        }
    }
}

/// Axis-aligned bounding box, used as the broad phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn around(center: Vec2, radius: f32) -> Self {
        Self {
            min: center - Vec2::splat(radius),
            max: center + Vec2::splat(radius),
        }
    }

    pub fn from_points(points: &[Vec2]) -> Self {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    /// Bounds of a circle swept from `origin` to `origin + delta`
    pub fn swept(origin: Vec2, radius: f32, delta: Vec2) -> Self {
        let end = origin + delta;
        Self {
            min: origin.min(end) - Vec2::splat(radius),
            max: origin.max(end) + Vec2::splat(radius),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Result of a sweep against one shape
#[derive(Debug, Clone, PartialEq)]
pub struct SweepHit {
    /// Distance travelled along the sweep before contact
    pub distance: f32,
    /// Contact point on the other shape
    pub point: Vec2,
    /// Surface normal at contact, pointing toward the swept circle
    pub normal: Vec2,
}

/// What a collider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderOwner {
    Zone(ZoneKind),
    Racer(RacerId),
}

impl ColliderOwner {
    /// Blocking colliders reflect racers, the rest only raise events
    pub fn is_blocking(&self) -> bool {
        match self {
            ColliderOwner::Zone(kind) => kind.is_blocking(),
            ColliderOwner::Racer(_) => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collider {
    pub owner: ColliderOwner,
    pub shape: Shape,
    bounds: Aabb,
}

impl Collider {
    pub fn new(owner: ColliderOwner, shape: Shape) -> Self {
        let bounds = shape.bounds();
        Self { owner, shape, bounds }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

/// A hit reported by `ColliderSet::sweep`
#[derive(Debug, Clone)]
pub struct ContactHit {
    pub owner: ColliderOwner,
    pub hit: SweepHit,
}

/// All colliders for one tick, sampled at tick start
#[derive(Debug, Clone, Default)]
pub struct ColliderSet {
    colliders: Vec<Collider>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    pub fn extend(&mut self, colliders: impl IntoIterator<Item = Collider>) {
        self.colliders.extend(colliders);
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Sweep a racer's circle along `velocity` for `distance`.
    ///
    /// The racer's own body is skipped. Blocking hits are only kept when the
    /// racer is moving into the surface; trigger hits are kept on any overlap.
    /// Results are nearest first and capped at `max_hits`.
    pub fn sweep(
        &self,
        racer: RacerId,
        origin: Vec2,
        radius: f32,
        velocity: Vec2,
        distance: f32,
        max_hits: usize,
    ) -> Vec<ContactHit> {
        let Some(dir) = velocity.try_normalize() else {
            return Vec::new();
        };
        let swept = Aabb::swept(origin, radius, dir * distance);

        let mut hits: Vec<ContactHit> = self
            .colliders
            .iter()
            .filter(|c| c.owner != ColliderOwner::Racer(racer))
            .filter(|c| c.bounds.intersects(&swept))
            .filter_map(|c| {
                let hit = c.shape.sweep(origin, radius, dir, distance)?;
                if c.owner.is_blocking() && hit.normal.dot(dir) >= 0.0 {
                    return None;
                }
                Some(ContactHit { owner: c.owner, hit })
            })
            .collect();

        hits.sort_by(|a, b| a.hit.distance.total_cmp(&b.hit.distance));
        hits.truncate(max_hits);
        hits
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Sweep a circle against another circle (ray vs. Minkowski sum)
fn sweep_circle_circle(
    origin: Vec2,
    radius: f32,
    dir: Vec2,
    max_dist: f32,
    center: Vec2,
    other_radius: f32,
) -> Option<SweepHit> {
    let r = radius + other_radius;
    let m = origin - center;
    let c = m.length_squared() - r * r;

    if c <= 0.0 {
        let normal = m.try_normalize().unwrap_or(-dir);
        return Some(SweepHit {
            distance: 0.0,
            point: center + normal * other_radius,
            normal,
        });
    }

    let b = m.dot(dir);
    if b > 0.0 {
        // Outside and moving away
        return None;
    }

    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }

    let t = -b - disc.sqrt();
    if t > max_dist {
        return None;
    }

    let normal = (origin + dir * t - center).normalize_or_zero();
    Some(SweepHit {
        distance: t,
        point: center + normal * other_radius,
        normal,
    })
}

/// Sweep a circle against a line segment (flat face plus rounded end caps)
fn sweep_circle_segment(
    origin: Vec2,
    radius: f32,
    dir: Vec2,
    max_dist: f32,
    a: Vec2,
    b: Vec2,
) -> Option<SweepHit> {
    let edge = b - a;
    let len_sq = edge.length_squared();
    if len_sq < 0.0001 {
        // Degenerate segment
        return sweep_circle_circle(origin, radius, dir, max_dist, a, 0.0);
    }

    // Face normal on the racer's side of the line
    let mut normal = edge.perp().normalize();
    let mut h = (origin - a).dot(normal);
    if h < 0.0 {
        normal = -normal;
        h = -h;
    }

    let s0 = (origin - a).dot(edge) / len_sq;
    if h <= radius && (0.0..=1.0).contains(&s0) {
        return Some(SweepHit {
            distance: 0.0,
            point: a + edge * s0,
            normal,
        });
    }

    let mut best: Option<SweepHit> = None;

    let approach = dir.dot(normal);
    if approach < 0.0 && h > radius {
        let t = (h - radius) / -approach;
        if t <= max_dist {
            let center = origin + dir * t;
            let s = (center - a).dot(edge) / len_sq;
            if (0.0..=1.0).contains(&s) {
                best = Some(SweepHit {
                    distance: t,
                    point: a + edge * s,
                    normal,
                });
            }
        }
    }

    for cap in [a, b] {
        if let Some(hit) = sweep_circle_circle(origin, radius, dir, max_dist, cap, 0.0) {
            if best.as_ref().is_none_or(|h| hit.distance < h.distance) {
                best = Some(hit);
            }
        }
    }

    best
}

/// Crossing-number point-in-polygon test
fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    let mut inside = false;
    let n = points.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > p.y) != (pj.y > p.y) && p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
