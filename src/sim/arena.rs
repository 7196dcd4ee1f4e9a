//! Arena geometry: level walls, zones, spawn point and draggable markers
//!
//! Static colliders are cached and only rebuilt when the geometry changes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Collider, ColliderOwner, ColliderSet, Shape};
use super::drag::{DragParts, Draggable, Dragging};
use super::state::{Racer, TriggerZone, ZoneKind};

/// A draggable decoration (start flag, goal flag)
#[derive(Debug, Clone)]
pub struct Marker {
    pub pos: Vec2,
    pub drag: Draggable,
}

impl Marker {
    pub fn new(name: impl Into<String>, pos: Vec2) -> Self {
        Self {
            pos,
            drag: Draggable::new(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.drag.name
    }
}

impl Dragging for Marker {
    fn drag_name(&self) -> &str {
        &self.drag.name
    }

    fn drag_parts(&mut self) -> Option<DragParts<'_>> {
        Some(DragParts {
            handle: &mut self.drag,
            pos: &mut self.pos,
        })
    }
}

/// Serializable arena layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaLayout {
    /// Level outline and obstacles
    pub walls: Vec<Shape>,
    /// Goal, kiss zones and extra solid zones
    pub zones: Vec<TriggerZone>,
    pub spawn_point: Vec2,
    pub start_flag: Vec2,
    pub goal_flag: Vec2,
}

pub struct Arena {
    walls: Vec<Shape>,
    zones: Vec<TriggerZone>,
    pub spawn_point: Vec2,
    pub markers: Vec<Marker>,
    static_colliders: Vec<Collider>,
}

impl Arena {
    pub fn new(layout: ArenaLayout) -> Self {
        let mut arena = Self {
            walls: layout.walls,
            zones: layout.zones,
            spawn_point: layout.spawn_point,
            markers: vec![
                Marker::new("Start", layout.start_flag),
                Marker::new("Goal", layout.goal_flag),
            ],
            static_colliders: Vec::new(),
        };
        arena.rebuild_colliders();
        if arena.spawn_in_goal() {
            log::warn!("Spawn point {} lies inside a goal", arena.spawn_point);
        }
        arena
    }

    /// A 16x9 walled box with baffles, a goal pocket top-right and a kiss
    /// zone in the middle. Racers spawn bottom-left.
    pub fn demo() -> Self {
        let (w, h) = (8.0, 4.5);
        let mut walls = closed_outline(&[
            Vec2::new(-w, -h),
            Vec2::new(w, -h),
            Vec2::new(w, h),
            Vec2::new(-w, h),
        ]);
        walls.extend([
            Shape::Segment {
                a: Vec2::new(-3.0, -4.5),
                b: Vec2::new(-3.0, 1.5),
            },
            Shape::Segment {
                a: Vec2::new(2.0, 4.5),
                b: Vec2::new(2.0, -1.5),
            },
            Shape::Circle {
                center: Vec2::new(-0.5, -2.0),
                radius: 0.6,
            },
        ]);
        let zones = vec![
            TriggerZone::new(
                ZoneKind::Goal,
                Shape::rect(Vec2::new(6.5, 3.0), Vec2::new(7.9, 4.4)),
            ),
            TriggerZone::new(
                ZoneKind::KissZone,
                Shape::rect(Vec2::new(-2.5, -1.0), Vec2::new(1.5, 2.0)),
            ),
        ];
        Self::new(ArenaLayout {
            walls,
            zones,
            spawn_point: Vec2::new(-6.0, -3.0),
            start_flag: Vec2::new(-6.0, -3.8),
            goal_flag: Vec2::new(7.2, 3.7),
        })
    }

    pub fn walls(&self) -> &[Shape] {
        &self.walls
    }

    pub fn zones(&self) -> &[TriggerZone] {
        &self.zones
    }

    /// Swap the level outline (new level image), regenerating colliders
    pub fn set_level_walls(&mut self, walls: Vec<Shape>) {
        self.walls = walls;
        self.rebuild_colliders();
        log::info!("Level geometry replaced ({} walls)", self.walls.len());
    }

    pub fn set_zones(&mut self, zones: Vec<TriggerZone>) {
        self.zones = zones;
        self.rebuild_colliders();
    }

    /// Racers spawned here would win on their first sweep
    pub fn spawn_in_goal(&self) -> bool {
        self.zones
            .iter()
            .any(|z| z.kind == ZoneKind::Goal && z.shape.contains(self.spawn_point))
    }

    pub fn marker_mut(&mut self, name: &str) -> Option<&mut Marker> {
        self.markers.iter_mut().find(|m| m.name() == name)
    }

    fn rebuild_colliders(&mut self) {
        let walls = self
            .walls
            .iter()
            .map(|shape| Collider::new(ColliderOwner::Zone(ZoneKind::SolidWall), shape.clone()));
        let zones = self
            .zones
            .iter()
            .map(|zone| Collider::new(ColliderOwner::Zone(zone.kind), zone.shape.clone()));
        self.static_colliders = walls.chain(zones).collect();
    }

    /// Static geometry plus every racer body, sampled now
    pub fn frame_colliders(&self, racers: &[Racer]) -> ColliderSet {
        let mut set = ColliderSet::new();
        set.extend(self.static_colliders.iter().cloned());
        set.extend(
            racers
                .iter()
                .map(|r| Collider::new(ColliderOwner::Racer(r.id), r.body())),
        );
        set
    }

    pub fn static_collider_count(&self) -> usize {
        self.static_colliders.len()
    }
}

/// Edges of a closed loop as segments, so racers inside it bounce off the rim
pub fn closed_outline(points: &[Vec2]) -> Vec<Shape> {
    if points.len() < 2 {
        return Vec::new();
    }
    (0..points.len())
        .map(|i| Shape::Segment {
            a: points[i],
            b: points[(i + 1) % points.len()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{RacerId, RacerProfile};

    #[test]
    fn test_demo_arena_has_goal_and_kiss_zone() {
        let arena = Arena::demo();
        assert!(arena.zones().iter().any(|z| z.kind == ZoneKind::Goal));
        assert!(arena.zones().iter().any(|z| z.kind == ZoneKind::KissZone));
        assert_eq!(arena.static_collider_count(), arena.walls().len() + arena.zones().len());
    }

    #[test]
    fn test_level_swap_regenerates_colliders() {
        let mut arena = Arena::demo();
        arena.set_level_walls(vec![Shape::Segment {
            a: Vec2::new(0.0, -1.0),
            b: Vec2::new(0.0, 1.0),
        }]);
        assert_eq!(arena.static_collider_count(), 1 + arena.zones().len());
    }

    #[test]
    fn test_zone_swap_and_spawn_check() {
        let mut arena = Arena::demo();
        assert!(!arena.spawn_in_goal());

        let spawn = arena.spawn_point;
        arena.set_zones(vec![TriggerZone::new(
            ZoneKind::Goal,
            Shape::Circle {
                center: spawn,
                radius: 1.0,
            },
        )]);
        assert!(arena.spawn_in_goal());
        assert_eq!(arena.static_collider_count(), arena.walls().len() + 1);
    }

    #[test]
    fn test_frame_colliders_include_racers() {
        let arena = Arena::demo();
        let racers = vec![
            Racer::new(RacerId(0), RacerProfile::named("A"), Vec2::ZERO),
            Racer::new(RacerId(1), RacerProfile::named("B"), Vec2::ONE),
        ];
        let set = arena.frame_colliders(&racers);
        assert_eq!(set.len(), arena.static_collider_count() + 2);
    }

    #[test]
    fn test_closed_outline_wraps() {
        let walls = closed_outline(&[Vec2::ZERO, Vec2::X, Vec2::ONE]);
        assert_eq!(walls.len(), 3);
        assert_eq!(
            walls[2],
            Shape::Segment {
                a: Vec2::ONE,
                b: Vec2::ZERO
            }
        );
        assert!(closed_outline(&[Vec2::ZERO]).is_empty());
    }

    #[test]
    fn test_markers_are_draggable() {
        let mut arena = Arena::demo();
        let goal = arena.marker_mut("Goal").expect("goal flag");
        let parts = goal.drag_parts().expect("always draggable");
        parts.handle.begin_drag();
        assert!(goal.drag.is_dragging());
        assert!(arena.marker_mut("Nope").is_none());
    }
}
