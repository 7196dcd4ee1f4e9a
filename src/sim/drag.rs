//! Drag-to-place capability for racers and arena markers
//!
//! Anything that can be picked up with the pointer owns a `Draggable` and
//! exposes it through the `Dragging` trait. While held, the position eases
//! toward the pointer with a critically damped spring.

use glam::Vec2;

use crate::persistence::PositionStore;

/// Default smoothing time (seconds to roughly reach the pointer)
pub const DRAG_SMOOTH_TIME: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct Draggable {
    /// Persistence key
    pub name: String,
    dragging: bool,
    velocity: Vec2,
    smooth_time: f32,
}

impl Draggable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dragging: false,
            velocity: Vec2::ZERO,
            smooth_time: DRAG_SMOOTH_TIME,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
        self.velocity = Vec2::ZERO;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Move `pos` toward `pointer` while held
    pub fn follow(&mut self, pos: &mut Vec2, pointer: Vec2, dt: f32) {
        if self.dragging {
            *pos = smooth_damp(*pos, pointer, &mut self.velocity, self.smooth_time, dt);
        }
    }

    /// Restore a saved position, keeping `pos` when nothing was stored
    pub fn load_position(&self, store: &dyn PositionStore, pos: &mut Vec2) {
        *pos = store.load_position(&self.name, *pos);
    }

    pub fn save_position(&self, store: &mut dyn PositionStore, pos: Vec2) {
        store.save_position(&self.name, pos);
    }
}

/// Borrowed drag component plus the position it moves
pub struct DragParts<'a> {
    pub handle: &'a mut Draggable,
    pub pos: &'a mut Vec2,
}

/// Capability query for things that may be draggable
pub trait Dragging {
    fn drag_name(&self) -> &str;
    fn drag_parts(&mut self) -> Option<DragParts<'_>>;
}

impl Dragging for super::state::Racer {
    fn drag_name(&self) -> &str {
        &self.name
    }

    fn drag_parts(&mut self) -> Option<DragParts<'_>> {
        let handle = self.drag.as_mut()?;
        Some(DragParts {
            handle,
            pos: &mut self.pos,
        })
    }
}

/// Critically damped spring toward `target`
pub fn smooth_damp(current: Vec2, target: Vec2, velocity: &mut Vec2, smooth_time: f32, dt: f32) -> Vec2 {
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Don't overshoot
    if (target - current).dot(output - target) > 0.0 {
        output = target;
        *velocity = (output - target) / dt.max(0.0001);
    }
    output
}
