//! Pointer tracking
//!
//! macroquad reports the mouse position by polling, with no enter or leave
//! events. `PointerTracker` turns the polled positions into the edge-triggered
//! events the orientation controller consumes.
//!
//! A leave is seen as a sample outside the region. On the web, `index.html`
//! forwards the canvas `mouseleave` as a move to just outside the canvas.
//! Native windows keep reporting the last in-window position after the
//! cursor exits, so there the model only returns to neutral when the
//! interactive region is smaller than the window.

use serde::{Serialize, Deserialize};
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Pointer moved within the interactive region (window units)
    Move { x: f32, y: f32 },
    /// Pointer left the interactive region
    Leave,
}

/// Part of the window that reacts to the pointer, as fractions of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractiveRegion {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Default for InteractiveRegion {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, w: 1.0, h: 1.0 }
    }
}

impl InteractiveRegion {
    /// Closed on every side: a pointer on the far edge still counts as inside
    pub fn contains(&self, px: f32, py: f32, viewport: &Viewport) -> bool {
        let left = self.x * viewport.width;
        let top = self.y * viewport.height;
        let right = left + self.w * viewport.width;
        let bottom = top + self.h * viewport.height;
        px >= left && px <= right && py >= top && py <= bottom
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    pub region: InteractiveRegion,
    last: Option<(f32, f32)>,
    inside: bool,
}

impl PointerTracker {
    pub fn new(region: InteractiveRegion) -> Self {
        Self { region, last: None, inside: false }
    }

    /// Feed one polled position. Emits `Move` on entry or motion inside the
    /// region, and `Leave` once on the way out.
    pub fn sample(&mut self, x: f32, y: f32, viewport: &Viewport) -> Option<PointerEvent> {
        if self.region.contains(x, y, viewport) {
            if self.inside && self.last == Some((x, y)) {
                return None;
            }
            self.inside = true;
            self.last = Some((x, y));
            Some(PointerEvent::Move { x, y })
        } else if self.inside {
            self.inside = false;
            self.last = None;
            Some(PointerEvent::Leave)
        } else {
            None
        }
    }

    /// Forget the last position so the next sample inside emits `Move`
    pub fn reset(&mut self) {
        self.last = None;
    }

    #[cfg(test)]
    pub fn is_inside(&self) -> bool {
        self.inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp() -> Viewport {
        Viewport::new(200.0, 100.0, 1.0, 2.0)
    }

    #[test]
    fn test_move_only_on_change() {
        let mut tracker = PointerTracker::default();
        assert_eq!(tracker.sample(10.0, 10.0, &vp()), Some(PointerEvent::Move { x: 10.0, y: 10.0 }));
        assert_eq!(tracker.sample(10.0, 10.0, &vp()), None);
        assert_eq!(tracker.sample(11.0, 10.0, &vp()), Some(PointerEvent::Move { x: 11.0, y: 10.0 }));
    }

    #[test]
    fn test_leave_fires_once() {
        let mut tracker = PointerTracker::default();
        tracker.sample(10.0, 10.0, &vp());
        assert_eq!(tracker.sample(-5.0, 10.0, &vp()), Some(PointerEvent::Leave));
        assert_eq!(tracker.sample(-6.0, 10.0, &vp()), None);
        assert!(!tracker.is_inside());
    }

    #[test]
    fn test_subregion() {
        let region = InteractiveRegion { x: 0.5, y: 0.0, w: 0.5, h: 1.0 };
        let mut tracker = PointerTracker::new(region);
        assert_eq!(tracker.sample(50.0, 50.0, &vp()), None);
        assert!(matches!(tracker.sample(150.0, 50.0, &vp()), Some(PointerEvent::Move { .. })));
        assert_eq!(tracker.sample(50.0, 50.0, &vp()), Some(PointerEvent::Leave));
    }

    #[test]
    fn test_far_edges_are_inside() {
        let mut tracker = PointerTracker::default();
        assert!(tracker.region.contains(200.0, 100.0, &vp()));
        assert!(!tracker.region.contains(200.5, 50.0, &vp()));
        assert!(!tracker.region.contains(100.0, 100.5, &vp()));
        tracker.sample(100.0, 50.0, &vp());
        assert_eq!(tracker.sample(200.0, 50.0, &vp()), Some(PointerEvent::Move { x: 200.0, y: 50.0 }));
        assert_eq!(tracker.sample(100.0, 100.0, &vp()), Some(PointerEvent::Move { x: 100.0, y: 100.0 }));
    }

    #[test]
    fn test_reset_reemits_move() {
        let mut tracker = PointerTracker::default();
        tracker.sample(10.0, 10.0, &vp());
        tracker.reset();
        assert!(tracker.sample(10.0, 10.0, &vp()).is_some());
    }
}
