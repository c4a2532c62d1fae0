//! Pointer-driven orientation controller
//!
//! Maps pointer positions to a small tilt of the model and eases the model
//! toward it. Horizontal pointer motion turns the model about its Y axis and
//! vertical motion about its X axis; leaving the window eases back to rest.

use std::f32::consts::PI;

use crate::input::PointerEvent;
use crate::scene::{ModelNode, Orientation};
use crate::tween::{Ease, Tween};
use crate::viewport::Viewport;

pub struct OrientationController {
    /// Fraction of π covered edge to edge
    pub tilt_range: f32,
    tween: Tween<Orientation>,
}

impl OrientationController {
    pub fn new(tilt_range: f32, duration: f32, ease: Ease) -> Self {
        Self {
            tilt_range,
            tween: Tween::new(Orientation::NEUTRAL, duration, ease),
        }
    }

    /// Model rotation for a pointer at (x, y). The window centre is neutral and
    /// each edge is ±tilt_range·π/2. Axes are crossed: x position drives rotation about Y.
    pub fn target_for(&self, x: f32, y: f32, viewport: &Viewport) -> Orientation {
        let fx = (x / viewport.width).clamp(0.0, 1.0);
        let fy = (y / viewport.height).clamp(0.0, 1.0);
        let rot_x = (fx - 0.5) * (PI * self.tilt_range);
        let rot_y = (fy - 0.5) * (PI * self.tilt_range);
        Orientation::new(rot_y, rot_x)
    }

    /// React to a pointer event. Does nothing and returns false until a model is loaded.
    pub fn handle(&mut self, event: PointerEvent, viewport: &Viewport, model: Option<&ModelNode>) -> bool {
        if model.is_none() {
            return false;
        }
        let target = match event {
            PointerEvent::Move { x, y } => self.target_for(x, y, viewport),
            PointerEvent::Leave => Orientation::NEUTRAL,
        };
        self.tween.retarget(target);
        true
    }

    /// Advance the tween by `dt` seconds and write the result to the model
    pub fn update(&mut self, dt: f32, model: Option<&mut ModelNode>) {
        if let Some(model) = model {
            if self.tween.is_animating() {
                model.rotation = self.tween.advance(dt);
            }
        }
    }

    pub fn target(&self) -> Orientation {
        self.tween.target()
    }

    pub fn current(&self) -> Orientation {
        self.tween.value()
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_animating()
    }
}

impl Default for OrientationController {
    fn default() -> Self {
        Self::new(0.12, 0.9, Ease::Power2Out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDGE: f32 = 0.06 * PI;

    fn vp() -> Viewport {
        Viewport::new(1000.0, 500.0, 1.0, 2.0)
    }

    fn settle(ctrl: &mut OrientationController, model: &mut ModelNode) {
        for _ in 0..100 {
            ctrl.update(1.0 / 60.0, Some(model));
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_center_is_neutral() {
        let ctrl = OrientationController::default();
        assert_eq!(ctrl.target_for(500.0, 250.0, &vp()), Orientation::NEUTRAL);
    }

    #[test]
    fn test_edges_map_to_range_limits() {
        let ctrl = OrientationController::default();
        let right = ctrl.target_for(1000.0, 250.0, &vp());
        assert!(close(right.y, EDGE) && close(right.x, 0.0));
        let left = ctrl.target_for(0.0, 250.0, &vp());
        assert!(close(left.y, -EDGE));
        let bottom = ctrl.target_for(500.0, 500.0, &vp());
        assert!(close(bottom.x, EDGE) && close(bottom.y, 0.0));
    }

    #[test]
    fn test_targets_stay_in_range() {
        let ctrl = OrientationController::default();
        for (x, y) in [(-50.0, -50.0), (2000.0, 900.0), (333.0, 17.0)] {
            let t = ctrl.target_for(x, y, &vp());
            assert!(t.x.abs() <= EDGE + 1e-6 && t.y.abs() <= EDGE + 1e-6);
        }
    }

    #[test]
    fn test_events_before_load_are_ignored() {
        let mut ctrl = OrientationController::default();
        assert!(!ctrl.handle(PointerEvent::Move { x: 900.0, y: 100.0 }, &vp(), None));
        assert!(!ctrl.handle(PointerEvent::Leave, &vp(), None));
        assert!(!ctrl.is_animating());
        assert_eq!(ctrl.target(), Orientation::NEUTRAL);
        ctrl.update(0.5, None);
        assert_eq!(ctrl.current(), Orientation::NEUTRAL);
    }

    #[test]
    fn test_move_animates_model_to_target() {
        let mut ctrl = OrientationController::default();
        let mut model = ModelNode::new("m");
        assert!(ctrl.handle(PointerEvent::Move { x: 1000.0, y: 0.0 }, &vp(), Some(&model)));
        ctrl.update(0.1, Some(&mut model));
        assert!(model.rotation.y > 0.0 && model.rotation.y < EDGE);
        settle(&mut ctrl, &mut model);
        assert!(close(model.rotation.y, EDGE));
        assert!(close(model.rotation.x, -EDGE));
    }

    #[test]
    fn test_retarget_settles_on_latest() {
        let mut ctrl = OrientationController::default();
        let mut model = ModelNode::new("m");
        ctrl.handle(PointerEvent::Move { x: 1000.0, y: 250.0 }, &vp(), Some(&model));
        ctrl.update(0.2, Some(&mut model));
        ctrl.handle(PointerEvent::Move { x: 0.0, y: 250.0 }, &vp(), Some(&model));
        settle(&mut ctrl, &mut model);
        assert!(close(model.rotation.y, -EDGE));
    }

    #[test]
    fn test_leave_returns_to_rest_idempotently() {
        let mut ctrl = OrientationController::default();
        let mut model = ModelNode::new("m");
        ctrl.handle(PointerEvent::Move { x: 800.0, y: 400.0 }, &vp(), Some(&model));
        settle(&mut ctrl, &mut model);
        ctrl.handle(PointerEvent::Leave, &vp(), Some(&model));
        ctrl.update(0.3, Some(&mut model));
        let mid = model.rotation;
        // A repeated leave does not restart the animation
        ctrl.handle(PointerEvent::Leave, &vp(), Some(&model));
        ctrl.update(0.0, Some(&mut model));
        assert_eq!(model.rotation, mid);
        settle(&mut ctrl, &mut model);
        assert_eq!(model.rotation, Orientation::NEUTRAL);
    }

    #[test]
    fn test_easing_uses_wall_clock() {
        let mut a = OrientationController::default();
        let mut b = OrientationController::default();
        let mut ma = ModelNode::new("a");
        let mut mb = ModelNode::new("b");
        a.handle(PointerEvent::Move { x: 1000.0, y: 250.0 }, &vp(), Some(&ma));
        b.handle(PointerEvent::Move { x: 1000.0, y: 250.0 }, &vp(), Some(&mb));
        // 30 fps and 60 fps reach the same point after the same elapsed time
        for _ in 0..9 {
            a.update(1.0 / 30.0, Some(&mut ma));
        }
        for _ in 0..18 {
            b.update(1.0 / 60.0, Some(&mut mb));
        }
        assert!((ma.rotation.y - mb.rotation.y).abs() < 1e-4);
    }
}
