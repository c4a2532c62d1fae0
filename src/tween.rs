//! Retargetable tweens
//!
//! A tween eases a value toward a target over a fixed wall-clock duration.
//! Retargeting mid-flight restarts from the current animated value, so there
//! is never more than one animation per property and stale targets are
//! simply dropped.

use serde::{Serialize, Deserialize};

/// Values that can be linearly interpolated
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

/// Easing curves. The `Out` variants start fast and settle smoothly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    /// Quadratic ease-out
    Power1Out,
    /// Cubic ease-out
    #[default]
    Power2Out,
    /// Quartic ease-out
    Power3Out,
    /// Cubic ease-in-out
    Power2InOut,
}

impl Ease {
    /// Map linear progress in [0, 1] to eased progress in [0, 1]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1Out => 1.0 - (1.0 - t).powi(2),
            Ease::Power2Out => 1.0 - (1.0 - t).powi(3),
            Ease::Power3Out => 1.0 - (1.0 - t).powi(4),
            Ease::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenState<T> {
    Idle,
    Animating { from: T, to: T, elapsed: f32 },
}

#[derive(Debug, Clone)]
pub struct Tween<T: Lerp> {
    value: T,
    state: TweenState<T>,
    pub duration: f32,
    pub ease: Ease,
}

impl<T: Lerp + PartialEq> Tween<T> {
    pub fn new(value: T, duration: f32, ease: Ease) -> Self {
        Self {
            value,
            state: TweenState::Idle,
            duration: duration.max(0.0),
            ease,
        }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn state(&self) -> TweenState<T> {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, TweenState::Animating { .. })
    }

    /// Where the tween will settle
    pub fn target(&self) -> T {
        match self.state {
            TweenState::Idle => self.value,
            TweenState::Animating { to, .. } => to,
        }
    }

    /// Start animating from the current value toward `to`.
    /// Returns false if `to` is already the target, leaving the animation untouched.
    pub fn retarget(&mut self, to: T) -> bool {
        if self.target() == to {
            return false;
        }
        self.state = TweenState::Animating { from: self.value, to, elapsed: 0.0 };
        true
    }

    /// Snap to a value and stop animating
    pub fn jump_to(&mut self, value: T) {
        self.value = value;
        self.state = TweenState::Idle;
    }

    /// Advance by `dt` seconds of wall-clock time and return the new value
    pub fn advance(&mut self, dt: f32) -> T {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if let TweenState::Animating { from, to, elapsed } = self.state {
            let elapsed = elapsed + dt;
            if self.duration <= 0.0 || elapsed >= self.duration {
                self.value = to;
                self.state = TweenState::Idle;
            } else {
                let t = self.ease.apply(elapsed / self.duration);
                self.value = from.lerp(to, t);
                self.state = TweenState::Animating { from, to, elapsed };
            }
        }
        self.value
    }
}
