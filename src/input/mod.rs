//! Input handling
//!
//! Polls the macroquad mouse position and converts it into pointer events
//! for the orientation controller.

mod pointer;

pub use pointer::{InteractiveRegion, PointerEvent, PointerTracker};
