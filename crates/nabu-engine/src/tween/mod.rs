//! Frame-stepped property tweens.
//!
//! A [`Tween`] walks an easing table one entry per tick, interpolating each
//! tracked property of a [`TweenTarget`] between the value captured when it
//! starts and the requested final value. [`TweenManager`] runs many at once and
//! cancels them per target.

mod easing;
mod manager;
mod tween;

pub use easing::{Curve, EasingTable, ease_in, ease_in_out, ease_out, interpolate, linear};
pub use manager::TweenManager;
pub use tween::{Tween, TweenProperty, TweenTarget};
