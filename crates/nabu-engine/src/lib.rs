//! Nabu engine crate.
//!
//! This crate owns the scheduling core (update lists, frame and event dispatch,
//! contexts, fixed-rate timing), tweens and coroutines, and the display-list tree
//! used by the higher `nabu-ui` layer.

pub mod canvas;
pub mod coords;
pub mod coroutine;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod input;
pub mod logging;
pub mod resource;
pub mod state;
pub mod time;
pub mod tween;
