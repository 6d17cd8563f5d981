//! Pointer input as delivered to contexts.
//!
//! Hosts translate raw mouse/touch events into [`TouchData`] and defer them on
//! the active context under the `touch_*` event names.

mod types;

pub use types::{TOUCH_BEGIN, TOUCH_CANCEL, TOUCH_END, TOUCH_MOVE, TouchData, TouchPhase};
