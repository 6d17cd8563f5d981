//! Coroutines: multi-tick sequences written as `async` blocks.
//!
//! A coroutine is polled once per tick. Each `.await` on one of the wait
//! futures is a yield point whose condition is checked on the following ticks;
//! the body resumes, within that same tick, as soon as it holds.
//!
//! ```ignore
//! manager.run(|co| async move {
//!     co.frames(30).await;
//!     co.tween(&fade_out).await;
//!     scene.dispose();
//! });
//! ```

mod coroutine;
mod manager;
mod wait;

pub use coroutine::{Coroutine, CoroutineState, Yielder};
pub use manager::CoroutineManager;
pub use wait::{Wait, wait_coroutine, wait_frame, wait_frames, wait_tween, wait_until};
