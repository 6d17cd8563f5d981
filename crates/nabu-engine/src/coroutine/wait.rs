use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use super::Coroutine;
use crate::tween::Tween;

/// A yield point: suspends once, then resumes on the first tick `condition` holds.
///
/// The condition is not evaluated on the tick the wait begins.
#[must_use = "waits do nothing unless awaited"]
pub struct Wait<F> {
    started: bool,
    condition: F,
}

impl<F: FnMut() -> bool + Unpin> Future for Wait<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<()> {
        let this = self.get_mut();
        if !this.started {
            this.started = true;
            return Poll::Pending;
        }
        if (this.condition)() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

pub fn wait_until<F: FnMut() -> bool + Unpin>(condition: F) -> Wait<F> {
    Wait { started: false, condition }
}

/// Resumes on the next tick.
pub fn wait_frame() -> Wait<impl FnMut() -> bool + Unpin> {
    wait_until(|| true)
}

/// Resumes after `frames` ticks (at least one).
pub fn wait_frames(frames: u32) -> Wait<impl FnMut() -> bool + Unpin> {
    let mut remaining = frames.max(1);
    wait_until(move || {
        remaining -= 1;
        remaining == 0
    })
}

/// Resumes on the first tick after `tween` has completed.
pub fn wait_tween(tween: &Tween) -> Wait<impl FnMut() -> bool + Unpin + use<>> {
    let tween = tween.clone();
    wait_until(move || tween.is_complete())
}

/// Runs `body` as a nested coroutine, one step per tick, and resumes once it finishes.
pub fn wait_coroutine(body: impl Future<Output = ()> + 'static) -> Wait<impl FnMut() -> bool + Unpin> {
    let nested = Coroutine::new(body);
    wait_until(move || nested.update())
}
