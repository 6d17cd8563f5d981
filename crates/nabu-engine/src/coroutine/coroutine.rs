use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context as TaskContext, Poll, Waker};

use super::wait::{self, Wait};
use crate::tween::Tween;

type Body = Pin<Box<dyn Future<Output = ()>>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoroutineState {
    /// Not yet started, or inside a step right now.
    Running,
    /// Waiting at a yield point.
    Suspended,
    Done,
}

struct Inner {
    body: Option<Body>,
    state: CoroutineState,
    cancelled: bool,
}

/// A resumable body stepped once per tick.
///
/// Completes when the body returns or is cancelled. Cheap to clone; clones
/// share the same body.
#[derive(Clone)]
pub struct Coroutine(Rc<RefCell<Inner>>);

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Coroutine").field(&self.state()).finish()
    }
}

impl PartialEq for Coroutine {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Coroutine {
    pub fn new(body: impl Future<Output = ()> + 'static) -> Self {
        Coroutine(Rc::new(RefCell::new(Inner {
            body: Some(Box::pin(body)),
            state: CoroutineState::Running,
            cancelled: false,
        })))
    }

    /// Builds a coroutine whose body can cancel itself through the [`Yielder`].
    pub fn with_yielder<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let coroutine = Coroutine(Rc::new(RefCell::new(Inner {
            body: None,
            state: CoroutineState::Running,
            cancelled: false,
        })));
        let body = f(Yielder(Rc::downgrade(&coroutine.0)));
        coroutine.0.borrow_mut().body = Some(Box::pin(body));
        coroutine
    }

    pub fn state(&self) -> CoroutineState {
        self.0.borrow().state
    }

    pub fn is_complete(&self) -> bool {
        self.state() == CoroutineState::Done
    }

    /// Stops the coroutine; its body is dropped without resuming.
    pub fn cancel(&self) {
        let body = {
            let mut inner = self.0.borrow_mut();
            inner.cancelled = true;
            if inner.state == CoroutineState::Suspended || inner.body.is_some() {
                inner.state = CoroutineState::Done;
            }
            inner.body.take()
        };
        drop(body);
    }

    /// Runs the body up to its next yield point. Returns `true` once complete.
    pub fn update(&self) -> bool {
        let mut body = {
            let mut inner = self.0.borrow_mut();
            if inner.state == CoroutineState::Done {
                return true;
            }
            if inner.cancelled {
                inner.state = CoroutineState::Done;
                return true;
            }
            let Some(body) = inner.body.take() else {
                // Polled from inside its own body.
                return false;
            };
            inner.state = CoroutineState::Running;
            body
        };

        let mut cx = TaskContext::from_waker(Waker::noop());
        let poll = body.as_mut().poll(&mut cx);

        let mut inner = self.0.borrow_mut();
        match poll {
            Poll::Ready(()) => {
                inner.state = CoroutineState::Done;
                true
            }
            Poll::Pending if inner.cancelled => {
                inner.state = CoroutineState::Done;
                drop(inner);
                drop(body);
                true
            }
            Poll::Pending => {
                inner.body = Some(body);
                inner.state = CoroutineState::Suspended;
                false
            }
        }
    }
}

/// Handle given to a coroutine body for yielding and self-cancellation.
///
/// Holds the coroutine weakly, so storing it in the body does not keep the
/// coroutine alive.
#[derive(Clone)]
pub struct Yielder(Weak<RefCell<Inner>>);

impl fmt::Debug for Yielder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Yielder")
    }
}

impl Yielder {
    pub fn frame(&self) -> Wait<impl FnMut() -> bool + Unpin + use<>> {
        wait::wait_frame()
    }

    pub fn frames(&self, frames: u32) -> Wait<impl FnMut() -> bool + Unpin + use<>> {
        wait::wait_frames(frames)
    }

    pub fn tween(&self, tween: &Tween) -> Wait<impl FnMut() -> bool + Unpin + use<>> {
        wait::wait_tween(tween)
    }

    pub fn until<F: FnMut() -> bool + Unpin>(&self, condition: F) -> Wait<F> {
        wait::wait_until(condition)
    }

    pub fn coroutine<Fut>(&self, body: Fut) -> Wait<impl FnMut() -> bool + Unpin + use<Fut>>
    where
        Fut: Future<Output = ()> + 'static,
    {
        wait::wait_coroutine(body)
    }

    /// Ends the coroutine at this yield point; nothing after the `.await` runs.
    pub fn cancel(&self) -> Wait<impl FnMut() -> bool + Unpin + use<>> {
        if let Some(inner) = self.0.upgrade() {
            inner.borrow_mut().cancelled = true;
        }
        wait::wait_until(|| false)
    }
}
