use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::EasingTable;
use crate::dispatch::Tag;

/// A numeric property a tween can drive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TweenProperty {
    X,
    Y,
    ScaleX,
    ScaleY,
    Rotation,
    Alpha,
    /// Application-defined property.
    Named(Cow<'static, str>),
}

impl From<&'static str> for TweenProperty {
    fn from(name: &'static str) -> Self {
        TweenProperty::Named(Cow::Borrowed(name))
    }
}

/// Something whose numeric properties can be read and written by a tween.
///
/// Implementors use interior mutability; a tween only holds a shared handle.
pub trait TweenTarget {
    /// Identity used by [`TweenManager::remove_tweens_of`](super::TweenManager::remove_tweens_of).
    ///
    /// Defaults to the address of `self`, which is stable for values behind an `Rc`.
    fn tween_key(&self) -> Tag {
        Tag::Key(std::ptr::from_ref(self).cast::<()>() as usize)
    }

    /// Current value, or `None` if the target has no such property.
    fn tween_value(&self, property: &TweenProperty) -> Option<f32>;

    fn set_tween_value(&self, property: &TweenProperty, value: f32);
}

impl<T: TweenTarget + ?Sized> TweenTarget for Rc<T> {
    fn tween_key(&self) -> Tag {
        (**self).tween_key()
    }

    fn tween_value(&self, property: &TweenProperty) -> Option<f32> {
        (**self).tween_value(property)
    }

    fn set_tween_value(&self, property: &TweenProperty, value: f32) {
        (**self).set_tween_value(property, value)
    }
}

struct Track {
    property: TweenProperty,
    initial: f32,
    target: f32,
}

struct TweenState {
    target: Box<dyn TweenTarget>,
    tracks: Vec<Track>,
    easing: EasingTable,
    frame: usize,
    delay: u32,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl TweenState {
    fn capture_initial(&mut self) {
        for track in &mut self.tracks {
            track.initial = self.target.tween_value(&track.property).unwrap_or(track.target);
        }
    }
}

/// One in-flight interpolation over a target's properties.
///
/// Cheap to clone; clones observe the same progress.
#[derive(Clone)]
pub struct Tween(Rc<RefCell<TweenState>>);

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Tween")
            .field("frame", &state.frame)
            .field("frames", &state.easing.len())
            .field("delay", &state.delay)
            .finish()
    }
}

impl PartialEq for Tween {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Tween {
    /// Captures the target's current values as the start of each property.
    ///
    /// Properties the target does not report start at their final value.
    pub fn new(
        target: impl TweenTarget + 'static,
        easing: EasingTable,
        properties: impl IntoIterator<Item = (TweenProperty, f32)>,
    ) -> Self {
        let tracks = properties
            .into_iter()
            .map(|(property, target)| Track { property, initial: target, target })
            .collect();
        let mut state = TweenState {
            target: Box::new(target),
            tracks,
            easing,
            frame: 0,
            delay: 0,
            on_complete: None,
        };
        state.capture_initial();
        Tween(Rc::new(RefCell::new(state)))
    }

    /// Waits `frames` ticks before starting; start values are re-read then.
    pub fn with_delay(self, frames: u32) -> Self {
        self.0.borrow_mut().delay = frames;
        self
    }

    pub fn on_complete(self, f: impl FnOnce() + 'static) -> Self {
        self.0.borrow_mut().on_complete = Some(Box::new(f));
        self
    }

    pub fn target_key(&self) -> Tag {
        self.0.borrow().target.tween_key()
    }

    /// Number of easing steps consumed so far.
    pub fn frame(&self) -> usize {
        self.0.borrow().frame
    }

    pub fn is_complete(&self) -> bool {
        let state = self.0.borrow();
        state.delay == 0 && state.frame >= state.easing.len()
    }

    /// Advances one tick. Returns `true` once the tween has finished.
    ///
    /// The final step writes the exact final values and then runs the
    /// completion callback, once.
    pub fn update(&self) -> bool {
        let on_complete = {
            let mut state = self.0.borrow_mut();
            if state.delay > 0 {
                state.delay -= 1;
                if state.delay == 0 {
                    state.capture_initial();
                }
                return false;
            }

            let len = state.easing.len();
            if state.frame < len {
                let ratio = state.easing[state.frame];
                state.frame += 1;
                let last = state.frame == len;
                let TweenState { target, tracks, .. } = &*state;
                for track in tracks {
                    let value = if last {
                        track.target
                    } else {
                        track.initial + (track.target - track.initial) * ratio
                    };
                    target.set_tween_value(&track.property, value);
                }
                if !last {
                    return false;
                }
            } else if len == 0 {
                let TweenState { target, tracks, .. } = &*state;
                for track in tracks {
                    target.set_tween_value(&track.property, track.target);
                }
            }
            state.on_complete.take()
        };

        if let Some(f) = on_complete {
            f();
        }
        true
    }
}
