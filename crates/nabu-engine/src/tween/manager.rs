use std::fmt;

use super::{EasingTable, Tween, TweenProperty, TweenTarget};
use crate::dispatch::UpdateList;

/// Runs tweens once per tick and drops them as they finish.
///
/// Tweens are keyed by their target so every tween of an object can be
/// cancelled at once, e.g. when the object is disposed.
#[derive(Clone, Default)]
pub struct TweenManager {
    tweens: UpdateList<Tween>,
}

impl fmt::Debug for TweenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenManager").field("active", &self.tweens.len()).finish()
    }
}

impl TweenManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, tween: Tween) -> Tween {
        self.tweens.add_tagged(tween.clone(), tween.target_key());
        tween
    }

    /// Creates a tween of `target` and starts running it.
    pub fn tween(
        &self,
        target: impl TweenTarget + 'static,
        easing: EasingTable,
        properties: impl IntoIterator<Item = (TweenProperty, f32)>,
    ) -> Tween {
        self.add(Tween::new(target, easing, properties))
    }

    /// Cancels every running tween of `target` without completing it.
    pub fn remove_tweens_of(&self, target: &dyn TweenTarget) -> bool {
        self.tweens.remove(target.tween_key())
    }

    pub fn remove(&self, tween: &Tween) -> bool {
        self.tweens.remove_value(tween)
    }

    pub fn update(&self) {
        self.tweens.update(Tween::update, true);
    }

    pub fn clear(&self) {
        self.tweens.clear();
    }

    #[inline]
    pub fn is_clear(&self) -> bool {
        self.tweens.is_clear()
    }

    pub fn dispose(&self) {
        self.clear();
    }
}
