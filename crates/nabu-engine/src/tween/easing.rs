use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Per-frame progress ratios; the last entry is exactly `1.0`.
///
/// Shared between every tween of the same curve and duration.
pub type EasingTable = Rc<[f32]>;

const CACHE_LIMIT: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Curve {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Curve {
    /// Maps linear progress `t` in `0..=1` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Curve::Linear => t,
            Curve::EaseIn => t * t,
            Curve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Curve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = 1.0 - t;
                    1.0 - 2.0 * u * u
                }
            }
        }
    }

    /// Cached table of `frames` ratios (at least one).
    pub fn table(self, frames: u32) -> EasingTable {
        let frames = frames.max(1);
        CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            if let Some(table) = cache.get(&(self, frames)) {
                return Rc::clone(table);
            }
            if cache.len() >= CACHE_LIMIT {
                cache.clear();
            }
            let table: EasingTable = (1..=frames)
                .map(|i| {
                    if i == frames {
                        1.0
                    } else {
                        self.apply(i as f32 / frames as f32)
                    }
                })
                .collect();
            cache.insert((self, frames), Rc::clone(&table));
            table
        })
    }
}

thread_local! {
    static CACHE: RefCell<HashMap<(Curve, u32), EasingTable>> = RefCell::new(HashMap::new());
}

pub fn linear(frames: u32) -> EasingTable {
    Curve::Linear.table(frames)
}

pub fn ease_in(frames: u32) -> EasingTable {
    Curve::EaseIn.table(frames)
}

pub fn ease_out(frames: u32) -> EasingTable {
    Curve::EaseOut.table(frames)
}

pub fn ease_in_out(frames: u32) -> EasingTable {
    Curve::EaseInOut.table(frames)
}

/// Builds a table by piecewise-linear interpolation through `values`.
///
/// The control values are spread evenly over `frames`; e.g. `[0.0, 1.2, 1.0]`
/// overshoots and settles. Not cached.
pub fn interpolate(values: &[f32], frames: u32) -> EasingTable {
    let frames = frames.max(1);
    match values {
        [] => linear(frames),
        [only] => vec![*only; frames as usize].into(),
        _ => {
            let segments = (values.len() - 1) as f32;
            (1..=frames)
                .map(|i| {
                    let position = i as f32 / frames as f32 * segments;
                    let index = (position.floor() as usize).min(values.len() - 2);
                    let local = position - index as f32;
                    values[index] + (values[index + 1] - values[index]) * local
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_end_exactly_at_one() {
        for curve in [Curve::Linear, Curve::EaseIn, Curve::EaseOut, Curve::EaseInOut] {
            for frames in [1, 2, 7, 30] {
                let table = curve.table(frames);
                assert_eq!(table.len(), frames as usize);
                assert_eq!(*table.last().unwrap(), 1.0);
            }
        }
    }

    #[test]
    fn tables_increase_monotonically() {
        for curve in [Curve::Linear, Curve::EaseIn, Curve::EaseOut, Curve::EaseInOut] {
            let table = curve.table(20);
            assert!(table.windows(2).all(|w| w[0] < w[1]), "{curve:?}");
            assert!(table[0] > 0.0);
        }
    }

    #[test]
    fn tables_are_shared() {
        assert!(Rc::ptr_eq(&linear(12), &linear(12)));
        assert!(!Rc::ptr_eq(&linear(12), &ease_in(12)));
    }

    #[test]
    fn zero_frames_is_one_step() {
        assert_eq!(&*linear(0), &[1.0]);
    }

    #[test]
    fn interpolate_passes_through_controls() {
        let table = interpolate(&[0.0, 2.0, 1.0], 4);
        assert_eq!(&*table, &[1.0, 2.0, 1.5, 1.0]);
    }
}
