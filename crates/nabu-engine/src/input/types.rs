use crate::coords::Vec2;

pub const TOUCH_BEGIN: &str = "touch_begin";
pub const TOUCH_MOVE: &str = "touch_move";
pub const TOUCH_END: &str = "touch_end";
pub const TOUCH_CANCEL: &str = "touch_cancel";

/// One pointer sample in canvas pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TouchData {
    /// Stable for the lifetime of one press (mouse input always uses 1).
    pub id: u64,
    /// Host timestamp in seconds.
    pub time: f64,
    pub x: f32,
    pub y: f32,
}

impl TouchData {
    #[inline]
    pub const fn new(id: u64, time: f64, x: f32, y: f32) -> Self {
        Self { id, time, x, y }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Begin,
    Move,
    End,
    Cancel,
}

impl TouchPhase {
    /// Event name the phase is dispatched under.
    #[inline]
    pub const fn event_name(self) -> &'static str {
        match self {
            TouchPhase::Begin => TOUCH_BEGIN,
            TouchPhase::Move => TOUCH_MOVE,
            TouchPhase::End => TOUCH_END,
            TouchPhase::Cancel => TOUCH_CANCEL,
        }
    }
}
