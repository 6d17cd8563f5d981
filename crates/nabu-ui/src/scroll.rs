use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use nabu_engine::coords::Vec2;
use nabu_engine::display::DisplayNode;

use crate::disposable::Dispose;
use crate::touch_area::TouchArea;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    /// Momentum kept per tick once released.
    pub damping: f32,
    /// Fraction of a drag applied past either edge.
    pub stretch: f32,
    /// Fraction of the overshoot kept per tick while snapping back.
    pub snap: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self { damping: 0.95, stretch: 0.1, snap: 0.5 }
    }
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    view: f32,
    content: f32,
    position: f32,
    momentum: f32,
}

impl Axis {
    fn new(view: f32) -> Self {
        Self { view, content: view, position: 0.0, momentum: 0.0 }
    }

    #[inline]
    fn scrolls(&self) -> bool {
        self.content > self.view
    }

    #[inline]
    fn max(&self) -> f32 {
        self.content - self.view
    }

    fn drag(&mut self, moved: f32, stretch: f32) {
        if !self.scrolls() {
            return;
        }
        let overshooting = (self.position < 0.0 && moved > 0.0) || (self.position > self.max() && moved < 0.0);
        self.position -= if overshooting { moved * stretch } else { moved };
        self.momentum = -moved;
    }

    fn settle(&mut self, snap: f32) {
        if !self.scrolls() {
            return;
        }
        self.position += self.momentum;
        let max = self.max();
        if self.position < 0.0 {
            self.position *= snap;
        } else if self.position > max {
            self.position = max + (self.position - max) * snap;
        }
    }
}

struct Inner {
    touch_area: TouchArea,
    scroll_parent: Option<DisplayNode>,
    config: Cell<ScrollConfig>,
    x: RefCell<Axis>,
    y: RefCell<Axis>,
}

/// Momentum scrolling driven by a [`TouchArea`].
///
/// Drags move the content directly (damped by `stretch` past either edge).
/// Once released the content coasts on its momentum and snaps back inside
/// its range. Each [`update`](Self::update) offsets the scroll parent, if
/// any, by the negated content position. The touch area should sit on a
/// node that does not move with the content.
#[derive(Clone)]
pub struct ScrollBehaviour(Rc<Inner>);

impl fmt::Debug for ScrollBehaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollBehaviour")
            .field("position", &self.position())
            .field("momentum", &self.momentum())
            .finish()
    }
}

impl ScrollBehaviour {
    pub fn new(touch_area: &TouchArea, view_width: f32, view_height: f32, scroll_parent: Option<DisplayNode>) -> Self {
        let scroll = ScrollBehaviour(Rc::new(Inner {
            touch_area: touch_area.clone(),
            scroll_parent,
            config: Cell::new(ScrollConfig::default()),
            x: RefCell::new(Axis::new(view_width)),
            y: RefCell::new(Axis::new(view_height)),
        }));

        let weak = Rc::downgrade(&scroll.0);
        touch_area.on_touch_move(move |area| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !area.is_touched() {
                return;
            }
            let moved = area.move_distance();
            let stretch = inner.config.get().stretch;
            inner.x.borrow_mut().drag(moved.x, stretch);
            inner.y.borrow_mut().drag(moved.y, stretch);
        });
        scroll
    }

    pub fn with_config(self, config: ScrollConfig) -> Self {
        self.0.config.set(config);
        self
    }

    pub fn config(&self) -> ScrollConfig {
        self.0.config.get()
    }

    /// Sets the scrollable extent. An axis scrolls only if its content exceeds the view.
    pub fn set_content_size(&self, width: f32, height: f32) {
        self.0.x.borrow_mut().content = width;
        self.0.y.borrow_mut().content = height;
    }

    pub fn can_scroll_x(&self) -> bool {
        self.0.x.borrow().scrolls()
    }

    pub fn can_scroll_y(&self) -> bool {
        self.0.y.borrow().scrolls()
    }

    /// Current content offset.
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.0.x.borrow().position, self.0.y.borrow().position)
    }

    pub fn momentum(&self) -> Vec2 {
        Vec2::new(self.0.x.borrow().momentum, self.0.y.borrow().momentum)
    }

    /// Jumps to `(x, y)`, dropping momentum and any tracked touch.
    pub fn set_position(&self, x: f32, y: f32) {
        for (axis, position) in [(&self.0.x, x), (&self.0.y, y)] {
            let mut axis = axis.borrow_mut();
            axis.position = position;
            axis.momentum = 0.0;
        }
        self.0.touch_area.cancel_touch();
    }

    /// Advances one tick.
    pub fn update(&self) {
        let config = self.0.config.get();
        let touched = self.0.touch_area.is_touched();
        for axis in [&self.0.x, &self.0.y] {
            let mut axis = axis.borrow_mut();
            if !touched {
                axis.settle(config.snap);
            }
            axis.momentum *= config.damping;
        }

        if let Some(parent) = &self.0.scroll_parent {
            let position = self.position();
            parent.set_position(-position.x, -position.y);
        }
    }

    pub fn dispose(&self) {
        self.0.touch_area.dispose();
    }
}

impl Dispose for ScrollBehaviour {
    fn dispose(&self) {
        ScrollBehaviour::dispose(self);
    }
}
