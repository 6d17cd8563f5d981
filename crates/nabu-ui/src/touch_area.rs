use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use nabu_engine::coords::{Rect, Vec2};
use nabu_engine::dispatch::{Context, EVENT_INTERRUPT, EventData, EventHandler};
use nabu_engine::display::DisplayNode;
use nabu_engine::input::{TOUCH_BEGIN, TOUCH_CANCEL, TOUCH_END, TOUCH_MOVE, TouchData};

use crate::disposable::Dispose;

type AreaTest = Box<dyn Fn(&DisplayNode, Vec2) -> bool>;
type TouchCallback = Rc<dyn Fn(&TouchArea)>;

/// Pointer state, all positions in the node's local space.
#[derive(Debug, Clone, Copy, Default)]
struct TouchState {
    is_touched: bool,
    is_touch_over: bool,
    touch_id: Option<u64>,
    touch_position: Vec2,
    touch_time: f64,
    touch_start_position: Vec2,
    touch_start_time: f64,
    drag_distance: Vec2,
    move_distance: Vec2,
}

#[derive(Default)]
struct Callbacks {
    begin: Option<TouchCallback>,
    moved: Option<TouchCallback>,
    end: Option<TouchCallback>,
    cancel: Option<TouchCallback>,
}

struct Inner {
    node: DisplayNode,
    area: AreaTest,
    handler: EventHandler,
    state: Cell<TouchState>,
    enabled: Cell<bool>,
    callbacks: RefCell<Callbacks>,
}

/// Tracks one pointer over a region of a display node.
///
/// A touch is accepted when nothing is tracked yet and the area test passes
/// for the begin position. Tracking then continues wherever the pointer goes;
/// [`is_touch_over`](Self::is_touch_over) reports whether it is still inside.
/// An interrupt on the owning context cancels the touch.
#[derive(Clone)]
pub struct TouchArea(Rc<Inner>);

impl PartialEq for TouchArea {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TouchArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TouchArea")
            .field("state", &self.0.state.get())
            .field("enabled", &self.0.enabled.get())
            .finish()
    }
}

impl TouchArea {
    /// Creates an enabled touch area. `area` receives points in `node`'s local space.
    pub fn new(node: &DisplayNode, context: &Context, area: impl Fn(&DisplayNode, Vec2) -> bool + 'static) -> Self {
        let touch_area = TouchArea(Rc::new(Inner {
            node: node.clone(),
            area: Box::new(area),
            handler: EventHandler::new(context.event_dispatch()),
            state: Cell::new(TouchState::default()),
            enabled: Cell::new(false),
            callbacks: RefCell::new(Callbacks::default()),
        }));
        touch_area.set_enabled(true);
        touch_area
    }

    /// The node's live bounds, grown by `padding` on every side.
    pub fn bounds(node: &DisplayNode, padding: f32, context: &Context) -> Self {
        Self::new(node, context, move |node, point| {
            node.bounds()
                .is_some_and(|bounds| bounds.expanded(padding, padding).contains(point))
        })
    }

    /// A fixed rectangle in the node's local space.
    pub fn rect(node: &DisplayNode, rect: Rect, context: &Context) -> Self {
        Self::new(node, context, move |_, point| rect.contains(point))
    }

    pub fn node(&self) -> &DisplayNode {
        &self.0.node
    }

    // ── callbacks ─────────────────────────────────────────────────────────

    pub fn on_touch_begin(&self, f: impl Fn(&TouchArea) + 'static) {
        self.0.callbacks.borrow_mut().begin = Some(Rc::new(f));
    }

    pub fn on_touch_move(&self, f: impl Fn(&TouchArea) + 'static) {
        self.0.callbacks.borrow_mut().moved = Some(Rc::new(f));
    }

    pub fn on_touch_end(&self, f: impl Fn(&TouchArea) + 'static) {
        self.0.callbacks.borrow_mut().end = Some(Rc::new(f));
    }

    pub fn on_touch_cancel(&self, f: impl Fn(&TouchArea) + 'static) {
        self.0.callbacks.borrow_mut().cancel = Some(Rc::new(f));
    }

    fn fire(&self, pick: impl FnOnce(&Callbacks) -> Option<TouchCallback>) {
        let callback = pick(&self.0.callbacks.borrow());
        if let Some(callback) = callback {
            callback(self);
        }
    }

    // ── state ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.enabled.get()
    }

    #[inline]
    pub fn is_touched(&self) -> bool {
        self.0.state.get().is_touched
    }

    #[inline]
    pub fn is_touch_over(&self) -> bool {
        self.0.state.get().is_touch_over
    }

    pub fn touch_id(&self) -> Option<u64> {
        self.0.state.get().touch_id
    }

    pub fn touch_position(&self) -> Vec2 {
        self.0.state.get().touch_position
    }

    pub fn touch_time(&self) -> f64 {
        self.0.state.get().touch_time
    }

    pub fn touch_start_position(&self) -> Vec2 {
        self.0.state.get().touch_start_position
    }

    pub fn touch_start_time(&self) -> f64 {
        self.0.state.get().touch_start_time
    }

    /// Offset from the begin position to the latest sample.
    pub fn drag_distance(&self) -> Vec2 {
        self.0.state.get().drag_distance
    }

    /// Offset between the two latest samples.
    pub fn move_distance(&self) -> Vec2 {
        self.0.state.get().move_distance
    }

    /// Starts or stops listening. Disabling cancels a tracked touch.
    pub fn set_enabled(&self, enabled: bool) {
        if self.0.enabled.replace(enabled) == enabled {
            return;
        }
        if enabled {
            self.listen();
        } else {
            self.0.handler.unlisten(None);
            self.cancel_touch();
        }
    }

    fn listen(&self) {
        let handler = &self.0.handler;
        handler.listen(TOUCH_BEGIN, self.forward(TouchArea::handle_begin));
        handler.listen(TOUCH_MOVE, self.forward(TouchArea::handle_move));
        handler.listen(TOUCH_END, self.forward(TouchArea::handle_end));
        handler.listen(TOUCH_CANCEL, self.forward(|area, _| area.cancel_touch()));
        let weak = Rc::downgrade(&self.0);
        handler.listen(EVENT_INTERRUPT, move |_| {
            if let Some(inner) = weak.upgrade() {
                TouchArea(inner).cancel_touch();
            }
        });
    }

    fn forward(&self, f: fn(&TouchArea, &TouchData)) -> impl Fn(&EventData) + use<> {
        let weak: Weak<Inner> = Rc::downgrade(&self.0);
        move |data| {
            if let (Some(inner), Some(touch)) = (weak.upgrade(), data.touch()) {
                f(&TouchArea(inner), touch);
            }
        }
    }

    fn local(&self, touch: &TouchData) -> Vec2 {
        self.0.node.world_to_local(touch.position())
    }

    fn is_inside(&self, point: Vec2) -> bool {
        (self.0.area)(&self.0.node, point)
    }

    fn is_tracking(&self, touch: &TouchData) -> bool {
        let state = self.0.state.get();
        state.is_touched && state.touch_id == Some(touch.id)
    }

    fn handle_begin(&self, touch: &TouchData) {
        if self.is_touched() {
            return;
        }
        let point = self.local(touch);
        if !self.is_inside(point) {
            return;
        }
        self.0.state.set(TouchState {
            is_touched: true,
            is_touch_over: true,
            touch_id: Some(touch.id),
            touch_position: point,
            touch_time: touch.time,
            touch_start_position: point,
            touch_start_time: touch.time,
            drag_distance: Vec2::zero(),
            move_distance: Vec2::zero(),
        });
        self.fire(|c| c.begin.clone());
    }

    fn update_values(&self, touch: &TouchData) {
        let point = self.local(touch);
        let is_over = self.is_inside(point);
        let mut state = self.0.state.get();
        state.is_touch_over = is_over;
        state.move_distance = point - state.touch_position;
        state.drag_distance = point - state.touch_start_position;
        state.touch_position = point;
        state.touch_time = touch.time;
        self.0.state.set(state);
    }

    fn handle_move(&self, touch: &TouchData) {
        if !self.is_tracking(touch) {
            return;
        }
        self.update_values(touch);
        self.fire(|c| c.moved.clone());
    }

    fn handle_end(&self, touch: &TouchData) {
        if !self.is_tracking(touch) {
            return;
        }
        self.update_values(touch);
        let mut state = self.0.state.get();
        state.is_touched = false;
        self.0.state.set(state);
        self.fire(|c| c.end.clone());
        self.cancel_touch();
    }

    /// Drops the tracked touch. The cancel callback runs only if one was active.
    pub fn cancel_touch(&self) {
        let was_touched = self.is_touched();
        self.0.state.set(TouchState::default());
        if was_touched {
            self.fire(|c| c.cancel.clone());
        }
    }

    /// Stops listening and drops every callback.
    pub fn dispose(&self) {
        self.0.enabled.set(false);
        self.0.handler.dispose();
        self.0.state.set(TouchState::default());
        let callbacks = std::mem::take(&mut *self.0.callbacks.borrow_mut());
        drop(callbacks);
    }
}

impl Dispose for TouchArea {
    fn dispose(&self) {
        TouchArea::dispose(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nabu_engine::coords::Color;
    use nabu_engine::input::TouchPhase;

    fn send(context: &Context, phase: TouchPhase, id: u64, x: f32, y: f32) {
        context
            .event_dispatch()
            .dispatch(phase.event_name(), &EventData::Touch(TouchData::new(id, 0.0, x, y)));
    }

    fn counter(area: &TouchArea) -> Rc<RefCell<Vec<&'static str>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        area.on_touch_begin(move |_| l.borrow_mut().push("begin"));
        let l = Rc::clone(&log);
        area.on_touch_move(move |_| l.borrow_mut().push("move"));
        let l = Rc::clone(&log);
        area.on_touch_end(move |_| l.borrow_mut().push("end"));
        let l = Rc::clone(&log);
        area.on_touch_cancel(move |_| l.borrow_mut().push("cancel"));
        log
    }

    fn setup() -> (Context, DisplayNode, TouchArea) {
        let context = Context::new();
        let node = DisplayNode::rect(10.0, 10.0, Color::WHITE).at(100.0, 100.0);
        let area = TouchArea::bounds(&node, 0.0, &context);
        (context, node, area)
    }

    // ── tracking ──────────────────────────────────────────────────────────

    #[test]
    fn begin_outside_is_ignored() {
        let (context, _node, area) = setup();
        let log = counter(&area);
        send(&context, TouchPhase::Begin, 1, 50.0, 50.0);
        assert!(!area.is_touched());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn press_drag_release_reports_local_distances() {
        let (context, _node, area) = setup();
        let log = counter(&area);

        send(&context, TouchPhase::Begin, 1, 102.0, 103.0);
        assert!(area.is_touched());
        assert_eq!(area.touch_start_position(), Vec2::new(2.0, 3.0));

        send(&context, TouchPhase::Move, 1, 120.0, 103.0);
        assert!(area.is_touched());
        assert!(!area.is_touch_over());
        assert_eq!(area.drag_distance(), Vec2::new(18.0, 0.0));
        assert_eq!(area.move_distance(), Vec2::new(18.0, 0.0));

        send(&context, TouchPhase::Move, 1, 105.0, 103.0);
        assert!(area.is_touch_over());
        assert_eq!(area.move_distance(), Vec2::new(-15.0, 0.0));

        send(&context, TouchPhase::End, 1, 105.0, 103.0);
        assert!(!area.is_touched());
        assert_eq!(*log.borrow(), ["begin", "move", "move", "end"]);
    }

    #[test]
    fn other_pointer_ids_are_ignored() {
        let (context, _node, area) = setup();
        send(&context, TouchPhase::Begin, 1, 105.0, 105.0);
        send(&context, TouchPhase::Begin, 2, 106.0, 106.0);
        assert_eq!(area.touch_id(), Some(1));
        send(&context, TouchPhase::End, 2, 106.0, 106.0);
        assert!(area.is_touched());
    }

    #[test]
    fn padding_grows_the_area() {
        let context = Context::new();
        let node = DisplayNode::rect(10.0, 10.0, Color::WHITE);
        let area = TouchArea::bounds(&node, 5.0, &context);
        send(&context, TouchPhase::Begin, 1, -4.0, 14.0);
        assert!(area.is_touched());
    }

    // ── cancellation ──────────────────────────────────────────────────────

    #[test]
    fn interrupt_cancels_without_end() {
        let (context, _node, area) = setup();
        let log = counter(&area);
        send(&context, TouchPhase::Begin, 1, 105.0, 105.0);
        context.interrupt();
        assert!(!area.is_touched());
        assert_eq!(*log.borrow(), ["begin", "cancel"]);
    }

    #[test]
    fn disabling_cancels_and_stops_listening() {
        let (context, _node, area) = setup();
        send(&context, TouchPhase::Begin, 1, 105.0, 105.0);
        area.set_enabled(false);
        assert!(!area.is_touched());
        assert_eq!(context.event_dispatch().listener_count(), 0);

        send(&context, TouchPhase::Begin, 1, 105.0, 105.0);
        assert!(!area.is_touched());

        area.set_enabled(true);
        send(&context, TouchPhase::Begin, 1, 105.0, 105.0);
        assert!(area.is_touched());
    }

    #[test]
    fn dispose_removes_listeners() {
        let (context, _node, area) = setup();
        assert_eq!(context.event_dispatch().listener_count(), 5);
        area.dispose();
        assert_eq!(context.event_dispatch().listener_count(), 0);
    }
}
