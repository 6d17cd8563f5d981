use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use nabu_engine::dispatch::{Context, EVENT_INTERRUPT, EventData, EventHandler};
use nabu_engine::display::DisplayNode;

use crate::disposable::Dispose;
use crate::touch_area::TouchArea;

/// Deferred on the button's context when it goes down. Payload: the [`Button`].
pub const EVENT_BUTTON_DOWN: &str = "event_button_down";
/// Deferred on the button's context when it comes back up. Payload: the [`Button`].
pub const EVENT_BUTTON_UP: &str = "event_button_up";
/// Context flag (`f32`) for the outer touch padding of buttons built below it.
pub const CONFIG_BUTTON_TOUCH_OUTER_PADDING: &str = "config_button_touch_outer_padding";
/// Frame dispatch tag of pending button actions.
pub const DELAYED_BUTTON_TAG: &str = "dispatch_delayed_button";

const DEFAULT_OUTER_PADDING: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonConfig {
    /// Clip frame shown while up (clip nodes only).
    pub up_frame: u32,
    /// Clip frame shown while held down (clip nodes only).
    pub down_frame: u32,
    /// Overrides [`CONFIG_BUTTON_TOUCH_OUTER_PADDING`].
    pub outer_padding: Option<f32>,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self { up_frame: 1, down_frame: 2, outer_padding: None }
    }
}

struct Inner {
    node: DisplayNode,
    context: Context,
    config: ButtonConfig,
    action: Rc<dyn Fn()>,
    inner_area: TouchArea,
    outer_area: TouchArea,
    handler: EventHandler,
    on_state: RefCell<Option<Rc<dyn Fn(bool)>>>,
    enabled: Cell<bool>,
    is_down: Cell<bool>,
    is_releasing: Cell<bool>,
    disposed: Cell<bool>,
}

/// A press-and-release control over a display node.
///
/// Two touch areas watch the node: the inner one is its exact bounds, the
/// outer one adds padding. The button is down while a touch that began inside
/// is still over the outer area. Releasing while down runs the action one tick
/// later, through the context's frame dispatch, so the up state renders first.
#[derive(Clone)]
pub struct Button(Rc<Inner>);

impl PartialEq for Button {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("enabled", &self.0.enabled.get())
            .field("is_down", &self.0.is_down.get())
            .field("is_releasing", &self.0.is_releasing.get())
            .finish()
    }
}

impl Button {
    pub fn new(node: &DisplayNode, context: &Context, action: impl Fn() + 'static) -> Self {
        Self::with_config(node, context, ButtonConfig::default(), action)
    }

    pub fn with_config(node: &DisplayNode, context: &Context, config: ButtonConfig, action: impl Fn() + 'static) -> Self {
        let padding = config
            .outer_padding
            .unwrap_or_else(|| context.get_or(CONFIG_BUTTON_TOUCH_OUTER_PADDING, DEFAULT_OUTER_PADDING));

        let button = Button(Rc::new(Inner {
            node: node.clone(),
            context: context.clone(),
            config,
            action: Rc::new(action),
            inner_area: TouchArea::bounds(node, 0.0, context),
            outer_area: TouchArea::bounds(node, padding, context),
            handler: EventHandler::new(context.event_dispatch()),
            on_state: RefCell::new(None),
            enabled: Cell::new(true),
            is_down: Cell::new(false),
            is_releasing: Cell::new(false),
            disposed: Cell::new(false),
        }));
        button.wire();
        button.show(false);
        button
    }

    fn wire(&self) {
        let inner = &self.0;
        inner.inner_area.on_touch_begin(self.callback(Button::update));
        inner.inner_area.on_touch_move(self.callback(Button::update));
        inner.inner_area.on_touch_end(self.callback(Button::handle_inner_end));
        inner.outer_area.on_touch_begin(self.callback(Button::update));
        inner.outer_area.on_touch_move(self.callback(Button::update));
        inner.outer_area.on_touch_end(self.callback(Button::handle_release));
        inner.outer_area.on_touch_cancel(self.callback(Button::cancel_touch));

        let weak = Rc::downgrade(&self.0);
        inner.handler.listen(EVENT_INTERRUPT, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.context.frame_dispatch().remove(DELAYED_BUTTON_TAG);
                inner.is_releasing.set(false);
                Button(inner).update();
            }
        });
    }

    fn callback(&self, f: fn(&Button)) -> impl Fn(&TouchArea) + use<> {
        let weak: Weak<Inner> = Rc::downgrade(&self.0);
        move |_| {
            if let Some(inner) = weak.upgrade() {
                f(&Button(inner));
            }
        }
    }

    pub fn node(&self) -> &DisplayNode {
        &self.0.node
    }

    /// Called with `true` when the button goes down and `false` when it comes up.
    pub fn on_state_change(&self, f: impl Fn(bool) + 'static) {
        *self.0.on_state.borrow_mut() = Some(Rc::new(f));
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.enabled.get()
    }

    #[inline]
    pub fn is_down(&self) -> bool {
        self.0.is_down.get()
    }

    #[inline]
    pub fn is_releasing(&self) -> bool {
        self.0.is_releasing.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.0.enabled.replace(enabled) == enabled {
            return;
        }
        self.0.inner_area.set_enabled(enabled);
        self.0.outer_area.set_enabled(enabled);
        self.update();
    }

    /// Recomputes the down state from both touch areas.
    pub fn update(&self) {
        let inner = &self.0;
        let down = inner.enabled.get()
            && !inner.disposed.get()
            && inner.node.is_visible()
            && inner.inner_area.is_touched()
            && inner.outer_area.is_touch_over()
            && !inner.is_releasing.get();
        if inner.is_down.replace(down) == down {
            return;
        }
        self.show(down);
        let event = if down { EVENT_BUTTON_DOWN } else { EVENT_BUTTON_UP };
        inner.handler.defer(event, EventData::value(self.clone()));
    }

    fn show(&self, down: bool) {
        let inner = &self.0;
        if inner.node.clip_data().is_some() {
            let frame = if down { inner.config.down_frame } else { inner.config.up_frame };
            if let Err(err) = inner.node.goto(frame) {
                log::warn!("button frame {frame} unavailable: {err}");
            }
        }
        let on_state = inner.on_state.borrow().clone();
        if let Some(on_state) = on_state {
            on_state(down);
        }
    }

    /// A pointer left the inner area. When the outer area still tracks that
    /// same pointer its own end decides on the action; otherwise the button
    /// recomputes from whatever touches remain.
    fn handle_inner_end(&self) {
        let inner = &self.0;
        let ended = inner.inner_area.touch_id();
        if ended.is_some() && inner.outer_area.is_touched() && inner.outer_area.touch_id() == ended {
            return;
        }
        self.update();
    }

    fn handle_release(&self) {
        let inner = &self.0;
        if inner.is_releasing.get() {
            return;
        }
        if !(inner.is_down.get() && inner.outer_area.is_touch_over()) {
            self.update();
            return;
        }

        inner.is_releasing.set(true);
        self.update();

        let weak = Rc::downgrade(&self.0);
        inner.context.frame_dispatch().delay_tagged(1, DELAYED_BUTTON_TAG, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.is_releasing.set(false);
            if inner.disposed.get() {
                return;
            }
            let action = Rc::clone(&inner.action);
            action();
        });
    }

    /// Drops any tracked touch and returns to the up state.
    ///
    /// Ignored while a release is pending.
    pub fn cancel_touch(&self) {
        if self.0.is_releasing.get() {
            return;
        }
        self.0.inner_area.cancel_touch();
        self.0.outer_area.cancel_touch();
        self.update();
    }

    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        self.0.handler.dispose();
        self.0.inner_area.dispose();
        self.0.outer_area.dispose();
        let on_state = self.0.on_state.borrow_mut().take();
        drop(on_state);
    }
}

impl Dispose for Button {
    fn dispose(&self) {
        Button::dispose(self);
    }
}
