use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use nabu_engine::coords::Rect;
use nabu_engine::coroutine::{Coroutine, CoroutineManager, Yielder};
use nabu_engine::dispatch::{Context, FrameDispatch, Tag, UpdateList};
use nabu_engine::display::DisplayNode;
use nabu_engine::tween::{EasingTable, Tween, TweenManager, TweenProperty, TweenTarget};

use crate::button::{Button, ButtonConfig};
use crate::disposable::Disposable;
use crate::touch_area::TouchArea;

/// Behaviour plugged into an [`AppNode`]. Every method defaults to doing nothing.
pub trait Hook {
    /// Runs once the node has its context, before its view is attached.
    fn prepare(&mut self, _node: &AppNode) {}

    /// Runs once the view is attached.
    fn begin(&mut self, _node: &AppNode) {}

    /// Runs every logical tick after the node's own managers.
    fn update(&mut self, _node: &AppNode) {}

    /// Runs after the children are disposed, before the node's managers are.
    fn dispose(&mut self, _node: &AppNode) {}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeState {
    Constructed,
    Prepared,
    Began,
    Disposed,
}

struct Inner {
    view: DisplayNode,
    state: Cell<NodeState>,
    parent: RefCell<Weak<Inner>>,
    context: RefCell<Option<Context>>,
    hook: RefCell<Option<Box<dyn Hook>>>,
    tweens: OnceCell<TweenManager>,
    coroutines: OnceCell<CoroutineManager>,
    frame_dispatch: OnceCell<FrameDispatch>,
    children: UpdateList<AppNode>,
    disposables: RefCell<Vec<Disposable>>,
}

/// A unit of application structure: a view, its own schedulers, child nodes
/// and everything that must be torn down with it.
///
/// Nodes go through `Constructed → Prepared → Began → Disposed`. Adding a
/// child prepares it, attaches its view and begins it. Each [`update`](Self::update)
/// runs tweens, coroutines and the frame dispatch, then the hook, then the
/// children. [`dispose`](Self::dispose) detaches the view and tears down the
/// children first, so no child ever sees a half-disposed parent.
#[derive(Clone)]
pub struct AppNode(Rc<Inner>);

impl PartialEq for AppNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AppNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppNode")
            .field("state", &self.0.state.get())
            .field("children", &self.0.children.len())
            .field("disposables", &self.0.disposables.borrow().len())
            .finish()
    }
}

impl Default for AppNode {
    fn default() -> Self {
        Self::new()
    }
}

impl AppNode {
    /// A node with an empty group view and no hook.
    pub fn new() -> Self {
        Self::with_view(DisplayNode::group())
    }

    pub fn with_view(view: DisplayNode) -> Self {
        AppNode(Rc::new(Inner {
            view,
            state: Cell::new(NodeState::Constructed),
            parent: RefCell::new(Weak::new()),
            context: RefCell::new(None),
            hook: RefCell::new(None),
            tweens: OnceCell::new(),
            coroutines: OnceCell::new(),
            frame_dispatch: OnceCell::new(),
            children: UpdateList::new(),
            disposables: RefCell::new(Vec::new()),
        }))
    }

    pub fn with_hook(self, hook: impl Hook + 'static) -> Self {
        *self.0.hook.borrow_mut() = Some(Box::new(hook));
        self
    }

    #[inline]
    pub fn view(&self) -> &DisplayNode {
        &self.0.view
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        self.0.state.get()
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.state() == NodeState::Disposed
    }

    pub fn parent(&self) -> Option<AppNode> {
        self.0.parent.borrow().upgrade().map(AppNode)
    }

    pub fn children(&self) -> Vec<AppNode> {
        self.0.children.values()
    }

    /// The context this node listens and schedules on.
    ///
    /// # Panics
    /// Panics if the node has not been added to a parent or set as a scene.
    pub fn context(&self) -> Context {
        match self.0.context.borrow().as_ref() {
            Some(context) => context.clone(),
            None => panic!("app node has no context until it is added"),
        }
    }

    /// Makes this node (and children added afterwards) use a context derived
    /// from its current one. The derived context is disposed with the node.
    pub fn derive_context(&self) -> Context {
        let derived = self.context().derive();
        *self.0.context.borrow_mut() = Some(derived.clone());
        self.add_disposable(Disposable::object(derived.clone()));
        derived
    }

    fn with_hook_mut(&self, f: impl FnOnce(&mut dyn Hook, &AppNode)) {
        let hook = self.0.hook.borrow_mut().take();
        let Some(mut hook) = hook else {
            return;
        };
        f(hook.as_mut(), self);
        if self.is_disposed() {
            // Disposed from inside the hook: the dispose step was skipped.
            hook.dispose(self);
        } else {
            *self.0.hook.borrow_mut() = Some(hook);
        }
    }

    // ── tree ──────────────────────────────────────────────────────────────

    /// Adds `child` and attaches its view to this node's view.
    pub fn add(&self, child: &AppNode) -> AppNode {
        self.add_to(child, Some(&self.0.view))
    }

    /// Adds `child`, attaching its view to `view_parent`, or nowhere when `None`.
    ///
    /// # Panics
    /// Panics if `child` was already added somewhere.
    pub fn add_to(&self, child: &AppNode, view_parent: Option<&DisplayNode>) -> AppNode {
        assert_eq!(child.state(), NodeState::Constructed, "app node can only be added once");
        self.0.children.add(child.clone());
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        if child.0.context.borrow().is_none() {
            *child.0.context.borrow_mut() = Some(self.context());
        }
        child.start(view_parent);
        child.clone()
    }

    /// Brings a root node (a scene) to life on `context`.
    pub(crate) fn start_root(&self, context: Context, view_parent: &DisplayNode) {
        assert_eq!(self.state(), NodeState::Constructed, "app node can only be started once");
        *self.0.context.borrow_mut() = Some(context);
        self.start(Some(view_parent));
    }

    fn start(&self, view_parent: Option<&DisplayNode>) {
        self.0.state.set(NodeState::Prepared);
        self.with_hook_mut(|hook, node| hook.prepare(node));
        if self.is_disposed() {
            return;
        }
        if let Some(view_parent) = view_parent {
            view_parent.add(&self.0.view);
        }
        self.0.state.set(NodeState::Began);
        self.with_hook_mut(|hook, node| hook.begin(node));
    }

    /// Removes and disposes `child`. Returns `false` if it is not a child of this node.
    pub fn remove(&self, child: &AppNode) -> bool {
        if !self.0.children.remove_value(child) {
            return false;
        }
        child.dispose();
        true
    }

    // ── schedulers ────────────────────────────────────────────────────────

    pub fn tween_manager(&self) -> &TweenManager {
        self.0.tweens.get_or_init(TweenManager::new)
    }

    pub fn coroutine_manager(&self) -> &CoroutineManager {
        self.0.coroutines.get_or_init(CoroutineManager::new)
    }

    pub fn frame_dispatch(&self) -> &FrameDispatch {
        self.0.frame_dispatch.get_or_init(FrameDispatch::new)
    }

    pub fn tween(
        &self,
        target: impl TweenTarget + 'static,
        easing: EasingTable,
        properties: impl IntoIterator<Item = (TweenProperty, f32)>,
    ) -> Tween {
        self.tween_manager().tween(target, easing, properties)
    }

    /// Runs a coroutine on this node's ticks.
    pub fn run<F, Fut>(&self, f: F) -> Coroutine
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.coroutine_manager().run(f)
    }

    pub fn delay(&self, frames: u32, f: impl FnOnce() + 'static) {
        self.frame_dispatch().delay(frames, f);
    }

    pub fn delay_tagged(&self, frames: u32, tag: impl Into<Tag>, f: impl FnOnce() + 'static) {
        self.frame_dispatch().delay_tagged(frames, tag, f);
    }

    // ── owned objects ─────────────────────────────────────────────────────

    pub fn add_disposable(&self, disposable: Disposable) {
        self.0.disposables.borrow_mut().push(disposable);
    }

    /// A button on `view`, bound to this node's context and disposed with the node.
    pub fn add_button(&self, view: &DisplayNode, action: impl Fn() + 'static) -> Button {
        self.add_button_with(view, ButtonConfig::default(), action)
    }

    pub fn add_button_with(&self, view: &DisplayNode, config: ButtonConfig, action: impl Fn() + 'static) -> Button {
        let button = Button::with_config(view, &self.context(), config, action);
        self.add_disposable(Disposable::object(button.clone()));
        button
    }

    /// A touch area over `view`'s bounds grown by `padding`.
    pub fn add_touch_area(&self, view: &DisplayNode, padding: f32) -> TouchArea {
        let area = TouchArea::bounds(view, padding, &self.context());
        self.add_disposable(Disposable::object(area.clone()));
        area
    }

    pub fn add_touch_area_rect(&self, view: &DisplayNode, rect: Rect) -> TouchArea {
        let area = TouchArea::rect(view, rect, &self.context());
        self.add_disposable(Disposable::object(area.clone()));
        area
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// One logical tick for this subtree.
    pub fn update(&self) {
        if self.state() != NodeState::Began {
            return;
        }
        if let Some(tweens) = self.0.tweens.get() {
            tweens.update();
        }
        if let Some(coroutines) = self.0.coroutines.get() {
            coroutines.update();
        }
        if let Some(frame_dispatch) = self.0.frame_dispatch.get() {
            frame_dispatch.update();
        }
        self.with_hook_mut(|hook, node| hook.update(node));
        if self.is_disposed() {
            return;
        }
        self.0.children.update(
            |child| {
                child.update();
                child.is_disposed()
            },
            true,
        );
    }

    /// Tears the subtree down. Idempotent.
    pub fn dispose(&self) {
        if self.0.state.replace(NodeState::Disposed) == NodeState::Disposed {
            return;
        }
        let parent = self.0.parent.borrow().upgrade();
        if let Some(parent) = parent {
            parent.children.remove_value(self);
        }
        self.0.view.remove_from_parent();

        let children = self.0.children.values();
        self.0.children.clear();
        for child in children {
            child.dispose();
        }

        let hook = self.0.hook.borrow_mut().take();
        if let Some(mut hook) = hook {
            hook.dispose(self);
        }

        if let Some(tweens) = self.0.tweens.get() {
            tweens.dispose();
        }
        if let Some(coroutines) = self.0.coroutines.get() {
            coroutines.dispose();
        }
        if let Some(frame_dispatch) = self.0.frame_dispatch.get() {
            frame_dispatch.dispose();
        }

        let disposables = std::mem::take(&mut *self.0.disposables.borrow_mut());
        for disposable in disposables {
            disposable.dispose();
        }
    }
}
