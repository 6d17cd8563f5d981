use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::content::{DrawFn, LabelContent, LabelStyle, NodeKind};
use crate::canvas::{Canvas, Texture};
use crate::coords::{Color, Rect, Transform, Vec2};
use crate::dispatch::Tag;
use crate::resource::ImageData;
use crate::tween::{TweenProperty, TweenTarget};

#[derive(Debug, Copy, Clone)]
pub(crate) struct Frozen {
    pub bounds: Rect,
    pub texture: Texture,
}

pub(crate) struct NodeData {
    pub name: Option<String>,
    pub transform: Transform,
    pub visible: bool,
    pub parent: Weak<RefCell<NodeData>>,
    pub children: Vec<DisplayNode>,
    pub frozen: Option<Frozen>,
    pub kind: NodeKind,
}

/// A node in the display list: a transform, optional content and ordered
/// children drawn after it.
///
/// Handles are cheap to clone and compare by identity. A parent owns its
/// children; children refer back to the parent weakly.
#[derive(Clone)]
pub struct DisplayNode(pub(crate) Rc<RefCell<NodeData>>);

impl PartialEq for DisplayNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DisplayNode {}

impl fmt::Debug for DisplayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("DisplayNode")
            .field("kind", &data.kind)
            .field("name", &data.name)
            .field("children", &data.children.len())
            .finish()
    }
}

impl DisplayNode {
    // ── construction ────────────────────────────────────────────────────

    pub(crate) fn with_kind(kind: NodeKind) -> Self {
        DisplayNode(Rc::new(RefCell::new(NodeData {
            name: None,
            transform: Transform::identity(),
            visible: true,
            parent: Weak::new(),
            children: Vec::new(),
            frozen: None,
            kind,
        })))
    }

    /// A container with no content of its own.
    pub fn group() -> Self {
        Self::with_kind(NodeKind::Group)
    }

    pub fn image(image: Rc<ImageData>) -> Self {
        Self::with_kind(NodeKind::Image(image))
    }

    /// Filled rectangle with its top-left corner at the origin.
    pub fn rect(width: f32, height: f32, color: Color) -> Self {
        Self::with_kind(NodeKind::Rect { size: Vec2::new(width, height), color })
    }

    /// Filled circle centred on the origin.
    pub fn circle(radius: f32, color: Color) -> Self {
        Self::with_kind(NodeKind::Circle { radius, color })
    }

    pub fn label(text: impl Into<String>, style: LabelStyle) -> Self {
        Self::with_kind(NodeKind::Label(LabelContent::new(text.into(), style)))
    }

    /// Node drawn by `draw` within the given local `bounds`.
    pub fn drawing(bounds: Rect, draw: impl Fn(&mut dyn Canvas) + 'static) -> Self {
        let draw: DrawFn = Rc::new(draw);
        Self::with_kind(NodeKind::Drawing { bounds, draw })
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn at(self, x: f32, y: f32) -> Self {
        self.set_position(x, y);
        self
    }

    // ── properties ──────────────────────────────────────────────────────

    pub fn kind_name(&self) -> &'static str {
        self.0.borrow().kind.name()
    }

    pub fn name(&self) -> Option<String> {
        self.0.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = Some(name.into());
    }

    #[inline]
    pub fn transform(&self) -> Transform {
        self.0.borrow().transform
    }

    pub fn set_transform(&self, transform: Transform) {
        self.0.borrow_mut().transform = transform;
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.transform().position()
    }

    pub fn set_position(&self, x: f32, y: f32) {
        let mut data = self.0.borrow_mut();
        data.transform.x = x;
        data.transform.y = y;
    }

    pub fn set_scale(&self, scale: f32) {
        self.set_scale_xy(scale, scale);
    }

    pub fn set_scale_xy(&self, scale_x: f32, scale_y: f32) {
        let mut data = self.0.borrow_mut();
        data.transform.scale_x = scale_x;
        data.transform.scale_y = scale_y;
    }

    pub fn set_rotation(&self, rotation: f32) {
        self.0.borrow_mut().transform.rotation = rotation;
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.0.borrow().transform.alpha
    }

    pub fn set_alpha(&self, alpha: f32) {
        self.0.borrow_mut().transform.alpha = alpha;
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.0.borrow().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }

    /// Fill color of rect, circle and label nodes. Returns `false` for other kinds.
    pub fn set_color(&self, new_color: Color) -> bool {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Rect { color, .. } | NodeKind::Circle { color, .. } => *color = new_color,
            NodeKind::Label(label) => label.color = new_color,
            _ => return false,
        }
        true
    }

    /// Resizes a rect node. Returns `false` for other kinds.
    pub fn set_size(&self, width: f32, height: f32) -> bool {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Rect { size, .. } => {
                *size = Vec2::new(width, height);
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Label(label) => Some(label.text.clone()),
            _ => None,
        }
    }

    /// Replaces a label's text. Returns `false` for other kinds.
    pub fn set_text(&self, text: impl Into<String>) -> bool {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Label(label) => {
                label.text = text.into();
                true
            }
            _ => false,
        }
    }

    /// Swaps the image shown by an image node. Returns `false` for other kinds.
    pub fn set_image(&self, new_image: Rc<ImageData>) -> bool {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Image(image) => {
                *image = new_image;
                true
            }
            _ => false,
        }
    }

    // ── tree ────────────────────────────────────────────────────────────

    pub fn parent(&self) -> Option<DisplayNode> {
        self.0.borrow().parent.upgrade().map(DisplayNode)
    }

    /// Snapshot of the children, back to front.
    pub fn children(&self) -> Vec<DisplayNode> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn child_by_name(&self, name: &str) -> Option<DisplayNode> {
        self.0
            .borrow()
            .children
            .iter()
            .find(|child| child.0.borrow().name.as_deref() == Some(name))
            .cloned()
    }

    /// `true` if `self` is `node` or one of its ancestors.
    pub fn is_ancestor_of(&self, node: &DisplayNode) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if n == *self {
                return true;
            }
            current = n.parent();
        }
        false
    }

    /// Appends `child` in front of the existing children, detaching it from
    /// any previous parent.
    ///
    /// # Panics
    ///
    /// If `child` is `self` or one of its ancestors.
    pub fn add(&self, child: &DisplayNode) -> DisplayNode {
        self.insert_child(child, None);
        child.clone()
    }

    /// Inserts `child` at `index` (clamped to the child count).
    pub fn add_at_index(&self, child: &DisplayNode, index: usize) -> DisplayNode {
        self.insert_child(child, Some(index));
        child.clone()
    }

    fn insert_child(&self, child: &DisplayNode, index: Option<usize>) {
        assert!(
            !child.is_ancestor_of(self),
            "cannot add a display node to its own subtree"
        );
        child.remove_from_parent();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        let mut data = self.0.borrow_mut();
        let index = index.map_or(data.children.len(), |i| i.min(data.children.len()));
        data.children.insert(index, child.clone());
    }

    /// Detaches `child`. Returns `false` if it is not a child of `self`.
    pub fn remove(&self, child: &DisplayNode) -> bool {
        if child.parent().as_ref() != Some(self) {
            return false;
        }
        let removed = {
            let mut data = self.0.borrow_mut();
            let index = data.children.iter().position(|c| c == child);
            index.map(|i| data.children.remove(i))
        };
        child.0.borrow_mut().parent = Weak::new();
        removed.is_some()
    }

    pub fn remove_from_parent(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove(self),
            None => false,
        }
    }

    pub fn remove_all_children(&self) {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in &children {
            child.0.borrow_mut().parent = Weak::new();
        }
    }

    /// Moves `self` in front of its siblings.
    pub fn send_to_front(&self) {
        if let Some(parent) = self.parent() {
            parent.add(self);
        }
    }

    /// Moves `self` behind its siblings.
    pub fn send_to_back(&self) {
        if let Some(parent) = self.parent() {
            parent.add_at_index(self, 0);
        }
    }

    // ── transforms ──────────────────────────────────────────────────────

    /// `self` followed by its ancestors up to the root.
    fn lineage(&self) -> Vec<DisplayNode> {
        let mut lineage = vec![self.clone()];
        while let Some(parent) = lineage.last().and_then(DisplayNode::parent) {
            lineage.push(parent);
        }
        lineage
    }

    /// Transform from local space to the root's parent space.
    pub fn world_transform(&self) -> Transform {
        self.lineage()
            .iter()
            .rev()
            .map(DisplayNode::transform)
            .reduce(|world, local| world.multiply(&local))
            .unwrap_or_default()
    }

    pub fn local_to_world(&self, point: Vec2) -> Vec2 {
        self.lineage()
            .iter()
            .fold(point, |p, node| node.transform().transform_point(p))
    }

    pub fn world_to_local(&self, point: Vec2) -> Vec2 {
        self.lineage()
            .iter()
            .rev()
            .fold(point, |p, node| node.transform().untransform_point(p))
    }

    // ── bounds & visibility ─────────────────────────────────────────────

    /// Extent of this node's own content, ignoring children.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.0.borrow().kind.content_bounds()
    }

    /// Local-space extent of the content and every descendant.
    ///
    /// A frozen node reports the bounds it was frozen with.
    pub fn bounds(&self) -> Option<Rect> {
        let (own, children) = {
            let data = self.0.borrow();
            if let Some(frozen) = data.frozen {
                return Some(frozen.bounds);
            }
            (data.kind.content_bounds(), data.children.clone())
        };
        children.iter().fold(own, |acc, child| {
            let Some(sub) = child.bounds() else {
                return acc;
            };
            let transform = child.transform();
            let corners = sub.corners().map(|p| transform.transform_point(p));
            let sub = Rect::from_points(corners).unwrap_or(sub);
            Some(acc.map_or(sub, |acc| acc.union(sub)))
        })
    }

    /// [`bounds`](Self::bounds) expressed in `reference`'s local space.
    pub fn bounds_in(&self, reference: &DisplayNode) -> Option<Rect> {
        let bounds = self.bounds()?;
        let corners = bounds
            .corners()
            .map(|p| reference.world_to_local(self.local_to_world(p)));
        Rect::from_points(corners)
    }

    /// `false` if this node or any ancestor is hidden or nearly transparent.
    pub fn is_visible(&self) -> bool {
        self.lineage().iter().all(|node| {
            let data = node.0.borrow();
            data.visible && data.transform.alpha >= 0.01
        })
    }
}

impl TweenTarget for DisplayNode {
    fn tween_key(&self) -> Tag {
        Tag::of(&self.0)
    }

    fn tween_value(&self, property: &TweenProperty) -> Option<f32> {
        let t = self.transform();
        match property {
            TweenProperty::X => Some(t.x),
            TweenProperty::Y => Some(t.y),
            TweenProperty::ScaleX => Some(t.scale_x),
            TweenProperty::ScaleY => Some(t.scale_y),
            TweenProperty::Rotation => Some(t.rotation),
            TweenProperty::Alpha => Some(t.alpha),
            TweenProperty::Named(_) => None,
        }
    }

    fn set_tween_value(&self, property: &TweenProperty, value: f32) {
        let mut data = self.0.borrow_mut();
        let t = &mut data.transform;
        match property {
            TweenProperty::X => t.x = value,
            TweenProperty::Y => t.y = value,
            TweenProperty::ScaleX => t.scale_x = value,
            TweenProperty::ScaleY => t.scale_y = value,
            TweenProperty::Rotation => t.rotation = value,
            TweenProperty::Alpha => t.alpha = value,
            TweenProperty::Named(_) => {}
        }
    }
}
