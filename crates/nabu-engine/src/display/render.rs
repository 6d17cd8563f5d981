use std::rc::Rc;

use super::content::{NodeKind, begin};
use super::node::{DisplayNode, Frozen};
use crate::canvas::Canvas;
use crate::coords::{Rect, Transform};

/// World alpha below which a subtree is skipped.
const MIN_RENDER_ALPHA: f32 = 0.001;

impl DisplayNode {
    /// Draws this subtree with `parent` as the transform of the parent space.
    ///
    /// Hidden and fully transparent subtrees are skipped; frozen nodes draw
    /// their cached bitmap instead of their content and children.
    pub fn render(&self, canvas: &mut dyn Canvas, parent: &Transform) {
        let (local, visible, frozen) = {
            let data = self.0.borrow();
            (data.transform, data.visible, data.frozen)
        };
        if !visible || local.alpha == 0.0 {
            return;
        }
        let world = parent.multiply(&local);
        if world.alpha < MIN_RENDER_ALPHA {
            return;
        }

        match frozen {
            Some(frozen) => {
                let texture = frozen.texture;
                begin(canvas, &world, world.alpha);
                canvas.draw_image(
                    &texture,
                    Rect::new(0.0, 0.0, texture.width as f32, texture.height as f32),
                    frozen.bounds,
                );
                canvas.restore();
            }
            None => self.render_contents(canvas, &world),
        }
    }

    fn render_contents(&self, canvas: &mut dyn Canvas, world: &Transform) {
        let drawing = {
            let data = self.0.borrow();
            match &data.kind {
                NodeKind::Drawing { draw, .. } => Some(Rc::clone(draw)),
                kind => {
                    kind.render(canvas, world);
                    None
                }
            }
        };
        if let Some(draw) = drawing {
            begin(canvas, world, world.alpha);
            draw(canvas);
            canvas.restore();
        }

        for child in self.children() {
            child.render(canvas, world);
        }
    }

    /// Caches the subtree into an offscreen bitmap drawn in its place until
    /// [`unfreeze`](Self::unfreeze).
    ///
    /// `bounds` defaults to the current [`bounds`](Self::bounds); `scale` is
    /// the bitmap's resolution relative to local units. Returns `false` when
    /// there is nothing to cache.
    pub fn freeze(&self, canvas: &mut dyn Canvas, bounds: Option<Rect>, scale: f32) -> bool {
        self.unfreeze();
        let Some(bounds) = bounds.or_else(|| self.bounds()) else {
            return false;
        };
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let width = (bounds.size.x * scale).ceil().max(1.0) as u32;
        let height = (bounds.size.y * scale).ceil().max(1.0) as u32;

        let texture = canvas.begin_bitmap(width, height);
        let offset = Transform::new(-bounds.origin.x * scale, -bounds.origin.y * scale, scale, scale, 0.0, 1.0);
        self.render_contents(canvas, &offset);
        canvas.end_bitmap();

        self.0.borrow_mut().frozen = Some(Frozen { bounds, texture });
        true
    }

    pub fn unfreeze(&self) {
        self.0.borrow_mut().frozen = None;
    }

    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCmd, RecordingCanvas};
    use crate::coords::{Color, Vec2};
    use std::cell::Cell;

    fn scene() -> (DisplayNode, DisplayNode) {
        let root = DisplayNode::group().at(10.0, 10.0);
        let panel = root.add(&DisplayNode::rect(20.0, 10.0, Color::WHITE));
        panel.add(&DisplayNode::circle(2.0, Color::BLACK).at(5.0, 5.0));
        (root, panel)
    }

    // ── render ──────────────────────────────────────────────────────────

    #[test]
    fn renders_back_to_front_with_world_transforms() {
        let (root, _) = scene();
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        root.render(&mut canvas, &Transform::identity());

        let items = canvas.items();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0].cmd, DrawCmd::FillRect { .. }));
        assert_eq!(items[0].transform.offset(), Vec2::new(10.0, 10.0));
        assert!(matches!(items[1].cmd, DrawCmd::FillCircle { radius: 2.0, .. }));
        assert_eq!(items[1].transform.offset(), Vec2::new(15.0, 15.0));
        assert_eq!(canvas.save_depth(), 0);
    }

    #[test]
    fn hidden_and_transparent_subtrees_are_skipped() {
        let (root, panel) = scene();
        let mut canvas = RecordingCanvas::new(100.0, 100.0);

        panel.set_visible(false);
        root.render(&mut canvas, &Transform::identity());
        assert!(canvas.items().is_empty());

        panel.set_visible(true);
        root.set_alpha(0.0005);
        root.render(&mut canvas, &Transform::identity());
        assert!(canvas.items().is_empty());
    }

    #[test]
    fn drawing_runs_callback_under_transform() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let node = DisplayNode::drawing(Rect::new(0.0, 0.0, 4.0, 4.0), move |canvas| {
            c.set(c.get() + 1);
            canvas.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        })
        .at(3.0, 0.0);
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        node.render(&mut canvas, &Transform::identity());
        assert_eq!(calls.get(), 1);
        assert_eq!(canvas.items()[0].transform.offset(), Vec2::new(3.0, 0.0));
    }

    // ── freeze ──────────────────────────────────────────────────────────

    #[test]
    fn freeze_caches_subtree() {
        let (root, panel) = scene();
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        assert!(panel.freeze(&mut canvas, None, 2.0));
        assert!(panel.is_frozen());

        let bitmap: Vec<_> = canvas.items().iter().filter(|i| i.target.is_some()).collect();
        assert_eq!(bitmap.len(), 2);
        assert_eq!(bitmap[0].transform.a, 2.0);

        canvas.clear_items();
        root.render(&mut canvas, &Transform::identity());
        let cmds: Vec<_> = canvas.commands().cloned().collect();
        assert_eq!(cmds.len(), 1);
        match &cmds[0] {
            DrawCmd::DrawImage { texture, src, dst } => {
                assert_eq!((texture.width, texture.height), (40, 20));
                assert_eq!(*src, Rect::new(0.0, 0.0, 40.0, 20.0));
                assert_eq!(*dst, Rect::new(0.0, 0.0, 20.0, 10.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn frozen_bounds_win_until_unfreeze() {
        let (_, panel) = scene();
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        let fixed = Rect::new(-5.0, -5.0, 50.0, 50.0);
        panel.freeze(&mut canvas, Some(fixed), 1.0);
        assert_eq!(panel.bounds(), Some(fixed));
        panel.unfreeze();
        assert_eq!(panel.bounds(), Some(Rect::new(0.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn empty_group_cannot_freeze() {
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        assert!(!DisplayNode::group().freeze(&mut canvas, None, 1.0));
    }
}
