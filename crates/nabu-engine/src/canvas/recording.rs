use std::rc::Rc;

use super::{Canvas, Font, MonospaceMetrics, TextMetrics, Texture};
use crate::coords::{Color, Rect, Vec2};

/// 2D affine matrix `[a c e; b d f]` applied as `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    #[inline]
    pub const fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    #[inline]
    pub fn apply(&self, p: Vec2) -> Vec2 {
        Vec2::new(self.a * p.x + self.c * p.y + self.e, self.b * p.x + self.d * p.y + self.f)
    }

    /// `self * other`: `other` is applied first.
    pub fn then(&self, other: &Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Translation component.
    #[inline]
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.e, self.f)
    }
}

/// Recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Clear,
    FillRect { rect: Rect, color: Color },
    FillCircle { center: Vec2, radius: f32, color: Color },
    FillText { text: String, x: f32, y: f32, color: Color, font: Option<String> },
    DrawImage { texture: Texture, src: Rect, dst: Rect },
    BeginBitmap { texture: Texture },
    EndBitmap,
}

/// A draw command plus the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub cmd: DrawCmd,
    pub transform: Affine,
    pub alpha: f32,
    /// Offscreen bitmap the command drew into; `None` is the surface itself.
    pub target: Option<Texture>,
}

#[derive(Debug, Clone)]
struct State {
    transform: Affine,
    alpha: f32,
    fill: Color,
    font: Option<Font>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::identity(),
            alpha: 1.0,
            fill: Color::BLACK,
            font: None,
        }
    }
}

struct Offscreen {
    texture: Texture,
    saved_state: State,
    saved_stack: Vec<State>,
}

/// Canvas that records every command instead of rasterising.
///
/// Used headless and by tests asserting on what a display tree drew.
pub struct RecordingCanvas {
    width: f32,
    height: f32,
    metrics: Rc<dyn TextMetrics>,
    items: Vec<DrawItem>,
    state: State,
    stack: Vec<State>,
    offscreen: Vec<Offscreen>,
    next_texture: u64,
}

impl RecordingCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_metrics(width, height, Rc::new(MonospaceMetrics::default()))
    }

    pub fn with_metrics(width: f32, height: f32, metrics: Rc<dyn TextMetrics>) -> Self {
        Self {
            width,
            height,
            metrics,
            items: Vec::new(),
            state: State::default(),
            stack: Vec::new(),
            offscreen: Vec::new(),
            next_texture: 1,
        }
    }

    /// Resizes the surface, as a host does when its window changes.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Commands in issue order.
    pub fn commands(&self) -> impl Iterator<Item = &DrawCmd> {
        self.items.iter().map(|item| &item.cmd)
    }

    /// Drops recorded items. Keeps the state stack.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    fn record(&mut self, cmd: DrawCmd) {
        self.items.push(DrawItem {
            cmd,
            transform: self.state.transform,
            alpha: self.state.alpha,
            target: self.offscreen.last().map(|o| o.texture),
        });
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn text_metrics(&self) -> Rc<dyn TextMetrics> {
        Rc::clone(&self.metrics)
    }

    fn clear(&mut self) {
        self.record(DrawCmd::Clear);
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        debug_assert!(!self.stack.is_empty(), "restore called without matching save");
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f32, y: f32) {
        let m = Affine { e: x, f: y, ..Affine::identity() };
        self.state.transform = self.state.transform.then(&m);
    }

    fn rotate(&mut self, angle: f32) {
        if angle == 0.0 {
            return;
        }
        let (s, c) = angle.sin_cos();
        let m = Affine { a: c, b: s, c: -s, d: c, e: 0.0, f: 0.0 };
        self.state.transform = self.state.transform.then(&m);
    }

    fn scale(&mut self, x: f32, y: f32) {
        let m = Affine { a: x, d: y, ..Affine::identity() };
        self.state.transform = self.state.transform.then(&m);
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha;
    }

    fn set_fill_color(&mut self, color: Color) {
        self.state.fill = color;
    }

    fn set_font(&mut self, font: &Font) {
        self.state.font = Some(font.clone());
    }

    fn fill_rect(&mut self, rect: Rect) {
        let color = self.state.fill;
        self.record(DrawCmd::FillRect { rect, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32) {
        let color = self.state.fill;
        self.record(DrawCmd::FillCircle { center, radius, color });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let color = self.state.fill;
        let font = self.state.font.as_ref().map(Font::css);
        self.record(DrawCmd::FillText { text: text.to_owned(), x, y, color, font });
    }

    fn measure_text(&mut self, text: &str) -> f32 {
        match &self.state.font {
            Some(font) => font.measure_string(text),
            None => self.metrics.text_width("sans-serif", 10.0, text),
        }
    }

    fn draw_image(&mut self, texture: &Texture, src: Rect, dst: Rect) {
        self.record(DrawCmd::DrawImage { texture: *texture, src, dst });
    }

    fn begin_bitmap(&mut self, width: u32, height: u32) -> Texture {
        let texture = Texture::new(self.next_texture, width, height);
        self.next_texture += 1;
        self.record(DrawCmd::BeginBitmap { texture });
        self.offscreen.push(Offscreen {
            texture,
            saved_state: std::mem::take(&mut self.state),
            saved_stack: std::mem::take(&mut self.stack),
        });
        texture
    }

    fn end_bitmap(&mut self) {
        debug_assert!(!self.offscreen.is_empty(), "end_bitmap called without begin_bitmap");
        if let Some(offscreen) = self.offscreen.pop() {
            self.state = offscreen.saved_state;
            self.stack = offscreen.saved_stack;
            self.record(DrawCmd::EndBitmap);
        }
    }
}
