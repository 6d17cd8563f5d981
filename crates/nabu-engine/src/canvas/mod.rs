//! The 2D drawing surface the display list renders into.
//!
//! Hosts implement [`Canvas`] over their real backend (an HTML canvas, a GPU
//! batcher, ...). [`RecordingCanvas`] records commands instead of rasterising
//! and backs headless use and tests.

mod font;
mod recording;

pub use font::{Font, MonospaceMetrics, TextAlign, TextBounds, TextMetrics, VerticalAlign};
pub use recording::{Affine, DrawCmd, DrawItem, RecordingCanvas};

use std::rc::Rc;

use crate::coords::{Color, Rect, Vec2};

/// Host-owned image handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Texture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    #[inline]
    pub const fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }
}

/// Immediate-mode drawing surface with a save/restore state stack.
///
/// State covers the current transform, global alpha, fill color and font.
pub trait Canvas {
    /// Surface size in device pixels.
    fn size(&self) -> (f32, f32);

    /// Measurement service matching this surface's text rendering.
    fn text_metrics(&self) -> Rc<dyn TextMetrics>;

    /// Clears the whole surface.
    fn clear(&mut self);

    fn save(&mut self);
    fn restore(&mut self);

    fn translate(&mut self, x: f32, y: f32);
    /// Radians, clockwise.
    fn rotate(&mut self, angle: f32);
    fn scale(&mut self, x: f32, y: f32);

    fn set_global_alpha(&mut self, alpha: f32);
    fn set_fill_color(&mut self, color: Color);
    fn set_font(&mut self, font: &Font);

    fn fill_rect(&mut self, rect: Rect);
    fn fill_circle(&mut self, center: Vec2, radius: f32);
    fn fill_text(&mut self, text: &str, x: f32, y: f32);
    fn measure_text(&mut self, text: &str) -> f32;

    /// Draws the `src` region of `texture` into `dst`.
    fn draw_image(&mut self, texture: &Texture, src: Rect, dst: Rect);

    /// Redirects drawing into a new offscreen bitmap of the given size, with a
    /// fresh state, until the matching [`end_bitmap`](Self::end_bitmap).
    fn begin_bitmap(&mut self, width: u32, height: u32) -> Texture;
    fn end_bitmap(&mut self);
}
