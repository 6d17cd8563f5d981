use std::fmt;

use nabu_engine::canvas::Canvas;
use nabu_engine::coords::Transform;
use nabu_engine::dispatch::{Context, EventData};
use nabu_engine::display::DisplayNode;
use nabu_engine::input::{TouchData, TouchPhase};

/// Context flag holding the current [`ScreenMetrics`].
pub const CONTEXT_SCREEN: &str = "screen";

/// How the ideal layout size maps onto the canvas.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ScreenFit {
    /// Uniform scale so the ideal size fits inside the canvas.
    #[default]
    Fit,
    /// No scaling; one layout unit is one canvas pixel.
    None,
}

/// Layout size of the screen as seen by scene code.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenMetrics {
    /// Canvas pixels per layout unit.
    pub content_scale: f32,
    /// Canvas width in layout units.
    pub width: f32,
    /// Canvas height in layout units.
    pub height: f32,
}

/// Binds a canvas to the root of the display list.
pub struct Screen<C: Canvas> {
    canvas: C,
    ideal_width: f32,
    ideal_height: f32,
    fit: ScreenFit,
    pixel_ratio: f32,
    root_view: DisplayNode,
    metrics: ScreenMetrics,
    context: Option<Context>,
}

impl<C: Canvas> fmt::Debug for Screen<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("fit", &self.fit)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<C: Canvas> Screen<C> {
    pub fn new(canvas: C, ideal_width: f32, ideal_height: f32, fit: ScreenFit) -> Self {
        let mut screen = Self {
            canvas,
            ideal_width,
            ideal_height,
            fit,
            pixel_ratio: 1.0,
            root_view: DisplayNode::group().named("root"),
            metrics: ScreenMetrics { content_scale: 1.0, width: ideal_width, height: ideal_height },
            context: None,
        };
        screen.update();
        screen
    }

    #[inline]
    pub fn root_view(&self) -> &DisplayNode {
        &self.root_view
    }

    #[inline]
    pub fn metrics(&self) -> ScreenMetrics {
        self.metrics
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    /// Canvas pixels per input unit, e.g. the device pixel ratio.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = if ratio > 0.0 { ratio } else { 1.0 };
    }

    /// Routes input to `context` and publishes the metrics on it.
    pub fn set_context(&mut self, context: &Context) {
        context.set(CONTEXT_SCREEN, self.metrics);
        self.context = Some(context.clone());
    }

    /// Recomputes the fit scale from the canvas size and applies it to the root view.
    pub fn update(&mut self) {
        let (width, height) = self.canvas.size();
        let scale = match self.fit {
            ScreenFit::Fit => (width / self.ideal_width).min(height / self.ideal_height),
            ScreenFit::None => 1.0,
        };
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let metrics = ScreenMetrics {
            content_scale: scale,
            width: (width / scale).floor(),
            height: (height / scale).floor(),
        };
        self.root_view.set_scale(scale);
        if metrics != self.metrics {
            self.metrics = metrics;
            if let Some(context) = &self.context {
                context.set(CONTEXT_SCREEN, metrics);
            }
        }
    }

    /// Queues a pointer sample on the active context.
    ///
    /// `x` and `y` are in input units relative to the canvas origin; they are
    /// scaled by the pixel ratio into canvas pixels. Dropped when no context
    /// is bound.
    pub fn touch_event(&self, phase: TouchPhase, id: u64, time: f64, x: f32, y: f32) {
        let Some(context) = &self.context else {
            return;
        };
        let touch = TouchData::new(id, time, x * self.pixel_ratio, y * self.pixel_ratio);
        context
            .get_active()
            .event_dispatch()
            .defer(phase.event_name(), EventData::Touch(touch));
    }

    /// Clears the canvas and draws the display list.
    pub fn render(&mut self) {
        self.canvas.clear();
        self.root_view.render(&mut self.canvas, &Transform::identity());
    }
}
