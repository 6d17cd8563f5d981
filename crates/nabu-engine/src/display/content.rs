use std::fmt;
use std::rc::Rc;

use super::clip::ClipState;
use crate::canvas::{Canvas, Font, TextAlign, VerticalAlign};
use crate::coords::{Color, Rect, Transform, Vec2};
use crate::resource::ImageData;

/// Custom drawing callback, run with the node's transform applied.
pub type DrawFn = Rc<dyn Fn(&mut dyn Canvas)>;

/// Text appearance for label nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font: Font,
    pub color: Color,
    pub align: TextAlign,
    pub vertical_align: VerticalAlign,
    /// Wrap width; `None` keeps the text on one line.
    pub word_wrap: Option<f32>,
}

impl LabelStyle {
    pub fn new(font: Font) -> Self {
        Self {
            align: font.align(),
            font,
            color: Color::BLACK,
            vertical_align: VerticalAlign::default(),
            word_wrap: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_vertical_align(mut self, vertical_align: VerticalAlign) -> Self {
        self.vertical_align = vertical_align;
        self
    }

    pub fn with_word_wrap(mut self, width: f32) -> Self {
        self.word_wrap = Some(width);
        self
    }
}

pub(crate) struct LabelContent {
    pub text: String,
    pub font: Font,
    pub color: Color,
    pub vertical_align: VerticalAlign,
    pub word_wrap: Option<f32>,
}

impl LabelContent {
    pub fn new(text: String, style: LabelStyle) -> Self {
        let font = if style.font.align() == style.align {
            style.font
        } else {
            style.font.with_align(style.align)
        };
        Self {
            text,
            font,
            color: style.color,
            vertical_align: style.vertical_align,
            word_wrap: style.word_wrap,
        }
    }

    fn bounds(&self) -> Rect {
        let measured = self.font.measure(&self.text, self.word_wrap);
        let mut bounds = measured.rect.expanded(measured.padding, measured.padding);
        let lines = measured.lines.len() as f32;
        let line_height = measured.line_height;
        bounds.origin.y += match self.vertical_align {
            VerticalAlign::Center => -(lines - 1.0) * 0.5 * line_height,
            VerticalAlign::Top => line_height * 0.5,
            VerticalAlign::Bottom => -(lines - 0.5) * line_height,
        };
        bounds
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        canvas.set_fill_color(self.color);
        canvas.set_font(&self.font);

        let line_height = self.font.line_height();
        let lines = self.font.breaklines(&self.text, self.word_wrap);
        let count = lines.len() as f32;
        let mut y = match self.vertical_align {
            VerticalAlign::Center => -(count - 1.0) * 0.5 * line_height,
            VerticalAlign::Top => line_height * 0.5,
            VerticalAlign::Bottom => -line_height * 0.5 - (count - 1.0) * line_height,
        };
        for line in lines.iter() {
            canvas.fill_text(line, 0.0, y);
            y += line_height;
        }
    }
}

/// What a node draws at its own level, before its children.
pub(crate) enum NodeKind {
    Group,
    Image(Rc<ImageData>),
    Clip(ClipState),
    Rect { size: Vec2, color: Color },
    Circle { radius: f32, color: Color },
    Label(LabelContent),
    Drawing { bounds: Rect, draw: DrawFn },
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Image(_) => "image",
            NodeKind::Clip(_) => "clip",
            NodeKind::Rect { .. } => "rect",
            NodeKind::Circle { .. } => "circle",
            NodeKind::Label(_) => "label",
            NodeKind::Drawing { .. } => "drawing",
        }
    }

    /// Extent of this level's own drawing in local space.
    pub fn content_bounds(&self) -> Option<Rect> {
        match self {
            NodeKind::Group | NodeKind::Clip(_) => None,
            NodeKind::Image(image) => Some(image.bounds()),
            NodeKind::Rect { size, .. } => Some(Rect::new(0.0, 0.0, size.x, size.y)),
            NodeKind::Circle { radius, .. } => Some(Rect::new(-radius, -radius, radius * 2.0, radius * 2.0)),
            NodeKind::Label(label) => Some(label.bounds()),
            NodeKind::Drawing { bounds, .. } => Some(*bounds),
        }
    }

    /// Draws this level with `world` applied. [`NodeKind::Drawing`] is run by
    /// the caller, which must not hold the node borrowed while it does.
    pub fn render(&self, canvas: &mut dyn Canvas, world: &Transform) {
        match self {
            NodeKind::Group | NodeKind::Clip(_) | NodeKind::Drawing { .. } => {}
            NodeKind::Image(image) => {
                begin(canvas, world, world.alpha);
                canvas.draw_image(&image.texture, image.source_rect, image.dest_rect);
                canvas.restore();
            }
            NodeKind::Rect { size, color } => {
                begin(canvas, world, color.a * world.alpha);
                canvas.set_fill_color(*color);
                canvas.fill_rect(Rect::new(0.0, 0.0, size.x, size.y));
                canvas.restore();
            }
            NodeKind::Circle { radius, color } => {
                begin(canvas, world, color.a * world.alpha);
                canvas.set_fill_color(*color);
                canvas.fill_circle(Vec2::zero(), *radius);
                canvas.restore();
            }
            NodeKind::Label(label) => {
                begin(canvas, world, label.color.a * world.alpha);
                label.render(canvas);
                canvas.restore();
            }
        }
    }
}

/// Saves the canvas and applies `world`. Pair with `canvas.restore()`.
pub(crate) fn begin(canvas: &mut dyn Canvas, world: &Transform, alpha: f32) {
    canvas.save();
    canvas.translate(world.x, world.y);
    canvas.rotate(world.rotation);
    canvas.scale(world.scale_x, world.scale_y);
    canvas.set_global_alpha(alpha);
}
