//! Coordinate and geometry types shared by the display list and UI layers.
//!
//! Canonical space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down, rotation in radians clockwise

mod color;
mod rect;
mod transform;
mod vec2;

pub use color::Color;
pub use rect::Rect;
pub use transform::Transform;
pub use vec2::Vec2;
