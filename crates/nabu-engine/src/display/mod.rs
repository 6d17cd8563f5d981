//! The display list: a tree of drawable nodes rendered back to front.
//!
//! Each [`DisplayNode`] carries a transform relative to its parent and one
//! kind of content: nothing (a group), an image, a clip animation, a filled
//! rect or circle, a text label or a custom drawing callback. Clips rebuild
//! their children from [`ClipData`](crate::resource::ClipData) frames as they
//! play.

mod clip;
mod content;
mod node;
mod render;

pub use clip::{ClipCompletions, FrameRef, PlayOptions};
pub use content::{DrawFn, LabelStyle};
pub use node::DisplayNode;
