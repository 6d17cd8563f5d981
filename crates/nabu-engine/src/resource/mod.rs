//! Image and clip data plus the registry and fetch caches that hold them.
//!
//! The host performs the actual fetching and decoding: [`ResourceLibrary`]
//! asks an [`AssetFetcher`] for anything not yet cached and the host reports
//! back with [`ResourceLibrary::complete`]. In-flight requests are never
//! issued twice.

mod cache;
mod clip;
mod description;
mod image;
mod library;

pub use cache::{AssetCache, AssetKey, AssetKind};
pub use clip::{ClipData, ClipFrame, ContentSource, FrameContent, FrameRange, LABEL_ALL, Link};
pub use description::{AssetDescription, ClipSpec, ContentSpec, FrameSpec, SheetEntry, SheetSpec};
pub use image::ImageData;
pub use library::{AssetFetcher, AssetPayload, ResourceLibrary, ResourceLoader};
