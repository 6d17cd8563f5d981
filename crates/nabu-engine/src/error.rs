//! Recoverable errors raised by the display list.

use thiserror::Error;

/// Invalid clip playback request.
///
/// Returned before any playback state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipError {
    #[error("unknown label `{label}` in clip `{clip}`")]
    UnknownLabel { clip: String, label: String },

    #[error("frame {frame} is outside clip `{clip}` (frames 1..={frames})")]
    UnknownFrame { clip: String, frame: u32, frames: usize },

    #[error("cannot set a label and frame numbers")]
    LabelAndRange,

    #[error("on_complete will not be used with looping animation")]
    LoopWithOnComplete,

    #[error("clip `{clip}` has no frames")]
    NoFrames { clip: String },

    #[error("display node is not a clip")]
    NotAClip,
}
