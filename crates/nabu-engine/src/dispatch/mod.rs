//! Frame and event scheduling.
//!
//! Everything here is single-threaded and cooperative: shared handles are
//! `Rc`-based and every collection that is iterated once per tick is an
//! [`UpdateList`], which tolerates mutation from inside its own callbacks.

mod context;
mod event;
mod frame;
mod tag;
mod update_list;

pub use context::{Context, EVENT_DISPOSE, EVENT_INTERRUPT};
pub use event::{EventData, EventDispatch, EventHandler, EventName, ListenerId};
pub use frame::FrameDispatch;
pub use tag::Tag;
pub use update_list::UpdateList;
