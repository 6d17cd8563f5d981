//! Nabu UI: interaction and application structure on top of `nabu-engine`.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use nabu_ui::prelude::*;
//!
//! struct Title;
//!
//! impl Hook for Title {
//!     fn begin(&mut self, node: &AppNode) {
//!         let play = node.view().add(&DisplayNode::rect(120.0, 40.0, Color::WHITE).at(180.0, 140.0));
//!         node.add_button(&play, || log::info!("play pressed"));
//!     }
//! }
//!
//! let mut app = App::new(canvas, AppConfig::default())?;
//! app.set_scene(AppNode::new().with_hook(Title));
//! app.resume();
//!
//! // From the host's display refresh callback:
//! app.screen().touch_event(TouchPhase::Begin, 1, now, x, y);
//! app.update();
//! ```

pub mod app;
pub mod app_node;
pub mod button;
pub mod disposable;
pub mod screen;
pub mod scroll;
pub mod touch_area;

pub use app::{App, AppConfig};

/// Everything a scene needs. Import this in scene modules.
pub mod prelude {
    pub use crate::app::{App, AppConfig, CONTEXT_SCENE_SWITCH, SceneSwitch};
    pub use crate::app_node::{AppNode, Hook, NodeState};
    pub use crate::button::{
        Button, ButtonConfig, CONFIG_BUTTON_TOUCH_OUTER_PADDING, EVENT_BUTTON_DOWN, EVENT_BUTTON_UP,
    };
    pub use crate::disposable::{Disposable, Dispose};
    pub use crate::screen::{CONTEXT_SCREEN, Screen, ScreenFit, ScreenMetrics};
    pub use crate::scroll::{ScrollBehaviour, ScrollConfig};
    pub use crate::touch_area::TouchArea;

    // Engine primitives scenes work with directly.
    pub use nabu_engine::canvas::{Canvas, Font, TextAlign, VerticalAlign};
    pub use nabu_engine::coords::{Color, Rect, Transform, Vec2};
    pub use nabu_engine::coroutine::Yielder;
    pub use nabu_engine::dispatch::{Context, EventData};
    pub use nabu_engine::display::{DisplayNode, FrameRef, LabelStyle, PlayOptions};
    pub use nabu_engine::error::ClipError;
    pub use nabu_engine::input::TouchPhase;
    pub use nabu_engine::state::KeyedSwitch;
    pub use nabu_engine::tween::{TweenProperty, ease_in, ease_in_out, ease_out, linear};
}
