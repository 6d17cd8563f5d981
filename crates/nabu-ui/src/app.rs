use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use anyhow::{Context as _, ensure};

use nabu_engine::canvas::Canvas;
use nabu_engine::coords::Rect;
use nabu_engine::dispatch::Context;
use nabu_engine::display::{ClipCompletions, DisplayNode};
use nabu_engine::time::{FixedRateConfig, FixedRateTimer};

use crate::app_node::AppNode;
use crate::button::CONFIG_BUTTON_TOUCH_OUTER_PADDING;
use crate::screen::{Screen, ScreenFit};

/// Context flag holding the [`SceneSwitch`] of the running app.
pub const CONTEXT_SCENE_SWITCH: &str = "scene_switch";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppConfig {
    /// Rate of logical ticks (contexts and the scene tree).
    pub update: FixedRateConfig,
    /// Rate of clip animation ticks.
    pub animation: FixedRateConfig,
    pub ideal_width: f32,
    pub ideal_height: f32,
    pub fit: ScreenFit,
    /// Default outer touch padding of buttons.
    pub button_outer_padding: f32,
    /// Bitmap resolution of frozen nodes relative to the screen's content scale.
    pub freeze_scale: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            update: FixedRateConfig::default(),
            animation: FixedRateConfig::with_fps(30.0),
            ideal_width: 480.0,
            ideal_height: 320.0,
            fit: ScreenFit::Fit,
            button_outer_padding: 20.0,
            freeze_scale: 1.0,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, timer) in [("update", &self.update), ("animation", &self.animation)] {
            ensure!(timer.fps.is_finite() && timer.fps > 0.0, "{name} fps must be positive, got {}", timer.fps);
        }
        ensure!(
            self.ideal_width > 0.0 && self.ideal_height > 0.0,
            "ideal size must be positive, got {}x{}",
            self.ideal_width,
            self.ideal_height
        );
        ensure!(
            self.button_outer_padding >= 0.0,
            "button outer padding must not be negative, got {}",
            self.button_outer_padding
        );
        ensure!(self.freeze_scale > 0.0, "freeze scale must be positive, got {}", self.freeze_scale);
        Ok(())
    }
}

/// Lets scene code ask the app to replace the current scene.
///
/// The switch happens between logical ticks, never inside one.
#[derive(Clone, Default)]
pub struct SceneSwitch(Rc<RefCell<Option<AppNode>>>);

impl fmt::Debug for SceneSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneSwitch").field("pending", &self.0.borrow().is_some()).finish()
    }
}

impl SceneSwitch {
    pub fn request(&self, scene: AppNode) {
        *self.0.borrow_mut() = Some(scene);
    }

    fn take(&self) -> Option<AppNode> {
        self.0.borrow_mut().take()
    }
}

/// Owns the screen, the timers, the root context and the current scene.
///
/// The host calls [`update`](Self::update) once per display refresh. Each
/// call runs the animation ticks that are due (clips first, then their
/// completion callbacks), then the logical ticks (root context, then the
/// scene tree), and renders if anything ran.
pub struct App<C: Canvas> {
    config: AppConfig,
    screen: Screen<C>,
    update_timer: FixedRateTimer,
    animation_timer: FixedRateTimer,
    context: Context,
    scene: Option<AppNode>,
    switch: SceneSwitch,
    paused: bool,
}

impl<C: Canvas> fmt::Debug for App<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("screen", &self.screen)
            .field("scene", &self.scene)
            .field("paused", &self.paused)
            .finish()
    }
}

impl<C: Canvas> App<C> {
    pub fn new(canvas: C, config: AppConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid app configuration")?;
        let screen = Screen::new(canvas, config.ideal_width, config.ideal_height, config.fit);
        let mut app = Self {
            config,
            screen,
            update_timer: FixedRateTimer::new(config.update),
            animation_timer: FixedRateTimer::new(config.animation),
            context: Context::new(),
            scene: None,
            switch: SceneSwitch::default(),
            paused: true,
        };
        app.reset_context();
        log::info!(
            "app ready: {}x{} at {} fps (animation {} fps)",
            config.ideal_width,
            config.ideal_height,
            config.update.fps,
            config.animation.fps
        );
        Ok(app)
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn screen(&self) -> &Screen<C> {
        &self.screen
    }

    #[inline]
    pub fn screen_mut(&mut self) -> &mut Screen<C> {
        &mut self.screen
    }

    /// The root context of the current scene.
    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn scene(&self) -> Option<&AppNode> {
        self.scene.as_ref()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn reset_context(&mut self) {
        self.context.dispose();
        self.context = Context::new();
        self.context.set(CONFIG_BUTTON_TOUCH_OUTER_PADDING, self.config.button_outer_padding);
        self.context.set(CONTEXT_SCENE_SWITCH, self.switch.clone());
        self.screen.set_context(&self.context);
    }

    /// Disposes the current scene and its context, then starts `scene` on a fresh root context.
    pub fn set_scene(&mut self, scene: AppNode) {
        self.clear_scene();
        log::info!("scene started");
        scene.start_root(self.context.clone(), self.screen.root_view());
        self.scene = Some(scene);
    }

    /// Disposes the current scene, leaving the screen empty.
    pub fn clear_scene(&mut self) {
        if let Some(scene) = self.scene.take() {
            scene.dispose();
            log::info!("scene disposed");
        }
        self.reset_context();
        self.update_timer.reset();
        self.animation_timer.reset();
    }

    /// Stops ticking until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("app paused");
        }
    }

    /// Starts ticking. Time spent paused is not caught up.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.update_timer.reset();
            self.animation_timer.reset();
            log::info!("app resumed");
        }
    }

    /// Runs whatever is due by the wall clock. Returns whether a frame was rendered.
    pub fn update(&mut self) -> bool {
        if self.paused {
            return false;
        }
        let animation = self.animation_timer.get_frames_due();
        let logical = self.update_timer.get_frames_due();
        self.run_frames(animation, logical)
    }

    /// Runs whatever is due after `elapsed` seconds, ignoring the wall clock.
    pub fn advance(&mut self, elapsed: f64) -> bool {
        if self.paused {
            return false;
        }
        let animation = self.animation_timer.frames_due_after(elapsed);
        let logical = self.update_timer.frames_due_after(elapsed);
        self.run_frames(animation, logical)
    }

    fn run_frames(&mut self, animation: u32, logical: u32) -> bool {
        self.screen.update();

        for _ in 0..animation {
            let mut completions = ClipCompletions::new();
            self.screen.root_view().update_animated_clips(&mut completions);
            for complete in completions {
                complete();
            }
        }

        for _ in 0..logical {
            self.context.update();
            if let Some(scene) = &self.scene {
                scene.update();
            }
            if let Some(next) = self.switch.take() {
                self.set_scene(next);
            }
        }

        if animation == 0 && logical == 0 {
            return false;
        }
        self.screen.render();
        true
    }

    /// Freezes `node` at the screen's resolution times the configured freeze scale.
    pub fn freeze(&mut self, node: &DisplayNode, bounds: Option<Rect>) -> bool {
        let scale = self.screen.metrics().content_scale * self.config.freeze_scale;
        node.freeze(self.screen.canvas_mut(), bounds, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_node::Hook;
    use nabu_engine::canvas::{DrawCmd, RecordingCanvas, Texture};
    use nabu_engine::coords::{Color, Transform};
    use nabu_engine::display::PlayOptions;
    use nabu_engine::input::TouchPhase;
    use nabu_engine::logging::{LoggingConfig, init_logging};
    use nabu_engine::resource::{ClipData, ClipFrame, ImageData, Link};
    use std::cell::Cell;

    const TICK: f64 = 1.0 / 60.0 + 1e-9;

    fn app() -> App<RecordingCanvas> {
        init_logging(LoggingConfig::for_tests());
        let mut app = App::new(RecordingCanvas::new(480.0, 320.0), AppConfig::default()).unwrap();
        app.resume();
        app
    }

    struct Counter(Rc<Cell<u32>>);

    impl Hook for Counter {
        fn update(&mut self, _node: &AppNode) {
            self.0.set(self.0.get() + 1);
        }
    }

    // ── configuration ─────────────────────────────────────────────────────

    #[test]
    fn invalid_config_is_rejected() {
        let config = AppConfig { ideal_width: 0.0, ..AppConfig::default() };
        let err = App::new(RecordingCanvas::new(10.0, 10.0), config).unwrap_err();
        assert_eq!(err.to_string(), "invalid app configuration");
        assert!(format!("{err:#}").contains("ideal size"));

        let config = AppConfig { animation: FixedRateConfig::with_fps(0.0), ..AppConfig::default() };
        assert!(config.validate().is_err());
    }

    // ── ticking ───────────────────────────────────────────────────────────

    #[test]
    fn paused_app_does_nothing() {
        let mut app = App::new(RecordingCanvas::new(480.0, 320.0), AppConfig::default()).unwrap();
        assert!(app.is_paused());
        assert!(!app.advance(1.0));
    }

    #[test]
    fn renders_only_when_frames_ran() {
        let mut app = app();
        let ticks = Rc::new(Cell::new(0));
        app.set_scene(AppNode::new().with_hook(Counter(Rc::clone(&ticks))));

        assert!(!app.advance(0.001));
        assert!(app.screen().canvas().items().is_empty());

        assert!(app.advance(TICK));
        assert_eq!(ticks.get(), 1);
        assert_eq!(app.screen().canvas().items()[0].cmd, DrawCmd::Clear);
    }

    #[test]
    fn logical_ticks_follow_the_timer_policy() {
        let mut app = app();
        let ticks = Rc::new(Cell::new(0));
        app.set_scene(AppNode::new().with_hook(Counter(Rc::clone(&ticks))));
        app.advance(0.1);
        assert_eq!(ticks.get(), 4, "backlog capped at max_frames");
        app.advance(1.0);
        assert_eq!(ticks.get(), 5, "a stall runs a single tick");
    }

    #[test]
    fn clip_completions_run_after_the_animation_walk() {
        let mut app = app();
        let image = Rc::new(ImageData::whole("dot", Texture::new(1, 2, 2)));
        let frames = (0..2)
            .map(|_| {
                let mut frame = ClipFrame::new(None);
                frame.add_image_content(None, Link::resolved("dot", Rc::clone(&image)), Transform::identity());
                frame
            })
            .collect();
        let clip = DisplayNode::clip(Rc::new(ClipData::new("blink", frames))).unwrap();
        app.screen().root_view().add(&clip);

        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        clip.play(PlayOptions::new().on_complete(move || d.set(true))).unwrap();
        app.advance(1.0 / 30.0 + 1e-9);
        assert_eq!(clip.current_frame(), Some(2));
        assert!(!done.get());

        app.advance(1.0 / 30.0 + 1e-9);
        assert_eq!(clip.current_frame(), Some(2));
        assert!(done.get());
        assert!(!clip.is_playing());
    }

    // ── scenes ────────────────────────────────────────────────────────────

    #[test]
    fn set_scene_disposes_old_scene_and_context() {
        let mut app = app();
        let first = AppNode::with_view(DisplayNode::rect(10.0, 10.0, Color::WHITE));
        app.set_scene(first.clone());
        let old_context = app.context().clone();
        first.add_button(first.view(), || {});
        assert!(old_context.event_dispatch().listener_count() > 0);

        app.set_scene(AppNode::new());
        assert!(first.is_disposed());
        assert!(old_context.is_disposed());
        assert_eq!(old_context.event_dispatch().listener_count(), 0);
        assert_ne!(app.context(), &old_context);
        assert_eq!(app.screen().root_view().child_count(), 1);
        assert_eq!(app.context().get::<f32>(CONFIG_BUTTON_TOUCH_OUTER_PADDING), Some(20.0));
    }

    #[test]
    fn scenes_can_request_a_switch() {
        let mut app = app();
        let first = AppNode::new();
        app.set_scene(first.clone());
        let switch = first.context().get::<SceneSwitch>(CONTEXT_SCENE_SWITCH).unwrap();
        let second = AppNode::new();
        switch.request(second.clone());
        assert!(!first.is_disposed());

        app.advance(TICK);
        assert!(first.is_disposed());
        assert_eq!(app.scene(), Some(&second));
    }

    // ── end to end ────────────────────────────────────────────────────────

    #[test]
    fn button_press_runs_action_a_tick_after_release() {
        let mut app = app();
        let scene = AppNode::new();
        app.set_scene(scene.clone());
        let view = scene.view().add(&DisplayNode::rect(50.0, 50.0, Color::WHITE).at(20.0, 20.0));
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let button = scene.add_button(&view, move || f.set(f.get() + 1));

        app.screen().touch_event(TouchPhase::Begin, 1, 0.0, 30.0, 30.0);
        app.advance(TICK);
        assert!(button.is_down());

        app.screen().touch_event(TouchPhase::End, 1, 0.1, 30.0, 30.0);
        app.advance(TICK);
        assert_eq!(fired.get(), 0);
        assert!(!button.is_down());

        app.advance(TICK);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn freeze_uses_screen_scale() {
        let mut app = App::new(RecordingCanvas::new(960.0, 640.0), AppConfig::default()).unwrap();
        let node = app.screen().root_view().add(&DisplayNode::rect(10.0, 5.0, Color::WHITE));
        assert!(app.freeze(&node, None));
        let begin = app.screen().canvas().commands().find_map(|cmd| match cmd {
            DrawCmd::BeginBitmap { texture } => Some((texture.width, texture.height)),
            _ => None,
        });
        assert_eq!(begin, Some((20, 10)));
    }
}
