use std::fmt;
use std::rc::{Rc, Weak};

use super::content::NodeKind;
use super::node::DisplayNode;
use crate::error::ClipError;
use crate::resource::{ClipData, ContentSource, FrameContent};

/// Completion callbacks collected during an animation pass, run after it.
pub type ClipCompletions = Vec<Box<dyn FnOnce()>>;

/// Playback state of a clip node.
pub(crate) struct ClipState {
    data: Rc<ClipData>,
    playback_speed: f32,
    playback_position: f32,
    playing: bool,
    start_frame: u32,
    end_frame: u32,
    looping: bool,
    /// 0-based index of the frame on display.
    current_frame: Option<usize>,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl ClipState {
    fn new(data: Rc<ClipData>) -> Self {
        let end_frame = data.frame_count() as u32;
        Self {
            data,
            playback_speed: 1.0,
            playback_position: 1.0,
            playing: false,
            start_frame: 1,
            end_frame,
            looping: true,
            current_frame: None,
            on_complete: None,
        }
    }

    fn check_frame(&self, frame: u32) -> Result<(), ClipError> {
        if frame == 0 || frame as usize > self.data.frame_count() {
            return Err(ClipError::UnknownFrame {
                clip: self.data.name().to_owned(),
                frame,
                frames: self.data.frame_count(),
            });
        }
        Ok(())
    }

    fn resolve(&self, frame: &FrameRef) -> Result<u32, ClipError> {
        match frame {
            FrameRef::Number(n) => {
                self.check_frame(*n)?;
                Ok(*n)
            }
            FrameRef::Label(label) => self.data.label(label).map(|r| r.start).ok_or_else(|| ClipError::UnknownLabel {
                clip: self.data.name().to_owned(),
                label: label.clone(),
            }),
        }
    }
}

/// Arguments to [`DisplayNode::play`].
///
/// Choosing a label or an on-complete callback turns looping off unless
/// `looping` says otherwise.
#[derive(Default)]
pub struct PlayOptions {
    pub label: Option<String>,
    /// Inclusive 1-based frame numbers.
    pub range: Option<(u32, u32)>,
    pub looping: Option<bool>,
    pub on_complete: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for PlayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayOptions")
            .field("label", &self.label)
            .field("range", &self.range)
            .field("looping", &self.looping)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn range(mut self, start: u32, end: u32) -> Self {
        self.range = Some((start, end));
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = Some(looping);
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

/// A frame addressed by 1-based number or by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRef {
    Number(u32),
    Label(String),
}

impl From<u32> for FrameRef {
    fn from(n: u32) -> Self {
        FrameRef::Number(n)
    }
}

impl From<&str> for FrameRef {
    fn from(label: &str) -> Self {
        FrameRef::Label(label.to_owned())
    }
}

impl From<String> for FrameRef {
    fn from(label: String) -> Self {
        FrameRef::Label(label)
    }
}

impl DisplayNode {
    /// A clip showing its first frame, stopped, set to loop when played.
    pub fn clip(data: Rc<ClipData>) -> Result<DisplayNode, ClipError> {
        if data.frame_count() == 0 {
            return Err(ClipError::NoFrames { clip: data.name().to_owned() });
        }
        let node = Self::with_kind(NodeKind::Clip(ClipState::new(data)));
        node.show_frame(0);
        Ok(node)
    }

    pub fn clip_data(&self) -> Option<Rc<ClipData>> {
        match &self.0.borrow().kind {
            NodeKind::Clip(clip) => Some(Rc::clone(&clip.data)),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(&self.0.borrow().kind, NodeKind::Clip(clip) if clip.playing)
    }

    /// 1-based number of the frame on display.
    pub fn current_frame(&self) -> Option<u32> {
        match &self.0.borrow().kind {
            NodeKind::Clip(clip) => clip.current_frame.map(|i| i as u32 + 1),
            _ => None,
        }
    }

    /// Frames advanced per animation tick. Non-finite speeds are ignored.
    pub fn set_playback_speed(&self, speed: f32) {
        if !speed.is_finite() {
            log::warn!("ignoring playback speed {speed}");
            return;
        }
        if let NodeKind::Clip(clip) = &mut self.0.borrow_mut().kind {
            clip.playback_speed = speed;
        }
    }

    /// Starts playback. Nothing changes if the options are rejected.
    pub fn play(&self, options: PlayOptions) -> Result<(), ClipError> {
        let PlayOptions { label, range, looping, on_complete } = options;
        let (show, replaced) = {
            let mut data = self.0.borrow_mut();
            let NodeKind::Clip(clip) = &mut data.kind else {
                return Err(ClipError::NotAClip);
            };
            if label.is_some() && range.is_some() {
                return Err(ClipError::LabelAndRange);
            }

            let mut start = clip.start_frame;
            let mut end = clip.end_frame;
            let mut position = clip.playback_position;
            let mut looping_now = clip.looping;
            let mut show = None;

            if let Some(label) = &label {
                let frames = clip.data.label(label).ok_or_else(|| ClipError::UnknownLabel {
                    clip: clip.data.name().to_owned(),
                    label: label.clone(),
                })?;
                (start, end) = (frames.start, frames.end);
                looping_now = false;
            }
            if let Some((from, to)) = range {
                clip.check_frame(from)?;
                clip.check_frame(to)?;
                if from > to {
                    return Err(ClipError::UnknownFrame {
                        clip: clip.data.name().to_owned(),
                        frame: from,
                        frames: clip.data.frame_count(),
                    });
                }
                (start, end) = (from, to);
            }
            if label.is_some() || range.is_some() {
                position = start as f32;
                show = Some(start as usize - 1);
            }
            if on_complete.is_some() {
                looping_now = false;
            }
            if let Some(looping) = looping {
                looping_now = looping;
            }
            if looping_now && on_complete.is_some() {
                return Err(ClipError::LoopWithOnComplete);
            }

            clip.start_frame = start;
            clip.end_frame = end;
            clip.playback_position = position;
            clip.looping = looping_now;
            clip.playing = true;
            let replaced = std::mem::replace(&mut clip.on_complete, on_complete);
            (show.filter(|index| clip.current_frame != Some(*index)), replaced)
        };
        drop(replaced);
        if let Some(index) = show {
            self.show_frame(index);
        }
        Ok(())
    }

    pub fn stop(&self) {
        if let NodeKind::Clip(clip) = &mut self.0.borrow_mut().kind {
            clip.playing = false;
        }
    }

    /// Shows `frame` and stops.
    pub fn goto(&self, frame: impl Into<FrameRef>) -> Result<(), ClipError> {
        let frame = frame.into();
        let index = {
            let mut data = self.0.borrow_mut();
            let NodeKind::Clip(clip) = &mut data.kind else {
                return Err(ClipError::NotAClip);
            };
            let number = clip.resolve(&frame)?;
            clip.start_frame = number;
            clip.end_frame = number;
            clip.playback_position = number as f32;
            clip.playing = false;
            number as usize - 1
        };
        self.show_frame(index);
        Ok(())
    }

    /// Advances this clip and every clip below it by one animation tick.
    ///
    /// Callbacks of clips that finished are appended to `completions` for the
    /// caller to run once the walk is over.
    pub fn update_animated_clips(&self, completions: &mut ClipCompletions) {
        self.advance(completions);
        for child in self.children() {
            child.update_animated_clips(completions);
        }
    }

    fn advance(&self, completions: &mut ClipCompletions) {
        let (show, completion) = {
            let mut data = self.0.borrow_mut();
            let NodeKind::Clip(clip) = &mut data.kind else {
                return;
            };
            if !clip.playing {
                return;
            }

            clip.playback_position += clip.playback_speed;
            let end = clip.end_frame as f32;
            if clip.playback_position.floor() > end {
                if clip.looping {
                    let start = clip.start_frame as f32;
                    let span = (clip.end_frame + 1 - clip.start_frame) as f32;
                    let wrapped = start + (clip.playback_position - start).rem_euclid(span);
                    clip.playback_position = if wrapped.floor() > end { start } else { wrapped };
                } else {
                    clip.playback_position = end;
                    clip.playing = false;
                }
            }

            let last = clip.data.frame_count() as i64 - 1;
            let index = (clip.playback_position.floor() as i64 - 1).clamp(0, last) as usize;
            let show = (clip.current_frame != Some(index)).then_some(index);
            let completion = if clip.playing { None } else { clip.on_complete.take() };
            (show, completion)
        };
        if let Some(index) = show {
            self.show_frame(index);
        }
        completions.extend(completion);
    }

    /// Rebuilds the children for frame `index`, reusing children whose
    /// instance name and source match.
    ///
    /// # Panics
    ///
    /// If `index` is outside the clip.
    fn show_frame(&self, index: usize) {
        let (frame, previous) = {
            let mut data = self.0.borrow_mut();
            let NodeKind::Clip(clip) = &mut data.kind else {
                return;
            };
            let Some(frame) = clip.data.frame(index).cloned() else {
                panic!("clip `{}` has no frame {}", clip.data.name(), index + 1);
            };
            clip.current_frame = Some(index);
            (frame, std::mem::take(&mut data.children))
        };

        let mut current: Vec<(String, DisplayNode)> = previous
            .into_iter()
            .enumerate()
            .map(|(i, child)| (child.name().unwrap_or_else(|| format!("__{i}")), child))
            .collect();

        let mut children = Vec::with_capacity(frame.content.len());
        for content in &frame.content {
            let reused = current
                .iter()
                .position(|(name, _)| *name == content.instance_name)
                .map(|i| current.swap_remove(i).1);
            let child = match reused {
                Some(child) if child.shows(&content.source) => child,
                stale => {
                    if let Some(stale) = stale {
                        stale.0.borrow_mut().parent = Weak::new();
                    }
                    node_for(content)
                }
            };

            child.set_transform(content.transform);
            if let Some(frame_no) = content.frame {
                if let Err(err) = child.goto(frame_no) {
                    log::warn!("{}: {err}", content.instance_name);
                }
            }
            child.0.borrow_mut().parent = Rc::downgrade(&self.0);
            children.push(child);
        }

        for (_, stale) in &current {
            stale.0.borrow_mut().parent = Weak::new();
        }
        self.0.borrow_mut().children = children;
    }

    fn shows(&self, source: &ContentSource) -> bool {
        match (&self.0.borrow().kind, source) {
            (NodeKind::Image(image), ContentSource::Image(link)) => link.get().is_some_and(|l| Rc::ptr_eq(l, image)),
            (NodeKind::Clip(clip), ContentSource::Clip(link)) => link.get().is_some_and(|l| Rc::ptr_eq(l, &clip.data)),
            (NodeKind::Group, ContentSource::Group) => true,
            _ => false,
        }
    }
}

fn node_for(content: &FrameContent) -> DisplayNode {
    let node = match &content.source {
        ContentSource::Image(link) => match link.get() {
            Some(image) => DisplayNode::image(Rc::clone(image)),
            None => {
                log::warn!("image {} is not linked", link.name());
                DisplayNode::group()
            }
        },
        ContentSource::Clip(link) => match link.get().map(|data| DisplayNode::clip(Rc::clone(data))) {
            Some(Ok(clip)) => {
                if content.frame.is_none() {
                    if let Err(err) = clip.play(PlayOptions::default()) {
                        log::warn!("{}: {err}", content.instance_name);
                    }
                }
                clip
            }
            Some(Err(err)) => {
                log::warn!("{}: {err}", content.instance_name);
                DisplayNode::group()
            }
            None => {
                log::warn!("clip {} is not linked", link.name());
                DisplayNode::group()
            }
        },
        ContentSource::Group => DisplayNode::group(),
    };
    node.named(content.instance_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Texture;
    use crate::coords::Transform;
    use crate::resource::{ClipFrame, ImageData, Link};
    use std::cell::Cell;

    fn image(name: &str) -> Rc<ImageData> {
        Rc::new(ImageData::whole(name, Texture::new(1, 8, 8)))
    }

    /// One image per frame, labels as given.
    fn strip(labels: &[Option<&str>], images: &[Rc<ImageData>]) -> Rc<ClipData> {
        let frames = labels
            .iter()
            .zip(images.iter().cycle())
            .map(|(label, img)| {
                let mut frame = ClipFrame::new(label.map(str::to_owned));
                frame.add_image_content(Some("face".into()), Link::resolved(img.name.clone(), Rc::clone(img)), Transform::identity());
                frame
            })
            .collect();
        Rc::new(ClipData::new("strip", frames))
    }

    fn tick(node: &DisplayNode) -> ClipCompletions {
        let mut completions = Vec::new();
        node.update_animated_clips(&mut completions);
        completions
    }

    // ── construction ────────────────────────────────────────────────────

    #[test]
    fn new_clip_shows_first_frame_stopped() {
        let clip = DisplayNode::clip(strip(&[None, None, None], &[image("a")])).unwrap();
        assert_eq!(clip.current_frame(), Some(1));
        assert!(!clip.is_playing());
        assert_eq!(clip.child_count(), 1);
        assert_eq!(clip.children()[0].name().as_deref(), Some("face"));
    }

    #[test]
    fn empty_clip_is_rejected() {
        let err = DisplayNode::clip(Rc::new(ClipData::new("none", Vec::new()))).unwrap_err();
        assert_eq!(err, ClipError::NoFrames { clip: "none".into() });
    }

    // ── playback ────────────────────────────────────────────────────────

    #[test]
    fn default_play_loops() {
        let clip = DisplayNode::clip(strip(&[None, None, None], &[image("a")])).unwrap();
        clip.play(PlayOptions::new()).unwrap();
        let frames: Vec<_> = (0..5)
            .map(|_| {
                tick(&clip);
                clip.current_frame().unwrap()
            })
            .collect();
        assert_eq!(frames, [2, 3, 1, 2, 3]);
        assert!(clip.is_playing());
    }

    #[test]
    fn label_plays_once_then_completes() {
        let clip = DisplayNode::clip(strip(&[None, Some("wave"), None, None, Some("rest")], &[image("a")])).unwrap();
        let done = Rc::new(Cell::new(0));
        let d = Rc::clone(&done);
        clip.play(PlayOptions::new().label("wave").on_complete(move || d.set(d.get() + 1)))
            .unwrap();
        assert_eq!(clip.current_frame(), Some(2));

        assert!(tick(&clip).is_empty());
        assert!(tick(&clip).is_empty());
        assert_eq!(clip.current_frame(), Some(4));
        let completions = tick(&clip);
        assert_eq!(completions.len(), 1);
        assert!(!clip.is_playing());
        assert_eq!(clip.current_frame(), Some(4));

        for f in completions {
            f();
        }
        assert_eq!(done.get(), 1);
        assert!(tick(&clip).is_empty());
    }

    #[test]
    fn label_with_explicit_loop() {
        let clip = DisplayNode::clip(strip(&[Some("a"), None, Some("b")], &[image("a")])).unwrap();
        clip.play(PlayOptions::new().label("a").looping(true)).unwrap();
        tick(&clip);
        tick(&clip);
        assert_eq!(clip.current_frame(), Some(1));
        assert!(clip.is_playing());
    }

    #[test]
    fn half_speed_holds_frames() {
        let clip = DisplayNode::clip(strip(&[None, None], &[image("a")])).unwrap();
        clip.set_playback_speed(0.5);
        clip.play(PlayOptions::new()).unwrap();
        tick(&clip);
        assert_eq!(clip.current_frame(), Some(1));
        tick(&clip);
        assert_eq!(clip.current_frame(), Some(2));
    }

    #[test]
    fn fast_loops_wrap_in_one_step() {
        let clip = DisplayNode::clip(strip(&[None, None, None], &[image("a")])).unwrap();
        clip.set_playback_speed(7.0);
        clip.play(PlayOptions::new()).unwrap();
        tick(&clip);
        assert_eq!(clip.current_frame(), Some(2));

        clip.set_playback_speed(f32::INFINITY);
        tick(&clip);
        assert_eq!(clip.current_frame(), Some(3));

        clip.set_playback_speed(1e30);
        tick(&clip);
        assert!(matches!(clip.current_frame(), Some(1..=3)));
        assert!(clip.is_playing());
    }

    // ── errors ──────────────────────────────────────────────────────────

    #[test]
    fn conflicting_options_are_rejected_without_change() {
        let clip = DisplayNode::clip(strip(&[Some("a"), None], &[image("a")])).unwrap();

        let err = clip.play(PlayOptions::new().label("a").range(1, 2)).unwrap_err();
        assert_eq!(err, ClipError::LabelAndRange);
        let err = clip.play(PlayOptions::new().looping(true).on_complete(|| {})).unwrap_err();
        assert_eq!(err, ClipError::LoopWithOnComplete);
        let err = clip.play(PlayOptions::new().label("zzz")).unwrap_err();
        assert!(matches!(err, ClipError::UnknownLabel { ref label, .. } if label == "zzz"));
        let err = clip.play(PlayOptions::new().range(1, 9)).unwrap_err();
        assert!(matches!(err, ClipError::UnknownFrame { frame: 9, .. }));

        assert!(!clip.is_playing());
        assert_eq!(DisplayNode::group().play(PlayOptions::new()), Err(ClipError::NotAClip));
    }

    #[test]
    fn goto_by_label_and_number() {
        let clip = DisplayNode::clip(strip(&[None, Some("end"), None], &[image("a")])).unwrap();
        clip.play(PlayOptions::new()).unwrap();
        clip.goto("end").unwrap();
        assert_eq!(clip.current_frame(), Some(2));
        assert!(!clip.is_playing());
        clip.goto(3u32).unwrap();
        assert_eq!(clip.current_frame(), Some(3));
        assert!(clip.goto(0u32).is_err());
        assert!(clip.goto("nope").is_err());
        assert_eq!(clip.current_frame(), Some(3));
    }

    // ── frame content ───────────────────────────────────────────────────

    #[test]
    fn matching_children_are_reused() {
        let a = image("a");
        let clip = DisplayNode::clip(strip(&[None, None, None], &[Rc::clone(&a)])).unwrap();
        let first = clip.children()[0].clone();
        clip.goto(2u32).unwrap();
        assert_eq!(clip.children()[0], first);
        assert_eq!(first.parent(), Some(clip.clone()));
    }

    #[test]
    fn changed_source_replaces_child() {
        let clip = DisplayNode::clip(strip(&[None, None], &[image("a"), image("b")])).unwrap();
        let first = clip.children()[0].clone();
        clip.goto(2u32).unwrap();
        let second = clip.children()[0].clone();
        assert_ne!(second, first);
        assert_eq!(first.parent(), None);
        assert_eq!(second.parent(), Some(clip.clone()));
    }

    #[test]
    fn nested_clips_play_unless_frame_is_fixed() {
        let inner = strip(&[None, None, None], &[image("a")]);
        let mut frame = ClipFrame::new(None);
        frame
            .add_clip_content(Some("free".into()), Link::resolved("strip", Rc::clone(&inner)), Transform::at(5.0, 0.0), None)
            .add_clip_content(Some("held".into()), Link::resolved("strip", Rc::clone(&inner)), Transform::identity(), Some(3));
        let outer = DisplayNode::clip(Rc::new(ClipData::new("outer", vec![frame]))).unwrap();

        let free = outer.child_by_name("free").unwrap();
        let held = outer.child_by_name("held").unwrap();
        assert!(free.is_playing());
        assert_eq!(free.position().x, 5.0);
        assert!(!held.is_playing());
        assert_eq!(held.current_frame(), Some(3));

        tick(&outer);
        assert_eq!(free.current_frame(), Some(2));
        assert_eq!(held.current_frame(), Some(3));
    }
}
