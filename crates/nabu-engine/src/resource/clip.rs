use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::ImageData;
use crate::coords::Transform;

/// Label covering every frame of a clip.
pub const LABEL_ALL: &str = "all";

/// Inclusive, 1-based frame span.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameRange {
    pub start: u32,
    pub end: u32,
}

impl FrameRange {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn offset(self, by: u32) -> Self {
        Self::new(self.start + by, self.end + by)
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end + 1 - self.start
    }
}

/// Reference to named data, resolved when the owning clip is linked.
///
/// Clips may name images or other clips that are registered later in the
/// same bundle, so resolution happens in a second pass.
pub struct Link<T> {
    name: String,
    target: OnceCell<Rc<T>>,
}

impl<T> Link<T> {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), target: OnceCell::new() }
    }

    pub fn resolved(name: impl Into<String>, target: Rc<T>) -> Self {
        let link = Self::named(name);
        let _ = link.target.set(target);
        link
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get(&self) -> Option<&Rc<T>> {
        self.target.get()
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.target.get().is_some()
    }

    /// Resolves through `lookup` if not already linked. Returns whether linked.
    pub fn link(&self, lookup: impl FnOnce(&str) -> Option<Rc<T>>) -> bool {
        if self.is_linked() {
            return true;
        }
        match lookup(&self.name) {
            Some(target) => {
                let _ = self.target.set(target);
                true
            }
            None => false,
        }
    }
}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("name", &self.name)
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// What a frame places at an instance slot.
#[derive(Debug)]
pub enum ContentSource {
    Image(Link<ImageData>),
    Clip(Link<ClipData>),
    /// An empty container for code to fill.
    Group,
}

impl ContentSource {
    fn source_name(&self) -> Option<&str> {
        match self {
            ContentSource::Image(link) => Some(link.name()),
            ContentSource::Clip(link) => Some(link.name()),
            ContentSource::Group => None,
        }
    }
}

#[derive(Debug)]
pub struct FrameContent {
    pub instance_name: String,
    pub source: ContentSource,
    pub transform: Transform,
    /// For nested clips: show this frame and hold, instead of playing.
    pub frame: Option<u32>,
}

#[derive(Debug, Default)]
pub struct ClipFrame {
    pub label: Option<String>,
    pub content: Vec<FrameContent>,
}

impl ClipFrame {
    pub fn new(label: Option<String>) -> Self {
        Self { label, content: Vec::new() }
    }

    fn instance_name(&self, instance_name: Option<String>, source: &ContentSource) -> String {
        if let Some(name) = instance_name {
            return name;
        }
        let source_name = source.source_name().unwrap_or("group");
        let count = 1 + self
            .content
            .iter()
            .filter(|c| c.source.source_name() == Some(source_name))
            .count();
        format!("_img_{source_name}_{count}")
    }

    fn push(&mut self, instance_name: Option<String>, source: ContentSource, transform: Transform, frame: Option<u32>) {
        let instance_name = self.instance_name(instance_name, &source);
        self.content.push(FrameContent { instance_name, source, transform, frame });
    }

    pub fn add_image_content(&mut self, instance_name: Option<String>, image: Link<ImageData>, transform: Transform) -> &mut Self {
        self.push(instance_name, ContentSource::Image(image), transform, None);
        self
    }

    pub fn add_clip_content(
        &mut self,
        instance_name: Option<String>,
        clip: Link<ClipData>,
        transform: Transform,
        frame: Option<u32>,
    ) -> &mut Self {
        self.push(instance_name, ContentSource::Clip(clip), transform, frame);
        self
    }

    pub fn add_group_content(&mut self, instance_name: Option<String>, transform: Transform) -> &mut Self {
        self.push(instance_name, ContentSource::Group, transform, None);
        self
    }
}

/// A multi-frame animation: per frame, the positioned content to show.
///
/// Frames are shared by [`Rc`], so combined clips reuse their parts' frames.
#[derive(Debug)]
pub struct ClipData {
    name: String,
    frames: Vec<Rc<ClipFrame>>,
    labels: HashMap<String, FrameRange>,
}

impl ClipData {
    /// Builds a clip and derives its labels.
    ///
    /// `all` spans the whole clip; each labelled frame starts a range running
    /// until the next labelled frame.
    pub fn new(name: impl Into<String>, frames: Vec<ClipFrame>) -> Self {
        let frames: Vec<Rc<ClipFrame>> = frames.into_iter().map(Rc::new).collect();
        let mut labels = HashMap::new();
        if !frames.is_empty() {
            labels.insert(LABEL_ALL.to_owned(), FrameRange::new(1, frames.len() as u32));
        }
        let mut tracking: Option<&str> = None;
        for (index, frame) in frames.iter().enumerate() {
            let frame_no = index as u32 + 1;
            if let Some(label) = frame.label.as_deref() {
                labels.insert(label.to_owned(), FrameRange::new(frame_no, frame_no));
                tracking = Some(label);
            } else if let Some(range) = tracking.and_then(|label| labels.get_mut(label)) {
                range.end = frame_no;
            }
        }
        Self { name: name.into(), frames, labels }
    }

    /// Concatenates `parts` into one clip.
    ///
    /// Each part's name labels its span, and its own labels are kept with
    /// their frame numbers offset. `all` spans the result.
    pub fn combined(name: impl Into<String>, parts: &[Rc<ClipData>]) -> Self {
        let mut frames = Vec::new();
        let mut labels = HashMap::new();
        for part in parts {
            let offset = frames.len() as u32;
            if !part.frames.is_empty() {
                labels.insert(part.name.clone(), FrameRange::new(offset + 1, offset + part.frames.len() as u32));
            }
            for (label, range) in &part.labels {
                if label != LABEL_ALL {
                    labels.insert(label.clone(), range.offset(offset));
                }
            }
            frames.extend(part.frames.iter().cloned());
        }
        if !frames.is_empty() {
            labels.insert(LABEL_ALL.to_owned(), FrameRange::new(1, frames.len() as u32));
        }
        Self { name: name.into(), frames, labels }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame by 0-based index.
    #[inline]
    pub fn frame(&self, index: usize) -> Option<&Rc<ClipFrame>> {
        self.frames.get(index)
    }

    #[inline]
    pub fn label(&self, label: &str) -> Option<FrameRange> {
        self.labels.get(label).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, FrameRange)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Resolves named content. Returns the names that could not be resolved.
    pub fn link(
        &self,
        images: &dyn Fn(&str) -> Option<Rc<ImageData>>,
        clips: &dyn Fn(&str) -> Option<Rc<ClipData>>,
    ) -> Vec<String> {
        let mut missing = Vec::new();
        for content in self.frames.iter().flat_map(|f| f.content.iter()) {
            let linked = match &content.source {
                ContentSource::Image(link) => link.link(images),
                ContentSource::Clip(link) => link.link(clips),
                ContentSource::Group => true,
            };
            if !linked {
                missing.extend(content.source.source_name().map(str::to_owned));
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(labels: &[Option<&str>]) -> Vec<ClipFrame> {
        labels.iter().map(|l| ClipFrame::new(l.map(str::to_owned))).collect()
    }

    // ── labels ──────────────────────────────────────────────────────────

    #[test]
    fn labels_run_until_next_label() {
        let clip = ClipData::new("walk", frames(&[None, Some("a"), None, None, Some("b"), None]));
        assert_eq!(clip.label(LABEL_ALL), Some(FrameRange::new(1, 6)));
        assert_eq!(clip.label("a"), Some(FrameRange::new(2, 4)));
        assert_eq!(clip.label("b"), Some(FrameRange::new(5, 6)));
        assert_eq!(clip.label("c"), None);
    }

    #[test]
    fn empty_clip_has_no_labels() {
        let clip = ClipData::new("empty", Vec::new());
        assert_eq!(clip.frame_count(), 0);
        assert_eq!(clip.labels().count(), 0);
    }

    #[test]
    fn combined_offsets_part_labels() {
        let idle = Rc::new(ClipData::new("idle", frames(&[None, None])));
        let jump = Rc::new(ClipData::new("jump", frames(&[Some("up"), None, Some("down")])));
        let both = ClipData::combined("hero", &[idle, Rc::clone(&jump)]);

        assert_eq!(both.frame_count(), 5);
        assert_eq!(both.label("idle"), Some(FrameRange::new(1, 2)));
        assert_eq!(both.label("jump"), Some(FrameRange::new(3, 5)));
        assert_eq!(both.label("up"), Some(FrameRange::new(3, 4)));
        assert_eq!(both.label("down"), Some(FrameRange::new(5, 5)));
        assert_eq!(both.label(LABEL_ALL), Some(FrameRange::new(1, 5)));
        assert!(Rc::ptr_eq(both.frame(2).unwrap(), jump.frame(0).unwrap()));
    }

    // ── content ─────────────────────────────────────────────────────────

    #[test]
    fn generated_instance_names_count_per_source() {
        let mut frame = ClipFrame::new(None);
        frame
            .add_image_content(None, Link::named("star"), Transform::identity())
            .add_image_content(None, Link::named("star"), Transform::identity())
            .add_image_content(Some("hero".into()), Link::named("star"), Transform::identity())
            .add_image_content(None, Link::named("moon"), Transform::identity());
        let names: Vec<_> = frame.content.iter().map(|c| c.instance_name.as_str()).collect();
        assert_eq!(names, ["_img_star_1", "_img_star_2", "hero", "_img_moon_1"]);
    }

    #[test]
    fn link_reports_missing_names() {
        use crate::canvas::Texture;

        let star = Rc::new(ImageData::whole("star", Texture::new(1, 4, 4)));
        let mut frame = ClipFrame::new(None);
        frame
            .add_image_content(None, Link::named("star"), Transform::identity())
            .add_clip_content(None, Link::named("ghost"), Transform::identity(), Some(1));
        let clip = ClipData::new("sky", vec![frame]);

        let missing = clip.link(&|name| (name == "star").then(|| Rc::clone(&star)), &|_| None);
        assert_eq!(missing, ["ghost"]);
        match &clip.frame(0).unwrap().content[0].source {
            ContentSource::Image(link) => assert!(link.is_linked()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
