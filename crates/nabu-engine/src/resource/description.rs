use serde::Deserialize;

use super::clip::{ClipFrame, Link};
use crate::coords::Transform;

/// Contents of an asset bundle's `<name>_description.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssetDescription {
    #[serde(default)]
    pub sheets: Vec<SheetSpec>,
    #[serde(default)]
    pub clips: Vec<ClipSpec>,
}

impl AssetDescription {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A sprite sheet image and the named regions cut from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SheetSpec {
    /// Path relative to the bundle's base URL.
    pub file: String,
    #[serde(default)]
    pub entries: Vec<SheetEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SheetEntry {
    pub name: String,
    pub xy: [f32; 4],
    pub uv: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClipSpec {
    pub name: String,
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
}

/// One frame: either a bare image name or labelled content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FrameSpec {
    Image(String),
    Content {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        content: Vec<ContentSpec>,
    },
}

/// A placement inside a frame. Without `image` or `clip` it is an empty group.
///
/// `transform` is `[x, y, scale_x, scale_y, rotation, alpha, frame]`; missing
/// trailing values take their identity defaults and `frame` applies to clips.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default)]
    pub transform: Vec<f32>,
}

impl ContentSpec {
    fn transform(&self) -> Transform {
        let at = |i: usize, default: f32| self.transform.get(i).copied().unwrap_or(default);
        Transform::new(at(0, 0.0), at(1, 0.0), at(2, 1.0), at(3, 1.0), at(4, 0.0), at(5, 1.0))
    }

    fn frame(&self) -> Option<u32> {
        self.transform.get(6).map(|f| f.max(1.0) as u32)
    }
}

impl FrameSpec {
    pub(crate) fn build(&self) -> ClipFrame {
        match self {
            FrameSpec::Image(image) => {
                let mut frame = ClipFrame::new(None);
                frame.add_image_content(None, Link::named(image.clone()), Transform::identity());
                frame
            }
            FrameSpec::Content { label, content } => {
                let mut frame = ClipFrame::new(label.clone());
                for entry in content {
                    let transform = entry.transform();
                    if let Some(image) = &entry.image {
                        frame.add_image_content(entry.name.clone(), Link::named(image.clone()), transform);
                    } else if let Some(clip) = &entry.clip {
                        frame.add_clip_content(entry.name.clone(), Link::named(clip.clone()), transform, entry.frame());
                    } else {
                        frame.add_group_content(entry.name.clone(), transform);
                    }
                }
                frame
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ContentSource;

    const BUNDLE: &str = r#"{
        "sheets": [
            { "file": "ui_0.png", "entries": [
                { "name": "button_up", "xy": [-20, -10, 20, 10], "uv": [0, 0, 0.5, 0.25] }
            ] }
        ],
        "clips": [
            { "name": "button", "frames": [
                "button_up",
                { "label": "down", "content": [
                    { "name": "face", "image": "button_up", "transform": [0, 2, 1, 1, 0, 0.8] },
                    { "clip": "spark", "transform": [4, 4, 1, 1, 0, 1, 3] },
                    { "name": "slot" }
                ] }
            ] }
        ]
    }"#;

    #[test]
    fn parses_bundle_description() {
        let description = AssetDescription::from_json(BUNDLE).unwrap();
        assert_eq!(description.sheets[0].entries[0].name, "button_up");
        assert_eq!(description.clips[0].frames.len(), 2);
        assert!(matches!(description.clips[0].frames[0], FrameSpec::Image(ref n) if n == "button_up"));
    }

    #[test]
    fn builds_frame_content() {
        let description = AssetDescription::from_json(BUNDLE).unwrap();
        let frame = description.clips[0].frames[1].build();
        assert_eq!(frame.label.as_deref(), Some("down"));

        let face = &frame.content[0];
        assert_eq!(face.instance_name, "face");
        assert_eq!(face.transform, Transform::new(0.0, 2.0, 1.0, 1.0, 0.0, 0.8));

        let spark = &frame.content[1];
        assert_eq!(spark.instance_name, "_img_spark_1");
        assert_eq!(spark.frame, Some(3));
        assert!(matches!(spark.source, ContentSource::Clip(_)));

        assert!(matches!(frame.content[2].source, ContentSource::Group));
        assert_eq!(frame.content[2].transform, Transform::identity());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AssetDescription::from_json("{ \"sheets\": 3 }").is_err());
    }
}
