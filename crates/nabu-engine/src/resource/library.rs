use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::{AssetCache, AssetDescription, AssetKey, AssetKind, ClipData, FrameSpec, ImageData};
use crate::canvas::Texture;

/// Host side of asset loading: starts a fetch for `key` and later reports
/// back through [`ResourceLibrary::complete`] or [`ResourceLibrary::fail`].
pub trait AssetFetcher {
    fn fetch(&self, key: &AssetKey);
}

/// Fetched bytes handed back by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Text(String),
    Image(Texture),
}

/// Non-blocking resource access for scenes: call every tick until ready.
pub trait ResourceLoader {
    /// `true` once the bundle `name` under `base_url` and all its sheets are loaded.
    fn require_asset(&self, base_url: &str, name: &str) -> bool;

    /// Requests every bundle, even after one reports not ready.
    fn require_assets(&self, base_url: &str, names: &[&str]) -> bool {
        names
            .iter()
            .fold(true, |ready, name| self.require_asset(base_url, name) && ready)
    }

    fn image_data(&self, name: &str) -> Option<Rc<ImageData>>;
    fn clip_data(&self, name: &str) -> Option<Rc<ClipData>>;
}

/// Registry of named image and clip data plus the fetch caches feeding it.
pub struct ResourceLibrary {
    fetcher: Rc<dyn AssetFetcher>,
    descriptions: AssetCache<Rc<AssetDescription>>,
    textures: AssetCache<Texture>,
    texts: AssetCache<Rc<str>>,
    bundles: RefCell<HashSet<AssetKey>>,
    images: RefCell<HashMap<String, Rc<ImageData>>>,
    clips: RefCell<HashMap<String, Rc<ClipData>>>,
}

impl fmt::Debug for ResourceLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLibrary")
            .field("bundles", &self.bundles.borrow().len())
            .field("images", &self.images.borrow().len())
            .field("clips", &self.clips.borrow().len())
            .finish()
    }
}

impl ResourceLibrary {
    pub fn new(fetcher: Rc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            descriptions: AssetCache::new(),
            textures: AssetCache::new(),
            texts: AssetCache::new(),
            bundles: RefCell::new(HashSet::new()),
            images: RefCell::new(HashMap::new()),
            clips: RefCell::new(HashMap::new()),
        }
    }

    // ── fetching ────────────────────────────────────────────────────────

    pub fn require_description(&self, url: &str) -> Option<Rc<AssetDescription>> {
        let key = AssetKey::url(AssetKind::Json, url);
        self.descriptions.require(&key, |k| self.fetcher.fetch(k))
    }

    pub fn require_image(&self, url: &str) -> Option<Texture> {
        let key = AssetKey::url(AssetKind::Image, url);
        self.textures.require(&key, |k| self.fetcher.fetch(k))
    }

    pub fn require_text(&self, url: &str) -> Option<Rc<str>> {
        let key = AssetKey::url(AssetKind::Text, url);
        self.texts.require(&key, |k| self.fetcher.fetch(k))
    }

    /// Delivers a finished fetch. A payload that does not fit the key's kind,
    /// or a description that fails to parse, counts as a failure.
    pub fn complete(&self, key: &AssetKey, payload: AssetPayload) {
        match (key.kind, payload) {
            (AssetKind::Json, AssetPayload::Text(text)) => match AssetDescription::from_json(&text) {
                Ok(description) => {
                    self.descriptions.resolve(key, Rc::new(description));
                }
                Err(err) => {
                    log::error!("invalid asset description {}: {err}", key.url);
                    self.descriptions.fail(key);
                }
            },
            (AssetKind::Text, AssetPayload::Text(text)) => {
                self.texts.resolve(key, Rc::from(text));
            }
            (AssetKind::Image, AssetPayload::Image(texture)) => {
                self.textures.resolve(key, texture);
            }
            (kind, payload) => {
                log::warn!("unexpected payload for {key}: {kind:?} <- {payload:?}");
                self.fail(key);
            }
        }
    }

    pub fn fail(&self, key: &AssetKey) {
        match key.kind {
            AssetKind::Json => self.descriptions.fail(key),
            AssetKind::Image => self.textures.fail(key),
            AssetKind::Text => self.texts.fail(key),
            AssetKind::Bundle => self.bundles.borrow_mut().remove(key),
        };
    }

    // ── registry ────────────────────────────────────────────────────────

    pub fn add_image(&self, image: ImageData) -> Rc<ImageData> {
        let image = Rc::new(image);
        self.images
            .borrow_mut()
            .insert(image.name.clone(), Rc::clone(&image));
        image
    }

    /// Registers `clip` and links its content against the registry.
    pub fn add_clip(&self, clip: ClipData) -> Rc<ClipData> {
        let clip = self.register_clip(clip);
        self.link_clip(&clip);
        clip
    }

    pub fn create_clip(&self, name: &str, frames: &[FrameSpec]) -> Rc<ClipData> {
        self.add_clip(ClipData::new(name, frames.iter().map(FrameSpec::build).collect()))
    }

    /// Concatenation of the named clips, not registered. Unknown names are skipped.
    pub fn combined_clip_data(&self, name: &str, parts: &[&str]) -> ClipData {
        let parts: Vec<Rc<ClipData>> = parts.iter().filter_map(|part| self.clip_data(part)).collect();
        ClipData::combined(name, &parts)
    }

    pub fn create_combined_clip(&self, name: &str, parts: &[&str]) -> Rc<ClipData> {
        self.register_clip(self.combined_clip_data(name, parts))
    }

    /// Retries linking every registered clip. Returns names still unresolved.
    pub fn link_all(&self) -> Vec<String> {
        let clips: Vec<Rc<ClipData>> = self.clips.borrow().values().cloned().collect();
        clips.iter().flat_map(|clip| self.link_clip(clip)).collect()
    }

    fn register_clip(&self, clip: ClipData) -> Rc<ClipData> {
        let clip = Rc::new(clip);
        self.clips
            .borrow_mut()
            .insert(clip.name().to_owned(), Rc::clone(&clip));
        clip
    }

    fn link_clip(&self, clip: &ClipData) -> Vec<String> {
        let missing = clip.link(
            &|name| self.images.borrow().get(name).cloned(),
            &|name| self.clips.borrow().get(name).cloned(),
        );
        for name in &missing {
            log::warn!("clip {} refers to unknown content {name}", clip.name());
        }
        missing
    }

    fn install(&self, base_url: &str, description: &AssetDescription) {
        for sheet in &description.sheets {
            let Some(texture) = self
                .textures
                .get(&AssetKey::url(AssetKind::Image, format!("{base_url}{}", sheet.file)))
            else {
                continue;
            };
            for entry in &sheet.entries {
                self.add_image(ImageData::new(entry.name.clone(), texture, entry.xy, entry.uv));
            }
        }

        // Register first so clips in one bundle can refer to each other.
        let added: Vec<Rc<ClipData>> = description
            .clips
            .iter()
            .map(|spec| self.register_clip(ClipData::new(&spec.name, spec.frames.iter().map(FrameSpec::build).collect())))
            .collect();
        for clip in &added {
            self.link_clip(clip);
        }
    }
}

impl ResourceLoader for ResourceLibrary {
    fn require_asset(&self, base_url: &str, name: &str) -> bool {
        let key = AssetKey::new(AssetKind::Bundle, name, format!("{base_url}{name}"));
        if self.bundles.borrow().contains(&key) {
            return true;
        }

        let Some(description) = self.require_description(&format!("{base_url}{name}_description.json")) else {
            return false;
        };
        let ready = description
            .sheets
            .iter()
            .fold(true, |ready, sheet| self.require_image(&format!("{base_url}{}", sheet.file)).is_some() && ready);
        if !ready {
            return false;
        }

        self.install(base_url, &description);
        self.bundles.borrow_mut().insert(key);
        log::info!("asset bundle {name} ready");
        true
    }

    fn image_data(&self, name: &str) -> Option<Rc<ImageData>> {
        let image = self.images.borrow().get(name).cloned();
        if image.is_none() {
            log::warn!("missing image data {name}");
        }
        image
    }

    fn clip_data(&self, name: &str) -> Option<Rc<ClipData>> {
        let clip = self.clips.borrow().get(name).cloned();
        if clip.is_none() {
            log::warn!("missing clip data {name}");
        }
        clip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ContentSource, FrameRange};

    /// Records requests; the test completes them by hand.
    #[derive(Default)]
    struct Requests(RefCell<Vec<AssetKey>>);

    impl AssetFetcher for Requests {
        fn fetch(&self, key: &AssetKey) {
            self.0.borrow_mut().push(key.clone());
        }
    }

    const DESCRIPTION: &str = r#"{
        "sheets": [ { "file": "hud_0.png", "entries": [
            { "name": "dot", "xy": [0, 0, 8, 8], "uv": [0, 0, 0.25, 0.25] },
            { "name": "ring", "xy": [-4, -4, 4, 4], "uv": [0.25, 0, 0.5, 0.25] }
        ] } ],
        "clips": [
            { "name": "blink", "frames": [ "dot", "ring" ] },
            { "name": "pair", "frames": [ { "label": "both", "content": [
                { "clip": "blink", "transform": [0, 0] },
                { "image": "dot", "transform": [10, 0] }
            ] } ] }
        ]
    }"#;

    fn library() -> (Rc<Requests>, ResourceLibrary) {
        let requests = Rc::new(Requests::default());
        let library = ResourceLibrary::new(Rc::clone(&requests) as Rc<dyn AssetFetcher>);
        (requests, library)
    }

    // ── bundles ─────────────────────────────────────────────────────────

    #[test]
    fn bundle_becomes_ready_after_description_and_sheets() {
        let (requests, library) = library();

        assert!(!library.require_asset("assets/", "hud"));
        assert!(!library.require_asset("assets/", "hud"));
        assert_eq!(requests.0.borrow().len(), 1);
        let json = requests.0.borrow()[0].clone();
        assert_eq!(json.url, "assets/hud_description.json");

        library.complete(&json, AssetPayload::Text(DESCRIPTION.to_owned()));
        assert!(!library.require_asset("assets/", "hud"));
        let sheet = requests.0.borrow()[1].clone();
        assert_eq!(sheet, AssetKey::url(AssetKind::Image, "assets/hud_0.png"));

        library.complete(&sheet, AssetPayload::Image(Texture::new(9, 32, 32)));
        assert!(library.require_asset("assets/", "hud"));
        assert_eq!(requests.0.borrow().len(), 2);

        let ring = library.image_data("ring").unwrap();
        assert_eq!(ring.texture.id, 9);
        assert_eq!(ring.source_rect.origin.x, 8.0);

        let pair = library.clip_data("pair").unwrap();
        assert_eq!(pair.label("both"), Some(FrameRange::new(1, 1)));
        match &pair.frame(0).unwrap().content[0].source {
            ContentSource::Clip(link) => assert!(link.is_linked()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failed_sheet_is_requested_again() {
        let (requests, library) = library();
        library.require_asset("", "hud");
        let json = requests.0.borrow()[0].clone();
        library.complete(&json, AssetPayload::Text(DESCRIPTION.to_owned()));
        library.require_asset("", "hud");
        let sheet = requests.0.borrow()[1].clone();

        library.fail(&sheet);
        assert!(!library.require_asset("", "hud"));
        assert_eq!(requests.0.borrow().len(), 3);
        assert_eq!(requests.0.borrow()[2], sheet);
    }

    #[test]
    fn invalid_description_fails_request() {
        let (requests, library) = library();
        library.require_asset("", "hud");
        let json = requests.0.borrow()[0].clone();
        library.complete(&json, AssetPayload::Text("not json".to_owned()));
        library.require_asset("", "hud");
        assert_eq!(requests.0.borrow().len(), 2);
    }

    // ── registry ────────────────────────────────────────────────────────

    #[test]
    fn create_clip_links_registered_images() {
        let (_, library) = library();
        library.add_image(ImageData::whole("a", Texture::new(1, 4, 4)));
        let clip = library.create_clip("solo", &[FrameSpec::Image("a".into()), FrameSpec::Image("b".into())]);
        assert_eq!(clip.frame_count(), 2);
        assert_eq!(library.link_all(), ["b"]);

        library.add_image(ImageData::whole("b", Texture::new(2, 4, 4)));
        assert!(library.link_all().is_empty());
    }

    #[test]
    fn combined_clip_is_registered_under_new_name() {
        let (_, library) = library();
        library.create_clip("one", &[FrameSpec::Image("x".into())]);
        library.create_clip("two", &[FrameSpec::Image("x".into()), FrameSpec::Image("x".into())]);
        let both = library.create_combined_clip("both", &["one", "two", "missing"]);
        assert_eq!(both.frame_count(), 3);
        assert_eq!(both.label("two"), Some(FrameRange::new(2, 3)));
        assert!(Rc::ptr_eq(&library.clip_data("both").unwrap(), &both));
    }

    #[test]
    fn require_assets_requests_every_bundle() {
        let (requests, library) = library();
        assert!(!library.require_assets("", &["a", "b"]));
        assert_eq!(requests.0.borrow().len(), 2);
    }
}
