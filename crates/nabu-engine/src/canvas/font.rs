use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::coords::Rect;

const LETTER_CACHE_LIMIT: usize = 1024;
const LINES_CACHE_LIMIT: usize = 128;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Text measurement supplied by the rendering backend.
pub trait TextMetrics {
    fn text_width(&self, family: &str, size: f32, text: &str) -> f32;

    fn line_height(&self, _family: &str, size: f32) -> f32 {
        size
    }
}

/// Fixed advance per character, as a fraction of the font size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MonospaceMetrics {
    pub advance: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn text_width(&self, _family: &str, size: f32, text: &str) -> f32 {
        text.chars().count() as f32 * size * self.advance
    }
}

/// Laid-out text extent as returned by [`Font::measure`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextBounds {
    /// Relative to the text anchor; `y` is centred on the first line.
    pub rect: Rect,
    pub lines: Rc<[String]>,
    pub line_height: f32,
    /// Margin callers add around `rect` for ascenders and descenders.
    pub padding: f32,
}

struct FontInner {
    family: String,
    size: f32,
    align: TextAlign,
    line_height: f32,
    metrics: Rc<dyn TextMetrics>,
    letters: RefCell<HashMap<String, f32>>,
    lines: RefCell<HashMap<(u32, String), Rc<[String]>>>,
}

/// A sized font bound to a measurement service, with width and line-break caches.
///
/// Cheap to clone; clones share caches. Treat as immutable once built.
#[derive(Clone)]
pub struct Font(Rc<FontInner>);

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("family", &self.0.family)
            .field("size", &self.0.size)
            .field("align", &self.0.align)
            .finish()
    }
}

impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.0.family == other.0.family && self.0.size == other.0.size && self.0.align == other.0.align
    }
}

impl Font {
    pub fn new(metrics: Rc<dyn TextMetrics>, family: impl Into<String>, size: f32) -> Self {
        Self::build(metrics, family.into(), size, TextAlign::Start)
    }

    fn build(metrics: Rc<dyn TextMetrics>, family: String, size: f32, align: TextAlign) -> Self {
        let line_height = metrics.line_height(&family, size);
        Font(Rc::new(FontInner {
            family,
            size,
            align,
            line_height,
            metrics,
            letters: RefCell::new(HashMap::new()),
            lines: RefCell::new(HashMap::new()),
        }))
    }

    pub fn with_align(self, align: TextAlign) -> Self {
        Self::build(Rc::clone(&self.0.metrics), self.0.family.clone(), self.0.size, align)
    }

    #[inline]
    pub fn family(&self) -> &str {
        &self.0.family
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.0.size
    }

    #[inline]
    pub fn align(&self) -> TextAlign {
        self.0.align
    }

    #[inline]
    pub fn line_height(&self) -> f32 {
        self.0.line_height
    }

    /// CSS-style shorthand, e.g. `"16px sans-serif"`.
    pub fn css(&self) -> String {
        format!("{}px {}", self.0.size, self.0.family)
    }

    /// Width of `text` on one line.
    pub fn measure_string(&self, text: &str) -> f32 {
        if let Some(width) = self.0.letters.borrow().get(text) {
            return *width;
        }
        let width = self.0.metrics.text_width(&self.0.family, self.0.size, text);
        let mut letters = self.0.letters.borrow_mut();
        if letters.len() >= LETTER_CACHE_LIMIT {
            letters.clear();
        }
        letters.insert(text.to_owned(), width);
        width
    }

    /// Splits `text` into lines no wider than `word_wrap`.
    ///
    /// Lines break after a space, tab, `.` or `,`; a word wider than the wrap
    /// width keeps its own line. Without a positive wrap width the text is one line.
    pub fn breaklines(&self, text: &str, word_wrap: Option<f32>) -> Rc<[String]> {
        let Some(wrap) = word_wrap.filter(|w| *w > 0.0) else {
            return Rc::from(vec![text.to_owned()]);
        };

        let key = (wrap.to_bits(), text.to_owned());
        if let Some(lines) = self.0.lines.borrow().get(&key) {
            return Rc::clone(lines);
        }

        let mut lines = Vec::new();
        let mut line = String::new();
        let mut line_width = 0.0;
        let mut word = String::new();
        let mut word_width = 0.0;
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let can_break = matches!(ch, ' ' | '.' | '\t' | ',');
            let width = self.measure_string(ch.encode_utf8(&mut buf));

            if !line.is_empty() && width + word_width + line_width > wrap {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            word.push(ch);
            word_width += width;
            if can_break {
                line.push_str(&word);
                line_width += word_width;
                word.clear();
                word_width = 0.0;
            }
        }
        line.push_str(&word);
        if !line.is_empty() {
            lines.push(line);
        }

        let lines: Rc<[String]> = lines.into();
        let mut cache = self.0.lines.borrow_mut();
        if cache.len() >= LINES_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(key, Rc::clone(&lines));
        lines
    }

    /// Extent of `text` relative to its anchor, honouring alignment and wrapping.
    pub fn measure(&self, text: &str, word_wrap: Option<f32>) -> TextBounds {
        let lines = self.breaklines(text, word_wrap);
        let line_height = self.line_height();
        let width = match (&*lines, word_wrap) {
            ([only], _) => self.measure_string(only),
            (_, Some(wrap)) => wrap,
            (_, None) => 0.0,
        };
        let height = lines.len() as f32 * line_height;
        let x = match self.align() {
            TextAlign::Start => 0.0,
            TextAlign::Center => -width * 0.5,
            TextAlign::End => -width,
        };
        TextBounds {
            rect: Rect::new(x, -line_height * 0.5, width, height),
            lines,
            line_height,
            padding: line_height * 0.5,
        }
    }
}
