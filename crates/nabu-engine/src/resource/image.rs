use crate::canvas::Texture;
use crate::coords::Rect;

/// A region of a texture and where it lands relative to its node's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub name: String,
    pub texture: Texture,
    /// Region of `texture` in texels.
    pub source_rect: Rect,
    /// Placement in local space.
    pub dest_rect: Rect,
}

impl ImageData {
    /// Builds from sprite-sheet coordinates: `xy` is `[x0, y0, x1, y1]` in
    /// local space, `uv` is `[u0, v0, u1, v1]` normalized over the texture.
    pub fn new(name: impl Into<String>, texture: Texture, xy: [f32; 4], uv: [f32; 4]) -> Self {
        let (tw, th) = (texture.width as f32, texture.height as f32);
        Self {
            name: name.into(),
            texture,
            source_rect: Rect::new(uv[0] * tw, uv[1] * th, (uv[2] - uv[0]) * tw, (uv[3] - uv[1]) * th),
            dest_rect: Rect::new(xy[0], xy[1], xy[2] - xy[0], xy[3] - xy[1]),
        }
    }

    /// Whole texture placed with its top-left at the origin.
    pub fn whole(name: impl Into<String>, texture: Texture) -> Self {
        let (tw, th) = (texture.width as f32, texture.height as f32);
        Self {
            name: name.into(),
            texture,
            source_rect: Rect::new(0.0, 0.0, tw, th),
            dest_rect: Rect::new(0.0, 0.0, tw, th),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.dest_rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_coordinates_map_to_rects() {
        let image = ImageData::new("icon", Texture::new(1, 200, 100), [-10.0, -5.0, 10.0, 5.0], [0.5, 0.0, 0.6, 0.2]);
        assert_eq!(image.source_rect, Rect::new(100.0, 0.0, 20.0, 20.0));
        assert_eq!(image.bounds(), Rect::new(-10.0, -5.0, 20.0, 10.0));
    }
}
