use super::Vec2;

/// Position, scale, rotation and alpha of a display node relative to its parent.
///
/// Points map as `translate(rotate(scale(p)))`. Composition through
/// [`Transform::multiply`] treats scale as axis-aligned, which is exact for
/// uniform scales and for unrotated parents.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Radians.
    pub rotation: f32,
    pub alpha: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            alpha: 1.0,
        }
    }

    #[inline]
    pub const fn at(x: f32, y: f32) -> Self {
        Self { x, y, ..Self::identity() }
    }

    #[inline]
    pub const fn new(x: f32, y: f32, scale_x: f32, scale_y: f32, rotation: f32, alpha: f32) -> Self {
        Self { x, y, scale_x, scale_y, rotation, alpha }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Composes `child` (expressed in this transform's space) into this transform.
    pub fn multiply(&self, child: &Transform) -> Transform {
        let origin = self.transform_point(child.position());
        Transform {
            x: origin.x,
            y: origin.y,
            scale_x: self.scale_x * child.scale_x,
            scale_y: self.scale_y * child.scale_y,
            rotation: self.rotation + child.rotation,
            alpha: self.alpha * child.alpha,
        }
    }

    /// Maps a point from local space into the space this transform is expressed in.
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let sx = p.x * self.scale_x;
        let sy = p.y * self.scale_y;
        if self.rotation == 0.0 {
            return Vec2::new(self.x + sx, self.y + sy);
        }
        let (s, c) = self.rotation.sin_cos();
        Vec2::new(self.x + sx * c - sy * s, self.y + sx * s + sy * c)
    }

    /// Inverse of [`Transform::transform_point`].
    ///
    /// A zero scale axis collapses every point; the result on that axis is 0.
    pub fn untransform_point(&self, p: Vec2) -> Vec2 {
        let dx = p.x - self.x;
        let dy = p.y - self.y;
        let (lx, ly) = if self.rotation == 0.0 {
            (dx, dy)
        } else {
            let (s, c) = self.rotation.sin_cos();
            (dx * c + dy * s, dy * c - dx * s)
        };
        Vec2::new(safe_div(lx, self.scale_x), safe_div(ly, self.scale_y))
    }
}

#[inline]
fn safe_div(v: f32, by: f32) -> f32 {
    if by == 0.0 { 0.0 } else { v / by }
}
