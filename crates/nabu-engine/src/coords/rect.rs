use super::Vec2;

/// Axis-aligned rectangle, `origin` at the top-left corner.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { origin: Vec2::new(x, y), size: Vec2::new(w, h) }
    }

    /// Tightest rectangle around `points`; `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Rect> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (Vec2::new(min.x.min(p.x), min.y.min(p.y)), Vec2::new(max.x.max(p.x), max.y.max(p.y)))
        });
        Some(Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    /// Clockwise from the origin.
    #[inline]
    pub fn corners(self) -> [Vec2; 4] {
        let (min, max) = (self.min(), self.max());
        [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
    }

    /// Inclusive on every edge, so a press exactly on the border is inside.
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        let (x0, x1) = (min.x.min(max.x), min.x.max(max.x));
        let (y0, y1) = (min.y.min(max.y), min.y.max(max.y));
        (x0..=x1).contains(&p.x) && (y0..=y1).contains(&p.y)
    }

    /// Grows by `dx` left and right and by `dy` top and bottom.
    #[inline]
    pub fn expanded(self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.origin.x - dx, self.origin.y - dy, self.size.x + dx * 2.0, self.size.y + dy * 2.0)
    }

    pub fn union(self, other: Rect) -> Rect {
        let corners = self.corners().into_iter().chain(other.corners());
        Rect::from_points(corners).unwrap_or(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn edges_are_inside() {
        let rect = r(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Vec2::new(0.0, 0.0)));
        assert!(rect.contains(Vec2::new(10.0, 10.0)));
        assert!(!rect.contains(Vec2::new(-1.0, 5.0)));
        assert!(!rect.contains(Vec2::new(5.0, 10.5)));
    }

    #[test]
    fn negative_size_still_contains() {
        assert!(r(10.0, 0.0, -4.0, 5.0).contains(Vec2::new(7.0, 2.0)));
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn expanded_grows_each_side() {
        assert_eq!(r(10.0, 10.0, 20.0, 20.0).expanded(5.0, 2.0), r(5.0, 8.0, 30.0, 24.0));
    }

    #[test]
    fn union_covers_both() {
        assert_eq!(r(0.0, 0.0, 10.0, 10.0).union(r(20.0, -5.0, 5.0, 5.0)), r(0.0, -5.0, 25.0, 15.0));
    }

    #[test]
    fn points_bound_tightly() {
        assert!(Rect::from_points(std::iter::empty()).is_none());
        let b = Rect::from_points([Vec2::new(2.0, 3.0), Vec2::new(-1.0, 7.0)]);
        assert_eq!(b, Some(r(-1.0, 3.0, 3.0, 4.0)));
    }
}
