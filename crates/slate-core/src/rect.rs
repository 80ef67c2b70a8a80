//! Axis-aligned pixel rectangle with the cut decomposition used by the
//! compositor

use serde::{Deserialize, Serialize};

use super::{Area, Point};

/// Axis-aligned rectangle: top-left position plus extent
///
/// The right and bottom edges are exclusive. A rectangle with a non-positive
/// extent is invalid; operations on invalid rectangles yield invalid results
/// instead of errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// Invalid empty rectangle
    pub const EMPTY: Rect = Rect { x: 0, y: 0, w: 0, h: 0 };

    /// Create a rectangle from position and extent
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle at a point with an area
    #[inline]
    pub fn at(pos: Point, area: Area) -> Self {
        Self::new(pos.x, pos.y, area.w, area.h)
    }

    /// Create a rectangle covering an area at the origin
    #[inline]
    pub fn from_area(area: Area) -> Self {
        Self::new(0, 0, area.w, area.h)
    }

    /// Top-left corner
    #[inline]
    pub fn pos(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Extent
    #[inline]
    pub fn area(self) -> Area {
        Area::new(self.w, self.h)
    }

    /// Exclusive right edge
    #[inline]
    pub fn right(self) -> i32 {
        self.x + self.w
    }

    /// Exclusive bottom edge
    #[inline]
    pub fn bottom(self) -> i32 {
        self.y + self.h
    }

    /// Center point
    #[inline]
    pub fn center(self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Check that the extent is positive
    #[inline]
    pub fn is_valid(self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Check whether a point lies inside
    #[inline]
    pub fn contains(self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Check whether two rectangles share any pixel
    #[inline]
    pub fn overlaps(self, other: Rect) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Intersection, invalid if the rectangles do not overlap
    pub fn intersect(self, other: Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Bounding box of two rectangles; an invalid argument yields the other
    pub fn union(self, other: Rect) -> Rect {
        if !self.is_valid() {
            return other;
        }
        if !other.is_valid() {
            return self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Translate by an offset
    #[inline]
    pub fn moved(self, by: Point) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.w, self.h)
    }

    /// Cut this rectangle around a hole into up to four disjoint remainders:
    /// the bands above, left of, right of, and below the hole, in that order.
    ///
    /// The hole is clipped to this rectangle first, so any rectangle is an
    /// acceptable argument. Remainders that would be empty come back invalid.
    /// The top and bottom bands span the full width; the left and right bands
    /// only span the hole's vertical extent.
    pub fn cut(self, hole: Rect) -> [Rect; 4] {
        let hole = self.intersect(hole);
        if !hole.is_valid() {
            return [self, Rect::EMPTY, Rect::EMPTY, Rect::EMPTY];
        }
        [
            Rect::new(self.x, self.y, self.w, hole.y - self.y),
            Rect::new(self.x, hole.y, hole.x - self.x, hole.h),
            Rect::new(hole.right(), hole.y, self.right() - hole.right(), hole.h),
            Rect::new(self.x, hole.bottom(), self.w, self.bottom() - hole.bottom()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
        assert_eq!(r.center(), Point::new(25, 40));
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(9, 9)));
        assert!(!r.contains(Point::new(10, 9)));
        assert!(!r.contains(Point::new(-1, 5)));
    }

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert_eq!(a.intersect(b), Rect::new(50, 50, 50, 50));

        let c = Rect::new(200, 200, 10, 10);
        assert!(!a.intersect(c).is_valid());
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert_eq!(a.union(b), Rect::new(0, 0, 150, 150));

        assert_eq!(a.union(Rect::EMPTY), a);
        assert_eq!(Rect::EMPTY.union(b), b);
    }

    #[test]
    fn test_rect_cut_center_hole() {
        let whole = Rect::new(0, 0, 100, 100);
        let hole = Rect::new(25, 25, 50, 50);
        let [top, left, right, bottom] = whole.cut(hole);

        assert_eq!(top, Rect::new(0, 0, 100, 25));
        assert_eq!(left, Rect::new(0, 25, 25, 50));
        assert_eq!(right, Rect::new(75, 25, 25, 50));
        assert_eq!(bottom, Rect::new(0, 75, 100, 25));

        // Remainders plus hole cover the whole rectangle exactly once
        let covered: usize = [top, left, right, bottom, hole]
            .iter()
            .map(|r| r.area().count())
            .sum();
        assert_eq!(covered, whole.area().count());
    }

    #[test]
    fn test_rect_cut_remainders_disjoint() {
        let whole = Rect::new(0, 0, 60, 60);
        let parts = whole.cut(Rect::new(20, 10, 20, 30));
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(!parts[i].overlaps(parts[j]));
            }
        }
    }

    #[test]
    fn test_rect_cut_partial_overlap() {
        // Hole sticking out to the upper left is clipped first
        let whole = Rect::new(10, 10, 40, 40);
        let [top, left, right, bottom] = whole.cut(Rect::new(0, 0, 20, 20));

        assert!(!top.is_valid());
        assert!(!left.is_valid());
        assert_eq!(right, Rect::new(20, 10, 30, 10));
        assert_eq!(bottom, Rect::new(10, 20, 40, 30));
    }

    #[test]
    fn test_rect_cut_disjoint_hole() {
        let whole = Rect::new(0, 0, 10, 10);
        let [top, left, right, bottom] = whole.cut(Rect::new(50, 50, 10, 10));
        assert_eq!(top, whole);
        assert!(!left.is_valid());
        assert!(!right.is_valid());
        assert!(!bottom.is_valid());
    }
}
