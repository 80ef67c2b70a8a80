//! Integer pixel extent type

use serde::{Deserialize, Serialize};

use super::Point;

/// 2D extent in integer pixels
///
/// An area with a zero or negative component is invalid; invalid areas are
/// never drawn and cover no pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Area {
    pub w: i32,
    pub h: i32,
}

impl Area {
    /// Empty extent
    pub const ZERO: Area = Area { w: 0, h: 0 };

    /// Create a new area
    #[inline]
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }

    /// Check that both dimensions are positive
    #[inline]
    pub fn is_valid(self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Number of pixels covered, zero if invalid
    #[inline]
    pub fn count(self) -> usize {
        if self.is_valid() {
            self.w as usize * self.h as usize
        } else {
            0
        }
    }

    /// Convert to an offset from the origin
    #[inline]
    pub fn as_point(self) -> Point {
        Point::new(self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_count() {
        assert_eq!(Area::new(10, 5).count(), 50);
        assert_eq!(Area::new(0, 5).count(), 0);
        assert_eq!(Area::new(10, -1).count(), 0);
    }

    #[test]
    fn test_area_valid() {
        assert!(Area::new(1, 1).is_valid());
        assert!(!Area::ZERO.is_valid());
        assert!(!Area::new(-3, 4).is_valid());
    }
}
