//! Geometry and damage primitives for the Slate window server
//!
//! All coordinates are integer pixels. Rectangles are position plus extent;
//! a rectangle with a zero or negative extent is invalid and is skipped by
//! every consumer rather than reported as an error.

mod area;
mod damage;
mod point;
mod rect;

pub use area::Area;
pub use damage::DamageTracker;
pub use point::Point;
pub use rect::Rect;
