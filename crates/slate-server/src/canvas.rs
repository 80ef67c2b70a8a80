//! The pixel-backend seam.
//!
//! The compositor draws through the `Canvas` trait; anything that can blit a
//! box, a texture, and a line of text behind a clip rectangle can back it.
//! `PixelCanvas` is the in-memory software implementation used by the test
//! suite to check compositing output pixel for pixel.

use serde::{Deserialize, Serialize};
use slate_core::{Area, Point, Rect};

use crate::buffer::Buffer;

/// 24-bit RGB color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(90, 90, 90);

    /// Create a color from components
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend `src` over `self` with an 8-bit alpha value
    #[inline]
    pub fn blended(self, src: Color, alpha: u8) -> Color {
        let a = alpha as u32;
        let mix = |d: u8, s: u8| (((s as u32) * a + (d as u32) * (255 - a)) / 255) as u8;
        Color::rgb(mix(self.r, src.r), mix(self.g, src.g), mix(self.b, src.b))
    }

    /// Average with another color (used to tint client content)
    #[inline]
    pub fn mixed(self, other: Color) -> Color {
        Color::rgb(
            ((self.r as u16 + other.r as u16) / 2) as u8,
            ((self.g as u16 + other.g as u16) / 2) as u8,
            ((self.b as u16 + other.b as u16) / 2) as u8,
        )
    }
}

/// Drawing surface consumed by the compositor
///
/// All drawing is clipped to the current clip rectangle. Implementations do
/// not need to handle invalid rectangles specially; callers only hand over
/// valid clips.
pub trait Canvas {
    /// Surface extent
    fn size(&self) -> Area;

    /// Current clip rectangle
    fn clip(&self) -> Rect;

    /// Restrict drawing to `clip` (already intersected with the surface by
    /// the caller)
    fn set_clip(&mut self, clip: Rect);

    /// Fill a rectangle with a solid color
    fn draw_box(&mut self, rect: Rect, color: Color);

    /// Blit a texture with its origin at `at`, optionally tinted and
    /// optionally alpha-blended
    fn draw_texture(&mut self, at: Point, texture: &Buffer, tint: Option<Color>, use_alpha: bool);

    /// Draw a line of text with its top-left corner at `at`
    fn draw_text(&mut self, at: Point, color: Color, text: &str);
}

/// Software canvas over a plain pixel grid
pub struct PixelCanvas {
    area: Area,
    clip: Rect,
    pixels: Vec<Color>,
}

impl PixelCanvas {
    /// Create a canvas filled with black
    pub fn new(area: Area) -> Self {
        Self {
            area,
            clip: Rect::from_area(area),
            pixels: vec![Color::BLACK; area.count()],
        }
    }

    /// Read one pixel; out-of-bounds reads come back black
    pub fn pixel(&self, p: Point) -> Color {
        if Rect::from_area(self.area).contains(p) {
            self.pixels[p.y as usize * self.area.w as usize + p.x as usize]
        } else {
            Color::BLACK
        }
    }

    /// Raw pixel storage, row-major
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    fn put(&mut self, p: Point, color: Color) {
        if self.clip.contains(p) && Rect::from_area(self.area).contains(p) {
            self.pixels[p.y as usize * self.area.w as usize + p.x as usize] = color;
        }
    }
}

impl Canvas for PixelCanvas {
    fn size(&self) -> Area {
        self.area
    }

    fn clip(&self) -> Rect {
        self.clip
    }

    fn set_clip(&mut self, clip: Rect) {
        self.clip = clip.intersect(Rect::from_area(self.area));
    }

    fn draw_box(&mut self, rect: Rect, color: Color) {
        let rect = rect.intersect(self.clip);
        if !rect.is_valid() {
            return;
        }
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.put(Point::new(x, y), color);
            }
        }
    }

    fn draw_texture(&mut self, at: Point, texture: &Buffer, tint: Option<Color>, use_alpha: bool) {
        let bounds = Rect::at(at, texture.area()).intersect(self.clip);
        if !bounds.is_valid() {
            return;
        }
        for y in bounds.y..bounds.bottom() {
            for x in bounds.x..bounds.right() {
                let p = Point::new(x, y);
                let local = p - at;
                let Some(mut src) = texture.pixel(local) else {
                    continue;
                };
                if let Some(tint) = tint {
                    src = src.mixed(tint);
                }
                let out = if use_alpha {
                    self.pixel(p).blended(src, texture.alpha_at(local))
                } else {
                    src
                };
                self.put(p, out);
            }
        }
    }

    fn draw_text(&mut self, _at: Point, _color: Color, _text: &str) {
        // Software test canvas does not rasterize fonts.
    }
}
