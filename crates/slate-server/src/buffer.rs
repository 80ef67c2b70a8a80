//! Quota-accounted virtual framebuffers.
//!
//! Each session may own one texture: a pixel plane, an optional alpha plane,
//! and an optional per-pixel input mask. All three planes are allocated and
//! released through the session's quota account; a buffer never outlives its
//! session.

use serde::{Deserialize, Serialize};
use slate_core::{Area, Point, Rect};

use crate::canvas::Color;
use crate::error::SessionError;

/// Pixel formats the server can composite
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8 bits per channel, 3 bytes per pixel
    #[default]
    Rgb888,
}

impl PixelFormat {
    /// Bytes per pixel of the pixel plane
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb888 => 3,
        }
    }
}

/// Display mode: extent plus pixel format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub area: Area,
    pub format: PixelFormat,
}

impl Mode {
    /// Create a mode
    pub const fn new(area: Area, format: PixelFormat) -> Self {
        Self { area, format }
    }

    /// Bytes a buffer of this mode occupies.
    ///
    /// With alpha enabled, two extra one-byte planes ride along: the alpha
    /// plane and the input mask.
    pub fn byte_count(&self, use_alpha: bool) -> u64 {
        let per_pixel = self.format.bytes_per_pixel() + if use_alpha { 2 } else { 0 };
        self.area.count() as u64 * per_pixel as u64
    }
}

/// A session's texture: pixels plus optional alpha and input-mask planes
#[derive(Clone, Debug)]
pub struct Buffer {
    area: Area,
    format: PixelFormat,
    pixels: Vec<u8>,
    alpha: Option<Vec<u8>>,
    input_mask: Option<Vec<u8>>,
}

impl Buffer {
    /// Allocate a zeroed buffer
    pub fn allocate(mode: Mode, use_alpha: bool) -> Self {
        let count = mode.area.count();
        Self {
            area: mode.area,
            format: mode.format,
            pixels: vec![0; count * mode.format.bytes_per_pixel()],
            alpha: use_alpha.then(|| vec![0; count]),
            input_mask: use_alpha.then(|| vec![0; count]),
        }
    }

    /// Buffer extent
    #[inline]
    pub fn area(&self) -> Area {
        self.area
    }

    /// Pixel format
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Whether an alpha plane is present
    #[inline]
    pub fn uses_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Total bytes across all planes
    pub fn byte_count(&self) -> u64 {
        Mode::new(self.area, self.format).byte_count(self.uses_alpha())
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        if Rect::from_area(self.area).contains(p) {
            Some(p.y as usize * self.area.w as usize + p.x as usize)
        } else {
            None
        }
    }

    /// Read one pixel, `None` outside the buffer
    pub fn pixel(&self, p: Point) -> Option<Color> {
        let i = self.index(p)? * self.format.bytes_per_pixel();
        Some(Color::rgb(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    /// Write one pixel; writes outside the buffer are dropped
    pub fn set_pixel(&mut self, p: Point, color: Color) {
        if let Some(i) = self.index(p) {
            let i = i * self.format.bytes_per_pixel();
            self.pixels[i] = color.r;
            self.pixels[i + 1] = color.g;
            self.pixels[i + 2] = color.b;
        }
    }

    /// Fill the whole pixel plane with one color
    pub fn fill(&mut self, color: Color) {
        for y in 0..self.area.h {
            for x in 0..self.area.w {
                self.set_pixel(Point::new(x, y), color);
            }
        }
    }

    /// Alpha at a pixel; opaque when no alpha plane exists or outside the
    /// buffer
    pub fn alpha_at(&self, p: Point) -> u8 {
        match (&self.alpha, self.index(p)) {
            (Some(plane), Some(i)) => plane[i],
            _ => 255,
        }
    }

    /// Set the alpha value at a pixel
    pub fn set_alpha(&mut self, p: Point, value: u8) {
        if let (Some(i), Some(plane)) = (self.index(p), self.alpha.as_mut()) {
            plane[i] = value;
        }
    }

    /// Input mask at a pixel: zero passes input through to views behind,
    /// nonzero consumes it. Without a mask plane every pixel consumes.
    pub fn input_mask_at(&self, p: Point) -> u8 {
        match (&self.input_mask, self.index(p)) {
            (Some(plane), Some(i)) => plane[i],
            _ => 255,
        }
    }

    /// Set the input mask at a pixel
    pub fn set_input_mask(&mut self, p: Point, value: u8) {
        if let (Some(i), Some(plane)) = (self.index(p), self.input_mask.as_mut()) {
            plane[i] = value;
        }
    }

    /// Copy the overlapping region of another buffer's planes into this one
    pub(crate) fn copy_content_from(&mut self, old: &Buffer) {
        let w = self.area.w.min(old.area.w);
        let h = self.area.h.min(old.area.h);
        for y in 0..h {
            for x in 0..w {
                let p = Point::new(x, y);
                if let Some(color) = old.pixel(p) {
                    self.set_pixel(p, color);
                }
                self.set_alpha(p, old.alpha_at(p));
                self.set_input_mask(p, old.input_mask_at(p));
            }
        }
    }
}

/// Per-session byte budget for buffers and handle slots
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAccount {
    used: u64,
    limit: u64,
}

impl QuotaAccount {
    /// Create an account with a byte limit
    pub fn new(limit: u64) -> Self {
        Self { used: 0, limit }
    }

    /// Bytes currently charged
    #[inline]
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Bytes still available
    #[inline]
    pub fn available(&self) -> u64 {
        self.limit - self.used
    }

    /// Total budget
    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Charge bytes against the budget
    pub fn charge(&mut self, bytes: u64) -> Result<(), SessionError> {
        if bytes > self.available() {
            return Err(SessionError::quota_exceeded(bytes, self.available()));
        }
        self.used += bytes;
        Ok(())
    }

    /// Return bytes to the budget
    pub fn release(&mut self, bytes: u64) {
        self.used = self.used.saturating_sub(bytes);
    }
}
