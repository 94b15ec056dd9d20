use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::spec::{AttrMap, AttrValue};

/// Integer pixel coordinates, origin at the top-left of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: u32,
    pub y: u32,
}

/// One pixel: a location plus its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub location: Location,
    pub color: Color,
}

impl Pixel {
    pub fn new(x: u32, y: u32, color: Color) -> Self {
        Self {
            location: Location { x, y },
            color,
        }
    }

    /// Location and channel values as span attributes, so every span can be
    /// traced back to the pixel that produced it.
    pub fn flat_attributes(&self) -> AttrMap {
        let mut attrs = AttrMap::new();
        attrs.insert("x".into(), AttrValue::from(i64::from(self.location.x)));
        attrs.insert("y".into(), AttrValue::from(i64::from(self.location.y)));
        attrs.insert("red".into(), AttrValue::from(i64::from(self.color.red)));
        attrs.insert("green".into(), AttrValue::from(i64::from(self.color.green)));
        attrs.insert("blue".into(), AttrValue::from(i64::from(self.color.blue)));
        attrs.insert("alpha".into(), AttrValue::from(i64::from(self.color.alpha)));
        attrs
    }
}

/// A rectangular RGBA canvas, stored row-major.
///
/// This is the input contract between the image-decoding layer and the
/// planners: decoders build one from raw RGBA bytes, planners only read
/// `width`/`height`/`at`, and the heatmap preview writes colors back with
/// [`PixelGrid::overwrite`] before re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl PixelGrid {
    /// A canvas of the given size filled with opaque white (invisible).
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; (width as usize) * (height as usize)],
        }
    }

    /// Build a grid from tightly-packed RGBA bytes (4 bytes per pixel,
    /// row-major). Returns `None` when the byte length does not match the
    /// dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: &[u8]) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return None;
        }
        let pixels = data
            .chunks_exact(4)
            .map(|px| Color::rgba(px[0], px[1], px[2], px[3]))
            .collect();
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn at(&self, x: u32, y: u32) -> Pixel {
        let idx = (self.width as usize) * (y as usize) + (x as usize);
        Pixel::new(x, y, self.pixels[idx])
    }

    /// Every pixel, top-to-bottom then left-to-right. Planner output order
    /// depends on this scan order, so it is part of the contract.
    pub fn all(&self) -> impl Iterator<Item = Pixel> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| self.at(x, y)))
    }

    /// The pixels with positive darkness, in scan order.
    pub fn visible(&self) -> Vec<Pixel> {
        self.all().filter(|p| p.color.is_visible()).collect()
    }

    /// Replace the color at the pixel's location. Out-of-bounds writes are
    /// ignored.
    pub fn overwrite(&mut self, pixel: Pixel) {
        if pixel.location.x >= self.width || pixel.location.y >= self.height {
            return;
        }
        let idx = (self.width as usize) * (pixel.location.y as usize) + (pixel.location.x as usize);
        self.pixels[idx] = pixel.color;
    }

    /// Tightly-packed RGBA bytes, suitable for handing to an image encoder.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            data.extend_from_slice(&[color.red, color.green, color.blue, color.alpha]);
        }
        data
    }
}
