//! The 4-channel 8-bit pixel.

use bytemuck_derive::{Pod, Zeroable};

/// One RGBA8 pixel.
///
/// `#[repr(C)]` with four `u8` fields, so a tightly packed RGBA byte row can
/// be reinterpreted as `&[Pixel]` with [`bytemuck::cast_slice`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);
    pub const WHITE: Pixel = Pixel::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque pixel from three channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Channels normalised to `0.0..=1.0`.
    pub fn to_f32(self) -> [f32; 4] {
        self.to_array().map(|c| c as f32 / 255.0)
    }

    /// HSV hue in `0.0..1.0` (red = 0, green = 1/3, blue = 2/3). Greys
    /// report 0.
    pub fn hue(self) -> f32 {
        hue_of([self.r, self.g, self.b].map(|c| c as f32 / 255.0))
    }
}

impl From<[u8; 4]> for Pixel {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Hue of an RGB triple with channels in `0.0..=1.0`.
pub fn hue_of([r, g, b]: [f32; 3]) -> f32 {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0.0 {
        return 0.0;
    }

    let sector = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    let hue = sector / 6.0;
    if hue < 0.0 {
        hue + 1.0
    } else {
        hue
    }
}
