//! Image decoding.

use image::ImageFormat;

use crate::TextureError;

/// A decoded image: tightly packed RGBA8, rows top-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Check that the byte length matches the dimensions.
    pub fn validate(&self) -> Result<(), TextureError> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                TextureError::Malformed(format!(
                    "{}x{} image is too large to address",
                    self.width, self.height
                ))
            })?;
        if self.rgba.len() != expected {
            return Err(TextureError::Malformed(format!(
                "{}x{} image carries {} bytes, expected {expected}",
                self.width,
                self.height,
                self.rgba.len()
            )));
        }
        Ok(())
    }
}

/// Turns encoded bytes into pixels.
pub trait ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, TextureError>;
}

/// PNG decoding through the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, TextureError> {
        let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}
