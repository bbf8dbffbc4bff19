//! Raw pixel buffers passed between pipeline stages.
//!
//! A [`PixelBuffer`] is a row-major grid of 8-bit samples with either three
//! (RGB) or four (RGBA) channels. The only way to build one is through a
//! constructor that checks `data.len() == width × height × channels`, so every
//! stage downstream can index pixels without bounds surprises.

use image::{RgbImage, RgbaImage};
use std::fmt;

/// Number of interleaved samples per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    Rgb,
    Rgba,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

/// Returned when raw bytes do not match the declared dimensions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("pixel data has {actual} bytes, expected {expected}")]
pub struct BufferSizeMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// A width × height grid of RGB or RGBA pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw interleaved samples, rejecting any length that does not
    /// describe whole rows.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        data: Vec<u8>,
    ) -> Result<Self, BufferSizeMismatch> {
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Wrap samples whose length the caller already guarantees.
    pub(crate) fn from_parts(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * channels.count()
        );
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// A buffer with every pixel set to `pixel`.
    ///
    /// `pixel.len()` selects the channel layout (3 or 4); other lengths fall
    /// back to RGB using the first three samples, padding with zeroes.
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Self {
        let channels = if pixel.len() == 4 {
            Channels::Rgba
        } else {
            Channels::Rgb
        };
        let mut px = [0u8; 4];
        for (dst, src) in px.iter_mut().zip(pixel) {
            *dst = *src;
        }
        let n = channels.count();
        let data = px[..n].repeat(width as usize * height as usize);
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at (`x`, `y`), or `None` outside the grid.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let n = self.channels.count();
        let start = (y as usize * self.width as usize + x as usize) * n;
        self.data.get(start..start + n)
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.channels.count())
    }

    /// Convert into an `image` crate RGBA image for encoding.
    ///
    /// Returns `None` for RGB buffers; run them through the transparency
    /// filter first.
    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        match self.channels {
            Channels::Rgba => RgbaImage::from_raw(self.width, self.height, self.data),
            Channels::Rgb => None,
        }
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: Channels::Rgb,
            data: img.into_raw(),
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: Channels::Rgba,
            data: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn rejects_partial_rows() {
        let err = PixelBuffer::new(2, 2, Channels::Rgb, vec![0; 11]).unwrap_err();
        assert_eq!(err.expected, 12);
        assert_eq!(err.actual, 11);
    }

    #[test]
    fn accepts_exact_length() {
        let buf = PixelBuffer::new(3, 2, Channels::Rgba, vec![7; 24]).unwrap();
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.pixels().count(), 6);
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let data: Vec<u8> = (0..18).collect();
        let buf = PixelBuffer::new(3, 2, Channels::Rgb, data).unwrap();
        assert_eq!(buf.pixel(0, 0), Some(&[0, 1, 2][..]));
        assert_eq!(buf.pixel(2, 0), Some(&[6, 7, 8][..]));
        assert_eq!(buf.pixel(0, 1), Some(&[9, 10, 11][..]));
        assert_eq!(buf.pixel(3, 0), None);
        assert_eq!(buf.pixel(0, 2), None);
    }

    #[test]
    fn filled_uses_pixel_length_for_layout() {
        let rgb = PixelBuffer::filled(4, 1, &[1, 2, 3]);
        assert_eq!(rgb.channels(), Channels::Rgb);
        assert_eq!(rgb.as_bytes().len(), 12);

        let rgba = PixelBuffer::filled(4, 1, &[1, 2, 3, 4]);
        assert_eq!(rgba.channels(), Channels::Rgba);
        assert_eq!(rgba.pixel(3, 0), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    fn from_rgb_image_keeps_dimensions() {
        let img = RgbImage::from_pixel(5, 3, Rgb([10, 20, 30]));
        let buf = PixelBuffer::from(img);
        assert_eq!((buf.width(), buf.height()), (5, 3));
        assert_eq!(buf.channels(), Channels::Rgb);
        assert!(buf.clone().into_rgba_image().is_none());
    }

    #[test]
    fn zero_sized_buffer_is_valid() {
        let buf = PixelBuffer::new(0, 10, Channels::Rgb, Vec::new()).unwrap();
        assert_eq!(buf.pixels().count(), 0);
    }
}
