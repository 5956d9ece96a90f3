//! Owned interleaved pixel buffers
//!
//! [`RawImageBuffer`] is the single image type flowing between pipeline
//! stages. It is immutable once built; stages that transform pixels allocate
//! a new buffer.

use rayon::prelude::*;

use crate::error::{AnalysisError, Result};

/// Interleaved 8-bit RGB or RGBA pixels with their dimensions
///
/// Invariant: `data.len() == width * height * channels`. Zero-size buffers are
/// allowed so that stages can report them as unanalyzable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImageBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl RawImageBuffer {
    /// Wrap pixel data, checking channel count and length
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        if channels != 3 && channels != 4 {
            return Err(AnalysisError::invalid_parameter("channels", channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(AnalysisError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Uniform RGB image
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
            channels: 3,
        }
    }

    /// RGB image whose pixel at `(x, y)` is `f(x, y)`
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            data,
            width,
            height,
            channels: 3,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// RGB of the pixel at `(x, y)`; alpha is ignored
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * self.channels as usize;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Iterate pixels in row-major order as RGB triples
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data
            .chunks_exact(self.channels as usize)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// BT.601 luma per pixel, row-major
    pub fn luminance(&self) -> Vec<f32> {
        self.data
            .par_chunks_exact(self.channels as usize)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }

    /// Mean of each RGB channel over the whole frame, `None` when empty
    pub fn mean_rgb(&self) -> Option<[f64; 3]> {
        if self.is_empty() {
            return None;
        }
        let sum = self
            .data
            .par_chunks_exact(self.channels as usize)
            .fold(
                || [0.0f64; 3],
                |mut acc, px| {
                    acc[0] += f64::from(px[0]);
                    acc[1] += f64::from(px[1]);
                    acc[2] += f64::from(px[2]);
                    acc
                },
            )
            .reduce(|| [0.0f64; 3], |a, b| [a[0] + b[0], a[1] + b[1], a[2] + b[2]]);
        let n = self.pixel_count() as f64;
        Some([sum[0] / n, sum[1] / n, sum[2] / n])
    }

    /// New buffer with `f` applied to every pixel's RGB in parallel; alpha is kept
    pub fn map_rgb<F>(&self, f: F) -> RawImageBuffer
    where
        F: Fn([u8; 3]) -> [u8; 3] + Send + Sync,
    {
        let mut data = self.data.clone();
        data.par_chunks_exact_mut(self.channels as usize).for_each(|px| {
            let [r, g, b] = f([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        });
        Self {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Consume the buffer and return the raw bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl From<image::RgbImage> for RawImageBuffer {
    fn from(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            channels: 3,
        }
    }
}

impl From<image::RgbaImage> for RawImageBuffer {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            channels: 4,
        }
    }
}

/// ITU-R BT.601 luma of an 8-bit RGB triple
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}
