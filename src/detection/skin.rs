//! Skin pixel segmentation in YCbCr space
//!
//! Implements skin detection that:
//! - Converts sRGB to full-range BT.601 YCbCr
//! - Classifies pixels by a chroma box (`Cb`, `Cr`), independent of luma
//! - Refines the binary mask with 3×3 opening then closing
//! - Reports coverage for downstream white balance decisions

use rayon::prelude::*;
use tracing::debug;

use crate::buffer::RawImageBuffer;
use crate::config::SkinThresholds;
use crate::constants::skin;

/// Morphological kernel radius (3×3 square)
const MORPH_RADIUS: i64 = 1;

/// Binary skin mask, one byte per pixel (0 or 255)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinMask {
    data: Vec<u8>,
    width: u32,
    height: u32,
    skin_pixel_count: usize,
}

impl SkinMask {
    /// Build a mask from raw bytes, normalizing every non-zero byte to 255
    ///
    /// Returns `None` when the byte count does not match `width × height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        let data: Vec<u8> = data
            .into_iter()
            .map(|v| if v > 0 { skin::MASK_ON } else { 0 })
            .collect();
        Some(Self::from_normalized(width, height, data))
    }

    fn from_normalized(width: u32, height: u32, data: Vec<u8>) -> Self {
        let skin_pixel_count = data.par_iter().filter(|&&v| v == skin::MASK_ON).count();
        Self {
            data,
            width,
            height,
            skin_pixel_count,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn skin_pixel_count(&self) -> usize {
        self.skin_pixel_count
    }

    /// Fraction of pixels marked as skin, 0 for an empty mask
    pub fn skin_ratio(&self) -> f32 {
        if self.data.is_empty() {
            0.0
        } else {
            self.skin_pixel_count as f32 / self.data.len() as f32
        }
    }

    pub fn is_skin(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.data[y as usize * self.width as usize + x as usize] == skin::MASK_ON
    }
}

/// Full-range BT.601 conversion, returns `[Y, Cb, Cr]`
pub fn rgb_to_ycbcr(rgb: [u8; 3]) -> [f32; 3] {
    let r = f32::from(rgb[0]);
    let g = f32::from(rgb[1]);
    let b = f32::from(rgb[2]);
    [
        0.299 * r + 0.587 * g + 0.114 * b,
        128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b,
        128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b,
    ]
}

impl SkinThresholds {
    /// Whether a YCbCr triple falls inside the chroma box (bounds inclusive)
    pub fn contains(&self, ycbcr: [f32; 3]) -> bool {
        let [_, cb, cr] = ycbcr;
        (self.cb_min..=self.cb_max).contains(&cb) && (self.cr_min..=self.cr_max).contains(&cr)
    }

    pub fn is_skin(&self, rgb: [u8; 3]) -> bool {
        self.contains(rgb_to_ycbcr(rgb))
    }
}

/// Skin test with the default `Cb ∈ [77, 127]`, `Cr ∈ [133, 173]` box
pub fn is_skin_pixel(rgb: [u8; 3]) -> bool {
    SkinThresholds::default().is_skin(rgb)
}

/// Classify every pixel of `image`
pub fn detect_skin_mask(image: &RawImageBuffer, thresholds: &SkinThresholds) -> SkinMask {
    let data: Vec<u8> = image
        .data()
        .par_chunks_exact(image.channels() as usize)
        .map(|px| {
            if thresholds.is_skin([px[0], px[1], px[2]]) {
                skin::MASK_ON
            } else {
                0
            }
        })
        .collect();

    let mask = SkinMask::from_normalized(image.width(), image.height(), data);
    debug!(
        width = mask.width,
        height = mask.height,
        skin_pixels = mask.skin_pixel_count,
        ratio = mask.skin_ratio(),
        "skin mask detected"
    );
    mask
}

/// Morphological opening then closing with a 3×3 kernel
///
/// Removes isolated skin speckles and fills small holes. Only in-bounds
/// neighbors participate; dimensions are unchanged.
pub fn clean_skin_mask(mask: &SkinMask) -> SkinMask {
    if mask.width == 0 || mask.height == 0 {
        return mask.clone();
    }

    let opened = dilate(&erode(&mask.data, mask.width, mask.height), mask.width, mask.height);
    let closed = erode(&dilate(&opened, mask.width, mask.height), mask.width, mask.height);

    SkinMask::from_normalized(mask.width, mask.height, closed)
}

/// Whether the mask covers at least `min_ratio` of the frame
pub fn has_sufficient_skin_coverage(mask: &SkinMask, min_ratio: f32) -> bool {
    mask.skin_pixel_count > 0 && mask.skin_ratio() >= min_ratio
}

/// Per-channel mean RGB over skin pixels, `None` without skin
pub fn mean_skin_color(image: &RawImageBuffer, mask: &SkinMask) -> Option<[f64; 3]> {
    if mask.skin_pixel_count == 0 || mask.data.len() != image.pixel_count() {
        return None;
    }

    let sum = image
        .data()
        .par_chunks_exact(image.channels() as usize)
        .zip(mask.data.par_iter())
        .filter(|(_, m)| **m == skin::MASK_ON)
        .fold(
            || [0.0f64; 3],
            |mut acc, (px, _)| {
                acc[0] += f64::from(px[0]);
                acc[1] += f64::from(px[1]);
                acc[2] += f64::from(px[2]);
                acc
            },
        )
        .reduce(|| [0.0f64; 3], |a, b| [a[0] + b[0], a[1] + b[1], a[2] + b[2]]);

    let n = mask.skin_pixel_count as f64;
    Some([sum[0] / n, sum[1] / n, sum[2] / n])
}

fn erode(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    morph(data, width, height, true)
}

fn dilate(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    morph(data, width, height, false)
}

/// Erosion keeps a pixel when all in-bounds neighbors are on; dilation sets it
/// when any is
fn morph(data: &[u8], width: u32, height: u32, erode: bool) -> Vec<u8> {
    let (w, h) = (i64::from(width), i64::from(height));
    let mut out = vec![0u8; data.len()];

    out.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for (x, value) in row.iter_mut().enumerate() {
                let x = x as i64;
                let mut neighbors = (-MORPH_RADIUS..=MORPH_RADIUS)
                    .flat_map(|dy| (-MORPH_RADIUS..=MORPH_RADIUS).map(move |dx| (x + dx, y + dy)))
                    .filter(|&(nx, ny)| nx >= 0 && ny >= 0 && nx < w && ny < h)
                    .map(|(nx, ny)| data[(ny * w + nx) as usize] == skin::MASK_ON);
                let on = if erode {
                    neighbors.all(|v| v)
                } else {
                    neighbors.any(|v| v)
                };
                *value = if on { skin::MASK_ON } else { 0 };
            }
        });

    out
}
