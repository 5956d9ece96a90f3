//! Face region extraction
//!
//! Turns a detector's floating-point face box into a pixel-exact crop:
//! - Normalizes the box (floor the corner, ceil the far edge, clamp)
//! - Applies proportional padding per axis and re-clamps
//! - Optionally squares the box around its center
//! - Copies the sub-buffer and remaps landmarks into its coordinate frame

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::RawImageBuffer;
use crate::config::RegionConfig;
use crate::{AnalysisError, Result};

/// Face box as reported by a detector, in image pixels
///
/// May be fractional, negative, or extend past the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Integer box inside image bounds, at least 1×1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A detector landmark; `z` is present for 3D meshes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }

    /// Shift in the image plane; depth is untouched
    pub fn translate(&self, dx: f32, dy: f32) -> Landmark {
        Landmark {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }
}

/// Ordered landmark points with the detector's confidence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub points: Vec<Landmark>,
    pub confidence: f32,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>, confidence: f32) -> Self {
        Self { points, confidence }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> LandmarkSet {
        LandmarkSet {
            points: self.points.iter().map(|p| p.translate(dx, dy)).collect(),
            confidence: self.confidence,
        }
    }

    /// Re-express every point relative to the top-left corner of `bbox`
    pub fn relative_to(&self, bbox: &BoundingBox) -> LandmarkSet {
        self.translate(-(bbox.x as f32), -(bbox.y as f32))
    }
}

/// External detector output consumed by the region extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub bounding_box: FaceBox,
    #[serde(default)]
    pub landmarks: LandmarkSet,
    pub confidence: f32,
}

impl DetectedFace {
    pub fn new(bounding_box: FaceBox, landmarks: LandmarkSet, confidence: f32) -> Self {
        Self {
            bounding_box,
            landmarks,
            confidence,
        }
    }

    /// A face covering the whole frame, for callers without a detector
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(
            FaceBox::new(0.0, 0.0, width as f32, height as f32),
            LandmarkSet::default(),
            1.0,
        )
    }
}

/// Cropped face pixels with landmarks in the crop's frame
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRegion {
    #[serde(skip)]
    pub image_data: RawImageBuffer,
    pub bounding_box: BoundingBox,
    pub landmarks: LandmarkSet,
    /// Milliseconds
    pub processing_time: f64,
}

/// Clamp `[start, end)` into `[0, limit)` keeping at least one pixel
///
/// Returns `(offset, length)`.
fn clamp_span(start: i64, end: i64, limit: u32) -> (u32, u32) {
    let limit = i64::from(limit.max(1));
    let begin = start.clamp(0, limit - 1);
    let end = end.clamp(begin + 1, limit);
    (begin as u32, (end - begin) as u32)
}

/// Convert a detector box to integer image coordinates
///
/// Floors the top-left corner and ceils the far edge so fractional edges are
/// kept, then clamps to `[0, width) × [0, height)`. Non-finite input saturates.
pub fn normalize_bounding_box(face: &FaceBox, image_width: u32, image_height: u32) -> BoundingBox {
    let x0 = face.x.floor() as i64;
    let y0 = face.y.floor() as i64;
    let x1 = (face.x + face.width).ceil() as i64;
    let y1 = (face.y + face.height).ceil() as i64;

    let (x, width) = clamp_span(x0, x1, image_width);
    let (y, height) = clamp_span(y0, y1, image_height);
    BoundingBox::new(x, y, width, height)
}

/// Grow a box by `padding_ratio` of its size on every side, then re-clamp
///
/// Negative or non-finite ratios are treated as 0.
pub fn get_padded_bounding_box(
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
    padding_ratio: f32,
) -> BoundingBox {
    let ratio = if padding_ratio.is_finite() && padding_ratio > 0.0 {
        padding_ratio
    } else {
        0.0
    };
    let pad_x = (bbox.width as f32 * ratio).round() as i64;
    let pad_y = (bbox.height as f32 * ratio).round() as i64;

    let (x, width) = clamp_span(
        i64::from(bbox.x) - pad_x,
        i64::from(bbox.right()) + pad_x,
        image_width,
    );
    let (y, height) = clamp_span(
        i64::from(bbox.y) - pad_y,
        i64::from(bbox.bottom()) + pad_y,
        image_height,
    );
    BoundingBox::new(x, y, width, height)
}

/// Square box with side `max(width, height)` centered on `bbox`, clamped
pub fn square_bounding_box(bbox: &BoundingBox, image_width: u32, image_height: u32) -> BoundingBox {
    let side = i64::from(bbox.width.max(bbox.height));
    let (cx, cy) = bbox.center();
    let x0 = (cx - side as f32 / 2.0).round() as i64;
    let y0 = (cy - side as f32 / 2.0).round() as i64;

    let (x, width) = clamp_span(x0, x0 + side, image_width);
    let (y, height) = clamp_span(y0, y0 + side, image_height);
    BoundingBox::new(x, y, width, height)
}

/// Copy the pixels under `bbox` into a tightly sized buffer
///
/// # Errors
///
/// Returns `AnalysisError::EmptyImage` for a zero-size source, and
/// `InvalidParameter` when the box is not inside the image.
pub fn extract_region_from_image(image: &RawImageBuffer, bbox: &BoundingBox) -> Result<RawImageBuffer> {
    if image.is_empty() {
        return Err(AnalysisError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }
    if bbox.width == 0 || bbox.height == 0 || bbox.right() > image.width() || bbox.bottom() > image.height() {
        return Err(AnalysisError::invalid_parameter(
            "bounding_box",
            format!("{:?} outside {}x{}", bbox, image.width(), image.height()),
        ));
    }

    let channels = image.channels() as usize;
    let src_stride = image.width() as usize * channels;
    let row_len = bbox.width as usize * channels;
    let mut data = Vec::with_capacity(row_len * bbox.height as usize);

    for row in bbox.y..bbox.bottom() {
        let start = row as usize * src_stride + bbox.x as usize * channels;
        data.extend_from_slice(&image.data()[start..start + row_len]);
    }

    RawImageBuffer::new(data, bbox.width, bbox.height, image.channels())
}

/// Extract the padded face region with landmarks in its frame
pub fn extract_face_region(image: &RawImageBuffer, face: &DetectedFace, padding_ratio: f32) -> Result<FaceRegion> {
    let start = Instant::now();
    let normalized = normalize_bounding_box(&face.bounding_box, image.width(), image.height());
    let padded = get_padded_bounding_box(&normalized, image.width(), image.height(), padding_ratio);
    build_region(image, face, padded, start)
}

/// Extract a square face region (side = max of width and height), padded
pub fn extract_square_face_region(
    image: &RawImageBuffer,
    face: &DetectedFace,
    padding_ratio: f32,
) -> Result<FaceRegion> {
    let start = Instant::now();
    let normalized = normalize_bounding_box(&face.bounding_box, image.width(), image.height());
    let square = square_bounding_box(&normalized, image.width(), image.height());
    let padded = get_padded_bounding_box(&square, image.width(), image.height(), padding_ratio);
    build_region(image, face, padded, start)
}

fn build_region(image: &RawImageBuffer, face: &DetectedFace, bbox: BoundingBox, start: Instant) -> Result<FaceRegion> {
    let image_data = extract_region_from_image(image, &bbox)?;
    let landmarks = face.landmarks.relative_to(&bbox);
    let processing_time = start.elapsed().as_secs_f64() * 1000.0;

    debug!(
        x = bbox.x,
        y = bbox.y,
        width = bbox.width,
        height = bbox.height,
        landmarks = landmarks.points.len(),
        "extracted face region"
    );

    Ok(FaceRegion {
        image_data,
        bounding_box: bbox,
        landmarks,
        processing_time,
    })
}

/// Region extraction with a fixed padding and crop shape
#[derive(Debug, Clone, PartialEq)]
pub struct RegionExtractor {
    padding_ratio: f32,
    square: bool,
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(&RegionConfig::default())
    }
}

impl RegionExtractor {
    pub fn new(config: &RegionConfig) -> Self {
        Self {
            padding_ratio: config.padding_ratio,
            square: config.square,
        }
    }

    pub fn extract(&self, image: &RawImageBuffer, face: &DetectedFace) -> Result<FaceRegion> {
        if self.square {
            extract_square_face_region(image, face, self.padding_ratio)
        } else {
            extract_face_region(image, face, self.padding_ratio)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, y: f32, w: f32, h: f32) -> DetectedFace {
        DetectedFace::new(
            FaceBox::new(x, y, w, h),
            LandmarkSet::new(vec![Landmark::new(x + 10.0, y + 10.0)], 0.95),
            0.9,
        )
    }

    #[test]
    fn test_normalize_floors_and_ceils() {
        let b = normalize_bounding_box(&FaceBox::new(10.6, 20.2, 30.1, 40.0), 640, 480);
        assert_eq!(b, BoundingBox::new(10, 20, 31, 41));
    }

    #[test]
    fn test_normalize_clamps_out_of_range() {
        let b = normalize_bounding_box(&FaceBox::new(-50.0, -10.0, 100.0, 1000.0), 64, 48);
        assert_eq!(b, BoundingBox::new(0, 0, 50, 48));

        let b = normalize_bounding_box(&FaceBox::new(700.0, 500.0, 10.0, 10.0), 640, 480);
        assert!(b.right() <= 640 && b.bottom() <= 480);
        assert!(b.width >= 1 && b.height >= 1);
    }

    #[test]
    fn test_normalize_degenerate_input() {
        for fb in [
            FaceBox::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN),
            FaceBox::new(f32::INFINITY, 0.0, f32::INFINITY, -5.0),
            FaceBox::new(5.0, 5.0, 0.0, -3.0),
        ] {
            let b = normalize_bounding_box(&fb, 32, 32);
            assert!(b.right() <= 32 && b.bottom() <= 32, "{:?} -> {:?}", fb, b);
            assert!(b.width >= 1 && b.height >= 1);
        }
    }

    #[test]
    fn test_padding_identity_and_known_value() {
        let b = BoundingBox::new(100, 100, 100, 100);
        assert_eq!(get_padded_bounding_box(&b, 640, 480, 0.0), b);
        assert_eq!(
            get_padded_bounding_box(&b, 640, 480, 0.2),
            BoundingBox::new(80, 80, 140, 140)
        );
        assert_eq!(get_padded_bounding_box(&b, 640, 480, -1.0), b);
        assert_eq!(get_padded_bounding_box(&b, 640, 480, f32::NAN), b);
    }

    #[test]
    fn test_padding_clamps_at_edges() {
        let b = BoundingBox::new(0, 0, 50, 50);
        let p = get_padded_bounding_box(&b, 60, 60, 0.5);
        assert_eq!(p, BoundingBox::new(0, 0, 60, 60));
    }

    #[test]
    fn test_square_box_is_centered() {
        let b = BoundingBox::new(100, 100, 40, 80);
        let s = square_bounding_box(&b, 640, 480);
        assert_eq!(s, BoundingBox::new(80, 100, 80, 80));
        assert_eq!(s.center(), b.center());
    }

    #[test]
    fn test_extract_region_copies_pixels() {
        let image = RawImageBuffer::from_fn(8, 6, |x, y| [x as u8, y as u8, 7]);
        let region = extract_region_from_image(&image, &BoundingBox::new(2, 3, 3, 2)).unwrap();
        assert_eq!((region.width(), region.height()), (3, 2));
        assert_eq!(region.pixel(0, 0), [2, 3, 7]);
        assert_eq!(region.pixel(2, 1), [4, 4, 7]);
    }

    #[test]
    fn test_extract_region_single_pixel_and_full_frame() {
        let image = RawImageBuffer::from_fn(5, 5, |x, y| [x as u8, y as u8, 0]);
        let one = extract_region_from_image(&image, &BoundingBox::new(4, 4, 1, 1)).unwrap();
        assert_eq!(one.data(), &[4, 4, 0]);

        let full = extract_region_from_image(&image, &BoundingBox::new(0, 0, 5, 5)).unwrap();
        assert_eq!(full.data(), image.data());
    }

    #[test]
    fn test_extract_region_empty_image() {
        let empty = RawImageBuffer::new(Vec::new(), 0, 0, 3).unwrap();
        let err = extract_region_from_image(&empty, &BoundingBox::new(0, 0, 1, 1)).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyImage { .. }));
    }

    #[test]
    fn test_extract_face_region_remaps_landmarks() {
        let image = RawImageBuffer::filled(640, 480, [200, 150, 120]);
        let region = extract_face_region(&image, &face(100.0, 100.0, 100.0, 100.0), 0.2).unwrap();

        assert_eq!(region.bounding_box, BoundingBox::new(80, 80, 140, 140));
        assert_eq!(region.image_data.width(), 140);
        assert_eq!(region.landmarks.points[0], Landmark::new(30.0, 30.0));
        assert_eq!(region.landmarks.confidence, 0.95);
    }

    #[test]
    fn test_landmark_translate_keeps_depth() {
        let p = Landmark {
            x: 5.0,
            y: 6.0,
            z: Some(-1.5),
        };
        assert_eq!(
            p.translate(-5.0, 4.0),
            Landmark {
                x: 0.0,
                y: 10.0,
                z: Some(-1.5)
            }
        );
    }

    #[test]
    fn test_region_extractor_square_mode() {
        let image = RawImageBuffer::filled(320, 240, [10, 20, 30]);
        let extractor = RegionExtractor::new(&RegionConfig {
            padding_ratio: 0.0,
            square: true,
        });
        let region = extractor.extract(&image, &face(100.0, 60.0, 40.0, 80.0)).unwrap();
        assert_eq!(region.bounding_box.width, region.bounding_box.height);
    }

    #[test]
    fn test_face_region_serialization_skips_pixels() {
        let image = RawImageBuffer::filled(50, 50, [10, 20, 30]);
        let region = extract_face_region(&image, &face(10.0, 10.0, 20.0, 20.0), 0.0).unwrap();
        let json = serde_json::to_value(&region).unwrap();
        assert!(json.get("imageData").is_none());
        assert_eq!(json["boundingBox"]["width"], 20);
        assert!(json.get("processingTime").is_some());
    }
}
