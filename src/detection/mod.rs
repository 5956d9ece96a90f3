//! Face region and skin detection module
//!
//! This module crops the detected face out of a photograph and segments
//! its skin pixels for white balance and color extraction.

pub mod face_region;
pub mod skin;

pub use face_region::{
    extract_face_region, extract_region_from_image, extract_square_face_region, get_padded_bounding_box,
    normalize_bounding_box, BoundingBox, DetectedFace, FaceBox, FaceRegion, Landmark, LandmarkSet,
    RegionExtractor,
};
pub use skin::{
    clean_skin_mask, detect_skin_mask, has_sufficient_skin_coverage, is_skin_pixel, mean_skin_color,
    rgb_to_ycbcr, SkinMask,
};
