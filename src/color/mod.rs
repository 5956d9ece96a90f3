//! Color math and analysis module
//!
//! This module handles color space conversions, perceptual color
//! differences, and robust extraction of a representative skin color.

pub mod analysis;
pub mod conversion;
pub mod difference;
pub mod lab;

pub use analysis::{SkinColorAnalyzer, SkinColorSample};
pub use conversion::{hex_to_lab, hex_to_rgb, lab_to_hex, lab_to_rgb, rgb_to_hex, rgb_to_lab};
pub use difference::{ciede2000, lab_distance, DistanceMetric};
pub use lab::{LabColor, LabDelta, SkinBrightness};
