//! White balance estimation and correction
//!
//! Implements diagonal (per-channel gain) white balance:
//! - Gray world: the scene mean should be neutral
//! - Von Kries: a known reference white should be neutral
//! - Skin aware: the skin mean should match a plausible skin chromaticity
//!
//! Gains operate on 8-bit sRGB values and never touch alpha.

use serde::{Deserialize, Serialize};

use crate::buffer::RawImageBuffer;
use crate::constants::awb;
use crate::detection::skin::{mean_skin_color, SkinMask};
use crate::error::{AnalysisError, Result};

/// White balance algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwbMethod {
    GrayWorld,
    VonKries,
    SkinAware,
    /// No correction
    None,
}

impl AwbMethod {
    /// Prior reliability of the method before coverage and gain plausibility
    pub fn base_confidence(self) -> f32 {
        match self {
            AwbMethod::SkinAware => awb::BASE_CONFIDENCE_SKIN_AWARE,
            AwbMethod::VonKries => awb::BASE_CONFIDENCE_VON_KRIES,
            AwbMethod::GrayWorld => awb::BASE_CONFIDENCE_GRAY_WORLD,
            AwbMethod::None => awb::BASE_CONFIDENCE_NONE,
        }
    }
}

/// Per-channel multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AwbGains {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl AwbGains {
    pub const IDENTITY: AwbGains = AwbGains::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Largest `|ln gain|`; infinite for non-positive or non-finite gains
    pub fn max_deviation(&self) -> f32 {
        self.as_array()
            .iter()
            .map(|&g| if g > 0.0 && g.is_finite() { g.ln().abs() } else { f32::INFINITY })
            .fold(0.0, f32::max)
    }

    /// Blend toward identity: `1 + strength · (g − 1)`
    pub fn with_strength(&self, strength: f32) -> AwbGains {
        let blend = |g: f32| 1.0 + strength * (g - 1.0);
        AwbGains::new(blend(self.r), blend(self.g), blend(self.b))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Every gain finite, positive and at most the default maximum
pub fn is_valid_gains(gains: &AwbGains) -> bool {
    is_valid_gains_within(gains, awb::MAX_GAIN)
}

pub fn is_valid_gains_within(gains: &AwbGains, max_gain: f32) -> bool {
    gains
        .as_array()
        .iter()
        .all(|&g| g.is_finite() && g > 0.0 && g <= max_gain)
}

/// Gains that move `measured` onto the chromaticity of `target`
///
/// The mean level of `measured` is preserved: `gain_c = mean(m) · t_c / mean(t) / m_c`.
/// Zero channels produce non-finite gains, which fail validation.
pub fn gains_from_reference(measured: [f64; 3], target: [f64; 3]) -> AwbGains {
    let measured_mean = (measured[0] + measured[1] + measured[2]) / 3.0;
    let target_mean = (target[0] + target[1] + target[2]) / 3.0;
    let gain = |c: usize| (measured_mean * target[c] / target_mean / measured[c]) as f32;
    AwbGains::new(gain(0), gain(1), gain(2))
}

/// Multiply, round and clamp every RGB channel into a new buffer
///
/// Alpha is passed through unchanged.
pub fn apply_gains(image: &RawImageBuffer, gains: &AwbGains) -> RawImageBuffer {
    let g = gains.as_array();
    image.map_rgb(|px| {
        let scale = |c: usize| (f32::from(px[c]) * g[c]).round().clamp(0.0, 255.0) as u8;
        [scale(0), scale(1), scale(2)]
    })
}

/// White balance estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalanceEstimator {
    /// Skin target for skin-aware estimation, 8-bit sRGB
    skin_reference: [f32; 3],
}

impl WhiteBalanceEstimator {
    /// Create a new estimator with the default skin reference
    pub fn new() -> Self {
        Self {
            skin_reference: awb::SKIN_REFERENCE_RGB,
        }
    }

    pub fn with_skin_reference(skin_reference: [f32; 3]) -> Self {
        Self { skin_reference }
    }

    /// Gray world estimation
    ///
    /// Assumes the average color of the scene should be neutral gray.
    pub fn estimate_gray_world(&self, image: &RawImageBuffer) -> Result<AwbGains> {
        let mean = image.mean_rgb().ok_or(AnalysisError::EmptyImage {
            width: image.width(),
            height: image.height(),
        })?;
        Ok(gains_from_reference(mean, [1.0, 1.0, 1.0]))
    }

    /// Von Kries estimation from the sRGB appearance of a white object
    pub fn estimate_von_kries(&self, reference_white: [f32; 3]) -> AwbGains {
        let white = reference_white.map(f64::from);
        gains_from_reference(white, [1.0, 1.0, 1.0])
    }

    /// Skin-aware estimation
    ///
    /// Maps the mean of the masked skin pixels onto the skin reference
    /// chromaticity while keeping the skin's mean level.
    pub fn estimate_skin_aware(&self, image: &RawImageBuffer, mask: &SkinMask) -> Result<AwbGains> {
        let skin_mean = mean_skin_color(image, mask).ok_or(AnalysisError::InsufficientSkin {
            found: mask.skin_pixel_count(),
            minimum: 1,
        })?;
        Ok(gains_from_reference(skin_mean, self.skin_reference.map(f64::from)))
    }
}

impl Default for WhiteBalanceEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkinThresholds;
    use crate::detection::skin::detect_skin_mask;

    #[test]
    fn test_gain_validation() {
        assert!(is_valid_gains(&AwbGains::IDENTITY));
        assert!(is_valid_gains(&AwbGains::new(4.0, 0.01, 1.0)));
        assert!(!is_valid_gains(&AwbGains::new(4.01, 1.0, 1.0)));
        assert!(!is_valid_gains(&AwbGains::new(0.0, 1.0, 1.0)));
        assert!(!is_valid_gains(&AwbGains::new(-1.0, 1.0, 1.0)));
        assert!(!is_valid_gains(&AwbGains::new(f32::NAN, 1.0, 1.0)));
        assert!(!is_valid_gains(&AwbGains::new(f32::INFINITY, 1.0, 1.0)));
        assert!(is_valid_gains_within(&AwbGains::new(1.5, 1.0, 1.0), 2.0));
        assert!(!is_valid_gains_within(&AwbGains::new(2.5, 1.0, 1.0), 2.0));
    }

    #[test]
    fn test_gray_world_neutral_image_is_identity() {
        let image = RawImageBuffer::filled(16, 16, [128, 128, 128]);
        let gains = WhiteBalanceEstimator::new().estimate_gray_world(&image).unwrap();
        assert!((gains.r - 1.0).abs() < 1e-6);
        assert!((gains.g - 1.0).abs() < 1e-6);
        assert!((gains.b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gray_world_removes_cast() {
        let image = RawImageBuffer::filled(8, 8, [150, 120, 90]);
        let gains = WhiteBalanceEstimator::new().estimate_gray_world(&image).unwrap();
        let corrected = apply_gains(&image, &gains);
        let px = corrected.pixel(0, 0);
        assert!(px.iter().all(|&c| (i32::from(c) - 120).abs() <= 1), "{:?}", px);
    }

    #[test]
    fn test_gray_world_black_image_is_invalid() {
        let image = RawImageBuffer::filled(4, 4, [0, 0, 0]);
        let gains = WhiteBalanceEstimator::new().estimate_gray_world(&image).unwrap();
        assert!(!is_valid_gains(&gains));
    }

    #[test]
    fn test_gray_world_empty_image_errors() {
        let image = RawImageBuffer::new(Vec::new(), 0, 0, 3).unwrap();
        assert!(WhiteBalanceEstimator::new().estimate_gray_world(&image).is_err());
    }

    #[test]
    fn test_von_kries_reference_white() {
        let gains = WhiteBalanceEstimator::new().estimate_von_kries([255.0, 204.0, 153.0]);
        assert!((gains.r * 255.0 - gains.g * 204.0).abs() < 1e-3);
        assert!((gains.g * 204.0 - gains.b * 153.0).abs() < 1e-3);
    }

    #[test]
    fn test_skin_aware_maps_to_reference() {
        let reference = [205.0, 160.0, 135.0];
        let image = RawImageBuffer::filled(10, 10, [200, 150, 120]);
        let mask = detect_skin_mask(&image, &SkinThresholds::default());
        let estimator = WhiteBalanceEstimator::with_skin_reference(reference);
        let gains = estimator.estimate_skin_aware(&image, &mask).unwrap();

        // corrected skin keeps its level and takes the reference ratios
        let corrected = [200.0 * gains.r, 150.0 * gains.g, 120.0 * gains.b];
        let ratio = corrected[0] / corrected[1];
        assert!((ratio - 205.0 / 160.0).abs() < 1e-3);
        let level: f32 = corrected.iter().sum::<f32>() / 3.0;
        assert!((level - 470.0 / 3.0).abs() < 1e-2);
    }

    #[test]
    fn test_skin_aware_without_skin_errors() {
        let image = RawImageBuffer::filled(10, 10, [128, 128, 128]);
        let mask = detect_skin_mask(&image, &SkinThresholds::default());
        let err = WhiteBalanceEstimator::new().estimate_skin_aware(&image, &mask).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientSkin { found: 0, .. }));
    }

    #[test]
    fn test_apply_gains_clamps_and_keeps_alpha() {
        let image = RawImageBuffer::new(vec![100, 200, 50, 77], 1, 1, 4).unwrap();
        let out = apply_gains(&image, &AwbGains::new(1.5, 2.0, 0.5));
        assert_eq!(out.data(), &[150, 255, 25, 77]);
        // input untouched
        assert_eq!(image.data(), &[100, 200, 50, 77]);
    }

    #[test]
    fn test_apply_identity_is_noop() {
        let image = RawImageBuffer::from_fn(5, 5, |x, y| [x as u8 * 40, y as u8 * 40, 9]);
        assert_eq!(apply_gains(&image, &AwbGains::IDENTITY), image);
    }

    #[test]
    fn test_strength_and_deviation() {
        let gains = AwbGains::new(2.0, 1.0, 0.5);
        assert_eq!(gains.with_strength(0.0), AwbGains::IDENTITY);
        assert_eq!(gains.with_strength(1.0), gains);
        assert_eq!(gains.with_strength(0.5), AwbGains::new(1.5, 1.0, 0.75));
        assert!((gains.max_deviation() - 2.0f32.ln()).abs() < 1e-6);
        assert_eq!(AwbGains::new(0.0, 1.0, 1.0).max_deviation(), f32::INFINITY);
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(serde_json::to_string(&AwbMethod::SkinAware).unwrap(), "\"skin_aware\"");
        assert_eq!(serde_json::to_string(&AwbMethod::None).unwrap(), "\"none\"");
        assert!(AwbMethod::SkinAware.base_confidence() > AwbMethod::VonKries.base_confidence());
        assert!(AwbMethod::GrayWorld.base_confidence() > AwbMethod::None.base_confidence());
    }
}
