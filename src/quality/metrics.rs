//! Individual quality measurements
//!
//! Each function measures one property of a frame against the thresholds
//! in [`QualityConfig`] and returns its assessment with user feedback.

use rayon::prelude::*;

use crate::buffer::RawImageBuffer;
use crate::calibration::illuminant::IlluminantEstimator;
use crate::config::QualityConfig;
use crate::constants::{d65, quality};
use crate::quality::{
    Chromaticity, ColorTemperatureAssessment, ColorTemperatureVerdict, ExposureAssessment, ExposureVerdict,
    ResolutionAssessment, SharpnessAssessment, SharpnessVerdict,
};

/// Variance of the 3×3 Laplacian `[0,1,0; 1,-4,1; 0,1,0]` over interior pixels
///
/// Returns 0 for frames smaller than 3×3.
pub fn laplacian_variance(luma: &[f32], width: u32, height: u32) -> f64 {
    let (w, h) = (width as usize, height as usize);
    if w < 3 || h < 3 || luma.len() < w * h {
        return 0.0;
    }

    let (sum, sum_sq) = (1..h - 1)
        .into_par_iter()
        .map(|y| {
            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            for x in 1..w - 1 {
                let idx = y * w + x;
                let laplacian = f64::from(luma[idx - w])
                    + f64::from(luma[idx + w])
                    + f64::from(luma[idx - 1])
                    + f64::from(luma[idx + 1])
                    - 4.0 * f64::from(luma[idx]);
                sum += laplacian;
                sum_sq += laplacian * laplacian;
            }
            (sum, sum_sq)
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));

    let count = ((w - 2) * (h - 2)) as f64;
    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

pub fn assess_sharpness(luma: &[f32], width: u32, height: u32, config: &QualityConfig) -> SharpnessAssessment {
    let variance = laplacian_variance(luma, width, height);
    let score = (variance / f64::from(config.sharpness_variance_per_point)).clamp(0.0, 100.0) as f32;

    let (verdict, feedback) = if score < config.sharpness_reject_below {
        (
            SharpnessVerdict::Rejected,
            "Image is too blurry; hold the camera steady and refocus",
        )
    } else if score < config.sharpness_sharp_from {
        (SharpnessVerdict::Acceptable, "Image sharpness is acceptable")
    } else {
        (SharpnessVerdict::Sharp, "Image is sharp")
    };

    SharpnessAssessment {
        score,
        laplacian_variance: variance,
        verdict,
        feedback: feedback.to_string(),
    }
}

pub fn assess_exposure(luma: &[f32], config: &QualityConfig) -> ExposureAssessment {
    if luma.is_empty() {
        return ExposureAssessment {
            mean_brightness: 0.0,
            contrast: 0.0,
            verdict: ExposureVerdict::Underexposed,
            is_extreme: true,
            clipped_shadows: 0.0,
            clipped_highlights: 0.0,
            confidence: 0.4,
            feedback: "Image has no pixels".to_string(),
        };
    }

    let n = luma.len() as f64;
    let (sum, sum_sq, shadows, highlights) = luma
        .par_iter()
        .fold(
            || (0.0f64, 0.0f64, 0usize, 0usize),
            |(s, sq, lo, hi), &y| {
                let v = f64::from(y);
                (
                    s + v,
                    sq + v * v,
                    lo + usize::from(y <= f32::from(quality::SHADOW_CLIP_LEVEL)),
                    hi + usize::from(y >= f32::from(quality::HIGHLIGHT_CLIP_LEVEL)),
                )
            },
        )
        .reduce(
            || (0.0, 0.0, 0, 0),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
        );

    let mean = sum / n;
    let std_dev = (sum_sq / n - mean * mean).max(0.0).sqrt();
    let mean = mean as f32;
    let contrast = std_dev as f32;
    let clipped_shadows = (shadows as f64 / n) as f32;
    let clipped_highlights = (highlights as f64 / n) as f32;

    let verdict = if mean < config.underexposed_mean {
        ExposureVerdict::Underexposed
    } else if mean > config.overexposed_mean {
        ExposureVerdict::Overexposed
    } else {
        ExposureVerdict::Normal
    };
    let is_extreme = mean < config.extreme_dark_mean
        || mean > config.extreme_bright_mean
        || clipped_shadows + clipped_highlights > config.extreme_clip_ratio;

    let feedback = match (verdict, is_extreme) {
        (ExposureVerdict::Underexposed, true) => "Image is far too dark; move to brighter light",
        (ExposureVerdict::Overexposed, true) => "Image is far too bright; avoid direct light",
        (_, true) => "Too much of the image is clipped; use even lighting",
        (ExposureVerdict::Underexposed, false) => "Image is slightly dark",
        (ExposureVerdict::Overexposed, false) => "Image is slightly bright",
        (ExposureVerdict::Normal, false) => "Exposure is good",
    };

    ExposureAssessment {
        mean_brightness: mean,
        contrast,
        verdict,
        is_extreme,
        clipped_shadows,
        clipped_highlights,
        confidence: (0.4 + contrast / 64.0).clamp(0.4, 1.0),
        feedback: feedback.to_string(),
    }
}

pub fn assess_resolution(width: u32, height: u32, config: &QualityConfig) -> ResolutionAssessment {
    let valid = width >= config.min_width && height >= config.min_height;
    let feedback = if valid {
        "Resolution is sufficient".to_string()
    } else {
        format!(
            "Resolution {}x{} is below the minimum {}x{}",
            width, height, config.min_width, config.min_height
        )
    };
    ResolutionAssessment {
        width,
        height,
        min_width: config.min_width,
        min_height: config.min_height,
        valid,
        feedback,
    }
}

/// Correlated color temperature of the frame mean
pub fn assess_color_temperature(image: &RawImageBuffer, config: &QualityConfig) -> ColorTemperatureAssessment {
    let illuminant = image
        .mean_rgb()
        .and_then(IlluminantEstimator::estimate_from_rgb)
        .unwrap_or_else(IlluminantEstimator::d65);
    let kelvin = illuminant.cct_kelvin;

    let (verdict, feedback) = if kelvin < config.warm_below_kelvin {
        (ColorTemperatureVerdict::Warm, "Lighting is warm; skin may look more yellow")
    } else if kelvin > config.cool_above_kelvin {
        (ColorTemperatureVerdict::Cool, "Lighting is cool; skin may look more blue")
    } else if IlluminantEstimator::is_close_to_d65(&illuminant) {
        (ColorTemperatureVerdict::Neutral, "Lighting matches daylight")
    } else {
        (ColorTemperatureVerdict::Neutral, "Lighting is neutral")
    };

    ColorTemperatureAssessment {
        kelvin,
        chromaticity: Chromaticity {
            x: illuminant.chromaticity.0,
            y: illuminant.chromaticity.1,
        },
        verdict,
        feedback: feedback.to_string(),
    }
}

/// 100 at mid-gray, 0 at black or white
pub fn exposure_score(mean_brightness: f32) -> f32 {
    (100.0 - (mean_brightness - 128.0).abs() / 128.0 * 100.0).clamp(0.0, 100.0)
}

/// 100 at the minimum resolution or above, proportional to area below it
pub fn resolution_score(resolution: &ResolutionAssessment) -> f32 {
    if resolution.valid {
        return 100.0;
    }
    let required = f64::from(resolution.min_width) * f64::from(resolution.min_height);
    if required <= 0.0 {
        return 100.0;
    }
    let actual = f64::from(resolution.width) * f64::from(resolution.height);
    (actual / required * 100.0).clamp(0.0, 100.0) as f32
}

/// 100 at 6500 K, losing a point every 50 K
pub fn color_temperature_score(kelvin: f32) -> f32 {
    (100.0 - (kelvin - d65::NOMINAL_KELVIN).abs() / 50.0).clamp(0.0, 100.0)
}

/// Weighted combination with sharpness weighted highest
pub fn overall_score(sharpness: f32, exposure: f32, resolution: f32, color_temperature: f32) -> f32 {
    quality::WEIGHT_SHARPNESS * sharpness
        + quality::WEIGHT_EXPOSURE * exposure
        + quality::WEIGHT_RESOLUTION * resolution
        + quality::WEIGHT_COLOR_TEMPERATURE * color_temperature
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32, a: u8, b: u8) -> Vec<f32> {
        (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if (x + y) % 2 == 0 {
                    f32::from(a)
                } else {
                    f32::from(b)
                }
            })
            .collect()
    }

    #[test]
    fn test_laplacian_uniform_is_zero() {
        let luma = vec![128.0; 100 * 100];
        assert_eq!(laplacian_variance(&luma, 100, 100), 0.0);
    }

    #[test]
    fn test_laplacian_checkerboard_is_high() {
        let luma = checkerboard(100, 0, 255);
        assert!(laplacian_variance(&luma, 100, 100) > 1000.0);
    }

    #[test]
    fn test_laplacian_tiny_frame() {
        assert_eq!(laplacian_variance(&[1.0, 2.0, 3.0, 4.0], 2, 2), 0.0);
    }

    #[test]
    fn test_sharpness_bands() {
        let config = QualityConfig::default();
        let blurry = assess_sharpness(&vec![100.0; 400], 20, 20, &config);
        assert_eq!(blurry.verdict, SharpnessVerdict::Rejected);
        assert_eq!(blurry.score, 0.0);

        let sharp = assess_sharpness(&checkerboard(20, 0, 255), 20, 20, &config);
        assert_eq!(sharp.verdict, SharpnessVerdict::Sharp);
        assert_eq!(sharp.score, 100.0);

        // amplitude 4 → laplacian ±16 → variance 256 → score 51.2
        let mid = assess_sharpness(&checkerboard(20, 100, 104), 20, 20, &config);
        assert_eq!(mid.verdict, SharpnessVerdict::Acceptable);
    }

    #[test]
    fn test_exposure_verdicts() {
        let config = QualityConfig::default();
        assert_eq!(assess_exposure(&[128.0; 64], &config).verdict, ExposureVerdict::Normal);
        assert_eq!(assess_exposure(&[40.0; 64], &config).verdict, ExposureVerdict::Underexposed);
        assert_eq!(assess_exposure(&[215.0; 64], &config).verdict, ExposureVerdict::Overexposed);

        let dark = assess_exposure(&[5.0; 64], &config);
        assert!(dark.is_extreme);
        assert_eq!(dark.clipped_shadows, 1.0);

        assert!(!assess_exposure(&[40.0; 64], &config).is_extreme);
    }

    #[test]
    fn test_exposure_clipping_makes_extreme() {
        let config = QualityConfig::default();
        // mean is mid-range but every pixel is clipped
        let luma: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.0 } else { 255.0 }).collect();
        let exposure = assess_exposure(&luma, &config);
        assert_eq!(exposure.verdict, ExposureVerdict::Normal);
        assert!(exposure.is_extreme);
    }

    #[test]
    fn test_exposure_confidence_tracks_contrast() {
        let config = QualityConfig::default();
        let flat = assess_exposure(&[128.0; 64], &config);
        assert_eq!(flat.confidence, 0.4);

        let luma: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 64.0 } else { 192.0 }).collect();
        let textured = assess_exposure(&luma, &config);
        assert_eq!(textured.confidence, 1.0);
    }

    #[test]
    fn test_resolution() {
        let config = QualityConfig::default();
        assert!(assess_resolution(200, 200, &config).valid);
        let small = assess_resolution(199, 400, &config);
        assert!(!small.valid);
        assert!(small.feedback.contains("199x400"));
        assert!(resolution_score(&small) < 100.0);
    }

    #[test]
    fn test_color_temperature_verdicts() {
        let config = QualityConfig::default();
        let neutral = assess_color_temperature(&RawImageBuffer::filled(8, 8, [200, 200, 200]), &config);
        assert_eq!(neutral.verdict, ColorTemperatureVerdict::Neutral);
        assert!((neutral.kelvin - 6504.0).abs() < 50.0);

        let warm = assess_color_temperature(&RawImageBuffer::filled(8, 8, [255, 200, 150]), &config);
        assert_eq!(warm.verdict, ColorTemperatureVerdict::Warm);

        let cool = assess_color_temperature(&RawImageBuffer::filled(8, 8, [170, 200, 255]), &config);
        assert_eq!(cool.verdict, ColorTemperatureVerdict::Cool);

        let black = assess_color_temperature(&RawImageBuffer::filled(8, 8, [0, 0, 0]), &config);
        assert_eq!(black.kelvin, d65::CCT_KELVIN);
        assert_eq!(black.chromaticity.x, d65::CHROMATICITY_X);
    }

    #[test]
    fn test_neutral_feedback_distinguishes_daylight() {
        let config = QualityConfig::default();
        let daylight = assess_color_temperature(&RawImageBuffer::filled(8, 8, [200, 200, 200]), &config);
        assert_eq!(daylight.feedback, "Lighting matches daylight");

        // widen the neutral band so warm indoor light counts as neutral
        let wide = QualityConfig {
            warm_below_kelvin: 3000.0,
            ..QualityConfig::default()
        };
        let indoor = assess_color_temperature(&RawImageBuffer::filled(8, 8, [255, 200, 150]), &wide);
        assert_eq!(indoor.verdict, ColorTemperatureVerdict::Neutral);
        assert_eq!(indoor.feedback, "Lighting is neutral");
    }

    #[test]
    fn test_scores() {
        assert_eq!(exposure_score(128.0), 100.0);
        assert_eq!(exposure_score(0.0), 0.0);
        assert_eq!(color_temperature_score(6500.0), 100.0);
        assert_eq!(color_temperature_score(4000.0), 50.0);
        assert!((overall_score(100.0, 100.0, 100.0, 100.0) - 100.0).abs() < 1e-4);
    }
}
