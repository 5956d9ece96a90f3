//! Capture quality assessment module
//!
//! This module decides whether a photograph is good enough for skin tone
//! analysis by measuring sharpness, exposure, resolution and color
//! temperature, and combining them into a single report.

pub mod gate;
pub mod metrics;

use serde::Serialize;

use crate::constants::{d65, fallback, quality};
use crate::error::DegradedReason;

pub use gate::QualityGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SharpnessVerdict {
    Sharp,
    Acceptable,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureVerdict {
    Underexposed,
    Normal,
    Overexposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTemperatureVerdict {
    Warm,
    Neutral,
    Cool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharpnessAssessment {
    /// 0-100
    pub score: f32,
    pub laplacian_variance: f64,
    pub verdict: SharpnessVerdict,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureAssessment {
    /// Mean BT.601 luminance, 0-255
    pub mean_brightness: f32,
    /// Luminance standard deviation
    pub contrast: f32,
    pub verdict: ExposureVerdict,
    /// Too dark, too bright or too clipped to analyze
    pub is_extreme: bool,
    /// Fraction of pixels at or below the shadow clip level
    pub clipped_shadows: f32,
    /// Fraction of pixels at or above the highlight clip level
    pub clipped_highlights: f32,
    /// How informative the mean is; low for flat frames
    pub confidence: f32,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAssessment {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub valid: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Chromaticity {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTemperatureAssessment {
    pub kelvin: f32,
    pub chromaticity: Chromaticity,
    pub verdict: ColorTemperatureVerdict,
    pub feedback: String,
}

/// Quality gate output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub is_acceptable: bool,
    /// Weighted 0-100 score
    pub overall_score: f32,
    /// Measurement reliability, 0-1
    pub confidence: f32,
    pub primary_issue: Option<String>,
    pub sharpness: SharpnessAssessment,
    pub exposure: ExposureAssessment,
    pub resolution: ResolutionAssessment,
    pub color_temperature: ColorTemperatureAssessment,
    /// Milliseconds
    pub processing_time: f64,
    pub degraded: Option<DegradedReason>,
}

impl QualityReport {
    /// Optimistic report used when measurement failed internally
    ///
    /// Sharpness is acceptable at 70, exposure normal at mean 128 and color
    /// temperature neutral at 6500 K. Only the resolution, which needs no
    /// pixel access, is real.
    pub fn fallback(resolution: ResolutionAssessment, reason: DegradedReason) -> Self {
        let sharpness = SharpnessAssessment {
            score: 70.0,
            laplacian_variance: 70.0 * f64::from(quality::SHARPNESS_VARIANCE_PER_POINT),
            verdict: SharpnessVerdict::Acceptable,
            feedback: "Sharpness could not be measured".to_string(),
        };
        let exposure = ExposureAssessment {
            mean_brightness: 128.0,
            contrast: 0.0,
            verdict: ExposureVerdict::Normal,
            is_extreme: false,
            clipped_shadows: 0.0,
            clipped_highlights: 0.0,
            confidence: fallback::STAGE_CONFIDENCE,
            feedback: "Exposure could not be measured".to_string(),
        };
        let color_temperature = ColorTemperatureAssessment {
            kelvin: d65::NOMINAL_KELVIN,
            chromaticity: Chromaticity {
                x: d65::CHROMATICITY_X,
                y: d65::CHROMATICITY_Y,
            },
            verdict: ColorTemperatureVerdict::Neutral,
            feedback: "Color temperature could not be measured".to_string(),
        };

        let overall_score = metrics::overall_score(
            sharpness.score,
            metrics::exposure_score(exposure.mean_brightness),
            metrics::resolution_score(&resolution),
            metrics::color_temperature_score(color_temperature.kelvin),
        );
        let primary_issue = if resolution.valid {
            None
        } else {
            Some(resolution.feedback.clone())
        };

        Self {
            is_acceptable: resolution.valid,
            overall_score,
            confidence: fallback::STAGE_CONFIDENCE,
            primary_issue,
            sharpness,
            exposure,
            resolution,
            color_temperature,
            processing_time: 0.0,
            degraded: Some(reason),
        }
    }

    /// Report for input that cannot be analyzed at all
    ///
    /// The reason becomes the primary issue and every feedback string. A
    /// known resolution is kept, marked invalid.
    pub fn rejected(reason: impl Into<String>, resolution: Option<ResolutionAssessment>) -> Self {
        let reason = reason.into();
        let resolution = match resolution {
            Some(known) => ResolutionAssessment {
                valid: false,
                feedback: reason.clone(),
                ..known
            },
            None => ResolutionAssessment {
                width: 0,
                height: 0,
                min_width: quality::MIN_WIDTH,
                min_height: quality::MIN_HEIGHT,
                valid: false,
                feedback: reason.clone(),
            },
        };
        Self {
            is_acceptable: false,
            overall_score: 0.0,
            confidence: fallback::REJECTED_CONFIDENCE,
            primary_issue: Some(reason.clone()),
            sharpness: SharpnessAssessment {
                score: 0.0,
                laplacian_variance: 0.0,
                verdict: SharpnessVerdict::Rejected,
                feedback: reason.clone(),
            },
            exposure: ExposureAssessment {
                mean_brightness: 0.0,
                contrast: 0.0,
                verdict: ExposureVerdict::Normal,
                is_extreme: false,
                clipped_shadows: 0.0,
                clipped_highlights: 0.0,
                confidence: fallback::REJECTED_CONFIDENCE,
                feedback: reason.clone(),
            },
            resolution,
            color_temperature: ColorTemperatureAssessment {
                kelvin: d65::NOMINAL_KELVIN,
                chromaticity: Chromaticity {
                    x: d65::CHROMATICITY_X,
                    y: d65::CHROMATICITY_Y,
                },
                verdict: ColorTemperatureVerdict::Neutral,
                feedback: reason.clone(),
            },
            processing_time: 0.0,
            degraded: Some(DegradedReason::Rejected { reason }),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}
