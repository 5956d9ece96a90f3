//! Quality gate combining the individual measurements
//!
//! [`QualityGate::assess`] never fails: unanalyzable input yields a rejected
//! report, internal failures yield the optimistic fallback.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, warn};

use crate::buffer::RawImageBuffer;
use crate::config::QualityConfig;
use crate::constants::fallback;
use crate::error::{AnalysisError, DegradedReason, Result};
use crate::image_loader::decode_image;
use crate::quality::metrics::{
    assess_color_temperature, assess_exposure, assess_resolution, assess_sharpness, color_temperature_score,
    exposure_score, overall_score, resolution_score,
};
use crate::quality::{QualityReport, SharpnessVerdict};

/// Capture quality gate
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    config: QualityConfig,
}

impl QualityGate {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Assess a decoded frame
    pub fn assess(&self, image: &RawImageBuffer) -> QualityReport {
        if image.is_empty() {
            return QualityReport::rejected(
                format!("Image is empty ({}x{})", image.width(), image.height()),
                Some(assess_resolution(image.width(), image.height(), &self.config)),
            );
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_assess(image)));
        let failure = match outcome {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "quality assessment panicked".to_string(),
        };

        warn!(%failure, "quality gate fell back to default report");
        QualityReport::fallback(
            assess_resolution(image.width(), image.height(), &self.config),
            DegradedReason::internal(failure),
        )
    }

    /// Decode and assess an encoded photo; undecodable bytes are rejected
    pub fn assess_encoded(&self, bytes: &[u8]) -> QualityReport {
        match decode_image(bytes) {
            Ok(image) => self.assess(&image),
            Err(e) => QualityReport::rejected(format!("Could not decode image: {}", e), None),
        }
    }

    fn try_assess(&self, image: &RawImageBuffer) -> Result<QualityReport> {
        let start = Instant::now();
        let luma = image.luminance();

        let sharpness = assess_sharpness(&luma, image.width(), image.height(), &self.config);
        let exposure = assess_exposure(&luma, &self.config);
        let resolution = assess_resolution(image.width(), image.height(), &self.config);
        let color_temperature = assess_color_temperature(image, &self.config);

        if !sharpness.laplacian_variance.is_finite()
            || !sharpness.score.is_finite()
            || !exposure.mean_brightness.is_finite()
        {
            return Err(AnalysisError::processing("Non-finite quality measurement"));
        }

        let overall = overall_score(
            sharpness.score,
            exposure_score(exposure.mean_brightness),
            resolution_score(&resolution),
            color_temperature_score(color_temperature.kelvin),
        );

        let is_acceptable =
            resolution.valid && sharpness.verdict != SharpnessVerdict::Rejected && !exposure.is_extreme;

        let primary_issue = if !resolution.valid {
            Some(resolution.feedback.clone())
        } else if sharpness.verdict == SharpnessVerdict::Rejected {
            Some(sharpness.feedback.clone())
        } else if exposure.is_extreme {
            Some(exposure.feedback.clone())
        } else {
            None
        };

        let confidence = fallback::MEASURED_QUALITY_FLOOR + (1.0 - fallback::MEASURED_QUALITY_FLOOR) * exposure.confidence;

        debug!(
            is_acceptable,
            overall,
            sharpness = sharpness.score,
            brightness = exposure.mean_brightness,
            kelvin = color_temperature.kelvin,
            "quality assessed"
        );

        Ok(QualityReport {
            is_acceptable,
            overall_score: overall,
            confidence,
            primary_issue,
            sharpness,
            exposure,
            resolution,
            color_temperature,
            processing_time: start.elapsed().as_secs_f64() * 1000.0,
            degraded: None,
        })
    }
}
