//! Automatic white balance stage
//!
//! Detects skin, chooses a white balance method, validates its gains and
//! applies them. The stage entry points always return an [`AwbResult`];
//! failures and timeouts become fallback results with reduced confidence
//! and an explicit [`DegradedReason`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::buffer::RawImageBuffer;
use crate::calibration::white_balance::{
    apply_gains, is_valid_gains_within, AwbGains, AwbMethod, WhiteBalanceEstimator,
};
use crate::config::AwbConfig;
use crate::constants::{fallback, skin};
use crate::detection::skin::{clean_skin_mask, detect_skin_mask, has_sufficient_skin_coverage, SkinMask};
use crate::error::{AnalysisError, DegradedReason, Result};

/// Skin evidence used by the stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinDetection {
    /// Coverage reached the configured minimum
    pub detected: bool,
    pub pixel_count: usize,
    /// Fraction of the region marked as skin
    pub coverage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwbMetadata {
    pub confidence: f32,
    /// Milliseconds
    pub processing_time: f64,
    pub original_mean: Option<[f64; 3]>,
    pub corrected_mean: Option<[f64; 3]>,
    pub degraded: Option<DegradedReason>,
}

/// White balance stage output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwbResult {
    /// False only when the input could not be processed at all
    pub success: bool,
    pub correction_applied: bool,
    pub method: AwbMethod,
    pub gains: AwbGains,
    pub skin_detection: SkinDetection,
    pub metadata: AwbMetadata,
    pub error: Option<String>,
    #[serde(skip)]
    pub corrected_image: Option<RawImageBuffer>,
    #[serde(skip)]
    pub skin_mask: Option<SkinMask>,
}

impl AwbResult {
    /// Pass-through result after an internal failure or timeout
    pub fn fallback(image: &RawImageBuffer, reason: DegradedReason) -> Self {
        warn!(?reason, "white balance fell back to uncorrected image");
        Self {
            success: true,
            correction_applied: false,
            method: AwbMethod::None,
            gains: AwbGains::IDENTITY,
            skin_detection: SkinDetection::default(),
            metadata: AwbMetadata {
                confidence: fallback::STAGE_CONFIDENCE,
                processing_time: 0.0,
                original_mean: image.mean_rgb(),
                corrected_mean: image.mean_rgb(),
                degraded: Some(reason),
            },
            error: None,
            corrected_image: Some(image.clone()),
            skin_mask: None,
        }
    }

    /// Result for input that cannot be processed
    pub fn error_fallback(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "white balance rejected input");
        Self {
            success: false,
            correction_applied: false,
            method: AwbMethod::None,
            gains: AwbGains::IDENTITY,
            skin_detection: SkinDetection::default(),
            metadata: AwbMetadata {
                confidence: fallback::REJECTED_CONFIDENCE,
                processing_time: 0.0,
                original_mean: None,
                corrected_mean: None,
                degraded: Some(DegradedReason::rejected(reason.clone())),
            },
            error: Some(reason),
            corrected_image: None,
            skin_mask: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.degraded.is_some()
    }

    pub fn confidence(&self) -> f32 {
        self.metadata.confidence
    }
}

/// Outcome of method selection and gain application
#[derive(Debug, Clone)]
pub struct AwbSelection {
    pub method: AwbMethod,
    pub gains: AwbGains,
    pub corrected: RawImageBuffer,
    pub confidence: f32,
    pub degraded: Option<DegradedReason>,
}

/// Method confidence scaled by skin coverage and gain plausibility, in `[0, 1]`
pub fn compute_awb_confidence(method: AwbMethod, coverage: f32, gains: &AwbGains, max_gain: f32) -> f32 {
    let coverage_factor = 0.7 + 0.3 * (coverage / skin::FULL_COVERAGE_RATIO).clamp(0.0, 1.0);

    let deviation = gains.max_deviation();
    let max_deviation = max_gain.ln();
    let plausibility = if max_deviation > 0.0 {
        1.0 - 0.5 * (deviation / max_deviation).min(1.0)
    } else if deviation == 0.0 {
        1.0
    } else {
        0.5
    };

    (method.base_confidence() * coverage_factor * plausibility).clamp(0.0, 1.0)
}

/// Choose a method, estimate and validate its gains, and apply them
///
/// - An explicit method is honored when its evidence is available
/// - Auto picks skin-aware with enough skin coverage, otherwise gray world
/// - Von Kries needs a reference white and otherwise runs as gray world
/// - Von Kries takes its reference white from `reference_white`, or from
///   the daylight white of `reference_cct`
/// - Invalid gains retry gray world, or give up without correction when
///   that fails too; either way the confidence is scaled down
pub fn select_and_apply_awb(image: &RawImageBuffer, mask: &SkinMask, config: &AwbConfig) -> AwbSelection {
    let coverage = mask.skin_ratio();
    let skin_ok = has_sufficient_skin_coverage(mask, config.min_skin_ratio);
    let estimator = WhiteBalanceEstimator::with_skin_reference(config.skin_reference);
    let reference_white = config.resolved_reference_white();

    let requested = match config.method {
        Some(AwbMethod::SkinAware) if !skin_ok => {
            debug!(coverage, "not enough skin for skin-aware balance, using gray world");
            AwbMethod::GrayWorld
        }
        Some(AwbMethod::VonKries) if reference_white.is_none() => {
            debug!("von Kries requested without a reference white, using gray world");
            AwbMethod::GrayWorld
        }
        Some(method) => method,
        None if skin_ok => AwbMethod::SkinAware,
        None => AwbMethod::GrayWorld,
    };

    let estimate = |method: AwbMethod| -> Result<AwbGains> {
        match method {
            AwbMethod::GrayWorld => estimator.estimate_gray_world(image),
            AwbMethod::SkinAware => estimator.estimate_skin_aware(image, mask),
            AwbMethod::VonKries => reference_white
                .map(|white| estimator.estimate_von_kries(white))
                .ok_or_else(|| AnalysisError::invalid_parameter("awb.referenceWhite", "missing")),
            AwbMethod::None => Ok(AwbGains::IDENTITY),
        }
    };
    let accept = |gains: Result<AwbGains>| -> std::result::Result<AwbGains, AwbGains> {
        match gains {
            Ok(g) if is_valid_gains_within(&g, config.max_gain) => Ok(g),
            Ok(g) => Err(g),
            Err(_) => Err(AwbGains::new(f32::NAN, f32::NAN, f32::NAN)),
        }
    };

    let mut degraded = None;
    let mut multiplier = 1.0;
    let (method, raw_gains) = match accept(estimate(requested)) {
        Ok(gains) => (requested, gains),
        Err(bad) => {
            warn!(method = ?requested, r = bad.r, g = bad.g, b = bad.b, "rejected implausible white balance gains");
            degraded = Some(DegradedReason::InvalidGains {
                r: bad.r,
                g: bad.g,
                b: bad.b,
            });
            let retry = if requested == AwbMethod::GrayWorld {
                Err(bad)
            } else {
                accept(estimate(AwbMethod::GrayWorld))
            };
            multiplier = fallback::PARTIAL_MULTIPLIER;
            match retry {
                Ok(gains) => (AwbMethod::GrayWorld, gains),
                Err(_) => (AwbMethod::None, AwbGains::IDENTITY),
            }
        }
    };

    let gains = raw_gains.with_strength(config.strength);
    let corrected = if method == AwbMethod::None || gains.is_identity() {
        image.clone()
    } else {
        apply_gains(image, &gains)
    };
    let confidence = compute_awb_confidence(method, coverage, &gains, config.max_gain) * multiplier;

    debug!(
        ?method,
        r = gains.r,
        g = gains.g,
        b = gains.b,
        coverage,
        confidence,
        "white balance selected"
    );

    AwbSelection {
        method,
        gains,
        corrected,
        confidence,
        degraded,
    }
}

/// Run the white balance stage to completion
pub fn process_awb_correction(image: &RawImageBuffer, config: &AwbConfig) -> AwbResult {
    let never = AtomicBool::new(false);
    match process_awb_cancellable(image, config, &never) {
        Ok(result) => result,
        Err(e) => AwbResult::error_fallback(e.to_string()),
    }
}

/// Run the white balance stage within a time budget
///
/// The work runs on a worker thread. When the budget elapses the worker is
/// asked to stop, its output is discarded and the timeout fallback is returned.
pub fn process_awb_correction_with_timeout(
    image: &RawImageBuffer,
    config: &AwbConfig,
    timeout: Duration,
) -> AwbResult {
    let (tx, rx) = mpsc::sync_channel(1);
    let cancel = Arc::new(AtomicBool::new(false));

    let worker_cancel = Arc::clone(&cancel);
    let worker_image = image.clone();
    let worker_config = config.clone();
    let spawned = thread::Builder::new().name("awb-worker".into()).spawn(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            process_awb_cancellable(&worker_image, &worker_config, &worker_cancel)
        }));
        // receiver is gone after a timeout
        let _ = tx.send(outcome);
    });
    if let Err(e) = spawned {
        return AwbResult::fallback(image, DegradedReason::internal(format!("Failed to spawn worker: {}", e)));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) if e.is_recoverable() => AwbResult::fallback(image, DegradedReason::from(&e)),
        Ok(Ok(Err(e))) => AwbResult::error_fallback(e.to_string()),
        Ok(Err(_)) => AwbResult::fallback(image, DegradedReason::internal("White balance worker panicked")),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            let err = AnalysisError::Timeout {
                operation: "white balance".to_string(),
                limit_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            };
            warn!(error = %err, "abandoning white balance worker");
            AwbResult::fallback(image, DegradedReason::from(&err))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            AwbResult::fallback(image, DegradedReason::internal("White balance worker exited without a result"))
        }
    }
}

fn process_awb_cancellable(image: &RawImageBuffer, config: &AwbConfig, cancel: &AtomicBool) -> Result<AwbResult> {
    let start = Instant::now();
    if image.is_empty() {
        return Err(AnalysisError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    let mask = detect_skin_mask(image, &config.skin_thresholds);
    check_cancelled(cancel)?;
    let mask = if config.clean_mask { clean_skin_mask(&mask) } else { mask };
    check_cancelled(cancel)?;

    let selection = select_and_apply_awb(image, &mask, config);
    check_cancelled(cancel)?;

    let skin_detection = SkinDetection {
        detected: has_sufficient_skin_coverage(&mask, config.min_skin_ratio),
        pixel_count: mask.skin_pixel_count(),
        coverage: mask.skin_ratio(),
    };

    Ok(AwbResult {
        success: true,
        correction_applied: selection.method != AwbMethod::None && !selection.gains.is_identity(),
        method: selection.method,
        gains: selection.gains,
        skin_detection,
        metadata: AwbMetadata {
            confidence: selection.confidence,
            processing_time: start.elapsed().as_secs_f64() * 1000.0,
            original_mean: image.mean_rgb(),
            corrected_mean: selection.corrected.mean_rgb(),
            degraded: selection.degraded,
        },
        error: None,
        corrected_image: Some(selection.corrected),
        skin_mask: Some(mask),
    })
}

fn check_cancelled(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        Err(AnalysisError::Cancelled {
            operation: "white balance".to_string(),
        })
    } else {
        Ok(())
    }
}
