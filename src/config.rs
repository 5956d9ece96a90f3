//! Configuration structures for the skin tone analysis pipeline.
//!
//! This module defines all tunable parameters, organized into one section per
//! pipeline stage. Configuration is a versioned value, never process state.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use skintone_colorscan::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("config.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), skintone_colorscan::AnalysisError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`QualityConfig`]: sharpness, exposure, resolution and CCT thresholds
//! - [`RegionConfig`]: face box padding and squaring
//! - [`AwbConfig`]: skin detection and white balance settings
//! - [`SkinColorConfig`]: robust skin color extraction
//! - [`ToneConfig`]: distance metric and reference table

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::illuminant::IlluminantEstimator;
use crate::calibration::white_balance::AwbMethod;
use crate::color::difference::DistanceMetric;
use crate::constants::{awb, quality, region, skin, statistics};
use crate::error::{AnalysisError, Result};
use crate::tone::reference::ToneReferenceTable;

/// Version tag of the default configuration
pub const CONFIG_VERSION: &str = "2024.1";

/// Complete pipeline configuration for skin tone analysis.
///
/// Contains all parameters needed to process an image from capture to tone.
/// Can be serialized to/from JSON for reproducible runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Configuration version
    pub version: String,

    /// Quality gate configuration
    #[serde(default)]
    pub quality: QualityConfig,

    /// Face region extraction configuration
    #[serde(default)]
    pub region: RegionConfig,

    /// White balance configuration
    #[serde(default)]
    pub awb: AwbConfig,

    /// Skin color extraction configuration
    #[serde(default)]
    pub skin_color: SkinColorConfig,

    /// Tone classification configuration
    #[serde(default)]
    pub tone: ToneConfig,
}

/// Quality gate thresholds.
///
/// Band edges are a table rather than logic so they can be retuned per device
/// class without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityConfig {
    /// Laplacian variance mapped to one sharpness score point
    pub sharpness_variance_per_point: f32,

    /// Sharpness scores below this are rejected
    pub sharpness_reject_below: f32,

    /// Sharpness scores at or above this are sharp
    pub sharpness_sharp_from: f32,

    /// Mean luminance below this is underexposed
    pub underexposed_mean: f32,

    /// Mean luminance above this is overexposed
    pub overexposed_mean: f32,

    /// Mean luminance below this is extreme
    pub extreme_dark_mean: f32,

    /// Mean luminance above this is extreme
    pub extreme_bright_mean: f32,

    /// Clipped pixel fraction that makes exposure extreme
    pub extreme_clip_ratio: f32,

    /// Minimum accepted width in pixels
    pub min_width: u32,

    /// Minimum accepted height in pixels
    pub min_height: u32,

    /// Color temperatures below this are warm (Kelvin)
    pub warm_below_kelvin: f32,

    /// Color temperatures above this are cool (Kelvin)
    pub cool_above_kelvin: f32,
}

/// Face region extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegionConfig {
    /// Padding on each side as a fraction of box width/height
    pub padding_ratio: f32,

    /// Extract a square region centered on the face
    pub square: bool,
}

/// YCbCr skin locus thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinThresholds {
    pub cb_min: f32,
    pub cb_max: f32,
    pub cr_min: f32,
    pub cr_max: f32,
}

/// White balance correction parameters.
///
/// `method = None` selects automatically: skin-aware when skin coverage is
/// sufficient, otherwise gray-world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwbConfig {
    /// Forced correction method
    pub method: Option<AwbMethod>,

    /// Calibrated reference white (sRGB 0-255) for von Kries correction
    pub reference_white: Option<[f32; 3]>,

    /// Known daylight color temperature (Kelvin) used for von Kries when
    /// `reference_white` is absent
    pub reference_cct: Option<f32>,

    /// Skin reference color (sRGB 0-255) targeted by skin-aware correction
    pub skin_reference: [f32; 3],

    /// Skin detection thresholds
    pub skin_thresholds: SkinThresholds,

    /// Minimum skin coverage for skin-aware correction
    pub min_skin_ratio: f32,

    /// Remove isolated pixels from the skin mask
    pub clean_mask: bool,

    /// Upper bound for every channel gain
    pub max_gain: f32,

    /// Correction strength (0.0 = none, 1.0 = full)
    pub strength: f32,

    /// Time budget for the timeout-wrapped correction
    pub timeout_ms: u64,
}

/// Skin color extraction parameters.
///
/// Controls how the representative skin color is computed from the
/// corrected skin pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinColorConfig {
    /// Low percentile for outlier removal (0.0-100.0)
    pub outlier_percentile_low: f32,

    /// High percentile for outlier removal (0.0-100.0)
    pub outlier_percentile_high: f32,

    /// Minimum pixels required after filtering
    pub min_pixels_threshold: usize,

    /// Pixels converted to Lab at most
    pub max_samples: usize,
}

/// Tone classification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneConfig {
    /// Distance used for reference matching
    pub metric: DistanceMetric,

    /// Reference table; the standard table when absent
    pub reference_table: Option<ToneReferenceTable>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            quality: QualityConfig::default(),
            region: RegionConfig::default(),
            awb: AwbConfig::default(),
            skin_color: SkinColorConfig::default(),
            tone: ToneConfig::default(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            sharpness_variance_per_point: quality::SHARPNESS_VARIANCE_PER_POINT,
            sharpness_reject_below: quality::SHARPNESS_REJECT_BELOW,
            sharpness_sharp_from: quality::SHARPNESS_SHARP_FROM,
            underexposed_mean: quality::UNDEREXPOSED_MEAN,
            overexposed_mean: quality::OVEREXPOSED_MEAN,
            extreme_dark_mean: quality::EXTREME_DARK_MEAN,
            extreme_bright_mean: quality::EXTREME_BRIGHT_MEAN,
            extreme_clip_ratio: quality::EXTREME_CLIP_RATIO,
            min_width: quality::MIN_WIDTH,
            min_height: quality::MIN_HEIGHT,
            warm_below_kelvin: quality::WARM_BELOW_KELVIN,
            cool_above_kelvin: quality::COOL_ABOVE_KELVIN,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            padding_ratio: region::PADDING_RATIO,
            square: false,
        }
    }
}

impl Default for SkinThresholds {
    fn default() -> Self {
        Self {
            cb_min: skin::CB_MIN,
            cb_max: skin::CB_MAX,
            cr_min: skin::CR_MIN,
            cr_max: skin::CR_MAX,
        }
    }
}

impl Default for AwbConfig {
    fn default() -> Self {
        Self {
            method: None,
            reference_white: None,
            reference_cct: None,
            skin_reference: awb::SKIN_REFERENCE_RGB,
            skin_thresholds: SkinThresholds::default(),
            min_skin_ratio: skin::MIN_COVERAGE_RATIO,
            clean_mask: true,
            max_gain: awb::MAX_GAIN,
            strength: 1.0,
            timeout_ms: awb::TIMEOUT_MS,
        }
    }
}

impl AwbConfig {
    /// Reference white for von Kries, from `reference_white` or `reference_cct`
    pub fn resolved_reference_white(&self) -> Option<[f32; 3]> {
        self.reference_white.or_else(|| {
            self.reference_cct
                .and_then(|kelvin| IlluminantEstimator::reference_white_from_cct(kelvin).ok())
        })
    }
}

impl Default for SkinColorConfig {
    fn default() -> Self {
        Self {
            outlier_percentile_low: statistics::ROBUST_PERCENTILE_LOW,
            outlier_percentile_high: statistics::ROBUST_PERCENTILE_HIGH,
            min_pixels_threshold: statistics::MIN_SAMPLE_SIZE,
            max_samples: statistics::MAX_LAB_SAMPLES,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Ciede2000,
            reference_table: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("Failed to read {}", path.display()), e)
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnalysisError::config("Invalid configuration JSON", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json).map_err(|e| {
            AnalysisError::config(format!("Failed to write {}", path.display()), e)
        })?;
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        if !(q.sharpness_variance_per_point > 0.0) {
            return Err(invalid("quality.sharpnessVariancePerPoint", q.sharpness_variance_per_point));
        }
        if q.sharpness_reject_below > q.sharpness_sharp_from {
            return Err(invalid("quality.sharpnessRejectBelow", q.sharpness_reject_below));
        }
        if q.underexposed_mean >= q.overexposed_mean {
            return Err(invalid("quality.underexposedMean", q.underexposed_mean));
        }
        if q.warm_below_kelvin >= q.cool_above_kelvin {
            return Err(invalid("quality.warmBelowKelvin", q.warm_below_kelvin));
        }

        let r = &self.region;
        if !r.padding_ratio.is_finite() || r.padding_ratio < 0.0 {
            return Err(invalid("region.paddingRatio", r.padding_ratio));
        }

        let a = &self.awb;
        if !(a.max_gain > 0.0) || !a.max_gain.is_finite() {
            return Err(invalid("awb.maxGain", a.max_gain));
        }
        if !(0.0..=1.0).contains(&a.strength) {
            return Err(invalid("awb.strength", a.strength));
        }
        if !(0.0..=1.0).contains(&a.min_skin_ratio) {
            return Err(invalid("awb.minSkinRatio", a.min_skin_ratio));
        }
        if a.skin_reference.iter().any(|&c| !(c > 0.0)) {
            return Err(invalid("awb.skinReference", format!("{:?}", a.skin_reference)));
        }
        if let Some(kelvin) = a.reference_cct {
            IlluminantEstimator::from_cct(kelvin).map_err(|_| invalid("awb.referenceCct", kelvin))?;
        }

        let s = &self.skin_color;
        if !(0.0..=100.0).contains(&s.outlier_percentile_low)
            || !(0.0..=100.0).contains(&s.outlier_percentile_high)
            || s.outlier_percentile_low > s.outlier_percentile_high
        {
            return Err(invalid(
                "skinColor.outlierPercentile",
                format!("{}..{}", s.outlier_percentile_low, s.outlier_percentile_high),
            ));
        }
        if s.max_samples == 0 {
            return Err(invalid("skinColor.maxSamples", s.max_samples));
        }

        if let Some(table) = &self.tone.reference_table {
            table.validate()?;
        }

        Ok(())
    }
}

fn invalid(parameter: &str, value: impl ToString) -> AnalysisError {
    AnalysisError::invalid_parameter(parameter, value)
}
