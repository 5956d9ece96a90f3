//! Calibration constants and reference values for skin tone analysis
//!
//! This module contains compile-time defaults for the quality gate, skin
//! detection, white balance and tone classification. Runtime values come from
//! [`crate::config::PipelineConfig`], whose defaults are built from these.

/// D65 Standard Illuminant Reference
///
/// CIE Standard Illuminant D65 represents average daylight with a correlated
/// color temperature of 6504K. This is the standard reference for digital
/// images and computer displays.
pub mod d65 {
    /// D65 white point in CIE XYZ color space (array form)
    /// Source: CIE 15:2004 Colorimetry, 3rd edition
    pub const WHITE_POINT_XYZ: [f32; 3] = [0.95047, 1.00000, 1.08883];

    /// Correlated Color Temperature of D65 in Kelvin
    pub const CCT_KELVIN: f32 = 6504.0;

    /// Nominal color temperature used for verdict bucketing
    pub const NOMINAL_KELVIN: f32 = 6500.0;

    /// D65 chromaticity coordinates
    pub const CHROMATICITY_X: f32 = 0.31271;
    pub const CHROMATICITY_Y: f32 = 0.32902;
}

/// Image quality gate thresholds
pub mod quality {
    /// Laplacian variance per sharpness score point (variance 500 => score 100)
    pub const SHARPNESS_VARIANCE_PER_POINT: f32 = 5.0;

    /// Sharpness scores below this are rejected
    pub const SHARPNESS_REJECT_BELOW: f32 = 30.0;

    /// Sharpness scores at or above this are sharp
    pub const SHARPNESS_SHARP_FROM: f32 = 60.0;

    /// Mean luminance below this is underexposed
    pub const UNDEREXPOSED_MEAN: f32 = 60.0;

    /// Mean luminance above this is overexposed
    pub const OVEREXPOSED_MEAN: f32 = 200.0;

    /// Mean luminance below this makes the exposure extreme
    pub const EXTREME_DARK_MEAN: f32 = 30.0;

    /// Mean luminance above this makes the exposure extreme
    pub const EXTREME_BRIGHT_MEAN: f32 = 230.0;

    /// Luminance at or below this counts as a clipped shadow
    pub const SHADOW_CLIP_LEVEL: u8 = 10;

    /// Luminance at or above this counts as a clipped highlight
    pub const HIGHLIGHT_CLIP_LEVEL: u8 = 245;

    /// Fraction of clipped pixels that makes the exposure extreme
    pub const EXTREME_CLIP_RATIO: f32 = 0.5;

    /// Minimum accepted resolution
    pub const MIN_WIDTH: u32 = 200;
    pub const MIN_HEIGHT: u32 = 200;

    /// Color temperatures below this are warm
    pub const WARM_BELOW_KELVIN: f32 = 5500.0;

    /// Color temperatures above this are cool
    pub const COOL_ABOVE_KELVIN: f32 = 7500.0;

    /// Valid output range of the CCT approximation
    pub const MIN_CCT_KELVIN: f32 = 1000.0;
    pub const MAX_CCT_KELVIN: f32 = 25000.0;

    /// Overall score weights (sharpness weighted highest)
    pub const WEIGHT_SHARPNESS: f32 = 0.40;
    pub const WEIGHT_EXPOSURE: f32 = 0.30;
    pub const WEIGHT_RESOLUTION: f32 = 0.15;
    pub const WEIGHT_COLOR_TEMPERATURE: f32 = 0.15;
}

/// Skin detection parameters (YCbCr skin locus)
///
/// These are empirically tuned; revalidate against labeled data before changing.
pub mod skin {
    pub const CB_MIN: f32 = 77.0;
    pub const CB_MAX: f32 = 127.0;
    pub const CR_MIN: f32 = 133.0;
    pub const CR_MAX: f32 = 173.0;

    /// Mask value for skin pixels
    pub const MASK_ON: u8 = 255;

    /// Minimum skin coverage before skin-aware correction is trusted
    pub const MIN_COVERAGE_RATIO: f32 = 0.1;

    /// Skin coverage at which the coverage confidence factor saturates
    pub const FULL_COVERAGE_RATIO: f32 = 0.5;
}

/// White balance parameters
pub mod awb {
    /// Upper sanity bound for every channel gain
    pub const MAX_GAIN: f32 = 4.0;

    /// Plausible medium skin reflectance under D65, sRGB 0-255
    pub const SKIN_REFERENCE_RGB: [f32; 3] = [205.0, 160.0, 135.0];

    /// Default correction time budget
    pub const TIMEOUT_MS: u64 = 3000;

    /// Per-method base confidence
    pub const BASE_CONFIDENCE_SKIN_AWARE: f32 = 0.9;
    pub const BASE_CONFIDENCE_VON_KRIES: f32 = 0.85;
    pub const BASE_CONFIDENCE_GRAY_WORLD: f32 = 0.7;
    pub const BASE_CONFIDENCE_NONE: f32 = 0.3;
}

/// Confidence ladder shared by every fallback generator
pub mod fallback {
    /// Whole-stage fallback confidence
    pub const STAGE_CONFIDENCE: f32 = 0.5;

    /// Multiplier applied when part of a stage fell back
    pub const PARTIAL_MULTIPLIER: f32 = 0.8;

    /// Outright rejection confidence
    pub const REJECTED_CONFIDENCE: f32 = 0.1;

    /// Confidence of a real, non-degraded quality report floor
    pub const MEASURED_QUALITY_FLOOR: f32 = 0.6;
}

/// Face region extraction parameters
pub mod region {
    /// Default padding on each side, as a fraction of the box size
    pub const PADDING_RATIO: f32 = 0.2;
}

/// Tone classification parameters
pub mod tone {
    /// Chroma below which the undertone is neutral
    pub const NEUTRAL_CHROMA_MAX: f32 = 6.0;

    /// Hue angles (degrees) at or above this are warm
    pub const WARM_HUE_MIN: f32 = 55.0;

    /// Hue angles (degrees) below this are cool
    pub const COOL_HUE_MAX: f32 = 48.0;

    /// Hue splitting neutral undertones between warm and cool seasons
    pub const NEUTRAL_HUE_SPLIT: f32 = 51.5;

    /// L* at or above this is the light band (spring/summer)
    pub const LIGHT_BAND_L_MIN: f32 = 63.0;

    /// Chroma at or above this is bright
    pub const BRIGHT_CHROMA_MIN: f32 = 26.0;

    /// ITA at or above this is light
    pub const LIGHT_ITA_MIN: f32 = 48.0;

    /// ITA below this is deep
    pub const DEEP_ITA_MAX: f32 = 20.0;

    /// Color distance at which similarity halves
    pub const DISTANCE_SCALE: f32 = 10.0;

    /// Score margin scale for confidence saturation
    pub const MARGIN_SCALE: f32 = 5.0;

    /// Confidence reported by mock classifications
    pub const MOCK_CONFIDENCE: f32 = 78.0;
}

/// Statistical analysis parameters
pub mod statistics {
    /// Percentile for robust mean estimation (exclude outliers)
    pub const ROBUST_PERCENTILE_LOW: f32 = 15.0;
    pub const ROBUST_PERCENTILE_HIGH: f32 = 85.0;

    /// Minimum pixels kept after outlier removal
    pub const MIN_SAMPLE_SIZE: usize = 10;

    /// Skin pixels converted to Lab at most; larger sets are strided
    pub const MAX_LAB_SAMPLES: usize = 50_000;
}
