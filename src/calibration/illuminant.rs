//! Illuminant estimation
//!
//! Relates scene colors, CIE 1931 chromaticity and correlated color
//! temperature (CCT) so that a measured or known illuminant can be
//! compared against the D65 reference.

use palette::{FromColor, Srgb, Xyz, Yxy};

use crate::constants::{d65, quality};
use crate::error::{AnalysisError, Result};

/// Lowest CCT accepted by the CIE daylight locus
const DAYLIGHT_LOCUS_MIN_K: f32 = 4000.0;

/// Highest CCT accepted by the CIE daylight locus
const DAYLIGHT_LOCUS_MAX_K: f32 = 25000.0;

/// CCT difference under which an illuminant counts as D65
const D65_TOLERANCE_K: f32 = 200.0;

/// Illuminant characteristics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Illuminant {
    /// Chromaticity coordinates (x, y)
    pub chromaticity: (f32, f32),
    /// Correlated color temperature in Kelvin
    pub cct_kelvin: f32,
    /// XYZ white point normalized to `Y = 1`
    pub white_point: [f32; 3],
}

/// Illuminant estimator
pub struct IlluminantEstimator;

impl IlluminantEstimator {
    /// Daylight illuminant for a color temperature
    ///
    /// Uses the CIE daylight locus polynomial (valid from 4000 K to 25000 K).
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` outside the daylight locus range.
    pub fn from_cct(cct_kelvin: f32) -> Result<Illuminant> {
        if !(DAYLIGHT_LOCUS_MIN_K..=DAYLIGHT_LOCUS_MAX_K).contains(&cct_kelvin) {
            return Err(AnalysisError::InvalidParameter {
                parameter: "color_temperature".to_string(),
                value: format!("{} K", cct_kelvin),
            });
        }

        let t = f64::from(cct_kelvin);
        let (t2, t3) = (t * t, t * t * t);
        let x = if t <= 7000.0 {
            -4.6070e9 / t3 + 2.9678e6 / t2 + 0.09911e3 / t + 0.244063
        } else {
            -2.0064e9 / t3 + 1.9018e6 / t2 + 0.24748e3 / t + 0.237040
        };
        let y = -3.0 * x * x + 2.87 * x - 0.275;

        Ok(Illuminant {
            chromaticity: (x as f32, y as f32),
            cct_kelvin,
            white_point: white_point_from_chromaticity(x as f32, y as f32),
        })
    }

    /// Get D65 standard illuminant
    pub fn d65() -> Illuminant {
        Illuminant {
            chromaticity: (d65::CHROMATICITY_X, d65::CHROMATICITY_Y),
            cct_kelvin: d65::CCT_KELVIN,
            white_point: d65::WHITE_POINT_XYZ,
        }
    }

    /// Estimate the illuminant from a mean sRGB color (0-255)
    ///
    /// Returns `None` for black or non-finite input.
    pub fn estimate_from_rgb(mean_rgb: [f64; 3]) -> Option<Illuminant> {
        let srgb = Srgb::new(
            (mean_rgb[0] / 255.0) as f32,
            (mean_rgb[1] / 255.0) as f32,
            (mean_rgb[2] / 255.0) as f32,
        );
        let xyz: Xyz = Xyz::from_color(srgb);
        if !(xyz.x + xyz.y + xyz.z > f32::EPSILON) {
            return None;
        }
        let yxy: Yxy = Yxy::from_color(xyz);
        if !yxy.x.is_finite() || !yxy.y.is_finite() || yxy.y <= 0.0 {
            return None;
        }

        Some(Illuminant {
            chromaticity: (yxy.x, yxy.y),
            cct_kelvin: Self::cct_from_chromaticity(yxy.x, yxy.y),
            white_point: white_point_from_chromaticity(yxy.x, yxy.y),
        })
    }

    /// McCamy's approximation, clamped to 1000-25000 K
    pub fn cct_from_chromaticity(x: f32, y: f32) -> f32 {
        let n = (f64::from(x) - 0.3320) / (0.1858 - f64::from(y));
        let cct = 449.0 * n.powi(3) + 3525.0 * n.powi(2) + 6823.3 * n + 5520.33;
        if cct.is_finite() {
            (cct as f32).clamp(quality::MIN_CCT_KELVIN, quality::MAX_CCT_KELVIN)
        } else {
            quality::MAX_CCT_KELVIN
        }
    }

    /// Check if illuminant is close to D65
    pub fn is_close_to_d65(illuminant: &Illuminant) -> bool {
        (illuminant.cct_kelvin - d65::CCT_KELVIN).abs() < D65_TOLERANCE_K
    }

    /// sRGB appearance (0-255, brightest channel 255) of a white surface lit
    /// by daylight of `cct_kelvin`, suitable as a von Kries reference white
    pub fn reference_white_from_cct(cct_kelvin: f32) -> Result<[f32; 3]> {
        let illuminant = Self::from_cct(cct_kelvin)?;
        let [x, y, z] = illuminant.white_point;
        let srgb: Srgb = Srgb::from_color(Xyz::new(x, y, z));
        let rgb = [srgb.red, srgb.green, srgb.blue].map(|c| c.max(0.0));
        let peak = rgb.iter().copied().fold(0.0f32, f32::max);
        if !(peak > 0.0) {
            return Err(AnalysisError::ColorConversionError {
                message: format!("No displayable white for {} K", cct_kelvin),
            });
        }
        Ok(rgb.map(|c| c / peak * 255.0))
    }
}

fn white_point_from_chromaticity(x: f32, y: f32) -> [f32; 3] {
    [x / y, 1.0, (1.0 - x - y) / y]
}
