//! Color space conversion utilities
//!
//! Provides conversions between:
//! - sRGB (0-255) and CIE Lab under D65
//! - Hex color strings and sRGB / Lab
//!
//! The sRGB → linear → XYZ → Lab chain is delegated to `palette`.

use palette::{FromColor, Lab, Srgb};

use crate::color::lab::LabColor;
use crate::error::{AnalysisError, Result};

/// Convert RGB (0-255) to Lab color space
///
/// # Arguments
///
/// * `r`, `g`, `b` - RGB values in range [0, 255]
///
/// # Returns
///
/// Lab color under the D65 illuminant
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> LabColor {
    let srgb = Srgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    );
    LabColor::from(Lab::from_color(srgb))
}

/// Convert fractional RGB (0.0-255.0), e.g. a channel mean, to Lab
pub fn rgb_f64_to_lab(rgb: [f64; 3]) -> LabColor {
    let srgb = Srgb::new(
        (rgb[0] / 255.0) as f32,
        (rgb[1] / 255.0) as f32,
        (rgb[2] / 255.0) as f32,
    );
    LabColor::from(Lab::from_color(srgb))
}

/// Convert Lab to 8-bit sRGB, clamping out-of-gamut channels
pub fn lab_to_rgb(lab: LabColor) -> [u8; 3] {
    let srgb: Srgb = Srgb::from_color(Lab::from(lab));
    [
        unit_to_byte(srgb.red),
        unit_to_byte(srgb.green),
        unit_to_byte(srgb.blue),
    ]
}

/// Convert 8-bit RGB to a hexadecimal color string (e.g. "#FF0000")
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Parse hexadecimal color string to 8-bit RGB
///
/// Accepts `#RRGGBB`, `RRGGBB` and the `#RGB` shorthand.
///
/// # Errors
///
/// Returns error if hex string is invalid
pub fn hex_to_rgb(hex: &str) -> Result<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    let expanded: String = match digits.len() {
        6 => digits.to_string(),
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        n => {
            return Err(AnalysisError::ColorConversionError {
                message: format!("Invalid hex color '{}': expected 3 or 6 digits, got {}", hex, n),
            })
        }
    };

    let channel = |range: std::ops::Range<usize>, name: &str| {
        expanded
            .get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(|| AnalysisError::ColorConversionError {
                message: format!("Invalid {} value in hex color '{}'", name, hex),
            })
    };

    Ok([channel(0..2, "red")?, channel(2..4, "green")?, channel(4..6, "blue")?])
}

/// Parse a hex color string straight to Lab
pub fn hex_to_lab(hex: &str) -> Result<LabColor> {
    let [r, g, b] = hex_to_rgb(hex)?;
    Ok(rgb_to_lab(r, g, b))
}

/// Convert Lab to a hex color string, clamped to the sRGB gamut
pub fn lab_to_hex(lab: LabColor) -> String {
    rgb_to_hex(lab_to_rgb(lab))
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_lab_white() {
        let lab = rgb_to_lab(255, 255, 255);
        assert!((lab.l - 100.0).abs() < 1.0);
        assert!(lab.a.abs() < 1.0);
        assert!(lab.b.abs() < 1.0);
    }

    #[test]
    fn test_rgb_to_lab_black() {
        let lab = rgb_to_lab(0, 0, 0);
        assert!(lab.l < 1.0);
    }

    #[test]
    fn test_hex_to_lab_white() {
        let lab = hex_to_lab("#FFFFFF").unwrap();
        assert!((lab.l - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_roundtrip_reference_colors() {
        for rgb in [[255, 255, 255], [0, 0, 0], [230, 195, 170], [12, 200, 77]] {
            let lab = rgb_to_lab(rgb[0], rgb[1], rgb[2]);
            assert_eq!(lab_to_rgb(lab), rgb, "round trip of {:?}", rgb);
        }
    }

    #[test]
    fn test_skin_tone_is_warm_positive() {
        let lab = rgb_to_lab(230, 195, 170);
        assert!(lab.l > 75.0 && lab.l < 85.0);
        assert!(lab.a > 0.0);
        assert!(lab.b > 0.0);
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex([255, 0, 0]), "#FF0000");
        assert_eq!(rgb_to_hex([0, 255, 0]), "#00FF00");
        assert_eq!(rgb_to_hex([0, 0, 255]), "#0000FF");
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000").unwrap(), [255, 0, 0]);
        assert_eq!(hex_to_rgb("00ff00").unwrap(), [0, 255, 0]);
        assert_eq!(hex_to_rgb("#fff").unwrap(), [255, 255, 255]);
    }

    #[test]
    fn test_hex_to_rgb_invalid() {
        assert!(hex_to_rgb("#FF").is_err());
        assert!(hex_to_rgb("#GGGGGG").is_err());
        assert!(hex_to_rgb("#FFFFFFF").is_err());
    }

    #[test]
    fn test_lab_hex_roundtrip() {
        let lab = hex_to_lab("#E6C3AA").unwrap();
        assert_eq!(lab_to_hex(lab), "#E6C3AA");
    }

    #[test]
    fn test_out_of_gamut_is_clamped() {
        let rgb = lab_to_rgb(LabColor::new(50.0, 100.0, 100.0));
        assert!(rgb[0] > rgb[2]);
    }
}
