//! Robust skin color extraction
//!
//! Extracts a representative skin color from a face region with:
//! - Masked pixel collection with strided sampling on large regions
//! - Outlier removal via percentile filtering
//! - Statistical aggregation with confidence scoring

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::buffer::RawImageBuffer;
use crate::color::conversion::rgb_to_lab;
use crate::color::difference::ciede2000;
use crate::color::lab::LabColor;
use crate::config::SkinColorConfig;
use crate::constants::{skin, statistics};
use crate::detection::skin::SkinMask;
use crate::{AnalysisError, Result};

/// Representative skin color with statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinColorSample {
    /// Representative Lab color
    pub lab: LabColor,
    /// Mean sRGB of the sampled pixels
    pub mean_rgb: [f64; 3],
    /// RMS CIEDE2000 spread around `lab`
    pub variance: f32,
    /// Number of pixels aggregated after filtering
    pub pixel_count: usize,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

/// Skin color analyzer implementing robust color extraction
#[derive(Debug, Clone)]
pub struct SkinColorAnalyzer {
    percentile_low: f32,
    percentile_high: f32,
    min_pixels: usize,
    max_samples: usize,
}

impl Default for SkinColorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinColorAnalyzer {
    /// Create a new analyzer with default parameters
    pub fn new() -> Self {
        Self {
            percentile_low: statistics::ROBUST_PERCENTILE_LOW,
            percentile_high: statistics::ROBUST_PERCENTILE_HIGH,
            min_pixels: statistics::MIN_SAMPLE_SIZE,
            max_samples: statistics::MAX_LAB_SAMPLES,
        }
    }

    pub fn from_config(config: &SkinColorConfig) -> Self {
        Self {
            percentile_low: config.outlier_percentile_low,
            percentile_high: config.outlier_percentile_high,
            min_pixels: config.min_pixels_threshold.max(1),
            max_samples: config.max_samples.max(1),
        }
    }

    /// Extract the representative skin color of `image`
    ///
    /// # Arguments
    ///
    /// * `image` - Face region, ideally white balanced
    /// * `mask` - Skin mask of the same dimensions; `None` uses every pixel
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if:
    /// - The mask does not match the image dimensions
    /// - Fewer than the minimum number of pixels are available
    pub fn extract(&self, image: &RawImageBuffer, mask: Option<&SkinMask>) -> Result<SkinColorSample> {
        if let Some(mask) = mask {
            if mask.width() != image.width() || mask.height() != image.height() {
                return Err(AnalysisError::invalid_parameter(
                    "mask",
                    format!(
                        "{}x{} mask for {}x{} image",
                        mask.width(),
                        mask.height(),
                        image.width(),
                        image.height()
                    ),
                ));
            }
        }

        // Step 1: collect and convert masked pixels
        let rgb_pixels = self.collect_pixels(image, mask);
        if rgb_pixels.len() < self.min_pixels {
            return Err(AnalysisError::InsufficientSkin {
                found: rgb_pixels.len(),
                minimum: self.min_pixels,
            });
        }
        let lab_pixels: Vec<LabColor> = rgb_pixels
            .par_iter()
            .map(|px| rgb_to_lab(px[0], px[1], px[2]))
            .collect();

        // Step 2: outlier removal, keeping everything when filtering is too aggressive
        let filtered = self.remove_outliers(&lab_pixels);
        let kept = if filtered.len() >= self.min_pixels {
            filtered
        } else {
            lab_pixels
        };

        // Step 3: aggregation
        let lab = self.compute_representative_color(&kept)?;
        let variance = self.compute_variance(&kept, lab);
        let coverage = mask.map(SkinMask::skin_ratio);
        let confidence = self.compute_confidence(kept.len(), variance, coverage);

        let n = rgb_pixels.len() as f64;
        let sum = rgb_pixels.iter().fold([0.0f64; 3], |mut acc, px| {
            acc[0] += f64::from(px[0]);
            acc[1] += f64::from(px[1]);
            acc[2] += f64::from(px[2]);
            acc
        });

        debug!(
            sampled = rgb_pixels.len(),
            kept = kept.len(),
            l = lab.l,
            a = lab.a,
            b = lab.b,
            variance,
            confidence,
            "extracted skin color"
        );

        Ok(SkinColorSample {
            lab,
            mean_rgb: [sum[0] / n, sum[1] / n, sum[2] / n],
            variance,
            pixel_count: kept.len(),
            confidence,
        })
    }

    /// Masked RGB pixels, strided down to at most `max_samples`
    fn collect_pixels(&self, image: &RawImageBuffer, mask: Option<&SkinMask>) -> Vec<[u8; 3]> {
        let candidates = match mask {
            Some(m) => m.skin_pixel_count(),
            None => image.pixel_count(),
        };
        let stride = candidates.div_ceil(self.max_samples).max(1);

        image
            .pixels()
            .enumerate()
            .filter(|(i, _)| mask.map_or(true, |m| m.data()[*i] == skin::MASK_ON))
            .step_by(stride)
            .map(|(_, px)| px)
            .collect()
    }

    /// Keep values inside the percentile range on every channel
    fn remove_outliers(&self, pixels: &[LabColor]) -> Vec<LabColor> {
        if pixels.is_empty() {
            return Vec::new();
        }

        let bounds = |channel: fn(&LabColor) -> f32| {
            let mut values: Vec<f32> = pixels.iter().map(channel).collect();
            values.sort_by(f32::total_cmp);
            let last = values.len() - 1;
            let low_idx = ((values.len() as f32 * self.percentile_low / 100.0) as usize).min(last);
            let high_idx = ((values.len() as f32 * self.percentile_high / 100.0) as usize).min(last);
            (values[low_idx], values[high_idx])
        };

        let (l_min, l_max) = bounds(|p: &LabColor| p.l);
        let (a_min, a_max) = bounds(|p: &LabColor| p.a);
        let (b_min, b_max) = bounds(|p: &LabColor| p.b);

        pixels
            .iter()
            .copied()
            .filter(|p| {
                (l_min..=l_max).contains(&p.l)
                    && (a_min..=a_max).contains(&p.a)
                    && (b_min..=b_max).contains(&p.b)
            })
            .collect()
    }

    /// Median L* with mean a* and b*
    fn compute_representative_color(&self, pixels: &[LabColor]) -> Result<LabColor> {
        if pixels.is_empty() {
            return Err(AnalysisError::processing("No pixels to analyze"));
        }

        // median lightness resists specular highlights
        let mut l_values: Vec<f32> = pixels.iter().map(|p| p.l).collect();
        l_values.sort_by(f32::total_cmp);
        let l_median = l_values[l_values.len() / 2];

        let n = pixels.len() as f32;
        let a_mean = pixels.iter().map(|p| p.a).sum::<f32>() / n;
        let b_mean = pixels.iter().map(|p| p.b).sum::<f32>() / n;

        Ok(LabColor::new(l_median, a_mean, b_mean))
    }

    fn compute_variance(&self, pixels: &[LabColor], representative: LabColor) -> f32 {
        if pixels.is_empty() {
            return 0.0;
        }

        let sum_squared_diff: f32 = pixels
            .par_iter()
            .map(|p| {
                let delta_e = ciede2000(p, &representative);
                delta_e * delta_e
            })
            .sum();

        (sum_squared_diff / pixels.len() as f32).sqrt()
    }

    fn compute_confidence(&self, pixel_count: usize, variance: f32, coverage: Option<f32>) -> f32 {
        let size_score = if pixel_count >= 1000 {
            1.0
        } else if pixel_count >= 100 {
            0.8
        } else {
            0.5
        };

        let variance_score = if variance < 5.0 {
            1.0
        } else if variance < 10.0 {
            0.7
        } else {
            0.4
        };

        let coverage_score = match coverage {
            Some(ratio) if ratio >= skin::FULL_COVERAGE_RATIO => 1.0,
            Some(ratio) if ratio >= skin::MIN_COVERAGE_RATIO => 0.8,
            _ => 0.6,
        };

        let confidence: f32 = 0.4 * size_score + 0.3 * variance_score + 0.3 * coverage_score;
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkinThresholds;
    use crate::detection::skin::detect_skin_mask;

    #[test]
    fn test_analyzer_from_config() {
        let config = SkinColorConfig {
            outlier_percentile_low: 10.0,
            outlier_percentile_high: 90.0,
            min_pixels_threshold: 0,
            max_samples: 100,
        };
        let analyzer = SkinColorAnalyzer::from_config(&config);
        assert_eq!(analyzer.percentile_low, 10.0);
        assert_eq!(analyzer.percentile_high, 90.0);
        assert_eq!(analyzer.min_pixels, 1);
        assert_eq!(analyzer.max_samples, 100);
    }

    #[test]
    fn test_remove_outliers_empty() {
        let analyzer = SkinColorAnalyzer::new();
        assert!(analyzer.remove_outliers(&[]).is_empty());
    }

    #[test]
    fn test_remove_outliers() {
        let analyzer = SkinColorAnalyzer::new();
        let mut pixels = vec![LabColor::new(65.0, 12.0, 18.0); 100];

        pixels.push(LabColor::new(10.0, 12.0, 18.0)); // shadow
        pixels.push(LabColor::new(98.0, 12.0, 18.0)); // specular
        pixels.push(LabColor::new(65.0, 60.0, 18.0)); // lips
        pixels.push(LabColor::new(65.0, 12.0, 70.0));

        let filtered = analyzer.remove_outliers(&pixels);
        assert!(filtered.len() < pixels.len());
        assert_eq!(filtered.len(), 100);
    }

    #[test]
    fn test_compute_representative_color() {
        let analyzer = SkinColorAnalyzer::new();
        let pixels = vec![
            LabColor::new(60.0, 10.0, 18.0),
            LabColor::new(62.0, 11.0, 19.0),
            LabColor::new(90.0, 9.0, 17.0),
        ];

        let repr = analyzer.compute_representative_color(&pixels).unwrap();
        assert!((repr.l - 62.0).abs() < 1e-4);
        assert!((repr.a - 10.0).abs() < 1e-4);
        assert!((repr.b - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_compute_variance() {
        let analyzer = SkinColorAnalyzer::new();
        let representative = LabColor::new(60.0, 10.0, 18.0);

        let identical = vec![representative; 10];
        assert!(analyzer.compute_variance(&identical, representative) < 1e-4);

        let spread = vec![
            LabColor::new(50.0, 10.0, 18.0),
            LabColor::new(60.0, 10.0, 18.0),
            LabColor::new(70.0, 10.0, 18.0),
        ];
        assert!(analyzer.compute_variance(&spread, representative) > 1.0);
    }

    #[test]
    fn test_extract_uniform_region() {
        let image = RawImageBuffer::filled(40, 40, [200, 150, 120]);
        let sample = SkinColorAnalyzer::new().extract(&image, None).unwrap();

        let expected = rgb_to_lab(200, 150, 120);
        assert!((sample.lab.l - expected.l).abs() < 1e-3);
        assert_eq!(sample.mean_rgb, [200.0, 150.0, 120.0]);
        assert_eq!(sample.pixel_count, 1600);
        assert!(sample.variance < 1e-3);
        // large, tight, unmasked sample
        assert!((sample.confidence - 0.88).abs() < 1e-4);
    }

    #[test]
    fn test_extract_uses_mask_only() {
        // left half skin, right half blue
        let image = RawImageBuffer::from_fn(40, 20, |x, _| {
            if x < 20 {
                [200, 150, 120]
            } else {
                [30, 60, 200]
            }
        });
        let mask = detect_skin_mask(&image, &SkinThresholds::default());
        let sample = SkinColorAnalyzer::new().extract(&image, Some(&mask)).unwrap();

        assert_eq!(sample.mean_rgb, [200.0, 150.0, 120.0]);
        assert!(sample.lab.a > 0.0 && sample.lab.b > 0.0);
    }

    #[test]
    fn test_extract_without_skin_is_insufficient() {
        let image = RawImageBuffer::filled(20, 20, [128, 128, 128]);
        let mask = detect_skin_mask(&image, &SkinThresholds::default());
        let err = SkinColorAnalyzer::new().extract(&image, Some(&mask)).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientSkin { found: 0, .. }));
    }

    #[test]
    fn test_extract_rejects_mismatched_mask() {
        let image = RawImageBuffer::filled(20, 20, [200, 150, 120]);
        let other = RawImageBuffer::filled(10, 10, [200, 150, 120]);
        let mask = detect_skin_mask(&other, &SkinThresholds::default());
        assert!(SkinColorAnalyzer::new().extract(&image, Some(&mask)).is_err());
    }

    #[test]
    fn test_strided_sampling_caps_samples() {
        let config = SkinColorConfig {
            max_samples: 100,
            ..SkinColorConfig::default()
        };
        let image = RawImageBuffer::filled(50, 50, [200, 150, 120]);
        let sample = SkinColorAnalyzer::from_config(&config).extract(&image, None).unwrap();
        assert!(sample.pixel_count <= 100);
    }
}
