//! Four-stage skin tone pipeline
//!
//! Runs the quality gate, face region extraction, white balance and tone
//! classification in order. A rejected quality report stops the run; every
//! other failure is replaced by the failing stage's fallback so a report is
//! always produced.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::RawImageBuffer;
use crate::calibration::awb::{process_awb_correction, process_awb_correction_with_timeout, AwbResult};
use crate::color::analysis::{SkinColorAnalyzer, SkinColorSample};
use crate::color::conversion::rgb_f64_to_lab;
use crate::config::PipelineConfig;
use crate::constants::fallback;
use crate::detection::face_region::{BoundingBox, DetectedFace, FaceRegion, LandmarkSet, RegionExtractor};
use crate::detection::skin::{clean_skin_mask, detect_skin_mask, SkinMask};
use crate::error::{AnalysisError, DegradedReason, Result};
use crate::image_loader::{decode_image, load_image};
use crate::quality::{QualityGate, QualityReport};
use crate::tone::classifier::{ToneAnalysis, ToneClassifier};
use crate::tone::mock::generate_mock_result;
use crate::tone::types::TwelveTone;

/// Tone reported when classification itself failed
pub const FALLBACK_TONE: TwelveTone = TwelveTone::MuteAutumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every stage produced a measured result
    Completed,
    /// At least one stage substituted its fallback
    Degraded,
    /// The quality gate stopped the run
    Rejected,
}

/// Face region without its pixels
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub bounding_box: BoundingBox,
    pub landmarks: LandmarkSet,
    pub processing_time: f64,
    pub degraded: Option<DegradedReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinColorSource {
    SkinMask,
    WholeRegion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinColorStage {
    pub sample: SkinColorSample,
    pub source: SkinColorSource,
    pub degraded: Option<DegradedReason>,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub status: PipelineStatus,
    pub quality: QualityReport,
    pub region: Option<RegionSummary>,
    pub awb: Option<AwbResult>,
    pub skin_color: Option<SkinColorStage>,
    pub tone: Option<ToneAnalysis>,
    /// Milliseconds
    pub processing_time: f64,
}

impl PipelineReport {
    /// Report for a run stopped by the quality gate
    pub fn rejected(quality: QualityReport) -> Self {
        Self {
            status: PipelineStatus::Rejected,
            processing_time: quality.processing_time,
            quality,
            region: None,
            awb: None,
            skin_color: None,
            tone: None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status == PipelineStatus::Rejected
    }

    pub fn tone(&self) -> Option<TwelveTone> {
        self.tone.as_ref().map(ToneAnalysis::tone)
    }

    /// Classification confidence, 0-100
    pub fn confidence(&self) -> Option<f32> {
        self.tone.as_ref().map(ToneAnalysis::confidence)
    }
}

/// One image for [`SkinTonePipeline::run_batch`]
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub image: RawImageBuffer,
    pub face: Option<DetectedFace>,
}

impl PipelineJob {
    pub fn new(image: RawImageBuffer, face: Option<DetectedFace>) -> Self {
        Self { image, face }
    }
}

/// Configured pipeline
#[derive(Debug, Clone)]
pub struct SkinTonePipeline {
    config: PipelineConfig,
    gate: QualityGate,
    extractor: RegionExtractor,
    analyzer: SkinColorAnalyzer,
    classifier: ToneClassifier,
}

impl SkinTonePipeline {
    /// Validate `config` and build every stage
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gate: QualityGate::new(config.quality.clone()),
            extractor: RegionExtractor::new(&config.region),
            analyzer: SkinColorAnalyzer::from_config(&config.skin_color),
            classifier: ToneClassifier::from_config(&config.tone)?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze one decoded frame
    ///
    /// Without a detected face the whole frame is used as the face region.
    pub fn run(&self, image: &RawImageBuffer, face: Option<&DetectedFace>) -> PipelineReport {
        let start = Instant::now();

        let quality = self.gate.assess(image);
        if !quality.is_acceptable {
            info!(issue = ?quality.primary_issue, "photo rejected by quality gate");
            let mut report = PipelineReport::rejected(quality);
            report.processing_time = elapsed_ms(start);
            return report;
        }

        let face = face
            .cloned()
            .unwrap_or_else(|| DetectedFace::full_frame(image.width(), image.height()));
        let (region, region_degraded) = self.extract_region(image, &face);

        let mut awb = self.correct_white_balance(&region.image_data);
        let corrected = awb.corrected_image.take().unwrap_or_else(|| region.image_data.clone());
        // mask comes from the uncorrected region; gains keep pixel positions
        let mask = awb.skin_mask.take();

        let skin_color = self.skin_color(&corrected, mask);

        let upstream_degraded = quality.is_degraded()
            || region_degraded.is_some()
            || awb.is_degraded()
            || !awb.success
            || skin_color.as_ref().map_or(true, |s| s.degraded.is_some());
        let tone = self.classify(skin_color.as_ref(), upstream_degraded);

        let status = if upstream_degraded || tone.degraded.is_some() {
            PipelineStatus::Degraded
        } else {
            PipelineStatus::Completed
        };

        let processing_time = elapsed_ms(start);
        debug!(?status, tone = %tone.tone(), confidence = tone.confidence(), processing_time, "pipeline finished");

        PipelineReport {
            status,
            quality,
            region: Some(RegionSummary {
                bounding_box: region.bounding_box,
                landmarks: region.landmarks,
                processing_time: region.processing_time,
                degraded: region_degraded,
            }),
            awb: Some(awb),
            skin_color,
            tone: Some(tone),
            processing_time,
        }
    }

    /// Decode and analyze an encoded photo; undecodable bytes are rejected
    pub fn run_encoded(&self, bytes: &[u8], face: Option<&DetectedFace>) -> PipelineReport {
        match decode_image(bytes) {
            Ok(image) => self.run(&image, face),
            Err(e) => PipelineReport::rejected(QualityReport::rejected(format!("Could not decode image: {}", e), None)),
        }
    }

    /// Load and analyze a photo from disk; unreadable files are rejected
    pub fn run_path(&self, path: &Path, face: Option<&DetectedFace>) -> PipelineReport {
        match load_image(path) {
            Ok(image) => self.run(&image, face),
            Err(e) => PipelineReport::rejected(QualityReport::rejected(format!("Could not load image: {}", e), None)),
        }
    }

    /// Analyze independent images in parallel, one report per job in order
    pub fn run_batch(&self, jobs: &[PipelineJob]) -> Vec<PipelineReport> {
        jobs.par_iter().map(|job| self.run(&job.image, job.face.as_ref())).collect()
    }

    fn extract_region(&self, image: &RawImageBuffer, face: &DetectedFace) -> (FaceRegion, Option<DegradedReason>) {
        match guarded("region", || self.extractor.extract(image, face)) {
            Ok(region) => (region, None),
            Err(e) => {
                warn!(error = %e, "region extraction fell back to the whole frame");
                let region = FaceRegion {
                    image_data: image.clone(),
                    bounding_box: BoundingBox::new(0, 0, image.width(), image.height()),
                    landmarks: face.landmarks.clone(),
                    processing_time: 0.0,
                };
                (region, Some(DegradedReason::internal(e.to_string())))
            }
        }
    }

    fn correct_white_balance(&self, region: &RawImageBuffer) -> AwbResult {
        let config = &self.config.awb;
        if config.timeout_ms > 0 {
            return process_awb_correction_with_timeout(region, config, Duration::from_millis(config.timeout_ms));
        }
        match panic::catch_unwind(AssertUnwindSafe(|| process_awb_correction(region, config))) {
            Ok(result) => result,
            Err(_) => AwbResult::fallback(region, DegradedReason::internal("White balance panicked")),
        }
    }

    /// Representative skin color, falling back to the whole region
    fn skin_color(&self, corrected: &RawImageBuffer, mask: Option<SkinMask>) -> Option<SkinColorStage> {
        let mask = mask.unwrap_or_else(|| {
            let detected = detect_skin_mask(corrected, &self.config.awb.skin_thresholds);
            if self.config.awb.clean_mask {
                clean_skin_mask(&detected)
            } else {
                detected
            }
        });

        let failure = match guarded("skin color", || self.analyzer.extract(corrected, Some(&mask))) {
            Ok(sample) => {
                return Some(SkinColorStage {
                    sample,
                    source: SkinColorSource::SkinMask,
                    degraded: None,
                })
            }
            Err(e) => e,
        };

        let reason = match failure {
            AnalysisError::InsufficientSkin { .. } => DegradedReason::InsufficientSkinCoverage {
                ratio: mask.skin_ratio(),
                minimum: self.config.awb.min_skin_ratio,
            },
            other => DegradedReason::internal(other.to_string()),
        };
        warn!(?reason, "skin color fell back to the whole region");

        let sample = guarded("skin color", || self.analyzer.extract(corrected, None))
            .ok()
            .or_else(|| whole_region_sample(corrected))?;
        Some(SkinColorStage {
            sample,
            source: SkinColorSource::WholeRegion,
            degraded: Some(reason),
        })
    }

    fn classify(&self, skin_color: Option<&SkinColorStage>, upstream_degraded: bool) -> ToneAnalysis {
        let outcome = match skin_color {
            Some(stage) => guarded("tone", || self.classifier.analyze(&stage.sample.lab)),
            None => Err(AnalysisError::processing("No skin color available")),
        };

        match outcome {
            Ok(mut analysis) => {
                if upstream_degraded {
                    analysis.classification = analysis.classification.scaled(fallback::PARTIAL_MULTIPLIER);
                }
                analysis
            }
            Err(e) => {
                warn!(error = %e, "tone classification fell back to the default tone");
                let mut analysis = generate_mock_result(FALLBACK_TONE);
                analysis.classification.confidence = fallback::STAGE_CONFIDENCE * 100.0;
                analysis.degraded = Some(DegradedReason::internal(e.to_string()));
                analysis
            }
        }
    }
}

/// Analyze a decoded frame with the default configuration
pub fn analyze_skin_tone(image: &RawImageBuffer, face: Option<&DetectedFace>) -> Result<PipelineReport> {
    Ok(SkinTonePipeline::new(PipelineConfig::default())?.run(image, face))
}

/// Decode and analyze an encoded photo with the default configuration
pub fn analyze_image_bytes(bytes: &[u8], face: Option<&DetectedFace>) -> Result<PipelineReport> {
    Ok(SkinTonePipeline::new(PipelineConfig::default())?.run_encoded(bytes, face))
}

fn guarded<T>(stage: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::processing(format!("{} stage panicked", stage))),
    }
}

fn whole_region_sample(image: &RawImageBuffer) -> Option<SkinColorSample> {
    let mean_rgb = image.mean_rgb()?;
    Some(SkinColorSample {
        lab: rgb_f64_to_lab(mean_rgb),
        mean_rgb,
        variance: 0.0,
        pixel_count: image.pixel_count(),
        confidence: fallback::STAGE_CONFIDENCE,
    })
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::white_balance::AwbMethod;
    use crate::color::lab::LabColor;
    use crate::config::QualityConfig;
    use crate::detection::face_region::FaceBox;

    /// Textured skin patch inside a darker gray frame
    fn portrait(size: u32) -> RawImageBuffer {
        let lo = size / 4;
        let hi = size - size / 4;
        RawImageBuffer::from_fn(size, size, |x, y| {
            let inside = (lo..hi).contains(&x) && (lo..hi).contains(&y);
            match (inside, (x + y) % 2 == 0) {
                (true, true) => [226, 180, 152],
                (true, false) => [214, 168, 140],
                (false, true) => [110, 110, 110],
                (false, false) => [70, 70, 70],
            }
        })
    }

    fn pipeline() -> SkinTonePipeline {
        SkinTonePipeline::new(PipelineConfig::default()).unwrap()
    }

    fn centered_face() -> DetectedFace {
        DetectedFace::new(FaceBox::new(80.0, 80.0, 160.0, 160.0), LandmarkSet::default(), 0.95)
    }

    fn skin_stage() -> SkinColorStage {
        SkinColorStage {
            sample: whole_region_sample(&RawImageBuffer::filled(4, 4, [214, 170, 142])).unwrap(),
            source: SkinColorSource::SkinMask,
            degraded: None,
        }
    }

    #[test]
    fn test_completed_run() {
        let image = portrait(320);
        let report = pipeline().run(&image, Some(&centered_face()));

        assert_eq!(report.status, PipelineStatus::Completed, "{:?}", report.quality.primary_issue);
        let awb = report.awb.as_ref().unwrap();
        assert!(awb.skin_detection.detected);
        assert_eq!(awb.method, AwbMethod::SkinAware);
        let skin = report.skin_color.as_ref().unwrap();
        assert_eq!(skin.source, SkinColorSource::SkinMask);
        let confidence = report.confidence().unwrap();
        assert!(confidence > 0.0 && confidence <= 100.0);
        assert!(report.tone().is_some());
    }

    #[test]
    fn test_quality_fallback_degrades_and_scales_tone() {
        let image = portrait(320);
        let clean = pipeline().run(&image, Some(&centered_face()));
        assert_eq!(clean.status, PipelineStatus::Completed);

        let unmeasurable = SkinTonePipeline {
            gate: QualityGate::new(QualityConfig {
                sharpness_variance_per_point: f32::NAN,
                ..QualityConfig::default()
            }),
            ..pipeline()
        };
        let report = unmeasurable.run(&image, Some(&centered_face()));

        assert_eq!(report.status, PipelineStatus::Degraded);
        assert!((report.quality.confidence - 0.5).abs() < 1e-6);
        assert!(matches!(report.quality.degraded, Some(DegradedReason::InternalFailure { .. })));
        assert_eq!(report.tone(), clean.tone());
        let expected = clean.confidence().unwrap() * fallback::PARTIAL_MULTIPLIER;
        assert!((report.confidence().unwrap() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_region_fallback_uses_whole_frame() {
        let image = RawImageBuffer::new(Vec::new(), 0, 12, 3).unwrap();
        let face = DetectedFace::full_frame(0, 12);
        let (region, degraded) = pipeline().extract_region(&image, &face);

        assert_eq!(region.bounding_box, BoundingBox::new(0, 0, 0, 12));
        assert_eq!(region.image_data, image);
        assert!(matches!(degraded, Some(DegradedReason::InternalFailure { .. })));
    }

    #[test]
    fn test_tone_fallback_is_marked_default() {
        let p = pipeline();
        let mut unusable = skin_stage();
        unusable.sample.lab = LabColor::new(f32::NAN, 0.0, 0.0);

        for analysis in [p.classify(None, false), p.classify(Some(&unusable), false)] {
            assert_eq!(analysis.tone(), FALLBACK_TONE);
            assert!(analysis.is_mock);
            assert!((analysis.confidence() - 50.0).abs() < 1e-4);
            assert!(matches!(analysis.degraded, Some(DegradedReason::InternalFailure { .. })));
        }
    }

    #[test]
    fn test_upstream_degradation_scales_measured_tone() {
        let p = pipeline();
        let measured = p.classify(Some(&skin_stage()), false);
        let scaled = p.classify(Some(&skin_stage()), true);

        assert!(measured.degraded.is_none());
        assert_eq!(scaled.tone(), measured.tone());
        assert!((scaled.confidence() - measured.confidence() * 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_rejected_run_stops_early() {
        let report = pipeline().run(&RawImageBuffer::filled(320, 320, [128, 128, 128]), None);
        assert_eq!(report.status, PipelineStatus::Rejected);
        assert!(report.awb.is_none());
        assert!(report.tone.is_none());
        assert!(report.region.is_none());
    }

    #[test]
    fn test_no_skin_falls_back_to_whole_region() {
        let image = RawImageBuffer::from_fn(320, 320, |x, y| {
            if (x + y) % 2 == 0 {
                [90, 140, 200]
            } else {
                [60, 110, 170]
            }
        });
        let report = pipeline().run(&image, None);
        assert_eq!(report.status, PipelineStatus::Degraded);
        let skin = report.skin_color.as_ref().unwrap();
        assert_eq!(skin.source, SkinColorSource::WholeRegion);
        assert!(matches!(
            skin.degraded,
            Some(DegradedReason::InsufficientSkinCoverage { .. })
        ));
        assert!(report.tone.as_ref().unwrap().confidence() <= 80.0);
    }

    #[test]
    fn test_undecodable_bytes_rejected() {
        let report = pipeline().run_encoded(b"not a photo", None);
        assert!(report.is_rejected());
        assert!(report.quality.primary_issue.unwrap().starts_with("Could not decode image"));
    }

    #[test]
    fn test_missing_file_rejected() {
        let report = pipeline().run_path(Path::new("/nonexistent/portrait.jpg"), None);
        assert!(report.is_rejected());
        assert!(report.quality.primary_issue.unwrap().starts_with("Could not load image"));
    }

    #[test]
    fn test_batch_preserves_order() {
        let jobs = vec![
            PipelineJob::new(portrait(320), None),
            PipelineJob::new(RawImageBuffer::filled(320, 320, [128, 128, 128]), None),
            PipelineJob::new(portrait(256), None),
        ];
        let reports = pipeline().run_batch(&jobs);
        assert_eq!(reports.len(), 3);
        assert!(!reports[0].is_rejected());
        assert!(reports[1].is_rejected());
        assert!(!reports[2].is_rejected());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.awb.strength = 2.0;
        assert!(SkinTonePipeline::new(config).is_err());
    }

    #[test]
    fn test_report_json_keys() {
        let report = pipeline().run(&portrait(320), None);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["status"].is_string());
        assert!(json["awb"]["skinDetection"]["detected"].is_boolean());
        assert!(json["tone"]["classification"]["toneScores"].is_object());
        assert!(json["quality"]["colorTemperature"]["kelvin"].is_number());
        assert!(json["skinColor"]["sample"]["lab"]["L"].is_number());
    }
}
