//! Twelve-tone classification of a skin color
//!
//! The heuristic stages (undertone, season, subtype) describe the color; the
//! classification itself is the arg-max of similarity scores against every
//! adjusted reference.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::color::difference::DistanceMetric;
use crate::color::lab::{LabColor, SkinBrightness};
use crate::config::ToneConfig;
use crate::constants::tone;
use crate::error::{AnalysisError, DegradedReason, Result};
use crate::tone::reference::ToneReferenceTable;
use crate::tone::types::{Season, Subtype, TwelveTone, Undertone};

/// Classification result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneClassification {
    pub tone: TwelveTone,
    /// 0-100
    pub confidence: f32,
    /// Similarity to every tone, 0-100
    pub tone_scores: BTreeMap<TwelveTone, f32>,
    pub is_mock: bool,
}

impl ToneClassification {
    pub fn score(&self, tone: TwelveTone) -> Option<f32> {
        self.tone_scores.get(&tone).copied()
    }

    /// Same classification with confidence multiplied by `factor`
    pub fn scaled(mut self, factor: f32) -> Self {
        self.confidence = (self.confidence * factor).clamp(0.0, 100.0);
        self
    }
}

/// Full description of a skin color
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneAnalysis {
    pub lab: LabColor,
    pub chroma: f32,
    pub hue: f32,
    pub ita: f32,
    pub skin_brightness: SkinBrightness,
    pub undertone: Undertone,
    pub season: Season,
    pub subtype: Subtype,
    /// Tone named by the heuristic stages alone
    pub heuristic_tone: TwelveTone,
    pub classification: ToneClassification,
    /// Milliseconds
    pub processing_time: f64,
    pub is_mock: bool,
    pub degraded: Option<DegradedReason>,
}

impl ToneAnalysis {
    pub fn tone(&self) -> TwelveTone {
        self.classification.tone
    }

    pub fn confidence(&self) -> f32 {
        self.classification.confidence
    }
}

/// Warm, cool or neutral from hue and chroma
pub fn determine_undertone(lab: &LabColor) -> Undertone {
    if lab.chroma() < tone::NEUTRAL_CHROMA_MAX {
        return Undertone::Neutral;
    }
    let hue = lab.hue();
    if hue >= tone::WARM_HUE_MIN {
        Undertone::Warm
    } else if hue < tone::COOL_HUE_MAX {
        Undertone::Cool
    } else {
        Undertone::Neutral
    }
}

/// Season from undertone and lightness band
pub fn determine_season(lab: &LabColor, undertone: Undertone) -> Season {
    let warm = match undertone {
        Undertone::Warm => true,
        Undertone::Cool => false,
        Undertone::Neutral => lab.hue() >= tone::NEUTRAL_HUE_SPLIT,
    };
    let light = lab.l >= tone::LIGHT_BAND_L_MIN;
    match (warm, light) {
        (true, true) => Season::Spring,
        (true, false) => Season::Autumn,
        (false, true) => Season::Summer,
        (false, false) => Season::Winter,
    }
}

/// Subtype from chroma and ITA, snapped onto the season's valid subtypes
pub fn determine_subtype(lab: &LabColor, season: Season) -> Subtype {
    let ita = lab.ita();
    let raw = if lab.chroma() >= tone::BRIGHT_CHROMA_MIN {
        Subtype::Bright
    } else if ita >= tone::LIGHT_ITA_MIN {
        Subtype::Light
    } else if ita < tone::DEEP_ITA_MAX {
        Subtype::Deep
    } else {
        Subtype::Mute
    };
    season.nearest_subtype(raw)
}

/// Similarity `100 / (1 + d / 10)` for a color distance `d`
pub fn distance_to_score(distance: f32) -> f32 {
    100.0 / (1.0 + distance.max(0.0) / tone::DISTANCE_SCALE)
}

/// Confidence from the best score and its margin over the runner-up
pub fn tone_confidence(best: f32, second: f32) -> f32 {
    let margin = (best - second).max(0.0);
    let confidence = best * (0.5 + 0.5 * (1.0 - (-margin / tone::MARGIN_SCALE).exp()));
    confidence.clamp(0.0, 100.0)
}

/// Score `lab` against every adjusted reference in `table`
pub fn calculate_tone_scores(
    lab: &LabColor,
    table: &ToneReferenceTable,
    metric: DistanceMetric,
) -> BTreeMap<TwelveTone, f32> {
    score_references(lab, &table.adjusted_references(), metric)
}

fn score_references(
    lab: &LabColor,
    references: &[(TwelveTone, LabColor)],
    metric: DistanceMetric,
) -> BTreeMap<TwelveTone, f32> {
    references
        .iter()
        .map(|(tone, reference)| (*tone, distance_to_score(metric.distance(lab, reference))))
        .collect()
}

/// Best tone and confidence from a complete score map
fn pick_best(scores: &BTreeMap<TwelveTone, f32>) -> Option<(TwelveTone, f32)> {
    let mut ranked: Vec<(TwelveTone, f32)> = scores.iter().map(|(t, s)| (*t, *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let (best_tone, best) = *ranked.first()?;
    let second = ranked.get(1).map_or(0.0, |r| r.1);
    Some((best_tone, tone_confidence(best, second)))
}

/// Classifier over a fixed set of adjusted references
#[derive(Debug, Clone)]
pub struct ToneClassifier {
    metric: DistanceMetric,
    references: Vec<(TwelveTone, LabColor)>,
}

impl Default for ToneClassifier {
    fn default() -> Self {
        Self::new(ToneReferenceTable::standard(), DistanceMetric::default())
    }
}

impl ToneClassifier {
    pub fn new(table: &ToneReferenceTable, metric: DistanceMetric) -> Self {
        Self {
            metric,
            references: table.adjusted_references(),
        }
    }

    /// Build from configuration, validating a custom table
    pub fn from_config(config: &ToneConfig) -> Result<Self> {
        match &config.reference_table {
            Some(table) => {
                table.validate()?;
                Ok(Self::new(table, config.metric))
            }
            None => Ok(Self::new(ToneReferenceTable::standard(), config.metric)),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn classify(&self, lab: &LabColor) -> Result<ToneClassification> {
        if !lab.is_finite() {
            return Err(AnalysisError::invalid_parameter("lab", format!("{:?}", lab)));
        }

        let tone_scores = score_references(lab, &self.references, self.metric);
        let (tone, confidence) = pick_best(&tone_scores)
            .ok_or_else(|| AnalysisError::processing("Reference table is empty"))?;

        Ok(ToneClassification {
            tone,
            confidence,
            tone_scores,
            is_mock: false,
        })
    }

    /// Heuristic description plus classification
    pub fn analyze(&self, lab: &LabColor) -> Result<ToneAnalysis> {
        let start = Instant::now();
        let classification = self.classify(lab)?;

        let undertone = determine_undertone(lab);
        let season = determine_season(lab, undertone);
        let subtype = determine_subtype(lab, season);
        let heuristic_tone = TwelveTone::compose(season, subtype)?;
        let ita = lab.ita();

        debug!(
            tone = %classification.tone,
            heuristic = %heuristic_tone,
            confidence = classification.confidence,
            metric = ?self.metric,
            "tone classified"
        );

        Ok(ToneAnalysis {
            lab: *lab,
            chroma: lab.chroma(),
            hue: lab.hue(),
            ita,
            skin_brightness: SkinBrightness::from_ita(ita),
            undertone,
            season,
            subtype,
            heuristic_tone,
            classification,
            processing_time: start.elapsed().as_secs_f64() * 1000.0,
            is_mock: false,
            degraded: None,
        })
    }
}

/// Classify against the standard table with CIEDE2000
pub fn classify_tone(lab: &LabColor) -> Result<ToneClassification> {
    ToneClassifier::default().classify(lab)
}
