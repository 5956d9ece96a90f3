//! Mock classifications for a known tone
//!
//! Scores are real similarities of the tone's own reference against the
//! standard table, so a mock ranks like a measurement would. Confidence is
//! fixed and `is_mock` is always set.

use crate::color::difference::DistanceMetric;
use crate::color::lab::SkinBrightness;
use crate::constants::tone::MOCK_CONFIDENCE;
use crate::tone::classifier::{calculate_tone_scores, ToneAnalysis, ToneClassification};
use crate::tone::reference::{standard_adjusted, ToneReferenceTable};
use crate::tone::types::TwelveTone;

pub fn generate_mock_classification(tone: TwelveTone) -> ToneClassification {
    let lab = standard_adjusted(tone);
    ToneClassification {
        tone,
        confidence: MOCK_CONFIDENCE,
        tone_scores: calculate_tone_scores(&lab, ToneReferenceTable::standard(), DistanceMetric::default()),
        is_mock: true,
    }
}

pub fn generate_mock_result(tone: TwelveTone) -> ToneAnalysis {
    let lab = standard_adjusted(tone);
    let season = tone.season();
    let ita = lab.ita();
    ToneAnalysis {
        lab,
        chroma: lab.chroma(),
        hue: lab.hue(),
        ita,
        skin_brightness: SkinBrightness::from_ita(ita),
        undertone: season.undertone(),
        season,
        subtype: tone.subtype(),
        heuristic_tone: tone,
        classification: generate_mock_classification(tone),
        processing_time: 0.0,
        is_mock: true,
        degraded: None,
    }
}
