//! Twelve-tone reference colors
//!
//! Each tone has a reference skin color in Lab and a regional adjustment
//! that is always added before any distance comparison. The standard table
//! is built once and shared read-only.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::color::lab::{LabColor, LabDelta};
use crate::tone::types::TwelveTone;
use crate::{AnalysisError, Result};

/// Version tag of the built-in table
pub const STANDARD_TABLE_VERSION: &str = "kr-2024.1";

/// Reference skin color per tone, before regional adjustment
pub const STANDARD_REFERENCES: [(TwelveTone, LabColor); 12] = [
    (TwelveTone::LightSpring, LabColor::new(75.0, 10.0, 21.0)),
    (TwelveTone::BrightSpring, LabColor::new(68.0, 14.0, 28.0)),
    (TwelveTone::MuteSpring, LabColor::new(66.0, 10.0, 18.0)),
    (TwelveTone::LightSummer, LabColor::new(73.0, 12.0, 13.0)),
    (TwelveTone::BrightSummer, LabColor::new(67.0, 20.0, 17.0)),
    (TwelveTone::MuteSummer, LabColor::new(64.0, 13.0, 13.0)),
    (TwelveTone::MuteAutumn, LabColor::new(60.0, 11.0, 20.0)),
    (TwelveTone::DeepAutumn, LabColor::new(52.0, 12.0, 21.0)),
    (TwelveTone::BrightAutumn, LabColor::new(58.0, 16.0, 28.0)),
    (TwelveTone::BrightWinter, LabColor::new(58.0, 24.0, 14.0)),
    (TwelveTone::DeepWinter, LabColor::new(48.0, 15.0, 11.0)),
    (TwelveTone::LightWinter, LabColor::new(62.0, 14.0, 9.0)),
];

/// Offsets correcting the reference population toward Korean skin
///
/// Korean skin reads slightly more yellow and slightly less red than the
/// reference population at the same lightness.
pub const KOREAN_ADJUSTMENTS: [(TwelveTone, LabDelta); 12] = [
    (TwelveTone::LightSpring, LabDelta::new(-1.0, -0.5, 1.5)),
    (TwelveTone::BrightSpring, LabDelta::new(-0.5, -1.0, 1.0)),
    (TwelveTone::MuteSpring, LabDelta::new(-1.0, -0.5, 1.5)),
    (TwelveTone::LightSummer, LabDelta::new(-1.5, -1.0, 2.0)),
    (TwelveTone::BrightSummer, LabDelta::new(-1.0, -1.5, 1.5)),
    (TwelveTone::MuteSummer, LabDelta::new(-1.0, -1.0, 1.5)),
    (TwelveTone::MuteAutumn, LabDelta::new(0.0, -0.5, 1.0)),
    (TwelveTone::DeepAutumn, LabDelta::new(0.5, -0.5, 0.5)),
    (TwelveTone::BrightAutumn, LabDelta::new(0.0, -1.0, 1.0)),
    (TwelveTone::BrightWinter, LabDelta::new(-0.5, -2.0, 1.5)),
    (TwelveTone::DeepWinter, LabDelta::new(0.5, -1.0, 1.0)),
    (TwelveTone::LightWinter, LabDelta::new(-1.0, -1.0, 2.0)),
];

/// Adjusted standard reference of `tone`, without building a table
pub fn standard_adjusted(tone: TwelveTone) -> LabColor {
    let index = tone as usize;
    STANDARD_REFERENCES[index].1.shifted(KOREAN_ADJUSTMENTS[index].1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneReferenceEntry {
    pub tone: TwelveTone,
    pub reference: LabColor,
    #[serde(default)]
    pub adjustment: LabDelta,
}

impl ToneReferenceEntry {
    pub fn adjusted(&self) -> LabColor {
        self.reference.shifted(self.adjustment)
    }
}

/// Versioned reference table, one entry per tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneReferenceTable {
    pub version: String,
    pub entries: Vec<ToneReferenceEntry>,
}

impl ToneReferenceTable {
    /// The built-in table with regional adjustments
    pub fn standard() -> &'static ToneReferenceTable {
        static STANDARD: OnceLock<ToneReferenceTable> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let entries = STANDARD_REFERENCES
                .iter()
                .map(|&(tone, reference)| ToneReferenceEntry {
                    tone,
                    reference,
                    adjustment: KOREAN_ADJUSTMENTS
                        .iter()
                        .find(|(t, _)| *t == tone)
                        .map_or(LabDelta::ZERO, |&(_, delta)| delta),
                })
                .collect();
            ToneReferenceTable {
                version: STANDARD_TABLE_VERSION.to_string(),
                entries,
            }
        })
    }

    /// Check that every tone appears exactly once with finite values
    pub fn validate(&self) -> Result<()> {
        for tone in TwelveTone::ALL {
            let count = self.entries.iter().filter(|e| e.tone == tone).count();
            if count != 1 {
                return Err(AnalysisError::invalid_parameter(
                    "tone.referenceTable",
                    format!("{} entries for {}", count, tone),
                ));
            }
        }
        if self.entries.len() != TwelveTone::ALL.len() {
            return Err(AnalysisError::invalid_parameter(
                "tone.referenceTable",
                format!("{} entries", self.entries.len()),
            ));
        }
        if let Some(bad) = self.entries.iter().find(|e| !e.adjusted().is_finite()) {
            return Err(AnalysisError::invalid_parameter(
                "tone.referenceTable",
                format!("non-finite reference for {}", bad.tone),
            ));
        }
        Ok(())
    }

    pub fn entry(&self, tone: TwelveTone) -> Option<&ToneReferenceEntry> {
        self.entries.iter().find(|e| e.tone == tone)
    }

    /// Adjusted reference color of `tone`
    pub fn adjusted(&self, tone: TwelveTone) -> Option<LabColor> {
        self.entry(tone).map(ToneReferenceEntry::adjusted)
    }

    /// Every tone with its adjusted reference, in table order
    pub fn adjusted_references(&self) -> Vec<(TwelveTone, LabColor)> {
        self.entries.iter().map(|e| (e.tone, e.adjusted())).collect()
    }
}
