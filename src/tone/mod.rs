//! Twelve-tone seasonal classification
//!
//! Maps a corrected skin color in Lab to one of twelve seasonal tones, with
//! scores against every adjusted reference and a margin-based confidence.

pub mod classifier;
pub mod mock;
pub mod reference;
pub mod types;

pub use classifier::{
    calculate_tone_scores, classify_tone, determine_season, determine_subtype, determine_undertone, ToneAnalysis,
    ToneClassification, ToneClassifier,
};
pub use mock::{generate_mock_classification, generate_mock_result};
pub use reference::{ToneReferenceEntry, ToneReferenceTable, KOREAN_ADJUSTMENTS};
pub use types::{compose_twelve_tone, parse_twelve_tone, ParsedTone, Season, Subtype, TwelveTone, Undertone};
