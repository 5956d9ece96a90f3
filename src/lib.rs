//! # Skin Tone ColorScan
//!
//! A Rust crate for calibrated skin tone analysis from digital photographs.
//!
//! This library turns a captured photo into a twelve-tone seasonal
//! classification by:
//! - Gating on capture quality (sharpness, exposure, resolution, color temperature)
//! - Extracting and padding the detected face region
//! - Detecting skin and applying skin-aware white balance correction
//! - Extracting a robust skin color and classifying it in CIE Lab
//!
//! Every stage degrades to a fallback with reduced confidence instead of
//! failing, and marks the result with a [`DegradedReason`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use skintone_colorscan::{analyze_image_bytes, PipelineStatus};
//!
//! let bytes = std::fs::read("portrait.jpg")?;
//! let report = analyze_image_bytes(&bytes, None)?;
//! if report.status != PipelineStatus::Rejected {
//!     println!("Tone: {:?}, confidence: {:?}", report.tone(), report.confidence());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod buffer;
pub mod calibration;
pub mod color;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod image_loader;
pub mod pipeline;
pub mod quality;
pub mod tone;

pub use buffer::RawImageBuffer;
pub use calibration::{AwbGains, AwbMethod, AwbResult};
pub use color::{LabColor, LabDelta};
pub use config::PipelineConfig;
pub use detection::{BoundingBox, DetectedFace, FaceBox, Landmark, LandmarkSet};
pub use error::{AnalysisError, DegradedReason, Result};
pub use pipeline::{
    analyze_image_bytes, analyze_skin_tone, PipelineJob, PipelineReport, PipelineStatus, SkinTonePipeline,
};
pub use quality::{QualityGate, QualityReport};
pub use tone::{Season, Subtype, ToneAnalysis, ToneClassification, TwelveTone};
