//! Error types for the skintone_colorscan library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for skintone_colorscan operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Comprehensive error types for skin tone analysis operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Image bytes could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Pixel buffer length does not match its declared dimensions
    #[error("Invalid pixel buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    /// Image has no pixels to analyze
    #[error("Image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Color space conversion or parsing error
    #[error("Color conversion error: {message}")]
    ColorConversionError { message: String },

    /// Tone identifier is not one of the twelve known tones
    #[error("Unknown tone identifier: {id}")]
    InvalidToneId { id: String },

    /// Season and subtype do not form one of the twelve tones
    #[error("No twelve-tone category for season '{season}' with subtype '{subtype}'")]
    InvalidToneCombination { season: String, subtype: String },

    /// Not enough skin pixels for a skin-based computation
    #[error("Insufficient skin pixels: {found} found (minimum {minimum})")]
    InsufficientSkin { found: usize, minimum: usize },

    /// Cooperative cancellation was requested for a running computation
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Time budget exceeded
    #[error("Timeout: {operation} exceeded {limit_ms}ms")]
    Timeout { operation: String, limit_ms: u64 },

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic processing error
    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

impl AnalysisError {
    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a generic processing error
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    /// Check if this error indicates a recoverable condition
    ///
    /// Recoverable errors are answered with a degraded fallback value;
    /// the rest mean the input itself cannot be analyzed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientSkin { .. }
                | AnalysisError::Timeout { .. }
                | AnalysisError::Cancelled { .. }
                | AnalysisError::ProcessingError { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::ImageLoadError { .. } | AnalysisError::InvalidBuffer { .. } => {
                "Could not read the photo. Please try capturing it again.".to_string()
            }
            AnalysisError::EmptyImage { .. } => {
                "The photo appears to be empty. Please capture a new one.".to_string()
            }
            AnalysisError::InsufficientSkin { .. } => {
                "Not enough skin is visible. Please make sure your face fills the frame.".to_string()
            }
            AnalysisError::Timeout { .. } => {
                "Analysis took too long. Results may be less precise.".to_string()
            }
            _ => "Skin tone analysis failed. Please try with a different photo.".to_string(),
        }
    }
}

/// Why a stage output is a best-effort fallback rather than a measured result
///
/// Every stage output carries `Option<DegradedReason>`; `None` marks a fully
/// trusted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedReason {
    /// The stage exceeded its time budget and was abandoned
    Timeout { budget_ms: u64 },
    /// Computed white balance gains were physically implausible
    InvalidGains { r: f32, g: f32, b: f32 },
    /// Too few skin pixels for a skin-based estimate
    InsufficientSkinCoverage { ratio: f32, minimum: f32 },
    /// The stage failed internally and substituted its fallback
    InternalFailure { message: String },
    /// The input could not be analyzed at all
    Rejected { reason: String },
}

impl DegradedReason {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalFailure {
            message: message.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

impl From<&AnalysisError> for DegradedReason {
    fn from(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::Timeout { limit_ms, .. } => DegradedReason::Timeout { budget_ms: *limit_ms },
            other => DegradedReason::internal(other.to_string()),
        }
    }
}
