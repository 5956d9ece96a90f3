//! White balance and color calibration module
//!
//! This module handles illuminant estimation and skin-aware automatic
//! white balance so that skin color is measured under a neutral light.

pub mod awb;
pub mod illuminant;
pub mod white_balance;

pub use awb::{
    compute_awb_confidence, process_awb_correction, process_awb_correction_with_timeout, select_and_apply_awb,
    AwbMetadata, AwbResult, AwbSelection, SkinDetection,
};
pub use illuminant::{Illuminant, IlluminantEstimator};
pub use white_balance::{apply_gains, is_valid_gains, AwbGains, AwbMethod, WhiteBalanceEstimator};
