//! CIE L*a*b* values and the metrics derived from them
//!
//! Chroma, hue and ITA are always recomputed from `{L, a, b}`; nothing
//! derived is stored alongside a [`LabColor`].

use palette::Lab;
use serde::{Deserialize, Serialize};

/// Lab color representation used across the pipeline.
///
/// Uses CIE L*a*b* coordinates under D65, `L` in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    #[serde(rename = "L")]
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

/// Additive Lab offset, e.g. a regional reference adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LabDelta {
    #[serde(rename = "dL")]
    pub dl: f32,
    #[serde(rename = "da")]
    pub da: f32,
    #[serde(rename = "db")]
    pub db: f32,
}

impl LabDelta {
    pub const ZERO: LabDelta = LabDelta::new(0.0, 0.0, 0.0);

    pub const fn new(dl: f32, da: f32, db: f32) -> Self {
        Self { dl, da, db }
    }
}

impl LabColor {
    pub const fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }

    /// Chroma `sqrt(a² + b²)`
    pub fn chroma(&self) -> f32 {
        self.a.hypot(self.b)
    }

    /// Hue angle `atan2(b, a)` in degrees, normalized to `[0, 360)`
    pub fn hue(&self) -> f32 {
        let mut h = self.b.atan2(self.a).to_degrees();
        if h < 0.0 {
            h += 360.0;
        }
        // tiny negative angles round up to exactly 360 in f32
        if h >= 360.0 {
            h -= 360.0;
        }
        h
    }

    /// Individual Typology Angle `atan((L − 50) / b)` in degrees
    ///
    /// Returns ±90 when `b` is zero.
    pub fn ita(&self) -> f32 {
        let dl = self.l - 50.0;
        if self.b.abs() < f32::EPSILON {
            return 90.0_f32.copysign(dl);
        }
        (dl / self.b).atan().to_degrees()
    }

    /// Apply an additive offset
    pub fn shifted(&self, delta: LabDelta) -> LabColor {
        LabColor::new(self.l + delta.dl, self.a + delta.da, self.b + delta.db)
    }

    pub fn is_finite(&self) -> bool {
        self.l.is_finite() && self.a.is_finite() && self.b.is_finite()
    }
}

impl From<LabColor> for Lab {
    fn from(color: LabColor) -> Self {
        Lab::new(color.l, color.a, color.b)
    }
}

impl From<Lab> for LabColor {
    fn from(lab: Lab) -> Self {
        LabColor::new(lab.l, lab.a, lab.b)
    }
}

/// Skin brightness band from the Individual Typology Angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinBrightness {
    VeryLight,
    Light,
    Intermediate,
    Tan,
    Brown,
    Dark,
}

impl SkinBrightness {
    /// Chardon ITA bands: >55, 41-55, 28-41, 10-28, -30-10, <-30
    pub fn from_ita(ita: f32) -> Self {
        if ita > 55.0 {
            SkinBrightness::VeryLight
        } else if ita > 41.0 {
            SkinBrightness::Light
        } else if ita > 28.0 {
            SkinBrightness::Intermediate
        } else if ita > 10.0 {
            SkinBrightness::Tan
        } else if ita > -30.0 {
            SkinBrightness::Brown
        } else {
            SkinBrightness::Dark
        }
    }
}
