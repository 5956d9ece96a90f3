//! Color difference metrics
//!
//! - CIE76: Euclidean distance in Lab
//! - CIEDE2000: perceptually weighted difference with lightness, chroma and
//!   hue compensation plus the blue-region rotation term
//!
//! Both metrics are symmetric and zero for identical inputs.

use serde::{Deserialize, Serialize};

use crate::color::lab::LabColor;

/// 25^7, shared by the chroma compensation terms
const POW25_7: f64 = 6_103_515_625.0;

/// Which color difference a classifier uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// CIE76 Euclidean distance
    Euclidean,
    /// CIEDE2000 with unit weighting factors
    #[default]
    Ciede2000,
}

impl DistanceMetric {
    pub fn distance(self, lab1: &LabColor, lab2: &LabColor) -> f32 {
        match self {
            DistanceMetric::Euclidean => lab_distance(lab1, lab2),
            DistanceMetric::Ciede2000 => ciede2000(lab1, lab2),
        }
    }
}

/// Euclidean distance in Lab (ΔE*ab, CIE76)
pub fn lab_distance(lab1: &LabColor, lab2: &LabColor) -> f32 {
    let dl = lab1.l - lab2.l;
    let da = lab1.a - lab2.a;
    let db = lab1.b - lab2.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// CIEDE2000 color difference with `kL = kC = kH = 1`
pub fn ciede2000(lab1: &LabColor, lab2: &LabColor) -> f32 {
    ciede2000_weighted(lab1, lab2, 1.0, 1.0, 1.0)
}

/// CIEDE2000 color difference with explicit parametric weighting factors
///
/// Follows Sharma, Wu & Dalal (2005), evaluated in f64.
pub fn ciede2000_weighted(lab1: &LabColor, lab2: &LabColor, k_l: f64, k_c: f64, k_h: f64) -> f32 {
    let (l1, a1, b1) = (f64::from(lab1.l), f64::from(lab1.a), f64::from(lab1.b));
    let (l2, a2, b2) = (f64::from(lab2.l), f64::from(lab2.a), f64::from(lab2.b));

    // a' rescaling from mean chroma
    let c_bar = (a1.hypot(b1) + a2.hypot(b2)) / 2.0;
    let c_bar7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());
    let a1p = (1.0 + g) * a1;
    let a2p = (1.0 + g) * a2;

    let c1p = a1p.hypot(b1);
    let c2p = a2p.hypot(b2);
    let h1p = hue_prime(b1, a1p);
    let h2p = hue_prime(b2, a2p);
    let chroma_product = c1p * c2p;

    // differences
    let delta_lp = l2 - l1;
    let delta_cp = c2p - c1p;
    let delta_hp = if chroma_product == 0.0 {
        0.0
    } else {
        let d = h2p - h1p;
        if d > 180.0 {
            d - 360.0
        } else if d < -180.0 {
            d + 360.0
        } else {
            d
        }
    };
    let delta_big_hp = 2.0 * chroma_product.sqrt() * (delta_hp.to_radians() / 2.0).sin();

    // means
    let l_bar_p = (l1 + l2) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let l_offset = (l_bar_p - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

    let term_l = delta_lp / (k_l * s_l);
    let term_c = delta_cp / (k_c * s_c);
    let term_h = delta_big_hp / (k_h * s_h);

    (term_l * term_l + term_c * term_c + term_h * term_h + r_t * term_c * term_h)
        .max(0.0)
        .sqrt() as f32
}

/// Hue angle in degrees `[0, 360)`, zero for achromatic input
fn hue_prime(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(l: f32, a: f32, b: f32) -> LabColor {
        LabColor::new(l, a, b)
    }

    #[test]
    fn test_delta_e_same_color() {
        let c = lab(50.0, 12.0, -7.0);
        assert_eq!(lab_distance(&c, &c), 0.0);
        assert_eq!(ciede2000(&c, &c), 0.0);
    }

    #[test]
    fn test_lab_distance_known_value() {
        let d = lab_distance(&lab(50.0, 0.0, 0.0), &lab(53.0, 4.0, 0.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_ciede2000_reference_pairs() {
        // Sharma, Wu & Dalal (2005) test data
        let cases = [
            (lab(50.0, 2.6772, -79.7751), lab(50.0, 0.0, -82.7485), 2.0425),
            (lab(50.0, 0.0, 0.0), lab(50.0, -1.0, 2.0), 2.3669),
            (lab(50.0, 2.5, 0.0), lab(73.0, 25.0, -18.0), 27.1492),
            (lab(60.2574, -34.0099, 36.2677), lab(60.4626, -34.1751, 39.4387), 1.2644),
        ];
        for (c1, c2, expected) in cases {
            let d = ciede2000(&c1, &c2);
            assert!((d - expected).abs() < 1e-3, "{:?} vs {:?}: {} != {}", c1, c2, d, expected);
        }
    }

    #[test]
    fn test_ciede2000_matches_palette() {
        use palette::color_difference::Ciede2000;
        use palette::Lab;

        let c1 = lab(65.0, 12.0, 20.0);
        let c2 = lab(58.0, 18.0, 11.0);
        let ours = ciede2000(&c1, &c2);
        let theirs = Lab::from(c1).difference(Lab::from(c2));
        assert!((ours - theirs).abs() < 1e-2, "{} vs {}", ours, theirs);
    }

    #[test]
    fn test_symmetry() {
        let c1 = lab(72.0, 10.0, 22.0);
        let c2 = lab(48.0, -15.0, 11.0);
        assert_eq!(lab_distance(&c1, &c2), lab_distance(&c2, &c1));
        assert!((ciede2000(&c1, &c2) - ciede2000(&c2, &c1)).abs() < 1e-6);
    }

    #[test]
    fn test_ciede2000_is_not_euclidean() {
        let c1 = lab(50.0, 2.5, 0.0);
        let c2 = lab(73.0, 25.0, -18.0);
        let euclid = lab_distance(&c1, &c2);
        let de00 = ciede2000(&c1, &c2);
        assert!((euclid - de00).abs() > 1.0);
    }

    #[test]
    fn test_metric_dispatch() {
        let c1 = lab(60.0, 10.0, 15.0);
        let c2 = lab(62.0, 12.0, 19.0);
        assert_eq!(DistanceMetric::Euclidean.distance(&c1, &c2), lab_distance(&c1, &c2));
        assert_eq!(DistanceMetric::Ciede2000.distance(&c1, &c2), ciede2000(&c1, &c2));
        assert_eq!(DistanceMetric::default(), DistanceMetric::Ciede2000);
    }
}
