//! Property tests over arbitrary inputs

use proptest::prelude::*;

use skintone_colorscan::calibration::white_balance::is_valid_gains_within;
use skintone_colorscan::calibration::{apply_gains, AwbGains};
use skintone_colorscan::color::{ciede2000, lab_distance};
use skintone_colorscan::detection::{extract_region_from_image, get_padded_bounding_box, normalize_bounding_box, FaceBox};
use skintone_colorscan::tone::classify_tone;
use skintone_colorscan::{LabColor, RawImageBuffer};

fn lab() -> impl Strategy<Value = LabColor> {
    (0.0f32..100.0, -80.0f32..80.0, -80.0f32..80.0).prop_map(|(l, a, b)| LabColor::new(l, a, b))
}

fn rgba_image() -> impl Strategy<Value = RawImageBuffer> {
    (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |data| RawImageBuffer::new(data, w, h, 4).unwrap())
    })
}

proptest! {
    #[test]
    fn normalized_box_never_leaves_frame(
        x in -5000.0f32..5000.0,
        y in -5000.0f32..5000.0,
        w in -100.0f32..5000.0,
        h in -100.0f32..5000.0,
        width in 1u32..2000,
        height in 1u32..2000,
    ) {
        let bbox = normalize_bounding_box(&FaceBox::new(x, y, w, h), width, height);
        prop_assert!(bbox.width >= 1 && bbox.height >= 1);
        prop_assert!(bbox.x + bbox.width <= width);
        prop_assert!(bbox.y + bbox.height <= height);
    }

    #[test]
    fn padded_box_stays_in_frame(
        x in 0u32..300,
        y in 0u32..300,
        ratio in 0.0f32..3.0,
    ) {
        let inner = normalize_bounding_box(&FaceBox::new(x as f32, y as f32, 40.0, 60.0), 320, 320);
        let padded = get_padded_bounding_box(&inner, 320, 320, ratio);
        prop_assert!(padded.right() <= 320 && padded.bottom() <= 320);
        prop_assert!(padded.x <= inner.x && padded.y <= inner.y);
    }

    #[test]
    fn extracted_region_length_matches(
        x in 0.0f32..64.0,
        y in 0.0f32..48.0,
        w in 0.0f32..80.0,
        h in 0.0f32..80.0,
    ) {
        let image = RawImageBuffer::from_fn(64, 48, |px, py| [px as u8, py as u8, 128]);
        let bbox = normalize_bounding_box(&FaceBox::new(x, y, w, h), 64, 48);
        let region = extract_region_from_image(&image, &bbox).unwrap();
        prop_assert_eq!(
            region.data().len(),
            region.width() as usize * region.height() as usize * usize::from(region.channels())
        );
    }

    #[test]
    fn identity_gains_keep_pixels(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let image = RawImageBuffer::filled(4, 4, [r, g, b]);
        prop_assert_eq!(apply_gains(&image, &AwbGains::IDENTITY), image);
    }

    #[test]
    fn gains_saturate_and_keep_alpha(
        image in rgba_image(),
        r in 0.0f32..=4.0,
        g in 0.0f32..=4.0,
        b in 0.0f32..=4.0,
    ) {
        let gains = AwbGains::new(r, g, b);
        let corrected = apply_gains(&image, &gains);
        prop_assert_eq!(
            (corrected.width(), corrected.height(), corrected.channels()),
            (image.width(), image.height(), 4)
        );

        for (before, after) in image.data().chunks_exact(4).zip(corrected.data().chunks_exact(4)) {
            for (c, gain) in [r, g, b].into_iter().enumerate() {
                let expected = (f32::from(before[c]) * gain).round().min(255.0) as u8;
                prop_assert_eq!(after[c], expected);
            }
            prop_assert_eq!(after[3], before[3]);
        }
    }

    #[test]
    fn identity_gains_keep_rgba(image in rgba_image()) {
        prop_assert_eq!(apply_gains(&image, &AwbGains::IDENTITY), image);
    }

    #[test]
    fn out_of_range_gains_never_accepted(
        good in 0.01f32..=4.0,
        too_large in 4.0001f32..1.0e6,
        non_positive in -10.0f32..=0.0,
    ) {
        prop_assert!(is_valid_gains_within(&AwbGains::new(good, good, good), 4.0));
        prop_assert!(!is_valid_gains_within(&AwbGains::new(good, too_large, good), 4.0));
        prop_assert!(!is_valid_gains_within(&AwbGains::new(non_positive, good, good), 4.0));
        prop_assert!(!is_valid_gains_within(&AwbGains::new(good, good, f32::NAN), 4.0));
    }

    #[test]
    fn distances_are_symmetric(a in lab(), b in lab()) {
        prop_assert_eq!(lab_distance(&a, &b), lab_distance(&b, &a));
        prop_assert!((ciede2000(&a, &b) - ciede2000(&b, &a)).abs() < 1e-3);
        prop_assert_eq!(lab_distance(&a, &a), 0.0);
        prop_assert!(ciede2000(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn hue_in_range(color in lab()) {
        let hue = color.hue();
        prop_assert!((0.0..360.0).contains(&hue));
    }

    #[test]
    fn classification_is_bounded(color in lab()) {
        let result = classify_tone(&color).unwrap();
        prop_assert_eq!(result.tone_scores.len(), 12);
        prop_assert!(result.confidence >= 0.0 && result.confidence <= 100.0);
        prop_assert!(result.tone_scores.values().all(|s| *s > 0.0 && *s <= 100.0));
    }
}
