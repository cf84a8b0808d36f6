// src/normalize.rs - maps crop-local detections back into full-frame space
use crate::landmark::{Candidate, RawDetection, Region, HAND_LANDMARK_COUNT};

/// Translates raw detections from `region` into full-frame coordinates.
///
/// Only the x axis moves: crops are taken side by side at full height. Detections that violate
/// the 21-landmark contract are dropped here and never reach the deduplicator or the assigner.
/// The input is left untouched; every output is a fresh [`Candidate`].
pub fn normalize_region(
    region: Region,
    frame_width: u32,
    detections: &[RawDetection],
) -> Vec<Candidate> {
    let dx = region.x_offset(frame_width);

    detections
        .iter()
        .filter(|det| {
            if det.landmarks.len() != HAND_LANDMARK_COUNT {
                tracing::warn!(
                    region = region.as_str(),
                    landmarks = det.landmarks.len(),
                    "dropping malformed detection"
                );
                return false;
            }
            true
        })
        .map(|det| Candidate {
            landmarks: det
                .landmarks
                .iter()
                .map(|lm| {
                    let mut lm = *lm;
                    lm.x += dx;
                    lm
                })
                .collect(),
            confidence: det.confidence,
            bounding_box: det.bounding_box.translated(dx, 0.0),
            source_region: region,
        })
        .collect()
}

/// Normalizes the three per-region detection lists and concatenates them in
/// full, left-half, right-half order.
pub fn normalize_frame(
    frame_width: u32,
    full: &[RawDetection],
    left_half: &[RawDetection],
    right_half: &[RawDetection],
) -> Vec<Candidate> {
    let mut candidates = normalize_region(Region::Full, frame_width, full);
    candidates.extend(normalize_region(Region::LeftHalf, frame_width, left_half));
    candidates.extend(normalize_region(Region::RightHalf, frame_width, right_half));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{BoundingBox, Landmark};
    use nalgebra::Vector2;

    fn raw_at(x: f64, y: f64) -> RawDetection {
        RawDetection {
            landmarks: vec![Landmark::new(x, y, 0.5); HAND_LANDMARK_COUNT],
            confidence: 0.9,
            bounding_box: BoundingBox::new(Vector2::new(x - 5.0, y - 5.0), Vector2::new(x + 5.0, y + 5.0)),
        }
    }

    #[test]
    fn right_half_shifts_by_half_width() {
        let raw = vec![raw_at(10.0, 20.0)];
        let out = normalize_region(Region::RightHalf, 640, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].landmarks[0], Landmark::new(330.0, 20.0, 0.5));
        assert_eq!(out[0].bounding_box.top_left, Vector2::new(325.0, 15.0));
        assert_eq!(out[0].bounding_box.bottom_right, Vector2::new(335.0, 25.0));
        assert_eq!(out[0].source_region, Region::RightHalf);

        // raw detections are not modified in place
        assert_eq!(raw[0].landmarks[0].x, 10.0);
    }

    #[test]
    fn full_and_left_pass_through() {
        let raw = vec![raw_at(10.0, 20.0)];
        for region in [Region::Full, Region::LeftHalf] {
            let out = normalize_region(region, 640, &raw);
            assert_eq!(out[0].landmarks, raw[0].landmarks);
            assert_eq!(out[0].bounding_box, raw[0].bounding_box);
            assert_eq!(out[0].source_region, region);
        }
    }

    #[test]
    fn empty_region_is_empty() {
        assert!(normalize_region(Region::RightHalf, 640, &[]).is_empty());
    }

    #[test]
    fn malformed_detections_are_dropped() {
        let mut short = raw_at(1.0, 1.0);
        short.landmarks.truncate(20);
        let out = normalize_region(Region::Full, 640, &[short, raw_at(2.0, 2.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].landmarks[0].x, 2.0);
    }

    #[test]
    fn frame_order_is_full_left_right() {
        let out = normalize_frame(640, &[raw_at(1.0, 0.0)], &[raw_at(2.0, 0.0)], &[raw_at(3.0, 0.0)]);
        let regions: Vec<_> = out.iter().map(|c| c.source_region).collect();
        assert_eq!(regions, [Region::Full, Region::LeftHalf, Region::RightHalf]);
        assert_eq!(out[2].landmarks[0].x, 323.0);
    }
}
