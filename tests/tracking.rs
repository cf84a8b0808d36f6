//! End-to-end tracking scenarios over scripted detections.

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use image::{Rgb, RgbImage};
use nalgebra::Vector2;

use hand_tracker::landmark::HAND_LANDMARK_COUNT;
use hand_tracker::{
    BoundingBox, Deduplicator, DetectorError, Frame, FramePipeline, HandDetector, Landmark,
    PipelineConfig, RawDetection, Slot, TrackAssigner, TrackerConfig,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

const LEFT_TAG: Rgb<u8> = Rgb([255, 0, 0]);
const RIGHT_TAG: Rgb<u8> = Rgb([0, 0, 255]);

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn raw(x: f64, y: f64) -> RawDetection {
    RawDetection {
        landmarks: vec![Landmark::new(x, y, 0.0); HAND_LANDMARK_COUNT],
        confidence: 0.9,
        bounding_box: BoundingBox::new(Vector2::new(x - 40.0, y - 100.0), Vector2::new(x + 40.0, y)),
    }
}

/// Returns fixed detections per view. The views are told apart by size and by a colour tag
/// painted into each half of the frame.
struct ScriptedDetector {
    full: Vec<RawDetection>,
    left_half: Vec<RawDetection>,
    right_half: Vec<RawDetection>,
    slow_right: Option<Duration>,
}

impl ScriptedDetector {
    fn new(full: Vec<RawDetection>, left_half: Vec<RawDetection>, right_half: Vec<RawDetection>) -> Self {
        Self {
            full,
            left_half,
            right_half,
            slow_right: None,
        }
    }
}

impl HandDetector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, DetectorError> {
        if image.width() == WIDTH {
            return Ok(self.full.clone());
        }
        match *image.get_pixel(0, 0) {
            tag if tag == LEFT_TAG => Ok(self.left_half.clone()),
            tag if tag == RIGHT_TAG => {
                if let Some(delay) = self.slow_right {
                    std::thread::sleep(delay);
                }
                Ok(self.right_half.clone())
            }
            _ => Err(DetectorError::Inference("unknown view".into())),
        }
    }
}

fn tagged_frame(timestamp: Duration) -> Frame {
    let mut image = RgbImage::new(WIDTH, HEIGHT);
    image.put_pixel(0, 0, LEFT_TAG);
    image.put_pixel(WIDTH / 2, 0, RIGHT_TAG);
    Frame::new(image, timestamp)
}

fn pipeline(detector: ScriptedDetector, timeout_ms: u64) -> FramePipeline {
    FramePipeline::new(
        Arc::new(detector),
        TrackerConfig::default(),
        PipelineConfig {
            detect_timeout_ms: timeout_ms,
        },
    )
}

#[tokio::test]
async fn one_hand_seen_by_three_views_is_tracked_once() {
    // Wrist at x=300: full frame sees it at 300, left crop at 300, right crop clips it at local -10.
    let detector = ScriptedDetector::new(
        vec![raw(300.0, 200.0)],
        vec![raw(305.0, 195.0)],
        vec![raw(-8.0, 210.0)],
    );
    let mut pipeline = pipeline(detector, 10_000);
    let snapshot = pipeline.process_frame(&tagged_frame(ms(0))).await;

    assert_eq!(snapshot.hands().count(), 1);
    let hand = snapshot.left.as_ref().unwrap();
    assert_eq!(hand.landmarks[0].x, 300.0);
    assert!(snapshot.right.is_none());
}

#[tokio::test]
async fn right_crop_detections_land_in_full_frame_space() {
    let detector = ScriptedDetector::new(Vec::new(), Vec::new(), vec![raw(10.0, 20.0)]);
    let mut pipeline = pipeline(detector, 10_000);
    let snapshot = pipeline.process_frame(&tagged_frame(ms(0))).await;

    let hand = snapshot.right.as_ref().unwrap();
    assert_eq!(hand.landmarks[0], Landmark::new(330.0, 20.0, 0.0));
    assert_eq!(hand.bounding_box.top_left, Vector2::new(290.0, -80.0));
}

#[tokio::test]
async fn two_hands_from_different_crops() {
    let detector = ScriptedDetector::new(Vec::new(), vec![raw(100.0, 200.0)], vec![raw(80.0, 200.0)]);
    let mut pipeline = pipeline(detector, 10_000);
    let receiver = pipeline.subscribe();
    pipeline.process_frame(&tagged_frame(ms(0))).await;

    let snapshot = receiver.borrow().clone();
    assert_eq!(snapshot.left.as_ref().unwrap().landmarks[0].x, 100.0);
    assert_eq!(snapshot.right.as_ref().unwrap().landmarks[0].x, 400.0);
}

#[tokio::test]
async fn slow_region_is_skipped_not_awaited() {
    let mut detector = ScriptedDetector::new(vec![raw(100.0, 200.0)], Vec::new(), vec![raw(200.0, 200.0)]);
    detector.slow_right = Some(Duration::from_millis(300));
    let mut pipeline = pipeline(detector, 50);

    let snapshot = pipeline.process_frame(&tagged_frame(ms(0))).await;
    assert_eq!(snapshot.hands().count(), 1);
    assert!(snapshot.left.is_some());
}

#[test]
fn two_candidates_go_left_and_right() {
    let mut assigner = TrackAssigner::new(TrackerConfig::default(), Duration::ZERO);
    let candidates = hand_tracker::normalize::normalize_frame(WIDTH, &[raw(400.0, 0.0), raw(100.0, 0.0)], &[], &[]);
    assigner.update(candidates, WIDTH, ms(0));

    assert_eq!(assigner.state().left().prediction().unwrap().landmarks[0].x, 100.0);
    assert_eq!(assigner.state().right().prediction().unwrap().landmarks[0].x, 400.0);
}

#[test]
fn lone_left_hand_clears_stale_right() {
    let mut assigner = TrackAssigner::new(TrackerConfig::default(), Duration::ZERO);
    let both = hand_tracker::normalize::normalize_frame(WIDTH, &[raw(100.0, 0.0), raw(400.0, 0.0)], &[], &[]);
    assigner.update(both, WIDTH, ms(0));

    let lone = hand_tracker::normalize::normalize_frame(WIDTH, &[raw(50.0, 0.0)], &[], &[]);
    let summary = assigner.update(lone, WIDTH, ms(600));

    assert_eq!(summary.assigned, [Slot::Left]);
    assert_eq!(summary.cleared, [Slot::Right]);
    let left = assigner.state().left().prediction().unwrap();
    assert_relative_eq!(left.landmarks[0].x, 50.0 * 0.4 + 100.0 * 0.6);
}

#[test]
fn silent_slot_expires_after_1200ms() {
    let mut assigner = TrackAssigner::new(TrackerConfig::default(), Duration::ZERO);
    let one = hand_tracker::normalize::normalize_frame(WIDTH, &[raw(500.0, 0.0)], &[], &[]);
    assigner.update(one, WIDTH, ms(100));
    assert!(assigner.state().right().is_tracked());

    assigner.update(Vec::new(), WIDTH, ms(1300));
    assert!(!assigner.state().right().is_tracked());
    assert!(!assigner.state().left().is_tracked());
}

#[test]
fn dedup_uses_configured_threshold() {
    let close = hand_tracker::normalize::normalize_frame(WIDTH, &[raw(100.0, 0.0)], &[raw(130.0, 0.0)], &[]);
    assert_eq!(Deduplicator::new(20.0).dedup(close.clone()).len(), 2);
    assert_eq!(Deduplicator::new(100.0).dedup(close).len(), 1);
}
