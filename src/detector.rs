// src/detector.rs - landmark detector seam and a model-free stand-in
use image::RgbImage;
use nalgebra::Vector2;

use crate::landmark::{BoundingBox, Landmark, RawDetection, HAND_LANDMARK_COUNT};

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("detector backend unavailable: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A hand landmark model.
///
/// Given an image, returns zero or more hands with 21 landmarks each, in the image's own pixel
/// coordinates. Implementations must be re-entrant: the pipeline calls `detect` on the three
/// views of a frame concurrently.
pub trait HandDetector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, DetectorError>;
}

/// Wrist-relative landmark layout of an open hand, fingers pointing up, in pixels.
const HAND_TEMPLATE: [(f64, f64); HAND_LANDMARK_COUNT] = [
    (0.0, 0.0),
    (-18.0, -12.0),
    (-30.0, -28.0),
    (-38.0, -44.0),
    (-44.0, -58.0),
    (-16.0, -60.0),
    (-18.0, -82.0),
    (-19.0, -96.0),
    (-20.0, -108.0),
    (0.0, -62.0),
    (0.0, -86.0),
    (0.0, -101.0),
    (0.0, -114.0),
    (14.0, -58.0),
    (16.0, -80.0),
    (17.0, -94.0),
    (18.0, -105.0),
    (26.0, -50.0),
    (30.0, -66.0),
    (32.0, -77.0),
    (34.0, -87.0),
];

/// Detects bright square markers and reports a synthetic hand anchored at each one.
///
/// Pairs with [`crate::video::SyntheticSource`], which paints one marker per simulated wrist.
/// Because detection works on pixels, a marker cut by a crop boundary is seen by both the
/// crop and the full frame, just like a real model would.
pub struct SimulatedDetector {
    threshold: u8,
    cluster_radius: f64,
}

impl SimulatedDetector {
    pub const MARKER_SIZE: u32 = 9;

    pub fn new() -> Self {
        Self {
            threshold: 200,
            cluster_radius: 20.0,
        }
    }

    fn marker_centers(&self, image: &RgbImage) -> Vec<(Vector2<f64>, usize)> {
        // (sum of positions, pixel count)
        let mut clusters: Vec<(Vector2<f64>, usize)> = Vec::new();

        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            if r.min(g).min(b) < self.threshold {
                continue;
            }
            let p = Vector2::new(f64::from(x), f64::from(y));
            let cluster = clusters
                .iter_mut()
                .find(|(sum, n)| (sum / *n as f64 - p).norm() < self.cluster_radius);
            match cluster {
                Some((sum, n)) => {
                    *sum += p;
                    *n += 1;
                }
                None => clusters.push((p, 1)),
            }
        }

        clusters
            .into_iter()
            .map(|(sum, n)| (sum / n as f64, n))
            .collect()
    }
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for SimulatedDetector {
    fn name(&self) -> &str {
        "simulated"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, DetectorError> {
        let full_marker = (Self::MARKER_SIZE * Self::MARKER_SIZE) as f64;

        let detections = self
            .marker_centers(image)
            .into_iter()
            .filter_map(|(center, pixels)| {
                let landmarks: Vec<Landmark> = HAND_TEMPLATE
                    .iter()
                    .enumerate()
                    .map(|(i, (dx, dy))| {
                        Landmark::new(center.x + dx, center.y + dy, -(i as f64) * 0.01)
                    })
                    .collect();
                let bounding_box = BoundingBox::enclosing(&landmarks)?;
                Some(RawDetection {
                    landmarks,
                    confidence: (pixels as f64 / full_marker).min(1.0),
                    bounding_box,
                })
            })
            .collect();

        Ok(detections)
    }
}
