// src/video.rs - frame sources feeding the tracking pipeline
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{imageops, Rgb, RgbImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use crate::config::CameraConfig;
use crate::detector::SimulatedDetector;
use crate::landmark::Region;

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("failed to open camera stream: {0}")]
    Stream(String),
    #[error("failed to capture frame: {0}")]
    Capture(String),
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

impl VideoError {
    /// A single bad frame; the stream itself is still usable.
    pub fn is_transient(&self) -> bool {
        matches!(self, VideoError::Capture(_) | VideoError::Decode(_))
    }
}

/// A captured frame, its two half-width crops, and its session timestamp.
///
/// The crops are taken once, when the frame is built, and shared read-only between the
/// concurrent detector calls.
#[derive(Debug, Clone)]
pub struct Frame {
    full: Arc<RgbImage>,
    left_half: Arc<RgbImage>,
    right_half: Arc<RgbImage>,
    timestamp: Duration,
}

impl Frame {
    pub fn new(image: RgbImage, timestamp: Duration) -> Self {
        let (width, height) = image.dimensions();
        let half = width / 2;
        let left_half = imageops::crop_imm(&image, 0, 0, half, height).to_image();
        let right_half = imageops::crop_imm(&image, half, 0, width - half, height).to_image();

        Self {
            full: Arc::new(image),
            left_half: Arc::new(left_half),
            right_half: Arc::new(right_half),
            timestamp,
        }
    }

    pub fn width(&self) -> u32 {
        self.full.width()
    }

    pub fn height(&self) -> u32 {
        self.full.height()
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn image(&self) -> &RgbImage {
        &self.full
    }

    pub fn view(&self, region: Region) -> &Arc<RgbImage> {
        match region {
            Region::Full => &self.full,
            Region::LeftHalf => &self.left_half,
            Region::RightHalf => &self.right_half,
        }
    }
}

pub trait FrameSource {
    /// Returns the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// Webcam input via nokhwa.
pub struct CameraSource {
    camera: Camera,
    index: u32,
    mirror: bool,
    started: Instant,
}

impl CameraSource {
    pub fn open(config: &CameraConfig) -> Result<Self, VideoError> {
        tracing::debug!(index = config.index, "opening camera");

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Exact(format));

        let camera = Camera::new(CameraIndex::Index(config.index), requested).map_err(|e| {
            VideoError::Open {
                index: config.index,
                reason: e.to_string(),
            }
        })?;

        tracing::info!(index = config.index, name = %camera.info().human_name(), "camera opened");
        Ok(Self {
            camera,
            index: config.index,
            mirror: config.mirror,
            started: Instant::now(),
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    pub fn frame_rate(&self) -> u32 {
        self.camera.frame_rate()
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if !self.camera.is_stream_open() {
            self.camera
                .open_stream()
                .map_err(|e| VideoError::Stream(e.to_string()))?;
        }

        let buffer = self
            .camera
            .frame()
            .map_err(|e| VideoError::Capture(e.to_string()))?;
        let timestamp = self.started.elapsed();

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| VideoError::Decode(e.to_string()))?;
        let image = if self.mirror {
            imageops::flip_horizontal(&decoded)
        } else {
            decoded
        };

        Ok(Some(Frame::new(image, timestamp)))
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!(index = self.index, "failed to stop camera stream: {e}");
        }
    }
}

/// Black frames with a bright marker at each simulated wrist, for running without a camera.
///
/// Timestamps advance by exactly one frame interval per frame. The right hand periodically
/// leaves the picture so that slot expiry gets exercised.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_interval: Duration,
    frame_index: u64,
    max_frames: Option<u64>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            frame_interval: Duration::from_secs(1) / fps.max(1),
            frame_index: 0,
            max_frames: None,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Simulated wrist positions at `t` seconds, in pixels.
    pub fn wrists_at(&self, t: f64) -> Vec<(f64, f64)> {
        let w = f64::from(self.width);
        let h = f64::from(self.height);

        let mut wrists = vec![(
            w * (0.25 + 0.1 * (t * 0.5).cos()),
            h * (0.7 + 0.1 * t.sin()),
        )];
        if (t * 0.3).sin() > -0.5 {
            wrists.push((
                w * (0.75 - 0.1 * (t * 0.5 + 1.0).cos()),
                h * (0.7 + 0.1 * (t + 1.5).sin()),
            ));
        }
        wrists
    }

    fn render(&self, t: f64) -> RgbImage {
        let mut image = RgbImage::new(self.width, self.height);
        let half = i64::from(SimulatedDetector::MARKER_SIZE / 2);

        for (wx, wy) in self.wrists_at(t) {
            let (cx, cy) = (wx.round() as i64, wy.round() as i64);
            for y in cy - half..=cy + half {
                for x in cx - half..=cx + half {
                    if x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height) {
                        image.put_pixel(x as u32, y as u32, Rgb([255, 255, 255]));
                    }
                }
            }
        }
        image
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.max_frames.map_or(false, |max| self.frame_index >= max) {
            return Ok(None);
        }

        let timestamp = self.frame_interval * self.frame_index as u32;
        let image = self.render(timestamp.as_secs_f64());
        self.frame_index += 1;
        Ok(Some(Frame::new(image, timestamp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crops_split_the_frame() {
        let mut image = RgbImage::new(641, 10);
        image.put_pixel(320, 5, Rgb([1, 2, 3]));
        let frame = Frame::new(image, Duration::from_millis(7));

        assert_eq!(frame.view(Region::LeftHalf).dimensions(), (320, 10));
        assert_eq!(frame.view(Region::RightHalf).dimensions(), (321, 10));
        assert_eq!(frame.view(Region::RightHalf).get_pixel(0, 5), &Rgb([1, 2, 3]));
        assert_eq!(frame.width(), 641);
        assert_eq!(frame.timestamp(), Duration::from_millis(7));
    }

    #[test]
    fn only_frame_level_errors_are_transient() {
        assert!(VideoError::Capture("timeout".into()).is_transient());
        assert!(VideoError::Decode("bad jpeg".into()).is_transient());
        assert!(!VideoError::Stream("unplugged".into()).is_transient());
    }

    #[test]
    fn synthetic_source_is_deterministic() {
        let mut source = SyntheticSource::new(320, 240, 25).with_max_frames(3);
        let timestamps: Vec<Duration> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.timestamp())
            .collect();
        assert_eq!(
            timestamps,
            [Duration::ZERO, Duration::from_millis(40), Duration::from_millis(80)]
        );
    }

    #[test]
    fn synthetic_frame_has_markers() {
        let mut source = SyntheticSource::new(640, 480, 30);
        let frame = source.next_frame().unwrap().unwrap();
        let (x, y) = source.wrists_at(0.0)[0];
        assert_eq!(
            frame.image().get_pixel(x.round() as u32, y.round() as u32),
            &Rgb([255, 255, 255])
        );
    }
}
