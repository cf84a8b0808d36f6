//! Fusion and tracking of up to two hands over a live video feed.
//!
//! Every frame is searched for hands three times, on the full image and on its left and right
//! halves. The detections are mapped back into full-frame coordinates ([`normalize`]), collapsed
//! so each physical hand appears once ([`dedup`]), and assigned to two persistent, smoothed
//! left/right tracks ([`tracking`]). [`pipeline::FramePipeline`] ties these together and
//! publishes a snapshot of both tracks after every frame.

pub mod config;
pub mod data;
pub mod dedup;
pub mod detector;
pub mod landmark;
pub mod normalize;
pub mod pipeline;
pub mod tracking;
pub mod video;

pub use config::{AppConfig, CameraConfig, ConfigError, PipelineConfig, TrackerConfig};
pub use dedup::Deduplicator;
pub use detector::{DetectorError, HandDetector, SimulatedDetector};
pub use landmark::{BoundingBox, Candidate, Landmark, RawDetection, Region};
pub use pipeline::{FramePipeline, PerformanceMetrics};
pub use tracking::{Slot, Track, TrackAssigner, TrackSnapshot, TrackerState, UpdateSummary};
pub use video::{CameraSource, Frame, FrameSource, SyntheticSource, VideoError};
