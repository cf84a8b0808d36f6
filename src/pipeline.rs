// src/pipeline.rs - per-frame detection, fusion and tracking
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{PipelineConfig, TrackerConfig};
use crate::dedup::Deduplicator;
use crate::detector::{DetectorError, HandDetector};
use crate::landmark::{RawDetection, Region};
use crate::normalize::normalize_frame;
use crate::tracking::{TrackAssigner, TrackSnapshot, TrackerState};
use crate::video::{Frame, FrameSource};

const METRICS_WINDOW: usize = 30;

/// Capture/decode failures tolerated in a row before the session gives up on the source.
const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 30;

type DetectTask = JoinHandle<Result<Vec<RawDetection>, DetectorError>>;

#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    pub tracked_hands: usize,
    pub frames_processed: u64,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
            ..Self::default()
        }
    }

    fn record(&mut self, elapsed: Duration, tracked_hands: usize) {
        self.frame_times.push_front(elapsed.as_secs_f32());
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
        self.tracked_hands = tracked_hands;
        self.frames_processed += 1;
    }
}

/// Owns the tracker state for one session and advances it one frame at a time.
///
/// `process_frame` takes `&mut self`, so passes over the same state never overlap. Readers get
/// complete snapshots through [`FramePipeline::subscribe`].
///
/// At most one detection per region is running at any time. A region whose previous call has
/// not returned yet is skipped for the frame instead of queueing more work behind it.
pub struct FramePipeline {
    detector: Arc<dyn HandDetector>,
    // indexed like `Region::ALL`
    in_flight: [Option<DetectTask>; 3],
    dedup: Deduplicator,
    assigner: TrackAssigner,
    config: PipelineConfig,
    snapshots: watch::Sender<TrackSnapshot>,
    metrics: PerformanceMetrics,
}

impl FramePipeline {
    pub fn new(
        detector: Arc<dyn HandDetector>,
        tracker: TrackerConfig,
        config: PipelineConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(TrackSnapshot::default());
        Self {
            detector,
            in_flight: [None, None, None],
            dedup: Deduplicator::new(tracker.duplicate_threshold_px),
            assigner: TrackAssigner::new(tracker, Duration::ZERO),
            config,
            snapshots,
            metrics: PerformanceMetrics::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn state(&self) -> &TrackerState {
        self.assigner.state()
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Clears both tracks, e.g. when capture stops.
    pub fn reset(&mut self, at: Duration) {
        self.assigner.reset(at);
        self.snapshots.send_replace(self.assigner.state().snapshot(at));
    }

    /// Runs detection on all three views of `frame`, fuses the results and updates the tracks.
    ///
    /// Never fails: a region whose detection errors or misses the deadline contributes nothing.
    pub async fn process_frame(&mut self, frame: &Frame) -> TrackSnapshot {
        let start = Instant::now();
        let timeout = self.config.detect_timeout();

        let detector = &self.detector;
        let [full_task, left_task, right_task] = &mut self.in_flight;
        let (full, left, right) = tokio::join!(
            detect_region(detector, full_task, frame, Region::Full, timeout),
            detect_region(detector, left_task, frame, Region::LeftHalf, timeout),
            detect_region(detector, right_task, frame, Region::RightHalf, timeout),
        );

        let candidates = normalize_frame(frame.width(), &full, &left, &right);
        let normalized = candidates.len();
        let candidates = self.dedup.dedup(candidates);
        let deduplicated = candidates.len();

        let summary = self
            .assigner
            .update(candidates, frame.width(), frame.timestamp());
        let snapshot = self.assigner.state().snapshot(frame.timestamp());

        tracing::debug!(
            timestamp = ?frame.timestamp(),
            raw = full.len() + left.len() + right.len(),
            normalized,
            deduplicated,
            assigned = ?summary.assigned,
            cleared = ?summary.cleared,
            "frame processed"
        );

        self.snapshots.send_replace(snapshot.clone());
        self.metrics
            .record(start.elapsed(), self.assigner.state().tracked_count());
        snapshot
    }

    /// Pulls frames from `source` until it runs dry or `shutdown` turns true.
    ///
    /// Shutdown is checked before each frame is fetched, so a pass is never cut short. The
    /// tracks are reset and the empty snapshot is published however the session ends.
    /// Transient capture and decode failures skip the frame; anything else from the source,
    /// or too many failures in a row, ends the session with an error.
    ///
    /// `next_frame` is called on the current task. Run this from the runtime's `block_on`
    /// future (as `#[tokio::main]` does) when the source blocks.
    pub async fn run<S, F>(
        &mut self,
        source: &mut S,
        shutdown: watch::Receiver<bool>,
        mut on_snapshot: F,
    ) -> Result<u64>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&TrackSnapshot),
    {
        tracing::info!(detector = self.detector.name(), "tracking session started");
        let mut frames = 0u64;
        let mut last_timestamp = Duration::ZERO;
        let mut source_errors = 0u32;

        let result: Result<()> = loop {
            if *shutdown.borrow() {
                tracing::info!("shutdown requested");
                break Ok(());
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => {
                    source_errors = 0;
                    frame
                }
                Ok(None) => {
                    tracing::info!("frame source exhausted");
                    break Ok(());
                }
                Err(e) if e.is_transient() && source_errors < MAX_CONSECUTIVE_SOURCE_ERRORS => {
                    source_errors += 1;
                    tracing::warn!(attempt = source_errors, "skipping frame: {e}");
                    continue;
                }
                Err(e) => break Err(e).context("frame source failed"),
            };

            let snapshot = self.process_frame(&frame).await;
            last_timestamp = frame.timestamp();
            on_snapshot(&snapshot);
            frames += 1;

            if frames % 300 == 0 {
                tracing::info!(
                    frames,
                    fps = self.metrics.avg_fps,
                    hands = self.metrics.tracked_hands,
                    "tracking"
                );
            }
        };

        self.reset(last_timestamp);
        tracing::info!(frames, "tracking session ended");
        result.map(|()| frames)
    }
}

async fn detect_region(
    detector: &Arc<dyn HandDetector>,
    in_flight: &mut Option<DetectTask>,
    frame: &Frame,
    region: Region,
    timeout: Duration,
) -> Vec<RawDetection> {
    match in_flight.as_ref() {
        Some(task) if !task.is_finished() => {
            tracing::debug!(
                region = region.as_str(),
                "previous detection still running, skipping region"
            );
            return Vec::new();
        }
        // finished after its deadline; the result belongs to an older frame
        Some(_) => tracing::trace!(region = region.as_str(), "discarding late detection"),
        None => {}
    }

    let detector = Arc::clone(detector);
    let image: Arc<RgbImage> = Arc::clone(frame.view(region));
    let task = in_flight.insert(tokio::task::spawn_blocking(move || detector.detect(&image)));

    let outcome = tokio::time::timeout(timeout, task).await;
    if outcome.is_ok() {
        *in_flight = None;
    }

    match outcome {
        Ok(Ok(Ok(detections))) => detections,
        Ok(Ok(Err(e))) => {
            tracing::warn!(region = region.as_str(), "detector failed: {e}");
            Vec::new()
        }
        Ok(Err(e)) => {
            tracing::warn!(region = region.as_str(), "detector task aborted: {e}");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(
                region = region.as_str(),
                ?timeout,
                "detection timed out, skipping region"
            );
            Vec::new()
        }
    }
}
