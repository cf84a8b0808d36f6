// src/data.rs
use crate::landmark::Candidate;
use crate::tracking::{Slot, TrackSnapshot};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct TrackingRecord {
    frame: u64,
    timestamp_ms: f64,

    left_tracked: bool,
    left_confidence: Option<f64>,
    left_wrist_x: Option<f64>,
    left_wrist_y: Option<f64>,
    left_wrist_z: Option<f64>,

    right_tracked: bool,
    right_confidence: Option<f64>,
    right_wrist_x: Option<f64>,
    right_wrist_y: Option<f64>,
    right_wrist_z: Option<f64>,
}

/// Collects published snapshots and writes them out as one CSV row per frame.
pub struct TrackExporter {
    output_dir: PathBuf,
    session_name: String,
    snapshots: Vec<TrackSnapshot>,
}

impl TrackExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            snapshots: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn add_frame(&mut self, snapshot: &TrackSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self
            .output_dir
            .join(&self.session_name)
            .join("tracking_data.csv");

        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("failed to create {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);

        for (i, snapshot) in self.snapshots.iter().enumerate() {
            writer.serialize(Self::create_record(i as u64, snapshot))?;
        }

        writer.flush()?;
        tracing::info!(rows = self.snapshots.len(), "exported {}", csv_path.display());
        Ok(csv_path)
    }

    fn create_record(frame: u64, snapshot: &TrackSnapshot) -> TrackingRecord {
        let left = snapshot.get(Slot::Left);
        let right = snapshot.get(Slot::Right);
        let wrist = |c: Option<&Candidate>| c.and_then(|c| c.wrist().copied());

        TrackingRecord {
            frame,
            timestamp_ms: snapshot.timestamp.as_micros() as f64 / 1000.0,
            left_tracked: left.is_some(),
            left_confidence: left.map(|c| c.confidence),
            left_wrist_x: wrist(left).map(|w| w.x),
            left_wrist_y: wrist(left).map(|w| w.y),
            left_wrist_z: wrist(left).map(|w| w.z),
            right_tracked: right.is_some(),
            right_confidence: right.map(|c| c.confidence),
            right_wrist_x: wrist(right).map(|w| w.x),
            right_wrist_y: wrist(right).map(|w| w.y),
            right_wrist_z: wrist(right).map(|w| w.z),
        }
    }
}
