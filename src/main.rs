// src/main.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use hand_tracker::data::TrackExporter;
use hand_tracker::{
    AppConfig, CameraSource, FramePipeline, FrameSource, SimulatedDetector, SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(name = "hand_tracker", about = "Track two hands in a live video feed")]
struct Args {
    /// JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Camera index, overrides the config file
    #[arg(long)]
    camera: Option<u32>,
    /// Use synthetic frames instead of a camera
    #[arg(long)]
    simulate: bool,
    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,
    /// Write the tracked wrists to CSV when the session ends
    #[arg(long)]
    export: bool,
}

/// Stops the source after a fixed number of frames.
struct Limited<S> {
    inner: S,
    remaining: Option<u64>,
}

impl<S: FrameSource> FrameSource for Limited<S> {
    fn next_frame(&mut self) -> Result<Option<hand_tracker::Frame>, hand_tracker::VideoError> {
        match &mut self.remaining {
            Some(0) => Ok(None),
            Some(n) => {
                *n -= 1;
                self.inner.next_frame()
            }
            None => self.inner.next_frame(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(index) = args.camera {
        config.camera.index = index;
    }

    let mut source: Box<dyn FrameSource> = if args.simulate {
        tracing::info!("using synthetic frames");
        Box::new(Limited {
            inner: SyntheticSource::new(config.camera.width, config.camera.height, config.camera.fps),
            remaining: args.frames,
        })
    } else {
        let camera = CameraSource::open(&config.camera).context("failed to open camera")?;
        let (width, height) = camera.resolution();
        tracing::info!(width, height, fps = camera.frame_rate(), "capturing");
        Box::new(Limited {
            inner: camera,
            remaining: args.frames,
        })
    };

    // No model ships with this binary; the simulated detector understands synthetic frames.
    let detector = Arc::new(SimulatedDetector::new());
    let mut pipeline = FramePipeline::new(detector, config.tracker.clone(), config.pipeline.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, stopping after current frame");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut exporter = args
        .export
        .then(|| TrackExporter::new(&config.output_directory, None));

    let frames = pipeline
        .run(source.as_mut(), shutdown_rx, |snapshot| {
            if let Some(exporter) = exporter.as_mut() {
                exporter.add_frame(snapshot);
            }
        })
        .await?;

    let metrics = pipeline.metrics();
    tracing::info!(
        frames,
        avg_fps = metrics.avg_fps,
        avg_ms = metrics.avg_processing_time * 1000.0,
        "done"
    );

    if let Some(exporter) = exporter {
        let path = exporter.export_csv()?;
        println!("Tracking data written to {}", path.display());
    }

    Ok(())
}
