use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use nalgebra::Vector3;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rust_handtrack::config::HandTrackingConfig;
use rust_handtrack::io::Recording;
use rust_handtrack::system::HandTrackingSystem;

/// How long to wait for the ingest thread to catch up before presenting.
const INGEST_WAIT: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let recording_path = match args.next() {
        Some(p) => p,
        None => bail!("Usage: rust_handtrack <recording.csv> [config.yaml]"),
    };

    let config = match args.next() {
        Some(path) => {
            info!("Loading configuration from {}", path);
            HandTrackingConfig::from_yaml_file(&path)?
        }
        None => HandTrackingConfig::default(),
    };

    let recording = Recording::load(&recording_path)?;
    println!(
        "Loaded {} sensor frames with {} hand detections from {}",
        recording.len(),
        recording.num_detections(),
        recording_path
    );

    let mut system = HandTrackingSystem::new(config)?;

    // The recording is camera-relative, so the body reference sits at the
    // camera origin.
    let body_reference = Vector3::zeros();
    let mut frames_with_ray = 0usize;

    for (i, msg) in recording.frames.iter().enumerate() {
        let timestamp_ns = msg.timestamp_ns;
        system.submit(msg.clone())?;

        // Replays faster than real time; let ingest catch up so each
        // presentation pass sees the frame it follows.
        let start = Instant::now();
        while system.shared_state().stats().frames_processed < (i + 1) as u64 {
            if start.elapsed() > INGEST_WAIT {
                warn!("Ingest thread is behind at frame {}", i);
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }

        let frame = system.present(&body_reference);
        match (frame.active_track(), frame.ray, frame.cursor) {
            (Some(track), Some(ray), Some(cursor)) => {
                frames_with_ray += 1;
                info!(
                    "t={} {} {:?} palm=[{:.3}, {:.3}, {:.3}] dir=[{:.3}, {:.3}, {:.3}] cursor=[{:.2}, {:.2}, {:.2}]",
                    timestamp_ns,
                    track.id(),
                    track.state(),
                    track.position().x,
                    track.position().y,
                    track.position().z,
                    ray.direction.x,
                    ray.direction.y,
                    ray.direction.z,
                    cursor.x,
                    cursor.y,
                    cursor.z,
                );
            }
            _ => {
                info!(
                    "t={} no pointing hand ({} tracks)",
                    timestamp_ns,
                    frame.tracks.len()
                );
            }
        }
    }

    let stats = system.shared_state().stats();
    println!(
        "Done! {} frames, {} with a pointing ray. Tracks created={}, removed={}, rejected samples={}",
        stats.frames_processed,
        frames_with_ray,
        stats.tracks_created,
        stats.tracks_removed,
        stats.rejected_samples
    );

    // Shutdown cleanly (joins the ingest thread)
    system.shutdown();

    Ok(())
}
