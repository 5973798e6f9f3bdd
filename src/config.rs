//! Tuning constants for association, lifecycle, smoothing and pointing.
//!
//! All values that the sensor pipeline needs tuned live here rather than at
//! call sites. Every struct has a `Default` matching the values observed on
//! the reference headset setup, and the whole tree can be loaded from YAML:
//!
//! ```yaml
//! tracking:
//!   margin_pixels: 10
//!   liveness_max: 5
//! pointing:
//!   on_body_min_distance: 0.1
//! ```
//!
//! Missing keys fall back to their defaults.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use nalgebra::Vector3;
use serde::Deserialize;

/// Track association and lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Pixels added on every side of an incoming ROI before matching.
    pub margin_pixels: i32,

    /// Liveness counter value on creation and after every match.
    /// A track survives `liveness_max - 1` consecutive misses.
    pub liveness_max: u32,

    /// Amount subtracted from the liveness counter on each missed frame.
    pub liveness_decrement: u32,

    /// Smoothing factor α given to new tracks. `None` disables position
    /// smoothing and lets the pointing estimator use its fallback factor.
    pub default_smoothing_factor: Option<f64>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            margin_pixels: 10,
            liveness_max: 5,
            liveness_decrement: 1,
            default_smoothing_factor: Some(0.75),
        }
    }
}

/// Pointing ray configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PointingConfig {
    /// Minimum horizontal (x/z) distance in meters between a hand and the
    /// body reference point. Closer detections are treated as on-body.
    pub on_body_min_distance: f64,

    /// Direction smoothing factor used when the active track has none.
    pub fallback_smoothing_factor: f64,
}

impl Default for PointingConfig {
    fn default() -> Self {
        Self {
            on_body_min_distance: 0.1,
            fallback_smoothing_factor: 0.8,
        }
    }
}

/// Cursor placement along the pointing ray.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    /// Offset from the body reference point to the ray anchor (roughly the
    /// shoulder line when the reference point is the head).
    pub anchor_offset: Vector3<f64>,

    /// Multiplier applied to the anchor-to-hand reach.
    pub gain: f64,

    /// Lower bound on the anchor-to-hand reach in meters.
    pub min_reach: f64,

    /// Distance subtracted after applying the gain.
    pub offset: f64,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            anchor_offset: Vector3::new(0.0, -0.25, 0.0),
            gain: 20.0,
            min_reach: 0.3,
            offset: 6.0,
        }
    }
}

/// Complete configuration for a [`crate::system::HandTrackingSystem`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandTrackingConfig {
    pub tracking: TrackingConfig,
    pub pointing: PointingConfig,
    pub cursor: CursorConfig,
}

impl HandTrackingConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the lifecycle or smoothing invariants.
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracking;
        if t.margin_pixels < 0 {
            bail!("margin_pixels must be >= 0, got {}", t.margin_pixels);
        }
        if t.liveness_max == 0 {
            bail!("liveness_max must be >= 1");
        }
        if t.liveness_decrement == 0 {
            bail!("liveness_decrement must be >= 1");
        }
        if let Some(alpha) = t.default_smoothing_factor {
            check_smoothing("default_smoothing_factor", alpha)?;
        }

        let p = &self.pointing;
        check_smoothing("fallback_smoothing_factor", p.fallback_smoothing_factor)?;
        if !(p.on_body_min_distance >= 0.0) {
            bail!(
                "on_body_min_distance must be >= 0, got {}",
                p.on_body_min_distance
            );
        }
        Ok(())
    }
}

fn check_smoothing(name: &str, alpha: f64) -> Result<()> {
    // alpha == 1 would freeze the state on its first sample forever.
    if !(0.0..1.0).contains(&alpha) {
        bail!("{} must be in [0, 1), got {}", name, alpha);
    }
    Ok(())
}
