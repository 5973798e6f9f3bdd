//! Recorded sensor sessions for offline replay.
//!
//! A recording is a headerless CSV file; `#` starts a comment line. Column 0
//! is the sensor timestamp in nanoseconds and column 1 the row kind. Rows
//! that share a timestamp belong to the same sensor frame.
//!
//! ```text
//! # ts, view, m00 .. m33 (row-major camera view, optional)
//! 1000, view, 1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1
//! # ts, hand, palm xyz, wrist xyz, roi min_x min_y max_x max_y, [tip xyz]*
//! 1000, hand, 0.1,-0.05,0.45, 0.1,0.02,0.47, 120,80,180,160, 0.12,-0.12,0.42
//! ```
//!
//! Frames without a `view` row use the identity camera view. A sensor frame
//! with no hands in view is written as a `view` row alone, so it still
//! reaches the registry and ages the existing tracks.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use nalgebra::{Matrix4, Vector3};
use tracing::warn;

use crate::geometry::Roi;
use crate::system::SensorFrameMsg;
use crate::tracking::LandmarkFrame;

/// Columns before the optional fingertip triples on a `hand` row.
const HAND_FIXED_COLUMNS: usize = 12;

/// Columns on a `view` row.
const VIEW_COLUMNS: usize = 18;

/// A recorded session, ordered by timestamp.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub frames: Vec<SensorFrameMsg>,
}

impl Recording {
    /// Load a recording from a CSV file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse a recording from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut frames: BTreeMap<u64, SensorFrameMsg> = BTreeMap::new();
        for rec in rdr.records() {
            let rec = rec?;
            if rec.len() < 2 {
                continue;
            }
            let line = rec.position().map(|p| p.line()).unwrap_or(0);
            let ts: u64 = rec[0]
                .parse()
                .with_context(|| format!("Bad timestamp on line {}", line))?;
            let frame = frames
                .entry(ts)
                .or_insert_with(|| SensorFrameMsg::new(ts, Vec::new()));

            match &rec[1] {
                "view" => {
                    frame.camera_view =
                        parse_view(&rec).with_context(|| format!("Bad view row on line {}", line))?;
                }
                "hand" => {
                    let hand =
                        parse_hand(&rec).with_context(|| format!("Bad hand row on line {}", line))?;
                    frame.hands.push(hand);
                }
                other => {
                    warn!("Skipping unknown row kind {:?} on line {}", other, line);
                }
            }
        }

        Ok(Self {
            frames: frames.into_values().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of hand detections across all frames.
    pub fn num_detections(&self) -> usize {
        self.frames.iter().map(|f| f.hands.len()).sum()
    }
}

fn field_f64(rec: &StringRecord, idx: usize) -> Result<f64> {
    rec[idx]
        .parse()
        .with_context(|| format!("Column {} is not a number: {:?}", idx, &rec[idx]))
}

fn field_i32(rec: &StringRecord, idx: usize) -> Result<i32> {
    rec[idx]
        .parse()
        .with_context(|| format!("Column {} is not a pixel coordinate: {:?}", idx, &rec[idx]))
}

fn field_vec3(rec: &StringRecord, idx: usize) -> Result<Vector3<f64>> {
    Ok(Vector3::new(
        field_f64(rec, idx)?,
        field_f64(rec, idx + 1)?,
        field_f64(rec, idx + 2)?,
    ))
}

fn parse_view(rec: &StringRecord) -> Result<Matrix4<f64>> {
    if rec.len() != VIEW_COLUMNS {
        bail!(
            "Expected {} columns for a view row, got {}",
            VIEW_COLUMNS,
            rec.len()
        );
    }
    let data = (2..VIEW_COLUMNS)
        .map(|i| field_f64(rec, i))
        .collect::<Result<Vec<_>>>()?;
    Ok(Matrix4::from_row_slice(&data))
}

fn parse_hand(rec: &StringRecord) -> Result<LandmarkFrame> {
    if rec.len() < HAND_FIXED_COLUMNS || (rec.len() - HAND_FIXED_COLUMNS) % 3 != 0 {
        bail!(
            "Expected {} columns plus fingertip triples for a hand row, got {}",
            HAND_FIXED_COLUMNS,
            rec.len()
        );
    }
    let palm = field_vec3(rec, 2)?;
    let wrist = field_vec3(rec, 5)?;
    let roi = Roi::new(
        field_i32(rec, 8)?,
        field_i32(rec, 9)?,
        field_i32(rec, 10)?,
        field_i32(rec, 11)?,
    );
    let fingertips = (HAND_FIXED_COLUMNS..rec.len())
        .step_by(3)
        .map(|i| field_vec3(rec, i))
        .collect::<Result<Vec<_>>>()?;

    Ok(LandmarkFrame::new(palm, wrist, fingertips, roi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
# two frames, the first with two hands
1000, view, 1,0,0,0, 0,1,0,0, 0,0,1,2, 0,0,0,1
1000, hand, 0.1,-0.05,0.45, 0.1,0.02,0.47, 120,80,180,160, 0.12,-0.12,0.42, 0.08,-0.10,0.43
1000, hand, -0.2,-0.05,0.5, -0.2,0.02,0.52, 300,90,360,170
2000, hand, 0.1,-0.05,0.45, 0.1,0.02,0.47, 122,82,182,162
";

    #[test]
    fn test_parse_sample() {
        let rec = Recording::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.num_detections(), 3);

        let first = &rec.frames[0];
        assert_eq!(first.timestamp_ns, 1000);
        assert_eq!(first.camera_view[(2, 3)], 2.0);
        assert_eq!(first.hands[0].fingertips.len(), 2);
        assert_eq!(first.hands[0].roi, Roi::new(120, 80, 180, 160));
        assert_eq!(first.hands[0].topmost_fingertip(), Some(0));
        assert!(first.hands[1].fingertips.is_empty());

        let second = &rec.frames[1];
        assert_eq!(second.camera_view, Matrix4::identity());
    }

    #[test]
    fn test_frames_sorted_by_timestamp() {
        let data = "\
2000, hand, 0,0,1, 0,0,1, 0,0,1,1
1000, hand, 0,0,1, 0,0,1, 0,0,1,1
";
        let rec = Recording::from_reader(data.as_bytes()).unwrap();
        assert_eq!(rec.frames[0].timestamp_ns, 1000);
        assert_eq!(rec.frames[1].timestamp_ns, 2000);
    }

    #[test]
    fn test_incomplete_fingertip_is_error() {
        let data = "1000, hand, 0,0,1, 0,0,1, 0,0,1,1, 0.5,0.5\n";
        assert!(Recording::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_bad_number_is_error() {
        let data = "1000, hand, x,0,1, 0,0,1, 0,0,1,1\n";
        assert!(Recording::from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_unknown_rows_are_skipped() {
        let data = "1000, imu, 1,2,3\n1000, hand, 0,0,1, 0,0,1, 0,0,1,1\n";
        let rec = Recording::from_reader(data.as_bytes()).unwrap();
        assert_eq!(rec.num_detections(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let rec = Recording::load(file.path()).unwrap();
        assert_eq!(rec.len(), 2);
        assert!(Recording::load(file.path().with_extension("missing")).is_err());
    }
}
