//! Offline recordings
//!
//! A recording is JSON lines, one sample per line, time in seconds from
//! the start of the recording:
//!
//! ```text
//! {"t":0.0,"magnitude":12.5}
//! {"t":0.05,"x":180.2,"y":-20.0,"z":3.1}
//! ```
//!
//! Lines with `x`/`y`/`z` have their magnitude computed; when both forms
//! are present `magnitude` wins. Recordings let thresholds be tuned on a
//! desk instead of on the device.

use std::io::{BufRead, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gesture::{DetectorStats, GestureConfig, GestureDetector, MatchEvent, Sample};
use crate::sensor::GyroReading;
use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    z: Option<f64>,
}

impl Record {
    fn into_sample(self, line: usize) -> Result<Sample> {
        let at = Duration::try_from_secs_f64(self.t).map_err(|e| Error::Replay {
            line,
            message: format!("invalid time {}: {e}", self.t),
        })?;

        let magnitude = match (self.magnitude, self.x, self.y, self.z) {
            (Some(m), ..) => m,
            (None, Some(x), Some(y), Some(z)) => GyroReading::new(x, y, z).magnitude(),
            _ => {
                return Err(Error::Replay {
                    line,
                    message: "expected `magnitude` or all of `x`, `y`, `z`".to_string(),
                });
            }
        };

        Ok(Sample::new(at, magnitude))
    }
}

/// Outcome of replaying a recording
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Gestures found, in order
    pub matches: Vec<MatchEvent>,
    /// Detector counters after the last sample
    pub stats: DetectorStats,
}

/// Parse a recording
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns `Error::Replay` with the 1-based line number for a malformed
/// line, or `Error::Io` if the reader fails
pub fn read_samples(reader: impl BufRead) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Record = serde_json::from_str(line).map_err(|e| Error::Replay {
            line: line_no,
            message: e.to_string(),
        })?;
        samples.push(record.into_sample(line_no)?);
    }

    tracing::debug!(samples = samples.len(), "recording loaded");
    Ok(samples)
}

/// Append one reading to a recording
///
/// # Errors
///
/// Returns error if the line cannot be written
pub fn write_sample(mut writer: impl Write, at: Duration, reading: &GyroReading) -> Result<()> {
    let record = Record {
        t: at.as_secs_f64(),
        magnitude: Some(reading.magnitude()).filter(|m| m.is_finite()),
        x: Some(reading.x),
        y: Some(reading.y),
        z: Some(reading.z),
    };
    serde_json::to_writer(&mut writer, &record)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Run samples through a fresh detector
#[must_use]
pub fn replay(config: GestureConfig, samples: &[Sample]) -> ReplayReport {
    let mut detector = GestureDetector::new(config);
    let matches: Vec<MatchEvent> = samples
        .iter()
        .filter_map(|&sample| detector.observe(sample))
        .collect();

    ReplayReport {
        matches,
        stats: detector.stats(),
    }
}
