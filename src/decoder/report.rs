// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoder statistics report persisted when a stream ends.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::decoder::stats::DecoderStats;

/// Snapshot of the decoder statistics at the end of a stream.
///
/// Values that were never measured are `-1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatsReport {
    /// `1` if at least one full window was measured, `-1` if the stream never stabilized.
    pub stream_status: i32,
    pub average_fps: i64,
    pub lowest_fps: i64,
    pub highest_fps: i64,
    pub dropped_frames: u64,
    /// Average decoding time over the last closed window, in microseconds.
    ///
    /// Frame times are summed at nanosecond precision and the average is truncated to
    /// microseconds once, so it can read slightly higher than an average of per-frame times
    /// that were each truncated to microseconds.
    pub avg_decoding_time_us: i64,
}

impl From<&DecoderStats> for StatsReport {
    fn from(stats: &DecoderStats) -> Self {
        let unset = -1;
        let stabilized = stats.lowest_fps().is_some() && stats.avg_fps().is_some();

        Self {
            stream_status: if stabilized { 1 } else { -1 },
            average_fps: stats.avg_fps().map_or(unset, i64::from),
            lowest_fps: match stats.lowest_fps() {
                Some(fps) if stabilized => i64::from(fps),
                _ => unset,
            },
            highest_fps: stats.highest_fps().map_or(unset, i64::from),
            dropped_frames: stats.dropped_frames(),
            avg_decoding_time_us: stats
                .avg_decode_time()
                .map_or(unset, |t| t.as_micros() as i64),
        }
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StreamStatus = {}", self.stream_status)?;
        writeln!(f, "AverageFPS = {}", self.average_fps)?;
        writeln!(f, "LowestFPS = {}", self.lowest_fps)?;
        writeln!(f, "HighestFPS = {}", self.highest_fps)?;
        writeln!(f, "NetworkDroppedFrames = {}", self.dropped_frames)?;
        write!(f, "AvgDecodingTime = {} us", self.avg_decoding_time_us)
    }
}

impl StatsReport {
    /// Writes the report to `path`, replacing any previous report.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, self.to_string())
            .with_context(|| format!("cannot write decoder stats to {}", path.display()))
    }
}
