// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Frame loss and decoding speed accounting.
//!
//! Figures are computed over one second windows: when a frame arrives and the current window is
//! at least one second old, the window is closed and its frame count and accumulated decoding
//! time feed the rolling FPS and decode time figures. No per-frame history is kept.

use std::time::Duration;
use std::time::Instant;

/// Length of an accounting window.
pub const WINDOW: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct DecoderStats {
    last_frame_number: i32,
    dropped_frames: u64,
    total_frames: u64,

    window_frames: u32,
    window_decode_time: Duration,
    window_start: Option<Instant>,
    windows_closed: u64,

    avg_fps: Option<u32>,
    lowest_fps: Option<u32>,
    highest_fps: Option<u32>,
    avg_decode_time: Option<Duration>,
}

impl Default for DecoderStats {
    fn default() -> Self {
        Self {
            last_frame_number: -1,
            dropped_frames: 0,
            total_frames: 0,
            window_frames: 0,
            window_decode_time: Duration::ZERO,
            window_start: None,
            windows_closed: 0,
            avg_fps: None,
            lowest_fps: None,
            highest_fps: None,
            avg_decode_time: None,
        }
    }
}

impl DecoderStats {
    /// Closes the current window if none was started yet or if it has lasted at least
    /// [`WINDOW`]. Returns `true` if a window containing frames was closed.
    pub fn roll_window(&mut self, now: Instant) -> bool {
        let elapsed = match self.window_start {
            None => None,
            Some(start) => {
                let elapsed = now.saturating_duration_since(start);
                if elapsed < WINDOW {
                    return false;
                }
                Some(elapsed)
            }
        };

        let mut closed = false;
        if let Some(elapsed) = elapsed {
            if self.window_frames > 0 {
                let frames = self.window_frames;
                // Whole seconds, as the window figures have one second granularity.
                let seconds = elapsed.as_secs();
                self.avg_fps = Some((u64::from(frames) / seconds) as u32);
                self.lowest_fps = Some(self.lowest_fps.map_or(frames, |l| l.min(frames)));
                self.highest_fps = Some(self.highest_fps.map_or(frames, |h| h.max(frames)));
                self.avg_decode_time = Some(self.window_decode_time / frames);
                self.windows_closed += 1;
                closed = true;

                log::debug!(
                    "window closed: {} frames in {:?}, avg decode {:?}",
                    frames,
                    elapsed,
                    self.window_decode_time / frames
                );
            }
        }

        self.window_frames = 0;
        self.window_decode_time = Duration::ZERO;
        self.window_start = Some(now);

        closed
    }

    /// Accounts for the arrival of `frame_number` and returns the number of frames found
    /// missing before it.
    ///
    /// Repeated and consecutive frame numbers are not losses. A frame number going backwards is
    /// reported but never reduces the drop count.
    pub fn record_frame(&mut self, frame_number: i32) -> u64 {
        let last = self.last_frame_number;
        let mut missing = 0;

        if frame_number != last && i64::from(frame_number) != i64::from(last) + 1 {
            let gap = i64::from(frame_number) - i64::from(last) - 1;
            if gap > 0 {
                missing = gap as u64;
                self.dropped_frames += missing;
                log::warn!("Dropped {} frames!", missing);
            } else {
                log::warn!("Frame {} arrived after frame {}", frame_number, last);
            }
        }

        self.last_frame_number = frame_number;
        self.total_frames += 1;
        self.window_frames += 1;

        missing
    }

    /// Accounts for a frame the device refused.
    pub fn record_device_drop(&mut self) {
        self.dropped_frames += 1;
    }

    pub fn add_decode_time(&mut self, time: Duration) {
        self.window_decode_time += time;
    }

    pub fn last_frame_number(&self) -> i32 {
        self.last_frame_number
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn window_frames(&self) -> u32 {
        self.window_frames
    }

    pub fn window_decode_time(&self) -> Duration {
        self.window_decode_time
    }

    /// Number of windows closed with at least one frame in them.
    pub fn windows_closed(&self) -> u64 {
        self.windows_closed
    }

    pub fn avg_fps(&self) -> Option<u32> {
        self.avg_fps
    }

    pub fn lowest_fps(&self) -> Option<u32> {
        self.lowest_fps
    }

    pub fn highest_fps(&self) -> Option<u32> {
        self.highest_fps
    }

    pub fn avg_decode_time(&self) -> Option<Duration> {
        self.avg_decode_time
    }
}
