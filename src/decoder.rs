// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoder session pushing decode units into a codec device.
//!
//! A [`DecoderSession`] owns a [`CodecDevice`] and the scratch buffer decode units are
//! reassembled into. It is created uninitialized, opened with [`DecoderSession::setup`], fed with
//! [`DecoderSession::submit`] and closed with [`DecoderSession::cleanup`], which also persists the
//! statistics gathered during the stream.

pub mod frame_buffer;
pub mod report;
pub mod stats;

use std::collections::TryReserveError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use thiserror::Error;

use crate::backend::CodecDevice;
use crate::backend::CodecParams;
use crate::backend::DeviceError;
use crate::backend::VideoType;
use crate::backend::SYNC_OUTSIDE;
use crate::backend::UCODE_IP_ONLY_PARAM;
use crate::decoder::frame_buffer::FrameBuffer;
use crate::decoder::report::StatsReport;
use crate::decoder::stats::DecoderStats;
use crate::utils::Clock;
use crate::utils::MonotonicClock;
use crate::EncodedFormat;
use crate::Resolution;

/// Default size of the scratch buffer. Decode units must be strictly smaller.
pub const DECODER_BUFFER_SIZE: usize = 120 * 1024;

/// Frame durations handed to the device are expressed in 1/96000 s.
pub const RATE_TIMEBASE: u32 = 96000;

/// One compressed frame, as handed over by the host.
///
/// Only borrowed for the duration of a [`DecoderSession::submit`] call.
#[derive(Clone, Copy, Debug)]
pub struct DecodeUnit<'a> {
    pub frame_number: i32,
    /// Sum of the lengths of all the fragments.
    pub full_length: usize,
    /// Pieces of the frame, in stream order.
    pub fragments: &'a [&'a [u8]],
}

impl<'a> DecodeUnit<'a> {
    /// Builds a decode unit whose length is computed from `fragments`.
    pub fn new(frame_number: i32, fragments: &'a [&'a [u8]]) -> Self {
        Self {
            frame_number,
            full_length: fragments.iter().map(|f| f.len()).sum(),
            fragments,
        }
    }
}

/// Result of a successful submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ok,
    /// The device failed and was reset: decoding can only resume from a key frame.
    NeedKeyframe,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Open,
    Closed,
}

/// How long to wait on a device that reports backpressure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// Number of retries after which a frame is given up on. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    fn allows(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }
}

/// What to do with a decode unit that does not fit in the scratch buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OversizePolicy {
    /// Log and exit the process. Hosts sized for the device never send such units.
    #[default]
    Abort,
    /// Refuse the unit with [`SubmitError::OversizedDecodeUnit`].
    Reject,
}

impl FromStr for OversizePolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(OversizePolicy::Abort),
            "reject" => Ok(OversizePolicy::Reject),
            _ => Err("unrecognized oversize policy. Valid values: abort, reject"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub buffer_capacity: usize,
    pub retry: RetryPolicy,
    pub oversize: OversizePolicy,
    /// Where the statistics report is written at cleanup.
    pub report_path: PathBuf,
    /// Restrict 1080p H.264 to I/P frames. See [`crate::utils::requires_ip_only_workaround`].
    pub ip_only_workaround: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DECODER_BUFFER_SIZE,
            retry: Default::default(),
            oversize: Default::default(),
            report_path: PathBuf::from("aml_decoder.stats"),
            ip_only_workaround: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("video format {0:#x} not supported")]
    UnsupportedFormat(i32),
    #[error("invalid refresh rate {0}")]
    InvalidRefreshRate(u32),
    #[error("not enough memory to initialize frame buffer: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("codec init error: {0}")]
    DeviceInitFailed(#[source] DeviceError),
    #[error("can't set free-run mode: {0}")]
    FreerunFailed(#[source] DeviceError),
    #[error("cannot set up a session in state {0:?}")]
    InvalidState(SessionState),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("cannot submit in state {0:?}")]
    InvalidState(SessionState),
    #[error("decode unit of {len} bytes does not fit in a {capacity} bytes buffer")]
    OversizedDecodeUnit { len: usize, capacity: usize },
    #[error("decode unit announced {expected} bytes but carried {copied}")]
    LengthMismatch { expected: usize, copied: usize },
}

impl CodecParams {
    /// Selects the device profile for a stream.
    pub fn for_stream(
        format: EncodedFormat,
        resolution: Resolution,
        refresh_rate: u32,
        ip_only_workaround: bool,
    ) -> Result<Self, SetupError> {
        if refresh_rate == 0 {
            return Err(SetupError::InvalidRefreshRate(refresh_rate));
        }

        let mut param = 0;
        let video_type = match format {
            EncodedFormat::H264 if resolution.exceeds_full_hd() => VideoType::H264_4K2K,
            EncodedFormat::H264 => {
                if ip_only_workaround && resolution == Resolution::from((1920, 1080)) {
                    param |= UCODE_IP_ONLY_PARAM;
                }
                VideoType::H264
            }
            EncodedFormat::H265 => VideoType::Hevc,
        };

        Ok(Self {
            video_type,
            resolution,
            rate: RATE_TIMEBASE / refresh_rate,
            param: param | SYNC_OUTSIDE,
        })
    }
}

/// Applies `policy` to a decode unit of `len` bytes that cannot fit in a `capacity` bytes buffer.
fn refuse_oversized(policy: OversizePolicy, len: usize, capacity: usize) -> SubmitError {
    log::error!("Video decode buffer too small, {} >= {}", len, capacity);
    match policy {
        OversizePolicy::Abort => std::process::exit(1),
        OversizePolicy::Reject => SubmitError::OversizedDecodeUnit { len, capacity },
    }
}

/// A stream being decoded by a codec device.
pub struct DecoderSession<D: CodecDevice, C: Clock = MonotonicClock> {
    state: SessionState,
    config: DecoderConfig,
    device: D,
    clock: C,
    /// Scratch buffer, only allocated while the session is open.
    buffer: Option<FrameBuffer>,
    params: Option<CodecParams>,
    stats: DecoderStats,
}

impl<D: CodecDevice> DecoderSession<D> {
    pub fn new(device: D, config: DecoderConfig) -> Self {
        Self::with_clock(device, config, MonotonicClock)
    }
}

impl<D: CodecDevice, C: Clock> DecoderSession<D, C> {
    pub fn with_clock(device: D, config: DecoderConfig, clock: C) -> Self {
        Self {
            state: Default::default(),
            config,
            device,
            clock,
            buffer: None,
            params: None,
            stats: Default::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Profile the device was opened with, if the session is open.
    pub fn params(&self) -> Option<&CodecParams> {
        self.params.as_ref()
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Opens the device for a stream of `format` at `width`x`height` displayed at
    /// `refresh_rate` Hz.
    ///
    /// On error the session stays uninitialized and nothing is left open.
    pub fn setup(
        &mut self,
        format: EncodedFormat,
        width: u32,
        height: u32,
        refresh_rate: u32,
        flags: u32,
    ) -> Result<(), SetupError> {
        if self.state != SessionState::Uninitialized {
            return Err(SetupError::InvalidState(self.state));
        }

        let params = CodecParams::for_stream(
            format,
            Resolution::from((width, height)),
            refresh_rate,
            self.config.ip_only_workaround,
        )?;

        let buffer = FrameBuffer::new(self.config.buffer_capacity)?;

        self.device
            .open(&params)
            .map_err(SetupError::DeviceInitFailed)?;

        if let Err(e) = self.device.set_freerun_mode(true) {
            self.device.close();
            return Err(SetupError::FreerunFailed(e));
        }

        log::info!(
            "decoder open: {:?} {}x{} rate {} param {:#x} flags {:#x}",
            params.video_type,
            width,
            height,
            params.rate,
            params.param,
            flags
        );

        self.buffer = Some(buffer);
        self.params = Some(params);
        self.state = SessionState::Open;

        Ok(())
    }

    /// Reassembles `unit` and writes it to the device.
    ///
    /// Backpressure from the device is waited out according to the retry policy. Any other
    /// device failure resets the device and is reported as [`SubmitOutcome::NeedKeyframe`].
    pub fn submit(&mut self, unit: &DecodeUnit) -> Result<SubmitOutcome, SubmitError> {
        if self.state != SessionState::Open {
            return Err(SubmitError::InvalidState(self.state));
        }
        let buffer = self
            .buffer
            .as_mut()
            .ok_or(SubmitError::InvalidState(self.state))?;

        let capacity = buffer.capacity();
        if unit.full_length == 0 || unit.full_length >= capacity {
            return Err(refuse_oversized(self.config.oversize, unit.full_length, capacity));
        }

        let start = self.clock.now();

        // The unit is only accounted for once it is known to be complete.
        let copied = match buffer.reassemble(unit.fragments.iter().copied()) {
            Ok(copied) => copied,
            Err(_) => {
                let len = unit.fragments.iter().map(|f| f.len()).sum();
                return Err(refuse_oversized(self.config.oversize, len, capacity));
            }
        };
        if copied != unit.full_length {
            log::error!(
                "frame {} announced {} bytes but carried {}",
                unit.frame_number,
                unit.full_length,
                copied
            );
            return Err(SubmitError::LengthMismatch {
                expected: unit.full_length,
                copied,
            });
        }

        self.stats.roll_window(start);
        self.stats.record_frame(unit.frame_number);

        let mut retries = 0;
        let outcome = loop {
            match self.device.write(buffer.as_slice()) {
                Ok(_) => break SubmitOutcome::Ok,
                Err(DeviceError::Backpressure) if self.config.retry.allows(retries) => {
                    log::debug!("EAGAIN triggered, trying again...");
                    self.clock.sleep(self.config.retry.interval);
                    retries += 1;
                }
                Err(e) => {
                    let e = match e {
                        DeviceError::Backpressure => {
                            anyhow!("device still busy after {} retries", retries)
                        }
                        DeviceError::Other(e) => e,
                    };
                    log::error!("codec write error on frame {}: {:#}", unit.frame_number, e);
                    self.stats.record_device_drop();
                    if let Err(e) = self.device.reset() {
                        log::error!("codec reset failed: {}", e);
                    }
                    break SubmitOutcome::NeedKeyframe;
                }
            }
        };

        let end = self.clock.now();
        self.stats
            .add_decode_time(end.saturating_duration_since(start));

        Ok(outcome)
    }

    /// Closes the device and writes the statistics report.
    ///
    /// The session is closed even if the report cannot be written.
    pub fn cleanup(&mut self) -> anyhow::Result<StatsReport> {
        if self.state != SessionState::Open {
            return Err(anyhow!("cannot clean up a session in state {:?}", self.state));
        }

        self.device.close();
        self.buffer = None;
        self.params = None;
        self.state = SessionState::Closed;

        let report = StatsReport::from(&self.stats);
        report.write_to(&self.config.report_path)?;
        log::info!(
            "decoder closed after {} frames, stats written to {}",
            self.stats.total_frames(),
            self.config.report_path.display()
        );

        Ok(report)
    }
}

impl<D: CodecDevice, C: Clock> Drop for DecoderSession<D, C> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.device.close();
        }
    }
}
