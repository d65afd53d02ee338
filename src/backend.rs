// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Codec devices the decoder pushes compressed data into.
//!
//! A backend is the provider of the actual decoding, most likely a vendor stream device. The
//! decoder only needs a narrow contract from it: open with a profile, accept byte buffers while
//! signalling when it is temporarily full, and reset after corruption. This module defines that
//! contract and the profile handed to the device.

#[cfg(test)]
pub(crate) mod dummy;
pub mod stream;

use thiserror::Error;

use crate::Resolution;

/// Sysinfo flag telling the firmware that A/V sync is driven by the caller.
pub const SYNC_OUTSIDE: u32 = 0x02;
/// Sysinfo flag restricting the H.264 microcode to I and P frames.
pub const UCODE_IP_ONLY_PARAM: u32 = 0x08;

/// Decoding profile selected by the device firmware.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VideoType {
    H264,
    H264_4K2K,
    Hevc,
}

impl VideoType {
    /// Name of the elementary stream node this profile is fed through.
    pub fn stream_node(&self) -> &'static str {
        match self {
            VideoType::H264 | VideoType::H264_4K2K => "/dev/amstream_vbuf",
            VideoType::Hevc => "/dev/amstream_hevc",
        }
    }
}

/// Parameters a device is opened with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecParams {
    pub video_type: VideoType,
    pub resolution: Resolution,
    /// Frame duration in 1/96000 s units.
    pub rate: u32,
    /// Combination of [`SYNC_OUTSIDE`] and [`UCODE_IP_ONLY_PARAM`].
    pub param: u32,
}

impl CodecParams {
    pub fn is_ip_only(&self) -> bool {
        self.param & UCODE_IP_ONLY_PARAM != 0
    }
}

/// Error returned by codec device methods.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device cannot accept more data right now")]
    Backpressure,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Contract between the decoder session and the hardware decoding unit.
pub trait CodecDevice {
    /// Opens the device and configures it for `params`.
    fn open(&mut self, params: &CodecParams) -> DeviceResult<()>;

    /// Lets the device pace output independently of the input cadence.
    fn set_freerun_mode(&mut self, enable: bool) -> DeviceResult<()>;

    /// Pushes `buf` into the device and returns the number of bytes accepted.
    ///
    /// [`DeviceError::Backpressure`] means nothing was consumed and the call can be retried.
    fn write(&mut self, buf: &[u8]) -> DeviceResult<usize>;

    /// Drops any data queued in the device so decoding can restart from a key frame.
    fn reset(&mut self) -> DeviceResult<()>;

    /// Closes the device. Closing a device that is not open does nothing.
    fn close(&mut self);
}
