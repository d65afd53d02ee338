// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Hardware-accelerated video decoding for Amlogic stream devices.
//!
//! Compressed decode units handed over by a streaming host are reassembled into a contiguous
//! buffer and pushed to the stream device through a [`decoder::DecoderSession`], which also keeps
//! frame-loss and timing statistics and persists them when the stream ends. Hosts speaking the
//! integer-coded callback protocol can use [`callbacks::AmlRenderer`].

pub mod backend;
pub mod callbacks;
pub mod decoder;
pub mod utils;

use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Whether this resolution needs the 4K2K decoding profile.
    pub fn exceeds_full_hd(&self) -> bool {
        self.width > 1920 || self.height > 1080
    }
}

impl From<(u32, u32)> for Resolution {
    fn from(value: (u32, u32)) -> Self {
        Self {
            width: value.0,
            height: value.1,
        }
    }
}

/// Compressed formats a host may ask for, with their wire codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, enumn::N)]
#[repr(i32)]
pub enum EncodedFormat {
    H264 = 0x0001,
    H265 = 0x0100,
}

impl FromStr for EncodedFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h264" | "H264" => Ok(EncodedFormat::H264),
            "h265" | "H265" | "hevc" | "HEVC" => Ok(EncodedFormat::H265),
            _ => Err("unrecognized input format. Valid values: h264, h265"),
        }
    }
}
