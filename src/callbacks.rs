// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Integer-coded renderer callbacks expected by streaming hosts.
//!
//! Hosts drive a video renderer through three calls returning plain status codes and read a
//! capability mask telling them how decode units may be delivered. [`AmlRenderer`] maps that
//! protocol onto a [`DecoderSession`].

use crate::backend::CodecDevice;
use crate::decoder::DecodeUnit;
use crate::decoder::DecoderConfig;
use crate::decoder::DecoderSession;
use crate::decoder::SetupError;
use crate::decoder::SubmitOutcome;
use crate::utils::Clock;
use crate::utils::MonotonicClock;
use crate::EncodedFormat;

/// The decode unit was accepted.
pub const DR_OK: i32 = 0;
/// The decoder lost its reference and needs an IDR frame.
pub const DR_NEED_IDR: i32 = -1;

/// Decode units are submitted from the receive thread, without an intermediate queue.
pub const CAPABILITY_DIRECT_SUBMIT: u32 = 0x1;

/// Capability asking the host for `slices` slices per frame.
pub const fn capability_slices_per_frame(slices: u8) -> u32 {
    (slices as u32) << 24
}

/// Setup failed because the format is not supported.
pub const SETUP_UNSUPPORTED_FORMAT: i32 = -1;
/// Setup failed for any other reason.
pub const SETUP_FAILED: i32 = -2;

/// Renderer callbacks as invoked by the host.
pub trait DecoderRenderer {
    /// Returns 0 on success or a negative error code.
    fn setup(
        &mut self,
        video_format: i32,
        width: u32,
        height: u32,
        redraw_rate: u32,
        flags: u32,
    ) -> i32;

    fn cleanup(&mut self);

    /// Returns [`DR_OK`] or [`DR_NEED_IDR`].
    fn submit_decode_unit(&mut self, unit: &DecodeUnit) -> i32;

    fn capabilities(&self) -> u32;
}

/// Renderer backed by a single decoder session.
pub struct AmlRenderer<D: CodecDevice, C: Clock = MonotonicClock> {
    session: DecoderSession<D, C>,
}

impl<D: CodecDevice> AmlRenderer<D> {
    pub fn new(device: D, config: DecoderConfig) -> Self {
        Self {
            session: DecoderSession::new(device, config),
        }
    }
}

impl<D: CodecDevice, C: Clock> AmlRenderer<D, C> {
    pub fn from_session(session: DecoderSession<D, C>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &DecoderSession<D, C> {
        &self.session
    }
}

impl<D: CodecDevice, C: Clock> DecoderRenderer for AmlRenderer<D, C> {
    fn setup(
        &mut self,
        video_format: i32,
        width: u32,
        height: u32,
        redraw_rate: u32,
        flags: u32,
    ) -> i32 {
        let result = EncodedFormat::n(video_format)
            .ok_or(SetupError::UnsupportedFormat(video_format))
            .and_then(|format| self.session.setup(format, width, height, redraw_rate, flags));

        match result {
            Ok(()) => 0,
            Err(e) => {
                log::error!("{}", e);
                match e {
                    SetupError::UnsupportedFormat(_) => SETUP_UNSUPPORTED_FORMAT,
                    _ => SETUP_FAILED,
                }
            }
        }
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.session.cleanup() {
            log::error!("{:#}", e);
        }
    }

    fn submit_decode_unit(&mut self, unit: &DecodeUnit) -> i32 {
        match self.session.submit(unit) {
            Ok(SubmitOutcome::Ok) => DR_OK,
            Ok(SubmitOutcome::NeedKeyframe) => DR_NEED_IDR,
            Err(e) => {
                log::error!("frame {} not submitted: {}", unit.frame_number, e);
                DR_NEED_IDR
            }
        }
    }

    fn capabilities(&self) -> u32 {
        CAPABILITY_DIRECT_SUBMIT | capability_slices_per_frame(8)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::backend::dummy::Backend;
    use crate::backend::dummy::WriteResponse;
    use crate::decoder::OversizePolicy;
    use crate::decoder::SessionState;
    use crate::utils::test_path;

    fn renderer(backend: Backend) -> AmlRenderer<Backend> {
        AmlRenderer::new(
            backend,
            DecoderConfig {
                oversize: OversizePolicy::Reject,
                report_path: test_path("renderer.stats"),
                ..Default::default()
            },
        )
    }

    #[test]
    fn capabilities_mask() {
        let renderer = renderer(Backend::new());
        assert_eq!(renderer.capabilities(), 0x0800_0001);
    }

    #[test]
    fn setup_codes() {
        let mut renderer = renderer(Backend::new());
        assert_eq!(renderer.setup(0x0200, 1280, 720, 60, 0), SETUP_UNSUPPORTED_FORMAT);
        assert_eq!(renderer.setup(0x0001, 1280, 720, 0, 0), SETUP_FAILED);
        assert_eq!(renderer.session().state(), SessionState::Uninitialized);

        assert_eq!(renderer.setup(0x0100, 3840, 2160, 60, 0), 0);
        assert_eq!(renderer.session().state(), SessionState::Open);
    }

    #[test]
    fn submit_codes() {
        let mut renderer = renderer(Backend::with_responses([
            WriteResponse::Accept,
            WriteResponse::Fail,
        ]));
        assert_eq!(renderer.setup(0x0001, 1280, 720, 60, 0), 0);

        let fragments: [&[u8]; 1] = [b"frame"];
        assert_eq!(renderer.submit_decode_unit(&DecodeUnit::new(0, &fragments)), DR_OK);
        assert_eq!(
            renderer.submit_decode_unit(&DecodeUnit::new(1, &fragments)),
            DR_NEED_IDR
        );

        renderer.cleanup();
        assert_eq!(renderer.session().state(), SessionState::Closed);
        let path = &renderer.session().config().report_path;
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("NetworkDroppedFrames = 1\n"));
        fs::remove_file(path).unwrap();
    }
}
