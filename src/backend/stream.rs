// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Backend feeding an elementary stream node of the Amlogic stream driver.
//!
//! The node is opened non-blocking so that a full input ring shows up as `EAGAIN` instead of a
//! stalled write. Resetting the device reopens the node, which makes the driver discard whatever
//! was still queued.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;

use anyhow::anyhow;
use anyhow::Context;
use nix::errno::Errno;
use nix::fcntl::OFlag;

use crate::backend::CodecDevice;
use crate::backend::CodecParams;
use crate::backend::DeviceError;
use crate::backend::DeviceResult;

pub struct StreamDevice {
    /// Node to write to. When `None`, the node is derived from the profile at open time.
    node: Option<PathBuf>,
    /// Optional control file accepting "1"/"0" to toggle free-run playback.
    freerun_control: Option<PathBuf>,
    file: Option<File>,
    opened_node: Option<PathBuf>,
}

impl Default for StreamDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDevice {
    /// Creates a device writing to the stream node matching the profile it is opened with.
    pub fn new() -> Self {
        Self {
            node: None,
            freerun_control: None,
            file: None,
            opened_node: None,
        }
    }

    /// Creates a device writing to `node` regardless of the profile.
    pub fn with_node<P: Into<PathBuf>>(node: P) -> Self {
        Self {
            node: Some(node.into()),
            ..Self::new()
        }
    }

    /// Sets the control file written to by [`CodecDevice::set_freerun_mode`].
    pub fn freerun_control<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.freerun_control = Some(path.into());
        self
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn open_node(path: &Path) -> anyhow::Result<File> {
        OpenOptions::new()
            .write(true)
            .custom_flags((OFlag::O_NONBLOCK | OFlag::O_CLOEXEC).bits())
            .open(path)
            .with_context(|| format!("cannot open stream node {}", path.display()))
    }
}

impl CodecDevice for StreamDevice {
    fn open(&mut self, params: &CodecParams) -> DeviceResult<()> {
        let node = self
            .node
            .clone()
            .unwrap_or_else(|| PathBuf::from(params.video_type.stream_node()));

        let file = Self::open_node(&node)?;
        log::debug!(
            "opened {} for {:?} {}x{} rate {} param {:#x}",
            node.display(),
            params.video_type,
            params.resolution.width,
            params.resolution.height,
            params.rate,
            params.param
        );

        self.file = Some(file);
        self.opened_node = Some(node);
        Ok(())
    }

    fn set_freerun_mode(&mut self, enable: bool) -> DeviceResult<()> {
        if self.file.is_none() {
            return Err(anyhow!("stream device is not open").into());
        }

        match &self.freerun_control {
            Some(path) => {
                let mut control = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .with_context(|| format!("cannot open {}", path.display()))?;
                control
                    .write_all(if enable { b"1" } else { b"0" })
                    .with_context(|| format!("cannot write to {}", path.display()))?;
            }
            None => log::debug!("no free-run control configured, leaving playback mode as is"),
        }

        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> DeviceResult<usize> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| anyhow!("stream device is not open"))?;

        match nix::unistd::write(file, buf) {
            Ok(written) => Ok(written),
            Err(Errno::EAGAIN) => Err(DeviceError::Backpressure),
            Err(errno) => Err(anyhow!("write to stream node failed: {}", errno).into()),
        }
    }

    fn reset(&mut self) -> DeviceResult<()> {
        let node = self
            .opened_node
            .clone()
            .ok_or_else(|| anyhow!("cannot reset a stream device that was never opened"))?;

        self.file = None;
        self.file = Some(Self::open_node(&node)?);
        log::debug!("reopened {}", node.display());

        Ok(())
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            log::debug!("closed stream node");
        }
        self.opened_node = None;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::backend::VideoType;
    use crate::backend::SYNC_OUTSIDE;
    use crate::utils::test_path;
    use crate::Resolution;

    fn params() -> CodecParams {
        CodecParams {
            video_type: VideoType::H264,
            resolution: Resolution::from((1280, 720)),
            rate: 1600,
            param: SYNC_OUTSIDE,
        }
    }

    #[test]
    fn writes_reach_the_node() {
        let node = test_path("stream_node");
        fs::write(&node, b"").unwrap();

        let mut device = StreamDevice::with_node(&node);
        device.open(&params()).unwrap();
        assert_eq!(device.write(b"\x00\x00\x00\x01\x65").unwrap(), 5);
        device.close();
        assert!(!device.is_open());

        assert_eq!(fs::read(&node).unwrap(), b"\x00\x00\x00\x01\x65");
        fs::remove_file(node).unwrap();
    }

    #[test]
    fn freerun_toggles_control_file() {
        let node = test_path("freerun_node");
        let control = test_path("freerun_control");
        fs::write(&node, b"").unwrap();
        fs::write(&control, b"0").unwrap();

        let mut device = StreamDevice::with_node(&node).freerun_control(&control);
        device.open(&params()).unwrap();
        device.set_freerun_mode(true).unwrap();
        assert_eq!(fs::read(&control).unwrap(), b"1");

        fs::remove_file(node).unwrap();
        fs::remove_file(control).unwrap();
    }

    #[test]
    fn missing_node_fails_to_open() {
        let mut device = StreamDevice::with_node(test_path("does_not_exist/node"));
        assert!(matches!(
            device.open(&params()),
            Err(DeviceError::Other(_))
        ));
        assert!(!device.is_open());
    }

    #[test]
    fn write_before_open_is_a_hard_error() {
        let mut device = StreamDevice::new();
        assert!(matches!(device.write(b"x"), Err(DeviceError::Other(_))));
        assert!(device.reset().is_err());
    }
}
