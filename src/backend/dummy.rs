// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This file contains a dummy backend whose only purpose is to let the decoder
//! run so we can test it in isolation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::anyhow;

use crate::backend::CodecDevice;
use crate::backend::CodecParams;
use crate::backend::DeviceError;
use crate::backend::DeviceResult;

/// Scripted answer to a write call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum WriteResponse {
    Accept,
    Backpressure,
    Fail,
}

/// Everything the dummy device saw, shared with the test that created it.
#[derive(Default)]
pub(crate) struct DeviceLog {
    pub params: Option<CodecParams>,
    pub open: bool,
    pub freerun: bool,
    pub write_attempts: usize,
    pub written: Vec<Vec<u8>>,
    pub resets: usize,
    pub closes: usize,
}

/// Dummy backend that accepts every write unless told otherwise.
#[derive(Default)]
pub(crate) struct Backend {
    pub log: Rc<RefCell<DeviceLog>>,
    /// Answers for upcoming writes, consumed in order. `Accept` once exhausted.
    pub responses: VecDeque<WriteResponse>,
    pub fail_open: bool,
    pub fail_freerun: bool,
}

impl Backend {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn with_responses<I: IntoIterator<Item = WriteResponse>>(responses: I) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }

    pub(crate) fn log(&self) -> Rc<RefCell<DeviceLog>> {
        Rc::clone(&self.log)
    }
}

impl CodecDevice for Backend {
    fn open(&mut self, params: &CodecParams) -> DeviceResult<()> {
        if self.fail_open {
            return Err(anyhow!("dummy open failure").into());
        }

        let mut log = self.log.borrow_mut();
        log.params = Some(params.clone());
        log.open = true;
        Ok(())
    }

    fn set_freerun_mode(&mut self, enable: bool) -> DeviceResult<()> {
        if self.fail_freerun {
            return Err(anyhow!("dummy freerun failure").into());
        }

        self.log.borrow_mut().freerun = enable;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> DeviceResult<usize> {
        let mut log = self.log.borrow_mut();
        assert!(log.open, "write on a closed dummy device");
        log.write_attempts += 1;

        match self.responses.pop_front().unwrap_or(WriteResponse::Accept) {
            WriteResponse::Accept => {
                log.written.push(buf.to_vec());
                Ok(buf.len())
            }
            WriteResponse::Backpressure => Err(DeviceError::Backpressure),
            WriteResponse::Fail => Err(anyhow!("dummy write failure").into()),
        }
    }

    fn reset(&mut self) -> DeviceResult<()> {
        self.log.borrow_mut().resets += 1;
        Ok(())
    }

    fn close(&mut self) {
        let mut log = self.log.borrow_mut();
        log.open = false;
        log.closes += 1;
    }
}
