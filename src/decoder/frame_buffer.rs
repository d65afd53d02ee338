// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Scratch buffer decode units are reassembled into before being written to the device.

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{requested} bytes do not fit in a frame buffer of {capacity} bytes")]
pub struct CapacityExceeded {
    pub capacity: usize,
    pub requested: usize,
}

/// Contiguous buffer with a fixed capacity, allocated once and reused for every frame.
///
/// Appending never reallocates: data that would not fit is refused with [`CapacityExceeded`].
#[derive(Debug)]
pub struct FrameBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl FrameBuffer {
    /// Allocates a buffer able to hold `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;

        Ok(Self { data, capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Copies `fragment` after the data already in the buffer.
    pub fn append(&mut self, fragment: &[u8]) -> Result<(), CapacityExceeded> {
        let requested = self.data.len() + fragment.len();
        if requested > self.capacity {
            return Err(CapacityExceeded {
                capacity: self.capacity,
                requested,
            });
        }

        self.data.extend_from_slice(fragment);
        Ok(())
    }

    /// Replaces the content of the buffer with the concatenation of `fragments`, in order.
    ///
    /// Returns the number of bytes now in the buffer. On error the buffer holds the fragments
    /// that did fit.
    pub fn reassemble<'a, I>(&mut self, fragments: I) -> Result<usize, CapacityExceeded>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        self.clear();
        for fragment in fragments {
            self.append(fragment)?;
        }

        Ok(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembly_is_exact() {
        let fragments: [&[u8]; 3] = [b"\x00\x00\x00\x01\x67", b"", b"\x42\x00\x1f"];
        let mut buffer = FrameBuffer::new(16).unwrap();

        assert_eq!(buffer.reassemble(fragments).unwrap(), 8);
        assert_eq!(buffer.as_slice(), b"\x00\x00\x00\x01\x67\x42\x00\x1f");
    }

    #[test]
    fn reassembly_discards_previous_frame() {
        let mut buffer = FrameBuffer::new(8).unwrap();
        buffer.reassemble([&b"abcdefgh"[..]]).unwrap();

        assert_eq!(buffer.reassemble([&b"xy"[..], &b"z"[..]]).unwrap(), 3);
        assert_eq!(buffer.as_slice(), b"xyz");
    }

    #[test]
    fn append_refuses_overflow() {
        let mut buffer = FrameBuffer::new(4).unwrap();
        buffer.append(b"abc").unwrap();

        assert_eq!(
            buffer.append(b"de"),
            Err(CapacityExceeded {
                capacity: 4,
                requested: 5
            })
        );
        assert_eq!(buffer.as_slice(), b"abc");

        buffer.append(b"d").unwrap();
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn fill_does_not_reallocate() {
        let mut buffer = FrameBuffer::new(1024).unwrap();
        let start = buffer.as_slice().as_ptr();

        buffer.reassemble([&[0xaa_u8; 1000][..], &[0x55_u8; 24][..]]).unwrap();
        assert_eq!(buffer.as_slice().as_ptr(), start);
        assert_eq!(buffer.as_slice()[999], 0xaa);
        assert_eq!(buffer.as_slice()[1000], 0x55);
    }

    #[test]
    fn huge_allocation_is_reported() {
        assert!(FrameBuffer::new(usize::MAX).is_err());
    }
}
