// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Utility functions used by several parts of this crate.
//!
//! This module is for anything that doesn't fit into the other top-level modules. Try not to add
//! new code here unless it really doesn't belong anywhere else.

use std::cell::Cell;
use std::io::Cursor;
use std::io::Seek;
use std::rc::Rc;
use std::time::Duration;
use std::time::Instant;

use bytes::Buf;

/// Source of monotonic time for the decoder, also responsible for waiting on the device.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The system monotonic clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Clock that only moves when told to. Sleeping advances it instantly.
///
/// This is a testing aid: it lets tests and fuzzers drive the statistics windows and the
/// backpressure retries without waiting. Clones share the same time, so a test can keep one and
/// hand another to the decoder. Do not use it to decode actual streams.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
    slept: Rc<Cell<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
            slept: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Total time spent in [`Clock::sleep`].
    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        self.advance(duration);
    }
}

/// Parses the `major.minor` prefix of a kernel release string such as `3.10.104-aml`.
pub fn parse_kernel_version(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split(|c: char| !c.is_ascii_digit());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;

    Some((major, minor))
}

/// Whether a kernel release needs the I/P-only microcode to decode 1080p H.264.
///
/// Decoders shipped with kernels older than 3.14 corrupt that stream unless B frames are
/// disabled. Unparsable releases are assumed recent.
pub fn release_requires_ip_only(release: &str) -> bool {
    match parse_kernel_version(release) {
        Some((major, minor)) => major < 3 || (major == 3 && minor < 14),
        None => false,
    }
}

/// Probes the running kernel for [`release_requires_ip_only`].
pub fn requires_ip_only_workaround() -> bool {
    match nix::sys::utsname::uname() {
        Ok(name) => {
            let release = name.release().to_string_lossy();
            let required = release_requires_ip_only(&release);
            log::debug!("kernel {}: ip-only workaround {}", release, required);
            required
        }
        Err(e) => {
            log::warn!("uname failed, assuming a recent kernel: {}", e);
            false
        }
    }
}

/// Iterator over IVF packets.
pub struct IvfIterator<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> IvfIterator<'a> {
    /// Size of the IVF file header.
    const HEADER_LEN: u64 = 32;

    pub fn new(data: &'a [u8]) -> Self {
        let mut cursor = Cursor::new(data);

        // Skip the IVF header entirely. Seeking past the end is allowed and yields no packets.
        let _ = cursor.seek(std::io::SeekFrom::Start(Self::HEADER_LEN));

        Self { cursor }
    }
}

impl<'a> Iterator for IvfIterator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        // Frame header: 4 bytes of size and 8 bytes of PTS.
        if self.cursor.remaining() < 12 {
            return None;
        }

        let len = self.cursor.get_u32_le() as usize;
        // Skip PTS.
        let _ = self.cursor.get_u64_le();

        if self.cursor.remaining() < len {
            return None;
        }

        let start = self.cursor.position() as usize;
        self.cursor.advance(len);
        let end = self.cursor.position() as usize;

        Some(&self.cursor.get_ref()[start..end])
    }
}

/// Returns a path in the temporary directory that no other test uses.
#[cfg(test)]
pub(crate) fn test_path(name: &str) -> std::path::PathBuf {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);

    std::env::temp_dir().join(format!("aml-codecs-{}-{}-{}", std::process::id(), id, name))
}
