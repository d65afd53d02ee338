#![no_main]

use std::time::Duration;

use aml_codecs::backend::stream::StreamDevice;
use aml_codecs::decoder::DecodeUnit;
use aml_codecs::decoder::DecoderConfig;
use aml_codecs::decoder::DecoderSession;
use aml_codecs::decoder::OversizePolicy;
use aml_codecs::utils::IvfIterator;
use aml_codecs::utils::ManualClock;
use aml_codecs::EncodedFormat;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = DecoderConfig {
        buffer_capacity: 4096,
        oversize: OversizePolicy::Reject,
        report_path: std::env::temp_dir().join("aml-codecs-fuzz.stats"),
        ..Default::default()
    };
    let clock = ManualClock::new();
    let mut session =
        DecoderSession::with_clock(StreamDevice::with_node("/dev/null"), config, clock.clone());
    if session.setup(EncodedFormat::H264, 1280, 720, 60, 0).is_err() {
        return;
    }

    let mut frame_number = 0i32;
    for packet in IvfIterator::new(data) {
        // The first byte of each packet drives frame numbering and timing.
        let (control, payload) = match packet.split_first() {
            Some(split) => split,
            None => continue,
        };
        frame_number = frame_number.wrapping_add(i32::from(*control & 0x7) - 1);
        clock.advance(Duration::from_millis(u64::from(*control >> 3) * 16));

        let split = usize::from(*control) % (payload.len() + 1);
        let fragments = [&payload[..split], &payload[split..]];
        let _ = session.submit(&DecodeUnit::new(frame_number, &fragments));
    }

    let _ = session.cleanup();
});
