// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use aml_codecs::backend::stream::StreamDevice;
use aml_codecs::callbacks::AmlRenderer;
use aml_codecs::callbacks::DecoderRenderer;
use aml_codecs::callbacks::DR_OK;
use aml_codecs::decoder::DecodeUnit;
use aml_codecs::decoder::DecoderConfig;
use aml_codecs::decoder::DecoderSession;
use aml_codecs::decoder::OversizePolicy;
use aml_codecs::utils::ManualClock;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("aml-codecs-it-{}-{}", std::process::id(), name))
}

#[test]
fn stream_of_two_seconds() {
    let _ = env_logger::builder().is_test(true).try_init();

    let node = temp_path("two_seconds.es");
    let stats = temp_path("two_seconds.stats");
    fs::write(&node, b"").unwrap();

    let clock = ManualClock::new();
    let session = DecoderSession::with_clock(
        StreamDevice::with_node(&node),
        DecoderConfig {
            oversize: OversizePolicy::Reject,
            report_path: stats.clone(),
            ..Default::default()
        },
        clock.clone(),
    );
    let mut renderer = AmlRenderer::from_session(session);
    assert_eq!(renderer.setup(0x0001, 1920, 1080, 60, 0), 0);

    let mut expected = Vec::new();
    let mut frame_number = 0;
    // 60 frames during the first second, 50 during the second one with 10 lost on the way.
    for (second, sent) in [(0u64, 60u64), (1, 50)] {
        let step = 1000 / sent;
        for i in 0..sent {
            let header = [0u8, 0, 0, 1, 0x65];
            let body = (frame_number as u32).to_le_bytes();
            let fragments: [&[u8]; 2] = [&header, &body];

            assert_eq!(
                renderer.submit_decode_unit(&DecodeUnit::new(frame_number, &fragments)),
                DR_OK
            );
            expected.extend_from_slice(&header);
            expected.extend_from_slice(&body);

            frame_number += if second == 1 && i % 5 == 4 { 2 } else { 1 };
            clock.advance(Duration::from_millis(step));
        }
        clock.advance(Duration::from_millis(1000 - sent * step));
    }
    // One more frame to close the second window.
    let fragments: [&[u8]; 1] = [b"\x00\x00\x00\x01\x41"];
    renderer.submit_decode_unit(&DecodeUnit::new(frame_number, &fragments));
    expected.extend_from_slice(fragments[0]);

    renderer.cleanup();

    assert_eq!(fs::read(&node).unwrap(), expected);
    assert_eq!(
        fs::read_to_string(&stats).unwrap(),
        "StreamStatus = 1\n\
         AverageFPS = 50\n\
         LowestFPS = 50\n\
         HighestFPS = 60\n\
         NetworkDroppedFrames = 10\n\
         AvgDecodingTime = 0 us"
    );

    fs::remove_file(node).unwrap();
    fs::remove_file(stats).unwrap();
}
