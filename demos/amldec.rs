// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! amldec, a simple program feeding an IVF stream to an Amlogic stream device through
//! aml-codecs, the way a streaming host would.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use aml_codecs::backend::stream::StreamDevice;
use aml_codecs::callbacks::AmlRenderer;
use aml_codecs::callbacks::DecoderRenderer;
use aml_codecs::callbacks::DR_OK;
use aml_codecs::decoder::DecodeUnit;
use aml_codecs::decoder::DecoderConfig;
use aml_codecs::decoder::OversizePolicy;
use aml_codecs::utils::requires_ip_only_workaround;
use aml_codecs::utils::IvfIterator;
use aml_codecs::EncodedFormat;
use argh::FromArgs;

/// Submit an IVF stream to an Amlogic decoder
#[derive(Debug, FromArgs)]
struct Args {
    /// input IVF file
    #[argh(positional)]
    input: PathBuf,

    /// input format. Default: h264
    #[argh(option, default = "EncodedFormat::H264")]
    input_format: EncodedFormat,

    /// stream width. Default: 1920
    #[argh(option, default = "1920")]
    width: u32,

    /// stream height. Default: 1080
    #[argh(option, default = "1080")]
    height: u32,

    /// display refresh rate in Hz. Default: 60
    #[argh(option, default = "60")]
    refresh_rate: u32,

    /// device node to write to instead of the one matching the format
    #[argh(option)]
    node: Option<PathBuf>,

    /// control file toggling free-run playback
    #[argh(option)]
    freerun_control: Option<PathBuf>,

    /// split every packet into fragments of at most this many bytes. Default: 4096
    #[argh(option, default = "4096")]
    fragment_size: usize,

    /// what to do with packets that do not fit the decoder buffer (abort, reject). Default: abort
    #[argh(option, default = "OversizePolicy::Abort")]
    oversize: OversizePolicy,

    /// where to write the decoder statistics. Default: aml_decoder.stats
    #[argh(option, default = "PathBuf::from(\"aml_decoder.stats\")")]
    stats: PathBuf,

    /// print the MD5 of the submitted stream
    #[argh(switch)]
    compute_md5: bool,
}

fn main() {
    env_logger::init();

    let args: Args = argh::from_env();

    let input = {
        let mut buf = Vec::new();
        File::open(&args.input)
            .expect("error opening input file")
            .read_to_end(&mut buf)
            .expect("error reading input file");
        buf
    };

    let mut device = match &args.node {
        Some(node) => StreamDevice::with_node(node),
        None => StreamDevice::new(),
    };
    if let Some(control) = &args.freerun_control {
        device = device.freerun_control(control);
    }

    let config = DecoderConfig {
        oversize: args.oversize,
        report_path: args.stats.clone(),
        ip_only_workaround: requires_ip_only_workaround(),
        ..Default::default()
    };

    let mut renderer = AmlRenderer::new(device, config);
    let ret = renderer.setup(
        args.input_format as i32,
        args.width,
        args.height,
        args.refresh_rate,
        0,
    );
    if ret != 0 {
        eprintln!("decoder setup failed: {}", ret);
        std::process::exit(1);
    }

    let fragment_size = args.fragment_size.max(1);
    let mut md5_context = md5::Context::new();
    let mut idr_requests = 0;

    for (frame_number, packet) in IvfIterator::new(&input).enumerate() {
        let fragments: Vec<&[u8]> = packet.chunks(fragment_size).collect();
        let unit = DecodeUnit::new(frame_number as i32, &fragments);

        if renderer.submit_decode_unit(&unit) == DR_OK {
            if args.compute_md5 {
                md5_context.consume(packet);
            }
        } else {
            idr_requests += 1;
        }
    }

    let stats = renderer.session().stats();
    println!(
        "submitted {} frames, {} dropped, {} key frame requests",
        stats.total_frames(),
        stats.dropped_frames(),
        idr_requests
    );

    renderer.cleanup();

    if args.compute_md5 {
        println!("{:x}", md5_context.compute());
    }
}
