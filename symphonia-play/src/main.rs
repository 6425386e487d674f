// Symphonia
// Copyright (c) 2019 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::fs::File;
use std::path::Path;
use std::process::exit;

use symphonia::core::audio::{Audio, GenericAudioBufferRef};
use symphonia::core::codecs::audio::AudioDecoderOptions;
use symphonia::core::errors::{Result, SymphoniaError};
use symphonia::core::formats::{FormatOptions, FormatReader, TrackType};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions, ReadOnlySource};
use symphonia::default::formats::AsfReader;

use clap::{App, Arg};
use log::{error, warn};

fn main() {
    pretty_env_logger::init();

    let matches = App::new("Symphonia Play")
        .version("1.0")
        .author("Philip Deljanov <philip.deljanov@gmail.com>")
        .about("Decode a WMA file stored in an ASF container to a WAV file")
        .arg(Arg::with_name("INPUT").help("The input .wma file path").required(true).index(1))
        .arg(Arg::with_name("OUTPUT").help("The output .wav file path").required(true).index(2))
        .get_matches();

    let input_path = matches.value_of("INPUT").unwrap();
    let output_path = matches.value_of("OUTPUT").unwrap();

    if let Err(err) = run(input_path, output_path) {
        error!("{}", err);
        exit(1);
    }
}

fn run(input_path: &str, output_path: &str) -> Result<()> {
    let file = File::open(Path::new(input_path)).map_err(SymphoniaError::from)?;

    let mss = MediaSourceStream::new(
        Box::new(ReadOnlySource::new(file)),
        MediaSourceStreamOptions::default(),
    );

    let mut format = AsfReader::try_new(mss, &FormatOptions::default())?;

    let track = format
        .first_track(TrackType::Audio)
        .ok_or(SymphoniaError::Unsupported("no audio track found"))?
        .clone();

    let codec_params = track
        .codec_params
        .as_ref()
        .and_then(|params| params.audio())
        .ok_or(SymphoniaError::Unsupported("track has no audio codec parameters"))?
        .clone();

    let codecs = symphonia::default::get_codecs();
    let decoder_opts = AudioDecoderOptions::default();
    let mut decoder = codecs.make_audio_decoder(&codec_params, &decoder_opts)?;

    let rate = codec_params.sample_rate.unwrap_or(44_100);
    let channels = codec_params.channels.as_ref().map_or(1, |c| c.count()) as u16;

    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(output_path, spec).map_err(|err| {
        SymphoniaError::IoError(Box::new(std::io::Error::new(std::io::ErrorKind::Other, err)))
    })?;

    loop {
        let packet = match format.next_packet()? {
            Some(packet) => packet,
            None => break,
        };

        match decoder.decode(&packet) {
            Ok(decoded) => write_samples(decoded, &mut writer)?,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("decode error: {}", msg);
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    writer
        .finalize()
        .map_err(|err| SymphoniaError::IoError(Box::new(std::io::Error::new(std::io::ErrorKind::Other, err))))
}

fn write_samples(
    decoded: GenericAudioBufferRef<'_>,
    writer: &mut hound::WavWriter<std::io::BufWriter<File>>,
) -> Result<()> {
    let io_err = |err: hound::Error| {
        SymphoniaError::IoError(Box::new(std::io::Error::new(std::io::ErrorKind::Other, err)))
    };

    match decoded {
        GenericAudioBufferRef::S16(buf) => {
            let num_planes = buf.num_planes();
            for frame in 0..buf.frames() {
                for ch in 0..num_planes {
                    let plane = buf.plane(ch).unwrap();
                    writer.write_sample(plane[frame]).map_err(io_err)?;
                }
            }
        }
        GenericAudioBufferRef::F32(buf) => {
            let num_planes = buf.num_planes();
            for frame in 0..buf.frames() {
                for ch in 0..num_planes {
                    let plane = buf.plane(ch).unwrap();
                    let sample = (plane[frame].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    writer.write_sample(sample).map_err(io_err)?;
                }
            }
        }
        _ => return Err(SymphoniaError::Unsupported("unexpected decoded sample format")),
    }

    Ok(())
}
