// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! A demultiplexer for the Advanced Systems Format (ASF) container, the transport used by
//! Windows Media Audio. Only enough of ASF is implemented to locate the (single) audio stream
//! and hand its reassembled media objects to a codec: video streams, and multi-stream files in
//! general, are parsed just far enough to stay byte-aligned and are otherwise ignored.

mod guid;
mod header;
mod packet;

use std::collections::VecDeque;

use log::warn;

use symphonia_core::audio::{Channels, Position};
use symphonia_core::codecs::audio::well_known::{profiles, CODEC_ID_WMA};
use symphonia_core::codecs::audio::AudioCodecParameters;
use symphonia_core::codecs::CodecParameters;
use symphonia_core::common::FourCc;
use symphonia_core::errors::{seek_error, Result, SeekErrorKind};
use symphonia_core::formats::prelude::*;
use symphonia_core::formats::util::{SeekIndex, SeekSearchResult};
use symphonia_core::io::{MediaSourceStream, SeekFrom};
use symphonia_core::meta::{Metadata, MetadataBuilder};
use symphonia_core::units::TimeBase;

use header::{AsfHeader, AudioStreamInfo, WAVE_FORMAT_WMAV1, WAVE_FORMAT_WMAV2};
use packet::{descramble, read_packet_payloads, FragmentAssembler};

const ASF_FORMAT_INFO: FormatInfo = FormatInfo {
    format: FormatId::new(FourCc::new(*b"ASF ")),
    short_name: "asf",
    long_name: "Advanced Systems Format",
};

/// Reader/demuxer for ASF (`.wma`) streams.
///
/// Only the single audio stream described by the header is surfaced as a track; any video
/// stream declared in the header is parsed (to keep payload offsets aligned) but discarded.
pub struct AsfReader<'s> {
    reader: MediaSourceStream<'s>,
    tracks: Vec<Track>,
    metadata: Metadata,
    audio_stream_number: u8,
    packet_size: u64,
    min_packet_size: u64,
    data_offset: u64,
    avg_bytes_per_sec: u64,
    descramble_params: Option<(u8, u16, u16)>,
    time_base: TimeBase,
    preroll_ts: u64,
    assembler: FragmentAssembler,
    seek_index: SeekIndex,
    packet_index: u64,
    total_packets: u64,
    pending: VecDeque<Packet>,
    eof: bool,
}

fn codec_params_for(audio: &AudioStreamInfo) -> AudioCodecParameters {
    let profile = match audio.format_tag {
        WAVE_FORMAT_WMAV1 => Some(profiles::CODEC_PROFILE_WMA_V1),
        WAVE_FORMAT_WMAV2 => Some(profiles::CODEC_PROFILE_WMA_V2),
        _ => None,
    };

    let channels = Position::from_wave_channel_count(u32::from(audio.channels))
        .map(Channels::Positioned)
        .unwrap_or(Channels::Discrete(audio.channels));

    let mut params = AudioCodecParameters::new();
    params
        .for_codec(CODEC_ID_WMA)
        .with_sample_rate(audio.sample_rate)
        .with_channels(channels)
        .with_bits_per_coded_sample(u32::from(audio.bits_per_sample))
        .with_extra_data(audio.extra_data.clone());

    if let Some(profile) = profile {
        params.with_profile(profile);
    }

    params
}

/// Converts a container presentation timestamp, in milliseconds relative to the stream's
/// pre-roll point, into a sample-accurate [`Timestamp`] using `sample_rate` as the track's
/// timebase reciprocal.
fn ms_to_ts(ms_since_preroll: i64, sample_rate: u32) -> Timestamp {
    let ticks = ms_since_preroll.saturating_mul(i64::from(sample_rate)) / 1000;
    Timestamp::new(ticks.max(0) as u64)
}

impl<'s> AsfReader<'s> {
    /// Parses the ASF header from `reader` and returns a reader positioned at the first data
    /// packet.
    pub fn try_new(mut reader: MediaSourceStream<'s>, options: &FormatOptions) -> Result<Self> {
        let header: AsfHeader = header::parse_header(&mut reader)?;

        if header.has_video {
            warn!("asf: file contains a video stream; only the audio stream will be decoded");
        }

        let audio = header.audio.expect("parse_header guarantees an audio stream");

        let time_base =
            TimeBase::try_from_recip(audio.sample_rate).unwrap_or(TimeBase::new(1, 1));

        let codec_params = codec_params_for(&audio);

        let mut track = Track::new(0);
        track.with_codec_params(CodecParameters::Audio(codec_params)).with_flags(TrackFlags::DEFAULT);

        let preroll_ticks =
            (u64::from(header.file_props.preroll_ms) * u64::from(audio.sample_rate)) / 1000;

        if header.file_props.play_duration > 0 {
            // `play_duration` is in 100ns units; convert to samples at the track's sample rate.
            let total_samples = (u128::from(header.file_props.play_duration)
                * u128::from(audio.sample_rate)
                / 10_000_000) as u64;
            let duration = Duration::from(total_samples.saturating_sub(preroll_ticks));
            track.with_duration(duration);
        }

        let mut tags_builder = MetadataBuilder::new();
        for tag in header.tags {
            tags_builder.add_tag(tag);
        }

        let descramble_params =
            audio.is_descrambled().then_some((audio.ds_span, audio.ds_packet_size, audio.ds_chunk_size));

        let mut this = AsfReader {
            reader,
            tracks: vec![track],
            metadata: tags_builder.metadata(),
            audio_stream_number: audio.stream_number,
            packet_size: u64::from(header.file_props.packet_size),
            min_packet_size: u64::from(header.file_props.min_packet_size),
            data_offset: header.data_offset,
            avg_bytes_per_sec: u64::from(audio.avg_bytes_per_sec),
            descramble_params,
            time_base,
            preroll_ts: preroll_ticks,
            assembler: FragmentAssembler::new(),
            seek_index: SeekIndex::new(),
            packet_index: 0,
            total_packets: header.file_props.packets_count,
            pending: VecDeque::new(),
            eof: false,
        };

        if options.prebuild_seek_index && this.reader.is_seekable() {
            while this.produce_next()?.is_some() {}

            this.reader.seek(SeekFrom::Start(this.data_offset))?;
            this.packet_index = 0;
            this.assembler = FragmentAssembler::new();
            this.pending.clear();
            this.eof = false;
        }

        Ok(this)
    }

    /// Reads on-disk ASF packets, feeding payloads addressed to the audio stream into the
    /// fragment assembler, until at least one whole media object has been reassembled (or the
    /// stream is exhausted). Completed objects are appended to `pending` in arrival order.
    fn fill_pending(&mut self) -> Result<()> {
        while self.pending.is_empty() {
            if self.eof || (self.total_packets > 0 && self.packet_index >= self.total_packets) {
                return Ok(());
            }

            let packet_pos = self.reader.pos();

            let mut payloads = Vec::new();
            match read_packet_payloads(&mut self.reader, self.packet_size, self.min_packet_size, &mut payloads) {
                Ok(()) => {}
                Err(symphonia_core::errors::SymphoniaError::EndOfFile) => {
                    self.eof = true;
                    return Ok(());
                }
                Err(err) => return Err(err),
            }

            self.packet_index += 1;

            for payload in &payloads {
                if payload.stream_number != self.audio_stream_number {
                    continue;
                }

                if let Some((data, timestamp_ms)) = self.assembler.push(payload) {
                    let data = match self.descramble_params {
                        Some((span, packet_size, chunk_size)) => descramble(&data, span, packet_size, chunk_size),
                        None => data,
                    };

                    let pts = self.packet_pts(timestamp_ms);

                    self.seek_index.insert(pts, packet_pos, 0);

                    let packet = Packet::new(0, pts, Duration::ZERO, data);

                    self.pending.push_back(packet);
                }
            }
        }

        Ok(())
    }

    /// Converts a payload's raw `timestamp_ms` (which includes encoder pre-roll) into a
    /// sample-accurate [`Timestamp`] relative to the first presented frame.
    fn packet_pts(&self, timestamp_ms: u32) -> Timestamp {
        let sample_rate = match self.time_base.denom {
            0 => 1,
            denom => denom,
        };

        let ts = ms_to_ts(i64::from(timestamp_ms), sample_rate);
        let ticks = ts.ticks().max(0) as u64;

        Timestamp::new(ticks.saturating_sub(self.preroll_ts))
    }

    fn produce_next(&mut self) -> Result<Option<Packet>> {
        if let Some(packet) = self.pending.pop_front() {
            return Ok(Some(packet));
        }

        self.fill_pending()?;

        Ok(self.pending.pop_front())
    }

    /// Estimates a byte offset for `target` using the stream's average bitrate. Used to seed a
    /// seek before scanning forward for the bracketing packet.
    fn estimate_byte_offset(&self, target: Timestamp) -> u64 {
        let time = self.time_base.calc_time(target);
        let target_ms = time.seconds.saturating_mul(1000) + (time.frac * 1000.0) as u64;

        let byte_pos = target_ms.saturating_mul(self.avg_bytes_per_sec.max(1)) / 1000;
        let packet_idx = byte_pos / self.packet_size.max(1);

        self.data_offset + packet_idx.saturating_mul(self.packet_size)
    }
}

impl<'s> FormatReader for AsfReader<'s> {
    fn format_info(&self) -> &FormatInfo {
        &ASF_FORMAT_INFO
    }

    fn metadata(&mut self) -> Metadata {
        self.metadata.clone()
    }

    fn seek(&mut self, mode: SeekMode, to: SeekTo) -> Result<SeekedTo> {
        if !self.reader.is_seekable() {
            return seek_error(SeekErrorKind::Unseekable);
        }

        let track_id = 0;

        let required_ts = match to {
            SeekTo::Time { time, track_id: tid } => {
                if tid.is_some() && tid != Some(track_id) {
                    return seek_error(SeekErrorKind::InvalidTrack);
                }
                self.time_base.calc_timestamp(time)
            }
            SeekTo::TimeStamp { ts, track_id: tid } => {
                if tid != track_id {
                    return seek_error(SeekErrorKind::InvalidTrack);
                }
                ts
            }
        };

        let start_offset = match self.seek_index.search(required_ts) {
            SeekSearchResult::Stream => self.estimate_byte_offset(required_ts),
            SeekSearchResult::Upper(_) => self.data_offset,
            SeekSearchResult::Lower(point) | SeekSearchResult::Range(point, _) => point.byte_offset,
        };

        self.reader.seek(SeekFrom::Start(start_offset.max(self.data_offset)))?;
        self.packet_index = start_offset.saturating_sub(self.data_offset) / self.packet_size.max(1);
        self.assembler = FragmentAssembler::new();
        self.pending.clear();
        self.eof = false;

        loop {
            let packet = match self.produce_next()? {
                Some(packet) => packet,
                None => return seek_error(SeekErrorKind::OutOfRange),
            };

            let actual_ts = packet.pts();

            if actual_ts >= required_ts || mode == SeekMode::Coarse {
                self.pending.push_front(packet);

                return Ok(SeekedTo { track_id, required_ts, actual_ts });
            }
        }
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn next_packet(&mut self) -> Result<Option<Packet>> {
        self.produce_next()
    }

    fn into_inner<'a>(self: Box<Self>) -> MediaSourceStream<'a>
    where
        Self: 'a,
    {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use symphonia_core::io::ReadOnlySource;

    fn build_minimal_asf(audio_payload: &[u8]) -> Vec<u8> {
        // A hand-built minimal ASF file: header object (file props + stream props) followed by
        // a data object containing one single-payload packet carrying `audio_payload`.
        let mut file = Vec::new();

        // -- stream properties object body --
        let mut stream_body = Vec::new();
        stream_body.extend_from_slice(&guid::AUDIO_STREAM.0);
        stream_body.extend_from_slice(&guid::HEADER_EXTENSION_RESERVED.0); // error correction type (unused)
        stream_body.extend_from_slice(&0u64.to_le_bytes()); // time offset

        let mut wave = Vec::new();
        wave.extend_from_slice(&WAVE_FORMAT_WMAV2.to_le_bytes());
        wave.extend_from_slice(&1u16.to_le_bytes()); // channels
        wave.extend_from_slice(&8000u32.to_le_bytes()); // sample rate
        wave.extend_from_slice(&1000u32.to_le_bytes()); // avg bytes/sec
        wave.extend_from_slice(&1u16.to_le_bytes()); // block align
        wave.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        wave.extend_from_slice(&0u16.to_le_bytes()); // cbSize

        stream_body.extend_from_slice(&(wave.len() as u32).to_le_bytes()); // type specific size
        stream_body.extend_from_slice(&0u32.to_le_bytes()); // error correction data size
        stream_body.extend_from_slice(&1u16.to_le_bytes()); // flags: stream number 1
        stream_body.extend_from_slice(&0u32.to_le_bytes()); // reserved
        stream_body.extend_from_slice(&wave);

        let mut stream_obj = Vec::new();
        stream_obj.extend_from_slice(&guid::STREAM_HEADER.0);
        stream_obj.extend_from_slice(&(24 + stream_body.len() as u64).to_le_bytes());
        stream_obj.extend_from_slice(&stream_body);

        // -- file properties object body --
        let mut file_body = Vec::new();
        file_body.extend_from_slice(&[0u8; 16]); // file id
        file_body.extend_from_slice(&0u64.to_le_bytes()); // file size
        file_body.extend_from_slice(&0u64.to_le_bytes()); // creation date
        file_body.extend_from_slice(&1u64.to_le_bytes()); // packets count
        file_body.extend_from_slice(&0u64.to_le_bytes()); // play duration
        file_body.extend_from_slice(&0u64.to_le_bytes()); // send duration
        file_body.extend_from_slice(&0u32.to_le_bytes()); // preroll
        file_body.extend_from_slice(&0u32.to_le_bytes()); // flags
        file_body.extend_from_slice(&100u32.to_le_bytes()); // min packet size
        file_body.extend_from_slice(&100u32.to_le_bytes()); // packet size
        file_body.extend_from_slice(&0u32.to_le_bytes()); // max bitrate

        let mut file_obj = Vec::new();
        file_obj.extend_from_slice(&guid::FILE_HEADER.0);
        file_obj.extend_from_slice(&(24 + file_body.len() as u64).to_le_bytes());
        file_obj.extend_from_slice(&file_body);

        let mut header_body = Vec::new();
        header_body.extend_from_slice(&3u32.to_le_bytes()); // num header objects: file+stream+data
        header_body.extend_from_slice(&[0u8, 0u8]); // reserved
        header_body.extend_from_slice(&file_obj);
        header_body.extend_from_slice(&stream_obj);

        // -- data object --
        let mut packet_body = Vec::new();
        packet_body.push(0); // ecc byte: low nibble != 2, no opaque data
        packet_body.push(0); // packet flags: single payload, no width fields
        packet_body.push(0); // packet property: all width-field codes zero

        let packet_length = 12 + audio_payload.len() as u32;
        packet_body.extend_from_slice(&packet_length.to_le_bytes());
        packet_body.extend_from_slice(&0u16.to_le_bytes()); // timestamp (low 16 only matter for our test)
        packet_body.push(0x81); // stream byte: stream number 1, key frame
        packet_body.extend_from_slice(audio_payload);

        // pad out to declared packet size (100 bytes)
        while packet_body.len() < 100 {
            packet_body.push(0);
        }

        let mut data_body = Vec::new();
        data_body.extend_from_slice(&[0u8; 16]); // file id
        data_body.extend_from_slice(&1u64.to_le_bytes()); // total packets
        data_body.extend_from_slice(&0u16.to_le_bytes()); // reserved
        data_body.extend_from_slice(&packet_body);

        let mut data_obj = Vec::new();
        data_obj.extend_from_slice(&guid::DATA_HEADER.0);
        data_obj.extend_from_slice(&(24 + data_body.len() as u64).to_le_bytes());
        data_obj.extend_from_slice(&data_body);

        header_body.extend_from_slice(&data_obj);

        file.extend_from_slice(&guid::ASF_HEADER.0);
        file.extend_from_slice(&(24 + header_body.len() as u64).to_le_bytes());
        file.extend_from_slice(&header_body);

        file
    }

    #[test]
    fn parses_minimal_file_and_yields_one_packet() {
        let payload = [1u8, 2, 3, 4];
        let bytes = build_minimal_asf(&payload);

        let mss = MediaSourceStream::new(
            Box::new(ReadOnlySource::new(Cursor::new(bytes))),
            Default::default(),
        );

        let mut reader = AsfReader::try_new(mss, &FormatOptions::default()).unwrap();

        assert_eq!(reader.tracks().len(), 1);
        let track = &reader.tracks()[0];
        let params = track.codec_params.as_ref().unwrap().audio().unwrap();
        assert_eq!(params.sample_rate, Some(8000));

        let packet = reader.next_packet().unwrap().unwrap();
        assert_eq!(&*packet.data, &payload[..]);

        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn rejects_file_without_audio_stream() {
        // A header with only a file properties object and a data object, no stream object.
        let mut header_body = Vec::new();
        header_body.extend_from_slice(&2u32.to_le_bytes());
        header_body.extend_from_slice(&[0u8, 0u8]);

        let mut file_body = vec![0u8; 16 + 8 + 8 + 8 + 8 + 8 + 4 + 4 + 4 + 4 + 4];
        // all-zero fields are fine; only structure matters for this test.
        let mut file_obj = Vec::new();
        file_obj.extend_from_slice(&guid::FILE_HEADER.0);
        file_obj.extend_from_slice(&(24 + file_body.len() as u64).to_le_bytes());
        file_obj.append(&mut file_body);
        header_body.extend_from_slice(&file_obj);

        let mut data_body = Vec::new();
        data_body.extend_from_slice(&[0u8; 16]);
        data_body.extend_from_slice(&0u64.to_le_bytes());
        data_body.extend_from_slice(&0u16.to_le_bytes());

        let mut data_obj = Vec::new();
        data_obj.extend_from_slice(&guid::DATA_HEADER.0);
        data_obj.extend_from_slice(&(24 + data_body.len() as u64).to_le_bytes());
        data_obj.extend_from_slice(&data_body);
        header_body.extend_from_slice(&data_obj);

        let mut file = Vec::new();
        file.extend_from_slice(&guid::ASF_HEADER.0);
        file.extend_from_slice(&(24 + header_body.len() as u64).to_le_bytes());
        file.extend_from_slice(&header_body);

        let mss = MediaSourceStream::new(
            Box::new(ReadOnlySource::new(Cursor::new(file))),
            Default::default(),
        );

        assert!(AsfReader::try_new(mss, &FormatOptions::default()).is_err());
    }
}
