// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of the ASF header section: the top-level `Header Object` and the objects nested
//! inside it (file properties, stream properties, comment, extended content description).

use log::{debug, warn};

use symphonia_core::errors::{decode_error, unsupported_error, Result};
use symphonia_core::io::{MediaSourceStream, ReadBytes};
use symphonia_core::meta::{MetadataBuilder, StandardTagKey, Tag, Value};

use crate::guid::{
    self, Guid, AUDIO_STREAM, COMMENT_HEADER, DATA_HEADER, EXTENDED_CONTENT_HEADER, FILE_HEADER,
    STREAM_HEADER, VIDEO_STREAM,
};

/// WAV format tag for WMA version 1.
pub const WAVE_FORMAT_WMAV1: u16 = 0x160;
/// WAV format tag for WMA version 2 (and the WMA9 "Pro"/"Lossless" tags build on top of it).
pub const WAVE_FORMAT_WMAV2: u16 = 0x161;

/// File-level properties read from the `File Header` object.
#[derive(Debug, Clone, Default)]
pub struct FileProperties {
    /// The fixed size, in bytes, of every data packet (`max_pktsize`).
    pub packet_size: u32,
    /// The minimum declared packet size. Per the ASF spec this equals `packet_size` for any
    /// non-broadcast file; used to detect truncated files.
    pub min_packet_size: u32,
    /// Number of data packets, if known (0 for broadcast streams).
    pub packets_count: u64,
    /// Total play duration, in 100-nanosecond units.
    pub play_duration: u64,
    /// Time, in milliseconds, of the first presented frame. Used to remove encoder pre-roll from
    /// packet timestamps.
    pub preroll_ms: u32,
}

/// Fields describing the single supported audio stream, parsed from a `Stream Properties`
/// object whose stream type GUID is [`AUDIO_STREAM`].
#[derive(Debug, Clone, Default)]
pub struct AudioStreamInfo {
    /// The stream number (0-127) this descriptor was registered under.
    pub stream_number: u8,
    /// `WAVEFORMATEX.wFormatTag`. WMAv1 = 0x160, WMAv2 = 0x161.
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Codec-specific extra data following the fixed `WAVEFORMATEX` fields (`cbSize` bytes).
    pub extra_data: Box<[u8]>,
    /// Descrambling span. 0 or 1 disables descrambling.
    pub ds_span: u8,
    /// Descrambling packet size (the size of one descrambled media object).
    pub ds_packet_size: u16,
    /// Descrambling chunk size.
    pub ds_chunk_size: u16,
}

impl AudioStreamInfo {
    pub fn is_descrambled(&self) -> bool {
        self.ds_span > 1 && self.ds_chunk_size > 0 && self.ds_packet_size > 0
    }
}

/// The fully parsed ASF header section.
#[derive(Debug, Default)]
pub struct AsfHeader {
    pub file_props: FileProperties,
    pub audio: Option<AudioStreamInfo>,
    /// True if a video stream was declared. Video payloads are read off the wire (to keep the
    /// demultiplexer in sync) but never surfaced as packets.
    pub has_video: bool,
    pub tags: Vec<Tag>,
    /// Absolute byte offset of the first data packet.
    pub data_offset: u64,
}

/// Reads a GUID-prefixed object header (16-byte GUID + 64-bit little-endian size) and returns
/// the GUID along with the size of the object's body (`size - 24`).
fn read_object_header<B: ReadBytes>(reader: &mut B) -> Result<(Guid, u64)> {
    let guid = Guid::read(reader)?;
    let size = reader.read_u64()?;

    if size < 24 {
        return decode_error("asf: object size is less than the 24 byte object header");
    }

    Ok((guid, size - 24))
}

/// Skips the number of bytes remaining in an object given how many bytes of its body have
/// already been consumed.
fn skip_remaining(mss: &mut MediaSourceStream<'_>, body_size: u64, consumed: u64) -> Result<()> {
    if consumed > body_size {
        return decode_error("asf: object body overrun while parsing");
    }

    mss.ignore_bytes(body_size - consumed)
}

fn read_wave_format(mss: &mut MediaSourceStream<'_>, type_specific_size: u64) -> Result<AudioStreamInfo> {
    if type_specific_size < 16 {
        return decode_error("asf: audio stream header is too small for WAVEFORMATEX");
    }

    let format_tag = mss.read_u16()?;
    let channels = mss.read_u16()?;
    let sample_rate = mss.read_u32()?;
    let avg_bytes_per_sec = mss.read_u32()?;
    let block_align = mss.read_u16()?;
    let bits_per_sample = mss.read_u16()?;

    let mut consumed = 16;

    let extra_data = if type_specific_size >= 18 {
        let cb_size = mss.read_u16()? as u64;
        consumed += 2;

        let available = type_specific_size - consumed;
        let extra_len = cb_size.min(available) as usize;

        let data = mss.read_boxed_slice_exact(extra_len)?;
        consumed += extra_len as u64;

        data
    }
    else {
        Box::default()
    };

    skip_remaining_type_specific(mss, type_specific_size, consumed)?;

    Ok(AudioStreamInfo {
        stream_number: 0,
        format_tag,
        channels,
        sample_rate,
        avg_bytes_per_sec,
        block_align,
        bits_per_sample,
        extra_data,
        ds_span: 0,
        ds_packet_size: 0,
        ds_chunk_size: 0,
    })
}

fn skip_remaining_type_specific(
    mss: &mut MediaSourceStream<'_>,
    type_specific_size: u64,
    consumed: u64,
) -> Result<()> {
    if consumed < type_specific_size {
        mss.ignore_bytes(type_specific_size - consumed)?;
    }
    Ok(())
}

/// Reads a null-padded UTF-16LE string of exactly `len` bytes.
fn read_utf16_string(mss: &mut MediaSourceStream<'_>, len: u64) -> Result<String> {
    let len = len as usize;
    let raw = mss.read_boxed_slice_exact(len)?;

    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    Ok(String::from_utf16_lossy(&units).trim_end_matches('\u{0}').to_string())
}

/// Parses the `Comment Header` object (title/author/copyright/description/rating).
fn read_comment_header(mss: &mut MediaSourceStream<'_>, tags: &mut Vec<Tag>) -> Result<()> {
    let title_len = mss.read_u16()? as u64;
    let author_len = mss.read_u16()? as u64;
    let copyright_len = mss.read_u16()? as u64;
    let comment_len = mss.read_u16()? as u64;
    let rating_len = mss.read_u16()? as u64;

    let title = read_utf16_string(mss, title_len)?;
    let author = read_utf16_string(mss, author_len)?;
    let copyright = read_utf16_string(mss, copyright_len)?;
    let comment = read_utf16_string(mss, comment_len)?;
    mss.ignore_bytes(rating_len)?;

    if !title.is_empty() {
        tags.push(Tag::new(Some(StandardTagKey::TrackTitle), "Title", Value::from(title)));
    }
    if !author.is_empty() {
        tags.push(Tag::new(Some(StandardTagKey::Artist), "Author", Value::from(author)));
    }
    if !copyright.is_empty() {
        tags.push(Tag::new(Some(StandardTagKey::Copyright), "Copyright", Value::from(copyright)));
    }
    if !comment.is_empty() {
        tags.push(Tag::new(Some(StandardTagKey::Comment), "Comment", Value::from(comment)));
    }

    Ok(())
}

/// Parses the `Extended Content Description` object, recognising the handful of `WM/*` keys
/// the distilled specification names (`WM/AlbumTitle`, `WM/Genre`, `WM/Year`, `WM/Track[Number]`).
fn read_extended_content(mss: &mut MediaSourceStream<'_>, tags: &mut Vec<Tag>) -> Result<()> {
    let count = mss.read_u16()?;

    for _ in 0..count {
        let name_len = mss.read_u16()? as u64;
        let name = read_utf16_string(mss, name_len)?;

        let value_type = mss.read_u16()?;
        let value_len = mss.read_u16()? as u64;

        match value_type {
            // Unicode string or byte array: both are read as UTF-16LE text here, matching the
            // reference decoder's handling of the four keys it recognises.
            0 | 1 => {
                let value = read_utf16_string(mss, value_len)?;

                let key = match name.as_str() {
                    "WM/AlbumTitle" => Some(StandardTagKey::Album),
                    "WM/Genre" => Some(StandardTagKey::Genre),
                    "WM/Year" => Some(StandardTagKey::Date),
                    _ => None,
                };

                if key.is_some() || !value.is_empty() {
                    tags.push(Tag::new(key, &name, Value::from(value)));
                }
            }
            // BOOL, DWORD, QWORD, or WORD.
            2 | 3 | 4 | 5 => {
                let num = match value_type {
                    2 | 3 => mss.read_u32()? as u64,
                    4 => mss.read_u64()?,
                    _ => mss.read_u16()? as u64,
                };

                let key = match name.as_str() {
                    "WM/Track" => Some(StandardTagKey::TrackNumber),
                    "WM/TrackNumber" => Some(StandardTagKey::TrackNumber),
                    _ => None,
                };

                let value = if name == "WM/Track" { num + 1 } else { num };

                tags.push(Tag::new(key, &name, Value::from(value)));
            }
            _ => {
                mss.ignore_bytes(value_len)?;
            }
        }
    }

    Ok(())
}

/// Parses the `Stream Properties` object, laid out per the ASF specification as: stream type
/// GUID, error correction type GUID, time offset (ignored), type-specific data length, error
/// correction data length, flags (low 7 bits: stream number), reserved, type-specific data,
/// error correction data.
fn read_stream_header(mss: &mut MediaSourceStream<'_>, body_size: u64) -> Result<Option<AudioStreamInfo>> {
    let stream_type = Guid::read(mss)?;
    let _error_correction_type = Guid::read(mss)?;
    let _time_offset = mss.read_u64()?;
    let type_specific_size = mss.read_u32()? as u64;
    let error_correction_size = mss.read_u32()? as u64;
    let flags = mss.read_u16()?;
    let _reserved = mss.read_u32()?;

    let stream_number = (flags & 0x7f) as u8;

    let mut consumed = 16 + 16 + 8 + 4 + 4 + 2 + 4;

    let audio = if stream_type == AUDIO_STREAM {
        let mut info = read_wave_format(mss, type_specific_size)?;
        info.stream_number = stream_number;
        consumed += type_specific_size;

        // The descrambling parameters (when present) occupy the error correction data area,
        // directly after the type-specific WAVEFORMATEX fields.
        if error_correction_size >= 8 {
            info.ds_span = mss.read_u8()?;
            info.ds_packet_size = mss.read_u16()?;
            info.ds_chunk_size = mss.read_u16()?;
            let _ds_data_size = mss.read_u16()?;
            let _ds_silence_data = mss.read_u8()?;
            consumed += 8;

            if error_correction_size > 8 {
                mss.ignore_bytes(error_correction_size - 8)?;
                consumed += error_correction_size - 8;
            }
        }
        else if error_correction_size > 0 {
            mss.ignore_bytes(error_correction_size)?;
            consumed += error_correction_size;
        }

        Some(info)
    }
    else {
        if stream_type != VIDEO_STREAM {
            debug!("asf: ignoring unknown stream type object");
        }

        mss.ignore_bytes(type_specific_size + error_correction_size)?;
        consumed += type_specific_size + error_correction_size;

        None
    };

    skip_remaining(mss, body_size, consumed)?;

    Ok(audio)
}

fn read_file_header(mss: &mut MediaSourceStream<'_>, body_size: u64) -> Result<FileProperties> {
    let _file_id = Guid::read(mss)?;
    let _file_size = mss.read_u64()?;
    let _creation_date = mss.read_u64()?;
    let packets_count = mss.read_u64()?;
    let play_duration = mss.read_u64()?;
    let _send_duration = mss.read_u64()?;
    let preroll_ms = mss.read_u32()? as u32;
    let _flags = mss.read_u32()?;
    let min_packet_size = mss.read_u32()?;
    let packet_size = mss.read_u32()?;
    let _max_bitrate = mss.read_u32()?;

    let consumed = 16 + 8 + 8 + 8 + 8 + 8 + 4 + 4 + 4 + 4 + 4;
    skip_remaining(mss, body_size, consumed)?;

    Ok(FileProperties { packet_size, min_packet_size, packets_count, play_duration, preroll_ms })
}

/// Parses the ASF header section in full, dispatching each nested object by its GUID. Returns
/// once the `Data Header` object is reached (it is consumed up to, but not including, the first
/// data packet).
pub fn parse_header(mss: &mut MediaSourceStream<'_>) -> Result<AsfHeader> {
    let (top_guid, top_size) = read_object_header(mss)?;

    if top_guid != guid::ASF_HEADER {
        return unsupported_error("asf: missing ASF header object GUID");
    }

    let _num_header_objects = mss.read_u32()?;
    let _reserved1 = mss.read_u8()?;
    let _reserved2 = mss.read_u8()?;

    let mut consumed_top = 6;

    let mut header = AsfHeader::default();

    loop {
        let (guid, body_size) = read_object_header(mss)?;
        consumed_top += 24 + body_size;

        if guid == DATA_HEADER {
            // Data Header body: File ID GUID (16), Total Data Packets (8), Reserved (2).
            let _file_id = Guid::read(mss)?;
            let _total_packets = mss.read_u64()?;
            let _reserved = mss.read_u16()?;

            header.data_offset = mss.pos();

            break;
        }
        else if guid == FILE_HEADER {
            header.file_props = read_file_header(mss, body_size)?;
        }
        else if guid == STREAM_HEADER {
            match read_stream_header(mss, body_size)? {
                Some(audio) if header.audio.is_none() => header.audio = Some(audio),
                Some(_) => {
                    warn!("asf: ignoring additional audio stream (only one is supported)");
                }
                None => header.has_video = true,
            }
        }
        else if guid == COMMENT_HEADER {
            let before = mss.pos();
            read_comment_header(mss, &mut header.tags)?;
            skip_remaining(mss, body_size, mss.pos() - before)?;
        }
        else if guid == EXTENDED_CONTENT_HEADER {
            let before = mss.pos();
            read_extended_content(mss, &mut header.tags)?;
            skip_remaining(mss, body_size, mss.pos() - before)?;
        }
        else {
            mss.ignore_bytes(body_size)?;
        }
    }

    let _ = top_size;
    let _ = consumed_top;

    if header.audio.is_none() {
        return unsupported_error("asf: no audio stream in file");
    }

    Ok(header)
}
