// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data packet and payload parsing: the fixed-size packet header, the multi-payload segment
//! list, and reassembly of a stream's fragmented media objects into whole packets.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::{MediaSourceStream, ReadBytes};

/// Reads a value whose on-disk width is selected by a 2-bit code: `0` means the field is absent
/// (returns `default`), `1`/`2`/`3` mean a 1/2/4-byte little-endian integer follows.
fn read_width_field(mss: &mut MediaSourceStream<'_>, code: u8, default: u32) -> Result<u32> {
    match code & 0x3 {
        0 => Ok(default),
        1 => Ok(u32::from(mss.read_u8()?)),
        2 => Ok(u32::from(mss.read_u16()?)),
        3 => mss.read_u32(),
        _ => unreachable!(),
    }
}

/// One payload (or payload fragment) extracted from a data packet, addressed to a specific
/// stream number.
pub struct Payload {
    pub stream_number: u8,
    pub is_key_frame: bool,
    /// Offset, in bytes, of this fragment's data within the media object it belongs to.
    pub frag_offset: u32,
    /// The full, reassembled size of the media object this fragment belongs to.
    pub object_size: u32,
    /// Presentation timestamp, in milliseconds, of the media object.
    pub timestamp_ms: u32,
    pub data: Box<[u8]>,
}

/// Reads every payload carried by one data packet and appends them to `out`. Packets belonging
/// to streams this demuxer does not care about are still parsed (to stay byte-aligned) and
/// simply discarded by the caller.
///
/// The packet is assumed to occupy exactly `packet_size` bytes; any padding or miscounted field
/// is absorbed by realigning to `packet_start + packet_size` once parsing completes.
pub fn read_packet_payloads(
    mss: &mut MediaSourceStream<'_>,
    packet_size: u64,
    min_packet_size: u64,
    out: &mut Vec<Payload>,
) -> Result<()> {
    let packet_start = mss.pos();

    let ecc = mss.read_u8()?;

    // The low nibble of the ECC byte, when 2, indicates a 2-byte "must be zero" opaque data
    // field follows (used by the legacy error correction scheme). Any other low-nibble value
    // means no such field is present.
    if ecc & 0x0f == 2 {
        let _opaque = mss.read_u16()?;
    }

    let packet_flags = mss.read_u8()?;
    let packet_property = mss.read_u8()?;

    let packet_length =
        read_width_field(mss, packet_flags >> 5, packet_size as u32)? as u64;
    let _sequence = read_width_field(mss, packet_flags >> 1, 0)?;
    let mut padding_length = read_width_field(mss, packet_flags >> 3, 0)? as u64;

    let _timestamp = mss.read_u32()?;
    let _duration = mss.read_u16()?;

    let (num_payloads, segsizetype) = if packet_flags & 0x01 != 0 {
        let segsizetype = mss.read_u8()?;
        ((segsizetype & 0x3f) as usize, segsizetype)
    }
    else {
        (1, 0x80)
    };

    if packet_length < min_packet_size {
        padding_length += min_packet_size - packet_length;
    }

    let replic_size_code = packet_property & 0x3;
    let frag_offset_code = (packet_property >> 2) & 0x3;
    let seq_code = (packet_property >> 4) & 0x3;

    for _ in 0..num_payloads {
        let stream_byte = mss.read_u8()?;
        let stream_number = stream_byte & 0x7f;
        let is_key_frame = stream_byte & 0x80 != 0;

        let _media_obj_num = read_width_field(mss, seq_code, 0)?;
        let mut frag_offset = read_width_field(mss, frag_offset_code, 0)?;
        let replic_size = read_width_field(mss, replic_size_code, 0)?;

        let (object_size, timestamp_ms, compressed_group);

        if replic_size >= 8 {
            object_size = mss.read_u32()?;
            timestamp_ms = mss.read_u32()?;

            if replic_size > 8 {
                mss.ignore_bytes(replic_size - 8)?;
            }

            compressed_group = false;
        }
        else if replic_size == 1 {
            // Compressed multi-payload group: `frag_offset` is actually the group's base
            // timestamp, and a 1-byte per-sub-payload timestamp delta follows.
            let time_delta = mss.read_u8()?;
            timestamp_ms = frag_offset.wrapping_add(u32::from(time_delta));
            frag_offset = 0;
            object_size = 0; // determined per sub-payload, below.
            compressed_group = true;
        }
        else {
            object_size = 0;
            timestamp_ms = 0;
            compressed_group = false;
        }

        if compressed_group {
            // Each sub-payload is prefixed with its own 1-byte length.
            let sub_len = u32::from(mss.read_u8()?);
            let data = mss.read_boxed_slice_exact(sub_len as usize)?;

            out.push(Payload {
                stream_number,
                is_key_frame,
                frag_offset: 0,
                object_size: sub_len,
                timestamp_ms,
                data,
            });

            continue;
        }

        let frag_size = if packet_flags & 0x01 != 0 {
            read_width_field(mss, segsizetype >> 6, 0)? as usize
        }
        else {
            // Single-payload packet: the fragment spans whatever remains of the packet.
            let consumed = mss.pos() - packet_start;
            if packet_length < consumed {
                return decode_error("asf: packet length field is smaller than the packet header");
            }
            (packet_length - consumed) as usize
        };

        let data = mss.read_boxed_slice_exact(frag_size)?;

        out.push(Payload { stream_number, is_key_frame, frag_offset, object_size, timestamp_ms, data });
    }

    let consumed = mss.pos() - packet_start;
    let total = packet_length + padding_length;

    if consumed < total {
        mss.ignore_bytes(total - consumed)?;
    }

    Ok(())
}

/// Accumulates fragments for a single stream's in-flight media object and hands back each
/// object once it is fully reassembled.
#[derive(Default)]
pub struct FragmentAssembler {
    data: Vec<u8>,
    filled: usize,
    object_size: usize,
    timestamp_ms: u32,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one payload fragment into the assembler. Returns the reassembled object once its
    /// final fragment arrives.
    ///
    /// A fragment is only accepted if its declared offset matches the number of bytes already
    /// accumulated; any mismatch discards whatever was in flight (the per-payload "sequence"
    /// field is not load-bearing here and is intentionally ignored, matching how the reference
    /// decoder treats it).
    pub fn push(&mut self, payload: &Payload) -> Option<(Box<[u8]>, u32)> {
        if payload.frag_offset as usize != self.filled {
            self.filled = 0;

            if payload.frag_offset != 0 {
                // Orphaned continuation fragment; nothing useful to do with it.
                return None;
            }
        }

        if self.filled == 0 {
            self.object_size = payload.object_size as usize;
            self.timestamp_ms = payload.timestamp_ms;
            self.data.clear();
            self.data.resize(self.object_size, 0);
        }

        let end = self.filled + payload.data.len();

        if end > self.data.len() {
            // Malformed fragment; drop what we had in flight.
            self.filled = 0;
            return None;
        }

        self.data[self.filled..end].copy_from_slice(&payload.data);
        self.filled = end;

        if self.filled == self.object_size && self.object_size > 0 {
            self.filled = 0;
            let data = std::mem::take(&mut self.data).into_boxed_slice();
            Some((data, self.timestamp_ms))
        }
        else {
            None
        }
    }
}

/// Reverses the interleaving the encoder applies across `span` packets of `packet_size` bytes,
/// each split into `chunk_size`-byte chunks.
///
/// `dst[dst_chunk] = src[row + col * (packet_size / chunk_size)]` where `off = dst_chunk`,
/// `row = off / span`, `col = off % span`.
pub fn descramble(data: &[u8], span: u8, packet_size: u16, chunk_size: u16) -> Box<[u8]> {
    let span = span as usize;
    let packet_size = packet_size as usize;
    let chunk_size = chunk_size as usize;

    if span <= 1 || chunk_size == 0 || packet_size == 0 {
        return Box::from(data);
    }

    let mut out = vec![0u8; data.len()];
    let chunks_per_packet = packet_size / chunk_size;
    let num_chunks = data.len() / chunk_size;

    for dst_chunk in 0..num_chunks {
        let row = dst_chunk / span;
        let col = dst_chunk % span;
        let src_chunk = row + col * chunks_per_packet;

        let dst_off = dst_chunk * chunk_size;
        let src_off = src_chunk * chunk_size;

        if src_off + chunk_size <= data.len() {
            out[dst_off..dst_off + chunk_size].copy_from_slice(&data[src_off..src_off + chunk_size]);
        }
    }

    // Copy any trailing bytes that didn't form a whole chunk untouched.
    let tail = num_chunks * chunk_size;
    if tail < data.len() {
        out[tail..].copy_from_slice(&data[tail..]);
    }

    out.into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_span_is_trivial() {
        let data = (0..16u8).collect::<Vec<_>>();
        let out = descramble(&data, 1, 4, 2);
        assert_eq!(&*out, &data[..]);
    }

    #[test]
    fn descrambles_simple_interleave() {
        // span=2, packet_size=4, chunk_size=2: 2 chunks per packet, 2 packets interleaved.
        // Scrambled order (by chunk): [A0 B0 A1 B1], descrambled: [A0 A1 B0 B1].
        let a0 = [1u8, 1];
        let b0 = [2u8, 2];
        let a1 = [3u8, 3];
        let b1 = [4u8, 4];

        let mut scrambled = Vec::new();
        scrambled.extend_from_slice(&a0);
        scrambled.extend_from_slice(&b0);
        scrambled.extend_from_slice(&a1);
        scrambled.extend_from_slice(&b1);

        let out = descramble(&scrambled, 2, 4, 2);

        let mut expected = Vec::new();
        expected.extend_from_slice(&a0);
        expected.extend_from_slice(&a1);
        expected.extend_from_slice(&b0);
        expected.extend_from_slice(&b1);

        assert_eq!(&*out, &expected[..]);
    }

    #[test]
    fn fragment_assembler_reassembles_in_order_fragments() {
        let mut asm = FragmentAssembler::new();

        let p1 = Payload {
            stream_number: 1,
            is_key_frame: true,
            frag_offset: 0,
            object_size: 4,
            timestamp_ms: 1000,
            data: Box::from([1u8, 2]),
        };
        let p2 = Payload {
            stream_number: 1,
            is_key_frame: true,
            frag_offset: 2,
            object_size: 4,
            timestamp_ms: 1000,
            data: Box::from([3u8, 4]),
        };

        assert!(asm.push(&p1).is_none());
        let (data, ts) = asm.push(&p2).unwrap();
        assert_eq!(&*data, &[1, 2, 3, 4]);
        assert_eq!(ts, 1000);
    }

    #[test]
    fn fragment_assembler_discards_on_offset_mismatch() {
        let mut asm = FragmentAssembler::new();

        let p1 = Payload {
            stream_number: 1,
            is_key_frame: true,
            frag_offset: 0,
            object_size: 4,
            timestamp_ms: 1000,
            data: Box::from([1u8, 2]),
        };
        // A continuation claiming offset 3 (not 2, where we actually are) discards in-flight.
        let p2 = Payload {
            stream_number: 1,
            is_key_frame: true,
            frag_offset: 3,
            object_size: 4,
            timestamp_ms: 2000,
            data: Box::from([9u8]),
        };

        assert!(asm.push(&p1).is_none());
        assert!(asm.push(&p2).is_none());
    }
}
