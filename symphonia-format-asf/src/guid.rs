// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASF object GUIDs.
//!
//! Every object in an ASF file is tagged with a 16-byte GUID. On disk the GUID's first three
//! fields (a `u32`, a `u16`, and a `u16`) are little-endian; the trailing 8-byte field is a raw
//! byte string. [`Guid`] stores the 16 bytes exactly as they appear on disk so that reading and
//! comparing a GUID is a straight byte-for-byte operation.

use symphonia_core::errors::Result;
use symphonia_core::io::ReadBytes;

/// A 16-byte ASF object identifier.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// Reads a GUID from the stream.
    pub fn read<B: ReadBytes>(reader: &mut B) -> Result<Guid> {
        let mut buf = [0u8; 16];
        reader.read_buf_exact(&mut buf)?;
        Ok(Guid(buf))
    }

    const fn new(v1: u32, v2: u16, v3: u16, v4: [u8; 8]) -> Guid {
        let v1 = v1.to_le_bytes();
        let v2 = v2.to_le_bytes();
        let v3 = v3.to_le_bytes();

        Guid([
            v1[0], v1[1], v1[2], v1[3], v2[0], v2[1], v3[0], v3[1], v4[0], v4[1], v4[2], v4[3],
            v4[4], v4[5], v4[6], v4[7],
        ])
    }
}

/// `75B22630-668E-11CF-A6D9-00AA0062CE6C`: top-level header object.
pub const ASF_HEADER: Guid =
    Guid::new(0x75B22630, 0x668E, 0x11CF, [0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C]);

/// `8CABDCA1-A947-11CF-8EE4-00C00C205365`: file properties object.
pub const FILE_HEADER: Guid =
    Guid::new(0x8CABDCA1, 0xA947, 0x11CF, [0x8E, 0xE4, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65]);

/// `B7DC0791-A9B7-11CF-8EE6-00C00C205365`: stream properties object.
pub const STREAM_HEADER: Guid =
    Guid::new(0xB7DC0791, 0xA9B7, 0x11CF, [0x8E, 0xE6, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65]);

/// `F8699E40-5B4D-11CF-A8FD-00805F5C442B`: audio stream type.
pub const AUDIO_STREAM: Guid =
    Guid::new(0xF8699E40, 0x5B4D, 0x11CF, [0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B]);

/// `BC19EFC0-5B4D-11CF-A8FD-00805F5C442B`: video stream type.
pub const VIDEO_STREAM: Guid =
    Guid::new(0xBC19EFC0, 0x5B4D, 0x11CF, [0xA8, 0xFD, 0x00, 0x80, 0x5F, 0x5C, 0x44, 0x2B]);

/// `75B22633-668E-11CF-A6D9-00AA0062CE6C`: legacy title/author/copyright/comment object.
pub const COMMENT_HEADER: Guid =
    Guid::new(0x75B22633, 0x668E, 0x11CF, [0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C]);

/// `D2D0A440-E307-11D2-97F0-00A0C95EA850`: extended content description object.
pub const EXTENDED_CONTENT_HEADER: Guid =
    Guid::new(0xD2D0A440, 0xE307, 0x11D2, [0x97, 0xF0, 0x00, 0xA0, 0xC9, 0x5E, 0xA8, 0x50]);

/// `75B22636-668E-11CF-A6D9-00AA0062CE6C`: data object; signals the end of the header section.
pub const DATA_HEADER: Guid =
    Guid::new(0x75B22636, 0x668E, 0x11CF, [0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C]);

/// `5FBF03B5-A92E-11CF-8EE3-00C00C205365`: header extension object.
pub const HEADER_EXTENSION: Guid =
    Guid::new(0x5FBF03B5, 0xA92E, 0x11CF, [0x8E, 0xE3, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65]);

/// `ABD3D211-A9BA-11CF-8EE6-00C00C205365`: reserved marker used inside header extension data.
pub const HEADER_EXTENSION_RESERVED: Guid =
    Guid::new(0xABD3D211, 0xA9BA, 0x11CF, [0x8E, 0xE6, 0x00, 0xC0, 0x0C, 0x20, 0x53, 0x65]);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use symphonia_core::io::{MediaSourceStream, ReadOnlySource};

    #[test]
    fn reads_asf_header_guid() {
        let bytes: &[u8] = &[
            0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62,
            0xCE, 0x6C,
        ];
        let mut mss =
            MediaSourceStream::new(Box::new(ReadOnlySource::new(Cursor::new(bytes))), Default::default());
        let guid = Guid::read(&mut mss).unwrap();
        assert_eq!(guid, ASF_HEADER);
    }
}
