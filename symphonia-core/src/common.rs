// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `common` module defines common enums, structs, types, etc.

use std::fmt;
use std::str;

/// Describes the relative preference of a registered decoder, format reader, or metadata reader if
/// multiple registered implementations support the same codec or format.
#[derive(Copy, Clone)]
pub enum Tier {
    /// Prefer over others.
    Preferred,
    /// Standard tier: neither preferred nor a fallback. Symphonia's first-party decoders and
    /// readers are registered at this level.
    Standard,
    /// Use as a fallback if nothing else is available.
    Fallback,
}

/// A four-character-code (FourCC) tag. FourCCs are a common way of assigning a short, ASCII-only,
/// identifier to a format or codec. They are used throughout Symphonia to mint new well-known
/// [`crate::codecs::audio::AudioCodecId`]s and [`crate::formats::FormatId`]s for formats and
/// codecs without an assigned well-known ID.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Create a new FourCC from 4 ASCII bytes.
    pub const fn new(cc: [u8; 4]) -> FourCc {
        FourCc(cc)
    }

    /// Get the underlying byte array.
    pub const fn get(&self) -> [u8; 4] {
        self.0
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(value: [u8; 4]) -> Self {
        FourCc::new(value)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}
