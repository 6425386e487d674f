// Symphonia
// Copyright (c) 2019-2021 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # Project Symphonia
//!
//! Symphonia is a 100% pure Rust audio decoding and multimedia format demuxing framework.
//!
//! # Support
//!
//! This build of Symphonia supports a single container and a single codec, selected via the
//! `asf` and `wma` feature flags (both enabled by default).
//!
//! | Format | Feature Flag | Default |
//! |--------|--------------|---------|
//! | ASF    | `asf`        | Yes     |
//!
//! | Codec  | Feature Flag | Default |
//! |--------|--------------|---------|
//! | WMA v1/v2 | `wma`     | Yes     |
//!
//! # Usage
//!
//! The following steps describe a basic usage of Symphonia:
//!
//! 1.  Instantiate a [`CodecRegistry`][core::codecs::registry::CodecRegistry] and register all the
//!     codecs that are of interest. Alternatively, use [`default::get_codecs`] to get a registry
//!     with all the enabled codecs pre-registered.
//! 2.  Make sure the [`MediaSource`][core::io::MediaSource] trait is implemented for whatever
//!     source you are using. This trait is already implemented for `std::fs::File` and
//!     `std::io::Cursor`.
//! 3.  Instantiate a [`MediaSourceStream`][core::io::MediaSourceStream] with the `MediaSource`
//!     above.
//! 4.  Instantiate the container's [`FormatReader`][core::formats::FormatReader] directly (there is
//!     no generic format-sniffing probe in this build, since exactly one container is supported)
//!     by passing it the `MediaSourceStream`.
//! 5.  Interrogate the `FormatReader` for the track listing using
//!     [`tracks`][core::formats::FormatReader::tracks] and select the track to decode.
//! 6.  Instantiate an [`AudioDecoder`][core::codecs::audio::AudioDecoder] for the selected track by
//!     calling the `CodecRegistry`'s
//!     [`make_audio_decoder`][core::codecs::registry::CodecRegistry::make_audio_decoder] and
//!     passing it the track's audio codec parameters.
//! 7.  To decode, obtain a packet from the `FormatReader` by calling
//!     [`next_packet`][core::formats::FormatReader::next_packet] and pass it to the decoder's
//!     [`decode`][core::codecs::audio::AudioDecoder::decode] function, which returns a
//!     [`GenericAudioBufferRef`][core::audio::GenericAudioBufferRef].
//! 8.  Repeat step 7 until `next_packet` signals end of stream.
//!
//! An example implementation of a simple file-to-WAV decoder (`symphonia-play`) can be found in
//! the workspace.

pub mod default {
    //! The `default` module provides convenience functions and registries to get an implementer
    //! up-and-running as quickly as possible, and to reduce boiler-plate. Using the `default`
    //! module is completely optional and incurs no overhead unless actually used.

    pub mod codecs {
        //! The `codecs` module re-exports all enabled Symphonia decoders.

        #[cfg(feature = "wma")]
        pub use symphonia_codec_wma::WmaDecoder;
    }

    pub mod formats {
        //! The `formats` module re-exports all enabled Symphonia format readers.

        #[cfg(feature = "asf")]
        pub use symphonia_format_asf::AsfReader;
    }

    use symphonia_core::codecs::registry::CodecRegistry;

    /// Builds a new `CodecRegistry` with all the codecs selected by the `feature` flags in the
    /// includer's `Cargo.toml` pre-registered. If no features are set, no codecs are registered.
    ///
    /// Unlike the registries used by the rest of the Symphonia family, this one is built fresh on
    /// each call rather than memoized behind a `lazy_static`, since this crate only ever
    /// instantiates a handful of decoders over a program's lifetime.
    pub fn get_codecs() -> CodecRegistry {
        let mut registry = CodecRegistry::new();
        register_enabled_codecs(&mut registry);
        registry
    }

    /// Registers all the codecs selected by the `feature` flags in the includer's `Cargo.toml` on
    /// the provided `CodecRegistry`.
    pub fn register_enabled_codecs(registry: &mut CodecRegistry) {
        #[cfg(feature = "wma")]
        registry.register_audio_decoder::<codecs::WmaDecoder>();
    }
}

pub use symphonia_core as core;
