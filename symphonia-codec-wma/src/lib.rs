// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// The following lints are allowed in all Symphonia crates. Please see clippy.toml for their
// justification.
#![allow(clippy::comparison_chain)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]

//! A pure Rust WMA (Windows Media Audio) version 1 and 2 perceptual audio decoder.

mod frame;
mod tables;
mod vlc;

use symphonia_core::audio::{
    AsGenericAudioBufferRef, Audio, AudioBuffer, AudioMut, AudioSpec, GenericAudioBufferRef,
};
use symphonia_core::codecs::audio::well_known::{
    profiles::{CODEC_PROFILE_WMA_V1, CODEC_PROFILE_WMA_V2},
    CODEC_ID_WMA,
};
use symphonia_core::codecs::audio::{AudioCodecParameters, AudioDecoder, AudioDecoderOptions, FinalizeResult};
use symphonia_core::codecs::registry::{RegisterableAudioDecoder, SupportedAudioCodec};
use symphonia_core::codecs::CodecInfo;
use symphonia_core::errors::{unsupported_error, Result};
use symphonia_core::formats::Packet;
use symphonia_core::support_audio_codec;

use frame::{BlockDecoder, StreamParams};

/// WMA version 1 and 2 audio decoder.
pub struct WmaDecoder {
    params: AudioCodecParameters,
    block_decoder: BlockDecoder,
    buf: AudioBuffer<i16>,
}

impl WmaDecoder {
    pub fn try_new(params: &AudioCodecParameters, _opts: &AudioDecoderOptions) -> Result<Self> {
        if params.codec != CODEC_ID_WMA {
            return unsupported_error("wma: invalid codec");
        }

        let version = match params.profile {
            Some(CODEC_PROFILE_WMA_V1) => 1,
            Some(CODEC_PROFILE_WMA_V2) => 2,
            _ => return unsupported_error("wma: unrecognized or missing codec profile"),
        };

        let rate = match params.sample_rate {
            Some(rate) => rate,
            _ => return unsupported_error("wma: sample rate is required"),
        };

        let channels = match &params.channels {
            Some(channels) => channels.clone(),
            _ => return unsupported_error("wma: channels or channel layout is required"),
        };

        if channels.count() == 0 || channels.count() > 2 {
            return unsupported_error("wma: only mono and stereo streams are supported");
        }

        let extra_data = params.extra_data.as_deref().unwrap_or(&[]);

        let stream_params = StreamParams::derive(version, channels.count() as usize, rate, extra_data)?;
        let block_decoder = BlockDecoder::new(stream_params)?;

        let spec = AudioSpec::new(rate, channels);

        // A generous number of blocks per ASF payload; `decode_inner` grows the buffer's capacity
        // if a particular superframe needs more.
        let capacity = block_decoder.frame_len() * 8;

        Ok(WmaDecoder { params: params.clone(), block_decoder, buf: AudioBuffer::new(spec, capacity) })
    }

    fn decode_inner(&mut self, packet: &Packet) -> Result<()> {
        let pcm = self.block_decoder.decode_superframe(packet.buf());

        let frames = pcm.first().map_or(0, Vec::len);

        self.buf.clear();

        if self.buf.capacity() < frames {
            self.buf.grow_capacity(frames);
        }

        self.buf.render_uninit(Some(frames));

        for (c, channel_pcm) in pcm.iter().enumerate() {
            let plane = self.buf.plane_mut(c).unwrap();

            for (sample, &value) in plane.iter_mut().zip(channel_pcm.iter()) {
                *sample = (value.clamp(i16::MIN as f32, i16::MAX as f32)) as i16;
            }
        }

        Ok(())
    }
}

impl AudioDecoder for WmaDecoder {
    fn reset(&mut self) {
        self.block_decoder.reset();
    }

    fn codec_info(&self) -> &CodecInfo {
        &Self::supported_codecs().iter().find(|desc| desc.id == self.params.codec).unwrap().info
    }

    fn codec_params(&self) -> &AudioCodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<GenericAudioBufferRef<'_>> {
        if let Err(e) = self.decode_inner(packet) {
            self.buf.clear();
            Err(e)
        }
        else {
            Ok(self.buf.as_generic_audio_buffer_ref())
        }
    }

    fn finalize(&mut self) -> FinalizeResult {
        Default::default()
    }

    fn last_decoded(&self) -> GenericAudioBufferRef<'_> {
        self.buf.as_generic_audio_buffer_ref()
    }
}

impl RegisterableAudioDecoder for WmaDecoder {
    fn try_registry_new(
        params: &AudioCodecParameters,
        opts: &AudioDecoderOptions,
    ) -> Result<Box<dyn AudioDecoder>>
    where
        Self: Sized,
    {
        Ok(Box::new(WmaDecoder::try_new(params, opts)?))
    }

    fn supported_codecs() -> &'static [SupportedAudioCodec] {
        &[support_audio_codec!(CODEC_ID_WMA, "wma", "Windows Media Audio")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::audio::Channels;

    fn test_params(channels: u16) -> AudioCodecParameters {
        let mut params = AudioCodecParameters::new();
        params
            .for_codec(CODEC_ID_WMA)
            .with_profile(CODEC_PROFILE_WMA_V2)
            .with_sample_rate(44_100)
            .with_channels(Channels::Discrete(channels))
            .with_extra_data(Box::default());
        params
    }

    #[test]
    fn try_new_rejects_wrong_codec() {
        let mut params = test_params(2);
        params.for_codec(symphonia_core::codecs::audio::well_known::CODEC_ID_PCM_S16LE);
        let opts = AudioDecoderOptions::default();
        assert!(WmaDecoder::try_new(&params, &opts).is_err());
    }

    #[test]
    fn try_new_rejects_missing_profile() {
        let mut params = AudioCodecParameters::new();
        params.for_codec(CODEC_ID_WMA).with_sample_rate(44_100).with_channels(Channels::Discrete(2));
        let opts = AudioDecoderOptions::default();
        assert!(WmaDecoder::try_new(&params, &opts).is_err());
    }

    #[test]
    fn try_new_rejects_too_many_channels() {
        let params = test_params(3);
        let opts = AudioDecoderOptions::default();
        assert!(WmaDecoder::try_new(&params, &opts).is_err());
    }

    #[test]
    fn try_new_succeeds_with_valid_mono_stream() {
        let params = test_params(1);
        let opts = AudioDecoderOptions::default();
        assert!(WmaDecoder::try_new(&params, &opts).is_ok());
    }

    #[test]
    fn decode_empty_packet_clears_buffer_without_error() {
        let params = test_params(1);
        let opts = AudioDecoderOptions::default();
        let mut decoder = WmaDecoder::try_new(&params, &opts).unwrap();

        let packet = Packet::new(
            0,
            symphonia_core::units::Timestamp::ZERO,
            symphonia_core::units::Duration::ZERO,
            vec![0u8],
        );
        let result = decoder.decode(&packet);
        assert!(result.is_ok());
    }
}
