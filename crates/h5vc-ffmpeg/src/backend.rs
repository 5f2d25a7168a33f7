//! FFmpeg implementation of [`CodecBackend`].

use std::ffi::CString;

use ffmpeg_sys_next::{avcodec_find_decoder_by_name, avcodec_find_encoder_by_name};
use h5vc_core::codec_table::{Decoder, Encoder};
use h5vc_core::codec_traits::CodecBackend;
use h5vc_core::config::FilterConfig;
use h5vc_core::error::Result;
use h5vc_core::plan::{DecodePlan, EncodePlan};

use crate::decoder::FfmpegDecoder;
use crate::encoder::FfmpegEncoder;
use crate::ffmpeg_sys::set_codec_log_level;

/// Opens libavcodec sessions.
#[derive(Clone, Debug, Default)]
pub struct FfmpegBackend {
    config: FilterConfig,
}

impl FfmpegBackend {
    pub fn new(config: FilterConfig) -> Self {
        set_codec_log_level(config.codec_log_level);
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Whether the linked libavcodec provides `encoder`.
    pub fn encoder_available(&self, encoder: Encoder) -> bool {
        let Ok(name) = CString::new(encoder.codec_name()) else {
            return false;
        };
        // SAFETY: name is a valid NUL-terminated string.
        !unsafe { avcodec_find_encoder_by_name(name.as_ptr()) }.is_null()
    }

    /// Whether the linked libavcodec provides `decoder`.
    pub fn decoder_available(&self, decoder: Decoder) -> bool {
        let Ok(name) = CString::new(decoder.codec_name()) else {
            return false;
        };
        // SAFETY: name is a valid NUL-terminated string.
        !unsafe { avcodec_find_decoder_by_name(name.as_ptr()) }.is_null()
    }
}

impl CodecBackend for FfmpegBackend {
    type Encoder = FfmpegEncoder;
    type Decoder = FfmpegDecoder;

    fn open_encoder(&self, plan: &EncodePlan) -> Result<FfmpegEncoder> {
        FfmpegEncoder::open(plan)
    }

    fn open_decoder(&self, plan: &DecodePlan) -> Result<FfmpegDecoder> {
        FfmpegDecoder::open(plan)
    }
}
