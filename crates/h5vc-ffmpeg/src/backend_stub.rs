#![allow(missing_docs)]
//! Stub backend for builds without FFmpeg runtime bindings.

use h5vc_core::codec_table::{Decoder, Encoder};
use h5vc_core::codec_traits::{ChunkDecoder, ChunkEncoder, CodecBackend, Drain, ParseStep};
use h5vc_core::config::FilterConfig;
use h5vc_core::error::{FilterError, Result};
use h5vc_core::output_buffer::{OutputBuffer, PlaneBuffer};
use h5vc_core::plan::{DecodePlan, EncodePlan};

use crate::ffmpeg_sys::set_codec_log_level;

const UNAVAILABLE: &str = "h5vc-ffmpeg built without `ffmpeg-runtime`; codecs are unavailable";

/// Session type that can never be constructed.
pub enum Unavailable {}

impl ChunkEncoder for Unavailable {
    fn send_plane(&mut self, _plane: &[u8], _index: usize) -> Result<()> {
        match *self {}
    }
    fn send_eof(&mut self) -> Result<()> {
        match *self {}
    }
    fn receive_packet(&mut self, _out: &mut OutputBuffer) -> Result<Drain> {
        match *self {}
    }
}

impl ChunkDecoder for Unavailable {
    fn parse(&mut self, _input: &[u8]) -> Result<ParseStep> {
        match *self {}
    }
    fn send_packet(&mut self) -> Result<()> {
        match *self {}
    }
    fn send_eof(&mut self) -> Result<()> {
        match *self {}
    }
    fn receive_plane(&mut self, _out: &mut PlaneBuffer) -> Result<Drain> {
        match *self {}
    }
}

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

    pub fn encoder_available(&self, _encoder: Encoder) -> bool {
        false
    }

    pub fn decoder_available(&self, _decoder: Decoder) -> bool {
        false
    }
}

impl CodecBackend for FfmpegBackend {
    type Encoder = Unavailable;
    type Decoder = Unavailable;

    fn open_encoder(&self, _plan: &EncodePlan) -> Result<Unavailable> {
        Err(FilterError::BackendUnavailable(UNAVAILABLE.into()))
    }

    fn open_decoder(&self, _plan: &DecodePlan) -> Result<Unavailable> {
        Err(FilterError::BackendUnavailable(UNAVAILABLE.into()))
    }
}
