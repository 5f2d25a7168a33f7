//! One-call entry points backed by [`FfmpegBackend`].

use h5vc_core::bridge;
use h5vc_core::codec_table::Decoder;
use h5vc_core::config::FilterConfig;
use h5vc_core::error::Result;
use h5vc_core::header::MetadataHeader;
use h5vc_core::params::{CompressionParameters, Direction};

use crate::backend::FfmpegBackend;

/// Compress or decompress one chunk with libavcodec.
pub fn transform(
    direction: Direction,
    params: &CompressionParameters,
    input: &[u8],
    config: &FilterConfig,
) -> Result<Vec<u8>> {
    let backend = FfmpegBackend::new(config.clone());
    h5vc_core::transform_with(&backend, direction, params, input, config)
}

/// Compress `raw` into a self-describing blob.
pub fn compress_framed(
    params: &CompressionParameters,
    raw: &[u8],
    config: &FilterConfig,
) -> Result<Vec<u8>> {
    let backend = FfmpegBackend::new(config.clone());
    bridge::compress_framed(&backend, params, raw, config)
}

/// Decompress a blob produced by [`compress_framed`].
pub fn decompress_framed(blob: &[u8], config: &FilterConfig) -> Result<(MetadataHeader, Vec<u8>)> {
    let backend = FfmpegBackend::new(config.clone());
    bridge::decompress_framed(&backend, blob, config)
}

/// [`decompress_framed`] with the stored decoder replaced by `decoder`.
pub fn decompress_framed_with_decoder(
    blob: &[u8],
    decoder: Decoder,
    config: &FilterConfig,
) -> Result<(MetadataHeader, Vec<u8>)> {
    let backend = FfmpegBackend::new(config.clone());
    bridge::decompress_framed_with_decoder(&backend, blob, decoder, config)
}
