//! Out-of-process framing: payloads travel with their own parameter vector.

use crate::codec_table::Decoder;
use crate::codec_traits::CodecBackend;
use crate::config::FilterConfig;
use crate::error::Result;
use crate::header::{self, MetadataHeader};
use crate::params::{CompressionParameters, Direction};
use crate::transform::transform_with;

/// Compress `raw` and prepend the metadata header.
pub fn compress_framed<B: CodecBackend>(
    backend: &B,
    params: &CompressionParameters,
    raw: &[u8],
    config: &FilterConfig,
) -> Result<Vec<u8>> {
    let payload = transform_with(backend, Direction::Compress, params, raw, config)?;
    Ok(header::pack(params, &payload))
}

/// Decompress a framed blob using the parameters stored in its header.
pub fn decompress_framed<B: CodecBackend>(
    backend: &B,
    blob: &[u8],
    config: &FilterConfig,
) -> Result<(MetadataHeader, Vec<u8>)> {
    decompress_with(backend, blob, None, config)
}

/// [`decompress_framed`] with the stored decoder replaced by `decoder`. The
/// returned header is the one stored in the blob.
pub fn decompress_framed_with_decoder<B: CodecBackend>(
    backend: &B,
    blob: &[u8],
    decoder: Decoder,
    config: &FilterConfig,
) -> Result<(MetadataHeader, Vec<u8>)> {
    decompress_with(backend, blob, Some(decoder), config)
}

fn decompress_with<B: CodecBackend>(
    backend: &B,
    blob: &[u8],
    decoder: Option<Decoder>,
    config: &FilterConfig,
) -> Result<(MetadataHeader, Vec<u8>)> {
    let (meta, payload) = header::unpack(blob)?;
    let mut params = meta.params;
    if let Some(decoder) = decoder {
        params.decoder_id = decoder.id();
    }
    let raw = transform_with(backend, Direction::Decompress, &params, payload, config)?;
    Ok((meta, raw))
}
