//! The transform entry point, generic over the codec backend.

use crate::codec_traits::CodecBackend;
use crate::config::FilterConfig;
use crate::error::Result;
use crate::params::{CompressionParameters, Direction};
use crate::plan::{DecodePlan, EncodePlan};
use crate::{decode, encode};

/// Compress or decompress one chunk.
///
/// Stateless between calls: every invocation resolves its own plan, opens its
/// own session and releases it before returning, on success or failure.
pub fn transform_with<B: CodecBackend>(
    backend: &B,
    direction: Direction,
    params: &CompressionParameters,
    input: &[u8],
    config: &FilterConfig,
) -> Result<Vec<u8>> {
    match direction {
        Direction::Compress => {
            let plan = EncodePlan::resolve(params, config)?;
            tracing::debug!(
                codec = plan.encoder.codec_name(),
                width = plan.geometry.width,
                height = plan.geometry.height,
                depth = plan.geometry.depth,
                bytes = input.len(),
                "Compressing chunk"
            );
            encode::compress(backend, &plan, input)
        }
        Direction::Decompress => {
            let plan = DecodePlan::resolve(params, config)?;
            tracing::debug!(
                codec = plan.decoder.codec_name(),
                width = plan.geometry.width,
                height = plan.geometry.height,
                depth = plan.geometry.depth,
                bytes = input.len(),
                "Decompressing chunk"
            );
            decode::decompress(backend, &plan, input)
        }
    }
}
