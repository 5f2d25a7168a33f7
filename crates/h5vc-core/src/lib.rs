//! Codec-agnostic core of the h5vc chunk filter.
//!
//! A chunk is a `depth × height × width` stack of grayscale planes. Compressing
//! it runs every plane through a video encoder; decompressing parses the
//! bitstream back into exactly `depth` planes. Codec sessions come from a
//! [`codec_traits::CodecBackend`]; the FFmpeg implementation lives in
//! `h5vc-ffmpeg`.

/// Out-of-process framing of payloads with their parameters.
pub mod bridge;
/// Encoder/decoder identities and preset/tune keyword tables.
pub mod codec_table;
/// Backend session traits driven by the encode/decode loops.
pub mod codec_traits;
/// Filter-wide runtime configuration.
pub mod config;
/// Parse/decode driver.
pub mod decode;
/// Per-frame encode driver.
pub mod encode;
/// Error taxonomy and stable error codes.
pub mod error;
/// Binary metadata header codec.
pub mod header;
/// Family-specific private codec options.
pub mod options;
/// Growable packet buffer and fixed plane buffer.
pub mod output_buffer;
/// The 11-word parameter vector.
pub mod params;
/// Native pixel format selection.
pub mod pixel_format;
/// Resolved encoder/decoder session plans.
pub mod plan;
/// Direction-dispatching transform entry point.
pub mod transform;

pub use config::FilterConfig;
pub use error::{FilterError, Result};
pub use params::{CompressionParameters, Direction};
pub use transform::transform_with;
