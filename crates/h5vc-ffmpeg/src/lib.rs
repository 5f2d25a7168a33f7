//! FFmpeg codec backend for the h5vc chunk filter.
//!
//! With the default `ffmpeg-runtime` feature the backend links libavcodec,
//! libswscale and libavutil through `ffmpeg-sys-next`. Without it every
//! module compiles to a stub that reports the backend as unavailable, so the
//! CLI and the HDF5 plugin still build on machines without FFmpeg.

/// [`h5vc_core::codec_traits::CodecBackend`] over libavcodec.
#[cfg(feature = "ffmpeg-runtime")]
pub mod backend;
#[cfg(not(feature = "ffmpeg-runtime"))]
#[path = "backend_stub.rs"]
pub mod backend;
/// Parser-driven decoder session.
#[cfg(feature = "ffmpeg-runtime")]
pub mod decoder;
/// Encoder session with gray → codec format conversion.
#[cfg(feature = "ffmpeg-runtime")]
pub mod encoder;
/// FFI helpers: error translation, format mapping and log level.
#[cfg(feature = "ffmpeg-runtime")]
pub mod ffmpeg_sys;
#[cfg(not(feature = "ffmpeg-runtime"))]
#[path = "ffmpeg_sys_stub.rs"]
pub mod ffmpeg_sys;
/// One-call transform and framing helpers.
pub mod filter;
#[cfg(feature = "ffmpeg-runtime")]
mod handles;
/// Async timeout adapter.
pub mod task;

pub use backend::FfmpegBackend;
pub use filter::{compress_framed, decompress_framed, decompress_framed_with_decoder, transform};
pub use task::{run_blocking_with_timeout, transform_with_timeout};

