//! Codec session traits implemented by backends.
//!
//! These traits keep the encode/decode drivers independent of any codec
//! library: `h5vc-ffmpeg` implements them over libavcodec, the driver tests
//! implement them with a scripted in-memory codec.

use crate::error::Result;
use crate::output_buffer::{OutputBuffer, PlaneBuffer};
use crate::plan::{DecodePlan, EncodePlan};

/// Outcome of one receive call, mirroring send/receive codec APIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drain {
    /// One packet or frame was written to the output.
    Emitted,
    /// The codec needs more input before it can emit anything.
    Again,
    /// The codec has been flushed and will emit nothing more.
    Finished,
}

/// Result of feeding the bitstream parser once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseStep {
    /// Input bytes the parser consumed.
    pub consumed: usize,
    /// A complete packet is ready for [`ChunkDecoder::send_packet`].
    pub packet_ready: bool,
}

/// One open encoder session.
///
/// Dropping the session releases every resource it holds.
pub trait ChunkEncoder {
    /// Convert `plane` into the codec format and submit it as frame `index`.
    fn send_plane(&mut self, plane: &[u8], index: usize) -> Result<()>;
    /// Submit the end-of-stream marker.
    fn send_eof(&mut self) -> Result<()>;
    /// Append the next available packet to `out`.
    fn receive_packet(&mut self, out: &mut OutputBuffer) -> Result<Drain>;
}

/// One open decoder session.
pub trait ChunkDecoder {
    /// Feed the parser. An empty `input` asks it to flush its last packet.
    fn parse(&mut self, input: &[u8]) -> Result<ParseStep>;
    /// Submit the packet produced by the last [`parse`](Self::parse).
    fn send_packet(&mut self) -> Result<()>;
    /// Submit the end-of-stream marker.
    fn send_eof(&mut self) -> Result<()>;
    /// Convert the next decoded frame into the next plane of `out`.
    fn receive_plane(&mut self, out: &mut PlaneBuffer) -> Result<Drain>;
}

/// Opens codec sessions for a resolved plan.
pub trait CodecBackend {
    type Encoder: ChunkEncoder;
    type Decoder: ChunkDecoder;

    fn open_encoder(&self, plan: &EncodePlan) -> Result<Self::Encoder>;
    fn open_decoder(&self, plan: &DecodePlan) -> Result<Self::Decoder>;
}
