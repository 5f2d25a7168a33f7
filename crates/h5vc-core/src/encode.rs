//! Encode driver: planes in, concatenated packets out.
//!
//! `Init → PerFrame(i) → Flushing → Done`. Any error drops the session and
//! the partial buffer on the way out.

use crate::codec_traits::{ChunkEncoder, CodecBackend, Drain};
use crate::error::{FilterError, Result};
use crate::output_buffer::OutputBuffer;
use crate::plan::{EncodePlan, Geometry};

/// Where the driver is, for logs and error context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeStage {
    Init,
    PerFrame(usize),
    Flushing,
    Done,
}

impl std::fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::PerFrame(i) => write!(f, "frame {i}"),
            Self::Flushing => f.write_str("flushing"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Open an encoder for `plan` and compress `input`.
pub fn compress<B: CodecBackend>(backend: &B, plan: &EncodePlan, input: &[u8]) -> Result<Vec<u8>> {
    check_input_size(&plan.geometry, input)?;
    let mut encoder = backend.open_encoder(plan)?;
    encode_planes(&mut encoder, &plan.geometry, input)
}

fn check_input_size(geometry: &Geometry, input: &[u8]) -> Result<()> {
    let expected = geometry.raw_size();
    if input.len() != expected {
        return Err(FilterError::SizeMismatch {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}

/// Run the frame loop on an already opened session.
pub fn encode_planes<E: ChunkEncoder>(
    encoder: &mut E,
    geometry: &Geometry,
    input: &[u8],
) -> Result<Vec<u8>> {
    check_input_size(geometry, input)?;
    let mut out = OutputBuffer::for_raw_size(input.len())?;
    let mut packets = 0usize;

    for (i, plane) in input.chunks_exact(geometry.frame_size()).enumerate() {
        let stage = EncodeStage::PerFrame(i);
        encoder.send_plane(plane, i)?;
        packets += drain(encoder, &mut out, stage)?;
    }

    encoder.send_eof()?;
    packets += drain(encoder, &mut out, EncodeStage::Flushing)?;

    tracing::debug!(
        stage = %EncodeStage::Done,
        planes = geometry.depth,
        packets,
        bytes = out.len(),
        grow_events = out.grow_events(),
        "Chunk encoded"
    );
    Ok(out.into_vec())
}

/// Pull every packet the encoder will give up right now.
fn drain<E: ChunkEncoder>(encoder: &mut E, out: &mut OutputBuffer, stage: EncodeStage) -> Result<usize> {
    let flushing = stage == EncodeStage::Flushing;
    let mut packets = 0;
    loop {
        match encoder.receive_packet(out)? {
            Drain::Emitted => packets += 1,
            Drain::Again if flushing => {
                return Err(FilterError::Encode(
                    "encoder asked for more input after end of stream".into(),
                ));
            }
            Drain::Again => return Ok(packets),
            Drain::Finished if flushing => return Ok(packets),
            Drain::Finished => {
                return Err(FilterError::Encode(format!(
                    "encoder finished early at {stage}"
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BitMode;

    /// Emits one packet per frame, echoing the first byte of the plane.
    #[derive(Default)]
    struct EchoEncoder {
        pending: Vec<u8>,
        eof: bool,
    }

    impl ChunkEncoder for EchoEncoder {
        fn send_plane(&mut self, plane: &[u8], _index: usize) -> Result<()> {
            self.pending.push(plane[0]);
            Ok(())
        }

        fn send_eof(&mut self) -> Result<()> {
            self.eof = true;
            Ok(())
        }

        fn receive_packet(&mut self, out: &mut OutputBuffer) -> Result<Drain> {
            if self.pending.is_empty() {
                return Ok(if self.eof { Drain::Finished } else { Drain::Again });
            }
            let byte = self.pending.remove(0);
            out.append(&[byte])?;
            Ok(Drain::Emitted)
        }
    }

    fn geometry(depth: u32) -> Geometry {
        Geometry {
            width: 2,
            height: 2,
            depth,
            bit_mode: BitMode::Eight,
        }
    }

    #[test]
    fn one_packet_per_plane_in_order() {
        let input = [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0];
        let out = encode_planes(&mut EchoEncoder::default(), &geometry(3), &input).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn wrong_input_size_is_size_mismatch() {
        let err = encode_planes(&mut EchoEncoder::default(), &geometry(3), &[0; 11]).unwrap_err();
        assert!(matches!(
            err,
            FilterError::SizeMismatch {
                expected: 12,
                actual: 11
            }
        ));
    }

    #[test]
    fn stage_names_are_readable() {
        assert_eq!(EncodeStage::PerFrame(7).to_string(), "frame 7");
        assert_eq!(EncodeStage::Flushing.to_string(), "flushing");
    }
}
