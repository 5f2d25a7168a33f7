//! Decode driver: bitstream in, fixed-size plane buffer out.
//!
//! `Init → Parsing → Flushing → Done`. The output size is known up front from
//! the geometry, so the buffer never grows; a stream that yields fewer planes
//! is unreadable and one that yields more is a size mismatch.

use crate::codec_traits::{ChunkDecoder, CodecBackend, Drain};
use crate::error::{FilterError, Result};
use crate::output_buffer::PlaneBuffer;
use crate::plan::{DecodePlan, Geometry};

/// Consecutive parse steps allowed to consume nothing while input remains.
/// Parsers may emit a buffered packet without consuming, but not forever.
pub const MAX_IDLE_PARSES: usize = 8;

/// Open a decoder for `plan` (or its software fallback) and decompress.
pub fn decompress<B: CodecBackend>(
    backend: &B,
    plan: &DecodePlan,
    input: &[u8],
) -> Result<Vec<u8>> {
    let mut decoder = match (backend.open_decoder(plan), plan.fallback) {
        (Ok(decoder), _) => decoder,
        (Err(FilterError::CodecNotFound(reason)), Some(software)) => {
            tracing::warn!(
                requested = plan.decoder.codec_name(),
                fallback = software.codec_name(),
                %reason,
                "Hardware decoder unavailable, using software decoder"
            );
            backend.open_decoder(&plan.with_decoder(software))?
        }
        (Err(e), _) => return Err(e),
    };
    decode_stream(&mut decoder, &plan.geometry, input)
}

/// Run the parse/decode loop on an already opened session.
pub fn decode_stream<D: ChunkDecoder>(
    decoder: &mut D,
    geometry: &Geometry,
    input: &[u8],
) -> Result<Vec<u8>> {
    let mut planes = PlaneBuffer::new(geometry.frame_size(), geometry.depth as usize)?;
    let mut remaining = input;
    let mut packets = 0usize;
    let mut idle_parses = 0usize;

    // Parsing
    loop {
        let at_end = remaining.is_empty();
        let step = decoder.parse(remaining)?;
        if step.consumed > remaining.len() {
            return Err(FilterError::BitstreamUnreadable(format!(
                "parser consumed {} bytes with only {} left",
                step.consumed,
                remaining.len()
            )));
        }
        remaining = &remaining[step.consumed..];

        if step.consumed == 0 && !at_end {
            idle_parses += 1;
            if idle_parses > MAX_IDLE_PARSES {
                return Err(FilterError::BitstreamUnreadable(format!(
                    "parser made no progress with {} bytes left",
                    remaining.len()
                )));
            }
        } else {
            idle_parses = 0;
        }

        if step.packet_ready {
            decoder.send_packet()?;
            packets += 1;
            drain(decoder, &mut planes, false)?;
        } else if at_end {
            break;
        }
    }

    // Flushing
    decoder.send_eof()?;
    drain(decoder, &mut planes, true)?;

    if !planes.is_full() {
        return Err(FilterError::BitstreamUnreadable(format!(
            "stream ended after {} of {} planes",
            planes.planes_written(),
            planes.planes_total()
        )));
    }

    tracing::debug!(
        planes = planes.planes_written(),
        packets,
        bytes_in = input.len(),
        "Chunk decoded"
    );
    Ok(planes.into_vec())
}

fn drain<D: ChunkDecoder>(decoder: &mut D, planes: &mut PlaneBuffer, flushing: bool) -> Result<()> {
    loop {
        match decoder.receive_plane(planes)? {
            Drain::Emitted => {}
            Drain::Again if flushing => {
                return Err(FilterError::Decode(
                    "decoder asked for more input after end of stream".into(),
                ));
            }
            Drain::Again | Drain::Finished => return Ok(()),
        }
    }
}
