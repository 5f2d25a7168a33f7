//! Scripted in-memory codec used to exercise the drivers without FFmpeg.
//!
//! Packets are `u32 LE length + plane bytes`, so the stream is lossless and
//! easy to truncate or corrupt. The encoder and decoder both hold back
//! `delay` frames until end of stream, like a codec with B-frame reordering.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use h5vc_core::codec_table::Decoder;
use h5vc_core::codec_traits::{ChunkDecoder, ChunkEncoder, CodecBackend, Drain, ParseStep};
use h5vc_core::error::{FilterError, Result};
use h5vc_core::output_buffer::{OutputBuffer, PlaneBuffer};
use h5vc_core::plan::{DecodePlan, EncodePlan};

#[derive(Clone, Default)]
pub struct Script {
    /// Frames held back before the first packet/plane comes out.
    pub delay: usize,
    /// Largest slice the parser looks at per call.
    pub parse_window: usize,
    /// Parser never consumes anything.
    pub stalled_parser: bool,
    /// After the first packet, the parser keeps re-emitting it without
    /// consuming input.
    pub replay_packet: bool,
    /// Decoders reported as missing from the codec library.
    pub missing_decoders: Vec<Decoder>,
    /// Fail `send_plane` at this frame index.
    pub fail_at_frame: Option<usize>,
}

#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub script: Script,
    pub open_sessions: Rc<Cell<usize>>,
    pub opened_decoders: Rc<std::cell::RefCell<Vec<Decoder>>>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn live_sessions(&self) -> usize {
        self.open_sessions.get()
    }
}

struct SessionGuard(Rc<Cell<usize>>);

impl SessionGuard {
    fn new(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        Self(Rc::clone(counter))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

pub struct ScriptedEncoder {
    script: Script,
    queue: VecDeque<Vec<u8>>,
    eof: bool,
    _guard: SessionGuard,
}

impl ChunkEncoder for ScriptedEncoder {
    fn send_plane(&mut self, plane: &[u8], index: usize) -> Result<()> {
        if self.script.fail_at_frame == Some(index) {
            return Err(FilterError::FrameNotWritable(format!("frame {index}")));
        }
        let mut packet = (plane.len() as u32).to_le_bytes().to_vec();
        packet.extend_from_slice(plane);
        self.queue.push_back(packet);
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive_packet(&mut self, out: &mut OutputBuffer) -> Result<Drain> {
        if !self.eof && self.queue.len() <= self.script.delay {
            return Ok(Drain::Again);
        }
        match self.queue.pop_front() {
            Some(packet) => {
                out.append(&packet)?;
                Ok(Drain::Emitted)
            }
            None => Ok(Drain::Finished),
        }
    }
}

pub struct ScriptedDecoder {
    script: Script,
    frame_size: usize,
    acc: Vec<u8>,
    packet: Option<Vec<u8>>,
    last_packet: Option<Vec<u8>>,
    frames: VecDeque<Vec<u8>>,
    eof: bool,
    _guard: SessionGuard,
}

impl ScriptedDecoder {
    fn take_packet(&mut self) -> bool {
        if self.acc.len() < 4 {
            return false;
        }
        let len = u32::from_le_bytes([self.acc[0], self.acc[1], self.acc[2], self.acc[3]]) as usize;
        if self.acc.len() < 4 + len {
            return false;
        }
        let rest = self.acc.split_off(4 + len);
        let mut packet = std::mem::replace(&mut self.acc, rest);
        packet.drain(..4);
        self.last_packet = Some(packet.clone());
        self.packet = Some(packet);
        true
    }
}

impl ChunkDecoder for ScriptedDecoder {
    fn parse(&mut self, input: &[u8]) -> Result<ParseStep> {
        if self.script.stalled_parser {
            return Ok(ParseStep {
                consumed: 0,
                packet_ready: false,
            });
        }
        if self.script.replay_packet && !input.is_empty() {
            if let Some(last) = self.last_packet.clone() {
                self.packet = Some(last);
                return Ok(ParseStep {
                    consumed: 0,
                    packet_ready: true,
                });
            }
        }
        let window = self.script.parse_window.max(1);
        let consumed = input.len().min(window);
        self.acc.extend_from_slice(&input[..consumed]);
        Ok(ParseStep {
            consumed,
            packet_ready: self.take_packet(),
        })
    }

    fn send_packet(&mut self) -> Result<()> {
        let packet = self.packet.take().unwrap_or_default();
        if packet.len() != self.frame_size {
            return Err(FilterError::BitstreamUnreadable(format!(
                "packet of {} bytes does not hold a {}-byte plane",
                packet.len(),
                self.frame_size
            )));
        }
        self.frames.push_back(packet);
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive_plane(&mut self, out: &mut PlaneBuffer) -> Result<Drain> {
        if !self.eof && self.frames.len() <= self.script.delay {
            return Ok(Drain::Again);
        }
        match self.frames.pop_front() {
            Some(frame) => {
                out.next_plane()?.copy_from_slice(&frame);
                Ok(Drain::Emitted)
            }
            None => Ok(Drain::Finished),
        }
    }
}

impl CodecBackend for ScriptedBackend {
    type Encoder = ScriptedEncoder;
    type Decoder = ScriptedDecoder;

    fn open_encoder(&self, _plan: &EncodePlan) -> Result<ScriptedEncoder> {
        Ok(ScriptedEncoder {
            script: self.script.clone(),
            queue: VecDeque::new(),
            eof: false,
            _guard: SessionGuard::new(&self.open_sessions),
        })
    }

    fn open_decoder(&self, plan: &DecodePlan) -> Result<ScriptedDecoder> {
        if self.script.missing_decoders.contains(&plan.decoder) {
            return Err(FilterError::CodecNotFound(plan.decoder.codec_name().into()));
        }
        self.opened_decoders.borrow_mut().push(plan.decoder);
        Ok(ScriptedDecoder {
            script: self.script.clone(),
            frame_size: plan.geometry.frame_size(),
            acc: Vec::new(),
            packet: None,
            last_packet: None,
            frames: VecDeque::new(),
            eof: false,
            _guard: SessionGuard::new(&self.open_sessions),
        })
    }
}

/// Deterministic gradient volume with some per-plane variation.
pub fn volume(width: usize, height: usize, depth: usize, bytes_per_pixel: usize) -> Vec<u8> {
    (0..width * height * depth * bytes_per_pixel)
        .map(|i| ((i * 31 + i / 7) % 251) as u8)
        .collect()
}
