//! libavcodec decoder session: raw bitstream in, grayscale planes out.
//!
//! The bitstream is split into packets by the codec's parser. Each parse call
//! copies at most [`PARSE_WINDOW`] bytes into a scratch buffer with zeroed
//! padding, since the parser may read past the end of its input.

use std::ffi::c_int;
use std::ptr;

use ffmpeg_sys_next::*;
use h5vc_core::codec_traits::{ChunkDecoder, Drain, ParseStep};
use h5vc_core::error::{FilterError, Result};
use h5vc_core::output_buffer::PlaneBuffer;
use h5vc_core::pixel_format::PixelFormat;
use h5vc_core::plan::{DecodePlan, Geometry};

use crate::ffmpeg_sys::{av_pix_fmt, check_ffmpeg, decoded_source_format, sws_flags, to_cstring};
use crate::handles::{CodecContext, Frame, Packet, Parser, Scaler};

const EAGAIN: i32 = 11;
const EINVAL: i32 = 22;
const INPUT_PADDING: usize = 64;

/// Bytes handed to the parser per call.
pub const PARSE_WINDOW: usize = 4096;

pub struct FfmpegDecoder {
    packet: Packet,
    frame: Frame,
    scaler: Option<Scaler>,
    parser: Parser,
    ctx: CodecContext,
    window: Vec<u8>,
    geometry: Geometry,
    expected_format: PixelFormat,
    scale_flags: c_int,
    codec_name: &'static str,
}

impl FfmpegDecoder {
    pub fn open(plan: &DecodePlan) -> Result<Self> {
        let codec_name = plan.decoder.codec_name();

        // ── Find codec ──
        let c_name = to_cstring(codec_name).map_err(FilterError::CodecNotFound)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        let codec = unsafe { avcodec_find_decoder_by_name(c_name.as_ptr()) };
        if codec.is_null() {
            return Err(FilterError::CodecNotFound(codec_name.to_string()));
        }

        // ── Parser + context ──
        // SAFETY: codec is non-null.
        let codec_id = unsafe { (*codec).id };
        let parser = Parser::new(codec_id, codec_name)?;
        let ctx = CodecContext::new(codec, codec_name)?;
        // SAFETY: ctx.0 is a freshly allocated, unopened context.
        unsafe {
            let c = &mut *ctx.0;
            c.width = plan.geometry.width as c_int;
            c.height = plan.geometry.height as c_int;
        }

        // SAFETY: ctx and codec match; no options dictionary.
        let ret = unsafe { avcodec_open2(ctx.0, codec, ptr::null_mut()) };
        check_ffmpeg(ret, "avcodec_open2")
            .map_err(|e| FilterError::ContextAllocationFailed(format!("{codec_name}: {e}")))?;

        let frame = Frame::new()?;
        let packet = Packet::new()?;

        tracing::info!(
            codec = codec_name,
            width = plan.geometry.width,
            height = plan.geometry.height,
            format = %plan.codec_format,
            "FFmpeg decoder opened"
        );

        Ok(Self {
            packet,
            frame,
            scaler: None,
            parser,
            ctx,
            window: Vec::with_capacity(PARSE_WINDOW + INPUT_PADDING),
            geometry: plan.geometry,
            expected_format: plan.codec_format,
            scale_flags: sws_flags(plan.scale_filter),
            codec_name,
        })
    }

    /// Scaler for the format the decoder actually produced.
    fn scaler_for(&mut self, raw_format: c_int) -> Result<&Scaler> {
        let src = decoded_source_format(raw_format).ok_or_else(|| {
            FilterError::Decode(format!(
                "{} produced unsupported pixel format {raw_format}",
                self.codec_name
            ))
        })?;
        let reuse = self.scaler.as_ref().is_some_and(|s| s.src == src);
        if !reuse {
            if src != av_pix_fmt(self.expected_format) {
                tracing::warn!(
                    codec = self.codec_name,
                    expected = %self.expected_format,
                    actual = ?src,
                    "Decoder output format differs from plan"
                );
            }
            self.scaler = Some(Scaler::new(
                self.geometry.width as c_int,
                self.geometry.height as c_int,
                src,
                av_pix_fmt(self.geometry.plane_format()),
                self.scale_flags,
            )?);
        }
        self.scaler
            .as_ref()
            .ok_or_else(|| FilterError::ConversionContextFailed(self.codec_name.into()))
    }
}

/// Decoder status after a packet went in. Damaged input surfaces as
/// `INVALIDDATA`, or `EINVAL` once the stream state is broken.
fn check_decode(ret: c_int, context: &str) -> Result<()> {
    check_ffmpeg(ret, context).map_err(|e| {
        if ret == AVERROR_INVALIDDATA || ret == AVERROR(EINVAL) {
            FilterError::BitstreamUnreadable(e.to_string())
        } else {
            FilterError::Decode(e.to_string())
        }
    })
}

impl ChunkDecoder for FfmpegDecoder {
    fn parse(&mut self, input: &[u8]) -> Result<ParseStep> {
        let len = input.len().min(PARSE_WINDOW);
        self.window.clear();
        self.window.extend_from_slice(&input[..len]);
        self.window.resize(len + INPUT_PADDING, 0);

        let mut out_data: *mut u8 = ptr::null_mut();
        let mut out_size: c_int = 0;
        // SAFETY: window holds `len` bytes plus zeroed padding; a zero
        // length flushes the parser.
        let consumed = unsafe {
            av_parser_parse2(
                self.parser.0,
                self.ctx.0,
                &mut out_data,
                &mut out_size,
                self.window.as_ptr(),
                len as c_int,
                AV_NOPTS_VALUE,
                AV_NOPTS_VALUE,
                0,
            )
        };
        check_ffmpeg(consumed, "av_parser_parse2")
            .map_err(|e| FilterError::BitstreamUnreadable(e.to_string()))?;

        let packet_ready = out_size > 0 && !out_data.is_null();
        if packet_ready {
            // SAFETY: parser output stays valid until the next parse call and
            // send_packet runs before that.
            unsafe { self.packet.borrow_data(out_data, out_size) };
        }
        Ok(ParseStep {
            consumed: consumed as usize,
            packet_ready,
        })
    }

    fn send_packet(&mut self) -> Result<()> {
        // SAFETY: packet points at parser output; FFmpeg copies unrefcounted data.
        let ret = unsafe { avcodec_send_packet(self.ctx.0, self.packet.0) };
        self.packet.detach();
        check_ffmpeg(ret, "avcodec_send_packet")
            .map_err(|e| FilterError::BitstreamUnreadable(e.to_string()))
    }

    fn send_eof(&mut self) -> Result<()> {
        // SAFETY: a null packet enters draining mode.
        let ret = unsafe { avcodec_send_packet(self.ctx.0, ptr::null()) };
        check_decode(ret, "avcodec_send_packet(flush)")
    }

    fn receive_plane(&mut self, out: &mut PlaneBuffer) -> Result<Drain> {
        // SAFETY: context and frame are live.
        let ret = unsafe { avcodec_receive_frame(self.ctx.0, self.frame.0) };
        if ret == AVERROR(EAGAIN) {
            return Ok(Drain::Again);
        }
        if ret == AVERROR_EOF {
            return Ok(Drain::Finished);
        }
        check_decode(ret, "avcodec_receive_frame")?;

        let result = self.convert_frame(out);
        // SAFETY: drop the decoder's reference before the next receive.
        unsafe { av_frame_unref(self.frame.0) };
        result.map(|()| Drain::Emitted)
    }
}

impl FfmpegDecoder {
    fn convert_frame(&mut self, out: &mut PlaneBuffer) -> Result<()> {
        let (width, height, raw_format) = {
            // SAFETY: frame holds a decoded picture.
            let f = unsafe { &*self.frame.0 };
            (f.width, f.height, f.format)
        };
        if width != self.geometry.width as c_int || height != self.geometry.height as c_int {
            let bpp = self.geometry.bit_mode.bytes_per_pixel();
            return Err(FilterError::SizeMismatch {
                expected: self.geometry.frame_size(),
                actual: width.max(0) as usize * height.max(0) as usize * bpp,
            });
        }

        let frame = self.frame.0;
        let scaler = self.scaler_for(raw_format)?;
        let plane = out.next_plane()?;

        let mut dst_data = [ptr::null_mut::<u8>(); 4];
        let mut dst_linesize = [0 as c_int; 4];
        // SAFETY: plane is exactly one gray picture of width × height.
        let ret = unsafe {
            av_image_fill_arrays(
                dst_data.as_mut_ptr(),
                dst_linesize.as_mut_ptr(),
                plane.as_mut_ptr(),
                scaler.dst,
                width,
                height,
                1,
            )
        };
        check_ffmpeg(ret, "av_image_fill_arrays").map_err(|e| FilterError::Decode(e.to_string()))?;

        // SAFETY: frame holds a decoded picture; at most four planes are used.
        let (src_data, src_linesize) = unsafe {
            let f = &*frame;
            (
                [f.data[0], f.data[1], f.data[2], f.data[3]],
                [f.linesize[0], f.linesize[1], f.linesize[2], f.linesize[3]],
            )
        };
        // SAFETY: src comes from the decoded frame, dst wraps `plane`.
        let rows = unsafe {
            scaler.scale(
                &src_data,
                &src_linesize,
                height,
                dst_data.as_ptr(),
                dst_linesize.as_ptr(),
            )
        };
        if rows < 0 {
            return Err(FilterError::Decode("sws_scale failed".into()));
        }
        Ok(())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        tracing::debug!(codec = self.codec_name, "FFmpeg decoder destroyed");
    }
}
