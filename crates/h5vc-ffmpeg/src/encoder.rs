//! libavcodec encoder session: grayscale planes in, packets out.

use std::ffi::{c_int, c_void};
use std::ptr;

use ffmpeg_sys_next::*;
use h5vc_core::codec_traits::{ChunkEncoder, Drain};
use h5vc_core::error::{FilterError, Result};
use h5vc_core::options::OptionValue;
use h5vc_core::output_buffer::OutputBuffer;
use h5vc_core::plan::{EncodePlan, Geometry};

use crate::ffmpeg_sys::{av_pix_fmt, check_ffmpeg, sws_flags, to_cstring};
use crate::handles::{CodecContext, Frame, Packet, Scaler};

const EAGAIN: i32 = 11;
const AV_OPT_SEARCH_CHILDREN: c_int = 1;

/// Open encoder with its conversion scaler and reusable frame/packet.
pub struct FfmpegEncoder {
    packet: Packet,
    frame: Frame,
    scaler: Scaler,
    ctx: CodecContext,
    geometry: Geometry,
    codec_name: &'static str,
}

impl FfmpegEncoder {
    pub fn open(plan: &EncodePlan) -> Result<Self> {
        let codec_name = plan.encoder.codec_name();
        let geometry = plan.geometry;
        let width = geometry.width as c_int;
        let height = geometry.height as c_int;
        let codec_fmt = av_pix_fmt(plan.codec_format);

        // ── Find codec ──
        let c_name = to_cstring(codec_name).map_err(FilterError::CodecNotFound)?;
        // SAFETY: c_name is a valid NUL-terminated string.
        let codec = unsafe { avcodec_find_encoder_by_name(c_name.as_ptr()) };
        if codec.is_null() {
            return Err(FilterError::CodecNotFound(codec_name.to_string()));
        }

        // ── Configure context ──
        let ctx = CodecContext::new(codec, codec_name)?;
        // SAFETY: ctx.0 is a freshly allocated, unopened context.
        unsafe {
            let c = &mut *ctx.0;
            c.width = width;
            c.height = height;
            c.time_base = AVRational {
                num: 1,
                den: plan.frame_rate as c_int,
            };
            c.framerate = AVRational {
                num: plan.frame_rate as c_int,
                den: 1,
            };
            c.pix_fmt = codec_fmt;
            c.color_range = AVColorRange::AVCOL_RANGE_JPEG;
            if plan.tuning.zero_bit_rate {
                c.bit_rate = 0;
            }
        }

        for option in &plan.tuning.options {
            let key = to_cstring(option.key).map_err(FilterError::InvalidParameters)?;
            // Search children so both context fields and private options resolve.
            let ret = match &option.value {
                OptionValue::Str(value) => {
                    let value = to_cstring(value).map_err(FilterError::InvalidParameters)?;
                    // SAFETY: ctx is a live AVClass-enabled object; strings are valid.
                    unsafe {
                        av_opt_set(
                            ctx.0 as *mut c_void,
                            key.as_ptr(),
                            value.as_ptr(),
                            AV_OPT_SEARCH_CHILDREN,
                        )
                    }
                }
                OptionValue::Int(value) => unsafe {
                    // SAFETY: as above.
                    av_opt_set_int(ctx.0 as *mut c_void, key.as_ptr(), *value, AV_OPT_SEARCH_CHILDREN)
                },
            };
            if let Err(e) = check_ffmpeg(ret, option.key) {
                tracing::warn!(codec = codec_name, option = option.key, error = %e, "Encoder option not applied");
            }
        }

        // ── Open ──
        // SAFETY: ctx and codec match; no options dictionary.
        let ret = unsafe { avcodec_open2(ctx.0, codec, ptr::null_mut()) };
        check_ffmpeg(ret, "avcodec_open2")
            .map_err(|e| FilterError::ContextAllocationFailed(format!("{codec_name}: {e}")))?;

        // ── Frame in codec format ──
        let frame = Frame::new()?;
        // SAFETY: frame.0 is a fresh frame; dimensions/format set before allocation.
        let ret = unsafe {
            let f = &mut *frame.0;
            f.format = codec_fmt as c_int;
            f.width = width;
            f.height = height;
            f.color_range = AVColorRange::AVCOL_RANGE_JPEG;
            av_frame_get_buffer(frame.0, 0)
        };
        check_ffmpeg(ret, "av_frame_get_buffer")
            .map_err(|e| FilterError::FrameNotWritable(e.to_string()))?;

        let scaler = Scaler::new(
            width,
            height,
            av_pix_fmt(geometry.plane_format()),
            codec_fmt,
            sws_flags(plan.scale_filter),
        )?;
        let packet = Packet::new()?;

        tracing::info!(
            codec = codec_name,
            width,
            height,
            format = %plan.codec_format,
            preset = plan.preset,
            tune = plan.tune,
            "FFmpeg encoder opened"
        );

        Ok(Self {
            packet,
            frame,
            scaler,
            ctx,
            geometry,
            codec_name,
        })
    }
}

impl ChunkEncoder for FfmpegEncoder {
    fn send_plane(&mut self, plane: &[u8], index: usize) -> Result<()> {
        let frame_size = self.geometry.frame_size();
        if plane.len() != frame_size {
            return Err(FilterError::SizeMismatch {
                expected: frame_size,
                actual: plane.len(),
            });
        }
        let width = self.geometry.width as c_int;
        let height = self.geometry.height as c_int;

        // Encoder may still hold references to the previous picture.
        // SAFETY: frame.0 owns refcounted buffers from av_frame_get_buffer.
        let ret = unsafe { av_frame_make_writable(self.frame.0) };
        check_ffmpeg(ret, "av_frame_make_writable")
            .map_err(|e| FilterError::FrameNotWritable(format!("frame {index}: {e}")))?;

        // Wrap the caller's plane without copying.
        let mut src_data = [ptr::null_mut::<u8>(); 4];
        let mut src_linesize = [0 as c_int; 4];
        // SAFETY: plane holds exactly one gray picture of width × height.
        let ret = unsafe {
            av_image_fill_arrays(
                src_data.as_mut_ptr(),
                src_linesize.as_mut_ptr(),
                plane.as_ptr(),
                self.scaler.src,
                width,
                height,
                1,
            )
        };
        check_ffmpeg(ret, "av_image_fill_arrays")
            .map_err(|e| FilterError::Encode(format!("frame {index}: {e}")))?;

        // SAFETY: src arrays describe `plane`; dst is the writable codec frame.
        let rows = unsafe {
            self.scaler.scale(
                &src_data,
                &src_linesize,
                height,
                (*self.frame.0).data.as_ptr(),
                (*self.frame.0).linesize.as_ptr(),
            )
        };
        if rows < 0 {
            return Err(FilterError::Encode(format!("frame {index}: sws_scale failed")));
        }

        // SAFETY: frame and context are live; the frame is fully written.
        let ret = unsafe {
            (*self.frame.0).pts = index as i64;
            (*self.frame.0).quality = (*self.ctx.0).global_quality;
            avcodec_send_frame(self.ctx.0, self.frame.0)
        };
        check_ffmpeg(ret, "avcodec_send_frame")
            .map_err(|e| FilterError::Encode(format!("frame {index}: {e}")))
    }

    fn send_eof(&mut self) -> Result<()> {
        // SAFETY: a null frame enters draining mode.
        let ret = unsafe { avcodec_send_frame(self.ctx.0, ptr::null()) };
        check_ffmpeg(ret, "avcodec_send_frame(flush)").map_err(|e| FilterError::Encode(e.to_string()))
    }

    fn receive_packet(&mut self, out: &mut OutputBuffer) -> Result<Drain> {
        // SAFETY: context and packet are live.
        let ret = unsafe { avcodec_receive_packet(self.ctx.0, self.packet.0) };
        if ret == AVERROR(EAGAIN) {
            return Ok(Drain::Again);
        }
        if ret == AVERROR_EOF {
            return Ok(Drain::Finished);
        }
        check_ffmpeg(ret, "avcodec_receive_packet").map_err(|e| FilterError::Encode(e.to_string()))?;

        // SAFETY: a received packet owns `size` bytes at `data`.
        let appended = unsafe {
            let pkt = &*self.packet.0;
            let bytes = if pkt.data.is_null() || pkt.size <= 0 {
                &[][..]
            } else {
                std::slice::from_raw_parts(pkt.data, pkt.size as usize)
            };
            let appended = out.append(bytes);
            av_packet_unref(self.packet.0);
            appended
        };
        appended?;
        Ok(Drain::Emitted)
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Fields free in declaration order: packet, frame, scaler, context.
        tracing::debug!(codec = self.codec_name, "FFmpeg encoder destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5vc_core::{CompressionParameters, FilterConfig};

    #[test]
    #[ignore = "requires FFmpeg with libx264"]
    fn context_level_options_reach_private_data() {
        let params = CompressionParameters::from_array([2, 1, 32, 32, 2, 0, 15, 0, 20, 0, 0]);
        let plan = EncodePlan::resolve(&params, &FilterConfig::default()).expect("plan");
        let encoder = FfmpegEncoder::open(&plan).expect("open libx264");

        let key = to_cstring("crf").unwrap();
        let mut crf = 0.0f64;
        // SAFETY: priv_data belongs to the open context.
        let ret = unsafe {
            av_opt_get_double((*encoder.ctx.0).priv_data, key.as_ptr(), 0, &mut crf)
        };
        assert!(ret >= 0);
        assert_eq!(crf, 20.0);
    }
}
