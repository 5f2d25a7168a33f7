//! Owning wrappers around libav* allocations.
//!
//! Each handle frees its pointer on drop, so a session that fails halfway
//! through setup releases whatever it already allocated.

use std::ffi::c_int;
use std::ptr;

use ffmpeg_sys_next::*;
use h5vc_core::error::{FilterError, Result};

use crate::ffmpeg_sys::SWS_CS_DEFAULT;

pub(crate) struct CodecContext(pub(crate) *mut AVCodecContext);

impl CodecContext {
    pub(crate) fn new(codec: *const AVCodec, name: &str) -> Result<Self> {
        // SAFETY: codec is a registered codec returned by avcodec_find_*.
        let ctx = unsafe { avcodec_alloc_context3(codec) };
        if ctx.is_null() {
            return Err(FilterError::ContextAllocationFailed(name.to_string()));
        }
        Ok(Self(ctx))
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        // SAFETY: allocated by avcodec_alloc_context3; null after free.
        unsafe { avcodec_free_context(&mut self.0) };
    }
}

pub(crate) struct Frame(pub(crate) *mut AVFrame);

impl Frame {
    pub(crate) fn new() -> Result<Self> {
        // SAFETY: plain allocation.
        let frame = unsafe { av_frame_alloc() };
        if frame.is_null() {
            return Err(FilterError::FrameNotWritable("av_frame_alloc failed".into()));
        }
        Ok(Self(frame))
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        // SAFETY: allocated by av_frame_alloc; unrefs any attached buffers.
        unsafe { av_frame_free(&mut self.0) };
    }
}

pub(crate) struct Packet(pub(crate) *mut AVPacket);

impl Packet {
    pub(crate) fn new() -> Result<Self> {
        // SAFETY: plain allocation.
        let pkt = unsafe { av_packet_alloc() };
        if pkt.is_null() {
            return Err(FilterError::OutOfMemory {
                requested: std::mem::size_of::<AVPacket>(),
            });
        }
        Ok(Self(pkt))
    }

    /// Point the packet at borrowed bytes without taking ownership.
    ///
    /// # Safety
    /// `data` must stay valid until [`Packet::detach`] or the next send.
    pub(crate) unsafe fn borrow_data(&mut self, data: *mut u8, size: c_int) {
        unsafe {
            (*self.0).data = data;
            (*self.0).size = size;
        }
    }

    pub(crate) fn detach(&mut self) {
        // SAFETY: self.0 is a live packet; no buffer is referenced.
        unsafe {
            (*self.0).data = ptr::null_mut();
            (*self.0).size = 0;
        }
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        self.detach();
        // SAFETY: allocated by av_packet_alloc.
        unsafe { av_packet_free(&mut self.0) };
    }
}

pub(crate) struct Parser(pub(crate) *mut AVCodecParserContext);

impl Parser {
    pub(crate) fn new(codec_id: AVCodecID, name: &str) -> Result<Self> {
        // SAFETY: av_parser_init returns null when no parser exists for the id.
        let parser = unsafe { av_parser_init(codec_id as c_int) };
        if parser.is_null() {
            return Err(FilterError::ContextAllocationFailed(format!(
                "no bitstream parser for {name}"
            )));
        }
        Ok(Self(parser))
    }
}

impl Drop for Parser {
    fn drop(&mut self) {
        // SAFETY: allocated by av_parser_init.
        unsafe { av_parser_close(self.0) };
    }
}

/// Software scaler converting between two fixed layouts.
pub(crate) struct Scaler {
    ctx: *mut SwsContext,
    pub(crate) src: AVPixelFormat,
    pub(crate) dst: AVPixelFormat,
}

impl Scaler {
    /// Build a same-size converter with full range on both sides.
    pub(crate) fn new(
        width: c_int,
        height: c_int,
        src: AVPixelFormat,
        dst: AVPixelFormat,
        flags: c_int,
    ) -> Result<Self> {
        // SAFETY: formats are valid enum values; filters and params are optional.
        let ctx = unsafe {
            sws_getContext(
                width,
                height,
                src,
                width,
                height,
                dst,
                flags,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
            )
        };
        if ctx.is_null() {
            return Err(FilterError::ConversionContextFailed(format!(
                "{width}x{height} {src:?} -> {dst:?}"
            )));
        }
        let scaler = Self { ctx, src, dst };

        // Limited range would squeeze 0..255 into 16..235 and lose values.
        // SAFETY: coefficient table is static; ctx is live.
        let ret = unsafe {
            let table = sws_getCoefficients(SWS_CS_DEFAULT);
            sws_setColorspaceDetails(scaler.ctx, table, 1, table, 1, 0, 1 << 16, 1 << 16)
        };
        if ret < 0 {
            // `scaler` drops here and frees the context.
            return Err(FilterError::ConversionContextFailed(format!(
                "{width}x{height} {src:?} -> {dst:?}: full range not supported"
            )));
        }
        Ok(scaler)
    }

    /// Convert one picture.
    ///
    /// # Safety
    /// The plane pointers and strides must describe pictures of the size and
    /// formats this scaler was built for.
    pub(crate) unsafe fn scale(
        &self,
        src_data: &[*mut u8; 4],
        src_linesize: &[c_int; 4],
        height: c_int,
        dst_data: *const *mut u8,
        dst_linesize: *const c_int,
    ) -> c_int {
        unsafe {
            sws_scale(
                self.ctx,
                src_data.as_ptr() as *const *const u8,
                src_linesize.as_ptr(),
                0,
                height,
                dst_data,
                dst_linesize,
            )
        }
    }
}

impl Drop for Scaler {
    fn drop(&mut self) {
        // SAFETY: allocated by sws_getContext.
        unsafe { sws_freeContext(self.ctx) };
    }
}

// SAFETY: every handle owns its allocation exclusively and libav* contexts
// may move between threads as long as they are not used concurrently.
unsafe impl Send for CodecContext {}
unsafe impl Send for Frame {}
unsafe impl Send for Packet {}
unsafe impl Send for Parser {}
unsafe impl Send for Scaler {}
