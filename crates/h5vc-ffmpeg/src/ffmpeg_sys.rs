//! FFmpeg FFI helpers: error translation, string conversion, pixel format
//! and scaler flag mapping, and codec library log level.

use std::ffi::{CString, c_int};
use std::fmt::{Display, Formatter};

use ffmpeg_sys_next::{AVPixelFormat, av_log_set_level, av_strerror};
use h5vc_core::config::{CodecLogLevel, ScaleFilter};
use h5vc_core::pixel_format::PixelFormat;

// ── Constants not exported as plain integers by ffmpeg-sys-next ─────────────

const SWS_BILINEAR: c_int = 0x2;
const SWS_BICUBIC: c_int = 0x4;
const SWS_POINT: c_int = 0x10;
const SWS_AREA: c_int = 0x20;
const SWS_ACCURATE_RND: c_int = 0x40000;
const SWS_BITEXACT: c_int = 0x80000;

/// `SWS_CS_DEFAULT` (BT.601) colorspace coefficient table index.
pub const SWS_CS_DEFAULT: c_int = 5;

const AV_LOG_QUIET: c_int = -8;
const AV_LOG_ERROR: c_int = 16;
const AV_LOG_WARNING: c_int = 24;
const AV_LOG_INFO: c_int = 32;

/// Structured FFmpeg error details for module-specific wrapping.
#[derive(Debug, Clone)]
pub struct FfmpegErrorDetail {
    /// Operation that failed (e.g. `"avcodec_open2"`).
    pub context: String,
    /// Raw FFmpeg error code (negative AVERROR value).
    pub code: i32,
    /// Message from `av_strerror`.
    pub message: String,
}

impl Display for FfmpegErrorDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (code {})", self.context, self.message, self.code)
    }
}

/// Translate an FFmpeg return code into a structured error.
///
/// On success (`ret >= 0`) this is a no-op.
pub fn check_ffmpeg(ret: i32, context: &str) -> std::result::Result<(), FfmpegErrorDetail> {
    if ret >= 0 {
        return Ok(());
    }

    let mut buf = [0 as std::ffi::c_char; 256];
    // SAFETY: buf is a valid mutable buffer of known length.
    unsafe {
        av_strerror(ret, buf.as_mut_ptr(), buf.len());
    }
    let msg = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) }
        .to_str()
        .unwrap_or("unknown error")
        .to_string();

    Err(FfmpegErrorDetail {
        context: context.to_string(),
        code: ret,
        message: msg,
    })
}

/// Convert a Rust `&str` to a `CString`, mapping NUL bytes to an error.
pub fn to_cstring(s: &str) -> std::result::Result<CString, String> {
    CString::new(s).map_err(|e| format!("Invalid option string: {e}"))
}

pub fn av_pix_fmt(format: PixelFormat) -> AVPixelFormat {
    match format {
        PixelFormat::Gray8 => AVPixelFormat::AV_PIX_FMT_GRAY8,
        PixelFormat::Gray10Le => AVPixelFormat::AV_PIX_FMT_GRAY10LE,
        PixelFormat::Gray12Le => AVPixelFormat::AV_PIX_FMT_GRAY12LE,
        PixelFormat::Yuv420p => AVPixelFormat::AV_PIX_FMT_YUV420P,
        PixelFormat::Yuv420p10Le => AVPixelFormat::AV_PIX_FMT_YUV420P10LE,
        PixelFormat::Yuv420p12Le => AVPixelFormat::AV_PIX_FMT_YUV420P12LE,
        PixelFormat::Nv12 => AVPixelFormat::AV_PIX_FMT_NV12,
        PixelFormat::P010Le => AVPixelFormat::AV_PIX_FMT_P010LE,
    }
}

/// Decoder output layouts the scaler converts from, paired with the layout
/// handed to swscale. The full-range `yuvj*` aliases that decoders report for
/// streams tagged full range map to their plain layouts; range is configured
/// explicitly on the scaler.
const DECODED_FORMATS: [(AVPixelFormat, AVPixelFormat); 17] = [
    (AVPixelFormat::AV_PIX_FMT_GRAY8, AVPixelFormat::AV_PIX_FMT_GRAY8),
    (AVPixelFormat::AV_PIX_FMT_GRAY10LE, AVPixelFormat::AV_PIX_FMT_GRAY10LE),
    (AVPixelFormat::AV_PIX_FMT_GRAY12LE, AVPixelFormat::AV_PIX_FMT_GRAY12LE),
    (AVPixelFormat::AV_PIX_FMT_YUV420P, AVPixelFormat::AV_PIX_FMT_YUV420P),
    (AVPixelFormat::AV_PIX_FMT_YUV420P10LE, AVPixelFormat::AV_PIX_FMT_YUV420P10LE),
    (AVPixelFormat::AV_PIX_FMT_YUV420P12LE, AVPixelFormat::AV_PIX_FMT_YUV420P12LE),
    (AVPixelFormat::AV_PIX_FMT_NV12, AVPixelFormat::AV_PIX_FMT_NV12),
    (AVPixelFormat::AV_PIX_FMT_P010LE, AVPixelFormat::AV_PIX_FMT_P010LE),
    (AVPixelFormat::AV_PIX_FMT_YUV422P, AVPixelFormat::AV_PIX_FMT_YUV422P),
    (AVPixelFormat::AV_PIX_FMT_YUV444P, AVPixelFormat::AV_PIX_FMT_YUV444P),
    (AVPixelFormat::AV_PIX_FMT_YUV422P10LE, AVPixelFormat::AV_PIX_FMT_YUV422P10LE),
    (AVPixelFormat::AV_PIX_FMT_YUV444P10LE, AVPixelFormat::AV_PIX_FMT_YUV444P10LE),
    (AVPixelFormat::AV_PIX_FMT_YUV422P12LE, AVPixelFormat::AV_PIX_FMT_YUV422P12LE),
    (AVPixelFormat::AV_PIX_FMT_YUV444P12LE, AVPixelFormat::AV_PIX_FMT_YUV444P12LE),
    (AVPixelFormat::AV_PIX_FMT_YUVJ420P, AVPixelFormat::AV_PIX_FMT_YUV420P),
    (AVPixelFormat::AV_PIX_FMT_YUVJ422P, AVPixelFormat::AV_PIX_FMT_YUV422P),
    (AVPixelFormat::AV_PIX_FMT_YUVJ444P, AVPixelFormat::AV_PIX_FMT_YUV444P),
];

/// Scaler source layout for a raw `AVFrame::format`, or `None` when the
/// decoder produced something the filter cannot convert.
pub fn decoded_source_format(raw: c_int) -> Option<AVPixelFormat> {
    DECODED_FORMATS
        .iter()
        .find(|(reported, _)| *reported as c_int == raw)
        .map(|&(_, source)| source)
}

/// `sws_getContext` flags for `filter`. Rounding is always accurate so the
/// gray ↔ luma path stays byte-exact at 8 bits.
pub fn sws_flags(filter: ScaleFilter) -> c_int {
    let kernel = match filter {
        ScaleFilter::Bilinear => SWS_BILINEAR,
        ScaleFilter::Bicubic => SWS_BICUBIC,
        ScaleFilter::Point => SWS_POINT,
        ScaleFilter::Area => SWS_AREA,
    };
    kernel | SWS_ACCURATE_RND | SWS_BITEXACT
}

/// Set the process-wide libav* log level.
pub fn set_codec_log_level(level: CodecLogLevel) {
    let raw = match level {
        CodecLogLevel::Quiet => AV_LOG_QUIET,
        CodecLogLevel::Error => AV_LOG_ERROR,
        CodecLogLevel::Warning => AV_LOG_WARNING,
        CodecLogLevel::Info => AV_LOG_INFO,
    };
    // SAFETY: av_log_set_level only stores an integer.
    unsafe { av_log_set_level(raw) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planned_formats_are_accepted_from_decoders() {
        for format in PixelFormat::ALL {
            let fmt = av_pix_fmt(format);
            assert_eq!(decoded_source_format(fmt as c_int), Some(fmt));
        }
        assert_eq!(decoded_source_format(-1), None);
    }

    #[test]
    fn full_range_aliases_scale_as_plain_yuv() {
        // h264/hevc report full-range 8-bit streams as yuvj420p.
        assert_eq!(
            decoded_source_format(AVPixelFormat::AV_PIX_FMT_YUVJ420P as c_int),
            Some(AVPixelFormat::AV_PIX_FMT_YUV420P)
        );
        assert_eq!(
            decoded_source_format(AVPixelFormat::AV_PIX_FMT_YUVJ444P as c_int),
            Some(AVPixelFormat::AV_PIX_FMT_YUV444P)
        );
    }

    #[test]
    fn every_filter_rounds_accurately() {
        for filter in [
            ScaleFilter::Bilinear,
            ScaleFilter::Bicubic,
            ScaleFilter::Point,
            ScaleFilter::Area,
        ] {
            assert_ne!(sws_flags(filter) & SWS_ACCURATE_RND, 0);
        }
    }

    #[test]
    fn negative_codes_carry_context() {
        let err = check_ffmpeg(-22, "avcodec_open2").unwrap_err();
        assert_eq!(err.code, -22);
        assert!(err.to_string().starts_with("avcodec_open2: "));
        assert!(check_ffmpeg(0, "noop").is_ok());
    }
}
