//! Native pixel format selection per codec and bit depth.
//!
//! Source planes are always single-channel grayscale; the codec side is
//! whatever the family negotiates. Hardware encoders only accept interleaved
//! 4:2:0 formats, even for monochrome content.

use serde::Serialize;

use crate::codec_table::{CodecFamily, Decoder};
use crate::params::BitMode;

/// Pixel layouts the filter converts between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PixelFormat {
    Gray8,
    Gray10Le,
    Gray12Le,
    Yuv420p,
    Yuv420p10Le,
    Yuv420p12Le,
    Nv12,
    P010Le,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 8] = [
        Self::Gray8,
        Self::Gray10Le,
        Self::Gray12Le,
        Self::Yuv420p,
        Self::Yuv420p10Le,
        Self::Yuv420p12Le,
        Self::Nv12,
        Self::P010Le,
    ];

    /// FFmpeg's name for the format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gray8 => "gray",
            Self::Gray10Le => "gray10le",
            Self::Gray12Le => "gray12le",
            Self::Yuv420p => "yuv420p",
            Self::Yuv420p10Le => "yuv420p10le",
            Self::Yuv420p12Le => "yuv420p12le",
            Self::Nv12 => "nv12",
            Self::P010Le => "p010le",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Grayscale layout of the caller's planes.
pub fn source_format(bit_mode: BitMode) -> PixelFormat {
    match bit_mode {
        BitMode::Eight => PixelFormat::Gray8,
        BitMode::Ten => PixelFormat::Gray10Le,
        BitMode::Twelve => PixelFormat::Gray12Le,
    }
}

fn two_tier(bit_mode: BitMode) -> PixelFormat {
    match bit_mode {
        BitMode::Eight => PixelFormat::Yuv420p,
        BitMode::Ten | BitMode::Twelve => PixelFormat::Yuv420p10Le,
    }
}

fn three_tier(bit_mode: BitMode) -> PixelFormat {
    match bit_mode {
        BitMode::Eight => PixelFormat::Yuv420p,
        BitMode::Ten => PixelFormat::Yuv420p10Le,
        BitMode::Twelve => PixelFormat::Yuv420p12Le,
    }
}

fn interleaved(bit_mode: BitMode) -> PixelFormat {
    match bit_mode {
        BitMode::Eight => PixelFormat::Nv12,
        BitMode::Ten | BitMode::Twelve => PixelFormat::P010Le,
    }
}

/// Frame format handed to the encoder.
pub fn encoder_format(family: CodecFamily, bit_mode: BitMode) -> PixelFormat {
    match family {
        CodecFamily::X264 | CodecFamily::SvtAv1 | CodecFamily::Rav1e => two_tier(bit_mode),
        CodecFamily::X265 => three_tier(bit_mode),
        CodecFamily::H264Nvenc
        | CodecFamily::HevcNvenc
        | CodecFamily::Av1Nvenc
        | CodecFamily::Av1Qsv => interleaved(bit_mode),
        CodecFamily::Mpeg4 => PixelFormat::Yuv420p,
    }
}

/// Frame format the decoder is expected to produce.
pub fn decoder_format(decoder: Decoder, bit_mode: BitMode) -> PixelFormat {
    match decoder {
        Decoder::H264 | Decoder::AomAv1 | Decoder::Dav1d => two_tier(bit_mode),
        Decoder::Hevc => three_tier(bit_mode),
        Decoder::H264Cuvid | Decoder::HevcCuvid | Decoder::Av1Cuvid | Decoder::Av1Qsv => {
            interleaved(bit_mode)
        }
        Decoder::Mpeg4 => PixelFormat::Yuv420p,
    }
}
