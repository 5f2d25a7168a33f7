//! Encoder / decoder identities and the family-scoped preset and tune tables.
//!
//! Ids are a compatibility contract with files already written by the filter:
//! the same preset id space is reused per family (200s are x265 presets, 400s
//! SVT-AV1 speed levels, ...). Changing a table entry silently changes the
//! compression quality of every caller that relies on it.

use serde::Serialize;

use crate::error::{FilterError, Result};

// ─── Encoders ────────────────────────────────────────────────────────────

/// Encoders addressable by `encoder_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Encoder {
    Mpeg4,
    Xvid,
    X264,
    H264Nvenc,
    X265,
    HevcNvenc,
    SvtAv1,
    Rav1e,
    Av1Nvenc,
    Av1Qsv,
}

impl Encoder {
    pub const ALL: [Encoder; 10] = [
        Self::Mpeg4,
        Self::Xvid,
        Self::X264,
        Self::H264Nvenc,
        Self::X265,
        Self::HevcNvenc,
        Self::SvtAv1,
        Self::Rav1e,
        Self::Av1Nvenc,
        Self::Av1Qsv,
    ];

    /// Used when `encoder_id` is outside the table.
    pub const DEFAULT: Encoder = Self::X264;

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// FFmpeg encoder name.
    pub fn codec_name(self) -> &'static str {
        match self {
            Self::Mpeg4 => "mpeg4",
            Self::Xvid => "libxvid",
            Self::X264 => "libx264",
            Self::H264Nvenc => "h264_nvenc",
            Self::X265 => "libx265",
            Self::HevcNvenc => "hevc_nvenc",
            Self::SvtAv1 => "libsvtav1",
            Self::Rav1e => "librav1e",
            Self::Av1Nvenc => "av1_nvenc",
            Self::Av1Qsv => "av1_qsv",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.codec_name() == name)
            .ok_or_else(|| FilterError::UnknownName {
                kind: "encoder",
                name: name.to_string(),
            })
    }

    pub fn family(self) -> CodecFamily {
        match self {
            Self::Mpeg4 | Self::Xvid => CodecFamily::Mpeg4,
            Self::X264 => CodecFamily::X264,
            Self::H264Nvenc => CodecFamily::H264Nvenc,
            Self::X265 => CodecFamily::X265,
            Self::HevcNvenc => CodecFamily::HevcNvenc,
            Self::SvtAv1 => CodecFamily::SvtAv1,
            Self::Rav1e => CodecFamily::Rav1e,
            Self::Av1Nvenc => CodecFamily::Av1Nvenc,
            Self::Av1Qsv => CodecFamily::Av1Qsv,
        }
    }

    /// Software decoder able to read this encoder's bitstream.
    pub fn default_decoder(self) -> Decoder {
        match self {
            Self::Mpeg4 | Self::Xvid => Decoder::Mpeg4,
            Self::X264 | Self::H264Nvenc => Decoder::H264,
            Self::X265 | Self::HevcNvenc => Decoder::Hevc,
            Self::SvtAv1 | Self::Rav1e | Self::Av1Nvenc | Self::Av1Qsv => Decoder::Dav1d,
        }
    }

    /// Matching hardware decoder for hardware encoders.
    pub fn hardware_decoder(self) -> Option<Decoder> {
        match self {
            Self::H264Nvenc => Some(Decoder::H264Cuvid),
            Self::HevcNvenc => Some(Decoder::HevcCuvid),
            Self::Av1Nvenc => Some(Decoder::Av1Cuvid),
            Self::Av1Qsv => Some(Decoder::Av1Qsv),
            _ => None,
        }
    }
}

// ─── Decoders ────────────────────────────────────────────────────────────

/// Decoders addressable by `decoder_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Decoder {
    Mpeg4,
    H264,
    H264Cuvid,
    Hevc,
    HevcCuvid,
    AomAv1,
    Dav1d,
    Av1Cuvid,
    Av1Qsv,
}

impl Decoder {
    pub const ALL: [Decoder; 9] = [
        Self::Mpeg4,
        Self::H264,
        Self::H264Cuvid,
        Self::Hevc,
        Self::HevcCuvid,
        Self::AomAv1,
        Self::Dav1d,
        Self::Av1Cuvid,
        Self::Av1Qsv,
    ];

    /// Used when `decoder_id` is outside the table.
    pub const DEFAULT: Decoder = Self::H264;

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// FFmpeg decoder name.
    pub fn codec_name(self) -> &'static str {
        match self {
            Self::Mpeg4 => "mpeg4",
            Self::H264 => "h264",
            Self::H264Cuvid => "h264_cuvid",
            Self::Hevc => "hevc",
            Self::HevcCuvid => "hevc_cuvid",
            Self::AomAv1 => "libaom-av1",
            Self::Dav1d => "libdav1d",
            Self::Av1Cuvid => "av1_cuvid",
            Self::Av1Qsv => "av1_qsv",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.codec_name() == name)
            .ok_or_else(|| FilterError::UnknownName {
                kind: "decoder",
                name: name.to_string(),
            })
    }

    /// Decoders that need a GPU or vendor runtime.
    pub fn is_hardware(self) -> bool {
        matches!(
            self,
            Self::H264Cuvid | Self::HevcCuvid | Self::Av1Cuvid | Self::Av1Qsv
        )
    }

    /// Software decoder for the same bitstream family.
    pub fn software_equivalent(self) -> Decoder {
        match self {
            Self::H264Cuvid => Self::H264,
            Self::HevcCuvid => Self::Hevc,
            Self::Av1Cuvid | Self::Av1Qsv => Self::Dav1d,
            other => other,
        }
    }
}

/// Lenient lookup: unknown ids fall back to [`Encoder::DEFAULT`].
pub fn resolve_encoder(id: u32) -> Encoder {
    Encoder::from_id(id).unwrap_or_else(|| {
        tracing::warn!(id, fallback = Encoder::DEFAULT.codec_name(), "Unknown encoder id");
        Encoder::DEFAULT
    })
}

/// Lenient lookup: unknown ids fall back to [`Decoder::DEFAULT`].
pub fn resolve_decoder(id: u32) -> Decoder {
    Decoder::from_id(id).unwrap_or_else(|| {
        tracing::warn!(id, fallback = Decoder::DEFAULT.codec_name(), "Unknown decoder id");
        Decoder::DEFAULT
    })
}

pub fn resolve_encoder_strict(id: u32) -> Result<Encoder> {
    Encoder::from_id(id).ok_or(FilterError::UnknownCodecId {
        kind: "encoder",
        id,
    })
}

pub fn resolve_decoder_strict(id: u32) -> Result<Decoder> {
    Decoder::from_id(id).ok_or(FilterError::UnknownCodecId {
        kind: "decoder",
        id,
    })
}

// ─── Families and keyword tables ─────────────────────────────────────────

/// Codecs sharing one preset/tune numbering space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CodecFamily {
    /// mpeg4 and libxvid: no presets or tunes.
    Mpeg4,
    X264,
    H264Nvenc,
    X265,
    HevcNvenc,
    SvtAv1,
    Rav1e,
    Av1Nvenc,
    Av1Qsv,
}

/// One row of a preset or tune table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub id: u32,
    /// Name accepted by the CLI and bridge.
    pub name: &'static str,
    /// Value handed to the codec.
    pub value: &'static str,
}

const fn kw(id: u32, name: &'static str, value: &'static str) -> Keyword {
    Keyword { id, name, value }
}

const fn same(id: u32, value: &'static str) -> Keyword {
    Keyword {
        id,
        name: value,
        value,
    }
}

const X264_PRESETS: &[Keyword] = &[
    same(10, "ultrafast"),
    same(11, "superfast"),
    same(12, "veryfast"),
    same(13, "faster"),
    same(14, "fast"),
    same(15, "medium"),
    same(16, "slow"),
    same(17, "slower"),
    same(18, "veryslow"),
];

const X265_PRESETS: &[Keyword] = &[
    same(200, "ultrafast"),
    same(201, "superfast"),
    same(202, "veryfast"),
    same(203, "faster"),
    same(204, "fast"),
    same(205, "medium"),
    same(206, "slow"),
    same(207, "slower"),
    same(208, "veryslow"),
];

const H264_NVENC_PRESETS: &[Keyword] = &[
    same(100, "p1"),
    same(101, "p2"),
    same(102, "p3"),
    same(103, "p4"),
    same(104, "p5"),
    same(105, "p6"),
    same(106, "p7"),
];

const HEVC_NVENC_PRESETS: &[Keyword] = &[
    same(300, "p1"),
    same(301, "p2"),
    same(302, "p3"),
    same(303, "p4"),
    same(304, "p5"),
    same(305, "p6"),
    same(306, "p7"),
];

const AV1_NVENC_PRESETS: &[Keyword] = &[
    same(600, "p1"),
    same(601, "p2"),
    same(602, "p3"),
    same(603, "p4"),
    same(604, "p5"),
    same(605, "p6"),
    same(606, "p7"),
];

// SVT-AV1 and rav1e take numeric speed levels, fastest first.
const SVTAV1_PRESETS: &[Keyword] = &[
    same(400, "13"),
    same(401, "12"),
    same(402, "11"),
    same(403, "10"),
    same(404, "9"),
    same(405, "8"),
    same(406, "7"),
    same(407, "6"),
    same(408, "5"),
    same(409, "4"),
    same(410, "3"),
    same(411, "2"),
    same(412, "1"),
    same(413, "0"),
];

const RAV1E_PRESETS: &[Keyword] = &[
    same(500, "10"),
    same(501, "9"),
    same(502, "8"),
    same(503, "7"),
    same(504, "6"),
    same(505, "5"),
    same(506, "4"),
    same(507, "3"),
    same(508, "2"),
    same(509, "1"),
    same(510, "0"),
];

const AV1_QSV_PRESETS: &[Keyword] = &[
    same(700, "veryfast"),
    same(701, "faster"),
    same(702, "fast"),
    same(703, "medium"),
    same(704, "slow"),
    same(705, "slower"),
    same(706, "veryslow"),
];

const X264_TUNES: &[Keyword] = &[
    same(10, "psnr"),
    same(11, "ssim"),
    same(12, "grain"),
    same(13, "fastdecode"),
    same(14, "zerolatency"),
    same(15, "animation"),
    same(16, "film"),
    same(17, "stillimage"),
];

const X265_TUNES: &[Keyword] = &[
    same(200, "psnr"),
    same(201, "ssim"),
    same(202, "grain"),
    same(203, "fastdecode"),
    same(204, "zerolatency"),
    same(205, "animation"),
];

const H264_NVENC_TUNES: &[Keyword] = &[
    same(100, "hq"),
    same(101, "ll"),
    same(102, "ull"),
    same(103, "lossless"),
];

const HEVC_NVENC_TUNES: &[Keyword] = &[
    same(300, "hq"),
    same(301, "ll"),
    same(302, "ull"),
    same(303, "lossless"),
];

const AV1_NVENC_TUNES: &[Keyword] = &[
    same(600, "hq"),
    same(601, "ll"),
    same(602, "ull"),
    same(603, "lossless"),
];

// These are fragments of the encoder's own parameter string.
const SVTAV1_TUNES: &[Keyword] = &[
    kw(400, "vq", "tune=0"),
    kw(401, "psnr", "tune=1"),
    kw(402, "fastdecode", "fast-decode=1"),
];

const RAV1E_TUNES: &[Keyword] = &[
    kw(500, "psnr", "tune=Psnr"),
    kw(501, "psychovisual", "tune=Psychovisual"),
];

const AV1_QSV_TUNES: &[Keyword] = &[
    same(700, "unknown"),
    same(701, "displayremoting"),
    same(702, "videoconference"),
    same(703, "archive"),
    same(704, "livestreaming"),
    same(705, "cameracapture"),
    same(706, "videosurveillance"),
    same(707, "gamestreaming"),
    same(708, "remotegaming"),
];

impl CodecFamily {
    pub fn presets(self) -> &'static [Keyword] {
        match self {
            Self::Mpeg4 => &[],
            Self::X264 => X264_PRESETS,
            Self::H264Nvenc => H264_NVENC_PRESETS,
            Self::X265 => X265_PRESETS,
            Self::HevcNvenc => HEVC_NVENC_PRESETS,
            Self::SvtAv1 => SVTAV1_PRESETS,
            Self::Rav1e => RAV1E_PRESETS,
            Self::Av1Nvenc => AV1_NVENC_PRESETS,
            Self::Av1Qsv => AV1_QSV_PRESETS,
        }
    }

    pub fn tunes(self) -> &'static [Keyword] {
        match self {
            Self::Mpeg4 => &[],
            Self::X264 => X264_TUNES,
            Self::H264Nvenc => H264_NVENC_TUNES,
            Self::X265 => X265_TUNES,
            Self::HevcNvenc => HEVC_NVENC_TUNES,
            Self::SvtAv1 => SVTAV1_TUNES,
            Self::Rav1e => RAV1E_TUNES,
            Self::Av1Nvenc => AV1_NVENC_TUNES,
            Self::Av1Qsv => AV1_QSV_TUNES,
        }
    }

    /// Preset id for a CLI-facing name.
    pub fn preset_id(self, name: &str) -> Result<u32> {
        lookup_name(self.presets(), name, "preset")
    }

    /// Tune id for a CLI-facing name.
    pub fn tune_id(self, name: &str) -> Result<u32> {
        lookup_name(self.tunes(), name, "tune")
    }

    /// Whether `id` is 0 or present in this family's preset table.
    pub fn knows_preset(self, id: u32) -> bool {
        id == 0 || self.presets().iter().any(|k| k.id == id)
    }

    pub fn knows_tune(self, id: u32) -> bool {
        id == 0 || self.tunes().iter().any(|k| k.id == id)
    }
}

fn lookup_name(table: &[Keyword], name: &str, kind: &'static str) -> Result<u32> {
    table
        .iter()
        .find(|k| k.name == name)
        .map(|k| k.id)
        .ok_or_else(|| FilterError::UnknownName {
            kind,
            name: name.to_string(),
        })
}

fn lookup_id(table: &[Keyword], id: u32) -> &'static str {
    table
        .iter()
        .find(|k| k.id == id)
        .map_or("", |k| k.value)
}

/// Codec preset keyword for `id`, or `""` to keep the codec default.
pub fn resolve_preset(family: CodecFamily, id: u32) -> &'static str {
    lookup_id(family.presets(), id)
}

/// Codec tune keyword for `id`, or `""` to keep the codec default.
pub fn resolve_tune(family: CodecFamily, id: u32) -> &'static str {
    lookup_id(family.tunes(), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_ids_match_table_order() {
        assert_eq!(resolve_encoder(0).codec_name(), "mpeg4");
        assert_eq!(resolve_encoder(2).codec_name(), "libx264");
        assert_eq!(resolve_encoder(6).codec_name(), "libsvtav1");
        assert_eq!(resolve_encoder(9).codec_name(), "av1_qsv");
        for encoder in Encoder::ALL {
            assert_eq!(Encoder::from_id(encoder.id()), Some(encoder));
        }
    }

    #[test]
    fn decoder_ids_match_table_order() {
        assert_eq!(resolve_decoder(1).codec_name(), "h264");
        assert_eq!(resolve_decoder(5).codec_name(), "libaom-av1");
        assert_eq!(resolve_decoder(8).codec_name(), "av1_qsv");
    }

    #[test]
    fn unknown_ids_fall_back_silently() {
        for id in [10, 99, u32::MAX] {
            assert_eq!(resolve_encoder(id), Encoder::X264);
        }
        for id in [9, 1000, u32::MAX] {
            assert_eq!(resolve_decoder(id), Decoder::H264);
        }
    }

    #[test]
    fn strict_lookup_rejects_unknown_ids() {
        assert!(matches!(
            resolve_encoder_strict(10),
            Err(FilterError::UnknownCodecId { kind: "encoder", id: 10 })
        ));
        assert!(resolve_decoder_strict(9).is_err());
        assert_eq!(resolve_encoder_strict(4).unwrap(), Encoder::X265);
    }

    #[test]
    fn preset_ids_are_family_scoped() {
        assert_eq!(resolve_preset(CodecFamily::X264, 15), "medium");
        assert_eq!(resolve_preset(CodecFamily::X265, 205), "medium");
        assert_eq!(resolve_preset(CodecFamily::HevcNvenc, 306), "p7");
        assert_eq!(resolve_preset(CodecFamily::SvtAv1, 400), "13");
        assert_eq!(resolve_preset(CodecFamily::SvtAv1, 407), "6");
        assert_eq!(resolve_preset(CodecFamily::SvtAv1, 413), "0");
        assert_eq!(resolve_preset(CodecFamily::Rav1e, 504), "6");
        assert_eq!(resolve_preset(CodecFamily::Av1Qsv, 700), "veryfast");
        // An x265 id means nothing to x264.
        assert_eq!(resolve_preset(CodecFamily::X264, 205), "");
    }

    #[test]
    fn unknown_preset_and_tune_resolve_to_codec_default() {
        assert_eq!(resolve_preset(CodecFamily::X264, 0), "");
        assert_eq!(resolve_preset(CodecFamily::X264, 19), "");
        assert_eq!(resolve_tune(CodecFamily::Rav1e, 502), "");
        assert_eq!(resolve_preset(CodecFamily::Mpeg4, 15), "");
        assert_eq!(resolve_tune(CodecFamily::Mpeg4, 10), "");
    }

    #[test]
    fn tunes_carry_codec_specific_values() {
        assert_eq!(resolve_tune(CodecFamily::X264, 17), "stillimage");
        assert_eq!(resolve_tune(CodecFamily::H264Nvenc, 103), "lossless");
        assert_eq!(resolve_tune(CodecFamily::SvtAv1, 402), "fast-decode=1");
        assert_eq!(resolve_tune(CodecFamily::Rav1e, 501), "tune=Psychovisual");
        assert_eq!(resolve_tune(CodecFamily::Av1Qsv, 708), "remotegaming");
    }

    #[test]
    fn names_round_trip_through_ids() {
        assert_eq!(CodecFamily::X264.preset_id("veryslow").unwrap(), 18);
        assert_eq!(CodecFamily::SvtAv1.tune_id("psnr").unwrap(), 401);
        assert_eq!(CodecFamily::SvtAv1.preset_id("13").unwrap(), 400);
        assert!(CodecFamily::X264.preset_id("p4").is_err());
        assert_eq!(Encoder::from_name("libsvtav1").unwrap(), Encoder::SvtAv1);
        assert!(Decoder::from_name("vp9").is_err());
    }

    #[test]
    fn default_decoders_follow_bitstream_family() {
        assert_eq!(Encoder::Xvid.default_decoder(), Decoder::Mpeg4);
        assert_eq!(Encoder::H264Nvenc.default_decoder(), Decoder::H264);
        assert_eq!(Encoder::HevcNvenc.hardware_decoder(), Some(Decoder::HevcCuvid));
        assert_eq!(Encoder::Rav1e.default_decoder(), Decoder::Dav1d);
        assert_eq!(Encoder::X264.hardware_decoder(), None);
        assert_eq!(Decoder::Av1Qsv.software_equivalent(), Decoder::Dav1d);
        assert!(!Decoder::AomAv1.is_hardware());
    }
}
