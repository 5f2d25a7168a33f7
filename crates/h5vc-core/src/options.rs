//! Private codec options per encoder family.
//!
//! Rate control is family specific: `crf` is a CRF for x264/x265/SVT-AV1, a
//! constant QP for NVENC and rav1e, and `global_quality` for QSV. Values at or
//! above a family's ceiling leave the codec's own rate control untouched.

use serde::Serialize;

use crate::codec_table::CodecFamily;
use crate::params::CompressionParameters;

/// Value of one `AVOptions` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum OptionValue {
    Str(String),
    Int(i64),
}

/// One option set on the encoder's private data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodecOption {
    pub key: &'static str,
    pub value: OptionValue,
}

impl CodecOption {
    fn text(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: OptionValue::Str(value.into()),
        }
    }

    fn int(key: &'static str, value: impl Into<i64>) -> Self {
        Self {
            key,
            value: OptionValue::Int(value.into()),
        }
    }
}

/// Everything the backend applies to an encoder context before opening it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EncoderTuning {
    pub options: Vec<CodecOption>,
    /// Clear the context bit rate so constant-QP mode is not capped.
    pub zero_bit_rate: bool,
}

impl EncoderTuning {
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options.iter().find(|o| o.key == key).map(|o| &o.value)
    }
}

const H26X_CRF_LIMIT: u32 = 52;
const SVTAV1_CRF_LIMIT: u32 = 64;
const RAV1E_QP_LIMIT: u32 = 255;

/// Build the option list for `family` from already-resolved keywords.
pub fn encoder_tuning(
    family: CodecFamily,
    preset: &str,
    tune: &str,
    params: &CompressionParameters,
) -> EncoderTuning {
    let mut tuning = EncoderTuning::default();
    let opts = &mut tuning.options;
    let crf = params.crf;

    match family {
        CodecFamily::X264 | CodecFamily::X265 => {
            if !preset.is_empty() {
                opts.push(CodecOption::text("preset", preset));
            }
            if !tune.is_empty() {
                opts.push(CodecOption::text("tune", tune));
            }
            if crf < H26X_CRF_LIMIT {
                opts.push(CodecOption::int("crf", crf));
            }
            if family == CodecFamily::X265 {
                opts.push(CodecOption::text("x265-params", "log-level=0"));
            }
        }
        CodecFamily::H264Nvenc | CodecFamily::HevcNvenc | CodecFamily::Av1Nvenc => {
            if !preset.is_empty() {
                opts.push(CodecOption::text("preset", preset));
            }
            if !tune.is_empty() {
                opts.push(CodecOption::text("tune", tune));
            }
            if crf < H26X_CRF_LIMIT {
                opts.push(CodecOption::text("rc", "constqp"));
                opts.push(CodecOption::int("qp", crf));
                tuning.zero_bit_rate = true;
            }
            opts.push(CodecOption::int("gpu", params.gpu_id));
        }
        CodecFamily::SvtAv1 => {
            if let Some(level) = numeric_preset(preset) {
                opts.push(CodecOption::int("preset", level));
            }
            opts.push(CodecOption::text(
                "svtav1-params",
                svtav1_params(tune, params.film_grain),
            ));
            if crf < SVTAV1_CRF_LIMIT {
                opts.push(CodecOption::int("crf", crf));
            }
        }
        CodecFamily::Rav1e => {
            if let Some(level) = numeric_preset(preset) {
                opts.push(CodecOption::int("speed", level));
            }
            if !tune.is_empty() {
                opts.push(CodecOption::text("rav1e-params", tune));
            }
            if crf < RAV1E_QP_LIMIT {
                opts.push(CodecOption::int("qp", crf));
            }
        }
        CodecFamily::Av1Qsv => {
            if !preset.is_empty() {
                opts.push(CodecOption::text("preset", preset));
            }
            if !tune.is_empty() {
                opts.push(CodecOption::text("scenario", tune));
            }
            if crf < H26X_CRF_LIMIT {
                opts.push(CodecOption::int("global_quality", crf));
            }
        }
        CodecFamily::Mpeg4 => {}
    }
    tuning
}

fn numeric_preset(preset: &str) -> Option<i64> {
    preset.parse().ok()
}

/// `[tune:]film-grain=N[:film-grain-denoise=1]:enable-tf=0`
fn svtav1_params(tune: &str, film_grain: u32) -> String {
    let mut params = String::new();
    if !tune.is_empty() {
        params.push_str(tune);
        params.push(':');
    }
    params.push_str(&format!("film-grain={film_grain}"));
    if film_grain > 0 {
        params.push_str(":film-grain-denoise=1");
    }
    params.push_str(":enable-tf=0");
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(crf: u32, film_grain: u32, gpu_id: u32) -> CompressionParameters {
        CompressionParameters {
            crf,
            film_grain,
            gpu_id,
            ..CompressionParameters::default()
        }
    }

    fn text(v: &str) -> OptionValue {
        OptionValue::Str(v.to_string())
    }

    #[test]
    fn x264_sets_keywords_and_crf() {
        let t = encoder_tuning(CodecFamily::X264, "medium", "psnr", &params(20, 0, 0));
        assert_eq!(t.get("preset"), Some(&text("medium")));
        assert_eq!(t.get("tune"), Some(&text("psnr")));
        assert_eq!(t.get("crf"), Some(&OptionValue::Int(20)));
        // libx264 has no x265-params option; setting it would only fail.
        assert_eq!(t.get("x265-params"), None);
        assert!(!t.zero_bit_rate);
    }

    #[test]
    fn out_of_range_crf_keeps_codec_rate_control() {
        let t = encoder_tuning(CodecFamily::X265, "", "", &params(60, 0, 0));
        assert_eq!(t.get("crf"), None);
        assert_eq!(t.get("preset"), None);
        assert_eq!(t.get("x265-params"), Some(&text("log-level=0")));
    }

    #[test]
    fn nvenc_uses_constant_qp_and_gpu() {
        let t = encoder_tuning(CodecFamily::HevcNvenc, "p7", "hq", &params(18, 0, 1));
        assert_eq!(t.get("rc"), Some(&text("constqp")));
        assert_eq!(t.get("qp"), Some(&OptionValue::Int(18)));
        assert_eq!(t.get("gpu"), Some(&OptionValue::Int(1)));
        assert!(t.zero_bit_rate);

        let vbr = encoder_tuning(CodecFamily::H264Nvenc, "", "", &params(99, 0, 0));
        assert_eq!(vbr.get("rc"), None);
        assert!(!vbr.zero_bit_rate);
        assert_eq!(vbr.get("gpu"), Some(&OptionValue::Int(0)));
    }

    #[test]
    fn svtav1_assembles_parameter_string() {
        let t = encoder_tuning(CodecFamily::SvtAv1, "6", "tune=0", &params(30, 8, 0));
        assert_eq!(t.get("preset"), Some(&OptionValue::Int(6)));
        assert_eq!(
            t.get("svtav1-params"),
            Some(&text("tune=0:film-grain=8:film-grain-denoise=1:enable-tf=0"))
        );
        assert_eq!(t.get("crf"), Some(&OptionValue::Int(30)));

        let plain = encoder_tuning(CodecFamily::SvtAv1, "", "", &params(64, 0, 0));
        assert_eq!(plain.get("preset"), None);
        assert_eq!(plain.get("svtav1-params"), Some(&text("film-grain=0:enable-tf=0")));
        assert_eq!(plain.get("crf"), None);
    }

    #[test]
    fn rav1e_maps_preset_to_speed() {
        let t = encoder_tuning(CodecFamily::Rav1e, "10", "tune=Psnr", &params(100, 0, 0));
        assert_eq!(t.get("speed"), Some(&OptionValue::Int(10)));
        assert_eq!(t.get("rav1e-params"), Some(&text("tune=Psnr")));
        assert_eq!(t.get("qp"), Some(&OptionValue::Int(100)));
    }

    #[test]
    fn qsv_uses_scenario_and_global_quality() {
        let t = encoder_tuning(CodecFamily::Av1Qsv, "slow", "archive", &params(25, 0, 0));
        assert_eq!(t.get("scenario"), Some(&text("archive")));
        assert_eq!(t.get("global_quality"), Some(&OptionValue::Int(25)));
    }

    #[test]
    fn mpeg4_sets_nothing() {
        let t = encoder_tuning(CodecFamily::Mpeg4, "", "", &params(3, 0, 0));
        assert!(t.options.is_empty());
    }
}
