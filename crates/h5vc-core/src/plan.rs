//! Resolved session settings: what a backend needs to open an encoder or a
//! decoder for one chunk.

use serde::Serialize;

use crate::codec_table::{
    CodecFamily, Decoder, Encoder, resolve_decoder, resolve_decoder_strict, resolve_encoder,
    resolve_encoder_strict, resolve_preset, resolve_tune,
};
use crate::config::{FilterConfig, ScaleFilter};
use crate::error::{FilterError, Result};
use crate::options::{EncoderTuning, encoder_tuning};
use crate::params::{BitMode, CompressionParameters};
use crate::pixel_format::{PixelFormat, decoder_format, encoder_format, source_format};

/// Plane geometry shared by both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub bit_mode: BitMode,
}

impl Geometry {
    pub fn from_params(params: &CompressionParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            width: params.width,
            height: params.height,
            depth: params.depth,
            bit_mode: params.bit_mode()?,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.bit_mode.bytes_per_pixel()
    }

    pub fn raw_size(&self) -> usize {
        self.frame_size() * self.depth as usize
    }

    /// Grayscale layout of the caller's planes.
    pub fn plane_format(&self) -> PixelFormat {
        source_format(self.bit_mode)
    }
}

/// Everything needed to open an encoder session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncodePlan {
    pub encoder: Encoder,
    pub family: CodecFamily,
    pub geometry: Geometry,
    pub codec_format: PixelFormat,
    pub preset: &'static str,
    pub tune: &'static str,
    pub tuning: EncoderTuning,
    pub frame_rate: u32,
    pub scale_filter: ScaleFilter,
}

impl EncodePlan {
    pub fn resolve(params: &CompressionParameters, config: &FilterConfig) -> Result<Self> {
        let geometry = Geometry::from_params(params)?;
        let encoder = if config.strict_ids {
            resolve_encoder_strict(params.encoder_id)?
        } else {
            resolve_encoder(params.encoder_id)
        };
        let family = encoder.family();

        // mpeg4 and xvid have no preset/tune tables; ids are ignored.
        if config.strict_ids && family != CodecFamily::Mpeg4 {
            if !family.knows_preset(params.preset_id) {
                return Err(FilterError::UnknownCodecId {
                    kind: "preset",
                    id: params.preset_id,
                });
            }
            if !family.knows_tune(params.tune_id) {
                return Err(FilterError::UnknownCodecId {
                    kind: "tune",
                    id: params.tune_id,
                });
            }
        }

        let preset = resolve_preset(family, params.preset_id);
        let tune = resolve_tune(family, params.tune_id);
        if preset.is_empty() && params.preset_id != 0 && family != CodecFamily::Mpeg4 {
            tracing::warn!(
                id = params.preset_id,
                codec = encoder.codec_name(),
                "Preset id not valid for encoder, using codec default"
            );
        }
        if tune.is_empty() && params.tune_id != 0 && family != CodecFamily::Mpeg4 {
            tracing::warn!(
                id = params.tune_id,
                codec = encoder.codec_name(),
                "Tune id not valid for encoder, using codec default"
            );
        }

        Ok(Self {
            encoder,
            family,
            geometry,
            codec_format: encoder_format(family, geometry.bit_mode),
            preset,
            tune,
            tuning: encoder_tuning(family, preset, tune, params),
            frame_rate: config.frame_rate.max(1),
            scale_filter: config.scale_filter,
        })
    }
}

/// Everything needed to open a decoder session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodePlan {
    pub decoder: Decoder,
    /// Software decoder to try when `decoder` is not available.
    pub fallback: Option<Decoder>,
    pub geometry: Geometry,
    pub codec_format: PixelFormat,
    pub scale_filter: ScaleFilter,
}

impl DecodePlan {
    pub fn resolve(params: &CompressionParameters, config: &FilterConfig) -> Result<Self> {
        let geometry = Geometry::from_params(params)?;
        let decoder = if config.strict_ids {
            resolve_decoder_strict(params.decoder_id)?
        } else {
            resolve_decoder(params.decoder_id)
        };
        let fallback = (config.hw_decoder_fallback && decoder.is_hardware())
            .then(|| decoder.software_equivalent());

        Ok(Self {
            decoder,
            fallback,
            geometry,
            codec_format: decoder_format(decoder, geometry.bit_mode),
            scale_filter: config.scale_filter,
        })
    }

    /// Same plan targeting another decoder, e.g. the software fallback.
    pub fn with_decoder(&self, decoder: Decoder) -> Self {
        Self {
            decoder,
            fallback: None,
            codec_format: decoder_format(decoder, self.geometry.bit_mode),
            ..self.clone()
        }
    }
}
