//! The 11-word parameter vector and transform direction.
//!
//! The word order is a compatibility contract with the storage engine and
//! with framed blobs written by older builds; never reorder or resize it
//! without bumping [`crate::header::HEADER_VERSION`].

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Number of `u32` words in the parameter vector.
pub const PARAM_COUNT: usize = 11;

/// Flag bit set by the storage engine when a chunk is being read back.
pub const FLAG_REVERSE: u32 = 0x0100;

/// Which way a transform call runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Compress,
    Decompress,
}

impl Direction {
    /// Direction encoded in storage-engine filter flags.
    pub fn from_filter_flags(flags: u32) -> Self {
        if flags & FLAG_REVERSE != 0 {
            Self::Decompress
        } else {
            Self::Compress
        }
    }
}

/// Sample depth of the source planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitMode {
    Eight,
    Ten,
    Twelve,
}

impl BitMode {
    pub fn from_word(word: u32) -> Result<Self> {
        match word {
            0 => Ok(Self::Eight),
            1 => Ok(Self::Ten),
            2 => Ok(Self::Twelve),
            other => Err(FilterError::InvalidParameters(format!(
                "bit_mode must be 0, 1 or 2, got {other}"
            ))),
        }
    }

    /// Bit depth as a number (8, 10, 12), used by the CLI.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(Self::Eight),
            10 => Ok(Self::Ten),
            12 => Ok(Self::Twelve),
            other => Err(FilterError::InvalidParameters(format!(
                "bit depth must be 8, 10 or 12, got {other}"
            ))),
        }
    }

    pub fn word(self) -> u32 {
        match self {
            Self::Eight => 0,
            Self::Ten => 1,
            Self::Twelve => 2,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Eight => 8,
            Self::Ten => 10,
            Self::Twelve => 12,
        }
    }

    /// Bytes per stored sample; 10/12-bit samples live in 16-bit containers.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Eight => 1,
            Self::Ten | Self::Twelve => 2,
        }
    }
}

/// Parameters that fully determine one codec session.
///
/// Field order matches the wire order of the parameter vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionParameters {
    /// Encoder table id (see [`crate::codec_table::Encoder`]).
    pub encoder_id: u32,
    /// Decoder table id (see [`crate::codec_table::Decoder`]).
    pub decoder_id: u32,
    /// Plane width in pixels.
    pub width: u32,
    /// Plane height in pixels.
    pub height: u32,
    /// Number of planes in the chunk.
    pub depth: u32,
    /// 0 = 8-bit, 1 = 10-bit, 2 = 12-bit.
    pub bit_mode: u32,
    /// Family-scoped preset id, 0 for the codec default.
    pub preset_id: u32,
    /// Family-scoped tune id, 0 for the codec default.
    pub tune_id: u32,
    /// Constant rate factor / quantizer; out-of-range values leave the
    /// codec's own rate control in place.
    pub crf: u32,
    /// SVT-AV1 film grain synthesis level.
    pub film_grain: u32,
    /// GPU ordinal for hardware encoders.
    pub gpu_id: u32,
}

impl CompressionParameters {
    /// Read the parameter vector as handed over by the storage engine.
    pub fn from_words(words: &[u32]) -> Result<Self> {
        let words: [u32; PARAM_COUNT] = words.try_into().map_err(|_| {
            FilterError::InvalidParameters(format!(
                "expected {PARAM_COUNT} parameter words, got {}",
                words.len()
            ))
        })?;
        Ok(Self::from_array(words))
    }

    pub fn from_array(words: [u32; PARAM_COUNT]) -> Self {
        let [
            encoder_id,
            decoder_id,
            width,
            height,
            depth,
            bit_mode,
            preset_id,
            tune_id,
            crf,
            film_grain,
            gpu_id,
        ] = words;
        Self {
            encoder_id,
            decoder_id,
            width,
            height,
            depth,
            bit_mode,
            preset_id,
            tune_id,
            crf,
            film_grain,
            gpu_id,
        }
    }

    pub fn to_words(&self) -> [u32; PARAM_COUNT] {
        [
            self.encoder_id,
            self.decoder_id,
            self.width,
            self.height,
            self.depth,
            self.bit_mode,
            self.preset_id,
            self.tune_id,
            self.crf,
            self.film_grain,
            self.gpu_id,
        ]
    }

    /// Reject geometry the drivers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(FilterError::InvalidParameters(format!(
                "width, height and depth must be non-zero, got {}x{}x{}",
                self.width, self.height, self.depth
            )));
        }
        BitMode::from_word(self.bit_mode)?;
        self.raw_size()?;
        Ok(())
    }

    pub fn bit_mode(&self) -> Result<BitMode> {
        BitMode::from_word(self.bit_mode)
    }

    /// Bytes in one plane.
    pub fn frame_size(&self) -> Result<usize> {
        let bpp = self.bit_mode()?.bytes_per_pixel();
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(bpp))
            .ok_or_else(|| {
                FilterError::InvalidParameters(format!(
                    "plane {}x{} overflows the address space",
                    self.width, self.height
                ))
            })
    }

    /// Bytes in the whole uncompressed chunk.
    pub fn raw_size(&self) -> Result<usize> {
        self.frame_size()?
            .checked_mul(self.depth as usize)
            .ok_or_else(|| {
                FilterError::InvalidParameters(format!(
                    "chunk of depth {} overflows the address space",
                    self.depth
                ))
            })
    }
}

impl Default for CompressionParameters {
    /// x264 with codec defaults and an empty geometry; callers fill in the
    /// dimensions.
    fn default() -> Self {
        Self {
            encoder_id: 2,
            decoder_id: 1,
            width: 0,
            height: 0,
            depth: 0,
            bit_mode: 0,
            preset_id: 0,
            tune_id: 0,
            crf: 23,
            film_grain: 0,
            gpu_id: 0,
        }
    }
}
