//! Runtime knobs that are not part of the 11-word parameter vector.
//!
//! Layered as defaults → JSON file (deserialized by the caller) → `H5VC_*`
//! environment ([`FilterConfig::overlay_env`]).

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

pub const ENV_STRICT_IDS: &str = "H5VC_STRICT_IDS";
pub const ENV_HW_FALLBACK: &str = "H5VC_HW_FALLBACK";
pub const ENV_SCALE_FILTER: &str = "H5VC_SCALE_FILTER";
pub const ENV_FFMPEG_LOG: &str = "H5VC_FFMPEG_LOG";

/// Scaling kernel used by the colorspace conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleFilter {
    #[default]
    Bilinear,
    Bicubic,
    Point,
    Area,
}

impl ScaleFilter {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bilinear" => Ok(Self::Bilinear),
            "bicubic" => Ok(Self::Bicubic),
            "point" | "neighbor" => Ok(Self::Point),
            "area" => Ok(Self::Area),
            other => Err(FilterError::UnknownName {
                kind: "scale filter",
                name: other.to_string(),
            }),
        }
    }
}

/// Verbosity of the codec library's own logger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecLogLevel {
    Quiet,
    #[default]
    Error,
    Warning,
    Info,
}

impl CodecLogLevel {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(FilterError::UnknownName {
                kind: "codec log level",
                name: other.to_string(),
            }),
        }
    }
}

/// Filter-wide configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fail on unknown encoder/decoder/preset/tune ids instead of falling
    /// back to defaults.
    pub strict_ids: bool,
    /// Swap an unavailable hardware decoder for its software equivalent.
    pub hw_decoder_fallback: bool,
    /// Kernel for the gray ↔ codec-format conversion.
    pub scale_filter: ScaleFilter,
    /// Codec library log verbosity.
    pub codec_log_level: CodecLogLevel,
    /// Nominal frame rate written into the stream (planes have no timing).
    pub frame_rate: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            strict_ids: false,
            hw_decoder_fallback: true,
            scale_filter: ScaleFilter::Bilinear,
            codec_log_level: CodecLogLevel::Error,
            frame_rate: 25,
        }
    }
}

impl FilterConfig {
    /// Defaults overlaid with `H5VC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().overlay_lookup(lookup)
    }

    /// `self` (e.g. loaded from a config file) overlaid with the environment.
    pub fn overlay_env(self) -> Result<Self> {
        self.overlay_lookup(|name| std::env::var(name).ok())
    }

    pub fn overlay_lookup<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = self;
        if let Some(v) = lookup(ENV_STRICT_IDS) {
            cfg.strict_ids = parse_bool(ENV_STRICT_IDS, &v)?;
        }
        if let Some(v) = lookup(ENV_HW_FALLBACK) {
            cfg.hw_decoder_fallback = parse_bool(ENV_HW_FALLBACK, &v)?;
        }
        if let Some(v) = lookup(ENV_SCALE_FILTER) {
            cfg.scale_filter = ScaleFilter::parse(&v)?;
        }
        if let Some(v) = lookup(ENV_FFMPEG_LOG) {
            cfg.codec_log_level = CodecLogLevel::parse(&v)?;
        }
        Ok(cfg)
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(FilterError::InvalidParameters(format!(
            "{var} must be a boolean, got '{other}'"
        ))),
    }
}
