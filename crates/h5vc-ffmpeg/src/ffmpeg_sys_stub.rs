//! Without FFmpeg there is no codec library to configure.

use h5vc_core::config::CodecLogLevel;

pub fn set_codec_log_level(_level: CodecLogLevel) {}
