//! The `H5Z_func_t` callback.
//!
//! HDF5 hands over a heap buffer holding `nbytes` of input. On success the
//! buffer is replaced by a `malloc`ed result and the old one is freed; on
//! failure the callback returns 0 and leaves the buffer alone.

use std::ffi::{c_uint, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;
use std::sync::OnceLock;

use h5vc_core::codec_traits::CodecBackend;
use h5vc_core::config::FilterConfig;
use h5vc_core::error::{FilterError, Result};
use h5vc_core::params::{CompressionParameters, Direction, PARAM_COUNT};
use h5vc_ffmpeg::FfmpegBackend;

use crate::init_logging;

fn config() -> &'static FilterConfig {
    static CONFIG: OnceLock<FilterConfig> = OnceLock::new();
    CONFIG.get_or_init(|| {
        FilterConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid h5vc environment, using defaults");
            FilterConfig::default()
        })
    })
}

/// Run one chunk through `backend` for the given filter flags.
pub fn apply<B: CodecBackend>(
    backend: &B,
    flags: u32,
    cd_values: &[u32],
    input: &[u8],
    config: &FilterConfig,
) -> Result<Vec<u8>> {
    if cd_values.len() != PARAM_COUNT {
        return Err(FilterError::InvalidParameters(format!(
            "expected {PARAM_COUNT} client data values, got {}",
            cd_values.len()
        )));
    }
    let params = CompressionParameters::from_words(cd_values)?;
    let direction = Direction::from_filter_flags(flags);
    h5vc_core::transform_with(backend, direction, &params, input, config)
}

/// Copy `data` into a fresh `malloc` block.
fn to_c_heap(data: &[u8]) -> Result<*mut c_void> {
    // SAFETY: malloc of at least one byte; checked for null below.
    let block = unsafe { libc::malloc(data.len().max(1)) };
    if block.is_null() {
        return Err(FilterError::OutOfMemory {
            requested: data.len(),
        });
    }
    // SAFETY: block holds at least data.len() bytes and does not overlap.
    unsafe { ptr::copy_nonoverlapping(data.as_ptr(), block.cast::<u8>(), data.len()) };
    Ok(block)
}

/// # Safety
/// Called by HDF5 with `cd_values` holding `cd_nelmts` entries and `*buf`
/// a `malloc`ed block holding at least `nbytes` bytes.
pub unsafe extern "C" fn h5vc_filter(
    flags: c_uint,
    cd_nelmts: usize,
    cd_values: *const c_uint,
    nbytes: usize,
    buf_size: *mut usize,
    buf: *mut *mut c_void,
) -> usize {
    init_logging();
    if buf.is_null() || buf_size.is_null() || (cd_nelmts > 0 && cd_values.is_null()) {
        tracing::error!("h5vc filter called with null arguments");
        return 0;
    }

    // SAFETY: pointers checked above; HDF5 guarantees the lengths.
    let (cd, input) = unsafe {
        let cd = if cd_nelmts == 0 {
            &[][..]
        } else {
            std::slice::from_raw_parts(cd_values, cd_nelmts)
        };
        let input = if nbytes == 0 || (*buf).is_null() {
            &[][..]
        } else {
            std::slice::from_raw_parts((*buf).cast::<u8>(), nbytes)
        };
        (cd, input)
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let config = config();
        let backend = FfmpegBackend::new(config.clone());
        apply(&backend, flags, cd, input, config)
    }));

    let output = match outcome {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::error!(code = e.error_code(), error = %e, flags, "h5vc filter failed");
            return 0;
        }
        Err(_) => {
            tracing::error!(flags, "h5vc filter panicked");
            return 0;
        }
    };

    let block = match to_c_heap(&output) {
        Ok(block) => block,
        Err(e) => {
            tracing::error!(error = %e, "h5vc filter could not allocate output");
            return 0;
        }
    };
    // SAFETY: the old block came from HDF5's allocator (malloc) and is no
    // longer referenced once replaced.
    unsafe {
        libc::free(*buf);
        *buf = block;
        *buf_size = output.len();
    }
    output.len()
}
