//! HDF5 filter plugin ABI (`H5Zpublic.h` / `H5PLextern.h`).

use std::ffi::{c_char, c_int, c_uint, c_void};

/// `H5Z_CLASS_T_VERS`.
pub const H5Z_CLASS_T_VERS: c_int = 1;
/// `H5PL_TYPE_FILTER`.
pub const H5PL_TYPE_FILTER: c_int = 0;
/// Registered filter id.
pub const H5VC_FILTER_ID: c_int = 32030;

/// `H5Z_func_t`.
pub type H5ZFunc = unsafe extern "C" fn(
    flags: c_uint,
    cd_nelmts: usize,
    cd_values: *const c_uint,
    nbytes: usize,
    buf_size: *mut usize,
    buf: *mut *mut c_void,
) -> usize;

/// `H5Z_class2_t`.
#[repr(C)]
pub struct H5ZClass2 {
    pub version: c_int,
    pub id: c_int,
    pub encoder_present: c_uint,
    pub decoder_present: c_uint,
    pub name: *const c_char,
    pub can_apply: *const c_void,
    pub set_local: *const c_void,
    pub filter: Option<H5ZFunc>,
}

// SAFETY: the record is immutable and only points at static data.
unsafe impl Sync for H5ZClass2 {}
