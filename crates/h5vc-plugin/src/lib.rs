//! HDF5 dynamic filter plugin for h5vc.
//!
//! Put the built shared library on `HDF5_PLUGIN_PATH` and HDF5 will load it
//! for datasets using filter id 32030. The 11 client data values are the
//! compression parameters in wire order.

use std::ffi::{c_int, c_void};
use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// H5Z callback and the chunk-level filter it runs.
pub mod filter;
/// HDF5 plugin ABI declarations.
pub mod h5z;

use h5z::{H5PL_TYPE_FILTER, H5VC_FILTER_ID, H5Z_CLASS_T_VERS, H5ZClass2};

pub static H5VC_FILTER_CLASS: H5ZClass2 = H5ZClass2 {
    version: H5Z_CLASS_T_VERS,
    id: H5VC_FILTER_ID,
    encoder_present: 1,
    decoder_present: 1,
    name: c"ffmpeg".as_ptr(),
    can_apply: std::ptr::null(),
    set_local: std::ptr::null(),
    filter: Some(filter::h5vc_filter),
};

/// Install a stderr subscriber once, unless the host already has one.
pub(crate) fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "C" fn H5PLget_plugin_type() -> c_int {
    H5PL_TYPE_FILTER
}

#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "C" fn H5PLget_plugin_info() -> *const c_void {
    (&raw const H5VC_FILTER_CLASS).cast()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn plugin_info_describes_the_filter() {
        assert_eq!(H5PLget_plugin_type(), H5PL_TYPE_FILTER);
        let class = unsafe { &*H5PLget_plugin_info().cast::<H5ZClass2>() };
        assert_eq!(class.id, 32030);
        assert_eq!(class.version, 1);
        assert_eq!(class.encoder_present, 1);
        assert_eq!(class.decoder_present, 1);
        assert!(class.filter.is_some());
        let name = unsafe { CStr::from_ptr(class.name) };
        assert_eq!(name.to_str().unwrap(), "ffmpeg");
    }
}
