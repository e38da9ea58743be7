//! Status codes returned across the C boundary.

use std::os::raw::c_int;
use taklink_core::TakLinkError;

pub const STATUS_OK: c_int = 0;
pub const STATUS_NOT_INITIALIZED: c_int = -1;
pub const STATUS_UNKNOWN_CONNECTION: c_int = -2;
pub const STATUS_INVALID_PARAMETER: c_int = -3;
pub const STATUS_CONNECTION_ERROR: c_int = -4;
pub const STATUS_IO_ERROR: c_int = -5;
pub const STATUS_CODEC_ERROR: c_int = -6;
pub const STATUS_TIMEOUT: c_int = -7;
pub const STATUS_STATE_ERROR: c_int = -8;
pub const STATUS_RUNTIME_ERROR: c_int = -9;

/// Map a core error to its C status code.
pub fn status_code(error: &TakLinkError) -> c_int {
    error.code()
}
