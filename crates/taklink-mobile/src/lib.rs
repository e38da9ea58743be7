//! # TakLink Mobile FFI Bridge
//!
//! Cross-platform C-callable interface for iOS and Android integration.
//! Exposes the connection registry as opaque `u64` handles with
//! callback-based delivery of inbound CoT messages.
//!
//! ## Architecture
//!
//! - Static library (.a) for iOS (linked into Swift/Objective-C)
//! - Dynamic library (.so) for Android (loaded via JNI)
//! - A private tokio runtime drives all connections; FFI entry points block
//!   on it, so they must not be called from inside the CoT callback
//! - Panics never unwind across the boundary

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tracing::{error, warn};

use taklink_client::{ConnectionRegistry, CotObserver};
use taklink_core::{ConnectionConfig, Protocol};

mod callbacks;
mod error;

pub use callbacks::CotCallback;
pub use error::*;

use callbacks::{invoke_callback_shielded, to_c_string, CallbackInfo};

/// Global library state
struct TakLinkMobile {
    runtime: Runtime,
    registry: Arc<ConnectionRegistry>,
}

lazy_static! {
    static ref GLOBAL: Mutex<Option<TakLinkMobile>> = Mutex::new(None);
}

/// Grab the runtime handle and registry without holding the global lock
/// across any network operation.
fn with_runtime() -> Option<(Handle, Arc<ConnectionRegistry>)> {
    let global = GLOBAL.lock();
    global
        .as_ref()
        .map(|lib| (lib.runtime.handle().clone(), Arc::clone(&lib.registry)))
}

/// Connection status structure filled by [`taklink_get_status`].
#[repr(C)]
pub struct TakLinkStatus {
    pub is_connected: c_int,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub last_error_code: c_int,
}

/// Initialize the TakLink mobile library.
///
/// Must be called before any other function. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Safety
/// Thread-safe, callable from any thread.
#[no_mangle]
pub extern "C" fn taklink_init() -> c_int {
    let mut global = GLOBAL.lock();
    if global.is_some() {
        return STATUS_OK; // already initialized
    }

    // best-effort; a subscriber installed by the host wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    match Runtime::new() {
        Ok(runtime) => {
            *global = Some(TakLinkMobile {
                runtime,
                registry: Arc::new(ConnectionRegistry::new()),
            });
            STATUS_OK
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize TakLink runtime");
            STATUS_RUNTIME_ERROR
        }
    }
}

/// Shut the library down: disconnects every connection, waits for their
/// background tasks, and releases the runtime. No callback fires after this
/// returns. Idempotent.
#[no_mangle]
pub extern "C" fn taklink_shutdown() {
    let taken = GLOBAL.lock().take();
    if let Some(lib) = taken {
        lib.runtime.block_on(lib.registry.shutdown_all());
        // runtime dropped here, after every read task has stopped
    }
}

/// Connect to a TAK server.
///
/// # Parameters
/// - `host`: null-terminated hostname or IP
/// - `port`: server port
/// - `protocol`: 0=TCP, 1=UDP, 2=TLS, 3=WebSocket
/// - `use_tls`: layer TLS over the selected protocol (1=yes, 0=no)
/// - `cert_pem`/`key_pem`/`ca_pem`: optional PEM blobs (null for none)
///
/// # Returns
/// Connection id on success, 0 on failure.
///
/// # Safety
/// All string pointers must be valid null-terminated C strings or null, and
/// remain valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn taklink_connect(
    host: *const c_char,
    port: u16,
    protocol: c_int,
    use_tls: c_int,
    cert_pem: *const c_char,
    key_pem: *const c_char,
    ca_pem: *const c_char,
) -> u64 {
    if host.is_null() {
        error!("taklink_connect: host is null");
        return 0;
    }

    let host = match CStr::from_ptr(host).to_str() {
        Ok(s) => s.to_string(),
        Err(e) => {
            error!(error = %e, "taklink_connect: invalid host string");
            return 0;
        }
    };

    let protocol = match Protocol::from_code(protocol) {
        Some(p) => p,
        None => {
            error!(protocol, "taklink_connect: invalid protocol");
            return 0;
        }
    };

    let cert = opt_string(cert_pem);
    let key = opt_string(key_pem);
    let ca = opt_string(ca_pem);

    let Some((handle, registry)) = with_runtime() else {
        error!("taklink_connect: library not initialized");
        return 0;
    };

    let mut config = ConnectionConfig::new(host, port, protocol);
    if use_tls != 0 || protocol == Protocol::Tls {
        config = config.with_tls(cert, key, ca);
    }

    match handle.block_on(registry.connect(config)) {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "taklink_connect: failed");
            0
        }
    }
}

/// Disconnect from a TAK server.
///
/// # Returns
/// 0 on success, negative status code on error.
#[no_mangle]
pub extern "C" fn taklink_disconnect(connection_id: u64) -> c_int {
    let Some((handle, registry)) = with_runtime() else {
        return STATUS_NOT_INITIALIZED;
    };

    match handle.block_on(registry.disconnect(connection_id)) {
        Ok(()) => STATUS_OK,
        Err(e) => {
            warn!(connection_id, error = %e, "taklink_disconnect: failed");
            status_code(&e)
        }
    }
}

/// Send a CoT XML message on a connection.
///
/// # Returns
/// 0 on success, negative status code on error.
///
/// # Safety
/// `cot_xml` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn taklink_send_cot(connection_id: u64, cot_xml: *const c_char) -> c_int {
    if cot_xml.is_null() {
        error!("taklink_send_cot: cot_xml is null");
        return STATUS_INVALID_PARAMETER;
    }

    let xml = match CStr::from_ptr(cot_xml).to_str() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "taklink_send_cot: invalid XML string");
            return STATUS_INVALID_PARAMETER;
        }
    };

    let Some((handle, registry)) = with_runtime() else {
        return STATUS_NOT_INITIALIZED;
    };

    match handle.block_on(registry.send(connection_id, xml)) {
        Ok(()) => STATUS_OK,
        Err(e) => {
            warn!(connection_id, error = %e, "taklink_send_cot: failed");
            status_code(&e)
        }
    }
}

/// Register a callback for inbound CoT messages on a connection, replacing
/// any previous one.
///
/// # Returns
/// 0 on success, negative status code on error.
///
/// # Safety
/// - `callback` must be a valid function pointer
/// - `user_data` must remain valid until the callback is unregistered
/// - The callback is invoked from a background thread; it must not call
///   back into taklink_* functions
#[no_mangle]
pub unsafe extern "C" fn taklink_register_callback(
    connection_id: u64,
    callback: CotCallback,
    user_data: *mut c_void,
) -> c_int {
    let Some((_, registry)) = with_runtime() else {
        return STATUS_NOT_INITIALIZED;
    };

    let info = CallbackInfo {
        callback,
        user_data,
    };

    let observer: CotObserver = Box::new(move |conn_id, _event, xml| {
        // Force the closure to capture `info` as a whole (it is `Send + Sync`)
        // rather than its individual raw-pointer field (which is not).
        let info = &info;
        if let Some(c_xml) = to_c_string(xml) {
            let ptr = c_xml.as_ptr();
            invoke_callback_shielded(|| (info.callback)(info.user_data, conn_id, ptr));
            // c_xml stays alive past the call; the string is only valid for
            // its duration
        }
    });

    match registry.register_callback(connection_id, observer) {
        Ok(()) => STATUS_OK,
        Err(e) => status_code(&e),
    }
}

/// Unregister the CoT callback of a connection. Once this returns, the old
/// callback is never invoked again.
///
/// # Returns
/// 0 on success, negative status code on error.
#[no_mangle]
pub extern "C" fn taklink_unregister_callback(connection_id: u64) -> c_int {
    let Some((_, registry)) = with_runtime() else {
        return STATUS_NOT_INITIALIZED;
    };

    match registry.unregister_callback(connection_id) {
        Ok(()) => STATUS_OK,
        Err(e) => status_code(&e),
    }
}

/// Get connection status.
///
/// # Returns
/// 0 on success with `status_out` filled, negative status code on error.
///
/// # Safety
/// `status_out` must be a valid pointer to a TakLinkStatus.
#[no_mangle]
pub unsafe extern "C" fn taklink_get_status(
    connection_id: u64,
    status_out: *mut TakLinkStatus,
) -> c_int {
    if status_out.is_null() {
        return STATUS_INVALID_PARAMETER;
    }

    let Some((_, registry)) = with_runtime() else {
        return STATUS_NOT_INITIALIZED;
    };

    match registry.status(connection_id) {
        Ok(snapshot) => {
            *status_out = TakLinkStatus {
                is_connected: if snapshot.is_connected { 1 } else { 0 },
                messages_sent: snapshot.messages_sent,
                messages_received: snapshot.messages_received,
                last_error_code: snapshot.last_error_code,
            };
            STATUS_OK
        }
        Err(e) => status_code(&e),
    }
}

/// Get the library version.
///
/// Returns a null-terminated, statically allocated string; never fails and
/// must not be freed.
#[no_mangle]
pub extern "C" fn taklink_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

/// Copy an optional C string parameter.
unsafe fn opt_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_str().unwrap_or("").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(taklink_version()) };
        assert!(version.to_str().unwrap().starts_with("0."));
    }

    #[test]
    fn test_null_pointer_arguments_rejected() {
        // null checks run before the global state is consulted
        let id = unsafe {
            taklink_connect(
                std::ptr::null(),
                8087,
                0,
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        assert_eq!(id, 0);

        assert_eq!(
            unsafe { taklink_get_status(1, std::ptr::null_mut()) },
            STATUS_INVALID_PARAMETER
        );
    }

    #[test]
    fn test_lifecycle() {
        assert_eq!(taklink_init(), STATUS_OK);
        // idempotent
        assert_eq!(taklink_init(), STATUS_OK);

        // a connection refused locally surfaces as the invalid id
        let host = CString::new("127.0.0.1").unwrap();
        let id = unsafe {
            taklink_connect(
                host.as_ptr(),
                1,
                0,
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
            )
        };
        assert_eq!(id, 0);

        // unknown ids are reported, not crashed on
        assert_eq!(taklink_disconnect(9999), STATUS_UNKNOWN_CONNECTION);
        assert_eq!(taklink_unregister_callback(9999), STATUS_UNKNOWN_CONNECTION);

        let xml = CString::new("<event/>").unwrap();
        assert_eq!(
            unsafe { taklink_send_cot(9999, xml.as_ptr()) },
            STATUS_UNKNOWN_CONNECTION
        );

        taklink_shutdown();
        // idempotent
        taklink_shutdown();
    }
}
