//! # TakLink Core
//!
//! Shared types for the TakLink client stack: connection protocols and
//! configuration, the connection state machine, and the error taxonomy with
//! stable numeric codes for the FFI boundary.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConnectionConfig, Timeouts, WebSocketOptions};
pub use error::{
    ConnectError, LookupError, Result, StateError, TakLinkError, TimeoutError,
};
pub use types::{ConnectionState, Protocol};
