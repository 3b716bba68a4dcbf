//! Device-level error types

use thiserror::Error;

/// Terminal device conditions, propagated to the host as the disconnect cause
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device disconnected")]
    Disconnected,

    #[error("Device error: {0}")]
    Fault(String),
}
