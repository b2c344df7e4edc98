//! Error types for the pendant driver
//!
//! Every fallible library operation returns [`Result<T>`]. Configuration
//! loading and the binary use `anyhow` on top of this.

/// Errors produced by the codec-facing transport, the resolver and the
/// connection orchestrator.
///
/// Malformed input frames are not represented here: `decode` returns `None`
/// for them and the read loop drops the packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PendantError {
    /// The native HID layer failed to open, read or write.
    #[error("transport error: {0}")]
    Transport(String),

    /// A write was attempted while the connection is not open.
    #[error("not connected")]
    NotConnected,

    /// An operation was attempted from a lifecycle state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// No pendant matching the configured vendor/product id is attached.
    #[error("pendant not found (VID: 0x{vendor_id:04X}, PID: 0x{product_id:04X})")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The read worker did not acknowledge start-up or shutdown in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

impl PendantError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        PendantError::Transport(err.to_string())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, PendantError>;
