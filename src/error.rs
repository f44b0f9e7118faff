//! # Error Types
//!
//! This module defines the error type used throughout the kotprint library.
//!
//! Errors fall into three groups:
//!
//! | Group | Variants | Caller action |
//! |-------|----------|---------------|
//! | Radio | `PermissionDenied`, `BluetoothOff` | Ask the user to fix OS settings |
//! | Link | `DeviceNotFound`, `ServiceNotFound`, `CharacteristicNotFound`, `WriteFailed`, `ConnectionLost`, `Busy` | Reconnect or cancel |
//! | Content | `EncodingOverflow`, `InvalidDocument`, `InvalidOrder` | Fix the order data |
//!
//! A `WriteFailed` means the printer already received part of the stream, so
//! the physical ticket is torn. It is fatal for that job.

use thiserror::Error;

/// Main error type for kotprint operations
#[derive(Debug, Error)]
pub enum PrintError {
    /// The OS refused Bluetooth access
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// The adapter exists but is powered off
    #[error("Bluetooth is turned off")]
    BluetoothOff,

    /// No peripheral with this id is known to the adapter
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// None of the known printer services was discovered
    #[error("No supported printer service on {0}")]
    ServiceNotFound(String),

    /// The printer service has no known write characteristic
    #[error("No supported write characteristic on {0}")]
    CharacteristicNotFound(String),

    /// A frame write was rejected or not acknowledged
    #[error("Write failed at frame {frame}/{total}: {reason}")]
    WriteFailed {
        frame: usize,
        total: usize,
        reason: String,
    },

    /// The link dropped and could not be restored automatically
    #[error("Printer connection lost")]
    ConnectionLost,

    /// Another job currently owns the link
    #[error("Printer is busy with another job")]
    Busy,

    /// QR payload does not fit the single-byte length prefix
    #[error("QR payload too long: {len} bytes (max {max})")]
    EncodingOverflow { len: usize, max: usize },

    /// Document violates a model invariant
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Order snapshot could not be turned into a document
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Backend-specific adapter failure
    #[error("Bluetooth adapter error: {0}")]
    Adapter(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrintError {
    /// Whether reconnecting to the printer is a sensible next step.
    ///
    /// The UI layer uses this to choose between "reconnect" and "cancel".
    pub fn is_reconnectable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLost
                | Self::WriteFailed { .. }
                | Self::DeviceNotFound(_)
                | Self::Adapter(_)
        )
    }
}

/// Result type for kotprint operations
pub type Result<T> = std::result::Result<T, PrintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnectable() {
        assert!(PrintError::ConnectionLost.is_reconnectable());
        assert!(
            PrintError::WriteFailed {
                frame: 2,
                total: 3,
                reason: "timeout".into()
            }
            .is_reconnectable()
        );
        assert!(!PrintError::EncodingOverflow { len: 300, max: 252 }.is_reconnectable());
        assert!(!PrintError::PermissionDenied.is_reconnectable());
    }

    #[test]
    fn test_display() {
        let err = PrintError::EncodingOverflow { len: 260, max: 252 };
        assert_eq!(err.to_string(), "QR payload too long: 260 bytes (max 252)");
    }
}
