//! Transport trait and error types.

use launch_proto::EncodeError;

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No peripheral connected or write characteristic not discovered yet.
    NotReady,
    /// Write failed at the BLE layer.
    Io,
    /// Outgoing queue is full.
    Busy,
    /// Frame would not fit the encoder's buffer.
    FrameTooLong,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotReady => write!(f, "transport not ready"),
            Self::Io => write!(f, "transport I/O error"),
            Self::Busy => write!(f, "transport busy"),
            Self::FrameTooLong => write!(f, "frame too long"),
        }
    }
}

impl From<EncodeError> for TransportError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::FrameTooLong => TransportError::FrameTooLong,
        }
    }
}

/// Byte pipe to the launcher, typically a BLE serial characteristic.
///
/// Implementations own retry and backpressure. `send` must not block:
/// the controller treats every send as fire-and-forget and only looks at
/// the immediate result.
pub trait Transport {
    /// Queue `bytes` for transmission.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Connected with the write channel established.
    fn is_ready(&self) -> bool;

    /// Ask the radio for a fresh signal strength reading.
    ///
    /// The reading comes back later through
    /// [`LaunchController::on_rssi_read`](crate::LaunchController::on_rssi_read).
    fn request_rssi_read(&mut self);
}
