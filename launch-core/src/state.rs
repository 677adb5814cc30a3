//! Observable launcher state.

use heapless::String;

/// Longest device identifier or firmware version kept.
pub const MAX_TEXT_LEN: usize = 32;

/// Short text reported by the device (identifier, firmware version).
pub type DeviceText = String<MAX_TEXT_LEN>;

/// Everything the UI needs to render the launcher.
///
/// Only [`LaunchController`](crate::LaunchController) mutates this; everyone
/// else gets a shared reference or a clone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchState {
    /// Transport is up and the write channel is established.
    pub connected: bool,
    /// Device proved it holds our validation code during this connection.
    pub validated: bool,
    /// Local intent permitting FIRE_ON. Never set without `validated`.
    pub armed: bool,
    /// Igniter circuit is closed, as last reported by the device.
    pub continuity: bool,
    pub device_id: Option<DeviceText>,
    pub device_version: Option<DeviceText>,
    /// Logic battery voltage in volts.
    pub low_voltage: f32,
    /// Igniter battery voltage in volts.
    pub high_voltage: f32,
    /// Signal strength in dBm, zero while disconnected.
    pub rssi: f32,
}

impl LaunchState {
    /// Fresh state for a new session: everything off, nothing known.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a FIRE_ON may be transmitted right now.
    #[inline]
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.validated && self.armed
    }
}

/// Copy as much of `text` as fits into a bounded string.
pub(crate) fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
