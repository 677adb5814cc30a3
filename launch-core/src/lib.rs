//! Platform-agnostic launch controller: state machine, collaborator traits,
//! and telemetry polling.
//!
//! This crate holds all decisions about what may be sent to the launcher
//! and when, without touching any radio or clock. It can be used both in
//! embedded `no_std` environments and on host for testing.
//!
//! # Overview
//!
//! - [`controller`]: The safety-gated state machine ([`LaunchController`])
//! - [`state`]: Observable state ([`LaunchState`])
//! - [`transport`]: Byte pipe to the device ([`Transport`])
//! - [`settings`]: Validation code persistence ([`SettingsStore`], [`ValidationCode`])
//! - [`scheduler`]: RSSI and battery polling ([`TelemetryScheduler`])
//! - [`history`]: Diagnostic frame log ([`CommandHistory`])
//!
//! # Safety Gates
//!
//! | Intent | Requires |
//! |--------|----------|
//! | arm | validated |
//! | disarm | nothing |
//! | fire on | validated and armed |
//! | fire off | validated |
//! | continuity test | validated |
//! | change validation code | validated |
//! | ping, voltage check, arm buzzer | nothing |
//!
//! Disconnecting or a `REQ_VALID` from the device drops validation and
//! arming at once.
//!
//! # Example
//!
//! ```rust
//! use embassy_time::Instant;
//! use launch_core::{
//!     ControllerConfig, Dispatch, LaunchController, LaunchEvent, MemorySettings, Transport,
//!     TransportError,
//! };
//!
//! struct Null;
//!
//! impl Transport for Null {
//!     fn send(&mut self, _bytes: &[u8]) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//!     fn is_ready(&self) -> bool {
//!         true
//!     }
//!     fn request_rssi_read(&mut self) {}
//! }
//!
//! let mut controller =
//!     LaunchController::new(Null, MemorySettings::new(), ControllerConfig::default());
//! controller.on_connected(Instant::from_secs(0));
//!
//! // Not trusted yet
//! assert_eq!(controller.set_armed(true), Ok(Dispatch::Suppressed));
//!
//! let mut events = Vec::new();
//! controller.on_bytes_received(b":VALIDATE|0000:", |e| events.push(e));
//! assert_eq!(events, [LaunchEvent::Validated]);
//! assert_eq!(controller.set_armed(true), Ok(Dispatch::Sent));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod controller;
pub mod history;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod transport;

// Re-export main types at crate root
pub use controller::{ControllerConfig, Dispatch, LaunchController, LaunchEvent};
pub use history::{CommandHistory, Direction, HistoryEntry, HISTORY_CAPACITY};
pub use scheduler::{PollDue, TelemetryScheduler, RSSI_INTERVAL, VOLTAGE_INTERVAL};
pub use settings::{CodeError, MemorySettings, SettingsError, SettingsStore, ValidationCode};
pub use state::{DeviceText, LaunchState, MAX_TEXT_LEN};
pub use transport::{Transport, TransportError};
