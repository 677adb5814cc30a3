//! Host runtime for the BLE launch controller.
//!
//! [`launch_core`] decides what may be sent; this crate wires it into
//! async tasks:
//!
//! - [`link`]: messages between tasks and the channel-backed [`Transport`](launch_core::Transport)
//! - [`session`]: the actor that owns the controller ([`Session`])
//! - [`sim`]: a software launcher and radio for demos and tests

pub mod link;
pub mod session;
pub mod sim;

pub use launch_core::{ControllerConfig, LaunchEvent, LaunchState, ValidationCode};
pub use link::{ChannelTransport, Intent, Intents, LinkEvent, LinkEvents, RadioCommand, Uplink};
pub use session::{EventFeed, Session, SessionPorts, StateSignal};
pub use sim::{SimulatedLauncher, SimulatedRadio};

// Test binaries don't otherwise link the executor, which provides the
// timer-queue symbol embassy-time's std driver needs.
#[cfg(test)]
use embassy_executor as _;
