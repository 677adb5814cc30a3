//! Serial-over-BLE protocol spoken by the launch controller.
//!
//! This crate provides everything needed to talk to the launcher over a
//! transparent byte stream such as an HM-10 BLE serial module:
//!
//! - **Vocabulary**: [`Command`] tokens in either [`Dialect`]
//! - **Parsing**: [`FrameParser`] reassembles frames from arbitrarily chunked input
//! - **Codec**: [`encode()`] builds outgoing frames, [`decode()`] splits frame bodies
//!
//! # Protocol Format
//!
//! ```text
//! FRAME      := ':' NAME ('|' VALUE)? ':'
//! ```
//!
//! The terminator (`:`) both opens and closes a frame and doubles as the
//! delimiter when frames arrive concatenated. The separator (`|`) only
//! appears inside a frame body, between the name and its value.
//!
//! # Example
//!
//! ```
//! use launch_proto::{decode, Command, Dialect, FrameParser};
//!
//! let mut parser = FrameParser::new();
//!
//! // A response split over two BLE packets
//! assert_eq!(parser.feed(":CTY_OK::LV_BAT").count(), 0);
//! for body in parser.feed("_LEV|3.31:") {
//!     let decoded = decode(body);
//!     match decoded.command(Dialect::Standard) {
//!         Some(Command::ContinuityOk) => {}
//!         Some(Command::LowVoltage) => assert_eq!(decoded.value, Some("3.31")),
//!         other => panic!("unexpected {:?}", other),
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
pub mod parser;
pub mod wire;

pub use codec::{
    decode, encode, encode_command, encode_into, DecodedCommand, EncodeError, Frame,
    MAX_FRAME_LEN,
};
pub use parser::{FrameParser, Frames, MAX_BUFFER_LEN};
pub use wire::{
    Command, Dialect, DEFAULT_VALIDATION_CODE, LINE_ENDINGS, MAX_CODE_LEN, SEPARATOR,
    TERMINATOR,
};
