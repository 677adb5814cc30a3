//! Frame encoding and frame body decoding.
//!
//! # Example
//!
//! ```
//! use launch_proto::{decode, encode, Command, Dialect};
//!
//! let frame = encode(Command::Validate.name(Dialect::Standard), Some("1234")).unwrap();
//! assert_eq!(frame.as_str(), ":VALIDATE|1234:");
//!
//! let decoded = decode("VALIDATE|1234");
//! assert_eq!(decoded.command(Dialect::Standard), Some(Command::Validate));
//! assert_eq!(decoded.value, Some("1234"));
//! ```

use core::fmt::Write;

use heapless::String;

use crate::parser::MAX_BUFFER_LEN;
use crate::wire::{Command, Dialect, SEPARATOR, TERMINATOR};

/// Longest encoded frame, terminators included.
///
/// Matches the parser's buffer so anything this side can encode, the
/// other side's parser can also hold.
pub const MAX_FRAME_LEN: usize = MAX_BUFFER_LEN;

/// An encoded frame ready for transmission.
pub type Frame = String<MAX_FRAME_LEN>;

/// Error type for frame encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Name and value do not fit in [`MAX_FRAME_LEN`].
    FrameTooLong,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::FrameTooLong => write!(f, "frame exceeds {} bytes", MAX_FRAME_LEN),
        }
    }
}

/// Write `:<name>[|<value>]:` to any `core::fmt::Write` sink.
///
/// Neither `name` nor `value` may contain the terminator or separator;
/// that is the caller's contract and is not checked here.
pub fn encode_into<W: Write>(out: &mut W, name: &str, value: Option<&str>) -> core::fmt::Result {
    out.write_char(TERMINATOR)?;
    out.write_str(name)?;
    if let Some(value) = value {
        out.write_char(SEPARATOR)?;
        out.write_str(value)?;
    }
    out.write_char(TERMINATOR)
}

/// Encode a frame into a fixed-capacity [`Frame`].
///
/// # Errors
///
/// Returns [`EncodeError::FrameTooLong`] if the frame exceeds [`MAX_FRAME_LEN`].
pub fn encode(name: &str, value: Option<&str>) -> Result<Frame, EncodeError> {
    let mut frame = Frame::new();
    encode_into(&mut frame, name, value).map_err(|_| EncodeError::FrameTooLong)?;
    Ok(frame)
}

/// Encode a known command using the token table of `dialect`.
///
/// # Errors
///
/// Returns [`EncodeError::FrameTooLong`] if `value` is too long.
pub fn encode_command(
    command: Command,
    dialect: Dialect,
    value: Option<&str>,
) -> Result<Frame, EncodeError> {
    encode(command.name(dialect), value)
}

/// A frame body split into its name and optional value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedCommand<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
}

impl<'a> DecodedCommand<'a> {
    /// Resolve the name against a dialect's token table.
    #[must_use]
    pub fn command(&self, dialect: Dialect) -> Option<Command> {
        Command::from_name(self.name, dialect)
    }
}

/// Split a frame body into name and value.
///
/// Surrounding terminators are stripped first. Only the first separator
/// splits; anything after it, further separators included, is the value.
#[must_use]
pub fn decode(body: &str) -> DecodedCommand<'_> {
    let stripped = body.trim_matches(TERMINATOR);
    match stripped.split_once(SEPARATOR) {
        Some((name, value)) => DecodedCommand {
            name,
            value: Some(value),
        },
        None => DecodedCommand {
            name: stripped,
            value: None,
        },
    }
}
