//! Validation code and the store it persists in.

use core::fmt;

use heapless::String;
use launch_proto::{DEFAULT_VALIDATION_CODE, MAX_CODE_LEN, SEPARATOR, TERMINATOR};

/// Why a string was rejected as a validation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodeError {
    Empty,
    TooLong,
    /// Contains a character that would break framing or is not printable ASCII.
    InvalidChar(char),
}

impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "validation code is empty"),
            Self::TooLong => write!(f, "validation code longer than {} chars", MAX_CODE_LEN),
            Self::InvalidChar(c) => write!(f, "invalid character {:?} in validation code", c),
        }
    }
}

/// Shared secret the device must echo before it is trusted.
///
/// Always non-empty printable ASCII without the frame terminator or
/// separator, so it can be embedded in a frame as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationCode(String<MAX_CODE_LEN>);

impl ValidationCode {
    /// Check and wrap `code`.
    ///
    /// # Errors
    ///
    /// See [`CodeError`].
    pub fn new(code: &str) -> Result<Self, CodeError> {
        if code.is_empty() {
            return Err(CodeError::Empty);
        }
        if let Some(bad) = code
            .chars()
            .find(|&c| !c.is_ascii_graphic() || c == TERMINATOR || c == SEPARATOR)
        {
            return Err(CodeError::InvalidChar(bad));
        }
        String::try_from(code)
            .map(Self)
            .map_err(|()| CodeError::TooLong)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ValidationCode {
    fn default() -> Self {
        let mut code = String::new();
        // DEFAULT_VALIDATION_CODE is four digits, well under MAX_CODE_LEN
        let _ = code.push_str(DEFAULT_VALIDATION_CODE);
        Self(code)
    }
}

impl TryFrom<&str> for ValidationCode {
    type Error = CodeError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error type for settings persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Backing storage refused the write.
    Storage,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => write!(f, "settings storage write failed"),
        }
    }
}

/// Persistent key-value settings, reduced to what the controller needs.
pub trait SettingsStore {
    /// The stored code, if one was ever saved.
    fn load_validation_code(&self) -> Option<ValidationCode>;

    /// Persist `code` so the next session validates with it.
    fn store_validation_code(&mut self, code: &ValidationCode) -> Result<(), SettingsError>;

    /// The stored code, falling back to the factory default.
    fn validation_code(&self) -> ValidationCode {
        self.load_validation_code().unwrap_or_default()
    }
}

/// Volatile [`SettingsStore`] for hosts without persistence, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    code: Option<ValidationCode>,
}

impl MemorySettings {
    #[must_use]
    pub const fn new() -> Self {
        Self { code: None }
    }

    /// Start with `code` already stored.
    #[must_use]
    pub fn with_code(code: ValidationCode) -> Self {
        Self { code: Some(code) }
    }
}

impl SettingsStore for MemorySettings {
    fn load_validation_code(&self) -> Option<ValidationCode> {
        self.code.clone()
    }

    fn store_validation_code(&mut self, code: &ValidationCode) -> Result<(), SettingsError> {
        self.code = Some(code.clone());
        Ok(())
    }
}
