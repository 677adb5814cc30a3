//! Wire constants and the launcher command vocabulary.
//!
//! A frame on the wire looks like:
//!
//! ```text
//! :<name>[|<value>]:
//! ```
//!
//! The terminator both opens and closes a frame and doubles as the
//! delimiter between frames that arrive back to back (`:PING::VERSION|4:`).

/// Frame terminator. Opens and closes every frame.
pub const TERMINATOR: char = ':';

/// Separator between a command name and its value, only valid inside a frame body.
pub const SEPARATOR: char = '|';

/// Line-ending characters stripped from every incoming fragment.
pub const LINE_ENDINGS: [char; 2] = ['\r', '\n'];

/// Longest validation code the launcher firmware accepts (`CMD_LEN_MAX`).
pub const MAX_CODE_LEN: usize = 16;

/// Validation code used when nothing has been configured yet.
pub const DEFAULT_VALIDATION_CODE: &str = "0000";

/// Token table spoken by the launcher firmware.
///
/// Early firmware used long, self-describing names. Version 4 firmware
/// shortened them to two or three letters to fit more commands into a
/// single 20 byte BLE packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dialect {
    /// Long-form names (`ARM_ON`, `VALIDATE`, ...).
    #[default]
    Standard,
    /// Compact v4 tokens (`AO`, `VA`, ...).
    Compact,
}

/// Every command understood by the launcher, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    ArmOn,
    ArmOff,
    FireOn,
    FireOff,
    Ping,
    /// Start a continuity test of the igniter circuit.
    ContinuityOn,
    ContinuityOff,
    /// Device reports a closed igniter circuit.
    ContinuityOk,
    /// Device reports an open igniter circuit.
    ContinuityNone,
    DeviceId,
    Version,
    SetCode,
    /// Device asks the app to validate again.
    RequestValidation,
    Validate,
    /// Logic battery voltage.
    LowVoltage,
    /// Igniter battery voltage.
    HighVoltage,
    ArmBuzzer,
}

impl Command {
    /// All commands, in declaration order.
    pub const ALL: [Command; 17] = [
        Command::ArmOn,
        Command::ArmOff,
        Command::FireOn,
        Command::FireOff,
        Command::Ping,
        Command::ContinuityOn,
        Command::ContinuityOff,
        Command::ContinuityOk,
        Command::ContinuityNone,
        Command::DeviceId,
        Command::Version,
        Command::SetCode,
        Command::RequestValidation,
        Command::Validate,
        Command::LowVoltage,
        Command::HighVoltage,
        Command::ArmBuzzer,
    ];

    /// Wire token for this command in the given dialect.
    #[must_use]
    pub const fn name(self, dialect: Dialect) -> &'static str {
        let (standard, compact) = self.tokens();
        match dialect {
            Dialect::Standard => standard,
            Dialect::Compact => compact,
        }
    }

    /// Look up a command by its wire token.
    ///
    /// Returns `None` for tokens this side does not know about; callers
    /// drop those rather than treating them as errors.
    #[must_use]
    pub fn from_name(name: &str, dialect: Dialect) -> Option<Self> {
        Self::ALL.iter().copied().find(|cmd| cmd.name(dialect) == name)
    }

    const fn tokens(self) -> (&'static str, &'static str) {
        match self {
            Command::ArmOn => ("ARM_ON", "AO"),
            Command::ArmOff => ("ARM_OFF", "AF"),
            Command::FireOn => ("FIRE_ON", "FO"),
            Command::FireOff => ("FIRE_OFF", "FF"),
            Command::Ping => ("PING", "PI"),
            Command::ContinuityOn => ("CTY_ON", "CO"),
            Command::ContinuityOff => ("CTY_OFF", "CF"),
            Command::ContinuityOk => ("CTY_OK", "CY"),
            Command::ContinuityNone => ("CTY_NONE", "CX"),
            Command::DeviceId => ("DEVICEID", "ID"),
            Command::Version => ("VERSION", "VER"),
            Command::SetCode => ("SETCODE", "SC"),
            Command::RequestValidation => ("REQ_VALID", "RV"),
            Command::Validate => ("VALIDATE", "VA"),
            Command::LowVoltage => ("LV_BAT_LEV", "LVL"),
            Command::HighVoltage => ("HV_BAT_LEV", "HVL"),
            // No compact form exists for the buzzer toggle
            Command::ArmBuzzer => ("ARM_BUZZ_EN", "ARM_BUZZ_EN"),
        }
    }
}
