//! A software launcher that answers like the real firmware.
//!
//! Used by the demo binary and the integration tests in place of a BLE
//! radio. Replies are chunked into [`MAX_DELIVERY_LEN`] byte deliveries so
//! the controller sees the same fragmentation an HM-10 module produces.

use embassy_time::Timer;
use launch_proto::{decode, encode_into, Command, Dialect, FrameParser};
use log::{debug, info};

use crate::link::{Delivery, LinkEvent, LinkEvents, RadioCommand, Uplink, MAX_DELIVERY_LEN};

/// Launcher-side model of the firmware.
#[derive(Debug)]
pub struct SimulatedLauncher {
    dialect: Dialect,
    code: String,
    device_id: String,
    version: String,
    parser: FrameParser,
    validated: bool,
    armed: bool,
    firing: bool,
    buzzer: bool,
    igniter_present: bool,
    low_voltage: f32,
    high_voltage: f32,
}

impl SimulatedLauncher {
    pub fn new(dialect: Dialect, code: &str) -> Self {
        Self {
            dialect,
            code: code.into(),
            device_id: "SIM-LAUNCHER".into(),
            version: "4".into(),
            parser: FrameParser::new(),
            validated: false,
            armed: false,
            firing: false,
            buzzer: true,
            igniter_present: true,
            low_voltage: 3.31,
            high_voltage: 11.92,
        }
    }

    #[must_use]
    pub fn with_igniter(mut self, present: bool) -> Self {
        self.igniter_present = present;
        self
    }

    #[must_use]
    pub fn with_voltages(mut self, low: f32, high: f32) -> Self {
        self.low_voltage = low;
        self.high_voltage = high;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_firing(&self) -> bool {
        self.firing
    }

    pub fn buzzer_enabled(&self) -> bool {
        self.buzzer
    }

    /// The central went away. The firmware forgets its trust and goes safe.
    pub fn drop_link(&mut self) {
        self.validated = false;
        self.armed = false;
        self.firing = false;
        self.parser.reset();
    }

    /// Forget trust as the firmware does on a watchdog reset, and say so.
    pub fn demand_validation(&mut self) -> Vec<Delivery> {
        self.drop_link();
        let mut out = String::new();
        self.reply(&mut out, Command::RequestValidation, None);
        chunk(&out)
    }

    /// Process bytes written by the central; return the reply deliveries.
    pub fn receive(&mut self, bytes: &[u8]) -> Vec<Delivery> {
        let mut parser = core::mem::take(&mut self.parser);
        let mut out = String::new();
        for body in parser.feed_bytes(bytes) {
            self.handle(body, &mut out);
        }
        self.parser = parser;
        chunk(&out)
    }

    fn handle(&mut self, body: &str, out: &mut String) {
        let decoded = decode(body);
        let Some(command) = decoded.command(self.dialect) else {
            debug!("sim: ignoring {:?}", body);
            return;
        };
        let value = decoded.value;

        match command {
            Command::Validate => {
                if value == Some(self.code.as_str()) {
                    self.validated = true;
                    info!("sim: central validated");
                    let code = self.code.clone();
                    let device_id = self.device_id.clone();
                    let version = self.version.clone();
                    self.reply(out, Command::Validate, Some(&code));
                    self.reply(out, Command::DeviceId, Some(&device_id));
                    self.reply(out, Command::Version, Some(&version));
                } else {
                    self.validated = false;
                    self.reply(out, Command::RequestValidation, None);
                }
                return;
            }
            Command::Ping => return self.reply(out, Command::Ping, None),
            Command::LowVoltage => {
                let volts = format_volts(self.low_voltage);
                return self.reply(out, Command::LowVoltage, Some(&volts));
            }
            Command::HighVoltage => {
                let volts = format_volts(self.high_voltage);
                return self.reply(out, Command::HighVoltage, Some(&volts));
            }
            Command::ArmOff => {
                // Disarming is honoured from anyone
                self.armed = false;
                self.firing = false;
                return;
            }
            _ => {}
        }

        if !self.validated {
            return self.reply(out, Command::RequestValidation, None);
        }

        match command {
            Command::ArmOn => self.armed = true,
            Command::FireOn => self.firing = self.armed,
            Command::FireOff => self.firing = false,
            Command::ContinuityOn => {
                let report = if self.igniter_present {
                    Command::ContinuityOk
                } else {
                    Command::ContinuityNone
                };
                self.reply(out, report, None);
            }
            Command::SetCode => match value {
                Some(code) if !code.is_empty() => {
                    self.code = code.into();
                    self.reply(out, Command::SetCode, None);
                }
                _ => debug!("sim: SETCODE without a code"),
            },
            Command::ArmBuzzer => self.buzzer = value == Some("1"),
            _ => {}
        }
    }

    fn reply(&self, out: &mut String, command: Command, value: Option<&str>) {
        // Writing to a String cannot fail
        let _ = encode_into(out, command.name(self.dialect), value);
    }
}

fn format_volts(volts: f32) -> String {
    format!("{:.2}", volts)
}

/// Split a reply stream into radio-sized deliveries.
fn chunk(stream: &str) -> Vec<Delivery> {
    stream
        .as_bytes()
        .chunks(MAX_DELIVERY_LEN)
        .filter_map(|piece| Delivery::from_slice(piece).ok())
        .collect()
}

/// Stands in for the BLE radio: carries frames to a [`SimulatedLauncher`]
/// and its replies back to the session.
pub struct SimulatedRadio<'a> {
    launcher: SimulatedLauncher,
    uplink: &'a Uplink,
    link: &'a LinkEvents,
    rssi: f32,
}

impl<'a> SimulatedRadio<'a> {
    pub fn new(launcher: SimulatedLauncher, uplink: &'a Uplink, link: &'a LinkEvents) -> Self {
        Self {
            launcher,
            uplink,
            link,
            rssi: -62.0,
        }
    }

    pub fn launcher(&self) -> &SimulatedLauncher {
        &self.launcher
    }

    /// Announce the link, then serve radio commands forever.
    pub async fn run(&mut self) -> ! {
        self.link.send(LinkEvent::Connected).await;
        loop {
            self.step().await;
        }
    }

    /// Serve one radio command.
    pub async fn step(&mut self) {
        match self.uplink.receive().await {
            RadioCommand::Write(packet) => {
                // Over-the-air latency
                Timer::after_millis(5).await;
                for delivery in self.launcher.receive(&packet) {
                    self.link.send(LinkEvent::Received(delivery)).await;
                }
            }
            RadioCommand::ReadRssi => {
                // Drift a little so the readout moves
                self.rssi = if self.rssi < -70.0 { -58.0 } else { self.rssi - 1.5 };
                self.link.send(LinkEvent::Rssi(self.rssi)).await;
            }
        }
    }
}
