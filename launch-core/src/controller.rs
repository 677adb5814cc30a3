//! The launch state machine.
//!
//! [`LaunchController`] owns the observable [`LaunchState`] and is the only
//! thing that mutates it. Inputs arrive from two directions:
//!
//! - the transport: connect/disconnect notifications, received bytes, RSSI readings
//! - the user: intents such as [`set_armed`](LaunchController::set_armed) and [`fire`](LaunchController::fire)
//!
//! Every intent is checked against the safety gates before anything is
//! transmitted. A refused intent returns [`Dispatch::Suppressed`] and
//! leaves the state unchanged.

use embassy_time::{Duration, Instant};
use launch_proto::{decode, encode_command, Command, DecodedCommand, Dialect, FrameParser};
use log::{debug, info, warn};

use crate::history::{CommandHistory, Direction};
use crate::scheduler::{PollDue, TelemetryScheduler, RSSI_INTERVAL, VOLTAGE_INTERVAL};
use crate::settings::{SettingsStore, ValidationCode};
use crate::state::{truncated, DeviceText, LaunchState};
use crate::transport::{Transport, TransportError};

/// Controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Token table for both directions.
    pub dialect: Dialect,
    pub rssi_interval: Duration,
    pub voltage_interval: Duration,
    /// Send VALIDATE on connect and when the device revokes earlier trust.
    pub auto_validate: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Standard,
            rssi_interval: RSSI_INTERVAL,
            voltage_interval: VOLTAGE_INTERVAL,
            auto_validate: true,
        }
    }
}

/// Outcome of an intent that did not fail at the transport.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// The frame was handed to the transport.
    Sent,
    /// A safety gate refused the intent; nothing was transmitted.
    Suppressed,
}

/// Something the device told us that the UI may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchEvent {
    /// The device echoed the right validation code.
    Validated,
    /// The device demanded revalidation; trust and arming were dropped.
    ValidationRevoked,
    Continuity(bool),
    DeviceId(Option<DeviceText>),
    Version(Option<DeviceText>),
    LowVoltage(f32),
    HighVoltage(f32),
    /// The device acknowledged SETCODE and now expects `code`.
    ///
    /// `persisted` is false when the settings store refused the write; the
    /// next session will then validate with the old code.
    ValidationCodeSet { code: ValidationCode, persisted: bool },
}

/// Safety-gated launcher session over a [`Transport`].
pub struct LaunchController<T, S> {
    transport: T,
    settings: S,
    config: ControllerConfig,
    state: LaunchState,
    parser: FrameParser,
    scheduler: TelemetryScheduler,
    /// Code from the latest SETCODE awaiting acknowledgement.
    pending_code: Option<ValidationCode>,
    history: CommandHistory,
}

impl<T: Transport, S: SettingsStore> LaunchController<T, S> {
    pub fn new(transport: T, settings: S, config: ControllerConfig) -> Self {
        Self {
            transport,
            settings,
            scheduler: TelemetryScheduler::new(config.rssi_interval, config.voltage_interval),
            config,
            state: LaunchState::new(),
            parser: FrameParser::new(),
            pending_code: None,
            history: CommandHistory::new(),
        }
    }

    pub fn state(&self) -> &LaunchState {
        &self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// When [`on_tick`](Self::on_tick) next has work to do.
    pub fn next_poll_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Changes whenever polling starts or stops.
    pub fn poll_epoch(&self) -> u32 {
        self.scheduler.epoch()
    }

    /// Decompose the controller into its transport and settings.
    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.settings)
    }

    // ---------------------------------------------------------------------
    // Transport-facing inputs
    // ---------------------------------------------------------------------

    /// The write channel is up.
    ///
    /// Starts telemetry polling and, if configured, requests validation.
    /// Repeated notifications leave the running schedule alone.
    pub fn on_connected(&mut self, now: Instant) {
        if !self.state.connected {
            info!("launcher connected");
            self.parser.reset();
        }
        self.state.connected = true;
        if self.scheduler.start(now) {
            debug!("telemetry polling started");
        }
        if self.config.auto_validate {
            if let Err(e) = self.validate() {
                warn!("validation request failed: {}", e);
            }
        }
    }

    /// The link dropped. Trust and arming never survive a reconnect.
    pub fn on_disconnected(&mut self) {
        if self.state.connected {
            info!("launcher disconnected");
        }
        self.state.connected = false;
        self.state.validated = false;
        self.state.armed = false;
        self.state.rssi = 0.0;
        if self.scheduler.stop() {
            debug!("telemetry polling stopped");
        }
        self.pending_code = None;
        self.parser.reset();
    }

    /// A signal strength reading requested via [`Transport::request_rssi_read`].
    pub fn on_rssi_read(&mut self, rssi: f32) {
        if self.state.connected {
            self.state.rssi = rssi;
        } else {
            debug!("dropping RSSI reading while disconnected");
        }
    }

    /// Feed one BLE delivery. Events are handed to `on_event` in frame order.
    /// Nothing is parsed while disconnected.
    pub fn on_bytes_received(&mut self, bytes: &[u8], mut on_event: impl FnMut(LaunchEvent)) {
        if !self.state.connected {
            debug!("dropping {} bytes received while disconnected", bytes.len());
            return;
        }
        let mut parser = core::mem::take(&mut self.parser);
        for body in parser.feed_bytes(bytes) {
            self.history.record(Direction::Rx, body, true);
            if let Some(event) = self.apply(decode(body)) {
                on_event(event);
            }
        }
        self.parser = parser;
    }

    /// Run whatever polling fell due at `now`.
    pub fn on_tick(&mut self, now: Instant) -> PollDue {
        if !self.state.connected {
            return PollDue::default();
        }
        let due = self.scheduler.poll(now);
        if due.rssi {
            self.transport.request_rssi_read();
        }
        if due.voltage {
            if let Err(e) = self.check_voltage() {
                warn!("voltage poll failed: {}", e);
            }
        }
        due
    }

    /// Apply one decoded frame from the device.
    ///
    /// Frames applied while disconnected are ignored.
    pub fn apply(&mut self, decoded: DecodedCommand<'_>) -> Option<LaunchEvent> {
        if !self.state.connected {
            debug!("ignoring {:?} while disconnected", decoded.name);
            return None;
        }
        let Some(command) = decoded.command(self.config.dialect) else {
            debug!("ignoring unknown command {:?}", decoded.name);
            return None;
        };
        match command {
            Command::Validate => {
                let code = self.settings.validation_code();
                if decoded.value == Some(code.as_str()) {
                    info!("launcher validated");
                    self.state.validated = true;
                    Some(LaunchEvent::Validated)
                } else {
                    warn!("launcher answered with a wrong validation code");
                    None
                }
            }
            Command::RequestValidation => {
                info!("launcher requested validation");
                let was_validated = self.state.validated;
                self.state.validated = false;
                self.state.armed = false;
                // A rejected attempt also arrives as REQ_VALID; retrying it would loop
                if self.config.auto_validate && was_validated {
                    if let Err(e) = self.validate() {
                        warn!("validation request failed: {}", e);
                    }
                }
                Some(LaunchEvent::ValidationRevoked)
            }
            Command::DeviceId => {
                let id: Option<DeviceText> = decoded.value.map(truncated);
                self.state.device_id.clone_from(&id);
                Some(LaunchEvent::DeviceId(id))
            }
            Command::Version => {
                let version: Option<DeviceText> = decoded.value.map(truncated);
                self.state.device_version.clone_from(&version);
                Some(LaunchEvent::Version(version))
            }
            Command::ContinuityOk | Command::ContinuityNone => {
                let closed = command == Command::ContinuityOk;
                self.state.continuity = closed;
                Some(LaunchEvent::Continuity(closed))
            }
            Command::LowVoltage => {
                let volts = parse_volts(decoded.value?);
                self.state.low_voltage = volts;
                Some(LaunchEvent::LowVoltage(volts))
            }
            Command::HighVoltage => {
                let volts = parse_volts(decoded.value?);
                self.state.high_voltage = volts;
                Some(LaunchEvent::HighVoltage(volts))
            }
            Command::SetCode => {
                let Some(code) = self.pending_code.take() else {
                    debug!("unsolicited SETCODE acknowledgement");
                    return None;
                };
                let persisted = match self.settings.store_validation_code(&code) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("could not persist validation code: {}", e);
                        false
                    }
                };
                info!("validation code changed");
                Some(LaunchEvent::ValidationCodeSet { code, persisted })
            }
            Command::Ping => {
                debug!("ping answered");
                None
            }
            Command::ArmOn
            | Command::ArmOff
            | Command::FireOn
            | Command::FireOff
            | Command::ContinuityOn
            | Command::ContinuityOff
            | Command::ArmBuzzer => None,
        }
    }

    // ---------------------------------------------------------------------
    // User intents
    // ---------------------------------------------------------------------

    /// Arm or disarm. Arming requires validation; disarming is always allowed.
    ///
    /// # Errors
    ///
    /// Transport failure. A failed ARM_ON leaves the controller disarmed.
    pub fn set_armed(&mut self, armed: bool) -> Result<Dispatch, TransportError> {
        if !armed {
            self.state.armed = false;
            return self.send(Command::ArmOff, None);
        }
        if !self.state.validated {
            warn!("refusing to arm: launcher not validated");
            return Ok(Dispatch::Suppressed);
        }
        let dispatch = self.send(Command::ArmOn, None)?;
        self.state.armed = true;
        Ok(dispatch)
    }

    /// Start or stop the igniter. Starting requires validated and armed.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn fire(&mut self, enable: bool) -> Result<Dispatch, TransportError> {
        if !self.state.validated {
            warn!("refusing to fire: launcher not validated");
            return Ok(Dispatch::Suppressed);
        }
        if !enable {
            return self.send(Command::FireOff, None);
        }
        if !self.state.armed {
            warn!("refusing to fire: launcher not armed");
            return Ok(Dispatch::Suppressed);
        }
        self.send(Command::FireOn, None)
    }

    /// Switch the continuity test on or off. Requires validation.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn set_continuity(&mut self, enable: bool) -> Result<Dispatch, TransportError> {
        if !self.state.validated {
            warn!("refusing continuity test: launcher not validated");
            return Ok(Dispatch::Suppressed);
        }
        let command = if enable {
            Command::ContinuityOn
        } else {
            Command::ContinuityOff
        };
        self.send(command, None)
    }

    /// Send the stored validation code. A no-op once validated.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn validate(&mut self) -> Result<Dispatch, TransportError> {
        if self.state.validated {
            return Ok(Dispatch::Suppressed);
        }
        let code = self.settings.validation_code();
        self.send(Command::Validate, Some(code.as_str()))
    }

    /// Ask the device to adopt `code`. Requires validation.
    ///
    /// The code is persisted and reported through
    /// [`LaunchEvent::ValidationCodeSet`] once the device acknowledges. A
    /// failed write is reported in the event, not as an error here.
    /// Only the most recent request is remembered.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn set_validation_code(
        &mut self,
        code: ValidationCode,
    ) -> Result<Dispatch, TransportError> {
        if !self.state.validated {
            warn!("refusing to change validation code: launcher not validated");
            return Ok(Dispatch::Suppressed);
        }
        let dispatch = self.send(Command::SetCode, Some(code.as_str()))?;
        if self.pending_code.replace(code).is_some() {
            debug!("superseding earlier SETCODE request");
        }
        Ok(dispatch)
    }

    /// # Errors
    ///
    /// Transport failure.
    pub fn ping(&mut self) -> Result<Dispatch, TransportError> {
        self.send(Command::Ping, None)
    }

    /// Request both battery voltages. Both requests are attempted.
    ///
    /// # Errors
    ///
    /// The first transport failure.
    pub fn check_voltage(&mut self) -> Result<Dispatch, TransportError> {
        let low = self.send(Command::LowVoltage, None);
        let high = self.send(Command::HighVoltage, None);
        low.and(high)
    }

    /// Enable or disable the buzzer that sounds while armed.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn set_arm_buzzer(&mut self, enable: bool) -> Result<Dispatch, TransportError> {
        self.send(Command::ArmBuzzer, Some(if enable { "1" } else { "0" }))
    }

    fn send(&mut self, command: Command, value: Option<&str>) -> Result<Dispatch, TransportError> {
        let frame = encode_command(command, self.config.dialect, value)?;
        if !self.transport.is_ready() {
            warn!("cannot send {}: transport not ready", frame);
            self.history.record(Direction::Tx, &frame, false);
            return Err(TransportError::NotReady);
        }
        match self.transport.send(frame.as_bytes()) {
            Ok(()) => {
                debug!("sent {}", frame);
                self.history.record(Direction::Tx, &frame, true);
                Ok(Dispatch::Sent)
            }
            Err(e) => {
                warn!("sending {} failed: {}", frame, e);
                self.history.record(Direction::Tx, &frame, false);
                Err(e)
            }
        }
    }
}

/// Unparsable readings become 0.0 so a garbled frame never leaves a stale value.
fn parse_volts(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::settings::{MemorySettings, SettingsError};
    use std::string::String;
    use std::vec;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockTransport {
        sent: Vec<String>,
        offline: bool,
        failing: bool,
        rssi_requests: usize,
    }

    impl MockTransport {
        fn take_sent(&mut self) -> Vec<String> {
            core::mem::take(&mut self.sent)
        }
    }

    impl Transport for MockTransport {
        fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            if self.failing {
                return Err(TransportError::Io);
            }
            self.sent.push(String::from_utf8(bytes.to_vec()).unwrap());
            Ok(())
        }

        fn is_ready(&self) -> bool {
            !self.offline
        }

        fn request_rssi_read(&mut self) {
            self.rssi_requests += 1;
        }
    }

    type Controller = LaunchController<MockTransport, MemorySettings>;

    fn manual_config() -> ControllerConfig {
        ControllerConfig {
            auto_validate: false,
            ..ControllerConfig::default()
        }
    }

    fn controller() -> Controller {
        LaunchController::new(MockTransport::default(), MemorySettings::new(), manual_config())
    }

    fn receive(controller: &mut Controller, bytes: &str) -> Vec<LaunchEvent> {
        let mut events = Vec::new();
        controller.on_bytes_received(bytes.as_bytes(), |e| events.push(e));
        events
    }

    fn validated() -> Controller {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        receive(&mut c, ":VALIDATE|0000:");
        assert!(c.state().validated);
        c.transport_mut().take_sent();
        c
    }

    fn armed() -> Controller {
        let mut c = validated();
        assert_eq!(c.set_armed(true), Ok(Dispatch::Sent));
        c.transport_mut().take_sent();
        c
    }

    #[test]
    fn test_validation_requires_matching_code() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));

        assert!(receive(&mut c, ":VALIDATE|1234:").is_empty());
        assert!(!c.state().validated);

        assert_eq!(receive(&mut c, ":VALIDATE|0000:"), vec![LaunchEvent::Validated]);
        assert!(c.state().validated);
    }

    #[test]
    fn test_validation_without_value_is_rejected() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        receive(&mut c, ":VALIDATE:");
        receive(&mut c, ":VALIDATE|:");
        assert!(!c.state().validated);
    }

    #[test]
    fn test_validation_uses_stored_code() {
        let settings = MemorySettings::with_code(ValidationCode::new("8642").unwrap());
        let mut c = LaunchController::new(MockTransport::default(), settings, manual_config());
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.validate(), Ok(Dispatch::Sent));
        assert_eq!(c.transport().sent, [":VALIDATE|8642:"]);

        receive(&mut c, ":VALIDATE|0000:");
        assert!(!c.state().validated);
        receive(&mut c, ":VALIDATE|8642:");
        assert!(c.state().validated);
    }

    #[test]
    fn test_auto_validate_on_connect() {
        let mut c = LaunchController::new(
            MockTransport::default(),
            MemorySettings::new(),
            ControllerConfig::default(),
        );
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.transport().sent, [":VALIDATE|0000:"]);
    }

    #[test]
    fn test_validate_is_noop_once_validated() {
        let mut c = validated();
        assert_eq!(c.validate(), Ok(Dispatch::Suppressed));
        assert!(c.transport().sent.is_empty());
    }

    #[test]
    fn test_arm_refused_until_validated() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.set_armed(true), Ok(Dispatch::Suppressed));
        assert!(!c.state().armed);
        assert!(c.transport().sent.is_empty());
    }

    #[test]
    fn test_arm_and_disarm() {
        let mut c = validated();
        assert_eq!(c.set_armed(true), Ok(Dispatch::Sent));
        assert!(c.state().armed);
        assert_eq!(c.set_armed(false), Ok(Dispatch::Sent));
        assert!(!c.state().armed);
        assert_eq!(c.transport().sent, [":ARM_ON:", ":ARM_OFF:"]);
    }

    #[test]
    fn test_disarm_always_permitted() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.set_armed(false), Ok(Dispatch::Sent));
        assert_eq!(c.transport().sent, [":ARM_OFF:"]);
    }

    #[test]
    fn test_failed_arm_stays_disarmed() {
        let mut c = validated();
        c.transport_mut().failing = true;
        assert_eq!(c.set_armed(true), Err(TransportError::Io));
        assert!(!c.state().armed);
    }

    #[test]
    fn test_fire_requires_validated_and_armed() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.fire(true), Ok(Dispatch::Suppressed));

        let mut c = validated();
        assert_eq!(c.fire(true), Ok(Dispatch::Suppressed));
        assert!(c.transport().sent.is_empty());

        let mut c = armed();
        assert_eq!(c.fire(true), Ok(Dispatch::Sent));
        assert_eq!(c.fire(false), Ok(Dispatch::Sent));
        assert_eq!(c.transport().sent, [":FIRE_ON:", ":FIRE_OFF:"]);
    }

    #[test]
    fn test_fire_off_needs_only_validation() {
        let mut c = validated();
        assert_eq!(c.fire(false), Ok(Dispatch::Sent));
        assert_eq!(c.transport().sent, [":FIRE_OFF:"]);
    }

    #[test]
    fn test_fire_on_never_sent_unless_validated_and_armed() {
        #[derive(Clone, Copy, Debug)]
        enum Step {
            Connect,
            Disconnect,
            Validate,
            Revoke,
            Arm,
            Disarm,
            Fire,
        }
        const STEPS: [Step; 7] = [
            Step::Connect,
            Step::Disconnect,
            Step::Validate,
            Step::Revoke,
            Step::Arm,
            Step::Disarm,
            Step::Fire,
        ];

        // Every sequence of four steps
        for n in 0..STEPS.len().pow(4) {
            let mut c = controller();
            let mut k = n;
            for _ in 0..4 {
                let step = STEPS[k % STEPS.len()];
                k /= STEPS.len();
                match step {
                    Step::Connect => c.on_connected(Instant::from_secs(0)),
                    Step::Disconnect => c.on_disconnected(),
                    Step::Validate => drop(receive(&mut c, ":VALIDATE|0000:")),
                    Step::Revoke => drop(receive(&mut c, ":REQ_VALID:")),
                    Step::Arm => drop(c.set_armed(true)),
                    Step::Disarm => drop(c.set_armed(false)),
                    Step::Fire => {
                        let allowed = c.state().can_fire();
                        c.transport_mut().take_sent();
                        let _ = c.fire(true);
                        let fired = c.transport().sent.iter().any(|f| f == ":FIRE_ON:");
                        assert_eq!(fired, allowed, "sequence {}", n);
                    }
                }
                assert!(!c.state().armed || c.state().validated, "sequence {}", n);
                assert!(!c.state().validated || c.state().connected, "sequence {}", n);
            }
        }
    }

    #[test]
    fn test_continuity_gated_and_reported() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.set_continuity(true), Ok(Dispatch::Suppressed));

        let mut c = validated();
        assert_eq!(c.set_continuity(true), Ok(Dispatch::Sent));
        assert_eq!(c.set_continuity(false), Ok(Dispatch::Sent));
        assert_eq!(c.transport().sent, [":CTY_ON:", ":CTY_OFF:"]);

        assert_eq!(receive(&mut c, ":CTY_OK:"), vec![LaunchEvent::Continuity(true)]);
        assert!(c.state().continuity);
        assert_eq!(receive(&mut c, ":CTY_NONE:"), vec![LaunchEvent::Continuity(false)]);
        assert!(!c.state().continuity);
    }

    #[test]
    fn test_request_validation_revokes_trust() {
        let mut c = armed();
        let events = receive(&mut c, ":REQ_VALID:");
        assert_eq!(events, vec![LaunchEvent::ValidationRevoked]);
        assert!(!c.state().validated);
        assert!(!c.state().armed);
        assert_eq!(c.fire(true), Ok(Dispatch::Suppressed));
    }

    #[test]
    fn test_request_validation_triggers_auto_validate() {
        let mut c = LaunchController::new(
            MockTransport::default(),
            MemorySettings::new(),
            ControllerConfig::default(),
        );
        c.on_connected(Instant::from_secs(0));
        receive(&mut c, ":VALIDATE|0000:");
        c.transport_mut().take_sent();

        receive(&mut c, ":REQ_VALID:");
        assert_eq!(c.transport().sent, [":VALIDATE|0000:"]);
    }

    #[test]
    fn test_rejected_validation_not_retried() {
        let mut c = LaunchController::new(
            MockTransport::default(),
            MemorySettings::new(),
            ControllerConfig::default(),
        );
        c.on_connected(Instant::from_secs(0));
        c.transport_mut().take_sent();

        assert_eq!(receive(&mut c, ":REQ_VALID:"), vec![LaunchEvent::ValidationRevoked]);
        assert!(c.transport().sent.is_empty());
    }

    #[test]
    fn test_disconnect_resets_session() {
        let mut c = armed();
        c.on_rssi_read(-61.0);
        assert_eq!(c.state().rssi, -61.0);

        c.on_disconnected();
        let state = c.state();
        assert!(!state.connected);
        assert!(!state.validated);
        assert!(!state.armed);
        assert_eq!(state.rssi, 0.0);
        assert_eq!(c.next_poll_deadline(), None);

        c.on_rssi_read(-40.0);
        assert_eq!(c.state().rssi, 0.0);
    }

    #[test]
    fn test_bytes_ignored_while_disconnected() {
        let mut c = controller();
        assert!(receive(&mut c, ":VALIDATE|0000:").is_empty());
        assert!(!c.state().validated);
        assert!(c.history().is_empty());
    }

    #[test]
    fn test_apply_ignored_while_disconnected() {
        let mut c = controller();
        assert_eq!(c.apply(decode("VALIDATE|0000")), None);
        assert!(!c.state().validated);
        assert_eq!(c.set_armed(true), Ok(Dispatch::Suppressed));
        assert_eq!(c.fire(true), Ok(Dispatch::Suppressed));
        assert!(c.transport().sent.is_empty());

        c.on_connected(Instant::from_secs(0));
        c.on_disconnected();
        assert_eq!(c.apply(decode("VALIDATE|0000")), None);
        assert!(!c.state().validated);
    }

    #[test]
    fn test_disconnect_discards_partial_frame() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        receive(&mut c, ":VALIDATE|00");
        c.on_disconnected();
        c.on_connected(Instant::from_secs(5));
        assert!(receive(&mut c, "00:").is_empty());
        assert!(!c.state().validated);
    }

    #[test]
    fn test_device_identity() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        let events = receive(&mut c, ":DEVICEID|LNCH-7F21::VERSION|4:");
        let id = DeviceText::try_from("LNCH-7F21").unwrap();
        let version = DeviceText::try_from("4").unwrap();
        assert_eq!(
            events,
            vec![
                LaunchEvent::DeviceId(Some(id.clone())),
                LaunchEvent::Version(Some(version.clone())),
            ]
        );
        assert_eq!(c.state().device_id, Some(id));
        assert_eq!(c.state().device_version, Some(version));

        receive(&mut c, ":DEVICEID:");
        assert_eq!(c.state().device_id, None);
    }

    #[test]
    fn test_battery_levels() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        let events = receive(&mut c, ":LV_BAT_LEV|3.31::HV_BAT_LEV|11.9:");
        assert_eq!(
            events,
            vec![LaunchEvent::LowVoltage(3.31), LaunchEvent::HighVoltage(11.9)]
        );
        assert_eq!(c.state().low_voltage, 3.31);
        assert_eq!(c.state().high_voltage, 11.9);

        receive(&mut c, ":LV_BAT_LEV|abc:");
        assert_eq!(c.state().low_voltage, 0.0);

        // No value: ignored
        assert!(receive(&mut c, ":HV_BAT_LEV:").is_empty());
        assert_eq!(c.state().high_voltage, 11.9);
    }

    #[test]
    fn test_set_code_acknowledged_once() {
        let mut c = validated();
        let code = ValidationCode::new("1234").unwrap();
        assert_eq!(c.set_validation_code(code.clone()), Ok(Dispatch::Sent));
        assert_eq!(c.transport().sent, [":SETCODE|1234:"]);
        assert_eq!(c.settings().load_validation_code(), None);

        let events = receive(&mut c, ":SETCODE:");
        assert_eq!(
            events,
            vec![LaunchEvent::ValidationCodeSet {
                code: code.clone(),
                persisted: true,
            }]
        );
        assert_eq!(c.settings().load_validation_code(), Some(code));

        assert!(receive(&mut c, ":SETCODE:").is_empty());
    }

    #[test]
    fn test_set_code_last_request_wins() {
        let mut c = validated();
        let first = ValidationCode::new("1111").unwrap();
        let second = ValidationCode::new("2222").unwrap();
        let _ = c.set_validation_code(first);
        let _ = c.set_validation_code(second.clone());

        let events = receive(&mut c, ":SETCODE:");
        assert_eq!(
            events,
            vec![LaunchEvent::ValidationCodeSet {
                code: second,
                persisted: true,
            }]
        );
    }

    /// Settings store whose writes always fail.
    struct ReadOnlySettings;

    impl SettingsStore for ReadOnlySettings {
        fn load_validation_code(&self) -> Option<ValidationCode> {
            None
        }

        fn store_validation_code(&mut self, _code: &ValidationCode) -> Result<(), SettingsError> {
            Err(SettingsError::Storage)
        }
    }

    #[test]
    fn test_set_code_reports_storage_failure() {
        let mut c = LaunchController::new(MockTransport::default(), ReadOnlySettings, manual_config());
        c.on_connected(Instant::from_secs(0));
        let mut events = Vec::new();
        c.on_bytes_received(b":VALIDATE|0000:", |e| events.push(e));
        assert!(c.state().validated);

        let code = ValidationCode::new("1234").unwrap();
        assert_eq!(c.set_validation_code(code.clone()), Ok(Dispatch::Sent));
        events.clear();
        c.on_bytes_received(b":SETCODE:", |e| events.push(e));
        assert_eq!(
            events,
            vec![LaunchEvent::ValidationCodeSet {
                code,
                persisted: false,
            }]
        );
        assert_eq!(c.settings().validation_code().as_str(), "0000");
    }

    #[test]
    fn test_set_code_requires_validation() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        let code = ValidationCode::new("1234").unwrap();
        assert_eq!(c.set_validation_code(code), Ok(Dispatch::Suppressed));
        assert!(receive(&mut c, ":SETCODE:").is_empty());
    }

    #[test]
    fn test_unknown_and_echoed_commands_ignored() {
        let mut c = validated();
        let before = c.state().clone();
        assert!(receive(&mut c, ":BOGUS|1::ARM_ON::FIRE_ON::PING:").is_empty());
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn test_frames_split_across_deliveries() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        assert!(receive(&mut c, ":VALI").is_empty());
        assert!(receive(&mut c, "DATE|00").is_empty());
        assert_eq!(receive(&mut c, "00:"), vec![LaunchEvent::Validated]);
    }

    #[test]
    fn test_ungated_intents() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.ping(), Ok(Dispatch::Sent));
        assert_eq!(c.check_voltage(), Ok(Dispatch::Sent));
        assert_eq!(c.set_arm_buzzer(true), Ok(Dispatch::Sent));
        assert_eq!(
            c.transport().sent,
            [":PING:", ":LV_BAT_LEV:", ":HV_BAT_LEV:", ":ARM_BUZZ_EN|1:"]
        );
    }

    #[test]
    fn test_send_while_not_ready() {
        let mut c = controller();
        c.transport_mut().offline = true;
        assert_eq!(c.ping(), Err(TransportError::NotReady));
        let entry = c.history().latest().unwrap();
        assert_eq!(entry.text.as_str(), ":PING:");
        assert!(!entry.delivered);
    }

    #[test]
    fn test_history_records_both_directions() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        let _ = c.ping();
        receive(&mut c, ":PING:");
        let texts: Vec<_> = c.history().iter().map(|e| (e.direction, e.text.as_str())).collect();
        assert_eq!(texts, [(Direction::Tx, ":PING:"), (Direction::Rx, "PING")]);
    }

    #[test]
    fn test_compact_dialect() {
        let config = ControllerConfig {
            dialect: Dialect::Compact,
            ..manual_config()
        };
        let mut c = LaunchController::new(MockTransport::default(), MemorySettings::new(), config);
        c.on_connected(Instant::from_secs(0));
        assert_eq!(receive(&mut c, ":VA|0000:"), vec![LaunchEvent::Validated]);
        let _ = c.set_armed(true);
        let _ = c.fire(true);
        assert_eq!(c.transport().sent, [":AO:", ":FO:"]);

        // Standard names are unknown in the compact dialect
        assert!(receive(&mut c, ":REQ_VALID:").is_empty());
        assert!(c.state().armed);
    }

    #[test]
    fn test_polling_while_connected() {
        let mut c = controller();
        assert!(!c.on_tick(Instant::from_secs(60)).any());

        c.on_connected(Instant::from_secs(0));
        assert_eq!(c.next_poll_deadline(), Some(Instant::from_secs(2)));

        for secs in 1..=10 {
            let _ = c.on_tick(Instant::from_secs(secs));
        }
        assert_eq!(c.transport().rssi_requests, 5);
        assert_eq!(c.transport().sent, [":LV_BAT_LEV:", ":HV_BAT_LEV:"]);

        c.on_disconnected();
        assert!(!c.on_tick(Instant::from_secs(12)).any());
        assert_eq!(c.transport().rssi_requests, 5);
    }

    #[test]
    fn test_repeated_connect_keeps_schedule() {
        let mut c = controller();
        c.on_connected(Instant::from_secs(0));
        let epoch = c.poll_epoch();
        c.on_connected(Instant::from_secs(1));
        assert_eq!(c.poll_epoch(), epoch);
        assert_eq!(c.next_poll_deadline(), Some(Instant::from_secs(2)));
    }
}
