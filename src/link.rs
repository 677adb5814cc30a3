//! Messages between the session and the radio, and the channel-backed transport.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use launch_core::{Transport, TransportError, ValidationCode};
use launch_proto::MAX_FRAME_LEN;
use log::warn;

/// Largest notification payload an HM-10 module delivers at once.
pub const MAX_DELIVERY_LEN: usize = 20;

/// Depth of every channel between tasks.
pub const QUEUE_DEPTH: usize = 16;

/// One BLE notification worth of bytes.
pub type Delivery = Vec<u8, MAX_DELIVERY_LEN>;

/// One encoded frame on its way out.
pub type Packet = Vec<u8, MAX_FRAME_LEN>;

/// What the radio reports to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Write characteristic discovered; frames may be sent.
    Connected,
    Disconnected,
    Received(Delivery),
    /// Answer to a [`RadioCommand::ReadRssi`], in dBm.
    Rssi(f32),
}

/// What the session asks of the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCommand {
    Write(Packet),
    ReadRssi,
}

/// A user request for the session to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Arm(bool),
    Fire(bool),
    Continuity(bool),
    Validate,
    SetCode(ValidationCode),
    Ping,
    CheckVoltage,
    ArmBuzzer(bool),
}

pub type LinkEvents = Channel<CriticalSectionRawMutex, LinkEvent, QUEUE_DEPTH>;
pub type Uplink = Channel<CriticalSectionRawMutex, RadioCommand, QUEUE_DEPTH>;
pub type Intents = Channel<CriticalSectionRawMutex, Intent, QUEUE_DEPTH>;

/// [`Transport`] that queues frames for the radio task.
///
/// Never blocks: a full queue is reported as [`TransportError::Busy`].
pub struct ChannelTransport<'a> {
    uplink: &'a Uplink,
    ready: bool,
}

impl<'a> ChannelTransport<'a> {
    pub fn new(uplink: &'a Uplink) -> Self {
        Self {
            uplink,
            ready: false,
        }
    }

    /// Track whether the radio currently has a write channel.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

impl Transport for ChannelTransport<'_> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        let packet = Packet::from_slice(bytes).map_err(|()| TransportError::FrameTooLong)?;
        self.uplink
            .try_send(RadioCommand::Write(packet))
            .map_err(|_| TransportError::Busy)
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn request_rssi_read(&mut self) {
        if self.uplink.try_send(RadioCommand::ReadRssi).is_err() {
            warn!("uplink full, skipping RSSI read");
        }
    }
}
