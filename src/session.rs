//! The session actor: one task that owns the controller.
//!
//! Radio events, user intents, and the polling timer are all funnelled
//! through [`Session::step`], so the controller is only ever touched from
//! one place. After each step the latest [`LaunchState`] is published on a
//! [`Signal`] ("latest value wins"); device events go out on a channel.

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};
use launch_core::{
    ControllerConfig, Dispatch, LaunchController, LaunchEvent, LaunchState, SettingsStore,
    TransportError,
};
use log::{debug, info, warn};

use crate::link::{ChannelTransport, Intent, Intents, LinkEvent, LinkEvents, Uplink, QUEUE_DEPTH};

pub type StateSignal = Signal<CriticalSectionRawMutex, LaunchState>;
pub type EventFeed = Channel<CriticalSectionRawMutex, LaunchEvent, QUEUE_DEPTH>;

/// Channels a session is wired to.
#[derive(Clone, Copy)]
pub struct SessionPorts<'a> {
    pub link: &'a LinkEvents,
    pub intents: &'a Intents,
    pub uplink: &'a Uplink,
    pub state: &'a StateSignal,
    pub events: &'a EventFeed,
}

pub struct Session<'a, S> {
    controller: LaunchController<ChannelTransport<'a>, S>,
    ports: SessionPorts<'a>,
}

impl<'a, S: SettingsStore> Session<'a, S> {
    pub fn new(ports: SessionPorts<'a>, settings: S, config: ControllerConfig) -> Self {
        let transport = ChannelTransport::new(ports.uplink);
        Self {
            controller: LaunchController::new(transport, settings, config),
            ports,
        }
    }

    pub fn controller(&self) -> &LaunchController<ChannelTransport<'a>, S> {
        &self.controller
    }

    /// Run the session forever.
    pub async fn run(&mut self) -> ! {
        self.publish();
        loop {
            self.step().await;
        }
    }

    /// Wait for the next input, handle it, and publish the resulting state.
    ///
    /// Radio events win over intents, and both win over a due poll.
    pub async fn step(&mut self) {
        let ports = self.ports;
        let deadline = self.controller.next_poll_deadline();
        let poll_timer = async {
            match deadline {
                Some(at) => Timer::at(at).await,
                None => core::future::pending().await,
            }
        };
        match select3(ports.link.receive(), ports.intents.receive(), poll_timer).await {
            Either3::First(event) => self.handle_link(event),
            Either3::Second(intent) => self.handle_intent(intent),
            Either3::Third(()) => {
                let due = self.controller.on_tick(Instant::now());
                debug!("poll tick: {:?}", due);
            }
        }
        self.publish();
    }

    fn handle_link(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                self.controller.transport_mut().set_ready(true);
                self.controller.on_connected(Instant::now());
            }
            LinkEvent::Disconnected => {
                self.controller.transport_mut().set_ready(false);
                self.controller.on_disconnected();
            }
            LinkEvent::Received(bytes) => {
                let events = self.ports.events;
                self.controller.on_bytes_received(&bytes, |event| {
                    if let Err(e) = events.try_send(event) {
                        warn!("event feed full, dropping {:?}", e);
                    }
                });
            }
            LinkEvent::Rssi(rssi) => self.controller.on_rssi_read(rssi),
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        let result = match &intent {
            Intent::Arm(armed) => self.controller.set_armed(*armed),
            Intent::Fire(enable) => self.controller.fire(*enable),
            Intent::Continuity(enable) => self.controller.set_continuity(*enable),
            Intent::Validate => self.controller.validate(),
            Intent::SetCode(code) => self.controller.set_validation_code(code.clone()),
            Intent::Ping => self.controller.ping(),
            Intent::CheckVoltage => self.controller.check_voltage(),
            Intent::ArmBuzzer(enable) => self.controller.set_arm_buzzer(*enable),
        };
        report(&intent, result);
    }

    fn publish(&self) {
        self.ports.state.signal(self.controller.state().clone());
    }
}

fn report(intent: &Intent, result: Result<Dispatch, TransportError>) {
    match result {
        Ok(Dispatch::Sent) => debug!("{:?} sent", intent),
        Ok(Dispatch::Suppressed) => info!("{:?} suppressed by safety gate", intent),
        Err(e) => warn!("{:?} failed: {}", intent, e),
    }
}
