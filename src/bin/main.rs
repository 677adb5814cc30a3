//! Demo: run a launch session against the simulated launcher.
//!
//! `RUST_LOG=debug cargo run` shows every frame in both directions.

use bt_launcher::{
    ControllerConfig, EventFeed, Intent, Intents, LaunchEvent, LinkEvents, Session, SessionPorts,
    SimulatedLauncher, SimulatedRadio, StateSignal, Uplink, ValidationCode,
};
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use launch_core::MemorySettings;
use launch_proto::Dialect;
use log::{info, warn};
use static_cell::StaticCell;

static LINK: LinkEvents = LinkEvents::new();
static INTENTS: Intents = Intents::new();
static UPLINK: Uplink = Uplink::new();
static EVENTS: EventFeed = EventFeed::new();

/// Latest state for the UI. Using Signal instead of Channel gives
/// "latest value wins" semantics; the UI only cares about the present.
static STATE: StateSignal = StateSignal::new();

static SESSION: StaticCell<Session<'static, MemorySettings>> = StaticCell::new();
static RADIO: StaticCell<SimulatedRadio<'static>> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("bt-launcher demo starting...");

    let ports = SessionPorts {
        link: &LINK,
        intents: &INTENTS,
        uplink: &UPLINK,
        state: &STATE,
        events: &EVENTS,
    };
    let session = SESSION.init(Session::new(
        ports,
        MemorySettings::new(),
        ControllerConfig::default(),
    ));

    let launcher = SimulatedLauncher::new(Dialect::Standard, "0000").with_voltages(3.28, 11.7);
    let radio = RADIO.init(SimulatedRadio::new(launcher, &UPLINK, &LINK));

    spawner.spawn(session_task(session)).unwrap();
    spawner.spawn(radio_task(radio)).unwrap();
    spawner.spawn(event_task()).unwrap();
    spawner.spawn(operator_task()).unwrap();
}

/// Session task - owns the controller.
#[embassy_executor::task]
async fn session_task(session: &'static mut Session<'static, MemorySettings>) {
    session.run().await;
}

/// Radio task - carries frames to and from the simulated launcher.
#[embassy_executor::task]
async fn radio_task(radio: &'static mut SimulatedRadio<'static>) {
    radio.run().await;
}

/// Event task - logs what the launcher reports.
#[embassy_executor::task]
async fn event_task() {
    loop {
        match EVENTS.receive().await {
            LaunchEvent::ValidationCodeSet {
                code,
                persisted: true,
            } => info!("validation code is now {}", code),
            LaunchEvent::ValidationCodeSet { code, .. } => {
                warn!("validation code is now {} but was not saved", code)
            }
            LaunchEvent::Continuity(true) => info!("igniter continuity OK"),
            LaunchEvent::Continuity(false) => warn!("no igniter continuity"),
            event => info!("launcher: {:?}", event),
        }
    }
}

/// Operator task - plays a scripted launch once the launcher is trusted.
#[embassy_executor::task]
async fn operator_task() {
    loop {
        let state = STATE.wait().await;
        if state.validated {
            break;
        }
    }
    info!("launcher validated, starting countdown");

    INTENTS.send(Intent::Continuity(true)).await;
    INTENTS.send(Intent::Arm(true)).await;
    for n in (1..=3).rev() {
        info!("{}...", n);
        Timer::after(Duration::from_secs(1)).await;
    }
    INTENTS.send(Intent::Fire(true)).await;
    Timer::after(Duration::from_millis(500)).await;
    INTENTS.send(Intent::Fire(false)).await;
    INTENTS.send(Intent::Arm(false)).await;

    match ValidationCode::new("4321") {
        Ok(code) => INTENTS.send(Intent::SetCode(code)).await,
        Err(e) => warn!("bad demo code: {}", e),
    }

    // Let a few telemetry polls run
    Timer::after(Duration::from_secs(12)).await;
    let state = STATE.wait().await;
    info!(
        "final state: rssi {:.1} dBm, batteries {:.2} V / {:.2} V",
        state.rssi, state.low_voltage, state.high_voltage
    );
    std::process::exit(0);
}
