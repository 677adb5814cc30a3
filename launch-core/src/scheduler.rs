//! Periodic telemetry polling while connected.
//!
//! The scheduler never reads a clock. Callers pass `now` in and ask for
//! [`TelemetryScheduler::next_deadline`] to know when to come back, which
//! keeps it usable from an async timer loop and from plain unit tests.

use embassy_time::{Duration, Instant};

/// Signal strength poll period.
pub const RSSI_INTERVAL: Duration = Duration::from_secs(2);

/// Battery voltage poll period.
pub const VOLTAGE_INTERVAL: Duration = Duration::from_secs(10);

/// Which polls fell due in a call to [`TelemetryScheduler::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollDue {
    pub rssi: bool,
    pub voltage: bool,
}

impl PollDue {
    #[must_use]
    pub const fn any(self) -> bool {
        self.rssi || self.voltage
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadlines {
    rssi: Instant,
    voltage: Instant,
}

/// Two fixed-period timers that run only between `start` and `stop`.
///
/// Each start/stop bumps an epoch counter. An async driver that slept
/// toward a deadline can compare epochs on wake-up to tell whether the
/// schedule it was waiting on is still the current one.
#[derive(Debug, Clone)]
pub struct TelemetryScheduler {
    rssi_interval: Duration,
    voltage_interval: Duration,
    deadlines: Option<Deadlines>,
    epoch: u32,
}

impl Default for TelemetryScheduler {
    fn default() -> Self {
        Self::new(RSSI_INTERVAL, VOLTAGE_INTERVAL)
    }
}

impl TelemetryScheduler {
    /// Create a stopped scheduler. Zero intervals are raised to one tick.
    #[must_use]
    pub fn new(rssi_interval: Duration, voltage_interval: Duration) -> Self {
        let min = Duration::from_ticks(1);
        Self {
            rssi_interval: rssi_interval.max(min),
            voltage_interval: voltage_interval.max(min),
            deadlines: None,
            epoch: 0,
        }
    }

    /// Begin polling. The first polls fall due one interval after `now`.
    ///
    /// Returns `false` and leaves the existing schedule alone if already
    /// running, so repeated connect notifications never stack timers.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.deadlines.is_some() {
            return false;
        }
        self.deadlines = Some(Deadlines {
            rssi: now + self.rssi_interval,
            voltage: now + self.voltage_interval,
        });
        self.epoch = self.epoch.wrapping_add(1);
        true
    }

    /// Cancel both polls. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        if self.deadlines.take().is_none() {
            return false;
        }
        self.epoch = self.epoch.wrapping_add(1);
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.deadlines.is_some()
    }

    #[must_use]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Earliest pending deadline, `None` while stopped.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.map(|d| d.rssi.min(d.voltage))
    }

    /// Report which polls are due at `now` and advance their deadlines.
    ///
    /// A poll that was missed several times in a row fires once; the
    /// deadline then moves to the next period boundary after `now`.
    pub fn poll(&mut self, now: Instant) -> PollDue {
        let Some(deadlines) = self.deadlines.as_mut() else {
            return PollDue::default();
        };
        PollDue {
            rssi: advance(&mut deadlines.rssi, self.rssi_interval, now),
            voltage: advance(&mut deadlines.voltage, self.voltage_interval, now),
        }
    }
}

fn advance(deadline: &mut Instant, interval: Duration, now: Instant) -> bool {
    if now < *deadline {
        return false;
    }
    let elapsed = now.as_ticks() - deadline.as_ticks();
    let periods = elapsed / interval.as_ticks() + 1;
    *deadline = Instant::from_ticks(deadline.as_ticks() + periods * interval.as_ticks());
    true
}
