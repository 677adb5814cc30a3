//! Bounded log of frames sent and received, for diagnostics screens.

use core::fmt;

use heapless::{Deque, String};
use launch_proto::MAX_FRAME_LEN;

use crate::state::truncated;

/// Entries kept before the oldest is dropped.
pub const HISTORY_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// From the launcher.
    Rx,
    /// To the launcher.
    Tx,
}

impl Direction {
    /// Arrow prefix used when rendering an entry.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Rx => "-> ",
            Self::Tx => "<- ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub text: String<MAX_FRAME_LEN>,
    /// `false` when the transport refused an outgoing frame.
    pub delivered: bool,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.marker(), self.text)?;
        if !self.delivered {
            f.write_str(" (FAILED)")?;
        }
        Ok(())
    }
}

/// Ring buffer of the last [`HISTORY_CAPACITY`] frames.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    entries: Deque<HistoryEntry, HISTORY_CAPACITY>,
}

impl CommandHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn record(&mut self, direction: Direction, text: &str, delivered: bool) {
        if self.entries.is_full() {
            self.entries.pop_front();
        }
        let entry = HistoryEntry {
            direction,
            text: truncated(text),
            delivered,
        };
        // Cannot fail: a slot was freed above
        let _ = self.entries.push_back(entry);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
