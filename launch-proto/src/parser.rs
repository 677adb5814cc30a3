//! Incremental frame parser for the launcher's serial stream.
//!
//! BLE serial modules deliver the stream in small packets (20 bytes on an
//! HM-10) with no regard for frame boundaries, so a frame may be split over
//! several deliveries and a single delivery may close several frames.
//!
//! The parser accumulates characters from the first terminator it sees and
//! flushes once the accumulated buffer ends in a terminator. The flushed
//! buffer is then split into frame bodies, dropping empty and single
//! character pieces (stray terminators, line noise).

use heapless::String;
use log::{debug, warn};

use crate::wire::{LINE_ENDINGS, TERMINATOR};

/// Maximum number of characters held for an unterminated frame.
///
/// A stream that never terminates would otherwise grow the buffer without
/// bound. On overflow the partial frame is discarded and the parser skips to
/// the next terminator, which may be later in the same fragment.
pub const MAX_BUFFER_LEN: usize = 128;

/// Stateful decoder turning text fragments into frame bodies.
///
/// # Example
///
/// ```
/// use launch_proto::FrameParser;
///
/// let mut parser = FrameParser::new();
/// assert_eq!(parser.feed(":ARM").count(), 0);
///
/// let frames: Vec<&str> = parser.feed("_ON::PING:").collect();
/// assert_eq!(frames, ["ARM_ON", "PING"]);
/// ```
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Characters of the frame(s) currently being read.
    buffer: String<MAX_BUFFER_LEN>,
    /// Set between an opening terminator and the flush that closes it.
    reading: bool,
    /// Last flushed buffer, borrowed by [`Frames`].
    flushed: String<MAX_BUFFER_LEN>,
}

impl FrameParser {
    /// Create a parser waiting for its first terminator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
            reading: false,
            flushed: String::new(),
        }
    }

    /// Whether a frame has been opened but not yet closed.
    #[inline]
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    /// Characters accumulated for the frame in progress.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Drop any partial frame and wait for the next terminator.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.reading = false;
    }

    /// Feed a raw chunk as received from the transport.
    ///
    /// Chunks that are not valid UTF-8 are dropped whole without touching
    /// the parser state, along with any frames they carry. That includes a
    /// multibyte character split across two deliveries: both chunks are
    /// lost. The launcher only speaks ASCII, so this only happens on a
    /// corrupted link.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Frames<'_> {
        match core::str::from_utf8(bytes) {
            Ok(fragment) => self.feed(fragment),
            Err(_) => {
                warn!("dropping {} byte chunk: not valid UTF-8", bytes.len());
                self.flushed.clear();
                Frames::new(&self.flushed)
            }
        }
    }

    /// Feed one text fragment and return the frame bodies it completed.
    ///
    /// The returned iterator borrows the parser, so every frame of one
    /// delivery has to be consumed (or dropped) before the next delivery
    /// can be fed.
    pub fn feed(&mut self, fragment: &str) -> Frames<'_> {
        self.flushed.clear();

        let mut skipped = 0usize;
        for c in fragment.chars().filter(|c| !LINE_ENDINGS.contains(c)) {
            if !self.reading {
                // Some firmware revisions drop the opening terminator.
                // Resynchronise on the next terminator.
                if c != TERMINATOR {
                    skipped += 1;
                    continue;
                }
                if skipped > 0 {
                    warn!("skipped {} junk characters before terminator", skipped);
                    skipped = 0;
                }
                self.buffer.clear();
                self.reading = true;
            }

            if self.buffer.push(c).is_err() {
                warn!(
                    "unterminated frame exceeded {} bytes, discarding",
                    MAX_BUFFER_LEN
                );
                self.reset();
                if c == TERMINATOR {
                    // The terminator that overflowed opens the next frame
                    self.reading = true;
                    let _ = self.buffer.push(c);
                }
            }
        }
        if skipped > 0 {
            debug!("discarding {} characters outside any frame", skipped);
        }

        if self.buffer.ends_with(TERMINATOR) {
            debug!("flushing frame buffer {:?}", self.buffer.as_str());
            core::mem::swap(&mut self.buffer, &mut self.flushed);
            self.reset();
        }

        Frames::new(&self.flushed)
    }
}

/// Frame bodies completed by a single [`FrameParser::feed`] call, in
/// arrival order.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    pieces: core::str::Split<'a, char>,
}

impl<'a> Frames<'a> {
    fn new(flushed: &'a str) -> Self {
        Self {
            pieces: flushed.split(TERMINATOR),
        }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        // Empty pieces come from adjacent terminators, single characters
        // are line noise; neither can be a command.
        self.pieces.find(|piece| piece.chars().nth(1).is_some())
    }
}
