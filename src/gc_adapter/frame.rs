use std::time::{Duration, Instant};

use super::error::{AdapterError, AdapterResult};
use super::session::{AdapterSession, PollOutcome};
use super::usb_link::UsbLink;

/// Size of one adapter status report.
pub const FRAME_LEN: usize = 37;

/// Owns the most recent complete status report read from the adapter.
///
/// The contents are only ever replaced wholesale; a short or timed-out read
/// leaves the previous frame in place.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    bytes: [u8; FRAME_LEN],
    last_updated: Option<Instant>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; FRAME_LEN],
            last_updated: None,
        }
    }

    pub fn capacity(&self) -> usize {
        FRAME_LEN
    }

    /// Block on the session's IN endpoint until a frame arrives or the read
    /// times out.
    pub fn fill_from<L: UsbLink>(
        &mut self,
        session: &mut AdapterSession<L>,
    ) -> AdapterResult<PollOutcome> {
        session.poll(self)
    }

    pub fn byte_at(&self, index: usize) -> AdapterResult<u8> {
        self.bytes
            .get(index)
            .copied()
            .ok_or(AdapterError::OutOfRange {
                index,
                len: FRAME_LEN,
            })
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// True if no complete frame has been stored within `max_age`, or ever.
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        self.last_updated
            .map_or(true, |at| at.elapsed() > max_age)
    }

    pub(crate) fn replace(&mut self, bytes: [u8; FRAME_LEN]) {
        self.bytes = bytes;
        self.last_updated = Some(Instant::now());
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[u8; FRAME_LEN]> for FrameBuffer {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self {
            bytes,
            last_updated: None,
        }
    }
}
