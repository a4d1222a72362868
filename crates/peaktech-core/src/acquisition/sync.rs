//! Frame boundary search.
//!
//! The instrument streams frames back to back with no length prefix, so the
//! only anchor is the start word. Some units repeat the start word several
//! times before the payload; the search therefore runs in two phases that
//! share one budget:
//!
//! 1. discard bytes until a start word is seen;
//! 2. skip repeated start words until the first content byte.
//!
//! The budget only counts discarded reads (including read timeouts). Once
//! the first content byte is in hand, the remaining 14 bytes are read
//! unconditionally, so one call performs at most `budget + 16` reads.

use std::time::Duration;

use tracing::{debug, trace};

use super::config::AcquisitionConfig;
use crate::protocol::layout;
use crate::protocol::reader::RawFrame;
use crate::source::{ByteSource, ReadError};

#[derive(Debug)]
pub enum SyncError {
    /// Budget spent before a frame could be anchored.
    Timeout { budget: usize },
    /// A read timed out after `collected` frame bytes were in hand.
    Incomplete { collected: usize },
    Exhausted,
    Io(std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct FrameSynchronizer {
    budget: usize,
    read_timeout: Duration,
}

impl FrameSynchronizer {
    pub fn new(config: &AcquisitionConfig) -> Self {
        Self {
            budget: config.byte_budget(),
            read_timeout: config.read_timeout(),
        }
    }

    /// Collect the next 16-byte frame, starting with a single start word.
    ///
    /// # Errors
    /// `SyncError::Timeout` when the budget runs out, `Incomplete` when the
    /// line goes quiet mid-frame, `Exhausted`/`Io` when the source ends.
    pub fn synchronize<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<RawFrame, SyncError> {
        let mut discarded = 0usize;

        loop {
            if discarded >= self.budget {
                return Err(SyncError::Timeout {
                    budget: self.budget,
                });
            }
            match self.next_byte(source)? {
                Some(layout::START_WORD) => break,
                Some(byte) => trace!(byte, "discarding byte before start word"),
                None => trace!("read timed out while hunting for start word"),
            }
            discarded += 1;
        }

        let first = loop {
            if discarded >= self.budget {
                return Err(SyncError::Timeout {
                    budget: self.budget,
                });
            }
            match self.next_byte(source)? {
                Some(layout::START_WORD) | None => discarded += 1,
                Some(byte) => break byte,
            }
        };

        let mut frame = [0u8; layout::FRAME_LEN];
        frame[0] = layout::START_WORD;
        frame[1] = first;
        for collected in 2..layout::FRAME_LEN {
            frame[collected] = self
                .next_byte(source)?
                .ok_or(SyncError::Incomplete { collected })?;
        }

        debug!(discarded, "frame synchronized");
        Ok(RawFrame::new(frame))
    }

    fn next_byte<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<Option<u8>, SyncError> {
        match source.read_byte(self.read_timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(ReadError::Timeout) => Ok(None),
            Err(ReadError::Exhausted) => Err(SyncError::Exhausted),
            Err(ReadError::Io(err)) => Err(SyncError::Io(err)),
        }
    }
}
