use std::time::Duration;

use super::{ByteSource, ReadError};

/// What a replayed capture does once every byte has been handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfCapture {
    /// Report `ReadError::Exhausted`, ending acquisition.
    #[default]
    Exhausted,
    /// Time out on every read, like a serial line that went quiet.
    ///
    /// Time is simulated: the timeout is reported at once without sleeping.
    Idle,
}

/// In-memory replay of recorded bytes.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use peaktech_core::{ByteSource, ReadError, ReplaySource};
///
/// let mut source = ReplaySource::new(vec![0x02]);
/// assert_eq!(source.read_byte(Duration::ZERO).unwrap(), 0x02);
/// assert!(matches!(source.read_byte(Duration::ZERO), Err(ReadError::Exhausted)));
/// ```
#[derive(Debug, Clone)]
pub struct ReplaySource {
    bytes: Vec<u8>,
    position: usize,
    at_end: EndOfCapture,
    reads: u64,
}

impl ReplaySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_end(bytes, EndOfCapture::Exhausted)
    }

    pub fn idle(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with_end(bytes, EndOfCapture::Idle)
    }

    pub fn with_end(bytes: impl Into<Vec<u8>>, at_end: EndOfCapture) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
            at_end,
            reads: 0,
        }
    }

    /// Bytes handed out so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Every `read_byte` call, including timeouts and exhaustion.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl ByteSource for ReplaySource {
    fn read_byte(&mut self, _timeout: Duration) -> Result<u8, ReadError> {
        self.reads += 1;
        match self.bytes.get(self.position) {
            Some(&byte) => {
                self.position += 1;
                Ok(byte)
            }
            None => match self.at_end {
                EndOfCapture::Exhausted => Err(ReadError::Exhausted),
                EndOfCapture::Idle => Err(ReadError::Timeout),
            },
        }
    }
}
