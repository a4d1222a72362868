//! Byte sources feeding the synchronizer.
//!
//! The core never opens a device. Anything that can hand over one byte at a
//! time implements [`ByteSource`]; the providers here replay recorded
//! captures or wrap an already-open reader.

mod capture;
mod io;
mod replay;

use std::time::Duration;

use thiserror::Error;

pub use capture::{CaptureFormat, load_capture, open_capture, parse_repr_capture};
pub use io::IoSource;
pub use replay::{EndOfCapture, ReplaySource};

/// Outcome of a single failed `read_byte`.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Nothing arrived within the timeout; the source may still produce bytes.
    #[error("read timed out")]
    Timeout,
    /// The source will never produce another byte.
    #[error("byte source exhausted")]
    Exhausted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A one-way byte stream, read one byte at a time.
pub trait ByteSource {
    /// Block for at most `timeout` waiting for the next byte.
    ///
    /// Returns `ReadError::Timeout` when nothing arrived in time. The source
    /// stays usable afterwards.
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, ReadError>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, ReadError> {
        (**self).read_byte(timeout)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, ReadError> {
        (**self).read_byte(timeout)
    }
}

/// Errors raised while loading a recorded capture.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture parse error at offset {offset}: {message}")]
    Capture { offset: usize, message: String },
}
