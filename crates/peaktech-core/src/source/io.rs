use std::io::{self, ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use super::{ByteSource, ReadError};

const CHUNK_LEN: usize = 256;
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);

type Chunk = io::Result<Vec<u8>>;

/// Byte source over any [`Read`] implementation.
///
/// A reader thread pulls chunks off the reader and hands them over a
/// channel, so `read_byte` returns `ReadError::Timeout` once `timeout`
/// elapses even while the reader itself is blocked. End of stream maps to
/// `ReadError::Exhausted`. `Interrupted`, `TimedOut` and `WouldBlock` are
/// retried on the reader thread.
///
/// Dropping the source detaches the reader thread; it exits after its
/// pending read returns.
pub struct IoSource {
    chunks: Receiver<Chunk>,
    pending: Vec<u8>,
    cursor: usize,
}

impl IoSource {
    /// # Errors
    /// Returns the OS error when the reader thread cannot be spawned.
    pub fn new<R: Read + Send + 'static>(reader: R) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("peaktech-reader".to_string())
            .spawn(move || pump(reader, tx))?;
        Ok(Self {
            chunks: rx,
            pending: Vec::new(),
            cursor: 0,
        })
    }
}

impl ByteSource for IoSource {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, ReadError> {
        if self.cursor >= self.pending.len() {
            match self.chunks.recv_timeout(timeout) {
                Ok(Ok(chunk)) => {
                    self.pending = chunk;
                    self.cursor = 0;
                }
                Ok(Err(err)) => return Err(ReadError::Io(err)),
                Err(RecvTimeoutError::Timeout) => return Err(ReadError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(ReadError::Exhausted),
            }
        }
        let byte = self.pending.get(self.cursor).copied().ok_or(ReadError::Timeout)?;
        self.cursor += 1;
        Ok(byte)
    }
}

// Chunks sent are never empty; a hard error is sent once and ends the pump.
fn pump<R: Read>(mut reader: R, tx: Sender<Chunk>) {
    let mut buf = [0u8; CHUNK_LEN];
    loop {
        let chunk = match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::TimedOut) => {
                continue;
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(WOULD_BLOCK_BACKOFF);
                continue;
            }
            Err(err) => Err(err),
        };
        let failed = chunk.is_err();
        if tx.send(chunk).is_err() || failed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, ErrorKind, Read};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::IoSource;
    use crate::source::{ByteSource, ReadError};

    const PATIENT: Duration = Duration::from_secs(5);

    struct Scripted {
        steps: Vec<io::Result<u8>>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            match self.steps.remove(0) {
                Ok(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                Err(err) => Err(err),
            }
        }
    }

    /// Blocks until the paired sender is dropped, like a quiet serial line.
    struct Stalled(mpsc::Receiver<()>);

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[test]
    fn reads_cursor_to_exhaustion() {
        let mut source = IoSource::new(Cursor::new(vec![1u8, 2])).unwrap();
        assert_eq!(source.read_byte(PATIENT).unwrap(), 1);
        assert_eq!(source.read_byte(PATIENT).unwrap(), 2);
        assert!(matches!(source.read_byte(PATIENT), Err(ReadError::Exhausted)));
        assert!(matches!(source.read_byte(PATIENT), Err(ReadError::Exhausted)));
    }

    #[test]
    fn transient_errors_are_retried_and_hard_errors_surface() {
        let mut source = IoSource::new(Scripted {
            steps: vec![
                Err(ErrorKind::Interrupted.into()),
                Ok(9),
                Err(ErrorKind::TimedOut.into()),
                Err(ErrorKind::WouldBlock.into()),
                Ok(7),
                Err(ErrorKind::BrokenPipe.into()),
            ],
        })
        .unwrap();
        assert_eq!(source.read_byte(PATIENT).unwrap(), 9);
        assert_eq!(source.read_byte(PATIENT).unwrap(), 7);
        assert!(matches!(source.read_byte(PATIENT), Err(ReadError::Io(_))));
        assert!(matches!(source.read_byte(PATIENT), Err(ReadError::Exhausted)));
    }

    #[test]
    fn blocked_reader_times_out_within_the_bound() {
        let (_hold, rx) = mpsc::channel();
        let mut source = IoSource::new(Stalled(rx)).unwrap();

        let started = Instant::now();
        let result = source.read_byte(Duration::from_millis(10));
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(ReadError::Timeout)));
        assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    }

    #[test]
    fn bytes_arriving_after_a_timeout_are_still_delivered() {
        let (tx, rx) = mpsc::channel::<u8>();
        struct Fed(mpsc::Receiver<u8>);
        impl Read for Fed {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.recv() {
                    Ok(byte) => {
                        buf[0] = byte;
                        Ok(1)
                    }
                    Err(_) => Ok(0),
                }
            }
        }
        let mut source = IoSource::new(Fed(rx)).unwrap();

        assert!(matches!(
            source.read_byte(Duration::from_millis(10)),
            Err(ReadError::Timeout)
        ));
        tx.send(0x02).unwrap();
        assert_eq!(source.read_byte(PATIENT).unwrap(), 0x02);
        drop(tx);
        assert!(matches!(source.read_byte(PATIENT), Err(ReadError::Exhausted)));
    }
}
