use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::protocol::decode_frame;
use crate::source::{ByteSource, CaptureFormat, ReadError, open_capture};
use crate::{CaptureReport, InputInfo};

mod config;
mod error;
mod report;
mod sink;
mod sync;

pub use config::{AcquisitionConfig, DEFAULT_READ_TIMEOUT};
pub use error::{AnalysisError, ConfigError, FrameError};
pub use report::ReportBuilder;
pub use sink::{AcquisitionEvent, EventSink, FnSink, SinkClosed, StopSignal, sink_fn};
pub use sync::{FrameSynchronizer, SyncError};

/// Why [`AcquisitionLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    SourceExhausted,
    SourceFailed,
    SinkClosed,
}

impl LoopExit {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopExit::Stopped => "stopped",
            LoopExit::SourceExhausted => "source_exhausted",
            LoopExit::SourceFailed => "source_failed",
            LoopExit::SinkClosed => "sink_closed",
        }
    }

    // Only meaningful for events where `is_terminal()` holds.
    fn after(event: &AcquisitionEvent) -> Self {
        match event {
            AcquisitionEvent::SourceFailed(_) => LoopExit::SourceFailed,
            _ => LoopExit::SourceExhausted,
        }
    }
}

/// Running totals kept by the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub iterations: u64,
    pub readings: u64,
    pub rejected: u64,
    pub bytes_read: u64,
}

/// Repeated synchronize-then-decode over one byte source.
///
/// Nothing carries over between iterations except the source's read
/// position: a rejected frame is dropped and the next iteration scans fresh
/// from the following byte.
///
/// # Examples
/// ```
/// use peaktech_core::{AcquisitionConfig, AcquisitionEvent, AcquisitionLoop, LoopExit, ReplaySource};
///
/// let source = ReplaySource::new(b"\x02\x0203500100002305\r".to_vec());
/// let mut acquisition = AcquisitionLoop::new(source, AcquisitionConfig::default());
/// let mut events = Vec::new();
/// assert_eq!(acquisition.run(&mut events), LoopExit::SourceExhausted);
/// assert!(matches!(events[0], AcquisitionEvent::Reading(_)));
/// assert_eq!(events[1], AcquisitionEvent::SourceExhausted);
/// ```
pub struct AcquisitionLoop<S> {
    source: S,
    synchronizer: FrameSynchronizer,
    stop: StopSignal,
    stats: AcquisitionStats,
}

impl<S: ByteSource> AcquisitionLoop<S> {
    pub fn new(source: S, config: AcquisitionConfig) -> Self {
        Self {
            source,
            synchronizer: FrameSynchronizer::new(&config),
            stop: StopSignal::new(),
            stats: AcquisitionStats::default(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for stopping the loop from another thread.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Run one iteration and return its outcome.
    pub fn step(&mut self) -> AcquisitionEvent {
        self.stats.iterations += 1;
        let mut counted = CountingSource {
            inner: &mut self.source,
            bytes_read: &mut self.stats.bytes_read,
        };

        let frame = match self.synchronizer.synchronize(&mut counted) {
            Ok(frame) => frame,
            Err(SyncError::Timeout { budget }) => {
                return self.reject(FrameError::SynchronizationTimeout { budget });
            }
            Err(SyncError::Incomplete { collected }) => {
                return self.reject(FrameError::IncompleteFrame { collected });
            }
            Err(SyncError::Exhausted) => {
                debug!(bytes_read = self.stats.bytes_read, "byte source exhausted");
                return AcquisitionEvent::SourceExhausted;
            }
            Err(SyncError::Io(err)) => {
                warn!(error = %err, "byte source failed");
                return AcquisitionEvent::SourceFailed(err.to_string());
            }
        };

        match decode_frame(&frame) {
            Ok(reading) => {
                self.stats.readings += 1;
                AcquisitionEvent::Reading(reading)
            }
            Err(err) => self.reject(err.into()),
        }
    }

    /// Iterate until stopped, the source ends, or the sink closes.
    ///
    /// The stop signal is checked before each iteration, never mid-frame.
    pub fn run<K: EventSink + ?Sized>(&mut self, sink: &mut K) -> LoopExit {
        loop {
            if self.stop.is_stopped() {
                debug!(iterations = self.stats.iterations, "acquisition stopped");
                return LoopExit::Stopped;
            }
            let event = self.step();
            let exit = event.is_terminal().then(|| LoopExit::after(&event));
            if sink.accept(event).is_err() {
                return LoopExit::SinkClosed;
            }
            if let Some(exit) = exit {
                return exit;
            }
        }
    }

    fn reject(&mut self, err: FrameError) -> AcquisitionEvent {
        self.stats.rejected += 1;
        warn!(id = err.id(), error = %err, "frame rejected");
        AcquisitionEvent::Rejected(err)
    }
}

struct CountingSource<'a, S: ?Sized> {
    inner: &'a mut S,
    bytes_read: &'a mut u64,
}

impl<S: ByteSource + ?Sized> ByteSource for CountingSource<'_, S> {
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, ReadError> {
        let byte = self.inner.read_byte(timeout)?;
        *self.bytes_read += 1;
        Ok(byte)
    }
}

/// Decode a recorded capture file to exhaustion.
///
/// # Errors
/// Returns `AnalysisError::Source` when the capture cannot be loaded.
pub fn decode_capture_file(
    path: &Path,
    format: CaptureFormat,
    config: AcquisitionConfig,
) -> Result<CaptureReport, AnalysisError> {
    let source = open_capture(path, format)?;
    let input = InputInfo {
        path: path.display().to_string(),
        format: format.as_str().to_string(),
    };
    Ok(decode_source(input, source, config))
}

/// Run the acquisition loop over `source` and aggregate every event.
///
/// The source must eventually exhaust or fail; an idle source never ends.
pub fn decode_source<S: ByteSource>(
    input: InputInfo,
    source: S,
    config: AcquisitionConfig,
) -> CaptureReport {
    let mut acquisition = AcquisitionLoop::new(source, config);
    let mut builder = ReportBuilder::new();
    let exit = acquisition.run(&mut builder);
    builder.finish(input, &config, acquisition.stats(), exit)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use super::{AcquisitionConfig, AcquisitionEvent, AcquisitionLoop, FrameError, LoopExit};
    use crate::protocol::{DecodeError, FrameField};
    use crate::source::{ByteSource, ReadError, ReplaySource};

    const FRAME: &[u8; 16] = b"\x0203500100002305\r";

    fn run_all(bytes: Vec<u8>) -> (Vec<AcquisitionEvent>, LoopExit) {
        let mut acquisition = AcquisitionLoop::new(ReplaySource::new(bytes), AcquisitionConfig::default());
        let mut events = Vec::new();
        let exit = acquisition.run(&mut events);
        (events, exit)
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let mut second = *FRAME;
        second[2] = b'4';
        let (events, exit) = run_all([&FRAME[..], &second[..]].concat());
        assert_eq!(exit, LoopExit::SourceExhausted);
        assert_eq!(events.len(), 3);
        let displays: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                AcquisitionEvent::Reading(r) => Some(r.display().get()),
                _ => None,
            })
            .collect();
        assert_eq!(displays, vec![3, 4]);
    }

    #[test]
    fn bad_frame_does_not_stop_the_loop() {
        let mut bad = *FRAME;
        bad[2] = b'7';
        let (events, exit) = run_all([&bad[..], &FRAME[..]].concat());
        assert_eq!(exit, LoopExit::SourceExhausted);
        assert_eq!(
            events[0],
            AcquisitionEvent::Rejected(FrameError::Decode(DecodeError::FieldRange {
                field: FrameField::DisplayId,
                value: b'7',
            }))
        );
        assert!(matches!(events[1], AcquisitionEvent::Reading(_)));
        assert_eq!(events[2], AcquisitionEvent::SourceExhausted);
    }

    #[test]
    fn rejected_frame_is_not_retried() {
        let mut bad = *FRAME;
        bad[15] = b'\n';
        let (events, _) = run_all([&bad[..], &FRAME[..]].concat());
        assert!(matches!(
            events[0],
            AcquisitionEvent::Rejected(FrameError::Decode(
                DecodeError::FrameTerminatorMismatch { .. }
            ))
        ));
        assert!(matches!(events[1], AcquisitionEvent::Reading(_)));
    }

    #[test]
    fn timeouts_are_recoverable() {
        let config = AcquisitionConfig::default().with_byte_budget(4).unwrap();
        let source = ReplaySource::new([&b"garbage!"[..], &FRAME[..]].concat());
        let mut acquisition = AcquisitionLoop::new(source, config);
        assert_eq!(
            acquisition.step(),
            AcquisitionEvent::Rejected(FrameError::SynchronizationTimeout { budget: 4 })
        );
        assert!(matches!(
            acquisition.step(),
            AcquisitionEvent::Rejected(FrameError::SynchronizationTimeout { .. })
        ));
        assert!(matches!(acquisition.step(), AcquisitionEvent::Reading(_)));
        let stats = acquisition.stats();
        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.readings, 1);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.bytes_read, 24);
    }

    #[test]
    fn stop_signal_is_checked_before_each_iteration() {
        let mut acquisition =
            AcquisitionLoop::new(ReplaySource::idle(Vec::new()), AcquisitionConfig::default());
        let stop = acquisition.stop_signal();
        let mut events = Vec::new();
        let mut sink = super::sink_fn(|event| {
            events.push(event);
            if events.len() == 3 {
                stop.stop();
            }
        });
        assert_eq!(acquisition.run(&mut sink), LoopExit::Stopped);
        drop(sink);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| matches!(
            e,
            AcquisitionEvent::Rejected(FrameError::SynchronizationTimeout { budget: 32 })
        )));
    }

    #[test]
    fn closed_sink_ends_the_loop() {
        let (tx, rx) = std::sync::mpsc::channel();
        drop(rx);
        let mut tx = tx;
        let mut acquisition =
            AcquisitionLoop::new(ReplaySource::new(FRAME.to_vec()), AcquisitionConfig::default());
        assert_eq!(acquisition.run(&mut tx), LoopExit::SinkClosed);
    }

    struct Failing;

    impl ByteSource for Failing {
        fn read_byte(&mut self, _timeout: Duration) -> Result<u8, ReadError> {
            Err(ReadError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")))
        }
    }

    #[test]
    fn io_failure_ends_the_loop() {
        let mut acquisition = AcquisitionLoop::new(Failing, AcquisitionConfig::default());
        let mut events = Vec::new();
        assert_eq!(acquisition.run(&mut events), LoopExit::SourceFailed);
        assert_eq!(events, vec![AcquisitionEvent::SourceFailed("unplugged".to_string())]);
    }

    #[test]
    fn loop_is_restartable_over_a_fresh_source() {
        for _ in 0..2 {
            let (events, exit) = run_all(FRAME.to_vec());
            assert_eq!(exit, LoopExit::SourceExhausted);
            assert!(matches!(events[0], AcquisitionEvent::Reading(_)));
        }
    }

    #[test]
    fn worker_thread_hands_events_over_a_channel() {
        let (tx, rx) = std::sync::mpsc::channel();
        let bytes = [&FRAME[..], &FRAME[..]].concat();
        let worker = std::thread::spawn(move || {
            let mut tx = tx;
            AcquisitionLoop::new(ReplaySource::new(bytes), AcquisitionConfig::default())
                .run(&mut tx)
        });
        let received: Vec<_> = rx.iter().collect();
        assert_eq!(worker.join().unwrap(), LoopExit::SourceExhausted);
        assert_eq!(received.len(), 3);
    }
}
