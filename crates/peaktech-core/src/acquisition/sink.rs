use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, SyncSender};

use thiserror::Error;

use crate::acquisition::error::FrameError;
use crate::reading::Reading;

/// One outcome per acquisition iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    Reading(Reading),
    Rejected(FrameError),
    /// The source will never produce another byte; acquisition ends.
    SourceExhausted,
    /// The source failed with a non-recoverable I/O error; acquisition ends.
    SourceFailed(String),
}

impl AcquisitionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AcquisitionEvent::SourceExhausted | AcquisitionEvent::SourceFailed(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Receiver of acquisition events.
///
/// Implementations must not block indefinitely; returning `SinkClosed` ends
/// the loop.
pub trait EventSink {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed>;
}

impl<K: EventSink + ?Sized> EventSink for &mut K {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed> {
        (**self).accept(event)
    }
}

impl EventSink for Vec<AcquisitionEvent> {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

impl EventSink for Sender<AcquisitionEvent> {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

impl EventSink for SyncSender<AcquisitionEvent> {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

/// Adapter turning a closure into a sink.
pub struct FnSink<F>(F);

pub fn sink_fn<F: FnMut(AcquisitionEvent)>(f: F) -> FnSink<F> {
    FnSink(f)
}

impl<F: FnMut(AcquisitionEvent)> EventSink for FnSink<F> {
    fn accept(&mut self, event: AcquisitionEvent) -> Result<(), SinkClosed> {
        (self.0)(event);
        Ok(())
    }
}

/// Cooperative stop flag shared between the loop and its controller.
///
/// The loop checks it between iterations only, so a frame in progress
/// always completes or times out first.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
