use thiserror::Error;

use crate::protocol::DecodeError;
use crate::source::SourceError;

/// Why one acquisition attempt produced no reading.
///
/// All variants are local to a single iteration; the loop keeps running.
///
/// # Examples
/// ```
/// use peaktech_core::FrameError;
///
/// let err = FrameError::SynchronizationTimeout { budget: 32 };
/// assert_eq!(err.id(), "PT-SYNC-TIMEOUT");
/// assert!(err.to_string().contains("32 bytes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("no frame start found within {budget} bytes")]
    SynchronizationTimeout { budget: usize },
    #[error("frame incomplete: read timed out after {collected} of 16 bytes")]
    IncompleteFrame { collected: usize },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FrameError {
    /// Stable identifier used to group rejections in reports.
    pub fn id(&self) -> &'static str {
        match self {
            FrameError::SynchronizationTimeout { .. } => "PT-SYNC-TIMEOUT",
            FrameError::IncompleteFrame { .. } => "PT-INCOMPLETE-FRAME",
            FrameError::Decode(DecodeError::FrameLength { .. }) => "PT-FRAME-LENGTH",
            FrameError::Decode(DecodeError::FrameTerminatorMismatch { .. }) => {
                "PT-TERMINATOR-MISMATCH"
            }
            FrameError::Decode(DecodeError::FieldRange { .. }) => "PT-FIELD-RANGE",
            FrameError::Decode(DecodeError::UnknownAnnunciatorCode { .. }) => {
                "PT-UNKNOWN-ANNUNCIATOR"
            }
        }
    }

    /// One-line description of the rejection class.
    pub fn summary(&self) -> &'static str {
        match self {
            FrameError::SynchronizationTimeout { .. } => "No start word within the byte budget",
            FrameError::IncompleteFrame { .. } => "Read timed out inside a frame",
            FrameError::Decode(DecodeError::FrameLength { .. }) => "Frame is not 16 bytes",
            FrameError::Decode(DecodeError::FrameTerminatorMismatch { .. }) => {
                "Start or end word in the wrong place"
            }
            FrameError::Decode(DecodeError::FieldRange { .. }) => "Field outside its allowed values",
            FrameError::Decode(DecodeError::UnknownAnnunciatorCode { .. }) => {
                "Annunciator code not in the unit table"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("synchronization byte budget must be at least 1")]
    ZeroBudget,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}
