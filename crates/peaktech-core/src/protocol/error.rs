use std::fmt;

use thiserror::Error;

/// Frame field that failed domain validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameField {
    DisplayDigits,
    DecimalPoint,
    DisplayId,
}

impl FrameField {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameField::DisplayDigits => "display_digits",
            FrameField::DecimalPoint => "decimal_point",
            FrameField::DisplayId => "display_id",
        }
    }
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by frame decoding.
///
/// Every variant carries the raw value that failed, so a systematic wire
/// problem stays visible instead of being folded into a default reading.
///
/// # Examples
/// ```
/// use peaktech_core::{DecodeError, FrameField};
///
/// let err = DecodeError::FieldRange { field: FrameField::DisplayId, value: b'7' };
/// assert_eq!(err.to_string(), "display_id out of range: '7'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid frame length: need 16 bytes, got {actual}")]
    FrameLength { actual: usize },
    #[error(
        "frame terminator mismatch: end word {:#04x}, start word {:#04x}",
        .end,
        .start
    )]
    FrameTerminatorMismatch { end: u8, start: u8 },
    #[error("{field} out of range: '{}'", .value.escape_ascii())]
    FieldRange { field: FrameField, value: u8 },
    #[error("unknown annunciator code '{}'", .code.escape_ascii())]
    UnknownAnnunciatorCode { code: [u8; 2] },
}
