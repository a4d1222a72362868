use std::ops::Range;

use super::error::DecodeError;
use super::layout;

/// Sixteen bytes exactly as they arrived on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFrame([u8; layout::FRAME_LEN]);

impl RawFrame {
    pub fn new(bytes: [u8; layout::FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a frame from an arbitrary slice.
    ///
    /// # Errors
    /// Returns `DecodeError::FrameLength` unless the slice holds exactly
    /// 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; layout::FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| DecodeError::FrameLength {
                actual: bytes.len(),
            })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; layout::FRAME_LEN] {
        &self.0
    }

    /// Wire-to-logical transform.
    ///
    /// The device transmits the last logical field first, so the logical
    /// view is the wire sequence reversed.
    ///
    /// # Examples
    /// ```
    /// use peaktech_core::RawFrame;
    ///
    /// let mut wire = [b'0'; 16];
    /// wire[0] = 0x02;
    /// wire[15] = b'\r';
    /// let logical = RawFrame::new(wire).to_logical();
    /// assert_eq!(logical.as_bytes()[0], b'\r');
    /// assert_eq!(logical.as_bytes()[15], 0x02);
    /// ```
    pub fn to_logical(&self) -> LogicalFrame {
        let mut bytes = self.0;
        bytes.reverse();
        LogicalFrame(bytes)
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = DecodeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(value)
    }
}

/// A frame in manual order: position 0 is the end word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalFrame([u8; layout::FRAME_LEN]);

impl LogicalFrame {
    pub fn new(bytes: [u8; layout::FRAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; layout::FRAME_LEN] {
        &self.0
    }

    /// Logical-to-wire transform, the inverse of [`RawFrame::to_logical`].
    pub fn to_wire(&self) -> RawFrame {
        let mut bytes = self.0;
        bytes.reverse();
        RawFrame(bytes)
    }
}

/// Field access over a logical frame.
///
/// Multi-byte fields were transmitted least significant character first, so
/// after the whole-frame reversal they still read backwards; `read_field`
/// undoes that second reversal.
pub struct FrameReader<'a> {
    frame: &'a LogicalFrame,
}

impl<'a> FrameReader<'a> {
    pub fn new(frame: &'a LogicalFrame) -> Self {
        Self { frame }
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.frame.0[offset]
    }

    pub fn read_field<const N: usize>(&self, range: Range<usize>) -> [u8; N] {
        debug_assert_eq!(range.len(), N);
        let mut field = [0u8; N];
        field.copy_from_slice(&self.frame.0[range]);
        field.reverse();
        field
    }
}

/// Inverse of [`FrameReader`], used to assemble logical frames.
pub struct FrameWriter {
    bytes: [u8; layout::FRAME_LEN],
}

impl FrameWriter {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; layout::FRAME_LEN],
        }
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> &mut Self {
        self.bytes[offset] = value;
        self
    }

    pub fn write_field<const N: usize>(&mut self, range: Range<usize>, value: [u8; N]) -> &mut Self {
        debug_assert_eq!(range.len(), N);
        let mut field = value;
        field.reverse();
        self.bytes[range].copy_from_slice(&field);
        self
    }

    pub fn finish(&self) -> LogicalFrame {
        LogicalFrame(self.bytes)
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}
