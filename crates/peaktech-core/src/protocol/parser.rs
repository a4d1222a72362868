use tracing::debug;

use super::annunciator::Annunciator;
use super::error::DecodeError;
use super::layout;
use super::reader::{FrameReader, FrameWriter, RawFrame};
use crate::reading::{DecimalPoint, DisplayId, Polarity, Reading};

/// Frame fields in logical order, not yet validated.
///
/// Multi-character fields are in reading order (most significant first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedFields {
    pub end_word: u8,
    pub display_digits: [u8; layout::DISPLAY_DIGITS_LEN],
    pub decimal_point: u8,
    pub polarity_bit: u8,
    pub annunciator_code: [u8; layout::ANNUNCIATOR_CODE_LEN],
    pub display_id: u8,
    pub d14: u8,
    pub start_word: u8,
}

impl ParsedFields {
    /// Slice a wire frame into its fields.
    pub fn from_raw(raw: &RawFrame) -> Self {
        let logical = raw.to_logical();
        let reader = FrameReader::new(&logical);
        Self {
            end_word: reader.read_u8(layout::END_WORD_OFFSET),
            display_digits: reader.read_field(layout::DISPLAY_DIGITS_RANGE),
            decimal_point: reader.read_u8(layout::DECIMAL_POINT_OFFSET),
            polarity_bit: reader.read_u8(layout::POLARITY_OFFSET),
            annunciator_code: reader.read_field(layout::ANNUNCIATOR_RANGE),
            display_id: reader.read_u8(layout::DISPLAY_ID_OFFSET),
            d14: reader.read_u8(layout::RESERVED_OFFSET),
            start_word: reader.read_u8(layout::START_WORD_OFFSET),
        }
    }

    /// Assemble the wire frame carrying these fields.
    pub fn to_raw(&self) -> RawFrame {
        FrameWriter::new()
            .write_u8(layout::END_WORD_OFFSET, self.end_word)
            .write_field(layout::DISPLAY_DIGITS_RANGE, self.display_digits)
            .write_u8(layout::DECIMAL_POINT_OFFSET, self.decimal_point)
            .write_u8(layout::POLARITY_OFFSET, self.polarity_bit)
            .write_field(layout::ANNUNCIATOR_RANGE, self.annunciator_code)
            .write_u8(layout::DISPLAY_ID_OFFSET, self.display_id)
            .write_u8(layout::RESERVED_OFFSET, self.d14)
            .write_u8(layout::START_WORD_OFFSET, self.start_word)
            .finish()
            .to_wire()
    }

    /// Fields for a reading, with standard start/end words and `d14 = '0'`.
    pub fn from_reading(reading: &Reading) -> Self {
        let code: [u8; layout::ANNUNCIATOR_CODE_LEN] = {
            let mut code = [0u8; layout::ANNUNCIATOR_CODE_LEN];
            code.copy_from_slice(reading.annunciator().code().as_bytes());
            code
        };
        Self {
            end_word: layout::END_WORD,
            display_digits: *reading.digits(),
            decimal_point: reading.decimal_point().to_wire(),
            polarity_bit: reading.polarity().to_wire(),
            annunciator_code: code,
            display_id: reading.display().to_wire(),
            d14: b'0',
            start_word: layout::START_WORD,
        }
    }

    /// Validate every field and build the reading.
    ///
    /// Checks run in order: terminators, decimal point, annunciator, display
    /// id, display digits. The first failure wins.
    ///
    /// # Errors
    /// See [`DecodeError`].
    pub fn validate(&self) -> Result<Reading, DecodeError> {
        if self.end_word != layout::END_WORD || self.start_word != layout::START_WORD {
            return Err(DecodeError::FrameTerminatorMismatch {
                end: self.end_word,
                start: self.start_word,
            });
        }
        let decimal_point = DecimalPoint::from_wire(self.decimal_point)?;
        let polarity = Polarity::from_wire(self.polarity_bit);
        let annunciator = Annunciator::from_code(self.annunciator_code)?;
        let display = DisplayId::from_wire(self.display_id)?;
        Reading::new(
            self.display_digits,
            decimal_point,
            polarity,
            annunciator,
            display,
        )
    }
}

/// Decode one wire frame into a reading.
///
/// # Examples
/// ```
/// use peaktech_core::{Polarity, RawFrame, decode_frame};
///
/// let frame = RawFrame::new(*b"\x0203500100002305\r");
/// let reading = decode_frame(&frame).unwrap();
/// assert_eq!(reading.display_reading(), "0000230.5");
/// assert_eq!(reading.unit(), "ACV");
/// assert_eq!(reading.display().get(), 3);
/// assert_eq!(reading.polarity(), Polarity::Positive);
/// ```
///
/// # Errors
/// Returns a [`DecodeError`] naming the first field that failed.
pub fn decode_frame(raw: &RawFrame) -> Result<Reading, DecodeError> {
    let reading = ParsedFields::from_raw(raw).validate()?;
    debug!(
        display = reading.display().get(),
        value = %reading.display_reading(),
        unit = reading.unit(),
        "decoded frame"
    );
    Ok(reading)
}

/// Decode a frame from an arbitrary byte slice in wire order.
///
/// # Errors
/// Returns `DecodeError::FrameLength` unless the slice holds 16 bytes, then
/// behaves like [`decode_frame`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Reading, DecodeError> {
    decode_frame(&RawFrame::from_slice(bytes)?)
}

/// Encode a reading into the wire frame the instrument would send for it.
pub fn encode_reading(reading: &Reading) -> RawFrame {
    ParsedFields::from_reading(reading).to_raw()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{ParsedFields, decode_bytes, decode_frame, encode_reading};
    use crate::protocol::annunciator::ANNUNCIATOR_TABLE;
    use crate::protocol::error::{DecodeError, FrameField};
    use crate::protocol::layout;
    use crate::protocol::reader::RawFrame;
    use crate::reading::Polarity;

    // Display 3 showing 230.5 V AC.
    const REFERENCE: &[u8; 16] = b"\x0203500100002305\r";

    fn valid_fields() -> ParsedFields {
        ParsedFields::from_raw(&RawFrame::new(*REFERENCE))
    }

    fn decode_fields(fields: ParsedFields) -> Result<crate::Reading, DecodeError> {
        decode_frame(&fields.to_raw())
    }

    #[test]
    fn reference_frame_decodes() {
        let reading = decode_frame(&RawFrame::new(*REFERENCE)).unwrap();
        assert_eq!(reading.display_reading(), "0000230.5");
        assert_eq!(reading.display_reading_raw(), "00002305");
        assert_eq!(reading.decimal_point().places(), 1);
        assert_eq!(reading.polarity(), Polarity::Positive);
        assert_eq!(reading.unit(), "ACV");
        assert_eq!(reading.annunciator().code(), "50");
        assert_eq!(reading.display().get(), 3);
    }

    #[test]
    fn parsed_fields_follow_manual_layout() {
        let fields = valid_fields();
        assert_eq!(fields.end_word, layout::END_WORD);
        assert_eq!(&fields.display_digits, b"00002305");
        assert_eq!(fields.decimal_point, b'1');
        assert_eq!(fields.polarity_bit, b'0');
        assert_eq!(&fields.annunciator_code, b"50");
        assert_eq!(fields.display_id, b'3');
        assert_eq!(fields.d14, b'0');
        assert_eq!(fields.start_word, layout::START_WORD);
    }

    #[test]
    fn display_id_is_preserved() {
        for id in 1..=4u8 {
            let mut fields = valid_fields();
            fields.display_id = b'0' + id;
            assert_eq!(decode_fields(fields).unwrap().display().get(), id);
        }
    }

    #[test]
    fn display_id_out_of_range() {
        for value in [b'0', b'5', b'9', b'X'] {
            let mut fields = valid_fields();
            fields.display_id = value;
            assert_eq!(
                decode_fields(fields).unwrap_err(),
                DecodeError::FieldRange {
                    field: FrameField::DisplayId,
                    value,
                }
            );
        }
    }

    #[test]
    fn decimal_point_out_of_range() {
        let mut fields = valid_fields();
        fields.decimal_point = b'4';
        assert_eq!(
            decode_fields(fields).unwrap_err(),
            DecodeError::FieldRange {
                field: FrameField::DecimalPoint,
                value: b'4',
            }
        );
    }

    #[test]
    fn unknown_annunciator_is_surfaced() {
        let mut fields = valid_fields();
        fields.annunciator_code = *b"99";
        assert_eq!(
            decode_fields(fields).unwrap_err(),
            DecodeError::UnknownAnnunciatorCode { code: *b"99" }
        );
    }

    #[test]
    fn terminator_mismatch_on_either_end() {
        let mut bad_end = *REFERENCE;
        bad_end[15] = b'\n';
        assert_eq!(
            decode_frame(&RawFrame::new(bad_end)).unwrap_err(),
            DecodeError::FrameTerminatorMismatch {
                end: b'\n',
                start: layout::START_WORD,
            }
        );

        let mut bad_start = *REFERENCE;
        bad_start[0] = b'0';
        assert!(matches!(
            decode_frame(&RawFrame::new(bad_start)).unwrap_err(),
            DecodeError::FrameTerminatorMismatch { start: b'0', .. }
        ));
    }

    #[test]
    fn terminators_are_checked_before_fields() {
        let mut fields = valid_fields();
        fields.end_word = 0;
        fields.display_id = b'9';
        assert!(matches!(
            decode_fields(fields).unwrap_err(),
            DecodeError::FrameTerminatorMismatch { .. }
        ));
    }

    #[test]
    fn reserved_byte_is_not_validated() {
        let mut fields = valid_fields();
        fields.d14 = 0xff;
        assert!(decode_fields(fields).is_ok());
    }

    #[test]
    fn non_zero_polarity_is_negative() {
        let mut fields = valid_fields();
        fields.polarity_bit = b'8';
        let reading = decode_fields(fields).unwrap();
        assert_eq!(reading.display_reading(), "-0000230.5");
    }

    #[test]
    fn decode_bytes_checks_length() {
        assert_eq!(decode_bytes(&REFERENCE[..]).unwrap().unit(), "ACV");
        assert_eq!(
            decode_bytes(&[0u8; 17]).unwrap_err(),
            DecodeError::FrameLength { actual: 17 }
        );
    }

    #[test]
    fn encode_reading_reproduces_reference() {
        let reading = decode_frame(&RawFrame::new(*REFERENCE)).unwrap();
        assert_eq!(encode_reading(&reading).as_bytes(), REFERENCE);
    }

    fn valid_fields_strategy() -> impl Strategy<Value = ParsedFields> {
        (
            proptest::array::uniform8(b'0'..=b'9'),
            b'0'..=b'3',
            prop_oneof![Just(b'0'), Just(b'1')],
            0..ANNUNCIATOR_TABLE.len(),
            b'1'..=b'4',
            any::<u8>(),
        )
            .prop_map(|(digits, dp, pol, ann, display, d14)| {
                let mut code = [0u8; 2];
                code.copy_from_slice(ANNUNCIATOR_TABLE[ann].0.as_bytes());
                ParsedFields {
                    end_word: layout::END_WORD,
                    display_digits: digits,
                    decimal_point: dp,
                    polarity_bit: pol,
                    annunciator_code: code,
                    display_id: display,
                    d14,
                    start_word: layout::START_WORD,
                }
            })
    }

    proptest! {
        #[test]
        fn fields_round_trip_through_wire(fields in valid_fields_strategy()) {
            let raw = fields.to_raw();
            prop_assert_eq!(ParsedFields::from_raw(&raw), fields);
            let reading = decode_frame(&raw).unwrap();
            prop_assert_eq!(reading.digits(), &fields.display_digits);
            prop_assert_eq!(reading.display().to_wire(), fields.display_id);
            prop_assert_eq!(reading.decimal_point().to_wire(), fields.decimal_point);
        }

        #[test]
        fn decoding_never_panics(bytes in proptest::array::uniform16(any::<u8>())) {
            let _ = decode_frame(&RawFrame::new(bytes));
        }
    }
}
