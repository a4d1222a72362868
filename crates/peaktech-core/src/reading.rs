//! Decoded measurement values.
//!
//! Every type here validates on construction, so a `Reading` that exists is
//! a reading the instrument could have displayed.

use std::fmt;

use crate::protocol::annunciator::Annunciator;
use crate::protocol::error::{DecodeError, FrameField};
use crate::protocol::layout;

/// Sign of the displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// `'0'` is positive; the device uses any other character for negative.
    pub fn from_wire(value: u8) -> Self {
        if value == layout::POLARITY_POSITIVE {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Polarity::Positive => layout::POLARITY_POSITIVE,
            Polarity::Negative => layout::POLARITY_NEGATIVE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }
}

/// Number of trailing digits after the decimal separator (0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecimalPoint(u8);

impl DecimalPoint {
    pub fn new(places: u8) -> Option<Self> {
        (places <= layout::DECIMAL_POINT_MAX).then_some(Self(places))
    }

    /// Parse the ASCII digit carried on the wire.
    ///
    /// # Errors
    /// Returns `DecodeError::FieldRange` for anything outside `'0'..='3'`.
    pub fn from_wire(value: u8) -> Result<Self, DecodeError> {
        value
            .checked_sub(b'0')
            .and_then(Self::new)
            .ok_or(DecodeError::FieldRange {
                field: FrameField::DecimalPoint,
                value,
            })
    }

    pub fn places(self) -> u8 {
        self.0
    }

    pub fn to_wire(self) -> u8 {
        b'0' + self.0
    }
}

/// Instrument display channel (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(u8);

impl DisplayId {
    pub fn new(id: u8) -> Option<Self> {
        (layout::DISPLAY_ID_MIN..=layout::DISPLAY_ID_MAX)
            .contains(&id)
            .then_some(Self(id))
    }

    /// Parse the ASCII digit carried on the wire.
    ///
    /// # Errors
    /// Returns `DecodeError::FieldRange` for anything outside `'1'..='4'`.
    pub fn from_wire(value: u8) -> Result<Self, DecodeError> {
        value
            .checked_sub(b'0')
            .and_then(Self::new)
            .ok_or(DecodeError::FieldRange {
                field: FrameField::DisplayId,
                value,
            })
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn to_wire(self) -> u8 {
        b'0' + self.0
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One decoded display reading.
///
/// # Examples
/// ```
/// use peaktech_core::{Annunciator, DecimalPoint, DisplayId, Polarity, Reading};
///
/// let reading = Reading::new(
///     *b"00002305",
///     DecimalPoint::new(1).unwrap(),
///     Polarity::Negative,
///     Annunciator::from_code(*b"50").unwrap(),
///     DisplayId::new(3).unwrap(),
/// )
/// .unwrap();
/// assert_eq!(reading.display_reading(), "-0000230.5");
/// assert_eq!(reading.unit(), "ACV");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reading {
    digits: [u8; layout::DISPLAY_DIGITS_LEN],
    decimal_point: DecimalPoint,
    polarity: Polarity,
    annunciator: Annunciator,
    display: DisplayId,
}

impl Reading {
    /// # Errors
    /// Returns `DecodeError::FieldRange` on the first digit that is not an
    /// ASCII decimal digit.
    pub fn new(
        digits: [u8; layout::DISPLAY_DIGITS_LEN],
        decimal_point: DecimalPoint,
        polarity: Polarity,
        annunciator: Annunciator,
        display: DisplayId,
    ) -> Result<Self, DecodeError> {
        if let Some(&value) = digits.iter().find(|b| !b.is_ascii_digit()) {
            return Err(DecodeError::FieldRange {
                field: FrameField::DisplayDigits,
                value,
            });
        }
        Ok(Self {
            digits,
            decimal_point,
            polarity,
            annunciator,
            display,
        })
    }

    /// Sign, digits and decimal separator, e.g. `-0000230.5`.
    pub fn display_reading(&self) -> String {
        let raw = self.display_reading_raw();
        let places = self.decimal_point.places() as usize;
        let mut out = String::with_capacity(raw.len() + 2);
        if self.polarity == Polarity::Negative {
            out.push('-');
        }
        if places == 0 {
            out.push_str(raw);
        } else {
            let split = raw.len() - places;
            out.push_str(&raw[..split]);
            out.push('.');
            out.push_str(&raw[split..]);
        }
        out
    }

    /// The eight digits exactly as displayed, without sign or separator.
    pub fn display_reading_raw(&self) -> &str {
        // digits are validated ASCII at construction
        std::str::from_utf8(&self.digits).unwrap_or_default()
    }

    /// Numeric value of [`Reading::display_reading`].
    pub fn value(&self) -> f64 {
        let magnitude = self
            .digits
            .iter()
            .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0')) as f64
            / 10f64.powi(i32::from(self.decimal_point.places()));
        match self.polarity {
            Polarity::Positive => magnitude,
            Polarity::Negative => -magnitude,
        }
    }

    pub fn digits(&self) -> &[u8; layout::DISPLAY_DIGITS_LEN] {
        &self.digits
    }

    pub fn decimal_point(&self) -> DecimalPoint {
        self.decimal_point
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn annunciator(&self) -> Annunciator {
        self.annunciator
    }

    pub fn unit(&self) -> &'static str {
        self.annunciator.unit()
    }

    pub fn display(&self) -> DisplayId {
        self.display
    }
}
