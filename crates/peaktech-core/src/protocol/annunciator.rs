//! Unit annunciator lookup.
//!
//! The instrument reports the unit of each display as a two-character code.
//! The table is fixed by the device firmware and never changes at runtime.

use super::error::DecodeError;

/// Every known code with its unit label, in the order the manual lists them.
pub const ANNUNCIATOR_TABLE: [(&str, &str); 16] = [
    ("31", "HZ"),
    ("34", "DCV"),
    ("36", "DCA"),
    ("38", "OHM"),
    ("39", "KOHM"),
    ("47", "WATT"),
    ("48", "KWATT"),
    ("50", "ACV"),
    ("52", "ACA"),
    ("54", "POWER_FACTOR"),
    ("61", "HOUR"),
    ("62", "MINUTE"),
    ("63", "VA"),
    ("64", "KVA"),
    ("65", "KW/HR"),
    ("F2", "W/HR"),
];

/// Resolve a wire code to its table entry.
///
/// # Errors
/// Returns `DecodeError::UnknownAnnunciatorCode` when the code is not listed.
pub fn lookup_unit(code: [u8; 2]) -> Result<(&'static str, &'static str), DecodeError> {
    ANNUNCIATOR_TABLE
        .iter()
        .copied()
        .find(|(known, _)| known.as_bytes() == code)
        .ok_or(DecodeError::UnknownAnnunciatorCode { code })
}

/// A validated unit annunciator.
///
/// Construction is the only validation point; an `Annunciator` always refers
/// to a table entry.
///
/// # Examples
/// ```
/// use peaktech_core::Annunciator;
///
/// let ann = Annunciator::from_code(*b"47").unwrap();
/// assert_eq!(ann.unit(), "WATT");
/// assert!(Annunciator::from_code(*b"00").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Annunciator {
    code: &'static str,
    unit: &'static str,
}

impl Annunciator {
    pub fn from_code(code: [u8; 2]) -> Result<Self, DecodeError> {
        let (code, unit) = lookup_unit(code)?;
        Ok(Self { code, unit })
    }

    /// Two-character wire code, e.g. `"50"`.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Human-readable unit label, e.g. `"ACV"`.
    pub fn unit(&self) -> &'static str {
        self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::{ANNUNCIATOR_TABLE, Annunciator, lookup_unit};
    use crate::protocol::error::DecodeError;

    #[test]
    fn every_table_entry_resolves() {
        for (code, unit) in ANNUNCIATOR_TABLE {
            let bytes: [u8; 2] = code.as_bytes().try_into().unwrap();
            let ann = Annunciator::from_code(bytes).unwrap();
            assert_eq!(ann.code(), code);
            assert_eq!(ann.unit(), unit);
        }
    }

    #[test]
    fn codes_are_unique() {
        for (i, (a, _)) in ANNUNCIATOR_TABLE.iter().enumerate() {
            for (b, _) in &ANNUNCIATOR_TABLE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn hex_style_code_is_known() {
        assert_eq!(lookup_unit(*b"F2").unwrap(), ("F2", "W/HR"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let err = lookup_unit(*b"f2").unwrap_err();
        assert_eq!(err, DecodeError::UnknownAnnunciatorCode { code: *b"f2" });
    }

    #[test]
    fn reversed_code_is_not_accepted() {
        assert!(Annunciator::from_code(*b"05").is_err());
    }
}
