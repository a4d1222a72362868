//! Frame geometry for the PeakTech 2510 serial output.
//!
//! Offsets below are *logical* positions, numbered the way the instrument
//! manual numbers them: position 0 is the end word and position 15 the start
//! word. On the wire the order is reversed, so the start word arrives first.

use std::ops::Range;

pub const FRAME_LEN: usize = 16;
pub const DISPLAY_DIGITS_LEN: usize = 8;
pub const ANNUNCIATOR_CODE_LEN: usize = 2;

pub const START_WORD: u8 = 0x02;
pub const END_WORD: u8 = b'\r';

pub const END_WORD_OFFSET: usize = 0;
pub const DISPLAY_DIGITS_RANGE: Range<usize> = 1..9;
pub const DECIMAL_POINT_OFFSET: usize = 9;
pub const POLARITY_OFFSET: usize = 10;
pub const ANNUNCIATOR_RANGE: Range<usize> = 11..13;
pub const DISPLAY_ID_OFFSET: usize = 13;
pub const RESERVED_OFFSET: usize = 14;
pub const START_WORD_OFFSET: usize = 15;

pub const POLARITY_POSITIVE: u8 = b'0';
pub const POLARITY_NEGATIVE: u8 = b'1';

pub const DECIMAL_POINT_MAX: u8 = 3;
pub const DISPLAY_ID_MIN: u8 = 1;
pub const DISPLAY_ID_MAX: u8 = 4;

/// Two frames' worth of bytes.
pub const DEFAULT_SYNC_BUDGET: usize = 2 * FRAME_LEN;
