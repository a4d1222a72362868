//! PeakTech 2510 frame decoding.
//!
//! The protocol follows a layered structure:
//! - `layout`: logical offsets and constants (source of truth)
//! - `reader`: raw frames, the wire-to-logical transform and field access
//! - `parser`: field slicing, validation and the inverse encoder
//! - `annunciator`: the static unit table
//! - `error`: explicit errors carrying the offending raw value
//!
//! Everything here is pure; byte sources and synchronization live in
//! `source` and `acquisition`.

pub mod annunciator;
pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use annunciator::{ANNUNCIATOR_TABLE, Annunciator, lookup_unit};
pub use error::{DecodeError, FrameField};
pub use parser::{ParsedFields, decode_bytes, decode_frame, encode_reading};
pub use reader::{LogicalFrame, RawFrame};
