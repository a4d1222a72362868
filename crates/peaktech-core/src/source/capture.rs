use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::{ReplaySource, SourceError};

/// On-disk encoding of a recorded capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Bytes exactly as received.
    Raw,
    /// Text dump of byte literals, e.g. `b'\x02'b'0'b'\r'`.
    Repr,
}

impl CaptureFormat {
    /// Guess the format from a file extension: `.txt` is `Repr`, anything
    /// else `Raw`.
    pub fn from_path(path: &Path) -> Self {
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_text {
            CaptureFormat::Repr
        } else {
            CaptureFormat::Raw
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CaptureFormat::Raw => "raw",
            CaptureFormat::Repr => "repr",
        }
    }
}

impl FromStr for CaptureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(CaptureFormat::Raw),
            "repr" => Ok(CaptureFormat::Repr),
            other => Err(format!("unknown capture format '{other}'")),
        }
    }
}

/// Read a capture file into memory.
///
/// # Errors
/// Returns `SourceError::Io` when the file cannot be read and
/// `SourceError::Capture` when a `Repr` dump is malformed.
pub fn load_capture(path: &Path, format: CaptureFormat) -> Result<Vec<u8>, SourceError> {
    match format {
        CaptureFormat::Raw => Ok(fs::read(path)?),
        CaptureFormat::Repr => parse_repr_capture(&fs::read_to_string(path)?),
    }
}

/// Load a capture and wrap it in a source that exhausts at the end.
///
/// # Errors
/// See [`load_capture`].
pub fn open_capture(path: &Path, format: CaptureFormat) -> Result<ReplaySource, SourceError> {
    load_capture(path, format).map(ReplaySource::new)
}

/// Parse a text dump of byte literals.
///
/// Literals may be separated by whitespace or commas. Supported escapes are
/// `\xHH`, `\r`, `\n`, `\t`, `\0`, `\\`, `\'` and `\"`.
///
/// # Examples
/// ```
/// use peaktech_core::parse_repr_capture;
///
/// let bytes = parse_repr_capture("b'\\x02'b'0'b'\\r'").unwrap();
/// assert_eq!(bytes, vec![0x02, b'0', b'\r']);
/// ```
///
/// # Errors
/// Returns `SourceError::Capture` with the byte offset of the first problem.
pub fn parse_repr_capture(text: &str) -> Result<Vec<u8>, SourceError> {
    let input = text.as_bytes();
    let mut out = Vec::with_capacity(input.len() / 4);
    let mut pos = 0;

    while pos < input.len() {
        let c = input[pos];
        if c.is_ascii_whitespace() || c == b',' {
            pos += 1;
            continue;
        }
        if c != b'b' {
            return Err(capture_error(pos, "expected byte literal prefix 'b'"));
        }
        pos += 1;
        let quote = match input.get(pos) {
            Some(&q) if q == b'\'' || q == b'"' => q,
            _ => return Err(capture_error(pos, "expected opening quote")),
        };
        pos += 1;

        loop {
            let c = *input
                .get(pos)
                .ok_or_else(|| capture_error(pos, "unterminated byte literal"))?;
            pos += 1;
            if c == quote {
                break;
            }
            if c != b'\\' {
                out.push(c);
                continue;
            }
            let escape = *input
                .get(pos)
                .ok_or_else(|| capture_error(pos, "unterminated escape"))?;
            let value = match escape {
                b'\\' | b'\'' | b'"' => escape,
                b'n' => b'\n',
                b'r' => b'\r',
                b't' => b'\t',
                b'0' => 0,
                b'x' => {
                    let hex = input
                        .get(pos + 1..pos + 3)
                        .and_then(|h| std::str::from_utf8(h).ok())
                        .and_then(|h| u8::from_str_radix(h, 16).ok())
                        .ok_or_else(|| capture_error(pos, "invalid \\x escape"))?;
                    pos += 2;
                    hex
                }
                other => {
                    return Err(capture_error(
                        pos,
                        &format!("unsupported escape '\\{}'", other.escape_ascii()),
                    ));
                }
            };
            pos += 1;
            out.push(value);
        }
    }

    Ok(out)
}

fn capture_error(offset: usize, message: &str) -> SourceError {
    SourceError::Capture {
        offset,
        message: message.to_string(),
    }
}
