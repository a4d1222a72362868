use std::fs;
use std::path::{Path, PathBuf};

use peaktech_core::{
    Annunciator, DecimalPoint, DisplayId, Polarity, Reading, encode_reading,
};

const START_WORD: u8 = 0x02;
const SYNC_BUDGET: usize = 32;
// wire offsets
const DISPLAY_ID_OFFSET: usize = 2;
const DECIMAL_POINT_OFFSET: usize = 6;
const ANNUNCIATOR_RANGE: std::ops::Range<usize> = 3..5;
const DIGITS_RANGE: std::ops::Range<usize> = 7..15;
const END_WORD_OFFSET: usize = 15;

fn main() -> Result<(), String> {
    let root = PathBuf::from("tests/golden");
    write_bytes(root.join("clean").join("input.bin"), &clean_capture()?)?;
    write_bytes(root.join("noisy").join("input.bin"), &noisy_capture()?)?;
    write_text(root.join("repr").join("input.txt"), &repr_dump(&repr_capture()?))?;
    Ok(())
}

/// Five good frames on all four displays, one preceded by repeated start words.
fn clean_capture() -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    out.extend_from_slice(&frame(1, b"34", Polarity::Positive, 3, b"00012345")?);
    out.extend_from_slice(&[START_WORD, START_WORD]);
    out.extend_from_slice(&frame(2, b"36", Polarity::Negative, 2, b"00000150")?);
    out.extend_from_slice(&frame(3, b"50", Polarity::Positive, 1, b"00002305")?);
    out.extend_from_slice(&frame(4, b"F2", Polarity::Positive, 0, b"00001024")?);
    out.extend_from_slice(&frame(1, b"31", Polarity::Positive, 2, b"00005000")?);
    Ok(out)
}

/// One frame per rejection class, a garbage run longer than the budget, and
/// a capture cut off mid-frame.
fn noisy_capture() -> Result<Vec<u8>, String> {
    let acv = frame(2, b"50", Polarity::Positive, 1, b"00002305")?;
    let mut out = vec![0xff, 0x00, b'A', b'B'];
    out.extend_from_slice(&frame(1, b"34", Polarity::Positive, 3, b"00012345")?);
    out.extend_from_slice(&patched(acv, |f| f[END_WORD_OFFSET] = b'\n'));
    out.extend_from_slice(&patched(acv, |f| f[ANNUNCIATOR_RANGE].copy_from_slice(b"99")));
    out.extend_from_slice(&patched(acv, |f| f[DISPLAY_ID_OFFSET] = b'7'));
    out.extend_from_slice(&patched(acv, |f| f[DECIMAL_POINT_OFFSET] = b'5'));
    out.extend_from_slice(&patched(acv, |f| f[DIGITS_RANGE].copy_from_slice(b"0001A345")));
    out.extend(std::iter::repeat_n(0x55, SYNC_BUDGET + 8));
    out.extend_from_slice(&frame(3, b"63", Polarity::Negative, 1, b"00000421")?);
    out.extend_from_slice(&frame(4, b"50", Polarity::Positive, 1, b"00002305")?[..9]);
    Ok(out)
}

fn repr_capture() -> Result<Vec<u8>, String> {
    let mut out = vec![b'\r'];
    out.extend_from_slice(&frame(2, b"39", Polarity::Positive, 3, b"00004700")?);
    out.extend_from_slice(&frame(2, b"38", Polarity::Positive, 1, b"00000998")?);
    Ok(out)
}

fn frame(
    display: u8,
    code: &[u8; 2],
    polarity: Polarity,
    places: u8,
    digits: &[u8; 8],
) -> Result<[u8; 16], String> {
    let reading = Reading::new(
        *digits,
        DecimalPoint::new(places).ok_or("decimal point out of range")?,
        polarity,
        Annunciator::from_code(*code).map_err(|err| err.to_string())?,
        DisplayId::new(display).ok_or("display id out of range")?,
    )
    .map_err(|err| err.to_string())?;
    Ok(*encode_reading(&reading).as_bytes())
}

fn patched(mut frame: [u8; 16], patch: impl FnOnce(&mut [u8; 16])) -> [u8; 16] {
    patch(&mut frame);
    frame
}

/// One byte literal per line, the way the logging tool printed them.
fn repr_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &byte in bytes {
        let literal = match byte {
            b'\t' => "b'\\t'".to_string(),
            b'\n' => "b'\\n'".to_string(),
            b'\r' => "b'\\r'".to_string(),
            b'\\' => "b'\\\\'".to_string(),
            b'\'' => "b\"'\"".to_string(),
            0x20..=0x7e => format!("b'{}'", byte as char),
            _ => format!("b'\\x{byte:02x}'"),
        };
        out.push_str(&literal);
        out.push('\n');
    }
    out
}

fn write_bytes(path: PathBuf, bytes: &[u8]) -> Result<(), String> {
    ensure_parent(&path)?;
    fs::write(&path, bytes).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}

fn write_text(path: PathBuf, text: &str) -> Result<(), String> {
    write_bytes(path, text.as_bytes())
}

fn ensure_parent(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    Ok(())
}
