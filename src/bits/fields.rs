//! Primitive field readers.
//!
//! Each reader takes the remaining input slice and returns the new
//! remaining slice alongside the decoded value, `nom`-combinator style
//! (see `orsetii-squige`'s `Addr::parse`/`Addr32::parse`), but through this
//! crate's own [`BitsError`] rather than a generic `nom` error so structural
//! failures (`ShortInput`) and decode failures (`Guid`, `Time`) are
//! distinguishable to callers further up the stack.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use nom::number::complete::{le_u32, le_u64, le_u8};
use nom::Finish;
use uuid::Uuid;

use crate::error::{BitsError, Result};

/// The sentinel substituted for a `PascalUtf16` field whose bytes do not
/// form valid UTF-16. Preserved verbatim for compatibility with existing
/// downstream forensic reports.
pub const UNREADABLE: &str = "unreadable data";

fn short(needed: usize, available: usize) -> BitsError {
    BitsError::ShortInput { needed, available }
}

pub fn u8(input: &[u8]) -> Result<(&[u8], u8)> {
    le_u8::<_, nom::error::Error<&[u8]>>(input)
        .finish()
        .map_err(|_| short(1, input.len()))
}

pub fn u32le(input: &[u8]) -> Result<(&[u8], u32)> {
    le_u32::<_, nom::error::Error<&[u8]>>(input)
        .finish()
        .map_err(|_| short(4, input.len()))
}

pub fn u64le(input: &[u8]) -> Result<(&[u8], u64)> {
    le_u64::<_, nom::error::Error<&[u8]>>(input)
        .finish()
        .map_err(|_| short(8, input.len()))
}

pub fn take(input: &[u8], n: usize) -> Result<(&[u8], &[u8])> {
    if input.len() < n {
        return Err(short(n, input.len()));
    }
    Ok((&input[n..], &input[..n]))
}

/// Reads 16 bytes and reorders the first three groups from little-endian to
/// the canonical string form.
pub fn guid(input: &[u8]) -> Result<(&[u8], String)> {
    let (rest, bytes) = take(input, 16)?;
    let arr: [u8; 16] = bytes.try_into().map_err(|_| BitsError::Guid)?;
    Ok((rest, Uuid::from_bytes_le(arr).to_string()))
}

fn filetime_epoch() -> DateTime<Utc> {
    Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(1601, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
}

/// The largest year representable by the original's `datetime` adapter.
/// A tick count landing past this year is treated as overflow, matching
/// Python's `datetime.MAXYEAR`.
const MAX_YEAR: i32 = 9999;

/// Reads a `u64` tick count and converts to a UTC timestamp: ticks are
/// 100ns units since 1601-01-01. A tick count whose timestamp falls past
/// [`MAX_YEAR`] produces [`BitsError::Time`] rather than panicking.
pub fn filetime(input: &[u8]) -> Result<(&[u8], DateTime<Utc>)> {
    let (rest, ticks) = u64le(input)?;
    let micros: i64 = (ticks / 10).try_into().map_err(|_| BitsError::Time)?;
    let ts = filetime_epoch()
        .checked_add_signed(chrono::Duration::microseconds(micros))
        .ok_or(BitsError::Time)?;
    if ts.year() > MAX_YEAR {
        return Err(BitsError::Time);
    }
    Ok((rest, ts))
}

/// Reads `n: u32le`, then `2*n` bytes, decoded as UTF-16LE. Trailing NUL
/// code units are stripped. Malformed UTF-16 yields [`UNREADABLE`] rather
/// than an error.
pub fn pascal_utf16(input: &[u8]) -> Result<(&[u8], String)> {
    let (rest, len) = u32le(input)?;
    let (rest, raw) = take(rest, len as usize * 2)?;
    let text = decode_utf16le(raw);
    Ok((rest, text))
}

pub(crate) fn decode_utf16le(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    match String::from_utf16(&units) {
        Ok(s) => s.trim_end_matches('\u{0}').to_string(),
        Err(_) => UNREADABLE.to_string(),
    }
}

/// Consumes bytes until (and including) the first occurrence of `stop`,
/// returning the bytes *before* `stop` and leaving the cursor immediately
/// before `stop` (the caller may assert it as a constant next).
pub fn delimited_field<'a>(input: &'a [u8], stop: &[u8]) -> Result<(&'a [u8], &'a [u8])> {
    let pos = input
        .windows(stop.len())
        .position(|w| w == stop)
        .ok_or_else(|| short(stop.len(), input.len()))?;
    Ok((&input[pos..], &input[..pos]))
}

/// Consumes and asserts `expected` is the next bytes in `input`.
pub fn constant<'a>(input: &'a [u8], expected: &[u8]) -> Result<&'a [u8]> {
    let (rest, got) = take(input, expected.len())?;
    if got == expected {
        Ok(rest)
    } else {
        Err(BitsError::ConstantMismatch {
            expected_len: expected.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32le_reads_little_endian() {
        let (rest, v) = u32le(&[0x01, 0x00, 0x00, 0x00, 0xAA]).unwrap();
        assert_eq!(v, 1);
        assert_eq!(rest, &[0xAA]);
    }

    #[test]
    fn u32le_short_input_errors() {
        assert!(matches!(
            u32le(&[0x01, 0x02]).unwrap_err(),
            BitsError::ShortInput { .. }
        ));
    }

    #[test]
    fn guid_reorders_little_endian_groups() {
        // canonical 01020304-0506-0708-090a-0b0c0d0e0f10 stored little-endian
        let bytes = [
            0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0x08, 0x07, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ];
        let (_, s) = guid(&bytes).unwrap();
        assert_eq!(s, "01020304-0506-0708-090a-0b0c0d0e0f10");
    }

    #[test]
    fn filetime_zero_is_epoch() {
        let (_, ts) = filetime(&0u64.to_le_bytes()).unwrap();
        assert_eq!(ts.to_rfc3339(), "1601-01-01T00:00:00+00:00");
    }

    #[test]
    fn filetime_overflow_errors() {
        assert!(matches!(
            filetime(&u64::MAX.to_le_bytes()).unwrap_err(),
            BitsError::Time
        ));
    }

    #[test]
    fn filetime_within_range_is_ok() {
        // 2024-01-01, well inside the representable range.
        let ticks: u64 = 133_485_408_000_000_000;
        let (_, ts) = filetime(&ticks.to_le_bytes()).unwrap();
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn pascal_utf16_roundtrip() {
        let mut buf = 3u32.to_le_bytes().to_vec();
        for c in "abc".encode_utf16() {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        let (rest, s) = pascal_utf16(&buf).unwrap();
        assert_eq!(s, "abc");
        assert!(rest.is_empty());
    }

    #[test]
    fn pascal_utf16_strips_trailing_nul() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&0x41u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        let (_, s) = pascal_utf16(&buf).unwrap();
        assert_eq!(s, "A");
    }

    #[test]
    fn pascal_utf16_malformed_yields_sentinel() {
        // odd-length data cannot appear here (len is in u16 units), but an
        // unpaired surrogate decodes to an error in from_utf16.
        let mut buf = 1u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&0xD800u16.to_le_bytes()); // lone high surrogate
        let (_, s) = pascal_utf16(&buf).unwrap();
        assert_eq!(s, UNREADABLE);
    }

    #[test]
    fn delimited_field_stops_before_delimiter() {
        let data = b"hello\x00\x00\x00stop-here";
        let (rest, before) = delimited_field(data, b"stop").unwrap();
        assert_eq!(before, b"hello\x00\x00\x00");
        assert!(rest.starts_with(b"stop"));
    }

    #[test]
    fn delimited_field_missing_delimiter_errors() {
        assert!(delimited_field(b"no delimiter here", b"XXXX").is_err());
    }

    #[test]
    fn constant_mismatch_is_distinct_from_short_input() {
        // enough bytes are present, they just aren't the expected ones.
        assert!(matches!(
            constant(b"ABCD", b"ZZZZ").unwrap_err(),
            BitsError::ConstantMismatch { expected_len: 4 }
        ));
        assert!(matches!(
            constant(b"AB", b"ZZZZ").unwrap_err(),
            BitsError::ShortInput { .. }
        ));
    }
}
