//! Codec for the fixed 80 byte keyword record.
//!
//! A record carries the keyword over bytes 0..8, the `"= "` value indicator
//! over bytes 8..10 and the value, written verbatim without quoting, from
//! byte 10 on. The special `END` record terminates a header.

use serde::Serialize;

use crate::block::RECORD_LEN;
use crate::error::Error;

/// The keyword of the record terminating a header.
pub const END_KEYWORD: &str = "END";

/// End, exclusive, of the area the value is scanned from when decoding.
const VALUE_AREA_END: usize = 37;

/// One keyword record of a header, in decoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub keyword: String,
    pub value: String,
}

impl Record {
    pub fn new<K: Into<String>, V: Into<String>>(keyword: K, value: V) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.keyword == END_KEYWORD
    }
}

/// Encode a `keyword = value` record.
///
/// The keyword is uppercased and left-justified over bytes 0..8, truncated
/// past eight bytes; the value is written verbatim from byte 10 and the
/// record is space padded to 80 bytes.
pub fn emit(keyword: &str, value: &str) -> [u8; RECORD_LEN] {
    let mut rec = [b' '; RECORD_LEN];
    for (dst, b) in rec[..8].iter_mut().zip(keyword.bytes()) {
        *dst = b.to_ascii_uppercase();
    }
    rec[8] = b'=';
    for (dst, b) in rec[10..].iter_mut().zip(value.bytes()) {
        *dst = b;
    }
    rec
}

/// Encode the terminating record: the `END` keyword followed by 77 spaces.
pub fn emit_end() -> [u8; RECORD_LEN] {
    let mut rec = [b' '; RECORD_LEN];
    rec[..3].copy_from_slice(b"END");
    rec
}

/// Decode one record.
///
/// The keyword is bytes 0..8 with blanks and `=` removed. The value is
/// scanned from bytes 8..37, cut at the first `/` comment separator, then
/// stripped of blanks and `=` (which also swallows the value indicator).
pub fn parse(rec: &[u8; RECORD_LEN]) -> Record {
    let keyword = strip(&rec[..8]);
    let area = &rec[8..VALUE_AREA_END];
    let area = match area.iter().position(|&b| b == b'/') {
        Some(cut) => &area[..cut],
        None => area,
    };
    Record::new(keyword, strip(area))
}

fn strip(bytes: &[u8]) -> String {
    let kept: Vec<u8> = bytes
        .iter()
        .filter(|&&b| b != b' ' && b != b'=')
        .copied()
        .collect();
    String::from_utf8_lossy(&kept).into_owned()
}

/// Whether a raw record is well formed: printable ASCII throughout, and a
/// proper `"= "` value indicator whenever byte 8 opens one.
///
/// [`parse`] decodes an ill-formed record all the same; callers decide
/// whether to flag it.
pub fn is_well_formed(rec: &[u8; RECORD_LEN]) -> bool {
    if !rec.iter().all(|&b| (0x20..=0x7e).contains(&b)) {
        return false;
    }
    rec[8] != b'=' || rec[9] == b' '
}

/// Conversion from the stored header string to a caller type, in the manner
/// of stream extraction: numeric kinds skip the blanks the fixed-size
/// record padding introduces, strings come back verbatim.
pub trait HeaderValue: Sized {
    fn parse_value(keyword: &str, value: &str) -> Result<Self, Error>;
}

impl HeaderValue for String {
    fn parse_value(_keyword: &str, value: &str) -> Result<Self, Error> {
        Ok(value.to_owned())
    }
}

impl HeaderValue for bool {
    fn parse_value(keyword: &str, value: &str) -> Result<Self, Error> {
        match value.trim() {
            "T" => Ok(true),
            "F" => Ok(false),
            _ => Err(Error::Parse(keyword.to_owned(), value.to_owned())),
        }
    }
}

impl HeaderValue for i64 {
    fn parse_value(keyword: &str, value: &str) -> Result<Self, Error> {
        value
            .trim()
            .parse()
            .map_err(|_| Error::Parse(keyword.to_owned(), value.to_owned()))
    }
}

impl HeaderValue for u64 {
    fn parse_value(keyword: &str, value: &str) -> Result<Self, Error> {
        value
            .trim()
            .parse()
            .map_err(|_| Error::Parse(keyword.to_owned(), value.to_owned()))
    }
}

impl HeaderValue for f64 {
    fn parse_value(keyword: &str, value: &str) -> Result<Self, Error> {
        value
            .trim()
            .parse()
            .map_err(|_| Error::Parse(keyword.to_owned(), value.to_owned()))
    }
}
