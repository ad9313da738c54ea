//! Header part of a HDU.
//!
//! A header is an ordered list of keyword records, duplicates preserved,
//! plus a case-insensitive value map for lookups. The record count is part
//! of the state: it locates the slot the `END` record occupies on disk.

use indexmap::IndexMap;
use serde::Serialize;
use serde_repr::Serialize_repr;

use crate::block::RECORDS_PER_BLOCK;
use crate::card::{HeaderValue, Record};
use crate::error::Error;

/// Element type tag of a data block, as declared by the `BITPIX` keyword.
///
/// Positive values are the unsigned 8 bit or signed integer widths,
/// negative values the IEEE-754 float widths.
#[derive(Debug, PartialEq, Eq, Serialize_repr, Clone, Copy)]
#[repr(i64)]
pub enum Bitpix {
    U8 = 8,
    I16 = 16,
    I32 = 32,
    I64 = 64,
    F32 = -32,
    F64 = -64,
}

impl Bitpix {
    /// Size in bytes of one element.
    pub fn byte_size(self) -> u64 {
        (self as i64).unsigned_abs() / 8
    }

    /// The raw keyword value.
    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn from_value(value: i64) -> Result<Self, Error> {
        match value {
            8 => Ok(Bitpix::U8),
            16 => Ok(Bitpix::I16),
            32 => Ok(Bitpix::I32),
            64 => Ok(Bitpix::I64),
            -32 => Ok(Bitpix::F32),
            -64 => Ok(Bitpix::F64),
            _ => Err(Error::UnsupportedBitpix(value)),
        }
    }
}

/// The decoded header of one HDU.
#[derive(Debug, Default, Serialize)]
pub struct Header {
    /// All named records in emission order, `END` excluded.
    records: Vec<Record>,
    /// Value of the last record seen for each keyword, keyed uppercase.
    values: IndexMap<String, String>,
}

impl Header {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.values
            .insert(record.keyword.to_ascii_uppercase(), record.value.clone());
        self.records.push(record);
    }

    /// Number of named records; also the slot the `END` record sits in.
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Fails once a further record plus the re-emitted `END` would no
    /// longer fit in the single 2880 byte header block.
    pub(crate) fn check_slot_available(&self) -> Result<(), Error> {
        if self.records.len() + 2 > RECORDS_PER_BLOCK {
            Err(Error::HeaderFull)
        } else {
            Ok(())
        }
    }

    /// Case-insensitive lookup; the last record wins when a keyword was
    /// written more than once.
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.values
            .get(&keyword.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn require(&self, keyword: &str) -> Result<&str, Error> {
        self.get(keyword)
            .ok_or_else(|| Error::NotFound(keyword.to_owned()))
    }

    /// Look a keyword up and convert its value.
    pub fn value_as<T: HeaderValue>(&self, keyword: &str) -> Result<T, Error> {
        let value = self.require(keyword)?;
        T::parse_value(keyword, value)
    }

    /// Iterate over every record in emission order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records
            .iter()
            .map(|r| (r.keyword.as_str(), r.value.as_str()))
    }

    pub(crate) fn first_keyword(&self) -> Option<&str> {
        self.records.first().map(|r| r.keyword.as_str())
    }
}

/* Extraction of the mandatory keywords of a parsed header */

pub(crate) fn check_for_bitpix(header: &Header) -> Result<Bitpix, Error> {
    Bitpix::from_value(header.value_as::<i64>("BITPIX")?)
}

pub(crate) fn check_for_naxes(header: &Header) -> Result<Vec<u64>, Error> {
    let naxis = header.value_as::<i64>("NAXIS")?;
    if !(0..=999).contains(&naxis) {
        return Err(Error::Parse("NAXIS".to_owned(), naxis.to_string()));
    }
    (1..=naxis)
        .map(|i| header.value_as::<u64>(&format!("NAXIS{}", i)))
        .collect()
}
