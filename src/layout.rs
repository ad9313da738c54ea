//! Pre-computation of the byte layout of a whole file.
//!
//! Given the ordered schema of element types and axis extents, every HDU
//! start offset is known before anything is written, so all descriptors
//! are created in one pass without a seek in between.

use serde::Serialize;

use crate::block::{self, BLOCK_LEN, RECORDS_PER_BLOCK};
use crate::error::Error;
use crate::hdu::data::Element;
use crate::hdu::header::Bitpix;

/// Element type and axis extents of one HDU to be created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HduSchema {
    pub bitpix: Bitpix,
    pub axes: Vec<u64>,
}

impl HduSchema {
    pub fn new(bitpix: Bitpix, axes: &[u64]) -> Self {
        Self {
            bitpix,
            axes: axes.to_vec(),
        }
    }

    /// Schema entry for an HDU made of elements of type `T`.
    pub fn of<T: Element>(axes: &[u64]) -> Self {
        Self::new(T::BITPIX, axes)
    }

    /// On-disk length of the data block, rounded up to the block boundary.
    /// A zero-dimensional HDU has no data block.
    pub fn data_block_size(&self) -> Result<u64, Error> {
        if self.axes.is_empty() {
            return Ok(0);
        }
        let mut n = self.bitpix.byte_size();
        for extent in &self.axes {
            n = n.checked_mul(*extent).ok_or(Error::OutOfBounds)?;
        }
        Ok(block::round_up_block(n))
    }

    /// Number of records of the mandatory preamble, `END` included:
    /// SIMPLE, BITPIX, NAXIS, one record per axis, EXTEND, END.
    fn num_mandatory_records(&self) -> usize {
        self.axes.len() + 5
    }

    fn validate(&self) -> Result<(), Error> {
        if self.num_mandatory_records() > RECORDS_PER_BLOCK {
            return Err(Error::HeaderFull);
        }
        if self.axes.iter().any(|&extent| extent == 0) {
            return Err(Error::OutOfBounds);
        }
        Ok(())
    }
}

/// Start offset of every HDU of `schema`, plus the total file length.
///
/// `offsets[0] = 0` and each successor follows one header block plus the
/// rounded data block of its predecessor, so every offset is a 2880
/// multiple.
pub(crate) fn plan(schema: &[HduSchema]) -> Result<(Vec<u64>, u64), Error> {
    let mut offsets = Vec::with_capacity(schema.len());
    let mut off: u64 = 0;
    for hdu in schema {
        hdu.validate()?;
        offsets.push(off);
        let data = hdu.data_block_size()?;
        off = off
            .checked_add(BLOCK_LEN)
            .and_then(|o| o.checked_add(data))
            .ok_or(Error::OutOfBounds)?;
    }
    Ok((offsets, off))
}
