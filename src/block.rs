//! Byte arithmetic over the fixed FITS block discipline.
//!
//! Every header block and every data block occupies an integral number of
//! 2880 byte units, so each HDU starts on a block boundary.

use crate::error::Error;

/// Length in bytes of one FITS block.
pub const BLOCK_LEN: u64 = 2880;

/// Length in bytes of one keyword record.
pub const RECORD_LEN: usize = 80;

/// Number of keyword records held by one header block.
pub const RECORDS_PER_BLOCK: usize = (BLOCK_LEN as usize) / RECORD_LEN;

/// Round `n` up to the next multiple of [`BLOCK_LEN`]; multiples are kept
/// as they are.
pub fn round_up_block(n: u64) -> u64 {
    match n % BLOCK_LEN {
        0 => n,
        r => n + (BLOCK_LEN - r),
    }
}

/// Byte offset of an element inside a data block.
///
/// The mapping is row-major over `axes` with the outermost axis varying
/// slowest: the element addressed by `index` starts at
/// `elem_size * sum(index[d] * product(axes[d + 1..]))`.
///
/// A short `index` addresses the start of a sub-slab, the missing trailing
/// indices being zero. Supplying more indices than axes, or an index equal
/// to or past its extent, fails with [`Error::OutOfBounds`].
pub fn byte_offset(index: &[u64], axes: &[u64], elem_size: u64) -> Result<u64, Error> {
    if index.len() > axes.len() {
        return Err(Error::OutOfBounds);
    }
    let mut elem_off: u64 = 0;
    for (d, i) in index.iter().enumerate() {
        if *i >= axes[d] {
            return Err(Error::OutOfBounds);
        }
        let stride = axes[d + 1..].iter().product::<u64>();
        elem_off += i * stride;
    }
    Ok(elem_off * elem_size)
}
