//! Driver creating a new file from a schema.
//!
//! The layout of the whole file is planned first, then every HDU is
//! created up front: the mandatory header records are emitted in place
//! synchronously while the data blocks start out as holes, filled later
//! by positional writes addressed by HDU index plus element index.

use std::fs;
use std::path::Path;

use log::debug;

use crate::block::{BLOCK_LEN, RECORD_LEN, RECORDS_PER_BLOCK};
use crate::card::{self, Record};
use crate::error::Error;
use crate::file::FileIo;
use crate::hdu::header::Header;
use crate::hdu::{Hdu, HduWriter};
use crate::layout::{self, HduSchema};

/// Write-only view of a new FITS file.
///
/// Every HDU carries `SIMPLE = T`, extensions included, where the
/// published standard wants `XTENSION` on extensions. The reader accepts
/// both forms.
#[derive(Debug)]
pub struct FitsWriter {
    io: FileIo,
    hdus: Vec<Hdu>,
}

impl FitsWriter {
    /// Create `path` (truncating any pre-existing content) and emit the
    /// mandatory header of every HDU of `schema`.
    ///
    /// On failure the partially-written file is removed, best effort.
    pub fn create<P: AsRef<Path>>(path: P, schema: &[HduSchema]) -> Result<Self, Error> {
        let path = path.as_ref();
        let (offsets, total_size) = layout::plan(schema)?;
        let io = FileIo::create(path)?;
        match Self::init(io, schema, &offsets, total_size) {
            Ok(writer) => Ok(writer),
            Err(e) => {
                let _ = fs::remove_file(path);
                Err(e)
            }
        }
    }

    fn init(
        io: FileIo,
        schema: &[HduSchema],
        offsets: &[u64],
        total_size: u64,
    ) -> Result<Self, Error> {
        io.set_len(total_size)?;
        let mut hdus = Vec::with_capacity(schema.len());
        for (hdu_schema, &offset) in schema.iter().zip(offsets) {
            let hdu = create_hdu(&io, hdu_schema, offset)?;
            debug!(
                "hdu {} at {}: bitpix {:?}, axes {:?}, {} data bytes",
                hdus.len(),
                offset,
                hdu.bitpix(),
                hdu.axes(),
                hdu.data_block_size()
            );
            hdus.push(hdu);
        }
        Ok(Self { io, hdus })
    }

    /// Number of HDUs in the file.
    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    /// Borrow the HDU at `index`.
    pub fn hdu(&mut self, index: usize) -> Option<HduWriter<'_>> {
        let FitsWriter { io, hdus } = self;
        hdus.get_mut(index).map(move |hdu| HduWriter::new(hdu, io))
    }

    /// Drive queued writes to completion; see [`FileIo::run`].
    pub fn run(&self) -> usize {
        self.io.run()
    }

    /// Cancel queued writes; see [`FileIo::stop`].
    pub fn stop(&self) -> usize {
        self.io.stop()
    }

    /// Complete anything still queued, then flush file contents to the
    /// device.
    pub fn close(self) -> Result<(), Error> {
        self.io.run();
        self.io.sync_all()
    }
}

fn create_hdu(io: &FileIo, schema: &HduSchema, offset: u64) -> Result<Hdu, Error> {
    let mut records = Vec::with_capacity(schema.axes.len() + 4);
    records.push(Record::new("SIMPLE", "T"));
    records.push(Record::new("BITPIX", schema.bitpix.value().to_string()));
    records.push(Record::new("NAXIS", schema.axes.len().to_string()));
    for (i, extent) in schema.axes.iter().enumerate() {
        records.push(Record::new(format!("NAXIS{}", i + 1), extent.to_string()));
    }
    records.push(Record::new("EXTEND", "T"));
    debug_assert!(records.len() < RECORDS_PER_BLOCK);

    // the full header block, END and space-filled padding included, goes
    // out in a single positional write
    let mut block = [b' '; BLOCK_LEN as usize];
    for (slot, record) in records.iter().enumerate() {
        block[slot * RECORD_LEN..(slot + 1) * RECORD_LEN]
            .copy_from_slice(&card::emit(&record.keyword, &record.value));
    }
    block[records.len() * RECORD_LEN..(records.len() + 1) * RECORD_LEN]
        .copy_from_slice(&card::emit_end());
    io.write_at(offset, &block)?;

    let mut header = Header::new();
    for record in records {
        header.push(record);
    }
    let data_block_size = schema.data_block_size()?;
    Ok(Hdu::new(
        header,
        schema.bitpix,
        schema.axes.clone(),
        offset,
        offset + BLOCK_LEN,
        data_block_size,
    ))
}
