//! Driver locating the HDUs of an existing file.
//!
//! Starting at offset 0, headers are parsed record by record until `END`,
//! the data block length is computed from the mandatory keywords and the
//! scan jumps straight past the data to the next HDU. Data blocks are
//! never touched before a caller asks for them.

use std::path::Path;

use log::{debug, warn};

use crate::block::{self, RECORD_LEN};
use crate::card;
use crate::error::Error;
use crate::file::FileIo;
use crate::hdu::header::{self, Header};
use crate::hdu::{Hdu, HduReader};

/// Read-only view of a FITS file: the engine plus the ordered collection
/// of HDUs located when the file was opened.
#[derive(Debug)]
pub struct FitsReader {
    io: FileIo,
    hdus: Vec<Hdu>,
}

impl FitsReader {
    /// Open `path` and locate every HDU.
    ///
    /// Headers longer than one block are accepted. Any structural
    /// violation surfaces as [`Error::Format`] carrying the path and the
    /// underlying cause.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let io = FileIo::open(path)?;
        let hdus = scan(&io).map_err(|cause| Error::Format(path.to_path_buf(), Box::new(cause)))?;
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
    pub fn hdu(&self, index: usize) -> Option<HduReader<'_>> {
        self.hdus.get(index).map(|hdu| HduReader::new(hdu, &self.io))
    }

    /// Iterate over all HDUs in file order.
    pub fn hdus(&self) -> impl Iterator<Item = HduReader<'_>> {
        self.hdus.iter().map(move |hdu| HduReader::new(hdu, &self.io))
    }

    /// Drive queued reads to completion; see [`FileIo::run`].
    pub fn run(&self) -> usize {
        self.io.run()
    }

    /// Cancel queued reads; see [`FileIo::stop`].
    pub fn stop(&self) -> usize {
        self.io.stop()
    }
}

fn scan(io: &FileIo) -> Result<Vec<Hdu>, Error> {
    let file_size = io.file_size()?;
    let mut hdus = Vec::new();
    let mut offset = 0;
    while offset < file_size {
        let hdu = parse_hdu(io, offset)?;
        debug!(
            "hdu {} at {}: bitpix {:?}, axes {:?}, {} data bytes",
            hdus.len(),
            offset,
            hdu.bitpix(),
            hdu.axes(),
            hdu.data_block_size()
        );
        let data_end = hdu.data_offset() + hdu.data_block_size();
        if data_end > file_size {
            return Err(truncated());
        }
        offset = data_end;
        hdus.push(hdu);
    }
    Ok(hdus)
}

fn truncated() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "data block extends past the end of the file",
    ))
}

fn parse_hdu(io: &FileIo, offset: u64) -> Result<Hdu, Error> {
    let mut header = Header::new();
    let mut rec_buf = [0_u8; RECORD_LEN];

    // consume records until END; a header hitting EOF first has no END
    let num_named = loop {
        let slot = header.num_records() as u64;
        io.read_at(offset + slot * RECORD_LEN as u64, &mut rec_buf)?;
        let record = card::parse(&rec_buf);
        if record.is_end() {
            break slot;
        }
        if !card::is_well_formed(&rec_buf) {
            // preserved anyway: the count still locates the END slot
            warn!(
                "ill-formed record in slot {}: {:?}",
                slot,
                String::from_utf8_lossy(&rec_buf)
            );
        }
        header.push(record);
    };

    match header.first_keyword() {
        Some("SIMPLE") | Some("XTENSION") => {}
        _ => return Err(Error::NotFound("SIMPLE".to_owned())),
    }

    let bitpix = header::check_for_bitpix(&header)?;
    let axes = header::check_for_naxes(&header)?;

    let header_len = (num_named + 1) * RECORD_LEN as u64;
    let data_offset = block::round_up_block(offset + header_len);
    let data_block_size = if axes.is_empty() {
        0
    } else {
        let mut n = bitpix.byte_size();
        for extent in &axes {
            n = n.checked_mul(*extent).ok_or(Error::OutOfBounds)?;
        }
        block::round_up_block(n)
    };

    Ok(Hdu::new(
        header,
        bitpix,
        axes,
        offset,
        data_offset,
        data_block_size,
    ))
}
