//! Header/Data Unit descriptors and the borrowed views used to read and
//! write one unit.
//!
//! A descriptor records where one HDU lives in the file and what it is
//! shaped like; views pair a descriptor with a borrow of the engine so
//! their lifetime never exceeds the open file.

pub mod data;
pub mod header;

use serde::Serialize;

use crate::block::{self, RECORD_LEN};
use crate::card::{self, HeaderValue, Record};
use crate::error::Error;
use crate::file::{FileIo, ReadAt, WriteAt};
use data::{ElemRead, Element, ImageData};
use header::{Bitpix, Header};

/// Descriptor of one HDU: its header map, element type, axis extents and
/// the absolute location of its header and data blocks.
#[derive(Debug, Serialize)]
pub struct Hdu {
    header: Header,
    bitpix: Bitpix,
    axes: Vec<u64>,
    /// Absolute start of the header block, a 2880 multiple.
    offset: u64,
    /// Absolute start of the data block.
    data_offset: u64,
    /// On-disk length of the data block, rounded to the block boundary.
    data_block_size: u64,
}

impl Hdu {
    pub(crate) fn new(
        header: Header,
        bitpix: Bitpix,
        axes: Vec<u64>,
        offset: u64,
        data_offset: u64,
        data_block_size: u64,
    ) -> Self {
        Self {
            header,
            bitpix,
            axes,
            offset,
            data_offset,
            data_block_size,
        }
    }

    pub fn bitpix(&self) -> Bitpix {
        self.bitpix
    }

    pub fn naxis(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[u64] {
        &self.axes
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn data_block_size(&self) -> u64 {
        self.data_block_size
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Absolute byte address of `index`, bounds-checked against the shape
    /// and against the end of the data block.
    fn data_range(&self, index: &[u64], len: usize) -> Result<u64, Error> {
        let off = block::byte_offset(index, &self.axes, self.bitpix.byte_size())?;
        let end = off.checked_add(len as u64).ok_or(Error::OutOfBounds)?;
        if end > self.data_block_size {
            return Err(Error::OutOfBounds);
        }
        Ok(self.data_offset + off)
    }

    pub(crate) fn read_data_at(
        &self,
        io: &FileIo,
        index: &[u64],
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        let at = self.data_range(index, buf.len())?;
        io.read_at(at, buf)
    }

    pub(crate) fn async_read_data_at(&self, io: &FileIo, index: &[u64], len: usize) -> ReadAt {
        match self.data_range(index, len) {
            Ok(at) => io.async_read_at(at, len),
            Err(e) => ReadAt::failed(e),
        }
    }

    pub(crate) fn write_data_at(
        &self,
        io: &FileIo,
        index: &[u64],
        bytes: &[u8],
    ) -> Result<usize, Error> {
        let at = self.data_range(index, bytes.len())?;
        io.write_at(at, bytes)
    }

    pub(crate) fn async_write_data_at(&self, io: &FileIo, index: &[u64], bytes: &[u8]) -> WriteAt {
        match self.data_range(index, bytes.len()) {
            Ok(at) => io.async_write_at(at, bytes.to_vec()),
            Err(e) => WriteAt::failed(e),
        }
    }

    pub(crate) fn push_record(&mut self, record: Record) {
        self.header.push(record);
    }
}

fn check_tag<T: Element>(hdu: &Hdu) -> Result<(), Error> {
    if T::BITPIX == hdu.bitpix {
        Ok(())
    } else {
        Err(Error::UnsupportedBitpix(T::BITPIX.value()))
    }
}

/// Borrowed read-only view of one HDU of an open
/// [`FitsReader`](crate::FitsReader).
#[derive(Debug, Clone, Copy)]
pub struct HduReader<'a> {
    hdu: &'a Hdu,
    io: &'a FileIo,
}

impl<'a> HduReader<'a> {
    pub(crate) fn new(hdu: &'a Hdu, io: &'a FileIo) -> Self {
        Self { hdu, io }
    }

    pub fn hdu(&self) -> &'a Hdu {
        self.hdu
    }

    pub fn bitpix(&self) -> Bitpix {
        self.hdu.bitpix
    }

    pub fn naxis(&self) -> usize {
        self.hdu.naxis()
    }

    pub fn axes(&self) -> &'a [u64] {
        &self.hdu.axes
    }

    pub fn num_records(&self) -> usize {
        self.hdu.header.num_records()
    }

    /// Look a keyword up, failing when absent.
    pub fn get_header(&self, keyword: &str) -> Result<&'a str, Error> {
        self.hdu.header.require(keyword)
    }

    pub fn get_header_opt(&self, keyword: &str) -> Option<&'a str> {
        self.hdu.header.get(keyword)
    }

    /// Every record in emission order, duplicates included.
    pub fn get_headers(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.hdu.header.iter()
    }

    pub fn value_as<T: HeaderValue>(&self, keyword: &str) -> Result<T, Error> {
        self.hdu.header.value_as(keyword)
    }

    /// Blocking positional read of raw bytes starting at `index`; fills
    /// the whole of `buf` and returns the number of bytes transferred.
    pub fn read_data(&self, index: &[u64], buf: &mut [u8]) -> Result<usize, Error> {
        self.hdu.read_data_at(self.io, index, buf)
    }

    /// Queue a positional read of `len` raw bytes starting at `index`.
    pub fn async_read_data(&self, index: &[u64], len: usize) -> ReadAt {
        self.hdu.async_read_data_at(self.io, index, len)
    }

    /// Blocking typed read; fails with [`Error::UnsupportedBitpix`] when
    /// `T` does not match the HDU tag.
    pub fn read_elems<T: Element>(&self, index: &[u64], n: usize) -> Result<Vec<T>, Error> {
        check_tag::<T>(self.hdu)?;
        let mut buf = vec![0_u8; n * T::BITPIX.byte_size() as usize];
        self.read_data(index, &mut buf)?;
        Ok(T::vec_from_be(&buf))
    }

    /// Queued typed read; a tag mismatch is delivered through the token.
    pub fn async_read_elems<T: Element>(&self, index: &[u64], n: usize) -> ElemRead<T> {
        if let Err(e) = check_tag::<T>(self.hdu) {
            return ElemRead::failed(e);
        }
        let len = n * T::BITPIX.byte_size() as usize;
        ElemRead::new(self.hdu.async_read_data_at(self.io, index, len))
    }

    /// Typed view of the data block, the variant picked from the stored
    /// `BITPIX` tag.
    pub fn data(&self) -> ImageData<'a> {
        ImageData::new(self.hdu, self.io)
    }
}

/// Borrowed writable view of one HDU of a [`FitsWriter`](crate::FitsWriter).
#[derive(Debug)]
pub struct HduWriter<'a> {
    hdu: &'a mut Hdu,
    io: &'a FileIo,
}

impl<'a> HduWriter<'a> {
    pub(crate) fn new(hdu: &'a mut Hdu, io: &'a FileIo) -> Self {
        Self { hdu, io }
    }

    pub fn bitpix(&self) -> Bitpix {
        self.hdu.bitpix
    }

    pub fn axes(&self) -> &[u64] {
        &self.hdu.axes
    }

    pub fn num_records(&self) -> usize {
        self.hdu.header.num_records()
    }

    pub fn get_header(&self, keyword: &str) -> Result<&str, Error> {
        self.hdu.header.require(keyword)
    }

    pub fn get_header_opt(&self, keyword: &str) -> Option<&str> {
        self.hdu.header.get(keyword)
    }

    pub fn get_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hdu.header.iter()
    }

    pub fn value_as<T: HeaderValue>(&self, keyword: &str) -> Result<T, Error> {
        self.hdu.header.value_as(keyword)
    }

    /// Append a record in the slot currently occupied by `END`, then emit
    /// a fresh `END` one slot later.
    ///
    /// Append semantics: writing the same keyword twice produces two
    /// records. Fails with [`Error::HeaderFull`] once the header block has
    /// no slot left for a record plus its `END`.
    pub fn put_header(&mut self, keyword: &str, value: &str) -> Result<(), Error> {
        self.hdu.header.check_slot_available()?;
        let slot = self.hdu.header.num_records() as u64;
        let at = self.hdu.offset + slot * RECORD_LEN as u64;
        self.io.write_at(at, &card::emit(keyword, value))?;
        self.io
            .write_at(at + RECORD_LEN as u64, &card::emit_end())?;
        self.hdu
            .push_record(Record::new(keyword.to_ascii_uppercase(), value));
        Ok(())
    }

    /// Blocking positional write of raw bytes starting at `index`; returns
    /// the number of bytes transferred.
    ///
    /// Fails with [`Error::OutOfBounds`] when the index does not fit the
    /// shape or `bytes` would run past the end of the data block.
    pub fn write_data(&self, index: &[u64], bytes: &[u8]) -> Result<usize, Error> {
        self.hdu.write_data_at(self.io, index, bytes)
    }

    /// Queue a positional write of raw bytes starting at `index`; the
    /// token resolves with the number of bytes transferred.
    pub fn async_write_data(&self, index: &[u64], bytes: &[u8]) -> WriteAt {
        self.hdu.async_write_data_at(self.io, index, bytes)
    }

    /// Blocking typed write; fails with [`Error::UnsupportedBitpix`] when
    /// `T` does not match the HDU tag.
    pub fn write_elems<T: Element>(&self, index: &[u64], elems: &[T]) -> Result<usize, Error> {
        check_tag::<T>(self.hdu)?;
        self.write_data(index, &T::vec_to_be(elems))
    }

    /// Queued typed write; a tag mismatch is delivered through the token.
    pub fn async_write_elems<T: Element>(&self, index: &[u64], elems: &[T]) -> WriteAt {
        if let Err(e) = check_tag::<T>(self.hdu) {
            return WriteAt::failed(e);
        }
        self.async_write_data(index, &T::vec_to_be(elems))
    }
}
