//! Typed access to a data block, dispatched over the stored `BITPIX` tag.
//!
//! The raw byte API of the crate never reorders bytes; this layer is the
//! opt-in place where elements are encoded to and decoded from the
//! big-endian order the format stores on disk.

use std::marker::PhantomData;
use std::pin::Pin;

use byteorder::{BigEndian, ByteOrder};
use futures::task::{Context, Poll};
use futures::Future;

use crate::error::Error;
use crate::file::{FileIo, ReadAt};
use crate::hdu::header::Bitpix;
use crate::hdu::Hdu;

/// A scalar a data block can be made of, tied to its `BITPIX` tag.
pub trait Element: Copy {
    const BITPIX: Bitpix;

    fn read_be(buf: &[u8]) -> Self;
    fn write_be(self, buf: &mut [u8]);

    /// Decode a big-endian byte run into elements.
    fn vec_from_be(bytes: &[u8]) -> Vec<Self> {
        bytes
            .chunks_exact(Self::BITPIX.byte_size() as usize)
            .map(Self::read_be)
            .collect()
    }

    /// Encode elements into the big-endian byte run the format stores.
    fn vec_to_be(elems: &[Self]) -> Vec<u8> {
        let size = Self::BITPIX.byte_size() as usize;
        let mut bytes = vec![0_u8; elems.len() * size];
        for (chunk, e) in bytes.chunks_exact_mut(size).zip(elems) {
            e.write_be(chunk);
        }
        bytes
    }
}

impl Element for u8 {
    const BITPIX: Bitpix = Bitpix::U8;

    fn read_be(buf: &[u8]) -> Self {
        buf[0]
    }
    fn write_be(self, buf: &mut [u8]) {
        buf[0] = self;
    }
}

impl Element for i16 {
    const BITPIX: Bitpix = Bitpix::I16;

    fn read_be(buf: &[u8]) -> Self {
        BigEndian::read_i16(buf)
    }
    fn write_be(self, buf: &mut [u8]) {
        BigEndian::write_i16(buf, self);
    }
}

impl Element for i32 {
    const BITPIX: Bitpix = Bitpix::I32;

    fn read_be(buf: &[u8]) -> Self {
        BigEndian::read_i32(buf)
    }
    fn write_be(self, buf: &mut [u8]) {
        BigEndian::write_i32(buf, self);
    }
}

impl Element for i64 {
    const BITPIX: Bitpix = Bitpix::I64;

    fn read_be(buf: &[u8]) -> Self {
        BigEndian::read_i64(buf)
    }
    fn write_be(self, buf: &mut [u8]) {
        BigEndian::write_i64(buf, self);
    }
}

impl Element for f32 {
    const BITPIX: Bitpix = Bitpix::F32;

    fn read_be(buf: &[u8]) -> Self {
        BigEndian::read_f32(buf)
    }
    fn write_be(self, buf: &mut [u8]) {
        BigEndian::write_f32(buf, self);
    }
}

impl Element for f64 {
    const BITPIX: Bitpix = Bitpix::F64;

    fn read_be(buf: &[u8]) -> Self {
        BigEndian::read_f64(buf)
    }
    fn write_be(self, buf: &mut [u8]) {
        BigEndian::write_f64(buf, self);
    }
}

/// The read capability set of a typed view, over both the blocking and the
/// queued flavor of positional I/O.
pub trait DataAccess {
    type Elem: Element;

    /// Blocking positional read of `n` elements starting at `index`.
    fn read(&self, index: &[u64], n: usize) -> Result<Vec<Self::Elem>, Error>;

    /// Queue a positional read of `n` elements starting at `index`; the
    /// returned token resolves once the engine has run the operation.
    fn read_async(&self, index: &[u64], n: usize) -> ElemRead<Self::Elem>;
}

/// Typed view over the data block of one HDU.
#[derive(Debug)]
pub struct TypedData<'a, T> {
    hdu: &'a Hdu,
    io: &'a FileIo,
    _t: PhantomData<T>,
}

impl<'a, T: Element> TypedData<'a, T> {
    pub(crate) fn new(hdu: &'a Hdu, io: &'a FileIo) -> Self {
        Self {
            hdu,
            io,
            _t: PhantomData,
        }
    }
}

impl<T: Element> DataAccess for TypedData<'_, T> {
    type Elem = T;

    fn read(&self, index: &[u64], n: usize) -> Result<Vec<T>, Error> {
        let mut buf = vec![0_u8; n * T::BITPIX.byte_size() as usize];
        self.hdu.read_data_at(self.io, index, &mut buf)?;
        Ok(T::vec_from_be(&buf))
    }

    fn read_async(&self, index: &[u64], n: usize) -> ElemRead<T> {
        let len = n * T::BITPIX.byte_size() as usize;
        ElemRead::new(self.hdu.async_read_data_at(self.io, index, len))
    }
}

/// Tagged typed view, the variant chosen from the `BITPIX` of the HDU.
#[derive(Debug)]
pub enum ImageData<'a> {
    U8(TypedData<'a, u8>),
    I16(TypedData<'a, i16>),
    I32(TypedData<'a, i32>),
    I64(TypedData<'a, i64>),
    F32(TypedData<'a, f32>),
    F64(TypedData<'a, f64>),
}

impl<'a> ImageData<'a> {
    pub(crate) fn new(hdu: &'a Hdu, io: &'a FileIo) -> Self {
        match hdu.bitpix() {
            Bitpix::U8 => ImageData::U8(TypedData::new(hdu, io)),
            Bitpix::I16 => ImageData::I16(TypedData::new(hdu, io)),
            Bitpix::I32 => ImageData::I32(TypedData::new(hdu, io)),
            Bitpix::I64 => ImageData::I64(TypedData::new(hdu, io)),
            Bitpix::F32 => ImageData::F32(TypedData::new(hdu, io)),
            Bitpix::F64 => ImageData::F64(TypedData::new(hdu, io)),
        }
    }
}

/// Completion token of a queued typed read: the raw completion with the
/// big-endian decode applied on resolution.
#[derive(Debug)]
pub struct ElemRead<T> {
    inner: ReadAt,
    _t: PhantomData<T>,
}

// T is phantom only, the token never stores an element
impl<T> Unpin for ElemRead<T> {}

impl<T: Element> ElemRead<T> {
    pub(crate) fn new(inner: ReadAt) -> Self {
        Self {
            inner,
            _t: PhantomData,
        }
    }

    pub(crate) fn failed(err: Error) -> Self {
        Self::new(ReadAt::failed(err))
    }
}

impl<T: Element> Future for ElemRead<T> {
    type Output = Result<Vec<T>, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.map(|bytes| T::vec_from_be(&bytes))),
            Poll::Pending => Poll::Pending,
        }
    }
}
