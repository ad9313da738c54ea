//! Positional file I/O engine.
//!
//! [`FileIo`] owns the open file handle and the queue of asynchronous
//! operations targeting it. Reads and writes address absolute byte offsets
//! and never share a cursor, so independent transfers need no seek in
//! between. Queued operations are executed, and their completions
//! delivered in issue order, when [`FileIo::run`] is called.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::pin::Pin;

use futures::channel::oneshot;
use futures::task::{Context, Poll};
use futures::Future;

use crate::error::Error;

#[derive(Debug)]
enum Pending {
    Read {
        off: u64,
        len: usize,
        tx: oneshot::Sender<Result<Vec<u8>, Error>>,
    },
    Write {
        off: u64,
        bytes: Vec<u8>,
        tx: oneshot::Sender<Result<usize, Error>>,
    },
}

/// One open file and the queue of its pending asynchronous operations.
///
/// The handle is owned exclusively; everything else in the crate addresses
/// the file through a borrow of its engine.
#[derive(Debug)]
pub struct FileIo {
    file: File,
    queue: RefCell<VecDeque<Pending>>,
}

impl FileIo {
    /// Open an existing file for positional reads; fails if `path` does
    /// not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self::from_file(file))
    }

    /// Create a file for positional writes, discarding any pre-existing
    /// content.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        Self {
            file,
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn file_size(&self) -> Result<u64, Error> {
        Ok(self.file.metadata()?.len())
    }

    /// Reserve `len` bytes; the extension reads back as zeroes without
    /// being written out.
    pub(crate) fn set_len(&self, len: u64) -> Result<(), Error> {
        self.file.set_len(len)?;
        Ok(())
    }

    pub(crate) fn sync_all(&self) -> Result<(), Error> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Blocking positional read filling the whole of `buf`; returns the
    /// number of bytes transferred.
    pub fn read_at(&self, off: u64, buf: &mut [u8]) -> Result<usize, Error> {
        pread_exact(&self.file, buf, off)?;
        Ok(buf.len())
    }

    /// Blocking positional write of the whole of `bytes`; returns the
    /// number of bytes transferred.
    pub fn write_at(&self, off: u64, bytes: &[u8]) -> Result<usize, Error> {
        pwrite_all(&self.file, bytes, off)?;
        Ok(bytes.len())
    }

    /// Queue a positional read of `len` bytes at `off`.
    ///
    /// The returned future is the completion token: it resolves with the
    /// bytes once [`run`](Self::run) has driven the operation, or with
    /// [`Error::Cancelled`] if the operation was stopped or the engine
    /// dropped first.
    pub fn async_read_at(&self, off: u64, len: usize) -> ReadAt {
        let (tx, rx) = oneshot::channel();
        self.queue.borrow_mut().push_back(Pending::Read { off, len, tx });
        ReadAt { rx }
    }

    /// Queue a positional write of `bytes` at `off`.
    ///
    /// The returned future resolves with the number of bytes transferred.
    pub fn async_write_at(&self, off: u64, bytes: Vec<u8>) -> WriteAt {
        let (tx, rx) = oneshot::channel();
        self.queue.borrow_mut().push_back(Pending::Write { off, bytes, tx });
        WriteAt { rx }
    }

    /// Drive every queued operation to completion on the calling thread,
    /// delivering each result to its token.
    ///
    /// Completions are delivered in issue order by a single consumer, so
    /// writes targeting overlapping byte ranges land in the order they
    /// were queued. Returns the number of completions delivered.
    pub fn run(&self) -> usize {
        let mut completed = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(op) => {
                    self.complete(op);
                    completed += 1;
                }
                None => break completed,
            }
        }
    }

    /// Cancel every pending operation; each token resolves with
    /// [`Error::Cancelled`]. Returns the number of operations cancelled.
    ///
    /// Operations queued afterwards are served by the next
    /// [`run`](Self::run).
    pub fn stop(&self) -> usize {
        let mut cancelled = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(Pending::Read { tx, .. }) => {
                    let _ = tx.send(Err(Error::Cancelled));
                    cancelled += 1;
                }
                Some(Pending::Write { tx, .. }) => {
                    let _ = tx.send(Err(Error::Cancelled));
                    cancelled += 1;
                }
                None => break cancelled,
            }
        }
    }

    fn complete(&self, op: Pending) {
        match op {
            Pending::Read { off, len, tx } => {
                let mut buf = vec![0_u8; len];
                let res = self.read_at(off, &mut buf).map(|_| buf);
                let _ = tx.send(res);
            }
            Pending::Write { off, bytes, tx } => {
                let _ = tx.send(self.write_at(off, &bytes));
            }
        }
    }
}

/// Completion token of a queued positional read.
#[derive(Debug)]
pub struct ReadAt {
    rx: oneshot::Receiver<Result<Vec<u8>, Error>>,
}

impl ReadAt {
    /// A token that failed before being queued.
    pub(crate) fn failed(err: Error) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { rx }
    }
}

impl Future for ReadAt {
    type Output = Result<Vec<u8>, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            // the engine went away with the operation still queued
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Completion token of a queued positional write.
#[derive(Debug)]
pub struct WriteAt {
    rx: oneshot::Receiver<Result<usize, Error>>,
}

impl WriteAt {
    /// A token that failed before being queued.
    pub(crate) fn failed(err: Error) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { rx }
    }
}

impl Future for WriteAt {
    type Output = Result<usize, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(Error::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(unix)]
fn pread_exact(file: &File, buf: &mut [u8], off: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, off)
}

#[cfg(unix)]
fn pwrite_all(file: &File, bytes: &[u8], off: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(bytes, off)
}

#[cfg(windows)]
fn pread_exact(file: &File, mut buf: &mut [u8], mut off: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, off) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                off += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn pwrite_all(file: &File, mut bytes: &[u8], mut off: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !bytes.is_empty() {
        match file.seek_write(bytes, off) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                bytes = &bytes[n..];
                off += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FileIo;
    use crate::error::Error;

    use futures::executor::block_on;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FileIo::open(dir.path().join("absent")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_positional_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("positional");

        let out = FileIo::create(&path).unwrap();
        // out-of-order offsets, no seeks in between
        assert_eq!(out.write_at(8, b"world").unwrap(), 5);
        assert_eq!(out.write_at(0, b"hello").unwrap(), 5);

        let inp = FileIo::open(&path).unwrap();
        let mut buf = [0_u8; 5];
        assert_eq!(inp.read_at(8, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        inp.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_async_completions_in_issue_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ordered");

        let out = FileIo::create(&path).unwrap();
        // both target the same range: the second queued write must win
        let first = out.async_write_at(0, b"aaaa".to_vec());
        let second = out.async_write_at(0, b"bbbb".to_vec());
        assert_eq!(out.run(), 2);
        assert_eq!(block_on(first).unwrap(), 4);
        assert_eq!(block_on(second).unwrap(), 4);

        let inp = FileIo::open(&path).unwrap();
        let pending = inp.async_read_at(0, 4);
        assert_eq!(inp.run(), 1);
        assert_eq!(block_on(pending).unwrap(), b"bbbb");
    }

    #[test]
    fn test_stop_cancels_pending_operations() {
        let dir = TempDir::new().unwrap();
        let out = FileIo::create(dir.path().join("stopped")).unwrap();

        let pending = out.async_write_at(0, b"data".to_vec());
        assert_eq!(out.stop(), 1);
        assert!(matches!(block_on(pending), Err(Error::Cancelled)));

        // the engine keeps serving operations queued after a stop
        let later = out.async_write_at(0, b"data".to_vec());
        assert_eq!(out.run(), 1);
        assert_eq!(block_on(later).unwrap(), 4);
    }

    #[test]
    fn test_dropping_the_engine_cancels_tokens() {
        let dir = TempDir::new().unwrap();
        let out = FileIo::create(dir.path().join("dropped")).unwrap();
        let pending = out.async_write_at(0, b"data".to_vec());
        drop(out);
        assert!(matches!(block_on(pending), Err(Error::Cancelled)));
    }

    #[test]
    fn test_run_reports_io_failure_to_the_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short");
        let out = FileIo::create(&path).unwrap();
        out.write_at(0, b"abc").unwrap();

        let inp = FileIo::open(&path).unwrap();
        // reads past the end of the file cannot be satisfied in full
        let pending = inp.async_read_at(0, 64);
        assert_eq!(inp.run(), 1);
        assert!(matches!(block_on(pending), Err(Error::Io(_))));
    }
}
