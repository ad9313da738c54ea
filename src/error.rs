use std::io;
use std::path::PathBuf;

quick_error! {
    /// All the error kinds the crate can surface.
    ///
    /// Errors always propagate to the caller; the crate performs no retries
    /// and no implicit recovery.
    #[derive(Debug)]
    pub enum Error {
        /// A required header keyword is missing.
        NotFound(keyword: String) {
            display("keyword '{}' not found", keyword)
        }
        /// An index does not fit the HDU shape, or the addressed byte range
        /// would overflow the data block.
        OutOfBounds {
            display("index or byte range exceeds the HDU shape")
        }
        /// No record slot left in the 2880 byte header block.
        HeaderFull {
            display("header block full, no record slot left")
        }
        /// A header value could not be converted to the requested type.
        Parse(keyword: String, value: String) {
            display("cannot convert value '{}' of keyword '{}'", value, keyword)
        }
        /// A structural violation found while scanning a file.
        Format(path: PathBuf, cause: Box<Error>) {
            display("malformed FITS file '{}': {}", path.display(), cause)
            source(&**cause)
        }
        /// A `BITPIX` value outside the supported set, or an element type
        /// that does not match the HDU tag.
        UnsupportedBitpix(value: i64) {
            display("unsupported BITPIX value {}", value)
        }
        /// Underlying file system or kernel error.
        Io(err: io::Error) {
            from()
            display("i/o error: {}", err)
            source(err)
        }
        /// The operation was aborted by [`stop`](crate::FileIo::stop) before
        /// it ran.
        Cancelled {
            display("operation cancelled")
        }
    }
}
