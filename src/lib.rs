//! This crate implements asynchronous positional I/O over FITS image files
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```
//! use afits::{Bitpix, FitsReader, FitsWriter, HduSchema};
//!
//! let path = std::env::temp_dir().join("afits-doc-example.fits");
//!
//! let mut writer = FitsWriter::create(&path, &[
//!     HduSchema::new(Bitpix::U8, &[200, 300]),
//! ]).unwrap();
//! {
//!     let hdu = writer.hdu(0).unwrap();
//!     // one row of 300 bytes at the start of the second outer slab
//!     let pending = hdu.async_write_data(&[1], &[42; 300]);
//!     writer.run();
//!     assert_eq!(futures::executor::block_on(pending).unwrap(), 300);
//! }
//! writer.close().unwrap();
//!
//! let reader = FitsReader::open(&path).unwrap();
//! let hdu = reader.hdu(0).unwrap();
//! assert_eq!(hdu.value_as::<i64>("BITPIX").unwrap(), 8);
//! assert_eq!(hdu.axes(), [200, 300]);
//! # std::fs::remove_file(&path).unwrap();
//! ```

#![doc = include_str!("../README.md")]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    clippy::uninlined_format_args,
    clippy::match_same_arms
)]

#[macro_use]
extern crate quick_error;

pub mod block;
pub mod card;
pub mod error;
pub mod file;
pub mod hdu;
pub mod layout;
pub mod reader;
pub mod writer;

pub use error::Error;
pub use file::{FileIo, ReadAt, WriteAt};
pub use hdu::data::{DataAccess, ElemRead, Element, ImageData, TypedData};
pub use hdu::header::{Bitpix, Header};
pub use hdu::{Hdu, HduReader, HduWriter};
pub use layout::HduSchema;
pub use reader::FitsReader;
pub use writer::FitsWriter;

#[cfg(test)]
mod tests {
    use crate::hdu::data::DataAccess;
    use crate::{Bitpix, Element, Error, FitsReader, FitsWriter, HduSchema, ImageData};

    use std::path::PathBuf;

    use futures::executor::block_on;
    use tempfile::TempDir;

    fn schema_u8_f32() -> Vec<HduSchema> {
        vec![
            HduSchema::of::<u8>(&[200, 300]),
            HduSchema::of::<f32>(&[100, 50, 50]),
        ]
    }

    fn tmp(dir: &TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn test_single_u8_hdu_record_counts() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "single.fits");
        let mut writer =
            FitsWriter::create(&path, &[HduSchema::new(Bitpix::U8, &[200, 300])]).unwrap();

        let mut hdu = writer.hdu(0).unwrap();
        // SIMPLE, BITPIX, NAXIS, NAXIS1, NAXIS2, EXTEND
        assert_eq!(hdu.num_records(), 6);
        hdu.put_header("XTENSION", "TABLE ").unwrap();
        assert_eq!(hdu.num_records(), 7);
        assert_eq!(hdu.get_header("XTENSION").unwrap(), "TABLE ");
    }

    #[test]
    fn test_two_hdus_record_counts() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "two.fits");
        let mut writer = FitsWriter::create(&path, &schema_u8_f32()).unwrap();
        assert_eq!(writer.len(), 2);

        assert_eq!(writer.hdu(0).unwrap().num_records(), 6);
        assert_eq!(writer.hdu(1).unwrap().num_records(), 7);

        writer
            .hdu(0)
            .unwrap()
            .put_header("DATE-OBS", "1970-01-01")
            .unwrap();
        writer
            .hdu(1)
            .unwrap()
            .put_header("DATE-OBS", "1991-12-26")
            .unwrap();

        assert_eq!(writer.hdu(0).unwrap().num_records(), 7);
        assert_eq!(writer.hdu(1).unwrap().num_records(), 8);
        assert_eq!(
            writer.hdu(1).unwrap().get_header("date-obs").unwrap(),
            "1991-12-26"
        );
    }

    #[tokio::test]
    async fn test_f32_round_trip_async() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "roundtrip.fits");
        let values: Vec<f32> = (1..=10).map(|i| i as f32 / 10.0).collect();

        {
            let mut writer = FitsWriter::create(&path, &schema_u8_f32()).unwrap();
            let pending = writer.hdu(1).unwrap().async_write_elems(&[3, 2, 1], &values);
            assert_eq!(writer.run(), 1);
            // 10 f32 are 40 bytes
            assert_eq!(pending.await.unwrap(), 40);
            writer.close().unwrap();
        }

        let reader = FitsReader::open(&path).unwrap();
        assert_eq!(reader.len(), 2);
        let hdu = reader.hdu(1).unwrap();

        let raw = hdu.async_read_data(&[3, 2, 1], 40);
        let typed = match hdu.data() {
            ImageData::F32(data) => data.read_async(&[3, 2, 1], 10),
            _ => unreachable!(),
        };
        assert_eq!(reader.run(), 2);
        assert_eq!(raw.await.unwrap().len(), 40);
        assert_eq!(typed.await.unwrap(), values);
    }

    #[test]
    fn test_i16_reader_matches_on_disk_bytes() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "i16.fits");
        let elems: Vec<i16> = (0..24).map(|i| i * 100 - 1200).collect();

        {
            let mut writer =
                FitsWriter::create(&path, &[HduSchema::of::<i16>(&[6, 4])]).unwrap();
            let hdu = writer.hdu(0).unwrap();
            assert_eq!(hdu.write_elems(&[], &elems).unwrap(), 48);
            writer.close().unwrap();
        }

        let reader = FitsReader::open(&path).unwrap();
        let hdu = reader.hdu(0).unwrap();
        assert_eq!(hdu.value_as::<i64>("BITPIX").unwrap(), 16);

        // 10 i16 at [1, 2]: element offset 6, so 20 bytes from byte 12
        let mut buf = [0_u8; 20];
        assert_eq!(hdu.read_data(&[1, 2], &mut buf).unwrap(), 20);
        assert_eq!(buf.to_vec(), i16::vec_to_be(&elems[6..16]));
        assert_eq!(hdu.read_elems::<i16>(&[1, 2], 10).unwrap(), &elems[6..16]);
    }

    #[test]
    fn test_header_probe_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "probe.fits");
        let mut writer = FitsWriter::create(&path, &schema_u8_f32()).unwrap();
        {
            let mut hdu = writer.hdu(0).unwrap();
            hdu.put_header("DATE-OBS", "1970-01-01").unwrap();
            hdu.put_header("ORIGIN", "CDS").unwrap();
        }

        {
            let hdu = writer.hdu(0).unwrap();
            let pairs: Vec<(String, String)> = hdu
                .get_headers()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            for (keyword, value) in &pairs {
                assert_eq!(&hdu.value_as::<String>(keyword).unwrap(), value);
            }
            assert!(matches!(
                hdu.get_header("NON_EXISTING_KEY"),
                Err(Error::NotFound(_))
            ));
            assert!(hdu.get_header_opt("NON_EXISTING_KEY").is_none());
        }
        writer.close().unwrap();

        // the same probe holds on the re-parsed header
        let reader = FitsReader::open(&path).unwrap();
        let hdu = reader.hdu(0).unwrap();
        for (keyword, value) in hdu.get_headers() {
            assert_eq!(hdu.value_as::<String>(keyword).unwrap(), value);
        }
        assert_eq!(hdu.get_header("DATE-OBS").unwrap(), "1970-01-01");
        assert!(matches!(
            hdu.get_header("NON_EXISTING_KEY"),
            Err(Error::NotFound(_))
        ));
        assert!(hdu.get_header_opt("NON_EXISTING_KEY").is_none());
    }

    #[test]
    fn test_out_of_bounds_write() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "oob.fits");
        let mut writer =
            FitsWriter::create(&path, &[HduSchema::of::<f64>(&[100, 50, 50])]).unwrap();
        let hdu = writer.hdu(0).unwrap();
        assert!(matches!(
            hdu.write_data(&[101, 2], &[0; 3]),
            Err(Error::OutOfBounds)
        ));
        // the queued flavor delivers the same error through the token
        let pending = hdu.async_write_data(&[101, 2], &[0; 3]);
        assert!(matches!(block_on(pending), Err(Error::OutOfBounds)));
    }

    #[test]
    fn test_boundary_indices() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "boundary.fits");
        let mut writer =
            FitsWriter::create(&path, &[HduSchema::of::<u8>(&[200, 300])]).unwrap();
        let hdu = writer.hdu(0).unwrap();

        // maximal valid index of each axis
        assert_eq!(hdu.write_data(&[199, 299], &[0xff]).unwrap(), 1);
        // one past each axis
        assert!(matches!(
            hdu.write_data(&[200], &[0xff]),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            hdu.write_data(&[199, 300], &[0xff]),
            Err(Error::OutOfBounds)
        ));
        // a run overflowing the data block
        assert!(matches!(
            hdu.write_data(&[199, 299], &[0; 2000]),
            Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn test_typed_tag_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "mismatch.fits");
        let mut writer =
            FitsWriter::create(&path, &[HduSchema::of::<f32>(&[10, 10])]).unwrap();
        let hdu = writer.hdu(0).unwrap();
        assert!(matches!(
            hdu.write_elems::<i16>(&[0, 0], &[1, 2]),
            Err(Error::UnsupportedBitpix(16))
        ));
        let pending = hdu.async_write_elems::<f64>(&[0, 0], &[1.0]);
        assert!(matches!(
            block_on(pending),
            Err(Error::UnsupportedBitpix(-64))
        ));
    }

    #[test]
    fn test_fresh_file_reads_back_its_schema() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "schema.fits");
        let schema = schema_u8_f32();
        FitsWriter::create(&path, &schema).unwrap().close().unwrap();

        let reader = FitsReader::open(&path).unwrap();
        assert_eq!(reader.len(), schema.len());
        for (hdu, expected) in reader.hdus().zip(&schema) {
            assert_eq!(hdu.bitpix(), expected.bitpix);
            assert_eq!(hdu.axes(), &expected.axes[..]);
            assert_eq!(
                hdu.value_as::<i64>("BITPIX").unwrap(),
                expected.bitpix.value()
            );
            assert_eq!(
                hdu.value_as::<u64>("NAXIS").unwrap(),
                expected.axes.len() as u64
            );
            // every HDU starts on a block boundary
            assert_eq!(hdu.hdu().offset() % 2880, 0);
        }
        assert_eq!(reader.hdu(1).unwrap().hdu().offset(), 2880 + 60_480);
    }

    #[test]
    fn test_stop_cancels_queued_data_writes() {
        let dir = TempDir::new().unwrap();
        let path = tmp(&dir, "cancel.fits");
        let mut writer =
            FitsWriter::create(&path, &[HduSchema::of::<u8>(&[16])]).unwrap();
        let pending = writer.hdu(0).unwrap().async_write_data(&[0], &[1; 16]);
        assert_eq!(writer.stop(), 1);
        assert!(matches!(block_on(pending), Err(Error::Cancelled)));
    }
}
