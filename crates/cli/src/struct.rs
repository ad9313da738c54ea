use std::{error::Error, path::PathBuf};

use clap::Args;

use afits::{FitsReader, HduReader};

#[derive(Debug, Clone, Args)]
pub struct Struct {
    /// Path of the input file.
    #[clap(value_name = "FILE")]
    pub input: PathBuf,
}

impl Struct {
    pub fn exec(self) -> Result<(), Box<dyn Error>> {
        let reader = FitsReader::open(&self.input)?;
        for (i, hdu) in reader.hdus().enumerate() {
            print_hdu_struct(i, &hdu);
        }
        Ok(())
    }
}

fn print_hdu_struct(i: usize, hdu: &HduReader) {
    println!("HDU[{}]:", i);
    println!(
        " * HEAD naxis: {}; bitpix: {:?}; dimensions: {}.",
        hdu.naxis(),
        hdu.bitpix(),
        hdu.axes()
            .iter()
            .map(|d| d.to_string())
            .reduce(|mut s, d| {
                s.push('x');
                s.push_str(&d);
                s
            })
            .unwrap_or_else(|| String::from("0"))
    );
    println!(
        " * DATA starting byte: {}; byte size: {}.",
        hdu.hdu().data_offset(),
        hdu.hdu().data_block_size()
    );
}
