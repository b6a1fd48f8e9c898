//! Fixed-width MGD77 codec
//!
//! Reads and writes the 24-record header block and the 120-character data
//! records of the legacy punch-card layout.
//!
//! ## Architecture
//!
//! - [`header`] - header block validation and the item placement table
//! - [`record`] - data record decoding, legacy upgrade and encoding
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mgd77_codec::app::services::codec::RecordCodec;
//! use mgd77_codec::app::services::m77_codec::M77Codec;
//! use mgd77_codec::Config;
//! use std::io::BufReader;
//!
//! # fn example() -> mgd77_codec::Result<()> {
//! let file = std::fs::File::open("01010083.mgd77").unwrap();
//! let mut input = BufReader::new(file);
//! let mut codec = M77Codec::new(&Config::default());
//! let header = codec.read_header(&mut input)?;
//! while let Some(record) = codec.read_record(&mut input)? {
//!     println!("{} {}", record.number[7], record.number[8]);
//! }
//! # let _ = header;
//! # Ok(())
//! # }
//! ```

pub mod header;
pub mod record;

#[cfg(test)]
pub mod tests;

use crate::app::models::header_params::item;
use crate::app::models::{DataRecord, Format, Header};
use crate::app::services::catalog;
use crate::app::services::codec::{RecordCodec, read_line, write_text};
use crate::config::Config;
use crate::constants::MGD77_N_HEADER_RECORDS;
use crate::{Error, Result};
use std::io::{BufRead, Write};
use tracing::debug;

/// Codec for the fixed-width MGD77 layout
#[derive(Debug, Clone)]
pub struct M77Codec {
    oldest_yy: i32,
    records_read: usize,
    records_written: usize,
}

impl M77Codec {
    pub fn new(config: &Config) -> Self {
        Self {
            oldest_yy: config.oldest_yy,
            records_read: 0,
            records_written: 0,
        }
    }
}

/// Read the 24 header lines of a fixed-width header block
pub(crate) fn read_header_block(input: &mut dyn BufRead) -> Result<Vec<String>> {
    let mut records = Vec::with_capacity(MGD77_N_HEADER_RECORDS);
    let mut line = String::new();
    for n in 0..MGD77_N_HEADER_RECORDS {
        if !read_line(input, &mut line)? {
            return Err(Error::read_header(format!(
                "unexpected end of file after {} header records",
                n
            )));
        }
        if n == 0 && !(line.starts_with('1') || line.starts_with('4')) {
            return Err(Error::NoHeaderRecord {
                found: line.chars().take(1).collect(),
            });
        }
        records.push(line.clone());
    }
    Ok(records)
}

/// Write the 24 header lines of a fixed-width header block
pub(crate) fn write_header_block(header: &Header, out: &mut dyn Write) -> Result<()> {
    for line in header::format_records(&header.params[Header::ORIGINAL]) {
        write_text(out, &line, Error::write_header)?;
        write_text(out, "\n", Error::write_header)?;
    }
    Ok(())
}

impl RecordCodec for M77Codec {
    fn format(&self) -> Format {
        Format::M77
    }

    fn read_header(&mut self, input: &mut dyn BufRead) -> Result<Header> {
        let records = read_header_block(input)?;
        let params = header::parse_records(&records)?;
        debug!(
            "Parsed MGD77 header for survey '{}'",
            params.get(item::SURVEY_IDENTIFIER)
        );

        let mut header = catalog::plain_header(false);
        header.params = [params.clone(), params];
        self.records_read = 0;
        Ok(header)
    }

    fn read_record(&mut self, input: &mut dyn BufRead) -> Result<Option<DataRecord>> {
        let mut line = String::new();
        loop {
            if !read_line(input, &mut line)? {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        self.records_read += 1;
        record::parse_record(&line, self.records_read, self.oldest_yy).map(Some)
    }

    fn write_header(&mut self, header: &Header, out: &mut dyn Write) -> Result<()> {
        self.records_written = 0;
        write_header_block(header, out)
    }

    fn write_record(&mut self, record: &DataRecord, out: &mut dyn Write) -> Result<()> {
        self.records_written += 1;
        let line = record::format_record(record, self.records_written);
        let n = self.records_written;
        write_text(out, &line, |m| Error::write_data(n, m))?;
        write_text(out, "\n", |m| Error::write_data(n, m))
    }
}
