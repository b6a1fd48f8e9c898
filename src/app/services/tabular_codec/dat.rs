//! Generic tab-delimited table codec
//!
//! The file starts with the 24-record fixed-width header block, followed by
//! a `#rec` line naming the columns. Each data line carries the 27 raw
//! fields in record order.

use super::{SEPARATOR, parse_optional};
use crate::app::models::{DataRecord, Format, Header};
use crate::app::services::codec::{RecordCodec, all_nines, read_line, write_text};
use crate::app::services::m77_codec::{header, read_header_block, write_header_block};
use crate::app::services::catalog;
use crate::constants::{DAT_COLUMN_ORDER, MGD77_N_DATA_FIELDS, field};
use crate::{Error, Result};
use std::io::{BufRead, Write};
use tracing::debug;

/// Codec for the DAT table layout
#[derive(Debug, Clone, Default)]
pub struct DatCodec {
    records_read: usize,
    records_written: usize,
}

impl DatCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decode one table line
pub fn parse_record(line: &str, record_no: usize) -> Result<DataRecord> {
    let n_fields = line.split(SEPARATOR).count();
    if n_fields > MGD77_N_DATA_FIELDS {
        return Err(Error::WrongDataRecordLength {
            record: record_no,
            length: n_fields,
            expected: MGD77_N_DATA_FIELDS,
        });
    }

    let mut record = DataRecord::empty();

    for (id, token) in line.split(SEPARATOR).enumerate() {
        if id == field::DRT && !(token.starts_with('3') || token.starts_with('5')) {
            return Err(Error::NoDataRecord { record: record_no });
        }
        if DataRecord::is_text_field(id) {
            let word = token.trim();
            record.word[id - field::ID] = word.to_string();
            if !word.is_empty() && !all_nines(word) {
                record.bit_pattern |= 1 << id;
            }
        } else if token.starts_with('N') {
            record.set_number(id, f64::NAN);
        } else {
            let value = parse_optional(token, record_no, catalog::spec(id).abbrev)?;
            record.set_number(id, value);
        }
    }

    record.assemble_time();
    Ok(record)
}

/// Encode one record as a table line
pub fn format_record(record: &DataRecord) -> String {
    (0..MGD77_N_DATA_FIELDS)
        .map(|id| {
            if DataRecord::is_text_field(id) {
                record.word(id).to_string()
            } else {
                let value = record.number[id];
                if id == field::DRT && value.is_nan() {
                    "5".to_string()
                } else if value.is_nan() {
                    "NaN".to_string()
                } else {
                    format!("{}", value)
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\t")
}

/// Consume the column-order line if the next line is one
fn skip_column_order(input: &mut dyn BufRead) -> Result<()> {
    let buffer = input
        .fill_buf()
        .map_err(|e| Error::io("Failed to read column order line", e))?;
    if buffer.first() == Some(&b'#') {
        let mut line = String::new();
        read_line(input, &mut line)?;
    }
    Ok(())
}

impl RecordCodec for DatCodec {
    fn format(&self) -> Format {
        Format::Dat
    }

    fn read_header(&mut self, input: &mut dyn BufRead) -> Result<Header> {
        let records = read_header_block(input)?;
        let params = header::parse_records(&records)?;
        skip_column_order(input)?;
        debug!("Parsed DAT header block");

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
            if !line.trim().is_empty() && !line.starts_with('#') {
                break;
            }
        }
        self.records_read += 1;
        parse_record(&line, self.records_read).map(Some)
    }

    fn write_header(&mut self, header: &Header, out: &mut dyn Write) -> Result<()> {
        self.records_written = 0;
        write_header_block(header, out)?;
        write_text(out, DAT_COLUMN_ORDER, Error::write_header)?;
        write_text(out, "\n", Error::write_header)
    }

    fn write_record(&mut self, record: &DataRecord, out: &mut dyn Write) -> Result<()> {
        self.records_written += 1;
        let n = self.records_written;
        let line = format_record(record);
        write_text(out, &line, |m| Error::write_data(n, m))?;
        write_text(out, "\n", |m| Error::write_data(n, m))
    }
}
