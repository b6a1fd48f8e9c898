//! MGD77T tab-delimited codec
//!
//! Line 1 names the header items, line 2 holds their values. Every further
//! line is one data record of 26 tab-separated fields; empty fields are
//! absent values.

use super::{SEPARATOR, join_trimmed, parse_optional};
use crate::app::models::header_params::M77T_ITEMS;
use crate::app::models::{DataRecord, Format, Header, HeaderParams};
use crate::app::services::catalog;
use crate::app::services::codec::{RecordCodec, format_g8, read_line, wrong_filler, write_text};
use crate::constants::{MGD77T_HEADER_NAMES, field};
use crate::{Error, Result};
use std::io::{BufRead, Write};
use tracing::debug;

/// Data column of an MGD77T record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Number(usize),
    Text(usize),
    Date,
    Time,
}

/// MGD77T record layout, parallel to `MGD77T_DATA_NAMES`
const LAYOUT: [Column; 26] = {
    use Column::{Date, Number, Text, Time};
    [
        Text(field::ID),
        Number(field::TZ),
        Date,
        Time,
        Number(field::LAT),
        Number(field::LON),
        Number(field::PTC),
        Number(field::NQC),
        Number(field::TWT),
        Number(field::DEPTH),
        Number(field::BCC),
        Number(field::BTC),
        Number(field::BQC),
        Number(field::MTF1),
        Number(field::MTF2),
        Number(field::MAG),
        Number(field::MSENS),
        Number(field::DIUR),
        Number(field::MSD),
        Number(field::MQC),
        Number(field::GOBS),
        Number(field::EOT),
        Number(field::FAA),
        Number(field::GQC),
        Text(field::SLN),
        Text(field::SSPN),
    ]
};

/// Integer-valued code fields, with the code meaning "unspecified"
const CODE_FIELDS: [(usize, Option<f64>); 8] = [
    (field::PTC, Some(9.0)),
    (field::NQC, Some(9.0)),
    (field::BCC, Some(99.0)),
    (field::BTC, Some(9.0)),
    (field::BQC, None),
    (field::MSENS, None),
    (field::MQC, None),
    (field::GQC, None),
];

/// Codec for the MGD77T layout
#[derive(Debug, Clone, Default)]
pub struct M77tCodec {
    records_read: usize,
    records_written: usize,
}

impl M77tCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_date(token: &str, record: &mut DataRecord, record_no: usize) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(());
    }
    let parts = (token.len() == 8 && token.is_ascii())
        .then(|| {
            Some([
                token[0..4].parse::<f64>().ok()?,
                token[4..6].parse::<f64>().ok()?,
                token[6..8].parse::<f64>().ok()?,
            ])
        })
        .flatten()
        .ok_or_else(|| Error::conversion(record_no, "date", token))?;

    record.set_number(field::YEAR, parts[0]);
    record.set_number(field::MONTH, parts[1]);
    record.set_number(field::DAY, parts[2]);
    Ok(())
}

/// Decode one MGD77T data line
pub fn parse_record(line: &str, record_no: usize) -> Result<DataRecord> {
    let n_fields = line.split(SEPARATOR).count();
    if n_fields > LAYOUT.len() {
        return Err(Error::WrongDataRecordLength {
            record: record_no,
            length: n_fields,
            expected: LAYOUT.len(),
        });
    }

    let mut record = DataRecord::empty();
    record.set_number(field::DRT, 5.0);

    for (column, token) in LAYOUT.iter().zip(line.split(SEPARATOR)) {
        match *column {
            Column::Text(id) => record.set_word(id, token.trim()),
            Column::Number(id) => {
                let value = parse_optional(token, record_no, catalog::spec(id).abbrev)?;
                record.set_number(id, value);
            }
            Column::Date => parse_date(token, &mut record, record_no)?,
            Column::Time => {
                let hhmm = parse_optional(token, record_no, "time")?;
                if !hhmm.is_nan() {
                    let hour = (hhmm * 0.01).floor();
                    record.set_number(field::HOUR, hour);
                    record.set_number(field::MIN, hhmm - 100.0 * hour);
                }
            }
        }
    }

    record.assemble_time();
    Ok(record)
}

fn format_code(record: &DataRecord, id: usize, unspecified: Option<f64>) -> String {
    let value = record.number[id];
    if value.is_nan() || Some(value) == unspecified {
        String::new()
    } else {
        format!("{}", value.round() as i64)
    }
}

/// Encode one record as an MGD77T data line
pub fn format_record(record: &DataRecord) -> String {
    let fields: Vec<String> = LAYOUT
        .iter()
        .map(|column| match *column {
            Column::Text(id) => {
                let word = record.word(id);
                if id != field::ID && wrong_filler(word) {
                    String::new()
                } else {
                    word.to_string()
                }
            }
            Column::Date => {
                let [y, m, d] = [field::YEAR, field::MONTH, field::DAY].map(|i| record.number[i]);
                if y.is_nan() || m.is_nan() || d.is_nan() {
                    String::new()
                } else {
                    format!("{:04}{:02}{:02}", y as i64, m as i64, d as i64)
                }
            }
            Column::Time => {
                let (h, m) = (record.number[field::HOUR], record.number[field::MIN]);
                if h.is_nan() || m.is_nan() {
                    String::new()
                } else {
                    format_g8(100.0 * h + m)
                }
            }
            Column::Number(id) if id == field::TZ => {
                let tz = record.number[id];
                if tz.is_nan() {
                    String::new()
                } else {
                    format!("{}", tz.round() as i64)
                }
            }
            Column::Number(id) => match CODE_FIELDS.iter().find(|(f, _)| *f == id) {
                Some(&(_, unspecified)) => format_code(record, id, unspecified),
                None if record.number[id].is_nan() => String::new(),
                None => format_g8(record.number[id]),
            },
        })
        .collect();
    join_trimmed(&fields)
}

impl RecordCodec for M77tCodec {
    fn format(&self) -> Format {
        Format::M77T
    }

    fn read_header(&mut self, input: &mut dyn BufRead) -> Result<Header> {
        let mut names = String::new();
        if !read_line(input, &mut names)? {
            return Err(Error::read_header("empty MGD77T file"));
        }
        let first = names.split(SEPARATOR).next().unwrap_or("");
        if first != MGD77T_HEADER_NAMES[0] {
            return Err(Error::NoHeaderRecord {
                found: first.to_string(),
            });
        }

        let mut values = String::new();
        if !read_line(input, &mut values)? {
            return Err(Error::read_header("missing MGD77T header values"));
        }

        let mut params = HeaderParams::new();
        for (column, value) in M77T_ITEMS.iter().zip(values.split(SEPARATOR)) {
            params.set_m77t_value(*column, value);
        }
        debug!("Parsed MGD77T header with {} items", M77T_ITEMS.len());

        let mut header = catalog::plain_header(true);
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
        parse_record(&line, self.records_read).map(Some)
    }

    fn write_header(&mut self, header: &Header, out: &mut dyn Write) -> Result<()> {
        let params = &header.params[Header::ORIGINAL];
        let values: Vec<String> = M77T_ITEMS.iter().map(|c| params.m77t_value(*c)).collect();
        let text = format!("{}\n{}\n", MGD77T_HEADER_NAMES.join("\t"), values.join("\t"));
        self.records_written = 0;
        write_text(out, &text, Error::write_header)
    }

    fn write_record(&mut self, record: &DataRecord, out: &mut dyn Write) -> Result<()> {
        self.records_written += 1;
        let n = self.records_written;
        let line = format_record(record);
        write_text(out, &line, |m| Error::write_data(n, m))?;
        write_text(out, "\n", |m| Error::write_data(n, m))
    }
}
