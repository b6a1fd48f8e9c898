//! Shared contract for the text record codecs

use crate::app::models::{DataRecord, Format, Header};
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// A line-oriented codec for one text format
///
/// Codecs are stateful only in their record counter, which is used to
/// label errors.
pub trait RecordCodec {
    /// Format handled by this codec
    fn format(&self) -> Format;

    /// Read the header block, leaving the input positioned at the first data line
    fn read_header(&mut self, input: &mut dyn BufRead) -> Result<Header>;

    /// Read the next data record, or `None` at end of data
    fn read_record(&mut self, input: &mut dyn BufRead) -> Result<Option<DataRecord>>;

    /// Write the header block
    fn write_header(&mut self, header: &Header, out: &mut dyn Write) -> Result<()>;

    /// Write one data record
    fn write_record(&mut self, record: &DataRecord, out: &mut dyn Write) -> Result<()>;
}

/// Read one line without its line ending
///
/// Lines that are not valid UTF-8 are taken as Latin-1, one character per
/// byte, so fixed-width columns stay aligned. Returns `Ok(false)` at end of
/// input.
pub fn read_line(input: &mut dyn BufRead, line: &mut String) -> Result<bool> {
    line.clear();
    let mut bytes = Vec::new();
    let n = input
        .read_until(b'\n', &mut bytes)
        .map_err(|e| Error::io("Failed to read line", e))?;
    if n == 0 {
        return Ok(false);
    }
    while matches!(bytes.last(), Some(b'\n' | b'\r')) {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(text) => line.push_str(&text),
        Err(e) => line.extend(e.as_bytes().iter().map(|&b| char::from(b))),
    }
    Ok(true)
}

/// Write text and map failures onto the codec's error kind
pub fn write_text(out: &mut dyn Write, text: &str, on_error: impl FnOnce(String) -> Error) -> Result<()> {
    out.write_all(text.as_bytes())
        .map_err(|e| on_error(e.to_string()))
}

/// True when a text field holds only filler characters
///
/// Filler is a non-empty run of a single `0`, `9` or `?`.
pub fn wrong_filler(field: &str) -> bool {
    let Some(first) = field.chars().next() else {
        return false;
    };
    matches!(first, '0' | '9' | '?') && field.chars().all(|c| c == first)
}

/// True when a text field is a run of nines, meaning "not given"
pub fn all_nines(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b == b'9')
}

/// C-style `%.8g` formatting
pub fn format_g8(value: f64) -> String {
    format_general(value, 8)
}

/// C-style `%.<precision>g` formatting
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let precision = precision.max(1);
    let exponent = value.abs().log10().floor() as i32;
    let sci = format!("{:.*e}", precision - 1, value);
    // Rounding may bump the exponent (9.99999999 -> 1.0e1)
    let exponent = sci
        .split('e')
        .nth(1)
        .and_then(|e| e.parse::<i32>().ok())
        .unwrap_or(exponent);

    if exponent < -4 || exponent >= precision as i32 {
        let (mantissa, _) = sci.split_once('e').unwrap_or((&sci, ""));
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
