//! Fixed-width MGD77 data records

use crate::app::models::DataRecord;
use crate::app::services::catalog::{self, FieldSpec};
use crate::app::services::codec::all_nines;
use crate::constants::{
    MGD77_FLOAT_BITS, MGD77_N_DATA_FIELDS, MGD77_RECORD_LENGTH, field, field_bit,
};
use crate::{Error, Result};
use tracing::warn;

/// Rewrite a legacy type-3 record as a type-5 record in place
///
/// Two-digit years below `oldest_yy` land in the 21st century. A year of
/// 99 followed by an unset date and time stays "not given".
pub fn upgrade_legacy(line: &mut [u8], oldest_yy: i32) {
    if line.first() != Some(&b'3') || line.len() < 27 {
        return;
    }
    line[0] = b'5';
    line[10] = line[12];
    line[11] = line[13];

    let yy = std::str::from_utf8(&line[14..16])
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok());
    let Some(yy) = yy else { return };

    let century: &[u8; 2] = if yy == 99 && &line[16..27] == b"99999999999" {
        b"99"
    } else if yy < oldest_yy {
        b"20"
    } else {
        b"19"
    };
    line[12..14].copy_from_slice(century);
}

/// Slice of a record addressed by 1-based start column
fn slice<'a>(line: &'a str, spec: &FieldSpec) -> &'a str {
    &line[spec.start - 1..spec.start - 1 + spec.length]
}

/// Decode one 120-character data record
pub fn parse_record(raw: &str, record_no: usize, oldest_yy: i32) -> Result<DataRecord> {
    if !(raw.starts_with('3') || raw.starts_with('5')) {
        return Err(Error::NoDataRecord { record: record_no });
    }
    if let Some((column, found)) = raw.chars().enumerate().find(|(_, c)| !c.is_ascii()) {
        return Err(Error::NonAsciiRecord {
            record: record_no,
            column: column + 1,
            found,
        });
    }
    if raw.len() != MGD77_RECORD_LENGTH {
        return Err(Error::WrongDataRecordLength {
            record: record_no,
            length: raw.len(),
            expected: MGD77_RECORD_LENGTH,
        });
    }

    let mut bytes = raw.as_bytes().to_vec();
    upgrade_legacy(&mut bytes, oldest_yy);
    // Only ASCII bytes were moved, so the buffer is still valid text
    let line = String::from_utf8_lossy(&bytes);

    let mut record = DataRecord::empty();
    for id in 0..MGD77_N_DATA_FIELDS {
        let spec = catalog::spec(id);
        let text = slice(&line, spec);

        if DataRecord::is_text_field(id) {
            record.word[id - field::ID] = text.trim().to_string();
            if !all_nines(text) {
                record.bit_pattern |= field_bit(id);
            }
            continue;
        }

        let may_convert = MGD77_FLOAT_BITS & field_bit(id) == 0 || text != spec.not_given;
        if !may_convert {
            continue;
        }
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| Error::conversion(record_no, spec.abbrev, text))?;
        record.set_number(id, value as f64 / spec.divisor);
    }

    record.assemble_time();
    Ok(record)
}

/// Encode one numeric field at its fixed width
fn format_number(value: f64, spec: &FieldSpec, record_no: usize) -> String {
    if value.is_nan() {
        return spec.not_given.to_string();
    }
    let scaled = (value * spec.divisor).round_ties_even() as i64;
    let width = spec.length;
    let text = if spec.signed {
        format!("{:+0width$}", scaled)
    } else {
        format!("{:0width$}", scaled)
    };
    if text.len() > width || (!spec.signed && scaled < 0) {
        warn!(
            "Record {}: {} value {} does not fit {} columns, written as not given",
            record_no, spec.abbrev, value, width
        );
        return spec.not_given.to_string();
    }
    text
}

/// Encode one data record as a 120-character line
///
/// Calendar fields must already be filled in (see [`DataRecord::split_time`]).
pub fn format_record(record: &DataRecord, record_no: usize) -> String {
    let mut fields: Vec<(usize, String)> = (0..MGD77_N_DATA_FIELDS)
        .map(|id| {
            let spec = catalog::spec(id);
            let text = if DataRecord::is_text_field(id) {
                let word: String = record.word(id).chars().take(spec.length).collect();
                format!("{:<width$}", word, width = spec.length)
            } else if id == field::DRT && record.number[id].is_nan() {
                "5".to_string()
            } else {
                format_number(record.number[id], spec, record_no)
            };
            (spec.start, text)
        })
        .collect();
    fields.sort_by_key(|(start, _)| *start);
    fields.into_iter().map(|(_, text)| text).collect()
}
