//! Fixed-width MGD77 header block
//!
//! The header is 24 records of 80 characters. Columns 79-80 carry the
//! record's two-digit sequence number; everything else is addressed through
//! the placement table in [`HEADER_ITEMS`].

use crate::app::models::header_params::item;
use crate::app::models::{HeaderParams, HEADER_ITEMS};
use crate::constants::{MGD77_HEADER_LENGTH, MGD77_N_HEADER_RECORDS};
use crate::{Error, Result};

/// Width of the text part of a header record (before the sequence number)
const TEXT_WIDTH: usize = MGD77_HEADER_LENGTH - 2;

/// Record type written on every new header
pub const NEW_HEADER_TYPE: &str = "4";

/// Characters `from..to` of a header record, fewer when the record is shorter
fn columns(record: &str, from: usize, to: usize) -> String {
    record.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// Check the record type and sequence numbers of a header block
pub fn validate_records(records: &[String]) -> Result<()> {
    let first = records.first().and_then(|r| r.chars().next());
    if !matches!(first, Some('1') | Some('4')) {
        return Err(Error::NoHeaderRecord {
            found: first.map(String::from).unwrap_or_default(),
        });
    }

    for (i, record) in records.iter().enumerate() {
        let expected = i + 1;
        let found = columns(record, TEXT_WIDTH, MGD77_HEADER_LENGTH);
        if found.trim().parse::<usize>().ok() != Some(expected) {
            return Err(Error::WrongHeaderRecord { expected, found });
        }
    }
    Ok(())
}

/// Extract every header item from a validated header block
pub fn parse_records(records: &[String]) -> Result<HeaderParams> {
    if records.len() != MGD77_N_HEADER_RECORDS {
        return Err(Error::read_header(format!(
            "expected {} header records, found {}",
            MGD77_N_HEADER_RECORDS,
            records.len()
        )));
    }
    validate_records(records)?;

    let mut params = HeaderParams::new();
    for (index, header_item) in HEADER_ITEMS.iter().enumerate() {
        let mut value = String::new();
        for &(rec, start, len) in header_item.placements {
            value.push_str(&columns(&records[rec - 1], start - 1, start - 1 + len));
        }
        params.set(index, value.trim_end());
    }
    Ok(params)
}

/// Lay out header items into 24 records with sequence numbers
pub fn format_records(params: &HeaderParams) -> Vec<String> {
    let mut records: Vec<Vec<char>> = vec![vec![' '; TEXT_WIDTH]; MGD77_N_HEADER_RECORDS];

    for (index, header_item) in HEADER_ITEMS.iter().enumerate() {
        let value = if index == item::RECORD_TYPE {
            NEW_HEADER_TYPE
        } else {
            params.get(index)
        };
        let mut chars = value.chars();
        for &(rec, start, len) in header_item.placements {
            let row = &mut records[rec - 1];
            for (slot, c) in row[start - 1..start - 1 + len].iter_mut().zip(chars.by_ref()) {
                *slot = c;
            }
        }
    }

    records
        .into_iter()
        .enumerate()
        .map(|(i, row)| format!("{}{:02}", row.into_iter().collect::<String>(), i + 1))
        .collect()
}
