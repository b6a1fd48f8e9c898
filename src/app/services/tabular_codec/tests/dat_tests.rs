//! Tests for the DAT table codec

use super::super::dat::{DatCodec, format_record, parse_record};
use super::{SAMPLE_DAT_LINE, sample_record};
use crate::Error;
use crate::app::models::header_params::item;
use crate::app::services::codec::RecordCodec;
use crate::app::services::m77_codec::tests::sample_params;
use crate::app::services::catalog::plain_header;
use crate::constants::{DAT_COLUMN_ORDER, field};
use std::io::Cursor;

#[test]
fn test_format_sample_record() {
    assert_eq!(format_record(&sample_record()), SAMPLE_DAT_LINE);
}

#[test]
fn test_parse_matches_fixed_width() {
    let record = parse_record(SAMPLE_DAT_LINE, 1).unwrap();
    let fixed = sample_record();

    for id in 0..field::ID {
        let (a, b) = (record.number[id], fixed.number[id]);
        assert!(a == b || (a.is_nan() && b.is_nan()), "field {id}: {a} != {b}");
    }
    assert_eq!(record.number[field::TIME], fixed.number[field::TIME]);
    assert_eq!(record.word(field::ID), "01010083");
    assert_eq!(format_record(&record), SAMPLE_DAT_LINE);
}

#[test]
fn test_nan_tokens_and_filler_words_are_absent() {
    let record = parse_record(SAMPLE_DAT_LINE, 1).unwrap();
    assert!(!record.is_present(field::MAG));
    assert!(record.number[field::MAG].is_nan());
    assert!(!record.is_present(field::SLN));
    assert!(!record.is_present(field::SSPN));
    assert!(record.is_present(field::ID));
}

#[test]
fn test_missing_trailing_fields() {
    let record = parse_record("5\t0\t1990\t1\t2\t3\t4\t10\t20", 1).unwrap();
    assert_eq!(record.number[field::LON], 20.0);
    assert!(record.is_present(field::TIME));
    assert!(!record.is_present(field::DEPTH));
    assert!(!record.is_present(field::ID));
}

#[test]
fn test_extra_fields_are_rejected() {
    let line = format!("{}\textra", "5\t".repeat(26).trim_end_matches('\t'));
    assert_eq!(line.split('\t').count(), 27);
    assert!(parse_record(&line, 2).is_ok());

    let line = format!("{}\textra", line);
    match parse_record(&line, 2).unwrap_err() {
        Error::WrongDataRecordLength { record, length, .. } => {
            assert_eq!(record, 2);
            assert_eq!(length, 28);
        }
        other => panic!("Expected WrongDataRecordLength error, got {:?}", other),
    }
}

#[test]
fn test_wrong_record_type() {
    let line = SAMPLE_DAT_LINE.replacen('5', "4", 1);
    match parse_record(&line, 3).unwrap_err() {
        Error::NoDataRecord { record } => assert_eq!(record, 3),
        _ => panic!("Expected NoDataRecord error"),
    }
}

#[test]
fn test_conversion_error() {
    let line = SAMPLE_DAT_LINE.replace("978123.4", "gravity");
    match parse_record(&line, 2).unwrap_err() {
        Error::Conversion { field, text, .. } => {
            assert_eq!(field, "gobs");
            assert_eq!(text, "gravity");
        }
        _ => panic!("Expected Conversion error"),
    }
}

#[test]
fn test_codec_round_trip() {
    let mut header = plain_header(false);
    header.params = [sample_params(), sample_params()];

    let mut codec = DatCodec::new();
    let mut out = Vec::new();
    codec.write_header(&header, &mut out).unwrap();
    codec.write_record(&sample_record(), &mut out).unwrap();
    codec.write_record(&sample_record(), &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().nth(24), Some(DAT_COLUMN_ORDER));

    let mut input = Cursor::new(text.into_bytes());
    let read = codec.read_header(&mut input).unwrap();
    assert_eq!(read.params[0].get(item::SURVEY_IDENTIFIER), "01010083");

    let mut count = 0;
    while let Some(record) = codec.read_record(&mut input).unwrap() {
        assert_eq!(format_record(&record), SAMPLE_DAT_LINE);
        count += 1;
    }
    assert_eq!(count, 2);
}
