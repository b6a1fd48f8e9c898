//! Tests for the MGD77T codec

use super::super::m77t::{M77tCodec, format_record, parse_record};
use super::{SAMPLE_M77T_LINE, sample_record};
use crate::Error;
use crate::app::models::header_params::item;
use crate::app::services::codec::RecordCodec;
use crate::app::services::m77_codec::tests::sample_params;
use crate::app::services::catalog::plain_header;
use crate::constants::{MGD77T_HEADER_NAMES, field};
use std::io::Cursor;

#[test]
fn test_format_sample_record() {
    assert_eq!(format_record(&sample_record()), SAMPLE_M77T_LINE);
}

#[test]
fn test_parse_sample_line() {
    let record = parse_record(SAMPLE_M77T_LINE, 1).unwrap();
    let fixed = sample_record();

    assert_eq!(record.number[field::DRT], 5.0);
    assert_eq!(record.number[field::TIME], fixed.number[field::TIME]);
    assert_eq!(record.number[field::LAT], fixed.number[field::LAT]);
    assert_eq!(record.number[field::LON], fixed.number[field::LON]);
    assert_eq!(record.number[field::DEPTH], fixed.number[field::DEPTH]);
    assert_eq!(record.number[field::GOBS], fixed.number[field::GOBS]);
    assert_eq!(record.number[field::FAA], fixed.number[field::FAA]);
    assert_eq!(record.word(field::ID), "01010083");
}

#[test]
fn test_empty_fields_are_absent() {
    let record = parse_record(SAMPLE_M77T_LINE, 1).unwrap();
    assert!(record.number[field::NQC].is_nan());
    assert!(!record.is_present(field::MTF1));
    assert!(!record.is_present(field::BQC));
    assert!(!record.is_present(field::SLN));
    assert!(!record.is_present(field::GQC));
}

#[test]
fn test_missing_trailing_fields() {
    let record = parse_record("01010083\t0\t19830426\t1200\t10.5\t20.25", 4).unwrap();
    assert_eq!(record.number[field::LON], 20.25);
    assert_eq!(record.number[field::HOUR], 12.0);
    assert_eq!(record.number[field::MIN], 0.0);
    assert!(record.is_present(field::TIME));
    assert!(!record.is_present(field::DEPTH));
    assert!(!record.is_present(field::SSPN));
}

#[test]
fn test_extra_fields_are_rejected() {
    let line = format!("01010083\t0\t19830426\t1200{}X", "\t".repeat(23));
    assert_eq!(line.split('\t').count(), 27);
    match parse_record(&line, 7).unwrap_err() {
        Error::WrongDataRecordLength {
            record,
            length,
            expected,
        } => {
            assert_eq!(record, 7);
            assert_eq!(length, 27);
            assert_eq!(expected, 26);
        }
        other => panic!("Expected WrongDataRecordLength error, got {:?}", other),
    }

    let full = format!("{}{}", SAMPLE_M77T_LINE, "\t".repeat(26 - SAMPLE_M77T_LINE.split('\t').count()));
    assert_eq!(full.split('\t').count(), 26);
    assert!(parse_record(&full, 1).is_ok());
}

#[test]
fn test_time_without_date_is_absent() {
    let record = parse_record("01010083\t0\t\t1200\t10.5\t20.25", 1).unwrap();
    assert!(!record.is_present(field::TIME));
    assert_eq!(record.number[field::HOUR], 12.0);
}

#[test]
fn test_unspecified_codes_and_filler_are_blank() {
    let mut record = sample_record();
    record.set_number(field::PTC, 9.0);
    record.set_number(field::BCC, 99.0);
    record.set_number(field::BTC, 9.0);
    record.set_word(field::SLN, "0000");
    record.set_word(field::SSPN, "L12");
    let line = format_record(&record);
    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(fields[6], "");
    assert_eq!(fields[10], "");
    assert_eq!(fields[11], "");
    assert_eq!(fields[24], "");
    assert_eq!(fields[25], "L12");
}

#[test]
fn test_conversion_error() {
    let line = SAMPLE_M77T_LINE.replace("5.12345", "five");
    match parse_record(&line, 9).unwrap_err() {
        Error::Conversion { record, field, text } => {
            assert_eq!(record, 9);
            assert_eq!(field, "lat");
            assert_eq!(text, "five");
        }
        _ => panic!("Expected Conversion error"),
    }
}

#[test]
fn test_header_round_trip() {
    let mut header = plain_header(true);
    header.params = [sample_params(), sample_params()];

    let mut codec = M77tCodec::new();
    let mut out = Vec::new();
    codec.write_header(&header, &mut out).unwrap();
    codec.write_record(&sample_record(), &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap().split('\t').count(), MGD77T_HEADER_NAMES.len());
    let values: Vec<&str> = lines.next().unwrap().split('\t').collect();
    assert_eq!(values[0], "01010083");
    assert_eq!(values[13], "19830420");

    let mut input = Cursor::new(text.into_bytes());
    let read = codec.read_header(&mut input).unwrap();
    let params = &read.params[0];
    assert_eq!(params.get(item::SURVEY_IDENTIFIER), "01010083");
    assert_eq!(params.get(item::SURVEY_DEPARTURE_YEAR), "1983");
    assert_eq!(params.get(item::SURVEY_DEPARTURE_YEAR + 2), "20");
    assert_eq!(
        params.get(item::ADDITIONAL_DOCUMENTATION_1),
        "NAVIGATION BY SATELLITE FIXES"
    );

    let record = codec.read_record(&mut input).unwrap().unwrap();
    assert_eq!(record.number[field::TIME], sample_record().number[field::TIME]);
    assert!(codec.read_record(&mut input).unwrap().is_none());
}

#[test]
fn test_header_without_item_names() {
    let mut codec = M77tCodec::new();
    let mut input = Cursor::new(SAMPLE_M77T_LINE.as_bytes().to_vec());
    match codec.read_header(&mut input).unwrap_err() {
        Error::NoHeaderRecord { found } => assert_eq!(found, "01010083"),
        _ => panic!("Expected NoHeaderRecord error"),
    }
}
