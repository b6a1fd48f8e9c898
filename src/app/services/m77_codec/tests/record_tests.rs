//! Tests for fixed-width data record decoding and encoding

use super::super::record::{format_record, parse_record, upgrade_legacy};
use super::SAMPLE_RECORD;
use crate::Error;
use crate::app::models::calendar::civil_to_unix;
use crate::constants::{MGD77_OLDEST_YY, field};

#[test]
fn test_parse_sample_record() {
    let record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();

    assert_eq!(record.number[field::DRT], 5.0);
    assert_eq!(record.number[field::TZ], -5.0);
    assert!((record.number[field::LAT] - 5.12345).abs() < 1e-12);
    assert!((record.number[field::LON] + 123.45678).abs() < 1e-12);
    assert_eq!(record.number[field::TWT], 2.5);
    assert_eq!(record.number[field::DEPTH], 1875.0);
    assert!((record.number[field::GOBS] - 978123.4).abs() < 1e-9);
    assert!((record.number[field::EOT] - 12.3).abs() < 1e-12);
    assert!((record.number[field::FAA] + 45.6).abs() < 1e-12);
    assert_eq!(record.word(field::ID), "01010083");
}

#[test]
fn test_not_given_geophysical_fields_are_nan() {
    let record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();
    for id in [field::MTF1, field::MTF2, field::MAG, field::DIUR, field::MSD] {
        assert!(record.number[id].is_nan());
        assert!(!record.is_present(id));
    }
    // Code fields keep their literal 9
    assert_eq!(record.number[field::MSENS], 9.0);
    assert_eq!(record.number[field::NQC], 9.0);
}

#[test]
fn test_text_fields_of_nines_are_absent() {
    let record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();
    assert!(record.is_present(field::ID));
    assert!(!record.is_present(field::SLN));
    assert!(!record.is_present(field::SSPN));
    assert_eq!(record.word(field::SLN), "99999");
}

#[test]
fn test_time_includes_zone_correction() {
    let record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();
    let expected = civil_to_unix(1983.0, 4.0, 26.0, 12.0, 30.5).unwrap();
    assert_eq!(record.number[field::TIME], expected);
    assert!(record.is_present(field::TIME));
}

#[test]
fn test_record_round_trip_is_exact() {
    let record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();
    assert_eq!(format_record(&record, 1), SAMPLE_RECORD);
}

#[test]
fn test_round_trip_after_time_split() {
    let mut record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();
    record.split_time();
    assert_eq!(format_record(&record, 1), SAMPLE_RECORD);
}

#[test]
fn test_overflow_writes_not_given() {
    let mut record = parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap();
    record.set_number(field::FAA, 12345.6);
    let line = format_record(&record, 1);
    assert_eq!(&line[103..108], "+9999");
}

#[test]
fn test_legacy_upgrade() {
    let mut line = SAMPLE_RECORD.as_bytes().to_vec();
    line[0] = b'3';
    line[9..16].copy_from_slice(b"+050083");
    upgrade_legacy(&mut line, MGD77_OLDEST_YY);
    assert_eq!(line[0], b'5');
    assert_eq!(&line[9..12], b"+00");
    assert_eq!(&line[12..16], b"1983");

    let mut line = SAMPLE_RECORD.as_bytes().to_vec();
    line[0] = b'3';
    line[14..16].copy_from_slice(b"05");
    upgrade_legacy(&mut line, MGD77_OLDEST_YY);
    assert_eq!(&line[12..16], b"2005");
}

#[test]
fn test_legacy_upgrade_keeps_unset_year() {
    let mut line = SAMPLE_RECORD.as_bytes().to_vec();
    line[0] = b'3';
    line[14..27].copy_from_slice(b"9999999999999");
    upgrade_legacy(&mut line, MGD77_OLDEST_YY);
    assert_eq!(&line[12..16], b"9999");
}

#[test]
fn test_legacy_threshold_is_configurable() {
    let mut line = SAMPLE_RECORD.as_bytes().to_vec();
    line[0] = b'3';
    line[14..16].copy_from_slice(b"45");
    upgrade_legacy(&mut line, 50);
    assert_eq!(&line[12..16], b"2045");
}

#[test]
fn test_legacy_record_decodes() {
    let mut line = SAMPLE_RECORD.to_string();
    line.replace_range(0..1, "3");
    line.replace_range(9..16, "+050083");
    let record = parse_record(&line, 1, MGD77_OLDEST_YY).unwrap();
    assert_eq!(record.number[field::DRT], 5.0);
    assert_eq!(record.number[field::YEAR], 1983.0);
    assert_eq!(record.number[field::TZ], 0.0);
}

#[test]
fn test_non_data_record() {
    let line = SAMPLE_RECORD.replacen('5', "4", 1);
    match parse_record(&line, 7, MGD77_OLDEST_YY).unwrap_err() {
        Error::NoDataRecord { record } => assert_eq!(record, 7),
        _ => panic!("Expected NoDataRecord error"),
    }
}

#[test]
fn test_wrong_record_length() {
    match parse_record(&SAMPLE_RECORD[..80], 2, MGD77_OLDEST_YY).unwrap_err() {
        Error::WrongDataRecordLength {
            record,
            length,
            expected,
        } => {
            assert_eq!(record, 2);
            assert_eq!(length, 80);
            assert_eq!(expected, 120);
        }
        _ => panic!("Expected WrongDataRecordLength error"),
    }
}

#[test]
fn test_non_ascii_record() {
    let mut line = SAMPLE_RECORD.to_string();
    line.replace_range(40..41, "\u{C9}");
    assert_eq!(line.chars().count(), 120);
    match parse_record(&line, 4, MGD77_OLDEST_YY).unwrap_err() {
        Error::NonAsciiRecord {
            record,
            column,
            found,
        } => {
            assert_eq!(record, 4);
            assert_eq!(column, 41);
            assert_eq!(found, '\u{C9}');
        }
        other => panic!("Expected NonAsciiRecord error, got {:?}", other),
    }
}

#[test]
fn test_conversion_error() {
    let mut line = SAMPLE_RECORD.to_string();
    line.replace_range(27..35, "+05ABC45");
    match parse_record(&line, 3, MGD77_OLDEST_YY).unwrap_err() {
        Error::Conversion { record, field, text } => {
            assert_eq!(record, 3);
            assert_eq!(field, "lat");
            assert_eq!(text, "+05ABC45");
        }
        _ => panic!("Expected Conversion error"),
    }
}
