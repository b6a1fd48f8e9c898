//! Test fixtures for the container codec

use crate::app::models::{DataRecord, Dataset};
use crate::app::services::catalog::plain_header;
use crate::app::services::m77_codec::record::parse_record;
use crate::app::services::m77_codec::tests::{SAMPLE_RECORD, sample_params};
use crate::constants::{MGD77_OLDEST_YY, field};


/// Three records a minute apart, moving north-east
pub fn sample_records() -> Vec<DataRecord> {
    (0..3)
        .map(|i| {
            let mut record = parse_record(SAMPLE_RECORD, i + 1, MGD77_OLDEST_YY).unwrap();
            let step = i as f64;
            record.set_number(field::MIN, 30.5 + step);
            record.set_number(field::LAT, 5.12345 + 0.1 * step);
            record.set_number(field::LON, -123.45678 + 0.1 * step);
            record.assemble_time();
            record
        })
        .collect()
}

/// The sample records as a dataset of the plain text columns
pub fn sample_dataset() -> Dataset {
    let mut header = plain_header(false);
    header.params = [sample_params(), sample_params()];
    header.author = "tester".to_string();
    Dataset::from_records(header, &sample_records())
}
