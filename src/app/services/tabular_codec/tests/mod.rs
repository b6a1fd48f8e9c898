//! Test fixtures for the delimited text codecs

use crate::app::models::DataRecord;
use crate::app::services::m77_codec::record::parse_record;
use crate::app::services::m77_codec::tests::SAMPLE_RECORD;
use crate::constants::MGD77_OLDEST_YY;

mod dat_tests;
mod m77t_tests;

/// The fixed-width sample record as an MGD77T line
pub const SAMPLE_M77T_LINE: &str = "01010083\t-5\t19830426\t1730.5\t5.12345\t-123.45678\t1\t\t2.5\t1875\t59\t1\t\t\t\t\t9\t\t\t\t978123.4\t12.3\t-45.6";

/// The fixed-width sample record as a DAT line
pub const SAMPLE_DAT_LINE: &str = "5\t-5\t1983\t4\t26\t17\t30.5\t5.12345\t-123.45678\t1\t2.5\t1875\t59\t1\tNaN\tNaN\tNaN\t9\tNaN\tNaN\t978123.4\t12.3\t-45.6\t9\t01010083\t99999\t999999";

/// The sample record decoded from its fixed-width form
pub fn sample_record() -> DataRecord {
    parse_record(SAMPLE_RECORD, 1, MGD77_OLDEST_YY).unwrap()
}
