//! Test fixtures for the fixed-width codec
//!
//! The sample record is assembled field by field so each column's text is
//! visible next to the value it decodes to.

use crate::app::models::HeaderParams;
use crate::app::models::header_params::item;

mod record_tests;

/// A complete 120-character type-5 data record
pub const SAMPLE_RECORD: &str = concat!(
    "5",         // drt
    "01010083",  // id
    "-05",       // tz
    "1983",      // year
    "04",        // month
    "26",        // day
    "17",        // hour
    "30500",     // min = 30.5
    "+0512345",  // lat = 5.12345
    "-12345678", // lon = -123.45678
    "1",         // ptc
    "025000",    // twt = 2.5 s
    "018750",    // depth = 1875.0 m
    "59",        // bcc
    "1",         // btc
    "999999",    // mtf1
    "999999",    // mtf2
    "+99999",    // mag
    "9",         // msens
    "+9999",     // diur
    "+99999",    // msd
    "9781234",   // gobs = 978123.4
    "+00123",    // eot = 12.3
    "-0456",     // faa = -45.6
    "9",         // nqc
    "99999",     // sln
    "999999",    // sspn
);

/// Format description long enough to continue onto header record 11
pub const SAMPLE_FORMAT_DESCRIPTION: &str =
    "(I1,A8,F3.0,F4.0,F2.0,F2.0,F2.0,F5.3,F8.5,F9.5,I1,F6.4,F6.1,I2,I1,3F6.1,I1,F5.1,F6.0";

/// Header items of a small survey
pub fn sample_params() -> HeaderParams {
    let mut params = HeaderParams::new();
    params.set(item::RECORD_TYPE, "4");
    params.set(item::SURVEY_IDENTIFIER, "01010083");
    params.set(item::FORMAT_ACRONYM, "MGD77");
    params.set(item::DATA_CENTER_FILE_NUMBER, "01010083");
    params.set(item::FILE_CREATION_YEAR, "1989");
    params.set(item::FILE_CREATION_YEAR + 1, "06");
    params.set(item::FILE_CREATION_YEAR + 2, "13");
    params.set(item::SOURCE_INSTITUTION, "LAMONT-DOHERTY GEOLOGICAL OBSERVATORY");
    params.set(item::SURVEY_DEPARTURE_YEAR, "1983");
    params.set(item::SURVEY_DEPARTURE_YEAR + 1, "04");
    params.set(item::SURVEY_DEPARTURE_YEAR + 2, "20");
    params.set(item::GRAVITY_THEORETICAL_FORMULA_CODE, "4");
    params.set(
        HeaderParams::index_of("Format_Description").unwrap(),
        SAMPLE_FORMAT_DESCRIPTION,
    );
    params.set(item::ADDITIONAL_DOCUMENTATION_1, "NAVIGATION BY SATELLITE FIXES");
    params
}

/// Header block followed by two data records
pub fn sample_file() -> String {
    let mut text = String::new();
    for line in super::header::format_records(&sample_params()) {
        text.push_str(&line);
        text.push('\n');
    }
    text.push_str(SAMPLE_RECORD);
    text.push('\n');
    let second = SAMPLE_RECORD.replacen("30500", "45000", 1);
    text.push_str(&second);
    text.push('\n');
    text
}
