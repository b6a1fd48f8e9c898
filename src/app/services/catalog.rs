//! Column catalog
//!
//! Immutable description of every field an MGD77 dataset can carry: where
//! it sits in the fixed-width record, how it is scaled there, and how the
//! container stores it.

use crate::app::models::{
    Adjust, ColumnDescriptor, ColumnInfo, ColumnSet, FieldId, Header, StorageType,
};
use crate::constants::field;

/// Static facts about one catalog field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub abbrev: &'static str,
    pub name: &'static str,
    pub units: &'static str,
    pub comment: &'static str,
    /// 1-based start column in the fixed-width record (0 when absent)
    pub start: usize,
    pub length: usize,
    /// Integer text value divided by this gives the physical value
    pub divisor: f64,
    /// Text meaning "not given"
    pub not_given: &'static str,
    /// Written with an explicit sign
    pub signed: bool,
    pub storage: StorageType,
    pub scale: f64,
    pub offset: f64,
    /// Text width, 0 for numeric fields
    pub text: usize,
}

const fn num(
    abbrev: &'static str,
    name: &'static str,
    units: &'static str,
    (start, length, divisor): (usize, usize, f64),
    not_given: &'static str,
    signed: bool,
    (storage, scale, offset): (StorageType, f64, f64),
) -> FieldSpec {
    FieldSpec {
        abbrev,
        name,
        units,
        comment: "",
        start,
        length,
        divisor,
        not_given,
        signed,
        storage,
        scale,
        offset,
        text: 0,
    }
}

const fn commented(spec: FieldSpec, comment: &'static str) -> FieldSpec {
    FieldSpec { comment, ..spec }
}

const fn text(
    abbrev: &'static str,
    name: &'static str,
    start: usize,
    length: usize,
) -> FieldSpec {
    FieldSpec {
        abbrev,
        name,
        units: "",
        comment: "",
        start,
        length,
        divisor: 1.0,
        not_given: "",
        signed: false,
        storage: StorageType::Char,
        scale: 1.0,
        offset: 0.0,
        text: length,
    }
}

use StorageType::{Byte, Double, Int, Short};

/// Every catalog field, indexed by field id
pub static CATALOG: [FieldSpec; 31] = [
    commented(
        num("drt", "Data record type", "", (1, 1, 1.0), "9", false, (Byte, 1.0, 0.0)),
        "Normally 5 (for MGD77 format)",
    ),
    commented(
        num("tz", "Time-zone correction", "hours", (10, 3, 1.0), "+99", true, (Byte, 1.0, 0.0)),
        "Corrects time (in characters 13-27) to GMT when added: equals zero when time is GMT",
    ),
    num("year", "Year", "years", (13, 4, 1.0), "9999", false, (Short, 1.0, 0.0)),
    num("month", "Month", "months", (17, 2, 1.0), "99", false, (Byte, 1.0, 0.0)),
    num("day", "Day", "days", (19, 2, 1.0), "99", false, (Byte, 1.0, 0.0)),
    num("hour", "Hour", "hours", (21, 2, 1.0), "99", false, (Byte, 1.0, 0.0)),
    num("min", "Minutes", "minutes", (23, 5, 1000.0), "99999", false, (Int, 0.001, 0.0)),
    commented(
        num("lat", "Latitude", "degrees_north", (28, 8, 1.0e5), "+9999999", true, (Int, 1.0e-7, 0.0)),
        "Negative south of Equator",
    ),
    commented(
        num("lon", "Longitude", "degrees_east", (36, 9, 1.0e5), "+99999999", true, (Int, 2.0e-7, 0.0)),
        "Negative west of Greenwich",
    ),
    commented(
        num("ptc", "Position type code", "", (45, 1, 1.0), "9", false, (Byte, 1.0, 0.0)),
        "Observed fix (1), Interpolated (3), Unspecified (9)",
    ),
    commented(
        num("twt", "Bathymetry two-way travel-time", "seconds", (46, 6, 1.0e4), "999999", false, (Int, 1.0e-8, 0.0)),
        "Corrected for transducer depth and other such corrections",
    ),
    num("depth", "Bathymetry corrected depth", "meters", (52, 6, 10.0), "999999", false, (Int, 1.0e-5, 0.0)),
    commented(
        num("bcc", "Bathymetry correction code", "", (58, 2, 1.0), "99", false, (Byte, 1.0, 0.0)),
        "01-55 (Matthews' zones), 59 (Matthews corrected), 60 (Carter corrected), 61-62 (bottom samples), 63 (towed), 88 (other), 99 (unspecified)",
    ),
    commented(
        num("btc", "Bathymetry type code", "", (60, 1, 1.0), "9", false, (Byte, 1.0, 0.0)),
        "Observed (1), Interpolated (3), Unspecified (9)",
    ),
    num("mtf1", "Magnetics total field, Sensor 1", "nTesla", (61, 6, 10.0), "999999", false, (Int, 1.0e-4, 0.0)),
    num("mtf2", "Magnetics total field, Sensor 2", "nTesla", (67, 6, 10.0), "999999", false, (Int, 1.0e-4, 0.0)),
    num("mag", "Magnetics residual field", "nTesla", (73, 6, 10.0), "+99999", true, (Short, 0.1, 0.0)),
    commented(
        num("msens", "Sensor for residual field", "", (79, 1, 1.0), "9", false, (Byte, 1.0, 0.0)),
        "Leading sensor (1), Trailing sensor (2), Unspecified (9)",
    ),
    num("diur", "Magnetics diurnal correction", "nTesla", (80, 5, 10.0), "+9999", true, (Short, 0.1, 0.0)),
    commented(
        num("msd", "Depth or altitude of Magnetics sensor", "m", (85, 6, 1.0), "+99999", true, (Short, 1.0, 0.0)),
        "Positive below sealevel",
    ),
    num("gobs", "Observed gravity", "mGal", (91, 7, 10.0), "9999999", false, (Int, 1.0e-5, 980000.0)),
    num("eot", "Eotvos correction", "mGal", (98, 6, 10.0), "+99999", true, (Short, 0.1, 0.0)),
    num("faa", "Free-Air Anomaly", "mGal", (104, 5, 10.0), "+9999", true, (Short, 0.1, 0.0)),
    commented(
        num("nqc", "Navigation quality code", "", (109, 1, 1.0), "9", false, (Byte, 1.0, 0.0)),
        "Suspected by source agency (5), Suspected by NGDC (6), Unspecified (9)",
    ),
    text("id", "Survey ID", 2, 8),
    text("sln", "Seismic line number", 110, 5),
    text("sspn", "Seismic shot-point number", 115, 6),
    num("time", "Time", "seconds since 1970-01-01 00:00:00 0", (0, 0, 1.0), "", false, (Double, 1.0, 0.0)),
    num("bqc", "Bathymetry quality code", "", (0, 0, 1.0), "", false, (Byte, 1.0, 0.0)),
    num("mqc", "Magnetics quality code", "", (0, 0, 1.0), "", false, (Byte, 1.0, 0.0)),
    num("gqc", "Gravity quality code", "", (0, 0, 1.0), "", false, (Byte, 1.0, 0.0)),
];

/// Static facts for a field id
pub fn spec(id: FieldId) -> &'static FieldSpec {
    &CATALOG[id]
}

/// Descriptor template for a catalog field
pub fn describe(id: FieldId) -> ColumnDescriptor {
    let spec = &CATALOG[id];
    ColumnDescriptor {
        abbrev: spec.abbrev.to_string(),
        name: spec.name.to_string(),
        units: spec.units.to_string(),
        comment: spec.comment.to_string(),
        set: ColumnSet::Standard,
        storage: spec.storage,
        text: spec.text,
        factor: spec.scale,
        offset: spec.offset,
        corr_factor: 1.0,
        corr_offset: 0.0,
        adjust: Adjust::None,
        present: false,
        constant: false,
        limits: [f64::NAN, f64::NAN],
        pos: None,
        field: Some(id),
    }
}

/// Field id for a catalog abbreviation
pub fn resolve(name: &str) -> Option<FieldId> {
    CATALOG.iter().position(|f| f.abbrev == name)
}

/// Set a column name belongs to
pub fn get_set(name: &str) -> ColumnSet {
    if resolve(name).is_some() {
        ColumnSet::Standard
    } else {
        ColumnSet::Container
    }
}

/// Scales of the fields widened to 4-byte integers at high resolution
///
/// Magnetics keep 100 fTesla, gravity 10 nGal and sensor depth 0.01 mm.
const HIGH_RESOLUTION: [(FieldId, f64); 5] = [
    (field::MAG, 1.0e-4),
    (field::DIUR, 1.0e-4),
    (field::MSD, 1.0e-5),
    (field::EOT, 1.0e-5),
    (field::FAA, 1.0e-5),
];

/// Switch the magnetic and gravity columns of a header to `Int` storage
///
/// Returns the number of columns changed.
pub fn select_high_resolution(header: &mut Header) -> usize {
    let mut changed = 0;
    for column in &mut header.info[ColumnSet::Standard.index()].columns {
        let Some(id) = column.field else { continue };
        if let Some(&(_, scale)) = HIGH_RESOLUTION.iter().find(|(f, _)| *f == id) {
            column.storage = StorageType::Int;
            column.factor = scale;
            changed += 1;
        }
    }
    changed
}

/// Logical columns of a text dataset
///
/// The calendar fields are folded into `time`; the quality codes exist
/// only in MGD77T files.
pub fn plain_columns(mgd77t: bool) -> Vec<FieldId> {
    let mut columns = vec![field::TIME, field::DRT, field::TZ];
    columns.extend(field::LAT..=field::NQC);
    columns.extend([field::ID, field::SLN, field::SSPN]);
    if mgd77t {
        columns.extend([field::BQC, field::MQC, field::GQC]);
    }
    columns
}

/// A header whose standard set holds the plain text-format columns, all present
pub fn plain_header(mgd77t: bool) -> Header {
    let mut header = Header::empty();
    header.info[ColumnSet::Standard.index()] = ColumnInfo {
        columns: plain_columns(mgd77t)
            .into_iter()
            .map(|id| ColumnDescriptor {
                present: true,
                ..describe(id)
            })
            .collect(),
        bit_pattern: 0,
    };
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MGD77_FLOAT_BITS, MGD77_RECORD_LENGTH, field_bit};

    #[test]
    fn test_catalog_order_matches_field_ids() {
        assert_eq!(CATALOG[field::LAT].abbrev, "lat");
        assert_eq!(CATALOG[field::NQC].abbrev, "nqc");
        assert_eq!(CATALOG[field::SSPN].abbrev, "sspn");
        assert_eq!(CATALOG[field::TIME].abbrev, "time");
        assert_eq!(CATALOG[field::GQC].abbrev, "gqc");
    }

    #[test]
    fn test_fixed_width_layout_is_contiguous() {
        let mut fields: Vec<&FieldSpec> = CATALOG.iter().filter(|f| f.start > 0).collect();
        fields.sort_by_key(|f| f.start);
        let mut next = 1;
        for f in fields {
            assert_eq!(f.start, next, "{}", f.abbrev);
            next += f.length;
        }
        assert_eq!(next - 1, MGD77_RECORD_LENGTH);
    }

    #[test]
    fn test_not_given_widths() {
        for (id, f) in CATALOG.iter().enumerate() {
            if f.text == 0 && f.start > 0 {
                assert_eq!(f.not_given.len(), f.length, "{}", f.abbrev);
                if MGD77_FLOAT_BITS & field_bit(id) != 0 {
                    assert!(f.not_given.trim_start_matches('+').bytes().all(|b| b == b'9'));
                }
            }
        }
    }

    #[test]
    fn test_resolve_and_sets() {
        assert_eq!(resolve("faa"), Some(field::FAA));
        assert_eq!(resolve("grav"), None);
        assert_eq!(get_set("time"), ColumnSet::Standard);
        assert_eq!(get_set("depth"), ColumnSet::Standard);
        assert_eq!(get_set("ship_heading"), ColumnSet::Container);
    }

    #[test]
    fn test_plain_columns() {
        let plain = plain_columns(false);
        assert_eq!(plain.len(), 23);
        assert_eq!(plain[0], field::TIME);
        assert!(!plain.contains(&field::YEAR));
        assert!(!plain.contains(&field::MIN));
        assert_eq!(plain_columns(true).len(), 26);
    }

    #[test]
    fn test_describe_template() {
        let gobs = describe(field::GOBS);
        assert_eq!(gobs.storage, StorageType::Int);
        assert_eq!(gobs.offset, 980000.0);
        assert_eq!(gobs.set, ColumnSet::Standard);
        assert_eq!(gobs.field, Some(field::GOBS));
        assert_eq!(describe(field::ID).text, 8);
    }

    #[test]
    fn test_high_resolution_storage() {
        let mut header = plain_header(false);
        assert_eq!(select_high_resolution(&mut header), 5);

        let faa = header.descriptor(header.find("faa").unwrap());
        assert_eq!((faa.storage, faa.factor), (StorageType::Int, 1.0e-5));
        let diur = header.descriptor(header.find("diur").unwrap());
        assert_eq!((diur.storage, diur.factor), (StorageType::Int, 1.0e-4));
        let depth = header.descriptor(header.find("depth").unwrap());
        assert_eq!(depth.factor, describe(field::DEPTH).factor);
    }
}
