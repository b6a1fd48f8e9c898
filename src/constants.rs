//! Format constants for the MGD77 codec
//!
//! This module contains record geometry, field identifiers, bit masks,
//! status codes and fixed header layouts shared by every codec.

// =============================================================================
// Record Geometry
// =============================================================================

/// Length of an MGD77 fixed-width data record
pub const MGD77_RECORD_LENGTH: usize = 120;

/// Length of an MGD77 fixed-width header record
pub const MGD77_HEADER_LENGTH: usize = 80;

/// Number of header records in an MGD77 file
pub const MGD77_N_HEADER_RECORDS: usize = 24;

/// Number of header lines in an MGD77T file (item names + item values)
pub const MGD77T_N_HEADER_RECORDS: usize = 2;

/// Two-digit years below this value belong to the 21st century
pub const MGD77_OLDEST_YY: i32 = 39;

/// Original 24 numerical data columns in MGD77
pub const MGD77_N_NUMBER_FIELDS: usize = 24;

/// Original 3 text data columns in MGD77
pub const MGD77_N_STRING_FIELDS: usize = 3;

/// Original 27 data columns in MGD77
pub const MGD77_N_DATA_FIELDS: usize = 27;

/// All catalog fields: the 27 originals, time, and three MGD77T quality codes
pub const MGD77_N_FIELDS: usize = 31;

/// Maximum number of columns per set
pub const MGD77_SET_COLS: usize = 32;

/// Typical text value meaning no data
pub const ALL_NINES: &str = "9999999999";

/// Version stamp written to new MGD77+ files
pub const MGD77_CDF_VERSION: &str = "2006.04.15";

/// Conventions attribute written to new MGD77+ files
pub const MGD77_CDF_CONVENTION: &str = "CF-1.0";

/// PDR wrap-around period seen in some two-way travel times (seconds)
pub const TWT_PDR_WRAP: f64 = 10.0;

/// Name of the file listing data directories inside the MGD77 home
pub const MGD77_PATHS_FILE: &str = "mgd77_paths.txt";

/// Environment variable overriding the MGD77 home directory
pub const MGD77_HOME_ENV: &str = "MGD77_HOME";

// =============================================================================
// Field Identifiers
// =============================================================================

/// Catalog field identifiers (slot index in a raw data record)
pub mod field {
    pub const DRT: usize = 0;
    pub const TZ: usize = 1;
    pub const YEAR: usize = 2;
    pub const MONTH: usize = 3;
    pub const DAY: usize = 4;
    pub const HOUR: usize = 5;
    pub const MIN: usize = 6;
    pub const LAT: usize = 7;
    pub const LON: usize = 8;
    pub const PTC: usize = 9;
    pub const TWT: usize = 10;
    pub const DEPTH: usize = 11;
    pub const BCC: usize = 12;
    pub const BTC: usize = 13;
    pub const MTF1: usize = 14;
    pub const MTF2: usize = 15;
    pub const MAG: usize = 16;
    pub const MSENS: usize = 17;
    pub const DIUR: usize = 18;
    pub const MSD: usize = 19;
    pub const GOBS: usize = 20;
    pub const EOT: usize = 21;
    pub const FAA: usize = 22;
    pub const NQC: usize = 23;
    pub const ID: usize = 24;
    pub const SLN: usize = 25;
    pub const SSPN: usize = 26;
    pub const TIME: usize = 27;
    pub const BQC: usize = 28;
    pub const MQC: usize = 29;
    pub const GQC: usize = 30;
}

// =============================================================================
// Bit Masks
// =============================================================================

/// Bit for a catalog field in a record bit pattern
pub const fn field_bit(id: usize) -> u32 {
    1u32 << id
}

/// twt, depth, mtf1, mtf2, mag, gobs, faa
pub const MGD77_GEOPHYSICAL_BITS: u32 = 5_360_640;

/// diur, msd, eot
pub const MGD77_CORRECTION_BITS: u32 = 2_883_584;

/// year, month, day, hour, min
pub const MGD77_TIME_BITS: u32 = 124;

/// Fields whose not-given literal decodes to NaN
pub const MGD77_FLOAT_BITS: u32 = MGD77_GEOPHYSICAL_BITS + MGD77_CORRECTION_BITS + MGD77_TIME_BITS;

// =============================================================================
// Status Codes
// =============================================================================

/// Integer status domain returned by the MGD77 tool chain
pub mod status {
    pub const NO_ERROR: i32 = 0;
    pub const FILE_NOT_FOUND: i32 = 1;
    pub const ERROR_OPEN_FILE: i32 = 2;
    pub const NO_HEADER_REC: i32 = 3;
    pub const ERROR_READ_HEADER_ASC: i32 = 4;
    pub const ERROR_WRITE_HEADER_ASC: i32 = 5;
    pub const ERROR_READ_ASC_DATA: i32 = 6;
    pub const ERROR_WRITE_ASC_DATA: i32 = 7;
    pub const WRONG_HEADER_REC: i32 = 8;
    pub const NO_DATA_REC: i32 = 9;
    pub const WRONG_DATA_REC_LEN: i32 = 10;
    pub const ERROR_CONV_DATA_REC: i32 = 11;
    pub const ERROR_READ_HEADER_BIN: i32 = 12;
    pub const ERROR_WRITE_HEADER_BIN: i32 = 13;
    pub const ERROR_READ_BIN_DATA: i32 = 14;
    pub const ERROR_WRITE_BIN_DATA: i32 = 15;
    pub const ERROR_NOT_MGD77PLUS: i32 = 16;
    pub const UNKNOWN_FORMAT: i32 = 17;
    pub const UNKNOWN_MODE: i32 = 18;
    pub const ERROR_NOSUCHCOLUMN: i32 = 19;
    pub const BAD_ARG: i32 = 20;
    pub const BAD_IGRFDATE: i32 = 21;
}

// =============================================================================
// Text Layouts
// =============================================================================

/// Column-order line written after the header block of a DAT table
pub const DAT_COLUMN_ORDER: &str = "#rec\tTZ\tyear\tmonth\tday\thour\tmin\tlat\tlon\tptc\ttwt\tdepth\tbcc\tbtc\tmtf1\tmtf2\tmag\tmsens\tdiur\tmsd\tgobs\teot\tfaa\tnqc\tid\tsln\tsspn";

/// Header item names on the first line of an MGD77T file
pub const MGD77T_HEADER_NAMES: &[&str] = &[
    "SURVEY_ID",
    "FORMAT_77",
    "CENTER_ID",
    "PARAMS_CO",
    "DATE_CREAT",
    "INST_SRC",
    "COUNTRY",
    "PLATFORM",
    "PLAT_TYPCO",
    "PLAT_TYP",
    "CHIEF",
    "PROJECT",
    "FUNDING",
    "DATE_DEP",
    "PORT_DEP",
    "DATE_ARR",
    "PORT_ARR",
    "NAV_INSTR",
    "POS_INST",
    "BATH_INSTR",
    "BATH_ADD",
    "MAG_INSTR",
    "MAG_ADD",
    "GRAV_INSTR",
    "GRAV_ADD",
    "SEIS_INSTR",
    "SEIS_FRMTS",
    "LAT_TOP",
    "LAT_BOTTOM",
    "LON_LEFT",
    "LON_RIGHT",
    "BATH_DRATE",
    "BATH_SRATE",
    "SOUND_VEL",
    "VDATUM_CO",
    "BATH_INTRP",
    "MAG_DRATE",
    "MAG_SRATE",
    "MAG_TOWDST",
    "MAG_SNSDEP",
    "MAG_SNSSEP",
    "M_REFFL_CO",
    "MAG_REFFLD",
    "MAG_RF_MTH",
    "GRAV_DRATE",
    "GRAV_SRATE",
    "G_FORMU_CO",
    "GRAV_FORMU",
    "G_RFSYS_CO",
    "GRAV_RFSYS",
    "GRAV_CORR",
    "G_ST_DEP_G",
    "G_ST_DEP",
    "G_ST_ARR_G",
    "G_ST_ARR",
    "IDS_10_NUM",
    "IDS_10DEG",
    "ADD_DOC",
];

/// Data column names in MGD77T record order
pub const MGD77T_DATA_NAMES: &[&str] = &[
    "SURVEY_ID", "TIMEZONE", "DATE", "TIME", "LAT", "LON", "POS_TYPE", "NAV_QUALCO",
    "BAT_TTIME", "CORR_DEPTH", "BAT_CPCO", "BAT_TYPCO", "BAT_QUALCO", "MAG_TOT", "MAG_TOT2",
    "MAG_RES", "MAG_RESSEN", "MAG_DICORR", "MAG_SDEPTH", "MAG_QUALCO", "GRA_OBS", "EOTVOS",
    "FREEAIR", "GRA_QUALCO", "LINEID", "POINTID",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_masks_match_field_groups() {
        let geo = [
            field::TWT,
            field::DEPTH,
            field::MTF1,
            field::MTF2,
            field::MAG,
            field::GOBS,
            field::FAA,
        ];
        assert_eq!(geo.iter().map(|&f| field_bit(f)).sum::<u32>(), MGD77_GEOPHYSICAL_BITS);

        let corr = [field::DIUR, field::MSD, field::EOT];
        assert_eq!(corr.iter().map(|&f| field_bit(f)).sum::<u32>(), MGD77_CORRECTION_BITS);

        let time = [field::YEAR, field::MONTH, field::DAY, field::HOUR, field::MIN];
        assert_eq!(time.iter().map(|&f| field_bit(f)).sum::<u32>(), MGD77_TIME_BITS);
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(MGD77T_HEADER_NAMES.len(), 58);
        assert_eq!(MGD77T_DATA_NAMES.len(), 26);
        assert_eq!(DAT_COLUMN_ORDER.split('\t').count(), MGD77_N_DATA_FIELDS);
    }
}
