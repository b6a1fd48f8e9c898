//! MGD77 header items and their placement in the 24 fixed header records

use serde::{Deserialize, Serialize};

/// A header item and where it lives in the fixed-width header block
///
/// Each placement is `(record, start, length)` with 1-based record and
/// column numbers. Items spanning two records list both placements.
#[derive(Debug, Clone, Copy)]
pub struct HeaderItem {
    pub name: &'static str,
    pub placements: &'static [(usize, usize, usize)],
}

impl HeaderItem {
    /// Total width over all placements
    pub fn width(&self) -> usize {
        self.placements.iter().map(|&(_, _, len)| len).sum()
    }
}

const fn one(name: &'static str, placements: &'static [(usize, usize, usize)]) -> HeaderItem {
    HeaderItem { name, placements }
}

/// Every header item in header order
pub static HEADER_ITEMS: &[HeaderItem] = &[
    one("Record_Type", &[(1, 1, 1)]),
    one("Survey_Identifier", &[(1, 2, 8)]),
    one("Format_Acronym", &[(1, 10, 5)]),
    one("Data_Center_File_Number", &[(1, 15, 8)]),
    one("Parameters_Surveyed_Code", &[(1, 27, 5)]),
    one("File_Creation_Year", &[(1, 32, 4)]),
    one("File_Creation_Month", &[(1, 36, 2)]),
    one("File_Creation_Day", &[(1, 38, 2)]),
    one("Source_Institution", &[(1, 40, 39)]),
    one("Country", &[(2, 1, 18)]),
    one("Platform_Name", &[(2, 19, 21)]),
    one("Platform_Type_Code", &[(2, 40, 1)]),
    one("Platform_Type", &[(2, 41, 6)]),
    one("Chief_Scientist", &[(2, 47, 32)]),
    one("Project_Cruise_Leg", &[(3, 1, 58)]),
    one("Funding", &[(3, 59, 20)]),
    one("Survey_Departure_Year", &[(4, 1, 4)]),
    one("Survey_Departure_Month", &[(4, 5, 2)]),
    one("Survey_Departure_Day", &[(4, 7, 2)]),
    one("Port_of_Departure", &[(4, 9, 32)]),
    one("Survey_Arrival_Year", &[(4, 41, 4)]),
    one("Survey_Arrival_Month", &[(4, 45, 2)]),
    one("Survey_Arrival_Day", &[(4, 47, 2)]),
    one("Port_of_Arrival", &[(4, 49, 30)]),
    one("Navigation_Instrumentation", &[(5, 1, 40)]),
    one("Geodetic_Datum_Position_Determination_Method", &[(5, 41, 38)]),
    one("Bathymetry_Instrumentation", &[(6, 1, 40)]),
    one("Bathymetry_Add_Forms_of_Data", &[(6, 41, 38)]),
    one("Magnetics_Instrumentation", &[(7, 1, 40)]),
    one("Magnetics_Add_Forms_of_Data", &[(7, 41, 38)]),
    one("Gravity_Instrumentation", &[(8, 1, 40)]),
    one("Gravity_Add_Forms_of_Data", &[(8, 41, 38)]),
    one("Seismic_Instrumentation", &[(9, 1, 40)]),
    one("Seismic_Data_Formats", &[(9, 41, 38)]),
    one("Format_Type", &[(10, 1, 1)]),
    one("Format_Description", &[(10, 2, 75), (11, 1, 19)]),
    one("Topmost_Latitude", &[(11, 41, 3)]),
    one("Bottommost_Latitude", &[(11, 44, 3)]),
    one("Leftmost_Longitude", &[(11, 47, 4)]),
    one("Rightmost_Longitude", &[(11, 51, 4)]),
    one("Bathymetry_Digitizing_Rate", &[(12, 1, 3)]),
    one("Bathymetry_Sampling_Rate", &[(12, 4, 12)]),
    one("Bathymetry_Assumed_Sound_Velocity", &[(12, 16, 5)]),
    one("Bathymetry_Datum_Code", &[(12, 21, 2)]),
    one("Bathymetry_Interpolation_Scheme", &[(12, 23, 56)]),
    one("Magnetics_Digitizing_Rate", &[(13, 1, 3)]),
    one("Magnetics_Sampling_Rate", &[(13, 4, 2)]),
    one("Magnetics_Sensor_Tow_Distance", &[(13, 6, 4)]),
    one("Magnetics_Sensor_Depth", &[(13, 10, 5)]),
    one("Magnetics_Sensor_Separation", &[(13, 15, 3)]),
    one("Magnetics_Ref_Field_Code", &[(13, 18, 2)]),
    one("Magnetics_Ref_Field", &[(13, 20, 12)]),
    one("Magnetics_Method_Applying_Res_Field", &[(13, 32, 47)]),
    one("Gravity_Digitizing_Rate", &[(14, 1, 3)]),
    one("Gravity_Sampling_Rate", &[(14, 4, 2)]),
    one("Gravity_Theoretical_Formula_Code", &[(14, 6, 1)]),
    one("Gravity_Theoretical_Formula", &[(14, 7, 17)]),
    one("Gravity_Reference_System_Code", &[(14, 24, 1)]),
    one("Gravity_Reference_System", &[(14, 25, 16)]),
    one("Gravity_Corrections_Applied", &[(14, 41, 38)]),
    one("Gravity_Departure_Base_Station", &[(15, 1, 7)]),
    one("Gravity_Departure_Base_Station_Name", &[(15, 8, 33)]),
    one("Gravity_Arrival_Base_Station", &[(15, 41, 7)]),
    one("Gravity_Arrival_Base_Station_Name", &[(15, 48, 31)]),
    one("Number_of_Ten_Degree_Identifiers", &[(16, 1, 2)]),
    one("Ten_Degree_Identifier", &[(16, 4, 75), (17, 1, 75)]),
    one("Additional_Documentation_1", &[(18, 1, 78)]),
    one("Additional_Documentation_2", &[(19, 1, 78)]),
    one("Additional_Documentation_3", &[(20, 1, 78)]),
    one("Additional_Documentation_4", &[(21, 1, 78)]),
    one("Additional_Documentation_5", &[(22, 1, 78)]),
    one("Additional_Documentation_6", &[(23, 1, 78)]),
    one("Additional_Documentation_7", &[(24, 1, 78)]),
];

/// Indices of items referenced by name in code
pub mod item {
    pub const RECORD_TYPE: usize = 0;
    pub const SURVEY_IDENTIFIER: usize = 1;
    pub const FORMAT_ACRONYM: usize = 2;
    pub const DATA_CENTER_FILE_NUMBER: usize = 3;
    pub const FILE_CREATION_YEAR: usize = 5;
    pub const SOURCE_INSTITUTION: usize = 8;
    pub const SURVEY_DEPARTURE_YEAR: usize = 16;
    pub const SURVEY_ARRIVAL_YEAR: usize = 20;
    pub const GRAVITY_THEORETICAL_FORMULA_CODE: usize = 55;
    pub const ADDITIONAL_DOCUMENTATION_1: usize = 66;
    pub const N_DOCUMENTATION: usize = 7;
}

/// How an MGD77T header value maps onto header items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum M77tItem {
    /// One item, copied as is
    Single(usize),
    /// YYYYMMDD built from consecutive year, month and day items
    Date(usize),
    /// All additional documentation lines
    Documentation,
}

/// Header items in MGD77T column order (parallel to `MGD77T_HEADER_NAMES`)
pub static M77T_ITEMS: [M77tItem; 58] = {
    use M77tItem::{Date, Documentation, Single};
    [
        Single(1),
        Single(2),
        Single(3),
        Single(4),
        Date(5),
        Single(8),
        Single(9),
        Single(10),
        Single(11),
        Single(12),
        Single(13),
        Single(14),
        Single(15),
        Date(16),
        Single(19),
        Date(20),
        Single(23),
        Single(24),
        Single(25),
        Single(26),
        Single(27),
        Single(28),
        Single(29),
        Single(30),
        Single(31),
        Single(32),
        Single(33),
        Single(36),
        Single(37),
        Single(38),
        Single(39),
        Single(40),
        Single(41),
        Single(42),
        Single(43),
        Single(44),
        Single(45),
        Single(46),
        Single(47),
        Single(48),
        Single(49),
        Single(50),
        Single(51),
        Single(52),
        Single(53),
        Single(54),
        Single(55),
        Single(56),
        Single(57),
        Single(58),
        Single(59),
        Single(60),
        Single(61),
        Single(62),
        Single(63),
        Single(64),
        Single(65),
        Documentation,
    ]
};

/// Values of every header item, indexed like [`HEADER_ITEMS`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderParams {
    values: Vec<String>,
}

impl Default for HeaderParams {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParams {
    /// All items blank
    pub fn new() -> Self {
        Self {
            values: vec![String::new(); HEADER_ITEMS.len()],
        }
    }

    pub fn get(&self, item: usize) -> &str {
        &self.values[item]
    }

    pub fn set(&mut self, item: usize, value: impl Into<String>) {
        self.values[item] = value.into();
    }

    /// Item index by name
    pub fn index_of(name: &str) -> Option<usize> {
        HEADER_ITEMS.iter().position(|i| i.name == name)
    }

    /// Iterate `(item, value)` pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&'static HeaderItem, &str)> {
        HEADER_ITEMS.iter().zip(self.values.iter().map(String::as_str))
    }

    /// Value for an MGD77T header column
    pub fn m77t_value(&self, column: M77tItem) -> String {
        match column {
            M77tItem::Single(i) => self.values[i].trim().to_string(),
            M77tItem::Date(i) => {
                let parts = [&self.values[i], &self.values[i + 1], &self.values[i + 2]];
                if parts.iter().all(|p| p.trim().is_empty()) {
                    return String::new();
                }
                format!(
                    "{:0>4}{:0>2}{:0>2}",
                    parts[0].trim(),
                    parts[1].trim(),
                    parts[2].trim()
                )
            }
            M77tItem::Documentation => {
                let docs = &self.values[item::ADDITIONAL_DOCUMENTATION_1
                    ..item::ADDITIONAL_DOCUMENTATION_1 + item::N_DOCUMENTATION];
                let width = HEADER_ITEMS[item::ADDITIONAL_DOCUMENTATION_1].width();
                let joined: String = docs.iter().map(|d| format!("{:<width$}", d)).collect();
                joined.trim_end().to_string()
            }
        }
    }

    /// Store a value read from an MGD77T header column
    pub fn set_m77t_value(&mut self, column: M77tItem, value: &str) {
        match column {
            M77tItem::Single(i) => self.values[i] = value.trim().to_string(),
            M77tItem::Date(i) => {
                let value = value.trim();
                if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
                    self.values[i] = value[0..4].to_string();
                    self.values[i + 1] = value[4..6].to_string();
                    self.values[i + 2] = value[6..8].to_string();
                } else {
                    self.values[i] = value.to_string();
                }
            }
            M77tItem::Documentation => {
                let width = HEADER_ITEMS[item::ADDITIONAL_DOCUMENTATION_1].width();
                let chars: Vec<char> = value.chars().collect();
                for n in 0..item::N_DOCUMENTATION {
                    let start = (n * width).min(chars.len());
                    let end = ((n + 1) * width).min(chars.len());
                    let line: String = chars[start..end].iter().collect();
                    self.values[item::ADDITIONAL_DOCUMENTATION_1 + n] =
                        line.trim_end().to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MGD77T_HEADER_NAMES, MGD77_HEADER_LENGTH, MGD77_N_HEADER_RECORDS};

    #[test]
    fn test_placements_fit_records() {
        for item in HEADER_ITEMS {
            for &(rec, start, len) in item.placements {
                assert!((1..=MGD77_N_HEADER_RECORDS).contains(&rec), "{}", item.name);
                assert!(start + len - 1 <= MGD77_HEADER_LENGTH - 2, "{}", item.name);
            }
        }
    }

    #[test]
    fn test_item_indices() {
        assert_eq!(HEADER_ITEMS[item::SURVEY_IDENTIFIER].name, "Survey_Identifier");
        assert_eq!(HEADER_ITEMS[item::SOURCE_INSTITUTION].name, "Source_Institution");
        assert_eq!(
            HEADER_ITEMS[item::GRAVITY_THEORETICAL_FORMULA_CODE].name,
            "Gravity_Theoretical_Formula_Code"
        );
        assert_eq!(
            HEADER_ITEMS[item::ADDITIONAL_DOCUMENTATION_1].name,
            "Additional_Documentation_1"
        );
        assert_eq!(M77T_ITEMS.len(), MGD77T_HEADER_NAMES.len());
    }

    #[test]
    fn test_m77t_date_composite() {
        let mut params = HeaderParams::new();
        params.set_m77t_value(M77tItem::Date(item::SURVEY_DEPARTURE_YEAR), "19830426");
        assert_eq!(params.get(item::SURVEY_DEPARTURE_YEAR), "1983");
        assert_eq!(params.get(item::SURVEY_DEPARTURE_YEAR + 1), "04");
        assert_eq!(params.get(item::SURVEY_DEPARTURE_YEAR + 2), "26");
        assert_eq!(
            params.m77t_value(M77tItem::Date(item::SURVEY_DEPARTURE_YEAR)),
            "19830426"
        );
        assert_eq!(params.m77t_value(M77tItem::Date(item::SURVEY_ARRIVAL_YEAR)), "");
    }

    #[test]
    fn test_m77t_documentation_round_trip() {
        let mut params = HeaderParams::new();
        params.set(item::ADDITIONAL_DOCUMENTATION_1, "FIRST LINE");
        params.set(item::ADDITIONAL_DOCUMENTATION_1 + 2, "THIRD LINE");
        let joined = params.m77t_value(M77tItem::Documentation);

        let mut back = HeaderParams::new();
        back.set_m77t_value(M77tItem::Documentation, &joined);
        assert_eq!(back, params);
    }
}
