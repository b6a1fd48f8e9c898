//! Data models for MGD77 track-line data
//!
//! This module contains the logical column model shared by every codec:
//! column descriptors, the two-set header, raw data records and the
//! column-major dataset handed to callers.

pub mod calendar;
pub mod header_params;

pub use header_params::{HeaderItem, HeaderParams, HEADER_ITEMS};

use crate::constants::{field, MGD77_N_FIELDS, MGD77_TIME_BITS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Catalog field identifier (slot index in a raw data record)
pub type FieldId = usize;

// =============================================================================
// Storage Types
// =============================================================================

/// On-disk storage type of a container variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
}

impl StorageType {
    /// True for types holding integers
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Byte | Self::Char | Self::Short | Self::Int)
    }

    /// Stored value meaning "no data"
    pub fn sentinel(self) -> f64 {
        match self {
            Self::Byte | Self::Char => i8::MIN as f64,
            Self::Short => i16::MIN as f64,
            Self::Int => i32::MIN as f64,
            Self::Float | Self::Double => f64::NAN,
        }
    }

    /// Smallest storable value
    pub fn low(self) -> f64 {
        match self {
            Self::Byte | Self::Char => i8::MIN as f64,
            Self::Short => i16::MIN as f64,
            Self::Int => i32::MIN as f64,
            Self::Float => -(f32::MAX as f64),
            Self::Double => -f64::MAX,
        }
    }

    /// Largest storable value
    pub fn high(self) -> f64 {
        match self {
            Self::Byte | Self::Char => i8::MAX as f64,
            Self::Short => i16::MAX as f64,
            Self::Int => i32::MAX as f64,
            Self::Float => f32::MAX as f64,
            Self::Double => f64::MAX,
        }
    }
}

// =============================================================================
// Column Descriptors
// =============================================================================

/// The two column sets of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnSet {
    /// Columns of the standard MGD77 record (plus time and quality codes)
    Standard = 0,
    /// Additional columns stored only in the container
    Container = 1,
}

impl ColumnSet {
    pub const ALL: [ColumnSet; 2] = [ColumnSet::Standard, ColumnSet::Container];

    /// Array index of this set
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Stored recompute instruction for a standard column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Adjust {
    #[default]
    None,
    /// Unwrap precision depth recorder travel times
    TwtUnwrap,
    /// Depth from travel time via the Carter tables
    CarterDepth,
    /// Residual field as mtf1 minus the reference field
    MagFromIgrf,
    /// Free-air anomaly as gobs minus the 1980 normal gravity
    FaaIgf1980,
    /// Free-air anomaly as gobs plus eot minus the 1980 normal gravity
    FaaEotIgf1980,
}

impl Adjust {
    /// Integer code stored in the `adjust` attribute
    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::TwtUnwrap => 1,
            Self::CarterDepth => 2,
            Self::MagFromIgrf => 3,
            Self::FaaIgf1980 => 4,
            Self::FaaEotIgf1980 => 5,
        }
    }

    /// Inverse of [`Adjust::code`]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::TwtUnwrap),
            2 => Some(Self::CarterDepth),
            3 => Some(Self::MagFromIgrf),
            4 => Some(Self::FaaIgf1980),
            5 => Some(Self::FaaEotIgf1980),
            _ => None,
        }
    }
}

/// Everything known about one logical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Short column name used in selections and as variable name
    pub abbrev: String,

    /// Long descriptive name
    pub name: String,

    /// Physical units
    pub units: String,

    /// Free-form comment
    pub comment: String,

    /// Set the column belongs to
    pub set: ColumnSet,

    /// Container storage type
    pub storage: StorageType,

    /// Text width, 0 for numeric columns
    pub text: usize,

    /// Primary scale (`scale_factor`)
    pub factor: f64,

    /// Primary offset (`add_offset`)
    pub offset: f64,

    /// Secondary correction scale
    pub corr_factor: f64,

    /// Secondary correction offset
    pub corr_offset: f64,

    /// Stored recompute instruction
    pub adjust: Adjust,

    /// Column exists in the dataset
    pub present: bool,

    /// Column holds one value for every record
    pub constant: bool,

    /// Observed minimum and maximum
    pub limits: [f64; 2],

    /// Output position once a selection has been resolved
    pub pos: Option<usize>,

    /// Raw record slot for standard columns
    pub field: Option<FieldId>,
}

impl ColumnDescriptor {
    /// A blank numeric descriptor for a container-only column
    pub fn extra(abbrev: impl Into<String>, storage: StorageType) -> Self {
        Self {
            abbrev: abbrev.into(),
            name: String::new(),
            units: String::new(),
            comment: String::new(),
            set: ColumnSet::Container,
            storage,
            text: 0,
            factor: 1.0,
            offset: 0.0,
            corr_factor: 1.0,
            corr_offset: 0.0,
            adjust: Adjust::None,
            present: true,
            constant: false,
            limits: [f64::NAN, f64::NAN],
            pos: None,
            field: None,
        }
    }

    /// True for text columns
    pub fn is_text(&self) -> bool {
        self.text > 0
    }

    /// Scale and offset in effect when reading or writing values
    pub fn effective_transform(&self, use_corrections: bool) -> (f64, f64) {
        if use_corrections {
            (
                self.factor * self.corr_factor,
                self.offset * self.corr_factor + self.corr_offset,
            )
        } else {
            (self.factor, self.offset)
        }
    }
}

/// Descriptors of one column set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub columns: Vec<ColumnDescriptor>,

    /// Presence bits: field ids for the standard set, item indices otherwise
    pub bit_pattern: u32,
}

impl ColumnInfo {
    /// Index of a column by abbreviation
    pub fn find(&self, abbrev: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.abbrev == abbrev)
    }
}

/// Reference to a column by set and item index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub set: ColumnSet,
    pub item: usize,
}

// =============================================================================
// Header
// =============================================================================

/// Header of an MGD77 dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Column descriptors for the standard and container sets
    pub info: [ColumnInfo; 2],

    /// Number of data records
    pub n_records: usize,

    /// Dataset has no usable time column
    pub no_time: bool,

    /// Author recorded in provenance attributes
    pub author: String,

    /// Processing history
    pub history: String,

    /// Errata status string
    pub e77: Option<String>,

    /// PDR wrap period for travel-time unwrapping
    pub pdr_wrap: f64,

    /// Original and revised header item values
    pub params: [HeaderParams; 2],
}

impl Header {
    pub const ORIGINAL: usize = 0;
    pub const REVISED: usize = 1;

    /// An empty header with no columns
    pub fn empty() -> Self {
        Self {
            info: [ColumnInfo::default(), ColumnInfo::default()],
            n_records: 0,
            no_time: false,
            author: String::new(),
            history: String::new(),
            e77: None,
            pdr_wrap: 0.0,
            params: [HeaderParams::new(), HeaderParams::new()],
        }
    }

    /// Locate a column by abbreviation in either set
    pub fn find(&self, abbrev: &str) -> Option<ColumnRef> {
        ColumnSet::ALL.iter().find_map(|&set| {
            self.info[set.index()]
                .find(abbrev)
                .map(|item| ColumnRef { set, item })
        })
    }

    pub fn descriptor(&self, col: ColumnRef) -> &ColumnDescriptor {
        &self.info[col.set.index()].columns[col.item]
    }

    pub fn descriptor_mut(&mut self, col: ColumnRef) -> &mut ColumnDescriptor {
        &mut self.info[col.set.index()].columns[col.item]
    }

    /// All present columns, standard set first
    pub fn present_columns(&self) -> Vec<ColumnRef> {
        ColumnSet::ALL
            .iter()
            .flat_map(|&set| {
                self.info[set.index()]
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.present)
                    .map(move |(item, _)| ColumnRef { set, item })
            })
            .collect()
    }

    /// Survey identifier from the original header copy
    pub fn survey_id(&self) -> &str {
        self.params[Self::ORIGINAL].get(header_params::item::SURVEY_IDENTIFIER)
    }
}

// =============================================================================
// Data Records
// =============================================================================

/// One raw data record as seen by the text codecs
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    /// Numeric values indexed by field id (text slots unused)
    pub number: [f64; MGD77_N_FIELDS],

    /// id, sln, sspn
    pub word: [String; 3],

    /// Bit `i` is set iff field `i` holds a value
    pub bit_pattern: u32,
}

impl Default for DataRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl DataRecord {
    /// A record with every field missing
    pub fn empty() -> Self {
        Self {
            number: [f64::NAN; MGD77_N_FIELDS],
            word: [String::new(), String::new(), String::new()],
            bit_pattern: 0,
        }
    }

    /// True for the id, sln and sspn slots
    pub fn is_text_field(id: FieldId) -> bool {
        (field::ID..=field::SSPN).contains(&id)
    }

    pub fn is_present(&self, id: FieldId) -> bool {
        self.bit_pattern & (1 << id) != 0
    }

    /// Store a number and keep the presence bit in step
    pub fn set_number(&mut self, id: FieldId, value: f64) {
        self.number[id] = value;
        if value.is_nan() {
            self.bit_pattern &= !(1 << id);
        } else {
            self.bit_pattern |= 1 << id;
        }
    }

    /// Store a text value and keep the presence bit in step
    pub fn set_word(&mut self, id: FieldId, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.bit_pattern &= !(1 << id);
        } else {
            self.bit_pattern |= 1 << id;
        }
        self.word[id - field::ID] = text;
    }

    pub fn word(&self, id: FieldId) -> &str {
        &self.word[id - field::ID]
    }

    /// Compute time from the calendar fields when all of them are present
    ///
    /// A missing time zone counts as zero.
    pub fn assemble_time(&mut self) {
        if self.bit_pattern & MGD77_TIME_BITS != MGD77_TIME_BITS {
            return;
        }
        let tz = if self.number[field::TZ].is_nan() {
            0.0
        } else {
            self.number[field::TZ]
        };
        let time = calendar::civil_to_unix(
            self.number[field::YEAR],
            self.number[field::MONTH],
            self.number[field::DAY],
            self.number[field::HOUR] + tz,
            self.number[field::MIN],
        );
        if let Some(t) = time {
            self.set_number(field::TIME, t);
        }
    }

    /// Fill the calendar fields from time, shifted back to local time
    pub fn split_time(&mut self) {
        let tz = if self.number[field::TZ].is_nan() {
            0.0
        } else {
            self.number[field::TZ]
        };
        let parts = calendar::unix_to_civil(self.number[field::TIME] - 3600.0 * tz);
        let values = match parts {
            Some(c) => [c.year, c.month, c.day, c.hour, c.minute],
            None => [f64::NAN; 5],
        };
        for (offset, value) in values.into_iter().enumerate() {
            self.set_number(field::YEAR + offset, value);
        }
    }
}

// =============================================================================
// Datasets
// =============================================================================

/// Values of one output column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    pub fn as_numeric_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            Self::Numeric(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Self::Text(v) => Some(v),
            Self::Numeric(_) => None,
        }
    }

    /// Keep only the rows marked true
    fn retain(&mut self, keep: &[bool]) {
        match self {
            Self::Numeric(v) => retain_rows(v, keep),
            Self::Text(v) => retain_rows(v, keep),
        }
    }
}

fn retain_rows<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut row = 0;
    values.retain(|_| {
        let k = keep.get(row).copied().unwrap_or(true);
        row += 1;
        k
    });
}

/// A complete dataset in output column order
#[derive(Debug, Clone)]
pub struct Dataset {
    pub header: Header,

    /// Output columns as (set, item) references into the header
    pub order: Vec<ColumnRef>,

    /// Column values, parallel to `order`
    pub values: Vec<ColumnData>,

    /// Optional per-record bitflags for each set
    pub flags: [Option<Vec<u32>>; 2],

    /// Quantization overflow count accumulated while writing
    pub errors: usize,
}

impl Dataset {
    /// Build a column-major dataset from raw records
    ///
    /// Every present standard column of the header becomes an output column.
    pub fn from_records(mut header: Header, records: &[DataRecord]) -> Self {
        let mut order = Vec::new();
        let mut values = Vec::new();

        for (item, column) in header.info[0].columns.iter_mut().enumerate() {
            let Some(id) = column.field else { continue };
            if !column.present {
                continue;
            }
            column.pos = Some(order.len());
            order.push(ColumnRef {
                set: ColumnSet::Standard,
                item,
            });
            values.push(if DataRecord::is_text_field(id) {
                ColumnData::Text(records.iter().map(|r| r.word(id).to_string()).collect())
            } else {
                ColumnData::Numeric(records.iter().map(|r| r.number[id]).collect())
            });
        }

        header.info[0].bit_pattern = records.iter().fold(0, |acc, r| acc | r.bit_pattern);
        header.n_records = records.len();

        Self {
            header,
            order,
            values,
            flags: [None, None],
            errors: 0,
        }
    }

    pub fn n_records(&self) -> usize {
        self.values
            .first()
            .map(ColumnData::len)
            .unwrap_or(self.header.n_records)
    }

    pub fn descriptor(&self, col: usize) -> &ColumnDescriptor {
        self.header.descriptor(self.order[col])
    }

    /// Output index of a column by abbreviation
    pub fn column_index(&self, abbrev: &str) -> Option<usize> {
        self.order
            .iter()
            .position(|&c| self.header.descriptor(c).abbrev == abbrev)
    }

    pub fn numeric(&self, abbrev: &str) -> Option<&[f64]> {
        self.column_index(abbrev)
            .and_then(|i| self.values[i].as_numeric())
    }

    /// Rebuild the raw record at `rec` from the standard columns
    ///
    /// Calendar fields are derived from time when a time column is present.
    pub fn record(&self, rec: usize) -> DataRecord {
        let mut record = DataRecord::empty();
        let mut have_time = false;

        for (col, &cref) in self.order.iter().enumerate() {
            if cref.set != ColumnSet::Standard {
                continue;
            }
            let Some(id) = self.header.descriptor(cref).field else {
                continue;
            };
            match &self.values[col] {
                ColumnData::Numeric(v) => {
                    record.set_number(id, v[rec]);
                    have_time |= id == field::TIME;
                }
                ColumnData::Text(v) => record.set_word(id, v[rec].clone()),
            }
        }

        if have_time {
            record.split_time();
        }
        record
    }

    /// Drop records whose entry in `keep` is false, from every column and flag array
    pub fn retain_records(&mut self, keep: &[bool]) {
        for column in &mut self.values {
            column.retain(keep);
        }
        for flags in self.flags.iter_mut().flatten() {
            retain_rows(flags, keep);
        }
        self.header.n_records = self.n_records();
    }
}

// =============================================================================
// Formats
// =============================================================================

/// Logical on-disk format of a cruise file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Fixed-width MGD77 punch-card layout
    M77,
    /// Tab-delimited MGD77T layout
    M77T,
    /// Generic tab-delimited table
    Dat,
    /// MGD77+ columnar container
    Cdf,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::M77, Format::M77T, Format::Dat, Format::Cdf];

    /// Canonical file extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::M77 => "mgd77",
            Self::M77T => "m77t",
            Self::Dat => "dat",
            Self::Cdf => "nc",
        }
    }

    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "mgd77" | "m77" => Ok(Self::M77),
            "m77t" => Ok(Self::M77T),
            "dat" => Ok(Self::Dat),
            "nc" => Ok(Self::Cdf),
            _ => Err(Error::UnknownFormat {
                name: path.display().to_string(),
            }),
        }
    }

    pub fn is_text(self) -> bool {
        !matches!(self, Self::Cdf)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::M77 => "MGD77",
            Self::M77T => "MGD77T",
            Self::Dat => "DAT",
            Self::Cdf => "MGD77+",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "m77" | "mgd77" => Ok(Self::M77),
            "m77t" | "mgd77t" => Ok(Self::M77T),
            "dat" => Ok(Self::Dat),
            "nc" | "cdf" | "mgd77+" => Ok(Self::Cdf),
            _ => Err(Error::UnknownFormat { name: s.to_string() }),
        }
    }
}
