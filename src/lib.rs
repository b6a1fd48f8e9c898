//! MGD77 Codec Library
//!
//! A Rust library for reading and writing marine geophysical track-line data
//! (navigation, bathymetry, magnetics, gravity) exchanged in the MGD77 family
//! of formats.
//!
//! This library provides tools for:
//! - Decoding and encoding the fixed-width MGD77 punch-card layout, including
//!   upgrading legacy records
//! - Reading and writing the tab-delimited MGD77T and generic tabular layouts
//! - Storing datasets in the self-describing MGD77+ columnar container with
//!   scaled integer quantization
//! - Selecting output columns, filtering records and honouring bitflags
//! - Evaluating correction formulas and recomputing derived anomalies

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod bitflags;
        pub mod catalog;
        pub mod codec;
        pub mod container;
        pub mod correction;
        pub mod filter;
        pub mod geomodels;
        pub mod m77_codec;
        pub mod quantize;
        pub mod selector;
        pub mod session;
        pub mod tabular_codec;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{ColumnData, ColumnDescriptor, ColumnSet, DataRecord, Dataset, Format, Header};
pub use app::services::session::Session;
pub use config::Config;

/// Result type alias for the MGD77 codec
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for MGD77 codec operations
///
/// Every variant maps onto the integer status domain used by the MGD77
/// tool chain through [`Error::code`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// File does not exist
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// First header record does not carry a header record type
    #[error("Header record not found (record type '{found}')")]
    NoHeaderRecord { found: String },

    /// Header block could not be read
    #[error("Error reading header: {message}")]
    ReadHeader { message: String },

    /// Header block could not be written
    #[error("Error writing header: {message}")]
    WriteHeader { message: String },

    /// Data section could not be read
    #[error("Error reading data record {record}: {message}")]
    ReadData { record: usize, message: String },

    /// Data section could not be written
    #[error("Error writing data record {record}: {message}")]
    WriteData { record: usize, message: String },

    /// Header sequence number does not match its position
    #[error("Expected header sequence {expected:02} but record says '{found}'")]
    WrongHeaderRecord { expected: usize, found: String },

    /// Data line does not start with a data record type
    #[error("Data record {record} is not a data record")]
    NoDataRecord { record: usize },

    /// Data line has the wrong length, in characters or in tab-separated fields
    #[error("Data record {record} has incorrect length {length} (expected {expected})")]
    WrongDataRecordLength {
        record: usize,
        length: usize,
        expected: usize,
    },

    /// Data line holds a character outside the ASCII range
    #[error("Data record {record} has a non-ASCII character '{found}' at column {column}")]
    NonAsciiRecord {
        record: usize,
        column: usize,
        found: char,
    },

    /// Field text did not parse as the expected literal
    #[error("Unable to convert field '{field}' in record {record}: '{text}'")]
    Conversion {
        record: usize,
        field: String,
        text: String,
    },

    /// Columnar container structure is invalid or an operation on it failed
    #[error("Container error: {message}")]
    Container { message: String },

    /// File is not an MGD77+ container
    #[error("Not an MGD77+ file: {path}")]
    NotMgd77Plus { path: String },

    /// No format could be determined
    #[error("Unknown format: {name}")]
    UnknownFormat { name: String },

    /// Operation requested for a format the session has disabled
    #[error("Format {format} is not enabled for this operation")]
    FormatDisabled { format: String },

    /// Requested column is not part of the dataset
    #[error("Requested column {name} not in data set")]
    NoSuchColumn { name: String },

    /// Invalid argument
    #[error("Bad argument: {message}")]
    BadArgument { message: String },

    /// Correction table syntax error
    #[error("Correction table format error line {line}: {message}")]
    CorrectionTable { line: usize, message: String },

    /// Date outside the range supported by a reference model
    #[error("Date {year} outside the valid range of the reference field model")]
    BadIgrfDate { year: f64 },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a header read error
    pub fn read_header(message: impl Into<String>) -> Self {
        Self::ReadHeader {
            message: message.into(),
        }
    }

    /// Create a header write error
    pub fn write_header(message: impl Into<String>) -> Self {
        Self::WriteHeader {
            message: message.into(),
        }
    }

    /// Create a data read error
    pub fn read_data(record: usize, message: impl Into<String>) -> Self {
        Self::ReadData {
            record,
            message: message.into(),
        }
    }

    /// Create a data write error
    pub fn write_data(record: usize, message: impl Into<String>) -> Self {
        Self::WriteData {
            record,
            message: message.into(),
        }
    }

    /// Create a field conversion error
    pub fn conversion(record: usize, field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Conversion {
            record,
            field: field.into(),
            text: text.into(),
        }
    }

    /// Create a container error
    pub fn container(message: impl Into<String>) -> Self {
        Self::Container {
            message: message.into(),
        }
    }

    /// Create a no such column error
    pub fn no_such_column(name: impl Into<String>) -> Self {
        Self::NoSuchColumn { name: name.into() }
    }

    /// Create a bad argument error
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Create a correction table error
    pub fn correction_table(line: usize, message: impl Into<String>) -> Self {
        Self::CorrectionTable {
            line,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Status code in the MGD77 error domain
    pub fn code(&self) -> i32 {
        use constants::status;
        match self {
            Self::FileNotFound { .. } => status::FILE_NOT_FOUND,
            Self::Io { .. } => status::ERROR_OPEN_FILE,
            Self::NoHeaderRecord { .. } => status::NO_HEADER_REC,
            Self::ReadHeader { .. } => status::ERROR_READ_HEADER_ASC,
            Self::WriteHeader { .. } => status::ERROR_WRITE_HEADER_ASC,
            Self::ReadData { .. } => status::ERROR_READ_ASC_DATA,
            Self::WriteData { .. } => status::ERROR_WRITE_ASC_DATA,
            Self::WrongHeaderRecord { .. } => status::WRONG_HEADER_REC,
            Self::NoDataRecord { .. } => status::NO_DATA_REC,
            Self::WrongDataRecordLength { .. } => status::WRONG_DATA_REC_LEN,
            Self::Conversion { .. } | Self::NonAsciiRecord { .. } => status::ERROR_CONV_DATA_REC,
            Self::Container { .. } => status::ERROR_READ_BIN_DATA,
            Self::NotMgd77Plus { .. } => status::ERROR_NOT_MGD77PLUS,
            Self::UnknownFormat { .. } => status::UNKNOWN_FORMAT,
            Self::FormatDisabled { .. } => status::UNKNOWN_MODE,
            Self::NoSuchColumn { .. } => status::ERROR_NOSUCHCOLUMN,
            Self::BadArgument { .. }
            | Self::CorrectionTable { .. }
            | Self::Configuration { .. } => status::BAD_ARG,
            Self::BadIgrfDate { .. } => status::BAD_IGRFDATE,
        }
    }
}
