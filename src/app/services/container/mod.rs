//! MGD77+ columnar container
//!
//! Datasets are stored in classic array files (netCDF CDF-1):
//! - [`array`] - typed variables and attributes through the `netcdf3` crate
//! - [`mgd77plus`] - mapping between datasets and variables
//!
//! # Example
//!
//! ```no_run
//! use mgd77_codec::app::services::container::{ArrayReader, mgd77plus};
//! use std::path::Path;
//!
//! # fn main() -> mgd77_codec::Result<()> {
//! let path = Path::new("01010083.nc");
//! let mut reader = ArrayReader::open(path)?;
//! let header = mgd77plus::read_header(&reader, "01010083.nc")?;
//! for col in header.present_columns() {
//!     let values = mgd77plus::read_column(&mut reader, &header, col, true)?;
//!     println!("{}: {} values", header.descriptor(col).abbrev, values.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod array;
pub mod mgd77plus;

#[cfg(test)]
pub mod tests;

pub use array::{ArrayFile, ArrayReader, VarData};
