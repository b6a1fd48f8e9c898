//! Classic array files through the `netcdf3` crate
//!
//! MGD77+ only needs the subset of the classic layout the crate covers:
//! fixed and unlimited dimensions, typed variables and typed attributes.
//! Values cross this boundary as `f64` columns or raw character bytes, so
//! the MGD77+ layer never sees the crate's own vector types.

use crate::app::models::StorageType;
use crate::{Error, Result};
use netcdf3::{Attribute, DataSet, DataType, DataVector, FileReader, FileWriter, Version};
use std::fmt::Debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Leading bytes of a classic (`CDF\x01`) or 64-bit offset (`CDF\x02`) file
pub fn has_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..3] == b"CDF" && matches!(bytes[3], 1 | 2)
}

fn nc_error(context: &str, e: impl Debug) -> Error {
    Error::container(format!("{}: {:?}", context, e))
}

pub fn data_type(storage: StorageType) -> DataType {
    match storage {
        StorageType::Byte => DataType::I8,
        StorageType::Char => DataType::U8,
        StorageType::Short => DataType::I16,
        StorageType::Int => DataType::I32,
        StorageType::Float => DataType::F32,
        StorageType::Double => DataType::F64,
    }
}

pub fn storage_type(data_type: DataType) -> StorageType {
    match data_type {
        DataType::I8 => StorageType::Byte,
        DataType::U8 => StorageType::Char,
        DataType::I16 => StorageType::Short,
        DataType::I32 => StorageType::Int,
        DataType::F32 => StorageType::Float,
        DataType::F64 => StorageType::Double,
    }
}

/// Values of one variable
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    /// Stored numbers, widened to `f64`
    Numeric(Vec<f64>),
    /// Character bytes, row-major
    Text(Vec<u8>),
}

fn widen<T: Copy + Into<f64>>(values: Vec<T>) -> Vec<f64> {
    values.into_iter().map(Into::into).collect()
}

impl From<DataVector> for VarData {
    fn from(data: DataVector) -> Self {
        match data {
            DataVector::U8(bytes) => Self::Text(bytes),
            DataVector::I8(v) => Self::Numeric(widen(v)),
            DataVector::I16(v) => Self::Numeric(widen(v)),
            DataVector::I32(v) => Self::Numeric(widen(v)),
            DataVector::F32(v) => Self::Numeric(widen(v)),
            DataVector::F64(v) => Self::Numeric(v),
        }
    }
}

/// Text value of an attribute
pub fn attr_text(attr: Option<&Attribute>) -> Option<String> {
    attr.and_then(Attribute::get_as_string)
}

/// Numeric values of an attribute, whatever its stored type
pub fn attr_numbers(attr: Option<&Attribute>) -> Option<Vec<f64>> {
    let attr = attr?;
    match attr.data_type() {
        DataType::I8 => attr.get_i8().map(|v| widen(v.to_vec())),
        DataType::I16 => attr.get_i16().map(|v| widen(v.to_vec())),
        DataType::I32 => attr.get_i32().map(|v| widen(v.to_vec())),
        DataType::F32 => attr.get_f32().map(|v| widen(v.to_vec())),
        DataType::F64 => attr.get_f64().map(<[f64]>::to_vec),
        DataType::U8 => None,
    }
}

// =============================================================================
// Writing
// =============================================================================

/// Definitions and data of a file about to be written
pub struct ArrayFile {
    data_set: DataSet,
    data: Vec<(String, StorageType, VarData)>,
}

impl Default for ArrayFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayFile {
    pub fn new() -> Self {
        Self {
            data_set: DataSet::new(),
            data: Vec::new(),
        }
    }

    pub fn data_set(&self) -> &DataSet {
        &self.data_set
    }

    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        self.data_set
            .add_fixed_dim(name, len)
            .map_err(|e| nc_error(name, e))
    }

    /// Define the unlimited dimension with its final record count
    pub fn set_records(&mut self, name: &str, n_records: usize) -> Result<()> {
        self.data_set
            .set_unlimited_dim(name, n_records)
            .map_err(|e| nc_error(name, e))
    }

    pub fn add_variable(&mut self, name: &str, storage: StorageType, dims: &[String]) -> Result<()> {
        self.data_set
            .add_var(name, dims, data_type(storage))
            .map_err(|e| nc_error(name, e))
    }

    pub fn add_global_text(&mut self, name: &str, value: &str) -> Result<()> {
        self.data_set
            .add_global_attr_string(name, value)
            .map_err(|e| nc_error(name, e))
    }

    pub fn add_global_doubles(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.data_set
            .add_global_attr_f64(name, values)
            .map_err(|e| nc_error(name, e))
    }

    pub fn add_var_text(&mut self, var: &str, name: &str, value: &str) -> Result<()> {
        self.data_set
            .add_var_attr_string(var, name, value)
            .map_err(|e| nc_error(name, e))
    }

    /// Add a numeric attribute stored as `storage`
    pub fn add_var_numbers(
        &mut self,
        var: &str,
        name: &str,
        storage: StorageType,
        values: &[f64],
    ) -> Result<()> {
        let ds = &mut self.data_set;
        let done = match storage {
            StorageType::Byte => ds.add_var_attr_i8(var, name, values.iter().map(|&v| v as i8).collect()),
            StorageType::Char => ds.add_var_attr_u8(var, name, values.iter().map(|&v| v as u8).collect()),
            StorageType::Short => ds.add_var_attr_i16(var, name, values.iter().map(|&v| v as i16).collect()),
            StorageType::Int => ds.add_var_attr_i32(var, name, values.iter().map(|&v| v as i32).collect()),
            StorageType::Float => ds.add_var_attr_f32(var, name, values.iter().map(|&v| v as f32).collect()),
            StorageType::Double => ds.add_var_attr_f64(var, name, values.to_vec()),
        };
        done.map_err(|e| nc_error(name, e))
    }

    /// Queue the values of a defined variable
    pub fn set_data(&mut self, var: &str, storage: StorageType, data: VarData) {
        self.data.push((var.to_string(), storage, data));
    }

    /// Write definitions then every queued variable
    pub fn write(self, path: &Path) -> Result<()> {
        let context = path.display().to_string();
        let mut writer = FileWriter::open(path).map_err(|e| nc_error(&context, e))?;
        writer
            .set_def(&self.data_set, Version::Classic, 0)
            .map_err(|e| nc_error(&context, e))?;

        for (var, storage, data) in &self.data {
            let written = match (data, storage) {
                (VarData::Text(bytes), _) => writer.write_var_u8(var, bytes),
                (VarData::Numeric(v), StorageType::Byte) => {
                    writer.write_var_i8(var, &v.iter().map(|&x| x as i8).collect::<Vec<_>>())
                }
                (VarData::Numeric(v), StorageType::Char) => {
                    writer.write_var_u8(var, &v.iter().map(|&x| x as u8).collect::<Vec<_>>())
                }
                (VarData::Numeric(v), StorageType::Short) => {
                    writer.write_var_i16(var, &v.iter().map(|&x| x as i16).collect::<Vec<_>>())
                }
                (VarData::Numeric(v), StorageType::Int) => {
                    writer.write_var_i32(var, &v.iter().map(|&x| x as i32).collect::<Vec<_>>())
                }
                (VarData::Numeric(v), StorageType::Float) => {
                    writer.write_var_f32(var, &v.iter().map(|&x| x as f32).collect::<Vec<_>>())
                }
                (VarData::Numeric(v), StorageType::Double) => writer.write_var_f64(var, v),
            };
            written.map_err(|e| nc_error(var, e))?;
        }

        writer.close().map_err(|e| nc_error(&context, e))?;
        debug!("Wrote {} variables to {}", self.data.len(), context);
        Ok(())
    }
}

// =============================================================================
// Reading
// =============================================================================

/// An open array file
pub struct ArrayReader {
    inner: FileReader,
}

impl Debug for ArrayReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayReader")
            .field("vars", &self.inner.data_set().num_vars())
            .field("records", &self.num_records())
            .finish()
    }
}

impl ArrayReader {
    /// Open a file, refusing anything without the classic signature
    pub fn open(path: &Path) -> Result<Self> {
        let context = path.display().to_string();
        let mut magic = [0u8; 4];
        let mut file = File::open(path).map_err(|e| Error::io(format!("Failed to open {}", context), e))?;
        if file.read_exact(&mut magic).is_err() || !has_signature(&magic) {
            return Err(Error::NotMgd77Plus { path: context });
        }
        let inner = FileReader::open(path).map_err(|e| nc_error(&context, e))?;
        Ok(Self { inner })
    }

    pub fn data_set(&self) -> &DataSet {
        self.inner.data_set()
    }

    /// Length of the unlimited dimension, 0 without one
    pub fn num_records(&self) -> usize {
        self.inner
            .data_set()
            .get_unlimited_dim()
            .map_or(0, |dim| dim.size())
    }

    pub fn read_var(&mut self, name: &str) -> Result<VarData> {
        let data = self.inner.read_var(name).map_err(|e| nc_error(name, e))?;
        Ok(data.into())
    }

    /// Values of one record of a record variable
    pub fn read_var_record(&mut self, name: &str, rec: usize) -> Result<VarData> {
        let n = self.num_records();
        if rec >= n {
            return Err(Error::container(format!(
                "record {} of {} is beyond the {} records stored",
                rec, name, n
            )));
        }
        let data = self
            .inner
            .read_record(name, rec)
            .map_err(|e| nc_error(name, e))?;
        Ok(data.into())
    }
}
