//! MGD77+ mapping between datasets and classic array files
//!
//! Every present column becomes one variable named by its abbreviation.
//! Numeric columns are quantized with the column's scale and offset; text
//! columns are fixed-width character arrays over an `<abbrev>_dim`
//! dimension. Columns holding a single repeated value are stored once and
//! replicated on read.

use super::array::{ArrayFile, ArrayReader, VarData, attr_numbers, attr_text, storage_type};
use crate::app::models::calendar::history_stamp;
use crate::app::models::{
    Adjust, ColumnData, ColumnDescriptor, ColumnRef, ColumnSet, DataRecord, Dataset, Header,
    HeaderParams, HEADER_ITEMS, StorageType,
};
use crate::app::services::{catalog, quantize};
use crate::constants::{MGD77_CDF_CONVENTION, MGD77_CDF_VERSION, MGD77_SET_COLS, field, field_bit};
use crate::{Error, Result};
use netcdf3::{DataSet, Variable};
use std::path::Path;
use tracing::{debug, warn};

/// Flag variable of each column set
pub const FLAG_VARS: [&str; 2] = ["MGD77_flags", "CDF_flags"];

/// Unlimited dimension name when the dataset has time
pub const TIME_DIM: &str = "time";

/// Unlimited dimension name when the dataset has no time
pub const RECORD_DIM: &str = "record_no";

/// Longitude seam found in a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seam {
    None,
    Dateline,
    Greenwich,
    Both,
}

/// Make longitudes continuous across the seam the track crosses
///
/// A jump of more than 180 degrees between neighbours is a dateline crossing
/// when either side is negative, otherwise a Greenwich crossing. Tracks
/// crossing both are left alone.
pub fn shift_seam(lon: &mut [f64]) -> Seam {
    let (mut dateline, mut greenwich) = (false, false);
    for pair in lon.windows(2) {
        if (pair[1] - pair[0]).abs() > 180.0 {
            if pair[0].min(pair[1]) < 0.0 {
                dateline = true;
            } else {
                greenwich = true;
            }
        }
    }

    match (dateline, greenwich) {
        (true, true) => Seam::Both,
        (true, false) => {
            lon.iter_mut().filter(|v| **v < 0.0).for_each(|v| *v += 360.0);
            Seam::Dateline
        }
        (false, true) => {
            lon.iter_mut().filter(|v| **v > 180.0).for_each(|v| *v -= 360.0);
            Seam::Greenwich
        }
        (false, false) => Seam::None,
    }
}

fn same(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// True when a column holds one value in every record
fn is_constant(values: &ColumnData) -> bool {
    match values {
        ColumnData::Numeric(v) => v.len() > 1 && v.windows(2).all(|w| same(w[0], w[1])),
        ColumnData::Text(v) => v.len() > 1 && v.windows(2).all(|w| w[0] == w[1]),
    }
}

fn value_range(values: &ColumnData) -> [f64; 2] {
    let Some(v) = values.as_numeric() else {
        return [f64::NAN, f64::NAN];
    };
    v.iter()
        .filter(|x| !x.is_nan())
        .fold([f64::NAN, f64::NAN], |[lo, hi], &x| [lo.min(x), hi.max(x)])
}

/// Get a dataset ready for storage
///
/// Drops an all-NaN time column, requires longitude, fixes the longitude
/// seam and records constant columns and value ranges.
pub fn prepare_for_write(dataset: &mut Dataset) -> Result<()> {
    match dataset.column_index("time") {
        Some(t) => {
            let all_nan = dataset.values[t]
                .as_numeric()
                .is_some_and(|v| v.iter().all(|x| x.is_nan()));
            if all_nan {
                let cref = dataset.order.remove(t);
                dataset.values.remove(t);
                let column = dataset.header.descriptor_mut(cref);
                column.present = false;
                column.pos = None;
                dataset.header.info[ColumnSet::Standard.index()].bit_pattern &= !field_bit(field::TIME);
                dataset.header.no_time = true;
                debug!("Time column holds no values and is dropped");
            }
        }
        None => dataset.header.no_time = true,
    }

    let lon = dataset
        .column_index("lon")
        .ok_or_else(|| Error::container("longitude column is required"))?;
    if let Some(values) = dataset.values[lon].as_numeric_mut() {
        match shift_seam(values) {
            Seam::Dateline => debug!("Track crosses the dateline, using 0/360 longitudes"),
            Seam::Greenwich => debug!("Track crosses Greenwich, using -180/180 longitudes"),
            Seam::Both => warn!("Track crosses both dateline and Greenwich, longitudes left as is"),
            Seam::None => {}
        }
    }

    for col in 0..dataset.order.len() {
        let cref = dataset.order[col];
        let constant = col != lon && is_constant(&dataset.values[col]);
        let limits = value_range(&dataset.values[col]);
        let column = dataset.header.descriptor_mut(cref);
        column.pos = Some(col);
        column.constant = constant;
        column.limits = limits;
    }
    Ok(())
}

// =============================================================================
// Writing
// =============================================================================

fn define_globals(file: &mut ArrayFile, header: &Header, revised: bool) -> Result<()> {
    file.add_global_text("Conventions", MGD77_CDF_CONVENTION)?;
    file.add_global_text("Version", MGD77_CDF_VERSION)?;
    file.add_global_text("Author", &header.author)?;
    file.add_global_text("title", &format!("Cruise {}", header.survey_id().trim()))?;

    let history = if header.history.is_empty() {
        format!("{} [{}] Conversion to MGD77+ format", history_stamp(), header.author)
    } else {
        header.history.clone()
    };
    file.add_global_text("history", &history)?;

    if let Some(e77) = &header.e77 {
        file.add_global_text("E77", e77)?;
    }
    if header.pdr_wrap != 0.0 {
        file.add_global_doubles("PDR_wrap", vec![header.pdr_wrap])?;
    }

    let original = &header.params[Header::ORIGINAL];
    let newer = &header.params[Header::REVISED];
    for (index, (item, value)) in original.iter().enumerate() {
        file.add_global_text(&format!("MGD77_{}", item.name), value)?;
        if revised && newer.get(index) != value {
            file.add_global_text(&format!("MGD77_{}_REVISED", item.name), newer.get(index))?;
        }
    }
    Ok(())
}

fn define_column(
    file: &mut ArrayFile,
    column: &ColumnDescriptor,
    record_dim: &str,
    per_record: bool,
) -> Result<()> {
    let var = column.abbrev.as_str();
    let mut dims = Vec::with_capacity(2);
    if per_record {
        dims.push(record_dim.to_string());
    }
    if column.is_text() {
        let dim = format!("{}_dim", column.abbrev);
        file.add_dimension(&dim, column.text)?;
        dims.push(dim);
    }
    file.add_variable(var, column.storage, &dims)?;

    if !column.name.is_empty() && column.name != column.abbrev {
        file.add_var_text(var, "long_name", &column.name)?;
    }
    if !column.units.is_empty() {
        file.add_var_text(var, "units", &column.units)?;
    }
    if !column.comment.is_empty() {
        file.add_var_text(var, "comment", &column.comment)?;
    }
    if column.is_text() {
        return Ok(());
    }

    let double = StorageType::Double;
    if per_record && !column.limits[0].is_nan() {
        file.add_var_numbers(var, "actual_range", double, &column.limits)?;
    }
    if column.abbrev == "depth" || column.abbrev == "msd" {
        file.add_var_text(var, "positive", "down")?;
    }
    if column.abbrev != "time" {
        let fill = [column.storage.sentinel()];
        file.add_var_numbers(var, "_FillValue", column.storage, &fill)?;
        file.add_var_numbers(var, "missing_value", column.storage, &fill)?;
    }
    if column.factor != 1.0 {
        file.add_var_numbers(var, "scale_factor", double, &[column.factor])?;
    }
    if column.offset != 0.0 {
        file.add_var_numbers(var, "add_offset", double, &[column.offset])?;
    }
    if column.corr_factor != 1.0 {
        file.add_var_numbers(var, "corr_factor", double, &[column.corr_factor])?;
    }
    if column.corr_offset != 0.0 {
        file.add_var_numbers(var, "corr_offset", double, &[column.corr_offset])?;
    }
    if column.adjust != Adjust::None {
        let code = [column.adjust.code() as f64];
        file.add_var_numbers(var, "adjust", StorageType::Int, &code)?;
    }
    Ok(())
}

fn pack_words<'a>(words: impl Iterator<Item = &'a str>, width: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for word in words {
        let start = bytes.len();
        bytes.extend(word.bytes().take(width));
        bytes.resize(start + width, 0);
    }
    bytes
}

fn unpack_words(bytes: &[u8], width: usize) -> Vec<String> {
    bytes
        .chunks(width.max(1))
        .map(|chunk| {
            String::from_utf8_lossy(chunk)
                .trim_end_matches(['\0', ' '])
                .to_string()
        })
        .collect()
}

fn record_dim_name(header: &Header) -> &'static str {
    if header.no_time { RECORD_DIM } else { TIME_DIM }
}

/// Store a complete dataset at `path`
///
/// The dataset is prepared in place first; quantization overflows are added
/// to `dataset.errors`.
pub fn write_dataset(
    dataset: &mut Dataset,
    path: &Path,
    use_corrections: [bool; 2],
    revised: bool,
) -> Result<()> {
    prepare_for_write(dataset)?;

    let mut file = ArrayFile::new();
    define_globals(&mut file, &dataset.header, revised)?;
    let record_dim = record_dim_name(&dataset.header);
    file.set_records(record_dim, dataset.n_records())?;

    let mut overflow = 0;
    for (col, &cref) in dataset.order.iter().enumerate() {
        let column = dataset.header.descriptor(cref);
        define_column(&mut file, column, record_dim, !column.constant)?;
        let keep = if column.constant { 1 } else { usize::MAX };

        let data = match &dataset.values[col] {
            ColumnData::Numeric(values) => {
                let (scale, offset) = column.effective_transform(use_corrections[cref.set.index()]);
                let values = &values[..values.len().min(keep)];
                let packed = quantize::encode(values, scale, offset, column.storage)?;
                if packed.overflow > 0 {
                    warn!(
                        "{} values of column {} do not fit {:?} storage",
                        packed.overflow, column.abbrev, column.storage
                    );
                }
                overflow += packed.overflow;
                VarData::Numeric(packed.values)
            }
            ColumnData::Text(words) => VarData::Text(pack_words(
                words.iter().take(keep).map(String::as_str),
                column.text,
            )),
        };
        file.set_data(&column.abbrev, column.storage, data);
    }

    for set in ColumnSet::ALL {
        if let Some(flags) = &dataset.flags[set.index()] {
            let name = FLAG_VARS[set.index()];
            file.add_variable(name, StorageType::Int, &[record_dim.to_string()])?;
            let stored = flags.iter().map(|&f| f as i32 as f64).collect();
            file.set_data(name, StorageType::Int, VarData::Numeric(stored));
        }
    }

    dataset.errors += overflow;
    file.write(path)?;
    debug!(
        "Wrote MGD77+ container with {} columns and {} records",
        dataset.order.len(),
        dataset.n_records()
    );
    Ok(())
}

/// Store raw records collected one at a time
///
/// The present standard columns of `header` become the container columns.
/// Returns the number of values that overflowed their storage type.
pub fn write_records(
    header: &Header,
    records: &[DataRecord],
    path: &Path,
    use_corrections: bool,
    revised: bool,
) -> Result<usize> {
    let mut dataset = Dataset::from_records(header.clone(), records);
    write_dataset(&mut dataset, path, [use_corrections; 2], revised)?;
    Ok(dataset.errors)
}

// =============================================================================
// Reading
// =============================================================================

fn read_params(ds: &DataSet) -> [HeaderParams; 2] {
    let mut original = HeaderParams::new();
    let mut revised = HeaderParams::new();
    for (index, item) in HEADER_ITEMS.iter().enumerate() {
        let value = attr_text(ds.get_global_attr(&format!("MGD77_{}", item.name))).unwrap_or_default();
        let newer = attr_text(ds.get_global_attr(&format!("MGD77_{}_REVISED", item.name)));
        revised.set(index, newer.unwrap_or_else(|| value.clone()));
        original.set(index, value);
    }
    [original, revised]
}

fn describe_variable(ds: &DataSet, var: &Variable) -> ColumnDescriptor {
    let name = var.name();
    let storage = storage_type(var.data_type());
    let set = catalog::get_set(name);
    let mut column = match catalog::resolve(name) {
        Some(id) if set == ColumnSet::Standard => catalog::describe(id),
        _ => ColumnDescriptor::extra(name, storage),
    };
    let numbers = |attr: &str| attr_numbers(ds.get_var_attr(name, attr));
    let number = |attr: &str, default: f64| {
        numbers(attr)
            .and_then(|v| v.first().copied())
            .unwrap_or(default)
    };
    let word = |attr: &str| attr_text(ds.get_var_attr(name, attr));
    let dims = var.get_dims();

    column.storage = storage;
    column.text = match (storage, dims.last()) {
        (StorageType::Char, Some(dim)) => dim.size(),
        _ => 0,
    };
    column.name = word("long_name").unwrap_or_else(|| name.to_string());
    column.units = word("units").unwrap_or_default();
    column.comment = word("comment").unwrap_or_default();
    column.factor = number("scale_factor", 1.0);
    column.offset = number("add_offset", 0.0);
    column.corr_factor = number("corr_factor", 1.0);
    column.corr_offset = number("corr_offset", 0.0);
    column.adjust = Adjust::from_code(number("adjust", 0.0) as i32).unwrap_or_default();
    column.limits = match numbers("actual_range").as_deref() {
        Some([lo, hi, ..]) => [*lo, *hi],
        _ => [f64::NAN, f64::NAN],
    };
    column.present = true;
    column.constant =
        dims.is_empty() || (column.is_text() && dims.len() == 1 && !var.is_record_var());
    column
}

/// Build a dataset header from an open container
pub fn read_header(reader: &ArrayReader, path: &str) -> Result<Header> {
    let ds = reader.data_set();
    if ds.get_global_attr("Conventions").is_none() {
        return Err(Error::NotMgd77Plus {
            path: path.to_string(),
        });
    }

    let mut header = Header::empty();
    header.n_records = reader.num_records();
    header.no_time = ds.get_unlimited_dim().is_none_or(|d| d.name() != TIME_DIM);
    header.author = attr_text(ds.get_global_attr("Author")).unwrap_or_default();
    header.history = attr_text(ds.get_global_attr("history")).unwrap_or_default();
    header.e77 = attr_text(ds.get_global_attr("E77"));
    header.pdr_wrap = attr_numbers(ds.get_global_attr("PDR_wrap"))
        .and_then(|v| v.first().copied())
        .unwrap_or(0.0);
    header.params = read_params(ds);

    for var in ds.get_vars() {
        if FLAG_VARS.contains(&var.name()) {
            continue;
        }
        let column = describe_variable(ds, var);
        let info = &mut header.info[column.set.index()];
        let bit = match column.field {
            Some(id) => field_bit(id),
            None if info.columns.len() < MGD77_SET_COLS => 1 << info.columns.len(),
            None => {
                return Err(Error::container(format!(
                    "too many extra columns, {} is beyond the limit of {}",
                    column.abbrev, MGD77_SET_COLS
                )));
            }
        };
        info.bit_pattern |= bit;
        info.columns.push(column);
    }

    if header.no_time && header.find("time").is_none() {
        let mut time = catalog::describe(field::TIME);
        time.present = true;
        header.info[ColumnSet::Standard.index()].columns.push(time);
    }

    debug!(
        "Parsed MGD77+ header for {} with {} records",
        path, header.n_records
    );
    Ok(header)
}

fn decode_numeric(column: &ColumnDescriptor, stored: &[f64], use_corrections: bool) -> Result<Vec<f64>> {
    let (scale, offset) = column.effective_transform(use_corrections);
    quantize::decode(stored, scale, offset, column.storage)
}

/// Read all values of one column
///
/// Constant columns are replicated to the record count; a synthetic time
/// column reads as NaN.
pub fn read_column(
    reader: &mut ArrayReader,
    header: &Header,
    col: ColumnRef,
    use_corrections: bool,
) -> Result<ColumnData> {
    let column = header.descriptor(col);
    let n = header.n_records;
    if reader.data_set().get_var(&column.abbrev).is_none() {
        if column.field == Some(field::TIME) {
            return Ok(ColumnData::Numeric(vec![f64::NAN; n]));
        }
        return Err(Error::no_such_column(column.abbrev.as_str()));
    }

    Ok(match reader.read_var(&column.abbrev)? {
        VarData::Text(bytes) => {
            let mut words = unpack_words(&bytes, column.text);
            if column.constant {
                let word = words.pop().unwrap_or_default();
                words = vec![word; n];
            }
            ColumnData::Text(words)
        }
        VarData::Numeric(stored) => {
            let mut values = decode_numeric(column, &stored, use_corrections)?;
            if column.constant {
                let value = values.first().copied().unwrap_or(f64::NAN);
                values = vec![value; n];
            }
            ColumnData::Numeric(values)
        }
    })
}

/// Read the stored bitflags of a column set, if any
pub fn read_flags(reader: &mut ArrayReader, set: ColumnSet) -> Result<Option<Vec<u32>>> {
    let name = FLAG_VARS[set.index()];
    if reader.data_set().get_var(name).is_none() {
        return Ok(None);
    }
    match reader.read_var(name)? {
        VarData::Numeric(stored) => Ok(Some(stored.iter().map(|&f| f as i32 as u32).collect())),
        VarData::Text(_) => Err(Error::container(format!("{} must be an integer variable", name))),
    }
}

/// Read one record of the standard columns as a raw record
pub fn read_record(
    reader: &mut ArrayReader,
    header: &Header,
    rec: usize,
    use_corrections: bool,
) -> Result<DataRecord> {
    if rec >= header.n_records {
        return Err(Error::container(format!(
            "record {} is beyond the {} records stored",
            rec, header.n_records
        )));
    }
    let mut record = DataRecord::empty();
    for column in &header.info[ColumnSet::Standard.index()].columns {
        let Some(id) = column.field else { continue };
        if reader.data_set().get_var(&column.abbrev).is_none() {
            continue;
        }
        let data = if column.constant {
            reader.read_var(&column.abbrev)?
        } else {
            reader.read_var_record(&column.abbrev, rec)?
        };
        match data {
            VarData::Text(bytes) => {
                let word = unpack_words(&bytes, column.text).pop().unwrap_or_default();
                record.set_word(id, word);
            }
            VarData::Numeric(stored) => {
                let values = decode_numeric(column, &stored, use_corrections)?;
                record.set_number(id, values.first().copied().unwrap_or(f64::NAN));
            }
        }
    }
    if record.is_present(field::TIME) {
        record.split_time();
    }
    Ok(record)
}
