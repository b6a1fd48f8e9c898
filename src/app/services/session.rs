//! Format multiplexer
//!
//! A [`Session`] carries the per-run settings (column selection, correction
//! and bitflag switches, header copy choice) and routes header and record
//! operations to the codec of the file's format. It owns at most one open
//! file at a time; dropping the session closes it.
//!
//! Whole files are handled by [`read_dataset`] and [`write_dataset`]:
//!
//! ```rust,no_run
//! use mgd77_codec::app::services::session::{read_dataset, write_dataset};
//! use mgd77_codec::{Config, Session};
//! use std::path::Path;
//!
//! # fn example() -> mgd77_codec::Result<()> {
//! let mut session = Session::new(&Config::default());
//! session.select("time,lat,lon,depth,DEPTH>0")?;
//! let dataset = read_dataset(Path::new("01010083.mgd77"), &mut session)?;
//! write_dataset(Path::new("01010083.nc"), &dataset, &mut session)?;
//! # Ok(())
//! # }
//! ```

use super::bitflags::{CorrectionPlan, apply_dataset_flags, position_keep};
use super::catalog;
use super::codec::RecordCodec;
use super::container::array::has_signature;
use super::container::{ArrayReader, mgd77plus};
use super::correction::{AuxColumns, CorrectionTable, Track};
use super::filter::{row, row_flags};
use super::geomodels::{GeoModels, GravityFormula};
use super::m77_codec::M77Codec;
use super::selector::Selection;
use super::tabular_codec::{DatCodec, M77tCodec};
use crate::app::models::header_params::item;
use crate::app::models::{ColumnData, ColumnRef, ColumnSet, DataRecord, Dataset, FieldId, Format, Header};
use crate::config::Config;
use crate::constants::field;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The open file of a session
#[derive(Debug)]
pub enum Handle {
    TextIn(BufReader<File>),
    TextOut(BufWriter<File>),
    ContainerIn(ArrayReader),
    /// Records wait here until the container is written on close
    ContainerOut(Vec<DataRecord>),
}

/// Settings and open file of one read or write pass
pub struct Session {
    /// Format of the current (or last) file
    pub format: Format,
    /// Formats this session may read or write
    pub formats: Vec<Format>,
    pub selection: Selection,
    /// Apply secondary scale/offset and stored recomputes, per set
    pub use_corrections: [bool; 2],
    /// Honour stored bitflags, per set
    pub use_flags: [bool; 2],
    /// Write the original header copy to containers
    pub original: bool,
    /// Widen magnetic and gravity storage in new containers
    pub high_resolution: bool,
    pub models: GeoModels,
    /// Correction table text, parsed per cruise
    pub correction_table: Option<String>,
    /// Quantization overflows seen while writing
    pub errors: usize,
    config: Config,
    codec: Option<Box<dyn RecordCodec>>,
    handle: Option<Handle>,
    header: Option<Header>,
    path: Option<PathBuf>,
    rec: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("format", &self.format)
            .field("selection", &self.selection)
            .field("use_corrections", &self.use_corrections)
            .field("use_flags", &self.use_flags)
            .field("original", &self.original)
            .field("path", &self.path)
            .field("rec", &self.rec)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {:?}: {}", self.path, e);
        }
    }
}

fn text_codec(format: Format, config: &Config) -> Result<Box<dyn RecordCodec>> {
    match format {
        Format::M77 => Ok(Box::new(M77Codec::new(config))),
        Format::M77T => Ok(Box::new(M77tCodec::new())),
        Format::Dat => Ok(Box::new(DatCodec::new())),
        Format::Cdf => Err(Error::FormatDisabled {
            format: format.to_string(),
        }),
    }
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::io(format!("Failed to create {}", path.display()), e))
}

fn flush(out: &mut dyn Write, path: &Path) -> Result<()> {
    out.flush()
        .map_err(|e| Error::io(format!("Failed to flush {}", path.display()), e))
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            format: Format::M77,
            formats: Format::ALL.to_vec(),
            selection: Selection::all(),
            use_corrections: config.use_corrections,
            use_flags: config.use_flags,
            original: config.original_header,
            high_resolution: config.high_resolution,
            models: GeoModels::default(),
            correction_table: None,
            errors: 0,
            config: config.clone(),
            codec: None,
            handle: None,
            header: None,
            path: None,
            rec: 0,
        }
    }

    /// Restrict the session to the given formats
    pub fn with_formats(mut self, formats: &[Format]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn with_models(mut self, models: GeoModels) -> Self {
        self.models = models;
        self
    }

    /// Parse and store a column selection
    pub fn select(&mut self, arg: &str) -> Result<()> {
        self.selection = Selection::parse(arg)?;
        Ok(())
    }

    /// Load a correction table to apply on every read
    pub fn load_corrections(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read correction table {}", path.display()), e))?;
        self.correction_table = Some(text);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Header of the open file
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Resolve a path or cruise name and pick its format
    ///
    /// A name without a recognised extension is looked up in the data
    /// directories. The format must be enabled for this session.
    fn resolve(&mut self, path: &Path) -> Result<PathBuf> {
        let path = match Format::from_path(path) {
            Ok(_) => path.to_path_buf(),
            Err(e) => match path.to_str() {
                Some(name) if !path.exists() => self.config.locate(name)?,
                _ => return Err(e),
            },
        };
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        self.format = Format::from_path(&path)?;
        self.check_enabled(self.format)?;
        Ok(path)
    }

    fn check_enabled(&self, format: Format) -> Result<()> {
        if self.formats.contains(&format) {
            Ok(())
        } else {
            Err(Error::FormatDisabled {
                format: format.to_string(),
            })
        }
    }

    /// Open a file for reading and decode its header
    pub fn open_read(&mut self, path: &Path) -> Result<Header> {
        self.close()?;
        let path = self.resolve(path)?;

        let header = if self.format == Format::Cdf {
            let reader = ArrayReader::open(&path)?;
            let header = mgd77plus::read_header(&reader, &path.display().to_string())?;
            self.handle = Some(Handle::ContainerIn(reader));
            header
        } else {
            let file = File::open(&path)
                .map_err(|e| Error::io(format!("Failed to open {}", path.display()), e))?;
            let mut input = BufReader::new(file);
            let mut codec = text_codec(self.format, &self.config)?;
            let header = codec.read_header(&mut input)?;
            self.codec = Some(codec);
            self.handle = Some(Handle::TextIn(input));
            header
        };

        debug!("Opened {} as {}", path.display(), self.format);
        self.path = Some(path);
        self.header = Some(header.clone());
        self.rec = 0;
        Ok(header)
    }

    /// Read the next raw record, or `None` at end of data
    pub fn read_record(&mut self) -> Result<Option<DataRecord>> {
        let rec = self.rec;
        let record = match (&mut self.handle, &mut self.codec, &self.header) {
            (Some(Handle::TextIn(input)), Some(codec), _) => codec.read_record(input)?,
            (Some(Handle::ContainerIn(reader)), _, Some(header)) => {
                if rec >= header.n_records {
                    None
                } else {
                    Some(mgd77plus::read_record(reader, header, rec, self.use_corrections[0])?)
                }
            }
            _ => return Err(Error::bad_argument("no file open for reading")),
        };
        if record.is_some() {
            self.rec += 1;
        }
        Ok(record)
    }

    /// Create a file and write its header
    ///
    /// The format comes from the file extension, falling back to the
    /// session format.
    pub fn open_write(&mut self, path: &Path, header: &Header) -> Result<()> {
        self.close()?;
        self.format = Format::from_path(path).unwrap_or(self.format);
        self.check_enabled(self.format)?;

        if self.format == Format::Cdf {
            let mut header = header.clone();
            if header.author.is_empty() {
                header.author = self.config.author.clone();
            }
            if self.high_resolution {
                catalog::select_high_resolution(&mut header);
            }
            self.header = Some(header);
            self.handle = Some(Handle::ContainerOut(Vec::new()));
        } else {
            let mut out = BufWriter::new(create(path)?);
            let mut codec = text_codec(self.format, &self.config)?;
            codec.write_header(header, &mut out)?;
            self.codec = Some(codec);
            self.header = Some(header.clone());
            self.handle = Some(Handle::TextOut(out));
        }

        debug!("Created {} as {}", path.display(), self.format);
        self.path = Some(path.to_path_buf());
        self.rec = 0;
        Ok(())
    }

    /// Append one raw record to the open file
    ///
    /// Container records are collected and stored when the file is closed.
    pub fn write_record(&mut self, record: &DataRecord) -> Result<()> {
        match (&mut self.handle, &mut self.codec) {
            (Some(Handle::TextOut(out)), Some(codec)) => codec.write_record(record, out)?,
            (Some(Handle::ContainerOut(records)), _) => records.push(record.clone()),
            _ => return Err(Error::bad_argument("no file open for writing")),
        }
        self.rec += 1;
        Ok(())
    }

    /// Flush and release the open file
    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let path = self.path.clone().unwrap_or_default();
        match handle {
            Handle::TextOut(mut out) => flush(&mut out, &path)?,
            Handle::ContainerOut(records) => {
                let header = self
                    .header
                    .as_ref()
                    .ok_or_else(|| Error::bad_argument("container has no header"))?;
                let overflow = mgd77plus::write_records(
                    header,
                    &records,
                    &path,
                    self.use_corrections[0],
                    !self.original,
                )?;
                self.errors += overflow;
            }
            Handle::TextIn(_) | Handle::ContainerIn(_) => {}
        }
        self.codec = None;
        debug!("Closed {} after {} records", path.display(), self.rec);
        Ok(())
    }

    fn flags_in_use(&self, selection: &Selection) -> [bool; 2] {
        if selection.flags_disabled {
            [false, false]
        } else {
            self.use_flags
        }
    }
}

// =============================================================================
// Whole-file operations
// =============================================================================

/// Column values of the file being read, for auxiliary lookups
enum Source<'a> {
    Columns(&'a Dataset),
    Container(&'a mut ArrayReader, &'a Header, bool),
}

impl Source<'_> {
    fn fetch(&mut self, id: FieldId) -> Result<Vec<f64>> {
        let missing = || Error::no_such_column(catalog::spec(id).abbrev);
        match self {
            Self::Columns(full) => full
                .order
                .iter()
                .position(|&c| full.header.descriptor(c).field == Some(id))
                .and_then(|col| full.values[col].as_numeric())
                .map(<[f64]>::to_vec)
                .ok_or_else(missing),
            Self::Container(reader, header, use_corrections) => {
                let item = header.info[ColumnSet::Standard.index()]
                    .columns
                    .iter()
                    .position(|c| c.present && c.field == Some(id))
                    .ok_or_else(missing)?;
                let col = ColumnRef {
                    set: ColumnSet::Standard,
                    item,
                };
                match mgd77plus::read_column(reader, header, col, *use_corrections)? {
                    ColumnData::Numeric(v) => Ok(v),
                    ColumnData::Text(_) => Err(missing()),
                }
            }
        }
    }
}

fn cruise_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn gravity_formula(header: &Header) -> GravityFormula {
    header.params[Header::ORIGINAL]
        .get(item::GRAVITY_THEORETICAL_FORMULA_CODE)
        .trim()
        .parse::<i32>()
        .ok()
        .and_then(GravityFormula::from_code)
        .unwrap_or(GravityFormula::Iag1980)
}

/// Time, longitude, latitude and travel time of every record read
///
/// Taken from the output columns when selected, else from the file. Missing
/// fields are NaN.
fn track_columns(dataset: &Dataset, source: &mut Source) -> [Vec<f64>; 4] {
    let n = dataset.n_records();
    [field::TIME, field::LON, field::LAT, field::TWT].map(|id| {
        let own = dataset.order.iter().position(|&c| {
            c.set == ColumnSet::Standard && dataset.header.descriptor(c).field == Some(id)
        });
        match own.and_then(|col| dataset.values[col].as_numeric()) {
            Some(v) => v.to_vec(),
            None => source
                .fetch(id)
                .ok()
                .filter(|v| v.len() == n)
                .unwrap_or_else(|| vec![f64::NAN; n]),
        }
    })
}

/// Apply the session's correction table to a dataset
fn apply_table(
    text: &str,
    cruise: &str,
    dataset: &mut Dataset,
    track: &[Vec<f64>; 4],
    models: &GeoModels,
) -> Result<()> {
    let names: Vec<String> = (0..dataset.order.len())
        .map(|col| dataset.descriptor(col).abbrev.clone())
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut table = CorrectionTable::parse(text, &[cruise], &names)?;
    if table.is_empty() {
        return Ok(());
    }

    let [time, lon, lat, twt] = track;
    let survey_id = dataset.header.survey_id().to_string();
    let track = Track {
        time,
        lon,
        lat,
        twt,
        survey_id: &survey_id,
        formula: gravity_formula(&dataset.header),
        weight: 1.0,
    };
    let aux = AuxColumns::compute(&table.aux_fields(cruise), &track, models)?;
    table.apply(cruise, dataset, &aux)?;
    Ok(())
}

/// Run the read-side pipeline over a freshly read dataset
///
/// Stored recomputes come first, then bitflags. Records are tested against
/// the selection's filter before any table correction is applied.
fn finish_read(
    session: &Session,
    selection: &Selection,
    cruise: &str,
    dataset: &mut Dataset,
    source: &mut Source,
) -> Result<()> {
    if session.use_corrections[ColumnSet::Standard.index()] {
        let plan = CorrectionPlan::build(selection, &dataset.header);
        plan.apply(dataset, &session.models, &mut |id| source.fetch(id))?;
    }

    // Track columns are gathered at full length, then thinned like the dataset
    let mut track = session
        .correction_table
        .as_ref()
        .map(|_| track_columns(dataset, source));
    let apply = session.flags_in_use(selection);
    if let (Some(track), Some(keep)) = (track.as_mut(), position_keep(dataset, apply)) {
        for column in track.iter_mut() {
            let mut flags = keep.iter();
            column.retain(|_| flags.next().copied().unwrap_or(true));
        }
    }
    apply_dataset_flags(dataset, apply);

    let filter = selection.filter();
    let keep: Option<Vec<bool>> = (!filter.is_empty()).then(|| {
        (0..dataset.n_records())
            .map(|rec| filter.accepts(&row(dataset, rec), row_flags(dataset, rec)))
            .collect()
    });

    if let (Some(text), Some(track)) = (&session.correction_table, &track) {
        apply_table(text, cruise, dataset, track, &session.models)?;
    }

    if let Some(keep) = keep {
        let before = dataset.n_records();
        dataset.retain_records(&keep);
        debug!("Filter kept {} of {} records", dataset.n_records(), before);
    }
    Ok(())
}

/// Read a whole file as a dataset of the session's selected columns
pub fn read_dataset(path: &Path, session: &mut Session) -> Result<Dataset> {
    let mut header = session.open_read(path)?;
    let path = session.path.clone().unwrap_or_else(|| path.to_path_buf());
    let cruise = cruise_name(&path);
    let mut selection = session.selection.clone();

    let dataset = match session.handle.take() {
        Some(Handle::ContainerIn(mut reader)) => {
            selection.resolve(&mut header)?;
            let values = selection
                .order
                .iter()
                .map(|&col| {
                    mgd77plus::read_column(&mut reader, &header, col, session.use_corrections[col.set.index()])
                })
                .collect::<Result<Vec<_>>>()?;

            let mut flags = [None, None];
            let use_flags = session.flags_in_use(&selection);
            for set in ColumnSet::ALL {
                let i = set.index();
                if use_flags[i] || selection.bit_tests.iter().any(|t| t.set == set) {
                    flags[i] = mgd77plus::read_flags(&mut reader, set)?;
                }
            }

            let source_header = header.clone();
            let mut dataset = Dataset {
                header,
                order: selection.order.clone(),
                values,
                flags,
                errors: 0,
            };
            let mut source = Source::Container(&mut reader, &source_header, session.use_corrections[0]);
            finish_read(session, &selection, &cruise, &mut dataset, &mut source)?;
            dataset
        }
        Some(Handle::TextIn(mut input)) => {
            let mut records = Vec::new();
            if let Some(codec) = session.codec.as_mut() {
                while let Some(record) = codec.read_record(&mut input)? {
                    records.push(record);
                }
            }
            let full = Dataset::from_records(header, &records);

            let mut header = full.header.clone();
            selection.resolve(&mut header)?;
            let values = selection
                .order
                .iter()
                .map(|c| {
                    full.order
                        .iter()
                        .position(|o| o == c)
                        .map(|i| full.values[i].clone())
                        .ok_or_else(|| Error::no_such_column(header.descriptor(*c).abbrev.as_str()))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut dataset = Dataset {
                header,
                order: selection.order.clone(),
                values,
                flags: [None, None],
                errors: 0,
            };
            let mut source = Source::Columns(&full);
            finish_read(session, &selection, &cruise, &mut dataset, &mut source)?;
            dataset
        }
        _ => return Err(Error::bad_argument("no file open for reading")),
    };
    session.close()?;

    info!(
        "Read {} records of {} columns from {}",
        dataset.n_records(),
        dataset.order.len(),
        path.display()
    );
    Ok(dataset)
}

/// Write a dataset to a file in the format of its extension
///
/// Containers receive the revised header copy unless the session asks for
/// the original; text formats always carry the original copy.
pub fn write_dataset(path: &Path, dataset: &Dataset, session: &mut Session) -> Result<()> {
    session.close()?;
    session.format = Format::from_path(path).unwrap_or(session.format);
    session.check_enabled(session.format)?;

    if session.format == Format::Cdf {
        let mut dataset = dataset.clone();
        if dataset.header.author.is_empty() {
            dataset.header.author = session.config.author.clone();
        }
        if session.high_resolution {
            let widened = catalog::select_high_resolution(&mut dataset.header);
            debug!("High-resolution storage for {} columns", widened);
        }
        mgd77plus::write_dataset(&mut dataset, path, session.use_corrections, !session.original)?;
        if dataset.errors > 0 {
            warn!("{} values could not be stored in {}", dataset.errors, path.display());
        }
        session.errors += dataset.errors;
    } else {
        session.open_write(path, &dataset.header)?;
        for rec in 0..dataset.n_records() {
            session.write_record(&dataset.record(rec))?;
        }
        session.close()?;
    }

    info!(
        "Wrote {} records to {} as {}",
        dataset.n_records(),
        path.display(),
        session.format
    );
    Ok(())
}

/// Read every raw record of a file through the session
pub fn read_records(path: &Path, session: &mut Session) -> Result<(Header, Vec<DataRecord>)> {
    let header = session.open_read(path)?;
    let mut records = Vec::with_capacity(header.n_records);
    while let Some(record) = session.read_record()? {
        records.push(record);
    }
    session.close()?;
    Ok((header, records))
}

/// Check that `input` starts with a container signature
///
/// The input is rewound afterwards.
pub fn is_container(input: &mut (impl Read + Seek)) -> Result<bool> {
    let mut magic = [0u8; 4];
    let ok = input.read_exact(&mut magic).is_ok() && has_signature(&magic);
    input
        .rewind()
        .map_err(|e| Error::io("Failed to rewind input", e))?;
    Ok(ok)
}
