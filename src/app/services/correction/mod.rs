//! Correction-formula interpreter
//!
//! A correction table assigns each (cruise, column) pair a sum of terms
//!
//! ```text
//! dz = Σ factor · M(scale · (value - origin))^power
//! ```
//!
//! with `M` one of identity, cos, sin or exp (cos and sin take radians).
//! The corrected output is the stored value minus `dz`.
//!
//! ## Usage
//!
//! ```rust
//! use mgd77_codec::app::services::correction::{CorrectionTable, evaluate};
//!
//! # fn example() -> mgd77_codec::Result<()> {
//! let table = CorrectionTable::parse(
//!     "01010083 faa 1.5*cos(0.0174533*(lat-0))\n",
//!     &["01010083"],
//!     &["lat", "faa"],
//! )?;
//! let terms = table.terms("01010083", "faa").unwrap();
//! let dz = evaluate(terms, &[60.0, 0.0], &[f64::NAN; 18]);
//! assert!((dz - 0.75).abs() < 1e-5);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod auxiliary;
pub mod parser;

pub use auxiliary::{AuxColumns, AuxField, AuxRecord, Track};
pub use parser::TermParser;

use crate::app::models::{ColumnData, Dataset};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Function applied to the scaled argument of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Identity,
    Cos,
    Sin,
    Exp,
}

impl Modifier {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Cos => x.cos(),
            Self::Sin => x.sin(),
            Self::Exp => x.exp(),
        }
    }
}

/// Reference value subtracted before scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    Value(f64),
    /// Value of the first record, resolved by [`init_origins`]
    FirstRecord,
}

/// Where a term takes its variable from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSource {
    /// Bare number; the term contributes its factor
    Constant,
    /// Index into the column list the table was parsed against
    Column(usize),
    Aux(AuxField),
}

/// One additive term of a correction formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionTerm {
    pub factor: f64,
    pub modifier: Modifier,
    pub scale: f64,
    pub origin: Origin,
    pub power: f64,
    pub source: TermSource,
}

impl CorrectionTerm {
    pub fn constant(factor: f64) -> Self {
        Self {
            factor,
            modifier: Modifier::Identity,
            scale: 1.0,
            origin: Origin::Value(0.0),
            power: 1.0,
            source: TermSource::Constant,
        }
    }

    fn variable(&self, values: &[f64], aux: &AuxRecord) -> f64 {
        match self.source {
            TermSource::Constant => f64::NAN,
            TermSource::Column(i) => values.get(i).copied().unwrap_or(f64::NAN),
            TermSource::Aux(f) => aux[f.index()],
        }
    }

    /// Contribution of this term for one record
    pub fn value(&self, values: &[f64], aux: &AuxRecord) -> f64 {
        if self.source == TermSource::Constant {
            return self.factor;
        }
        let origin = match self.origin {
            Origin::Value(v) => v,
            Origin::FirstRecord => 0.0,
        };
        let x = self.modifier.apply(self.scale * (self.variable(values, aux) - origin));
        if self.power == 1.0 {
            self.factor * x
        } else {
            self.factor * x.powf(self.power)
        }
    }
}

/// Sum the terms of a formula for one record
pub fn evaluate(terms: &[CorrectionTerm], values: &[f64], aux: &AuxRecord) -> f64 {
    terms.iter().map(|t| t.value(values, aux)).sum()
}

/// Resolve first-record origins from the first record's values
///
/// A NaN first value falls back to an origin of 0.
pub fn init_origins(terms: &mut [CorrectionTerm], first_values: &[f64], first_aux: &AuxRecord) {
    for term in terms.iter_mut() {
        if term.origin != Origin::FirstRecord {
            continue;
        }
        let first = term.variable(first_values, first_aux);
        term.origin = if first.is_nan() {
            warn!("Correction origin = T has NaN in 1st record, reset to 0");
            Origin::Value(0.0)
        } else {
            Origin::Value(first)
        };
    }
}

/// Parsed correction formulas by cruise and column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionTable {
    columns: Vec<String>,
    entries: BTreeMap<(String, String), Vec<CorrectionTerm>>,
}

impl CorrectionTable {
    /// Parse table text, keeping only the given cruises and columns
    pub fn parse(text: &str, cruises: &[&str], columns: &[&str]) -> Result<Self> {
        let parser = TermParser::new()?;
        let mut table = Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            entries: BTreeMap::new(),
        };

        for (n, raw) in text.lines().enumerate() {
            let Some(line) = parser::split_line(raw) else {
                continue;
            };
            if !cruises.contains(&line.cruise) || !columns.contains(&line.column) {
                continue;
            }
            let terms = line
                .terms
                .iter()
                .map(|word| parser.parse(word, n + 1, columns))
                .collect::<Result<Vec<_>>>()?;
            table
                .entries
                .entry((line.cruise.to_string(), line.column.to_string()))
                .or_default()
                .extend(terms);
        }

        debug!("Correction table holds {} formulas", table.entries.len());
        Ok(table)
    }

    /// Read and parse a table file
    pub fn from_file(path: &Path, cruises: &[&str], columns: &[&str]) -> Result<Self> {
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read correction table {}", path.display()), e))?;
        Self::parse(&text, cruises, columns)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column names term sources index into
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn terms(&self, cruise: &str, column: &str) -> Option<&[CorrectionTerm]> {
        self.entries
            .get(&(cruise.to_string(), column.to_string()))
            .map(Vec::as_slice)
    }

    /// Auxiliary fields needed by the formulas of a cruise
    pub fn aux_fields(&self, cruise: &str) -> Vec<AuxField> {
        let mut fields: Vec<AuxField> = self
            .entries
            .iter()
            .filter(|((c, _), _)| c == cruise)
            .flat_map(|(_, terms)| terms.iter())
            .filter_map(|t| match t.source {
                TermSource::Aux(f) => Some(f),
                _ => None,
            })
            .collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    /// Resolve first-record origins of every formula of a cruise
    pub fn init_origins(&mut self, cruise: &str, first_values: &[f64], first_aux: &AuxRecord) {
        for ((c, _), terms) in self.entries.iter_mut() {
            if c == cruise {
                init_origins(terms, first_values, first_aux);
            }
        }
    }

    /// Subtract the corrections of a cruise from the dataset's columns
    ///
    /// Corrections are computed from the uncorrected values. Columns the
    /// table refers to must be numeric output columns of the dataset.
    /// Returns the number of columns corrected.
    pub fn apply(&mut self, cruise: &str, dataset: &mut Dataset, aux: &AuxColumns) -> Result<usize> {
        let n = dataset.n_records();
        if n == 0 {
            return Ok(0);
        }
        if aux.len() != n {
            return Err(Error::bad_argument(format!(
                "auxiliary values cover {} of {} records",
                aux.len(),
                n
            )));
        }

        let index: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|name| dataset.column_index(name))
            .collect();
        let raw: Vec<Vec<f64>> = index
            .iter()
            .map(|col| {
                col.and_then(|c| dataset.values[c].as_numeric())
                    .map(<[f64]>::to_vec)
                    .unwrap_or_else(|| vec![f64::NAN; n])
            })
            .collect();
        let row = |rec: usize| raw.iter().map(|v| v[rec]).collect::<Vec<f64>>();

        self.init_origins(cruise, &row(0), aux.record(0));

        let mut corrected = 0;
        for ((c, column), terms) in &self.entries {
            if c != cruise {
                continue;
            }
            let target = self
                .columns
                .iter()
                .position(|name| name == column)
                .and_then(|i| index[i])
                .ok_or_else(|| Error::no_such_column(column.as_str()))?;
            let ColumnData::Numeric(values) = &mut dataset.values[target] else {
                return Err(Error::bad_argument(format!(
                    "cannot apply a correction to text column {}",
                    column
                )));
            };
            for (rec, value) in values.iter_mut().enumerate() {
                *value -= evaluate(terms, &row(rec), aux.record(rec));
            }
            corrected += 1;
        }

        debug!("Applied {} table corrections for cruise {}", corrected, cruise);
        Ok(corrected)
    }
}

/// Distinct names the formulas of the given cruises and columns refer to
///
/// Lets callers fetch the columns and auxiliaries a table needs before
/// parsing it against them.
pub fn scan_table(text: &str, cruises: &[&str], columns: &[&str]) -> Result<Vec<String>> {
    let parser = TermParser::new()?;
    let mut names: Vec<String> = Vec::new();
    for line in text.lines().filter_map(parser::split_line) {
        if !cruises.contains(&line.cruise) || !columns.contains(&line.column) {
            continue;
        }
        for word in &line.terms {
            if let Some(name) = parser.source_name(word) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    Ok(names)
}
