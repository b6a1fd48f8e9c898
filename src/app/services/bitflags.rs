//! Bitflags and stored recompute instructions
//!
//! Two passes run over a freshly read dataset:
//! - stored bitflags null out values an external quality pass marked bad,
//!   and records with a flagged position are dropped altogether
//! - standard columns carrying an `adjust` code are recomputed from their
//!   auxiliary columns (travel-time unwrapping, Carter depth, magnetic
//!   residual, free-air anomaly)

use super::geomodels::{GeoModels, GravityFormula};
use super::selector::Selection;
use crate::app::models::calendar::time_to_fyear;
use crate::app::models::{Adjust, ColumnData, ColumnRef, ColumnSet, Dataset, FieldId, Header};
use crate::constants::{MGD77_SET_COLS, field, field_bit};
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Flag bit of a column within its set's flag word
///
/// Standard columns use their catalog field id, container columns their
/// item index.
pub fn flag_bit(header: &Header, col: ColumnRef) -> u32 {
    match col.set {
        ColumnSet::Standard => header.descriptor(col).field.map(field_bit).unwrap_or(0),
        ColumnSet::Container if col.item < MGD77_SET_COLS => 1 << col.item,
        ColumnSet::Container => 0,
    }
}

/// Null out the flagged values of record `rec`
///
/// Numeric values become NaN and text values are blanked. Returns the
/// number of values cleared.
pub fn apply_bitflags(dataset: &mut Dataset, rec: usize, apply: [bool; 2]) -> usize {
    let mut cleared = 0;
    for (col, &cref) in dataset.order.iter().enumerate() {
        let set = cref.set.index();
        if !apply[set] {
            continue;
        }
        let Some(word) = dataset.flags[set].as_ref().and_then(|f| f.get(rec).copied()) else {
            continue;
        };
        if word & flag_bit(&dataset.header, cref) == 0 {
            continue;
        }
        match &mut dataset.values[col] {
            ColumnData::Numeric(v) => v[rec] = f64::NAN,
            ColumnData::Text(v) => v[rec].clear(),
        }
        cleared += 1;
    }
    cleared
}

/// Records to keep after dropping those with a flagged position
///
/// `None` when standard flags are absent or not applied.
pub fn position_keep(dataset: &Dataset, apply: [bool; 2]) -> Option<Vec<bool>> {
    let position = field_bit(field::LAT) | field_bit(field::LON);
    match (&dataset.flags[ColumnSet::Standard.index()], apply[0]) {
        (Some(flags), true) => Some(flags.iter().map(|f| f & position == 0).collect()),
        _ => None,
    }
}

/// Apply stored bitflags to every record of a dataset
///
/// After nulling flagged values, records whose latitude or longitude flag
/// is set are removed from every column. Returns the number of records
/// removed.
pub fn apply_dataset_flags(dataset: &mut Dataset, apply: [bool; 2]) -> usize {
    if dataset.flags.iter().all(Option::is_none) {
        return 0;
    }

    let mut cleared = 0;
    for rec in 0..dataset.n_records() {
        cleared += apply_bitflags(dataset, rec, apply);
    }

    let keep = position_keep(dataset, apply).unwrap_or_default();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        dataset.retain_records(&keep);
    }

    debug!(
        "Bitflags cleared {} values and removed {} records",
        cleared, removed
    );
    removed
}

// =============================================================================
// Recompute instructions
// =============================================================================

/// One column to recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E77Correction {
    pub adjust: Adjust,
    /// Output column holding the target values
    pub col: usize,
}

impl E77Correction {
    /// Auxiliary fields the recompute reads
    pub fn required(&self) -> &'static [FieldId] {
        match self.adjust {
            Adjust::None => &[],
            Adjust::TwtUnwrap => &[field::TWT],
            Adjust::CarterDepth => &[field::LAT, field::LON, field::TWT],
            Adjust::MagFromIgrf => &[field::TIME, field::LAT, field::LON, field::MTF1],
            Adjust::FaaIgf1980 => &[field::LAT, field::GOBS],
            Adjust::FaaEotIgf1980 => &[field::LAT, field::GOBS, field::EOT],
        }
    }
}

/// The recomputes requested by a resolved selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionPlan {
    pub corrections: Vec<E77Correction>,
    /// Distinct auxiliary fields, in field order
    pub needed: Vec<FieldId>,
    pdr_wrap: f64,
}

impl CorrectionPlan {
    /// Collect the adjust codes of the selected standard columns
    ///
    /// Travel-time unwrapping with a zero wrap period is dropped with a
    /// warning.
    pub fn build(selection: &Selection, header: &Header) -> Self {
        let mut plan = Self {
            pdr_wrap: header.pdr_wrap,
            ..Self::default()
        };

        for (col, &cref) in selection.order.iter().enumerate() {
            if cref.set != ColumnSet::Standard {
                continue;
            }
            let adjust = header.descriptor(cref).adjust;
            if adjust == Adjust::None {
                continue;
            }
            if adjust == Adjust::TwtUnwrap && header.pdr_wrap == 0.0 {
                warn!("PDR unwrapping requested but period = 0. Wrapping deactivated");
                continue;
            }
            let correction = E77Correction { adjust, col };
            for &id in correction.required() {
                if !plan.needed.contains(&id) {
                    plan.needed.push(id);
                }
            }
            plan.corrections.push(correction);
        }

        plan.needed.sort_unstable();
        if !plan.is_empty() {
            debug!(
                "Correction plan: {} recomputes needing fields {:?}",
                plan.corrections.len(),
                plan.needed
            );
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    fn find(&self, adjust: Adjust) -> Option<usize> {
        self.corrections
            .iter()
            .find(|c| c.adjust == adjust)
            .map(|c| c.col)
    }

    /// Recompute the planned columns of `dataset`
    ///
    /// Auxiliary fields that are output columns are taken from the dataset;
    /// the rest come from `fetch` and are dropped when the call returns.
    /// Records whose target value is NaN are left alone.
    pub fn apply(
        &self,
        dataset: &mut Dataset,
        models: &GeoModels,
        fetch: &mut dyn FnMut(FieldId) -> Result<Vec<f64>>,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let n = dataset.n_records();

        let mut aux: BTreeMap<FieldId, Vec<f64>> = BTreeMap::new();
        for &id in &self.needed {
            let values = match output_column(dataset, id) {
                Some(col) => dataset.values[col]
                    .as_numeric()
                    .map(<[f64]>::to_vec)
                    .unwrap_or_default(),
                None => fetch(id)?,
            };
            if values.len() != n {
                return Err(Error::container(format!(
                    "auxiliary field {} has {} values for {} records",
                    id,
                    values.len(),
                    n
                )));
            }
            aux.insert(id, values);
        }
        let column = |id: FieldId| aux.get(&id).map(Vec::as_slice).unwrap_or(&[]);

        if let Some(col) = self.find(Adjust::TwtUnwrap) {
            let mut twt = column(field::TWT).to_vec();
            unwrap_pdr(&mut twt, self.pdr_wrap);
            if let Some(values) = dataset.values[col].as_numeric_mut() {
                values.copy_from_slice(&twt);
            }
            aux.insert(field::TWT, twt);
        }
        let column = |id: FieldId| aux.get(&id).map(Vec::as_slice).unwrap_or(&[]);

        for correction in &self.corrections {
            let Some(values) = dataset.values[correction.col].as_numeric_mut() else {
                continue;
            };
            match correction.adjust {
                Adjust::None | Adjust::TwtUnwrap => {}
                Adjust::CarterDepth => {
                    let (lon, lat, twt) = (column(field::LON), column(field::LAT), column(field::TWT));
                    recompute(values, |rec| {
                        Ok(models.depth.depth_from_twt(lon[rec], lat[rec], 1000.0 * twt[rec]))
                    })?;
                }
                Adjust::MagFromIgrf => {
                    let (time, lon, lat, mtf1) = (
                        column(field::TIME),
                        column(field::LON),
                        column(field::LAT),
                        column(field::MTF1),
                    );
                    recompute(values, |rec| {
                        let igrf = models.field.total_field(time_to_fyear(time[rec]), lon[rec], lat[rec])?;
                        Ok(mtf1[rec] - igrf)
                    })?;
                }
                Adjust::FaaIgf1980 => {
                    let (lat, gobs) = (column(field::LAT), column(field::GOBS));
                    recompute(values, |rec| {
                        Ok(gobs[rec] - GravityFormula::Iag1980.normal_gravity(0.0, lat[rec]))
                    })?;
                }
                Adjust::FaaEotIgf1980 => {
                    let (lat, gobs, eot) = (column(field::LAT), column(field::GOBS), column(field::EOT));
                    recompute(values, |rec| {
                        Ok(gobs[rec] + eot[rec] - GravityFormula::Iag1980.normal_gravity(0.0, lat[rec]))
                    })?;
                }
            }
        }

        info!("Applied {} stored recomputes over {} records", self.corrections.len(), n);
        Ok(())
    }
}

fn output_column(dataset: &Dataset, id: FieldId) -> Option<usize> {
    dataset.order.iter().position(|&c| {
        c.set == ColumnSet::Standard && dataset.header.descriptor(c).field == Some(id)
    })
}

fn recompute(values: &mut [f64], mut value_at: impl FnMut(usize) -> Result<f64>) -> Result<()> {
    for rec in 0..values.len() {
        if values[rec].is_nan() {
            continue;
        }
        values[rec] = value_at(rec)?;
    }
    Ok(())
}

/// Undo precision depth recorder wrap-around in place
///
/// A jump of more than half the period between consecutive valid travel
/// times adds one period against the jump to the running correction.
pub fn unwrap_pdr(twt: &mut [f64], period: f64) {
    let trigger = 0.5 * period;
    let mut previous: Option<f64> = None;
    let mut correction = 0.0;
    for value in twt.iter_mut() {
        if !value.is_nan() {
            if let Some(prev) = previous {
                let step = *value - prev;
                if step.abs() > trigger {
                    correction += period.copysign(-step);
                }
            }
            previous = Some(*value);
        }
        *value += correction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{ColumnDescriptor, StorageType};
    use crate::app::services::catalog::plain_header;

    fn dataset(names: &[&str], columns: Vec<Vec<f64>>) -> Dataset {
        let mut header = plain_header(false);
        let order: Vec<ColumnRef> = names.iter().map(|n| header.find(n).unwrap()).collect();
        for (pos, &c) in order.iter().enumerate() {
            header.descriptor_mut(c).pos = Some(pos);
        }
        header.n_records = columns[0].len();
        Dataset {
            header,
            order,
            values: columns.into_iter().map(ColumnData::Numeric).collect(),
            flags: [None, None],
            errors: 0,
        }
    }

    fn selection_of(dataset: &Dataset) -> Selection {
        Selection {
            order: dataset.order.clone(),
            ..Selection::default()
        }
    }

    fn no_fetch(id: FieldId) -> Result<Vec<f64>> {
        panic!("unexpected fetch of field {}", id)
    }

    #[test]
    fn test_flag_bits() {
        let mut header = plain_header(false);
        header.info[1].columns.push(ColumnDescriptor::extra("grav", StorageType::Float));
        let depth = header.find("depth").unwrap();
        assert_eq!(flag_bit(&header, depth), 1 << field::DEPTH);
        let grav = header.find("grav").unwrap();
        assert_eq!(flag_bit(&header, grav), 1);
    }

    #[test]
    fn test_flagged_values_become_nan() {
        let mut data = dataset(&["lat", "depth"], vec![vec![1.0, 2.0], vec![100.0, 200.0]]);
        data.flags[0] = Some(vec![field_bit(field::DEPTH), 0]);

        assert_eq!(apply_bitflags(&mut data, 0, [false, false]), 0);
        assert_eq!(apply_bitflags(&mut data, 0, [true, false]), 1);
        let depth = data.numeric("depth").unwrap();
        assert!(depth[0].is_nan());
        assert_eq!(depth[1], 200.0);
    }

    #[test]
    fn test_flagged_positions_remove_records() {
        let mut data = dataset(
            &["lat", "lon", "depth"],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]],
        );
        data.flags[0] = Some(vec![0, field_bit(field::LON), field_bit(field::DEPTH)]);

        assert_eq!(apply_dataset_flags(&mut data, [true, true]), 1);
        assert_eq!(data.n_records(), 2);
        assert_eq!(data.numeric("lat").unwrap(), &[1.0, 3.0]);
        assert!(data.numeric("depth").unwrap()[1].is_nan());
    }

    #[test]
    fn test_pdr_unwrap() {
        let mut twt = vec![9.5, 9.9, 0.3, f64::NAN, 0.8, 9.6];
        unwrap_pdr(&mut twt, 10.0);
        let expected = [9.5, 9.9, 10.3, f64::NAN, 10.8, 9.6];
        for (got, want) in twt.iter().zip(expected) {
            if want.is_nan() {
                assert!(got.is_nan());
            } else {
                assert!((got - want).abs() < 1e-12, "{} vs {}", got, want);
            }
        }
    }

    #[test]
    fn test_plan_requirements() {
        let mut data = dataset(&["depth", "faa"], vec![vec![1.0], vec![2.0]]);
        let depth = data.header.find("depth").unwrap();
        let faa = data.header.find("faa").unwrap();
        data.header.descriptor_mut(depth).adjust = Adjust::CarterDepth;
        data.header.descriptor_mut(faa).adjust = Adjust::FaaEotIgf1980;

        let plan = CorrectionPlan::build(&selection_of(&data), &data.header);
        assert_eq!(plan.corrections.len(), 2);
        assert_eq!(
            plan.needed,
            vec![field::LAT, field::LON, field::TWT, field::GOBS, field::EOT]
        );
    }

    #[test]
    fn test_zero_wrap_period_skips_unwrap() {
        let mut data = dataset(&["twt"], vec![vec![9.9, 0.1]]);
        let twt = data.header.find("twt").unwrap();
        data.header.descriptor_mut(twt).adjust = Adjust::TwtUnwrap;

        let plan = CorrectionPlan::build(&selection_of(&data), &data.header);
        assert!(plan.is_empty());

        data.header.pdr_wrap = 10.0;
        let plan = CorrectionPlan::build(&selection_of(&data), &data.header);
        plan.apply(&mut data, &GeoModels::default(), &mut no_fetch).unwrap();
        let values = data.numeric("twt").unwrap();
        assert!((values[1] - 10.1).abs() < 1e-12);
    }

    #[test]
    fn test_faa_recompute_fetches_missing_auxiliaries() {
        let mut data = dataset(&["faa"], vec![vec![0.0, f64::NAN]]);
        let faa = data.header.find("faa").unwrap();
        data.header.descriptor_mut(faa).adjust = Adjust::FaaIgf1980;

        let plan = CorrectionPlan::build(&selection_of(&data), &data.header);
        let mut fetched = Vec::new();
        plan.apply(&mut data, &GeoModels::default(), &mut |id| {
            fetched.push(id);
            Ok(match id {
                field::LAT => vec![0.0, 0.0],
                _ => vec![978_100.0, 978_100.0],
            })
        })
        .unwrap();

        assert_eq!(fetched, vec![field::LAT, field::GOBS]);
        let values = data.numeric("faa").unwrap();
        assert!((values[0] - (978_100.0 - 978_032.677_14)).abs() < 1e-6);
        assert!(values[1].is_nan());
    }

    #[test]
    fn test_depth_without_table_is_nan() {
        let mut data = dataset(
            &["lat", "lon", "twt", "depth"],
            vec![vec![10.0], vec![20.0], vec![4.0], vec![3000.0]],
        );
        let depth = data.header.find("depth").unwrap();
        data.header.descriptor_mut(depth).adjust = Adjust::CarterDepth;

        let plan = CorrectionPlan::build(&selection_of(&data), &data.header);
        plan.apply(&mut data, &GeoModels::default(), &mut no_fetch).unwrap();
        assert!(data.numeric("depth").unwrap()[0].is_nan());
    }

    struct FlatDepth;

    impl crate::app::services::geomodels::DepthTable for FlatDepth {
        fn depth_from_twt(&self, _lon: f64, _lat: f64, twt_ms: f64) -> f64 {
            0.75 * twt_ms
        }
    }

    #[test]
    fn test_depth_uses_milliseconds() {
        let mut data = dataset(
            &["lat", "lon", "twt", "depth"],
            vec![vec![10.0], vec![20.0], vec![4.0], vec![1.0]],
        );
        let depth = data.header.find("depth").unwrap();
        data.header.descriptor_mut(depth).adjust = Adjust::CarterDepth;

        let plan = CorrectionPlan::build(&selection_of(&data), &data.header);
        let models = GeoModels::default().with_depth_table(FlatDepth);
        plan.apply(&mut data, &models, &mut no_fetch).unwrap();
        assert_eq!(data.numeric("depth").unwrap()[0], 3000.0);
    }
}
