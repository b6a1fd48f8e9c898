//! Auxiliary quantities derived along a track
//!
//! Correction terms may refer to values that are not stored columns:
//! along-track distance, heading and speed, calendar parts of the record
//! time, reference-model outputs and a few constants.

use crate::app::models::calendar::{time_to_fyear, unix_to_civil};
use crate::app::services::geomodels::{GeoModels, GravityFormula};
use crate::{Error, Result};

/// Mean Earth radius in km
const EARTH_RADIUS_KM: f64 = 6371.008_771_4;

/// Sound speed behind uncorrected depths, in m/s
const NOMINAL_SOUND_SPEED: f64 = 1500.0;

/// Record type reported for every record
const DEFAULT_RECORD_TYPE: f64 = 5.0;

/// A derived quantity usable in correction terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuxField {
    /// Cumulative along-track distance (km)
    Dist,
    /// Heading (degrees clockwise from north)
    Azim,
    /// Speed over ground (m/s)
    Vel,
    Year,
    Month,
    Day,
    Hour,
    /// Whole minutes
    Min,
    /// Decimal minutes
    Dmin,
    Sec,
    /// yyyymmdd
    Date,
    /// 100 * hour + decimal minutes
    Hhmm,
    Weight,
    Drt,
    /// Reference field total intensity
    Igrf,
    /// Table depth minus the 1500 m/s depth
    Carter,
    /// Normal gravity
    Ngrav,
    /// Survey identifier as a number
    Ngdcid,
}

impl AuxField {
    pub const ALL: [AuxField; 18] = [
        Self::Dist,
        Self::Azim,
        Self::Vel,
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Hour,
        Self::Min,
        Self::Dmin,
        Self::Sec,
        Self::Date,
        Self::Hhmm,
        Self::Weight,
        Self::Drt,
        Self::Igrf,
        Self::Carter,
        Self::Ngrav,
        Self::Ngdcid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Dist => "dist",
            Self::Azim => "azim",
            Self::Vel => "vel",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Min => "min",
            Self::Dmin => "dmin",
            Self::Sec => "sec",
            Self::Date => "date",
            Self::Hhmm => "hhmm",
            Self::Weight => "weight",
            Self::Drt => "drt",
            Self::Igrf => "igrf",
            Self::Carter => "carter",
            Self::Ngrav => "ngrav",
            Self::Ngdcid => "ngdcid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Index into an [`AuxRecord`]
    pub fn index(self) -> usize {
        self as usize
    }

    fn needs_time(self) -> bool {
        matches!(
            self,
            Self::Vel
                | Self::Year
                | Self::Month
                | Self::Day
                | Self::Hour
                | Self::Min
                | Self::Dmin
                | Self::Sec
                | Self::Date
                | Self::Hhmm
                | Self::Igrf
        )
    }
}

/// Auxiliary values of one record, indexed by [`AuxField::index`]
pub type AuxRecord = [f64; 18];

/// Inputs the auxiliary quantities are derived from
#[derive(Debug, Clone, Copy)]
pub struct Track<'a> {
    pub time: &'a [f64],
    pub lon: &'a [f64],
    pub lat: &'a [f64],
    pub twt: &'a [f64],
    pub survey_id: &'a str,
    pub formula: GravityFormula,
    pub weight: f64,
}

/// Great-circle distance in km between two positions in degrees
pub fn distance_km(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> f64 {
    let (phi0, phi1) = (lat0.to_radians(), lat1.to_radians());
    let dphi = phi1 - phi0;
    let dlambda = (lon1 - lon0).to_radians();
    let a = (0.5 * dphi).sin().powi(2) + phi0.cos() * phi1.cos() * (0.5 * dlambda).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Initial heading in degrees from the first position to the second
pub fn azimuth(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> f64 {
    let (phi0, phi1) = (lat0.to_radians(), lat1.to_radians());
    let dlambda = (lon1 - lon0).to_radians();
    let y = dlambda.sin() * phi1.cos();
    let x = phi0.cos() * phi1.sin() - phi0.sin() * phi1.cos() * dlambda.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Auxiliary values for every record of a track
#[derive(Debug, Clone, PartialEq)]
pub struct AuxColumns {
    records: Vec<AuxRecord>,
}

impl AuxColumns {
    /// Derive the requested fields; unrequested entries stay NaN
    pub fn compute(fields: &[AuxField], track: &Track, models: &GeoModels) -> Result<Self> {
        let n = track.lon.len();
        if track.lat.len() != n || track.time.len() != n || track.twt.len() != n {
            return Err(Error::bad_argument("auxiliary inputs differ in length"));
        }
        let wants = |f: AuxField| fields.contains(&f);
        let mut records = vec![[f64::NAN; 18]; n];

        if wants(AuxField::Dist) || wants(AuxField::Azim) || wants(AuxField::Vel) {
            along_track(&mut records, track);
        }

        let ngdcid = track.survey_id.trim().parse::<f64>().unwrap_or(f64::NAN);
        let need_time = fields.iter().any(|f| f.needs_time());
        for (rec, aux) in records.iter_mut().enumerate() {
            let (lon, lat, time) = (track.lon[rec], track.lat[rec], track.time[rec]);
            aux[AuxField::Weight.index()] = track.weight;
            aux[AuxField::Drt.index()] = DEFAULT_RECORD_TYPE;
            aux[AuxField::Ngdcid.index()] = ngdcid;

            if need_time {
                if let Some(civil) = unix_to_civil(time) {
                    let minute = civil.minute.floor();
                    aux[AuxField::Year.index()] = civil.year;
                    aux[AuxField::Month.index()] = civil.month;
                    aux[AuxField::Day.index()] = civil.day;
                    aux[AuxField::Hour.index()] = civil.hour;
                    aux[AuxField::Min.index()] = minute;
                    aux[AuxField::Sec.index()] = 60.0 * (civil.minute - minute);
                    aux[AuxField::Dmin.index()] = civil.minute;
                    aux[AuxField::Hhmm.index()] = 100.0 * civil.hour + civil.minute;
                    aux[AuxField::Date.index()] = 10000.0 * civil.year + 100.0 * civil.month + civil.day;
                }
            }
            if wants(AuxField::Igrf) {
                aux[AuxField::Igrf.index()] = models.field.total_field(time_to_fyear(time), lon, lat)?;
            }
            if wants(AuxField::Carter) {
                let twt = track.twt[rec];
                let table = models.depth.depth_from_twt(lon, lat, 1000.0 * twt);
                aux[AuxField::Carter.index()] = table - 0.5 * NOMINAL_SOUND_SPEED * twt;
            }
            if wants(AuxField::Ngrav) {
                aux[AuxField::Ngrav.index()] = track.formula.normal_gravity(lon, lat);
            }
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, rec: usize) -> &AuxRecord {
        &self.records[rec]
    }
}

/// Fill distance, heading and speed
///
/// Records without a position get NaN and are skipped when measuring the
/// next leg. The first record takes the heading and speed of the first leg.
fn along_track(records: &mut [AuxRecord], track: &Track) {
    let n = records.len();
    let valid = |rec: usize| !(track.lon[rec].is_nan() || track.lat[rec].is_nan());
    let leg = |a: usize, b: usize| {
        (
            distance_km(track.lon[a], track.lat[a], track.lon[b], track.lat[b]),
            azimuth(track.lon[a], track.lat[a], track.lon[b], track.lat[b]),
        )
    };
    let speed = |ds: f64, a: usize, b: usize| {
        let dt = track.time[b] - track.time[a];
        if dt.is_nan() || dt == 0.0 {
            f64::NAN
        } else {
            1000.0 * ds / dt
        }
    };

    let mut cumulative = 0.0;
    let mut previous: Option<usize> = None;
    for rec in 0..n {
        let aux = &mut records[rec];
        if rec == 0 {
            aux[AuxField::Dist.index()] = 0.0;
            if n > 1 {
                let (ds, az) = leg(0, 1);
                aux[AuxField::Azim.index()] = az;
                aux[AuxField::Vel.index()] = speed(ds, 0, 1);
            }
        } else if let (true, Some(prev)) = (valid(rec), previous) {
            let (ds, az) = leg(prev, rec);
            cumulative += ds;
            aux[AuxField::Dist.index()] = cumulative;
            aux[AuxField::Azim.index()] = az;
            aux[AuxField::Vel.index()] = speed(ds, prev, rec);
        }
        if valid(rec) {
            previous = Some(rec);
        }
    }
}
