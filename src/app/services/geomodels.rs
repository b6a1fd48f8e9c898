//! Reference models consumed by the correction machinery
//!
//! The magnetic reference field and the Carter sound-velocity tables are
//! external collaborators: callers plug in an implementation through the
//! [`ReferenceField`] and [`DepthTable`] traits. Without one, recomputed
//! values come out as NaN. Normal gravity is closed-form and built in.

use crate::Result;

const D2R: f64 = std::f64::consts::PI / 180.0;

/// Theoretical gravity formula, numbered as in the MGD77 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityFormula {
    /// Heiskanen 1924
    Heiskanen1924 = 1,
    /// International 1930
    Igf1930 = 2,
    /// IAG 1967
    Iag1967 = 3,
    /// IAG 1980
    Iag1980 = 4,
}

impl GravityFormula {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Heiskanen1924),
            2 => Some(Self::Igf1930),
            3 => Some(Self::Iag1967),
            4 => Some(Self::Iag1980),
            _ => None,
        }
    }

    /// Normal gravity in mGal at a position
    ///
    /// Longitude only matters for Heiskanen 1924.
    pub fn normal_gravity(self, lon: f64, lat: f64) -> f64 {
        let lat = lat * D2R;
        let slat2 = lat.sin().powi(2);
        let s2lat2 = (2.0 * lat).sin().powi(2);
        match self {
            Self::Heiskanen1924 => {
                let clon2 = ((lon - 18.0) * D2R).cos().powi(2);
                let clat2 = 1.0 - slat2;
                978_052.0 * (1.0 + 0.005285 * slat2 - 0.000_007_0 * s2lat2 + 0.000_027 * clat2 * clon2)
            }
            Self::Igf1930 => 978_049.0 * (1.0 + 0.005_288_4 * slat2 - 0.000_005_9 * s2lat2),
            Self::Iag1967 => 978_031.846 * (1.0 + 0.005_302_4 * slat2 - 0.000_005_8 * s2lat2),
            Self::Iag1980 => {
                978_032.677_14 * (1.0 + 0.001_931_851_386_39 * slat2)
                    / (1.0 - 0.006_694_379_990_13 * slat2).sqrt()
            }
        }
    }
}

/// Main-field magnetic reference model
pub trait ReferenceField {
    /// Total field intensity in nT for a decimal year and position
    ///
    /// Implementations report dates outside their model span as
    /// [`crate::Error::BadIgrfDate`].
    fn total_field(&self, year: f64, lon: f64, lat: f64) -> Result<f64>;
}

/// Travel-time to depth conversion table
pub trait DepthTable {
    /// Corrected depth in metres for a two-way travel time in milliseconds
    fn depth_from_twt(&self, lon: f64, lat: f64, twt_ms: f64) -> f64;
}

/// Stand-in for a model that is not installed
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl ReferenceField for Unavailable {
    fn total_field(&self, _year: f64, _lon: f64, _lat: f64) -> Result<f64> {
        Ok(f64::NAN)
    }
}

impl DepthTable for Unavailable {
    fn depth_from_twt(&self, _lon: f64, _lat: f64, _twt_ms: f64) -> f64 {
        f64::NAN
    }
}

/// The external models available to a session
pub struct GeoModels {
    pub field: Box<dyn ReferenceField>,
    pub depth: Box<dyn DepthTable>,
}

impl Default for GeoModels {
    fn default() -> Self {
        Self {
            field: Box::new(Unavailable),
            depth: Box::new(Unavailable),
        }
    }
}

impl std::fmt::Debug for GeoModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoModels").finish_non_exhaustive()
    }
}

impl GeoModels {
    pub fn with_reference_field(mut self, field: impl ReferenceField + 'static) -> Self {
        self.field = Box::new(field);
        self
    }

    pub fn with_depth_table(mut self, depth: impl DepthTable + 'static) -> Self {
        self.depth = Box::new(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_and_pole() {
        let g = GravityFormula::Iag1980;
        assert!((g.normal_gravity(0.0, 0.0) - 978_032.677_14).abs() < 1e-6);
        assert!((g.normal_gravity(0.0, 90.0) - 983_218.636_85).abs() < 0.01);
        assert!((GravityFormula::Igf1930.normal_gravity(0.0, 0.0) - 978_049.0).abs() < 1e-9);
    }

    #[test]
    fn test_formulas_agree_within_fifty_mgal() {
        for lat in [-60.0, -10.0, 0.0, 33.3, 80.0] {
            let reference = GravityFormula::Iag1980.normal_gravity(0.0, lat);
            for code in 1..=3 {
                let g = GravityFormula::from_code(code).unwrap().normal_gravity(18.0, lat);
                assert!((g - reference).abs() < 50.0, "code {} lat {}", code, lat);
            }
        }
    }

    #[test]
    fn test_heiskanen_depends_on_longitude() {
        let g = GravityFormula::Heiskanen1924;
        assert!(g.normal_gravity(18.0, 10.0) > g.normal_gravity(108.0, 10.0));
        assert_eq!(GravityFormula::Iag1967.normal_gravity(18.0, 10.0), GravityFormula::Iag1967.normal_gravity(108.0, 10.0));
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(GravityFormula::from_code(0), None);
        assert_eq!(GravityFormula::from_code(5), None);
    }

    #[test]
    fn test_unavailable_models() {
        let models = GeoModels::default();
        assert!(models.field.total_field(1990.0, 0.0, 0.0).unwrap().is_nan());
        assert!(models.depth.depth_from_twt(0.0, 0.0, 1000.0).is_nan());
    }
}
