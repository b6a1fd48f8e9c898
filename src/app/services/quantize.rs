//! Quantization codec
//!
//! Maps physical values to scaled storage values and back. Integer storage
//! types round half-to-even; anything outside the type's range becomes the
//! type's sentinel and is counted as an overflow.

use crate::app::models::StorageType;
use crate::{Error, Result};

/// Result of quantizing a column
#[derive(Debug, Clone, PartialEq)]
pub struct Packed {
    /// Stored values (integral for integer storage types)
    pub values: Vec<f64>,
    /// Number of values that did not fit the storage type
    pub overflow: usize,
}

fn check_scale(scale: f64) -> Result<()> {
    if scale == 0.0 || !scale.is_finite() {
        return Err(Error::bad_argument(format!(
            "quantization scale must be finite and non-zero, got {}",
            scale
        )));
    }
    Ok(())
}

/// Quantize one value, returning the stored value and whether it overflowed
fn encode_one(value: f64, scale: f64, offset: f64, storage: StorageType) -> (f64, bool) {
    if value.is_nan() {
        return (storage.sentinel(), false);
    }
    let mut stored = (value - offset) / scale;
    if storage.is_integer() {
        stored = stored.round_ties_even();
    }
    if stored < storage.low() || stored > storage.high() || stored.is_nan() {
        (storage.sentinel(), true)
    } else {
        (stored, false)
    }
}

/// Quantize physical values for storage
pub fn encode(values: &[f64], scale: f64, offset: f64, storage: StorageType) -> Result<Packed> {
    check_scale(scale)?;
    let mut overflow = 0;
    let values = values
        .iter()
        .map(|&v| {
            let (stored, over) = encode_one(v, scale, offset, storage);
            overflow += usize::from(over);
            stored
        })
        .collect();
    Ok(Packed { values, overflow })
}

/// Recover physical values from stored values
///
/// Stored sentinels (and NaN for floating types) decode to NaN.
pub fn decode(packed: &[f64], scale: f64, offset: f64, storage: StorageType) -> Result<Vec<f64>> {
    check_scale(scale)?;
    let sentinel = storage.sentinel();
    Ok(packed
        .iter()
        .map(|&p| {
            if p.is_nan() || (storage.is_integer() && p == sentinel) {
                f64::NAN
            } else {
                p * scale + offset
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_within_one_unit() {
        let values = [5.12345, -33.9, 0.0, 179.99999];
        let packed = encode(&values, 1.0e-7, 0.0, StorageType::Int).unwrap();
        assert_eq!(packed.overflow, 0);
        let back = decode(&packed.values, 1.0e-7, 0.0, StorageType::Int).unwrap();
        for (a, b) in values.iter().zip(&back) {
            assert!((a - b).abs() <= 1.0e-7, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_nan_maps_to_sentinel() {
        let packed = encode(&[f64::NAN], 0.1, 0.0, StorageType::Short).unwrap();
        assert_eq!(packed.values, vec![-32768.0]);
        assert_eq!(packed.overflow, 0);
        let back = decode(&packed.values, 0.1, 0.0, StorageType::Short).unwrap();
        assert!(back[0].is_nan());
    }

    #[test]
    fn test_overflow_counts_once_per_value() {
        let packed = encode(&[1.0e6, 1.0, -1.0e6], 0.1, 0.0, StorageType::Short).unwrap();
        assert_eq!(packed.overflow, 2);
        assert_eq!(packed.values[0], StorageType::Short.sentinel());
        assert_eq!(packed.values[1], 10.0);
        assert_eq!(packed.values[2], StorageType::Short.sentinel());
    }

    #[test]
    fn test_offset_applies() {
        let packed = encode(&[980123.45678], 1.0e-5, 980000.0, StorageType::Int).unwrap();
        assert_eq!(packed.values[0], 12345678.0);
        let back = decode(&packed.values, 1.0e-5, 980000.0, StorageType::Int).unwrap();
        assert!((back[0] - 980123.45678).abs() < 1.0e-5);
    }

    #[test]
    fn test_half_to_even() {
        let packed = encode(&[0.5, 1.5, 2.5], 1.0, 0.0, StorageType::Byte).unwrap();
        assert_eq!(packed.values, vec![0.0, 2.0, 2.0]);
    }

    #[test]
    fn test_double_storage_is_exact() {
        let packed = encode(&[1.0e300, f64::NAN], 1.0, 0.0, StorageType::Double).unwrap();
        assert_eq!(packed.overflow, 0);
        assert_eq!(packed.values[0], 1.0e300);
        assert!(packed.values[1].is_nan());
    }

    #[test]
    fn test_zero_scale_is_rejected() {
        match encode(&[1.0], 0.0, 0.0, StorageType::Int).unwrap_err() {
            Error::BadArgument { .. } => {}
            _ => panic!("Expected BadArgument error"),
        }
        assert!(decode(&[1.0], 0.0, 0.0, StorageType::Int).is_err());
    }
}
