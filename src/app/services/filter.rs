//! Record predicate filter
//!
//! Decides whether a record is output, based on the exact columns, value
//! constraints and bitflag tests collected by the column selector.

use crate::app::models::{ColumnData, ColumnSet, Dataset};
use std::cmp::Ordering;

/// Comparison applied by a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    /// Any common bit set
    Bit,
}

impl TestOp {
    /// Compare a numeric value against a limit
    ///
    /// Ordering tests fail when either side is NaN. Two NaNs are equal; a
    /// single NaN is unequal to anything.
    pub fn evaluate(self, value: f64, limit: f64) -> bool {
        match self {
            Self::Eq => value == limit || (value.is_nan() && limit.is_nan()),
            Self::Ne => match (value.is_nan(), limit.is_nan()) {
                (true, true) => false,
                (false, false) => value != limit,
                _ => true,
            },
            Self::Lt => value < limit,
            Self::Le => value <= limit,
            Self::Ge => value >= limit,
            Self::Gt => value > limit,
            Self::Bit => {
                if value.is_nan() || limit.is_nan() {
                    return false;
                }
                (value.round_ties_even() as u32) & (limit.round_ties_even() as u32) != 0
            }
        }
    }

    /// Compare the first `width` characters of a text value against a limit
    pub fn evaluate_text(self, value: &str, limit: &str, width: usize) -> bool {
        let order = compare_prefix(value, limit, width);
        match self {
            Self::Lt => order == Ordering::Less,
            Self::Le => order != Ordering::Greater,
            Self::Eq => order == Ordering::Equal,
            Self::Ne => order != Ordering::Equal,
            Self::Ge => order != Ordering::Less,
            Self::Gt => order == Ordering::Greater,
            Self::Bit => false,
        }
    }
}

fn compare_prefix(a: &str, b: &str, width: usize) -> Ordering {
    let prefix = |s: &str| s.bytes().take(width).take_while(|&c| c != 0).collect::<Vec<u8>>();
    prefix(a).cmp(&prefix(b))
}

/// Constraint limit, typed by the column it applies to
#[derive(Debug, Clone, PartialEq)]
pub enum Limit {
    Number(f64),
    Text(String),
}

/// A value constraint on an output column
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    /// Output column index, bound when the selection is resolved
    pub col: Option<usize>,
    pub code: TestOp,
    pub limit: Limit,
    /// Record fails outright when this constraint fails
    pub exact: bool,
}

/// An output column that must not be NaN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatch {
    pub name: String,
    pub col: Option<usize>,
}

/// A required state of one bitflag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitTest {
    pub name: String,
    pub set: ColumnSet,
    /// Flag bit tested within the set's flag word
    pub bit: u32,
    /// True when the flag must be set
    pub expect: bool,
}

/// One value of a record, borrowed from a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Number(f64),
    Text(&'a str, usize),
}

/// Values of record `rec` in output column order
pub fn row(dataset: &Dataset, rec: usize) -> Vec<Cell<'_>> {
    dataset
        .values
        .iter()
        .enumerate()
        .map(|(col, data)| match data {
            ColumnData::Numeric(v) => Cell::Number(v[rec]),
            ColumnData::Text(v) => Cell::Text(&v[rec], dataset.descriptor(col).text),
        })
        .collect()
}

/// Flag words of record `rec`, zero where a set carries no flags
pub fn row_flags(dataset: &Dataset, rec: usize) -> [u32; 2] {
    [0, 1].map(|set| {
        dataset.flags[set]
            .as_ref()
            .and_then(|f| f.get(rec).copied())
            .unwrap_or(0)
    })
}

/// All tests a record must pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub constraints: Vec<Constraint>,
    pub exact: Vec<ExactMatch>,
    pub bit_tests: Vec<BitTest>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.exact.is_empty() && self.bit_tests.is_empty()
    }

    fn passes(constraint: &Constraint, cell: Option<&Cell>) -> bool {
        match (cell, &constraint.limit) {
            (Some(Cell::Number(v)), Limit::Number(limit)) => constraint.code.evaluate(*v, *limit),
            (Some(Cell::Text(v, width)), Limit::Text(limit)) => {
                constraint.code.evaluate_text(v, limit, *width)
            }
            _ => false,
        }
    }

    /// True when the record passes every registered test
    ///
    /// Any exact column holding NaN rejects the record. Constraints marked
    /// exact must all pass and at least one constraint must pass. Every bit
    /// test must see its flag in the expected state.
    pub fn accepts(&self, row: &[Cell], flags: [u32; 2]) -> bool {
        if self.is_empty() {
            return true;
        }

        for exact in &self.exact {
            if let Some(Cell::Number(v)) = exact.col.and_then(|c| row.get(c)) {
                if v.is_nan() {
                    return false;
                }
            }
        }

        if !self.constraints.is_empty() {
            let mut n_passed = 0;
            for constraint in &self.constraints {
                let cell = constraint.col.and_then(|c| row.get(c));
                if Self::passes(constraint, cell) {
                    n_passed += 1;
                } else if constraint.exact {
                    return false;
                }
            }
            if n_passed == 0 {
                return false;
            }
        }

        self.bit_tests
            .iter()
            .all(|test| (flags[test.set.index()] & test.bit != 0) == test.expect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(col: usize, code: TestOp, limit: f64, exact: bool) -> Constraint {
        Constraint {
            name: format!("c{}", col),
            col: Some(col),
            code,
            limit: Limit::Number(limit),
            exact,
        }
    }

    #[test]
    fn test_nan_semantics() {
        let nan = f64::NAN;
        assert!(TestOp::Eq.evaluate(nan, nan));
        assert!(!TestOp::Eq.evaluate(nan, 1.0));
        assert!(!TestOp::Ne.evaluate(nan, nan));
        assert!(TestOp::Ne.evaluate(nan, 1.0));
        assert!(TestOp::Ne.evaluate(1.0, nan));
        for op in [TestOp::Lt, TestOp::Le, TestOp::Ge, TestOp::Gt, TestOp::Bit] {
            assert!(!op.evaluate(nan, 1.0), "{:?}", op);
            assert!(!op.evaluate(1.0, nan), "{:?}", op);
        }
    }

    #[test]
    fn test_ordering_and_bits() {
        assert!(TestOp::Lt.evaluate(1.0, 2.0));
        assert!(TestOp::Le.evaluate(2.0, 2.0));
        assert!(TestOp::Ge.evaluate(2.0, 2.0));
        assert!(!TestOp::Gt.evaluate(2.0, 2.0));
        assert!(TestOp::Bit.evaluate(6.0, 2.0));
        assert!(!TestOp::Bit.evaluate(4.0, 2.0));
        assert!(TestOp::Bit.evaluate(2.6, 1.0));
    }

    #[test]
    fn test_text_prefix_comparison() {
        assert!(TestOp::Eq.evaluate_text("01010083", "0101", 4));
        assert!(!TestOp::Eq.evaluate_text("01010083", "0101", 8));
        assert!(TestOp::Lt.evaluate_text("0101", "01010083", 8));
        assert!(TestOp::Gt.evaluate_text("L12", "K99", 3));
        assert!(!TestOp::Bit.evaluate_text("1", "1", 1));
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = RecordFilter::default();
        assert!(filter.accepts(&[Cell::Number(f64::NAN)], [0, 0]));
    }

    #[test]
    fn test_exact_column_rejects_nan() {
        let filter = RecordFilter {
            exact: vec![ExactMatch {
                name: "depth".into(),
                col: Some(1),
            }],
            ..Default::default()
        };
        assert!(filter.accepts(&[Cell::Number(f64::NAN), Cell::Number(10.0)], [0, 0]));
        assert!(!filter.accepts(&[Cell::Number(1.0), Cell::Number(f64::NAN)], [0, 0]));
    }

    #[test]
    fn test_any_constraint_passes_unless_exact_fails() {
        let filter = RecordFilter {
            constraints: vec![
                constraint(0, TestOp::Gt, 10.0, false),
                constraint(1, TestOp::Lt, 0.0, false),
            ],
            ..Default::default()
        };
        assert!(filter.accepts(&[Cell::Number(11.0), Cell::Number(5.0)], [0, 0]));
        assert!(filter.accepts(&[Cell::Number(1.0), Cell::Number(-5.0)], [0, 0]));
        assert!(!filter.accepts(&[Cell::Number(1.0), Cell::Number(5.0)], [0, 0]));

        let strict = RecordFilter {
            constraints: vec![
                constraint(0, TestOp::Gt, 10.0, true),
                constraint(1, TestOp::Lt, 0.0, false),
            ],
            ..Default::default()
        };
        assert!(!strict.accepts(&[Cell::Number(1.0), Cell::Number(-5.0)], [0, 0]));
    }

    #[test]
    fn test_bit_tests_follow_constraints() {
        let filter = RecordFilter {
            constraints: vec![constraint(0, TestOp::Gt, 0.0, false)],
            bit_tests: vec![BitTest {
                name: "depth".into(),
                set: ColumnSet::Standard,
                bit: 1 << 11,
                expect: false,
            }],
            ..Default::default()
        };
        assert!(filter.accepts(&[Cell::Number(1.0)], [0, 0]));
        assert!(!filter.accepts(&[Cell::Number(1.0)], [1 << 11, 0]));
    }

    #[test]
    fn test_text_constraint() {
        let filter = RecordFilter {
            constraints: vec![Constraint {
                name: "sln".into(),
                col: Some(0),
                code: TestOp::Eq,
                limit: Limit::Text("L12".into()),
                exact: false,
            }],
            ..Default::default()
        };
        assert!(filter.accepts(&[Cell::Text("L12", 5)], [0, 0]));
        assert!(!filter.accepts(&[Cell::Text("L13", 5)], [0, 0]));
    }
}
