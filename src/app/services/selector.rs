//! Column selector
//!
//! Parses a column selection of the form
//!
//! ```text
//! [col,...][colOPval,...][:+col,-col,...]
//! ```
//!
//! into output columns, value constraints and bitflag tests, and binds
//! them to a header. `OP` is one of `=`, `!=`, `<`, `<=`, `>`, `>=` or `|`.
//! A name written in upper case must be present (not NaN) for a record to
//! be output; an upper-case constraint must hold. A colon followed by
//! nothing turns bitflag use off.

use super::bitflags::flag_bit;
use super::filter::{BitTest, Constraint, ExactMatch, Limit, RecordFilter, TestOp};
use crate::app::models::{ColumnRef, ColumnSet, Header};
use crate::{Error, Result};
use tracing::warn;

/// Names accepted for the time column
const TIME_ALIASES: [&str; 3] = ["atime", "rtime", "ytime"];

/// Characters that may follow the operator before the value starts
const OPERATOR_TAIL: &[char] = &['>', '<', '=', '!'];

/// A parsed (and possibly resolved) column selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Desired output columns, empty for "all present columns"
    pub names: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub exact: Vec<ExactMatch>,
    /// Bit tests by name, bound to sets and bits on resolve
    pub bit_names: Vec<(String, bool)>,
    pub bit_tests: Vec<BitTest>,
    /// An empty bit-test list after the colon switched flags off
    pub flags_disabled: bool,
    /// Output columns once resolved
    pub order: Vec<ColumnRef>,
}

/// Split `word` at its first comparison operator
fn split_constraint(word: &str) -> Option<(&str, TestOp, &str)> {
    let bytes = word.as_bytes();
    let (at, code) = bytes.iter().enumerate().find_map(|(k, &c)| {
        let next = bytes.get(k + 1).copied();
        let code = match c {
            b'>' if next == Some(b'=') => TestOp::Ge,
            b'>' => TestOp::Gt,
            b'<' if next == Some(b'=') => TestOp::Le,
            b'<' => TestOp::Lt,
            b'=' => TestOp::Eq,
            b'|' => TestOp::Bit,
            b'!' if next == Some(b'=') => TestOp::Ne,
            _ => return None,
        };
        Some((k, code))
    })?;
    let value = word[at + 1..].trim_start_matches(OPERATOR_TAIL);
    Some((&word[..at], code, value))
}

/// Lower-case a name, reporting whether it was written fully in upper case
fn normalize(word: &str) -> (String, bool) {
    let exact = !word.is_empty() && word.chars().all(|c| c.is_ascii_uppercase());
    let mut name = word.to_ascii_lowercase();
    if TIME_ALIASES.contains(&name.as_str()) {
        name = "time".to_string();
    }
    (name, exact)
}

impl Selection {
    /// Select every present column
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a selection argument
    pub fn parse(arg: &str) -> Result<Self> {
        let mut selection = Self::default();
        let (columns, bits) = match arg.split_once(':') {
            Some((columns, bits)) => {
                selection.flags_disabled = bits.is_empty();
                (columns, bits)
            }
            None => (arg, ""),
        };

        for word in columns.split(',').filter(|w| !w.is_empty()) {
            match split_constraint(word) {
                Some((name, code, value)) => {
                    let (name, exact) = normalize(name);
                    selection.constraints.push(Constraint {
                        name,
                        col: None,
                        code,
                        limit: Limit::Text(value.to_string()),
                        exact,
                    });
                }
                None => {
                    let (name, exact) = normalize(word);
                    if selection.names.contains(&name) {
                        warn!("Column {} given more than once", name);
                    }
                    if exact {
                        selection.exact.push(ExactMatch {
                            name: name.clone(),
                            col: None,
                        });
                    }
                    selection.names.push(name);
                }
            }
        }

        for word in bits.split(',').filter(|w| !w.is_empty()) {
            let expect = match word.as_bytes()[0] {
                b'+' => true,
                b'-' => false,
                _ => {
                    return Err(Error::bad_argument(format!(
                        "bit-test flag ({}) is not in +<col> or -<col> format",
                        word
                    )));
                }
            };
            selection.bit_names.push((word[1..].to_string(), expect));
        }

        Ok(selection)
    }

    fn output_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::no_such_column(name))
    }

    /// Bind the selection to a header
    ///
    /// Assigns output positions to the selected descriptors and binds
    /// constraints, exact columns and bit tests to them. Every name must
    /// refer to a present, selected column.
    pub fn resolve(&mut self, header: &mut Header) -> Result<()> {
        if self.names.is_empty() {
            self.names = header
                .present_columns()
                .into_iter()
                .map(|c| header.descriptor(c).abbrev.clone())
                .collect();
        }

        self.order = self
            .names
            .iter()
            .map(|name| {
                header
                    .find(name)
                    .filter(|&c| header.descriptor(c).present)
                    .ok_or_else(|| Error::no_such_column(name.as_str()))
            })
            .collect::<Result<_>>()?;

        for set in ColumnSet::ALL {
            for column in &mut header.info[set.index()].columns {
                column.pos = None;
            }
        }
        for (pos, &col) in self.order.iter().enumerate() {
            header.descriptor_mut(col).pos = Some(pos);
        }

        for i in 0..self.exact.len() {
            self.exact[i].col = Some(self.output_index(&self.exact[i].name)?);
        }

        for i in 0..self.constraints.len() {
            let col = self.output_index(&self.constraints[i].name)?;
            let column = header.descriptor(self.order[col]);
            let constraint = &mut self.constraints[i];
            constraint.col = Some(col);
            if !column.is_text() {
                let raw = match &constraint.limit {
                    Limit::Text(raw) => raw.clone(),
                    Limit::Number(_) => continue,
                };
                let value = if raw == "NaN" {
                    f64::NAN
                } else {
                    raw.trim().parse().map_err(|_| {
                        Error::bad_argument(format!(
                            "constraint value '{}' for {} is not a number",
                            raw, constraint.name
                        ))
                    })?
                };
                constraint.limit = Limit::Number(value);
            }
        }

        self.bit_tests = self
            .bit_names
            .iter()
            .map(|(name, expect)| {
                let col = self.output_index(name)?;
                let cref = self.order[col];
                Ok(BitTest {
                    name: name.clone(),
                    set: cref.set,
                    bit: flag_bit(header, cref),
                    expect: *expect,
                })
            })
            .collect::<Result<_>>()?;

        Ok(())
    }

    /// The record tests of a resolved selection
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            constraints: self.constraints.clone(),
            exact: self.exact.clone(),
            bit_tests: self.bit_tests.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{ColumnDescriptor, StorageType};
    use crate::app::services::catalog::plain_header;
    use crate::constants::{field, field_bit};

    fn header_with_extra() -> Header {
        let mut header = plain_header(false);
        header.info[1].columns.push(ColumnDescriptor::extra("grav", StorageType::Float));
        header
    }

    #[test]
    fn test_parse_columns_constraints_and_bits() {
        let selection = Selection::parse("time,lat,lon,DEPTH,depth>=1000,ID=0101:+mag,-gobs").unwrap();
        assert_eq!(selection.names, vec!["time", "lat", "lon", "depth"]);
        assert_eq!(selection.exact.len(), 1);
        assert_eq!(selection.exact[0].name, "depth");

        assert_eq!(selection.constraints.len(), 2);
        assert_eq!(selection.constraints[0].code, TestOp::Ge);
        assert_eq!(selection.constraints[0].limit, Limit::Text("1000".into()));
        assert!(!selection.constraints[0].exact);
        assert_eq!(selection.constraints[1].name, "id");
        assert!(selection.constraints[1].exact);

        assert_eq!(
            selection.bit_names,
            vec![("mag".to_string(), true), ("gobs".to_string(), false)]
        );
        assert!(!selection.flags_disabled);
    }

    #[test]
    fn test_operators() {
        let cases = [
            ("a<1", TestOp::Lt, "1"),
            ("a<=1", TestOp::Le, "1"),
            ("a>1", TestOp::Gt, "1"),
            ("a>=1", TestOp::Ge, "1"),
            ("a=1", TestOp::Eq, "1"),
            ("a!=1", TestOp::Ne, "1"),
            ("a|4", TestOp::Bit, "4"),
        ];
        for (word, code, value) in cases {
            assert_eq!(split_constraint(word), Some(("a", code, value)), "{}", word);
        }
        assert_eq!(split_constraint("depth"), None);
    }

    #[test]
    fn test_time_aliases() {
        for alias in ["atime", "rtime", "ytime"] {
            let selection = Selection::parse(alias).unwrap();
            assert_eq!(selection.names, vec!["time"]);
        }
    }

    #[test]
    fn test_trailing_colon_disables_flags() {
        let selection = Selection::parse("lat,lon:").unwrap();
        assert!(selection.flags_disabled);
        assert!(selection.bit_names.is_empty());
    }

    #[test]
    fn test_bad_bit_test() {
        match Selection::parse("lat:mag").unwrap_err() {
            Error::BadArgument { message } => assert!(message.contains("mag")),
            _ => panic!("Expected BadArgument error"),
        }
    }

    #[test]
    fn test_resolve_all_columns() {
        let mut header = header_with_extra();
        let mut selection = Selection::all();
        selection.resolve(&mut header).unwrap();

        let n = header.present_columns().len();
        assert_eq!(selection.order.len(), n);
        assert_eq!(selection.order.last().unwrap().set, ColumnSet::Container);

        let mut positions: Vec<usize> = header
            .present_columns()
            .into_iter()
            .filter_map(|c| header.descriptor(c).pos)
            .collect();
        positions.sort();
        assert_eq!(positions, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_resolve_binds_positions_and_limits() {
        let mut header = header_with_extra();
        let mut selection = Selection::parse("grav,lat,DEPTH,id,depth<NaN,id=0101:-depth").unwrap();
        selection.resolve(&mut header).unwrap();

        assert_eq!(header.descriptor(header.find("grav").unwrap()).pos, Some(0));
        assert_eq!(header.descriptor(header.find("depth").unwrap()).pos, Some(2));
        assert_eq!(header.descriptor(header.find("lon").unwrap()).pos, None);

        assert_eq!(selection.constraints[0].col, Some(2));
        assert!(matches!(selection.constraints[0].limit, Limit::Number(v) if v.is_nan()));
        assert_eq!(selection.constraints[1].limit, Limit::Text("0101".into()));
        assert_eq!(selection.exact[0].col, Some(2));
        assert_eq!(selection.bit_tests[0].bit, field_bit(field::DEPTH));
        assert!(!selection.bit_tests[0].expect);
    }

    #[test]
    fn test_unknown_column() {
        let mut header = plain_header(false);
        let mut selection = Selection::parse("lat,grav").unwrap();
        match selection.resolve(&mut header).unwrap_err() {
            Error::NoSuchColumn { name } => assert_eq!(name, "grav"),
            _ => panic!("Expected NoSuchColumn error"),
        }
    }

    #[test]
    fn test_constraint_on_unselected_column() {
        let mut header = plain_header(false);
        let mut selection = Selection::parse("lat,lon,depth>100").unwrap();
        match selection.resolve(&mut header).unwrap_err() {
            Error::NoSuchColumn { name } => assert_eq!(name, "depth"),
            _ => panic!("Expected NoSuchColumn error"),
        }
    }

    #[test]
    fn test_bad_constraint_value() {
        let mut header = plain_header(false);
        let mut selection = Selection::parse("depth,depth>deep").unwrap();
        match selection.resolve(&mut header).unwrap_err() {
            Error::BadArgument { .. } => {}
            _ => panic!("Expected BadArgument error"),
        }
    }
}
