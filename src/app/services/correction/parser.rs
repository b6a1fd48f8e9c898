//! Correction table parsing
//!
//! A table line reads `cruise column term term ...`. Each term is either a
//! bare number or
//!
//! ```text
//! factor*[cos|sin|exp](scale(name[-origin]))[^power]
//! ```
//!
//! where `scale` may be empty or end in `*`, and an origin of `T` stands
//! for the value in the first record of the cruise.

use super::auxiliary::AuxField;
use super::{CorrectionTerm, Modifier, Origin, TermSource};
use crate::{Error, Result};
use regex::Regex;

const TERM_PATTERN: &str = r"^(?P<factor>[^*]+)\*(?P<modifier>[A-Za-z]+)?\((?P<scale>[^()]*)\((?P<name>[^()\-]+)(?:-(?P<origin>[^()]+))?\)\)(?:\^(?P<power>.+))?$";

/// Characters separating terms on a table line
pub const TERM_SEPARATORS: &[char] = &[' ', ',', '\t'];

/// Compiled term grammar
#[derive(Debug, Clone)]
pub struct TermParser {
    pattern: Regex,
}

/// One table line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLine<'a> {
    pub cruise: &'a str,
    pub column: &'a str,
    pub terms: Vec<&'a str>,
}

/// Split a table line, skipping comments and blank lines
pub fn split_line(line: &str) -> Option<TableLine<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.starts_with('#') || line.trim().is_empty() {
        return None;
    }
    let mut words = line.split_whitespace();
    let cruise = words.next()?;
    let column = words.next()?;
    let rest = line
        .trim_start()
        .get(cruise.len()..)
        .map(str::trim_start)
        .and_then(|s| s.get(column.len()..))
        .unwrap_or("");
    Some(TableLine {
        cruise,
        column,
        terms: rest
            .split(TERM_SEPARATORS)
            .filter(|w| !w.is_empty())
            .collect(),
    })
}

fn number(text: &str, what: &str, term: &str, line: usize) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|_| {
        Error::correction_table(line, format!("bad {} '{}' in term {}", what, text, term))
    })
}

impl TermParser {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(TERM_PATTERN)
            .map_err(|e| Error::bad_argument(format!("invalid term grammar: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Name a term reads its value from, or `None` for a constant
    pub fn source_name<'a>(&self, word: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(word)
            .and_then(|c| c.name("name"))
            .map(|m| m.as_str())
    }

    /// Parse one term
    ///
    /// `columns` lists the column names a term may refer to; any other name
    /// must be an auxiliary field.
    pub fn parse(&self, word: &str, line: usize, columns: &[&str]) -> Result<CorrectionTerm> {
        if !word.contains('*') {
            return Ok(CorrectionTerm::constant(number(word, "constant", word, line)?));
        }

        let caps = self.pattern.captures(word).ok_or_else(|| {
            Error::correction_table(
                line,
                format!(
                    "term {} is not of the form factor*[cos|sin|exp](scale(name[-origin]))[^power]",
                    word
                ),
            )
        })?;

        let factor = number(&caps["factor"], "factor", word, line)?;
        let modifier = match caps.name("modifier").map(|m| m.as_str().to_ascii_lowercase()) {
            None => Modifier::Identity,
            Some(m) if m == "cos" => Modifier::Cos,
            Some(m) if m == "sin" => Modifier::Sin,
            Some(m) if m == "exp" => Modifier::Exp,
            Some(m) => {
                return Err(Error::correction_table(
                    line,
                    format!("unknown function '{}' in term {}", m, word),
                ));
            }
        };

        let scale_text = caps["scale"].trim().trim_end_matches('*');
        let scale = if scale_text.is_empty() {
            1.0
        } else {
            number(scale_text, "scale", word, line)?
        };

        let origin = match caps.name("origin").map(|m| m.as_str().trim()) {
            None => Origin::Value(0.0),
            Some(o) if o.starts_with('T') => Origin::FirstRecord,
            Some(o) => Origin::Value(number(o, "origin", word, line)?),
        };

        let power = match caps.name("power") {
            None => 1.0,
            Some(p) => number(p.as_str(), "power", word, line)?,
        };

        let name = caps["name"].trim();
        let source = match columns.iter().position(|c| *c == name) {
            Some(i) => TermSource::Column(i),
            None => TermSource::Aux(AuxField::from_name(name).ok_or_else(|| {
                Error::correction_table(
                    line,
                    format!("column {} not found - requested by the correction table", name),
                )
            })?),
        };

        Ok(CorrectionTerm {
            factor,
            modifier,
            scale,
            origin,
            power,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 3] = ["lat", "lon", "faa"];

    fn parse(word: &str) -> Result<CorrectionTerm> {
        TermParser::new().unwrap().parse(word, 7, &COLUMNS)
    }

    #[test]
    fn test_constant_term() {
        let term = parse("-2.5").unwrap();
        assert_eq!(term.factor, -2.5);
        assert_eq!(term.source, TermSource::Constant);
    }

    #[test]
    fn test_full_term() {
        let term = parse("1.5*cos(0.0174533*(lat-T))^2").unwrap();
        assert_eq!(term.factor, 1.5);
        assert_eq!(term.modifier, Modifier::Cos);
        assert_eq!(term.scale, 0.0174533);
        assert_eq!(term.origin, Origin::FirstRecord);
        assert_eq!(term.power, 2.0);
        assert_eq!(term.source, TermSource::Column(0));
    }

    #[test]
    fn test_defaults() {
        let term = parse("0.01*((dist))").unwrap();
        assert_eq!(term.modifier, Modifier::Identity);
        assert_eq!(term.scale, 1.0);
        assert_eq!(term.origin, Origin::Value(0.0));
        assert_eq!(term.power, 1.0);
        assert_eq!(term.source, TermSource::Aux(AuxField::Dist));

        let term = parse("3*EXP(2(faa-10.5))").unwrap();
        assert_eq!(term.modifier, Modifier::Exp);
        assert_eq!(term.scale, 2.0);
        assert_eq!(term.origin, Origin::Value(10.5));
        assert_eq!(term.source, TermSource::Column(2));
    }

    #[test]
    fn test_unknown_name() {
        match parse("1*((grav))").unwrap_err() {
            Error::CorrectionTable { line, message } => {
                assert_eq!(line, 7);
                assert!(message.contains("grav"));
            }
            _ => panic!("Expected CorrectionTable error"),
        }
    }

    #[test]
    fn test_malformed_terms() {
        for word in ["1*cos(lat)", "x*((lat))", "1*tan((lat))", "1*((lat))^y", "abc"] {
            match parse(word) {
                Err(Error::CorrectionTable { .. }) => {}
                other => panic!("Expected CorrectionTable error for {}, got {:?}", word, other),
            }
        }
    }

    #[test]
    fn test_split_line() {
        let line = split_line("01010083 faa 1.2, 0.5*((lat))\t-3").unwrap();
        assert_eq!(line.cruise, "01010083");
        assert_eq!(line.column, "faa");
        assert_eq!(line.terms, vec!["1.2", "0.5*((lat))", "-3"]);
        assert!(split_line("# comment").is_none());
        assert!(split_line("   ").is_none());
    }

    #[test]
    fn test_source_name() {
        let parser = TermParser::new().unwrap();
        assert_eq!(parser.source_name("2*sin(3(azim-T))"), Some("azim"));
        assert_eq!(parser.source_name("2.0"), None);
    }
}
