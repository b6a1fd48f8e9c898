//! Delimited text codecs
//!
//! Two tab-separated layouts share this module:
//! - [`m77t`] - the MGD77T exchange layout with a two-line header
//! - [`dat`] - a plain table of the 27 raw fields behind a fixed-width header

pub mod dat;
pub mod m77t;

#[cfg(test)]
pub mod tests;

pub use dat::DatCodec;
pub use m77t::M77tCodec;

use crate::{Error, Result};

/// Field separator of both layouts
pub const SEPARATOR: char = '\t';

/// Parse a numeric token, with empty text meaning "not present"
pub(crate) fn parse_optional(token: &str, record: usize, name: &str) -> Result<f64> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(f64::NAN);
    }
    token
        .parse::<f64>()
        .map_err(|_| Error::conversion(record, name, token))
}

/// Join fields with tabs, dropping trailing empty fields
pub(crate) fn join_trimmed(fields: &[String]) -> String {
    let used = fields
        .iter()
        .rposition(|f| !f.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    fields[..used].join("\t")
}
