//! Theta-rho file decoding.
//!
//! A pattern file carries one `theta rho` pair per line, whitespace
//! separated. Lines starting with `#` are comments. Decoding preserves file
//! order exactly: order in file is motion order.

use crate::error::{ParseError, Result};

use super::Coordinate;

/// Comment marker for theta-rho files.
const COMMENT_MARKER: char = '#';

/// Decode raw pattern bytes.
///
/// # Errors
///
/// Returns `ParseError::InvalidEncoding` for non-UTF-8 content, plus every
/// failure mode of [`decode`].
pub fn decode_bytes(content: &[u8]) -> Result<Vec<Coordinate>> {
    let text = std::str::from_utf8(content).map_err(|_| ParseError::InvalidEncoding)?;
    decode(text)
}

/// Decode pattern text into an ordered coordinate sequence.
///
/// Deterministic: identical input yields an identical sequence. No
/// reordering, no deduplication, no mirroring; projections such as theta
/// reflection are the caller's concern.
///
/// # Errors
///
/// * `ParseError::Empty`: no coordinate lines at all
/// * `ParseError::FieldCount`: a line with other than two fields
/// * `ParseError::NonNumeric`: a field that is not a float
/// * `ParseError::RhoOutOfRange`: rho outside `[0, 1]`
pub fn decode(content: &str) -> Result<Vec<Coordinate>> {
    let mut coordinates = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        // 1-based for error reporting
        let line_no = index + 1;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(ParseError::FieldCount {
                line: line_no,
                count: fields.len(),
            }
            .into());
        }

        let theta = parse_field(fields[0], line_no)?;
        let rho = parse_field(fields[1], line_no)?;

        if !(0.0..=1.0).contains(&rho) {
            return Err(ParseError::RhoOutOfRange { line: line_no, rho }.into());
        }

        coordinates.push(Coordinate { theta, rho });
    }

    if coordinates.is_empty() {
        return Err(ParseError::Empty.into());
    }

    Ok(coordinates)
}

fn parse_field(token: &str, line: usize) -> Result<f64> {
    let value: f64 = token.parse().map_err(|_| ParseError::NonNumeric {
        line,
        token: token.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ParseError::NonNumeric {
            line,
            token: token.to_string(),
        }
        .into());
    }
    Ok(value)
}
