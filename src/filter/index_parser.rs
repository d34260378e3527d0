// src/filter/index_parser.rs

//! Parsing of step index specs (`"1,3-5,7"`) and step range specs
//! (`"2-5"`, `"2..5"`, `"Build..Test"`).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::filter::options::StepRange;

static DASH_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)$").expect("static regex"));
static SINGLE_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("static regex"));
static DOT_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\.\.\s*(.+)$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexParseError {
    /// The spec is syntactically malformed (including inverted ranges).
    #[error("invalid index format: {0}")]
    Format(String),

    /// A position is outside the 1-based domain.
    #[error("index out of range: {0}")]
    Range(String),
}

/// Parse a comma-separated list of 1-based indices and inclusive ranges.
///
/// The result is sorted and deduplicated: `"5,1,3,2,4"` and `"1-5"` both
/// yield `[1, 2, 3, 4, 5]`.
pub fn parse_indices(spec: &str) -> Result<Vec<usize>, IndexParseError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(IndexParseError::Format(
            "empty index specification".to_string(),
        ));
    }

    let mut indices = BTreeSet::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(IndexParseError::Format(format!(
                "empty entry in '{spec}'"
            )));
        }

        if let Some(caps) = DASH_RANGE.captures(part) {
            let start = parse_position(&caps[1])?;
            let end = parse_position(&caps[2])?;
            if start > end {
                return Err(IndexParseError::Format(format!(
                    "range '{part}' is inverted (start {start} > end {end})"
                )));
            }
            indices.extend(start..=end);
        } else if SINGLE_INDEX.is_match(part) {
            indices.insert(parse_position(part)?);
        } else {
            return Err(IndexParseError::Format(format!(
                "'{part}' is neither an index nor a 'start-end' range"
            )));
        }
    }

    Ok(indices.into_iter().collect())
}

/// Parse a single range spec into a [`StepRange`].
///
/// Numeric forms are `start-end` and `start..end`; anything else on either
/// side of `..` is treated as a step name. Inverted numeric ranges are
/// accepted here and reported by the validator.
pub fn parse_range(spec: &str) -> Result<StepRange, IndexParseError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(IndexParseError::Format(
            "empty range specification".to_string(),
        ));
    }

    if let Some(caps) = DASH_RANGE.captures(spec) {
        return Ok(StepRange::Numeric {
            start: parse_position(&caps[1])?,
            end: parse_position(&caps[2])?,
        });
    }

    if let Some(caps) = DOT_RANGE.captures(spec) {
        let left = caps[1].trim();
        let right = caps[2].trim();

        if SINGLE_INDEX.is_match(left) && SINGLE_INDEX.is_match(right) {
            return Ok(StepRange::Numeric {
                start: parse_position(left)?,
                end: parse_position(right)?,
            });
        }

        return Ok(StepRange::Named {
            start_name: left.to_string(),
            end_name: right.to_string(),
        });
    }

    Err(IndexParseError::Format(format!(
        "'{spec}' is not a range (expected 'start-end', 'start..end' or 'StepA..StepB')"
    )))
}

fn parse_position(digits: &str) -> Result<usize, IndexParseError> {
    let value: usize = digits
        .parse()
        .map_err(|_| IndexParseError::Format(format!("index '{digits}' is too large")))?;
    if value == 0 {
        return Err(IndexParseError::Range(
            "step indices are 1-based; 0 is not a valid position".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_and_ranges_sorted() {
        assert_eq!(parse_indices("5,1,3,2,4").unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_indices("1,3-5,7").unwrap(), vec![1, 3, 4, 5, 7]);
        assert_eq!(parse_indices(" 2 - 3 , 3 ").unwrap(), vec![2, 3]);
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(matches!(parse_indices("5-3"), Err(IndexParseError::Format(_))));
        assert!(matches!(parse_indices("0"), Err(IndexParseError::Range(_))));
        assert!(matches!(parse_indices("1,,2"), Err(IndexParseError::Format(_))));
        assert!(matches!(parse_indices("a"), Err(IndexParseError::Format(_))));
        assert!(matches!(parse_indices("-1"), Err(IndexParseError::Format(_))));
        assert!(matches!(parse_indices(""), Err(IndexParseError::Format(_))));
    }

    #[test]
    fn parses_range_forms() {
        assert_eq!(
            parse_range("2-5").unwrap(),
            StepRange::Numeric { start: 2, end: 5 }
        );
        assert_eq!(
            parse_range("2..5").unwrap(),
            StepRange::Numeric { start: 2, end: 5 }
        );
        assert_eq!(
            parse_range("Build .. Run tests").unwrap(),
            StepRange::Named {
                start_name: "Build".to_string(),
                end_name: "Run tests".to_string()
            }
        );
        assert_eq!(
            parse_range("5-3").unwrap(),
            StepRange::Numeric { start: 5, end: 3 }
        );
        assert!(matches!(parse_range("0-3"), Err(IndexParseError::Range(_))));
        assert!(matches!(parse_range("Build"), Err(IndexParseError::Format(_))));
    }
}
