//! Scan predicates
//!
//! A [`ScanTarget`] is the parsed, validated form of the user's scan input.
//! Parsing happens once, before any scan work starts, so malformed input is
//! rejected without side effects.

use crate::core::types::{MemoryError, MemoryResult, ScanComparison, ScanValue, ValueType};

/// Validated comparison with its typed operands
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub value_type: ValueType,
    pub comparison: ScanComparison,
    lower: Option<ScanValue>,
    upper: Option<ScanValue>,
    /// Raw encoding of `lower`, for byte-exact first scans
    lower_bytes: Vec<u8>,
}

impl ScanTarget {
    /// Parses the operands `comparison` needs.
    ///
    /// Every comparison except the unknown-value and relative ones requires a
    /// `lower` value; `ValueBetween` also requires `upper`.
    pub fn parse(
        value_type: ValueType,
        comparison: ScanComparison,
        lower: Option<&str>,
        upper: Option<&str>,
    ) -> MemoryResult<Self> {
        let parse_operand = |text: Option<&str>, what: &str| -> MemoryResult<ScanValue> {
            match text.map(str::trim).filter(|t| !t.is_empty()) {
                Some(text) => ScanValue::parse(text, value_type),
                None => Err(MemoryError::InvalidValue(format!(
                    "{} requires a {} value",
                    comparison, what
                ))),
            }
        };

        let lower = if comparison.requires_value() {
            Some(parse_operand(lower, "lower")?)
        } else {
            None
        };

        let upper = if comparison.requires_upper() {
            Some(parse_operand(upper, "upper")?)
        } else {
            None
        };

        Ok(ScanTarget {
            value_type,
            comparison,
            lower_bytes: lower.map(|v| v.to_bytes()).unwrap_or_default(),
            lower,
            upper,
        })
    }

    /// First scan predicate over `value_type.size()` raw bytes.
    ///
    /// Returns the decoded value when the slot matches.
    pub fn matches_first(&self, bytes: &[u8]) -> Option<ScanValue> {
        let value = ScanValue::from_bytes(bytes, self.value_type)?;

        let matched = match self.comparison {
            ScanComparison::ExactValue => bytes.get(..self.lower_bytes.len()) == Some(&self.lower_bytes[..]),
            ScanComparison::UnknownInitialValue => true,
            ScanComparison::BiggerThan | ScanComparison::SmallerThan | ScanComparison::ValueBetween => {
                self.compare_to_operands(&value)
            }
            // Nothing to compare against on a first scan
            ScanComparison::Changed
            | ScanComparison::Unchanged
            | ScanComparison::Increased
            | ScanComparison::Decreased => false,
        };

        matched.then_some(value)
    }

    /// Next scan predicate for a freshly read value.
    pub fn matches_next(&self, current: &ScanValue, previous: &ScanValue) -> bool {
        match self.comparison {
            ScanComparison::ExactValue => Some(current) == self.lower.as_ref(),
            ScanComparison::UnknownInitialValue => true,
            ScanComparison::BiggerThan | ScanComparison::SmallerThan | ScanComparison::ValueBetween => {
                self.compare_to_operands(current)
            }
            ScanComparison::Changed => current.to_bytes() != previous.to_bytes(),
            ScanComparison::Unchanged => current.to_bytes() == previous.to_bytes(),
            ScanComparison::Increased => current > previous,
            ScanComparison::Decreased => current < previous,
        }
    }

    fn compare_to_operands(&self, value: &ScanValue) -> bool {
        match (self.comparison, &self.lower, &self.upper) {
            (ScanComparison::BiggerThan, Some(lower), _) => value > lower,
            (ScanComparison::SmallerThan, Some(lower), _) => value < lower,
            (ScanComparison::ValueBetween, Some(lower), Some(upper)) => value >= lower && value <= upper,
            _ => false,
        }
    }
}
