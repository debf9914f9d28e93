//! Scan result and comparison types

use super::{Address, MemoryError, ScanValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address that survived the scans so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedAddress {
    pub address: Address,
    /// Value captured by the first scan, never updated afterwards
    pub first_value: ScanValue,
    /// Value captured by the most recent scan
    pub previous_value: ScanValue,
}

impl ScannedAddress {
    /// Creates a freshly scanned entry where both values are the same
    pub fn new(address: Address, value: ScanValue) -> Self {
        ScannedAddress {
            address,
            first_value: value,
            previous_value: value,
        }
    }
}

/// How a candidate value is compared against the scan input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanComparison {
    ExactValue,
    BiggerThan,
    SmallerThan,
    ValueBetween,
    UnknownInitialValue,
    Changed,
    Unchanged,
    Increased,
    Decreased,
}

impl ScanComparison {
    /// Checks if this comparison needs a lower (or single) value
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            ScanComparison::ExactValue
                | ScanComparison::BiggerThan
                | ScanComparison::SmallerThan
                | ScanComparison::ValueBetween
        )
    }

    /// Checks if this comparison also needs an upper value
    pub fn requires_upper(&self) -> bool {
        matches!(self, ScanComparison::ValueBetween)
    }

    /// Checks if this comparison is relative to the previous scan
    pub fn requires_previous(&self) -> bool {
        matches!(
            self,
            ScanComparison::Changed
                | ScanComparison::Unchanged
                | ScanComparison::Increased
                | ScanComparison::Decreased
        )
    }
}

impl fmt::Display for ScanComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanComparison::ExactValue => "Exact Value",
            ScanComparison::BiggerThan => "Bigger than...",
            ScanComparison::SmallerThan => "Smaller than...",
            ScanComparison::ValueBetween => "Value between...",
            ScanComparison::UnknownInitialValue => "Unknown initial value",
            ScanComparison::Changed => "Changed value",
            ScanComparison::Unchanged => "Unchanged value",
            ScanComparison::Increased => "Increased value",
            ScanComparison::Decreased => "Decreased value",
        };
        f.write_str(name)
    }
}

impl FromStr for ScanComparison {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let comparison = match normalized.as_str() {
            "exact" | "exactvalue" => ScanComparison::ExactValue,
            "bigger" | "biggerthan" => ScanComparison::BiggerThan,
            "smaller" | "smallerthan" => ScanComparison::SmallerThan,
            "between" | "valuebetween" => ScanComparison::ValueBetween,
            "unknown" | "unknowninitialvalue" => ScanComparison::UnknownInitialValue,
            "changed" => ScanComparison::Changed,
            "unchanged" => ScanComparison::Unchanged,
            "increased" => ScanComparison::Increased,
            "decreased" => ScanComparison::Decreased,
            _ => return Err(MemoryError::InvalidValue(format!("unknown comparison '{}'", s))),
        };
        Ok(comparison)
    }
}
