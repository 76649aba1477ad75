// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget configuration and parsing.
//!
//! A [`MemoryBudget`] caps the size of the single reservation a pool makes
//! when it is allocated. It parses human-readable strings so it can be set
//! from the command line or a TOML config.

use crate::PoolError;
use std::fmt;
use std::str::FromStr;

/// A hard ceiling on a pool's reservation, in bytes. Units are binary
/// (`K` = 1024).
///
/// # Examples
/// ```
/// use memory_manager::MemoryBudget;
///
/// let b = MemoryBudget::from_mb(512);
/// assert_eq!(b.as_mb(), 512);
///
/// let b = MemoryBudget::parse("1G").unwrap();
/// assert_eq!(b.as_mb(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    /// Budget in bytes.
    bytes: usize,
}

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Recognised unit suffixes, longest first so `"MB"` wins over `"B"`.
const SUFFIXES: [(&str, usize); 7] = [
    ("GB", GIB),
    ("MB", MIB),
    ("KB", KIB),
    ("G", GIB),
    ("M", MIB),
    ("K", KIB),
    ("B", 1),
];

impl MemoryBudget {
    /// Creates a budget from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from megabytes.
    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MIB }
    }

    /// Creates a budget from gigabytes.
    pub fn from_gb(gb: usize) -> Self {
        Self { bytes: gb * GIB }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget in whole megabytes.
    pub fn as_mb(&self) -> usize {
        self.bytes / MIB
    }

    /// Parses a human-readable budget string such as `"64K"`, `"512MB"`,
    /// `"128B"` or `"4096"`. Suffixes are case-insensitive. Zero and values
    /// that overflow `usize` are rejected.
    pub fn parse(s: &str) -> Result<Self, PoolError> {
        let text = s.trim();
        let invalid = || PoolError::InvalidBudget(text.to_string());

        let upper = text.to_ascii_uppercase();
        let (digits, unit) = SUFFIXES
            .iter()
            .find_map(|&(suffix, unit)| {
                upper
                    .strip_suffix(suffix)
                    .map(|rest| (&text[..rest.len()], unit))
            })
            .unwrap_or((text, 1));

        digits
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_mul(unit))
            .filter(|&bytes| bytes > 0)
            .map(Self::from_bytes)
            .ok_or_else(invalid)
    }

    /// Returns `true` if a reservation of `bytes` fits within the budget.
    pub fn admits(&self, bytes: usize) -> bool {
        bytes <= self.bytes
    }
}

impl FromStr for MemoryBudget {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MemoryBudget {
    /// Uses the largest unit that divides the budget exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, label) = [(GIB, "GB"), (MIB, "MB"), (KIB, "KB")]
            .into_iter()
            .find(|&(unit, _)| self.bytes >= unit && self.bytes % unit == 0)
            .unwrap_or((1, "B"));
        write!(f, "{} {label}", self.bytes / unit)
    }
}
