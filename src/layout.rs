//! Plate layouts.
//!
//! A layout fixes the logical row/column grid of a plate. Only the two
//! standard SBS formats are supported.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Supported plate formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PlateLayout {
    /// 8 rows × 12 columns
    Wells96,
    /// 16 rows × 24 columns
    Wells384,
}

impl PlateLayout {
    /// Number of rows (`A`..).
    pub fn rows(&self) -> u32 {
        match self {
            PlateLayout::Wells96 => 8,
            PlateLayout::Wells384 => 16,
        }
    }

    /// Number of columns (`1`..).
    pub fn columns(&self) -> u32 {
        match self {
            PlateLayout::Wells96 => 12,
            PlateLayout::Wells384 => 24,
        }
    }

    /// Total well count.
    pub fn well_count(&self) -> u32 {
        self.rows() * self.columns()
    }

    /// Row names in order, e.g. `["A", "B", ..., "H"]`.
    pub fn row_names(&self) -> Vec<String> {
        (0..self.rows())
            .map(|i| char::from(b'A' + i as u8).to_string())
            .collect()
    }

    /// Column names in order, e.g. `["1", "2", ..., "12"]`.
    pub fn column_names(&self) -> Vec<String> {
        (1..=self.columns()).map(|c| c.to_string()).collect()
    }

    /// Whether a zero-based row index and one-based column fit the layout.
    pub fn contains(&self, row_index: u32, column: u32) -> bool {
        row_index < self.rows() && column >= 1 && column <= self.columns()
    }
}

impl TryFrom<u32> for PlateLayout {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            96 => Ok(PlateLayout::Wells96),
            384 => Ok(PlateLayout::Wells384),
            other => Err(ConfigError::InvalidLayout(other)),
        }
    }
}

impl From<PlateLayout> for u32 {
    fn from(layout: PlateLayout) -> Self {
        layout.well_count()
    }
}

impl fmt::Display for PlateLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.well_count())
    }
}
