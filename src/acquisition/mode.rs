//! Acquisition mode selection.
//!
//! The mode decides which tile files of an ImageXpress export are
//! interpreted, and how they are stacked:
//!
//! - **Stack**: only planes stored under `ZStep_<n>` directories
//! - **Single plane**: only planes stored outside any `ZStep_<n>` directory
//! - **Mixed**: both; single-plane files land on the first plane of the stack
//!
//! Tiles are always placed on a regular grid in this pipeline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AcquisitionError, ConfigError};

use super::imagexpress::parse_acquisition;
use super::model::{Calibration, PlateAcquisition};

// =============================================================================
// Acquisition Mode
// =============================================================================

/// How the tiles of an acquisition are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionMode {
    /// Z-stacks, one file per plane under `ZStep_<n>` directories
    #[serde(rename = "MD Stack Acquisition")]
    StackAcquisition,

    /// 2D acquisitions (or projections), one file per field and channel
    #[serde(rename = "MD Single Plane Acquisition")]
    SinglePlaneAcquisition,

    /// Stacks and single planes combined in one export
    #[serde(rename = "MixedAcquisition")]
    MixedAcquisition,
}

impl AcquisitionMode {
    /// All supported modes.
    pub const ALL: [AcquisitionMode; 3] = [
        AcquisitionMode::StackAcquisition,
        AcquisitionMode::SinglePlaneAcquisition,
        AcquisitionMode::MixedAcquisition,
    ];

    /// The identifier used on the command line and in task arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionMode::StackAcquisition => "MD Stack Acquisition",
            AcquisitionMode::SinglePlaneAcquisition => "MD Single Plane Acquisition",
            AcquisitionMode::MixedAcquisition => "MixedAcquisition",
        }
    }

    /// Whether planes stored under `ZStep_<n>` directories are used.
    pub fn reads_stacks(&self) -> bool {
        matches!(
            self,
            AcquisitionMode::StackAcquisition | AcquisitionMode::MixedAcquisition
        )
    }

    /// Whether planes stored outside `ZStep_<n>` directories are used.
    pub fn reads_single_planes(&self) -> bool {
        matches!(
            self,
            AcquisitionMode::SinglePlaneAcquisition | AcquisitionMode::MixedAcquisition
        )
    }
}

impl FromStr for AcquisitionMode {
    type Err = ConfigError;

    /// Accepts the task identifiers as well as the bare variant names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MD Stack Acquisition" | "StackAcquisition" => Ok(AcquisitionMode::StackAcquisition),
            "MD Single Plane Acquisition" | "SinglePlaneAcquisition" => {
                Ok(AcquisitionMode::SinglePlaneAcquisition)
            }
            "MixedAcquisition" => Ok(AcquisitionMode::MixedAcquisition),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tile alignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileAlignment {
    /// Fields snap to a regular grid of tile-sized cells
    #[default]
    Grid,
}

// =============================================================================
// Strategy
// =============================================================================

/// A validated mode paired with its alignment policy.
///
/// Obtained from [`select_strategy`]; building the acquisition model is the
/// first step that reads from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionStrategy {
    mode: AcquisitionMode,
    alignment: TileAlignment,
}

impl AcquisitionStrategy {
    /// Strategy for an already validated mode.
    pub fn new(mode: AcquisitionMode) -> Self {
        Self {
            mode,
            alignment: TileAlignment::Grid,
        }
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn alignment(&self) -> TileAlignment {
        self.alignment
    }

    /// Parse the acquisition directory under this strategy.
    pub fn build(
        &self,
        image_dir: &Path,
        calibration: Calibration,
        well_sub_group: &str,
    ) -> Result<PlateAcquisition, AcquisitionError> {
        debug!(
            "Parsing {} as '{}' with {:?} alignment",
            image_dir.display(),
            self.mode,
            self.alignment
        );
        parse_acquisition(image_dir, self.mode, self.alignment, calibration, well_sub_group)
    }
}

/// Resolve a mode identifier into an acquisition strategy.
///
/// Fails with [`ConfigError::UnknownMode`] for anything outside the closed
/// set of modes. No I/O happens here.
pub fn select_strategy(identifier: &str) -> Result<AcquisitionStrategy, ConfigError> {
    identifier.parse().map(AcquisitionStrategy::new)
}

// =============================================================================
// Tests
// =============================================================================
