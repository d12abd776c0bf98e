//! Configuration management for the plate converter.
//!
//! This module provides the command-line interface:
//! - Command-line arguments via clap
//! - Environment variables with `PLATE_` prefix
//! - Defaults for every optional setting
//!
//! Loose values (mode identifier, layout number) are turned into closed
//! types by [`Config::to_request`], before anything touches the filesystem.
//!
//! # Example
//!
//! ```ignore
//! use plate_ngff::config::Config;
//!
//! let config = Config::parse();
//! let request = config.to_request()?;
//! println!("Writing {}.zarr into {}", request.zarr_name, request.zarr_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! - `PLATE_ZARR_DIR` - Directory that receives the plate (required)
//! - `PLATE_IMAGE_DIR` - Directory of the acquired tiles (required)
//! - `PLATE_ZARR_NAME` - Plate name (default: Plate)
//! - `PLATE_MODE` - Acquisition mode (default: MD Stack Acquisition)
//! - `PLATE_LAYOUT` - Plate layout, 96 or 384 (default: 96)
//! - `PLATE_ORDER_NAME` - Order name attribute (default: example-order)
//! - `PLATE_BARCODE` - Barcode attribute (default: example-barcode)
//! - `PLATE_OVERWRITE` - Replace an existing plate (default: true)
//! - `PLATE_COARSENING_XY` - Pyramid coarsening factor (default: 2)
//! - `PLATE_MAX_LEVELS` - Coarsened levels above the base (default: 3)
//! - `PLATE_CHUNK_SIZE` - Chunk edge length (default: 1024)
//! - `PLATE_WORKERS` - Concurrent conversion jobs (default: 1)
//! - `PLATE_WELL_SUB_GROUP` - Image group inside each well (default: 0)
//! - `PLATE_PIXEL_SIZE_UM` - Pixel size in micrometers (default: 1.0)
//! - `PLATE_Z_SPACING_UM` - Z spacing in micrometers (default: 1.0)

use std::path::PathBuf;

use clap::Parser;

use crate::acquisition::{select_strategy, Calibration, DEFAULT_WELL_SUB_GROUP};
use crate::convert::{
    PyramidSpec, DEFAULT_CHUNK_SIZE, DEFAULT_COARSENING_XY, DEFAULT_MAX_LEVELS, DEFAULT_WORKERS,
};
use crate::error::ConfigError;
use crate::layout::PlateLayout;
use crate::pipeline::{ConvertRequest, DEFAULT_BARCODE, DEFAULT_ORDER_NAME, DEFAULT_ZARR_NAME};
use crate::store::PlateDescription;

// =============================================================================
// Default Values
// =============================================================================

/// Default acquisition mode identifier.
pub const DEFAULT_MODE: &str = "MD Stack Acquisition";

/// Default plate layout.
pub const DEFAULT_LAYOUT: u32 = 96;

/// Default pixel size in micrometers.
pub const DEFAULT_PIXEL_SIZE_UM: f64 = 1.0;

/// Default z spacing in micrometers.
pub const DEFAULT_Z_SPACING_UM: f64 = 1.0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// plate-ngff - Convert ImageXpress plate exports into OME-NGFF plates.
///
/// Stitches the tiles of every well, writes a multiscale image per well and
/// attaches field and well ROI tables.
#[derive(Parser, Debug, Clone)]
#[command(name = "plate-ngff")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Locations
    // =========================================================================
    /// Directory in which `<zarr-name>.zarr` is created.
    #[arg(long, env = "PLATE_ZARR_DIR")]
    pub zarr_dir: PathBuf,

    /// Directory containing the acquired tiles.
    #[arg(long, env = "PLATE_IMAGE_DIR")]
    pub image_dir: PathBuf,

    /// Plate name, without the `.zarr` suffix.
    #[arg(long, default_value = DEFAULT_ZARR_NAME, env = "PLATE_ZARR_NAME")]
    pub zarr_name: String,

    // =========================================================================
    // Plate
    // =========================================================================
    /// Acquisition mode: "MD Stack Acquisition", "MD Single Plane
    /// Acquisition" or "MixedAcquisition".
    #[arg(long, default_value = DEFAULT_MODE, env = "PLATE_MODE")]
    pub mode: String,

    /// Plate layout (96 or 384 wells).
    #[arg(long, default_value_t = DEFAULT_LAYOUT, env = "PLATE_LAYOUT")]
    pub layout: u32,

    /// Order name stored in the plate metadata.
    #[arg(long, default_value = DEFAULT_ORDER_NAME, env = "PLATE_ORDER_NAME")]
    pub order_name: String,

    /// Barcode stored in the plate metadata.
    #[arg(long, default_value = DEFAULT_BARCODE, env = "PLATE_BARCODE")]
    pub barcode: String,

    /// Replace an existing plate. When false, an existing plate is an error.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "PLATE_OVERWRITE")]
    pub overwrite: bool,

    /// Image group name inside each well.
    #[arg(long, default_value = DEFAULT_WELL_SUB_GROUP, env = "PLATE_WELL_SUB_GROUP")]
    pub well_sub_group: String,

    // =========================================================================
    // Pyramid
    // =========================================================================
    /// Linear downsampling factor between pyramid levels.
    #[arg(long, default_value_t = DEFAULT_COARSENING_XY, env = "PLATE_COARSENING_XY")]
    pub coarsening_xy: u32,

    /// Number of coarsened levels written above the base level.
    #[arg(long, default_value_t = DEFAULT_MAX_LEVELS, env = "PLATE_MAX_LEVELS")]
    pub max_levels: u32,

    /// Chunk edge length along y and x.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, env = "PLATE_CHUNK_SIZE")]
    pub chunk_size: u32,

    /// Pixel size along y and x in micrometers.
    #[arg(long, default_value_t = DEFAULT_PIXEL_SIZE_UM, env = "PLATE_PIXEL_SIZE_UM")]
    pub pixel_size_um: f64,

    /// Distance between z planes in micrometers.
    #[arg(long, default_value_t = DEFAULT_Z_SPACING_UM, env = "PLATE_Z_SPACING_UM")]
    pub z_spacing_um: f64,

    // =========================================================================
    // Execution
    // =========================================================================
    /// Number of wells converted concurrently.
    #[arg(long, default_value_t = DEFAULT_WORKERS, env = "PLATE_WORKERS")]
    pub workers: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.to_request().map(|_| ()).map_err(|e| e.to_string())
    }

    /// Build the validated request for a conversion run.
    pub fn to_request(&self) -> Result<ConvertRequest, ConfigError> {
        let strategy = select_strategy(&self.mode)?;
        let layout = PlateLayout::try_from(self.layout)?;
        let pyramid = PyramidSpec::new(self.coarsening_xy, self.max_levels)?;
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        let request = ConvertRequest {
            zarr_dir: self.zarr_dir.clone(),
            image_dir: self.image_dir.clone(),
            zarr_name: self.zarr_name.clone(),
            mode: strategy.mode(),
            layout,
            description: PlateDescription {
                order_name: self.order_name.clone(),
                barcode: self.barcode.clone(),
            },
            overwrite: self.overwrite,
            pyramid,
            chunk_size: self.chunk_size,
            well_sub_group: self.well_sub_group.clone(),
            calibration: Calibration {
                pixel_size_um: self.pixel_size_um,
                z_spacing_um: self.z_spacing_um,
            },
        };
        request.validate()?;
        Ok(request)
    }
}

// =============================================================================
// Tests
// =============================================================================
