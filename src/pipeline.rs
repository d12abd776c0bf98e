//! End-to-end conversion of one plate.
//!
//! [`PipelineOrchestrator::run`] sequences the whole conversion:
//!
//! ```text
//! ConvertRequest
//!      │ validate (no I/O)
//!      ▼
//! AcquisitionStrategy::build ──► PlateAcquisition
//!      │
//!      ▼
//! StoreLayoutManager::prepare ──► create_plate        (skeleton)
//!      │
//!      ▼
//! PyramidConversionEngine::convert on the WorkerPool  (pixels, all wells)
//!      │
//!      ▼
//! RoiTableBuilder::build ──► MetadataWriter::attach   (tables, per well)
//!      │
//!      ▼
//! ConversionSummary
//! ```
//!
//! Every error aborts the run. Wells converted before the failure stay on
//! disk; rerun with `overwrite` to start from a clean plate.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::acquisition::{
    AcquisitionMode, AcquisitionStrategy, Calibration, PlateAcquisition, DEFAULT_WELL_SUB_GROUP,
};
use crate::convert::{PyramidConversionEngine, PyramidSpec, WorkerPool, DEFAULT_CHUNK_SIZE};
use crate::error::{AcquisitionError, ConfigError, ConvertError};
use crate::layout::PlateLayout;
use crate::roi::{MetadataWriter, RoiTableBuilder, WellTables};
use crate::store::{check_wells_in_layout, Plate, PlateDescription, StoreLayoutManager};

/// Default plate name.
pub const DEFAULT_ZARR_NAME: &str = "Plate";

/// Default order name stored in the plate attributes.
pub const DEFAULT_ORDER_NAME: &str = "example-order";

/// Default barcode stored in the plate attributes.
pub const DEFAULT_BARCODE: &str = "example-barcode";

// =============================================================================
// Request
// =============================================================================

/// Validated parameters of one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Directory that receives `<zarr_name>.zarr`
    pub zarr_dir: PathBuf,

    /// Source directory of the vendor tiles
    pub image_dir: PathBuf,

    /// Plate name without the `.zarr` suffix
    pub zarr_name: String,

    pub mode: AcquisitionMode,
    pub layout: PlateLayout,
    pub description: PlateDescription,

    /// Replace an existing plate instead of failing
    pub overwrite: bool,

    pub pyramid: PyramidSpec,

    /// Chunk edge length along y and x
    pub chunk_size: u32,

    /// Image group name inside each well
    pub well_sub_group: String,

    pub calibration: Calibration,
}

impl ConvertRequest {
    /// A request with default settings for everything but the two paths.
    pub fn new(zarr_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            zarr_dir: zarr_dir.into(),
            image_dir: image_dir.into(),
            zarr_name: DEFAULT_ZARR_NAME.to_string(),
            mode: AcquisitionMode::StackAcquisition,
            layout: PlateLayout::Wells96,
            description: PlateDescription {
                order_name: DEFAULT_ORDER_NAME.to_string(),
                barcode: DEFAULT_BARCODE.to_string(),
            },
            overwrite: true,
            pyramid: PyramidSpec::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            well_sub_group: DEFAULT_WELL_SUB_GROUP.to_string(),
            calibration: Calibration::default(),
        }
    }

    /// Check the parameters that the types alone cannot guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_path_component(&self.zarr_name) {
            return Err(ConfigError::InvalidPlateName(self.zarr_name.clone()));
        }
        if !is_path_component(&self.well_sub_group) {
            return Err(ConfigError::InvalidSubGroup(self.well_sub_group.clone()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        check_positive("pixel_size_um", self.calibration.pixel_size_um)?;
        check_positive("z_spacing_um", self.calibration.z_spacing_um)?;
        Ok(())
    }
}

fn is_path_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
}

fn check_positive(axis: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCalibration { axis, value })
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Paths created by a run, relative to the store root directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// Plate directory, e.g. `Plate.zarr`
    pub plate: Vec<String>,

    /// Well groups, e.g. `Plate.zarr/A/1`
    pub well: Vec<String>,

    /// Image groups, e.g. `Plate.zarr/A/1/0`
    pub image: Vec<String>,
}

impl ConversionSummary {
    fn new(plate: &Plate, acquisition: &PlateAcquisition) -> Self {
        Self {
            plate: vec![plate.name().to_string()],
            well: acquisition
                .wells()
                .iter()
                .map(|w| w.well_path(plate.name()))
                .collect(),
            image: acquisition
                .wells()
                .iter()
                .map(|w| w.image_path(plate.name()))
                .collect(),
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs the conversion phases in order.
#[derive(Debug, Clone, Default)]
pub struct PipelineOrchestrator {
    layout_manager: StoreLayoutManager,
    tables: RoiTableBuilder,
    writer: MetadataWriter,
}

impl PipelineOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one plate using the caller's worker pool.
    ///
    /// The pool is not shut down here; its owner does that.
    pub async fn run(
        &self,
        request: &ConvertRequest,
        pool: &WorkerPool,
    ) -> Result<ConversionSummary, ConvertError> {
        request.validate()?;
        let engine = PyramidConversionEngine::new(request.pyramid, request.chunk_size)?;
        let strategy = AcquisitionStrategy::new(request.mode);
        info!(
            "Converting {} ({}) into {}",
            request.image_dir.display(),
            strategy.mode(),
            request.zarr_dir.display()
        );

        let acquisition = strategy.build(
            &request.image_dir,
            request.calibration,
            &request.well_sub_group,
        )?;
        check_wells_in_layout(&acquisition, request.layout)?;
        info!(
            "Found {} well(s), {} channel(s)",
            acquisition.wells().len(),
            acquisition.channels().len()
        );

        let store = self.layout_manager.prepare(
            &request.zarr_dir,
            &request.zarr_name,
            request.layout,
            request.overwrite,
        )?;
        let plate = self
            .layout_manager
            .create_plate(&store, &acquisition, &request.description)?;

        engine.convert(&plate, &acquisition, pool).await?;

        let tables = self.tables.build(&acquisition);
        self.attach_tables(&plate, &acquisition, tables, request.overwrite)?;

        let summary = ConversionSummary::new(&plate, &acquisition);
        info!(
            "Plate {} complete: {} well(s), {} image(s)",
            plate.name(),
            summary.well.len(),
            summary.image.len()
        );
        Ok(summary)
    }

    /// Attach the ROI tables of every well to its image group.
    fn attach_tables(
        &self,
        plate: &Plate,
        acquisition: &PlateAcquisition,
        tables: BTreeMap<String, WellTables>,
        overwrite: bool,
    ) -> Result<(), ConvertError> {
        for (well_name, tables) in tables {
            let well = acquisition
                .well(&well_name)
                .ok_or_else(|| AcquisitionError::UnknownWell(well_name.clone()))?;
            let (row, column) = well.row_col();
            let image = plate.image_group(&row, &column, well.sub_group())?;
            for (table_name, table) in &tables {
                self.writer.attach(&image, table_name, table, overwrite)?;
            }
            debug!("Attached {} table(s) to {}", tables.len(), well_name);
        }
        Ok(())
    }
}

/// Convert one plate with a dedicated pool of `workers` jobs.
///
/// The pool is shut down before returning, on success and on error.
pub async fn convert_plate(
    request: &ConvertRequest,
    workers: usize,
) -> Result<ConversionSummary, ConvertError> {
    if workers == 0 {
        return Err(ConfigError::NoWorkers.into());
    }
    let pool = WorkerPool::new(workers);
    let result = PipelineOrchestrator::new().run(request, &pool).await;
    pool.shutdown();
    result
}

// =============================================================================
// Tests
// =============================================================================
