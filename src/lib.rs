//! # plate-ngff
//!
//! Converts ImageXpress (MetaXpress) plate exports into OME-NGFF 0.4 plates
//! stored as Zarr v2 directory trees.
//!
//! Every acquired well becomes a multiscale image at
//! `<plate>.zarr/<row>/<column>/<sub_group>`, stitched from its tiles, with
//! per-field and whole-well ROI tables attached to it.
//!
//! ## Architecture
//!
//! - [`acquisition`] - Mode selection and parsing of the export directory
//! - [`layout`] - 96- and 384-well plate grids
//! - [`store`] - Zarr groups/arrays, NGFF metadata and the plate skeleton
//! - [`convert`] - Stitching, pyramids and the worker pool
//! - [`roi`] - ROI table building and persistence
//! - [`pipeline`] - The orchestrator that runs all of the above
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use plate_ngff::{ConvertRequest, PipelineOrchestrator, WorkerPool};
//!
//! #[tokio::main]
//! async fn main() {
//!     let request = ConvertRequest::new("/data/zarr", "/data/export");
//!     let pool = WorkerPool::new(2);
//!
//!     let result = PipelineOrchestrator::new().run(&request, &pool).await;
//!     pool.shutdown();
//!
//!     match result {
//!         Ok(summary) => println!("{:?}", summary.image),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

pub mod acquisition;
pub mod config;
pub mod convert;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod roi;
pub mod store;

// Re-export commonly used types
pub use acquisition::{
    parse_acquisition, select_strategy, AcquisitionMode, AcquisitionStrategy, Calibration,
    PlateAcquisition, Tile, TileAlignment, WellAcquisition,
};
pub use config::Config;
pub use convert::{
    ConvertedImage, Fuse, MeanFuse, PyramidConversionEngine, PyramidSpec, TranslationWarp, Warp,
    WorkerPool,
};
pub use error::{
    AcquisitionError, ConfigError, ConvertError, PoolError, StoreError, TableError,
};
pub use layout::PlateLayout;
pub use pipeline::{convert_plate, ConversionSummary, ConvertRequest, PipelineOrchestrator};
pub use roi::{MetadataWriter, RoiRecord, RoiTable, RoiTableBuilder};
pub use store::{Plate, PlateDescription, StoreHandle, StoreLayoutManager};
