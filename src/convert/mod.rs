//! Pyramid conversion.
//!
//! This module turns the tiles of each well into a multiscale image:
//!
//! - [`stitch`]: warp and fuse kernels that build the base-resolution volume
//! - [`pyramid`]: block-mean coarsening into lower resolution levels
//! - [`WorkerPool`]: bounded concurrency for per-well jobs
//! - [`PyramidConversionEngine`]: ties the above together and writes arrays
//!
//! # Example
//!
//! ```ignore
//! use plate_ngff::convert::{PyramidConversionEngine, PyramidSpec, WorkerPool};
//!
//! let engine = PyramidConversionEngine::new(PyramidSpec::new(2, 3)?, 1024)?;
//! let pool = WorkerPool::new(4);
//! let images = engine.convert(&plate, &acquisition, &pool).await?;
//! pool.shutdown();
//! ```

mod engine;
mod pool;
pub mod pyramid;
pub mod stitch;

pub use engine::{ConvertedImage, PyramidConversionEngine, DEFAULT_CHUNK_SIZE};
pub use pool::{WorkerPool, DEFAULT_WORKERS};
pub use pyramid::{
    coarsen, levels_needed, PyramidSpec, DEFAULT_COARSENING_XY, DEFAULT_MAX_LEVELS,
};
pub use stitch::{
    load_tile, stitch_well, Fuse, MeanFuse, TranslationWarp, Volume, Warp, WarpedTile,
};
