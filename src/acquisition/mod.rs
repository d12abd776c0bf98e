//! Acquisition model.
//!
//! This module turns a raw ImageXpress export directory into an immutable,
//! in-memory description of the plate: which wells were imaged, which tile
//! files belong to each well, and where each field of view sits inside the
//! well's fused frame.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          AcquisitionStrategy            │
//! │   (mode + grid alignment, from a        │
//! │    validated mode identifier)           │
//! └────────────────────┬────────────────────┘
//!                      │ build()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          ImageXpress parser             │
//! │  (walks the tree, decodes file names)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │  PlateAcquisition → WellAcquisition     │
//! │                   → Tile                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The model is parsed once per run and is read-only afterwards. Both the
//! pyramid conversion and the ROI table builder derive their geometry from
//! the same [`WellAcquisition`], which keeps pixel data and ROI metadata in
//! the same coordinate frame.

mod imagexpress;
mod mode;
mod model;

pub use imagexpress::parse_acquisition;
pub use mode::{select_strategy, AcquisitionMode, AcquisitionStrategy, TileAlignment};
pub use model::{
    parse_well_name, Calibration, FieldGeometry, PlateAcquisition, Tile, WellAcquisition,
    DEFAULT_WELL_SUB_GROUP,
};
