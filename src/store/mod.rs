//! Destination store.
//!
//! The converter writes an OME-NGFF 0.4 high-content-screening plate on top
//! of Zarr v2:
//!
//! ```text
//! <zarr_dir>/<name>.zarr            plate   (.zattrs: plate metadata)
//! └── A                             row
//!     └── 1                         column / well (.zattrs: well images)
//!         └── 0                     well sub-group / image (.zattrs: multiscales)
//!             ├── 0, 1, 2, ...      pyramid levels (arrays, c/z/y/x)
//!             └── tables            ROI tables
//! ```
//!
//! - [`zarr`]: groups, attributes and chunked arrays
//! - [`ngff`]: typed plate/well/image metadata documents
//! - [`StoreLayoutManager`]: (re)creates the plate and its skeleton

mod manager;
pub mod ngff;
pub mod zarr;

pub use manager::{
    check_wells_in_layout, Plate, PlateDescription, StoreHandle, StoreLayoutManager, PLATE_SUFFIX,
};
pub use zarr::{NumericElement, ZarrArray};
