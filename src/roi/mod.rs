//! Region-of-interest tables.
//!
//! [`RoiTableBuilder`] derives per-well tables from the acquisition model,
//! [`MetadataWriter`] stores them inside the matching image groups. Both
//! address wells by the same well name, so a table always lands in the image
//! created for that well.

mod builder;
mod table;
mod writer;

pub use builder::{RoiTableBuilder, WellTables};
pub use table::{RoiRecord, RoiTable, FOV_ROI_TABLE, ROI_COLUMNS, WELL_ROI_TABLE};
pub use writer::{MetadataWriter, ROI_TABLE_TYPE, TABLES_GROUP, TABLE_VERSION};
