//! Destination store lifecycle.
//!
//! [`StoreLayoutManager`] owns the one destructive step of a run: when a
//! plate already exists and overwrite is requested, the whole plate subtree
//! is removed before a fresh root is created. Nothing is staged or backed
//! up, so a run that fails after this point leaves no valid plate behind.
//! When the plate exists and overwrite is off, preparation fails before
//! touching anything.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::acquisition::{PlateAcquisition, WellAcquisition};
use crate::error::{AcquisitionError, ConvertError, StoreError};
use crate::layout::PlateLayout;

use super::ngff::{
    AcquisitionEntry, NamedEntry, PlateAttrs, PlateMetadata, WellAttrs, WellEntry, WellImage,
    WellMetadata, NGFF_VERSION,
};
use super::zarr::{create_group, is_group, write_attrs};

/// Suffix of the plate root directory.
pub const PLATE_SUFFIX: &str = ".zarr";

// =============================================================================
// Handles
// =============================================================================

/// A prepared, empty plate root.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    root_dir: PathBuf,
    name: String,
    layout: PlateLayout,
}

impl StoreHandle {
    /// Directory that contains the plate.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Plate name without the `.zarr` suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plate directory name, e.g. `Plate.zarr`.
    pub fn plate_name(&self) -> String {
        format!("{}{}", self.name, PLATE_SUFFIX)
    }

    /// Absolute path of the plate root.
    pub fn plate_path(&self) -> PathBuf {
        self.root_dir.join(self.plate_name())
    }

    pub fn layout(&self) -> PlateLayout {
        self.layout
    }
}

/// Descriptive plate attributes, stored but never used for addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateDescription {
    pub order_name: String,
    pub barcode: String,
}

/// A plate skeleton: rows, wells and empty image groups.
#[derive(Debug, Clone)]
pub struct Plate {
    path: PathBuf,
    name: String,
    layout: PlateLayout,
}

impl Plate {
    /// Absolute path of the plate root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Plate directory name, e.g. `Plate.zarr`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> PlateLayout {
        self.layout
    }

    /// Path of the image group for `(row, column, sub_group)`.
    ///
    /// Pure path arithmetic; see [`Plate::image_group`] for a checked lookup.
    pub fn image_path(&self, row: &str, column: &str, sub_group: &str) -> PathBuf {
        self.path.join(row).join(column).join(sub_group)
    }

    /// Path of the image group that holds a well's acquisition.
    pub fn well_image_path(&self, well: &WellAcquisition) -> PathBuf {
        let (row, column) = well.row_col();
        self.image_path(&row, &column, well.sub_group())
    }

    /// Existing image group for `(row, column, sub_group)`.
    pub fn image_group(
        &self,
        row: &str,
        column: &str,
        sub_group: &str,
    ) -> Result<PathBuf, StoreError> {
        let path = self.image_path(row, column, sub_group);
        if !is_group(&path) {
            return Err(StoreError::NodeNotFound(path));
        }
        Ok(path)
    }
}

// =============================================================================
// Store Layout Manager
// =============================================================================

/// Creates (or destructively recreates) the plate hierarchy.
#[derive(Debug, Clone, Default)]
pub struct StoreLayoutManager;

impl StoreLayoutManager {
    pub fn new() -> Self {
        Self
    }

    /// Prepare a fresh plate root at `root_dir/<plate_name>.zarr`.
    ///
    /// - Plate absent: the root group is created.
    /// - Plate present, `overwrite`: the entire subtree is deleted first.
    /// - Plate present, no `overwrite`: [`StoreError::PlateExists`], nothing
    ///   is modified.
    pub fn prepare(
        &self,
        root_dir: &Path,
        plate_name: &str,
        layout: PlateLayout,
        overwrite: bool,
    ) -> Result<StoreHandle, StoreError> {
        let handle = StoreHandle {
            root_dir: root_dir.to_path_buf(),
            name: plate_name.to_string(),
            layout,
        };
        let plate_path = handle.plate_path();

        if plate_path.exists() || plate_path.is_symlink() {
            if !overwrite {
                return Err(StoreError::PlateExists(plate_path));
            }

            warn!("Removing existing plate {}", plate_path.display());
            let removal = if plate_path.is_dir() {
                fs::remove_dir_all(&plate_path)
            } else {
                fs::remove_file(&plate_path)
            };
            removal.map_err(|e| StoreError::io(&plate_path, e))?;
        }

        create_group(&plate_path)?;
        info!("Prepared plate root {}", plate_path.display());

        Ok(handle)
    }

    /// Build the plate skeleton for an acquisition.
    ///
    /// Writes plate metadata (full row/column grid of the layout plus the
    /// acquired wells), one group per layout row, and a well group with an
    /// empty image group for every acquired well.
    pub fn create_plate(
        &self,
        store: &StoreHandle,
        acquisition: &PlateAcquisition,
        description: &PlateDescription,
    ) -> Result<Plate, ConvertError> {
        let layout = store.layout();
        check_wells_in_layout(acquisition, layout)?;

        let plate = Plate {
            path: store.plate_path(),
            name: store.plate_name(),
            layout,
        };

        let wells: Vec<WellEntry> = acquisition
            .wells()
            .iter()
            .map(|w| {
                let (row, column) = w.row_col();
                WellEntry {
                    path: format!("{}/{}", row, column),
                    row_index: w.row_index(),
                    column_index: w.column_index(),
                }
            })
            .collect();

        let attrs = PlateAttrs {
            plate: PlateMetadata {
                name: store.name().to_string(),
                version: NGFF_VERSION.to_string(),
                acquisitions: vec![AcquisitionEntry {
                    id: 0,
                    name: store.name().to_string(),
                }],
                field_count: acquisition.field_count(),
                rows: named(layout.row_names()),
                columns: named(layout.column_names()),
                wells,
            },
            order_name: description.order_name.clone(),
            barcode: description.barcode.clone(),
        };
        create_group(plate.path())?;
        write_attrs(plate.path(), &attrs)?;

        for row in layout.row_names() {
            create_group(&plate.path().join(row))?;
        }

        for well in acquisition.wells() {
            let (row, column) = well.row_col();
            let well_path = plate.path().join(&row).join(&column);
            create_group(&well_path)?;
            write_attrs(
                &well_path,
                &WellAttrs {
                    well: WellMetadata {
                        images: vec![WellImage {
                            path: well.sub_group().to_string(),
                            acquisition: 0,
                        }],
                        version: NGFF_VERSION.to_string(),
                    },
                },
            )?;
            create_group(&plate.well_image_path(well))?;
            debug!("Created well {}", well.well_path(plate.name()));
        }

        info!(
            "Created {}-well plate {} with {} well(s)",
            layout,
            plate.name(),
            acquisition.wells().len()
        );

        Ok(plate)
    }
}

/// Reject wells that do not fit the plate layout.
pub fn check_wells_in_layout(
    acquisition: &PlateAcquisition,
    layout: PlateLayout,
) -> Result<(), AcquisitionError> {
    for well in acquisition.wells() {
        if !layout.contains(well.row_index(), well.column()) {
            return Err(AcquisitionError::WellOutsideLayout {
                well: well.name().to_string(),
                layout: layout.well_count(),
            });
        }
    }
    Ok(())
}

fn named(names: Vec<String>) -> Vec<NamedEntry> {
    names.into_iter().map(|name| NamedEntry { name }).collect()
}

// =============================================================================
// Tests
// =============================================================================
