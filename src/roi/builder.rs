//! ROI tables derived from tile geometry.
//!
//! Tables are computed from the acquisition model alone, never from pixel
//! data. Coordinates use the same frame as the fused base-resolution image:
//! the well origin is the smallest tile corner, and one pixel is
//! `pixel_size_um` micrometers wide.

use std::collections::BTreeMap;

use tracing::debug;

use crate::acquisition::{Calibration, PlateAcquisition, WellAcquisition};

use super::table::{RoiRecord, RoiTable, FOV_ROI_TABLE, WELL_ROI_TABLE};

/// Tables of one well, keyed by table name.
pub type WellTables = BTreeMap<String, RoiTable>;

/// Builds the ROI tables of every well.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoiTableBuilder;

impl RoiTableBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Tables for every well, keyed by well name.
    pub fn build(&self, acquisition: &PlateAcquisition) -> BTreeMap<String, WellTables> {
        let calibration = acquisition.calibration();
        acquisition
            .wells()
            .iter()
            .map(|well| (well.name().to_string(), self.build_well(well, calibration)))
            .collect()
    }

    /// `FOV_ROI_table` and `well_ROI_table` for one well.
    pub fn build_well(&self, well: &WellAcquisition, calibration: Calibration) -> WellTables {
        let px = calibration.pixel_size_um;
        let len_z = (well.depth() as f64 * calibration.z_spacing_um) as f32;
        let (oy, ox) = well.origin();

        let fields: Vec<RoiRecord> = well
            .fields()
            .iter()
            .map(|f| RoiRecord {
                label: format!("FOV_{}", f.field),
                x_micrometer: ((f.x - ox) as f64 * px) as f32,
                y_micrometer: ((f.y - oy) as f64 * px) as f32,
                z_micrometer: 0.0,
                len_x_micrometer: (f.width as f64 * px) as f32,
                len_y_micrometer: (f.height as f64 * px) as f32,
                len_z_micrometer: len_z,
                x_micrometer_original: (f.x as f64 * px) as f32,
                y_micrometer_original: (f.y as f64 * px) as f32,
            })
            .collect();

        let (height, width) = well.extent();
        let whole = RoiRecord {
            label: "well_1".to_string(),
            x_micrometer: 0.0,
            y_micrometer: 0.0,
            z_micrometer: 0.0,
            len_x_micrometer: (width as f64 * px) as f32,
            len_y_micrometer: (height as f64 * px) as f32,
            len_z_micrometer: len_z,
            x_micrometer_original: (ox as f64 * px) as f32,
            y_micrometer_original: (oy as f64 * px) as f32,
        };

        debug!("Well {}: {} field ROI(s)", well.name(), fields.len());

        let mut tables = WellTables::new();
        tables.insert(FOV_ROI_TABLE.to_string(), RoiTable::new(fields));
        tables.insert(WELL_ROI_TABLE.to_string(), RoiTable::new(vec![whole]));
        tables
    }
}
