//! ROI records and tables.

/// Per-field table name.
pub const FOV_ROI_TABLE: &str = "FOV_ROI_table";

/// Whole-well table name.
pub const WELL_ROI_TABLE: &str = "well_ROI_table";

/// Column names, in storage order.
pub const ROI_COLUMNS: [&str; 8] = [
    "x_micrometer",
    "y_micrometer",
    "z_micrometer",
    "len_x_micrometer",
    "len_y_micrometer",
    "len_z_micrometer",
    "x_micrometer_original",
    "y_micrometer_original",
];

/// One region of interest, in micrometers.
///
/// Positions are relative to the top-left corner of the fused
/// base-resolution image; the `_original` columns keep the unshifted stage
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiRecord {
    pub label: String,
    pub x_micrometer: f32,
    pub y_micrometer: f32,
    pub z_micrometer: f32,
    pub len_x_micrometer: f32,
    pub len_y_micrometer: f32,
    pub len_z_micrometer: f32,
    pub x_micrometer_original: f32,
    pub y_micrometer_original: f32,
}

impl RoiRecord {
    /// Values in [`ROI_COLUMNS`] order.
    pub fn values(&self) -> [f32; 8] {
        [
            self.x_micrometer,
            self.y_micrometer,
            self.z_micrometer,
            self.len_x_micrometer,
            self.len_y_micrometer,
            self.len_z_micrometer,
            self.x_micrometer_original,
            self.y_micrometer_original,
        ]
    }
}

/// An ordered list of ROI records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoiTable {
    records: Vec<RoiRecord>,
}

impl RoiTable {
    pub fn new(records: Vec<RoiRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RoiRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(|r| r.label.clone()).collect()
    }

    pub fn columns(&self) -> Vec<String> {
        ROI_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    /// Row-major `len() x 8` matrix of record values.
    pub fn matrix(&self) -> Vec<f32> {
        self.records.iter().flat_map(|r| r.values()).collect()
    }
}
