use std::path::{Path, PathBuf};

use crate::error::AcquisitionError;

use super::mode::{AcquisitionMode, TileAlignment};

/// Well sub-group that receives the image when nothing else is configured.
pub const DEFAULT_WELL_SUB_GROUP: &str = "0";

// =============================================================================
// Calibration
// =============================================================================

/// Physical pixel spacing shared by every tile of the acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Pixel size along y and x in micrometers
    pub pixel_size_um: f64,

    /// Distance between z planes in micrometers
    pub z_spacing_um: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixel_size_um: 1.0,
            z_spacing_um: 1.0,
        }
    }
}

// =============================================================================
// Tile
// =============================================================================

/// One image plane on disk: a single field, channel and z position.
///
/// `y` and `x` give the top-left corner of the field inside the well frame,
/// in base-resolution pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub path: PathBuf,
    pub field: u32,
    pub channel: u32,
    pub z: u32,
    pub height: u32,
    pub width: u32,
    pub y: u64,
    pub x: u64,
}

/// Placement of one field of view inside the well frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldGeometry {
    pub field: u32,
    pub y: u64,
    pub x: u64,
    pub height: u32,
    pub width: u32,
}

// =============================================================================
// Well Acquisition
// =============================================================================

/// All tiles acquired for one well.
#[derive(Debug, Clone)]
pub struct WellAcquisition {
    name: String,
    row: String,
    row_index: u32,
    column: u32,
    sub_group: String,
    tiles: Vec<Tile>,
    channels: Vec<u32>,
    depth: u32,
}

impl WellAcquisition {
    /// Create a well from its name and tiles.
    ///
    /// `channels` is the plate-wide channel list, so every image of a plate
    /// has the same channel axis even if a well misses a channel.
    pub fn new(
        name: impl Into<String>,
        sub_group: impl Into<String>,
        tiles: Vec<Tile>,
        channels: Vec<u32>,
        depth: u32,
    ) -> Result<Self, AcquisitionError> {
        let name = name.into();
        let (row, column) = parse_well_name(&name)?;
        let row_index =
            row_index(&row).ok_or_else(|| AcquisitionError::InvalidWellName(name.clone()))?;

        Ok(Self {
            name,
            row,
            row_index,
            column,
            sub_group: sub_group.into(),
            tiles,
            channels,
            depth: depth.max(1),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row letter(s), e.g. `"A"`.
    pub fn row(&self) -> &str {
        &self.row
    }

    /// One-based column number.
    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn sub_group(&self) -> &str {
        &self.sub_group
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    /// Number of z planes in the fused image.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Store keys for the row and column nodes, e.g. `("A", "1")`.
    pub fn row_col(&self) -> (String, String) {
        (self.row.clone(), self.column.to_string())
    }

    /// Zero-based row index (`A` = 0, `Z` = 25, `AA` = 26).
    pub fn row_index(&self) -> u32 {
        self.row_index
    }

    /// Zero-based column index.
    pub fn column_index(&self) -> u32 {
        self.column - 1
    }

    /// Path of the well node relative to the store root.
    pub fn well_path(&self, plate_name: &str) -> String {
        let (row, col) = self.row_col();
        format!("{}/{}/{}", plate_name, row, col)
    }

    /// Path of the image node relative to the store root.
    pub fn image_path(&self, plate_name: &str) -> String {
        format!("{}/{}", self.well_path(plate_name), self.sub_group)
    }

    /// Distinct fields of view, sorted by field index.
    pub fn fields(&self) -> Vec<FieldGeometry> {
        let mut fields: Vec<FieldGeometry> = Vec::new();
        for tile in &self.tiles {
            if fields.iter().any(|f| f.field == tile.field) {
                continue;
            }
            fields.push(FieldGeometry {
                field: tile.field,
                y: tile.y,
                x: tile.x,
                height: tile.height,
                width: tile.width,
            });
        }
        fields.sort_by_key(|f| f.field);
        fields
    }

    /// Top-left corner of the fused frame, `(y, x)`.
    pub fn origin(&self) -> (u64, u64) {
        let y = self.tiles.iter().map(|t| t.y).min().unwrap_or(0);
        let x = self.tiles.iter().map(|t| t.x).min().unwrap_or(0);
        (y, x)
    }

    /// Size of the fused base-resolution frame, `(height, width)`.
    pub fn extent(&self) -> (u64, u64) {
        let (oy, ox) = self.origin();
        let bottom = self
            .tiles
            .iter()
            .map(|t| t.y + t.height as u64)
            .max()
            .unwrap_or(oy);
        let right = self
            .tiles
            .iter()
            .map(|t| t.x + t.width as u64)
            .max()
            .unwrap_or(ox);
        (bottom - oy, right - ox)
    }

    /// Base-resolution image shape as `[c, z, y, x]`.
    pub fn shape(&self) -> [u64; 4] {
        let (height, width) = self.extent();
        [
            self.channels.len() as u64,
            self.depth as u64,
            height,
            width,
        ]
    }

    /// Position of a channel on the image's channel axis.
    pub fn channel_index(&self, channel: u32) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }
}

// =============================================================================
// Plate Acquisition
// =============================================================================

/// A parsed plate acquisition. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct PlateAcquisition {
    acquisition_dir: PathBuf,
    mode: AcquisitionMode,
    alignment: TileAlignment,
    calibration: Calibration,
    channels: Vec<u32>,
    wells: Vec<WellAcquisition>,
}

impl PlateAcquisition {
    /// Assemble a plate; wells are ordered by row, then column.
    pub fn new(
        acquisition_dir: impl Into<PathBuf>,
        mode: AcquisitionMode,
        alignment: TileAlignment,
        calibration: Calibration,
        channels: Vec<u32>,
        mut wells: Vec<WellAcquisition>,
    ) -> Self {
        wells.sort_by_key(|w| (w.row_index(), w.column()));
        Self {
            acquisition_dir: acquisition_dir.into(),
            mode,
            alignment,
            calibration,
            channels,
            wells,
        }
    }

    pub fn acquisition_dir(&self) -> &Path {
        &self.acquisition_dir
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn alignment(&self) -> TileAlignment {
        self.alignment
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Channel (wavelength) indices, in channel-axis order.
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    /// Wells in registration order.
    pub fn wells(&self) -> &[WellAcquisition] {
        &self.wells
    }

    pub fn well(&self, name: &str) -> Option<&WellAcquisition> {
        self.wells.iter().find(|w| w.name() == name)
    }

    /// Largest number of fields acquired in any well.
    pub fn field_count(&self) -> usize {
        self.wells.iter().map(|w| w.fields().len()).max().unwrap_or(0)
    }
}

// =============================================================================
// Well Names
// =============================================================================

/// Split a well name such as `A01` into its row letters and column number.
pub fn parse_well_name(name: &str) -> Result<(String, u32), AcquisitionError> {
    let invalid = || AcquisitionError::InvalidWellName(name.to_string());

    let split = name
        .find(|c: char| !c.is_ascii_uppercase())
        .ok_or_else(invalid)?;
    let (row, column) = name.split_at(split);

    if row.is_empty() || column.is_empty() || !column.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if row_index(row).is_none() {
        return Err(invalid());
    }

    let column: u32 = column.parse().map_err(|_| invalid())?;
    if column == 0 {
        return Err(invalid());
    }

    Ok((row.to_string(), column))
}

/// Zero-based index of a row label; `None` when it does not fit a `u32`.
fn row_index(row: &str) -> Option<u32> {
    row.bytes()
        .try_fold(0u32, |acc, b| acc.checked_mul(26)?.checked_add((b - b'A') as u32 + 1))
        .map(|n| n.saturating_sub(1))
}

// =============================================================================
// Tests
// =============================================================================
