//! OME-NGFF 0.4 metadata documents.
//!
//! These structs serialize to the `.zattrs` content of plate, well and
//! image groups. Field names follow the NGFF specification, hence the
//! camelCase renames on the well entries.

use serde::{Deserialize, Serialize};

/// NGFF version written to every document.
pub const NGFF_VERSION: &str = "0.4";

// =============================================================================
// Plate
// =============================================================================

/// Plate group attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateAttrs {
    pub plate: PlateMetadata,

    /// Descriptive only; never used for addressing
    pub order_name: String,

    /// Descriptive only; never used for addressing
    pub barcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateMetadata {
    pub name: String,
    pub version: String,
    pub acquisitions: Vec<AcquisitionEntry>,
    pub field_count: usize,
    pub rows: Vec<NamedEntry>,
    pub columns: Vec<NamedEntry>,
    pub wells: Vec<WellEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellEntry {
    pub path: String,
    #[serde(rename = "rowIndex")]
    pub row_index: u32,
    #[serde(rename = "columnIndex")]
    pub column_index: u32,
}

// =============================================================================
// Well
// =============================================================================

/// Well group attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellAttrs {
    pub well: WellMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellMetadata {
    pub images: Vec<WellImage>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellImage {
    pub path: String,
    pub acquisition: u32,
}

// =============================================================================
// Image
// =============================================================================

/// Image group attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub multiscales: Vec<Multiscale>,
    pub omero: Omero,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiscale {
    pub name: String,
    pub version: String,
    pub axes: Vec<Axis>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unit: Option<String>,
}

impl Axis {
    pub fn channel(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: "channel".to_string(),
            unit: None,
        }
    }

    pub fn space(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: "space".to_string(),
            unit: Some("micrometer".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub path: String,
    #[serde(rename = "coordinateTransformations")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransformation {
    #[serde(rename = "type")]
    pub kind: String,
    pub scale: Vec<f64>,
}

impl CoordinateTransformation {
    pub fn scale(scale: Vec<f64>) -> Self {
        Self {
            kind: "scale".to_string(),
            scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Omero {
    pub channels: Vec<OmeroChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmeroChannel {
    pub label: String,
    pub wavelength_id: String,
    pub active: bool,
    pub window: ChannelWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelWindow {
    pub min: u16,
    pub max: u16,
    pub start: u16,
    pub end: u16,
}
