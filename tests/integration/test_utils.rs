//! Test utilities for integration tests.
//!
//! This module writes synthetic ImageXpress exports (16-bit TIFF tiles in
//! the MetaXpress directory layout) and inspects the resulting stores.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};
use walkdir::WalkDir;

use plate_ngff::ConvertRequest;

/// Default tile width in pixels.
pub const TILE_WIDTH: u32 = 16;

/// Default tile height in pixels.
pub const TILE_HEIGHT: u32 = 12;

// =============================================================================
// Synthetic Exports
// =============================================================================

/// Writes tiles into a MetaXpress-style directory tree.
pub struct ExportBuilder {
    root: PathBuf,
    plate: String,
    width: u32,
    height: u32,
}

impl ExportBuilder {
    /// Export rooted at `root`, which is created if missing.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        std::fs::create_dir_all(&root).unwrap();
        Self {
            root,
            plate: "Plate1".to_string(),
            width: TILE_WIDTH,
            height: TILE_HEIGHT,
        }
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn time_point(&self) -> PathBuf {
        self.root.join("2024-05-02").join("1234").join("TimePoint_1")
    }

    fn file_name(&self, well: &str, field: u32, channel: u32) -> String {
        format!(
            "{}_{}_s{}_w{}E94C24BD-45E4-450A-9919-257C714278F7.tif",
            self.plate, well, field, channel
        )
    }

    /// A plane of a z-stack, stored under `ZStep_<z>` (one-based).
    pub fn stack_tile(&self, well: &str, field: u32, channel: u32, z: u32, value: u16) -> PathBuf {
        let dir = self.time_point().join(format!("ZStep_{}", z));
        self.write(&dir, &self.file_name(well, field, channel), value)
    }

    /// A single plane (or projection), stored directly in the time point.
    pub fn plane_tile(&self, well: &str, field: u32, channel: u32, value: u16) -> PathBuf {
        let dir = self.time_point();
        self.write(&dir, &self.file_name(well, field, channel), value)
    }

    /// A thumbnail next to the single planes.
    pub fn thumbnail(&self, well: &str, field: u32, channel: u32) -> PathBuf {
        let name = format!("{}_{}_s{}_w{}_thumb0001.tif", self.plate, well, field, channel);
        self.write(&self.time_point(), &name, 1)
    }

    /// Every field of a well as a full stack for one channel.
    pub fn stack_well(&self, well: &str, fields: u32, depth: u32) {
        for field in 1..=fields {
            for z in 1..=depth {
                self.stack_tile(well, field, 1, z, (field * 100 + z) as u16);
            }
        }
    }

    fn write(&self, dir: &Path, name: &str, value: u16) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(self.width, self.height, Luma([value]));
        img.save(&path).unwrap();
        path
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A request writing into `<dir>/zarr` from `<dir>/export`, with small chunks.
pub fn request_in(dir: &Path) -> ConvertRequest {
    let mut request = ConvertRequest::new(dir.join("zarr"), dir.join("export"));
    request.chunk_size = 8;
    request
}

// =============================================================================
// Store Inspection
// =============================================================================

/// All files below `root`, relative and sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// Parsed `.zattrs` of a node.
pub fn attrs(node: &Path) -> serde_json::Value {
    let bytes = std::fs::read(node.join(".zattrs")).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Whether `node` is a Zarr group.
pub fn is_group(node: &Path) -> bool {
    node.join(".zgroup").is_file()
}
