//! Zarr v2 groups and arrays on the local filesystem.
//!
//! Nodes are addressed by their directory. Each operation opens a
//! [`FilesystemStore`] rooted at the node and works on the root node `/`,
//! so callers can keep moving whole subtrees around with plain renames.
//!
//! Arrays are uncompressed, C-ordered and use `/`-separated chunk keys.
//! Numeric arrays hold [`NumericElement`]s; string arrays use the `|O`
//! dtype with a `vlen-utf8` filter, as AnnData writes its indices.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use zarrs::array::{Array, ArrayMetadata, Element, ElementOwned};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::{Group, GroupMetadata};

use crate::error::StoreError;

/// Zarr storage format version written by this module.
pub const ZARR_FORMAT: u8 = 2;

const ZGROUP: &str = ".zgroup";
const ZARRAY: &str = ".zarray";

/// Root node of a store opened on a node directory.
const ROOT: &str = "/";

fn open_store(path: &Path) -> Result<Arc<FilesystemStore>, StoreError> {
    FilesystemStore::new(path)
        .map(Arc::new)
        .map_err(|e| StoreError::zarr(path, e))
}

fn parse_metadata<T: DeserializeOwned>(path: &Path, document: Value) -> Result<T, StoreError> {
    serde_json::from_value(document).map_err(|e| StoreError::json(path, e))
}

// =============================================================================
// Groups and Attributes
// =============================================================================

/// Create a group at `path`, including missing parents.
///
/// Existing groups are left untouched.
pub fn create_group(path: &Path) -> Result<(), StoreError> {
    if is_group(path) {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))?;

    let metadata: GroupMetadata = parse_metadata(path, json!({ "zarr_format": ZARR_FORMAT }))?;
    let group = Group::new_with_metadata(open_store(path)?, ROOT, metadata)
        .map_err(|e| StoreError::zarr(path, e))?;
    group.store_metadata().map_err(|e| StoreError::zarr(path, e))
}

/// Whether `path` holds a group.
pub fn is_group(path: &Path) -> bool {
    path.join(ZGROUP).is_file()
}

fn open_group(path: &Path) -> Result<Group<FilesystemStore>, StoreError> {
    if !is_group(path) {
        return Err(StoreError::NodeNotFound(path.to_path_buf()));
    }
    Group::open(open_store(path)?, ROOT).map_err(|e| StoreError::zarr(path, e))
}

/// Read the attributes of a group; a missing group yields `{}`.
pub fn read_attrs(path: &Path) -> Result<Map<String, Value>, StoreError> {
    if !is_group(path) {
        return Ok(Map::new());
    }
    Ok(open_group(path)?.attributes().clone())
}

/// Replace the attributes of a group.
pub fn write_attrs<T: Serialize>(path: &Path, attrs: &T) -> Result<(), StoreError> {
    let attrs = match serde_json::to_value(attrs).map_err(|e| StoreError::json(path, e))? {
        Value::Object(map) => map,
        _ => {
            return Err(StoreError::Json {
                path: path.to_path_buf(),
                message: "attributes must be a JSON object".to_string(),
            })
        }
    };

    let mut group = open_group(path)?;
    *group.attributes_mut() = attrs;
    group.store_metadata().map_err(|e| StoreError::zarr(path, e))
}

/// Merge top-level keys into the attributes of a group.
pub fn update_attrs(path: &Path, updates: Map<String, Value>) -> Result<(), StoreError> {
    let mut group = open_group(path)?;
    group.attributes_mut().extend(updates);
    group.store_metadata().map_err(|e| StoreError::zarr(path, e))
}

// =============================================================================
// Element Types
// =============================================================================

/// Numeric element types stored by the converter.
pub trait NumericElement: Element + ElementOwned + Copy + Send + Sync + 'static {
    /// NumPy-style dtype string, e.g. `<u2`
    const DTYPE: &'static str;

    /// Fill value as written to `.zarray`.
    fn fill_value() -> Value;
}

impl NumericElement for u16 {
    const DTYPE: &'static str = "<u2";

    fn fill_value() -> Value {
        json!(0)
    }
}

impl NumericElement for f32 {
    const DTYPE: &'static str = "<f4";

    fn fill_value() -> Value {
        json!(0.0)
    }
}

// =============================================================================
// Arrays
// =============================================================================

/// Handle on an array stored in a directory.
pub struct ZarrArray {
    path: PathBuf,
    array: Array<FilesystemStore>,
}

impl ZarrArray {
    /// Create a numeric array, replacing any previous metadata.
    ///
    /// Chunks larger than the array are clamped to its shape.
    pub fn create<T: NumericElement>(
        path: &Path,
        shape: &[u64],
        chunks: &[u64],
    ) -> Result<Self, StoreError> {
        let chunks: Vec<u64> = chunks
            .iter()
            .zip(shape)
            .map(|(&c, &s)| c.min(s).max(1))
            .collect();
        Self::create_with(
            path,
            json!({
                "zarr_format": ZARR_FORMAT,
                "shape": shape,
                "chunks": chunks,
                "dtype": T::DTYPE,
                "compressor": null,
                "fill_value": T::fill_value(),
                "order": "C",
                "filters": null,
                "dimension_separator": "/",
            }),
        )
    }

    /// Create and fill a one-dimensional string array.
    pub fn create_strings(path: &Path, values: &[String]) -> Result<Self, StoreError> {
        let len = values.len() as u64;
        let array = Self::create_with(
            path,
            json!({
                "zarr_format": ZARR_FORMAT,
                "shape": [len],
                "chunks": [len.max(1)],
                "dtype": "|O",
                "compressor": null,
                "fill_value": null,
                "order": "C",
                "filters": [{ "id": "vlen-utf8" }],
                "dimension_separator": "/",
            }),
        )?;
        array.store(values)?;
        Ok(array)
    }

    fn create_with(path: &Path, document: Value) -> Result<Self, StoreError> {
        fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))?;
        let metadata: ArrayMetadata = parse_metadata(path, document)?;
        let array = Array::new_with_metadata(open_store(path)?, ROOT, metadata)
            .map_err(|e| StoreError::zarr(path, e))?;
        array
            .store_metadata()
            .map_err(|e| StoreError::zarr(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            array,
        })
    }

    /// Open an existing array.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.join(ZARRAY).is_file() {
            return Err(StoreError::NodeNotFound(path.to_path_buf()));
        }
        let array = Array::open(open_store(path)?, ROOT).map_err(|e| StoreError::zarr(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            array,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> &[u64] {
        self.array.shape()
    }

    /// Chunk shape of the regular chunk grid.
    pub fn chunks(&self) -> Result<Vec<u64>, StoreError> {
        let origin = vec![0; self.shape().len()];
        let chunk = self
            .array
            .chunk_shape(&origin)
            .map_err(|e| StoreError::zarr(&self.path, e))?;
        Ok(chunk.iter().map(|c| c.get()).collect())
    }

    fn element_count(&self) -> u64 {
        self.shape().iter().product()
    }

    /// Write the whole array from C-ordered elements.
    pub fn write<T: NumericElement>(&self, data: &[T]) -> Result<(), StoreError> {
        self.store(data)
    }

    /// Read the whole array into C-ordered elements.
    pub fn read<T: NumericElement>(&self) -> Result<Vec<T>, StoreError> {
        self.retrieve()
    }

    /// Read a one-dimensional string array.
    pub fn read_strings(&self) -> Result<Vec<String>, StoreError> {
        self.retrieve()
    }

    fn store<T: Element>(&self, data: &[T]) -> Result<(), StoreError> {
        if data.len() as u64 != self.element_count() {
            return Err(StoreError::ShapeMismatch {
                path: self.path.clone(),
                expected: self.shape().to_vec(),
                actual: vec![data.len() as u64],
            });
        }
        if data.is_empty() {
            return Ok(());
        }

        let subset = ArraySubset::new_with_shape(self.shape().to_vec());
        self.array
            .store_array_subset_elements(&subset, data)
            .map_err(|e| StoreError::zarr(&self.path, e))
    }

    fn retrieve<T: ElementOwned>(&self) -> Result<Vec<T>, StoreError> {
        if self.element_count() == 0 {
            return Ok(Vec::new());
        }

        let subset = ArraySubset::new_with_shape(self.shape().to_vec());
        self.array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| StoreError::zarr(&self.path, e))
    }
}

impl fmt::Debug for ZarrArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZarrArray")
            .field("path", &self.path)
            .field("shape", &self.shape())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
