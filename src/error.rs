use std::path::{Path, PathBuf};

use thiserror::Error;

/// Invalid conversion parameters.
///
/// Raised while validating input, before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Acquisition mode identifier is not one of the known modes
    #[error(
        "Unknown acquisition mode '{0}': expected 'MD Stack Acquisition', \
         'MD Single Plane Acquisition' or 'MixedAcquisition'"
    )]
    UnknownMode(String),

    /// Plate layout is not a supported well count
    #[error("Unsupported plate layout {0}: expected 96 or 384")]
    InvalidLayout(u32),

    /// Pyramid coarsening factor must shrink each level
    #[error("Invalid coarsening factor {0}: must be at least 2")]
    InvalidCoarsening(u32),

    /// Chunk edge length must be positive
    #[error("Invalid chunk size {0}: must be greater than 0")]
    InvalidChunkSize(u32),

    /// Worker pool needs at least one worker
    #[error("Worker count must be greater than 0")]
    NoWorkers,

    /// Plate name would not form a valid store path
    #[error("Invalid plate name '{0}'")]
    InvalidPlateName(String),

    /// Well sub-group must be a single path component
    #[error("Invalid well sub-group '{0}'")]
    InvalidSubGroup(String),

    /// Physical calibration must be positive and finite
    #[error("Invalid calibration for {axis}: {value}")]
    InvalidCalibration { axis: &'static str, value: f64 },
}

/// Errors raised while building the in-memory acquisition model.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    /// Source directory does not exist
    #[error("Acquisition directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Source path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Walking the source tree failed
    #[error("Failed to scan {path}: {message}")]
    Scan { path: PathBuf, message: String },

    /// No tile matched the selected acquisition mode
    #[error("No tiles found in {path} for mode '{mode}'")]
    NoTiles { path: PathBuf, mode: String },

    /// Well name does not encode a row letter and column number
    #[error("Invalid well name '{0}'")]
    InvalidWellName(String),

    /// Two well names address the same row and column, e.g. `A01` and `A1`
    #[error("Wells '{first}' and '{second}' both map to row {row}, column {column}")]
    DuplicateWell {
        first: String,
        second: String,
        row: String,
        column: u32,
    },

    /// Derived data names a well the acquisition does not contain
    #[error("Unknown well '{0}'")]
    UnknownWell(String),

    /// Well does not fit the selected plate layout
    #[error("Well '{well}' is outside the {layout}-well layout")]
    WellOutsideLayout { well: String, layout: u32 },

    /// Tile file could not be read or decoded
    #[error("Failed to read tile {path}: {message}")]
    TileRead { path: PathBuf, message: String },

    /// Tiles of one well disagree on their pixel shape
    #[error("Tile {path} is {actual:?}, expected {expected:?} like the other tiles of well '{well}'")]
    TileShapeMismatch {
        well: String,
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Filesystem and encoding failures against the destination store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// I/O failure at a specific path
    #[error("I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Metadata could not be serialized or parsed
    #[error("Invalid JSON at {path}: {message}")]
    Json { path: PathBuf, message: String },

    /// Destination plate exists and overwrite was not requested
    #[error("Plate already exists at {0} (set overwrite to replace it)")]
    PlateExists(PathBuf),

    /// Expected group is missing from the store
    #[error("Store node not found: {0}")]
    NodeNotFound(PathBuf),

    /// Zarr store, group or array operation failed
    #[error("Zarr error at {path}: {message}")]
    Zarr { path: PathBuf, message: String },

    /// Array write does not match the declared array shape
    #[error("Shape mismatch writing {path}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        path: PathBuf,
        expected: Vec<u64>,
        actual: Vec<u64>,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn json(path: impl AsRef<Path>, err: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn zarr(path: impl AsRef<Path>, err: impl std::fmt::Display) -> Self {
        StoreError::Zarr {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Errors raised while attaching ROI tables to an image.
#[derive(Debug, Clone, Error)]
pub enum TableError {
    /// Table already exists and overwrite was not requested
    #[error("Table '{table}' already exists in {image} (overwrite is disabled)")]
    Conflict { image: PathBuf, table: String },

    /// Table name cannot be used as a store key
    #[error("Invalid table name '{0}'")]
    InvalidName(String),

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Worker pool failures.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// Jobs were submitted after shutdown
    #[error("Worker pool is shut down")]
    Closed,

    /// A job panicked or was cancelled
    #[error("Worker failed: {0}")]
    Join(String),
}

/// Any failure that aborts a conversion run.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Filesystem error: {0}")]
    Store(#[from] StoreError),

    #[error("Metadata error: {0}")]
    Table(#[from] TableError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}
