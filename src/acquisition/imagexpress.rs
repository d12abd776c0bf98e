//! ImageXpress export parser.
//!
//! MetaXpress writes one TIFF per field, channel and plane:
//!
//! ```text
//! <image_dir>/<date>/<acquisition id>/TimePoint_1/ZStep_3/Plate_B03_s2_w1<uuid>.tif
//!                                     └── stack planes ──┘
//! <image_dir>/<date>/<acquisition id>/TimePoint_1/Plate_B03_s2_w1<uuid>.tif
//!                                     └── single planes (or projections)
//! ```
//!
//! Thumbnails (`..._w1_thumb<uuid>.tif`) are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::AcquisitionError;

use super::mode::{AcquisitionMode, TileAlignment};
use super::model::{parse_well_name, Calibration, PlateAcquisition, Tile, WellAcquisition};

/// Decoded components of a tile file name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TileName {
    well: String,
    field: u32,
    channel: u32,
}

/// A tile file before grid placement.
#[derive(Debug, Clone)]
struct RawTile {
    path: PathBuf,
    name: TileName,
    /// `None` for files outside any `ZStep_<n>` directory
    z_step: Option<u32>,
}

fn tile_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.+_(?P<well>[A-Z]+\d{1,3})_s(?P<field>\d+)_w(?P<channel>\d)(?P<suffix>[^.]*)\.(?i:tiff?)$")
            .expect("tile name pattern is valid")
    })
}

fn z_step_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ZStep_(?P<z>\d+)$").expect("z-step pattern is valid"))
}

fn parse_tile_name(file_name: &str) -> Option<TileName> {
    let caps = tile_name_regex().captures(file_name)?;
    if caps["suffix"].starts_with("_thumb") {
        return None;
    }

    Some(TileName {
        well: caps["well"].to_string(),
        field: caps["field"].parse().ok()?,
        channel: caps["channel"].parse().ok()?,
    })
}

/// One-based `ZStep_<n>` index of the directory holding `path`, if any.
fn parse_z_step(path: &Path) -> Option<u32> {
    let parent = path.parent()?.file_name()?.to_str()?;
    let caps = z_step_regex().captures(parent)?;
    caps["z"].parse().ok()
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse an ImageXpress export into a [`PlateAcquisition`].
///
/// Fields of each well are placed on a row-major grid with
/// `ceil(sqrt(n_fields))` columns; every grid cell has the tile's size.
pub fn parse_acquisition(
    image_dir: &Path,
    mode: AcquisitionMode,
    alignment: TileAlignment,
    calibration: Calibration,
    well_sub_group: &str,
) -> Result<PlateAcquisition, AcquisitionError> {
    if !image_dir.exists() {
        return Err(AcquisitionError::DirectoryNotFound(image_dir.to_path_buf()));
    }
    if !image_dir.is_dir() {
        return Err(AcquisitionError::NotADirectory(image_dir.to_path_buf()));
    }

    let mut raw_tiles = scan_tiles(image_dir, mode)?;
    if mode == AcquisitionMode::MixedAcquisition {
        drop_stacked_projections(&mut raw_tiles);
    }
    if raw_tiles.is_empty() {
        return Err(AcquisitionError::NoTiles {
            path: image_dir.to_path_buf(),
            mode: mode.to_string(),
        });
    }

    let channels: Vec<u32> = raw_tiles
        .iter()
        .map(|t| t.name.channel)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let depth = raw_tiles
        .iter()
        .filter_map(|t| t.z_step)
        .max()
        .unwrap_or(1);

    let mut by_well: BTreeMap<String, Vec<RawTile>> = BTreeMap::new();
    for tile in raw_tiles {
        by_well.entry(tile.name.well.clone()).or_default().push(tile);
    }

    let mut wells = Vec::with_capacity(by_well.len());
    let mut positions: BTreeMap<(String, u32), String> = BTreeMap::new();
    for (name, tiles) in by_well {
        let (row, column) = parse_well_name(&name)?;
        if let Some(first) = positions.insert((row.clone(), column), name.clone()) {
            return Err(AcquisitionError::DuplicateWell {
                first,
                second: name,
                row,
                column,
            });
        }

        let tiles = place_on_grid(&name, tiles)?;
        debug!("Well {}: {} tile files", name, tiles.len());
        wells.push(WellAcquisition::new(
            name,
            well_sub_group,
            tiles,
            channels.clone(),
            depth,
        )?);
    }

    info!(
        "Parsed {} well(s), {} channel(s), {} plane(s) from {}",
        wells.len(),
        channels.len(),
        depth,
        image_dir.display()
    );

    Ok(PlateAcquisition::new(
        image_dir,
        mode,
        alignment,
        calibration,
        channels,
        wells,
    ))
}

fn scan_tiles(image_dir: &Path, mode: AcquisitionMode) -> Result<Vec<RawTile>, AcquisitionError> {
    let mut tiles = Vec::new();

    let walker = WalkDir::new(image_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = entry.map_err(|e| AcquisitionError::Scan {
            path: image_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            warn!("Skipping non UTF-8 file name: {}", entry.path().display());
            continue;
        };
        let Some(name) = parse_tile_name(file_name) else {
            continue;
        };

        let z_step = parse_z_step(entry.path());
        let selected = match z_step {
            Some(_) => mode.reads_stacks(),
            None => mode.reads_single_planes(),
        };
        if !selected {
            continue;
        }

        tiles.push(RawTile {
            path: entry.path().to_path_buf(),
            name,
            z_step,
        });
    }

    Ok(tiles)
}

/// In mixed exports a channel acquired as a stack also has a projection
/// outside the `ZStep_<n>` directories; only the stack planes are kept.
fn drop_stacked_projections(tiles: &mut Vec<RawTile>) {
    let stacked: BTreeSet<(String, u32, u32)> = tiles
        .iter()
        .filter(|t| t.z_step.is_some())
        .map(|t| (t.name.well.clone(), t.name.field, t.name.channel))
        .collect();

    tiles.retain(|t| {
        t.z_step.is_some()
            || !stacked.contains(&(t.name.well.clone(), t.name.field, t.name.channel))
    });
}

fn place_on_grid(well: &str, raw: Vec<RawTile>) -> Result<Vec<Tile>, AcquisitionError> {
    let fields: Vec<u32> = raw
        .iter()
        .map(|t| t.name.field)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let grid_columns = grid_columns(fields.len());

    let mut expected: Option<(u32, u32)> = None;
    let mut tiles = Vec::with_capacity(raw.len());

    for tile in raw {
        let (width, height) =
            image::image_dimensions(&tile.path).map_err(|e| AcquisitionError::TileRead {
                path: tile.path.clone(),
                message: e.to_string(),
            })?;

        match expected {
            None => expected = Some((height, width)),
            Some(shape) if shape != (height, width) => {
                return Err(AcquisitionError::TileShapeMismatch {
                    well: well.to_string(),
                    path: tile.path,
                    expected: shape,
                    actual: (height, width),
                });
            }
            Some(_) => {}
        }

        let cell = fields
            .iter()
            .position(|&f| f == tile.name.field)
            .unwrap_or(0);
        let grid_row = (cell / grid_columns) as u64;
        let grid_col = (cell % grid_columns) as u64;

        tiles.push(Tile {
            path: tile.path,
            field: tile.name.field,
            channel: tile.name.channel,
            z: tile.z_step.map(|z| z.saturating_sub(1)).unwrap_or(0),
            height,
            width,
            y: grid_row * height as u64,
            x: grid_col * width as u64,
        });
    }

    Ok(tiles)
}

/// Columns of the field grid: the smallest square that holds every field.
fn grid_columns(field_count: usize) -> usize {
    let mut columns = 1;
    while columns * columns < field_count {
        columns += 1;
    }
    columns
}

// =============================================================================
// Tests
// =============================================================================
