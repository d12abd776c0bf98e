//! Tile placement and fusion.
//!
//! Stitching happens in two steps with pluggable kernels:
//!
//! 1. [`Warp`] moves every tile plane into the well frame. The default
//!    [`TranslationWarp`] applies the grid offset only.
//! 2. [`Fuse`] blends the warped planes into one `[c, z, y, x]` volume.
//!    The default [`MeanFuse`] averages overlapping pixels.

use std::path::Path;

use crate::acquisition::{Tile, WellAcquisition};
use crate::error::AcquisitionError;

// =============================================================================
// Volume
// =============================================================================

/// A dense 16-bit image with axes `[c, z, y, x]`, stored in C order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    shape: [usize; 4],
    data: Vec<u16>,
}

impl Volume {
    /// A zero-filled volume.
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![0; shape.iter().product()],
        }
    }

    /// Wrap existing data; `None` if the length does not match `shape`.
    pub fn from_vec(shape: [usize; 4], data: Vec<u16>) -> Option<Self> {
        (data.len() == shape.iter().product::<usize>()).then_some(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Shape as `u64`, the way arrays are declared in the store.
    pub fn shape_u64(&self) -> [u64; 4] {
        self.shape.map(|d| d as u64)
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.data
    }

    /// Flat index of `(c, z, y, x)`.
    #[inline]
    pub fn index(&self, c: usize, z: usize, y: usize, x: usize) -> usize {
        let [_, nz, ny, nx] = self.shape;
        ((c * nz + z) * ny + y) * nx + x
    }

    pub fn get(&self, c: usize, z: usize, y: usize, x: usize) -> u16 {
        self.data[self.index(c, z, y, x)]
    }

    /// Smallest and largest value per channel.
    pub fn channel_range(&self, c: usize) -> (u16, u16) {
        let [_, nz, ny, nx] = self.shape;
        let plane = nz * ny * nx;
        let start = c * plane;
        self.data
            .get(start..start + plane)
            .unwrap_or(&[])
            .iter()
            .fold(None, |acc: Option<(u16, u16)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0, 0))
    }
}

// =============================================================================
// Warp
// =============================================================================

/// A tile plane positioned in the well frame.
#[derive(Debug, Clone)]
pub struct WarpedTile {
    pub channel: usize,
    pub z: usize,
    pub y: usize,
    pub x: usize,
    pub height: usize,
    pub width: usize,
    pub data: Vec<u16>,
}

/// Places one tile plane into the well frame.
pub trait Warp: Send + Sync {
    /// `origin` is the well's top-left corner; `channel` the position on the
    /// channel axis.
    fn warp(&self, tile: &Tile, pixels: Vec<u16>, origin: (u64, u64), channel: usize)
        -> WarpedTile;
}

/// Translation-only registration: tiles keep their pixels and move to their
/// stage offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationWarp;

impl Warp for TranslationWarp {
    fn warp(
        &self,
        tile: &Tile,
        pixels: Vec<u16>,
        origin: (u64, u64),
        channel: usize,
    ) -> WarpedTile {
        WarpedTile {
            channel,
            z: tile.z as usize,
            y: (tile.y - origin.0) as usize,
            x: (tile.x - origin.1) as usize,
            height: tile.height as usize,
            width: tile.width as usize,
            data: pixels,
        }
    }
}

// =============================================================================
// Fuse
// =============================================================================

/// Blends warped tiles into a single volume.
pub trait Fuse: Send + Sync {
    fn fuse(&self, shape: [usize; 4], tiles: &[WarpedTile]) -> Volume;
}

/// Mean blending; pixels no tile covers stay 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanFuse;

impl Fuse for MeanFuse {
    fn fuse(&self, shape: [usize; 4], tiles: &[WarpedTile]) -> Volume {
        let len: usize = shape.iter().product();
        let mut sums = vec![0u32; len];
        let mut counts = vec![0u16; len];
        let mut volume = Volume::zeros(shape);
        let [nc, nz, ny, nx] = shape;

        for tile in tiles {
            if tile.channel >= nc || tile.z >= nz {
                continue;
            }
            let rows = tile.height.min(ny.saturating_sub(tile.y));
            let cols = tile.width.min(nx.saturating_sub(tile.x));

            for r in 0..rows {
                let src = r * tile.width;
                let dst = volume.index(tile.channel, tile.z, tile.y + r, tile.x);
                for c in 0..cols {
                    sums[dst + c] += tile.data[src + c] as u32;
                    counts[dst + c] += 1;
                }
            }
        }

        for ((out, &sum), &count) in volume.data.iter_mut().zip(&sums).zip(&counts) {
            if count > 0 {
                let count = count as u32;
                *out = ((sum + count / 2) / count) as u16;
            }
        }
        volume
    }
}

// =============================================================================
// Stitching
// =============================================================================

/// Read a tile plane as 16-bit grayscale pixels.
pub fn load_tile(path: &Path) -> Result<Vec<u16>, AcquisitionError> {
    let img = image::open(path).map_err(|e| AcquisitionError::TileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(img.to_luma16().into_raw())
}

/// Load, warp and fuse every tile of a well into its base-resolution volume.
pub fn stitch_well<W: Warp + ?Sized, F: Fuse + ?Sized>(
    well: &WellAcquisition,
    warp: &W,
    fuse: &F,
) -> Result<Volume, AcquisitionError> {
    let origin = well.origin();
    let shape = well.shape().map(|d| d as usize);

    let mut warped = Vec::with_capacity(well.tiles().len());
    for tile in well.tiles() {
        let Some(channel) = well.channel_index(tile.channel) else {
            continue;
        };
        let pixels = load_tile(&tile.path)?;
        let expected = tile.height as usize * tile.width as usize;
        if pixels.len() != expected {
            return Err(AcquisitionError::TileRead {
                path: tile.path.clone(),
                message: format!("expected {} pixels, decoded {}", expected, pixels.len()),
            });
        }
        warped.push(warp.warp(tile, pixels, origin, channel));
    }

    Ok(fuse.fuse(shape, &warped))
}

// =============================================================================
// Tests
// =============================================================================
