//! Resolution pyramids.
//!
//! Level 0 is the fused base image. Every further level shrinks y and x by
//! `coarsening_xy` (block mean, ceil division) and leaves c and z alone, so
//! level `n` is `coarsening_xy^n` times smaller than the base along y and x.

use crate::error::ConfigError;

use super::stitch::Volume;

/// Default linear coarsening factor between levels.
pub const DEFAULT_COARSENING_XY: u32 = 2;

/// Default number of coarsened levels above the base.
pub const DEFAULT_MAX_LEVELS: u32 = 3;

/// How many levels to build and how much each one shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidSpec {
    coarsening_xy: u32,
    max_levels: u32,
}

impl PyramidSpec {
    pub fn new(coarsening_xy: u32, max_levels: u32) -> Result<Self, ConfigError> {
        if coarsening_xy < 2 {
            return Err(ConfigError::InvalidCoarsening(coarsening_xy));
        }
        Ok(Self {
            coarsening_xy,
            max_levels,
        })
    }

    pub fn coarsening_xy(&self) -> u32 {
        self.coarsening_xy
    }

    pub fn max_levels(&self) -> u32 {
        self.max_levels
    }

    /// Total number of levels written, base included.
    pub fn level_count(&self) -> usize {
        self.max_levels as usize + 1
    }

    /// Linear y/x downsampling of `level` relative to the base.
    pub fn downsample(&self, level: usize) -> u64 {
        (self.coarsening_xy as u64).pow(level as u32)
    }

    /// Shape of `level` for a given base shape `[c, z, y, x]`.
    pub fn level_shape(&self, base: [u64; 4], level: usize) -> [u64; 4] {
        let factor = self.downsample(level);
        [
            base[0],
            base[1],
            base[2].div_ceil(factor).max(1),
            base[3].div_ceil(factor).max(1),
        ]
    }

    /// Build every level from the base volume.
    pub fn build(&self, base: Volume) -> Vec<Volume> {
        let mut levels = Vec::with_capacity(self.level_count());
        levels.push(base);
        for _ in 1..self.level_count() {
            let next = match levels.last() {
                Some(prev) => coarsen(prev, self.coarsening_xy as usize),
                None => break,
            };
            levels.push(next);
        }
        levels
    }
}

impl Default for PyramidSpec {
    fn default() -> Self {
        Self {
            coarsening_xy: DEFAULT_COARSENING_XY,
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}

/// Number of coarsening steps needed to bring `base_extent` down to at
/// most `target_extent`.
pub fn levels_needed(base_extent: u64, target_extent: u64, coarsening_xy: u32) -> u32 {
    let factor = coarsening_xy.max(2) as u64;
    let target = target_extent.max(1);
    let mut extent = base_extent;
    let mut steps = 0;
    while extent > target {
        extent = extent.div_ceil(factor);
        steps += 1;
    }
    steps
}

/// Block-mean downsampling along y and x.
///
/// Blocks at the right and bottom edges average only the pixels they cover.
pub fn coarsen(volume: &Volume, factor: usize) -> Volume {
    let [nc, nz, ny, nx] = volume.shape();
    let factor = factor.max(1);
    let oy = ny.div_ceil(factor).max(1);
    let ox = nx.div_ceil(factor).max(1);
    let shape = [nc, nz, oy, ox];
    let mut data = Vec::with_capacity(nc * nz * oy * ox);

    for c in 0..nc {
        for z in 0..nz {
            for by in 0..oy {
                let y0 = by * factor;
                let y1 = (y0 + factor).min(ny);
                for bx in 0..ox {
                    let x0 = bx * factor;
                    let x1 = (x0 + factor).min(nx);

                    let mut sum = 0u64;
                    let mut count = 0u64;
                    for y in y0..y1 {
                        for x in x0..x1 {
                            sum += volume.get(c, z, y, x) as u64;
                            count += 1;
                        }
                    }
                    data.push(if count == 0 {
                        0
                    } else {
                        ((sum + count / 2) / count) as u16
                    });
                }
            }
        }
    }

    Volume::from_vec(shape, data).unwrap_or_else(|| Volume::zeros(shape))
}
