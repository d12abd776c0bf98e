//! Per-well conversion into multiscale image groups.
//!
//! ```text
//! tiles ──► Warp ──► Fuse ──► level 0 ──► coarsen ──► level 1 ──► ... ──► level N
//!                                │                      │                   │
//!                                ▼                      ▼                   ▼
//!                          <image>/0              <image>/1           <image>/N
//! ```
//!
//! Every well becomes one job on the [`WorkerPool`]. Jobs write disjoint
//! image groups, so they never contend for a store node.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::acquisition::{Calibration, PlateAcquisition, WellAcquisition};
use crate::error::{ConfigError, ConvertError};
use crate::store::ngff::{
    Axis, ChannelWindow, CoordinateTransformation, Dataset, ImageAttrs, Multiscale, Omero,
    OmeroChannel, NGFF_VERSION,
};
use crate::store::zarr::write_attrs;
use crate::store::{Plate, ZarrArray};

use super::pool::WorkerPool;
use super::pyramid::PyramidSpec;
use super::stitch::{stitch_well, Fuse, MeanFuse, TranslationWarp, Volume, Warp};

/// Default chunk edge length along y and x.
pub const DEFAULT_CHUNK_SIZE: u32 = 1024;

/// One converted well image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    /// Well name, e.g. `A01`
    pub well: String,

    /// Image path relative to the store root, e.g. `Plate.zarr/A/1/0`
    pub path: String,

    /// Number of resolution levels written
    pub levels: usize,
}

/// Stitches wells and writes their resolution pyramids.
#[derive(Clone)]
pub struct PyramidConversionEngine {
    warp: Arc<dyn Warp>,
    fuse: Arc<dyn Fuse>,
    pyramid: PyramidSpec,
    chunk_size: u32,
}

impl PyramidConversionEngine {
    /// Engine with translation registration and mean fusion.
    pub fn new(pyramid: PyramidSpec, chunk_size: u32) -> Result<Self, ConfigError> {
        Self::with_kernels(pyramid, chunk_size, Arc::new(TranslationWarp), Arc::new(MeanFuse))
    }

    /// Engine with custom registration and fusion kernels.
    pub fn with_kernels(
        pyramid: PyramidSpec,
        chunk_size: u32,
        warp: Arc<dyn Warp>,
        fuse: Arc<dyn Fuse>,
    ) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(chunk_size));
        }
        Ok(Self {
            warp,
            fuse,
            pyramid,
            chunk_size,
        })
    }

    pub fn pyramid(&self) -> PyramidSpec {
        self.pyramid
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Convert every well of the acquisition into its image group.
    ///
    /// Returns once every job has finished. Results follow the order of
    /// [`PlateAcquisition::wells`].
    pub async fn convert(
        &self,
        plate: &Plate,
        acquisition: &PlateAcquisition,
        pool: &WorkerPool,
    ) -> Result<Vec<ConvertedImage>, ConvertError> {
        let calibration = acquisition.calibration();
        let mut jobs = Vec::with_capacity(acquisition.wells().len());

        for well in acquisition.wells() {
            let (row, column) = well.row_col();
            let image_group = plate.image_group(&row, &column, well.sub_group())?;
            let image_name = well.image_path(plate.name());
            let engine = self.clone();
            let well = well.clone();
            jobs.push(move || engine.convert_well(&well, &image_group, &image_name, calibration));
        }

        info!(
            "Converting {} well(s) with {} worker(s)",
            jobs.len(),
            pool.workers()
        );
        let images = pool.run_all(jobs).await?;
        info!("Converted {} image(s)", images.len());
        Ok(images)
    }

    /// Stitch one well and write its pyramid and image metadata.
    pub fn convert_well(
        &self,
        well: &WellAcquisition,
        image_group: &Path,
        image_name: &str,
        calibration: Calibration,
    ) -> Result<ConvertedImage, ConvertError> {
        debug!("Stitching well {} ({} tiles)", well.name(), well.tiles().len());
        let base = stitch_well(well, self.warp.as_ref(), self.fuse.as_ref())?;
        let attrs = self.image_attrs(well, &base, calibration);
        let levels = self.pyramid.build(base);

        let chunks = [1, 1, self.chunk_size as u64, self.chunk_size as u64];
        for (level, volume) in levels.iter().enumerate() {
            let array = ZarrArray::create::<u16>(
                &level_path(image_group, level),
                &volume.shape_u64(),
                &chunks,
            )?;
            array.write(volume.data())?;
            debug!(
                "Wrote {} level {} with shape {:?}",
                image_name,
                level,
                volume.shape()
            );
        }

        write_attrs(image_group, &attrs)?;

        Ok(ConvertedImage {
            well: well.name().to_string(),
            path: image_name.to_string(),
            levels: levels.len(),
        })
    }

    fn image_attrs(
        &self,
        well: &WellAcquisition,
        base: &Volume,
        calibration: Calibration,
    ) -> ImageAttrs {
        let datasets = (0..self.pyramid.level_count())
            .map(|level| {
                let xy = calibration.pixel_size_um * self.pyramid.downsample(level) as f64;
                Dataset {
                    path: level.to_string(),
                    coordinate_transformations: vec![CoordinateTransformation::scale(vec![
                        1.0,
                        calibration.z_spacing_um,
                        xy,
                        xy,
                    ])],
                }
            })
            .collect();

        let channels = well
            .channels()
            .iter()
            .enumerate()
            .map(|(index, channel)| {
                let (start, end) = base.channel_range(index);
                OmeroChannel {
                    label: format!("w{}", channel),
                    wavelength_id: format!("w{}", channel),
                    active: true,
                    window: ChannelWindow {
                        min: 0,
                        max: u16::MAX,
                        start,
                        end,
                    },
                }
            })
            .collect();

        ImageAttrs {
            multiscales: vec![Multiscale {
                name: well.name().to_string(),
                version: NGFF_VERSION.to_string(),
                axes: vec![
                    Axis::channel("c"),
                    Axis::space("z"),
                    Axis::space("y"),
                    Axis::space("x"),
                ],
                datasets,
            }],
            omero: Omero { channels },
        }
    }
}

impl std::fmt::Debug for PyramidConversionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidConversionEngine")
            .field("pyramid", &self.pyramid)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

fn level_path(image_group: &Path, level: usize) -> PathBuf {
    image_group.join(level.to_string())
}

// =============================================================================
// Tests
// =============================================================================
