//! End-to-end pipeline integration tests.
//!
//! Tests verify:
//! - A stack export converts into `Plate.zarr/<row>/<col>/0` with a pyramid
//! - The summary lists every created plate, well and image path
//! - Existing plates are replaced with `overwrite` and refused without it
//! - Invalid input fails before the destination is touched
//! - Repeated runs produce identical stores
//! - ROI tables land in the image created for the same well

use std::fs;

use tempfile::TempDir;

use plate_ngff::convert::PyramidSpec;
use plate_ngff::roi::{FOV_ROI_TABLE, WELL_ROI_TABLE};
use plate_ngff::store::ZarrArray;
use plate_ngff::{
    convert_plate, parse_acquisition, AcquisitionError, AcquisitionMode, Config, ConfigError,
    ConvertError, PipelineOrchestrator, PlateLayout, RoiTableBuilder, StoreError, WorkerPool,
};

use clap::Parser;

use super::test_utils::{
    attrs, is_group, list_files, request_in, ExportBuilder, TILE_HEIGHT, TILE_WIDTH,
};

// =============================================================================
// Conversion
// =============================================================================

#[tokio::test]
async fn test_single_well_stack() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 4, 1);

    let request = request_in(dir.path());
    let summary = convert_plate(&request, 1).await.unwrap();

    assert_eq!(summary.plate, vec!["Plate.zarr"]);
    assert_eq!(summary.well, vec!["Plate.zarr/A/1"]);
    assert_eq!(summary.image, vec!["Plate.zarr/A/1/0"]);

    let image = dir.path().join("zarr/Plate.zarr/A/1/0");
    assert!(is_group(&image));

    let base = ZarrArray::open(&image.join("0")).unwrap();
    assert_eq!(
        base.shape(),
        &[1, 1, 2 * TILE_HEIGHT as u64, 2 * TILE_WIDTH as u64]
    );
    let pixels: Vec<u16> = base.read().unwrap();
    assert_eq!(pixels[0], 101);
    assert_eq!(pixels[pixels.len() - 1], 401);

    let multiscale = &attrs(&image)["multiscales"][0];
    let datasets = multiscale["datasets"].as_array().unwrap();
    assert_eq!(datasets.len(), request.pyramid.level_count());
    for (level, dataset) in datasets.iter().enumerate() {
        assert_eq!(dataset["path"], level.to_string());
        assert!(image.join(level.to_string()).join(".zarray").is_file());
    }
}

#[tokio::test]
async fn test_multiple_wells_with_parallel_workers() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    for well in ["C05", "A02", "B11"] {
        export.stack_well(well, 2, 2);
    }

    let request = request_in(dir.path());
    let pool = WorkerPool::new(3);
    let summary = PipelineOrchestrator::new()
        .run(&request, &pool)
        .await
        .unwrap();
    pool.shutdown();

    assert_eq!(
        summary.image,
        vec!["Plate.zarr/A/2/0", "Plate.zarr/B/11/0", "Plate.zarr/C/5/0"]
    );

    let plate = attrs(&dir.path().join("zarr/Plate.zarr"));
    let wells = plate["plate"]["wells"].as_array().unwrap();
    assert_eq!(wells.len(), 3);
    assert_eq!(wells[2]["path"], "C/5");
    assert_eq!(wells[2]["rowIndex"], 2);
    assert_eq!(wells[2]["columnIndex"], 4);
}

#[tokio::test]
async fn test_384_layout() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("P24", 1, 1);

    let mut request = request_in(dir.path());
    request.layout = PlateLayout::Wells384;
    let summary = convert_plate(&request, 1).await.unwrap();

    assert_eq!(summary.image, vec!["Plate.zarr/P/24/0"]);
    let plate = attrs(&dir.path().join("zarr/Plate.zarr"));
    assert_eq!(plate["plate"]["rows"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn test_custom_pyramid_and_sub_group() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export")).with_tile_size(32, 32);
    export.stack_well("A01", 1, 1);

    let mut request = request_in(dir.path());
    request.pyramid = PyramidSpec::new(4, 2).unwrap();
    request.well_sub_group = "acq1".to_string();
    let summary = convert_plate(&request, 1).await.unwrap();

    assert_eq!(summary.image, vec!["Plate.zarr/A/1/acq1"]);
    let image = dir.path().join("zarr/Plate.zarr/A/1/acq1");
    let top = ZarrArray::open(&image.join("2")).unwrap();
    assert_eq!(top.shape(), &[1, 1, 2, 2]);

    let well = attrs(&dir.path().join("zarr/Plate.zarr/A/1"));
    assert_eq!(well["well"]["images"][0]["path"], "acq1");
}

#[tokio::test]
async fn test_single_plane_conversion() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    for field in 1..=2 {
        export.plane_tile("D04", field, 1, 10 * field as u16);
        export.plane_tile("D04", field, 2, 500);
    }
    export.stack_well("D04", 2, 3);

    let mut request = request_in(dir.path());
    request.mode = AcquisitionMode::SinglePlaneAcquisition;
    let summary = convert_plate(&request, 1).await.unwrap();
    assert_eq!(summary.image, vec!["Plate.zarr/D/4/0"]);

    let image = dir.path().join("zarr/Plate.zarr/D/4/0");
    let base = ZarrArray::open(&image.join("0")).unwrap();
    let (h, w) = (TILE_HEIGHT as usize, TILE_WIDTH as usize);
    assert_eq!(base.shape(), &[2, 1, h as u64, 2 * w as u64]);

    let pixels: Vec<u16> = base.read().unwrap();
    let plane = h * 2 * w;
    assert_eq!(pixels[0], 10);
    assert_eq!(pixels[w], 20);
    assert!(pixels[plane..].iter().all(|&p| p == 500));

    let fov = ZarrArray::open(&image.join("tables").join(FOV_ROI_TABLE).join("X"))
        .unwrap()
        .read::<f32>()
        .unwrap();
    assert_eq!(fov.len(), 2 * 8);
    assert_eq!(fov[5], 1.0);
}

#[tokio::test]
async fn test_mixed_conversion_puts_planes_on_first_slice() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("E07", 1, 2);
    export.plane_tile("E07", 1, 1, 999);
    export.plane_tile("E07", 1, 2, 7);

    let mut request = request_in(dir.path());
    request.mode = AcquisitionMode::MixedAcquisition;
    request.calibration.z_spacing_um = 1.5;
    convert_plate(&request, 1).await.unwrap();

    let image = dir.path().join("zarr/Plate.zarr/E/7/0");
    let base = ZarrArray::open(&image.join("0")).unwrap();
    let (h, w) = (TILE_HEIGHT as u64, TILE_WIDTH as u64);
    assert_eq!(base.shape(), &[2, 2, h, w]);

    let pixels: Vec<u16> = base.read().unwrap();
    let plane = (h * w) as usize;
    let slice = |c: usize, z: usize| &pixels[(c * 2 + z) * plane..(c * 2 + z + 1) * plane];
    assert!(slice(0, 0).iter().all(|&p| p == 101));
    assert!(slice(0, 1).iter().all(|&p| p == 102));
    assert!(slice(1, 0).iter().all(|&p| p == 7));
    assert!(slice(1, 1).iter().all(|&p| p == 0));

    let well = ZarrArray::open(&image.join("tables").join(WELL_ROI_TABLE).join("X"))
        .unwrap()
        .read::<f32>()
        .unwrap();
    assert_eq!(well[5], 3.0);
}

// =============================================================================
// Overwrite
// =============================================================================

#[tokio::test]
async fn test_overwrite_replaces_existing_plate() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 4, 1);

    let stale = dir.path().join("zarr/Plate.zarr/H/12/0/stale.bin");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"old").unwrap();

    let request = request_in(dir.path());
    convert_plate(&request, 1).await.unwrap();

    assert!(!stale.exists());
    assert!(!dir.path().join("zarr/Plate.zarr/H/12").exists());
    assert!(is_group(&dir.path().join("zarr/Plate.zarr/A/1/0")));
}

#[tokio::test]
async fn test_existing_plate_without_overwrite() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 1, 1);

    let keep = dir.path().join("zarr/Plate.zarr/keep.txt");
    fs::create_dir_all(keep.parent().unwrap()).unwrap();
    fs::write(&keep, b"keep").unwrap();

    let mut request = request_in(dir.path());
    request.overwrite = false;
    let result = convert_plate(&request, 1).await;

    assert!(matches!(
        result,
        Err(ConvertError::Store(StoreError::PlateExists(_)))
    ));
    assert_eq!(
        list_files(&dir.path().join("zarr/Plate.zarr")),
        vec!["keep.txt"]
    );
}

#[tokio::test]
async fn test_idempotent_under_overwrite() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 2, 2);
    export.stack_well("B03", 3, 2);

    let request = request_in(dir.path());
    let first = convert_plate(&request, 2).await.unwrap();
    let first_files = list_files(&dir.path().join("zarr"));

    let second = convert_plate(&request, 2).await.unwrap();
    let second_files = list_files(&dir.path().join("zarr"));

    assert_eq!(first, second);
    assert_eq!(first_files, second_files);
}

// =============================================================================
// Failures Before I/O
// =============================================================================

#[test]
fn test_bad_mode_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let zarr_dir = dir.path().join("zarr");
    fs::create_dir_all(&zarr_dir).unwrap();

    let config = Config::try_parse_from([
        "plate-ngff",
        "--zarr-dir",
        zarr_dir.to_str().unwrap(),
        "--image-dir",
        dir.path().join("export").to_str().unwrap(),
        "--mode",
        "BadMode",
    ])
    .unwrap();

    let result = config.to_request();
    assert!(matches!(result, Err(ConfigError::UnknownMode(_))));
    assert_eq!(fs::read_dir(&zarr_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_source_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let request = request_in(dir.path());

    let result = convert_plate(&request, 1).await;
    assert!(matches!(
        result,
        Err(ConvertError::Acquisition(AcquisitionError::DirectoryNotFound(_)))
    ));
    assert!(!dir.path().join("zarr").exists());
}

#[tokio::test]
async fn test_well_outside_layout_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("J01", 1, 1);

    let result = convert_plate(&request_in(dir.path()), 1).await;
    assert!(matches!(
        result,
        Err(ConvertError::Acquisition(AcquisitionError::WellOutsideLayout { .. }))
    ));
    assert!(!dir.path().join("zarr").exists());
}

#[tokio::test]
async fn test_duplicate_well_names_create_nothing() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 1, 1);
    export.stack_well("A1", 1, 1);

    let result = convert_plate(&request_in(dir.path()), 1).await;
    assert!(matches!(
        result,
        Err(ConvertError::Acquisition(AcquisitionError::DuplicateWell { .. }))
    ));
    assert!(!dir.path().join("zarr").exists());
}

#[tokio::test]
async fn test_shut_down_pool_fails_run() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 1, 1);

    let pool = WorkerPool::new(1);
    pool.shutdown();
    let result = PipelineOrchestrator::new()
        .run(&request_in(dir.path()), &pool)
        .await;
    assert!(matches!(result, Err(ConvertError::Pool(_))));
}

// =============================================================================
// Path Agreement
// =============================================================================

#[tokio::test]
async fn test_roi_tables_agree_with_images() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 4, 2);
    export.stack_well("D07", 2, 2);

    let request = request_in(dir.path());
    let summary = convert_plate(&request, 2).await.unwrap();

    let acquisition = parse_acquisition(
        &request.image_dir,
        AcquisitionMode::StackAcquisition,
        plate_ngff::TileAlignment::Grid,
        request.calibration,
        &request.well_sub_group,
    )
    .unwrap();
    let tables = RoiTableBuilder::new().build(&acquisition);

    for (well_name, well_tables) in &tables {
        let well = acquisition.well(well_name).unwrap();
        let image_path = well.image_path("Plate.zarr");
        assert!(summary.image.contains(&image_path));

        let image = dir.path().join("zarr").join(&image_path);
        assert!(image.join("0/.zarray").is_file());

        let listed = attrs(&image.join("tables"))["tables"].clone();
        for table_name in well_tables.keys() {
            assert!(listed
                .as_array()
                .unwrap()
                .iter()
                .any(|t| t == table_name.as_str()));
        }

        let fov = ZarrArray::open(&image.join("tables").join(FOV_ROI_TABLE).join("X")).unwrap();
        assert_eq!(fov.shape()[0], well.fields().len() as u64);
        let whole = ZarrArray::open(&image.join("tables").join(WELL_ROI_TABLE).join("X")).unwrap();
        assert_eq!(whole.shape(), &[1, 8]);
    }
}
