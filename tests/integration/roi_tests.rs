//! ROI table integration tests.
//!
//! Tests verify:
//! - Tables attached after a run describe the well geometry in micrometers
//! - A second write of an existing table without overwrite is refused and
//!   leaves the first table intact
//! - Overwriting a table replaces it in place

use tempfile::TempDir;

use plate_ngff::roi::{RoiRecord, RoiTable, ROI_COLUMNS, TABLES_GROUP, WELL_ROI_TABLE};
use plate_ngff::store::ZarrArray;
use plate_ngff::{convert_plate, Calibration, MetadataWriter, TableError};

use super::test_utils::{attrs, request_in, ExportBuilder, TILE_HEIGHT, TILE_WIDTH};

fn well_table(len_x: f32) -> RoiTable {
    RoiTable::new(vec![RoiRecord {
        label: "well_1".to_string(),
        x_micrometer: 0.0,
        y_micrometer: 0.0,
        z_micrometer: 0.0,
        len_x_micrometer: len_x,
        len_y_micrometer: 10.0,
        len_z_micrometer: 1.0,
        x_micrometer_original: 0.0,
        y_micrometer_original: 0.0,
    }])
}

fn read_matrix(image: &std::path::Path, table: &str) -> Vec<f32> {
    ZarrArray::open(&image.join(TABLES_GROUP).join(table).join("X"))
        .unwrap()
        .read::<f32>()
        .unwrap()
}

#[tokio::test]
async fn test_tables_after_conversion() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("B02", 4, 3);

    let mut request = request_in(dir.path());
    request.calibration = Calibration {
        pixel_size_um: 0.5,
        z_spacing_um: 2.0,
    };
    convert_plate(&request, 1).await.unwrap();

    let image = dir.path().join("zarr/Plate.zarr/B/2/0");
    let table_attrs = attrs(&image.join("tables/FOV_ROI_table"));
    assert_eq!(table_attrs["type"], "roi_table");

    let labels = ZarrArray::open(&image.join("tables/FOV_ROI_table/obs/_index"))
        .unwrap()
        .read_strings()
        .unwrap();
    assert_eq!(labels, vec!["FOV_1", "FOV_2", "FOV_3", "FOV_4"]);

    let columns = ZarrArray::open(&image.join("tables/FOV_ROI_table/var/_index"))
        .unwrap()
        .read_strings()
        .unwrap();
    assert_eq!(columns, ROI_COLUMNS.to_vec());

    let fov = read_matrix(&image, "FOV_ROI_table");
    let last = &fov[3 * 8..4 * 8];
    assert_eq!(last[0], TILE_WIDTH as f32 * 0.5);
    assert_eq!(last[1], TILE_HEIGHT as f32 * 0.5);
    assert_eq!(last[5], 6.0);

    let well = read_matrix(&image, WELL_ROI_TABLE);
    assert_eq!(well[3], 2.0 * TILE_WIDTH as f32 * 0.5);
    assert_eq!(well[4], 2.0 * TILE_HEIGHT as f32 * 0.5);
}

#[tokio::test]
async fn test_second_write_without_overwrite_conflicts() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 1, 1);
    convert_plate(&request_in(dir.path()), 1).await.unwrap();

    let image = dir.path().join("zarr/Plate.zarr/A/1/0");
    let before = read_matrix(&image, WELL_ROI_TABLE);

    let writer = MetadataWriter::new();
    let result = writer.attach(&image, WELL_ROI_TABLE, &well_table(999.0), false);

    assert!(matches!(
        result,
        Err(TableError::Conflict { ref table, .. }) if table == WELL_ROI_TABLE
    ));
    assert_eq!(read_matrix(&image, WELL_ROI_TABLE), before);
}

#[tokio::test]
async fn test_write_twice_on_fresh_image() {
    let dir = TempDir::new().unwrap();
    let export = ExportBuilder::new(dir.path().join("export"));
    export.stack_well("A01", 1, 1);
    convert_plate(&request_in(dir.path()), 1).await.unwrap();

    let image = dir.path().join("zarr/Plate.zarr/A/1/0");
    let writer = MetadataWriter::new();
    writer
        .attach(&image, WELL_ROI_TABLE, &well_table(10.0), true)
        .unwrap();
    assert!(writer
        .attach(&image, WELL_ROI_TABLE, &well_table(20.0), false)
        .is_err());
    assert_eq!(read_matrix(&image, WELL_ROI_TABLE)[3], 10.0);

    writer
        .attach(&image, WELL_ROI_TABLE, &well_table(30.0), true)
        .unwrap();
    assert_eq!(read_matrix(&image, WELL_ROI_TABLE)[3], 30.0);

    let names = writer.table_names(&image).unwrap();
    assert_eq!(
        names.iter().filter(|n| n.as_str() == WELL_ROI_TABLE).count(),
        1
    );
}
