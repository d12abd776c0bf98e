//! Store skeleton integration tests.
//!
//! Tests verify:
//! - Plate metadata lists the full row/column grid of the layout
//! - Row, well and image groups are created where NGFF readers expect them
//! - Existing plates are replaced or refused according to `overwrite`

use std::fs;

use tempfile::TempDir;

use plate_ngff::store::zarr::read_attrs;
use plate_ngff::{
    parse_acquisition, AcquisitionMode, Calibration, ConfigError, ConvertError, PlateDescription,
    PlateLayout, StoreError, StoreLayoutManager, TileAlignment,
};

use super::test_utils::{attrs, is_group, ExportBuilder};

fn description() -> PlateDescription {
    PlateDescription {
        order_name: "order-42".to_string(),
        barcode: "BC-0001".to_string(),
    }
}

fn acquisition_with(dir: &TempDir, wells: &[&str]) -> plate_ngff::PlateAcquisition {
    let export = ExportBuilder::new(dir.path().join("export"));
    for well in wells {
        export.plane_tile(well, 1, 1, 1);
    }
    parse_acquisition(
        export.root(),
        AcquisitionMode::SinglePlaneAcquisition,
        TileAlignment::Grid,
        Calibration::default(),
        "0",
    )
    .unwrap()
}

#[test]
fn test_layouts() {
    for (layout, rows, columns) in [(96, 8, 12), (384, 16, 24)] {
        let dir = TempDir::new().unwrap();
        let acquisition = acquisition_with(&dir, &["A01", "B12"]);
        let layout = PlateLayout::try_from(layout).unwrap();

        let manager = StoreLayoutManager::new();
        let store = manager
            .prepare(&dir.path().join("zarr"), "Plate", layout, true)
            .unwrap();
        let plate = manager
            .create_plate(&store, &acquisition, &description())
            .unwrap();

        let plate_attrs = attrs(plate.path());
        assert_eq!(plate_attrs["plate"]["rows"].as_array().unwrap().len(), rows);
        assert_eq!(
            plate_attrs["plate"]["columns"].as_array().unwrap().len(),
            columns
        );
        assert_eq!(plate_attrs["order_name"], "order-42");
        assert_eq!(plate_attrs["barcode"], "BC-0001");

        let row_groups = fs::read_dir(plate.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .count();
        assert_eq!(row_groups, rows);

        assert!(is_group(&plate.path().join("A/1/0")));
        assert!(is_group(&plate.path().join("B/12/0")));
    }
}

#[test]
fn test_invalid_layout_rejected() {
    for value in [0, 48, 95, 1536] {
        assert!(matches!(
            PlateLayout::try_from(value),
            Err(ConfigError::InvalidLayout(v)) if v == value
        ));
    }
}

#[test]
fn test_well_outside_layout_creates_nothing_beyond_root() {
    let dir = TempDir::new().unwrap();
    let acquisition = acquisition_with(&dir, &["P24"]);

    let manager = StoreLayoutManager::new();
    let store = manager
        .prepare(&dir.path().join("zarr"), "Plate", PlateLayout::Wells96, true)
        .unwrap();
    let result = manager.create_plate(&store, &acquisition, &description());

    assert!(matches!(result, Err(ConvertError::Acquisition(_))));
    assert!(!read_attrs(&dir.path().join("zarr/Plate.zarr"))
        .unwrap()
        .contains_key("plate"));
}

#[test]
fn test_prepare_refuses_existing_plate() {
    let dir = TempDir::new().unwrap();
    let zarr = dir.path().join("zarr");
    let marker = zarr.join("Plate.zarr/A/1/0/keep");
    fs::create_dir_all(marker.parent().unwrap()).unwrap();
    fs::write(&marker, b"data").unwrap();

    let result = StoreLayoutManager::new().prepare(&zarr, "Plate", PlateLayout::Wells96, false);

    assert!(matches!(result, Err(StoreError::PlateExists(_))));
    assert_eq!(fs::read(&marker).unwrap(), b"data");
}

#[test]
fn test_prepare_with_new_name_leaves_other_plates() {
    let dir = TempDir::new().unwrap();
    let zarr = dir.path().join("zarr");
    let other = zarr.join("Other.zarr/.zgroup");
    fs::create_dir_all(other.parent().unwrap()).unwrap();
    fs::write(&other, b"{\"zarr_format\": 2}").unwrap();

    StoreLayoutManager::new()
        .prepare(&zarr, "Plate", PlateLayout::Wells96, true)
        .unwrap();

    assert!(other.exists());
    assert!(is_group(&zarr.join("Plate.zarr")));
}
