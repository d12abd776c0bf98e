//! Persisting ROI tables into image groups.
//!
//! Each table is an AnnData-style group under the image:
//!
//! ```text
//! <image>/tables/
//! ├── .zattrs              {"tables": ["FOV_ROI_table", "well_ROI_table"]}
//! └── <table_name>/
//!     ├── .zattrs          type = roi_table
//!     ├── X                float32 [records, columns]
//!     ├── obs/_index       record labels
//!     └── var/_index       column names
//! ```
//!
//! A table is first written into a hidden staging group next to its final
//! location and renamed into place, so readers never observe a partially
//! written table. There is no transaction across tables.

use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{StoreError, TableError};
use crate::store::zarr::{create_group, is_group, read_attrs, update_attrs, write_attrs};
use crate::store::ZarrArray;

use super::table::RoiTable;

/// Group that holds all tables of an image.
pub const TABLES_GROUP: &str = "tables";

/// Value of the `type` attribute of ROI tables.
pub const ROI_TABLE_TYPE: &str = "roi_table";

/// Table format version written to the `fractal_table_version` attribute.
pub const TABLE_VERSION: &str = "1";

/// Writes ROI tables into image groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataWriter;

impl MetadataWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `table` as `<image_node>/tables/<table_name>`.
    ///
    /// With `overwrite == false`, an existing table of the same name is left
    /// untouched and [`TableError::Conflict`] is returned.
    pub fn attach(
        &self,
        image_node: &Path,
        table_name: &str,
        table: &RoiTable,
        overwrite: bool,
    ) -> Result<(), TableError> {
        validate_table_name(table_name)?;
        if !is_group(image_node) {
            return Err(StoreError::NodeNotFound(image_node.to_path_buf()).into());
        }

        let tables = image_node.join(TABLES_GROUP);
        let target = tables.join(table_name);
        let exists = target.exists();
        if exists && !overwrite {
            return Err(TableError::Conflict {
                image: image_node.to_path_buf(),
                table: table_name.to_string(),
            });
        }

        create_group(&tables)?;
        let staging = tables.join(format!(".{}.staging", table_name));
        remove_dir_if_exists(&staging)?;

        if let Err(e) = write_table(&staging, table) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!("Failed to remove {}: {}", staging.display(), cleanup);
            }
            return Err(e.into());
        }

        if exists {
            debug!("Replacing table {}", target.display());
            remove_dir_if_exists(&target)?;
        }
        fs::rename(&staging, &target).map_err(|e| StoreError::io(&target, e))?;

        register_table(&tables, table_name)?;
        debug!(
            "Wrote {} ({} records) to {}",
            table_name,
            table.len(),
            image_node.display()
        );
        Ok(())
    }

    /// Names listed in `<image_node>/tables/.zattrs`.
    pub fn table_names(&self, image_node: &Path) -> Result<Vec<String>, TableError> {
        let attrs = read_attrs(&image_node.join(TABLES_GROUP))?;
        Ok(listed_tables(&attrs))
    }
}

fn validate_table_name(name: &str) -> Result<(), TableError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        return Err(TableError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn write_table(group: &Path, table: &RoiTable) -> Result<(), StoreError> {
    create_group(group)?;
    write_attrs(
        group,
        &json!({
            "encoding-type": "anndata",
            "encoding-version": "0.1.0",
            "type": ROI_TABLE_TYPE,
            "fractal_table_version": TABLE_VERSION,
        }),
    )?;

    let columns = table.columns();
    let rows = table.len() as u64;
    let width = columns.len() as u64;
    ZarrArray::create::<f32>(&group.join("X"), &[rows, width], &[rows.max(1), width])?
        .write(&table.matrix())?;

    write_index(&group.join("obs"), &table.labels())?;
    write_index(&group.join("var"), &columns)?;
    Ok(())
}

fn write_index(frame: &Path, index: &[String]) -> Result<(), StoreError> {
    create_group(frame)?;
    write_attrs(
        frame,
        &json!({
            "_index": "_index",
            "column-order": [],
            "encoding-type": "dataframe",
            "encoding-version": "0.2.0",
        }),
    )?;
    ZarrArray::create_strings(&frame.join("_index"), index)?;
    Ok(())
}

fn register_table(tables: &Path, name: &str) -> Result<(), StoreError> {
    let attrs = read_attrs(tables)?;
    let mut names = listed_tables(&attrs);
    if names.iter().any(|n| n == name) {
        return Ok(());
    }
    names.push(name.to_string());

    let mut updates = Map::new();
    updates.insert("tables".to_string(), Value::from(names));
    update_attrs(tables, updates)
}

fn listed_tables(attrs: &Map<String, Value>) -> Vec<String> {
    attrs
        .get("tables")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn remove_dir_if_exists(path: &Path) -> Result<(), StoreError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| StoreError::io(path, e))?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
